//! Widget pattern rule
//!
//! Composite widget checks driven by a static catalogue: structural
//! children by role, required ARIA state attributes, keyboard behavior
//! detected on the IR of the attached handlers, and ARIA
//! cross-references. One `incomplete-<pattern>-pattern` finding per
//! container, naming everything that is missing, plus a skeleton fix.
//! Document scope only.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::analyzer::finding::{kinds, Finding, Fix, Location, Severity};
use crate::analyzer::walk::collect_key_literals;
use crate::analyzer::{AnalyzerContext, Rule};
use crate::dom::model::{DomFragment, NodeId};
use crate::model::context::implicit_role;
use crate::model::document::DocumentModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyReq {
    Arrows,
    HomeEnd,
    EnterSpace,
    Escape,
}

impl KeyReq {
    fn keys(&self) -> &'static [&'static str] {
        match self {
            KeyReq::Arrows => &["arrowleft", "arrowright", "arrowup", "arrowdown"],
            KeyReq::HomeEnd => &["home", "end"],
            KeyReq::EnterSpace => &["enter", " "],
            KeyReq::Escape => &["escape"],
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            KeyReq::Arrows => "arrow-key navigation",
            KeyReq::HomeEnd => "Home/End support",
            KeyReq::EnterSpace => "Enter/Space activation",
            KeyReq::Escape => "an Escape handler",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Explicit `role` attribute among the listed roles.
    Role(&'static [&'static str]),
    /// A button carrying `aria-expanded`.
    Disclosure,
    /// A container holding two or more disclosure buttons.
    Accordion,
    /// `<nav>` labelled "breadcrumb".
    Breadcrumb,
    /// `aria-roledescription="carousel"`.
    Carousel,
}

pub struct WidgetPattern {
    pub name: &'static str,
    pub trigger: Trigger,
    /// Each group requires at least one descendant whose effective role
    /// is in the group.
    pub child_groups: &'static [&'static [&'static str]],
    pub container_attrs: &'static [&'static str],
    /// Every descendant with the given role must carry the attribute.
    pub child_attrs: &'static [(&'static str, &'static str)],
    /// `(child role, reference attribute)` pairs that connect the widget
    /// to its satellite elements.
    pub child_refs: &'static [(&'static str, &'static str)],
    pub keyboard: &'static [KeyReq],
    pub needs_label: bool,
    pub wcag: &'static [&'static str],
}

pub static WIDGET_CATALOG: Lazy<Vec<WidgetPattern>> = Lazy::new(|| {
    vec![
        WidgetPattern {
            name: "tabs",
            trigger: Trigger::Role(&["tablist"]),
            child_groups: &[&["tab"]],
            container_attrs: &[],
            child_attrs: &[("tab", "aria-selected")],
            child_refs: &[("tab", "aria-controls")],
            keyboard: &[KeyReq::Arrows, KeyReq::HomeEnd],
            needs_label: false,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "menu",
            trigger: Trigger::Role(&["menu", "menubar"]),
            child_groups: &[&["menuitem", "menuitemcheckbox", "menuitemradio"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows, KeyReq::EnterSpace, KeyReq::Escape],
            needs_label: false,
            wcag: &["4.1.2", "2.1.1"],
        },
        WidgetPattern {
            name: "dialog",
            trigger: Trigger::Role(&["dialog", "alertdialog"]),
            child_groups: &[],
            container_attrs: &["aria-modal"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Escape],
            needs_label: true,
            wcag: &["2.1.2", "4.1.2"],
        },
        WidgetPattern {
            name: "accordion",
            trigger: Trigger::Accordion,
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[("button", "aria-expanded")],
            child_refs: &[("button", "aria-controls")],
            keyboard: &[KeyReq::EnterSpace],
            needs_label: false,
            wcag: &["4.1.2", "2.1.1"],
        },
        WidgetPattern {
            name: "disclosure",
            trigger: Trigger::Disclosure,
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[("button", "aria-controls")],
            keyboard: &[KeyReq::EnterSpace],
            needs_label: false,
            wcag: &["4.1.2"],
        },
        WidgetPattern {
            name: "combobox",
            trigger: Trigger::Role(&["combobox"]),
            child_groups: &[],
            container_attrs: &["aria-expanded"],
            child_attrs: &[],
            child_refs: &[("combobox", "aria-controls")],
            keyboard: &[KeyReq::Arrows, KeyReq::Escape],
            needs_label: true,
            wcag: &["4.1.2"],
        },
        WidgetPattern {
            name: "listbox",
            trigger: Trigger::Role(&["listbox"]),
            child_groups: &[&["option"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows, KeyReq::EnterSpace],
            needs_label: true,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "radiogroup",
            trigger: Trigger::Role(&["radiogroup"]),
            child_groups: &[&["radio"]],
            container_attrs: &[],
            child_attrs: &[("radio", "aria-checked")],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows],
            needs_label: true,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "slider",
            trigger: Trigger::Role(&["slider"]),
            child_groups: &[],
            container_attrs: &["aria-valuenow", "aria-valuemin", "aria-valuemax"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows, KeyReq::HomeEnd],
            needs_label: true,
            wcag: &["4.1.2", "2.1.1"],
        },
        WidgetPattern {
            name: "spinbutton",
            trigger: Trigger::Role(&["spinbutton"]),
            child_groups: &[],
            container_attrs: &["aria-valuenow"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows],
            needs_label: true,
            wcag: &["4.1.2"],
        },
        WidgetPattern {
            name: "switch",
            trigger: Trigger::Role(&["switch"]),
            child_groups: &[],
            container_attrs: &["aria-checked"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::EnterSpace],
            needs_label: true,
            wcag: &["4.1.2"],
        },
        WidgetPattern {
            name: "tree",
            trigger: Trigger::Role(&["tree"]),
            child_groups: &[&["treeitem"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows, KeyReq::HomeEnd],
            needs_label: true,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "toolbar",
            trigger: Trigger::Role(&["toolbar"]),
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows],
            needs_label: false,
            wcag: &["4.1.2", "2.1.1"],
        },
        WidgetPattern {
            name: "grid",
            trigger: Trigger::Role(&["grid"]),
            child_groups: &[&["row"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Arrows, KeyReq::HomeEnd],
            needs_label: false,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "feed",
            trigger: Trigger::Role(&["feed"]),
            child_groups: &[&["article"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[],
            needs_label: false,
            wcag: &["4.1.2", "1.3.1"],
        },
        WidgetPattern {
            name: "breadcrumb",
            trigger: Trigger::Breadcrumb,
            child_groups: &[&["link"]],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[],
            needs_label: false,
            wcag: &["1.3.1", "2.4.8"],
        },
        WidgetPattern {
            name: "tooltip",
            trigger: Trigger::Role(&["tooltip"]),
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::Escape],
            needs_label: false,
            wcag: &["1.4.13", "4.1.2"],
        },
        WidgetPattern {
            name: "carousel",
            trigger: Trigger::Carousel,
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[],
            needs_label: true,
            wcag: &["2.2.2", "4.1.2"],
        },
        WidgetPattern {
            name: "progressbar",
            trigger: Trigger::Role(&["progressbar"]),
            child_groups: &[],
            container_attrs: &["aria-valuenow"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[],
            needs_label: true,
            wcag: &["1.3.1", "4.1.2"],
        },
        WidgetPattern {
            name: "meter",
            trigger: Trigger::Role(&["meter"]),
            child_groups: &[],
            container_attrs: &["aria-valuenow", "aria-valuemin", "aria-valuemax"],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[],
            needs_label: true,
            wcag: &["1.3.1", "4.1.2"],
        },
        WidgetPattern {
            name: "link",
            trigger: Trigger::Role(&["link"]),
            child_groups: &[],
            container_attrs: &[],
            child_attrs: &[],
            child_refs: &[],
            keyboard: &[KeyReq::EnterSpace],
            needs_label: true,
            wcag: &["4.1.2", "2.1.1"],
        },
    ]
});

pub struct WidgetPatternRule;

impl Rule for WidgetPatternRule {
    fn name(&self) -> &'static str {
        "widget-pattern"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let Some(model) = ctx.document_model else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        for pattern in WIDGET_CATALOG.iter() {
            for (fi, fragment) in model.fragments.iter().enumerate() {
                for node in fragment.get_all_elements() {
                    if triggers(pattern, fragment, node) {
                        check_widget(ctx, model, pattern, (fi, node), &mut findings);
                    }
                }
            }
        }
        findings
    }
}

fn effective_role(fragment: &DomFragment, node: NodeId) -> Option<String> {
    let el = fragment.element(node)?;
    el.attr("role")
        .map(|r| r.to_string())
        .or_else(|| implicit_role(&el.tag_name).map(|r| r.to_string()))
}

fn element_descendants(fragment: &DomFragment, container: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect(fragment, container, &mut out);
    return out;

    fn collect(fragment: &DomFragment, node: NodeId, out: &mut Vec<NodeId>) {
        for child in &fragment.node(node).children {
            if fragment.element(*child).is_some() {
                out.push(*child);
            }
            collect(fragment, *child, out);
        }
    }
}

fn triggers(pattern: &WidgetPattern, fragment: &DomFragment, node: NodeId) -> bool {
    let Some(el) = fragment.element(node) else { return false };
    match pattern.trigger {
        Trigger::Role(roles) => el.attr("role").map(|r| roles.contains(&r)).unwrap_or(false),
        Trigger::Disclosure => {
            el.tag_name == "button"
                && el.has_attr("aria-expanded")
                && !el.has_attr("role")
        }
        Trigger::Accordion => {
            let disclosure_buttons = element_descendants(fragment, node)
                .into_iter()
                .filter(|id| {
                    fragment
                        .element(*id)
                        .map(|child| child.tag_name == "button" && child.has_attr("aria-expanded"))
                        .unwrap_or(false)
                })
                .count();
            // only the nearest enclosing container should report
            disclosure_buttons >= 2
                && fragment.node(node).children.iter().any(|c| {
                    fragment
                        .element(*c)
                        .map(|child| child.tag_name == "button" && child.has_attr("aria-expanded"))
                        .unwrap_or(false)
                        || fragment
                            .element(*c)
                            .map(|child| matches!(child.tag_name.as_str(), "h2" | "h3" | "h4"))
                            .unwrap_or(false)
                })
        }
        Trigger::Breadcrumb => {
            el.tag_name == "nav"
                && el
                    .attr("aria-label")
                    .map(|l| l.to_lowercase().contains("breadcrumb"))
                    .unwrap_or(false)
        }
        Trigger::Carousel => el
            .attr("aria-roledescription")
            .map(|d| d.eq_ignore_ascii_case("carousel"))
            .unwrap_or(false),
    }
}

fn check_widget(
    ctx: &AnalyzerContext,
    model: &DocumentModel,
    pattern: &WidgetPattern,
    key: (usize, NodeId),
    findings: &mut Vec<Finding>,
) {
    let (fi, container) = key;
    let fragment = &model.fragments[fi];
    let Some(el) = fragment.element(container) else { return };
    let descendants = element_descendants(fragment, container);
    let mut missing: Vec<String> = Vec::new();

    // structural children by role
    for group in pattern.child_groups {
        let present = descendants.iter().any(|id| {
            effective_role(fragment, *id)
                .map(|role| group.contains(&role.as_str()))
                .unwrap_or(false)
        });
        if !present {
            missing.push(format!("a child with role \"{}\"", group.join("\"/\"")));
        }
    }

    // required ARIA state on the container
    for attr in pattern.container_attrs {
        if !el.has_attr(attr) {
            missing.push(format!("the \"{}\" attribute", attr));
        }
    }

    // required ARIA state on children of a role
    for (role, attr) in pattern.child_attrs {
        let unmarked = descendants
            .iter()
            .filter(|id| {
                effective_role(fragment, **id).as_deref() == Some(*role)
                    && !fragment.element(**id).map(|e| e.has_attr(attr)).unwrap_or(false)
            })
            .count();
        if unmarked > 0 {
            missing.push(format!(
                "\"{}\" on {} \"{}\" child(ren)",
                attr, unmarked, role
            ));
        }
    }

    // accessible label
    if pattern.needs_label {
        let context = model.context(key);
        if context.map(|c| c.label.is_none()).unwrap_or(true) {
            missing.push("an accessible label".to_string());
        }
    }

    // keyboard behavior, read from the IR of every attached handler
    if !pattern.keyboard.is_empty() {
        let mut keys: HashSet<String> = HashSet::new();
        let mut scope_keys = |node: NodeId| {
            for binding in model.element_handlers((fi, node)) {
                if let Some(handler) = binding.handler.as_ref() {
                    keys.extend(collect_key_literals(handler));
                }
            }
        };
        scope_keys(container);
        for id in &descendants {
            scope_keys(*id);
        }
        let native_container = matches!(
            el.tag_name.as_str(),
            "button" | "a" | "input" | "select" | "textarea"
        );
        for req in pattern.keyboard {
            // native controls activate on Enter/Space by themselves
            if *req == KeyReq::EnterSpace && native_container {
                continue;
            }
            if !req.keys().iter().any(|k| keys.contains(*k)) {
                missing.push(req.describe().to_string());
            }
        }
    }

    // cross-references to satellite elements
    for (role, attr) in pattern.child_refs {
        let mut carriers: Vec<NodeId> = descendants
            .iter()
            .copied()
            .filter(|id| effective_role(fragment, *id).as_deref() == Some(*role))
            .collect();
        if effective_role(fragment, container).as_deref() == Some(*role) {
            carriers.push(container);
        }
        for id in carriers {
            let Some(child) = fragment.element(id) else { continue };
            if !child.has_attr(attr) {
                let location = fragment
                    .node(id)
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&fragment.source_path, 1, 1));
                findings.push(
                    Finding::new(
                        kinds::MISSING_ARIA_CONNECTION,
                        Severity::Warning,
                        format!(
                            "\"{}\" element in a {} widget lacks \"{}\" connecting it to its target",
                            role, pattern.name, attr
                        ),
                        location,
                        ctx.confidence(),
                    )
                    .with_wcag(&["1.3.1", "4.1.2"]),
                );
            }
        }
    }

    if missing.is_empty() {
        return;
    }
    let location = fragment
        .node(container)
        .span
        .as_ref()
        .map(Location::from_span)
        .unwrap_or_else(|| Location::new(&fragment.source_path, 1, 1));
    let kind = kinds::incomplete_pattern(pattern.name);
    let mut finding = Finding::new(
        &kind,
        Severity::Warning,
        format!(
            "Incomplete {} pattern: missing {}",
            pattern.name,
            missing.join(", ")
        ),
        location.clone(),
        ctx.confidence(),
    )
    .with_wcag(pattern.wcag);
    if let Some(fix) = build_fix(pattern.name, location) {
        finding = finding.with_fix(fix);
    }
    findings.push(finding);
}

/// Skeleton markup for a complete instance of the pattern.
fn build_fix(pattern: &str, location: Location) -> Option<Fix> {
    let code = match pattern {
        "tabs" => concat!(
            "<div role=\"tablist\" aria-label=\"Sections\">\n",
            "  <button role=\"tab\" id=\"tab-1\" aria-selected=\"true\" aria-controls=\"panel-1\">Tab 1</button>\n",
            "  <button role=\"tab\" id=\"tab-2\" aria-selected=\"false\" aria-controls=\"panel-2\" tabindex=\"-1\">Tab 2</button>\n",
            "</div>\n",
            "<div role=\"tabpanel\" id=\"panel-1\" aria-labelledby=\"tab-1\">...</div>\n",
            "<div role=\"tabpanel\" id=\"panel-2\" aria-labelledby=\"tab-2\" hidden>...</div>",
        )
        .to_string(),
        "menu" => concat!(
            "<ul role=\"menu\" aria-label=\"Actions\">\n",
            "  <li role=\"menuitem\" tabindex=\"0\">First</li>\n",
            "  <li role=\"menuitem\" tabindex=\"-1\">Second</li>\n",
            "</ul>",
        )
        .to_string(),
        "dialog" => concat!(
            "<div role=\"dialog\" aria-modal=\"true\" aria-labelledby=\"dialog-title\">\n",
            "  <h2 id=\"dialog-title\">Title</h2>\n",
            "  <button type=\"button\">Close</button>\n",
            "</div>",
        )
        .to_string(),
        "tooltip" => concat!(
            "<button aria-describedby=\"tip-1\">Save</button>\n",
            "<div role=\"tooltip\" id=\"tip-1\">Saves the document</div>",
        )
        .to_string(),
        "listbox" => concat!(
            "<ul role=\"listbox\" aria-label=\"Options\">\n",
            "  <li role=\"option\" aria-selected=\"true\">One</li>\n",
            "  <li role=\"option\">Two</li>\n",
            "</ul>",
        )
        .to_string(),
        "radiogroup" => concat!(
            "<div role=\"radiogroup\" aria-label=\"Choice\">\n",
            "  <div role=\"radio\" aria-checked=\"true\" tabindex=\"0\">A</div>\n",
            "  <div role=\"radio\" aria-checked=\"false\" tabindex=\"-1\">B</div>\n",
            "</div>",
        )
        .to_string(),
        "slider" => concat!(
            "<div role=\"slider\" aria-label=\"Volume\" aria-valuemin=\"0\" ",
            "aria-valuemax=\"100\" aria-valuenow=\"50\" tabindex=\"0\"></div>",
        )
        .to_string(),
        "switch" => {
            "<button role=\"switch\" aria-checked=\"false\">Notifications</button>".to_string()
        }
        "progressbar" => concat!(
            "<div role=\"progressbar\" aria-label=\"Upload\" aria-valuemin=\"0\" ",
            "aria-valuemax=\"100\" aria-valuenow=\"25\"></div>",
        )
        .to_string(),
        "meter" => concat!(
            "<div role=\"meter\" aria-label=\"Battery\" aria-valuemin=\"0\" ",
            "aria-valuemax=\"100\" aria-valuenow=\"80\"></div>",
        )
        .to_string(),
        _ => return None,
    };
    Some(Fix {
        description: format!("Replace with a complete {} structure", pattern),
        code,
        location,
    })
}
