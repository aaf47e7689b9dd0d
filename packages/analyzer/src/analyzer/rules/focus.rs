//! Focus rules
//!
//! Positive tabindex disrupting focus order, focusable-but-hidden
//! elements, delayed programmatic focus moves, and broken roving
//! tabindex in composite widgets.

use crate::analyzer::finding::{kinds, Confidence, Finding, Location, Severity};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::{ActionType, Timing};

/// Composite widget containers expected to manage a roving tabindex.
const ROVING_CONTAINERS: &[&str] = &[
    "menu", "menubar", "tablist", "toolbar", "listbox", "tree", "radiogroup", "grid",
];

pub struct FocusRule;

impl Rule for FocusRule {
    fn name(&self) -> &'static str {
        "focus"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        if let Some(model) = ctx.document_model {
            self.check_document(ctx, model, &mut findings);
        }
        self.check_delayed_focus(ctx, &mut findings);
        findings
    }
}

impl FocusRule {
    fn check_document(
        &self,
        ctx: &AnalyzerContext,
        model: &crate::model::document::DocumentModel,
        findings: &mut Vec<Finding>,
    ) {
        for (fi, fragment) in model.fragments.iter().enumerate() {
            for node in fragment.get_all_elements() {
                let Some(el) = fragment.element(node) else { continue };
                let location = fragment
                    .node(node)
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&fragment.source_path, 1, 1));

                // positive tabindex overrides the natural order
                if let Some(tabindex) = el.attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok())
                {
                    if tabindex > 0 {
                        findings.push(
                            Finding::new(
                                kinds::FOCUS_ORDER_CONFLICT,
                                Severity::Warning,
                                format!(
                                    "tabindex=\"{}\" forces an explicit focus order",
                                    tabindex
                                ),
                                location.clone(),
                                ctx.confidence(),
                            )
                            .with_wcag(&["2.4.3"]),
                        );
                    }
                }

                // focusable yet hidden by the cascade
                if fragment.is_focusable(node)
                    && model.stylesheets.iter().any(|sheet| sheet.is_element_hidden(el))
                {
                    findings.push(
                        Finding::new(
                            kinds::VISIBILITY_FOCUS_CONFLICT,
                            Severity::Warning,
                            format!("<{}> is focusable but hidden by CSS", el.tag_name),
                            location.clone(),
                            ctx.confidence(),
                        )
                        .with_wcag(&["2.4.3"]),
                    );
                }

                // roving tabindex bookkeeping inside composite widgets
                if let Some(role) = el.attr("role") {
                    if ROVING_CONTAINERS.contains(&role) {
                        self.check_roving_tabindex(ctx, model, (fi, node), role, findings);
                    }
                }
            }
        }
    }

    fn check_roving_tabindex(
        &self,
        ctx: &AnalyzerContext,
        model: &crate::model::document::DocumentModel,
        key: (usize, crate::dom::model::NodeId),
        role: &str,
        findings: &mut Vec<Finding>,
    ) {
        let (fi, container) = key;
        let fragment = &model.fragments[fi];
        let mut explicit: Vec<i32> = Vec::new();
        collect_descendant_tabindexes(fragment, container, &mut explicit);
        if explicit.is_empty() {
            return;
        }
        let zero_count = explicit.iter().filter(|t| **t == 0).count();
        if zero_count == 1 {
            return;
        }
        let location = fragment
            .node(container)
            .span
            .as_ref()
            .map(Location::from_span)
            .unwrap_or_else(|| Location::new(&fragment.source_path, 1, 1));
        let message = if zero_count == 0 {
            format!(
                "role=\"{}\" manages tabindex but no descendant carries tabindex=\"0\"",
                role
            )
        } else {
            format!(
                "role=\"{}\" has {} descendants with tabindex=\"0\"; a roving tabindex keeps exactly one",
                role, zero_count
            )
        };
        findings.push(
            Finding::new(
                kinds::KEYBOARD_NAVIGATION_ISSUE,
                Severity::Warning,
                message,
                location,
                ctx.confidence(),
            )
            .with_wcag(&["2.1.1"]),
        );
    }

    fn check_delayed_focus(&self, ctx: &AnalyzerContext, findings: &mut Vec<Finding>) {
        for script in ctx.scripts() {
            for binding in &script.bindings {
                if binding.action_type != ActionType::FocusChange {
                    continue;
                }
                if binding.timing != Timing::Delayed {
                    continue;
                }
                if binding.metadata.get("op").map(String::as_str) != Some("focus") {
                    continue;
                }
                let location = binding
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                findings.push(
                    Finding::new(
                        kinds::FOCUS_MANAGEMENT_ISSUE,
                        Severity::Info,
                        format!(
                            "Focus is moved to `{}` from a timer; late focus moves disorient users",
                            binding.element_ref
                        ),
                        location,
                        Confidence::heuristic("timer-driven focus is a heuristic signal"),
                    )
                    .with_wcag(&["2.4.3"]),
                );
            }
        }
    }
}

fn collect_descendant_tabindexes(
    fragment: &crate::dom::model::DomFragment,
    container: crate::dom::model::NodeId,
    out: &mut Vec<i32>,
) {
    for child in &fragment.node(container).children {
        if let Some(el) = fragment.element(*child) {
            if let Some(tabindex) = el.attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok()) {
                out.push(tabindex);
            }
        }
        collect_descendant_tabindexes(fragment, *child, out);
    }
}
