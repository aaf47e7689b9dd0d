//! Element contexts
//!
//! Pure derivation of an element's merged view: handlers, CSS rules,
//! focusability, interactivity, role and accessible label.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::css::model::CssRule;
use crate::dom::model::{compute_label, NodeId};
use crate::parse_util::Span;

use super::document::{DocumentModel, ElementKey};
use super::handler::HandlerBinding;

/// Implicit ARIA role per tag for common landmarks and controls.
static IMPLICIT_ROLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("button", "button");
    table.insert("a", "link");
    table.insert("input", "textbox");
    table.insert("textarea", "textbox");
    table.insert("select", "combobox");
    table.insert("img", "img");
    table.insert("nav", "navigation");
    table.insert("main", "main");
    table.insert("header", "banner");
    table.insert("footer", "contentinfo");
    table.insert("aside", "complementary");
    table.insert("section", "region");
    table.insert("article", "article");
    table.insert("form", "form");
    table.insert("table", "table");
    table.insert("ul", "list");
    table.insert("ol", "list");
    table.insert("li", "listitem");
    for heading in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        table.insert(heading, "heading");
    }
    table
});

pub fn implicit_role(tag: &str) -> Option<&'static str> {
    IMPLICIT_ROLES.get(tag).copied()
}

/// Derived record of one merged element.
#[derive(Debug, Clone)]
pub struct ElementContext {
    pub fragment: usize,
    pub node: NodeId,
    pub tag_name: String,
    pub attributes: IndexMap<String, String>,
    pub span: Option<Span>,
    pub js_handlers: Vec<HandlerBinding>,
    pub css_rules: Vec<CssRule>,
    pub focusable: bool,
    pub interactive: bool,
    pub has_click_handler: bool,
    pub has_keyboard_handler: bool,
    pub role: Option<String>,
    pub label: Option<String>,
}

impl ElementContext {
    pub fn handlers_for_event(&self, event: &str) -> Vec<&HandlerBinding> {
        self.js_handlers.iter().filter(|h| h.is_event(event)).collect()
    }
}

pub fn derive_context(model: &DocumentModel, key: ElementKey) -> Option<ElementContext> {
    let (fi, node) = key;
    let fragment = model.fragments.get(fi)?;
    let el = fragment.element(node)?;

    let js_handlers: Vec<HandlerBinding> = model.element_handlers(key).to_vec();
    let css_rules: Vec<CssRule> = model.element_css_rules(key).to_vec();

    let focusable = fragment.is_focusable(node);
    let has_click_handler = js_handlers.iter().any(|h| h.is_event("click"));
    let has_keyboard_handler = js_handlers.iter().any(|h| h.is_keyboard_event());
    let interactive = focusable || !js_handlers.is_empty();

    let role = el
        .attr("role")
        .map(|r| r.to_string())
        .or_else(|| implicit_role(&el.tag_name).map(|r| r.to_string()));

    // label resolution crosses fragments through the whole model
    let label = compute_label(fragment, node, &|ref_id| model.resolve_reference_text(ref_id));

    Some(ElementContext {
        fragment: fi,
        node,
        tag_name: el.tag_name.clone(),
        attributes: el.attributes.clone(),
        span: fragment.node(node).span.clone(),
        js_handlers,
        css_rules,
        focusable,
        interactive,
        has_click_handler,
        has_keyboard_handler,
        role,
        label,
    })
}
