//! DocumentModel
//!
//! Unifies DOM fragments, action-language models and CSS models for one
//! analysis scope. `merge` runs once, after which derived element data is
//! read-only; rebuilding the model is the only way to change it.

use std::collections::HashMap;

use crate::analyzer::finding::AnalysisScope;
use crate::css::model::{CssModel, CssRule};
use crate::dom::model::{DomFragment, ElementData, NodeId};

use super::context::{self, ElementContext};
use super::handler::{ActionLanguageModel, HandlerBinding};

/// Identity of an element across fragments.
pub type ElementKey = (usize, NodeId);

const ARIA_REFERENCE_ATTRS: &[&str] = &["aria-labelledby", "aria-describedby", "aria-controls"];

#[derive(Debug, Default)]
struct MergedModel {
    handlers: HashMap<ElementKey, Vec<HandlerBinding>>,
    css_rules: HashMap<ElementKey, Vec<CssRule>>,
    fragment_count: usize,
    tree_completeness: f64,
    fragment_complete: Vec<bool>,
}

#[derive(Debug)]
pub struct DocumentModel {
    pub scope: AnalysisScope,
    pub fragments: Vec<DomFragment>,
    pub scripts: Vec<ActionLanguageModel>,
    pub stylesheets: Vec<CssModel>,
    merged: Option<MergedModel>,
}

impl DocumentModel {
    pub fn new(scope: AnalysisScope) -> Self {
        DocumentModel {
            scope,
            fragments: Vec::new(),
            scripts: Vec::new(),
            stylesheets: Vec::new(),
            merged: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged.is_some()
    }

    /// The selector set of an element: `#id`, every `.class`, the tag,
    /// `[role="…"]`, and one `[aria-…]` per ARIA attribute present.
    pub fn selector_set(el: &ElementData) -> Vec<String> {
        let mut selectors = Vec::new();
        if let Some(id) = el.attr("id") {
            selectors.push(format!("#{}", id));
        }
        for class in el.classes() {
            selectors.push(format!(".{}", class));
        }
        selectors.push(el.tag_name.clone());
        if let Some(role) = el.attr("role") {
            selectors.push(format!("[role=\"{}\"]", role));
        }
        for name in el.attributes.keys() {
            if name.starts_with("aria-") {
                selectors.push(format!("[{}]", name));
            }
        }
        selectors
    }

    /// Resolve handlers and CSS rules onto every element and score
    /// completeness. Idempotent: inputs are fixed, so re-running computes
    /// the same derived fields.
    pub fn merge(&mut self) {
        let mut merged = MergedModel {
            fragment_count: self.fragments.len(),
            ..MergedModel::default()
        };

        for (fi, fragment) in self.fragments.iter().enumerate() {
            for node in fragment.get_all_elements() {
                let el = match fragment.element(node) {
                    Some(el) => el,
                    None => continue,
                };
                let selectors = Self::selector_set(el);

                let mut bound: Vec<HandlerBinding> = Vec::new();
                for script in &self.scripts {
                    let mut seen: Vec<usize> = Vec::new();
                    for selector in &selectors {
                        for (bi, binding) in script.bindings.iter().enumerate() {
                            if binding.element_ref == *selector && !seen.contains(&bi) {
                                seen.push(bi);
                                bound.push(binding.clone());
                            }
                        }
                    }
                }
                if !bound.is_empty() {
                    merged.handlers.insert((fi, node), bound);
                }

                let mut rules: Vec<CssRule> = Vec::new();
                for sheet in &self.stylesheets {
                    rules.extend(sheet.get_matching_rules(el).into_iter().cloned());
                }
                if !rules.is_empty() {
                    merged.css_rules.insert((fi, node), rules);
                }
            }
        }

        let (completeness, fragment_complete) = self.score_completeness();
        merged.tree_completeness = completeness;
        merged.fragment_complete = fragment_complete;
        self.merged = Some(merged);
    }

    fn score_completeness(&self) -> (f64, Vec<bool>) {
        let n = self.fragments.len();
        if n == 0 {
            return (0.0, Vec::new());
        }
        let base = if n == 1 {
            0.7
        } else {
            (1.0 - 0.1 * n as f64).max(0.3)
        };

        let mut resolved = 0usize;
        let mut unresolved = 0usize;
        let mut fragment_complete = vec![true; n];
        for (fi, fragment) in self.fragments.iter().enumerate() {
            for node in fragment.get_all_elements() {
                let el = match fragment.element(node) {
                    Some(el) => el,
                    None => continue,
                };
                for attr in ARIA_REFERENCE_ATTRS {
                    let Some(refs) = el.attr(attr) else { continue };
                    for target in refs.split_whitespace() {
                        if self.get_element_by_id(target).is_some() {
                            resolved += 1;
                        } else {
                            unresolved += 1;
                        }
                        if fragment.get_element_by_id(target).is_none() {
                            fragment_complete[fi] = false;
                        }
                    }
                }
            }
        }

        let total = resolved + unresolved;
        let completeness = if total > 0 {
            base + 0.3 * resolved as f64 / total as f64
        } else if n == 1 {
            // a lone fragment with nothing dangling is fully connected
            base + 0.3
        } else {
            base
        };
        (completeness.min(1.0), fragment_complete)
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn tree_completeness(&self) -> f64 {
        self.merged.as_ref().map(|m| m.tree_completeness).unwrap_or(0.0)
    }

    /// Whether all ARIA references inside the fragment resolve within it.
    pub fn fragment_is_complete(&self, index: usize) -> bool {
        self.merged
            .as_ref()
            .and_then(|m| m.fragment_complete.get(index).copied())
            .unwrap_or(false)
    }

    pub fn element_handlers(&self, key: ElementKey) -> &[HandlerBinding] {
        self.merged
            .as_ref()
            .and_then(|m| m.handlers.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn element_css_rules(&self, key: ElementKey) -> &[CssRule] {
        self.merged
            .as_ref()
            .and_then(|m| m.css_rules.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ---- scope-wide queries ----

    pub fn get_all_elements(&self) -> Vec<ElementKey> {
        let mut out = Vec::new();
        for (fi, fragment) in self.fragments.iter().enumerate() {
            out.extend(fragment.get_all_elements().into_iter().map(|id| (fi, id)));
        }
        out
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<ElementKey> {
        for (fi, fragment) in self.fragments.iter().enumerate() {
            if let Some(node) = fragment.get_element_by_id(id) {
                return Some((fi, node));
            }
        }
        None
    }

    pub fn query_selector(&self, selector: &str) -> Option<ElementKey> {
        for (fi, fragment) in self.fragments.iter().enumerate() {
            if let Some(node) = fragment.query_selector(selector) {
                return Some((fi, node));
            }
        }
        None
    }

    pub fn query_selector_all(&self, selector: &str) -> Vec<ElementKey> {
        let mut out = Vec::new();
        for (fi, fragment) in self.fragments.iter().enumerate() {
            out.extend(
                fragment
                    .query_selector_all(selector)
                    .into_iter()
                    .map(|id| (fi, id)),
            );
        }
        out
    }

    /// Cross-fragment text for ARIA reference resolution.
    pub fn resolve_reference_text(&self, id: &str) -> Option<String> {
        let (fi, node) = self.get_element_by_id(id)?;
        Some(self.fragments[fi].text_content(node))
    }

    pub fn context(&self, key: ElementKey) -> Option<ElementContext> {
        context::derive_context(self, key)
    }

    pub fn get_interactive_elements(&self) -> Vec<ElementContext> {
        self.get_all_elements()
            .into_iter()
            .filter_map(|key| self.context(key))
            .filter(|ctx| ctx.interactive)
            .collect()
    }

    /// Contexts with an obvious problem: a click handler but no keyboard
    /// handler, or focusable without an accessible label (ignoring plain
    /// text-layout tags).
    pub fn get_elements_with_issues(&self) -> Vec<ElementContext> {
        self.get_all_elements()
            .into_iter()
            .filter_map(|key| self.context(key))
            .filter(|ctx| {
                (ctx.has_click_handler && !ctx.has_keyboard_handler)
                    || (ctx.focusable
                        && ctx.label.is_none()
                        && !matches!(ctx.tag_name.as_str(), "div" | "span" | "p"))
            })
            .collect()
    }
}
