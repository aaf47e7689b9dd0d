//! Reference resolution rules
//!
//! Dangling ARIA id references (document scope, cross-fragment) and
//! handler selectors that match nothing in the document.

use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::ActionType;

const ARIA_REFERENCE_ATTRS: &[&str] = &["aria-labelledby", "aria-describedby", "aria-controls"];

pub struct AriaReferenceRule;

impl Rule for AriaReferenceRule {
    fn name(&self) -> &'static str {
        "aria-reference"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let Some(model) = ctx.document_model else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        for fragment in &model.fragments {
            for node in fragment.get_all_elements() {
                let Some(el) = fragment.element(node) else { continue };
                for attr in ARIA_REFERENCE_ATTRS {
                    let Some(refs) = el.attr(attr) else { continue };
                    for target in refs.split_whitespace() {
                        if model.get_element_by_id(target).is_some() {
                            continue;
                        }
                        let location = fragment
                            .node(node)
                            .span
                            .as_ref()
                            .map(Location::from_span)
                            .unwrap_or_else(|| Location::new(&fragment.source_path, 1, 1));
                        findings.push(
                            Finding::new(
                                kinds::ARIA_REFERENCE_NOT_FOUND,
                                Severity::Warning,
                                format!(
                                    "{}=\"{}\" references id \"{}\" which does not exist",
                                    attr, refs, target
                                ),
                                location,
                                ctx.confidence(),
                            )
                            .with_wcag(&["1.3.1", "4.1.2"]),
                        );
                    }
                }
            }
        }
        findings
    }
}

pub struct OrphanedHandlerRule;

impl Rule for OrphanedHandlerRule {
    fn name(&self) -> &'static str {
        "orphaned-handler"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let Some(model) = ctx.document_model else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        for script in &model.scripts {
            for binding in &script.bindings {
                if binding.action_type != ActionType::EventHandler {
                    continue;
                }
                // only unambiguous selectors; bare names may be variables
                if !binding.element_ref.starts_with('#') && !binding.element_ref.starts_with('.') {
                    continue;
                }
                if !model.query_selector_all(&binding.element_ref).is_empty() {
                    continue;
                }
                let location = binding
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                findings.push(
                    Finding::new(
                        kinds::ORPHANED_EVENT_HANDLER,
                        Severity::Warning,
                        format!(
                            "Handler bound to `{}` matches no element in the document",
                            binding.element_ref
                        ),
                        location,
                        ctx.confidence(),
                    )
                    .with_wcag(&["4.1.2"]),
                );
            }
        }
        findings
    }
}
