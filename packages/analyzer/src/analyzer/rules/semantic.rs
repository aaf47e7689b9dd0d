//! Semantic element rules
//!
//! Generic containers dressed up as controls: `role="button"`/`"link"`
//! granted to elements that were never the native control, and created
//! `div`/`span` elements wired up as click targets.

use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::ActionType;

pub struct SemanticRule;

impl Rule for SemanticRule {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for script in ctx.scripts() {
            for binding in &script.bindings {
                match binding.action_type {
                    ActionType::AriaStateChange => {
                        if binding.metadata.get("attribute").map(String::as_str) != Some("role") {
                            continue;
                        }
                        let Some(role) = binding.metadata.get("value") else { continue };
                        if role != "button" && role != "link" {
                            continue;
                        }
                        let native_tag = if role == "button" { "button" } else { "a" };
                        let origin_tag = self.origin_tag(ctx, binding);
                        let mismatched = match origin_tag.as_deref() {
                            Some(tag) => tag != native_tag,
                            // unknown origin: only created elements are safe to judge
                            None => binding.metadata.contains_key("created_tag"),
                        };
                        if !mismatched {
                            continue;
                        }
                        let kind = if role == "button" {
                            kinds::NON_SEMANTIC_BUTTON
                        } else {
                            kinds::NON_SEMANTIC_LINK
                        };
                        let location = binding
                            .span
                            .as_ref()
                            .map(Location::from_span)
                            .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                        findings.push(
                            Finding::new(
                                kind,
                                Severity::Warning,
                                format!(
                                    "role=\"{}\" granted to `{}` instead of using the native <{}> element",
                                    role, binding.element_ref, native_tag
                                ),
                                location,
                                ctx.confidence(),
                            )
                            .with_wcag(&["4.1.2"]),
                        );
                    }
                    ActionType::EventHandler => {
                        // createElement('div') later treated as a button
                        if binding.event.as_deref() != Some("click") {
                            continue;
                        }
                        let Some(created) = binding.metadata.get("created_tag") else { continue };
                        if created != "div" && created != "span" {
                            continue;
                        }
                        let location = binding
                            .span
                            .as_ref()
                            .map(Location::from_span)
                            .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                        findings.push(
                            Finding::new(
                                kinds::NON_SEMANTIC_BUTTON,
                                Severity::Warning,
                                format!(
                                    "A created <{}> receives click handling; use <button> instead",
                                    created
                                ),
                                location,
                                ctx.confidence(),
                            )
                            .with_wcag(&["4.1.2"]),
                        );
                    }
                    _ => {}
                }
            }
        }
        findings
    }
}

impl SemanticRule {
    /// Tag of the element a binding refers to: a created tag if traced, or
    /// the document element's tag in document scope.
    fn origin_tag(
        &self,
        ctx: &AnalyzerContext,
        binding: &crate::model::handler::HandlerBinding,
    ) -> Option<String> {
        if let Some(tag) = binding.metadata.get("created_tag") {
            return Some(tag.clone());
        }
        let model = ctx.document_model?;
        let (fi, node) = model.query_selector(&binding.element_ref)?;
        model.fragments[fi].element(node).map(|el| el.tag_name.clone())
    }
}
