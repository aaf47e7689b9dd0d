//! Live region rule
//!
//! Text that changes from script on an element that is neither a live
//! region nor a status/alert role is invisible to assistive technology.
//! Document scope only: it needs the target element's markup.

use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::{ActionType, Timing};

pub struct LiveRegionRule;

impl Rule for LiveRegionRule {
    fn name(&self) -> &'static str {
        "live-region"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let Some(model) = ctx.document_model else {
            return Vec::new();
        };
        let mut findings = Vec::new();
        for script in &model.scripts {
            for binding in &script.bindings {
                if binding.action_type != ActionType::DomManipulation {
                    continue;
                }
                if binding.metadata.get("textual").map(String::as_str) != Some("true") {
                    continue;
                }
                // static page setup is not a dynamic update
                let dynamic = binding.timing != Timing::Immediate
                    || binding.metadata.get("in_function").map(String::as_str) == Some("true");
                if !dynamic {
                    continue;
                }
                let Some(key) = model.query_selector(&binding.element_ref) else {
                    continue;
                };
                let (fi, node) = key;
                let fragment = &model.fragments[fi];
                let Some(el) = fragment.element(node) else { continue };
                let is_live = el.attr("aria-live").is_some()
                    || matches!(el.attr("role"), Some("status") | Some("alert"));
                if is_live {
                    continue;
                }
                let location = binding
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                let related = fragment.node(node).span.as_ref().map(Location::from_span);
                let mut finding = Finding::new(
                    kinds::MISSING_LIVE_REGION,
                    Severity::Warning,
                    format!(
                        "Text of `{}` changes dynamically but the element is not a live region",
                        binding.element_ref
                    ),
                    location,
                    ctx.confidence(),
                )
                .with_wcag(&["4.1.3"]);
                if let Some(related) = related {
                    finding = finding.with_related(related);
                }
                findings.push(finding);
            }
        }
        findings
    }
}
