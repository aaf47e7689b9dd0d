//! Static ARIA state rule
//!
//! An ARIA state attribute written exactly once with a literal value and
//! never reassigned is state that cannot follow the interaction it
//! decorates. Writes are grouped by `(element_ref, attribute)`.

use std::collections::HashMap;

use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::ActionType;

const STATE_ATTRS: &[&str] = &[
    "aria-pressed",
    "aria-checked",
    "aria-expanded",
    "aria-selected",
    "aria-current",
    "aria-busy",
    "aria-disabled",
    "aria-invalid",
];

pub struct AriaStateRule;

impl Rule for AriaStateRule {
    fn name(&self) -> &'static str {
        "aria-state"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for script in ctx.scripts() {
            // writes grouped by (element_ref, attribute)
            let mut writes: HashMap<(String, String), Vec<usize>> = HashMap::new();
            let mut order: Vec<(String, String)> = Vec::new();
            for (index, binding) in script.bindings.iter().enumerate() {
                if binding.action_type != ActionType::AriaStateChange {
                    continue;
                }
                let Some(attribute) = binding.metadata.get("attribute") else { continue };
                if !STATE_ATTRS.contains(&attribute.as_str()) {
                    continue;
                }
                let group = (binding.element_ref.clone(), attribute.clone());
                if !writes.contains_key(&group) {
                    order.push(group.clone());
                }
                writes.entry(group).or_default().push(index);
            }

            for group in order {
                let indices = &writes[&group];
                if indices.len() != 1 {
                    continue;
                }
                let binding = &script.bindings[indices[0]];
                if binding.metadata.get("static_value").map(String::as_str) != Some("true") {
                    continue;
                }
                let location = binding
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                let value = binding
                    .metadata
                    .get("value")
                    .map(String::as_str)
                    .unwrap_or("");
                findings.push(
                    Finding::new(
                        kinds::STATIC_ARIA_STATE,
                        Severity::Warning,
                        format!(
                            "`{}` is set once to \"{}\" on `{}` and never updated",
                            group.1, value, group.0
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
