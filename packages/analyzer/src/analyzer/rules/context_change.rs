//! Context change rule
//!
//! Navigation or form submission fired from `input`/`change`/`focus`
//! handlers changes the user's context without an explicit request. The
//! WCAG criterion depends on the triggering event: on-input changes map
//! to 3.2.2, on-focus changes to 3.2.1.

use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::walk::{find_form_submit, find_navigation};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::model::handler::ActionType;

const TRIGGER_EVENTS: &[&str] = &["input", "change", "focus"];

pub struct ContextChangeRule;

impl Rule for ContextChangeRule {
    fn name(&self) -> &'static str {
        "context-change"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for script in ctx.scripts() {
            for binding in &script.bindings {
                if binding.action_type != ActionType::EventHandler {
                    continue;
                }
                let Some(event) = binding.event.as_deref() else { continue };
                if !TRIGGER_EVENTS.contains(&event) {
                    continue;
                }
                let Some(handler) = binding.handler.as_ref() else { continue };

                let wcag: &[&str] = if event == "focus" { &["3.2.1"] } else { &["3.2.2"] };

                if let Some(submit) = find_form_submit(handler) {
                    let location = submit
                        .span
                        .as_ref()
                        .or(binding.span.as_ref())
                        .map(Location::from_span)
                        .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                    findings.push(
                        Finding::new(
                            kinds::UNEXPECTED_FORM_SUBMIT,
                            Severity::Warning,
                            format!(
                                "Form submitted from a `{}` handler on `{}`",
                                event, binding.element_ref
                            ),
                            location,
                            ctx.confidence(),
                        )
                        .with_wcag(wcag),
                    );
                    continue;
                }

                if let Some(navigation) = find_navigation(handler) {
                    let location = navigation
                        .span
                        .as_ref()
                        .or(binding.span.as_ref())
                        .map(Location::from_span)
                        .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                    findings.push(
                        Finding::new(
                            kinds::UNEXPECTED_NAVIGATION,
                            Severity::Warning,
                            format!(
                                "Navigation triggered from a `{}` handler on `{}`",
                                event, binding.element_ref
                            ),
                            location,
                            ctx.confidence(),
                        )
                        .with_wcag(wcag),
                    );
                }
            }
        }
        findings
    }
}
