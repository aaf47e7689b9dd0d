//! Timing rules
//!
//! Long timeouts that end in navigation or major DOM replacement, and
//! intervals that can never be cleared.

use std::collections::HashSet;

use crate::action::{Action, ActionKind, ChildRole};
use crate::analyzer::finding::{kinds, Finding, Location, Severity};
use crate::analyzer::walk::{find_dom_replacement, find_navigation};
use crate::analyzer::{AnalyzerContext, Rule};

const LONG_DELAY_MS: i64 = 5_000;

pub struct TimingRule;

impl Rule for TimingRule {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for script in ctx.scripts() {
            self.check_timeouts(ctx, &script.tree.root, &script.source_path, &mut findings);
            self.check_intervals(ctx, &script.tree.root, &script.source_path, &mut findings);
        }
        findings
    }
}

fn is_timer_call(node: &Action, name: &str) -> bool {
    if node.kind != ActionKind::Call {
        return false;
    }
    let callee = node.attr_str("callee").unwrap_or("");
    callee == name || callee.ends_with(&format!(".{}", name))
}

impl TimingRule {
    fn check_timeouts(
        &self,
        ctx: &AnalyzerContext,
        root: &Action,
        source_path: &str,
        findings: &mut Vec<Finding>,
    ) {
        for call in root.find_all(&|n| is_timer_call(n, "setTimeout")) {
            let args: Vec<&Action> = call.children_by_role(ChildRole::Argument).collect();
            let delay = args
                .get(1)
                .filter(|a| a.kind == ActionKind::Literal)
                .and_then(|a| a.attr_int("value"));
            let Some(delay) = delay else { continue };
            if delay < LONG_DELAY_MS {
                continue;
            }
            let Some(callback) = args.first().filter(|a| a.kind.is_function_like()) else {
                continue;
            };
            let disruptive = find_navigation(callback).or_else(|| find_dom_replacement(callback));
            let Some(disruptive) = disruptive else { continue };
            let location = disruptive
                .span
                .as_ref()
                .or(call.span.as_ref())
                .map(Location::from_span)
                .unwrap_or_else(|| Location::new(source_path, 1, 1));
            findings.push(
                Finding::new(
                    kinds::UNANNOUNCED_TIMEOUT,
                    Severity::Warning,
                    format!(
                        "A {} ms timeout ends in navigation or content replacement with no warning",
                        delay
                    ),
                    location,
                    ctx.confidence(),
                )
                .with_wcag(&["2.2.1"]),
            );
        }
    }

    fn check_intervals(
        &self,
        ctx: &AnalyzerContext,
        root: &Action,
        source_path: &str,
        findings: &mut Vec<Finding>,
    ) {
        // interval ids captured into a variable, by span identity
        let mut captured: Vec<(usize, String)> = Vec::new();
        root.walk(&mut |node| {
            let (name, init) = match node.kind {
                ActionKind::DeclareVar | ActionKind::DeclareConst => (
                    node.attr_str("name").map(|s| s.to_string()),
                    node.child_by_role(ChildRole::Init),
                ),
                ActionKind::Assign => {
                    let left = node.child_by_role(ChildRole::Left);
                    let name = left
                        .filter(|l| l.kind == ActionKind::Identifier)
                        .and_then(|l| l.attr_str("name"))
                        .map(|s| s.to_string());
                    (name, node.child_by_role(ChildRole::Right))
                }
                _ => (None, None),
            };
            if let (Some(name), Some(init)) = (name, init) {
                if is_timer_call(init, "setInterval") {
                    if let Some(span) = &init.span {
                        captured.push((span.start, name));
                    }
                }
            }
            true
        });

        // identifiers passed to clearInterval anywhere in this model
        let cleared: HashSet<String> = root
            .find_all(&|n| is_timer_call(n, "clearInterval"))
            .iter()
            .filter_map(|call| {
                call.children_by_role(ChildRole::Argument)
                    .next()
                    .filter(|a| a.kind == ActionKind::Identifier)
                    .and_then(|a| a.attr_str("name"))
                    .map(|s| s.to_string())
            })
            .collect();

        for call in root.find_all(&|n| is_timer_call(n, "setInterval")) {
            let capture = call
                .span
                .as_ref()
                .and_then(|span| captured.iter().find(|(start, _)| *start == span.start));
            if let Some((_, name)) = capture {
                if cleared.contains(name) {
                    continue;
                }
            }
            let location = call
                .span
                .as_ref()
                .map(Location::from_span)
                .unwrap_or_else(|| Location::new(source_path, 1, 1));
            findings.push(
                Finding::new(
                    kinds::UNCONTROLLED_AUTO_UPDATE,
                    Severity::Warning,
                    "setInterval has no reachable clearInterval; the update cannot be paused or stopped",
                    location,
                    ctx.confidence(),
                )
                .with_wcag(&["2.2.2"]),
            );
        }
    }
}
