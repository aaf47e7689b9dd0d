//! Keyboard access rules
//!
//! Click-only activation, keyboard traps without an escape hatch,
//! one-of-Enter/Space activation, and touch handlers with no click
//! fallback.

use std::collections::{HashMap, HashSet};

use crate::analyzer::finding::{kinds, Confidence, ConfidenceLevel, Finding, Location, Severity};
use crate::analyzer::walk::{collect_key_literals, has_prevent_default};
use crate::analyzer::{AnalyzerContext, Rule};
use crate::dom::model::NATIVE_INTERACTIVE_TAGS;
use crate::error::EngineError;
use crate::interp::{DomEffect, Interpreter};
use crate::model::handler::{ActionType, HandlerBinding};

pub struct KeyboardRule;

impl Rule for KeyboardRule {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn analyze(&self, ctx: &AnalyzerContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        if let Some(model) = ctx.document_model {
            self.analyze_document(ctx, model, &mut findings);
        } else {
            self.analyze_file(ctx, &mut findings);
        }
        self.analyze_handlers(ctx, &mut findings);
        findings
    }
}

impl KeyboardRule {
    fn analyze_document(
        &self,
        ctx: &AnalyzerContext,
        model: &crate::model::document::DocumentModel,
        findings: &mut Vec<Finding>,
    ) {
        for key in model.get_all_elements() {
            let Some(context) = model.context(key) else { continue };
            if context.has_click_handler
                && !context.has_keyboard_handler
                && !NATIVE_INTERACTIVE_TAGS.contains(&context.tag_name.as_str())
            {
                let location = context
                    .handlers_for_event("click")
                    .first()
                    .and_then(|h| h.span.as_ref())
                    .map(Location::from_span)
                    .or_else(|| context.span.as_ref().map(Location::from_span));
                let Some(location) = location else { continue };
                findings.push(
                    Finding::new(
                        kinds::MOUSE_ONLY_CLICK,
                        Severity::Warning,
                        format!(
                            "<{}> reacts to click but has no keyboard handler",
                            context.tag_name
                        ),
                        location,
                        ctx.confidence(),
                    )
                    .with_wcag(&["2.1.1"]),
                );
            }
        }
        self.check_touch(ctx, findings);
    }

    fn analyze_file(&self, ctx: &AnalyzerContext, findings: &mut Vec<Finding>) {
        for script in ctx.scripts() {
            let by_ref = group_by_ref(&script.bindings);
            for (element_ref, bindings) in by_ref {
                let has_click = bindings.iter().any(|b| b.is_event("click"));
                let has_keyboard = bindings.iter().any(|b| b.is_keyboard_event());
                // without markup the tag is unknown; a reference that names
                // a native control is given the benefit of the doubt
                if ref_suggests_native_control(&element_ref) {
                    continue;
                }
                if has_click && !has_keyboard {
                    let location = bindings
                        .iter()
                        .find(|b| b.is_event("click"))
                        .and_then(|b| b.span.as_ref())
                        .map(Location::from_span);
                    let Some(location) = location else { continue };
                    findings.push(
                        Finding::new(
                            kinds::MOUSE_ONLY_CLICK,
                            Severity::Warning,
                            format!(
                                "`{}` reacts to click but has no keyboard handler",
                                element_ref
                            ),
                            location,
                            ctx.confidence(),
                        )
                        .with_wcag(&["2.1.1"]),
                    );
                }
            }
        }
        self.check_touch(ctx, findings);
    }

    /// Handler-body checks shared by both scopes: keyboard traps and
    /// incomplete activation keys.
    fn analyze_handlers(&self, ctx: &AnalyzerContext, findings: &mut Vec<Finding>) {
        for script in ctx.scripts() {
            let by_ref = group_by_ref(&script.bindings);
            for (element_ref, bindings) in &by_ref {
                // all key names any handler of this element checks
                let mut element_keys: HashSet<String> = HashSet::new();
                for binding in bindings {
                    if let Some(handler) = binding.handler.as_ref() {
                        element_keys.extend(collect_key_literals(handler));
                    }
                }

                for binding in bindings {
                    if !binding.is_keyboard_event() {
                        continue;
                    }
                    let Some(handler) = binding.handler.as_ref() else { continue };
                    let keys = collect_key_literals(handler);

                    if keys.contains("tab") && has_prevent_default(handler) {
                        self.check_tab_trap(
                            ctx,
                            element_ref,
                            binding,
                            handler,
                            &element_keys,
                            findings,
                        );
                    }

                    let has_enter = keys.contains("enter");
                    let has_space = keys.contains(" ");
                    if has_enter != has_space {
                        let missing = if has_enter { "Space" } else { "Enter" };
                        let location = binding
                            .span
                            .as_ref()
                            .map(Location::from_span)
                            .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                        findings.push(
                            Finding::new(
                                kinds::INCOMPLETE_ACTIVATION_KEYS,
                                Severity::Warning,
                                format!(
                                    "Handler on `{}` activates on {} but not {}",
                                    element_ref,
                                    if has_enter { "Enter" } else { "Space" },
                                    missing
                                ),
                                location,
                                ctx.confidence(),
                            )
                            .with_wcag(&["2.1.1"]),
                        );
                    }
                }
            }
        }
    }

    fn check_tab_trap(
        &self,
        ctx: &AnalyzerContext,
        element_ref: &str,
        binding: &HandlerBinding,
        handler: &crate::action::Action,
        element_keys: &HashSet<String>,
        findings: &mut Vec<Finding>,
    ) {
        if element_keys.contains("escape") {
            return;
        }
        let location = binding
            .span
            .as_ref()
            .map(Location::from_span)
            .or_else(|| handler.span.as_ref().map(Location::from_span));
        let Some(location) = location else { return };

        // confirm the trap by firing a synthetic Tab event through the
        // handler; an interpreter failure downgrades, never crashes
        let confidence = if ctx.config.enable_dom_simulation {
            match self.simulate_tab(ctx, handler) {
                Ok(true) => ctx.confidence(),
                Ok(false) => return, // preventDefault unreachable for Tab
                Err(_) => Confidence::new(
                    ConfidenceLevel::Low,
                    "handler simulation hit an interpreter limit",
                    ctx.scope,
                ),
            }
        } else {
            ctx.confidence()
        };

        findings.push(
            Finding::new(
                kinds::MISSING_ESCAPE_HANDLER,
                Severity::Warning,
                format!(
                    "`{}` traps Tab without an Escape handler to leave the trap",
                    element_ref
                ),
                location,
                confidence,
            )
            .with_wcag(&["2.1.2"]),
        );
    }

    fn simulate_tab(
        &self,
        ctx: &AnalyzerContext,
        handler: &crate::action::Action,
    ) -> Result<bool, EngineError> {
        let mut interp = Interpreter::new(ctx.config, ctx.cancel.clone());
        let event = interp.make_event("keydown", Some("Tab"));
        interp.call_handler(handler, vec![event])?;
        Ok(interp
            .effects()
            .iter()
            .any(|e| matches!(e, DomEffect::PreventDefault)))
    }

    fn check_touch(&self, ctx: &AnalyzerContext, findings: &mut Vec<Finding>) {
        for script in ctx.scripts() {
            // no event table at all: skip rather than guess
            if !script
                .bindings
                .iter()
                .any(|b| b.action_type == ActionType::EventHandler)
            {
                continue;
            }
            let by_ref = group_by_ref(&script.bindings);
            for (element_ref, bindings) in by_ref {
                let touch = bindings
                    .iter()
                    .find(|b| b.is_event("touchstart") || b.is_event("touchend"));
                let Some(touch) = touch else { continue };
                if bindings.iter().any(|b| b.is_event("click")) {
                    continue;
                }
                let location = touch
                    .span
                    .as_ref()
                    .map(Location::from_span)
                    .unwrap_or_else(|| Location::new(&script.source_path, 1, 1));
                findings.push(
                    Finding::new(
                        kinds::TOUCH_WITHOUT_CLICK,
                        Severity::Warning,
                        format!(
                            "`{}` handles touch events but has no click handler",
                            element_ref
                        ),
                        location,
                        ctx.confidence(),
                    )
                    .with_wcag(&["2.1.1"]),
                );
            }
        }
    }
}

fn ref_suggests_native_control(element_ref: &str) -> bool {
    let name = element_ref
        .trim_start_matches(|c| c == '#' || c == '.')
        .to_lowercase();
    if NATIVE_INTERACTIVE_TAGS.contains(&name.as_str()) {
        return true;
    }
    ["button", "btn", "input", "select", "textarea", "link", "anchor"]
        .iter()
        .any(|hint| name.contains(hint))
}

/// Stable grouping of bindings by element reference.
fn group_by_ref(bindings: &[HandlerBinding]) -> Vec<(String, Vec<&HandlerBinding>)> {
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Vec<&HandlerBinding>> = HashMap::new();
    for binding in bindings {
        if !map.contains_key(&binding.element_ref) {
            order.push(binding.element_ref.clone());
        }
        map.entry(binding.element_ref.clone()).or_default().push(binding);
    }
    order
        .into_iter()
        .map(|key| {
            let value = map.remove(&key).unwrap_or_default();
            (key, value)
        })
        .collect()
}
