//! Accessibility-relevant call pattern detection
//!
//! Tags `call` nodes whose callee matches a known idiom so rules and the
//! binding extractor can find them without re-deriving callee shapes.

use super::ir::{Action, ActionKind};

/// Closed set of call idioms tagged onto `call` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPattern {
    EventHandler,
    DomAccess,
    Timer,
    FocusOp,
    AriaChange,
}

impl CallPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPattern::EventHandler => "eventHandler",
            CallPattern::DomAccess => "domAccess",
            CallPattern::Timer => "timer",
            CallPattern::FocusOp => "focusOp",
            CallPattern::AriaChange => "ariaChange",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "eventHandler" => Some(CallPattern::EventHandler),
            "domAccess" => Some(CallPattern::DomAccess),
            "timer" => Some(CallPattern::Timer),
            "focusOp" => Some(CallPattern::FocusOp),
            "ariaChange" => Some(CallPattern::AriaChange),
            _ => None,
        }
    }
}

const TIMER_NAMES: &[&str] = &[
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "requestAnimationFrame",
    "cancelAnimationFrame",
];

const DOM_LOOKUP_SUFFIXES: &[&str] = &[
    ".getElementById",
    ".querySelector",
    ".querySelectorAll",
    ".getElementsByClassName",
    ".getElementsByTagName",
    ".closest",
    ".createElement",
];

/// Classify a call by its dotted callee path and lowered arguments.
pub fn detect(callee: &str, args: &[&Action]) -> Option<CallPattern> {
    if callee.ends_with(".addEventListener") || callee.ends_with(".removeEventListener") {
        return Some(CallPattern::EventHandler);
    }
    let last = callee.rsplit('.').next().unwrap_or(callee);
    if TIMER_NAMES.contains(&last) && callee_is_global_or_window(callee) {
        return Some(CallPattern::Timer);
    }
    if callee.ends_with(".focus") || callee.ends_with(".blur") {
        return Some(CallPattern::FocusOp);
    }
    if callee.ends_with(".setAttribute")
        || callee.ends_with(".removeAttribute")
        || callee.ends_with(".toggleAttribute")
    {
        if let Some(attr) = first_literal_arg(args) {
            if attr.starts_with("aria-") || attr == "role" {
                return Some(CallPattern::AriaChange);
            }
        }
        return None;
    }
    if DOM_LOOKUP_SUFFIXES.iter().any(|s| callee.ends_with(s)) {
        return Some(CallPattern::DomAccess);
    }
    None
}

fn callee_is_global_or_window(callee: &str) -> bool {
    !callee.contains('.') || callee.starts_with("window.") || callee.starts_with("self.")
}

fn first_literal_arg(args: &[&Action]) -> Option<String> {
    let first = args.first()?;
    if first.kind == ActionKind::Literal {
        first.attr_str("value").map(|s| s.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: &str) -> Action {
        Action::new(ActionKind::Literal).with_attr("value", value)
    }

    #[test]
    fn should_detect_event_handler_registration() {
        assert_eq!(
            detect("button.addEventListener", &[]),
            Some(CallPattern::EventHandler)
        );
    }

    #[test]
    fn should_detect_timers_only_as_globals() {
        assert_eq!(detect("setTimeout", &[]), Some(CallPattern::Timer));
        assert_eq!(detect("window.setInterval", &[]), Some(CallPattern::Timer));
        assert_eq!(detect("scheduler.setTimeout", &[]), None);
    }

    #[test]
    fn should_detect_focus_operations() {
        assert_eq!(detect("input.focus", &[]), Some(CallPattern::FocusOp));
        assert_eq!(detect("el.blur", &[]), Some(CallPattern::FocusOp));
    }

    #[test]
    fn should_detect_aria_attribute_writes() {
        let attr = literal("aria-expanded");
        assert_eq!(
            detect("el.setAttribute", &[&attr]),
            Some(CallPattern::AriaChange)
        );
        let role = literal("role");
        assert_eq!(
            detect("el.setAttribute", &[&role]),
            Some(CallPattern::AriaChange)
        );
        let plain = literal("data-x");
        assert_eq!(detect("el.setAttribute", &[&plain]), None);
    }

    #[test]
    fn should_detect_dom_lookups() {
        assert_eq!(
            detect("document.getElementById", &[]),
            Some(CallPattern::DomAccess)
        );
        assert_eq!(
            detect("document.createElement", &[]),
            Some(CallPattern::DomAccess)
        );
    }
}
