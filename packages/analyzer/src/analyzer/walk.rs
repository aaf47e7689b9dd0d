//! IR queries shared across rules
//!
//! Keyboard behavior and navigation are detected structurally on the
//! Action IR (key comparisons, switch discriminants, navigation sinks),
//! never by substring matching over source text.

use std::collections::HashSet;

use crate::action::{Action, ActionKind, ChildRole};
use crate::model::handler::action_dotted_path;

const KEY_PROPERTIES: &[&str] = &["key", "code", "keyCode", "which"];

/// Map legacy numeric key codes onto key names.
fn key_code_name(code: i64) -> Option<&'static str> {
    match code {
        9 => Some("tab"),
        13 => Some("enter"),
        27 => Some("escape"),
        32 => Some(" "),
        35 => Some("end"),
        36 => Some("home"),
        37 => Some("arrowleft"),
        38 => Some("arrowup"),
        39 => Some("arrowright"),
        40 => Some("arrowdown"),
        _ => None,
    }
}

fn is_key_property_access(node: &Action) -> bool {
    if node.kind == ActionKind::MemberAccess {
        if let Some(property) = node.attr_str("property") {
            return KEY_PROPERTIES.contains(&property);
        }
    }
    // tolerate `.key.toLowerCase()` style chains
    if node.kind == ActionKind::Call {
        if let Some(callee) = node.attr_str("callee") {
            return KEY_PROPERTIES
                .iter()
                .any(|p| callee.contains(&format!(".{}.", p)));
        }
    }
    false
}

fn normalized_key_literal(node: &Action) -> Option<String> {
    if node.kind != ActionKind::Literal {
        return None;
    }
    if let Some(code) = node.attr_int("value") {
        return key_code_name(code).map(|k| k.to_string());
    }
    node.attr_str("value").map(|s| {
        let lowered = s.to_lowercase();
        match lowered.as_str() {
            "esc" => "escape".to_string(),
            "space" | "spacebar" => " ".to_string(),
            "left" => "arrowleft".to_string(),
            "right" => "arrowright".to_string(),
            "up" => "arrowup".to_string(),
            "down" => "arrowdown".to_string(),
            _ => lowered,
        }
    })
}

/// Every key name a handler body compares against, lowercased
/// (`"enter"`, `" "`, `"escape"`, `"arrowleft"`, ...).
pub fn collect_key_literals(body: &Action) -> HashSet<String> {
    let mut keys = HashSet::new();
    body.walk(&mut |node| {
        match node.kind {
            ActionKind::BinaryOp => {
                let op = node.attr_str("op").unwrap_or("");
                if matches!(op, "==" | "===" | "!=" | "!==") {
                    let left = node.child_by_role(ChildRole::Left);
                    let right = node.child_by_role(ChildRole::Right);
                    if let (Some(left), Some(right)) = (left, right) {
                        let pair = if is_key_property_access(left) {
                            Some(right)
                        } else if is_key_property_access(right) {
                            Some(left)
                        } else {
                            None
                        };
                        if let Some(literal) = pair.and_then(normalized_key_literal) {
                            keys.insert(literal);
                        }
                    }
                }
            }
            ActionKind::Switch => {
                let key_switch = node
                    .child_by_role(ChildRole::Discriminant)
                    .map(is_key_property_access)
                    .unwrap_or(false);
                if key_switch {
                    for case in node.children_by_role(ChildRole::Body) {
                        if let Some(literal) =
                            case.child_by_role(ChildRole::Test).and_then(normalized_key_literal)
                        {
                            keys.insert(literal);
                        }
                    }
                }
            }
            _ => {}
        }
        true
    });
    keys
}

/// Whether the body calls `preventDefault` anywhere.
pub fn has_prevent_default(body: &Action) -> bool {
    !body
        .find_all(&|node| {
            node.kind == ActionKind::Call
                && node
                    .attr_str("callee")
                    .map(|c| c.ends_with(".preventDefault"))
                    .unwrap_or(false)
        })
        .is_empty()
}

/// First navigation construct in a subtree: a write to a location/href
/// sink, a `location.assign|replace|reload` call, or a form `.submit()`.
pub fn find_navigation(body: &Action) -> Option<&Action> {
    let mut found: Option<&Action> = None;
    body.walk(&mut |node| {
        if found.is_some() {
            return false;
        }
        match node.kind {
            ActionKind::Assign => {
                if let Some(left) = node.child_by_role(ChildRole::Left) {
                    if let Some(path) = action_dotted_path(left) {
                        if path.ends_with(".href")
                            || path == "window.location"
                            || path == "document.location"
                        {
                            found = Some(node);
                            return false;
                        }
                    }
                }
            }
            ActionKind::Call => {
                if let Some(callee) = node.attr_str("callee") {
                    let method = callee.rsplit('.').next().unwrap_or("");
                    let on_location = callee == format!("location.{}", method)
                        || callee.contains("location.");
                    if on_location && matches!(method, "assign" | "replace" | "reload") {
                        found = Some(node);
                        return false;
                    }
                    if method == "submit" && callee.contains('.') {
                        found = Some(node);
                        return false;
                    }
                }
            }
            _ => {}
        }
        true
    });
    found
}

/// First form-submit call in a subtree.
pub fn find_form_submit(body: &Action) -> Option<&Action> {
    let mut found: Option<&Action> = None;
    body.walk(&mut |node| {
        if found.is_some() {
            return false;
        }
        if node.kind == ActionKind::Call {
            if let Some(callee) = node.attr_str("callee") {
                let method = callee.rsplit('.').next().unwrap_or("");
                if method == "submit" && callee.contains('.') {
                    found = Some(node);
                    return false;
                }
            }
        }
        true
    });
    found
}

/// First major DOM replacement in a subtree (`innerHTML =`, `remove()`,
/// `removeChild()`).
pub fn find_dom_replacement(body: &Action) -> Option<&Action> {
    let mut found: Option<&Action> = None;
    body.walk(&mut |node| {
        if found.is_some() {
            return false;
        }
        match node.kind {
            ActionKind::Assign => {
                if let Some(left) = node.child_by_role(ChildRole::Left) {
                    if left.attr_str("property") == Some("innerHTML") {
                        found = Some(node);
                        return false;
                    }
                }
            }
            ActionKind::Call => {
                if let Some(callee) = node.attr_str("callee") {
                    let method = callee.rsplit('.').next().unwrap_or("");
                    if matches!(method, "remove" | "removeChild") && callee.contains('.') {
                        found = Some(node);
                        return false;
                    }
                }
            }
            _ => {}
        }
        true
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::lower_program;
    use crate::script::Parser;

    fn lower(source: &str) -> crate::action::ActionTree {
        let result = Parser::new().parse(source, "t.js");
        let file = crate::parse_util::SourceFile::new("t.js", source);
        lower_program(&result.program, file)
    }

    #[test]
    fn should_collect_keys_from_comparisons() {
        let tree = lower("el.addEventListener('keydown', e => { if (e.key === 'Enter') go(); });");
        let keys = collect_key_literals(&tree.root);
        assert!(keys.contains("enter"));
    }

    #[test]
    fn should_collect_keys_from_switch_and_key_codes() {
        let tree = lower(
            "function h(e) { switch (e.keyCode) { case 27: close(); break; case 37: prev(); } }",
        );
        let keys = collect_key_literals(&tree.root);
        assert!(keys.contains("escape"));
        assert!(keys.contains("arrowleft"));
    }

    #[test]
    fn should_find_navigation_sinks() {
        let tree = lower("window.location = '/next';");
        assert!(find_navigation(&tree.root).is_some());
        let tree = lower("location.assign('/x');");
        assert!(find_navigation(&tree.root).is_some());
        let tree = lower("form.submit();");
        assert!(find_navigation(&tree.root).is_some());
        let tree = lower("doWork();");
        assert!(find_navigation(&tree.root).is_none());
    }

    #[test]
    fn should_detect_prevent_default() {
        let tree = lower("el.addEventListener('keydown', e => e.preventDefault());");
        assert!(has_prevent_default(&tree.root));
    }
}
