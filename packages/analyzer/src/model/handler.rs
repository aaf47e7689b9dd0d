//! Action-language handler bindings
//!
//! Walks a lowered script tree and extracts the bindings between element
//! references and behavior: event handlers, focus changes, ARIA state
//! writes, DOM manipulation, navigation. `element_ref` is a selector when
//! a DOM lookup is statically traceable, else the receiver's name.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::action::{Action, ActionKind, ActionTree, ChildRole};
use crate::parse_util::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    EventHandler,
    FocusChange,
    AriaStateChange,
    DomManipulation,
    Navigation,
    Portal,
    EventPropagation,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::EventHandler => "eventHandler",
            ActionType::FocusChange => "focusChange",
            ActionType::AriaStateChange => "ariaStateChange",
            ActionType::DomManipulation => "domManipulation",
            ActionType::Navigation => "navigation",
            ActionType::Portal => "portal",
            ActionType::EventPropagation => "eventPropagation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    Delayed,
    Conditional,
    Deferred,
}

#[derive(Debug, Clone)]
pub struct HandlerBinding {
    pub element_ref: String,
    pub action_type: ActionType,
    pub event: Option<String>,
    /// The handler body subtree for event handlers; `None` for bindings
    /// that are themselves the behavior (focus calls, attribute writes).
    pub handler: Option<Action>,
    pub timing: Timing,
    pub metadata: IndexMap<String, String>,
    pub span: Option<Span>,
}

impl HandlerBinding {
    pub fn is_event(&self, event: &str) -> bool {
        self.action_type == ActionType::EventHandler && self.event.as_deref() == Some(event)
    }

    pub fn is_keyboard_event(&self) -> bool {
        matches!(
            (self.action_type, self.event.as_deref()),
            (ActionType::EventHandler, Some("keydown" | "keypress" | "keyup"))
        )
    }
}

/// One per JS source: the lowered tree plus its extracted bindings.
#[derive(Debug, Clone)]
pub struct ActionLanguageModel {
    pub source_path: String,
    pub tree: ActionTree,
    pub bindings: Vec<HandlerBinding>,
}

impl ActionLanguageModel {
    pub fn build(tree: ActionTree, source_path: impl Into<String>) -> Self {
        let mut extractor = Extractor {
            env: HashMap::new(),
            bindings: Vec::new(),
        };
        extractor.walk(&tree.root, Timing::Immediate);
        ActionLanguageModel {
            source_path: source_path.into(),
            tree,
            bindings: extractor.bindings,
        }
    }

    pub fn find_by_selector(&self, selector: &str) -> Vec<&HandlerBinding> {
        self.bindings
            .iter()
            .filter(|b| b.element_ref == selector)
            .collect()
    }

    pub fn find_by_action_type(&self, action_type: ActionType) -> Vec<&HandlerBinding> {
        self.bindings
            .iter()
            .filter(|b| b.action_type == action_type)
            .collect()
    }
}

/// Where a traced variable points.
#[derive(Debug, Clone)]
enum RefOrigin {
    Selector(String),
    Created(String),
}

struct Extractor {
    env: HashMap<String, RefOrigin>,
    bindings: Vec<HandlerBinding>,
}

impl Extractor {
    fn walk(&mut self, node: &Action, timing: Timing) {
        if node.kind.is_function_like() {
            let before = self.bindings.len();
            for child in node.child_nodes() {
                self.walk(child, timing);
            }
            for binding in &mut self.bindings[before..] {
                binding
                    .metadata
                    .entry("in_function".to_string())
                    .or_insert_with(|| "true".to_string());
            }
            return;
        }
        match &node.kind {
            ActionKind::DeclareVar | ActionKind::DeclareConst => {
                if let (Some(name), Some(init)) =
                    (node.attr_str("name"), node.child_by_role(ChildRole::Init))
                {
                    if let Some(origin) = dom_access_origin(init) {
                        self.env.insert(name.to_string(), origin);
                    }
                }
            }
            ActionKind::Assign => {
                self.extract_assignment(node, timing);
                if let (Some(left), Some(right)) = (
                    node.child_by_role(ChildRole::Left),
                    node.child_by_role(ChildRole::Right),
                ) {
                    if left.kind == ActionKind::Identifier {
                        if let (Some(name), Some(origin)) =
                            (left.attr_str("name"), dom_access_origin(right))
                        {
                            self.env.insert(name.to_string(), origin);
                        }
                    }
                }
            }
            ActionKind::Call => self.extract_call(node, timing),
            _ => {}
        }

        // descend with timing adjusted by the construct we pass through
        match &node.kind {
            ActionKind::Call => {
                let callee = node.attr_str("callee").unwrap_or("");
                let child_timing = if node.attr_str("pattern") == Some("timer") {
                    Timing::Delayed
                } else if callee.ends_with(".then")
                    || callee.ends_with(".catch")
                    || callee.ends_with(".finally")
                {
                    Timing::Deferred
                } else {
                    timing
                };
                for child in node.child_nodes() {
                    self.walk(child, child_timing);
                }
            }
            ActionKind::If | ActionKind::Conditional | ActionKind::Switch => {
                for child in &node.children {
                    let child_timing = match child.role {
                        Some(ChildRole::Condition) | Some(ChildRole::Discriminant) => timing,
                        _ if timing == Timing::Immediate => Timing::Conditional,
                        _ => timing,
                    };
                    self.walk(&child.node, child_timing);
                }
            }
            _ => {
                for child in node.child_nodes() {
                    self.walk(child, timing);
                }
            }
        }
    }

    fn extract_call(&mut self, node: &Action, timing: Timing) {
        let callee = node.attr_str("callee").unwrap_or("").to_string();
        let pattern = node.attr_str("pattern");
        let args: Vec<&Action> = node.children_by_role(ChildRole::Argument).collect();
        let receiver = node
            .child_by_role(ChildRole::Callee)
            .and_then(|c| c.child_by_role(ChildRole::Object));

        match pattern {
            Some("eventHandler") if callee.ends_with(".addEventListener") => {
                let event = args.first().and_then(|a| literal_str(a));
                let handler = args
                    .get(1)
                    .filter(|a| a.kind.is_function_like())
                    .map(|a| (*a).clone());
                let (element_ref, metadata) = self.resolve_receiver(receiver);
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::EventHandler,
                    event,
                    handler,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            Some("focusOp") => {
                let (element_ref, mut metadata) = self.resolve_receiver(receiver);
                let op = callee.rsplit('.').next().unwrap_or("focus").to_string();
                metadata.insert("op".to_string(), op);
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::FocusChange,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            Some("ariaChange") => {
                let (element_ref, mut metadata) = self.resolve_receiver(receiver);
                if let Some(attribute) = args.first().and_then(|a| literal_str(a)) {
                    metadata.insert("attribute".to_string(), attribute);
                }
                match args.get(1).and_then(|a| literal_str(a)) {
                    Some(value) => {
                        metadata.insert("value".to_string(), value);
                        metadata.insert("static_value".to_string(), "true".to_string());
                    }
                    None if args.len() > 1 => {
                        metadata.insert("static_value".to_string(), "false".to_string());
                    }
                    None => {}
                }
                let op = callee.rsplit('.').next().unwrap_or("setAttribute").to_string();
                metadata.insert("op".to_string(), op);
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::AriaStateChange,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            _ => {
                self.extract_unpatterned_call(node, &callee, receiver, &args, timing);
            }
        }
    }

    fn extract_unpatterned_call(
        &mut self,
        node: &Action,
        callee: &str,
        receiver: Option<&Action>,
        args: &[&Action],
        timing: Timing,
    ) {
        let method = callee.rsplit('.').next().unwrap_or("");
        match method {
            "appendChild" | "removeChild" | "insertBefore" | "replaceChild" | "remove" => {
                let (element_ref, mut metadata) = self.resolve_receiver(receiver);
                metadata.insert("op".to_string(), method.to_string());
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::DomManipulation,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            "submit" if callee.contains('.') => {
                let (element_ref, mut metadata) = self.resolve_receiver(receiver);
                metadata.insert("op".to_string(), "submit".to_string());
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::Navigation,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            "assign" | "replace" | "reload"
                if callee.contains("location.") || callee == format!("location.{}", method) =>
            {
                let mut metadata = IndexMap::new();
                metadata.insert("op".to_string(), method.to_string());
                if let Some(url) = args.first().and_then(|a| literal_str(a)) {
                    metadata.insert("url".to_string(), url);
                }
                self.bindings.push(HandlerBinding {
                    element_ref: "window".to_string(),
                    action_type: ActionType::Navigation,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            "preventDefault" | "stopPropagation" | "stopImmediatePropagation" => {
                let (element_ref, mut metadata) = self.resolve_receiver(receiver);
                metadata.insert("op".to_string(), method.to_string());
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::EventPropagation,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
            _ if callee.ends_with("createPortal") => {
                self.bindings.push(HandlerBinding {
                    element_ref: "document.body".to_string(),
                    action_type: ActionType::Portal,
                    event: None,
                    handler: None,
                    timing,
                    metadata: IndexMap::new(),
                    span: node.span.clone(),
                });
            }
            _ => {}
        }
    }

    fn extract_assignment(&mut self, node: &Action, timing: Timing) {
        let Some(left) = node.child_by_role(ChildRole::Left) else {
            return;
        };
        let right = node.child_by_role(ChildRole::Right);
        if left.kind != ActionKind::MemberAccess {
            return;
        }
        let property = left.attr_str("property").unwrap_or("");
        let receiver = left.child_by_role(ChildRole::Object);

        // `el.onclick = handler`
        if let Some(event) = property.strip_prefix("on") {
            if !event.is_empty() && right.map(|r| r.kind.is_function_like()).unwrap_or(false) {
                let (element_ref, metadata) = self.resolve_receiver(receiver);
                self.bindings.push(HandlerBinding {
                    element_ref,
                    action_type: ActionType::EventHandler,
                    event: Some(event.to_string()),
                    handler: right.cloned(),
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
                return;
            }
        }

        // textual DOM mutation
        if matches!(property, "innerHTML" | "textContent" | "innerText" | "outerHTML") {
            let (element_ref, mut metadata) = self.resolve_receiver(receiver);
            metadata.insert("op".to_string(), property.to_string());
            metadata.insert("textual".to_string(), "true".to_string());
            self.bindings.push(HandlerBinding {
                element_ref,
                action_type: ActionType::DomManipulation,
                event: None,
                handler: None,
                timing,
                metadata,
                span: node.span.clone(),
            });
            return;
        }

        // navigation sinks: `window.location = ...`, `location.href = ...`
        let left_path = action_dotted_path(left);
        if let Some(path) = &left_path {
            let is_navigation = matches!(
                path.as_str(),
                "window.location"
                    | "document.location"
                    | "location.href"
                    | "window.location.href"
                    | "document.location.href"
            ) || path.ends_with(".href");
            if is_navigation {
                let mut metadata = IndexMap::new();
                metadata.insert("op".to_string(), "assign".to_string());
                if let Some(url) = right.and_then(literal_str) {
                    metadata.insert("url".to_string(), url);
                }
                metadata.insert("sink".to_string(), path.clone());
                self.bindings.push(HandlerBinding {
                    element_ref: "window".to_string(),
                    action_type: ActionType::Navigation,
                    event: None,
                    handler: None,
                    timing,
                    metadata,
                    span: node.span.clone(),
                });
            }
        }
    }

    fn resolve_receiver(&self, receiver: Option<&Action>) -> (String, IndexMap<String, String>) {
        let mut metadata = IndexMap::new();
        let Some(receiver) = receiver else {
            return ("<unknown>".to_string(), metadata);
        };
        if let Some(origin) = dom_access_origin(receiver) {
            return match origin {
                RefOrigin::Selector(selector) => (selector, metadata),
                RefOrigin::Created(tag) => {
                    metadata.insert("created_tag".to_string(), tag);
                    ("<created>".to_string(), metadata)
                }
            };
        }
        if receiver.kind == ActionKind::Identifier {
            let name = receiver.attr_str("name").unwrap_or("<unknown>");
            if let Some(origin) = self.env.get(name) {
                return match origin {
                    RefOrigin::Selector(selector) => (selector.clone(), metadata),
                    RefOrigin::Created(tag) => {
                        metadata.insert("created_tag".to_string(), tag.clone());
                        (name.to_string(), metadata)
                    }
                };
            }
            return (name.to_string(), metadata);
        }
        if let Some(path) = action_dotted_path(receiver) {
            return (path, metadata);
        }
        ("<expr>".to_string(), metadata)
    }
}

/// Selector (or created-element tag) produced by a DOM lookup call.
fn dom_access_origin(node: &Action) -> Option<RefOrigin> {
    if node.kind != ActionKind::Call || node.attr_str("pattern") != Some("domAccess") {
        return None;
    }
    let callee = node.attr_str("callee")?;
    let arg = node
        .children_by_role(ChildRole::Argument)
        .next()
        .and_then(literal_str)?;
    let method = callee.rsplit('.').next()?;
    match method {
        "getElementById" => Some(RefOrigin::Selector(format!("#{}", arg))),
        "querySelector" | "querySelectorAll" | "closest" => Some(RefOrigin::Selector(arg)),
        "getElementsByClassName" => Some(RefOrigin::Selector(format!(".{}", arg))),
        "getElementsByTagName" => Some(RefOrigin::Selector(arg)),
        "createElement" => Some(RefOrigin::Created(arg)),
        _ => None,
    }
}

fn literal_str(node: &Action) -> Option<String> {
    if node.kind == ActionKind::Literal {
        node.attr_str("value").map(|s| s.to_string())
    } else {
        None
    }
}

/// Dotted path of identifier/member chains (`window.location.href`).
pub fn action_dotted_path(node: &Action) -> Option<String> {
    match node.kind {
        ActionKind::Identifier => node.attr_str("name").map(|s| s.to_string()),
        ActionKind::MemberAccess => {
            let object = action_dotted_path(node.child_by_role(ChildRole::Object)?)?;
            let property = node.attr_str("property")?;
            Some(format!("{}.{}", object, property))
        }
        _ => None,
    }
}
