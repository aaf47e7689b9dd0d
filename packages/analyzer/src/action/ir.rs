//! Action IR node and tree definitions
//!
//! An `Action` is a tagged node with a typed attribute map, role-tagged
//! children and an optional source span. Role tagging is the sole
//! positional contract: control-flow constructs attach children by role,
//! never by index.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::parse_util::Span;

/// Closed set of semantic node kinds, plus a generic escape hatch for
/// syntax the transformer does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Program,
    Seq,
    Block,
    DeclareVar,
    DeclareConst,
    DeclareFunction,
    DeclareParam,
    DeclareClass,
    DeclareMethod,
    If,
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Return,
    Throw,
    Break,
    Continue,
    Call,
    New,
    MemberAccess,
    Assign,
    BinaryOp,
    UnaryOp,
    LogicalOp,
    Conditional,
    Await,
    Yield,
    ArrowFunction,
    FunctionExpr,
    Identifier,
    Literal,
    Array,
    Object,
    Property,
    Template,
    Spread,
    Import,
    Export,
    ExportDefault,
    /// Unrecognized source construct, carrying the kind string verbatim.
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Program => "program",
            ActionKind::Seq => "seq",
            ActionKind::Block => "block",
            ActionKind::DeclareVar => "declareVar",
            ActionKind::DeclareConst => "declareConst",
            ActionKind::DeclareFunction => "declareFunction",
            ActionKind::DeclareParam => "declareParam",
            ActionKind::DeclareClass => "declareClass",
            ActionKind::DeclareMethod => "declareMethod",
            ActionKind::If => "if",
            ActionKind::For => "for",
            ActionKind::ForIn => "forIn",
            ActionKind::ForOf => "forOf",
            ActionKind::While => "while",
            ActionKind::DoWhile => "doWhile",
            ActionKind::Switch => "switch",
            ActionKind::Case => "case",
            ActionKind::Default => "default",
            ActionKind::Try => "try",
            ActionKind::Catch => "catch",
            ActionKind::Finally => "finally",
            ActionKind::Return => "return",
            ActionKind::Throw => "throw",
            ActionKind::Break => "break",
            ActionKind::Continue => "continue",
            ActionKind::Call => "call",
            ActionKind::New => "new",
            ActionKind::MemberAccess => "memberAccess",
            ActionKind::Assign => "assign",
            ActionKind::BinaryOp => "binaryOp",
            ActionKind::UnaryOp => "unaryOp",
            ActionKind::LogicalOp => "logicalOp",
            ActionKind::Conditional => "conditional",
            ActionKind::Await => "await",
            ActionKind::Yield => "yield",
            ActionKind::ArrowFunction => "arrowFunction",
            ActionKind::FunctionExpr => "functionExpr",
            ActionKind::Identifier => "identifier",
            ActionKind::Literal => "literal",
            ActionKind::Array => "array",
            ActionKind::Object => "object",
            ActionKind::Property => "property",
            ActionKind::Template => "template",
            ActionKind::Spread => "spread",
            ActionKind::Import => "import",
            ActionKind::Export => "export",
            ActionKind::ExportDefault => "exportDefault",
            ActionKind::Other(name) => name,
        }
    }

    /// A function-valued node: its body children execute only when called.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            ActionKind::ArrowFunction
                | ActionKind::FunctionExpr
                | ActionKind::DeclareFunction
                | ActionKind::DeclareMethod
        )
    }
}

/// Typed attribute values on an Action node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Structural slot of a child under its parent. Closed set; which roles a
/// parent kind admits is registered in the [`ActionSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildRole {
    Condition,
    Then,
    Else,
    Init,
    Test,
    Update,
    Body,
    Callee,
    Argument,
    Left,
    Right,
    Object,
    Property,
    Variable,
    Iterable,
    Discriminant,
    Try,
    Key,
    Value,
}

impl ChildRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildRole::Condition => "condition",
            ChildRole::Then => "then",
            ChildRole::Else => "else",
            ChildRole::Init => "init",
            ChildRole::Test => "test",
            ChildRole::Update => "update",
            ChildRole::Body => "body",
            ChildRole::Callee => "callee",
            ChildRole::Argument => "argument",
            ChildRole::Left => "left",
            ChildRole::Right => "right",
            ChildRole::Object => "object",
            ChildRole::Property => "property",
            ChildRole::Variable => "variable",
            ChildRole::Iterable => "iterable",
            ChildRole::Discriminant => "discriminant",
            ChildRole::Try => "try",
            ChildRole::Key => "key",
            ChildRole::Value => "value",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionChild {
    pub role: Option<ChildRole>,
    pub node: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub attributes: IndexMap<String, AttrValue>,
    pub children: Vec<ActionChild>,
    pub span: Option<Span>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Action {
            kind,
            attributes: IndexMap::new(),
            children: Vec::new(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn add_child(&mut self, role: Option<ChildRole>, node: Action) {
        self.children.push(ActionChild { role, node });
    }

    pub fn with_child(mut self, role: Option<ChildRole>, node: Action) -> Self {
        self.add_child(role, node);
        self
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttrValue::as_str)
    }

    pub fn attr_int(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).and_then(AttrValue::as_int)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(AttrValue::as_bool)
    }

    pub fn child_by_role(&self, role: ChildRole) -> Option<&Action> {
        self.children
            .iter()
            .find(|c| c.role == Some(role))
            .map(|c| &c.node)
    }

    pub fn children_by_role(&self, role: ChildRole) -> impl Iterator<Item = &Action> {
        self.children
            .iter()
            .filter(move |c| c.role == Some(role))
            .map(|c| &c.node)
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &Action> {
        self.children.iter().map(|c| &c.node)
    }

    /// Pre-order walk. The callback returns `false` to skip a subtree.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Action) -> bool) {
        if !visit(self) {
            return;
        }
        for child in &self.children {
            child.node.walk(visit);
        }
    }

    /// Collect every node in pre-order that satisfies the predicate.
    pub fn find_all<'a>(&'a self, predicate: &dyn Fn(&Action) -> bool) -> Vec<&'a Action> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if predicate(node) {
                out.push(node);
            }
            true
        });
        out
    }
}

/// A lowered program. Owns the root Action and the warnings the
/// transformer collected while lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTree {
    pub root: Action,
    pub warnings: Vec<String>,
}

impl ActionTree {
    pub fn new(root: Action) -> Self {
        ActionTree {
            root,
            warnings: Vec::new(),
        }
    }

    pub fn schema() -> &'static ActionSchema {
        &SCHEMA
    }

    /// Validate the registered invariants: required non-leaf kinds have at
    /// least one child, roles are drawn from the per-kind closed set, and
    /// pre-order span starts are monotonically non-decreasing.
    pub fn validate(&self) -> Vec<ModelViolation> {
        let mut violations = Vec::new();
        let mut last_start: usize = 0;
        validate_node(&self.root, &SCHEMA, &mut last_start, &mut violations);
        violations
    }
}

#[derive(Debug, Clone)]
pub struct ModelViolation {
    pub message: String,
    pub span: Option<Span>,
}

fn validate_node(
    node: &Action,
    schema: &ActionSchema,
    last_start: &mut usize,
    out: &mut Vec<ModelViolation>,
) {
    if let Some(span) = &node.span {
        if span.start < *last_start {
            out.push(ModelViolation {
                message: format!(
                    "span of `{}` regresses in pre-order ({} < {})",
                    node.kind.as_str(),
                    span.start,
                    last_start
                ),
                span: Some(span.clone()),
            });
        } else {
            *last_start = span.start;
        }
    }
    if schema.requires_children(&node.kind) && node.children.is_empty() {
        out.push(ModelViolation {
            message: format!("`{}` node has no children", node.kind.as_str()),
            span: node.span.clone(),
        });
    }
    for child in &node.children {
        if let Some(role) = child.role {
            if !schema.role_allowed(&node.kind, role) {
                out.push(ModelViolation {
                    message: format!(
                        "role `{}` not allowed under `{}`",
                        role.as_str(),
                        node.kind.as_str()
                    ),
                    span: child.node.span.clone(),
                });
            }
        }
        validate_node(&child.node, schema, last_start, out);
    }
}

/// Registry of the recognized kinds, their admissible child roles and the
/// types of well-known attributes. Backs validation and introspection.
pub struct ActionSchema {
    roles: HashMap<ActionKind, &'static [ChildRole]>,
    requires_children: Vec<ActionKind>,
    attribute_types: HashMap<&'static str, &'static str>,
}

impl ActionSchema {
    pub fn role_allowed(&self, kind: &ActionKind, role: ChildRole) -> bool {
        match self.roles.get(kind) {
            Some(allowed) => allowed.contains(&role),
            // generic nodes admit any role
            None => matches!(kind, ActionKind::Other(_)),
        }
    }

    pub fn requires_children(&self, kind: &ActionKind) -> bool {
        self.requires_children.contains(kind)
    }

    pub fn attribute_type(&self, name: &str) -> Option<&'static str> {
        self.attribute_types.get(name).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ActionKind> {
        self.roles.keys()
    }
}

static SCHEMA: Lazy<ActionSchema> = Lazy::new(|| {
    use ActionKind::*;
    use ChildRole as R;

    let mut roles: HashMap<ActionKind, &'static [ChildRole]> = HashMap::new();
    roles.insert(Program, &[]);
    roles.insert(Seq, &[]);
    roles.insert(Block, &[]);
    roles.insert(DeclareVar, &[R::Init]);
    roles.insert(DeclareConst, &[R::Init]);
    roles.insert(DeclareFunction, &[R::Argument, R::Body]);
    roles.insert(DeclareParam, &[R::Init]);
    roles.insert(DeclareClass, &[R::Value, R::Body]);
    roles.insert(DeclareMethod, &[R::Argument, R::Body]);
    roles.insert(If, &[R::Condition, R::Then, R::Else]);
    roles.insert(For, &[R::Init, R::Test, R::Update, R::Body]);
    roles.insert(ForIn, &[R::Variable, R::Iterable, R::Body]);
    roles.insert(ForOf, &[R::Variable, R::Iterable, R::Body]);
    roles.insert(While, &[R::Condition, R::Body]);
    roles.insert(DoWhile, &[R::Condition, R::Body]);
    roles.insert(Switch, &[R::Discriminant, R::Body]);
    roles.insert(Case, &[R::Test, R::Body]);
    roles.insert(Default, &[R::Body]);
    roles.insert(Try, &[R::Try, R::Body]);
    roles.insert(Catch, &[R::Body]);
    roles.insert(Finally, &[R::Body]);
    roles.insert(Return, &[R::Argument]);
    roles.insert(Throw, &[R::Argument]);
    roles.insert(Break, &[]);
    roles.insert(Continue, &[]);
    roles.insert(Call, &[R::Callee, R::Argument]);
    roles.insert(New, &[R::Callee, R::Argument]);
    roles.insert(MemberAccess, &[R::Object, R::Property]);
    roles.insert(Assign, &[R::Left, R::Right]);
    roles.insert(BinaryOp, &[R::Left, R::Right]);
    roles.insert(UnaryOp, &[R::Argument]);
    roles.insert(LogicalOp, &[R::Left, R::Right]);
    roles.insert(Conditional, &[R::Condition, R::Then, R::Else]);
    roles.insert(Await, &[R::Argument]);
    roles.insert(Yield, &[R::Argument]);
    roles.insert(ArrowFunction, &[R::Argument, R::Body]);
    roles.insert(FunctionExpr, &[R::Argument, R::Body]);
    roles.insert(Identifier, &[]);
    roles.insert(Literal, &[]);
    roles.insert(Array, &[R::Value]);
    roles.insert(Object, &[R::Value]);
    roles.insert(Property, &[R::Key, R::Value]);
    roles.insert(Template, &[R::Value, R::Argument]);
    roles.insert(Spread, &[R::Argument]);
    roles.insert(Import, &[R::Value]);
    roles.insert(Export, &[R::Value]);
    roles.insert(ExportDefault, &[R::Value]);

    let requires_children = vec![
        If, For, ForIn, ForOf, While, DoWhile, Switch, Call, New, MemberAccess, Assign, BinaryOp,
        UnaryOp, LogicalOp, Conditional, Await, Spread, Property, Throw,
    ];

    let mut attribute_types = HashMap::new();
    attribute_types.insert("name", "string");
    attribute_types.insert("value", "string|int|bool");
    attribute_types.insert("raw", "string");
    attribute_types.insert("type", "string");
    attribute_types.insert("op", "string");
    attribute_types.insert("kind", "string");
    attribute_types.insert("callee", "string");
    attribute_types.insert("pattern", "string");
    attribute_types.insert("property", "string");
    attribute_types.insert("key", "string");
    attribute_types.insert("label", "string");
    attribute_types.insert("source", "string");
    attribute_types.insert("event", "string");
    attribute_types.insert("async", "bool");
    attribute_types.insert("static", "bool");
    attribute_types.insert("prefix", "bool");
    attribute_types.insert("optional", "bool");
    attribute_types.insert("delegate", "bool");

    ActionSchema {
        roles,
        requires_children,
        attribute_types,
    }
});
