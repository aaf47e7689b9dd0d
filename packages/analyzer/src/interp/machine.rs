//! Tree-walking evaluator
//!
//! Exhaustive match over the Action kinds. Hard failures (iteration or
//! call-depth caps, cancellation) surface as errors; in-language control
//! flow travels as `EvalOutcome` signals. Unknown kinds and unsupported
//! host calls evaluate to undefined with a warning, never an abort.

use std::collections::HashMap;
use std::rc::Rc;

use crate::action::{Action, ActionKind, ActionTree, ChildRole};
use crate::config::AnalyzerConfig;
use crate::engine::CancellationToken;
use crate::error::{EngineError, InterpreterError};

use super::host;
use super::outcome::EvalOutcome;
use super::scope::{BindingKind, Scope, ScopeRef};
use super::value::{format_number, FunctionValue, ObjectData, Value};

type EvalResult = Result<EvalOutcome, EngineError>;

macro_rules! eval_value {
    ($self:expr, $node:expr, $scope:expr) => {
        match $self.eval($node, $scope)? {
            EvalOutcome::Value(v) => v,
            other => return Ok(other),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
    AnimationFrame,
}

#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub id: i64,
    pub kind: TimerKind,
    pub delay_ms: f64,
}

/// Observable host effect recorded during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEffect {
    SetAttribute { target: String, name: String, value: String },
    RemoveAttribute { target: String, name: String },
    AddEventListener { target: String, event: String },
    RemoveEventListener { target: String, event: String },
    Focus { target: String },
    Blur { target: String },
    Click { target: String },
    PreventDefault,
    StopPropagation,
    SetProperty { target: String, name: String },
    ClassChange { target: String },
    DomMutation { target: String, op: String },
    Navigate { url: String },
    Dialog { kind: String, message: String },
}

const STRING_METHODS: &[&str] = &[
    "charAt", "charCodeAt", "at", "toUpperCase", "toLowerCase", "trim", "trimStart", "trimEnd",
    "includes", "indexOf", "lastIndexOf", "startsWith", "endsWith", "slice", "substring",
    "split", "replace", "replaceAll", "repeat", "padStart", "padEnd", "concat", "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "indexOf", "lastIndexOf", "includes", "join", "slice",
    "concat", "reverse", "fill", "find", "findIndex", "filter", "map", "forEach", "some",
    "every", "reduce", "sort", "flat", "keys", "toString",
];

pub struct Interpreter {
    max_iterations: usize,
    max_call_depth: usize,
    dom_simulation: bool,
    cancel: CancellationToken,
    root: ScopeRef,
    call_depth: usize,
    console: Vec<String>,
    warnings: Vec<String>,
    effects: Vec<DomEffect>,
    timers: Vec<ScheduledTimer>,
    cancelled_timers: Vec<i64>,
    next_timer_id: i64,
    elements_by_key: HashMap<String, Value>,
}

impl Interpreter {
    pub fn new(config: &AnalyzerConfig, cancel: CancellationToken) -> Self {
        Interpreter {
            max_iterations: config.max_iterations,
            max_call_depth: config.max_call_depth,
            dom_simulation: config.enable_dom_simulation,
            cancel,
            root: host::create_root_scope(config.enable_dom_simulation),
            call_depth: 0,
            console: Vec::new(),
            warnings: Vec::new(),
            effects: Vec::new(),
            timers: Vec::new(),
            cancelled_timers: Vec::new(),
            next_timer_id: 1,
            elements_by_key: HashMap::new(),
        }
    }

    pub fn root_scope(&self) -> ScopeRef {
        self.root.clone()
    }

    pub fn console_output(&self) -> &[String] {
        &self.console
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn effects(&self) -> &[DomEffect] {
        &self.effects
    }

    pub fn timers(&self) -> &[ScheduledTimer] {
        &self.timers
    }

    pub fn cancelled_timers(&self) -> &[i64] {
        &self.cancelled_timers
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// Evaluate a whole tree in the root scope.
    pub fn run(&mut self, tree: &ActionTree) -> Result<Value, EngineError> {
        let children: Vec<&Action> = tree.root.child_nodes().collect();
        let scope = self.root.clone();
        match self.eval_statements(&children, &scope)? {
            EvalOutcome::Throw(err) => Err(InterpreterError::UncaughtThrow {
                message: err.to_js_string(),
            }
            .into()),
            outcome => Ok(outcome.into_value()),
        }
    }

    /// Call a function-valued Action (an event handler body) with the
    /// given arguments.
    pub fn call_handler(&mut self, handler: &Action, args: Vec<Value>) -> Result<Value, EngineError> {
        let scope = self.root.clone();
        let func = self.make_function(handler, &scope);
        match self.call_value(func, Value::Undefined, args)? {
            EvalOutcome::Throw(err) => Err(InterpreterError::UncaughtThrow {
                message: err.to_js_string(),
            }
            .into()),
            outcome => Ok(outcome.into_value()),
        }
    }

    /// Synthetic event object for handler simulation.
    pub fn make_event(&self, event_type: &str, key: Option<&str>) -> Value {
        host::make_event(event_type, key)
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn tick(&mut self, iterations: &mut usize) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(InterpreterError::Cancelled.into());
        }
        *iterations += 1;
        if *iterations > self.max_iterations {
            return Err(InterpreterError::IterationLimit {
                limit: self.max_iterations,
            }
            .into());
        }
        Ok(())
    }

    // ---- statement sequences ----

    /// Evaluate a statement list with function hoisting.
    fn eval_statements(&mut self, stmts: &[&Action], scope: &ScopeRef) -> EvalResult {
        for stmt in stmts {
            if stmt.kind == ActionKind::DeclareFunction {
                let func = self.make_function(stmt, scope);
                if let Some(name) = stmt.attr_str("name") {
                    Scope::declare(scope, name, func, BindingKind::Var);
                }
            }
        }
        let mut last = Value::Undefined;
        for stmt in stmts {
            if stmt.kind == ActionKind::DeclareFunction {
                continue;
            }
            match self.eval(stmt, scope)? {
                EvalOutcome::Value(v) => last = v,
                abrupt => return Ok(abrupt),
            }
        }
        Ok(EvalOutcome::Value(last))
    }

    fn body_children<'a>(&self, node: &'a Action) -> Vec<&'a Action> {
        node.children_by_role(ChildRole::Body).collect()
    }

    // ---- the evaluator ----

    pub fn eval(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        match &node.kind {
            ActionKind::Program => {
                let children: Vec<&Action> = node.child_nodes().collect();
                self.eval_statements(&children, scope)
            }
            ActionKind::Seq => {
                let children: Vec<&Action> = node.child_nodes().collect();
                self.eval_statements(&children, scope)
            }
            ActionKind::Block => {
                let children: Vec<&Action> = node.child_nodes().collect();
                let block_scope = Scope::child(scope);
                self.eval_statements(&children, &block_scope)
            }
            ActionKind::DeclareVar | ActionKind::DeclareConst => {
                let value = match node.child_by_role(ChildRole::Init) {
                    Some(init) => eval_value!(self, init, scope),
                    None => Value::Undefined,
                };
                let kind = if node.kind == ActionKind::DeclareConst {
                    BindingKind::Const
                } else if node.attr_str("kind") == Some("let") {
                    BindingKind::Let
                } else {
                    BindingKind::Var
                };
                if let Some(name) = node.attr_str("name") {
                    Scope::declare(scope, name, value, kind);
                }
                Ok(EvalOutcome::undefined())
            }
            ActionKind::DeclareFunction => {
                let func = self.make_function(node, scope);
                if let Some(name) = node.attr_str("name") {
                    Scope::declare(scope, name, func, BindingKind::Var);
                }
                Ok(EvalOutcome::undefined())
            }
            ActionKind::DeclareClass => {
                let mut class = ObjectData::new("Class");
                for method in node.children_by_role(ChildRole::Body) {
                    if method.kind == ActionKind::DeclareMethod {
                        if let Some(name) = method.attr_str("name") {
                            let func = self.make_function(method, scope);
                            class.properties.insert(name.to_string(), func);
                        }
                    }
                }
                if let Some(name) = node.attr_str("name") {
                    Scope::declare(scope, name, Value::object(class), BindingKind::Let);
                }
                Ok(EvalOutcome::undefined())
            }
            ActionKind::DeclareMethod | ActionKind::DeclareParam => Ok(EvalOutcome::undefined()),
            ActionKind::If => {
                let condition = match node.child_by_role(ChildRole::Condition) {
                    Some(c) => eval_value!(self, c, scope),
                    None => Value::Undefined,
                };
                if condition.is_truthy() {
                    if let Some(then) = node.child_by_role(ChildRole::Then) {
                        return self.eval(then, scope);
                    }
                } else if let Some(alt) = node.child_by_role(ChildRole::Else) {
                    return self.eval(alt, scope);
                }
                Ok(EvalOutcome::undefined())
            }
            ActionKind::For => self.eval_for(node, scope),
            ActionKind::ForIn => self.eval_for_in(node, scope),
            ActionKind::ForOf => self.eval_for_of(node, scope),
            ActionKind::While => self.eval_while(node, scope, false),
            ActionKind::DoWhile => self.eval_while(node, scope, true),
            ActionKind::Switch => self.eval_switch(node, scope),
            ActionKind::Try => self.eval_try(node, scope),
            ActionKind::Catch | ActionKind::Finally => Ok(EvalOutcome::undefined()),
            ActionKind::Case | ActionKind::Default => Ok(EvalOutcome::undefined()),
            ActionKind::Return => {
                let value = match node.child_by_role(ChildRole::Argument) {
                    Some(arg) => eval_value!(self, arg, scope),
                    None => Value::Undefined,
                };
                Ok(EvalOutcome::Return(value))
            }
            ActionKind::Throw => {
                let value = match node.child_by_role(ChildRole::Argument) {
                    Some(arg) => eval_value!(self, arg, scope),
                    None => Value::Undefined,
                };
                Ok(EvalOutcome::Throw(value))
            }
            ActionKind::Break => Ok(EvalOutcome::Break(
                node.attr_str("label").map(|l| l.to_string()),
            )),
            ActionKind::Continue => Ok(EvalOutcome::Continue(
                node.attr_str("label").map(|l| l.to_string()),
            )),
            ActionKind::Call => self.eval_call(node, scope),
            ActionKind::New => self.eval_new(node, scope),
            ActionKind::MemberAccess => {
                let object = match node.child_by_role(ChildRole::Object) {
                    Some(obj) => eval_value!(self, obj, scope),
                    None => Value::Undefined,
                };
                let optional = node.attr_bool("optional").unwrap_or(false);
                if object.is_nullish() {
                    if optional {
                        return Ok(EvalOutcome::undefined());
                    }
                    return Ok(EvalOutcome::Throw(Value::Str(format!(
                        "TypeError: cannot read properties of {}",
                        object.to_js_string()
                    ))));
                }
                let name = match self.property_name(node, scope)? {
                    Ok(name) => name,
                    Err(abrupt) => return Ok(abrupt),
                };
                Ok(EvalOutcome::Value(self.get_property(&object, &name)))
            }
            ActionKind::Assign => self.eval_assign(node, scope),
            ActionKind::BinaryOp => {
                let op = node.attr_str("op").unwrap_or("").to_string();
                let left = match node.child_by_role(ChildRole::Left) {
                    Some(l) => eval_value!(self, l, scope),
                    None => Value::Undefined,
                };
                let right = match node.child_by_role(ChildRole::Right) {
                    Some(r) => eval_value!(self, r, scope),
                    None => Value::Undefined,
                };
                Ok(EvalOutcome::Value(self.apply_binary(&op, left, right)))
            }
            ActionKind::UnaryOp => self.eval_unary(node, scope),
            ActionKind::LogicalOp => {
                let op = node.attr_str("op").unwrap_or("");
                let left = match node.child_by_role(ChildRole::Left) {
                    Some(l) => eval_value!(self, l, scope),
                    None => Value::Undefined,
                };
                let take_right = match op {
                    "&&" => left.is_truthy(),
                    "||" => !left.is_truthy(),
                    "??" => left.is_nullish(),
                    _ => false,
                };
                if take_right {
                    if let Some(right) = node.child_by_role(ChildRole::Right) {
                        return self.eval(right, scope);
                    }
                }
                Ok(EvalOutcome::Value(left))
            }
            ActionKind::Conditional => {
                let condition = match node.child_by_role(ChildRole::Condition) {
                    Some(c) => eval_value!(self, c, scope),
                    None => Value::Undefined,
                };
                let branch = if condition.is_truthy() {
                    node.child_by_role(ChildRole::Then)
                } else {
                    node.child_by_role(ChildRole::Else)
                };
                match branch {
                    Some(child) => self.eval(child, scope),
                    None => Ok(EvalOutcome::undefined()),
                }
            }
            ActionKind::Await => {
                let value = match node.child_by_role(ChildRole::Argument) {
                    Some(arg) => eval_value!(self, arg, scope),
                    None => Value::Undefined,
                };
                if self.is_promise_like(&value) {
                    self.warn("await of a promise-like value returns it unchanged".to_string());
                }
                Ok(EvalOutcome::Value(value))
            }
            ActionKind::Yield => {
                let value = match node.child_by_role(ChildRole::Argument) {
                    Some(arg) => eval_value!(self, arg, scope),
                    None => Value::Undefined,
                };
                Ok(EvalOutcome::Value(value))
            }
            ActionKind::ArrowFunction | ActionKind::FunctionExpr => {
                Ok(EvalOutcome::Value(self.make_function(node, scope)))
            }
            ActionKind::Identifier => {
                let name = node.attr_str("name").unwrap_or("");
                match Scope::lookup(scope, name) {
                    Some(value) => Ok(EvalOutcome::Value(value)),
                    None => {
                        self.warn(format!("reference to undefined name `{}`", name));
                        Ok(EvalOutcome::undefined())
                    }
                }
            }
            ActionKind::Literal => Ok(EvalOutcome::Value(literal_value(node))),
            ActionKind::Array => {
                let mut items = Vec::new();
                for child in node.children_by_role(ChildRole::Value) {
                    if child.kind == ActionKind::Spread {
                        let spread = match child.child_by_role(ChildRole::Argument) {
                            Some(arg) => eval_value!(self, arg, scope),
                            None => Value::Undefined,
                        };
                        match spread {
                            Value::Array(inner) => items.extend(inner.borrow().iter().cloned()),
                            Value::Str(s) => {
                                items.extend(s.chars().map(|c| Value::Str(c.to_string())))
                            }
                            other => items.push(other),
                        }
                    } else {
                        items.push(eval_value!(self, child, scope));
                    }
                }
                Ok(EvalOutcome::Value(Value::array(items)))
            }
            ActionKind::Object => {
                let mut data = ObjectData::new("Object");
                for child in node.children_by_role(ChildRole::Value) {
                    match child.kind {
                        ActionKind::Property => {
                            let key = if let Some(key) = child.attr_str("key") {
                                key.to_string()
                            } else if let Some(computed) = child.child_by_role(ChildRole::Key) {
                                eval_value!(self, computed, scope).to_js_string()
                            } else {
                                continue;
                            };
                            let value = match child.child_by_role(ChildRole::Value) {
                                Some(v) => eval_value!(self, v, scope),
                                None => Value::Undefined,
                            };
                            data.properties.insert(key, value);
                        }
                        ActionKind::Spread => {
                            let spread = match child.child_by_role(ChildRole::Argument) {
                                Some(arg) => eval_value!(self, arg, scope),
                                None => Value::Undefined,
                            };
                            if let Value::Object(source) = spread {
                                for (k, v) in source.borrow().properties.iter() {
                                    data.properties.insert(k.clone(), v.clone());
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(EvalOutcome::Value(Value::object(data)))
            }
            ActionKind::Property => Ok(EvalOutcome::undefined()),
            ActionKind::Template => {
                let mut out = String::new();
                for child in &node.children {
                    let value = eval_value!(self, &child.node, scope);
                    out.push_str(&value.to_js_string());
                }
                Ok(EvalOutcome::Value(Value::Str(out)))
            }
            ActionKind::Spread => match node.child_by_role(ChildRole::Argument) {
                Some(arg) => self.eval(arg, scope),
                None => Ok(EvalOutcome::undefined()),
            },
            ActionKind::Import => Ok(EvalOutcome::undefined()),
            ActionKind::Export | ActionKind::ExportDefault => {
                for child in node.children_by_role(ChildRole::Value) {
                    if child.kind != ActionKind::Identifier {
                        let _ = eval_value!(self, child, scope);
                    }
                }
                Ok(EvalOutcome::undefined())
            }
            ActionKind::Other(kind) => {
                self.warn(format!("unknown action kind `{}`", kind));
                Ok(EvalOutcome::undefined())
            }
        }
    }

    // ---- control flow ----

    fn eval_for(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let loop_scope = Scope::child(scope);
        if let Some(init) = node.child_by_role(ChildRole::Init) {
            let _ = eval_value!(self, init, &loop_scope);
        }
        let mut iterations = 0usize;
        loop {
            self.tick(&mut iterations)?;
            if let Some(test) = node.child_by_role(ChildRole::Test) {
                if !eval_value!(self, test, &loop_scope).is_truthy() {
                    break;
                }
            }
            if let Some(body) = node.child_by_role(ChildRole::Body) {
                match self.eval(body, &loop_scope)? {
                    EvalOutcome::Break(_) => break,
                    EvalOutcome::Continue(_) | EvalOutcome::Value(_) => {}
                    abrupt => return Ok(abrupt),
                }
            }
            if let Some(update) = node.child_by_role(ChildRole::Update) {
                let _ = eval_value!(self, update, &loop_scope);
            }
        }
        Ok(EvalOutcome::undefined())
    }

    fn eval_while(&mut self, node: &Action, scope: &ScopeRef, do_first: bool) -> EvalResult {
        let mut iterations = 0usize;
        let mut first = do_first;
        loop {
            self.tick(&mut iterations)?;
            if !first {
                if let Some(test) = node.child_by_role(ChildRole::Condition) {
                    if !eval_value!(self, test, scope).is_truthy() {
                        break;
                    }
                }
            }
            first = false;
            if let Some(body) = node.child_by_role(ChildRole::Body) {
                match self.eval(body, scope)? {
                    EvalOutcome::Break(_) => break,
                    EvalOutcome::Continue(_) | EvalOutcome::Value(_) => {}
                    abrupt => return Ok(abrupt),
                }
            }
            if do_first {
                if let Some(test) = node.child_by_role(ChildRole::Condition) {
                    if !eval_value!(self, test, scope).is_truthy() {
                        break;
                    }
                }
                first = true; // test already consumed for the next round
            }
        }
        Ok(EvalOutcome::undefined())
    }

    fn eval_for_in(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let iterable = match node.child_by_role(ChildRole::Iterable) {
            Some(i) => eval_value!(self, i, scope),
            None => Value::Undefined,
        };
        let keys: Vec<String> = match &iterable {
            Value::Object(data) => data.borrow().properties.keys().cloned().collect(),
            Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
            Value::Str(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        self.run_for_each(node, scope, keys.into_iter().map(Value::Str).collect())
    }

    fn eval_for_of(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let iterable = match node.child_by_role(ChildRole::Iterable) {
            Some(i) => eval_value!(self, i, scope),
            None => Value::Undefined,
        };
        let items: Vec<Value> = match &iterable {
            Value::Array(items) => items.borrow().clone(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            _ => {
                self.warn("for..of over a non-iterable value".to_string());
                Vec::new()
            }
        };
        self.run_for_each(node, scope, items)
    }

    fn run_for_each(&mut self, node: &Action, scope: &ScopeRef, items: Vec<Value>) -> EvalResult {
        let variable = node
            .child_by_role(ChildRole::Variable)
            .and_then(|v| v.attr_str("name"))
            .unwrap_or("_")
            .to_string();
        let mut iterations = 0usize;
        for item in items {
            self.tick(&mut iterations)?;
            let iter_scope = Scope::child(scope);
            Scope::declare(&iter_scope, &variable, item, BindingKind::Let);
            if let Some(body) = node.child_by_role(ChildRole::Body) {
                match self.eval(body, &iter_scope)? {
                    EvalOutcome::Break(_) => break,
                    EvalOutcome::Continue(_) | EvalOutcome::Value(_) => {}
                    abrupt => return Ok(abrupt),
                }
            }
        }
        Ok(EvalOutcome::undefined())
    }

    fn eval_switch(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let discriminant = match node.child_by_role(ChildRole::Discriminant) {
            Some(d) => eval_value!(self, d, scope),
            None => Value::Undefined,
        };
        let cases: Vec<&Action> = node.children_by_role(ChildRole::Body).collect();
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if case.kind == ActionKind::Case {
                if let Some(test) = case.child_by_role(ChildRole::Test) {
                    let test_value = eval_value!(self, test, scope);
                    if discriminant.strict_eq(&test_value) {
                        start = Some(i);
                        break;
                    }
                }
            }
        }
        if start.is_none() {
            start = cases.iter().position(|c| c.kind == ActionKind::Default);
        }
        let Some(start) = start else {
            return Ok(EvalOutcome::undefined());
        };
        let switch_scope = Scope::child(scope);
        for case in &cases[start..] {
            let body: Vec<&Action> = case.children_by_role(ChildRole::Body).collect();
            match self.eval_statements(&body, &switch_scope)? {
                EvalOutcome::Break(_) => return Ok(EvalOutcome::undefined()),
                EvalOutcome::Value(_) => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(EvalOutcome::undefined())
    }

    fn eval_try(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let mut outcome = match node.child_by_role(ChildRole::Try) {
            Some(block) => self.eval(block, scope)?,
            None => EvalOutcome::undefined(),
        };
        let catch = node
            .children_by_role(ChildRole::Body)
            .find(|c| c.kind == ActionKind::Catch);
        let finally = node
            .children_by_role(ChildRole::Body)
            .find(|c| c.kind == ActionKind::Finally);

        let thrown = match &outcome {
            EvalOutcome::Throw(error) => Some(error.clone()),
            _ => None,
        };
        if let (Some(error), Some(catch)) = (thrown, catch) {
            let catch_scope = Scope::child(scope);
            if let Some(param) = catch.attr_str("name") {
                Scope::declare(&catch_scope, param, error, BindingKind::Let);
            }
            let body: Vec<&Action> = catch.children_by_role(ChildRole::Body).collect();
            outcome = self.eval_statements(&body, &catch_scope)?;
        }
        if let Some(finally) = finally {
            let body: Vec<&Action> = finally.children_by_role(ChildRole::Body).collect();
            let finally_outcome = self.eval_statements(&body, scope)?;
            if finally_outcome.is_abrupt() {
                return Ok(finally_outcome);
            }
        }
        match outcome {
            EvalOutcome::Value(_) => Ok(EvalOutcome::undefined()),
            abrupt => Ok(abrupt),
        }
    }

    // ---- functions and calls ----

    fn make_function(&mut self, node: &Action, scope: &ScopeRef) -> Value {
        let params = node
            .children_by_role(ChildRole::Argument)
            .filter(|c| c.kind == ActionKind::DeclareParam)
            .filter_map(|c| c.attr_str("name").map(|n| n.to_string()))
            .collect();
        Value::Function(Rc::new(FunctionValue {
            name: node.attr_str("name").map(|n| n.to_string()),
            params,
            body: node.clone(),
            env: scope.clone(),
            is_arrow: node.kind == ActionKind::ArrowFunction,
            is_expression: node.attr_bool("expression").unwrap_or(false),
        }))
    }

    fn eval_call_args(&mut self, node: &Action, scope: &ScopeRef) -> Result<Result<Vec<Value>, EvalOutcome>, EngineError> {
        let mut args = Vec::new();
        for child in node.children_by_role(ChildRole::Argument) {
            if child.kind == ActionKind::Spread {
                let spread = match child.child_by_role(ChildRole::Argument) {
                    Some(arg) => match self.eval(arg, scope)? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(Err(abrupt)),
                    },
                    None => Value::Undefined,
                };
                match spread {
                    Value::Array(items) => args.extend(items.borrow().iter().cloned()),
                    other => args.push(other),
                }
            } else {
                match self.eval(child, scope)? {
                    EvalOutcome::Value(v) => args.push(v),
                    abrupt => return Ok(Err(abrupt)),
                }
            }
        }
        Ok(Ok(args))
    }

    fn eval_call(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let callee = match node.child_by_role(ChildRole::Callee) {
            Some(c) => c,
            None => return Ok(EvalOutcome::undefined()),
        };
        let (func, this) = if callee.kind == ActionKind::MemberAccess {
            let object = match callee.child_by_role(ChildRole::Object) {
                Some(obj) => eval_value!(self, obj, scope),
                None => Value::Undefined,
            };
            if object.is_nullish() {
                if callee.attr_bool("optional").unwrap_or(false)
                    || node.attr_bool("optional").unwrap_or(false)
                {
                    return Ok(EvalOutcome::undefined());
                }
                self.warn(format!(
                    "call through {} receiver",
                    object.to_js_string()
                ));
                return Ok(EvalOutcome::undefined());
            }
            let name = match self.property_name(callee, scope)? {
                Ok(name) => name,
                Err(abrupt) => return Ok(abrupt),
            };
            let func = self.get_property(&object, &name);
            (func, object)
        } else {
            (eval_value!(self, callee, scope), Value::Undefined)
        };
        let args = match self.eval_call_args(node, scope)? {
            Ok(args) => args,
            Err(abrupt) => return Ok(abrupt),
        };
        self.call_value(func, this, args)
    }

    fn eval_new(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let callee = match node.child_by_role(ChildRole::Callee) {
            Some(c) => eval_value!(self, c, scope),
            None => Value::Undefined,
        };
        let args = match self.eval_call_args(node, scope)? {
            Ok(args) => args,
            Err(abrupt) => return Ok(abrupt),
        };
        match callee {
            Value::Builtin(name) if name == "Element" || name == "HTMLElement" || name == "Node" => {
                Ok(EvalOutcome::Value(host::make_element("div", "")))
            }
            Value::Builtin(name) if name == "Event" => {
                let event_type = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                Ok(EvalOutcome::Value(host::make_event(&event_type, None)))
            }
            Value::Function(_) => {
                let instance = Value::object(ObjectData::new("Object"));
                match self.call_value(callee, instance.clone(), args)? {
                    EvalOutcome::Throw(err) => Ok(EvalOutcome::Throw(err)),
                    _ => Ok(EvalOutcome::Value(instance)),
                }
            }
            Value::Object(class) if class.borrow().class_name == "Class" => {
                let instance = Value::object(ObjectData::new("Object"));
                let constructor = class.borrow().properties.get("constructor").cloned();
                if let Some(constructor) = constructor {
                    if let EvalOutcome::Throw(err) =
                        self.call_value(constructor, instance.clone(), args)?
                    {
                        return Ok(EvalOutcome::Throw(err));
                    }
                }
                // instance methods become own properties of the instance
                if let (Value::Object(instance_data), class_ref) = (&instance, class) {
                    let class_ref = class_ref.borrow();
                    let mut instance_mut = instance_data.borrow_mut();
                    for (name, method) in class_ref.properties.iter() {
                        if name != "constructor" {
                            instance_mut.properties.insert(name.clone(), method.clone());
                        }
                    }
                }
                Ok(EvalOutcome::Value(instance))
            }
            other => {
                self.warn(format!("cannot construct {}", other.to_js_string()));
                Ok(EvalOutcome::undefined())
            }
        }
    }

    pub fn call_value(&mut self, func: Value, this: Value, args: Vec<Value>) -> EvalResult {
        if self.cancel.is_cancelled() {
            return Err(InterpreterError::Cancelled.into());
        }
        match func {
            Value::Function(fv) => {
                if self.call_depth >= self.max_call_depth {
                    return Err(InterpreterError::CallDepth {
                        limit: self.max_call_depth,
                    }
                    .into());
                }
                self.call_depth += 1;
                let result = self.call_user_function(&fv, this, args);
                self.call_depth -= 1;
                result
            }
            Value::Builtin(name) => self.call_builtin(&name, this, args),
            other => {
                self.warn(format!("{} is not a function", other.to_js_string()));
                Ok(EvalOutcome::undefined())
            }
        }
    }

    fn call_user_function(&mut self, fv: &FunctionValue, this: Value, args: Vec<Value>) -> EvalResult {
        let call_scope = Scope::child(&fv.env);
        if !fv.is_arrow {
            Scope::declare(&call_scope, "this", this, BindingKind::Const);
            Scope::declare(&call_scope, "arguments", Value::array(args.clone()), BindingKind::Const);
        }
        let params: Vec<&Action> = fv
            .body
            .children_by_role(ChildRole::Argument)
            .filter(|c| c.kind == ActionKind::DeclareParam)
            .collect();
        for (i, param) in params.iter().enumerate() {
            let name = match param.attr_str("name") {
                Some(name) => name.to_string(),
                None => continue,
            };
            let mut value = args.get(i).cloned().unwrap_or(Value::Undefined);
            if matches!(value, Value::Undefined) {
                if let Some(default) = param.child_by_role(ChildRole::Init) {
                    value = match self.eval(default, &call_scope)? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(abrupt),
                    };
                }
            }
            Scope::declare(&call_scope, &name, value, BindingKind::Let);
        }

        let body: Vec<&Action> = self.body_children(&fv.body);
        if fv.is_expression && body.len() == 1 {
            return match self.eval(body[0], &call_scope)? {
                EvalOutcome::Return(v) | EvalOutcome::Value(v) => Ok(EvalOutcome::Value(v)),
                abrupt => Ok(abrupt),
            };
        }
        match self.eval_statements(&body, &call_scope)? {
            EvalOutcome::Return(v) => Ok(EvalOutcome::Value(v)),
            EvalOutcome::Value(_) => Ok(EvalOutcome::Value(Value::Undefined)),
            EvalOutcome::Throw(err) => Ok(EvalOutcome::Throw(err)),
            EvalOutcome::Break(_) | EvalOutcome::Continue(_) => {
                self.warn("break/continue escaped a function body".to_string());
                Ok(EvalOutcome::Value(Value::Undefined))
            }
        }
    }

    // ---- member access and assignment ----

    /// The property name of a MemberAccess node, either static or
    /// computed. `Err` carries an abrupt outcome from the computed
    /// property expression.
    fn property_name(
        &mut self,
        node: &Action,
        scope: &ScopeRef,
    ) -> Result<Result<String, EvalOutcome>, EngineError> {
        if let Some(name) = node.attr_str("property") {
            return Ok(Ok(name.to_string()));
        }
        if let Some(computed) = node.child_by_role(ChildRole::Property) {
            return match self.eval(computed, scope)? {
                EvalOutcome::Value(v) => Ok(Ok(v.to_js_string())),
                abrupt => Ok(Err(abrupt)),
            };
        }
        Ok(Ok(String::new()))
    }

    pub fn get_property(&mut self, value: &Value, name: &str) -> Value {
        match value {
            Value::Str(s) => {
                if name == "length" {
                    return Value::Number(s.chars().count() as f64);
                }
                if let Ok(index) = name.parse::<usize>() {
                    return s
                        .chars()
                        .nth(index)
                        .map(|c| Value::Str(c.to_string()))
                        .unwrap_or(Value::Undefined);
                }
                if STRING_METHODS.contains(&name) {
                    return Value::Builtin(format!("String.{}", name));
                }
                Value::Undefined
            }
            Value::Array(items) => {
                if name == "length" {
                    return Value::Number(items.borrow().len() as f64);
                }
                if let Ok(index) = name.parse::<usize>() {
                    return items.borrow().get(index).cloned().unwrap_or(Value::Undefined);
                }
                if ARRAY_METHODS.contains(&name) {
                    return Value::Builtin(format!("Array.{}", name));
                }
                Value::Undefined
            }
            Value::Number(_) => match name {
                "toFixed" | "toPrecision" | "toString" => {
                    Value::Builtin(format!("__number.{}", name))
                }
                _ => Value::Undefined,
            },
            Value::Object(data) => {
                let data_ref = data.borrow();
                if let Some(found) = data_ref.properties.get(name) {
                    return found.clone();
                }
                if let Some(builtin) = host::class_method(&data_ref.class_name, name) {
                    return Value::Builtin(builtin);
                }
                match name {
                    "hasOwnProperty" | "toString" => Value::Builtin(format!("__object.{}", name)),
                    _ => Value::Undefined,
                }
            }
            Value::Function(_) => match name {
                "call" | "apply" | "bind" => Value::Builtin(format!("__function.{}", name)),
                "name" => Value::Str(String::new()),
                _ => Value::Undefined,
            },
            Value::Builtin(base) => Value::Builtin(format!("{}.{}", base, name)),
            _ => Value::Undefined,
        }
    }

    fn element_target(&self, value: &Value) -> String {
        if let Value::Object(data) = value {
            let data = data.borrow();
            if let Some(Value::Str(id)) = data.properties.get("id") {
                if !id.is_empty() {
                    return format!("#{}", id);
                }
            }
            if let Some(Value::Str(tag)) = data.properties.get("tagName") {
                return tag.to_lowercase();
            }
            return data.class_name.to_lowercase();
        }
        String::new()
    }

    pub fn set_property(&mut self, object: &Value, name: &str, value: Value) {
        match object {
            Value::Object(data) => {
                let class_name = data.borrow().class_name.clone();
                let target = self.element_target(object);
                data.borrow_mut()
                    .properties
                    .insert(name.to_string(), value.clone());
                match (class_name.as_str(), name) {
                    ("HTMLElement", "innerHTML") | ("HTMLElement", "textContent") => {
                        self.effects.push(DomEffect::SetProperty {
                            target,
                            name: name.to_string(),
                        });
                    }
                    ("HTMLElement", "className") => {
                        self.effects.push(DomEffect::ClassChange { target });
                    }
                    ("Location", "href") => {
                        self.effects.push(DomEffect::Navigate {
                            url: value.to_js_string(),
                        });
                    }
                    ("Window", "location") => {
                        self.effects.push(DomEffect::Navigate {
                            url: value.to_js_string(),
                        });
                    }
                    _ => {}
                }
            }
            Value::Array(items) => {
                if name == "length" {
                    let new_len = value.to_number().max(0.0) as usize;
                    items.borrow_mut().resize(new_len, Value::Undefined);
                } else if let Ok(index) = name.parse::<usize>() {
                    let mut items = items.borrow_mut();
                    if items.len() <= index {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
            }
            other => {
                self.warn(format!(
                    "cannot set property `{}` on {}",
                    name,
                    other.to_js_string()
                ));
            }
        }
    }

    fn eval_assign(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let op = node.attr_str("op").unwrap_or("=").to_string();
        let target = match node.child_by_role(ChildRole::Left) {
            Some(t) => t,
            None => return Ok(EvalOutcome::undefined()),
        };
        let value_node = node.child_by_role(ChildRole::Right);

        // logical assignment short-circuits before evaluating the value
        if matches!(op.as_str(), "&&=" | "||=" | "??=") {
            let current = match self.read_target(target, scope)? {
                Ok(v) => v,
                Err(abrupt) => return Ok(abrupt),
            };
            let proceed = match op.as_str() {
                "&&=" => current.is_truthy(),
                "||=" => !current.is_truthy(),
                _ => current.is_nullish(),
            };
            if !proceed {
                return Ok(EvalOutcome::Value(current));
            }
            let value = match value_node {
                Some(v) => eval_value!(self, v, scope),
                None => Value::Undefined,
            };
            return self.write_target(target, scope, value.clone()).map(|outcome| match outcome {
                Some(abrupt) => abrupt,
                None => EvalOutcome::Value(value),
            });
        }

        let rhs = match value_node {
            Some(v) => eval_value!(self, v, scope),
            None => Value::Undefined,
        };
        let value = if op == "=" {
            rhs
        } else {
            let current = match self.read_target(target, scope)? {
                Ok(v) => v,
                Err(abrupt) => return Ok(abrupt),
            };
            let binary_op = op.trim_end_matches('=');
            self.apply_binary(binary_op, current, rhs)
        };
        self.write_target(target, scope, value.clone()).map(|outcome| match outcome {
            Some(abrupt) => abrupt,
            None => EvalOutcome::Value(value),
        })
    }

    fn read_target(
        &mut self,
        target: &Action,
        scope: &ScopeRef,
    ) -> Result<Result<Value, EvalOutcome>, EngineError> {
        match target.kind {
            ActionKind::Identifier => {
                let name = target.attr_str("name").unwrap_or("");
                Ok(Ok(Scope::lookup(scope, name).unwrap_or(Value::Undefined)))
            }
            ActionKind::MemberAccess => {
                let object = match target.child_by_role(ChildRole::Object) {
                    Some(obj) => match self.eval(obj, scope)? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(Err(abrupt)),
                    },
                    None => Value::Undefined,
                };
                if object.is_nullish() {
                    return Ok(Ok(Value::Undefined));
                }
                let name = match self.property_name(target, scope)? {
                    Ok(name) => name,
                    Err(abrupt) => return Ok(Err(abrupt)),
                };
                Ok(Ok(self.get_property(&object, &name)))
            }
            _ => Ok(Ok(Value::Undefined)),
        }
    }

    /// Write to an assignment target. `Ok(Some(_))` carries an abrupt
    /// outcome from evaluating the target expression.
    fn write_target(
        &mut self,
        target: &Action,
        scope: &ScopeRef,
        value: Value,
    ) -> Result<Option<EvalOutcome>, EngineError> {
        match target.kind {
            ActionKind::Identifier => {
                let name = target.attr_str("name").unwrap_or("").to_string();
                if !Scope::assign(scope, &name, value.clone()) {
                    if Scope::lookup(scope, &name).is_some() {
                        return Ok(Some(EvalOutcome::Throw(Value::Str(format!(
                            "TypeError: assignment to constant `{}`",
                            name
                        )))));
                    }
                    // implicit global, as in sloppy-mode hosts
                    Scope::declare(&self.root.clone(), &name, value, BindingKind::Var);
                }
                Ok(None)
            }
            ActionKind::MemberAccess => {
                let object = match target.child_by_role(ChildRole::Object) {
                    Some(obj) => match self.eval(obj, scope)? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(Some(abrupt)),
                    },
                    None => Value::Undefined,
                };
                if object.is_nullish() {
                    return Ok(Some(EvalOutcome::Throw(Value::Str(
                        "TypeError: cannot set properties of null or undefined".to_string(),
                    ))));
                }
                let name = match self.property_name(target, scope)? {
                    Ok(name) => name,
                    Err(abrupt) => return Ok(Some(abrupt)),
                };
                self.set_property(&object, &name, value);
                Ok(None)
            }
            _ => {
                self.warn("unsupported assignment target".to_string());
                Ok(None)
            }
        }
    }

    fn eval_unary(&mut self, node: &Action, scope: &ScopeRef) -> EvalResult {
        let op = node.attr_str("op").unwrap_or("");
        let argument = match node.child_by_role(ChildRole::Argument) {
            Some(a) => a,
            None => return Ok(EvalOutcome::undefined()),
        };

        if op == "++" || op == "--" {
            let prefix = node.attr_bool("prefix").unwrap_or(true);
            let old = match self.read_target(argument, scope)? {
                Ok(v) => v.to_number(),
                Err(abrupt) => return Ok(abrupt),
            };
            let new = if op == "++" { old + 1.0 } else { old - 1.0 };
            if let Some(abrupt) = self.write_target(argument, scope, Value::Number(new))? {
                return Ok(abrupt);
            }
            return Ok(EvalOutcome::Value(Value::Number(if prefix { new } else { old })));
        }

        if op == "typeof" {
            // typeof tolerates unresolved identifiers
            if argument.kind == ActionKind::Identifier {
                let name = argument.attr_str("name").unwrap_or("");
                let value = Scope::lookup(scope, name);
                return Ok(EvalOutcome::Value(Value::Str(
                    value.map(|v| v.type_of()).unwrap_or("undefined").to_string(),
                )));
            }
            let value = eval_value!(self, argument, scope);
            return Ok(EvalOutcome::Value(Value::Str(value.type_of().to_string())));
        }

        if op == "delete" {
            if argument.kind == ActionKind::MemberAccess {
                let object = match argument.child_by_role(ChildRole::Object) {
                    Some(obj) => eval_value!(self, obj, scope),
                    None => Value::Undefined,
                };
                let name = match self.property_name(argument, scope)? {
                    Ok(name) => name,
                    Err(abrupt) => return Ok(abrupt),
                };
                if let Value::Object(data) = &object {
                    data.borrow_mut().properties.shift_remove(&name);
                }
            }
            return Ok(EvalOutcome::Value(Value::Bool(true)));
        }

        let value = eval_value!(self, argument, scope);
        let result = match op {
            "!" => Value::Bool(!value.is_truthy()),
            "-" => Value::Number(-value.to_number()),
            "+" => Value::Number(value.to_number()),
            "~" => Value::Number(!(to_i32(&value)) as f64),
            "void" => Value::Undefined,
            other => {
                self.warn(format!("unknown unary operator `{}`", other));
                Value::Undefined
            }
        };
        Ok(EvalOutcome::Value(result))
    }

    fn apply_binary(&mut self, op: &str, left: Value, right: Value) -> Value {
        match op {
            "+" => {
                if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                    Value::Str(format!("{}{}", left.to_js_string(), right.to_js_string()))
                } else if matches!(left, Value::Array(_) | Value::Object(_))
                    || matches!(right, Value::Array(_) | Value::Object(_))
                {
                    Value::Str(format!("{}{}", left.to_js_string(), right.to_js_string()))
                } else {
                    Value::Number(left.to_number() + right.to_number())
                }
            }
            "-" => Value::Number(left.to_number() - right.to_number()),
            "*" => Value::Number(left.to_number() * right.to_number()),
            "/" => Value::Number(left.to_number() / right.to_number()),
            "%" => Value::Number(left.to_number() % right.to_number()),
            "**" => Value::Number(left.to_number().powf(right.to_number())),
            "<" | ">" | "<=" | ">=" => {
                let result = if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
                    match op {
                        "<" => a < b,
                        ">" => a > b,
                        "<=" => a <= b,
                        _ => a >= b,
                    }
                } else {
                    let (a, b) = (left.to_number(), right.to_number());
                    if a.is_nan() || b.is_nan() {
                        false
                    } else {
                        match op {
                            "<" => a < b,
                            ">" => a > b,
                            "<=" => a <= b,
                            _ => a >= b,
                        }
                    }
                };
                Value::Bool(result)
            }
            "==" => Value::Bool(left.loose_eq(&right)),
            "!=" => Value::Bool(!left.loose_eq(&right)),
            "===" => Value::Bool(left.strict_eq(&right)),
            "!==" => Value::Bool(!left.strict_eq(&right)),
            "&" => Value::Number((to_i32(&left) & to_i32(&right)) as f64),
            "|" => Value::Number((to_i32(&left) | to_i32(&right)) as f64),
            "^" => Value::Number((to_i32(&left) ^ to_i32(&right)) as f64),
            "<<" => Value::Number((to_i32(&left) << (to_u32(&right) & 31)) as f64),
            ">>" => Value::Number((to_i32(&left) >> (to_u32(&right) & 31)) as f64),
            ">>>" => Value::Number(((to_i32(&left) as u32) >> (to_u32(&right) & 31)) as f64),
            "instanceof" => Value::Bool(self.instance_of(&left, &right)),
            "in" => {
                let key = left.to_js_string();
                match &right {
                    Value::Object(data) => Value::Bool(data.borrow().properties.contains_key(&key)),
                    Value::Array(items) => Value::Bool(
                        key.parse::<usize>()
                            .map(|i| i < items.borrow().len())
                            .unwrap_or(false),
                    ),
                    _ => Value::Bool(false),
                }
            }
            other => {
                self.warn(format!("unknown binary operator `{}`", other));
                Value::Undefined
            }
        }
    }

    fn instance_of(&self, left: &Value, right: &Value) -> bool {
        let Value::Builtin(class) = right else {
            return false;
        };
        match (left, class.as_str()) {
            (Value::Object(data), "Element" | "HTMLElement" | "Node") => {
                data.borrow().class_name == "HTMLElement"
            }
            (Value::Object(data), "Event") => {
                matches!(data.borrow().class_name.as_str(), "Event" | "KeyboardEvent")
            }
            (Value::Function(_), "Function") => true,
            (Value::Array(_), "Array") => true,
            (Value::Object(data), name) => data.borrow().class_name == name,
            _ => false,
        }
    }

    fn is_promise_like(&self, value: &Value) -> bool {
        match value {
            Value::Object(data) => {
                let data = data.borrow();
                data.class_name == "Promise" || data.properties.contains_key("then")
            }
            _ => false,
        }
    }

    // ---- builtins ----

    fn call_builtin(&mut self, name: &str, this: Value, args: Vec<Value>) -> EvalResult {
        if let Some(rest) = name.strip_prefix("console.") {
            let message = args
                .iter()
                .map(Value::to_js_string)
                .collect::<Vec<_>>()
                .join(" ");
            let line = match rest {
                "log" | "info" => message,
                other => format!("[{}] {}", other, message),
            };
            self.console.push(line);
            return Ok(EvalOutcome::undefined());
        }
        if let Some(rest) = name.strip_prefix("Math.") {
            return Ok(EvalOutcome::Value(math_builtin(rest, &args)));
        }
        if let Some(rest) = name.strip_prefix("String.") {
            return self.string_builtin(rest, this, args);
        }
        if let Some(rest) = name.strip_prefix("Array.") {
            return self.array_builtin(rest, this, args);
        }

        match name {
            "JSON.stringify" => {
                let json = value_to_json(args.first().unwrap_or(&Value::Undefined));
                match json {
                    Some(json) => {
                        let pretty = args.get(2).map(|v| v.is_truthy()).unwrap_or(false);
                        let text = if pretty {
                            serde_json::to_string_pretty(&json)
                        } else {
                            serde_json::to_string(&json)
                        };
                        Ok(EvalOutcome::Value(
                            text.map(Value::Str).unwrap_or(Value::Undefined),
                        ))
                    }
                    None => Ok(EvalOutcome::undefined()),
                }
            }
            "JSON.parse" => {
                let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(json) => Ok(EvalOutcome::Value(json_to_value(&json))),
                    Err(err) => Ok(EvalOutcome::Throw(Value::Str(format!(
                        "SyntaxError: {}",
                        err
                    )))),
                }
            }
            "Object.keys" => Ok(EvalOutcome::Value(match args.first() {
                Some(Value::Object(data)) => Value::array(
                    data.borrow().properties.keys().map(|k| Value::Str(k.clone())).collect(),
                ),
                Some(Value::Array(items)) => Value::array(
                    (0..items.borrow().len()).map(|i| Value::Str(i.to_string())).collect(),
                ),
                _ => Value::array(Vec::new()),
            })),
            "Object.values" => Ok(EvalOutcome::Value(match args.first() {
                Some(Value::Object(data)) => {
                    Value::array(data.borrow().properties.values().cloned().collect())
                }
                Some(Value::Array(items)) => Value::array(items.borrow().clone()),
                _ => Value::array(Vec::new()),
            })),
            "Object.entries" => Ok(EvalOutcome::Value(match args.first() {
                Some(Value::Object(data)) => Value::array(
                    data.borrow()
                        .properties
                        .iter()
                        .map(|(k, v)| Value::array(vec![Value::Str(k.clone()), v.clone()]))
                        .collect(),
                ),
                _ => Value::array(Vec::new()),
            })),
            "Object.assign" => {
                let mut iter = args.into_iter();
                let target = iter.next().unwrap_or(Value::Undefined);
                if let Value::Object(target_data) = &target {
                    for source in iter {
                        if let Value::Object(source_data) = source {
                            let source_ref = source_data.borrow();
                            let mut target_mut = target_data.borrow_mut();
                            for (k, v) in source_ref.properties.iter() {
                                target_mut.properties.insert(k.clone(), v.clone());
                            }
                        }
                    }
                }
                Ok(EvalOutcome::Value(target))
            }
            "Object.freeze" | "Object.seal" => Ok(EvalOutcome::Value(
                args.into_iter().next().unwrap_or(Value::Undefined),
            )),
            "String" => Ok(EvalOutcome::Value(Value::Str(
                args.first().map(|v| v.to_js_string()).unwrap_or_default(),
            ))),
            "Number" => Ok(EvalOutcome::Value(Value::Number(
                args.first().map(|v| v.to_number()).unwrap_or(0.0),
            ))),
            "Boolean" => Ok(EvalOutcome::Value(Value::Bool(
                args.first().map(|v| v.is_truthy()).unwrap_or(false),
            ))),
            "Number.isInteger" => Ok(EvalOutcome::Value(Value::Bool(matches!(
                args.first(),
                Some(Value::Number(n)) if n.fract() == 0.0 && n.is_finite()
            )))),
            "Number.isFinite" => Ok(EvalOutcome::Value(Value::Bool(matches!(
                args.first(),
                Some(Value::Number(n)) if n.is_finite()
            )))),
            "Number.isNaN" => Ok(EvalOutcome::Value(Value::Bool(matches!(
                args.first(),
                Some(Value::Number(n)) if n.is_nan()
            )))),
            "Number.parseInt" | "parseInt" => {
                let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                let radix = args.get(1).map(|v| v.to_number() as u32).filter(|r| (2..=36).contains(r));
                Ok(EvalOutcome::Value(Value::Number(parse_int_impl(&text, radix))))
            }
            "Number.parseFloat" | "parseFloat" => {
                let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                Ok(EvalOutcome::Value(Value::Number(parse_float_impl(&text))))
            }
            "isNaN" => Ok(EvalOutcome::Value(Value::Bool(
                args.first().map(|v| v.to_number().is_nan()).unwrap_or(true),
            ))),
            "isFinite" => Ok(EvalOutcome::Value(Value::Bool(
                args.first().map(|v| v.to_number().is_finite()).unwrap_or(false),
            ))),
            "encodeURIComponent" => Ok(EvalOutcome::Value(Value::Str(host::encode_uri_component(
                &args.first().map(|v| v.to_js_string()).unwrap_or_default(),
            )))),
            "encodeURI" => Ok(EvalOutcome::Value(Value::Str(host::encode_uri(
                &args.first().map(|v| v.to_js_string()).unwrap_or_default(),
            )))),
            "decodeURIComponent" | "decodeURI" => Ok(EvalOutcome::Value(Value::Str(
                host::decode_uri(&args.first().map(|v| v.to_js_string()).unwrap_or_default()),
            ))),
            "__number.toFixed" => {
                let digits = args.first().map(|v| v.to_number() as usize).unwrap_or(0);
                Ok(EvalOutcome::Value(Value::Str(format!(
                    "{:.*}",
                    digits,
                    this.to_number()
                ))))
            }
            "__number.toPrecision" | "__number.toString" => {
                Ok(EvalOutcome::Value(Value::Str(format_number(this.to_number()))))
            }
            "__object.hasOwnProperty" => {
                let key = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                Ok(EvalOutcome::Value(Value::Bool(match &this {
                    Value::Object(data) => data.borrow().properties.contains_key(&key),
                    _ => false,
                })))
            }
            "__object.toString" => Ok(EvalOutcome::Value(Value::Str(this.to_js_string()))),
            "__function.call" => {
                let mut iter = args.into_iter();
                let new_this = iter.next().unwrap_or(Value::Undefined);
                self.call_value(this, new_this, iter.collect())
            }
            "__function.apply" => {
                let mut iter = args.into_iter();
                let new_this = iter.next().unwrap_or(Value::Undefined);
                let call_args = match iter.next() {
                    Some(Value::Array(items)) => items.borrow().clone(),
                    _ => Vec::new(),
                };
                self.call_value(this, new_this, call_args)
            }
            "__function.bind" => Ok(EvalOutcome::Value(this)),
            _ if self.dom_simulation => self.call_dom_builtin(name, this, args),
            _ => {
                self.warn(format!("unsupported host function `{}`", name));
                Ok(EvalOutcome::undefined())
            }
        }
    }

    fn string_builtin(&mut self, method: &str, this: Value, args: Vec<Value>) -> EvalResult {
        let s = this.to_js_string();
        let arg0 = args.first().map(|v| v.to_js_string()).unwrap_or_default();
        let num0 = args.first().map(|v| v.to_number());
        let chars: Vec<char> = s.chars().collect();
        let value = match method {
            "charAt" => {
                let i = num0.unwrap_or(0.0).max(0.0) as usize;
                Value::Str(chars.get(i).map(|c| c.to_string()).unwrap_or_default())
            }
            "charCodeAt" => {
                let i = num0.unwrap_or(0.0).max(0.0) as usize;
                chars
                    .get(i)
                    .map(|c| Value::Number(*c as u32 as f64))
                    .unwrap_or(Value::Number(f64::NAN))
            }
            "at" => {
                let i = num0.unwrap_or(0.0);
                let idx = if i < 0.0 { chars.len() as f64 + i } else { i };
                if idx >= 0.0 && (idx as usize) < chars.len() {
                    Value::Str(chars[idx as usize].to_string())
                } else {
                    Value::Undefined
                }
            }
            "toUpperCase" => Value::Str(s.to_uppercase()),
            "toLowerCase" => Value::Str(s.to_lowercase()),
            "trim" => Value::Str(s.trim().to_string()),
            "trimStart" => Value::Str(s.trim_start().to_string()),
            "trimEnd" => Value::Str(s.trim_end().to_string()),
            "includes" => Value::Bool(s.contains(&arg0)),
            "indexOf" => Value::Number(
                s.find(&arg0)
                    .map(|b| s[..b].chars().count() as f64)
                    .unwrap_or(-1.0),
            ),
            "lastIndexOf" => Value::Number(
                s.rfind(&arg0)
                    .map(|b| s[..b].chars().count() as f64)
                    .unwrap_or(-1.0),
            ),
            "startsWith" => Value::Bool(s.starts_with(&arg0)),
            "endsWith" => Value::Bool(s.ends_with(&arg0)),
            "slice" | "substring" => {
                let len = chars.len() as f64;
                let normalize = |v: f64| -> usize {
                    let idx = if v < 0.0 && method == "slice" { len + v } else { v };
                    idx.clamp(0.0, len) as usize
                };
                let start = normalize(num0.unwrap_or(0.0));
                let end = normalize(args.get(1).map(|v| v.to_number()).unwrap_or(len));
                let (start, end) = if method == "substring" && start > end {
                    (end, start)
                } else {
                    (start, end.max(start))
                };
                Value::Str(chars[start..end].iter().collect())
            }
            "split" => {
                if args.is_empty() {
                    Value::array(vec![Value::Str(s)])
                } else if arg0.is_empty() {
                    Value::array(chars.iter().map(|c| Value::Str(c.to_string())).collect())
                } else {
                    Value::array(s.split(&arg0).map(|p| Value::Str(p.to_string())).collect())
                }
            }
            "replace" => {
                let to = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                Value::Str(s.replacen(&arg0, &to, 1))
            }
            "replaceAll" => {
                let to = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                Value::Str(s.replace(&arg0, &to))
            }
            "repeat" => {
                let count = num0.unwrap_or(0.0).max(0.0) as usize;
                Value::Str(s.repeat(count.min(10_000)))
            }
            "padStart" | "padEnd" => {
                let width = num0.unwrap_or(0.0).max(0.0) as usize;
                let pad = args
                    .get(1)
                    .map(|v| v.to_js_string())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| " ".to_string());
                let mut out = s.clone();
                let pad_chars: Vec<char> = pad.chars().collect();
                let mut i = 0;
                while out.chars().count() < width {
                    let c = pad_chars[i % pad_chars.len()];
                    if method == "padStart" {
                        out.insert(0, c);
                    } else {
                        out.push(c);
                    }
                    i += 1;
                }
                Value::Str(out)
            }
            "concat" => {
                let mut out = s;
                for arg in &args {
                    out.push_str(&arg.to_js_string());
                }
                Value::Str(out)
            }
            "toString" => Value::Str(s),
            other => {
                self.warn(format!("unsupported string method `{}`", other));
                Value::Undefined
            }
        };
        Ok(EvalOutcome::Value(value))
    }

    fn array_builtin(&mut self, method: &str, this: Value, args: Vec<Value>) -> EvalResult {
        // constructor-level helpers arrive with a non-array receiver
        match method {
            "isArray" => {
                return Ok(EvalOutcome::Value(Value::Bool(matches!(
                    args.first(),
                    Some(Value::Array(_))
                ))));
            }
            "from" => {
                let items = match args.first() {
                    Some(Value::Array(items)) => items.borrow().clone(),
                    Some(Value::Str(s)) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    _ => Vec::new(),
                };
                return Ok(EvalOutcome::Value(Value::array(items)));
            }
            _ => {}
        }
        let Value::Array(items) = &this else {
            self.warn(format!("array method `{}` on a non-array", method));
            return Ok(EvalOutcome::undefined());
        };
        let value = match method {
            "push" => {
                items.borrow_mut().extend(args);
                Value::Number(items.borrow().len() as f64)
            }
            "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
            "shift" => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    Value::Undefined
                } else {
                    items.remove(0)
                }
            }
            "unshift" => {
                let mut items = items.borrow_mut();
                for (i, arg) in args.into_iter().enumerate() {
                    items.insert(i, arg);
                }
                Value::Number(items.len() as f64)
            }
            "indexOf" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Value::Number(
                    items
                        .borrow()
                        .iter()
                        .position(|v| v.strict_eq(&needle))
                        .map(|i| i as f64)
                        .unwrap_or(-1.0),
                )
            }
            "lastIndexOf" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Value::Number(
                    items
                        .borrow()
                        .iter()
                        .rposition(|v| v.strict_eq(&needle))
                        .map(|i| i as f64)
                        .unwrap_or(-1.0),
                )
            }
            "includes" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Value::Bool(items.borrow().iter().any(|v| v.strict_eq(&needle)))
            }
            "join" => {
                let sep = args.first().map(|v| v.to_js_string()).unwrap_or_else(|| ",".to_string());
                Value::Str(
                    items
                        .borrow()
                        .iter()
                        .map(|v| match v {
                            Value::Undefined | Value::Null => String::new(),
                            other => other.to_js_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(&sep),
                )
            }
            "slice" => {
                let snapshot = items.borrow().clone();
                let len = snapshot.len() as f64;
                let normalize = |v: f64| (if v < 0.0 { len + v } else { v }).clamp(0.0, len) as usize;
                let start = normalize(args.first().map(|v| v.to_number()).unwrap_or(0.0));
                let end = normalize(args.get(1).map(|v| v.to_number()).unwrap_or(len));
                Value::array(snapshot[start..end.max(start)].to_vec())
            }
            "concat" => {
                let mut out = items.borrow().clone();
                for arg in args {
                    match arg {
                        Value::Array(more) => out.extend(more.borrow().iter().cloned()),
                        other => out.push(other),
                    }
                }
                Value::array(out)
            }
            "reverse" => {
                items.borrow_mut().reverse();
                this.clone()
            }
            "fill" => {
                let fill = args.first().cloned().unwrap_or(Value::Undefined);
                for slot in items.borrow_mut().iter_mut() {
                    *slot = fill.clone();
                }
                this.clone()
            }
            "flat" => {
                let mut out = Vec::new();
                for item in items.borrow().iter() {
                    match item {
                        Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Value::array(out)
            }
            "keys" => Value::array(
                (0..items.borrow().len()).map(|i| Value::Number(i as f64)).collect(),
            ),
            "toString" => Value::Str(this.to_js_string()),
            "find" | "findIndex" | "filter" | "map" | "forEach" | "some" | "every" => {
                let callback = args.first().cloned().unwrap_or(Value::Undefined);
                let snapshot = items.borrow().clone();
                let mut mapped = Vec::new();
                let mut filtered = Vec::new();
                let mut found: Option<(usize, Value)> = None;
                let mut any = false;
                let mut all = true;
                for (i, item) in snapshot.iter().enumerate() {
                    let result = match self.call_value(
                        callback.clone(),
                        Value::Undefined,
                        vec![item.clone(), Value::Number(i as f64), this.clone()],
                    )? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(abrupt),
                    };
                    let truthy = result.is_truthy();
                    any |= truthy;
                    all &= truthy;
                    mapped.push(result);
                    if truthy {
                        filtered.push(item.clone());
                        if found.is_none() {
                            found = Some((i, item.clone()));
                        }
                    }
                }
                match method {
                    "find" => found.map(|(_, v)| v).unwrap_or(Value::Undefined),
                    "findIndex" => {
                        Value::Number(found.map(|(i, _)| i as f64).unwrap_or(-1.0))
                    }
                    "filter" => Value::array(filtered),
                    "map" => Value::array(mapped),
                    "forEach" => Value::Undefined,
                    "some" => Value::Bool(any),
                    _ => Value::Bool(all),
                }
            }
            "reduce" => {
                let callback = args.first().cloned().unwrap_or(Value::Undefined);
                let snapshot = items.borrow().clone();
                let mut iter = snapshot.iter().enumerate();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first.clone(),
                        None => {
                            return Ok(EvalOutcome::Throw(Value::Str(
                                "TypeError: reduce of empty array with no initial value".to_string(),
                            )))
                        }
                    },
                };
                for (i, item) in iter {
                    acc = match self.call_value(
                        callback.clone(),
                        Value::Undefined,
                        vec![acc, item.clone(), Value::Number(i as f64), this.clone()],
                    )? {
                        EvalOutcome::Value(v) => v,
                        abrupt => return Ok(abrupt),
                    };
                }
                acc
            }
            "sort" => {
                let comparator = args.first().cloned();
                let mut snapshot = items.borrow().clone();
                // insertion sort keeps the comparator calls sequential for
                // the interpreter's determinism guarantees
                for i in 1..snapshot.len() {
                    let mut j = i;
                    while j > 0 {
                        let swap = match &comparator {
                            Some(callback) => {
                                let result = match self.call_value(
                                    callback.clone(),
                                    Value::Undefined,
                                    vec![snapshot[j - 1].clone(), snapshot[j].clone()],
                                )? {
                                    EvalOutcome::Value(v) => v,
                                    abrupt => return Ok(abrupt),
                                };
                                result.to_number() > 0.0
                            }
                            None => snapshot[j - 1].to_js_string() > snapshot[j].to_js_string(),
                        };
                        if swap {
                            snapshot.swap(j - 1, j);
                            j -= 1;
                        } else {
                            break;
                        }
                    }
                }
                *items.borrow_mut() = snapshot;
                this.clone()
            }
            other => {
                self.warn(format!("unsupported array method `{}`", other));
                Value::Undefined
            }
        };
        Ok(EvalOutcome::Value(value))
    }

    // ---- DOM host ----

    fn call_dom_builtin(&mut self, name: &str, this: Value, args: Vec<Value>) -> EvalResult {
        let arg0 = args.first().map(|v| v.to_js_string()).unwrap_or_default();
        let target = self.element_target(&this);
        let value = match name {
            "Document.getElementById" => self.lookup_element(&format!("#{}", arg0), "div", &arg0),
            "Document.querySelector" | "HTMLElement.querySelector" => {
                let id = arg0.strip_prefix('#').unwrap_or("").to_string();
                self.lookup_element(&arg0, "div", &id)
            }
            "Document.querySelectorAll" | "HTMLElement.querySelectorAll" => {
                let id = arg0.strip_prefix('#').unwrap_or("").to_string();
                let element = self.lookup_element(&arg0, "div", &id);
                Value::array(vec![element])
            }
            "Document.getElementsByClassName" => {
                let element = self.lookup_element(&format!(".{}", arg0), "div", "");
                Value::array(vec![element])
            }
            "Document.getElementsByTagName" => {
                let element = self.lookup_element(&arg0, &arg0, "");
                Value::array(vec![element])
            }
            "Document.createElement" => host::make_element(&arg0, ""),
            "Document.createTextNode" => {
                let mut data = ObjectData::new("Text");
                data.properties
                    .insert("textContent".to_string(), Value::Str(arg0));
                Value::object(data)
            }
            "Document.addEventListener" | "Window.addEventListener" => {
                self.effects.push(DomEffect::AddEventListener {
                    target: if name.starts_with("Window") { "window" } else { "document" }.to_string(),
                    event: arg0,
                });
                Value::Undefined
            }
            "Document.removeEventListener" | "Window.removeEventListener" => Value::Undefined,
            "HTMLElement.getAttribute" => {
                if let Value::Object(data) = &this {
                    data.borrow()
                        .properties
                        .get(&format!("attr:{}", arg0))
                        .cloned()
                        .unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            "HTMLElement.hasAttribute" => {
                if let Value::Object(data) = &this {
                    Value::Bool(
                        data.borrow().properties.contains_key(&format!("attr:{}", arg0)),
                    )
                } else {
                    Value::Bool(false)
                }
            }
            "HTMLElement.setAttribute" => {
                let attr_value = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                if let Value::Object(data) = &this {
                    data.borrow_mut()
                        .properties
                        .insert(format!("attr:{}", arg0), Value::Str(attr_value.clone()));
                }
                self.effects.push(DomEffect::SetAttribute {
                    target,
                    name: arg0,
                    value: attr_value,
                });
                Value::Undefined
            }
            "HTMLElement.removeAttribute" => {
                if let Value::Object(data) = &this {
                    data.borrow_mut().properties.shift_remove(&format!("attr:{}", arg0));
                }
                self.effects.push(DomEffect::RemoveAttribute { target, name: arg0 });
                Value::Undefined
            }
            "HTMLElement.toggleAttribute" => {
                let key = format!("attr:{}", arg0);
                let mut present = false;
                if let Value::Object(data) = &this {
                    let mut data = data.borrow_mut();
                    if data.properties.contains_key(&key) {
                        data.properties.shift_remove(&key);
                    } else {
                        data.properties.insert(key, Value::Str(String::new()));
                        present = true;
                    }
                }
                self.effects.push(DomEffect::SetAttribute {
                    target,
                    name: arg0,
                    value: present.to_string(),
                });
                Value::Bool(present)
            }
            "HTMLElement.addEventListener" => {
                self.effects.push(DomEffect::AddEventListener { target, event: arg0 });
                Value::Undefined
            }
            "HTMLElement.removeEventListener" => {
                self.effects.push(DomEffect::RemoveEventListener { target, event: arg0 });
                Value::Undefined
            }
            "HTMLElement.focus" => {
                self.effects.push(DomEffect::Focus { target });
                Value::Undefined
            }
            "HTMLElement.blur" => {
                self.effects.push(DomEffect::Blur { target });
                Value::Undefined
            }
            "HTMLElement.click" => {
                self.effects.push(DomEffect::Click { target });
                Value::Undefined
            }
            "HTMLElement.appendChild"
            | "HTMLElement.removeChild"
            | "HTMLElement.insertBefore"
            | "HTMLElement.replaceChild"
            | "HTMLElement.remove" => {
                let op = name.rsplit('.').next().unwrap_or(name).to_string();
                self.effects.push(DomEffect::DomMutation { target, op });
                args.into_iter().next().unwrap_or(Value::Undefined)
            }
            "HTMLElement.closest" => Value::Null,
            "HTMLElement.contains" => Value::Bool(false),
            "HTMLElement.dispatchEvent" => Value::Bool(true),
            "Storage.getItem" => {
                if let Value::Object(data) = &this {
                    data.borrow().properties.get(&arg0).cloned().unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            "Storage.setItem" => {
                let item = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                if let Value::Object(data) = &this {
                    data.borrow_mut().properties.insert(arg0, Value::Str(item));
                }
                Value::Undefined
            }
            "Storage.removeItem" => {
                if let Value::Object(data) = &this {
                    data.borrow_mut().properties.shift_remove(&arg0);
                }
                Value::Undefined
            }
            "Storage.clear" => {
                if let Value::Object(data) = &this {
                    data.borrow_mut().properties.clear();
                }
                Value::Undefined
            }
            "Storage.key" => {
                let index = args.first().map(|v| v.to_number() as usize).unwrap_or(0);
                if let Value::Object(data) = &this {
                    data.borrow()
                        .properties
                        .get_index(index)
                        .map(|(k, _)| Value::Str(k.clone()))
                        .unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            "Location.assign" | "Location.replace" => {
                self.effects.push(DomEffect::Navigate { url: arg0 });
                Value::Undefined
            }
            "Location.reload" => {
                self.effects.push(DomEffect::Navigate { url: "reload".to_string() });
                Value::Undefined
            }
            "Location.toString" => {
                if let Value::Object(data) = &this {
                    data.borrow()
                        .properties
                        .get("href")
                        .cloned()
                        .unwrap_or(Value::Str(String::new()))
                } else {
                    Value::Str(String::new())
                }
            }
            "Window.setTimeout" | "Window.setInterval" => {
                let kind = if name.ends_with("setInterval") {
                    TimerKind::Interval
                } else {
                    TimerKind::Timeout
                };
                let delay = args.get(1).map(|v| v.to_number()).unwrap_or(0.0);
                let id = self.next_timer_id;
                self.next_timer_id += 1;
                self.timers.push(ScheduledTimer {
                    id,
                    kind,
                    delay_ms: delay,
                });
                Value::Number(id as f64)
            }
            "Window.requestAnimationFrame" => {
                let id = self.next_timer_id;
                self.next_timer_id += 1;
                self.timers.push(ScheduledTimer {
                    id,
                    kind: TimerKind::AnimationFrame,
                    delay_ms: 0.0,
                });
                Value::Number(id as f64)
            }
            "Window.clearTimeout" | "Window.clearInterval" | "Window.cancelAnimationFrame" => {
                if let Some(id) = args.first().map(|v| v.to_number() as i64) {
                    self.cancelled_timers.push(id);
                }
                Value::Undefined
            }
            "Window.alert" | "Window.confirm" | "Window.prompt" => {
                let kind = name.rsplit('.').next().unwrap_or("alert").to_string();
                self.effects.push(DomEffect::Dialog {
                    kind: kind.clone(),
                    message: arg0,
                });
                match kind.as_str() {
                    "confirm" => Value::Bool(true),
                    "prompt" => Value::Str(String::new()),
                    _ => Value::Undefined,
                }
            }
            "DOMTokenList.add" | "DOMTokenList.remove" | "DOMTokenList.toggle"
            | "DOMTokenList.replace" | "DOMTokenList.contains" => {
                let mut contains = false;
                if let Value::Object(data) = &this {
                    let mut data = data.borrow_mut();
                    let current = match data.properties.get("value") {
                        Some(Value::Str(s)) => s.clone(),
                        _ => String::new(),
                    };
                    let mut classes: Vec<String> =
                        current.split_whitespace().map(|c| c.to_string()).collect();
                    contains = classes.iter().any(|c| *c == arg0);
                    match name {
                        "DOMTokenList.add" if !contains => classes.push(arg0.clone()),
                        "DOMTokenList.remove" => classes.retain(|c| *c != arg0),
                        "DOMTokenList.toggle" => {
                            if contains {
                                classes.retain(|c| *c != arg0);
                            } else {
                                classes.push(arg0.clone());
                            }
                            contains = !contains;
                        }
                        "DOMTokenList.replace" => {
                            let to = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                            for class in classes.iter_mut() {
                                if *class == arg0 {
                                    *class = to.clone();
                                }
                            }
                        }
                        _ => {}
                    }
                    data.properties
                        .insert("value".to_string(), Value::Str(classes.join(" ")));
                }
                if name != "DOMTokenList.contains" {
                    self.effects.push(DomEffect::ClassChange { target });
                }
                if name == "DOMTokenList.contains" || name == "DOMTokenList.toggle" {
                    Value::Bool(contains)
                } else {
                    Value::Undefined
                }
            }
            "Event.preventDefault" | "KeyboardEvent.preventDefault" => {
                if let Value::Object(data) = &this {
                    data.borrow_mut()
                        .properties
                        .insert("defaultPrevented".to_string(), Value::Bool(true));
                }
                self.effects.push(DomEffect::PreventDefault);
                Value::Undefined
            }
            "Event.stopPropagation"
            | "Event.stopImmediatePropagation"
            | "KeyboardEvent.stopPropagation"
            | "KeyboardEvent.stopImmediatePropagation" => {
                self.effects.push(DomEffect::StopPropagation);
                Value::Undefined
            }
            other => {
                self.warn(format!("unsupported host function `{}`", other));
                Value::Undefined
            }
        };
        Ok(EvalOutcome::Value(value))
    }

    /// Deterministic element lookup: the same key always yields the same
    /// mock element.
    fn lookup_element(&mut self, key: &str, tag: &str, id: &str) -> Value {
        if let Some(found) = self.elements_by_key.get(key) {
            return found.clone();
        }
        let element = host::make_element(tag, id);
        self.elements_by_key.insert(key.to_string(), element.clone());
        element
    }
}

// ---- helpers ----

fn literal_value(node: &Action) -> Value {
    match node.attr_str("type") {
        Some("number") => {
            if let Some(i) = node.attr_int("value") {
                Value::Number(i as f64)
            } else {
                node.attr_str("value")
                    .and_then(|s| s.parse::<f64>().ok())
                    .map(Value::Number)
                    .unwrap_or(Value::Number(f64::NAN))
            }
        }
        Some("string") => Value::Str(node.attr_str("value").unwrap_or("").to_string()),
        Some("boolean") => Value::Bool(node.attr_bool("value").unwrap_or(false)),
        Some("null") => Value::Null,
        _ => Value::Undefined,
    }
}

fn to_i32(value: &Value) -> i32 {
    let n = value.to_number();
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64) as i32
}

fn to_u32(value: &Value) -> u32 {
    to_i32(value) as u32
}

fn math_builtin(method: &str, args: &[Value]) -> Value {
    let a = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
    let b = args.get(1).map(|v| v.to_number()).unwrap_or(f64::NAN);
    let result = match method {
        "abs" => a.abs(),
        "floor" => a.floor(),
        "ceil" => a.ceil(),
        "round" => (a + 0.5).floor(),
        "trunc" => a.trunc(),
        "sign" => {
            if a > 0.0 {
                1.0
            } else if a < 0.0 {
                -1.0
            } else {
                a
            }
        }
        "sqrt" => a.sqrt(),
        "cbrt" => a.cbrt(),
        "pow" => a.powf(b),
        "min" => args.iter().map(|v| v.to_number()).fold(f64::INFINITY, f64::min),
        "max" => args.iter().map(|v| v.to_number()).fold(f64::NEG_INFINITY, f64::max),
        // deterministic host: random is a fixed midpoint
        "random" => 0.5,
        "log" => a.ln(),
        "log2" => a.log2(),
        "log10" => a.log10(),
        "exp" => a.exp(),
        "hypot" => a.hypot(b),
        _ => f64::NAN,
    };
    Value::Number(result)
}

fn parse_int_impl(text: &str, radix: Option<u32>) -> f64 {
    let trimmed = text.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (radix, rest) = match radix {
        Some(16) | None
            if rest.len() > 1 && (rest.starts_with("0x") || rest.starts_with("0X")) =>
        {
            (16, &rest[2..])
        }
        Some(r) => (r, rest),
        None => (10, rest),
    };
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_digit(radix))
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = i64::from_str_radix(&digits, radix).unwrap_or(0) as f64;
    if negative {
        -value
    } else {
        value
    }
}

fn parse_float_impl(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if !seen_exp && end > 0 => seen_exp = true,
            '+' | '-' if seen_exp => {}
            _ => break,
        }
    }
    if end == 0 {
        return f64::NAN;
    }
    trimmed[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Undefined | Value::Function(_) | Value::Builtin(_) => None,
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Number(n) => {
            // integral numbers serialize without a fractional part
            if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
                Some(serde_json::Value::Number(serde_json::Number::from(*n as i64)))
            } else {
                Some(
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                )
            }
        }
        Value::Str(s) => Some(serde_json::Value::String(s.clone())),
        Value::Array(items) => Some(serde_json::Value::Array(
            items
                .borrow()
                .iter()
                .map(|v| value_to_json(v).unwrap_or(serde_json::Value::Null))
                .collect(),
        )),
        Value::Object(data) => {
            let mut map = serde_json::Map::new();
            for (k, v) in data.borrow().properties.iter() {
                if let Some(json) = value_to_json(v) {
                    map.insert(k.clone(), json);
                }
            }
            Some(serde_json::Value::Object(map))
        }
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut data = ObjectData::new("Object");
            for (k, v) in map {
                data.properties.insert(k.clone(), json_to_value(v));
            }
            Value::object(data)
        }
    }
}
