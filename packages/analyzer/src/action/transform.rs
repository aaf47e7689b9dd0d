//! AST transformer
//!
//! Lowers a parsed script into the Action IR. Control-flow structures
//! attach children by role; a `call` records its resolved dotted callee
//! and is tagged when it matches an accessibility-relevant idiom.

use std::sync::Arc;

use crate::parse_util::{SourceFile, Span};
use crate::script::ast::{self as js, dotted_path};

use super::ir::{Action, ActionKind, ActionTree, ChildRole};
use super::patterns;

/// Lower a program to an ActionTree rooted at `program`.
pub fn lower_program(program: &js::Program, file: Arc<SourceFile>) -> ActionTree {
    let mut transformer = Transformer {
        file,
        warnings: Vec::new(),
    };
    let mut root = Action::new(ActionKind::Program).with_span(transformer.span(program.span));
    for stmt in &program.body {
        if let Some(action) = transformer.lower_stmt(stmt) {
            root.add_child(None, action);
        }
    }
    let mut tree = ActionTree::new(root);
    tree.warnings = transformer.warnings;
    tree
}

struct Transformer {
    file: Arc<SourceFile>,
    warnings: Vec<String>,
}

impl Transformer {
    fn span(&self, span: js::ParseSpan) -> Span {
        Span::new(self.file.clone(), span.start, span.end)
    }

    fn action(&self, kind: ActionKind, span: js::ParseSpan) -> Action {
        Action::new(kind).with_span(self.span(span))
    }

    // ---- statements ----

    fn lower_stmt(&mut self, stmt: &js::Stmt) -> Option<Action> {
        match stmt {
            js::Stmt::VarDecl(decl) => Some(self.lower_var_decl(decl)),
            js::Stmt::FunctionDecl(function) => {
                Some(self.lower_function(function, ActionKind::DeclareFunction))
            }
            js::Stmt::ClassDecl(class) => Some(self.lower_class(class)),
            js::Stmt::If(stmt) => {
                let mut action = self.action(ActionKind::If, stmt.span);
                action.add_child(Some(ChildRole::Condition), self.lower_expr(&stmt.test));
                action.add_child(Some(ChildRole::Then), self.lower_stmt_as_block(&stmt.consequent));
                if let Some(alternate) = &stmt.alternate {
                    action.add_child(Some(ChildRole::Else), self.lower_stmt_as_block(alternate));
                }
                Some(action)
            }
            js::Stmt::For(stmt) => {
                let mut action = self.action(ActionKind::For, stmt.span);
                if let Some(init) = &stmt.init {
                    if let Some(lowered) = self.lower_stmt(init) {
                        action.add_child(Some(ChildRole::Init), lowered);
                    }
                }
                if let Some(test) = &stmt.test {
                    action.add_child(Some(ChildRole::Test), self.lower_expr(test));
                }
                if let Some(update) = &stmt.update {
                    action.add_child(Some(ChildRole::Update), self.lower_expr(update));
                }
                action.add_child(Some(ChildRole::Body), self.lower_stmt_as_block(&stmt.body));
                Some(action)
            }
            js::Stmt::ForIn(stmt) => Some(self.lower_for_each(stmt, ActionKind::ForIn)),
            js::Stmt::ForOf(stmt) => Some(self.lower_for_each(stmt, ActionKind::ForOf)),
            js::Stmt::While(stmt) => {
                let mut action = self.action(ActionKind::While, stmt.span);
                action.add_child(Some(ChildRole::Condition), self.lower_expr(&stmt.test));
                action.add_child(Some(ChildRole::Body), self.lower_stmt_as_block(&stmt.body));
                Some(action)
            }
            js::Stmt::DoWhile(stmt) => {
                // body precedes the test in source order
                let mut action = self.action(ActionKind::DoWhile, stmt.span);
                action.add_child(Some(ChildRole::Body), self.lower_stmt_as_block(&stmt.body));
                action.add_child(Some(ChildRole::Condition), self.lower_expr(&stmt.test));
                Some(action)
            }
            js::Stmt::Switch(stmt) => {
                let mut action = self.action(ActionKind::Switch, stmt.span);
                action.add_child(
                    Some(ChildRole::Discriminant),
                    self.lower_expr(&stmt.discriminant),
                );
                for case in &stmt.cases {
                    let kind = if case.test.is_some() {
                        ActionKind::Case
                    } else {
                        ActionKind::Default
                    };
                    let mut case_action = self.action(kind, case.span);
                    if let Some(test) = &case.test {
                        case_action.add_child(Some(ChildRole::Test), self.lower_expr(test));
                    }
                    for stmt in &case.body {
                        if let Some(lowered) = self.lower_stmt(stmt) {
                            case_action.add_child(Some(ChildRole::Body), lowered);
                        }
                    }
                    action.add_child(Some(ChildRole::Body), case_action);
                }
                Some(action)
            }
            js::Stmt::Try(stmt) => {
                let mut action = self.action(ActionKind::Try, stmt.span);
                let mut block = self.action(ActionKind::Block, stmt.span);
                for inner in &stmt.block {
                    if let Some(lowered) = self.lower_stmt(inner) {
                        block.add_child(None, lowered);
                    }
                }
                action.add_child(Some(ChildRole::Try), block);
                if let Some(handler) = &stmt.handler {
                    let mut catch = self.action(ActionKind::Catch, handler.span);
                    if let Some(param) = &handler.param {
                        catch.set_attr("name", param.as_str());
                    }
                    for inner in &handler.body {
                        if let Some(lowered) = self.lower_stmt(inner) {
                            catch.add_child(Some(ChildRole::Body), lowered);
                        }
                    }
                    action.add_child(Some(ChildRole::Body), catch);
                }
                if let Some(finalizer) = &stmt.finalizer {
                    let mut finally = match finalizer.first() {
                        Some(first) => {
                            let span = js::ParseSpan::new(first.span().start, stmt.span.end);
                            self.action(ActionKind::Finally, span)
                        }
                        None => Action::new(ActionKind::Finally),
                    };
                    for inner in finalizer {
                        if let Some(lowered) = self.lower_stmt(inner) {
                            finally.add_child(Some(ChildRole::Body), lowered);
                        }
                    }
                    action.add_child(Some(ChildRole::Body), finally);
                }
                Some(action)
            }
            js::Stmt::Return(stmt) => {
                let mut action = self.action(ActionKind::Return, stmt.span);
                if let Some(argument) = &stmt.argument {
                    action.add_child(Some(ChildRole::Argument), self.lower_expr(argument));
                }
                Some(action)
            }
            js::Stmt::Throw(stmt) => {
                let mut action = self.action(ActionKind::Throw, stmt.span);
                action.add_child(Some(ChildRole::Argument), self.lower_expr(&stmt.argument));
                Some(action)
            }
            js::Stmt::Break(stmt) => {
                let mut action = self.action(ActionKind::Break, stmt.span);
                if let Some(label) = &stmt.label {
                    action.set_attr("label", label.as_str());
                }
                Some(action)
            }
            js::Stmt::Continue(stmt) => {
                let mut action = self.action(ActionKind::Continue, stmt.span);
                if let Some(label) = &stmt.label {
                    action.set_attr("label", label.as_str());
                }
                Some(action)
            }
            js::Stmt::Block(block) => {
                let mut action = self.action(ActionKind::Block, block.span);
                for inner in &block.body {
                    if let Some(lowered) = self.lower_stmt(inner) {
                        action.add_child(None, lowered);
                    }
                }
                Some(action)
            }
            js::Stmt::Expr(stmt) => Some(self.lower_expr(&stmt.expr)),
            js::Stmt::Import(decl) => {
                let mut action = self.action(ActionKind::Import, decl.span);
                action.set_attr("source", decl.source.as_str());
                if let Some(default_name) = &decl.default_name {
                    action.set_attr("default", default_name.as_str());
                }
                if let Some(namespace) = &decl.namespace {
                    action.set_attr("namespace", namespace.as_str());
                }
                for name in &decl.named {
                    let ident = Action::new(ActionKind::Identifier).with_attr("name", name.as_str());
                    action.add_child(Some(ChildRole::Value), ident);
                }
                Some(action)
            }
            js::Stmt::Export(decl) => {
                let kind = if decl.is_default {
                    ActionKind::ExportDefault
                } else {
                    ActionKind::Export
                };
                let mut action = self.action(kind, decl.span);
                if let Some(inner) = &decl.decl {
                    if let Some(lowered) = self.lower_stmt(inner) {
                        action.add_child(Some(ChildRole::Value), lowered);
                    }
                }
                if let Some(expr) = &decl.expr {
                    action.add_child(Some(ChildRole::Value), self.lower_expr(expr));
                }
                for name in &decl.named {
                    let ident = Action::new(ActionKind::Identifier).with_attr("name", name.as_str());
                    action.add_child(Some(ChildRole::Value), ident);
                }
                Some(action)
            }
            js::Stmt::Empty(_) => None,
        }
    }

    fn lower_stmt_as_block(&mut self, stmt: &js::Stmt) -> Action {
        match self.lower_stmt(stmt) {
            Some(action) => action,
            None => self.action(ActionKind::Block, stmt.span()),
        }
    }

    /// Multiple declarators lower to a `seq`; a single declarator to the
    /// bare declaration.
    fn lower_var_decl(&mut self, decl: &js::VarDecl) -> Action {
        let kind = match decl.kind {
            js::VarKind::Const => ActionKind::DeclareConst,
            _ => ActionKind::DeclareVar,
        };
        let kind_attr = match decl.kind {
            js::VarKind::Var => "var",
            js::VarKind::Let => "let",
            js::VarKind::Const => "const",
        };
        let mut lowered: Vec<Action> = decl
            .declarators
            .iter()
            .map(|declarator| {
                let mut action = self.action(kind.clone(), declarator.span);
                action.set_attr("name", declarator.name.as_str());
                action.set_attr("kind", kind_attr);
                if let Some(init) = &declarator.init {
                    action.add_child(Some(ChildRole::Init), self.lower_expr(init));
                }
                action
            })
            .collect();
        if lowered.len() == 1 {
            lowered.pop().unwrap()
        } else {
            let mut seq = self.action(ActionKind::Seq, decl.span);
            for action in lowered {
                seq.add_child(None, action);
            }
            seq
        }
    }

    fn lower_for_each(&mut self, stmt: &js::ForEachStmt, kind: ActionKind) -> Action {
        let mut action = self.action(kind, stmt.span);
        let variable = Action::new(ActionKind::Identifier).with_attr("name", stmt.variable.as_str());
        action.add_child(Some(ChildRole::Variable), variable);
        action.add_child(Some(ChildRole::Iterable), self.lower_expr(&stmt.iterable));
        action.add_child(Some(ChildRole::Body), self.lower_stmt_as_block(&stmt.body));
        action
    }

    fn lower_function(&mut self, function: &js::Function, kind: ActionKind) -> Action {
        let mut action = self.action(kind, function.span);
        if let Some(name) = &function.name {
            action.set_attr("name", name.as_str());
        }
        if function.is_async {
            action.set_attr("async", true);
        }
        for param in &function.params {
            let mut param_action = self.action(ActionKind::DeclareParam, param.span);
            param_action.set_attr("name", param.name.as_str());
            if let Some(default) = &param.default {
                param_action.add_child(Some(ChildRole::Init), self.lower_expr(default));
            }
            action.add_child(Some(ChildRole::Argument), param_action);
        }
        if let Some(expr) = &function.expression_body {
            action.set_attr("expression", true);
            action.add_child(Some(ChildRole::Body), self.lower_expr(expr));
        } else {
            for stmt in &function.body {
                if let Some(lowered) = self.lower_stmt(stmt) {
                    action.add_child(Some(ChildRole::Body), lowered);
                }
            }
        }
        action
    }

    fn lower_class(&mut self, class: &js::ClassDecl) -> Action {
        let mut action = self.action(ActionKind::DeclareClass, class.span);
        if let Some(name) = &class.name {
            action.set_attr("name", name.as_str());
        }
        if let Some(superclass) = &class.superclass {
            action.add_child(Some(ChildRole::Value), self.lower_expr(superclass));
        }
        for method in &class.methods {
            let mut lowered = self.lower_function(&method.function, ActionKind::DeclareMethod);
            lowered.set_attr("name", method.name.as_str());
            if method.is_static {
                lowered.set_attr("static", true);
            }
            action.add_child(Some(ChildRole::Body), lowered);
        }
        action
    }

    // ---- expressions ----

    fn lower_expr(&mut self, expr: &js::Expr) -> Action {
        match expr {
            js::Expr::Identifier(ident) => self
                .action(ActionKind::Identifier, ident.span)
                .with_attr("name", ident.name.as_str()),
            js::Expr::Literal(lit) => self.lower_literal(lit),
            js::Expr::Template(template) => {
                let mut action = self.action(ActionKind::Template, template.span);
                let mut exprs = template.exprs.iter();
                for quasi in &template.quasis {
                    let text = Action::new(ActionKind::Literal)
                        .with_attr("value", quasi.as_str())
                        .with_attr("type", "string");
                    action.add_child(Some(ChildRole::Value), text);
                    if let Some(expr) = exprs.next() {
                        action.add_child(Some(ChildRole::Argument), self.lower_expr(expr));
                    }
                }
                action
            }
            js::Expr::ArrayLit(array) => {
                let mut action = self.action(ActionKind::Array, array.span);
                for element in &array.elements {
                    action.add_child(Some(ChildRole::Value), self.lower_expr(element));
                }
                action
            }
            js::Expr::ObjectLit(object) => {
                let mut action = self.action(ActionKind::Object, object.span);
                for member in &object.members {
                    match member {
                        js::ObjectMember::Prop(prop) => {
                            let mut prop_action = self.action(ActionKind::Property, prop.span);
                            match &prop.key {
                                js::PropKey::Ident(name) | js::PropKey::Str(name) => {
                                    prop_action.set_attr("key", name.as_str());
                                }
                                js::PropKey::Num(n) => {
                                    prop_action.set_attr("key", format_number(*n));
                                }
                                js::PropKey::Computed(expr) => {
                                    prop_action
                                        .add_child(Some(ChildRole::Key), self.lower_expr(expr));
                                }
                            }
                            prop_action.add_child(Some(ChildRole::Value), self.lower_expr(&prop.value));
                            action.add_child(Some(ChildRole::Value), prop_action);
                        }
                        js::ObjectMember::Spread(spread) => {
                            let mut spread_action = self.action(ActionKind::Spread, spread.span);
                            spread_action
                                .add_child(Some(ChildRole::Argument), self.lower_expr(&spread.argument));
                            action.add_child(Some(ChildRole::Value), spread_action);
                        }
                    }
                }
                action
            }
            js::Expr::Function(function) => {
                let kind = if function.is_arrow {
                    ActionKind::ArrowFunction
                } else {
                    ActionKind::FunctionExpr
                };
                self.lower_function(function, kind)
            }
            js::Expr::Call(call) => self.lower_call(call, ActionKind::Call),
            js::Expr::New(call) => self.lower_call(call, ActionKind::New),
            js::Expr::Member(member) => {
                let mut action = self.action(ActionKind::MemberAccess, member.span);
                action.add_child(Some(ChildRole::Object), self.lower_expr(&member.object));
                match &member.property {
                    js::MemberProp::Ident(name) => {
                        action.set_attr("property", name.as_str());
                    }
                    js::MemberProp::Computed(expr) => {
                        action.add_child(Some(ChildRole::Property), self.lower_expr(expr));
                    }
                }
                if member.optional {
                    action.set_attr("optional", true);
                }
                action
            }
            js::Expr::Assign(assign) => {
                let mut action = self.action(ActionKind::Assign, assign.span);
                action.set_attr("op", assign.op.as_str());
                action.add_child(Some(ChildRole::Left), self.lower_expr(&assign.target));
                action.add_child(Some(ChildRole::Right), self.lower_expr(&assign.value));
                action
            }
            js::Expr::Binary(binary) => {
                let mut action = self.action(ActionKind::BinaryOp, binary.span);
                action.set_attr("op", binary.op.as_str());
                action.add_child(Some(ChildRole::Left), self.lower_expr(&binary.left));
                action.add_child(Some(ChildRole::Right), self.lower_expr(&binary.right));
                action
            }
            js::Expr::Logical(logical) => {
                let mut action = self.action(ActionKind::LogicalOp, logical.span);
                action.set_attr("op", logical.op.as_str());
                action.add_child(Some(ChildRole::Left), self.lower_expr(&logical.left));
                action.add_child(Some(ChildRole::Right), self.lower_expr(&logical.right));
                action
            }
            js::Expr::Unary(unary) => {
                let mut action = self.action(ActionKind::UnaryOp, unary.span);
                action.set_attr("op", unary.op.as_str());
                action.add_child(Some(ChildRole::Argument), self.lower_expr(&unary.argument));
                action
            }
            js::Expr::Update(update) => {
                // no dedicated update kind: `++`/`--` are unary operators
                // that write back to their identifier target
                let mut action = self.action(ActionKind::UnaryOp, update.span);
                action.set_attr("op", update.op.as_str());
                action.set_attr("prefix", update.prefix);
                action.add_child(Some(ChildRole::Argument), self.lower_expr(&update.argument));
                action
            }
            js::Expr::Conditional(cond) => {
                let mut action = self.action(ActionKind::Conditional, cond.span);
                action.add_child(Some(ChildRole::Condition), self.lower_expr(&cond.test));
                action.add_child(Some(ChildRole::Then), self.lower_expr(&cond.consequent));
                action.add_child(Some(ChildRole::Else), self.lower_expr(&cond.alternate));
                action
            }
            js::Expr::Await(await_expr) => {
                let mut action = self.action(ActionKind::Await, await_expr.span);
                action.add_child(Some(ChildRole::Argument), self.lower_expr(&await_expr.argument));
                action
            }
            js::Expr::Yield(yield_expr) => {
                let mut action = self.action(ActionKind::Yield, yield_expr.span);
                if yield_expr.delegate {
                    action.set_attr("delegate", true);
                }
                if let Some(argument) = &yield_expr.argument {
                    action.add_child(Some(ChildRole::Argument), self.lower_expr(argument));
                }
                action
            }
            js::Expr::Spread(spread) => {
                let mut action = self.action(ActionKind::Spread, spread.span);
                action.add_child(Some(ChildRole::Argument), self.lower_expr(&spread.argument));
                action
            }
            js::Expr::Sequence(sequence) => {
                let mut action = self.action(ActionKind::Seq, sequence.span);
                for expr in &sequence.exprs {
                    action.add_child(None, self.lower_expr(expr));
                }
                action
            }
        }
    }

    fn lower_literal(&mut self, lit: &js::Lit) -> Action {
        let mut action = self.action(ActionKind::Literal, lit.span);
        match &lit.value {
            js::LitValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
                    action.set_attr("value", *n as i64);
                } else {
                    action.set_attr("value", format_number(*n));
                }
                action.set_attr("type", "number");
            }
            js::LitValue::Str(s) => {
                action.set_attr("value", s.as_str());
                action.set_attr("type", "string");
            }
            js::LitValue::Bool(b) => {
                action.set_attr("value", *b);
                action.set_attr("type", "boolean");
            }
            js::LitValue::Null => {
                action.set_attr("type", "null");
            }
        }
        if !lit.raw.is_empty() {
            action.set_attr("raw", lit.raw.as_str());
        }
        action
    }

    fn lower_call(&mut self, call: &js::CallExpr, kind: ActionKind) -> Action {
        let mut action = self.action(kind.clone(), call.span);
        action.add_child(Some(ChildRole::Callee), self.lower_expr(&call.callee));
        let mut lowered_args = Vec::new();
        for arg in &call.args {
            lowered_args.push(self.lower_expr(arg));
        }
        if let Some(path) = dotted_path(&call.callee) {
            action.set_attr("callee", path.as_str());
            if kind == ActionKind::Call {
                let arg_refs: Vec<&Action> = lowered_args.iter().collect();
                if let Some(pattern) = patterns::detect(&path, &arg_refs) {
                    action.set_attr("pattern", pattern.as_str());
                }
            }
        }
        for arg in lowered_args {
            action.add_child(Some(ChildRole::Argument), arg);
        }
        if call.optional {
            action.set_attr("optional", true);
        }
        action
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
