//! Script parser
//!
//! Recursive descent over the token stream. Recovers at statement
//! boundaries: a syntax error records a `ParseError`, skips to the next
//! `;`/`}` at depth zero and continues, so a program is always produced.

use std::sync::Arc;

use crate::parse_util::{ParseError, SourceFile, Span};

use super::ast::*;
use super::lexer::{Lexer, TemplateSegment, Token, TokenType};

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser { lexer: Lexer::new() }
    }

    pub fn parse(&self, source: &str, path: &str) -> ParseResult {
        let file = SourceFile::new(path, source);
        let tokens = self.lexer.tokenize(source);
        let mut ctx = ParseCtx::new(file, tokens, source.len());
        let program = ctx.parse_program();
        ParseResult {
            program,
            errors: ctx.errors,
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

struct ParseCtx {
    file: Arc<SourceFile>,
    tokens: Vec<Token>,
    index: usize,
    errors: Vec<ParseError>,
    eof: Token,
}

impl ParseCtx {
    fn new(file: Arc<SourceFile>, tokens: Vec<Token>, source_len: usize) -> Self {
        let eof = Token {
            index: source_len,
            end: source_len,
            token_type: TokenType::Character,
            num_value: 0.0,
            str_value: String::new(),
            newline_before: true,
            segments: Vec::new(),
        };
        ParseCtx {
            file,
            tokens,
            index: 0,
            errors: Vec::new(),
            eof,
        }
    }

    // ---- cursor helpers ----

    fn peek(&self) -> &Token {
        self.tokens.get(self.index).unwrap_or(&self.eof)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.tokens.get(self.index + ahead).unwrap_or(&self.eof)
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn prev_end(&self) -> usize {
        if self.index == 0 {
            0
        } else {
            self.tokens[self.index - 1].end
        }
    }

    fn span_from(&self, start: usize) -> ParseSpan {
        ParseSpan::new(start, self.prev_end().max(start))
    }

    fn eat_character(&mut self, c: char) -> bool {
        if self.peek().is_character(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: &str) -> bool {
        if self.peek().is_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek().is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_character(&mut self, c: char) -> Option<()> {
        if self.eat_character(c) {
            Some(())
        } else {
            self.error_here(format!("Expected `{}`", c));
            None
        }
    }

    fn error_here(&mut self, msg: String) {
        let token = self.peek().clone();
        let span = Span::new(self.file.clone(), token.index, token.end.max(token.index));
        self.errors.push(ParseError::new(span, msg));
    }

    /// Skip ahead to a statement boundary after an error.
    fn recover(&mut self) {
        let mut depth = 0i32;
        while !self.at_end() {
            let token = self.peek();
            if token.is_character('(') || token.is_character('[') || token.is_character('{') {
                depth += 1;
            } else if token.is_character(')') || token.is_character(']') {
                depth -= 1;
            } else if token.is_character('}') {
                if depth <= 0 {
                    return; // let the enclosing block consume it
                }
                depth -= 1;
            } else if token.is_character(';') && depth <= 0 {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Statement terminator: explicit `;`, closing brace, EOF, or an
    /// inserted semicolon implied by a preceding line terminator.
    fn consume_statement_end(&mut self) {
        if self.eat_character(';') {
            return;
        }
        if self.at_end() || self.peek().is_character('}') || self.peek().newline_before {
            return;
        }
        self.error_here("Expected `;`".to_string());
        self.recover();
    }

    // ---- statements ----

    fn parse_program(&mut self) -> Program {
        let mut body = Vec::new();
        let end = self.eof.end;
        while !self.at_end() {
            let before = self.index;
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => {
                    self.recover();
                    // a stray `}` at top level would stall recovery
                    if self.index == before {
                        self.advance();
                    }
                }
            }
        }
        Program {
            body,
            span: ParseSpan::new(0, end),
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        let token = self.peek().clone();
        if token.is_error() {
            let span = Span::new(self.file.clone(), token.index, token.end.max(token.index));
            self.errors.push(ParseError::new(span, token.str_value.clone()));
            self.advance();
            return None;
        }
        if token.token_type == TokenType::Keyword {
            match token.str_value.as_str() {
                "var" | "let" | "const" => return self.parse_var_statement(),
                "function" => return self.parse_function_declaration(false),
                "async" if self.peek_at(1).is_keyword("function") => {
                    self.advance();
                    return self.parse_function_declaration(true);
                }
                "class" => {
                    let class = self.parse_class(true)?;
                    return Some(Stmt::ClassDecl(class));
                }
                "if" => return self.parse_if(),
                "for" => return self.parse_for(),
                "while" => return self.parse_while(),
                "do" => return self.parse_do_while(),
                "switch" => return self.parse_switch(),
                "try" => return self.parse_try(),
                "return" => return self.parse_return(),
                "throw" => return self.parse_throw(),
                "break" | "continue" => return self.parse_jump(&token.str_value),
                "import" => return self.parse_import(),
                "export" => return self.parse_export(),
                _ => {}
            }
        }
        if token.is_character('{') {
            let block = self.parse_block()?;
            return Some(Stmt::Block(block));
        }
        if token.is_character(';') {
            self.advance();
            return Some(Stmt::Empty(ParseSpan::new(token.index, token.end)));
        }
        let start = token.index;
        let expr = self.parse_expression()?;
        self.consume_statement_end();
        Some(Stmt::Expr(ExprStmt {
            expr,
            span: self.span_from(start),
        }))
    }

    fn parse_var_statement(&mut self) -> Option<Stmt> {
        let decl = self.parse_var_decl()?;
        self.consume_statement_end();
        Some(Stmt::VarDecl(decl))
    }

    fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let start = self.peek().index;
        let kind_token = self.advance();
        let kind = match kind_token.str_value.as_str() {
            "var" => VarKind::Var,
            "const" => VarKind::Const,
            _ => VarKind::Let,
        };
        let mut declarators = Vec::new();
        loop {
            let decl_start = self.peek().index;
            if !self.peek().is_identifier() {
                self.error_here("Expected variable name".to_string());
                return None;
            }
            let name = self.advance().str_value;
            let init = if self.eat_operator("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                init,
                span: self.span_from(decl_start),
            });
            if !self.eat_character(',') {
                break;
            }
        }
        Some(VarDecl {
            kind,
            declarators,
            span: self.span_from(start),
        })
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // function
        let name = if self.peek().is_identifier() {
            Some(self.advance().str_value)
        } else {
            self.error_here("Expected function name".to_string());
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        Some(Stmt::FunctionDecl(Function {
            name,
            params,
            body,
            expression_body: None,
            is_arrow: false,
            is_async,
            span: self.span_from(start),
        }))
    }

    fn parse_class(&mut self, _is_decl: bool) -> Option<ClassDecl> {
        let start = self.peek().index;
        self.advance(); // class
        let name = if self.peek().is_identifier() {
            Some(self.advance().str_value)
        } else {
            None
        };
        let superclass = if self.eat_keyword("extends") {
            Some(self.parse_call_member()?)
        } else {
            None
        };
        self.expect_character('{')?;
        let mut methods = Vec::new();
        while !self.peek().is_character('}') && !self.at_end() {
            if self.eat_character(';') {
                continue;
            }
            let method_start = self.peek().index;
            let is_static = self.eat_keyword("static");
            let is_async = self.peek().is_keyword("async") && !self.peek_at(1).is_character('(');
            if is_async {
                self.advance();
            }
            if !self.peek().is_property_name() {
                self.error_here("Expected method name".to_string());
                self.recover();
                continue;
            }
            let method_name = self.advance().str_value;
            if self.peek().is_character('(') {
                let params = self.parse_params()?;
                let body = self.parse_function_body()?;
                let span = self.span_from(method_start);
                methods.push(MethodDef {
                    name: method_name.clone(),
                    is_static,
                    function: Function {
                        name: Some(method_name),
                        params,
                        body,
                        expression_body: None,
                        is_arrow: false,
                        is_async,
                        span,
                    },
                    span,
                });
            } else {
                // class field: `name = value;`
                if self.eat_operator("=") {
                    self.parse_assignment()?;
                }
                self.consume_statement_end();
            }
        }
        self.expect_character('}')?;
        Some(ClassDecl {
            name,
            superclass,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // if
        self.expect_character('(')?;
        let test = self.parse_expression()?;
        self.expect_character(')')?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(Stmt::If(IfStmt {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // for
        self.expect_character('(')?;

        // declaration-headed loops
        if matches!(self.peek().str_value.as_str(), "var" | "let" | "const")
            && self.peek().is_any_keyword()
        {
            let kind_token = self.peek().clone();
            let kind = match kind_token.str_value.as_str() {
                "var" => VarKind::Var,
                "const" => VarKind::Const,
                _ => VarKind::Let,
            };
            if self.peek_at(1).is_identifier()
                && (self.peek_at(2).is_keyword("in") || self.peek_at(2).is_keyword("of"))
            {
                self.advance(); // kind
                let variable = self.advance().str_value;
                let is_in = self.eat_keyword("in");
                if !is_in {
                    self.eat_keyword("of");
                }
                let iterable = self.parse_assignment()?;
                self.expect_character(')')?;
                let body = Box::new(self.parse_statement()?);
                let stmt = ForEachStmt {
                    decl_kind: Some(kind),
                    variable,
                    iterable,
                    body,
                    span: self.span_from(start),
                };
                return Some(if is_in { Stmt::ForIn(stmt) } else { Stmt::ForOf(stmt) });
            }
            let decl = self.parse_var_decl()?;
            self.expect_character(';')?;
            return self.parse_classic_for_tail(start, Some(Box::new(Stmt::VarDecl(decl))));
        }

        if self.eat_character(';') {
            return self.parse_classic_for_tail(start, None);
        }

        // expression-headed: may still be `x in y` / `x of y`
        if self.peek().is_identifier()
            && (self.peek_at(1).is_keyword("in") || self.peek_at(1).is_keyword("of"))
        {
            let variable = self.advance().str_value;
            let is_in = self.eat_keyword("in");
            if !is_in {
                self.eat_keyword("of");
            }
            let iterable = self.parse_assignment()?;
            self.expect_character(')')?;
            let body = Box::new(self.parse_statement()?);
            let stmt = ForEachStmt {
                decl_kind: None,
                variable,
                iterable,
                body,
                span: self.span_from(start),
            };
            return Some(if is_in { Stmt::ForIn(stmt) } else { Stmt::ForOf(stmt) });
        }

        let init_start = self.peek().index;
        let init = self.parse_expression()?;
        let init_stmt = Stmt::Expr(ExprStmt {
            expr: init,
            span: self.span_from(init_start),
        });
        self.expect_character(';')?;
        self.parse_classic_for_tail(start, Some(Box::new(init_stmt)))
    }

    fn parse_classic_for_tail(&mut self, start: usize, init: Option<Box<Stmt>>) -> Option<Stmt> {
        let test = if self.peek().is_character(';') {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_character(';')?;
        let update = if self.peek().is_character(')') {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_character(')')?;
        let body = Box::new(self.parse_statement()?);
        Some(Stmt::For(ForStmt {
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // while
        self.expect_character('(')?;
        let test = self.parse_expression()?;
        self.expect_character(')')?;
        let body = Box::new(self.parse_statement()?);
        Some(Stmt::While(WhileStmt {
            test,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_do_while(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // do
        let body = Box::new(self.parse_statement()?);
        if !self.eat_keyword("while") {
            self.error_here("Expected `while` after do-body".to_string());
            return None;
        }
        self.expect_character('(')?;
        let test = self.parse_expression()?;
        self.expect_character(')')?;
        self.eat_character(';');
        Some(Stmt::DoWhile(WhileStmt {
            test,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_switch(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // switch
        self.expect_character('(')?;
        let discriminant = self.parse_expression()?;
        self.expect_character(')')?;
        self.expect_character('{')?;
        let mut cases = Vec::new();
        while !self.peek().is_character('}') && !self.at_end() {
            let case_start = self.peek().index;
            let test = if self.eat_keyword("case") {
                let test = self.parse_expression()?;
                Some(test)
            } else if self.eat_keyword("default") {
                None
            } else {
                self.error_here("Expected `case` or `default`".to_string());
                self.recover();
                continue;
            };
            self.expect_character(':')?;
            let mut body = Vec::new();
            while !self.peek().is_character('}')
                && !self.peek().is_keyword("case")
                && !self.peek().is_keyword("default")
                && !self.at_end()
            {
                match self.parse_statement() {
                    Some(stmt) => body.push(stmt),
                    None => self.recover(),
                }
            }
            cases.push(SwitchCase {
                test,
                body,
                span: self.span_from(case_start),
            });
        }
        self.expect_character('}')?;
        Some(Stmt::Switch(SwitchStmt {
            discriminant,
            cases,
            span: self.span_from(start),
        }))
    }

    fn parse_try(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // try
        let block = self.parse_block()?.body;
        let handler = if self.peek().is_keyword("catch") {
            let catch_start = self.peek().index;
            self.advance();
            let param = if self.eat_character('(') {
                let name = if self.peek().is_identifier() {
                    Some(self.advance().str_value)
                } else {
                    None
                };
                self.expect_character(')')?;
                name
            } else {
                None
            };
            let body = self.parse_block()?.body;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };
        let finalizer = if self.eat_keyword("finally") {
            Some(self.parse_block()?.body)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            self.error_here("Missing catch or finally after try".to_string());
        }
        Some(Stmt::Try(TryStmt {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        }))
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // return
        let argument = if self.peek().is_character(';')
            || self.peek().is_character('}')
            || self.at_end()
            || self.peek().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_statement_end();
        Some(Stmt::Return(ReturnStmt {
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_throw(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // throw
        if self.peek().newline_before {
            self.error_here("Illegal newline after throw".to_string());
            return None;
        }
        let argument = self.parse_expression()?;
        self.consume_statement_end();
        Some(Stmt::Throw(ThrowStmt {
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_jump(&mut self, which: &str) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance();
        let label = if self.peek().is_identifier() && !self.peek().newline_before {
            Some(self.advance().str_value)
        } else {
            None
        };
        self.consume_statement_end();
        let stmt = JumpStmt {
            label,
            span: self.span_from(start),
        };
        Some(if which == "break" {
            Stmt::Break(stmt)
        } else {
            Stmt::Continue(stmt)
        })
    }

    fn parse_import(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // import
        let mut default_name = None;
        let mut namespace = None;
        let mut named = Vec::new();

        if self.peek().is_string() {
            let source = self.advance().str_value;
            self.consume_statement_end();
            return Some(Stmt::Import(ImportDecl {
                source,
                default_name,
                namespace,
                named,
                span: self.span_from(start),
            }));
        }

        if self.peek().is_identifier() {
            default_name = Some(self.advance().str_value);
            self.eat_character(',');
        }
        if self.eat_operator("*") {
            self.eat_keyword("as");
            if self.peek().is_identifier() {
                namespace = Some(self.advance().str_value);
            }
        } else if self.eat_character('{') {
            while !self.peek().is_character('}') && !self.at_end() {
                if self.peek().is_property_name() {
                    let mut name = self.advance().str_value;
                    if self.eat_keyword("as") {
                        if self.peek().is_identifier() {
                            name = self.advance().str_value;
                        }
                    }
                    named.push(name);
                }
                if !self.eat_character(',') {
                    break;
                }
            }
            self.expect_character('}')?;
        }
        if !self.eat_keyword("from") {
            self.error_here("Expected `from` in import".to_string());
            return None;
        }
        if !self.peek().is_string() {
            self.error_here("Expected module source string".to_string());
            return None;
        }
        let source = self.advance().str_value;
        self.consume_statement_end();
        Some(Stmt::Import(ImportDecl {
            source,
            default_name,
            namespace,
            named,
            span: self.span_from(start),
        }))
    }

    fn parse_export(&mut self) -> Option<Stmt> {
        let start = self.peek().index;
        self.advance(); // export
        if self.eat_keyword("default") {
            if matches!(self.peek().str_value.as_str(), "function" | "class" | "async")
                && self.peek().is_any_keyword()
            {
                let decl = self.parse_statement()?;
                return Some(Stmt::Export(ExportDecl {
                    is_default: true,
                    decl: Some(Box::new(decl)),
                    expr: None,
                    named: Vec::new(),
                    span: self.span_from(start),
                }));
            }
            let expr = self.parse_assignment()?;
            self.consume_statement_end();
            return Some(Stmt::Export(ExportDecl {
                is_default: true,
                decl: None,
                expr: Some(expr),
                named: Vec::new(),
                span: self.span_from(start),
            }));
        }
        if self.eat_character('{') {
            let mut named = Vec::new();
            while !self.peek().is_character('}') && !self.at_end() {
                if self.peek().is_property_name() {
                    named.push(self.advance().str_value);
                    if self.eat_keyword("as") && self.peek().is_property_name() {
                        self.advance();
                    }
                }
                if !self.eat_character(',') {
                    break;
                }
            }
            self.expect_character('}')?;
            if self.eat_keyword("from") && self.peek().is_string() {
                self.advance();
            }
            self.consume_statement_end();
            return Some(Stmt::Export(ExportDecl {
                is_default: false,
                decl: None,
                expr: None,
                named,
                span: self.span_from(start),
            }));
        }
        let decl = self.parse_statement()?;
        Some(Stmt::Export(ExportDecl {
            is_default: false,
            decl: Some(Box::new(decl)),
            expr: None,
            named: Vec::new(),
            span: self.span_from(start),
        }))
    }

    fn parse_block(&mut self) -> Option<BlockStmt> {
        let start = self.peek().index;
        self.expect_character('{')?;
        let mut body = Vec::new();
        while !self.peek().is_character('}') && !self.at_end() {
            let before = self.index;
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => {
                    self.recover();
                    if self.index == before {
                        break;
                    }
                }
            }
        }
        self.expect_character('}')?;
        Some(BlockStmt {
            body,
            span: self.span_from(start),
        })
    }

    // ---- expressions ----

    fn parse_expression(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let first = self.parse_assignment()?;
        if !self.peek().is_character(',') {
            return Some(first);
        }
        let mut exprs = vec![first];
        while self.eat_character(',') {
            exprs.push(self.parse_assignment()?);
        }
        let span = self.span_from(start);
        Some(Expr::Sequence(Box::new(SequenceExpr { exprs, span })))
    }

    fn parse_assignment(&mut self) -> Option<Expr> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Some(arrow);
        }
        if self.peek().is_keyword("yield") {
            return self.parse_yield();
        }
        let start = self.peek().index;
        let target = self.parse_conditional()?;
        let op = self.peek().str_value.clone();
        if self.peek().token_type == TokenType::Operator && ASSIGN_OPS.contains(&op.as_str()) {
            self.advance();
            let value = self.parse_assignment()?;
            let span = self.span_from(start);
            return Some(Expr::Assign(Box::new(AssignExpr {
                op,
                target,
                value,
                span,
            })));
        }
        Some(target)
    }

    /// Detect and parse an arrow function at the current position.
    /// Returns `Ok(None)` when the tokens do not begin an arrow.
    fn try_parse_arrow(&mut self) -> Option<Option<Expr>> {
        let is_async = self.peek().is_keyword("async") && !self.peek_at(1).newline_before;
        let offset = if is_async { 1 } else { 0 };

        // single-parameter form: `x => ...`
        if self.peek_at(offset).is_identifier() && self.peek_at(offset + 1).is_operator("=>") {
            let start = self.peek().index;
            if is_async {
                self.advance();
            }
            let param_token = self.advance();
            let params = vec![Param {
                name: param_token.str_value,
                default: None,
                span: ParseSpan::new(param_token.index, param_token.end),
            }];
            self.advance(); // =>
            return Some(Some(self.parse_arrow_tail(start, params, is_async)?));
        }

        // parenthesized form: `(a, b = 1) => ...`
        if self.peek_at(offset).is_character('(') && self.paren_group_is_arrow(offset) {
            let start = self.peek().index;
            if is_async {
                self.advance();
            }
            let params = self.parse_params()?;
            if !self.eat_operator("=>") {
                self.error_here("Expected `=>`".to_string());
                return None;
            }
            return Some(Some(self.parse_arrow_tail(start, params, is_async)?));
        }

        Some(None)
    }

    /// Token lookahead: does the parenthesized group starting at
    /// `self.index + offset` close with `) =>`?
    fn paren_group_is_arrow(&self, offset: usize) -> bool {
        let mut i = self.index + offset;
        let mut depth = 0i32;
        while let Some(token) = self.tokens.get(i) {
            if token.is_character('(') || token.is_character('[') || token.is_character('{') {
                depth += 1;
            } else if token.is_character(')') || token.is_character(']') || token.is_character('}') {
                depth -= 1;
                if depth == 0 {
                    return self
                        .tokens
                        .get(i + 1)
                        .map(|next| next.is_operator("=>"))
                        .unwrap_or(false);
                }
            }
            i += 1;
        }
        false
    }

    fn parse_arrow_tail(&mut self, start: usize, params: Vec<Param>, is_async: bool) -> Option<Expr> {
        if self.peek().is_character('{') {
            let body = self.parse_block()?.body;
            let span = self.span_from(start);
            return Some(Expr::Function(Box::new(Function {
                name: None,
                params,
                body,
                expression_body: None,
                is_arrow: true,
                is_async,
                span,
            })));
        }
        let body_expr = self.parse_assignment()?;
        let span = self.span_from(start);
        Some(Expr::Function(Box::new(Function {
            name: None,
            params,
            body: Vec::new(),
            expression_body: Some(Box::new(body_expr)),
            is_arrow: true,
            is_async,
            span,
        })))
    }

    fn parse_yield(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        self.advance(); // yield
        let delegate = self.eat_operator("*");
        let argument = if self.peek().is_character(';')
            || self.peek().is_character(')')
            || self.peek().is_character('}')
            || self.peek().is_character(',')
            || self.peek().newline_before
            || self.at_end()
        {
            None
        } else {
            Some(self.parse_assignment()?)
        };
        let span = self.span_from(start);
        Some(Expr::Yield(Box::new(YieldExpr {
            argument,
            delegate,
            span,
        })))
    }

    fn parse_conditional(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let test = self.parse_binary(0)?;
        if self.eat_operator("?") {
            let consequent = self.parse_assignment()?;
            self.expect_character(':')?;
            let alternate = self.parse_assignment()?;
            let span = self.span_from(start);
            return Some(Expr::Conditional(Box::new(ConditionalExpr {
                test,
                consequent,
                alternate,
                span,
            })));
        }
        Some(test)
    }

    /// Binary operator levels, loosest first. Logical levels produce
    /// `Expr::Logical`; everything else `Expr::Binary`.
    fn parse_binary(&mut self, level: usize) -> Option<Expr> {
        const LEVELS: &[&[&str]] = &[
            &["??"],
            &["||"],
            &["&&"],
            &["|"],
            &["^"],
            &["&"],
            &["==", "!=", "===", "!=="],
            &["<", ">", "<=", ">=", "instanceof", "in"],
            &["<<", ">>", ">>>"],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        if level >= LEVELS.len() {
            return self.parse_exponent();
        }
        let start = self.peek().index;
        let mut left = self.parse_binary(level + 1)?;
        loop {
            let token = self.peek();
            let matched = LEVELS[level].iter().find(|op| {
                if **op == "instanceof" || **op == "in" {
                    token.is_keyword(op)
                } else {
                    token.is_operator(op)
                }
            });
            let op = match matched {
                Some(op) => (*op).to_string(),
                None => break,
            };
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let span = self.span_from(start);
            let node = Box::new(BinaryExpr {
                op: op.clone(),
                left,
                right,
                span,
            });
            left = if matches!(op.as_str(), "&&" | "||" | "??") {
                Expr::Logical(node)
            } else {
                Expr::Binary(node)
            };
        }
        Some(left)
    }

    fn parse_exponent(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let base = self.parse_unary()?;
        if self.eat_operator("**") {
            let exponent = self.parse_exponent()?; // right associative
            let span = self.span_from(start);
            return Some(Expr::Binary(Box::new(BinaryExpr {
                op: "**".to_string(),
                left: base,
                right: exponent,
                span,
            })));
        }
        Some(base)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        let start = token.index;
        if token.token_type == TokenType::Operator
            && matches!(token.str_value.as_str(), "!" | "~" | "+" | "-")
        {
            self.advance();
            let argument = self.parse_unary()?;
            let span = self.span_from(start);
            return Some(Expr::Unary(Box::new(UnaryExpr {
                op: token.str_value,
                argument,
                span,
            })));
        }
        if token.is_any_keyword() && matches!(token.str_value.as_str(), "typeof" | "void" | "delete")
        {
            self.advance();
            let argument = self.parse_unary()?;
            let span = self.span_from(start);
            return Some(Expr::Unary(Box::new(UnaryExpr {
                op: token.str_value,
                argument,
                span,
            })));
        }
        if token.is_operator("++") || token.is_operator("--") {
            self.advance();
            let argument = self.parse_unary()?;
            let span = self.span_from(start);
            return Some(Expr::Update(Box::new(UpdateExpr {
                op: token.str_value,
                prefix: true,
                argument,
                span,
            })));
        }
        if token.is_keyword("await") {
            self.advance();
            let argument = self.parse_unary()?;
            let span = self.span_from(start);
            return Some(Expr::Await(Box::new(AwaitExpr { argument, span })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let expr = self.parse_call_member()?;
        let token = self.peek().clone();
        if (token.is_operator("++") || token.is_operator("--")) && !token.newline_before {
            self.advance();
            let span = self.span_from(start);
            return Some(Expr::Update(Box::new(UpdateExpr {
                op: token.str_value,
                prefix: false,
                argument: expr,
                span,
            })));
        }
        Some(expr)
    }

    fn parse_call_member(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let mut expr = if self.peek().is_keyword("new") {
            self.advance();
            let callee = self.parse_member_only()?;
            let args = if self.peek().is_character('(') {
                self.parse_args()?
            } else {
                Vec::new()
            };
            let span = self.span_from(start);
            Expr::New(Box::new(CallExpr {
                callee,
                args,
                optional: false,
                span,
            }))
        } else {
            self.parse_primary()?
        };

        loop {
            if self.eat_character('.') {
                if !self.peek().is_property_name() {
                    self.error_here("Expected property name".to_string());
                    return None;
                }
                let name = self.advance().str_value;
                let span = self.span_from(start);
                expr = Expr::Member(Box::new(MemberExpr {
                    object: expr,
                    property: MemberProp::Ident(name),
                    optional: false,
                    span,
                }));
            } else if self.peek().is_operator("?.") {
                self.advance();
                if self.peek().is_character('(') {
                    let args = self.parse_args()?;
                    let span = self.span_from(start);
                    expr = Expr::Call(Box::new(CallExpr {
                        callee: expr,
                        args,
                        optional: true,
                        span,
                    }));
                } else if self.peek().is_character('[') {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect_character(']')?;
                    let span = self.span_from(start);
                    expr = Expr::Member(Box::new(MemberExpr {
                        object: expr,
                        property: MemberProp::Computed(property),
                        optional: true,
                        span,
                    }));
                } else if self.peek().is_property_name() {
                    let name = self.advance().str_value;
                    let span = self.span_from(start);
                    expr = Expr::Member(Box::new(MemberExpr {
                        object: expr,
                        property: MemberProp::Ident(name),
                        optional: true,
                        span,
                    }));
                } else {
                    self.error_here("Expected property after `?.`".to_string());
                    return None;
                }
            } else if self.peek().is_character('[') {
                self.advance();
                let property = self.parse_expression()?;
                self.expect_character(']')?;
                let span = self.span_from(start);
                expr = Expr::Member(Box::new(MemberExpr {
                    object: expr,
                    property: MemberProp::Computed(property),
                    optional: false,
                    span,
                }));
            } else if self.peek().is_character('(') {
                let args = self.parse_args()?;
                let span = self.span_from(start);
                expr = Expr::Call(Box::new(CallExpr {
                    callee: expr,
                    args,
                    optional: false,
                    span,
                }));
            } else if self.peek().is_template() {
                // tagged template: model as a call taking the template
                let template = self.parse_primary()?;
                let span = self.span_from(start);
                expr = Expr::Call(Box::new(CallExpr {
                    callee: expr,
                    args: vec![template],
                    optional: false,
                    span,
                }));
            } else {
                break;
            }
        }
        Some(expr)
    }

    /// Member chain without call arguments, for `new` callees.
    fn parse_member_only(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        let mut expr = self.parse_primary()?;
        while self.eat_character('.') {
            if !self.peek().is_property_name() {
                self.error_here("Expected property name".to_string());
                return None;
            }
            let name = self.advance().str_value;
            let span = self.span_from(start);
            expr = Expr::Member(Box::new(MemberExpr {
                object: expr,
                property: MemberProp::Ident(name),
                optional: false,
                span,
            }));
        }
        Some(expr)
    }

    fn parse_args(&mut self) -> Option<Vec<Expr>> {
        self.expect_character('(')?;
        let mut args = Vec::new();
        while !self.peek().is_character(')') && !self.at_end() {
            if self.peek().is_operator("...") {
                let start = self.peek().index;
                self.advance();
                let argument = self.parse_assignment()?;
                let span = self.span_from(start);
                args.push(Expr::Spread(Box::new(SpreadExpr { argument, span })));
            } else {
                args.push(self.parse_assignment()?);
            }
            if !self.eat_character(',') {
                break;
            }
        }
        self.expect_character(')')?;
        Some(args)
    }

    fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect_character('(')?;
        let mut params = Vec::new();
        while !self.peek().is_character(')') && !self.at_end() {
            let start = self.peek().index;
            if self.peek().is_operator("...") {
                self.advance();
            }
            if self.peek().is_identifier() {
                let name = self.advance().str_value;
                let default = if self.eat_operator("=") {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    default,
                    span: self.span_from(start),
                });
            } else {
                // destructuring patterns are outside the supported subset;
                // skip the pattern and keep a placeholder binding
                self.error_here("Unsupported parameter pattern".to_string());
                self.skip_balanced_until_param_end();
                params.push(Param {
                    name: "_pattern".to_string(),
                    default: None,
                    span: self.span_from(start),
                });
            }
            if !self.eat_character(',') {
                break;
            }
        }
        self.expect_character(')')?;
        Some(params)
    }

    fn skip_balanced_until_param_end(&mut self) {
        let mut depth = 0i32;
        while !self.at_end() {
            let token = self.peek();
            if token.is_character('(') || token.is_character('[') || token.is_character('{') {
                depth += 1;
            } else if token.is_character(']') || token.is_character('}') {
                depth -= 1;
            } else if token.is_character(')') {
                if depth <= 0 {
                    return;
                }
                depth -= 1;
            } else if token.is_character(',') && depth <= 0 {
                return;
            }
            self.advance();
        }
    }

    fn parse_function_body(&mut self) -> Option<Vec<Stmt>> {
        Some(self.parse_block()?.body)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        let start = token.index;

        if token.is_character('(') {
            self.advance();
            let inner = self.parse_expression()?;
            self.expect_character(')')?;
            return Some(inner);
        }
        if token.is_identifier() {
            self.advance();
            return Some(Expr::Identifier(Ident {
                name: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_number() {
            self.advance();
            return Some(Expr::Literal(Lit {
                value: LitValue::Number(token.num_value),
                raw: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_string() {
            self.advance();
            return Some(Expr::Literal(Lit {
                value: LitValue::Str(token.str_value.clone()),
                raw: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_template() {
            self.advance();
            return self.finish_template(token);
        }
        if token.is_keyword("true") || token.is_keyword("false") {
            self.advance();
            return Some(Expr::Literal(Lit {
                value: LitValue::Bool(token.str_value == "true"),
                raw: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_keyword("null") {
            self.advance();
            return Some(Expr::Literal(Lit {
                value: LitValue::Null,
                raw: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_keyword("this") || token.is_keyword("super") {
            self.advance();
            return Some(Expr::Identifier(Ident {
                name: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        // contextual keywords usable as plain references
        if token.is_any_keyword()
            && matches!(token.str_value.as_str(), "of" | "from" | "as" | "static" | "async")
        {
            self.advance();
            return Some(Expr::Identifier(Ident {
                name: token.str_value,
                span: ParseSpan::new(token.index, token.end),
            }));
        }
        if token.is_character('[') {
            return self.parse_array_literal();
        }
        if token.is_character('{') {
            return self.parse_object_literal();
        }
        if token.is_keyword("function") {
            self.advance();
            let name = if self.peek().is_identifier() {
                Some(self.advance().str_value)
            } else {
                None
            };
            let params = self.parse_params()?;
            let body = self.parse_function_body()?;
            let span = self.span_from(start);
            return Some(Expr::Function(Box::new(Function {
                name,
                params,
                body,
                expression_body: None,
                is_arrow: false,
                is_async: false,
                span,
            })));
        }
        if token.is_keyword("async") && self.peek_at(1).is_keyword("function") {
            self.advance();
            self.advance();
            let name = if self.peek().is_identifier() {
                Some(self.advance().str_value)
            } else {
                None
            };
            let params = self.parse_params()?;
            let body = self.parse_function_body()?;
            let span = self.span_from(start);
            return Some(Expr::Function(Box::new(Function {
                name,
                params,
                body,
                expression_body: None,
                is_arrow: false,
                is_async: true,
                span,
            })));
        }

        self.error_here(format!("Unexpected token `{}`", token.str_value));
        None
    }

    fn finish_template(&mut self, token: Token) -> Option<Expr> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        for segment in &token.segments {
            match segment {
                TemplateSegment::Text(text) => quasis.push(text.clone()),
                TemplateSegment::Expr { source, offset } => {
                    let lexer = Lexer::new();
                    let mut sub_tokens = lexer.tokenize(source);
                    for sub in &mut sub_tokens {
                        sub.index += offset;
                        sub.end += offset;
                    }
                    let sub_len = offset + source.len();
                    let mut sub_ctx = ParseCtx::new(self.file.clone(), sub_tokens, sub_len);
                    match sub_ctx.parse_expression() {
                        Some(expr) => exprs.push(expr),
                        None => exprs.push(Expr::Literal(Lit {
                            value: LitValue::Str(source.clone()),
                            raw: source.clone(),
                            span: ParseSpan::new(*offset, *offset + source.len()),
                        })),
                    }
                    self.errors.append(&mut sub_ctx.errors);
                }
            }
        }
        // keep the string/expression alternation invariant
        while quasis.len() < exprs.len() + 1 {
            quasis.push(String::new());
        }
        Some(Expr::Template(TemplateLit {
            quasis,
            exprs,
            span: ParseSpan::new(token.index, token.end),
        }))
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        self.advance(); // [
        let mut elements = Vec::new();
        while !self.peek().is_character(']') && !self.at_end() {
            if self.peek().is_character(',') {
                // elision
                let token = self.advance();
                elements.push(Expr::Literal(Lit {
                    value: LitValue::Null,
                    raw: String::new(),
                    span: ParseSpan::new(token.index, token.index),
                }));
                continue;
            }
            if self.peek().is_operator("...") {
                let spread_start = self.peek().index;
                self.advance();
                let argument = self.parse_assignment()?;
                let span = self.span_from(spread_start);
                elements.push(Expr::Spread(Box::new(SpreadExpr { argument, span })));
            } else {
                elements.push(self.parse_assignment()?);
            }
            if !self.eat_character(',') {
                break;
            }
        }
        self.expect_character(']')?;
        let span = self.span_from(start);
        Some(Expr::ArrayLit(ArrayLit { elements, span }))
    }

    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.peek().index;
        self.advance(); // {
        let mut members = Vec::new();
        while !self.peek().is_character('}') && !self.at_end() {
            let member_start = self.peek().index;
            if self.peek().is_operator("...") {
                self.advance();
                let argument = self.parse_assignment()?;
                let span = self.span_from(member_start);
                members.push(ObjectMember::Spread(SpreadExpr { argument, span }));
            } else {
                let key = if self.peek().is_character('[') {
                    self.advance();
                    let expr = self.parse_assignment()?;
                    self.expect_character(']')?;
                    PropKey::Computed(expr)
                } else if self.peek().is_string() {
                    PropKey::Str(self.advance().str_value)
                } else if self.peek().is_number() {
                    PropKey::Num(self.advance().num_value)
                } else if self.peek().is_property_name() {
                    PropKey::Ident(self.advance().str_value)
                } else {
                    self.error_here("Expected property key".to_string());
                    return None;
                };

                if self.peek().is_character('(') {
                    // method shorthand
                    let params = self.parse_params()?;
                    let body = self.parse_function_body()?;
                    let span = self.span_from(member_start);
                    let name = match &key {
                        PropKey::Ident(name) | PropKey::Str(name) => Some(name.clone()),
                        _ => None,
                    };
                    members.push(ObjectMember::Prop(ObjectProp {
                        key,
                        value: Expr::Function(Box::new(Function {
                            name,
                            params,
                            body,
                            expression_body: None,
                            is_arrow: false,
                            is_async: false,
                            span,
                        })),
                        shorthand: false,
                        span,
                    }));
                } else if self.eat_character(':') {
                    let value = self.parse_assignment()?;
                    let span = self.span_from(member_start);
                    members.push(ObjectMember::Prop(ObjectProp {
                        key,
                        value,
                        shorthand: false,
                        span,
                    }));
                } else {
                    // shorthand `{ name }`
                    let span = self.span_from(member_start);
                    let name = match &key {
                        PropKey::Ident(name) => name.clone(),
                        _ => {
                            self.error_here("Expected `:` after property key".to_string());
                            return None;
                        }
                    };
                    members.push(ObjectMember::Prop(ObjectProp {
                        key,
                        value: Expr::Identifier(Ident {
                            name,
                            span: ParseSpan::new(member_start, self.prev_end()),
                        }),
                        shorthand: true,
                        span,
                    }));
                }
            }
            if !self.eat_character(',') {
                break;
            }
        }
        self.expect_character('}')?;
        let span = self.span_from(start);
        Some(Expr::ObjectLit(ObjectLit { members, span }))
    }
}
