//! Script AST
//!
//! Syntax tree for the JavaScript subset the analyzer understands. Nodes
//! carry `(start, end)` byte offsets; line/column are materialized later
//! from the owning source file.

/// Byte range of a node in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSpan {
    pub start: usize,
    pub end: usize,
}

impl ParseSpan {
    pub fn new(start: usize, end: usize) -> Self {
        ParseSpan { start, end }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub span: ParseSpan,
}

/// Function declarations, function expressions and arrow functions.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Arrow function with a bare expression body.
    pub expression_body: Option<Box<Expr>>,
    pub is_arrow: bool,
    pub is_async: bool,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Option<String>,
    pub superclass: Option<Expr>,
    pub methods: Vec<MethodDef>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub is_static: bool,
    pub function: Function,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl(VarDecl),
    FunctionDecl(Function),
    ClassDecl(ClassDecl),
    If(IfStmt),
    For(ForStmt),
    ForIn(ForEachStmt),
    ForOf(ForEachStmt),
    While(WhileStmt),
    DoWhile(WhileStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Break(JumpStmt),
    Continue(JumpStmt),
    Block(BlockStmt),
    Expr(ExprStmt),
    Import(ImportDecl),
    Export(ExportDecl),
    Empty(ParseSpan),
}

impl Stmt {
    pub fn span(&self) -> ParseSpan {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::FunctionDecl(s) => s.span,
            Stmt::ClassDecl(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::ForIn(s) | Stmt::ForOf(s) => s.span,
            Stmt::While(s) | Stmt::DoWhile(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Break(s) | Stmt::Continue(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Import(s) => s.span,
            Stmt::Export(s) => s.span,
            Stmt::Empty(span) => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub test: Expr,
    pub consequent: Box<Stmt>,
    pub alternate: Option<Box<Stmt>>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub test: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub span: ParseSpan,
}

/// Shared by `for..in` and `for..of`.
#[derive(Debug, Clone)]
pub struct ForEachStmt {
    pub decl_kind: Option<VarKind>,
    pub variable: String,
    pub iterable: Expr,
    pub body: Box<Stmt>,
    pub span: ParseSpan,
}

/// Shared by `while` and `do..while`.
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Box<Stmt>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub discriminant: Expr,
    pub cases: Vec<SwitchCase>,
    pub span: ParseSpan,
}

/// `test` is `None` for the `default:` clause.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub block: Vec<Stmt>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Stmt>>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Stmt>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub argument: Option<Expr>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub argument: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct JumpStmt {
    pub label: Option<String>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub body: Vec<Stmt>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub source: String,
    pub default_name: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<String>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ExportDecl {
    pub is_default: bool,
    pub decl: Option<Box<Stmt>>,
    pub expr: Option<Expr>,
    pub named: Vec<String>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier(Ident),
    Literal(Lit),
    Template(TemplateLit),
    ArrayLit(ArrayLit),
    ObjectLit(ObjectLit),
    Function(Box<Function>),
    Call(Box<CallExpr>),
    New(Box<CallExpr>),
    Member(Box<MemberExpr>),
    Assign(Box<AssignExpr>),
    Binary(Box<BinaryExpr>),
    Logical(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Update(Box<UpdateExpr>),
    Conditional(Box<ConditionalExpr>),
    Await(Box<AwaitExpr>),
    Yield(Box<YieldExpr>),
    Spread(Box<SpreadExpr>),
    Sequence(Box<SequenceExpr>),
}

impl Expr {
    pub fn span(&self) -> ParseSpan {
        match self {
            Expr::Identifier(e) => e.span,
            Expr::Literal(e) => e.span,
            Expr::Template(e) => e.span,
            Expr::ArrayLit(e) => e.span,
            Expr::ObjectLit(e) => e.span,
            Expr::Function(e) => e.span,
            Expr::Call(e) | Expr::New(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Binary(e) | Expr::Logical(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Update(e) => e.span,
            Expr::Conditional(e) => e.span,
            Expr::Await(e) => e.span,
            Expr::Yield(e) => e.span,
            Expr::Spread(e) => e.span,
            Expr::Sequence(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub enum LitValue {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct Lit {
    pub value: LitValue,
    pub raw: String,
    pub span: ParseSpan,
}

/// Cooked string parts and interpolated expressions, in source order.
/// `quasis.len() == exprs.len() + 1`.
#[derive(Debug, Clone)]
pub struct TemplateLit {
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ArrayLit {
    pub elements: Vec<Expr>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ObjectLit {
    pub members: Vec<ObjectMember>,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub enum ObjectMember {
    Prop(ObjectProp),
    Spread(SpreadExpr),
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(f64),
    Computed(Expr),
}

#[derive(Debug, Clone)]
pub struct ObjectProp {
    pub key: PropKey,
    pub value: Expr,
    pub shorthand: bool,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Expr>,
    pub optional: bool,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Ident(String),
    Computed(Expr),
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub object: Expr,
    pub property: MemberProp,
    pub optional: bool,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub op: String,
    pub target: Expr,
    pub value: Expr,
    pub span: ParseSpan,
}

/// Shared by arithmetic/comparison (`Expr::Binary`) and short-circuit
/// (`Expr::Logical`) operators; the wrapping variant disambiguates.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: String,
    pub left: Expr,
    pub right: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: String,
    pub argument: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct UpdateExpr {
    pub op: String,
    pub prefix: bool,
    pub argument: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub test: Expr,
    pub consequent: Expr,
    pub alternate: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct AwaitExpr {
    pub argument: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct YieldExpr {
    pub argument: Option<Expr>,
    pub delegate: bool,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct SpreadExpr {
    pub argument: Expr,
    pub span: ParseSpan,
}

#[derive(Debug, Clone)]
pub struct SequenceExpr {
    pub exprs: Vec<Expr>,
    pub span: ParseSpan,
}

/// Dotted callee path when statically derivable, e.g.
/// `document.getElementById` or `el.addEventListener`. Interior calls
/// flatten onto their own callee path, so
/// `document.getElementById('x').addEventListener` resolves to
/// `document.getElementById.addEventListener`. Computed or otherwise
/// dynamic segments yield `None`.
pub fn dotted_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(id) => Some(id.name.clone()),
        Expr::Member(m) => {
            let object = dotted_path(&m.object)?;
            match &m.property {
                MemberProp::Ident(name) => Some(format!("{}.{}", object, name)),
                MemberProp::Computed(_) => None,
            }
        }
        Expr::Call(c) => dotted_path(&c.callee),
        _ => None,
    }
}
