//! AST Node Definitions
//!
//! Untyped tree handed from the parser to the semantic core. Every node
//! carries the [`Span`] it was parsed from.

use std::fmt;

use vapc_util::{sym, Span, Symbol};

/// A parsed module (one source file)
#[derive(Debug, Clone)]
pub struct Module {
    /// Dotted module path, e.g. `["std", "math"]`
    pub path: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// `import a.b.c;`
#[derive(Debug, Clone)]
pub struct Import {
    pub path: Vec<Symbol>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `[export] let name [: type] [= init];`
    Declaration(Declaration),
    /// `[export] function name(params) [-> type] { body }`
    Function(FunctionDecl),
    If(IfStmt),
    Return(Expr),
    Block(Block),
    /// `a, b, c;`
    Expression(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: Symbol,
    pub ty: Option<Expr>,
    pub init: Option<Expr>,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: Option<Expr>,
    /// Absent for typeclass member signatures
    pub body: Option<Block>,
    pub exported: bool,
    pub span: Span,
}

/// Function parameter; a trailing `name: T...` makes it a pack
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    /// Either a block or a nested `if`
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Integer(i64),
    Boolean(bool),
    Identifier(Symbol),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// `base(args)`, `base{args}`, `base[args]`, `base<args>`
    Postfix {
        base: Box<Expr>,
        bracket: Bracket,
        args: Vec<Argument>,
    },
    /// `base.name`
    Member {
        base: Box<Expr>,
        name: Symbol,
    },
    /// `struct { let a: int; let b = 2; }`
    Struct(Vec<Declaration>),
    Typeclass(TypeclassLiteral),
    Instance(InstanceLiteral),
    /// `T...`
    Pack(Box<Expr>),
    /// `(a, b, c)`
    List(Vec<Expr>),
}

/// Call argument, optionally designated: `.name = value`
#[derive(Debug, Clone)]
pub struct Argument {
    pub designator: Option<Symbol>,
    pub value: Expr,
}

/// `typeclass (T, U) { function f(x: T) -> U; }`
#[derive(Debug, Clone)]
pub struct TypeclassLiteral {
    pub params: Vec<Symbol>,
    pub members: Vec<FunctionDecl>,
}

/// `instance tc(int, bool) { function f(x: int) -> bool { ... } }`
#[derive(Debug, Clone)]
pub struct InstanceLiteral {
    pub typeclass: Box<Expr>,
    pub args: Vec<Expr>,
    pub members: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    Round,
    Curly,
    Square,
    Angle,
}

impl Bracket {
    pub fn open(self) -> char {
        match self {
            Bracket::Round => '(',
            Bracket::Curly => '{',
            Bracket::Square => '[',
            Bracket::Angle => '<',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Round => ')',
            Bracket::Curly => '}',
            Bracket::Square => ']',
            Bracket::Angle => '>',
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Name of the operator function implementing this operator
    pub fn symbol(self) -> Symbol {
        match self {
            BinOp::Add => sym::OP_ADD,
            BinOp::Sub => sym::OP_SUB,
            BinOp::Mul => sym::OP_MUL,
            BinOp::Div => sym::OP_DIV,
            BinOp::Rem => sym::OP_REM,
            BinOp::Eq => sym::OP_EQ,
            BinOp::Ne => sym::OP_NE,
            BinOp::Lt => sym::OP_LT,
            BinOp::Le => sym::OP_LE,
            BinOp::Gt => sym::OP_GT,
            BinOp::Ge => sym::OP_GE,
            BinOp::And => sym::OP_AND,
            BinOp::Or => sym::OP_OR,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            UnOp::Neg => sym::OP_SUB,
            UnOp::Not => sym::OP_NOT,
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Module {
    /// Dotted path, e.g. `std.math`
    pub fn dotted_name(&self) -> String {
        self.path
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}
