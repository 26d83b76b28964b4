//! Statement nodes.

use vapc_util::{Span, Symbol};

use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, SymbolId};

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub scope: ScopeId,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span, scope: ScopeId) -> Self {
        Self { kind, span, scope }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Declaration(Declaration),
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    Return { value: ExprId },
    Block { statements: Vec<StmtId> },
    Function(FunctionId),
    /// Expression list evaluated for its effects
    Expression(ExprId),
    /// Placeholder left by a folded-away statement
    Null,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: Symbol,
    pub symbol: SymbolId,
    pub type_expr: Option<ExprId>,
    pub init: Option<ExprId>,
    /// The node the symbol denotes: a `Variable` or a `DataMember`
    /// referring back to this declaration
    pub declared: ExprId,
    pub exported: bool,
}
