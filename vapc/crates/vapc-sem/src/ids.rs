//! Typed handles into the semantic arena.

use vapc_util::define_idx;

define_idx!(
    /// Handle of an [`Expr`](crate::expr::Expr)
    ExprId
);
define_idx!(
    /// Handle of a [`Stmt`](crate::stmt::Stmt)
    StmtId
);
define_idx!(
    /// Handle of a [`Type`](crate::types::Type); types compare by handle
    TypeId
);
define_idx!(
    /// Handle of a [`Function`](crate::function::Function)
    FunctionId
);
define_idx!(
    /// Handle of a [`Scope`](crate::scope::Scope)
    ScopeId
);
define_idx!(
    /// Handle of a [`SymbolData`](crate::scope::SymbolData)
    SymbolId
);
