//! The arena holding the whole analyzed program.
//!
//! Nodes are never removed. A node that simplification replaced is simply no
//! longer referenced from any slot.

use vapc_util::{IndexVec, Span, Symbol};

use crate::expr::{Expr, ExprKind, ParamDefault};
use crate::function::{Function, Intrinsic};
use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, SymbolId, TypeId};
use crate::scope::{Scope, SymbolData};
use crate::stmt::{Stmt, StmtKind};
use crate::types::Type;

#[derive(Debug, Default)]
pub struct Arena {
    pub exprs: IndexVec<ExprId, Expr>,
    pub stmts: IndexVec<StmtId, Stmt>,
    pub types: IndexVec<TypeId, Type>,
    pub functions: IndexVec<FunctionId, Function>,
    pub scopes: IndexVec<ScopeId, Scope>,
    pub symbols: IndexVec<SymbolId, SymbolData>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span, scope: ScopeId) -> ExprId {
        self.exprs.push(Expr::new(kind, span, scope))
    }

    /// Allocate an expression whose type is already known
    pub fn alloc_typed_expr(
        &mut self,
        kind: ExprKind,
        ty: TypeId,
        span: Span,
        scope: ScopeId,
    ) -> ExprId {
        let id = self.alloc_expr(kind, span, scope);
        self.exprs[id].ty = Some(ty);
        id
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span, scope: ScopeId) -> StmtId {
        self.stmts.push(Stmt::new(kind, span, scope))
    }

    pub fn alloc_type(&mut self, ty: Type) -> TypeId {
        self.types.push(ty)
    }

    pub fn alloc_function(&mut self, function: Function) -> FunctionId {
        self.functions.push(function)
    }

    /// Compiler-made function with typed parameters and a native evaluator
    pub fn synthesize_function(
        &mut self,
        name: Symbol,
        params: &[(Symbol, TypeId, ParamDefault)],
        ret: TypeId,
        intrinsic: Intrinsic,
        scope: ScopeId,
    ) -> FunctionId {
        let param_scope = self.clone_local(scope);
        let types = params.iter().map(|(_, ty, _)| *ty).collect();
        let params = params
            .iter()
            .map(|(param_name, ty, default)| {
                let id = self.alloc_typed_expr(
                    ExprKind::Parameter {
                        type_expr: None,
                        default: *default,
                    },
                    *ty,
                    Span::DUMMY,
                    param_scope,
                );
                self.exprs[id].name = Some(*param_name);
                id
            })
            .collect();
        let mut function = Function::new(name, params, param_scope, Span::DUMMY);
        function.param_types = Some(types);
        function.return_type = Some(ret);
        function.intrinsic = Some(intrinsic);
        self.alloc_function(function)
    }

    /// Whether `id` is a compile-time value
    pub fn is_constant(&self, id: ExprId) -> bool {
        match &self.exprs[id].kind {
            ExprKind::StructValue { fields, .. } | ExprKind::PackValue(fields) => {
                fields.iter().all(|f| self.is_constant(*f))
            }
            kind => kind.is_leaf_constant(),
        }
    }

    /// Follow analysis resolutions (postfix to call, member to field access)
    pub fn resolved(&self, mut id: ExprId) -> ExprId {
        while let Some(next) = self.exprs[id].kind.resolved() {
            id = next;
        }
        id
    }

    /// Value currently bound to a variable or parameter-like reference
    ///
    /// For a variable this is its declaration's initializer; any other node
    /// denotes itself.
    pub fn referent_value(&self, target: ExprId) -> Option<ExprId> {
        match &self.exprs[target].kind {
            ExprKind::Variable { decl } => match &self.stmts[*decl].kind {
                StmtKind::Declaration(d) => d.init,
                _ => None,
            },
            ExprKind::DataMember { .. } | ExprKind::Parameter { .. } | ExprKind::Entity { .. } => {
                None
            }
            _ => Some(target),
        }
    }
}
