//! Expression nodes.
//!
//! Expressions live in the [`Arena`](crate::arena::Arena) and refer to each
//! other by [`ExprId`]. A parent owns the children named in its variant;
//! replacing a child during simplification means storing a different id in
//! the parent's slot. The only non-owning references are the `target` of an
//! identifier and the `decl` back-reference of variables and data members.

use vapc_ast::{Bracket, BinOp, UnOp};
use vapc_util::{Span, Symbol};

use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, TypeId};

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Set once by analysis, immutable afterwards
    pub ty: Option<TypeId>,
    pub span: Span,
    /// Scope names inside this expression are resolved in
    pub scope: ScopeId,
    /// Name of the declaration binding this expression, if any
    pub name: Option<Symbol>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span, scope: ScopeId) -> Self {
        Self {
            kind,
            ty: None,
            span,
            scope,
            name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Integer(i64),
    Boolean(bool),
    /// Value normalized into the range of its sized integer type
    SizedInteger { value: i128, ty: TypeId },

    /// `target` is the referenced declaration node, set by analysis
    Identifier {
        name: Symbol,
        target: Option<ExprId>,
    },
    /// Call syntax; `resolved` holds the [`ExprKind::Call`] (or instance
    /// selection) analysis produced
    Postfix {
        base: ExprId,
        bracket: Bracket,
        args: Vec<ExprId>,
        designators: Vec<Option<Symbol>>,
        resolved: Option<ExprId>,
    },
    Member {
        base: ExprId,
        name: Symbol,
        resolved: Option<ExprId>,
    },
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
        resolved: Option<ExprId>,
    },
    Unary {
        op: UnOp,
        operand: ExprId,
        resolved: Option<ExprId>,
    },

    /// Resolved call. `None` arguments are filled from parameter defaults.
    Call {
        function: FunctionId,
        args: Vec<Option<ExprId>>,
    },
    FieldAccess { base: ExprId, index: usize },

    /// `struct { ... }`; its value is the struct type
    StructLiteral { ty: TypeId },
    StructValue { ty: TypeId, fields: Vec<ExprId> },

    /// A type used as a value
    TypeExpr(TypeId),
    OverloadSet(TypeId),
    Typeclass(TypeId),
    /// Instance literal; its value is the instance type
    Instance {
        ty: TypeId,
        typeclass: ExprId,
        args: Vec<ExprId>,
    },
    /// `T...` in a parameter type
    Pack { pattern: ExprId },
    /// Arguments bound to a pack parameter
    PackValue(Vec<ExprId>),

    Parameter {
        type_expr: Option<ExprId>,
        default: ParamDefault,
    },
    /// Value bound by a declaration with an initializer
    Variable { decl: StmtId },
    /// Struct field placeholder, or a declaration with a type and no value
    DataMember { decl: StmtId },
    /// Global imported from another module, known only by its type
    Entity { module: Vec<Symbol> },

    List(Vec<ExprId>),
    Module(Box<ModuleData>),
}

#[derive(Debug, Clone)]
pub struct ModuleData {
    pub path: Vec<Symbol>,
    pub scope: ScopeId,
    pub statements: Vec<StmtId>,
    pub entry: Option<FunctionId>,
    pub imported: bool,
}

impl ModuleData {
    pub fn dotted_name(&self) -> String {
        self.path
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Where a call argument comes from when the caller leaves it out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDefault {
    Required,
    /// Field `index` of the first argument (the value being replaced)
    SelfField(usize),
}

impl ExprKind {
    /// Leaf constants and compile-time values; composite values are checked
    /// by [`Arena::is_constant`](crate::arena::Arena::is_constant)
    pub fn is_leaf_constant(&self) -> bool {
        matches!(
            self,
            ExprKind::Integer(_)
                | ExprKind::Boolean(_)
                | ExprKind::SizedInteger { .. }
                | ExprKind::StructLiteral { .. }
                | ExprKind::TypeExpr(_)
                | ExprKind::OverloadSet(_)
                | ExprKind::Typeclass(_)
                | ExprKind::Instance { .. }
        )
    }

    /// Node whose meaning is carried by the node analysis resolved it to
    pub fn resolved(&self) -> Option<ExprId> {
        match self {
            ExprKind::Postfix { resolved, .. }
            | ExprKind::Member { resolved, .. }
            | ExprKind::Binary { resolved, .. }
            | ExprKind::Unary { resolved, .. } => *resolved,
            _ => None,
        }
    }

    /// Short name used in diagnostics and logs
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::Integer(_) => "integer constant",
            ExprKind::Boolean(_) => "boolean constant",
            ExprKind::SizedInteger { .. } => "sized integer constant",
            ExprKind::Identifier { .. } => "identifier",
            ExprKind::Postfix { .. } => "postfix expression",
            ExprKind::Member { .. } => "member access",
            ExprKind::Binary { .. } => "binary expression",
            ExprKind::Unary { .. } => "unary expression",
            ExprKind::Call { .. } => "call",
            ExprKind::FieldAccess { .. } => "field access",
            ExprKind::StructLiteral { .. } => "struct literal",
            ExprKind::StructValue { .. } => "struct value",
            ExprKind::TypeExpr(_) => "type expression",
            ExprKind::OverloadSet(_) => "overload set",
            ExprKind::Typeclass(_) => "typeclass",
            ExprKind::Instance { .. } => "typeclass instance",
            ExprKind::Pack { .. } => "pack type",
            ExprKind::PackValue(_) => "pack",
            ExprKind::Parameter { .. } => "parameter",
            ExprKind::Variable { .. } => "variable",
            ExprKind::DataMember { .. } => "data member",
            ExprKind::Entity { .. } => "imported entity",
            ExprKind::List(_) => "expression list",
            ExprKind::Module(_) => "module",
        }
    }
}
