//! Type descriptors.
//!
//! Types are identity-compared: two [`TypeId`]s denote the same type iff they
//! are equal (after following resolved `unresolved` types, see
//! [`Arena::canonical`]). Sized integers, packs and function types are
//! interned by the session so that structurally identical ones share an id.
//!
//! Every type owns a member scope. For structs it binds the data members,
//! for instances the member definitions, for modules the module's top-level
//! declarations.

use vapc_util::Symbol;

use crate::arena::Arena;
use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, TypeId};

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub name: Option<Symbol>,
    /// Member scope
    pub scope: ScopeId,
    /// Module that declared the type; `None` for builtins
    pub module: Option<ExprId>,
    pub exported: bool,
}

impl Type {
    pub fn new(kind: TypeKind, scope: ScopeId) -> Self {
        Self {
            kind,
            name: None,
            scope,
            module: None,
            exported: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Integer,
    Boolean,
    /// The type of type expressions
    Type,
    SizedInteger {
        signed: bool,
        width: u32,
    },
    Struct(StructType),
    Function {
        params: Vec<TypeId>,
        ret: TypeId,
    },
    OverloadSet {
        name: Symbol,
        functions: Vec<FunctionId>,
    },
    Typeclass(TypeclassType),
    Instance(InstanceType),
    /// Placeholder for a typeclass parameter
    Archetype {
        typeclass: Option<TypeId>,
        index: usize,
    },
    Pack {
        pattern: TypeId,
    },
    Module,
    Unresolved(UnresolvedType),
}

#[derive(Debug, Clone, Default)]
pub struct StructType {
    /// Member declarations, in order; empty for imported structs
    pub members: Vec<StmtId>,
    /// The literal that introduced the type; `None` when imported
    pub literal: Option<ExprId>,
    /// Data members, filled once the members are analyzed
    pub fields: Option<Vec<Field>>,
    pub constructors: Option<Constructors>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: Symbol,
    pub ty: TypeId,
    /// The `DataMember` node; `None` for imported fields
    pub member: Option<ExprId>,
}

/// Functions synthesized for a struct type
#[derive(Debug, Clone, Copy)]
pub struct Constructors {
    /// `T{a, b, c}`: one parameter per data member
    pub aggregate: FunctionId,
    /// `value{...}`: the value being replaced, then one defaulted parameter
    /// per data member
    pub replace: FunctionId,
    pub equal: FunctionId,
    pub not_equal: FunctionId,
}

#[derive(Debug, Clone, Default)]
pub struct TypeclassType {
    /// Archetypes standing for the typeclass parameters
    pub params: Vec<TypeId>,
    pub members: Vec<FunctionId>,
    /// Registered instances by argument types
    pub instances: Vec<(Vec<TypeId>, TypeId)>,
}

#[derive(Debug, Clone, Default)]
pub struct InstanceType {
    pub typeclass: Option<TypeId>,
    pub args: Vec<TypeId>,
    pub definitions: Vec<FunctionId>,
    /// Definition implementing each typeclass member, by member index
    pub vtable: Vec<FunctionId>,
}

/// Reference to a type by module path, nested scope path and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedType {
    pub module: Vec<Symbol>,
    pub scopes: Vec<Symbol>,
    pub name: Symbol,
    pub resolved: Option<TypeId>,
}

impl Arena {
    /// Follow resolved `unresolved` types to the type they denote
    pub fn canonical(&self, mut ty: TypeId) -> TypeId {
        while let TypeKind::Unresolved(UnresolvedType {
            resolved: Some(target),
            ..
        }) = &self.types[ty].kind
        {
            ty = *target;
        }
        ty
    }

    pub fn same_type(&self, a: TypeId, b: TypeId) -> bool {
        self.canonical(a) == self.canonical(b)
    }

    pub fn type_kind(&self, ty: TypeId) -> &TypeKind {
        &self.types[self.canonical(ty)].kind
    }

    pub fn is_builtin_type(&self, ty: TypeId) -> bool {
        matches!(
            self.type_kind(ty),
            TypeKind::Integer | TypeKind::Boolean | TypeKind::Type | TypeKind::SizedInteger { .. }
        )
    }

    /// Human-readable type name for diagnostics and printing
    pub fn type_name(&self, ty: TypeId) -> String {
        let ty = self.canonical(ty);
        let named = |fallback: &str| {
            self.types[ty]
                .name
                .map(|n| n.as_str().to_string())
                .unwrap_or_else(|| format!("{fallback}#{}", ty.0))
        };
        match &self.types[ty].kind {
            TypeKind::Integer => "int".into(),
            TypeKind::Boolean => "bool".into(),
            TypeKind::Type => "type".into(),
            TypeKind::SizedInteger { signed, width } => {
                format!("{}({width})", if *signed { "sint" } else { "uint" })
            }
            TypeKind::Struct(_) => named("struct"),
            TypeKind::Function { params, ret } => format!(
                "function({}) -> {}",
                self.type_list(params),
                self.type_name(*ret)
            ),
            TypeKind::OverloadSet { name, .. } => format!("overload set `{name}`"),
            TypeKind::Typeclass(_) => named("typeclass"),
            TypeKind::Instance(inst) => match inst.typeclass {
                Some(tc) => format!("{}({})", self.type_name(tc), self.type_list(&inst.args)),
                None => named("instance"),
            },
            TypeKind::Archetype { .. } => named("archetype"),
            TypeKind::Pack { pattern } => format!("{}...", self.type_name(*pattern)),
            TypeKind::Module => named("module"),
            TypeKind::Unresolved(u) => {
                let mut path: Vec<&str> = u.module.iter().map(Symbol::as_str).collect();
                path.extend(u.scopes.iter().map(Symbol::as_str));
                format!("{}::{}", path.join("."), u.name)
            }
        }
    }

    pub fn type_list(&self, types: &[TypeId]) -> String {
        types
            .iter()
            .map(|t| self.type_name(*t))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
