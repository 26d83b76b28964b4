//! Compile-time values.
//!
//! Constants are ordinary expression nodes: integer, boolean and sized
//! integer literals, struct values whose fields are constants, and nodes
//! denoting types, overload sets, typeclasses and instances.

use vapc_util::Span;

use crate::arena::Arena;
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::ids::{ExprId, TypeId};
use crate::replacements::Replacements;

/// Hashable identity of a constant, used to key cached evaluations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstKey {
    Integer(i64),
    Boolean(bool),
    Sized { ty: TypeId, value: i128 },
    Struct { ty: TypeId, fields: Vec<ConstKey> },
    Pack(Vec<ConstKey>),
    Type(TypeId),
}

impl ConstKey {
    pub fn of(arena: &Arena, id: ExprId) -> Option<ConstKey> {
        match &arena.exprs[id].kind {
            ExprKind::Integer(v) => Some(ConstKey::Integer(*v)),
            ExprKind::Boolean(b) => Some(ConstKey::Boolean(*b)),
            ExprKind::SizedInteger { value, ty } => Some(ConstKey::Sized {
                ty: arena.canonical(*ty),
                value: *value,
            }),
            ExprKind::StructValue { ty, fields } => Some(ConstKey::Struct {
                ty: arena.canonical(*ty),
                fields: fields
                    .iter()
                    .map(|f| ConstKey::of(arena, *f))
                    .collect::<Option<_>>()?,
            }),
            ExprKind::PackValue(items) => Some(ConstKey::Pack(
                items
                    .iter()
                    .map(|f| ConstKey::of(arena, *f))
                    .collect::<Option<_>>()?,
            )),
            ExprKind::TypeExpr(ty)
            | ExprKind::StructLiteral { ty }
            | ExprKind::OverloadSet(ty)
            | ExprKind::Typeclass(ty)
            | ExprKind::Instance { ty, .. } => Some(ConstKey::Type(arena.canonical(*ty))),
            _ => None,
        }
    }
}

/// Equality of two constants of the same kind
///
/// Comparing constants of different kinds (an `int` with a sized integer,
/// sized integers of different types, ...) would need an implicit
/// conversion and is rejected as unimplemented.
pub fn is_equal(arena: &Arena, a: ExprId, b: ExprId, span: Span) -> SemaResult<bool> {
    match (&arena.exprs[a].kind, &arena.exprs[b].kind) {
        (ExprKind::Integer(x), ExprKind::Integer(y)) => Ok(x == y),
        (ExprKind::Boolean(x), ExprKind::Boolean(y)) => Ok(x == y),
        (
            ExprKind::SizedInteger { value: x, ty: tx },
            ExprKind::SizedInteger { value: y, ty: ty_y },
        ) if arena.same_type(*tx, *ty_y) => Ok(x == y),
        (
            ExprKind::StructValue {
                ty: tx,
                fields: fx,
            },
            ExprKind::StructValue {
                ty: ty_y,
                fields: fy,
            },
        ) if arena.same_type(*tx, *ty_y) && fx.len() == fy.len() => {
            for (x, y) in fx.iter().zip(fy) {
                if !is_equal(arena, *x, *y, span)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (x, y) => match (ConstKey::of(arena, a), ConstKey::of(arena, b)) {
            (Some(ConstKey::Type(tx)), Some(ConstKey::Type(ty_y))) => Ok(tx == ty_y),
            _ => Err(SemaError::unimplemented(
                format!("comparing a {} with a {}", x.describe(), y.describe()),
                span,
            )),
        },
    }
}

/// Fresh copy of a constant, so the original can stay where it is
pub fn copy_constant(arena: &mut Arena, id: ExprId) -> ExprId {
    let mut replacements = Replacements::new();
    replacements.claim_expr(arena, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StructType, Type, TypeKind};

    fn setup() -> (Arena, crate::ids::ScopeId) {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        (arena, scope)
    }

    #[test]
    fn test_same_kind_equality() {
        let (mut arena, scope) = setup();
        let one = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let other_one = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let two = arena.alloc_expr(ExprKind::Integer(2), Span::DUMMY, scope);
        assert!(is_equal(&arena, one, other_one, Span::DUMMY).unwrap());
        assert!(!is_equal(&arena, one, two, Span::DUMMY).unwrap());
    }

    #[test]
    fn test_cross_kind_equality_is_unimplemented() {
        let (mut arena, scope) = setup();
        let int = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let boolean = arena.alloc_expr(ExprKind::Boolean(true), Span::DUMMY, scope);
        let err = is_equal(&arena, int, boolean, Span::point(3, 1)).unwrap_err();
        assert!(matches!(err, SemaError::Unimplemented { .. }));
        assert_eq!(err.span(), Span::point(3, 1));
    }

    #[test]
    fn test_struct_values_compare_member_wise() {
        let (mut arena, scope) = setup();
        let ty = arena.alloc_type(Type::new(TypeKind::Struct(StructType::default()), scope));
        let value = |arena: &mut Arena, a: i64, b: i64| {
            let fields = vec![
                arena.alloc_expr(ExprKind::Integer(a), Span::DUMMY, scope),
                arena.alloc_expr(ExprKind::Integer(b), Span::DUMMY, scope),
            ];
            arena.alloc_expr(ExprKind::StructValue { ty, fields }, Span::DUMMY, scope)
        };
        let x = value(&mut arena, 1, 2);
        let y = value(&mut arena, 1, 2);
        let z = value(&mut arena, 1, 3);
        assert!(is_equal(&arena, x, y, Span::DUMMY).unwrap());
        assert!(!is_equal(&arena, x, z, Span::DUMMY).unwrap());
        assert_eq!(ConstKey::of(&arena, x), ConstKey::of(&arena, y));
        assert_ne!(ConstKey::of(&arena, x), ConstKey::of(&arena, z));
    }

    #[test]
    fn test_copy_constant_is_deep() {
        let (mut arena, scope) = setup();
        let ty = arena.alloc_type(Type::new(TypeKind::Struct(StructType::default()), scope));
        let field = arena.alloc_expr(ExprKind::Integer(4), Span::DUMMY, scope);
        let value = arena.alloc_expr(
            ExprKind::StructValue {
                ty,
                fields: vec![field],
            },
            Span::DUMMY,
            scope,
        );
        let copy = copy_constant(&mut arena, value);
        assert_ne!(copy, value);
        match &arena.exprs[copy].kind {
            ExprKind::StructValue { fields, .. } => assert_ne!(fields[0], field),
            other => panic!("unexpected {other:?}"),
        }
        assert!(is_equal(&arena, copy, value, Span::DUMMY).unwrap());
    }
}
