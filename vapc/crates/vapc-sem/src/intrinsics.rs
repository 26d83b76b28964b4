//! Compile-time evaluation of compiler-made functions.

use vapc_ast::{BinOp, UnOp};
use vapc_util::Span;

use crate::constant::{copy_constant, is_equal};
use crate::context::Sema;
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::function::Intrinsic;
use crate::ids::{ExprId, FunctionId, ScopeId, TypeId};
use crate::types::TypeKind;

/// Widest sized integer
pub const MAX_WIDTH: u32 = 64;

/// A folded call: where the result node is allocated and what it is typed
pub struct Folding {
    pub function: FunctionId,
    pub span: Span,
    pub scope: ScopeId,
}

fn fail(reason: impl Into<String>, span: Span) -> SemaError {
    SemaError::ConstantEvaluation {
        reason: reason.into(),
        span,
    }
}

/// Two's complement truncation of `value` to `width` bits
pub fn wrap(value: i128, signed: bool, width: u32) -> i128 {
    let modulus = 1i128 << width;
    let truncated = value.rem_euclid(modulus);
    if signed && truncated >= modulus / 2 {
        truncated - modulus
    } else {
        truncated
    }
}

/// Inclusive value range of a sized integer type
pub fn sized_range(signed: bool, width: u32) -> (i128, i128) {
    if signed {
        (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
    } else {
        (0, (1i128 << width) - 1)
    }
}

/// Evaluate `intrinsic` on constant arguments
///
/// `args` are the call's argument slots; a `None` slot is a parameter left
/// to its default. Returns the node holding the result.
pub fn evaluate(
    cx: &Sema,
    intrinsic: Intrinsic,
    args: &[Option<ExprId>],
    at: &Folding,
) -> SemaResult<ExprId> {
    let span = at.span;
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .flatten()
            .ok_or_else(|| SemaError::internal(format!("missing argument {i} of {intrinsic:?}")))
    };
    let result = match intrinsic {
        Intrinsic::Binary(op) => binary(cx, op, arg(0)?, arg(1)?, span)?,
        Intrinsic::Unary(op) => {
            let kind = cx.arena().exprs[arg(0)?].kind.clone();
            match (op, kind) {
                (UnOp::Neg, ExprKind::Integer(v)) => ExprKind::Integer(
                    v.checked_neg()
                        .ok_or_else(|| fail(format!("negating {v} overflows"), span))?,
                ),
                (UnOp::Not, ExprKind::Boolean(b)) => ExprKind::Boolean(!b),
                (op, kind) => {
                    return Err(SemaError::unimplemented(
                        format!("operator `{}` on a {}", op.as_str(), kind.describe()),
                        span,
                    ))
                }
            }
        }
        Intrinsic::SizedType { signed } => {
            let width = integer(cx, arg(0)?, span)?;
            if !(1..=i64::from(MAX_WIDTH)).contains(&width) {
                return Err(fail(
                    format!("integer width must be between 1 and {MAX_WIDTH}, got {width}"),
                    span,
                ));
            }
            let ty = cx.intern_type(TypeKind::SizedInteger {
                signed,
                width: width as u32,
            });
            ExprKind::TypeExpr(ty)
        }
        Intrinsic::ConvertToSized(ty) => {
            let value = i128::from(integer(cx, arg(0)?, span)?);
            let (signed, width) = sized_shape(cx, ty)?;
            let (min, max) = sized_range(signed, width);
            if value < min || value > max {
                return Err(fail(
                    format!(
                        "{value} does not fit in `{}`",
                        cx.arena().type_name(ty)
                    ),
                    span,
                ));
            }
            ExprKind::SizedInteger { value, ty }
        }
        Intrinsic::Aggregate(ty) => ExprKind::StructValue {
            ty,
            fields: (0..args.len()).map(arg).collect::<SemaResult<_>>()?,
        },
        Intrinsic::Replace(ty) => {
            let base = arg(0)?;
            let base_fields = match &cx.arena().exprs[base].kind {
                ExprKind::StructValue { fields, .. } => fields.clone(),
                other => {
                    return Err(SemaError::internal(format!(
                        "replacing fields of a {}",
                        other.describe()
                    )))
                }
            };
            let mut fields = Vec::with_capacity(base_fields.len());
            for (i, original) in base_fields.iter().enumerate() {
                let field = match args.get(i + 1).copied().flatten() {
                    Some(value) => value,
                    None => copy_constant(&mut cx.arena_mut(), *original),
                };
                fields.push(field);
            }
            ExprKind::StructValue { ty, fields }
        }
    };

    let ret = cx.arena().functions[at.function]
        .return_type
        .ok_or_else(|| SemaError::internal("intrinsic without a return type"))?;
    let id = cx
        .arena_mut()
        .alloc_typed_expr(result, ret, at.span, at.scope);
    Ok(id)
}

fn integer(cx: &Sema, id: ExprId, span: Span) -> SemaResult<i64> {
    match cx.arena().exprs[id].kind {
        ExprKind::Integer(v) => Ok(v),
        ref other => Err(fail(format!("expected an integer, found a {}", other.describe()), span)),
    }
}

fn sized_shape(cx: &Sema, ty: TypeId) -> SemaResult<(bool, u32)> {
    match cx.arena().type_kind(ty) {
        TypeKind::SizedInteger { signed, width } => Ok((*signed, *width)),
        _ => Err(SemaError::internal("sized conversion to a non-sized type")),
    }
}

fn compare<T: Ord>(op: BinOp, x: T, y: T) -> Option<bool> {
    Some(match op {
        BinOp::Eq => x == y,
        BinOp::Ne => x != y,
        BinOp::Lt => x < y,
        BinOp::Le => x <= y,
        BinOp::Gt => x > y,
        BinOp::Ge => x >= y,
        _ => return None,
    })
}

fn binary(cx: &Sema, op: BinOp, lhs: ExprId, rhs: ExprId, span: Span) -> SemaResult<ExprKind> {
    let (a, b) = {
        let arena = cx.arena();
        (arena.exprs[lhs].kind.clone(), arena.exprs[rhs].kind.clone())
    };
    let unsupported = |a: &ExprKind| {
        SemaError::unimplemented(format!("operator `{}` on a {}", op.as_str(), a.describe()), span)
    };
    match (&a, &b) {
        (ExprKind::Integer(x), ExprKind::Integer(y)) => {
            let (x, y) = (*x, *y);
            if let Some(result) = compare(op, x, y) {
                return Ok(ExprKind::Boolean(result));
            }
            let overflow = || fail(format!("`{x} {} {y}` overflows", op.as_str()), span);
            let value = match op {
                BinOp::Add => x.checked_add(y).ok_or_else(overflow)?,
                BinOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
                BinOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
                BinOp::Div | BinOp::Rem if y == 0 => {
                    return Err(fail(format!("`{x} {} 0` divides by zero", op.as_str()), span))
                }
                BinOp::Div => x.checked_div(y).ok_or_else(overflow)?,
                BinOp::Rem => x.checked_rem(y).ok_or_else(overflow)?,
                _ => return Err(unsupported(&a)),
            };
            Ok(ExprKind::Integer(value))
        }
        (ExprKind::Boolean(x), ExprKind::Boolean(y)) => Ok(ExprKind::Boolean(match op {
            BinOp::Eq => x == y,
            BinOp::Ne => x != y,
            BinOp::And => *x && *y,
            BinOp::Or => *x || *y,
            _ => return Err(unsupported(&a)),
        })),
        (
            ExprKind::SizedInteger { value: x, ty },
            ExprKind::SizedInteger { value: y, ty: other },
        ) if cx.arena().same_type(*ty, *other) => {
            if let Some(result) = compare(op, x, y) {
                return Ok(ExprKind::Boolean(result));
            }
            let (signed, width) = sized_shape(cx, *ty)?;
            let raw = match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                _ => return Err(unsupported(&a)),
            };
            Ok(ExprKind::SizedInteger {
                value: wrap(raw, signed, width),
                ty: *ty,
            })
        }
        (ExprKind::StructValue { .. }, ExprKind::StructValue { .. }) => {
            let equal = is_equal(&cx.arena(), lhs, rhs, span)?;
            match op {
                BinOp::Eq => Ok(ExprKind::Boolean(equal)),
                BinOp::Ne => Ok(ExprKind::Boolean(!equal)),
                _ => Err(unsupported(&a)),
            }
        }
        _ => {
            let equal = is_equal(&cx.arena(), lhs, rhs, span)?;
            match op {
                BinOp::Eq => Ok(ExprKind::Boolean(equal)),
                BinOp::Ne => Ok(ExprKind::Boolean(!equal)),
                _ => Err(unsupported(&a)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unsigned_and_signed() {
        assert_eq!(wrap(256, false, 8), 0);
        assert_eq!(wrap(-1, false, 8), 255);
        assert_eq!(wrap(128, true, 8), -128);
        assert_eq!(wrap(127, true, 8), 127);
        assert_eq!(wrap(-129, true, 8), 127);
        assert_eq!(wrap(i128::from(u64::MAX) + 1, false, 64), 0);
    }

    #[test]
    fn test_sized_range() {
        assert_eq!(sized_range(true, 8), (-128, 127));
        assert_eq!(sized_range(false, 1), (0, 1));
        assert_eq!(sized_range(true, 64), (i128::from(i64::MIN), i128::from(i64::MAX)));
    }

    #[test]
    fn test_compare_rejects_arithmetic() {
        assert_eq!(compare(BinOp::Lt, 1, 2), Some(true));
        assert_eq!(compare(BinOp::Add, 1, 2), None);
    }
}
