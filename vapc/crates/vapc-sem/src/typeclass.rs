//! Typeclasses and their instances.
//!
//! A typeclass literal introduces one archetype per parameter and a list of
//! member signatures written in terms of those archetypes. An instance
//! literal names a typeclass and concrete argument types and defines every
//! member. The instance header ties the two together: it checks arity and
//! coverage, assigns each definition its vtable slot, registers the
//! instance on the typeclass and attaches a hook that later verifies each
//! definition's signature against the member with archetypes substituted.

use std::rc::Rc;

use futures::future::try_join_all;
use vapc_util::{Span, Symbol};

use crate::analysis::{analyze_expr, evaluate_type};
use crate::context::{memoize, Pending, Sema, Task};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::function::AnalysisHook;
use crate::ids::{ExprId, FunctionId, TypeId};
use crate::types::TypeKind;

fn mismatch(typeclass: String, reason: impl Into<String>, span: Span) -> SemaError {
    SemaError::InstanceMismatch {
        typeclass,
        reason: reason.into(),
        span,
    }
}

/// Resolve the typeclass and arguments of an instance literal and register it
pub fn instance_header(cx: &Rc<Sema>, literal: ExprId) -> Pending<()> {
    memoize(cx, Task::InstanceHeader(literal), move |cx| async move {
        let (inst_ty, tc_expr, args, span) = {
            let arena = cx.arena();
            let expr = &arena.exprs[literal];
            match &expr.kind {
                ExprKind::Instance {
                    ty,
                    typeclass,
                    args,
                } => (*ty, *typeclass, args.clone(), expr.span),
                other => {
                    return Err(SemaError::internal(format!(
                        "instance header of a {}",
                        other.describe()
                    )))
                }
            }
        };

        analyze_expr(&cx, tc_expr).await?;
        let tc_ty = cx.expr_type(tc_expr)?;
        let (params, members) = match cx.arena().type_kind(tc_ty) {
            TypeKind::Typeclass(tc) => (tc.params.clone(), tc.members.clone()),
            _ => {
                return Err(SemaError::TypeMismatch {
                    expected: "typeclass".into(),
                    found: cx.arena().type_name(tc_ty),
                    span: cx.expr_span(tc_expr),
                })
            }
        };
        let tc_name = cx.arena().type_name(tc_ty);

        let mut arg_types = Vec::with_capacity(args.len());
        for arg in &args {
            arg_types.push(evaluate_type(&cx, *arg).await?);
        }
        if arg_types.len() != params.len() {
            return Err(mismatch(
                tc_name,
                format!(
                    "expected {} type arguments, found {}",
                    params.len(),
                    arg_types.len()
                ),
                span,
            ));
        }
        let definitions = match cx.arena().type_kind(inst_ty) {
            TypeKind::Instance(inst) => inst.definitions.clone(),
            _ => return Err(SemaError::internal("instance literal without instance type")),
        };
        let vtable = assign_slots(&cx, &tc_name, &members, &definitions, span)?;

        // Checked after the last suspension point so two headers of the same
        // instance cannot both register.
        let duplicate = match cx.arena().type_kind(tc_ty) {
            TypeKind::Typeclass(tc) => tc.instances.iter().any(|(key, _)| *key == arg_types),
            _ => false,
        };
        if duplicate {
            return Err(mismatch(
                tc_name,
                format!("duplicate instance for ({})", cx.arena().type_list(&arg_types)),
                span,
            ));
        }

        let substitution: Vec<(TypeId, TypeId)> =
            params.iter().copied().zip(arg_types.iter().copied()).collect();
        let mut arena = cx.arena_mut();
        for (slot, (member, definition)) in members.iter().zip(&vtable).enumerate() {
            let f = &mut arena.functions[*definition];
            f.vtable_slot = Some(slot);
            f.hooks.push(AnalysisHook::MatchesTypeclassMember {
                typeclass: tc_ty,
                member: *member,
                substitution: substitution.clone(),
            });
        }
        if let TypeKind::Instance(inst) = &mut arena.types[inst_ty].kind {
            inst.typeclass = Some(tc_ty);
            inst.args = arg_types.clone();
            inst.vtable = vtable;
        }
        if let TypeKind::Typeclass(tc) = &mut arena.types[tc_ty].kind {
            tc.instances.push((arg_types.clone(), inst_ty));
        }
        log::debug!(
            "registered instance {}({})",
            tc_name,
            arena.type_list(&arg_types)
        );
        Ok(())
    })
}

/// Pair every typeclass member with the definition implementing it
fn assign_slots(
    cx: &Sema,
    tc_name: &str,
    members: &[FunctionId],
    definitions: &[FunctionId],
    span: Span,
) -> SemaResult<Vec<FunctionId>> {
    let arena = cx.arena();
    let mut taken = vec![false; definitions.len()];
    let mut vtable = Vec::with_capacity(members.len());
    for member in members {
        let name = arena.functions[*member].name;
        let found = definitions
            .iter()
            .enumerate()
            .position(|(i, d)| !taken[i] && arena.functions[*d].name == name)
            .ok_or_else(|| {
                mismatch(
                    tc_name.to_string(),
                    format!("missing definition of `{name}`"),
                    span,
                )
            })?;
        taken[found] = true;
        vtable.push(definitions[found]);
    }
    if let Some(extra) = taken.iter().position(|t| !t) {
        let f = &arena.functions[definitions[extra]];
        return Err(mismatch(
            tc_name.to_string(),
            format!("`{}` is not a member of the typeclass", f.name),
            f.span,
        ));
    }
    Ok(vtable)
}

/// Instance of `typeclass` for `args`
///
/// Every instance literal of the session is registered first, so the
/// answer does not depend on analysis order.
pub async fn select_instance(
    cx: &Rc<Sema>,
    typeclass: TypeId,
    args: &[TypeId],
    span: Span,
) -> SemaResult<TypeId> {
    let literals = cx.instance_literals.borrow().clone();
    try_join_all(literals.iter().map(|l| instance_header(cx, *l))).await?;

    let arena = cx.arena();
    let args: Vec<TypeId> = args.iter().map(|a| arena.canonical(*a)).collect();
    let selected = match arena.type_kind(typeclass) {
        TypeKind::Typeclass(tc) => tc
            .instances
            .iter()
            .find(|(key, _)| *key == args)
            .map(|(_, inst)| *inst)
            .ok_or_else(|| {
                mismatch(
                    arena.type_name(typeclass),
                    format!("no instance for ({})", arena.type_list(&args)),
                    span,
                )
            }),
        _ => Err(SemaError::internal("instance selection on a non-typeclass")),
    };
    selected
}

/// Definitions of `instance` whose vtable slot holds a typeclass member
/// called `name`
///
/// `None` while the instance header has not registered the vtable yet.
pub fn vtable_entries(cx: &Sema, instance: TypeId, name: Symbol) -> Option<Vec<FunctionId>> {
    let arena = cx.arena();
    let inst = match arena.type_kind(instance) {
        TypeKind::Instance(inst) => inst,
        _ => return None,
    };
    let members = match arena.type_kind(inst.typeclass?) {
        TypeKind::Typeclass(tc) => &tc.members,
        _ => return None,
    };
    let entries = inst
        .vtable
        .iter()
        .copied()
        .filter(|definition| {
            arena.functions[*definition]
                .vtable_slot
                .and_then(|slot| members.get(slot))
                .is_some_and(|member| arena.functions[*member].name == name)
        })
        .collect();
    Some(entries)
}
