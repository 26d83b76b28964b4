//! Types referenced by path before their module is analyzed.
//!
//! An imported signature names user-defined types as `module :: scopes :: name`.
//! Import turns each such reference into an interned `Unresolved` type; the
//! first time its identity matters it is resolved by walking the path:
//! module by name, then one nested scope per element (analyzing each step's
//! expression first), and finally evaluating the named type expression.

use std::rc::Rc;

use crate::analysis::{analyze_expr, evaluate_type, type_value};
use crate::context::{memoize, symbol_expression, Sema, Task};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::ids::{ScopeId, TypeId};
use crate::types::TypeKind;

/// Canonical form of `ty`, resolving it first if it is an unresolved
/// reference
pub async fn settle(cx: &Rc<Sema>, ty: TypeId) -> SemaResult<TypeId> {
    let pending = matches!(
        cx.arena().type_kind(ty),
        TypeKind::Unresolved(u) if u.resolved.is_none()
    );
    if pending {
        resolve(cx, ty).await?;
    }
    Ok(cx.arena().canonical(ty))
}

/// Resolve an unresolved type reference in place
pub async fn resolve(cx: &Rc<Sema>, ty: TypeId) -> SemaResult<()> {
    memoize(cx, Task::Resolve(ty), move |cx| async move {
        let reference = match &cx.arena().types[ty].kind {
            TypeKind::Unresolved(u) => u.clone(),
            _ => return Ok(()),
        };
        let dotted = reference
            .module
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(".");
        let not_found = |name: String| SemaError::FailedLookup {
            name,
            span: vapc_util::Span::DUMMY,
        };

        let module = {
            let modules = cx.modules.borrow();
            let arena = cx.arena();
            let found = modules.iter().copied().find(|m| {
                matches!(&arena.exprs[*m].kind, ExprKind::Module(data) if data.path == reference.module)
            });
            found
        }
        .ok_or_else(|| not_found(dotted.clone()))?;

        let mut scope: ScopeId = match &cx.arena().exprs[module].kind {
            ExprKind::Module(data) => data.scope,
            _ => return Err(SemaError::internal("module reference is not a module")),
        };
        for step in &reference.scopes {
            let symbol = cx
                .arena()
                .try_get(scope, *step)
                .ok_or_else(|| not_found(format!("{dotted}::{step}")))?;
            let expr = symbol_expression(&cx, symbol).await?;
            analyze_expr(&cx, expr).await?;
            let inner = type_value(&cx, expr)
                .await?
                .ok_or_else(|| SemaError::NotAType {
                    what: step.to_string(),
                    span: vapc_util::Span::DUMMY,
                })?;
            scope = cx.arena().types[inner].scope;
        }

        let symbol = cx
            .arena()
            .try_get(scope, reference.name)
            .ok_or_else(|| not_found(format!("{dotted}::{}", reference.name)))?;
        let expr = symbol_expression(&cx, symbol).await?;
        let target = evaluate_type(&cx, expr).await?;
        if let TypeKind::Unresolved(u) = &mut cx.arena_mut().types[ty].kind {
            u.resolved = Some(target);
        }
        log::debug!(
            "resolved `{dotted}::{}` to `{}`",
            reference.name,
            cx.arena().type_name(target)
        );
        Ok(())
    })
    .await
}
