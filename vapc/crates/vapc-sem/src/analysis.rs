//! Type analysis of expressions and statements.
//!
//! Every node is analyzed by one memoized future. Analyzing a node first
//! awaits whatever it depends on (operands, the declaration an identifier
//! names, the signature of a callee) and then records the node's type.
//! Call-like syntax (postfix, member access, operators) is given a
//! `resolved` node: the [`Call`](ExprKind::Call), field access or instance
//! it stands for. Later passes only look at resolutions.
//!
//! Type expressions are ordinary expressions of type `type`.
//! [`evaluate_type`] analyzes one and folds it to a constant to learn which
//! type it denotes.

use std::rc::Rc;

use futures::future::try_join_all;
use vapc_ast::Bracket;
use vapc_util::{Span, Symbol};

use crate::context::{memoize, symbol_expression, Pending, Sema, Stats, Task};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::function::{analyze_function, analyze_signature, return_type};
use crate::ids::{ExprId, ScopeId, StmtId, TypeId};
use crate::overload::{candidates, resolve_call, CallSite, CallSyntax};
use crate::print::print_expr;
use crate::simplify::fixpoint_expr;
use crate::stmt::{Declaration, StmtKind};
use crate::structs::{field_index, struct_fields};
use crate::typeclass::{instance_header, select_instance, vtable_entries};
use crate::types::TypeKind;
use crate::unresolved::settle;

/// Analyze an expression and everything it depends on
pub fn analyze_expr(cx: &Rc<Sema>, id: ExprId) -> Pending<()> {
    memoize(cx, Task::Expr(id), move |cx| async move {
        Stats::bump(&cx.stats.exprs_analyzed);
        if let Some(ty) = expr_kind(&cx, id).await? {
            cx.set_type(id, ty);
        }
        Ok(())
    })
}

/// Analyze a statement and everything it depends on
pub fn analyze_stmt(cx: &Rc<Sema>, id: StmtId) -> Pending<()> {
    memoize(cx, Task::Stmt(id), move |cx| async move {
        Stats::bump(&cx.stats.stmts_analyzed);
        let kind = cx.arena().stmts[id].kind.clone();
        match kind {
            StmtKind::Declaration(decl) => declaration(&cx, &decl).await,
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                analyze_expr(&cx, condition).await?;
                cx.expect_type(condition, cx.builtins.bool)?;
                analyze_stmt(&cx, then_branch).await?;
                if let Some(otherwise) = else_branch {
                    analyze_stmt(&cx, otherwise).await?;
                }
                Ok(())
            }
            StmtKind::Return { value } => analyze_expr(&cx, value).await,
            StmtKind::Block { statements } => {
                try_join_all(statements.iter().map(|s| analyze_stmt(&cx, *s))).await?;
                Ok(())
            }
            StmtKind::Function(function) => analyze_function(&cx, function).await,
            StmtKind::Expression(expr) => analyze_expr(&cx, expr).await,
            StmtKind::Null => Ok(()),
        }
    })
}

/// The type an expression of type `type` denotes
pub async fn evaluate_type(cx: &Rc<Sema>, expr: ExprId) -> SemaResult<TypeId> {
    analyze_expr(cx, expr).await?;
    let ty = cx.expr_type(expr)?;
    if !cx.arena().same_type(ty, cx.builtins.type_) {
        return Err(not_a_type(cx, expr));
    }
    let value = type_value(cx, expr)
        .await?
        .ok_or_else(|| not_a_type(cx, expr))?;
    settle(cx, value).await
}

/// The type an analyzed expression folds to, `None` when it is not a
/// compile-time type
///
/// Initializers of variables on the way are folded in place.
pub async fn type_value(cx: &Rc<Sema>, expr: ExprId) -> SemaResult<Option<TypeId>> {
    let mut current = expr;
    for _ in 0..=cx.config.max_simplify_rounds {
        let (node, owner) = value_node(cx, current);
        let kind = cx.arena().exprs[node].kind.clone();
        match kind {
            ExprKind::TypeExpr(ty) | ExprKind::StructLiteral { ty } | ExprKind::Instance { ty, .. } => {
                return Ok(Some(cx.arena().canonical(ty)));
            }
            ExprKind::Pack { pattern } => {
                let pattern = Box::pin(evaluate_type(cx, pattern)).await?;
                return Ok(Some(cx.intern_type(TypeKind::Pack { pattern })));
            }
            _ if cx.arena().is_constant(node) => return Ok(None),
            ExprKind::Parameter { .. } | ExprKind::DataMember { .. } | ExprKind::Entity { .. } => {
                return Ok(None)
            }
            _ => {}
        }

        let folded = fixpoint_expr(cx, node, 0).await?;
        if folded == node {
            return Ok(None);
        }
        match owner {
            Some(decl) => {
                if let StmtKind::Declaration(d) = &mut cx.arena_mut().stmts[decl].kind {
                    d.init = Some(folded);
                }
            }
            None => current = folded,
        }
    }
    Err(SemaError::NoFixpoint {
        rounds: cx.config.max_simplify_rounds,
    })
}

/// Node carrying the value of `id`, following resolutions, identifier
/// targets and variable initializers; also the declaration whose
/// initializer it is
fn value_node(cx: &Sema, id: ExprId) -> (ExprId, Option<StmtId>) {
    let arena = cx.arena();
    let mut id = arena.resolved(id);
    let mut owner = None;
    loop {
        let next = match &arena.exprs[id].kind {
            ExprKind::Identifier {
                target: Some(target),
                ..
            } => match &arena.exprs[*target].kind {
                ExprKind::Variable { decl } => match &arena.stmts[*decl].kind {
                    StmtKind::Declaration(Declaration {
                        init: Some(init), ..
                    }) => {
                        owner = Some(*decl);
                        *init
                    }
                    _ => return (*target, None),
                },
                _ => {
                    owner = None;
                    *target
                }
            },
            _ => return (id, owner),
        };
        id = arena.resolved(next);
    }
}

fn not_a_type(cx: &Sema, expr: ExprId) -> SemaError {
    let arena = cx.arena();
    SemaError::NotAType {
        what: print_expr(&arena, expr),
        span: arena.exprs[expr].span,
    }
}

fn set_resolved(cx: &Sema, id: ExprId, resolution: ExprId) {
    match &mut cx.arena_mut().exprs[id].kind {
        ExprKind::Postfix { resolved, .. }
        | ExprKind::Member { resolved, .. }
        | ExprKind::Binary { resolved, .. }
        | ExprKind::Unary { resolved, .. } => *resolved = Some(resolution),
        _ => {}
    }
}

/// Type of the expression, or `None` when analysis of a dependency already
/// recorded it
async fn expr_kind(cx: &Rc<Sema>, id: ExprId) -> SemaResult<Option<TypeId>> {
    let (kind, preset, span, scope) = {
        let arena = cx.arena();
        let expr = &arena.exprs[id];
        (expr.kind.clone(), expr.ty, expr.span, expr.scope)
    };
    let builtins = &cx.builtins;
    let ty = match kind {
        ExprKind::Integer(_) => builtins.int,
        ExprKind::Boolean(_) => builtins.bool,
        ExprKind::SizedInteger { ty, .. } => ty,

        ExprKind::Identifier { name, target } => {
            let target = match target {
                Some(target) => target,
                None => {
                    let symbol = cx.arena().resolve(scope, name, span)?;
                    symbol_expression(cx, symbol).await?
                }
            };
            analyze_expr(cx, target).await?;
            if let ExprKind::Identifier { target: slot, .. } = &mut cx.arena_mut().exprs[id].kind {
                *slot = Some(target);
            }
            cx.expr_type(target)?
        }

        ExprKind::Postfix {
            base,
            bracket,
            args,
            designators,
            ..
        } => {
            let call = postfix(cx, id, base, bracket, &args, &designators).await?;
            set_resolved(cx, id, call);
            cx.expr_type(call)?
        }

        ExprKind::Member { base, name, .. } => {
            let resolution = member(cx, base, name, span, scope).await?;
            set_resolved(cx, id, resolution);
            cx.expr_type(resolution)?
        }

        ExprKind::Binary { op, lhs, rhs, .. } => {
            analyze_expr(cx, lhs).await?;
            analyze_expr(cx, rhs).await?;
            let operand = cx.expr_type(lhs)?;
            let found = candidates(cx, operand, CallSyntax::Binary(op)).await?;
            let call = resolve_call(
                cx,
                &found,
                CallSite {
                    name: op.symbol().to_string(),
                    args: &[lhs, rhs],
                    designators: &[None, None],
                    span,
                    scope,
                },
            )
            .await?;
            set_resolved(cx, id, call);
            cx.expr_type(call)?
        }

        ExprKind::Unary { op, operand, .. } => {
            analyze_expr(cx, operand).await?;
            let operand_ty = cx.expr_type(operand)?;
            let found = candidates(cx, operand_ty, CallSyntax::Unary(op)).await?;
            let call = resolve_call(
                cx,
                &found,
                CallSite {
                    name: op.symbol().to_string(),
                    args: &[operand],
                    designators: &[None],
                    span,
                    scope,
                },
            )
            .await?;
            set_resolved(cx, id, call);
            cx.expr_type(call)?
        }

        ExprKind::Call { function, args } => {
            try_join_all(args.iter().flatten().map(|a| analyze_expr(cx, *a))).await?;
            return_type(cx, function).await?
        }

        ExprKind::FieldAccess { base, index } => match preset {
            Some(ty) => ty,
            None => {
                analyze_expr(cx, base).await?;
                let base_ty = cx.expr_type(base)?;
                let fields = struct_fields(cx, base_ty).await?;
                fields
                    .get(index)
                    .map(|f| f.ty)
                    .ok_or_else(|| SemaError::internal("field index out of range"))?
            }
        },

        ExprKind::StructLiteral { ty } => {
            struct_fields(cx, ty).await?;
            builtins.type_
        }
        ExprKind::StructValue { ty, fields } => {
            try_join_all(fields.iter().map(|f| analyze_expr(cx, *f))).await?;
            ty
        }
        ExprKind::TypeExpr(_) => builtins.type_,

        ExprKind::OverloadSet(set) => {
            check_overloads(cx, set).await?;
            set
        }

        ExprKind::Typeclass(ty) => {
            let members = match cx.arena().type_kind(ty) {
                TypeKind::Typeclass(tc) => tc.members.clone(),
                _ => Vec::new(),
            };
            try_join_all(members.iter().map(|m| analyze_signature(cx, *m))).await?;
            ty
        }

        ExprKind::Instance { ty, .. } => {
            instance_header(cx, id).await?;
            let definitions = match cx.arena().type_kind(ty) {
                TypeKind::Instance(inst) => inst.definitions.clone(),
                _ => Vec::new(),
            };
            try_join_all(definitions.iter().map(|d| analyze_function(cx, *d))).await?;
            builtins.type_
        }

        ExprKind::Pack { pattern } => {
            evaluate_type(cx, pattern).await?;
            builtins.type_
        }
        ExprKind::PackValue(items) => {
            try_join_all(items.iter().map(|i| analyze_expr(cx, *i))).await?;
            preset.ok_or_else(|| SemaError::internal("pack built without a type"))?
        }

        ExprKind::Parameter { type_expr, .. } => match (preset, type_expr) {
            (Some(ty), _) => ty,
            (None, Some(type_expr)) => evaluate_type(cx, type_expr).await?,
            (None, None) => return Err(SemaError::internal("parameter without a type")),
        },

        ExprKind::Variable { decl } | ExprKind::DataMember { decl } => {
            analyze_stmt(cx, decl).await?;
            return Ok(None);
        }

        ExprKind::Entity { .. } => {
            let ty = preset.ok_or_else(|| SemaError::internal("entity imported without a type"))?;
            settle(cx, ty).await?
        }

        ExprKind::List(items) => {
            let Some(last) = items.last().copied() else {
                return Err(SemaError::unimplemented("empty expression list", span));
            };
            for item in &items {
                analyze_expr(cx, *item).await?;
            }
            cx.expr_type(last)?
        }

        ExprKind::Module(data) => {
            try_join_all(data.statements.iter().map(|s| analyze_stmt(cx, *s))).await?;
            check_entry_point(cx, id).await?;
            preset.ok_or_else(|| SemaError::internal("module without a type"))?
        }
    };
    Ok(Some(ty))
}

async fn postfix(
    cx: &Rc<Sema>,
    id: ExprId,
    base: ExprId,
    bracket: Bracket,
    args: &[ExprId],
    designators: &[Option<Symbol>],
) -> SemaResult<ExprId> {
    let (span, scope) = {
        let arena = cx.arena();
        (arena.exprs[id].span, arena.exprs[id].scope)
    };
    analyze_expr(cx, base).await?;
    try_join_all(args.iter().map(|a| analyze_expr(cx, *a))).await?;

    let base_ty = cx.expr_type(base)?;
    let base_kind = cx.arena().type_kind(base_ty).clone();
    let syntax = CallSyntax::Bracket(bracket);

    // `T(...)`, `T{...}`: the type supplies the candidates
    if cx.arena().same_type(base_ty, cx.builtins.type_) {
        let value = type_value(cx, base)
            .await?
            .ok_or_else(|| not_a_type(cx, base))?;
        let value = settle(cx, value).await?;
        let found = candidates(cx, value, syntax).await?;
        let name = cx.arena().type_name(value);
        return resolve_call(
            cx,
            &found,
            CallSite {
                name,
                args,
                designators,
                span,
                scope,
            },
        )
        .await;
    }

    match base_kind {
        TypeKind::Typeclass(_) => {
            if bracket != Bracket::Round || designators.iter().any(Option::is_some) {
                return Err(SemaError::unimplemented(
                    "typeclass arguments other than a plain type list",
                    span,
                ));
            }
            let mut arg_types = Vec::with_capacity(args.len());
            for arg in args {
                arg_types.push(evaluate_type(cx, *arg).await?);
            }
            let instance = select_instance(cx, base_ty, &arg_types, span).await?;
            let type_ = cx.builtins.type_;
            Ok(cx
                .arena_mut()
                .alloc_typed_expr(ExprKind::TypeExpr(instance), type_, span, scope))
        }
        TypeKind::OverloadSet { name, .. } if bracket == Bracket::Round => {
            let found = candidates(cx, base_ty, syntax).await?;
            resolve_call(
                cx,
                &found,
                CallSite {
                    name: name.to_string(),
                    args,
                    designators,
                    span,
                    scope,
                },
            )
            .await
        }
        _ => {
            // `value{...}`: the value is the first argument
            let found = candidates(cx, base_ty, syntax).await?;
            let mut all_args = Vec::with_capacity(args.len() + 1);
            all_args.push(base);
            all_args.extend_from_slice(args);
            let mut all_designators = Vec::with_capacity(designators.len() + 1);
            all_designators.push(None);
            all_designators.extend_from_slice(designators);
            let name = format!(
                "{}{}{}",
                cx.arena().type_name(base_ty),
                bracket.open(),
                bracket.close()
            );
            resolve_call(
                cx,
                &found,
                CallSite {
                    name,
                    args: &all_args,
                    designators: &all_designators,
                    span,
                    scope,
                },
            )
            .await
        }
    }
}

async fn member(
    cx: &Rc<Sema>,
    base: ExprId,
    name: Symbol,
    span: Span,
    scope: ScopeId,
) -> SemaResult<ExprId> {
    analyze_expr(cx, base).await?;
    let base_ty = cx.expr_type(base)?;
    let kind = cx.arena().type_kind(base_ty).clone();
    fn failed(cx: &Sema, owner: TypeId, name: Symbol, span: Span) -> SemaError {
        SemaError::FailedLookup {
            name: format!("{}.{name}", cx.arena().type_name(owner)),
            span,
        }
    }
    match kind {
        TypeKind::Struct(_) => {
            let index = field_index(cx, base_ty, name)
                .await?
                .ok_or_else(|| failed(cx, base_ty, name, span))?;
            let fields = struct_fields(cx, base_ty).await?;
            let ty = fields[index].ty;
            Ok(cx.arena_mut().alloc_typed_expr(
                ExprKind::FieldAccess { base, index },
                ty,
                span,
                scope,
            ))
        }
        TypeKind::Module => {
            let members = cx.arena().types[cx.arena().canonical(base_ty)].scope;
            scoped_member(cx, members, name, span, scope)
                .await?
                .ok_or_else(|| failed(cx, base_ty, name, span))
        }
        TypeKind::Type => {
            let value = type_value(cx, base)
                .await?
                .ok_or_else(|| not_a_type(cx, base))?;
            let value = settle(cx, value).await?;
            if !matches!(cx.arena().type_kind(value), TypeKind::Instance(_)) {
                return Err(failed(cx, value, name, span));
            }
            if let Some(functions) = vtable_entries(cx, value, name) {
                if functions.is_empty() {
                    return Err(failed(cx, value, name, span));
                }
                let set = cx.intern_type(TypeKind::OverloadSet { name, functions });
                let resolution = cx.arena_mut().alloc_typed_expr(
                    ExprKind::OverloadSet(set),
                    set,
                    span,
                    scope,
                );
                analyze_expr(cx, resolution).await?;
                return Ok(resolution);
            }
            let members = cx.arena().types[value].scope;
            scoped_member(cx, members, name, span, scope)
                .await?
                .ok_or_else(|| failed(cx, value, name, span))
        }
        _ => Err(failed(cx, base_ty, name, span)),
    }
}

/// Identifier bound to `name` in the member scope of a module or instance
async fn scoped_member(
    cx: &Rc<Sema>,
    members: ScopeId,
    name: Symbol,
    span: Span,
    scope: ScopeId,
) -> SemaResult<Option<ExprId>> {
    let symbol = {
        let arena = cx.arena();
        arena
            .try_get(members, name)
            .filter(|s| !arena.symbols[*s].hidden)
    };
    let Some(symbol) = symbol else {
        return Ok(None);
    };
    let target = symbol_expression(cx, symbol).await?;
    analyze_expr(cx, target).await?;
    let ty = cx.expr_type(target)?;
    Ok(Some(cx.arena_mut().alloc_typed_expr(
        ExprKind::Identifier {
            name,
            target: Some(target),
        },
        ty,
        span,
        scope,
    )))
}

/// No two functions of an overload set may take the same parameter types
async fn check_overloads(cx: &Rc<Sema>, set: TypeId) -> SemaResult<()> {
    let (name, functions) = match cx.arena().type_kind(set) {
        TypeKind::OverloadSet { name, functions } => (*name, functions.clone()),
        _ => return Err(SemaError::internal("overload set expression of another type")),
    };
    try_join_all(functions.iter().map(|f| analyze_signature(cx, *f))).await?;
    let arena = cx.arena();
    for (i, later) in functions.iter().enumerate() {
        let params = arena.functions[*later].param_types.clone().unwrap_or_default();
        let clash = functions[..i].iter().any(|earlier| {
            arena.functions[*earlier]
                .param_types
                .as_ref()
                .is_some_and(|other| {
                    other.len() == params.len()
                        && other.iter().zip(&params).all(|(a, b)| arena.same_type(*a, *b))
                })
        });
        if clash {
            return Err(SemaError::DuplicateOverload {
                name: name.to_string(),
                params: arena.type_list(&params),
                span: arena.functions[*later].span,
            });
        }
    }
    Ok(())
}

async fn declaration(cx: &Rc<Sema>, decl: &Declaration) -> SemaResult<()> {
    let declared_ty = match decl.type_expr {
        Some(type_expr) => Some(evaluate_type(cx, type_expr).await?),
        None => None,
    };
    let init_ty = match decl.init {
        Some(init) => {
            analyze_expr(cx, init).await?;
            Some(cx.expr_type(init)?)
        }
        None => None,
    };
    let ty = match (declared_ty, init_ty, decl.init) {
        (Some(declared), Some(found), Some(init)) => {
            if !cx.arena().same_type(declared, found) {
                return Err(cx.mismatch(declared, found, cx.expr_span(init)));
            }
            declared
        }
        (Some(declared), _, _) => declared,
        (None, Some(found), _) => found,
        (None, None, _) => {
            return Err(SemaError::internal(format!(
                "declaration of `{}` without type or initializer",
                decl.name
            )))
        }
    };
    cx.set_type(decl.declared, ty);
    log::trace!("`{}` has type `{}`", decl.name, cx.arena().type_name(ty));
    Ok(())
}

/// Mark the entry function of the entry module
///
/// The entry function must be the only function of its name, take no
/// parameters and return `int`.
async fn check_entry_point(cx: &Rc<Sema>, module: ExprId) -> SemaResult<()> {
    let (path, scope) = match &cx.arena().exprs[module].kind {
        ExprKind::Module(data) => (data.dotted_name(), data.scope),
        _ => return Err(SemaError::internal("entry point check on a non-module")),
    };
    if path != cx.config.entry_module {
        return Ok(());
    }
    let name = Symbol::intern(&cx.config.entry_function);
    let Some(symbol) = cx.arena().try_get(scope, name) else {
        return Ok(());
    };
    let expr = symbol_expression(cx, symbol).await?;
    let invalid = |reason: &str, span: Span| SemaError::InvalidEntryPoint {
        name: name.to_string(),
        reason: reason.to_string(),
        span,
    };

    let functions = {
        let arena = cx.arena();
        match &arena.exprs[expr].kind {
            ExprKind::OverloadSet(set) => match arena.type_kind(*set) {
                TypeKind::OverloadSet { functions, .. } => Some(functions.clone()),
                _ => None,
            },
            _ => None,
        }
    };
    let Some(functions) = functions else {
        return Err(invalid("not a function", cx.expr_span(expr)));
    };
    let &[function] = functions.as_slice() else {
        let span = functions
            .last()
            .map(|f| cx.arena().functions[*f].span)
            .unwrap_or_else(|| cx.expr_span(expr));
        return Err(invalid("must not be overloaded", span));
    };
    let span = cx.arena().functions[function].span;
    let params = crate::function::param_types(cx, function).await?;
    if !params.is_empty() {
        return Err(invalid("must not take parameters", span));
    }
    let ret = return_type(cx, function).await?;
    if !cx.arena().same_type(ret, cx.builtins.int) {
        return Err(invalid(
            &format!("must return `int`, not `{}`", cx.arena().type_name(ret)),
            span,
        ));
    }

    let mut arena = cx.arena_mut();
    arena.functions[function].is_entry = true;
    if let ExprKind::Module(data) = &mut arena.exprs[module].kind {
        data.entry = Some(function);
    }
    log::info!("entry point `{path}.{name}`");
    Ok(())
}
