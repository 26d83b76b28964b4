//! Functions.
//!
//! A function is either declared in source (parameters with type
//! expressions, an optional return type annotation and a body), synthesized
//! by the compiler with an [`Intrinsic`] standing in for the body, or
//! imported from another module (signature only).
//!
//! Return types resolve through a future: with an annotation only the
//! signature is needed, otherwise the body is analyzed and the type of its
//! `return` statements is taken.

use std::rc::Rc;

use futures::future::try_join_all;
use vapc_ast::{BinOp, UnOp};
use vapc_util::{Span, Symbol};

use crate::analysis::{analyze_expr, analyze_stmt, evaluate_type};
use crate::context::{memoize, Pending, Sema, Task};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, TypeId};
use crate::stmt::StmtKind;
use crate::typeclass::instance_header;
use crate::types::TypeKind;
use crate::unresolved::settle;

#[derive(Debug, Clone)]
pub struct Function {
    pub name: Symbol,
    /// `Parameter` expressions, in order
    pub params: Vec<ExprId>,
    pub return_type_expr: Option<ExprId>,
    pub return_type: Option<TypeId>,
    /// Filled by signature analysis
    pub param_types: Option<Vec<TypeId>>,
    pub body: Option<StmtId>,
    /// Compile-time evaluator for functions without a body
    pub intrinsic: Option<Intrinsic>,
    /// Slot in the typeclass vtable this definition implements
    pub vtable_slot: Option<usize>,
    /// Checks run after the function is analyzed
    pub hooks: Vec<AnalysisHook>,
    /// Instance literal defining this function
    pub instance: Option<ExprId>,
    /// Parameter scope
    pub scope: ScopeId,
    pub span: Span,
    pub exported: bool,
    pub imported: bool,
    pub is_entry: bool,
}

impl Function {
    pub fn new(name: Symbol, params: Vec<ExprId>, scope: ScopeId, span: Span) -> Self {
        Self {
            name,
            params,
            return_type_expr: None,
            return_type: None,
            param_types: None,
            body: None,
            intrinsic: None,
            vtable_slot: None,
            hooks: Vec::new(),
            instance: None,
            scope,
            span,
            exported: false,
            imported: false,
            is_entry: false,
        }
    }
}

/// Native compile-time behavior of compiler-made functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// Builtin operator on integers, booleans, sized integers or structs
    Binary(BinOp),
    Unary(UnOp),
    /// `sint(N)` / `uint(N)`
    SizedType { signed: bool },
    /// `sint(N)(value)`
    ConvertToSized(TypeId),
    /// `T{a, b}`
    Aggregate(TypeId),
    /// `value{a}` / `value{.b = x}`
    Replace(TypeId),
}

#[derive(Debug, Clone)]
pub enum AnalysisHook {
    /// The function must match a typeclass member once archetypes are
    /// substituted by the instance arguments
    MatchesTypeclassMember {
        typeclass: TypeId,
        member: FunctionId,
        substitution: Vec<(TypeId, TypeId)>,
    },
}

/// Parameter and (when annotated) return types
///
/// Types referring into other modules are resolved here, so callers always
/// see canonical types.
pub fn analyze_signature(cx: &Rc<Sema>, function: FunctionId) -> Pending<()> {
    memoize(cx, Task::Signature(function), move |cx| async move {
        let (params, return_type_expr, annotated) = {
            let arena = cx.arena();
            let f = &arena.functions[function];
            (f.params.clone(), f.return_type_expr, f.return_type)
        };
        try_join_all(params.iter().map(|p| analyze_expr(&cx, *p))).await?;
        let mut param_types = Vec::with_capacity(params.len());
        for param in &params {
            let ty = cx.expr_type(*param)?;
            param_types.push(settle(&cx, ty).await?);
        }
        let return_type = match (return_type_expr, annotated) {
            (Some(expr), _) => Some(evaluate_type(&cx, expr).await?),
            (None, Some(ty)) => Some(settle(&cx, ty).await?),
            (None, None) => None,
        };
        let mut arena = cx.arena_mut();
        let f = &mut arena.functions[function];
        f.param_types = Some(param_types);
        if return_type.is_some() {
            f.return_type = return_type;
        }
        Ok(())
    })
}

/// Signature, body and hooks
pub fn analyze_function(cx: &Rc<Sema>, function: FunctionId) -> Pending<()> {
    memoize(cx, Task::Body(function), move |cx| async move {
        analyze_signature(&cx, function).await?;
        let (body, annotated, name, span, instance) = {
            let arena = cx.arena();
            let f = &arena.functions[function];
            (f.body, f.return_type, f.name, f.span, f.instance)
        };
        cx.stats.functions_analyzed.set(cx.stats.functions_analyzed.get() + 1);
        if let Some(body) = body {
            analyze_stmt(&cx, body).await?;
            let returns = cx.collect_returns(body);
            let mut deduced = annotated;
            for value in returns {
                let ty = cx.expr_type(value)?;
                match deduced {
                    Some(expected) if !cx.arena().same_type(expected, ty) => {
                        return Err(cx.mismatch(expected, ty, cx.expr_span(value)));
                    }
                    Some(_) => {}
                    None => deduced = Some(ty),
                }
            }
            let ret = deduced.ok_or_else(|| SemaError::unimplemented(
                format!("function `{name}` without a return statement"),
                span,
            ))?;
            cx.arena_mut().functions[function].return_type = Some(ret);
            log::debug!("function `{name}` returns `{}`", cx.arena().type_name(ret));
        }
        if let Some(literal) = instance {
            instance_header(&cx, literal).await?;
        }
        run_hooks(&cx, function).await
    })
}

/// Return type of `function`, analyzing the body when it is not annotated
pub async fn return_type(cx: &Rc<Sema>, function: FunctionId) -> SemaResult<TypeId> {
    analyze_signature(cx, function).await?;
    if let Some(ty) = cx.arena().functions[function].return_type {
        return Ok(ty);
    }
    analyze_function(cx, function).await?;
    cx.arena().functions[function]
        .return_type
        .ok_or_else(|| SemaError::internal("function analyzed without a return type"))
}

/// Parameter types after signature analysis
pub async fn param_types(cx: &Rc<Sema>, function: FunctionId) -> SemaResult<Vec<TypeId>> {
    analyze_signature(cx, function).await?;
    cx.arena().functions[function]
        .param_types
        .clone()
        .ok_or_else(|| SemaError::internal("signature analyzed without parameter types"))
}

async fn run_hooks(cx: &Rc<Sema>, function: FunctionId) -> SemaResult<()> {
    let hooks = cx.arena().functions[function].hooks.clone();
    for hook in hooks {
        match hook {
            AnalysisHook::MatchesTypeclassMember {
                typeclass,
                member,
                substitution,
            } => {
                let expected_params = param_types(cx, member).await?;
                let expected_ret = return_type(cx, member).await?;
                let actual_params = param_types(cx, function).await?;
                let actual_ret = return_type(cx, function).await?;
                let arena = cx.arena();
                let subst = |ty: TypeId| {
                    let ty = arena.canonical(ty);
                    substitution
                        .iter()
                        .find(|(from, _)| *from == ty)
                        .map(|(_, to)| arena.canonical(*to))
                        .unwrap_or(ty)
                };
                let params_match = expected_params.len() == actual_params.len()
                    && expected_params
                        .iter()
                        .zip(&actual_params)
                        .all(|(e, a)| subst(*e) == arena.canonical(*a));
                if !params_match || subst(expected_ret) != arena.canonical(actual_ret) {
                    let f = &arena.functions[function];
                    return Err(SemaError::InstanceMismatch {
                        typeclass: arena.type_name(typeclass),
                        reason: format!(
                            "`{}` has signature ({}) -> {}, expected ({}) -> {}",
                            f.name,
                            arena.type_list(&actual_params),
                            arena.type_name(actual_ret),
                            expected_params
                                .iter()
                                .map(|t| arena.type_name(subst(*t)))
                                .collect::<Vec<_>>()
                                .join(", "),
                            arena.type_name(subst(expected_ret)),
                        ),
                        span: f.span,
                    });
                }
            }
        }
    }
    Ok(())
}

impl Sema {
    /// `return` values reachable in `stmt`, not descending into nested
    /// function declarations
    pub fn collect_returns(&self, stmt: StmtId) -> Vec<ExprId> {
        let arena = self.arena();
        let mut out = Vec::new();
        let mut stack = vec![stmt];
        while let Some(s) = stack.pop() {
            match &arena.stmts[s].kind {
                StmtKind::Return { value } => out.push(*value),
                StmtKind::Block { statements } => stack.extend(statements.iter().rev()),
                StmtKind::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    stack.extend(else_branch);
                    stack.push(*then_branch);
                }
                StmtKind::Declaration(_)
                | StmtKind::Function(_)
                | StmtKind::Expression(_)
                | StmtKind::Null => {}
            }
        }
        out
    }

    /// Type of the function as a value
    pub fn function_type(&self, function: FunctionId) -> SemaResult<TypeId> {
        let (params, ret) = {
            let arena = self.arena();
            let f = &arena.functions[function];
            match (&f.param_types, f.return_type) {
                (Some(p), Some(r)) => (p.clone(), r),
                _ => return Err(SemaError::internal("function type requested before analysis")),
            }
        };
        Ok(self.intern_type(TypeKind::Function { params, ret }))
    }

    /// Whether the last parameter is a pack
    pub fn is_variadic(&self, function: FunctionId) -> bool {
        let arena = self.arena();
        let f = &arena.functions[function];
        f.param_types
            .as_ref()
            .and_then(|types| types.last())
            .is_some_and(|ty| matches!(arena.type_kind(*ty), TypeKind::Pack { .. }))
            || f.params.last().is_some_and(|p| {
                matches!(
                    &arena.exprs[*p].kind,
                    ExprKind::Parameter { type_expr: Some(t), .. }
                        if matches!(arena.exprs[*t].kind, ExprKind::Pack { .. })
                )
            })
    }
}
