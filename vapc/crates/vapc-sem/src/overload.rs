//! Candidate lookup and overload resolution.
//!
//! A call site is described by its [`CallSyntax`] and the types of its
//! arguments. The type the call is made on supplies the candidates; exactly
//! one must accept the arguments, with no implicit conversions:
//!
//! - positional arguments bind parameters in order,
//! - `.name = value` arguments bind the parameter of that name,
//! - a trailing pack parameter `T...` takes every remaining positional
//!   argument of type `T`,
//! - a parameter left unbound must have a default (the matching field of
//!   the value being replaced).

use std::rc::Rc;

use vapc_ast::{BinOp, Bracket, UnOp};
use vapc_util::{Span, Symbol};

use crate::analysis::analyze_expr;
use crate::context::Sema;
use crate::error::{SemaError, SemaResult};
use crate::expr::{ExprKind, ParamDefault};
use crate::function::param_types;
use crate::ids::{ExprId, FunctionId, ScopeId, TypeId};
use crate::structs::constructors;
use crate::types::TypeKind;

/// How a function is being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSyntax {
    Bracket(Bracket),
    Binary(BinOp),
    Unary(UnOp),
}

/// Functions `ty` offers for `syntax`
pub async fn candidates(
    cx: &Rc<Sema>,
    ty: TypeId,
    syntax: CallSyntax,
) -> SemaResult<Vec<FunctionId>> {
    let ty = cx.arena().canonical(ty);
    if let Some(function) = cx.builtins.operator(ty, syntax) {
        return Ok(vec![function]);
    }
    let kind = cx.arena().type_kind(ty).clone();
    match (kind, syntax) {
        (TypeKind::OverloadSet { functions, .. }, CallSyntax::Bracket(Bracket::Round)) => {
            Ok(functions)
        }
        (TypeKind::Struct(_), CallSyntax::Bracket(Bracket::Curly)) => {
            let ctors = constructors(cx, ty).await?;
            Ok(vec![ctors.aggregate, ctors.replace])
        }
        (TypeKind::Struct(_), CallSyntax::Binary(BinOp::Eq)) => {
            Ok(vec![constructors(cx, ty).await?.equal])
        }
        (TypeKind::Struct(_), CallSyntax::Binary(BinOp::Ne)) => {
            Ok(vec![constructors(cx, ty).await?.not_equal])
        }
        _ => Ok(Vec::new()),
    }
}

/// Where each parameter's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Arg(usize),
    Pack(Vec<usize>),
    /// The whole pack argument is forwarded as is
    Forward(usize),
    Default,
}

/// Parameter as seen by the matcher
#[derive(Debug, Clone)]
pub struct ParamShape {
    pub name: Option<Symbol>,
    pub ty: TypeId,
    pub default: ParamDefault,
    /// Element type of a pack parameter
    pub pack: Option<TypeId>,
}

/// Bind arguments to parameters, or `None` when the candidate does not
/// accept them
pub fn match_arguments(
    params: &[ParamShape],
    args: &[TypeId],
    designators: &[Option<Symbol>],
) -> Option<Vec<Binding>> {
    let mut bindings: Vec<Option<Binding>> = vec![None; params.len()];
    let positional: Vec<usize> = (0..args.len())
        .filter(|i| designators.get(*i).copied().flatten().is_none())
        .collect();

    let mut next = 0;
    for (index, param) in params.iter().enumerate() {
        if next >= positional.len() {
            break;
        }
        match param.pack {
            Some(pattern) if index + 1 == params.len() => {
                let rest = &positional[next..];
                if rest.len() == 1 && args[rest[0]] == param.ty {
                    bindings[index] = Some(Binding::Forward(rest[0]));
                } else if rest.iter().all(|a| args[*a] == pattern) {
                    bindings[index] = Some(Binding::Pack(rest.to_vec()));
                } else {
                    return None;
                }
                next = positional.len();
            }
            _ => {
                let arg = positional[next];
                if args[arg] != param.ty {
                    return None;
                }
                bindings[index] = Some(Binding::Arg(arg));
                next += 1;
            }
        }
    }
    if next < positional.len() {
        return None;
    }

    for (arg, designator) in designators.iter().enumerate() {
        let Some(name) = designator else { continue };
        let index = params.iter().position(|p| p.name == Some(*name))?;
        if bindings[index].is_some() || params[index].pack.is_some() || args[arg] != params[index].ty
        {
            return None;
        }
        bindings[index] = Some(Binding::Arg(arg));
    }

    params
        .iter()
        .zip(bindings)
        .map(|(param, binding)| match binding {
            Some(binding) => Some(binding),
            None if param.pack.is_some() => Some(Binding::Pack(Vec::new())),
            None if param.default != ParamDefault::Required => Some(Binding::Default),
            None => None,
        })
        .collect()
}

async fn shape_of(cx: &Rc<Sema>, function: FunctionId) -> SemaResult<Vec<ParamShape>> {
    let types = param_types(cx, function).await?;
    let arena = cx.arena();
    let f = &arena.functions[function];
    Ok(f.params
        .iter()
        .zip(types)
        .map(|(param, ty)| {
            let expr = &arena.exprs[*param];
            let default = match expr.kind {
                ExprKind::Parameter { default, .. } => default,
                _ => ParamDefault::Required,
            };
            let pack = match arena.type_kind(ty) {
                TypeKind::Pack { pattern } => Some(arena.canonical(*pattern)),
                _ => None,
            };
            ParamShape {
                name: expr.name,
                ty: arena.canonical(ty),
                default,
                pack,
            }
        })
        .collect())
}

/// A call site awaiting resolution
pub struct CallSite<'a> {
    /// Callee description for diagnostics
    pub name: String,
    pub args: &'a [ExprId],
    pub designators: &'a [Option<Symbol>],
    pub span: Span,
    pub scope: ScopeId,
}

/// Pick the unique matching candidate and build the analyzed call
pub async fn resolve_call(
    cx: &Rc<Sema>,
    candidates: &[FunctionId],
    site: CallSite<'_>,
) -> SemaResult<ExprId> {
    let arg_types = site
        .args
        .iter()
        .map(|a| cx.expr_type(*a))
        .collect::<SemaResult<Vec<_>>>()?;

    let mut matches = Vec::new();
    for candidate in candidates {
        let shape = shape_of(cx, *candidate).await?;
        if let Some(bindings) = match_arguments(&shape, &arg_types, site.designators) {
            matches.push((*candidate, shape, bindings));
        }
    }

    let describe_args = || {
        let arena = cx.arena();
        site.args
            .iter()
            .zip(&arg_types)
            .zip(site.designators.iter().chain(std::iter::repeat(&None)))
            .map(|((_, ty), designator)| match designator {
                Some(name) => format!(".{name} = {}", arena.type_name(*ty)),
                None => arena.type_name(*ty),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let (function, shape, bindings) = match matches.len() {
        0 => {
            return Err(SemaError::NoMatchingOverload {
                name: site.name,
                args: describe_args(),
                span: site.span,
            })
        }
        1 => matches.remove(0),
        count => {
            return Err(SemaError::AmbiguousOverload {
                name: site.name,
                args: describe_args(),
                count,
                span: site.span,
            })
        }
    };

    check_constructor_visibility(cx, function, site.scope, site.span)?;

    let call = {
        let mut arena = cx.arena_mut();
        let args = bindings
            .iter()
            .zip(&shape)
            .map(|(binding, param)| match binding {
                Binding::Arg(i) | Binding::Forward(i) => Some(site.args[*i]),
                Binding::Pack(items) => {
                    let items = items.iter().map(|i| site.args[*i]).collect();
                    Some(arena.alloc_typed_expr(
                        ExprKind::PackValue(items),
                        param.ty,
                        site.span,
                        site.scope,
                    ))
                }
                Binding::Default => None,
            })
            .collect();
        arena.alloc_expr(ExprKind::Call { function, args }, site.span, site.scope)
    };
    log::debug!(
        "resolved `{}` to {:?} ({})",
        site.name,
        function,
        cx.arena().functions[function].name
    );
    analyze_expr(cx, call).await?;
    Ok(call)
}

/// Constructors of a struct that is not exported may only be called from
/// inside the module declaring it
fn check_constructor_visibility(
    cx: &Sema,
    function: FunctionId,
    scope: ScopeId,
    span: Span,
) -> SemaResult<()> {
    let arena = cx.arena();
    let ty = match arena.functions[function].intrinsic {
        Some(crate::function::Intrinsic::Aggregate(ty))
        | Some(crate::function::Intrinsic::Replace(ty)) => ty,
        _ => return Ok(()),
    };
    let declared = &arena.types[ty];
    if declared.exported || declared.module == arena.scopes[scope].module {
        return Ok(());
    }
    Err(SemaError::NonExportedConstructor {
        ty: arena.type_name(ty),
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(name: &str, ty: u32) -> ParamShape {
        ParamShape {
            name: Some(Symbol::intern(name)),
            ty: TypeId(ty),
            default: ParamDefault::Required,
            pack: None,
        }
    }

    #[test]
    fn test_exact_arity_and_types() {
        let params = [shape("a", 1), shape("b", 2)];
        assert_eq!(
            match_arguments(&params, &[TypeId(1), TypeId(2)], &[None, None]),
            Some(vec![Binding::Arg(0), Binding::Arg(1)])
        );
        assert_eq!(match_arguments(&params, &[TypeId(1)], &[None]), None);
        assert_eq!(match_arguments(&params, &[TypeId(2), TypeId(1)], &[None, None]), None);
        assert_eq!(
            match_arguments(&params, &[TypeId(1), TypeId(2), TypeId(2)], &[None, None, None]),
            None
        );
    }

    #[test]
    fn test_designated_arguments_bind_by_name() {
        let mut params = vec![shape("self", 9), shape("i", 1), shape("j", 1)];
        params[1].default = ParamDefault::SelfField(0);
        params[2].default = ParamDefault::SelfField(1);
        let bindings = match_arguments(
            &params,
            &[TypeId(9), TypeId(1)],
            &[None, Some(Symbol::intern("j"))],
        );
        assert_eq!(
            bindings,
            Some(vec![Binding::Arg(0), Binding::Default, Binding::Arg(1)])
        );
    }

    #[test]
    fn test_designator_for_unknown_or_bound_parameter_fails() {
        let params = [shape("a", 1)];
        assert_eq!(
            match_arguments(&params, &[TypeId(1)], &[Some(Symbol::intern("zz"))]),
            None
        );
        assert_eq!(
            match_arguments(
                &params,
                &[TypeId(1), TypeId(1)],
                &[None, Some(Symbol::intern("a"))]
            ),
            None
        );
    }

    #[test]
    fn test_pack_collects_trailing_arguments() {
        let mut rest = shape("rest", 7);
        rest.pack = Some(TypeId(1));
        let params = [shape("first", 2), rest];
        assert_eq!(
            match_arguments(&params, &[TypeId(2), TypeId(1), TypeId(1)], &[None; 3]),
            Some(vec![Binding::Arg(0), Binding::Pack(vec![1, 2])])
        );
        assert_eq!(
            match_arguments(&params, &[TypeId(2)], &[None]),
            Some(vec![Binding::Arg(0), Binding::Pack(vec![])])
        );
        assert_eq!(
            match_arguments(&params, &[TypeId(2), TypeId(7)], &[None, None]),
            Some(vec![Binding::Arg(0), Binding::Forward(1)])
        );
        assert_eq!(
            match_arguments(&params, &[TypeId(2), TypeId(3)], &[None, None]),
            None
        );
    }
}
