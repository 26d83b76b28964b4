//! Struct types: data members and synthesized constructors.
//!
//! Every struct gets four compiler-made functions, built on first use and
//! cached on the type:
//!
//! - `aggregate(f0, .., fn)`: `T{a, b}`
//! - `replace(self, f0 = self.f0, ..)`: `value{a}` and `value{.b = x}`;
//!   with no fields this is the copy constructor `T{value}`
//! - `==` and `!=`, member-wise

use std::rc::Rc;

use futures::future::try_join_all;
use vapc_ast::BinOp;
use vapc_util::{sym, Symbol};

use crate::analysis::analyze_stmt;
use crate::context::{memoize, Sema, Task};
use crate::error::{SemaError, SemaResult};
use crate::expr::ParamDefault;
use crate::function::Intrinsic;
use crate::ids::TypeId;
use crate::stmt::StmtKind;
use crate::types::{Constructors, Field, TypeKind};
use crate::unresolved::settle;

/// Data members of a struct type, analyzing them if needed
pub async fn struct_fields(cx: &Rc<Sema>, ty: TypeId) -> SemaResult<Vec<Field>> {
    let ty = cx.arena().canonical(ty);
    let (members, known) = match cx.arena().type_kind(ty) {
        TypeKind::Struct(s) => (s.members.clone(), s.fields.clone()),
        _ => {
            return Err(SemaError::internal(format!(
                "`{}` has no fields",
                cx.arena().type_name(ty)
            )))
        }
    };
    if let Some(fields) = known {
        // Imported fields may still name types of other modules.
        let mut settled = Vec::with_capacity(fields.len());
        for field in fields {
            settled.push(Field {
                ty: settle(cx, field.ty).await?,
                ..field
            });
        }
        return Ok(settled);
    }

    try_join_all(members.iter().map(|m| analyze_stmt(cx, *m))).await?;
    let fields = {
        let arena = cx.arena();
        members
            .iter()
            .map(|member| match &arena.stmts[*member].kind {
                StmtKind::Declaration(decl) => {
                    let ty = arena.exprs[decl.declared].ty.ok_or_else(|| {
                        SemaError::internal("struct member analyzed without a type")
                    })?;
                    Ok(Field {
                        name: decl.name,
                        ty,
                        member: Some(decl.declared),
                    })
                }
                _ => Err(SemaError::internal("struct member is not a declaration")),
            })
            .collect::<SemaResult<Vec<_>>>()?
    };
    if let TypeKind::Struct(s) = &mut cx.arena_mut().types[ty].kind {
        s.fields = Some(fields.clone());
    }
    Ok(fields)
}

/// Index of the field called `name`
pub async fn field_index(cx: &Rc<Sema>, ty: TypeId, name: Symbol) -> SemaResult<Option<usize>> {
    Ok(struct_fields(cx, ty)
        .await?
        .iter()
        .position(|f| f.name == name))
}

/// The synthesized constructors of a struct type
pub async fn constructors(cx: &Rc<Sema>, ty: TypeId) -> SemaResult<Constructors> {
    let ty = cx.arena().canonical(ty);
    memoize(cx, Task::Constructors(ty), move |cx| async move {
        let fields = struct_fields(&cx, ty).await?;
        let (scope, bool_ty) = (cx.arena().types[ty].scope, cx.builtins.bool);
        let mut arena = cx.arena_mut();

        let aggregate_params: Vec<_> = fields
            .iter()
            .map(|f| (f.name, f.ty, ParamDefault::Required))
            .collect();
        let aggregate = arena.synthesize_function(
            sym::CONSTRUCTOR,
            &aggregate_params,
            ty,
            Intrinsic::Aggregate(ty),
            scope,
        );

        let replace_params: Vec<_> = std::iter::once((sym::SELF, ty, ParamDefault::Required))
            .chain(
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (f.name, f.ty, ParamDefault::SelfField(i))),
            )
            .collect();
        let replace = arena.synthesize_function(
            sym::CONSTRUCTOR,
            &replace_params,
            ty,
            Intrinsic::Replace(ty),
            scope,
        );

        let operands = [
            (Symbol::intern("lhs"), ty, ParamDefault::Required),
            (Symbol::intern("rhs"), ty, ParamDefault::Required),
        ];
        let equal = arena.synthesize_function(
            BinOp::Eq.symbol(),
            &operands,
            bool_ty,
            Intrinsic::Binary(BinOp::Eq),
            scope,
        );
        let not_equal = arena.synthesize_function(
            BinOp::Ne.symbol(),
            &operands,
            bool_ty,
            Intrinsic::Binary(BinOp::Ne),
            scope,
        );

        let exported = arena.types[ty].exported;
        for f in [aggregate, replace, equal, not_equal] {
            arena.functions[f].exported = exported;
        }
        if let TypeKind::Struct(s) = &mut arena.types[ty].kind {
            s.constructors = Some(Constructors {
                aggregate,
                replace,
                equal,
                not_equal,
            });
        }
        log::debug!(
            "synthesized constructors of `{}` with {} fields",
            arena.type_name(ty),
            fields.len()
        );
        Ok(())
    })
    .await?;

    let synthesized = match cx.arena().type_kind(ty) {
        TypeKind::Struct(s) => s.constructors,
        _ => None,
    };
    synthesized.ok_or_else(|| SemaError::internal("constructors missing after synthesis"))
}
