//! Simplification: constant folding to a fixpoint.
//!
//! One round walks the tree and returns, for every node, the node that
//! should replace it; the caller stores that id back into its own slot. A
//! round that replaced nothing is a fixpoint. Rounds never run on
//! unanalyzed code.
//!
//! Folding rules:
//!
//! - call syntax and operators are their resolution,
//! - an identifier naming a constant (or a variable initialized with one)
//!   becomes a copy of it,
//! - an intrinsic call with constant arguments is evaluated,
//! - a user call with constant arguments is specialized: the body is cloned
//!   with parameters bound to the arguments, simplified to its own fixpoint
//!   and replaced by its first `return` value when that is constant,
//! - `if` on a constant condition becomes the branch taken,
//! - statements after one that always returns are dropped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::FutureExt;
use vapc_util::{FxHashMap, Span};

use crate::arena::Arena;
use crate::constant::{copy_constant, ConstKey};
use crate::context::{Pending, Sema, Stats};
use crate::error::{SemaError, SemaResult};
use crate::expr::ExprKind;
use crate::function::analyze_function;
use crate::ids::{ExprId, FunctionId, StmtId};
use crate::intrinsics::{self, Folding};
use crate::print::print_expr;
use crate::replacements::Replacements;
use crate::stmt::StmtKind;
use crate::types::TypeKind;

/// State of one simplification round
pub struct SimplifyContext {
    /// Specialization nesting of the code being simplified
    depth: usize,
    changes: Cell<usize>,
    exprs: RefCell<FxHashMap<ExprId, Pending<ExprId>>>,
    stmts: RefCell<FxHashMap<StmtId, Pending<StmtId>>>,
}

impl SimplifyContext {
    pub fn new(depth: usize) -> Rc<Self> {
        Rc::new(Self {
            depth,
            changes: Cell::new(0),
            exprs: RefCell::default(),
            stmts: RefCell::default(),
        })
    }

    /// Replacements made so far this round
    pub fn changes(&self) -> usize {
        self.changes.get()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn changed(&self) {
        self.changes.set(self.changes.get() + 1);
    }

    /// Drop the memoized futures, which hold on to the context
    pub fn clear(&self) {
        self.exprs.borrow_mut().clear();
        self.stmts.borrow_mut().clear();
    }
}

/// Simplify an expression once per round, returning its replacement
pub fn simplify_expr(cx: &Rc<Sema>, sx: &Rc<SimplifyContext>, id: ExprId) -> Pending<ExprId> {
    let existing = sx.exprs.borrow().get(&id).cloned();
    if let Some(pending) = existing {
        return pending;
    }
    let pending = {
        let (cx, sx) = (cx.clone(), sx.clone());
        async move {
            let replacement = expr(&cx, &sx, id).await?;
            if replacement != id {
                sx.changed();
                log::trace!(
                    "{id:?} -> {replacement:?} `{}`",
                    print_expr(&cx.arena(), replacement)
                );
            }
            Ok(replacement)
        }
        .boxed_local()
        .shared()
    };
    sx.exprs.borrow_mut().insert(id, pending.clone());
    pending
}

/// Simplify a statement once per round, returning its replacement
pub fn simplify_stmt(cx: &Rc<Sema>, sx: &Rc<SimplifyContext>, id: StmtId) -> Pending<StmtId> {
    let existing = sx.stmts.borrow().get(&id).cloned();
    if let Some(pending) = existing {
        return pending;
    }
    let pending = {
        let (cx, sx) = (cx.clone(), sx.clone());
        async move {
            let replacement = stmt(&cx, &sx, id).await?;
            if replacement != id {
                sx.changed();
            }
            Ok(replacement)
        }
        .boxed_local()
        .shared()
    };
    sx.stmts.borrow_mut().insert(id, pending.clone());
    pending
}

/// Simplify an expression until a round changes nothing
pub async fn fixpoint_expr(cx: &Rc<Sema>, id: ExprId, depth: usize) -> SemaResult<ExprId> {
    let mut current = id;
    for _ in 0..cx.config.max_simplify_rounds {
        let sx = SimplifyContext::new(depth);
        let result = simplify_expr(cx, &sx, current).await;
        sx.clear();
        current = result?;
        if sx.changes() == 0 {
            return Ok(current);
        }
    }
    Err(SemaError::NoFixpoint {
        rounds: cx.config.max_simplify_rounds,
    })
}

/// Simplify a statement until a round changes nothing
pub async fn fixpoint_stmt(cx: &Rc<Sema>, id: StmtId, depth: usize) -> SemaResult<StmtId> {
    let mut current = id;
    for _ in 0..cx.config.max_simplify_rounds {
        let sx = SimplifyContext::new(depth);
        let result = simplify_stmt(cx, &sx, current).await;
        sx.clear();
        current = result?;
        if sx.changes() == 0 {
            return Ok(current);
        }
    }
    Err(SemaError::NoFixpoint {
        rounds: cx.config.max_simplify_rounds,
    })
}

async fn simplify_all(
    cx: &Rc<Sema>,
    sx: &Rc<SimplifyContext>,
    items: &[ExprId],
) -> SemaResult<Vec<ExprId>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(simplify_expr(cx, sx, *item).await?);
    }
    Ok(out)
}

async fn expr(cx: &Rc<Sema>, sx: &Rc<SimplifyContext>, id: ExprId) -> SemaResult<ExprId> {
    let kind = cx.arena().exprs[id].kind.clone();
    if let Some(resolved) = kind.resolved() {
        return simplify_expr(cx, sx, resolved).await;
    }
    match kind {
        ExprKind::Postfix { .. }
        | ExprKind::Member { .. }
        | ExprKind::Binary { .. }
        | ExprKind::Unary { .. }
        | ExprKind::Identifier { target: None, .. } => Err(SemaError::internal(format!(
            "simplifying an unanalyzed {}",
            kind.describe()
        ))),

        ExprKind::Identifier {
            target: Some(target),
            ..
        } => {
            let value = {
                let arena = cx.arena();
                arena
                    .referent_value(target)
                    .filter(|v| arena.is_constant(*v))
            };
            Ok(match value {
                Some(value) => copy_constant(&mut cx.arena_mut(), value),
                None => id,
            })
        }

        ExprKind::Call { function, args } => call(cx, sx, id, function, args).await,

        ExprKind::FieldAccess { base, index } => {
            let base = simplify_expr(cx, sx, base).await?;
            if let ExprKind::FieldAccess { base: slot, .. } = &mut cx.arena_mut().exprs[id].kind {
                *slot = base;
            }
            let field = match &cx.arena().exprs[base].kind {
                ExprKind::StructValue { fields, .. } => fields.get(index).copied(),
                _ => None,
            };
            Ok(match field {
                Some(field) => copy_constant(&mut cx.arena_mut(), field),
                None => id,
            })
        }

        ExprKind::List(items) => {
            let items = simplify_all(cx, sx, &items).await?;
            let foldable = {
                let arena = cx.arena();
                items
                    .split_last()
                    .map(|(last, rest)| (*last, rest.iter().all(|i| arena.is_constant(*i))))
            };
            if let ExprKind::List(slot) = &mut cx.arena_mut().exprs[id].kind {
                *slot = items;
            }
            Ok(match foldable {
                Some((last, true)) => last,
                _ => id,
            })
        }

        ExprKind::StructValue { fields, .. } => {
            let fields = simplify_all(cx, sx, &fields).await?;
            if let ExprKind::StructValue { fields: slot, .. } = &mut cx.arena_mut().exprs[id].kind {
                *slot = fields;
            }
            Ok(id)
        }

        ExprKind::PackValue(items) => {
            let items = simplify_all(cx, sx, &items).await?;
            if let ExprKind::PackValue(slot) = &mut cx.arena_mut().exprs[id].kind {
                *slot = items;
            }
            Ok(id)
        }

        ExprKind::Instance { ty, .. } => {
            let definitions = match cx.arena().type_kind(ty) {
                TypeKind::Instance(inst) => inst.definitions.clone(),
                _ => Vec::new(),
            };
            for definition in definitions {
                simplify_function(cx, sx, definition).await?;
            }
            Ok(id)
        }

        ExprKind::Module(data) => {
            let mut statements = Vec::with_capacity(data.statements.len());
            for s in &data.statements {
                statements.push(simplify_stmt(cx, sx, *s).await?);
            }
            if let ExprKind::Module(slot) = &mut cx.arena_mut().exprs[id].kind {
                slot.statements = statements;
            }
            Ok(id)
        }

        _ => Ok(id),
    }
}

async fn call(
    cx: &Rc<Sema>,
    sx: &Rc<SimplifyContext>,
    id: ExprId,
    function: FunctionId,
    args: Vec<Option<ExprId>>,
) -> SemaResult<ExprId> {
    let mut simplified = Vec::with_capacity(args.len());
    for arg in &args {
        simplified.push(match arg {
            Some(arg) => Some(simplify_expr(cx, sx, *arg).await?),
            None => None,
        });
    }
    let (all_constant, span, scope) = {
        let mut arena = cx.arena_mut();
        let all_constant = simplified.iter().flatten().all(|a| arena.is_constant(*a));
        let expr = &mut arena.exprs[id];
        if let ExprKind::Call { args: slot, .. } = &mut expr.kind {
            slot.clone_from(&simplified);
        }
        (all_constant, expr.span, expr.scope)
    };
    if !all_constant {
        return Ok(id);
    }

    let intrinsic = cx.arena().functions[function].intrinsic;
    if let Some(intrinsic) = intrinsic {
        let at = Folding {
            function,
            span,
            scope,
        };
        return intrinsics::evaluate(cx, intrinsic, &simplified, &at);
    }
    if !cx.config.fold_calls {
        return Ok(id);
    }
    let Some(args) = simplified.into_iter().collect::<Option<Vec<_>>>() else {
        return Ok(id);
    };
    Ok(specialize(cx, sx.depth, function, &args, span)
        .await?
        .unwrap_or(id))
}

/// Body simplification of a function, in place
async fn simplify_function(
    cx: &Rc<Sema>,
    sx: &Rc<SimplifyContext>,
    function: FunctionId,
) -> SemaResult<()> {
    let body = cx.arena().functions[function].body;
    if let Some(body) = body {
        let body = simplify_stmt(cx, sx, body).await?;
        cx.arena_mut().functions[function].body = Some(body);
    }
    Ok(())
}

/// Body of a taken branch, unwrapped when it is a block holding a single
/// statement that declares nothing
fn promote(cx: &Sema, branch: StmtId) -> StmtId {
    let arena = cx.arena();
    match &arena.stmts[branch].kind {
        StmtKind::Block { statements } => match statements.as_slice() {
            [only] if !matches!(arena.stmts[*only].kind, StmtKind::Declaration(_)) => *only,
            _ => branch,
        },
        _ => branch,
    }
}

async fn stmt(cx: &Rc<Sema>, sx: &Rc<SimplifyContext>, id: StmtId) -> SemaResult<StmtId> {
    let kind = cx.arena().stmts[id].kind.clone();
    match kind {
        StmtKind::Declaration(decl) => {
            let type_expr = match decl.type_expr {
                Some(t) => Some(simplify_expr(cx, sx, t).await?),
                None => None,
            };
            let init = match decl.init {
                Some(i) => Some(simplify_expr(cx, sx, i).await?),
                None => None,
            };
            if let StmtKind::Declaration(slot) = &mut cx.arena_mut().stmts[id].kind {
                slot.type_expr = type_expr;
                slot.init = init;
            }
            Ok(id)
        }

        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = simplify_expr(cx, sx, condition).await?;
            let known = match cx.arena().exprs[condition].kind {
                ExprKind::Boolean(b) => Some(b),
                _ => None,
            };
            match (known, else_branch) {
                (Some(true), _) => {
                    let taken = simplify_stmt(cx, sx, then_branch).await?;
                    Ok(promote(cx, taken))
                }
                (Some(false), Some(otherwise)) => {
                    let taken = simplify_stmt(cx, sx, otherwise).await?;
                    Ok(promote(cx, taken))
                }
                (Some(false), None) => {
                    let (span, scope) = {
                        let arena = cx.arena();
                        (arena.stmts[id].span, arena.stmts[id].scope)
                    };
                    Ok(cx.arena_mut().alloc_stmt(StmtKind::Null, span, scope))
                }
                (None, _) => {
                    let then_branch = simplify_stmt(cx, sx, then_branch).await?;
                    let else_branch = match else_branch {
                        Some(e) => Some(simplify_stmt(cx, sx, e).await?),
                        None => None,
                    };
                    cx.arena_mut().stmts[id].kind = StmtKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    };
                    Ok(id)
                }
            }
        }

        StmtKind::Return { value } => {
            let value = simplify_expr(cx, sx, value).await?;
            cx.arena_mut().stmts[id].kind = StmtKind::Return { value };
            Ok(id)
        }

        StmtKind::Block { statements } => {
            let mut kept = Vec::with_capacity(statements.len());
            for s in &statements {
                let simplified = simplify_stmt(cx, sx, *s).await?;
                kept.push(simplified);
                if always_returns(cx, simplified) {
                    break;
                }
            }
            if kept.len() < statements.len() {
                log::trace!(
                    "dropped {} unreachable statements",
                    statements.len() - kept.len()
                );
                sx.changed();
            }
            cx.arena_mut().stmts[id].kind = StmtKind::Block { statements: kept };
            Ok(id)
        }

        StmtKind::Function(function) => {
            simplify_function(cx, sx, function).await?;
            Ok(id)
        }

        StmtKind::Expression(e) => {
            let e = simplify_expr(cx, sx, e).await?;
            cx.arena_mut().stmts[id].kind = StmtKind::Expression(e);
            Ok(id)
        }

        StmtKind::Null => Ok(id),
    }
}

/// Whether control never falls through `stmt`
pub fn always_returns(cx: &Sema, stmt: StmtId) -> bool {
    returns_on_all_paths(&cx.arena(), stmt)
}

fn returns_on_all_paths(arena: &Arena, stmt: StmtId) -> bool {
    match &arena.stmts[stmt].kind {
        StmtKind::Return { .. } => true,
        StmtKind::Block { statements } => statements
            .iter()
            .any(|s| returns_on_all_paths(arena, *s)),
        StmtKind::If {
            then_branch,
            else_branch: Some(otherwise),
            ..
        } => returns_on_all_paths(arena, *then_branch) && returns_on_all_paths(arena, *otherwise),
        _ => false,
    }
}

/// First `return` reached when executing a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstReturn {
    Found(ExprId),
    /// Depends on a condition that is not known
    Unknown,
    None,
}

pub fn first_return(cx: &Sema, stmt: StmtId) -> FirstReturn {
    let arena = cx.arena();
    fn walk(arena: &Arena, stmt: StmtId) -> FirstReturn {
        match &arena.stmts[stmt].kind {
            StmtKind::Return { value } => FirstReturn::Found(*value),
            StmtKind::Block { statements } => {
                for s in statements {
                    match walk(arena, *s) {
                        FirstReturn::None => continue,
                        found => return found,
                    }
                }
                FirstReturn::None
            }
            StmtKind::If { .. } => FirstReturn::Unknown,
            StmtKind::Declaration(_)
            | StmtKind::Function(_)
            | StmtKind::Expression(_)
            | StmtKind::Null => FirstReturn::None,
        }
    }
    walk(&arena, stmt)
}

/// Evaluate a call to a user function with constant arguments
///
/// Returns `None` when the result is not a constant: the body has a branch
/// on a value that stays unknown, calls past the depth limit, or the
/// function has no body here.
pub async fn specialize(
    cx: &Rc<Sema>,
    depth: usize,
    function: FunctionId,
    args: &[ExprId],
    span: Span,
) -> SemaResult<Option<ExprId>> {
    let name = cx.arena().functions[function].name;
    if depth >= cx.config.max_specialization_depth {
        log::debug!("not folding `{name}`: specialization depth {depth} reached");
        return Ok(None);
    }
    analyze_function(cx, function).await?;
    let (body, params) = {
        let arena = cx.arena();
        let f = &arena.functions[function];
        (f.body, f.params.clone())
    };
    let Some(body) = body else {
        return Ok(None);
    };
    if params.len() != args.len() {
        return Err(SemaError::internal(format!(
            "call to `{name}` with {} arguments for {} parameters",
            args.len(),
            params.len()
        )));
    }

    let key = {
        let arena = cx.arena();
        args.iter()
            .map(|a| ConstKey::of(&arena, *a))
            .collect::<Option<Vec<_>>>()
            .map(|key| (function, key))
    };
    if let Some(key) = &key {
        if let Some(failed) = cx.failed_specialization(key) {
            if depth >= failed {
                log::trace!("not folding `{name}`: failed before at depth {failed}");
                return Ok(None);
            }
        }
        if cx.config.cache_specializations {
            if let Some(cached) = cx.cached_specialization(key) {
                log::trace!("reusing folded call to `{name}`");
                return Ok(Some(copy_constant(&mut cx.arena_mut(), cached)));
            }
        }
    }

    let clone = {
        let mut arena = cx.arena_mut();
        let mut replacements = Replacements::new();
        for (param, arg) in params.iter().zip(args) {
            let value = copy_constant(&mut arena, *arg);
            replacements.add_expr(*param, value);
        }
        let clone = replacements.claim_stmt(&mut arena, body);
        let replaced = cx.stats.replacements.get() + replacements.len();
        cx.stats.replacements.set(replaced);
        clone
    };

    let folded = fixpoint_stmt(cx, clone, depth + 1).await?;
    let value = match first_return(cx, folded) {
        FirstReturn::Found(value) if cx.arena().is_constant(value) => value,
        outcome => {
            log::debug!("call to `{name}` at {span:?} does not fold ({outcome:?})");
            if let Some(key) = key {
                cx.record_failed_specialization(key, depth);
            }
            return Ok(None);
        }
    };
    Stats::bump(&cx.stats.specializations);
    log::debug!(
        "folded call to `{name}` to `{}`",
        print_expr(&cx.arena(), value)
    );
    if let Some(key) = key.filter(|_| cx.config.cache_specializations) {
        cx.cache_specialization(key, value);
    }
    Ok(Some(copy_constant(&mut cx.arena_mut(), value)))
}
