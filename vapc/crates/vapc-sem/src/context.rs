//! The analysis context.
//!
//! [`Sema`] owns the arena, the builtin types and every memo table. It lives
//! behind an `Rc` so that the futures it spawns can hold on to it; the arena
//! sits in a `RefCell` and is only ever borrowed between suspension points.
//!
//! # Futures
//!
//! Analysis steps are `async` and run on a single-threaded
//! [`LocalPool`]. Each memoized step is keyed by a [`Task`]: the first
//! request builds the future and stores a [`Shared`] handle to it, every later
//! request (including ones issued while the first is still in flight) gets a
//! clone of that handle. A step therefore runs at most once, and its result
//! (or error) is observed by all callers.
//!
//! A future that ends up waiting on itself, for instance the return type of
//! an unannotated recursive function, never completes. [`run`] notices the
//! pool stalling and reports [`SemaError::Stalled`].

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::task::LocalSpawnExt;
use vapc_util::{FxHashMap, Span};

use crate::arena::Arena;
use crate::builtins::Builtins;
use crate::config::SemaConfig;
use crate::constant::ConstKey;
use crate::error::{SemaError, SemaResult};
use crate::ids::{ExprId, FunctionId, StmtId, SymbolId, TypeId};
use crate::types::{Type, TypeKind};

/// A memoized, possibly still running, analysis step
pub type Pending<T> = Shared<LocalBoxFuture<'static, SemaResult<T>>>;

/// Key of a memoized analysis step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Expr(ExprId),
    Stmt(StmtId),
    Signature(FunctionId),
    Body(FunctionId),
    Constructors(TypeId),
    Resolve(TypeId),
    InstanceHeader(ExprId),
}

/// Structural identity of interned types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Sized { signed: bool, width: u32 },
    Pack(TypeId),
    Function(Vec<TypeId>, TypeId),
    Unresolved(Vec<vapc_util::Symbol>, Vec<vapc_util::Symbol>, vapc_util::Symbol),
}

impl TypeKey {
    fn of(kind: &TypeKind) -> Option<TypeKey> {
        match kind {
            TypeKind::SizedInteger { signed, width } => Some(TypeKey::Sized {
                signed: *signed,
                width: *width,
            }),
            TypeKind::Pack { pattern } => Some(TypeKey::Pack(*pattern)),
            TypeKind::Function { params, ret } => Some(TypeKey::Function(params.clone(), *ret)),
            TypeKind::Unresolved(u) => Some(TypeKey::Unresolved(
                u.module.clone(),
                u.scopes.clone(),
                u.name,
            )),
            _ => None,
        }
    }
}

/// Counters exposed for tests and logs
#[derive(Debug, Default)]
pub struct Stats {
    pub exprs_analyzed: Cell<usize>,
    pub stmts_analyzed: Cell<usize>,
    pub functions_analyzed: Cell<usize>,
    pub memo_hits: Cell<usize>,
    pub simplify_rounds: Cell<usize>,
    pub replacements: Cell<usize>,
    pub specializations: Cell<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub exprs_analyzed: usize,
    pub stmts_analyzed: usize,
    pub functions_analyzed: usize,
    pub simplify_rounds: usize,
    pub replacements: usize,
    pub specializations: usize,
}

impl Stats {
    pub fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            exprs_analyzed: self.exprs_analyzed.get(),
            stmts_analyzed: self.stmts_analyzed.get(),
            functions_analyzed: self.functions_analyzed.get(),
            simplify_rounds: self.simplify_rounds.get(),
            replacements: self.replacements.get(),
            specializations: self.specializations.get(),
        }
    }
}

pub struct Sema {
    pub config: SemaConfig,
    pub builtins: Builtins,
    pub stats: Stats,
    arena: RefCell<Arena>,
    tasks: RefCell<FxHashMap<Task, Pending<()>>>,
    symbol_waiters: RefCell<FxHashMap<SymbolId, Shared<oneshot::Receiver<ExprId>>>>,
    symbol_senders: RefCell<FxHashMap<SymbolId, oneshot::Sender<ExprId>>>,
    interned: RefCell<FxHashMap<TypeKey, TypeId>>,
    specializations: RefCell<FxHashMap<(FunctionId, Vec<ConstKey>), ExprId>>,
    /// Calls that did not fold, with the shallowest depth they were tried at
    failed_specializations: RefCell<FxHashMap<(FunctionId, Vec<ConstKey>), usize>>,
    /// Every module known to the session, imported ones first
    pub modules: RefCell<Vec<ExprId>>,
    /// Instance literals, in preanalysis order
    pub instance_literals: RefCell<Vec<ExprId>>,
}

impl Sema {
    pub fn new(config: SemaConfig) -> Rc<Self> {
        let mut arena = Arena::new();
        let builtins = Builtins::new(&mut arena);
        let cx = Rc::new(Sema {
            config,
            builtins,
            stats: Stats::default(),
            arena: RefCell::new(arena),
            tasks: RefCell::default(),
            symbol_waiters: RefCell::default(),
            symbol_senders: RefCell::default(),
            interned: RefCell::default(),
            specializations: RefCell::default(),
            failed_specializations: RefCell::default(),
            modules: RefCell::default(),
            instance_literals: RefCell::default(),
        });
        cx.builtins.install_operators(&cx);
        cx
    }

    pub fn arena(&self) -> Ref<'_, Arena> {
        self.arena.borrow()
    }

    pub fn arena_mut(&self) -> RefMut<'_, Arena> {
        self.arena.borrow_mut()
    }

    /// Type of an analyzed expression
    pub fn expr_type(&self, id: ExprId) -> SemaResult<TypeId> {
        let arena = self.arena();
        let expr = &arena.exprs[id];
        expr.ty.map(|ty| arena.canonical(ty)).ok_or_else(|| {
            SemaError::internal(format!(
                "type of {} requested before analysis",
                expr.kind.describe()
            ))
        })
    }

    pub fn expr_span(&self, id: ExprId) -> Span {
        self.arena().exprs[id].span
    }

    pub fn set_type(&self, id: ExprId, ty: TypeId) {
        self.arena_mut().exprs[id].ty = Some(ty);
    }

    pub fn mismatch(&self, expected: TypeId, found: TypeId, span: Span) -> SemaError {
        let arena = self.arena();
        SemaError::TypeMismatch {
            expected: arena.type_name(expected),
            found: arena.type_name(found),
            span,
        }
    }

    /// Check that `id` has type `expected`
    pub fn expect_type(&self, id: ExprId, expected: TypeId) -> SemaResult<()> {
        let found = self.expr_type(id)?;
        if self.arena().same_type(expected, found) {
            Ok(())
        } else {
            Err(self.mismatch(expected, found, self.expr_span(id)))
        }
    }

    /// Structurally identical sized, pack, function and unresolved types
    /// share one id; every other kind gets a fresh type
    pub fn intern_type(&self, kind: TypeKind) -> TypeId {
        let Some(key) = TypeKey::of(&kind) else {
            let scope = self.builtins.scope;
            return self.arena_mut().alloc_type(Type::new(kind, scope));
        };
        if let Some(ty) = self.interned.borrow().get(&key) {
            return *ty;
        }
        let sized = matches!(kind, TypeKind::SizedInteger { .. });
        let ty = {
            let mut arena = self.arena_mut();
            let scope = arena.clone_for_class(self.builtins.scope);
            arena.close_scope(scope);
            arena.alloc_type(Type::new(kind, scope))
        };
        self.interned.borrow_mut().insert(key, ty);
        if sized {
            self.builtins.install_sized_operators(self, ty);
        }
        log::debug!("interned type `{}`", self.arena().type_name(ty));
        ty
    }

    /// Bind a symbol to its expression, waking anyone waiting for it
    pub fn attach_symbol(&self, symbol: SymbolId, expr: ExprId) {
        self.arena_mut().symbols[symbol].expr = Some(expr);
        self.symbol_waiters.borrow_mut().remove(&symbol);
        if let Some(sender) = self.symbol_senders.borrow_mut().remove(&symbol) {
            // The receiver may already be gone with the waiters map entry.
            let _ = sender.send(expr);
        }
    }

    fn symbol_waiter(&self, symbol: SymbolId) -> Shared<oneshot::Receiver<ExprId>> {
        if let Some(waiter) = self.symbol_waiters.borrow().get(&symbol) {
            return waiter.clone();
        }
        let (sender, receiver) = oneshot::channel();
        let waiter = receiver.shared();
        self.symbol_senders.borrow_mut().insert(symbol, sender);
        self.symbol_waiters
            .borrow_mut()
            .insert(symbol, waiter.clone());
        waiter
    }

    pub fn cached_specialization(&self, key: &(FunctionId, Vec<ConstKey>)) -> Option<ExprId> {
        self.specializations.borrow().get(key).copied()
    }

    pub fn cache_specialization(&self, key: (FunctionId, Vec<ConstKey>), value: ExprId) {
        self.specializations.borrow_mut().insert(key, value);
    }

    /// Depth at which a call with these arguments already failed to fold.
    /// Deeper attempts have less room and fail as well.
    pub fn failed_specialization(&self, key: &(FunctionId, Vec<ConstKey>)) -> Option<usize> {
        self.failed_specializations.borrow().get(key).copied()
    }

    pub fn record_failed_specialization(&self, key: (FunctionId, Vec<ConstKey>), depth: usize) {
        let mut failed = self.failed_specializations.borrow_mut();
        let entry = failed.entry(key).or_insert(depth);
        *entry = (*entry).min(depth);
    }

    /// Drop every stored future, breaking the `Rc` cycles they form with
    /// the context
    pub fn clear_tasks(&self) {
        self.tasks.borrow_mut().clear();
        self.symbol_waiters.borrow_mut().clear();
        self.symbol_senders.borrow_mut().clear();
    }

    pub fn task_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}

/// Run `make` at most once for `task`
pub fn memoize<F, Fut>(cx: &Rc<Sema>, task: Task, make: F) -> Pending<()>
where
    F: FnOnce(Rc<Sema>) -> Fut,
    Fut: Future<Output = SemaResult<()>> + 'static,
{
    let existing = cx.tasks.borrow().get(&task).cloned();
    if let Some(pending) = existing {
        Stats::bump(&cx.stats.memo_hits);
        log::trace!("memo hit for {task:?}");
        return pending;
    }
    let pending = make(cx.clone()).boxed_local().shared();
    cx.tasks.borrow_mut().insert(task, pending.clone());
    pending
}

/// Expression a symbol denotes, waiting until it is attached
pub async fn symbol_expression(cx: &Rc<Sema>, symbol: SymbolId) -> SemaResult<ExprId> {
    let attached = cx.arena().symbols[symbol].expr;
    if let Some(expr) = attached {
        return Ok(expr);
    }
    let waiter = cx.symbol_waiter(symbol);
    waiter.await.map_err(|_| {
        SemaError::internal(format!(
            "symbol `{}` was dropped before its expression was attached",
            cx.arena().symbols[symbol].name
        ))
    })
}

/// Drive `future` on a fresh local executor until it completes or stalls
///
/// Must not be called from inside another future: nested analysis steps
/// await each other instead.
pub fn run<T, Fut>(future: Fut) -> SemaResult<T>
where
    T: 'static,
    Fut: Future<Output = SemaResult<T>> + 'static,
{
    let slot: Rc<RefCell<Option<SemaResult<T>>>> = Rc::new(RefCell::new(None));
    let out = slot.clone();
    let mut pool = LocalPool::new();
    pool.spawner()
        .spawn_local(async move {
            let result = future.await;
            *out.borrow_mut() = Some(result);
        })
        .map_err(|err| SemaError::internal(format!("failed to spawn analysis: {err}")))?;
    pool.run_until_stalled();
    let result = slot.borrow_mut().take();
    result.unwrap_or(Err(SemaError::Stalled))
}
