//! vapc-sem - Semantic Analyzer & Compile-Time Evaluator
//!
//! ============================================================================
//! OVERVIEW
//! ============================================================================
//!
//! The semantic core sits between the parser and the backends. It takes the
//! untyped tree produced by the parser ([`vapc_ast`]) and turns it into a
//! typed, simplified program:
//!
//! ```text
//!   ast::Module --preanalyze--> arena graph --analyze--> typed graph
//!        --simplify (until no change)--> folded graph --codegen--> IrModule
//! ```
//!
//! Every phase is driven through a [`Session`].
//!
//! ============================================================================
//! OBJECT MODEL
//! ============================================================================
//!
//! Expressions, statements, types, functions, scopes and symbols live in
//! one [`Arena`](arena::Arena) and refer to each other by typed ids.
//! Simplification never mutates a node into a different kind; it stores a
//! different id in the parent's slot. Nodes nobody references any more are
//! left in place.
//!
//! Scopes come in two flavors:
//! - class-like scopes (module, struct, typeclass, instance) where every
//!   declaration is visible everywhere in the body,
//! - local scopes (function bodies) where a declaration is visible only to
//!   the statements after it.
//!
//! ============================================================================
//! ANALYSIS
//! ============================================================================
//!
//! Analysis of a node is an `async` step memoized by node id (see
//! [`context`]). A node's step awaits the steps it depends on: an identifier
//! waits for its declaration, a call for the signatures of its candidates,
//! a function without a return annotation for its own body. Because the
//! steps are futures on a single-threaded pool rather than a recursive
//! descent, declarations may be used before they appear in the source.
//!
//! A dependency cycle leaves a future pending forever. The executor
//! notices the stall and the session fails with [`SemaError::Stalled`].
//!
//! ```text
//! function f(n: int) { return f(n - 1); }   // stalls: needs `-> int`
//! function f(n: int) -> int { ... }          // fine
//! ```
//!
//! ============================================================================
//! SIMPLIFICATION
//! ============================================================================
//!
//! One simplification round visits every reachable node once and replaces
//! what it can fold:
//! - calls of builtin operators on constants are evaluated natively,
//! - calls of user functions on constants are specialized: the body is
//!   cloned with the arguments substituted and simplified to its own
//!   fixpoint, and a constant first `return` becomes the call's value,
//! - `if` on a constant condition is replaced by the branch taken,
//! - statements after an unconditional `return` are dropped.
//!
//! Rounds repeat until one makes no replacement. A round cap guards
//! against programs that never settle ([`SemaError::NoFixpoint`]).
//!
//! ============================================================================
//! MODULES
//! ============================================================================
//!
//! Exported declarations of a module are described by a
//! [`ModuleInterface`], which serializes to JSON. Importing an interface
//! rebuilds the module's declarations without bodies; types it mentions
//! are resolved lazily by path.

pub mod analysis;
pub mod arena;
pub mod builtins;
pub mod config;
pub mod constant;
pub mod context;
pub mod error;
pub mod expr;
pub mod function;
pub mod ids;
pub mod interface;
pub mod intrinsics;
pub mod ir;
pub mod overload;
pub mod preanalyze;
pub mod print;
pub mod replacements;
pub mod scope;
pub mod session;
pub mod simplify;
pub mod stmt;
pub mod structs;
pub mod typeclass;
pub mod types;
pub mod unresolved;

#[cfg(test)]
mod edge_cases;

pub use config::{ConfigError, SemaConfig, CONFIG_FILE_NAME};
pub use context::{Sema, StatsSnapshot};
pub use error::{SemaError, SemaResult};
pub use expr::ExprKind;
pub use ids::{ExprId, FunctionId, ScopeId, StmtId, SymbolId, TypeId};
pub use interface::{InterfaceEntity, InterfaceParam, ModuleInterface, TypeReference};
pub use ir::{IrConst, IrEntity, IrFunction, IrInstruction, IrModule, IrType, IrVariable};
pub use print::{print_expr, print_stmt};
pub use session::{Phase, Session};
pub use stmt::StmtKind;
pub use types::TypeKind;
