//! Clone bookkeeping for one cloning pass.
//!
//! Cloning a function body for specialization must copy every node exactly
//! once: a node reached twice (through a shared sub-structure) has to come
//! out as one clone referenced from both places. [`Replacements`] maps each
//! original to its replacement for the lifetime of the pass.
//!
//! Owned children are obtained with [`claim_expr`](Replacements::claim_expr)
//! / [`claim_stmt`](Replacements::claim_stmt), which clone on first use.
//! Non-owning references (identifier targets, declaration back-references)
//! are remapped with [`get_expr`](Replacements::get_expr) and keep pointing
//! at the original when it was not cloned. Substitutions supplied from
//! outside, such as parameters bound to argument values, are registered with
//! [`add_expr`](Replacements::add_expr).

use vapc_util::{FxHashMap, FxHashSet};

use crate::arena::Arena;
use crate::expr::{Expr, ExprKind};
use crate::ids::{ExprId, StmtId};
use crate::stmt::{Declaration, Stmt, StmtKind};

#[derive(Debug, Default)]
pub struct Replacements {
    exprs: FxHashMap<ExprId, ExprId>,
    stmts: FxHashMap<StmtId, StmtId>,
    created: FxHashSet<ExprId>,
    claimed: FxHashSet<ExprId>,
    added: FxHashSet<ExprId>,
    created_stmts: FxHashSet<StmtId>,
    claimed_stmts: FxHashSet<StmtId>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `replacement` wherever `original` is referenced
    pub fn add_expr(&mut self, original: ExprId, replacement: ExprId) {
        self.exprs.insert(original, replacement);
        self.added.insert(replacement);
    }

    /// Replacement of `original`, if it has one
    pub fn get_expr(&self, original: ExprId) -> Option<ExprId> {
        self.exprs.get(&original).copied()
    }

    pub fn get_stmt(&self, original: StmtId) -> Option<StmtId> {
        self.stmts.get(&original).copied()
    }

    /// Number of originals with a replacement
    pub fn len(&self) -> usize {
        self.exprs.len() + self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take ownership of the replacement of `original`, cloning it first if
    /// this is the first time it is reached
    ///
    /// Claiming the same original again yields the same clone.
    pub fn claim_expr(&mut self, arena: &mut Arena, original: ExprId) -> ExprId {
        let replacement = match self.get_expr(original) {
            Some(existing) => {
                if self.claimed.contains(&existing) {
                    log::trace!("{original:?} claimed again, reusing {existing:?}");
                }
                existing
            }
            None => self.clone_expr(arena, original),
        };
        self.claimed.insert(replacement);
        replacement
    }

    pub fn claim_stmt(&mut self, arena: &mut Arena, original: StmtId) -> StmtId {
        let replacement = match self.get_stmt(original) {
            Some(existing) => existing,
            None => self.clone_stmt(arena, original),
        };
        self.claimed_stmts.insert(replacement);
        replacement
    }

    fn clone_expr(&mut self, arena: &mut Arena, original: ExprId) -> ExprId {
        let expr = arena.exprs[original].clone();

        // An analyzed operator or postfix expression is its resolution.
        if let Some(resolved) = expr.kind.resolved() {
            let replacement = self.claim_expr(arena, resolved);
            self.exprs.insert(original, replacement);
            return replacement;
        }

        let kind = match expr.kind {
            ExprKind::Identifier { name, target } => ExprKind::Identifier {
                name,
                target: target.map(|t| self.get_expr(t).unwrap_or(t)),
            },
            ExprKind::Call { function, args } => ExprKind::Call {
                function,
                args: args
                    .into_iter()
                    .map(|a| a.map(|a| self.claim_expr(arena, a)))
                    .collect(),
            },
            ExprKind::FieldAccess { base, index } => ExprKind::FieldAccess {
                base: self.claim_expr(arena, base),
                index,
            },
            ExprKind::StructValue { ty, fields } => ExprKind::StructValue {
                ty,
                fields: self.claim_all(arena, fields),
            },
            ExprKind::PackValue(items) => ExprKind::PackValue(self.claim_all(arena, items)),
            ExprKind::List(items) => ExprKind::List(self.claim_all(arena, items)),
            ExprKind::Variable { decl } => ExprKind::Variable {
                decl: self.get_stmt(decl).unwrap_or(decl),
            },
            ExprKind::DataMember { decl } => ExprKind::DataMember {
                decl: self.get_stmt(decl).unwrap_or(decl),
            },
            leaf => leaf,
        };
        let clone = arena.exprs.push(Expr { kind, ..expr });
        self.exprs.insert(original, clone);
        self.created.insert(clone);
        clone
    }

    fn claim_all(&mut self, arena: &mut Arena, ids: Vec<ExprId>) -> Vec<ExprId> {
        ids.into_iter().map(|id| self.claim_expr(arena, id)).collect()
    }

    fn clone_stmt(&mut self, arena: &mut Arena, original: StmtId) -> StmtId {
        let stmt = arena.stmts[original].clone();
        // Reserve the clone first so the declared node can point back at it.
        let clone = arena.stmts.push(Stmt::new(StmtKind::Null, stmt.span, stmt.scope));
        self.stmts.insert(original, clone);
        self.created_stmts.insert(clone);

        let kind = match stmt.kind {
            StmtKind::Declaration(decl) => {
                let type_expr = decl.type_expr.map(|t| self.claim_expr(arena, t));
                let init = decl.init.map(|i| self.claim_expr(arena, i));
                let declared = self.claim_expr(arena, decl.declared);
                StmtKind::Declaration(Declaration {
                    type_expr,
                    init,
                    declared,
                    ..decl
                })
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => StmtKind::If {
                condition: self.claim_expr(arena, condition),
                then_branch: self.claim_stmt(arena, then_branch),
                else_branch: else_branch.map(|e| self.claim_stmt(arena, e)),
            },
            StmtKind::Return { value } => StmtKind::Return {
                value: self.claim_expr(arena, value),
            },
            StmtKind::Block { statements } => StmtKind::Block {
                statements: statements
                    .into_iter()
                    .map(|s| self.claim_stmt(arena, s))
                    .collect(),
            },
            StmtKind::Expression(e) => StmtKind::Expression(self.claim_expr(arena, e)),
            kind @ (StmtKind::Function(_) | StmtKind::Null) => kind,
        };
        arena.stmts[clone].kind = kind;
        clone
    }
}

impl Drop for Replacements {
    fn drop(&mut self) {
        debug_assert!(
            self.created
                .iter()
                .all(|c| self.claimed.contains(c) || self.added.contains(c))
                || std::thread::panicking(),
            "cloned expressions were never claimed"
        );
        debug_assert!(
            self.created_stmts
                .iter()
                .all(|c| self.claimed_stmts.contains(c))
                || std::thread::panicking(),
            "cloned statements were never claimed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vapc_util::{Span, Symbol};

    #[test]
    fn test_second_claim_observes_first_clone() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let leaf = arena.alloc_expr(ExprKind::Integer(3), Span::DUMMY, scope);
        let mut replacements = Replacements::new();
        let first = replacements.claim_expr(&mut arena, leaf);
        let second = replacements.claim_expr(&mut arena, leaf);
        assert_ne!(first, leaf);
        assert_eq!(first, second);
        assert_eq!(arena.exprs.len(), 2);
    }

    #[test]
    fn test_shared_child_is_cloned_once() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let shared = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let list = arena.alloc_expr(ExprKind::List(vec![shared, shared]), Span::DUMMY, scope);
        let mut replacements = Replacements::new();
        let clone = replacements.claim_expr(&mut arena, list);
        match &arena.exprs[clone].kind {
            ExprKind::List(items) => {
                assert_eq!(items[0], items[1]);
                assert_ne!(items[0], shared);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_identifier_targets_follow_added_substitutions() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let param = arena.alloc_expr(
            ExprKind::Parameter {
                type_expr: None,
                default: crate::expr::ParamDefault::Required,
            },
            Span::DUMMY,
            scope,
        );
        let value = arena.alloc_expr(ExprKind::Integer(9), Span::DUMMY, scope);
        let ident = arena.alloc_expr(
            ExprKind::Identifier {
                name: Symbol::intern("n"),
                target: Some(param),
            },
            Span::DUMMY,
            scope,
        );
        let mut replacements = Replacements::new();
        replacements.add_expr(param, value);
        let clone = replacements.claim_expr(&mut arena, ident);
        match arena.exprs[clone].kind {
            ExprKind::Identifier { target, .. } => assert_eq!(target, Some(value)),
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_declaration_clone_points_back_at_clone() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let symbol = arena
            .init_symbol(scope, Symbol::intern("x"), Span::DUMMY)
            .unwrap();
        let init = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let decl = arena.alloc_stmt(StmtKind::Null, Span::DUMMY, scope);
        let declared = arena.alloc_expr(ExprKind::Variable { decl }, Span::DUMMY, scope);
        arena.stmts[decl].kind = StmtKind::Declaration(Declaration {
            name: Symbol::intern("x"),
            symbol,
            type_expr: None,
            init: Some(init),
            declared,
            exported: false,
        });

        let mut replacements = Replacements::new();
        let clone = replacements.claim_stmt(&mut arena, decl);
        let StmtKind::Declaration(cloned) = &arena.stmts[clone].kind else {
            panic!("declaration expected");
        };
        assert_ne!(cloned.declared, declared);
        assert!(matches!(
            arena.exprs[cloned.declared].kind,
            ExprKind::Variable { decl } if decl == clone
        ));
        assert_eq!(replacements.get_expr(declared), Some(cloned.declared));
    }
}
