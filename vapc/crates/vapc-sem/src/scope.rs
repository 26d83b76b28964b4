//! Scopes and symbols.
//!
//! A scope maps names to symbols and links to its parent. Two flags shape
//! declaration rules:
//!
//! - `is_local`: declarations inside a function body. Each declaration opens
//!   a fresh child scope ([`Arena::clone_for_decl`]), so an initializer only
//!   sees the declarations before it. Module and class scopes are not local:
//!   all their declarations share one scope and may refer to each other in
//!   any order.
//! - `is_shadowing_boundary`: re-declaring a name visible from an ancestor is
//!   allowed only across a boundary. [`Arena::init_symbol`] checks ancestors
//!   up to and including the nearest boundary.
//!
//! Non-local scopes must be [closed](Arena::close_scope) before names are
//! resolved in them, so that a lookup never misses a declaration that simply
//! had not been preanalyzed yet.

use vapc_util::{FxIndexMap, Span, Symbol};

use crate::arena::Arena;
use crate::error::{SemaError, SemaResult};
use crate::ids::{ExprId, ScopeId, SymbolId};

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: FxIndexMap<Symbol, SymbolId>,
    pub is_local: bool,
    pub is_shadowing_boundary: bool,
    pub closed: bool,
    /// Module this scope belongs to; `None` for the builtin scope
    pub module: Option<ExprId>,
}

/// A named binding of an identifier to an expression
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub name: Symbol,
    pub scope: ScopeId,
    /// Attached when the declaring node is known; see
    /// [`symbol_expression`](crate::context::symbol_expression)
    pub expr: Option<ExprId>,
    pub exported: bool,
    /// Present in a module interface but not nameable from outside
    pub hidden: bool,
    pub span: Span,
}

impl Arena {
    /// Root scope with no parent, a shadowing boundary
    pub fn new_root_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope {
            parent: None,
            symbols: FxIndexMap::default(),
            is_local: false,
            is_shadowing_boundary: true,
            closed: false,
            module: None,
        })
    }

    fn child_scope(&mut self, parent: ScopeId, is_local: bool, boundary: bool) -> ScopeId {
        let module = self.scopes[parent].module;
        self.scopes.push(Scope {
            parent: Some(parent),
            symbols: FxIndexMap::default(),
            is_local,
            is_shadowing_boundary: boundary,
            closed: false,
            module,
        })
    }

    /// Nested scope for a type, typeclass, instance or module body
    pub fn clone_for_class(&mut self, scope: ScopeId) -> ScopeId {
        self.child_scope(scope, false, true)
    }

    /// Scope for the declarations following a declaration
    ///
    /// In a local scope this opens a child that is not a boundary, so later
    /// siblings see the declaration while its own initializer does not, and
    /// redeclaring the same name in the same block still fails. A non-local
    /// scope is returned unchanged.
    pub fn clone_for_decl(&mut self, scope: ScopeId) -> ScopeId {
        if !self.scopes[scope].is_local {
            return scope;
        }
        self.child_scope(scope, true, false)
    }

    /// Block-local scope that may hide names of enclosing scopes
    pub fn clone_local(&mut self, scope: ScopeId) -> ScopeId {
        self.child_scope(scope, true, true)
    }

    pub fn close_scope(&mut self, scope: ScopeId) {
        self.scopes[scope].closed = true;
    }

    /// Bind `name` in `scope`
    ///
    /// Returns `None` when the name is already bound in `scope`, or in an
    /// ancestor reachable without crossing a shadowing boundary.
    pub fn init_symbol(&mut self, scope: ScopeId, name: Symbol, span: Span) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if s.symbols.contains_key(&name) {
                return None;
            }
            if s.is_shadowing_boundary {
                break;
            }
            current = s.parent;
        }
        Some(self.insert_symbol(scope, name, span))
    }

    fn insert_symbol(&mut self, scope: ScopeId, name: Symbol, span: Span) -> SymbolId {
        let symbol = self.symbols.push(SymbolData {
            name,
            scope,
            expr: None,
            exported: false,
            hidden: false,
            span,
        });
        self.scopes[scope].symbols.insert(name, symbol);
        symbol
    }

    /// Symbol bound to `name` in `scope` itself, ignoring ancestors
    pub fn try_get(&self, scope: ScopeId, name: Symbol) -> Option<SymbolId> {
        self.scopes[scope].symbols.get(&name).copied()
    }

    /// Existing binding in `scope`, or a fresh one
    ///
    /// Used for overload sets, where every function declaration of the same
    /// name contributes to one symbol.
    pub fn get_or_init(&mut self, scope: ScopeId, name: Symbol, span: Span) -> SymbolId {
        match self.try_get(scope, name) {
            Some(symbol) => symbol,
            None => self.insert_symbol(scope, name, span),
        }
    }

    /// Look `name` up through the parent chain, skipping hidden symbols
    pub fn try_resolve(&self, scope: ScopeId, name: Symbol) -> SemaResult<Option<SymbolId>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id];
            if !s.is_local && !s.closed {
                return Err(SemaError::internal(format!(
                    "lookup of `{name}` in a scope that is still open"
                )));
            }
            if let Some(symbol) = s.symbols.get(&name) {
                if !self.symbols[*symbol].hidden {
                    return Ok(Some(*symbol));
                }
            }
            current = s.parent;
        }
        Ok(None)
    }

    /// Like [`try_resolve`](Self::try_resolve), failing with a lookup error
    pub fn resolve(&self, scope: ScopeId, name: Symbol, span: Span) -> SemaResult<SymbolId> {
        self.try_resolve(scope, name)?
            .ok_or_else(|| SemaError::FailedLookup {
                name: name.to_string(),
                span,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    fn module_scope(arena: &mut Arena) -> ScopeId {
        let root = arena.new_root_scope();
        arena.clone_for_class(root)
    }

    #[test]
    fn test_init_rejects_duplicate_in_same_scope() {
        let mut arena = Arena::new();
        let scope = module_scope(&mut arena);
        assert!(arena.init_symbol(scope, sym("x"), Span::DUMMY).is_some());
        assert!(arena.init_symbol(scope, sym("x"), Span::DUMMY).is_none());
    }

    #[test]
    fn test_clone_for_decl_is_noop_on_non_local_scope() {
        let mut arena = Arena::new();
        let scope = module_scope(&mut arena);
        let before = arena.scopes.len();
        assert_eq!(arena.clone_for_decl(scope), scope);
        assert_eq!(arena.scopes.len(), before);
    }

    #[test]
    fn test_clone_for_decl_in_local_scope_hides_later_names() {
        let mut arena = Arena::new();
        let module = module_scope(&mut arena);
        let body = arena.clone_local(module);
        let first = arena.clone_for_decl(body);
        assert_ne!(first, body);
        arena.init_symbol(first, sym("a"), Span::DUMMY).unwrap();

        // `a` is visible after its declaration but not from the scope its
        // initializer was resolved in.
        let root = arena.scopes[module].parent.unwrap();
        arena.close_scope(module);
        arena.close_scope(root);
        assert!(arena.try_resolve(first, sym("a")).unwrap().is_some());
        assert!(arena.try_resolve(body, sym("a")).unwrap().is_none());

        // Same block: redeclaration fails because the decl scope is no boundary.
        let second = arena.clone_for_decl(first);
        assert!(arena.init_symbol(second, sym("a"), Span::DUMMY).is_none());
    }

    #[test]
    fn test_clone_local_allows_shadowing() {
        let mut arena = Arena::new();
        let module = module_scope(&mut arena);
        let body = arena.clone_local(module);
        let decl = arena.clone_for_decl(body);
        arena.init_symbol(decl, sym("v"), Span::DUMMY).unwrap();

        let inner = arena.clone_local(decl);
        assert!(arena.scopes[inner].is_shadowing_boundary);
        assert!(arena.init_symbol(inner, sym("v"), Span::DUMMY).is_some());
    }

    #[test]
    fn test_clone_for_class_is_boundary_regardless_of_locality() {
        let mut arena = Arena::new();
        let module = module_scope(&mut arena);
        let local = arena.clone_local(module);
        for parent in [module, local] {
            let class = arena.clone_for_class(parent);
            assert_ne!(class, parent);
            assert!(arena.scopes[class].is_shadowing_boundary);
            assert!(!arena.scopes[class].is_local);
        }
    }

    #[test]
    fn test_resolve_walks_parents_and_reports_failure() {
        let mut arena = Arena::new();
        let root = arena.new_root_scope();
        let outer = arena.clone_for_class(root);
        let x = arena.init_symbol(outer, sym("x"), Span::DUMMY).unwrap();
        let inner = arena.clone_local(outer);
        arena.close_scope(root);
        arena.close_scope(outer);

        assert_eq!(arena.resolve(inner, sym("x"), Span::DUMMY).unwrap(), x);
        let err = arena.resolve(inner, sym("y"), Span::point(2, 3)).unwrap_err();
        assert_eq!(
            err,
            SemaError::FailedLookup {
                name: "y".into(),
                span: Span::point(2, 3)
            }
        );
    }

    #[test]
    fn test_resolve_in_open_non_local_scope_is_internal_error() {
        let mut arena = Arena::new();
        let scope = module_scope(&mut arena);
        assert!(matches!(
            arena.try_resolve(scope, sym("x")),
            Err(SemaError::Internal(_))
        ));
    }

    #[test]
    fn test_hidden_symbols_are_not_resolvable() {
        let mut arena = Arena::new();
        let scope = module_scope(&mut arena);
        let s = arena.init_symbol(scope, sym("secret"), Span::DUMMY).unwrap();
        arena.symbols[s].hidden = true;
        arena.close_scope(scope);
        let root = arena.scopes[scope].parent.unwrap();
        arena.close_scope(root);
        assert!(arena.try_resolve(scope, sym("secret")).unwrap().is_none());
        assert_eq!(arena.try_get(scope, sym("secret")), Some(s));
    }

    #[test]
    fn test_get_or_init_reuses_binding() {
        let mut arena = Arena::new();
        let scope = module_scope(&mut arena);
        let a = arena.get_or_init(scope, sym("f"), Span::DUMMY);
        let b = arena.get_or_init(scope, sym("f"), Span::DUMMY);
        assert_eq!(a, b);
        assert_eq!(arena.scopes[scope].symbols.len(), 1);
    }
}
