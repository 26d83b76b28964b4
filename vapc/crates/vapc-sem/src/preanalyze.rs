//! Preanalysis: lowering a parsed module into the arena.
//!
//! Builds expression and statement nodes, opens the scope tree and binds
//! every declared name, so that analysis can resolve any name regardless
//! of declaration order:
//!
//! - a module, struct, typeclass or instance body is a class scope: names
//!   may be used before their declaration and are closed once the body is
//!   done,
//! - a function body is a chain of local scopes, one per declaration, so a
//!   name is only visible after it is declared,
//! - functions of the same name in one scope form an overload set.
//!
//! Symbols are attached to their expressions when the whole module has been
//! lowered.

use vapc_ast as ast;
use vapc_util::{Span, Symbol};

use crate::arena::Arena;
use crate::context::Sema;
use crate::error::{SemaError, SemaResult};
use crate::expr::{ExprKind, ModuleData, ParamDefault};
use crate::function::Function;
use crate::ids::{ExprId, FunctionId, ScopeId, StmtId, SymbolId, TypeId};
use crate::stmt::{Declaration, StmtKind};
use crate::types::{InstanceType, StructType, Type, TypeKind, TypeclassType};

/// Lower `module` and register it with the session
pub fn preanalyze_module(cx: &Sema, module: &ast::Module) -> SemaResult<ExprId> {
    let dotted = module.dotted_name();
    let known: Vec<(Vec<Symbol>, ExprId)> = {
        let arena = cx.arena();
        cx.modules
            .borrow()
            .iter()
            .filter_map(|m| match &arena.exprs[*m].kind {
                ExprKind::Module(data) => Some((data.path.clone(), *m)),
                _ => None,
            })
            .collect()
    };
    if known.iter().any(|(path, _)| *path == module.path) {
        return Err(SemaError::Redeclaration {
            name: dotted,
            span: module.span,
        });
    }

    let mut arena = cx.arena_mut();
    let scope = arena.clone_for_class(cx.builtins.scope);
    let mut module_ty = Type::new(TypeKind::Module, scope);
    module_ty.name = module.path.last().copied();
    let module_ty = arena.alloc_type(module_ty);
    let expr = arena.alloc_typed_expr(
        ExprKind::Module(Box::new(ModuleData {
            path: module.path.clone(),
            scope,
            statements: Vec::new(),
            entry: None,
            imported: false,
        })),
        module_ty,
        module.span,
        scope,
    );
    arena.scopes[scope].module = Some(expr);
    arena.types[module_ty].module = Some(expr);

    let mut lowering = Preanalyzer {
        arena: &mut *arena,
        type_: cx.builtins.type_,
        module: expr,
        bindings: Vec::new(),
        instance_literals: Vec::new(),
    };
    for import in &module.imports {
        let found = known
            .iter()
            .find(|(path, _)| *path == import.path)
            .map(|(_, m)| *m);
        let (Some(imported), Some(name)) = (found, import.path.last().copied()) else {
            let name = import
                .path
                .iter()
                .map(Symbol::as_str)
                .collect::<Vec<_>>()
                .join(".");
            return Err(SemaError::FailedLookup {
                name,
                span: import.span,
            });
        };
        lowering.bind(scope, name, imported, import.span)?;
    }

    let mut statements = Vec::with_capacity(module.statements.len());
    for s in &module.statements {
        let (id, _) = lowering.stmt(s, scope)?;
        statements.push(id);
    }
    let Preanalyzer {
        bindings,
        instance_literals,
        ..
    } = lowering;

    arena.close_scope(scope);
    if let ExprKind::Module(data) = &mut arena.exprs[expr].kind {
        data.statements = statements;
    }
    drop(arena);

    for (symbol, target) in bindings {
        cx.attach_symbol(symbol, target);
    }
    cx.instance_literals.borrow_mut().extend(instance_literals);
    cx.modules.borrow_mut().push(expr);
    log::info!("preanalyzed module `{dotted}`");
    Ok(expr)
}

struct Preanalyzer<'a> {
    arena: &'a mut Arena,
    type_: TypeId,
    module: ExprId,
    /// Symbols and the expressions they denote, attached at the end
    bindings: Vec<(SymbolId, ExprId)>,
    instance_literals: Vec<ExprId>,
}

impl Preanalyzer<'_> {
    fn redeclared(name: Symbol, span: Span) -> SemaError {
        SemaError::Redeclaration {
            name: name.to_string(),
            span,
        }
    }

    /// Declare `name` in `scope` and bind it to `expr`
    fn bind(&mut self, scope: ScopeId, name: Symbol, expr: ExprId, span: Span) -> SemaResult<SymbolId> {
        let symbol = self
            .arena
            .init_symbol(scope, name, span)
            .ok_or_else(|| Self::redeclared(name, span))?;
        self.bindings.push((symbol, expr));
        Ok(symbol)
    }

    /// Lower a statement; returns it and the scope following statements
    /// are declared in
    fn stmt(&mut self, stmt: &ast::Stmt, scope: ScopeId) -> SemaResult<(StmtId, ScopeId)> {
        let span = stmt.span;
        match &stmt.kind {
            ast::StmtKind::Declaration(decl) => self.declaration(decl, scope, false),
            ast::StmtKind::Function(decl) => {
                let function = self.function(decl, scope, None)?;
                let id = self.arena.alloc_stmt(StmtKind::Function(function), span, scope);
                Ok((id, scope))
            }
            ast::StmtKind::If(if_stmt) => {
                let condition = self.expr(&if_stmt.condition, scope)?;
                let then_branch = self.block(&if_stmt.then_block, scope)?;
                let else_branch = match &if_stmt.else_branch {
                    Some(otherwise) => Some(self.stmt(otherwise, scope)?.0),
                    None => None,
                };
                let id = self.arena.alloc_stmt(
                    StmtKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    },
                    span,
                    scope,
                );
                Ok((id, scope))
            }
            ast::StmtKind::Return(value) => {
                let value = self.expr(value, scope)?;
                Ok((self.arena.alloc_stmt(StmtKind::Return { value }, span, scope), scope))
            }
            ast::StmtKind::Block(block) => Ok((self.block(block, scope)?, scope)),
            ast::StmtKind::Expression(items) => {
                let value = match items.as_slice() {
                    [single] => self.expr(single, scope)?,
                    _ => {
                        let items = items
                            .iter()
                            .map(|e| self.expr(e, scope))
                            .collect::<SemaResult<Vec<_>>>()?;
                        self.arena.alloc_expr(ExprKind::List(items), span, scope)
                    }
                };
                Ok((
                    self.arena.alloc_stmt(StmtKind::Expression(value), span, scope),
                    scope,
                ))
            }
        }
    }

    fn block(&mut self, block: &ast::Block, scope: ScopeId) -> SemaResult<StmtId> {
        let mut inner = self.arena.clone_local(scope);
        let mut statements = Vec::with_capacity(block.statements.len());
        for s in &block.statements {
            let (id, next) = self.stmt(s, inner)?;
            statements.push(id);
            inner = next;
        }
        Ok(self
            .arena
            .alloc_stmt(StmtKind::Block { statements }, block.span, scope))
    }

    /// `let` declarations; inside a struct every declaration is a data member
    fn declaration(
        &mut self,
        decl: &ast::Declaration,
        scope: ScopeId,
        in_struct: bool,
    ) -> SemaResult<(StmtId, ScopeId)> {
        let decl_scope = self.arena.clone_for_decl(scope);
        let type_expr = decl.ty.as_ref().map(|t| self.expr(t, scope)).transpose()?;
        let init = decl.init.as_ref().map(|i| self.expr(i, scope)).transpose()?;

        let stmt = self.arena.alloc_stmt(StmtKind::Null, decl.span, scope);
        let kind = if in_struct || init.is_none() {
            ExprKind::DataMember { decl: stmt }
        } else {
            ExprKind::Variable { decl: stmt }
        };
        let declared = self.arena.alloc_expr(kind, decl.span, decl_scope);
        self.arena.exprs[declared].name = Some(decl.name);
        let symbol = self.bind(decl_scope, decl.name, declared, decl.span)?;
        self.arena.symbols[symbol].exported = decl.exported;

        // `let point = struct { ... }` names the type
        if let Some(init) = init {
            let named = match &self.arena.exprs[init].kind {
                ExprKind::StructLiteral { ty } | ExprKind::Typeclass(ty) => Some(*ty),
                ExprKind::Instance { ty, .. } => Some(*ty),
                _ => None,
            };
            if let Some(ty) = named {
                let ty = &mut self.arena.types[ty];
                ty.name.get_or_insert(decl.name);
                ty.exported |= decl.exported;
            }
        }

        self.arena.stmts[stmt].kind = StmtKind::Declaration(Declaration {
            name: decl.name,
            symbol,
            type_expr,
            init,
            declared,
            exported: decl.exported,
        });
        Ok((stmt, decl_scope))
    }

    /// Overload set `name` visible in `scope` without crossing a shadowing
    /// boundary
    fn overload_set(&self, scope: ScopeId, name: Symbol) -> Option<(SymbolId, ExprId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.arena.scopes[id];
            if let Some(symbol) = s.symbols.get(&name) {
                let bound = self
                    .bindings
                    .iter()
                    .rev()
                    .find(|(sym, _)| sym == symbol)
                    .map(|(_, expr)| *expr)?;
                return match self.arena.exprs[bound].kind {
                    ExprKind::OverloadSet(_) => Some((*symbol, bound)),
                    _ => None,
                };
            }
            if s.is_shadowing_boundary {
                break;
            }
            current = s.parent;
        }
        None
    }

    fn function(
        &mut self,
        decl: &ast::FunctionDecl,
        scope: ScopeId,
        instance: Option<ExprId>,
    ) -> SemaResult<FunctionId> {
        let param_scope = self.arena.clone_local(scope);
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let type_expr = self.expr(&param.ty, scope)?;
            let id = self.arena.alloc_expr(
                ExprKind::Parameter {
                    type_expr: Some(type_expr),
                    default: ParamDefault::Required,
                },
                param.span,
                param_scope,
            );
            self.arena.exprs[id].name = Some(param.name);
            self.bind(param_scope, param.name, id, param.span)?;
            params.push(id);
        }
        let return_type_expr = decl
            .return_type
            .as_ref()
            .map(|t| self.expr(t, scope))
            .transpose()?;

        let mut function = Function::new(decl.name, params, param_scope, decl.span);
        function.return_type_expr = return_type_expr;
        function.exported = decl.exported;
        function.instance = instance;
        let id = self.arena.alloc_function(function);

        if let Some(body) = &decl.body {
            let mut inner = param_scope;
            let mut statements = Vec::with_capacity(body.statements.len());
            for s in &body.statements {
                let (stmt, next) = self.stmt(s, inner)?;
                statements.push(stmt);
                inner = next;
            }
            let body = self
                .arena
                .alloc_stmt(StmtKind::Block { statements }, body.span, param_scope);
            self.arena.functions[id].body = Some(body);
        }

        match self.overload_set(scope, decl.name) {
            Some((symbol, set_expr)) => {
                let set = match self.arena.exprs[set_expr].kind {
                    ExprKind::OverloadSet(set) => set,
                    _ => return Err(Self::redeclared(decl.name, decl.span)),
                };
                if let TypeKind::OverloadSet { functions, .. } = &mut self.arena.types[set].kind {
                    functions.push(id);
                }
                self.arena.symbols[symbol].exported |= decl.exported;
            }
            None => {
                let members = self.arena.clone_for_class(scope);
                self.arena.close_scope(members);
                let mut set = Type::new(
                    TypeKind::OverloadSet {
                        name: decl.name,
                        functions: vec![id],
                    },
                    members,
                );
                set.name = Some(decl.name);
                set.module = Some(self.module);
                let set = self.arena.alloc_type(set);
                let expr = self
                    .arena
                    .alloc_typed_expr(ExprKind::OverloadSet(set), set, decl.span, scope);
                self.arena.exprs[expr].name = Some(decl.name);
                let symbol = self.bind(scope, decl.name, expr, decl.span)?;
                self.arena.symbols[symbol].exported = decl.exported;
            }
        }
        Ok(id)
    }

    /// New named-type scaffolding: a closed-later class scope and the type
    fn class_type(&mut self, kind: TypeKind, scope: ScopeId) -> (TypeId, ScopeId) {
        let members = self.arena.clone_for_class(scope);
        let mut ty = Type::new(kind, members);
        ty.module = Some(self.module);
        (self.arena.alloc_type(ty), members)
    }

    fn expr(&mut self, expr: &ast::Expr, scope: ScopeId) -> SemaResult<ExprId> {
        let span = expr.span;
        let kind = match &expr.kind {
            ast::ExprKind::Integer(v) => ExprKind::Integer(*v),
            ast::ExprKind::Boolean(b) => ExprKind::Boolean(*b),
            ast::ExprKind::Identifier(name) => ExprKind::Identifier {
                name: *name,
                target: None,
            },
            ast::ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: self.expr(lhs, scope)?,
                rhs: self.expr(rhs, scope)?,
                resolved: None,
            },
            ast::ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: self.expr(operand, scope)?,
                resolved: None,
            },
            ast::ExprKind::Postfix {
                base,
                bracket,
                args,
            } => ExprKind::Postfix {
                base: self.expr(base, scope)?,
                bracket: *bracket,
                args: args
                    .iter()
                    .map(|a| self.expr(&a.value, scope))
                    .collect::<SemaResult<_>>()?,
                designators: args.iter().map(|a| a.designator).collect(),
                resolved: None,
            },
            ast::ExprKind::Member { base, name } => ExprKind::Member {
                base: self.expr(base, scope)?,
                name: *name,
                resolved: None,
            },
            ast::ExprKind::Struct(decls) => {
                let (ty, members) = self.class_type(TypeKind::Struct(StructType::default()), scope);
                let mut stmts = Vec::with_capacity(decls.len());
                for decl in decls {
                    stmts.push(self.declaration(decl, members, true)?.0);
                }
                self.arena.close_scope(members);
                let literal = self
                    .arena
                    .alloc_expr(ExprKind::StructLiteral { ty }, span, scope);
                if let TypeKind::Struct(s) = &mut self.arena.types[ty].kind {
                    s.members = stmts;
                    s.literal = Some(literal);
                }
                return Ok(literal);
            }
            ast::ExprKind::Typeclass(literal) => return self.typeclass(literal, span, scope),
            ast::ExprKind::Instance(literal) => return self.instance(literal, span, scope),
            ast::ExprKind::Pack(pattern) => ExprKind::Pack {
                pattern: self.expr(pattern, scope)?,
            },
            ast::ExprKind::List(items) => ExprKind::List(
                items
                    .iter()
                    .map(|e| self.expr(e, scope))
                    .collect::<SemaResult<_>>()?,
            ),
        };
        Ok(self.arena.alloc_expr(kind, span, scope))
    }

    fn typeclass(
        &mut self,
        literal: &ast::TypeclassLiteral,
        span: Span,
        scope: ScopeId,
    ) -> SemaResult<ExprId> {
        let (ty, members) = self.class_type(TypeKind::Typeclass(TypeclassType::default()), scope);
        let mut params = Vec::with_capacity(literal.params.len());
        for (index, name) in literal.params.iter().enumerate() {
            let member_scope = self.arena.clone_for_class(members);
            self.arena.close_scope(member_scope);
            let mut archetype = Type::new(
                TypeKind::Archetype {
                    typeclass: Some(ty),
                    index,
                },
                member_scope,
            );
            archetype.name = Some(*name);
            archetype.module = Some(self.module);
            let archetype = self.arena.alloc_type(archetype);
            let expr = self
                .arena
                .alloc_typed_expr(ExprKind::TypeExpr(archetype), self.type_, span, members);
            self.arena.exprs[expr].name = Some(*name);
            self.bind(members, *name, expr, span)?;
            params.push(archetype);
        }

        let mut signatures = Vec::with_capacity(literal.members.len());
        for member in &literal.members {
            if member.body.is_some() {
                return Err(SemaError::unimplemented(
                    "default definitions of typeclass members",
                    member.span,
                ));
            }
            signatures.push(self.function(member, members, None)?);
        }
        self.arena.close_scope(members);
        if let TypeKind::Typeclass(tc) = &mut self.arena.types[ty].kind {
            tc.params = params;
            tc.members = signatures;
        }
        Ok(self.arena.alloc_expr(ExprKind::Typeclass(ty), span, scope))
    }

    fn instance(
        &mut self,
        literal: &ast::InstanceLiteral,
        span: Span,
        scope: ScopeId,
    ) -> SemaResult<ExprId> {
        let typeclass = self.expr(&literal.typeclass, scope)?;
        let args = literal
            .args
            .iter()
            .map(|a| self.expr(a, scope))
            .collect::<SemaResult<Vec<_>>>()?;
        let (ty, members) = self.class_type(TypeKind::Instance(InstanceType::default()), scope);
        let expr = self.arena.alloc_expr(
            ExprKind::Instance {
                ty,
                typeclass,
                args,
            },
            span,
            scope,
        );
        let mut definitions = Vec::with_capacity(literal.members.len());
        for member in &literal.members {
            if member.body.is_none() {
                return Err(SemaError::InstanceMismatch {
                    typeclass: "instance".into(),
                    reason: format!("`{}` has no definition", member.name),
                    span: member.span,
                });
            }
            definitions.push(self.function(member, members, Some(expr))?);
        }
        self.arena.close_scope(members);
        if let TypeKind::Instance(inst) = &mut self.arena.types[ty].kind {
            inst.definitions = definitions;
        }
        self.instance_literals.push(expr);
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemaConfig;
    use vapc_ast::build::*;

    #[test]
    fn test_functions_of_one_name_share_an_overload_set() {
        let cx = Sema::new(SemaConfig::default());
        let m = module(
            "lib",
            vec![
                function("f", vec![param("x", ident("int"))], None, vec![ret(ident("x"))]),
                function("f", vec![param("b", ident("bool"))], None, vec![ret(ident("b"))]),
            ],
        );
        let module = preanalyze_module(&cx, &m).unwrap();
        let arena = cx.arena();
        let scope = match &arena.exprs[module].kind {
            ExprKind::Module(data) => data.scope,
            _ => unreachable!(),
        };
        let symbol = arena.try_get(scope, Symbol::intern("f")).unwrap();
        let expr = arena.symbols[symbol].expr.unwrap();
        match &arena.exprs[expr].kind {
            ExprKind::OverloadSet(set) => match arena.type_kind(*set) {
                TypeKind::OverloadSet { functions, .. } => assert_eq!(functions.len(), 2),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
        drop(arena);
        cx.clear_tasks();
    }

    #[test]
    fn test_module_level_redeclaration() {
        let cx = Sema::new(SemaConfig::default());
        let m = module("lib", vec![let_("x", int(1)), let_("x", int(2))]);
        let err = preanalyze_module(&cx, &m).unwrap_err();
        assert!(matches!(err, SemaError::Redeclaration { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_variable_shadowing_function_is_redeclaration() {
        let cx = Sema::new(SemaConfig::default());
        let m = module(
            "lib",
            vec![
                let_("f", int(1)),
                function("f", vec![], None, vec![ret(int(1))]),
            ],
        );
        assert!(matches!(
            preanalyze_module(&cx, &m),
            Err(SemaError::Redeclaration { .. })
        ));
    }

    #[test]
    fn test_struct_type_is_named_after_its_declaration() {
        let cx = Sema::new(SemaConfig::default());
        let m = module(
            "lib",
            vec![export(let_("point", struct_lit(vec![field("x", ident("int"))])))],
        );
        preanalyze_module(&cx, &m).unwrap();
        let arena = cx.arena();
        let named = arena
            .types
            .iter()
            .find(|t| matches!(t.kind, TypeKind::Struct(_)))
            .unwrap();
        assert_eq!(named.name, Some(Symbol::intern("point")));
        assert!(named.exported);
    }

    #[test]
    fn test_unknown_import_fails() {
        let cx = Sema::new(SemaConfig::default());
        let mut m = module("main", vec![]);
        m.imports.push(import("missing.lib"));
        assert!(matches!(
            preanalyze_module(&cx, &m),
            Err(SemaError::FailedLookup { ref name, .. }) if name == "missing.lib"
        ));
    }
}
