//! Module interfaces: what one module exports for others to import.
//!
//! An interface lists the exported functions, structs and variables of an
//! analyzed module together with the structs their signatures mention but
//! the module does not export ("hidden" entities). Types are written as
//! [`TypeReference`]s: builtins by kind, user-defined types by module path,
//! enclosing scopes and name.
//!
//! Importing rebuilds a module from an interface. User-defined references
//! become `Unresolved` types that are resolved on first use, so interfaces
//! may be imported in any order.

use serde::{Deserialize, Serialize};
use vapc_util::{Span, Symbol};

use crate::context::Sema;
use crate::error::{SemaError, SemaResult};
use crate::expr::{ExprKind, ModuleData, ParamDefault};
use crate::function::Function;
use crate::ids::{ExprId, FunctionId, ScopeId, SymbolId, TypeId};
use crate::types::{Field, StructType, Type, TypeKind, UnresolvedType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInterface {
    pub module: Vec<String>,
    pub entities: Vec<InterfaceEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterfaceEntity {
    Function {
        name: String,
        params: Vec<InterfaceParam>,
        return_type: TypeReference,
        exported: bool,
    },
    Struct {
        name: String,
        fields: Vec<InterfaceParam>,
        exported: bool,
    },
    Variable {
        name: String,
        ty: TypeReference,
        exported: bool,
    },
}

impl InterfaceEntity {
    pub fn name(&self) -> &str {
        match self {
            InterfaceEntity::Function { name, .. }
            | InterfaceEntity::Struct { name, .. }
            | InterfaceEntity::Variable { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceParam {
    pub name: String,
    pub ty: TypeReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeReference {
    Integer,
    Boolean,
    Type,
    Sized {
        signed: bool,
        width: u32,
    },
    UserDefined {
        module: Vec<String>,
        scopes: Vec<String>,
        name: String,
    },
    Pack {
        pattern: Box<TypeReference>,
    },
}

impl ModuleInterface {
    pub fn dotted_name(&self) -> String {
        self.module.join(".")
    }

    pub fn to_json(&self) -> SemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SemaError::Interface(e.to_string()))
    }

    pub fn from_json(text: &str) -> SemaResult<Self> {
        serde_json::from_str(text).map_err(|e| SemaError::Interface(e.to_string()))
    }

    pub fn to_bytes(&self) -> SemaResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SemaError::Interface(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> SemaResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| SemaError::Interface(e.to_string()))
    }
}

fn strings(path: &[Symbol]) -> Vec<String> {
    path.iter().map(|s| s.as_str().to_string()).collect()
}

fn symbols(path: &[String]) -> Vec<Symbol> {
    path.iter().map(|s| Symbol::intern(s)).collect()
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Interface of an analyzed and simplified module
pub fn generate_interface(cx: &Sema, module: ExprId) -> SemaResult<ModuleInterface> {
    let arena = cx.arena();
    let (path, scope) = match &arena.exprs[module].kind {
        ExprKind::Module(data) => (data.path.clone(), data.scope),
        other => {
            return Err(SemaError::internal(format!(
                "interface of a {}",
                other.describe()
            )))
        }
    };
    drop(arena);

    let mut exporter = Exporter {
        cx,
        module,
        hidden: Vec::new(),
        listed: Vec::new(),
    };
    let mut entities = Vec::new();
    let exported: Vec<(Symbol, SymbolId)> = cx.arena().scopes[scope]
        .symbols
        .iter()
        .map(|(name, symbol)| (*name, *symbol))
        .collect();
    for (name, symbol) in exported {
        let (is_exported, expr) = {
            let arena = cx.arena();
            (arena.symbols[symbol].exported, arena.symbols[symbol].expr)
        };
        let Some(expr) = expr.filter(|_| is_exported) else {
            continue;
        };
        exporter.entity(name, expr, &mut entities)?;
    }

    // Structs reachable from exported signatures, transitively
    while let Some(ty) = exporter.hidden.pop() {
        entities.push(exporter.struct_entity(ty, false)?);
    }

    log::debug!(
        "interface of `{}`: {} entities",
        path.iter().map(Symbol::as_str).collect::<Vec<_>>().join("."),
        entities.len()
    );
    Ok(ModuleInterface {
        module: strings(&path),
        entities,
    })
}

/// Reference to `ty` as written in an interface
pub fn generate_interface_reference(cx: &Sema, module: ExprId, ty: TypeId) -> SemaResult<TypeReference> {
    Exporter {
        cx,
        module,
        hidden: Vec::new(),
        listed: Vec::new(),
    }
    .reference(ty)
}

struct Exporter<'a> {
    cx: &'a Sema,
    module: ExprId,
    /// Non-exported structs of this module still to be listed
    hidden: Vec<TypeId>,
    /// Structs already listed or queued
    listed: Vec<TypeId>,
}

impl Exporter<'_> {
    fn entity(&mut self, name: Symbol, expr: ExprId, out: &mut Vec<InterfaceEntity>) -> SemaResult<()> {
        let kind = self.cx.arena().exprs[expr].kind.clone();
        match kind {
            ExprKind::OverloadSet(set) => {
                let functions = match self.cx.arena().type_kind(set) {
                    TypeKind::OverloadSet { functions, .. } => functions.clone(),
                    _ => Vec::new(),
                };
                for function in functions {
                    if self.cx.arena().functions[function].exported {
                        out.push(self.function_entity(function)?);
                    }
                }
                Ok(())
            }
            ExprKind::Variable { .. } | ExprKind::DataMember { .. } | ExprKind::Entity { .. } => {
                let (ty, span) = (self.cx.expr_type(expr)?, self.cx.expr_span(expr));
                let value = {
                    let arena = self.cx.arena();
                    arena.referent_value(expr).map(|v| arena.resolved(v))
                };
                let denoted = value.and_then(|v| match self.cx.arena().exprs[v].kind {
                    ExprKind::TypeExpr(t) | ExprKind::StructLiteral { ty: t } => Some(t),
                    ExprKind::Typeclass(t) | ExprKind::Instance { ty: t, .. } => Some(t),
                    _ => None,
                });
                match denoted {
                    Some(t) if self.cx.arena().same_type(ty, self.cx.builtins.type_) => {
                        let t = self.cx.arena().canonical(t);
                        let is_struct = matches!(self.cx.arena().types[t].kind, TypeKind::Struct(_));
                        if !is_struct {
                            return Err(SemaError::unimplemented(
                                format!("exporting `{name}`, which is not a struct type"),
                                span,
                            ));
                        }
                        if self.cx.arena().types[t].name != Some(name) {
                            return Err(SemaError::unimplemented(
                                format!("exporting `{name}` as an alias of another type"),
                                span,
                            ));
                        }
                        self.listed.push(t);
                        self.hidden.retain(|h| *h != t);
                        out.push(self.struct_entity(t, true)?);
                    }
                    _ => out.push(InterfaceEntity::Variable {
                        name: name.to_string(),
                        ty: self.reference(ty)?,
                        exported: true,
                    }),
                }
                Ok(())
            }
            other => Err(SemaError::unimplemented(
                format!("exporting a {}", other.describe()),
                self.cx.expr_span(expr),
            )),
        }
    }

    fn function_entity(&mut self, function: FunctionId) -> SemaResult<InterfaceEntity> {
        let (name, params, param_types, return_type, span) = {
            let arena = self.cx.arena();
            let f = &arena.functions[function];
            (
                f.name,
                f.params.clone(),
                f.param_types.clone(),
                f.return_type,
                f.span,
            )
        };
        let (Some(param_types), Some(return_type)) = (param_types, return_type) else {
            return Err(SemaError::internal(format!(
                "interface of `{name}` before its analysis"
            )));
        };
        if self.cx.arena().functions[function].instance.is_some() {
            return Err(SemaError::unimplemented("exporting instance members", span));
        }
        let mut interface_params = Vec::with_capacity(params.len());
        for (param, ty) in params.iter().zip(param_types) {
            let name = self.cx.arena().exprs[*param]
                .name
                .map(|n| n.to_string())
                .unwrap_or_default();
            interface_params.push(InterfaceParam {
                name,
                ty: self.reference(ty)?,
            });
        }
        Ok(InterfaceEntity::Function {
            name: name.to_string(),
            params: interface_params,
            return_type: self.reference(return_type)?,
            exported: true,
        })
    }

    fn struct_entity(&mut self, ty: TypeId, exported: bool) -> SemaResult<InterfaceEntity> {
        let (name, fields) = {
            let arena = self.cx.arena();
            let declared = &arena.types[ty];
            let fields = match &declared.kind {
                TypeKind::Struct(s) => s.fields.clone(),
                _ => None,
            };
            (declared.name, fields)
        };
        let name = name.ok_or_else(|| SemaError::internal("anonymous struct in an interface"))?;
        let fields = fields.ok_or_else(|| {
            SemaError::internal(format!("fields of `{name}` exported before analysis"))
        })?;
        let mut interface_fields = Vec::with_capacity(fields.len());
        for field in fields {
            interface_fields.push(InterfaceParam {
                name: field.name.to_string(),
                ty: self.reference(field.ty)?,
            });
        }
        Ok(InterfaceEntity::Struct {
            name: name.to_string(),
            fields: interface_fields,
            exported,
        })
    }

    fn reference(&mut self, ty: TypeId) -> SemaResult<TypeReference> {
        let ty = self.cx.arena().canonical(ty);
        let kind = self.cx.arena().types[ty].kind.clone();
        match kind {
            TypeKind::Integer => Ok(TypeReference::Integer),
            TypeKind::Boolean => Ok(TypeReference::Boolean),
            TypeKind::Type => Ok(TypeReference::Type),
            TypeKind::SizedInteger { signed, width } => Ok(TypeReference::Sized { signed, width }),
            TypeKind::Pack { pattern } => Ok(TypeReference::Pack {
                pattern: Box::new(self.reference(pattern)?),
            }),
            TypeKind::Struct(_) => {
                let arena = self.cx.arena();
                let declared = &arena.types[ty];
                let name = declared
                    .name
                    .ok_or_else(|| SemaError::internal("anonymous struct in an interface"))?;
                let owner = declared
                    .module
                    .ok_or_else(|| SemaError::internal(format!("struct `{name}` has no module")))?;
                let module = match &arena.exprs[owner].kind {
                    ExprKind::Module(data) => strings(&data.path),
                    _ => return Err(SemaError::internal("struct owner is not a module")),
                };
                let hidden_here = owner == self.module && !declared.exported;
                drop(arena);
                if hidden_here && !self.listed.contains(&ty) {
                    self.listed.push(ty);
                    self.hidden.push(ty);
                }
                Ok(TypeReference::UserDefined {
                    module,
                    scopes: Vec::new(),
                    name: name.to_string(),
                })
            }
            TypeKind::Unresolved(u) => Ok(TypeReference::UserDefined {
                module: strings(&u.module),
                scopes: strings(&u.scopes),
                name: u.name.to_string(),
            }),
            _ => Err(SemaError::unimplemented(
                format!("`{}` in a module interface", self.cx.arena().type_name(ty)),
                Span::DUMMY,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Type denoted by `reference` in the importing session
pub fn imported_type(cx: &Sema, reference: &TypeReference) -> TypeId {
    match reference {
        TypeReference::Integer => cx.builtins.int,
        TypeReference::Boolean => cx.builtins.bool,
        TypeReference::Type => cx.builtins.type_,
        TypeReference::Sized { signed, width } => cx.intern_type(TypeKind::SizedInteger {
            signed: *signed,
            width: *width,
        }),
        TypeReference::UserDefined {
            module,
            scopes,
            name,
        } => cx.intern_type(TypeKind::Unresolved(UnresolvedType {
            module: symbols(module),
            scopes: symbols(scopes),
            name: Symbol::intern(name),
            resolved: None,
        })),
        TypeReference::Pack { pattern } => {
            let pattern = imported_type(cx, pattern);
            cx.intern_type(TypeKind::Pack { pattern })
        }
    }
}

/// Rebuild an imported module from its interface and register it
pub fn import_interface(cx: &Sema, interface: &ModuleInterface) -> SemaResult<ExprId> {
    let path = symbols(&interface.module);
    let dotted = interface.dotted_name();
    let duplicate = {
        let arena = cx.arena();
        cx.modules.borrow().iter().any(|m| {
            matches!(&arena.exprs[*m].kind, ExprKind::Module(data) if data.path == path)
        })
    };
    if duplicate {
        return Err(SemaError::Redeclaration {
            name: dotted,
            span: Span::DUMMY,
        });
    }

    // Types first: interning borrows the arena.
    enum Resolved {
        Function {
            name: Symbol,
            params: Vec<(Symbol, TypeId)>,
            ret: TypeId,
            exported: bool,
        },
        Struct {
            name: Symbol,
            fields: Vec<Field>,
            exported: bool,
        },
        Variable {
            name: Symbol,
            ty: TypeId,
            exported: bool,
        },
    }
    let resolved: Vec<Resolved> = interface
        .entities
        .iter()
        .map(|entity| match entity {
            InterfaceEntity::Function {
                name,
                params,
                return_type,
                exported,
            } => Resolved::Function {
                name: Symbol::intern(name),
                params: params
                    .iter()
                    .map(|p| (Symbol::intern(&p.name), imported_type(cx, &p.ty)))
                    .collect(),
                ret: imported_type(cx, return_type),
                exported: *exported,
            },
            InterfaceEntity::Struct {
                name,
                fields,
                exported,
            } => Resolved::Struct {
                name: Symbol::intern(name),
                fields: fields
                    .iter()
                    .map(|f| Field {
                        name: Symbol::intern(&f.name),
                        ty: imported_type(cx, &f.ty),
                        member: None,
                    })
                    .collect(),
                exported: *exported,
            },
            InterfaceEntity::Variable { name, ty, exported } => Resolved::Variable {
                name: Symbol::intern(name),
                ty: imported_type(cx, ty),
                exported: *exported,
            },
        })
        .collect();

    let (type_, builtin_scope) = (cx.builtins.type_, cx.builtins.scope);
    let mut arena = cx.arena_mut();
    let scope = arena.clone_for_class(builtin_scope);
    let mut module_ty = Type::new(TypeKind::Module, scope);
    module_ty.name = path.last().copied();
    let module_ty = arena.alloc_type(module_ty);
    let module = arena.alloc_typed_expr(
        ExprKind::Module(Box::new(ModuleData {
            path: path.clone(),
            scope,
            statements: Vec::new(),
            entry: None,
            imported: true,
        })),
        module_ty,
        Span::DUMMY,
        scope,
    );
    arena.scopes[scope].module = Some(module);
    arena.types[module_ty].module = Some(module);

    let mut bindings: Vec<(SymbolId, ExprId)> = Vec::new();
    let mut sets: Vec<(Symbol, TypeId)> = Vec::new();
    let redeclared = |name: Symbol| SemaError::Interface(format!("`{name}` listed twice in `{dotted}`"));

    for entity in resolved {
        match entity {
            Resolved::Struct {
                name,
                fields,
                exported,
            } => {
                let members = arena.clone_for_class(scope);
                arena.close_scope(members);
                let mut ty = Type::new(
                    TypeKind::Struct(StructType {
                        fields: Some(fields),
                        ..StructType::default()
                    }),
                    members,
                );
                ty.name = Some(name);
                ty.module = Some(module);
                ty.exported = exported;
                let ty = arena.alloc_type(ty);
                let expr = arena.alloc_typed_expr(ExprKind::TypeExpr(ty), type_, Span::DUMMY, scope);
                arena.exprs[expr].name = Some(name);
                let symbol = arena
                    .init_symbol(scope, name, Span::DUMMY)
                    .ok_or_else(|| redeclared(name))?;
                arena.symbols[symbol].exported = exported;
                arena.symbols[symbol].hidden = !exported;
                bindings.push((symbol, expr));
            }
            Resolved::Variable { name, ty, exported } => {
                let expr = arena.alloc_typed_expr(
                    ExprKind::Entity {
                        module: path.clone(),
                    },
                    ty,
                    Span::DUMMY,
                    scope,
                );
                arena.exprs[expr].name = Some(name);
                let symbol = arena
                    .init_symbol(scope, name, Span::DUMMY)
                    .ok_or_else(|| redeclared(name))?;
                arena.symbols[symbol].exported = exported;
                bindings.push((symbol, expr));
            }
            Resolved::Function {
                name,
                params,
                ret,
                exported,
            } => {
                let function = import_function(&mut arena, scope, name, &params, ret, exported);
                match sets.iter().find(|(n, _)| *n == name) {
                    Some((_, set)) => {
                        if let TypeKind::OverloadSet { functions, .. } = &mut arena.types[*set].kind {
                            functions.push(function);
                        }
                    }
                    None => {
                        let members = arena.clone_for_class(scope);
                        arena.close_scope(members);
                        let mut set = Type::new(
                            TypeKind::OverloadSet {
                                name,
                                functions: vec![function],
                            },
                            members,
                        );
                        set.name = Some(name);
                        set.module = Some(module);
                        let set = arena.alloc_type(set);
                        let expr = arena.alloc_typed_expr(ExprKind::OverloadSet(set), set, Span::DUMMY, scope);
                        arena.exprs[expr].name = Some(name);
                        let symbol = arena
                            .init_symbol(scope, name, Span::DUMMY)
                            .ok_or_else(|| redeclared(name))?;
                        arena.symbols[symbol].exported = exported;
                        bindings.push((symbol, expr));
                        sets.push((name, set));
                    }
                }
            }
        }
    }
    arena.close_scope(scope);
    drop(arena);

    for (symbol, expr) in bindings {
        cx.attach_symbol(symbol, expr);
    }
    cx.modules.borrow_mut().push(module);
    log::info!(
        "imported module `{}` ({} entities)",
        interface.dotted_name(),
        interface.entities.len()
    );
    Ok(module)
}

/// Bodiless declaration of an imported function
fn import_function(
    arena: &mut crate::arena::Arena,
    scope: ScopeId,
    name: Symbol,
    params: &[(Symbol, TypeId)],
    ret: TypeId,
    exported: bool,
) -> FunctionId {
    let param_scope = arena.clone_local(scope);
    let params = params
        .iter()
        .map(|(param, ty)| {
            let id = arena.alloc_typed_expr(
                ExprKind::Parameter {
                    type_expr: None,
                    default: ParamDefault::Required,
                },
                *ty,
                Span::DUMMY,
                param_scope,
            );
            arena.exprs[id].name = Some(*param);
            id
        })
        .collect();
    let mut function = Function::new(name, params, param_scope, Span::DUMMY);
    function.return_type = Some(ret);
    function.imported = true;
    function.exported = exported;
    arena.alloc_function(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemaConfig;
    use pretty_assertions::assert_eq;

    fn sample() -> ModuleInterface {
        ModuleInterface {
            module: vec!["geometry".into()],
            entities: vec![
                InterfaceEntity::Struct {
                    name: "point".into(),
                    fields: vec![
                        InterfaceParam {
                            name: "x".into(),
                            ty: TypeReference::Integer,
                        },
                        InterfaceParam {
                            name: "y".into(),
                            ty: TypeReference::Integer,
                        },
                    ],
                    exported: true,
                },
                InterfaceEntity::Function {
                    name: "norm".into(),
                    params: vec![InterfaceParam {
                        name: "p".into(),
                        ty: TypeReference::UserDefined {
                            module: vec!["geometry".into()],
                            scopes: vec![],
                            name: "point".into(),
                        },
                    }],
                    return_type: TypeReference::Integer,
                    exported: true,
                },
            ],
        }
    }

    #[test]
    fn test_json_uses_kind_tags() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"kind\": \"struct\""));
        assert!(json.contains("\"kind\": \"user_defined\""));
        assert_eq!(ModuleInterface::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn test_malformed_bytes_are_rejected() {
        let err = ModuleInterface::from_bytes(b"{\"module\": 3}").unwrap_err();
        assert!(matches!(err, SemaError::Interface(_)));
    }

    #[test]
    fn test_import_builds_overload_sets_and_structs() {
        let cx = Sema::new(SemaConfig::default());
        let module = import_interface(&cx, &sample()).unwrap();
        let arena = cx.arena();
        let scope = match &arena.exprs[module].kind {
            ExprKind::Module(data) => {
                assert!(data.imported);
                data.scope
            }
            _ => unreachable!(),
        };
        assert!(arena.scopes[scope].closed);
        let point = arena.try_get(scope, Symbol::intern("point")).unwrap();
        let norm = arena.try_get(scope, Symbol::intern("norm")).unwrap();
        assert!(matches!(
            arena.exprs[arena.symbols[point].expr.unwrap()].kind,
            ExprKind::TypeExpr(_)
        ));
        assert!(matches!(
            arena.exprs[arena.symbols[norm].expr.unwrap()].kind,
            ExprKind::OverloadSet(_)
        ));
        drop(arena);
        cx.clear_tasks();
    }

    #[test]
    fn test_importing_twice_is_a_redeclaration() {
        let cx = Sema::new(SemaConfig::default());
        import_interface(&cx, &sample()).unwrap();
        assert!(matches!(
            import_interface(&cx, &sample()),
            Err(SemaError::Redeclaration { .. })
        ));
    }
}
