//! Backend-facing intermediate representation.
//!
//! Lowering runs on the simplified program: every call-like node has its
//! resolution, every type is known and compile-time values have been folded
//! away. What remains are runtime computations over typed virtual
//! registers ([`IrVariable`]), grouped into [`IrFunction`]s and global
//! constants.
//!
//! Compile-time-only declarations produce nothing: types, typeclasses,
//! functions taking or returning `type`, and generic typeclass members.

use std::fmt;

use serde::Serialize;
use vapc_util::{FxHashMap, Symbol};

use crate::context::Sema;
use crate::error::{SemaError, SemaResult};
use crate::expr::{ExprKind, ParamDefault};
use crate::function::Intrinsic;
use crate::ids::{ExprId, FunctionId, StmtId, TypeId};
use crate::stmt::StmtKind;
use crate::types::TypeKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrType {
    Int,
    Bool,
    Sized { signed: bool, width: u32 },
    Struct { name: String, fields: Vec<IrType> },
    Pack(Box<IrType>),
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Int => write!(f, "i64"),
            IrType::Bool => write!(f, "i1"),
            IrType::Sized { signed, width } => write!(f, "{}{width}", if *signed { 's' } else { 'u' }),
            IrType::Struct { name, .. } => write!(f, "%{name}"),
            IrType::Pack(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// Virtual register, an index into [`IrFunction::variables`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IrVariable(pub u32);

impl fmt::Display for IrVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrConst {
    Int(i64),
    Bool(bool),
    Sized { value: i128, ty: IrType },
    Aggregate { ty: IrType, fields: Vec<IrConst> },
}

pub type Label = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrInstruction {
    Const {
        dest: IrVariable,
        value: IrConst,
    },
    /// Call of a user function by mangled name
    Call {
        dest: IrVariable,
        function: String,
        args: Vec<IrVariable>,
    },
    /// Builtin operation: an operator symbol or `convert`
    Intrinsic {
        dest: IrVariable,
        op: String,
        args: Vec<IrVariable>,
    },
    Member {
        dest: IrVariable,
        base: IrVariable,
        index: usize,
    },
    Aggregate {
        dest: IrVariable,
        fields: Vec<IrVariable>,
    },
    LoadGlobal {
        dest: IrVariable,
        name: String,
    },
    Return(IrVariable),
    Branch {
        condition: IrVariable,
        then_label: Label,
        else_label: Label,
    },
    Jump(Label),
    Label(Label),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrFunction {
    /// Mangled name, unique per module
    pub name: String,
    pub params: Vec<IrVariable>,
    pub return_type: IrType,
    /// Type of every virtual register
    pub variables: Vec<IrType>,
    /// Empty for imported declarations
    pub body: Vec<IrInstruction>,
    pub exported: bool,
    pub imported: bool,
    pub is_entry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrEntity {
    Function(IrFunction),
    Constant {
        name: String,
        ty: IrType,
        value: IrConst,
        exported: bool,
    },
}

impl IrEntity {
    pub fn name(&self) -> &str {
        match self {
            IrEntity::Function(f) => &f.name,
            IrEntity::Constant { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrModule {
    pub name: String,
    pub entities: Vec<IrEntity>,
}

impl IrModule {
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.entities.iter().find_map(|e| match e {
            IrEntity::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }
}

/// Whether values of `ty` only exist at compile time
pub fn is_compile_time_type(cx: &Sema, ty: TypeId) -> bool {
    let arena = cx.arena();
    match arena.type_kind(ty) {
        TypeKind::Integer | TypeKind::Boolean | TypeKind::SizedInteger { .. } => false,
        TypeKind::Struct(s) => s
            .fields
            .as_ref()
            .is_some_and(|fields| fields.iter().any(|f| is_compile_time_type(cx, f.ty))),
        TypeKind::Pack { pattern } => is_compile_time_type(cx, *pattern),
        _ => true,
    }
}

/// IR type of a runtime type
pub fn codegen_type(cx: &Sema, ty: TypeId) -> SemaResult<IrType> {
    let (kind, name) = {
        let arena = cx.arena();
        (arena.type_kind(ty).clone(), arena.type_name(ty))
    };
    match kind {
        TypeKind::Integer => Ok(IrType::Int),
        TypeKind::Boolean => Ok(IrType::Bool),
        TypeKind::SizedInteger { signed, width } => Ok(IrType::Sized { signed, width }),
        TypeKind::Struct(s) => {
            let fields = s
                .fields
                .ok_or_else(|| SemaError::internal(format!("codegen of `{name}` before analysis")))?;
            Ok(IrType::Struct {
                name,
                fields: fields
                    .iter()
                    .map(|f| codegen_type(cx, f.ty))
                    .collect::<SemaResult<_>>()?,
            })
        }
        TypeKind::Pack { pattern } => Ok(IrType::Pack(Box::new(codegen_type(cx, pattern)?))),
        _ => Err(SemaError::internal(format!(
            "compile-time type `{name}` has no runtime representation"
        ))),
    }
}

/// Module-qualified name with parameter types, e.g. `main::add(int, int)`
pub fn mangled_name(cx: &Sema, function: FunctionId) -> String {
    let arena = cx.arena();
    let f = &arena.functions[function];
    let module = arena.scopes[f.scope]
        .module
        .and_then(|m| match &arena.exprs[m].kind {
            ExprKind::Module(data) => Some(data.dotted_name()),
            _ => None,
        })
        .unwrap_or_default();
    let params = f
        .param_types
        .as_deref()
        .map(|types| arena.type_list(types))
        .unwrap_or_default();
    format!("{module}::{}({params})", f.name)
}

fn is_compile_time_function(cx: &Sema, function: FunctionId) -> bool {
    let (param_types, return_type, body, imported) = {
        let arena = cx.arena();
        let f = &arena.functions[function];
        (f.param_types.clone(), f.return_type, f.body, f.imported)
    };
    // Typeclass member signatures have neither a body nor an origin module.
    if body.is_none() && !imported {
        return true;
    }
    let (Some(params), Some(ret)) = (param_types, return_type) else {
        return true;
    };
    params.iter().chain(std::iter::once(&ret)).any(|t| is_compile_time_type(cx, *t))
}

/// IR of one function; `None` when it only exists at compile time
pub fn function_codegen_ir(cx: &Sema, function: FunctionId) -> SemaResult<Option<IrFunction>> {
    if is_compile_time_function(cx, function) {
        return Ok(None);
    }
    let (params, param_types, return_type, body, exported, imported, is_entry) = {
        let arena = cx.arena();
        let f = &arena.functions[function];
        (
            f.params.clone(),
            f.param_types.clone().unwrap_or_default(),
            f.return_type,
            f.body,
            f.exported,
            f.imported,
            f.is_entry,
        )
    };
    let return_type = return_type
        .ok_or_else(|| SemaError::internal("codegen of a function without a return type"))?;

    let mut builder = IrBuilder::new(cx);
    let mut ir_params = Vec::with_capacity(params.len());
    for (param, ty) in params.iter().zip(&param_types) {
        let var = builder.variable(*ty)?;
        builder.locals.insert(*param, var);
        ir_params.push(var);
    }
    if let Some(body) = body {
        builder.codegen_stmt(body)?;
    }
    log::debug!("lowered `{}` to {} instructions", mangled_name(cx, function), builder.body.len());
    Ok(Some(IrFunction {
        name: mangled_name(cx, function),
        params: ir_params,
        return_type: codegen_type(cx, return_type)?,
        variables: builder.variables,
        body: builder.body,
        exported,
        imported,
        is_entry,
    }))
}

/// IR entities of a module-level statement
///
/// Functions nested in the statement are lowered as well.
pub fn declaration_codegen_ir(cx: &Sema, stmt: StmtId) -> SemaResult<Vec<IrEntity>> {
    let kind = cx.arena().stmts[stmt].kind.clone();
    let mut out = Vec::new();
    match kind {
        StmtKind::Function(function) => {
            let mut nested = Vec::new();
            collect_nested_functions(cx, function, &mut nested);
            for f in std::iter::once(function).chain(nested) {
                if let Some(ir) = function_codegen_ir(cx, f)? {
                    out.push(IrEntity::Function(ir));
                }
            }
        }
        StmtKind::Declaration(decl) => {
            let ty = cx.expr_type(decl.declared)?;
            if is_compile_time_type(cx, ty) {
                return Ok(out);
            }
            let span = cx.expr_span(decl.declared);
            let Some(init) = decl.init else {
                return Err(SemaError::unimplemented(
                    format!("global `{}` without an initializer", decl.name),
                    span,
                ));
            };
            let init = cx.arena().resolved(init);
            if !cx.arena().is_constant(init) {
                return Err(SemaError::unimplemented(
                    format!("global `{}` with a value not known at compile time", decl.name),
                    span,
                ));
            }
            out.push(IrEntity::Constant {
                name: global_name(cx, decl.declared),
                ty: codegen_type(cx, ty)?,
                value: const_of(cx, init)?,
                exported: decl.exported,
            });
        }
        _ => {}
    }
    Ok(out)
}

fn collect_nested_functions(cx: &Sema, function: FunctionId, out: &mut Vec<FunctionId>) {
    fn walk(cx: &Sema, stmt: StmtId, out: &mut Vec<FunctionId>) {
        let kind = cx.arena().stmts[stmt].kind.clone();
        match kind {
            StmtKind::Function(f) => {
                out.push(f);
                collect_nested_functions(cx, f, out);
            }
            StmtKind::Block { statements } => statements.iter().for_each(|s| walk(cx, *s, out)),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                walk(cx, then_branch, out);
                if let Some(otherwise) = else_branch {
                    walk(cx, otherwise, out);
                }
            }
            _ => {}
        }
    }
    if let Some(body) = cx.arena().functions[function].body {
        walk(cx, body, out);
    }
}

fn global_name(cx: &Sema, declared: ExprId) -> String {
    let arena = cx.arena();
    let module = arena.scopes[arena.exprs[declared].scope]
        .module
        .and_then(|m| match &arena.exprs[m].kind {
            ExprKind::Module(data) => Some(data.dotted_name()),
            _ => None,
        })
        .unwrap_or_default();
    let name = arena.exprs[declared]
        .name
        .map(|n| n.as_str())
        .unwrap_or("_");
    format!("{module}::{name}")
}

/// Constant value of a folded expression
fn const_of(cx: &Sema, id: ExprId) -> SemaResult<IrConst> {
    let (kind, ty, span) = {
        let arena = cx.arena();
        let expr = &arena.exprs[id];
        (expr.kind.clone(), expr.ty, expr.span)
    };
    match kind {
        ExprKind::Integer(v) => Ok(IrConst::Int(v)),
        ExprKind::Boolean(b) => Ok(IrConst::Bool(b)),
        ExprKind::SizedInteger { value, ty } => Ok(IrConst::Sized {
            value,
            ty: codegen_type(cx, ty)?,
        }),
        ExprKind::StructValue { ty, fields } => Ok(IrConst::Aggregate {
            ty: codegen_type(cx, ty)?,
            fields: fields
                .iter()
                .map(|f| const_of(cx, *f))
                .collect::<SemaResult<_>>()?,
        }),
        ExprKind::PackValue(items) => {
            let ty = ty.ok_or_else(|| SemaError::internal("pack value without a type"))?;
            Ok(IrConst::Aggregate {
                ty: codegen_type(cx, ty)?,
                fields: items
                    .iter()
                    .map(|f| const_of(cx, *f))
                    .collect::<SemaResult<_>>()?,
            })
        }
        other => Err(SemaError::unimplemented(
            format!("{} at run time", other.describe()),
            span,
        )),
    }
}

/// Per-function lowering state
struct IrBuilder<'a> {
    cx: &'a Sema,
    variables: Vec<IrType>,
    /// Parameters and local variables already in a register
    locals: FxHashMap<ExprId, IrVariable>,
    body: Vec<IrInstruction>,
    next_label: Label,
}

impl<'a> IrBuilder<'a> {
    fn new(cx: &'a Sema) -> Self {
        Self {
            cx,
            variables: Vec::new(),
            locals: FxHashMap::default(),
            body: Vec::new(),
            next_label: 0,
        }
    }

    fn variable(&mut self, ty: TypeId) -> SemaResult<IrVariable> {
        let ty = codegen_type(self.cx, ty)?;
        self.variables.push(ty);
        Ok(IrVariable(self.variables.len() as u32 - 1))
    }

    fn label(&mut self) -> Label {
        self.next_label += 1;
        self.next_label - 1
    }

    fn codegen_stmt(&mut self, stmt: StmtId) -> SemaResult<()> {
        let kind = self.cx.arena().stmts[stmt].kind.clone();
        match kind {
            StmtKind::Declaration(decl) => {
                let ty = self.cx.expr_type(decl.declared)?;
                if is_compile_time_type(self.cx, ty) {
                    return Ok(());
                }
                let init = decl.init.ok_or_else(|| {
                    SemaError::unimplemented(
                        format!("local `{}` without an initializer", decl.name),
                        self.cx.expr_span(decl.declared),
                    )
                })?;
                let value = self.codegen_ir(init)?;
                self.locals.insert(decl.declared, value);
                Ok(())
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.codegen_ir(condition)?;
                let (then_label, else_label, end) = (self.label(), self.label(), self.label());
                self.body.push(IrInstruction::Branch {
                    condition,
                    then_label,
                    else_label,
                });
                self.body.push(IrInstruction::Label(then_label));
                self.codegen_stmt(then_branch)?;
                self.body.push(IrInstruction::Jump(end));
                self.body.push(IrInstruction::Label(else_label));
                if let Some(otherwise) = else_branch {
                    self.codegen_stmt(otherwise)?;
                }
                self.body.push(IrInstruction::Jump(end));
                self.body.push(IrInstruction::Label(end));
                Ok(())
            }
            StmtKind::Return { value } => {
                let value = self.codegen_ir(value)?;
                self.body.push(IrInstruction::Return(value));
                Ok(())
            }
            StmtKind::Block { statements } => {
                for s in statements {
                    self.codegen_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Expression(expr) => {
                let ty = self.cx.expr_type(expr)?;
                if !is_compile_time_type(self.cx, ty) {
                    self.codegen_ir(expr)?;
                }
                Ok(())
            }
            // Lowered separately by `declaration_codegen_ir`
            StmtKind::Function(_) | StmtKind::Null => Ok(()),
        }
    }

    /// Emit the instructions computing `id`; returns the register holding it
    fn codegen_ir(&mut self, id: ExprId) -> SemaResult<IrVariable> {
        let id = self.cx.arena().resolved(id);
        let (kind, ty, span) = {
            let arena = self.cx.arena();
            let expr = &arena.exprs[id];
            (expr.kind.clone(), expr.ty, expr.span)
        };
        let ty = ty.ok_or_else(|| SemaError::internal("codegen of an unanalyzed expression"))?;

        if self.cx.arena().is_constant(id) {
            let value = const_of(self.cx, id)?;
            let dest = self.variable(ty)?;
            self.body.push(IrInstruction::Const { dest, value });
            return Ok(dest);
        }

        match kind {
            ExprKind::Identifier { target, name } => {
                let target =
                    target.ok_or_else(|| SemaError::internal(format!("unresolved identifier `{name}`")))?;
                self.reference(target, ty)
            }
            ExprKind::Parameter { .. } | ExprKind::Variable { .. } | ExprKind::Entity { .. } => {
                self.reference(id, ty)
            }
            ExprKind::Call { function, args } => self.call(function, &args, ty),
            ExprKind::FieldAccess { base, index } => {
                let base = self.codegen_ir(base)?;
                let dest = self.variable(ty)?;
                self.body.push(IrInstruction::Member { dest, base, index });
                Ok(dest)
            }
            ExprKind::StructValue { fields, .. } | ExprKind::PackValue(fields) => {
                let fields = fields
                    .iter()
                    .map(|f| self.codegen_ir(*f))
                    .collect::<SemaResult<Vec<_>>>()?;
                let dest = self.variable(ty)?;
                self.body.push(IrInstruction::Aggregate { dest, fields });
                Ok(dest)
            }
            ExprKind::List(items) => {
                let mut last = None;
                for item in items {
                    last = Some(self.codegen_ir(item)?);
                }
                last.ok_or_else(|| SemaError::unimplemented("empty expression list", span))
            }
            other => Err(SemaError::unimplemented(
                format!("{} at run time", other.describe()),
                span,
            )),
        }
    }

    /// Register holding the value a declaration node denotes
    fn reference(&mut self, target: ExprId, ty: TypeId) -> SemaResult<IrVariable> {
        if let Some(var) = self.locals.get(&target) {
            return Ok(*var);
        }
        let (kind, name, span) = {
            let arena = self.cx.arena();
            let expr = &arena.exprs[target];
            (expr.kind.clone(), expr.name, expr.span)
        };
        let name = match kind {
            ExprKind::Entity { module } => {
                let path: Vec<&str> = module.iter().map(Symbol::as_str).collect();
                format!("{}::{}", path.join("."), name.map(|n| n.as_str()).unwrap_or("_"))
            }
            ExprKind::Variable { .. } => global_name(self.cx, target),
            other => {
                return Err(SemaError::unimplemented(
                    format!("reference to a {} at run time", other.describe()),
                    span,
                ))
            }
        };
        let dest = self.variable(ty)?;
        self.body.push(IrInstruction::LoadGlobal { dest, name });
        Ok(dest)
    }

    fn call(&mut self, function: FunctionId, args: &[Option<ExprId>], ty: TypeId) -> SemaResult<IrVariable> {
        let (intrinsic, params) = {
            let arena = self.cx.arena();
            let f = &arena.functions[function];
            (f.intrinsic, f.params.clone())
        };

        // Left-out arguments come from the value being replaced.
        let mut values = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let value = match arg {
                Some(arg) => self.codegen_ir(*arg)?,
                None => {
                    let default = match &self.cx.arena().exprs[params[i]].kind {
                        ExprKind::Parameter { default, .. } => *default,
                        _ => ParamDefault::Required,
                    };
                    let ParamDefault::SelfField(index) = default else {
                        return Err(SemaError::internal("required argument left out"));
                    };
                    let base = *values
                        .first()
                        .ok_or_else(|| SemaError::internal("defaulted argument before its source"))?;
                    let field_ty = self.cx.expr_type(params[i])?;
                    let dest = self.variable(field_ty)?;
                    self.body.push(IrInstruction::Member { dest, base, index });
                    dest
                }
            };
            values.push(value);
        }

        let dest = self.variable(ty)?;
        let instruction = match intrinsic {
            None => IrInstruction::Call {
                dest,
                function: mangled_name(self.cx, function),
                args: values,
            },
            Some(Intrinsic::Binary(op)) => IrInstruction::Intrinsic {
                dest,
                op: op.to_string(),
                args: values,
            },
            Some(Intrinsic::Unary(op)) => IrInstruction::Intrinsic {
                dest,
                op: op.to_string(),
                args: values,
            },
            Some(Intrinsic::ConvertToSized(_)) => IrInstruction::Intrinsic {
                dest,
                op: "convert".into(),
                args: values,
            },
            Some(Intrinsic::Aggregate(_)) => IrInstruction::Aggregate { dest, fields: values },
            // The replaced value itself is not part of the result.
            Some(Intrinsic::Replace(_)) => IrInstruction::Aggregate {
                dest,
                fields: values.into_iter().skip(1).collect(),
            },
            Some(Intrinsic::SizedType { .. }) => {
                return Err(SemaError::internal("type construction reached codegen"))
            }
        };
        self.body.push(instruction);
        Ok(dest)
    }
}

/// IR of every runtime entity of `module`, including instance members
pub fn module_codegen_ir(cx: &Sema, module: ExprId) -> SemaResult<IrModule> {
    let (name, statements) = match &cx.arena().exprs[module].kind {
        ExprKind::Module(data) => (data.dotted_name(), data.statements.clone()),
        _ => return Err(SemaError::internal("codegen of a non-module")),
    };
    let mut entities = Vec::new();
    for stmt in statements {
        entities.extend(declaration_codegen_ir(cx, stmt)?);
    }

    let literals = cx.instance_literals.borrow().clone();
    for literal in literals {
        let definitions = {
            let arena = cx.arena();
            if arena.scopes[arena.exprs[literal].scope].module != Some(module) {
                continue;
            }
            match &arena.exprs[literal].kind {
                ExprKind::Instance { ty, .. } => match arena.type_kind(*ty) {
                    TypeKind::Instance(inst) => inst.definitions.clone(),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            }
        };
        for definition in definitions {
            if let Some(ir) = function_codegen_ir(cx, definition)? {
                entities.push(IrEntity::Function(ir));
            }
        }
    }
    log::info!("generated IR for `{name}`: {} entities", entities.len());
    Ok(IrModule { name, entities })
}
