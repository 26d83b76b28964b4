//! Source-like rendering of analyzed nodes.
//!
//! Used by logs, diagnostics and tests. Resolved operator and postfix nodes
//! print as written; folded nodes print as their value.

use std::fmt::Write;

use crate::arena::Arena;
use crate::expr::ExprKind;
use crate::ids::{ExprId, StmtId};
use crate::stmt::StmtKind;
use crate::types::TypeKind;

const INDENT: &str = "    ";

pub fn print_expr(arena: &Arena, id: ExprId) -> String {
    let mut printer = Printer::new(arena);
    printer.expr(id);
    printer.out
}

pub fn print_stmt(arena: &Arena, id: StmtId) -> String {
    let mut printer = Printer::new(arena);
    printer.stmt(id);
    printer.out
}

struct Printer<'a> {
    arena: &'a Arena,
    out: String,
    depth: usize,
}

impl<'a> Printer<'a> {
    fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            out: String::new(),
            depth: 0,
        }
    }

    fn list(&mut self, items: &[ExprId]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(*item);
        }
    }

    fn name_of(&self, id: ExprId) -> String {
        self.arena.exprs[id]
            .name
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("_{}", id.0))
    }

    fn expr(&mut self, id: ExprId) {
        let arena = self.arena;
        match &arena.exprs[id].kind {
            ExprKind::Integer(v) => {
                let _ = write!(self.out, "{v}");
            }
            ExprKind::Boolean(b) => {
                let _ = write!(self.out, "{b}");
            }
            ExprKind::SizedInteger { value, ty } => {
                let _ = write!(self.out, "{}({value})", arena.type_name(*ty));
            }
            ExprKind::Identifier { name, .. } => {
                let _ = write!(self.out, "{name}");
            }
            ExprKind::Postfix {
                base,
                bracket,
                args,
                designators,
                ..
            } => {
                self.expr(*base);
                self.out.push(bracket.open());
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(Some(name)) = designators.get(i) {
                        let _ = write!(self.out, ".{name} = ");
                    }
                    self.expr(*arg);
                }
                self.out.push(bracket.close());
            }
            ExprKind::Member { base, name, .. } => {
                self.expr(*base);
                let _ = write!(self.out, ".{name}");
            }
            ExprKind::Binary { op, lhs, rhs, .. } => {
                self.out.push('(');
                self.expr(*lhs);
                let _ = write!(self.out, " {op} ");
                self.expr(*rhs);
                self.out.push(')');
            }
            ExprKind::Unary { op, operand, .. } => {
                let _ = write!(self.out, "{op}");
                self.expr(*operand);
            }
            ExprKind::Call { function, args } => {
                let _ = write!(self.out, "{}(", arena.functions[*function].name);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match arg {
                        Some(arg) => self.expr(*arg),
                        None => self.out.push('_'),
                    }
                }
                self.out.push(')');
            }
            ExprKind::FieldAccess { base, index } => {
                self.expr(*base);
                let field = arena.exprs[*base].ty.and_then(|ty| match arena.type_kind(ty) {
                    TypeKind::Struct(s) => s
                        .fields
                        .as_ref()
                        .and_then(|f| f.get(*index))
                        .map(|f| f.name.to_string()),
                    _ => None,
                });
                let _ = write!(self.out, ".{}", field.unwrap_or_else(|| index.to_string()));
            }
            ExprKind::StructLiteral { ty } => {
                let members = match arena.type_kind(*ty) {
                    TypeKind::Struct(s) => s.members.clone(),
                    _ => Vec::new(),
                };
                self.out.push_str("struct {");
                for member in members {
                    self.out.push(' ');
                    self.stmt_inline(member);
                }
                self.out.push_str(" }");
            }
            ExprKind::StructValue { ty, fields } => {
                let _ = write!(self.out, "{}{{", arena.type_name(*ty));
                self.list(fields);
                self.out.push('}');
            }
            ExprKind::TypeExpr(ty) | ExprKind::Instance { ty, .. } => {
                self.out.push_str(&arena.type_name(*ty));
            }
            ExprKind::OverloadSet(ty) => match arena.type_kind(*ty) {
                TypeKind::OverloadSet { name, .. } => {
                    let _ = write!(self.out, "{name}");
                }
                _ => self.out.push_str(&arena.type_name(*ty)),
            },
            ExprKind::Typeclass(ty) => {
                let _ = write!(self.out, "typeclass {}", arena.type_name(*ty));
            }
            ExprKind::Pack { pattern } => {
                self.expr(*pattern);
                self.out.push_str("...");
            }
            ExprKind::PackValue(items) => {
                self.out.push('[');
                self.list(items);
                self.out.push(']');
            }
            ExprKind::Parameter { .. } | ExprKind::Variable { .. } | ExprKind::DataMember { .. } => {
                let name = self.name_of(id);
                self.out.push_str(&name);
            }
            ExprKind::Entity { module } => {
                let path: Vec<&str> = module.iter().map(|s| s.as_str()).collect();
                let _ = write!(self.out, "{}.{}", path.join("."), self.name_of(id));
            }
            ExprKind::List(items) => {
                self.out.push('(');
                self.list(items);
                self.out.push(')');
            }
            ExprKind::Module(data) => {
                let _ = write!(self.out, "module {}", data.dotted_name());
            }
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    /// Statement without leading indentation or trailing newline
    fn stmt_inline(&mut self, id: StmtId) {
        let arena = self.arena;
        match &arena.stmts[id].kind {
            StmtKind::Declaration(decl) => {
                if decl.exported {
                    self.out.push_str("export ");
                }
                let _ = write!(self.out, "let {}", decl.name);
                if let Some(ty) = decl.type_expr {
                    self.out.push_str(": ");
                    self.expr(ty);
                }
                if let Some(init) = decl.init {
                    self.out.push_str(" = ");
                    self.expr(init);
                }
                self.out.push(';');
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.expr(*condition);
                self.out.push_str(") ");
                self.stmt_inline(*then_branch);
                if let Some(otherwise) = else_branch {
                    self.out.push_str(" else ");
                    self.stmt_inline(*otherwise);
                }
            }
            StmtKind::Return { value } => {
                self.out.push_str("return ");
                self.expr(*value);
                self.out.push(';');
            }
            StmtKind::Block { statements } => {
                self.out.push_str("{\n");
                self.depth += 1;
                for s in statements {
                    self.stmt(*s);
                }
                self.depth -= 1;
                self.indent();
                self.out.push('}');
            }
            StmtKind::Function(function) => {
                let f = &arena.functions[*function];
                if f.exported {
                    self.out.push_str("export ");
                }
                let _ = write!(self.out, "function {}(", f.name);
                for (i, param) in f.params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let name = self.name_of(*param);
                    self.out.push_str(&name);
                    match &arena.exprs[*param].kind {
                        ExprKind::Parameter {
                            type_expr: Some(ty),
                            ..
                        } => {
                            self.out.push_str(": ");
                            self.expr(*ty);
                        }
                        _ => {
                            if let Some(ty) = arena.exprs[*param].ty {
                                let _ = write!(self.out, ": {}", arena.type_name(ty));
                            }
                        }
                    }
                }
                self.out.push(')');
                if let Some(ret) = f.return_type {
                    let _ = write!(self.out, " -> {}", arena.type_name(ret));
                }
                match f.body {
                    Some(body) => {
                        self.out.push(' ');
                        self.stmt_inline(body);
                    }
                    None => self.out.push(';'),
                }
            }
            StmtKind::Expression(e) => {
                self.expr(*e);
                self.out.push(';');
            }
            StmtKind::Null => self.out.push(';'),
        }
    }

    fn stmt(&mut self, id: StmtId) {
        self.indent();
        self.stmt_inline(id);
        self.out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::StmtKind;
    use vapc_ast::BinOp;
    use vapc_util::{Span, Symbol};

    #[test]
    fn test_prints_nested_binary() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let one = arena.alloc_expr(ExprKind::Integer(1), Span::DUMMY, scope);
        let x = arena.alloc_expr(
            ExprKind::Identifier {
                name: Symbol::intern("x"),
                target: None,
            },
            Span::DUMMY,
            scope,
        );
        let sum = arena.alloc_expr(
            ExprKind::Binary {
                op: BinOp::Add,
                lhs: x,
                rhs: one,
                resolved: None,
            },
            Span::DUMMY,
            scope,
        );
        assert_eq!(print_expr(&arena, sum), "(x + 1)");
    }

    #[test]
    fn test_prints_block_with_indentation() {
        let mut arena = Arena::new();
        let scope = arena.new_root_scope();
        let value = arena.alloc_expr(ExprKind::Boolean(true), Span::DUMMY, scope);
        let ret = arena.alloc_stmt(StmtKind::Return { value }, Span::DUMMY, scope);
        let null = arena.alloc_stmt(StmtKind::Null, Span::DUMMY, scope);
        let block = arena.alloc_stmt(
            StmtKind::Block {
                statements: vec![ret, null],
            },
            Span::DUMMY,
            scope,
        );
        assert_eq!(print_stmt(&arena, block), "{\n    return true;\n    ;\n}\n");
    }
}
