//! Terse AST constructors.
//!
//! All nodes get [`Span::DUMMY`] unless wrapped with [`at`] / [`stmt_at`].
//!
//! ```
//! use vapc_ast::build::*;
//!
//! // function twice(x: int) -> int { return x * 2; }
//! let f = function("twice", vec![param("x", ident("int"))], Some(ident("int")), vec![
//!     ret(mul(ident("x"), int(2))),
//! ]);
//! let m = module("main", vec![f]);
//! assert_eq!(m.statements.len(), 1);
//! ```

use vapc_util::{Span, Symbol};

use crate::ast::*;

fn expr(kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: Span::DUMMY,
    }
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt {
        kind,
        span: Span::DUMMY,
    }
}

/// Attach a span to an expression
pub fn at(mut e: Expr, span: Span) -> Expr {
    e.span = span;
    e
}

/// Attach a span to a statement
pub fn stmt_at(mut s: Stmt, span: Span) -> Stmt {
    s.span = span;
    if let StmtKind::Declaration(decl) = &mut s.kind {
        decl.span = span;
    }
    if let StmtKind::Function(func) = &mut s.kind {
        func.span = span;
    }
    s
}

pub fn module(path: &str, statements: Vec<Stmt>) -> Module {
    Module {
        path: path.split('.').map(Symbol::intern).collect(),
        imports: Vec::new(),
        statements,
        span: Span::DUMMY,
    }
}

pub fn import(path: &str) -> Import {
    Import {
        path: path.split('.').map(Symbol::intern).collect(),
        span: Span::DUMMY,
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub fn int(value: i64) -> Expr {
    expr(ExprKind::Integer(value))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::Boolean(value))
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::Identifier(Symbol::intern(name)))
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Add, lhs, rhs)
}

pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Sub, lhs, rhs)
}

pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Mul, lhs, rhs)
}

pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Eq, lhs, rhs)
}

pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Lt, lhs, rhs)
}

pub fn le(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinOp::Le, lhs, rhs)
}

pub fn unary(op: UnOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

/// Positional argument
pub fn arg(value: Expr) -> Argument {
    Argument {
        designator: None,
        value,
    }
}

/// Designated argument `.name = value`
pub fn designated(name: &str, value: Expr) -> Argument {
    Argument {
        designator: Some(Symbol::intern(name)),
        value,
    }
}

pub fn postfix(base: Expr, bracket: Bracket, args: Vec<Argument>) -> Expr {
    expr(ExprKind::Postfix {
        base: Box::new(base),
        bracket,
        args,
    })
}

/// `base(args)`
pub fn call(base: Expr, args: Vec<Expr>) -> Expr {
    postfix(base, Bracket::Round, args.into_iter().map(arg).collect())
}

/// `base{args}`
pub fn brace(base: Expr, args: Vec<Argument>) -> Expr {
    postfix(base, Bracket::Curly, args)
}

pub fn member(base: Expr, name: &str) -> Expr {
    expr(ExprKind::Member {
        base: Box::new(base),
        name: Symbol::intern(name),
    })
}

pub fn struct_lit(members: Vec<Stmt>) -> Expr {
    let members = members
        .into_iter()
        .filter_map(|s| match s.kind {
            StmtKind::Declaration(decl) => Some(decl),
            _ => None,
        })
        .collect();
    expr(ExprKind::Struct(members))
}

pub fn typeclass(params: &[&str], members: Vec<Stmt>) -> Expr {
    expr(ExprKind::Typeclass(TypeclassLiteral {
        params: params.iter().map(|p| Symbol::intern(p)).collect(),
        members: functions_of(members),
    }))
}

pub fn instance(typeclass: Expr, args: Vec<Expr>, members: Vec<Stmt>) -> Expr {
    expr(ExprKind::Instance(InstanceLiteral {
        typeclass: Box::new(typeclass),
        args,
        members: functions_of(members),
    }))
}

pub fn pack(pattern: Expr) -> Expr {
    expr(ExprKind::Pack(Box::new(pattern)))
}

pub fn list(items: Vec<Expr>) -> Expr {
    expr(ExprKind::List(items))
}

fn functions_of(stmts: Vec<Stmt>) -> Vec<FunctionDecl> {
    stmts
        .into_iter()
        .filter_map(|s| match s.kind {
            StmtKind::Function(f) => Some(f),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn declaration(name: &str, ty: Option<Expr>, init: Option<Expr>) -> Stmt {
    stmt(StmtKind::Declaration(Declaration {
        name: Symbol::intern(name),
        ty,
        init,
        exported: false,
        span: Span::DUMMY,
    }))
}

/// `let name = init;`
pub fn let_(name: &str, init: Expr) -> Stmt {
    declaration(name, None, Some(init))
}

/// `let name: ty = init;`
pub fn let_typed(name: &str, ty: Expr, init: Expr) -> Stmt {
    declaration(name, Some(ty), Some(init))
}

/// `let name: ty;`
pub fn field(name: &str, ty: Expr) -> Stmt {
    declaration(name, Some(ty), None)
}

/// Mark a declaration or function as exported
pub fn export(mut s: Stmt) -> Stmt {
    match &mut s.kind {
        StmtKind::Declaration(decl) => decl.exported = true,
        StmtKind::Function(func) => func.exported = true,
        _ => {}
    }
    s
}

pub fn param(name: &str, ty: Expr) -> Param {
    Param {
        name: Symbol::intern(name),
        ty,
        span: Span::DUMMY,
    }
}

pub fn function(
    name: &str,
    params: Vec<Param>,
    return_type: Option<Expr>,
    body: Vec<Stmt>,
) -> Stmt {
    stmt(StmtKind::Function(FunctionDecl {
        name: Symbol::intern(name),
        params,
        return_type,
        body: Some(Block {
            statements: body,
            span: Span::DUMMY,
        }),
        exported: false,
        span: Span::DUMMY,
    }))
}

/// Bodiless function signature, as written inside a typeclass
pub fn signature(name: &str, params: Vec<Param>, return_type: Expr) -> Stmt {
    stmt(StmtKind::Function(FunctionDecl {
        name: Symbol::intern(name),
        params,
        return_type: Some(return_type),
        body: None,
        exported: false,
        span: Span::DUMMY,
    }))
}

pub fn ret(value: Expr) -> Stmt {
    stmt(StmtKind::Return(value))
}

pub fn block_of(statements: Vec<Stmt>) -> Block {
    Block {
        statements,
        span: Span::DUMMY,
    }
}

pub fn block(statements: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(block_of(statements)))
}

pub fn if_(condition: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        condition,
        then_block: block_of(then),
        else_branch: None,
    }))
}

pub fn if_else(condition: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        condition,
        then_block: block_of(then),
        else_branch: Some(Box::new(block(otherwise))),
    }))
}

pub fn expr_stmt(items: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Expression(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_is_split() {
        let m = module("std.math", vec![]);
        assert_eq!(m.dotted_name(), "std.math");
        assert_eq!(m.path.len(), 2);
    }

    #[test]
    fn test_struct_lit_keeps_only_declarations() {
        let s = struct_lit(vec![field("i", ident("int")), ret(int(1)), let_("j", int(2))]);
        match s.kind {
            ExprKind::Struct(members) => {
                let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["i", "j"]);
            }
            other => panic!("expected struct literal, got {other:?}"),
        }
    }

    #[test]
    fn test_stmt_at_propagates_span_to_declaration() {
        let span = Span::new(3, 9, 2, 1);
        let s = stmt_at(export(let_("x", int(1))), span);
        match s.kind {
            StmtKind::Declaration(decl) => {
                assert!(decl.exported);
                assert_eq!(decl.span, span);
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinOp::Le.symbol().as_str(), "operator<=");
        assert_eq!(UnOp::Neg.symbol(), BinOp::Sub.symbol());
        assert_eq!(Bracket::Curly.open(), '{');
    }
}
