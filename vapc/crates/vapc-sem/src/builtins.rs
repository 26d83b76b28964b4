//! Builtin types and their operators.
//!
//! One [`Builtins`] is created per session before anything is analyzed. It
//! owns the root scope every module scope hangs off, which binds `int`,
//! `bool`, `type` and the sized integer constructors `sint` / `uint`.
//!
//! Operators are ordinary compiler-made functions carrying an
//! [`Intrinsic`]; candidate lookup for builtin types is a map lookup by
//! operand type and call syntax.

use std::cell::RefCell;

use vapc_ast::{BinOp, Bracket, UnOp};
use vapc_util::{sym, FxHashMap, Span, Symbol};

use crate::arena::Arena;
use crate::context::Sema;
use crate::expr::{ExprKind, ParamDefault};
use crate::function::Intrinsic;
use crate::ids::{ExprId, FunctionId, ScopeId, TypeId};
use crate::overload::CallSyntax;
use crate::types::{Type, TypeKind};

const ARITHMETIC: [BinOp; 5] = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Rem];
const COMPARISON: [BinOp; 6] = [
    BinOp::Eq,
    BinOp::Ne,
    BinOp::Lt,
    BinOp::Le,
    BinOp::Gt,
    BinOp::Ge,
];

#[derive(Debug)]
pub struct Builtins {
    pub int: TypeId,
    pub bool: TypeId,
    /// The type of type expressions
    pub type_: TypeId,
    /// Root scope, parent of every module scope
    pub scope: ScopeId,
    pub sint: FunctionId,
    pub uint: FunctionId,
    operators: RefCell<FxHashMap<(TypeId, CallSyntax), FunctionId>>,
}

impl Builtins {
    pub fn new(arena: &mut Arena) -> Self {
        let scope = arena.new_root_scope();

        let builtin = |arena: &mut Arena, kind: TypeKind, name: Symbol| {
            let member_scope = arena.clone_for_class(scope);
            arena.close_scope(member_scope);
            let mut ty = Type::new(kind, member_scope);
            ty.name = Some(name);
            ty.exported = true;
            arena.alloc_type(ty)
        };
        let int = builtin(arena, TypeKind::Integer, sym::INT);
        let bool = builtin(arena, TypeKind::Boolean, sym::BOOL);
        let type_ = builtin(arena, TypeKind::Type, sym::TYPE);

        for (name, ty) in [(sym::INT, int), (sym::BOOL, bool), (sym::TYPE, type_)] {
            let expr = arena.alloc_typed_expr(ExprKind::TypeExpr(ty), type_, Span::DUMMY, scope);
            arena.exprs[expr].name = Some(name);
            bind(arena, scope, name, expr);
        }

        let sized = |arena: &mut Arena, name: Symbol, signed: bool| {
            let function = arena.synthesize_function(
                name,
                &[(Symbol::intern("width"), int, ParamDefault::Required)],
                type_,
                Intrinsic::SizedType { signed },
                scope,
            );
            arena.functions[function].exported = true;
            let set = arena.alloc_type(Type::new(
                TypeKind::OverloadSet {
                    name,
                    functions: vec![function],
                },
                scope,
            ));
            let expr = arena.alloc_typed_expr(ExprKind::OverloadSet(set), set, Span::DUMMY, scope);
            arena.exprs[expr].name = Some(name);
            bind(arena, scope, name, expr);
            function
        };
        let sint = sized(arena, sym::SINT, true);
        let uint = sized(arena, sym::UINT, false);

        arena.close_scope(scope);
        Self {
            int,
            bool,
            type_,
            scope,
            sint,
            uint,
            operators: RefCell::default(),
        }
    }

    /// Operators on `int` and `bool`
    pub fn install_operators(&self, cx: &Sema) {
        let (int, bool) = (self.int, self.bool);
        for op in ARITHMETIC {
            self.binary(cx, int, op, int);
        }
        for op in COMPARISON {
            self.binary(cx, int, op, bool);
        }
        self.unary(cx, int, UnOp::Neg);
        for op in [BinOp::Eq, BinOp::Ne, BinOp::And, BinOp::Or] {
            self.binary(cx, bool, op, bool);
        }
        self.unary(cx, bool, UnOp::Not);
    }

    /// Operators and the conversion from `int` for a newly interned sized
    /// integer type
    pub fn install_sized_operators(&self, cx: &Sema, ty: TypeId) {
        for op in [BinOp::Add, BinOp::Sub, BinOp::Mul] {
            self.binary(cx, ty, op, ty);
        }
        for op in COMPARISON {
            self.binary(cx, ty, op, self.bool);
        }
        let convert = cx.arena_mut().synthesize_function(
            sym::CONSTRUCTOR,
            &[(Symbol::intern("value"), self.int, ParamDefault::Required)],
            ty,
            Intrinsic::ConvertToSized(ty),
            self.scope,
        );
        self.register(cx, ty, CallSyntax::Bracket(Bracket::Round), convert);
    }

    fn binary(&self, cx: &Sema, operand: TypeId, op: BinOp, result: TypeId) {
        let function = cx.arena_mut().synthesize_function(
            op.symbol(),
            &[
                (Symbol::intern("lhs"), operand, ParamDefault::Required),
                (Symbol::intern("rhs"), operand, ParamDefault::Required),
            ],
            result,
            Intrinsic::Binary(op),
            self.scope,
        );
        self.register(cx, operand, CallSyntax::Binary(op), function);
    }

    fn unary(&self, cx: &Sema, operand: TypeId, op: UnOp) {
        let function = cx.arena_mut().synthesize_function(
            op.symbol(),
            &[(Symbol::intern("operand"), operand, ParamDefault::Required)],
            operand,
            Intrinsic::Unary(op),
            self.scope,
        );
        self.register(cx, operand, CallSyntax::Unary(op), function);
    }

    fn register(&self, cx: &Sema, ty: TypeId, syntax: CallSyntax, function: FunctionId) {
        cx.arena_mut().functions[function].exported = true;
        self.operators.borrow_mut().insert((ty, syntax), function);
    }

    /// The builtin implementation of `syntax` on `ty`, if any
    pub fn operator(&self, ty: TypeId, syntax: CallSyntax) -> Option<FunctionId> {
        self.operators.borrow().get(&(ty, syntax)).copied()
    }
}

fn bind(arena: &mut Arena, scope: ScopeId, name: Symbol, expr: ExprId) {
    if let Some(symbol) = arena.init_symbol(scope, name, Span::DUMMY) {
        arena.symbols[symbol].expr = Some(expr);
        arena.symbols[symbol].exported = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemaConfig;

    #[test]
    fn test_builtin_scope_binds_primitive_names() {
        let cx = Sema::new(SemaConfig::default());
        let arena = cx.arena();
        for name in ["int", "bool", "type", "sint", "uint"] {
            let symbol = arena
                .resolve(cx.builtins.scope, Symbol::intern(name), Span::DUMMY)
                .unwrap();
            assert!(arena.symbols[symbol].expr.is_some(), "{name} is unbound");
        }
    }

    #[test]
    fn test_int_has_arithmetic_and_comparison() {
        let cx = Sema::new(SemaConfig::default());
        let int = cx.builtins.int;
        for op in ARITHMETIC.iter().chain(COMPARISON.iter()) {
            assert!(cx.builtins.operator(int, CallSyntax::Binary(*op)).is_some());
        }
        assert!(cx.builtins.operator(int, CallSyntax::Binary(BinOp::And)).is_none());
        assert!(cx.builtins.operator(int, CallSyntax::Unary(UnOp::Neg)).is_some());
    }

    #[test]
    fn test_comparison_returns_bool() {
        let cx = Sema::new(SemaConfig::default());
        let lt = cx
            .builtins
            .operator(cx.builtins.int, CallSyntax::Binary(BinOp::Lt))
            .unwrap();
        assert_eq!(cx.arena().functions[lt].return_type, Some(cx.builtins.bool));
    }

    #[test]
    fn test_sized_type_gets_conversion() {
        let cx = Sema::new(SemaConfig::default());
        let u8_ty = cx.intern_type(TypeKind::SizedInteger {
            signed: false,
            width: 8,
        });
        let convert = cx
            .builtins
            .operator(u8_ty, CallSyntax::Bracket(Bracket::Round))
            .unwrap();
        let arena = cx.arena();
        assert_eq!(
            arena.functions[convert].intrinsic,
            Some(Intrinsic::ConvertToSized(u8_ty))
        );
        assert_eq!(arena.functions[convert].param_types, Some(vec![cx.builtins.int]));
    }
}
