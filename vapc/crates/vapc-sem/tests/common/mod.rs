//! Shared fixtures for the vapc-sem integration tests.
//!
//! Programs are built with `vapc_ast::build` instead of parsed, so every
//! test states its input tree directly.

#![allow(dead_code)]

use vapc_ast::build::*;
use vapc_ast::{Module, Stmt};
use vapc_sem::{ExprKind, IrModule, ModuleInterface, SemaConfig, SemaResult, Session};

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A session plus the helpers tests keep reaching for
pub struct SessionFixture {
    pub session: Session,
}

impl SessionFixture {
    pub fn new() -> Self {
        Self::with_config(SemaConfig::default())
    }

    pub fn with_config(config: SemaConfig) -> Self {
        init_logging();
        Self {
            session: Session::new(config).expect("valid configuration"),
        }
    }

    /// Run every phase on `module`
    pub fn compile(&mut self, module: &Module) -> SemaResult<IrModule> {
        self.session.compile(module)
    }

    pub fn import(&mut self, interface: &ModuleInterface) {
        self.session.import(interface).expect("interface imports");
    }

    /// Integer value the top-level `name` folded to
    pub fn int(&self, name: &str) -> Option<i64> {
        let value = self.session.value_of(name)?;
        match self.session.context().arena().exprs[value].kind {
            ExprKind::Integer(v) => Some(v),
            _ => None,
        }
    }
}

/// function fact(n: int) -> int { if (n <= 1) { return 1; } return n * fact(n - 1); }
pub fn factorial() -> Stmt {
    function(
        "fact",
        vec![param("n", ident("int"))],
        Some(ident("int")),
        vec![
            if_(le(ident("n"), int(1)), vec![ret(int(1))]),
            ret(mul(
                ident("n"),
                call(ident("fact"), vec![sub(ident("n"), int(1))]),
            )),
        ],
    )
}

/// `function entry() -> int { <body> }`
pub fn entry(body: Vec<Stmt>) -> Stmt {
    function("entry", vec![], Some(ident("int")), body)
}

/// A library exporting a struct and functions over it, plus a struct it
/// only exposes through a return type
///
/// ```text
/// export let point = struct { let x: int; let y: int; };
/// let secret = struct { let v: int; };
/// export function norm(p: point) -> int { return p.x * p.x + p.y * p.y; }
/// export function origin() -> secret { return secret{0}; }
/// ```
pub fn geometry() -> Module {
    module(
        "geometry",
        vec![
            export(let_(
                "point",
                struct_lit(vec![field("x", ident("int")), field("y", ident("int"))]),
            )),
            let_("secret", struct_lit(vec![field("v", ident("int"))])),
            export(function(
                "norm",
                vec![param("p", ident("point"))],
                Some(ident("int")),
                vec![ret(add(
                    mul(member(ident("p"), "x"), member(ident("p"), "x")),
                    mul(member(ident("p"), "y"), member(ident("p"), "y")),
                ))],
            )),
            export(function(
                "origin",
                vec![],
                Some(ident("secret")),
                vec![ret(brace(ident("secret"), vec![arg(int(0))]))],
            )),
        ],
    )
}

/// Interface of [`geometry`], produced by a session of its own
pub fn geometry_interface() -> ModuleInterface {
    let mut fixture = SessionFixture::new();
    fixture.compile(&geometry()).expect("geometry compiles");
    fixture.session.interface().expect("geometry has an interface")
}
