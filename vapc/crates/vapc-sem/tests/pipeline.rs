//! End-to-end tests: build a module, run every phase, inspect the IR.

mod common;

use common::{entry, factorial, SessionFixture};
use pretty_assertions::assert_eq;
use vapc_ast::build::*;
use vapc_sem::{IrConst, IrEntity, IrInstruction, IrType, IrVariable, Phase, SemaConfig, SemaError};
use vapc_util::{SourceMap, Span};

/// ============================================================================
/// COMPILATION TESTS
/// ============================================================================

#[test]
fn test_entry_returning_folded_factorial() {
    let mut fixture = SessionFixture::new();
    let ir = fixture
        .compile(&module(
            "main",
            vec![
                factorial(),
                entry(vec![ret(call(ident("fact"), vec![int(5)]))]),
            ],
        ))
        .unwrap();

    let main = ir.function("main::entry()").expect("entry is lowered");
    assert!(main.is_entry);
    assert_eq!(main.return_type, IrType::Int);
    assert_eq!(
        main.body,
        vec![
            IrInstruction::Const {
                dest: IrVariable(0),
                value: IrConst::Int(120),
            },
            IrInstruction::Return(IrVariable(0)),
        ]
    );
    let fact = ir.function("main::fact(int)").expect("fact is lowered");
    assert_eq!(fact.params.len(), 1);
    assert!(fact
        .body
        .iter()
        .any(|i| matches!(i, IrInstruction::Branch { .. })));
    assert_eq!(fixture.session.phase(), Phase::Fixpoint);
}

#[test]
fn test_global_constants_are_emitted() {
    let mut fixture = SessionFixture::new();
    let ir = fixture
        .compile(&module(
            "lib",
            vec![
                export(let_("limit", mul(int(6), int(7)))),
                let_("enabled", lt(int(1), int(2))),
            ],
        ))
        .unwrap();
    assert_eq!(
        ir.entities,
        vec![
            IrEntity::Constant {
                name: "lib::limit".into(),
                ty: IrType::Int,
                value: IrConst::Int(42),
                exported: true,
            },
            IrEntity::Constant {
                name: "lib::enabled".into(),
                ty: IrType::Bool,
                value: IrConst::Bool(true),
                exported: false,
            },
        ]
    );
}

#[test]
fn test_types_produce_no_ir() {
    let mut fixture = SessionFixture::new();
    let ir = fixture
        .compile(&module(
            "lib",
            vec![
                let_("pair", struct_lit(vec![field("a", ident("int")), field("b", ident("int"))])),
                let_("byte", call(ident("uint"), vec![int(8)])),
            ],
        ))
        .unwrap();
    assert!(ir.entities.is_empty(), "{:?}", ir.entities);
}

#[test]
fn test_runtime_call_is_lowered() {
    let mut fixture = SessionFixture::new();
    let ir = fixture
        .compile(&module(
            "lib",
            vec![
                function(
                    "twice",
                    vec![param("x", ident("int"))],
                    Some(ident("int")),
                    vec![ret(mul(ident("x"), int(2)))],
                ),
                function(
                    "apply",
                    vec![param("y", ident("int"))],
                    Some(ident("int")),
                    vec![ret(call(ident("twice"), vec![ident("y")]))],
                ),
            ],
        ))
        .unwrap();
    let twice = ir.function("lib::twice(int)").unwrap();
    assert!(twice.body.iter().any(
        |i| matches!(i, IrInstruction::Intrinsic { op, .. } if op == "*")
    ));
    let apply = ir.function("lib::apply(int)").unwrap();
    assert!(apply.body.iter().any(
        |i| matches!(i, IrInstruction::Call { function, .. } if function == "lib::twice(int)")
    ));
}

#[test]
fn test_simplification_counts_rounds() {
    let mut fixture = SessionFixture::new();
    fixture
        .session
        .preanalyze(&module("lib", vec![let_("x", add(int(1), int(2)))]))
        .unwrap();
    fixture.session.analyze().unwrap();
    assert_eq!(fixture.session.phase(), Phase::Analyzed);
    let rounds = fixture.session.simplify_to_fixpoint().unwrap();
    assert!(rounds >= 2);
    assert_eq!(fixture.session.stats().simplify_rounds, rounds);
    assert_eq!(fixture.int("x"), Some(3));
}

#[test]
fn test_config_round_cap_applies_to_session() {
    let mut fixture = SessionFixture::with_config(SemaConfig {
        max_simplify_rounds: 1,
        ..SemaConfig::default()
    });
    let err = fixture
        .compile(&module("lib", vec![let_("x", add(int(1), int(2)))]))
        .unwrap_err();
    assert_eq!(err, SemaError::NoFixpoint { rounds: 1 });
}

/// ============================================================================
/// DIAGNOSTIC TESTS
/// ============================================================================

#[test]
fn test_failed_lookup_points_at_identifier() {
    let mut sources = SourceMap::new();
    sources.add_file("main.vap", "let x = 1;\nlet y = z;\n");
    let span = Span::new(19, 20, 2, 9);

    let mut fixture = SessionFixture::new();
    let err = fixture
        .compile(&module(
            "lib",
            vec![let_("x", int(1)), let_("y", at(ident("z"), span))],
        ))
        .unwrap_err();
    assert_eq!(
        err,
        SemaError::FailedLookup {
            name: "z".into(),
            span
        }
    );

    let rendered = fixture.session.render_error(&err, &sources);
    assert!(rendered.starts_with("main.vap:2:9: error[E3001]"), "{rendered}");
    assert!(rendered.contains("let y = z;"), "{rendered}");
    assert!(rendered.contains("^"), "{rendered}");
}

#[test]
fn test_stalled_error_carries_note() {
    let mut fixture = SessionFixture::new();
    let err = fixture
        .compile(&module(
            "lib",
            vec![
                function(
                    "loop_forever",
                    vec![param("n", ident("int"))],
                    None,
                    vec![ret(call(ident("loop_forever"), vec![ident("n")]))],
                ),
                let_("x", call(ident("loop_forever"), vec![int(0)])),
            ],
        ))
        .unwrap_err();
    assert_eq!(err, SemaError::Stalled);
    let rendered = fixture.session.render_error(&err, &SourceMap::new());
    assert!(rendered.contains("E3013"));
    assert!(rendered.contains("return type annotation"));
}

#[test]
fn test_type_mismatch_span_is_the_initializer() {
    let span = Span::new(14, 18, 1, 15);
    let mut fixture = SessionFixture::new();
    let err = fixture
        .compile(&module(
            "lib",
            vec![let_typed("flag", ident("bool"), at(int(1), span))],
        ))
        .unwrap_err();
    assert_eq!(err.span(), span);
    assert!(matches!(err, SemaError::TypeMismatch { .. }));
}
