//! Edge case tests for vapc-sem

#[cfg(test)]
mod tests {
    use crate::*;
    use vapc_ast::build::*;
    use vapc_ast::{BinOp, Module, Stmt};

    fn analyzed(m: &Module) -> SemaResult<Session> {
        let mut session = Session::new(SemaConfig::default())?;
        session.preanalyze(m)?;
        session.analyze()?;
        Ok(session)
    }

    fn analysis_error(m: &Module) -> SemaError {
        match analyzed(m) {
            Ok(_) => panic!("analysis of `{}` succeeded", m.dotted_name()),
            Err(err) => err,
        }
    }

    fn simplify_error(config: SemaConfig, m: &Module) -> SemaError {
        let mut session = Session::new(config).unwrap();
        session.preanalyze(m).unwrap();
        session.analyze().unwrap();
        session.simplify_to_fixpoint().unwrap_err()
    }

    fn show_typeclass() -> Stmt {
        let_(
            "Show",
            typeclass(
                &["T"],
                vec![signature("show", vec![param("x", ident("T"))], ident("int"))],
            ),
        )
    }

    fn show_instance(param_type: &str) -> Stmt {
        let_(
            "ShowIt",
            instance(
                ident("Show"),
                vec![ident("int")],
                vec![function(
                    "show",
                    vec![param("x", ident(param_type))],
                    Some(ident("int")),
                    vec![ret(int(0))],
                )],
            ),
        )
    }

    // ==================== CONSTANT EVALUATION TESTS ====================

    /// EDGE CASE: Integer overflow is a compile error, not a wrap
    #[test]
    fn test_edge_integer_overflow() {
        let err = simplify_error(
            SemaConfig::default(),
            &module("lib", vec![let_("x", add(int(i64::MAX), int(1)))]),
        );
        assert!(matches!(err, SemaError::ConstantEvaluation { .. }), "{err}");
    }

    /// EDGE CASE: Division by a constant zero
    #[test]
    fn test_edge_division_by_zero() {
        let err = simplify_error(
            SemaConfig::default(),
            &module("lib", vec![let_("x", binary(BinOp::Div, int(1), int(0)))]),
        );
        assert!(err.to_string().contains("divides by zero"), "{err}");
    }

    /// EDGE CASE: Value outside the range of a sized integer
    #[test]
    fn test_edge_sized_conversion_out_of_range() {
        let err = simplify_error(
            SemaConfig::default(),
            &module(
                "lib",
                vec![let_("x", call(call(ident("uint"), vec![int(8)]), vec![int(256)]))],
            ),
        );
        assert!(err.to_string().contains("does not fit"), "{err}");
    }

    /// EDGE CASE: Zero-width sized integer type
    #[test]
    fn test_edge_zero_width_type() {
        let err = analysis_error(&module(
            "lib",
            vec![let_typed("x", call(ident("sint"), vec![int(0)]), int(0))],
        ));
        assert!(matches!(err, SemaError::ConstantEvaluation { .. }), "{err}");
    }

    // ==================== FIXPOINT TESTS ====================

    /// EDGE CASE: Round cap reached before the program settles
    #[test]
    fn test_edge_round_cap() {
        let config = SemaConfig {
            max_simplify_rounds: 1,
            ..SemaConfig::default()
        };
        let err = simplify_error(config, &module("lib", vec![let_("x", add(int(1), int(2)))]));
        assert_eq!(err, SemaError::NoFixpoint { rounds: 1 });
    }

    /// EDGE CASE: Nested calls past the depth limit stay unfolded
    #[test]
    fn test_edge_specialization_depth_limit() {
        let config = SemaConfig {
            max_specialization_depth: 2,
            ..SemaConfig::default()
        };
        let mut session = Session::new(config).unwrap();
        session
            .preanalyze(&module(
                "lib",
                vec![
                    function(
                        "down",
                        vec![param("n", ident("int"))],
                        Some(ident("int")),
                        vec![
                            if_(eq(ident("n"), int(0)), vec![ret(int(0))]),
                            ret(call(ident("down"), vec![sub(ident("n"), int(1))])),
                        ],
                    ),
                    let_("shallow", call(ident("down"), vec![int(1)])),
                    let_("deep", call(ident("down"), vec![int(5)])),
                ],
            ))
            .unwrap();
        session.analyze().unwrap();
        session.simplify_to_fixpoint().unwrap();
        let arena = session.context().arena();
        let shallow = session.value_of("shallow").unwrap();
        let deep = session.value_of("deep").unwrap();
        assert!(matches!(arena.exprs[shallow].kind, ExprKind::Integer(0)));
        assert!(matches!(arena.exprs[deep].kind, ExprKind::Call { .. }));
    }

    /// EDGE CASE: Recursion far deeper than the depth limit settles quickly
    #[test]
    fn test_edge_deep_recursion_left_unfolded() {
        let mut session = Session::new(SemaConfig::default()).unwrap();
        session
            .preanalyze(&module(
                "lib",
                vec![
                    function(
                        "down",
                        vec![param("n", ident("int"))],
                        Some(ident("int")),
                        vec![
                            if_(eq(ident("n"), int(0)), vec![ret(int(0))]),
                            ret(call(ident("down"), vec![sub(ident("n"), int(1))])),
                        ],
                    ),
                    let_("deep", call(ident("down"), vec![int(100)])),
                    let_("near", call(ident("down"), vec![int(20)])),
                ],
            ))
            .unwrap();
        session.analyze().unwrap();

        let started = std::time::Instant::now();
        session.simplify_to_fixpoint().unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed < std::time::Duration::from_secs(10), "{elapsed:?}");

        let arena = session.context().arena();
        let deep = session.value_of("deep").unwrap();
        let near = session.value_of("near").unwrap();
        assert!(matches!(arena.exprs[deep].kind, ExprKind::Call { .. }));
        assert!(matches!(arena.exprs[near].kind, ExprKind::Integer(0)));
    }

    /// EDGE CASE: Empty module compiles to an empty IR module
    #[test]
    fn test_edge_empty_module() {
        let mut session = Session::new(SemaConfig::default()).unwrap();
        let ir = session.compile(&module("lib", vec![])).unwrap();
        assert_eq!(ir.name, "lib");
        assert!(ir.entities.is_empty());
        assert_eq!(session.phase(), Phase::Fixpoint);
    }

    // ==================== TYPE CHECKING TESTS ====================

    /// EDGE CASE: Annotation disagrees with the initializer
    #[test]
    fn test_edge_type_mismatch() {
        let err = analysis_error(&module(
            "lib",
            vec![let_typed("x", ident("bool"), int(1))],
        ));
        assert_eq!(
            err.to_string(),
            "type mismatch: expected `bool`, found `int`"
        );
    }

    /// EDGE CASE: A value used where a type is expected
    #[test]
    fn test_edge_value_as_type() {
        let err = analysis_error(&module("lib", vec![let_typed("x", int(5), int(5))]));
        assert!(matches!(err, SemaError::NotAType { .. }), "{err}");
    }

    /// EDGE CASE: Local declarations are not visible before they appear
    #[test]
    fn test_edge_local_use_before_declaration() {
        let err = analysis_error(&module(
            "lib",
            vec![function(
                "f",
                vec![],
                Some(ident("int")),
                vec![ret(ident("later")), let_("later", int(1))],
            )],
        ));
        assert!(
            matches!(&err, SemaError::FailedLookup { name, .. } if name == "later"),
            "{err}"
        );
    }

    /// EDGE CASE: Redeclaring a local in the same function
    #[test]
    fn test_edge_local_redeclaration() {
        let mut session = Session::new(SemaConfig::default()).unwrap();
        let err = session
            .preanalyze(&module(
                "lib",
                vec![function(
                    "f",
                    vec![],
                    Some(ident("int")),
                    vec![let_("a", int(1)), let_("a", int(2)), ret(ident("a"))],
                )],
            ))
            .unwrap_err();
        assert!(matches!(err, SemaError::Redeclaration { .. }), "{err}");
    }

    // ==================== OVERLOAD TESTS ====================

    /// EDGE CASE: Two overloads taking the same parameter types
    #[test]
    fn test_edge_duplicate_overload() {
        let f = || function("f", vec![param("x", ident("int"))], Some(ident("int")), vec![ret(ident("x"))]);
        let err = analysis_error(&module(
            "lib",
            vec![f(), f(), let_("y", call(ident("f"), vec![int(1)]))],
        ));
        assert!(matches!(err, SemaError::DuplicateOverload { .. }), "{err}");
    }

    /// EDGE CASE: A single argument matches both a plain and a pack parameter
    #[test]
    fn test_edge_ambiguous_pack_overload() {
        let err = analysis_error(&module(
            "lib",
            vec![
                function("f", vec![param("x", ident("int"))], Some(ident("int")), vec![ret(int(1))]),
                function("f", vec![param("xs", pack(ident("int")))], Some(ident("int")), vec![ret(int(2))]),
                let_("y", call(ident("f"), vec![int(1)])),
            ],
        ));
        assert!(
            matches!(err, SemaError::AmbiguousOverload { count: 2, .. }),
            "{err}"
        );
    }

    /// EDGE CASE: Designated argument naming no parameter
    #[test]
    fn test_edge_unknown_designator() {
        let err = analysis_error(&module(
            "lib",
            vec![
                let_("foo", struct_lit(vec![field("i", ident("int"))])),
                let_("bar", brace(ident("foo"), vec![arg(int(1))])),
                let_("baz", brace(ident("bar"), vec![designated("k", int(2))])),
            ],
        ));
        assert!(matches!(err, SemaError::NoMatchingOverload { .. }), "{err}");
    }

    // ==================== ENTRY POINT TESTS ====================

    /// EDGE CASE: Entry function taking parameters
    #[test]
    fn test_edge_entry_with_parameters() {
        let err = analysis_error(&module(
            "main",
            vec![function("entry", vec![param("argc", ident("int"))], Some(ident("int")), vec![ret(int(0))])],
        ));
        assert!(
            matches!(&err, SemaError::InvalidEntryPoint { reason, .. } if reason.contains("parameters")),
            "{err}"
        );
    }

    /// EDGE CASE: Entry function returning something other than int
    #[test]
    fn test_edge_entry_returning_bool() {
        let err = analysis_error(&module(
            "main",
            vec![function("entry", vec![], None, vec![ret(boolean(true))])],
        ));
        assert!(matches!(err, SemaError::InvalidEntryPoint { .. }), "{err}");
    }

    /// EDGE CASE: Entry name bound to a variable
    #[test]
    fn test_edge_entry_not_a_function() {
        let err = analysis_error(&module("main", vec![let_("entry", int(0))]));
        assert!(
            matches!(&err, SemaError::InvalidEntryPoint { reason, .. } if reason == "not a function"),
            "{err}"
        );
    }

    /// EDGE CASE: Entry rules only apply to the entry module
    #[test]
    fn test_edge_entry_name_in_other_module() {
        assert!(analyzed(&module("lib", vec![let_("entry", int(0))])).is_ok());
    }

    // ==================== TYPECLASS TESTS ====================

    /// EDGE CASE: Instance definition with the wrong parameter type
    #[test]
    fn test_edge_instance_signature_mismatch() {
        let err = analysis_error(&module("lib", vec![show_typeclass(), show_instance("bool")]));
        assert!(matches!(err, SemaError::InstanceMismatch { .. }), "{err}");
    }

    /// EDGE CASE: Selecting an instance that was never declared
    #[test]
    fn test_edge_missing_instance() {
        let err = analysis_error(&module(
            "lib",
            vec![
                show_typeclass(),
                show_instance("int"),
                let_("r", call(ident("Show"), vec![ident("bool")])),
            ],
        ));
        assert!(
            matches!(&err, SemaError::InstanceMismatch { reason, .. } if reason.contains("no instance")),
            "{err}"
        );
    }

    /// EDGE CASE: Instance leaving a member undefined
    #[test]
    fn test_edge_instance_missing_member() {
        let err = analysis_error(&module(
            "lib",
            vec![
                show_typeclass(),
                let_("Empty", instance(ident("Show"), vec![ident("int")], vec![])),
            ],
        ));
        assert!(
            matches!(&err, SemaError::InstanceMismatch { reason, .. } if reason.contains("missing definition")),
            "{err}"
        );
    }
}
