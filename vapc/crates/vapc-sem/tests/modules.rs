//! Multi-module tests: interfaces generated by one session and imported by
//! another.

mod common;

use common::{entry, geometry, geometry_interface, SessionFixture};
use pretty_assertions::assert_eq;
use vapc_ast::build::*;
use vapc_sem::{InterfaceEntity, IrInstruction, ModuleInterface, SemaError, TypeReference};

fn point_reference() -> TypeReference {
    TypeReference::UserDefined {
        module: vec!["geometry".into()],
        scopes: vec![],
        name: "point".into(),
    }
}

/// ============================================================================
/// INTERFACE GENERATION TESTS
/// ============================================================================

#[test]
fn test_interface_lists_exports_then_hidden_structs() {
    let interface = geometry_interface();
    assert_eq!(interface.module, vec!["geometry".to_string()]);
    let names: Vec<_> = interface.entities.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["point", "norm", "origin", "secret"]);

    match &interface.entities[1] {
        InterfaceEntity::Function {
            params,
            return_type,
            exported,
            ..
        } => {
            assert!(exported);
            assert_eq!(params.len(), 1);
            assert_eq!(params[0].name, "p");
            assert_eq!(params[0].ty, point_reference());
            assert_eq!(*return_type, TypeReference::Integer);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        &interface.entities[3],
        InterfaceEntity::Struct { exported: false, fields, .. } if fields.len() == 1
    ));
}

#[test]
fn test_interface_survives_serialization() {
    let interface = geometry_interface();
    let json = interface.to_json().unwrap();
    assert_eq!(ModuleInterface::from_json(&json).unwrap(), interface);
    let bytes = interface.to_bytes().unwrap();
    assert_eq!(ModuleInterface::from_bytes(&bytes).unwrap(), interface);
}

#[test]
fn test_interface_requires_analysis() {
    let mut fixture = SessionFixture::new();
    fixture.session.preanalyze(&geometry()).unwrap();
    assert!(matches!(
        fixture.session.interface(),
        Err(SemaError::Internal(_))
    ));
}

/// ============================================================================
/// IMPORT TESTS
/// ============================================================================

#[test]
fn test_imported_function_is_called_not_folded() {
    let mut fixture = SessionFixture::new();
    fixture.import(&geometry_interface());
    let mut main = module(
        "main",
        vec![entry(vec![ret(call(
            member(ident("geometry"), "norm"),
            vec![brace(
                member(ident("geometry"), "point"),
                vec![arg(int(3)), arg(int(4))],
            )],
        ))])],
    );
    main.imports.push(import("geometry"));
    let ir = fixture.compile(&main).unwrap();

    let main_fn = ir.function("main::entry()").unwrap();
    assert!(main_fn.is_entry);
    assert!(main_fn.body.iter().any(|i| matches!(
        i,
        IrInstruction::Call { function, .. } if function.starts_with("geometry::norm(")
    )));
    assert!(ir.function("geometry::norm(point)").is_none());
}

#[test]
fn test_hidden_constructor_cannot_be_called_from_outside() {
    let mut fixture = SessionFixture::new();
    fixture.import(&geometry_interface());
    let mut main = module(
        "main",
        vec![entry(vec![
            let_("p", call(member(ident("geometry"), "origin"), vec![])),
            let_("q", brace(ident("p"), vec![arg(int(5))])),
            ret(int(0)),
        ])],
    );
    main.imports.push(import("geometry"));
    let err = fixture.compile(&main).unwrap_err();
    assert!(
        matches!(&err, SemaError::NonExportedConstructor { ty, .. } if ty.contains("secret")),
        "{err}"
    );
}

#[test]
fn test_hidden_struct_is_not_visible_by_name() {
    let mut fixture = SessionFixture::new();
    fixture.import(&geometry_interface());
    let mut main = module(
        "main",
        vec![let_("s", member(ident("geometry"), "secret"))],
    );
    main.imports.push(import("geometry"));
    let err = fixture.compile(&main).unwrap_err();
    assert!(matches!(err, SemaError::FailedLookup { .. }), "{err}");
}

#[test]
fn test_import_of_unknown_module_fails() {
    let mut fixture = SessionFixture::new();
    let mut main = module("main", vec![]);
    main.imports.push(import("nowhere"));
    let err = fixture.session.preanalyze(&main).unwrap_err();
    assert!(
        matches!(&err, SemaError::FailedLookup { name, .. } if name == "nowhere"),
        "{err}"
    );
}

#[test]
fn test_imports_are_closed_after_preanalysis() {
    let mut fixture = SessionFixture::new();
    fixture.session.preanalyze(&module("lib", vec![])).unwrap();
    assert!(matches!(
        fixture.session.import(&geometry_interface()),
        Err(SemaError::Internal(_))
    ));
}
