//! Sessions configured from a `vapc.toml` on disk.

mod common;

use common::{factorial, SessionFixture};
use std::fs;
use vapc_ast::build::*;
use vapc_sem::{SemaConfig, SemaError, Session, CONFIG_FILE_NAME};

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_entry_point_from_file() {
    let (_dir, path) = write_config("entry_module = \"app\"\nentry_function = \"start\"\n");
    let config = SemaConfig::load(&path).unwrap();
    let mut fixture = SessionFixture::with_config(config);
    let ir = fixture
        .compile(&module(
            "app",
            vec![function("start", vec![], Some(ident("int")), vec![ret(int(0))])],
        ))
        .unwrap();
    assert!(ir.function("app::start()").unwrap().is_entry);
}

#[test]
fn test_fold_calls_from_file() {
    let (_dir, path) = write_config("fold_calls = false\n");
    let mut fixture = SessionFixture::with_config(SemaConfig::load(&path).unwrap());
    fixture
        .session
        .preanalyze(&module(
            "lib",
            vec![factorial(), let_("r", call(ident("fact"), vec![int(4)]))],
        ))
        .unwrap();
    fixture.session.analyze().unwrap();
    fixture.session.simplify_to_fixpoint().unwrap();
    assert_eq!(fixture.int("r"), None);
    assert_eq!(fixture.session.stats().specializations, 0);

    // A global left as a runtime call has no constant to emit.
    assert!(matches!(
        fixture.session.codegen(),
        Err(SemaError::Unimplemented { .. })
    ));
}

#[test]
fn test_invalid_config_rejected_by_session() {
    let config = SemaConfig {
        max_specialization_depth: 0,
        ..SemaConfig::default()
    };
    match Session::new(config) {
        Err(SemaError::Config(message)) => {
            assert!(message.contains("max_specialization_depth"), "{message}")
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("session accepted an invalid configuration"),
    }
}

#[test]
fn test_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SemaConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
    let err: SemaError = err.into();
    assert!(matches!(err, SemaError::Config(_)));
}
