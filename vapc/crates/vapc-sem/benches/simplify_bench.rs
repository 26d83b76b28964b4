//! Semantic analysis benchmarks
//!
//! Measures preanalysis plus analysis and the simplification rounds that
//! fold compile-time calls.
//! Run with: `cargo bench --bench simplify_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vapc_ast::build::*;
use vapc_ast::{Module, Stmt};
use vapc_sem::{SemaConfig, Session};

/// function fact(n: int) -> int { if (n <= 1) { return 1; } return n * fact(n - 1); }
fn factorial() -> Stmt {
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

fn factorial_module(n: i64) -> Module {
    module(
        "lib",
        vec![factorial(), let_("r", call(ident("fact"), vec![int(n)]))],
    )
}

/// `let v0 = 1; let v1 = v0 + 1; ...`
fn chain_module(length: usize) -> Module {
    let mut statements = vec![let_("v0", int(1))];
    for i in 1..length {
        statements.push(let_(
            &format!("v{i}"),
            add(ident(&format!("v{}", i - 1)), int(1)),
        ));
    }
    module("lib", statements)
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    for length in [16usize, 64, 256] {
        let m = chain_module(length);
        group.bench_with_input(BenchmarkId::new("chain", length), &m, |b, m| {
            b.iter(|| {
                let mut session = Session::new(SemaConfig::default()).unwrap();
                session.preanalyze(black_box(m)).unwrap();
                session.analyze().unwrap();
                session
            })
        });
    }

    group.finish();
}

fn bench_fixpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixpoint");

    for n in [5i64, 10, 20] {
        let m = factorial_module(n);
        group.bench_with_input(BenchmarkId::new("factorial", n), &m, |b, m| {
            b.iter(|| {
                let mut session = Session::new(SemaConfig::default()).unwrap();
                session.preanalyze(black_box(m)).unwrap();
                session.analyze().unwrap();
                black_box(session.simplify_to_fixpoint().unwrap())
            })
        });
    }

    group.bench_function("factorial_uncached", |b| {
        let m = factorial_module(10);
        let config = SemaConfig {
            cache_specializations: false,
            ..SemaConfig::default()
        };
        b.iter(|| {
            let mut session = Session::new(config.clone()).unwrap();
            session.preanalyze(&m).unwrap();
            session.analyze().unwrap();
            black_box(session.simplify_to_fixpoint().unwrap())
        })
    });

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    group.bench_function("factorial_entry", |b| {
        let m = module(
            "main",
            vec![
                factorial(),
                function(
                    "entry",
                    vec![],
                    Some(ident("int")),
                    vec![ret(call(ident("fact"), vec![int(10)]))],
                ),
            ],
        );
        b.iter(|| {
            let mut session = Session::new(SemaConfig::default()).unwrap();
            black_box(session.compile(&m).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_analysis, bench_fixpoint, bench_compile);
criterion_main!(benches);
