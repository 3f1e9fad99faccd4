use criterion::{criterion_group, criterion_main, Criterion};
use rootsat::sat::configs::SolverConfig;
use rootsat::sat::literal::{Literal, PackedLiteral};
use rootsat::sat::solver::Solver;
use std::hint::black_box;

fn lit(value: i32) -> PackedLiteral {
    PackedLiteral::from_i32(value)
}

/// A chain of implications with ternary shortcuts: plenty of work for the
/// prober and the hyper-binary resolver, deterministically generated.
fn chain_formula(num_vars: i32) -> Vec<Vec<PackedLiteral>> {
    let mut clauses = Vec::new();
    for v in 1..num_vars {
        clauses.push(vec![lit(-v), lit(v + 1)]);
    }
    for v in 1..(num_vars - 2) {
        clauses.push(vec![lit(-v), lit(-(v + 1)), lit(v + 2)]);
    }
    for v in 1..(num_vars - 3) {
        clauses.push(vec![lit(-v), lit(v + 1), lit(v + 2), lit(v + 3)]);
    }
    clauses
}

fn build_solver(num_vars: i32) -> Solver<PackedLiteral> {
    let config = SolverConfig {
        max_degree_samples: 10_000,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(config);
    solver.new_vars(num_vars as usize + 1);
    for clause in chain_formula(num_vars) {
        assert!(solver.add_clause(&clause));
    }
    solver
}

fn bench_simplify(c: &mut Criterion) {
    c.bench_function("simplify chain-500", |b| {
        b.iter(|| {
            let mut solver = build_solver(500);
            let status = solver.simplify();
            black_box(status);
        })
    });
}

fn bench_subsume(c: &mut Criterion) {
    c.bench_function("implicit subsume chain-500", |b| {
        b.iter(|| {
            let mut solver = build_solver(500);
            let ok = solver.subsume_and_strengthen_implicit();
            black_box(ok);
        })
    });
}

criterion_group!(benches, bench_simplify, bench_subsume);

criterion_main!(benches);
