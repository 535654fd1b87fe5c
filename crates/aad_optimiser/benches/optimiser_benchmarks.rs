//! Benchmarks for aad_optimiser.

use aad_core::ad::{AadFactory, DifferentiableVariable, RetentionPolicy};
use aad_core::traits::RandomVariableFactory;
use aad_core::types::{AadError, VectorValue};
use aad_optimiser::solvers::{LMConfig, LevenbergMarquardtSolver, NormalEquations};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic pseudo-uniform samples in [0, 1).
fn generate_samples(n: usize, seed: f64) -> Vec<f64> {
    (0..n)
        .map(|i| ((i as f64 + seed) * 0.618_033_988_75).fract())
        .collect()
}

fn polynomial(
    params: &[DifferentiableVariable],
    x: &VectorValue,
) -> Result<DifferentiableVariable, AadError> {
    let mut value = params[params.len() - 1].clone();
    for coefficient in params.iter().rev().skip(1) {
        value = coefficient.add_product(&value, x)?;
    }
    Ok(value)
}

fn benchmark_normal_equations(c: &mut Criterion) {
    let mut group = c.benchmark_group("normal_equations");

    for size in [10_000, 100_000] {
        let x = VectorValue::new(0.0, generate_samples(size, 0.0));
        let columns: Vec<VectorValue> = (0..10).map(|k| x.pow(k as f64)).collect();
        let residual = VectorValue::new(0.0, generate_samples(size, 0.5));
        let weights = VectorValue::scalar(1.0);

        group.bench_with_input(BenchmarkId::new("assemble", size), &columns, |b, columns| {
            b.iter(|| NormalEquations::assemble(black_box(columns), &weights, &residual, size))
        });
    }

    group.finish();
}

fn benchmark_polynomial_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("lm_polynomial");
    group.sample_size(10);

    for size in [1_000, 10_000] {
        let xs = generate_samples(size, 0.0);
        let target: Vec<f64> = xs.iter().map(|x| 1.0 - x + 0.5 * x * x).collect();
        let x = VectorValue::new(0.0, xs);
        let target = VectorValue::new(0.0, target);

        group.bench_with_input(BenchmarkId::from_parameter(size), &x, |b, x| {
            b.iter(|| {
                let factory = AadFactory::new(RetentionPolicy::Tape);
                let params: Vec<_> = (0..10)
                    .map(|_| factory.create_scalar_leaf(0.0, 0.0))
                    .collect();
                let mut solver =
                    LevenbergMarquardtSolver::new(params, target.clone(), LMConfig::fast())
                        .unwrap();
                solver.solve(|p| polynomial(p, black_box(x))).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_normal_equations,
    benchmark_polynomial_calibration
);
criterion_main!(benches);
