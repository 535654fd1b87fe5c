//! Criterion benchmarks for aad_core.
//!
//! Measures elementwise arithmetic on realisation vectors and the cost of a
//! backward sweep relative to the forward evaluation.

use aad_core::ad::{AadFactory, DifferentiableVariable, RetentionPolicy};
use aad_core::traits::RandomVariableFactory;
use aad_core::types::VectorValue;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic pseudo-realisations in (0.5, 1.5).
fn generate_realisations(n: usize, shift: f64) -> Vec<f64> {
    (0..n)
        .map(|i| 1.0 + 0.5 * ((i as f64 * 0.618 + shift).sin()))
        .collect()
}

/// Benchmark elementwise kernels below and above the parallel threshold.
fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_value");

    for size in [1_000, 100_000, 1_000_000] {
        let x = VectorValue::new(0.0, generate_realisations(size, 0.0));
        let y = VectorValue::new(0.0, generate_realisations(size, 1.0));

        group.bench_with_input(BenchmarkId::new("add_product", size), &(&x, &y), |b, (x, y)| {
            b.iter(|| black_box(x).add_product(black_box(y), black_box(y)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("exp", size), &x, |b, x| {
            b.iter(|| black_box(x).exp());
        });

        group.bench_with_input(BenchmarkId::new("average", size), &x, |b, x| {
            b.iter(|| black_box(x).average());
        });
    }

    group.finish();
}

/// Polynomial in `z` with coefficients `params`, Horner form.
fn polynomial(params: &[DifferentiableVariable], z: &VectorValue) -> DifferentiableVariable {
    let mut value = params[params.len() - 1].clone();
    for p in params.iter().rev().skip(1) {
        value = value.mul(z).unwrap().add(p).unwrap();
    }
    value
}

/// Benchmark forward recording and the backward sweep.
fn bench_backward_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");
    group.sample_size(20);

    for size in [1_000, 100_000] {
        let z = VectorValue::new(0.0, generate_realisations(size, 2.0));

        group.bench_with_input(BenchmarkId::new("forward", size), &z, |b, z| {
            let factory = AadFactory::new(RetentionPolicy::Tape);
            let params: Vec<_> = (0..10)
                .map(|k| factory.create_scalar_leaf(0.0, 0.1 * k as f64))
                .collect();
            b.iter(|| {
                let y = polynomial(black_box(&params), black_box(z));
                factory.graph().prune();
                y
            });
        });

        group.bench_with_input(BenchmarkId::new("forward_backward", size), &z, |b, z| {
            let factory = AadFactory::new(RetentionPolicy::Tape);
            let params: Vec<_> = (0..10)
                .map(|k| factory.create_scalar_leaf(0.0, 0.1 * k as f64))
                .collect();
            b.iter(|| {
                let y = polynomial(black_box(&params), black_box(z));
                y.average().unwrap().gradient().unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_elementwise, bench_backward_sweep);
criterion_main!(benches);
