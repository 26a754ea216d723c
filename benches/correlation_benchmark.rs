//! Benchmark of correlation ranking and top-k selection
//!
//! Run with: cargo bench --bench correlation_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use elyte::pipeline::{rank_by_correlation, select_features, FeatureMatrix};

/// Synthetic features with a log-scale target driven by the first few columns
fn generate_features(n_rows: usize, n_features: usize, seed: u64) -> (FeatureMatrix, Vec<f64>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|i| match i % 3 {
            // Continuous conditions (concentration, temperature)
            0 => (0..n_rows).map(|_| rng.gen::<f64>() * 100.0).collect(),
            // Solvent fractions
            1 => (0..n_rows).map(|_| rng.gen::<f64>()).collect(),
            // One-hot indicators
            _ => (0..n_rows)
                .map(|_| if rng.gen::<f64>() < 0.2 { 1.0 } else { 0.0 })
                .collect(),
        })
        .collect();

    let target: Vec<f64> = (0..n_rows)
        .map(|r| {
            let signal: f64 = columns.iter().take(3).map(|c| c[r]).sum();
            (signal * 0.1 + rng.gen::<f64>()).ln_1p()
        })
        .collect();

    let names = (0..n_features).map(|i| format!("feature_{}", i)).collect();
    let matrix = FeatureMatrix::from_columns(names, &columns).expect("valid matrix");
    (matrix, target)
}

/// Correlation ranking for varying feature counts
fn benchmark_correlation_by_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_columns");
    group.sample_size(30);

    let n_rows = 10_000;
    let column_counts = [10, 25, 50, 100, 200];

    for n_cols in column_counts {
        let (x, y) = generate_features(n_rows, n_cols, 42);
        group.throughput(Throughput::Elements(n_cols as u64));

        group.bench_with_input(BenchmarkId::new("rank", n_cols), &(&x, &y), |b, (x, y)| {
            b.iter(|| {
                let _ = rank_by_correlation(black_box(x), black_box(y));
            });
        });
    }

    group.finish();
}

/// Correlation ranking for varying row counts
fn benchmark_correlation_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_rows");
    group.sample_size(20);

    let n_cols = 50;
    let row_counts = [1_000, 5_000, 10_000, 50_000];

    for n_rows in row_counts {
        let (x, y) = generate_features(n_rows, n_cols, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::new("rank", n_rows), &(&x, &y), |b, (x, y)| {
            b.iter(|| {
                let _ = rank_by_correlation(black_box(x), black_box(y));
            });
        });
    }

    group.finish();
}

/// Union of top-k names across three rankings
fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    let (x, y) = generate_features(2_000, 200, 7);
    let ranking = rank_by_correlation(&x, &y).expect("ranking");

    for top_k in [5, 20, 100] {
        group.bench_with_input(BenchmarkId::new("union", top_k), &top_k, |b, &k| {
            b.iter(|| {
                let rankings = [&ranking, &ranking, &ranking];
                let _ = select_features(black_box(&rankings), black_box(k), black_box(&x));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_correlation_by_columns,
    benchmark_correlation_by_rows,
    benchmark_selection
);
criterion_main!(benches);
