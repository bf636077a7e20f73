//! Benchmark for fitting and applying the column transform, and for forest fitting
//!
//! Run with: cargo bench --bench preprocess_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use credit_risk::model::RandomForestConfig;
use credit_risk::pipeline::ColumnTransformer;

/// Generate a feature table with `n_numeric` numeric columns (about 5%
/// missing) and one three-level bucket column, plus a binary target.
fn generate_feature_frame(n_rows: usize, n_numeric: usize, seed: u64) -> (DataFrame, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let target: Vec<u8> = (0..n_rows)
        .map(|_| u8::from(rng.gen::<f64>() > 0.8))
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(n_numeric + 1);
    for i in 0..n_numeric {
        let values: Vec<Option<f64>> = (0..n_rows)
            .map(|idx| {
                if rng.gen::<f64>() < 0.05 {
                    None
                } else {
                    let shift = if target[idx] == 1 { 10.0 } else { 0.0 };
                    Some(rng.gen::<f64>() * 100.0 + shift)
                }
            })
            .collect();
        columns.push(Column::new(format!("feature_{}", i).into(), values));
    }

    let labels = ["low", "medium", "high"];
    let buckets: Vec<&str> = (0..n_rows).map(|_| labels[rng.gen_range(0..3)]).collect();
    columns.push(Column::new("score_bucket".into(), buckets));

    let df = DataFrame::new(columns).expect("Failed to create DataFrame");
    (df, target)
}

fn numeric_names(n_numeric: usize) -> Vec<String> {
    (0..n_numeric).map(|i| format!("feature_{}", i)).collect()
}

/// Benchmark fit and apply of the column transform for varying table sizes
fn benchmark_column_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_transform");
    let categorical = vec!["score_bucket".to_string()];

    for (n_rows, n_numeric) in [(1_000, 15), (10_000, 15), (50_000, 30)] {
        let (df, _) = generate_feature_frame(n_rows, n_numeric, 42);
        let numeric = numeric_names(n_numeric);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(
            BenchmarkId::new("fit", format!("{}x{}", n_rows, n_numeric)),
            &df,
            |b, df| {
                b.iter(|| {
                    ColumnTransformer::fit(black_box(df), &numeric, &categorical)
                        .expect("fit failed")
                })
            },
        );

        let transformer =
            ColumnTransformer::fit(&df, &numeric, &categorical).expect("fit failed");
        group.bench_with_input(
            BenchmarkId::new("apply", format!("{}x{}", n_rows, n_numeric)),
            &df,
            |b, df| b.iter(|| transformer.apply(black_box(df)).expect("apply failed")),
        );
    }

    group.finish();
}

/// Benchmark forest fitting on a prepared matrix
fn benchmark_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);

    let (df, target) = generate_feature_frame(5_000, 15, 7);
    let transformer = ColumnTransformer::fit(&df, &numeric_names(15), &["score_bucket".to_string()])
        .expect("fit failed");
    let matrix = transformer.apply(&df).expect("apply failed");

    for n_trees in [10, 50] {
        let config = RandomForestConfig::new(n_trees)
            .expect("valid tree count")
            .with_max_depth(Some(12));
        group.bench_with_input(BenchmarkId::new("trees", n_trees), &config, |b, config| {
            b.iter(|| {
                config
                    .fit(black_box(&matrix.rows), black_box(&target))
                    .expect("forest fit failed")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_column_transform, benchmark_forest_fit);
criterion_main!(benches);
