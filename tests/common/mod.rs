//! Shared test utilities and fixture generators

#![allow(dead_code)]

use credit_risk::model::IntRange;
use credit_risk::pipeline::PipelineConfig;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Columns the default schema drops before modeling.
pub const DROP_COLUMNS: &[&str] = &[
    "ids",
    "score_1",
    "score_2",
    "score_4",
    "score_5",
    "score_6",
    "reason",
    "facebook_profile",
    "state",
    "zip",
    "channel",
    "job_name",
    "real_state",
    "email",
    "external_data_provider_first_name",
    "external_data_provider_email_seen_before",
    "lat_lon",
    "marketing_channel",
    "application_time_applied",
    "profile_phone_number",
    "application_time_in_funnel",
    "shipping_state",
    "shipping_zip_code",
    "external_data_provider_fraud_score",
    "profile_tags",
    "user_agent",
    "target_fraud",
];

/// Create a synthetic acquisition dataset with `rows` rows and every column
/// of the default schema.
///
/// - `score_3` spreads evenly over 0..1000 by row position, so 1000 rows
///   give 301 low, 400 medium and 299 high buckets
/// - `target_default` is "True"/"False" with a few missing labels; defaults
///   are more likely for low scores and low incomes
/// - `credit_limit` uses 0 as its unknown marker on every tenth row
/// - numeric features carry scattered missing values
pub fn create_credit_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let score_3: Vec<f64> = (0..rows).map(|i| (i * 1000 / rows.max(1)) as f64).collect();
    let income: Vec<Option<f64>> = (0..rows)
        .map(|i| (i % 17 != 3).then(|| rng.gen_range(10_000.0..150_000.0)))
        .collect();

    let target: Vec<Option<&str>> = (0..rows)
        .map(|i| {
            if i % 97 == 5 {
                return None;
            }
            let score_risk = 1.0 - score_3[i] / 1000.0;
            let income_risk = income[i].map_or(0.5, |v| 1.0 - v / 150_000.0);
            let p = 0.05 + 0.5 * score_risk * score_risk + 0.2 * income_risk;
            Some(if rng.gen::<f64>() < p { "True" } else { "False" })
        })
        .collect();

    let maybe = |rng: &mut ChaCha8Rng, i: usize, every: usize, low: f64, high: f64| -> Option<f64> {
        (i % every != every / 2).then(|| rng.gen_range(low..high))
    };

    let risk_rate: Vec<Option<f64>> = (0..rows).map(|i| maybe(&mut rng, i, 23, 0.0, 1.0)).collect();
    let last_amount_borrowed: Vec<Option<f64>> =
        (0..rows).map(|i| maybe(&mut rng, i, 3, 1_000.0, 35_000.0)).collect();
    let last_borrowed_in_months: Vec<Option<f64>> = (0..rows)
        .map(|i| maybe(&mut rng, i, 3, 0.0, 60.0).map(f64::round))
        .collect();
    let credit_limit: Vec<Option<f64>> = (0..rows)
        .map(|i| {
            if i % 10 == 0 {
                Some(0.0)
            } else {
                maybe(&mut rng, i, 29, 500.0, 50_000.0)
            }
        })
        .collect();
    let ok_since: Vec<Option<f64>> = (0..rows).map(|i| maybe(&mut rng, i, 2, 0.0, 100.0)).collect();
    let small_count = |rng: &mut ChaCha8Rng, max: i64| -> Vec<i64> {
        (0..rows).map(|_| rng.gen_range(0..max)).collect()
    };
    let n_bankruptcies = small_count(&mut rng, 3);
    let n_defaulted_loans = small_count(&mut rng, 3);
    let n_accounts = small_count(&mut rng, 30);
    let n_issues: Vec<Option<i64>> = (0..rows)
        .map(|i| (i % 4 != 0).then(|| rng.gen_range(0..40)))
        .collect();
    let checks_2y = small_count(&mut rng, 2);
    let checks_month = small_count(&mut rng, 4);
    let checks_year: Vec<Option<i64>> = (0..rows)
        .map(|i| (i % 3 != 1).then(|| rng.gen_range(0..2)))
        .collect();
    let reported_income: Vec<f64> = (0..rows).map(|_| rng.gen_range(5_000.0..500_000.0)).collect();

    let mut columns: Vec<Column> = vec![
        Column::new("target_default".into(), target),
        Column::new("risk_rate".into(), risk_rate),
        Column::new("score_3".into(), score_3),
        Column::new("last_amount_borrowed".into(), last_amount_borrowed),
        Column::new("last_borrowed_in_months".into(), last_borrowed_in_months),
        Column::new("credit_limit".into(), credit_limit),
        Column::new("income".into(), income),
        Column::new("ok_since".into(), ok_since),
        Column::new("n_bankruptcies".into(), n_bankruptcies),
        Column::new("n_defaulted_loans".into(), n_defaulted_loans),
        Column::new("n_accounts".into(), n_accounts),
        Column::new("n_issues".into(), n_issues),
        Column::new(
            "external_data_provider_credit_checks_last_2_year".into(),
            checks_2y,
        ),
        Column::new(
            "external_data_provider_credit_checks_last_month".into(),
            checks_month,
        ),
        Column::new(
            "external_data_provider_credit_checks_last_year".into(),
            checks_year,
        ),
        Column::new("reported_income".into(), reported_income),
    ];

    for name in DROP_COLUMNS {
        let values: Vec<String> = (0..rows).map(|i| format!("{}_{}", name, i % 7)).collect();
        columns.push(Column::new((*name).into(), values));
    }

    DataFrame::new(columns).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("acquisition_train.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// A configuration that reads `input` and writes under `dir/artifacts`, with
/// a small search space so tests stay fast.
pub fn fast_config(dir: &Path, input: &Path, n_iter: usize) -> PipelineConfig {
    let mut config = PipelineConfig {
        input: input.to_path_buf(),
        artifacts_dir: dir.join("artifacts"),
        ..PipelineConfig::default()
    };
    config.search.n_iter = n_iter;
    config.search.cv_folds = 3;
    config.search.space.n_estimators = IntRange::new(5, 15);
    config
}

/// Assert every named column is present.
pub fn assert_has_columns(df: &DataFrame, columns: &[&str]) {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in columns {
        assert!(
            names.contains(&col.to_string()),
            "Expected column '{}' in {:?}",
            col,
            names
        );
    }
}

/// Count bucket labels in a string column.
pub fn bucket_counts(df: &DataFrame, column: &str) -> (usize, usize, usize, usize) {
    let mut counts = (0, 0, 0, 0);
    for v in df.column(column).unwrap().str().unwrap().into_iter() {
        match v {
            Some("low") => counts.0 += 1,
            Some("medium") => counts.1 += 1,
            Some("high") => counts.2 += 1,
            _ => counts.3 += 1,
        }
    }
    counts
}
