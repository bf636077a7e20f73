//! Raw dataset ingestion and seeded train/test split

use std::path::PathBuf;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::{RiskError, RiskResult};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::loader::{load_dataset, save_dataset};

/// Where the ingestion stage left its outputs.
#[derive(Debug, Clone)]
pub struct IngestionOutput {
    pub raw_data_path: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Row indices of a seeded random partition: `(train, test)`.
///
/// The test set is the first `ceil(test_size * n_rows)` entries of a
/// ChaCha8 permutation, so the same seed always yields the same split.
///
/// # Errors
/// Returns a configuration error when `test_size` is outside (0, 1) or when
/// either side of the split would be empty.
pub fn split_indices(n_rows: usize, test_size: f64, seed: u64) -> RiskResult<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RiskError::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(RiskError::Config(format!(
            "cannot split {} row(s) with test_size {}: both sets need at least one row",
            n_rows, test_size
        )));
    }

    let mut permutation: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok((train, permutation))
}

/// Split a dataset into `(train, test)` rows, keeping every column.
pub fn train_test_split(
    df: &DataFrame,
    test_size: f64,
    seed: u64,
) -> RiskResult<(DataFrame, DataFrame)> {
    let (train_idx, test_idx) = split_indices(df.height(), test_size, seed)?;

    let to_idx = |v: Vec<usize>| IdxCa::from_vec("idx".into(), v.into_iter().map(|i| i as IdxSize).collect());
    let train = df.take(&to_idx(train_idx))?;
    let test = df.take(&to_idx(test_idx))?;
    Ok((train, test))
}

/// Read the raw dataset, persist a raw copy and the two split files.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn run_ingestion(config: &PipelineConfig) -> Result<IngestionOutput> {
    let df = load_dataset(&config.input, config.infer_schema_length)
        .with_context(|| format!("Ingestion: failed to read {}", config.input.display()))?;
    info!(rows = df.height(), columns = df.width(), "read raw dataset");

    let raw_data_path = config.raw_data_path();
    save_dataset(&df, &raw_data_path)
        .with_context(|| format!("Ingestion: failed to write {}", raw_data_path.display()))?;

    let (train, test) = train_test_split(&df, config.split.test_size, config.split.seed)
        .context("Ingestion: train/test split failed")?;

    let train_data_path = config.train_data_path();
    let test_data_path = config.test_data_path();
    save_dataset(&train, &train_data_path)
        .with_context(|| format!("Ingestion: failed to write {}", train_data_path.display()))?;
    save_dataset(&test, &test_data_path)
        .with_context(|| format!("Ingestion: failed to write {}", test_data_path.display()))?;

    info!(
        train_rows = train.height(),
        test_rows = test.height(),
        seed = config.split.seed,
        "finished data ingestion"
    );

    Ok(IngestionOutput {
        raw_data_path,
        train_data_path,
        test_data_path,
        total_rows: df.height(),
        train_rows: train.height(),
        test_rows: test.height(),
    })
}
