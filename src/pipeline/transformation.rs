//! Cleaning, feature selection and column transform of the split datasets

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, instrument};

use crate::error::RiskResult;
use crate::pipeline::cleaning::clean_dataset;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::features::select_features;
use crate::pipeline::loader::load_dataset;
use crate::pipeline::preprocess::{ColumnTransformer, FeatureMatrix};
use crate::pipeline::target::count_classes;

/// Train and test matrices ready for model fitting.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train: FeatureMatrix,
    pub train_target: Vec<u8>,
    pub test: FeatureMatrix,
    pub test_target: Vec<u8>,
    pub preprocessor_path: PathBuf,
}

/// Clean one split and separate its features from the target.
pub fn prepare_split(df: &DataFrame, config: &PipelineConfig) -> RiskResult<(DataFrame, Vec<u8>)> {
    let cleaned = clean_dataset(df, &config.schema)?;
    select_features(&cleaned, &config.schema.target, &config.schema.drop_columns)
}

/// Read both splits, fit the column transform on train, apply it to both
/// and persist the fitted transform.
#[instrument(skip_all, fields(train = %train_path.display(), test = %test_path.display()))]
pub fn run_transformation(
    config: &PipelineConfig,
    train_path: &Path,
    test_path: &Path,
) -> Result<PreparedData> {
    let train_df = load_dataset(train_path, config.infer_schema_length)
        .with_context(|| format!("Transformation: failed to read {}", train_path.display()))?;
    let test_df = load_dataset(test_path, config.infer_schema_length)
        .with_context(|| format!("Transformation: failed to read {}", test_path.display()))?;
    info!(
        train_rows = train_df.height(),
        test_rows = test_df.height(),
        "read train and test sets"
    );

    let (train_features, train_target) = prepare_split(&train_df, config)
        .with_context(|| format!("Transformation: failed to clean {}", train_path.display()))?;
    let (test_features, test_target) = prepare_split(&test_df, config)
        .with_context(|| format!("Transformation: failed to clean {}", test_path.display()))?;

    let (events, non_events) = count_classes(&train_target);
    info!(events, non_events, "binarized target");

    let transformer = ColumnTransformer::fit(
        &train_features,
        &config.schema.numeric_features,
        &config.schema.categorical_features(),
    )
    .context("Transformation: failed to fit the column transform on the training set")?;

    let train = transformer
        .apply(&train_features)
        .context("Transformation: failed to transform the training set")?;
    let test = transformer
        .apply(&test_features)
        .context("Transformation: failed to transform the test set")?;

    let preprocessor_path = config.preprocessor_path();
    transformer.save(&preprocessor_path).with_context(|| {
        format!(
            "Transformation: failed to write {}",
            preprocessor_path.display()
        )
    })?;

    info!(
        features_out = train.n_cols(),
        path = %preprocessor_path.display(),
        "train and test sets prepared"
    );

    Ok(PreparedData {
        train,
        train_target,
        test,
        test_target,
        preprocessor_path,
    })
}
