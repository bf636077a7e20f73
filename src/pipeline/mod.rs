//! Pipeline module - ingestion, transformation and training stages

pub mod cleaning;
pub mod config;
pub mod features;
pub mod ingestion;
pub mod loader;
pub mod preprocess;
pub mod target;
pub mod training;
pub mod transformation;

pub use cleaning::*;
pub use config::*;
pub use features::*;
pub use ingestion::*;
pub use loader::*;
pub use preprocess::{CategoricalColumnState, ColumnTransformer, FeatureMatrix, NumericColumnState};
pub use target::*;
pub use training::*;
pub use transformation::*;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::report::RunSummary;

/// Run ingestion, transformation and training in order.
///
/// Stops at the first failing stage; artifacts of earlier stages stay in place.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate().context("Invalid pipeline configuration")?;

    let ingestion = run_ingestion(config)?;
    let prepared = run_transformation(
        config,
        &ingestion.train_data_path,
        &ingestion.test_data_path,
    )?;
    let outcome = run_training(config, &prepared)?;

    info!(
        roc_auc = outcome.roc_auc,
        artifacts = %config.artifacts_dir.display(),
        "pipeline complete"
    );

    Ok(summarize(config, &ingestion, &prepared, &outcome))
}

/// Collect the headline numbers of a finished run.
pub fn summarize(
    config: &PipelineConfig,
    ingestion: &IngestionOutput,
    prepared: &PreparedData,
    outcome: &TrainingOutcome,
) -> RunSummary {
    RunSummary {
        input_rows: ingestion.total_rows,
        train_rows: ingestion.train_rows,
        test_rows: ingestion.test_rows,
        features_out: prepared.train.n_cols(),
        candidates_scored: outcome.search.as_ref().map_or(0, |s| s.candidates.len()),
        best_cv_auc: outcome.search.as_ref().map(|s| s.best().mean_score),
        test_auc: outcome.roc_auc,
        test_accuracy: outcome.report.accuracy,
        top_features: outcome.top_features(),
        artifacts_dir: config.artifacts_dir.clone(),
    }
}
