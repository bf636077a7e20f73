//! Evaluation metrics export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::model::{Candidate, RandomForest, RandomForestConfig, SearchResult};
use crate::report::metrics::ClassificationReport;
use crate::utils::write_atomic;

/// Metadata about the training run
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    /// Timestamp of the export (RFC 3339)
    pub timestamp: String,
    pub crate_version: String,
    pub input_file: String,
    pub target_column: String,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Width of the prepared feature matrix
    pub n_features: usize,
}

/// One scored search candidate
#[derive(Debug, Serialize)]
pub struct CandidateEntry {
    pub params: RandomForestConfig,
    pub fold_auc: Vec<f64>,
    pub mean_auc: f64,
    pub std_auc: f64,
}

impl From<&Candidate> for CandidateEntry {
    fn from(candidate: &Candidate) -> Self {
        Self {
            params: candidate.config.clone(),
            fold_auc: candidate.fold_scores.clone(),
            mean_auc: candidate.mean_score,
            std_auc: candidate.std_score,
        }
    }
}

/// Summary of the randomized search, absent when search was disabled
#[derive(Debug, Serialize)]
pub struct SearchSummary {
    pub n_iter: usize,
    pub cv_folds: usize,
    pub best_index: usize,
    pub candidates: Vec<CandidateEntry>,
}

#[derive(Debug, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Test-split evaluation of the final model
#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub roc_auc: f64,
    pub report: ClassificationReport,
    /// The report in its tabular text form
    pub report_text: String,
}

/// Complete metrics export with metadata
#[derive(Debug, Serialize)]
pub struct MetricsExport {
    pub metadata: RunMetadata,
    /// Hyperparameters of the final model
    pub params: RandomForestConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSummary>,
    pub evaluation: Evaluation,
    pub feature_importances: Vec<FeatureImportance>,
}

/// Parameters for the metrics export
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub target_column: &'a str,
    pub train_rows: usize,
    pub test_rows: usize,
    pub cv_folds: usize,
}

impl MetricsExport {
    pub fn new(
        params: &ExportParams,
        model: &RandomForest,
        search: Option<&SearchResult>,
        report: &ClassificationReport,
        roc_auc: f64,
    ) -> Self {
        let search = search.map(|result| SearchSummary {
            n_iter: result.candidates.len(),
            cv_folds: params.cv_folds,
            best_index: result.best_index,
            candidates: result.candidates.iter().map(CandidateEntry::from).collect(),
        });

        let feature_importances = model
            .ranked_importances()
            .into_iter()
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect();

        Self {
            metadata: RunMetadata {
                timestamp: Utc::now().to_rfc3339(),
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: params.input_file.to_string(),
                target_column: params.target_column.to_string(),
                train_rows: params.train_rows,
                test_rows: params.test_rows,
                n_features: model.n_features(),
            },
            params: model.config().clone(),
            search,
            evaluation: Evaluation {
                roc_auc,
                report: report.clone(),
                report_text: report.to_string(),
            },
            feature_importances,
        }
    }
}

/// Write the metrics export as pretty-printed JSON
pub fn export_metrics(export: &MetricsExport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(export).context("Failed to serialize metrics to JSON")?;

    write_atomic(output_path, json.as_bytes())
        .with_context(|| format!("Failed to write metrics to {}", output_path.display()))?;

    Ok(())
}
