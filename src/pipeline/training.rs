//! Model selection, final fit and test-split evaluation

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::model::{RandomForest, RandomizedSearch, SearchResult};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::transformation::PreparedData;
use crate::report::metrics::{roc_auc_score, ClassificationReport};
use crate::report::metrics_export::{export_metrics, ExportParams, MetricsExport};
use crate::utils::{create_progress_bar, finish_with_success};

/// Number of features listed in the run summary.
const TOP_FEATURES: usize = 5;

/// Results of the training stage.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub search: Option<SearchResult>,
    pub report: ClassificationReport,
    pub roc_auc: f64,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
}

impl TrainingOutcome {
    pub fn top_features(&self) -> Vec<(String, f64)> {
        let mut ranked = self.model.ranked_importances();
        ranked.truncate(TOP_FEATURES);
        ranked
    }
}

/// Select hyperparameters, fit the final forest on the full training
/// matrix, persist it and evaluate it on the test matrix.
///
/// ROC-AUC is computed from the predicted event probabilities.
#[instrument(skip_all, fields(train_rows = data.train.n_rows(), test_rows = data.test.n_rows()))]
pub fn run_training(config: &PipelineConfig, data: &PreparedData) -> Result<TrainingOutcome> {
    let search_config = &config.search;

    let (forest_config, search) = if search_config.n_iter == 0 {
        info!("hyperparameter search disabled, fitting baseline configuration");
        (search_config.space.baseline(search_config.seed)?, None)
    } else {
        let pb = create_progress_bar(search_config.n_iter as u64, "Scoring candidates");
        let result = RandomizedSearch::new(search_config.space.clone(), search_config.n_iter)
            .with_cv_folds(search_config.cv_folds)
            .with_seed(search_config.seed)
            .run(&data.train.rows, &data.train_target, |_, candidate| {
                pb.set_message(format!("Scoring candidates (last AUC {:.4})", candidate.mean_score));
                pb.inc(1);
            })
            .context("Training: hyperparameter search failed")?;
        finish_with_success(
            &pb,
            &format!("Best CV ROC-AUC {:.4}", result.best().mean_score),
        );
        (result.best().config.clone(), Some(result))
    };

    info!(
        n_trees = forest_config.n_trees(),
        max_depth = ?forest_config.max_depth(),
        min_samples_split = forest_config.min_samples_split(),
        min_samples_leaf = forest_config.min_samples_leaf(),
        max_features = ?forest_config.max_features(),
        bootstrap = forest_config.bootstrap(),
        "fitting final model"
    );
    let model = forest_config
        .fit(&data.train.rows, &data.train_target)
        .and_then(|m| m.with_feature_names(&data.train.columns))
        .context("Training: failed to fit the final model")?;

    let model_path = config.model_path();
    model
        .save(&model_path)
        .with_context(|| format!("Training: failed to write {}", model_path.display()))?;

    let predictions = model
        .predict_batch(&data.test.rows)
        .context("Training: prediction on the test set failed")?;
    let scores = model
        .positive_scores(&data.test.rows)
        .context("Training: scoring the test set failed")?;

    let report = ClassificationReport::from_labels(&data.test_target, &predictions)
        .context("Training: classification report failed")?;
    let roc_auc = roc_auc_score(&data.test_target, &scores)
        .context("Training: ROC-AUC on the test set failed")?;

    info!(roc_auc, accuracy = report.accuracy, "evaluated on the test set");

    let metrics_path = config.metrics_path();
    let input_file = config.input.display().to_string();
    let export = MetricsExport::new(
        &ExportParams {
            input_file: &input_file,
            target_column: &config.schema.target,
            train_rows: data.train.n_rows(),
            test_rows: data.test.n_rows(),
            cv_folds: search_config.cv_folds,
        },
        &model,
        search.as_ref(),
        &report,
        roc_auc,
    );
    export_metrics(&export, &metrics_path).context("Training: failed to export metrics")?;

    Ok(TrainingOutcome {
        model,
        search,
        report,
        roc_auc,
        model_path,
        metrics_path,
    })
}
