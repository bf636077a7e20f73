//! Pipeline configuration
//!
//! The column lists, cleaning rules, split parameters and search space are
//! carried in one immutable [`PipelineConfig`] that is passed into every
//! stage. The defaults describe the credit acquisition dataset; a JSON file
//! can override any subset of fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::model::ParamSpace;
use crate::pipeline::cleaning::ScoreBucket;
use crate::utils::write_atomic;

/// A numeric value that marks "unknown" in a specific column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelRule {
    pub column: String,
    pub sentinel: f64,
}

/// Partition of the dataset columns into modeled, derived and dropped sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    /// Binary label column, canonicalized to 0/1.
    pub target: String,
    /// Columns imputed with the median and standardized.
    pub numeric_features: Vec<String>,
    /// Numeric score the categorical bucket is derived from.
    pub score_column: String,
    /// Name of the derived bucket column (the categorical feature).
    pub bucket_column: String,
    /// Ordered, non-overlapping bucket bounds for `score_column`.
    pub score_buckets: Vec<ScoreBucket>,
    /// Exact values replaced with missing before preprocessing.
    pub sentinels: Vec<SentinelRule>,
    /// Columns excluded from modeling.
    pub drop_columns: Vec<String>,
}

impl FeatureSchema {
    /// Categorical feature columns fed to the one-hot group.
    pub fn categorical_features(&self) -> Vec<String> {
        vec![self.bucket_column.clone()]
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        let strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            target: "target_default".to_string(),
            numeric_features: strings(&[
                "risk_rate",
                "score_3",
                "last_amount_borrowed",
                "last_borrowed_in_months",
                "credit_limit",
                "income",
                "ok_since",
                "n_bankruptcies",
                "n_defaulted_loans",
                "n_accounts",
                "n_issues",
                "external_data_provider_credit_checks_last_2_year",
                "external_data_provider_credit_checks_last_month",
                "external_data_provider_credit_checks_last_year",
                "reported_income",
            ]),
            score_column: "score_3".to_string(),
            bucket_column: "score_3_bucket".to_string(),
            score_buckets: crate::pipeline::cleaning::default_score_buckets(),
            sentinels: vec![SentinelRule {
                column: "credit_limit".to_string(),
                sentinel: 0.0,
            }],
            drop_columns: strings(&[
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
            ]),
        }
    }
}

/// Random train/test split parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the test set, in (0, 1).
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Randomized hyperparameter search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of sampled candidates. Zero trains `space.baseline()` directly.
    pub n_iter: usize,
    /// Stratified folds used to score each candidate.
    pub cv_folds: usize,
    pub seed: u64,
    pub space: ParamSpace,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 10,
            cv_folds: 5,
            seed: 42,
            space: ParamSpace::default(),
        }
    }
}

/// Complete, immutable configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw labeled dataset (CSV or Parquet).
    pub input: PathBuf,
    /// Directory receiving every artifact of the run.
    pub artifacts_dir: PathBuf,
    /// Rows used for CSV schema inference; 0 scans the whole file.
    pub infer_schema_length: usize,
    pub schema: FeatureSchema,
    pub split: SplitConfig,
    pub search: SearchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("notebooks/data/acquisition_train.csv"),
            artifacts_dir: PathBuf::from("artifacts"),
            infer_schema_length: 10000,
            schema: FeatureSchema::default(),
            split: SplitConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn load(path: &Path) -> RiskResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RiskError::io(path, e))?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|e| RiskError::Serialize {
                what: format!("configuration {}", path.display()),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| RiskError::Serialize {
            what: "configuration".to_string(),
            source: e,
        })?;
        write_atomic(path, json.as_bytes())
    }

    /// Check value ranges that the type system cannot express.
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(RiskError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.search.n_iter > 0 && self.search.cv_folds < 2 {
            return Err(RiskError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.search.cv_folds
            )));
        }
        if self.schema.target.is_empty() {
            return Err(RiskError::Config("target column name is empty".to_string()));
        }
        if self.schema.drop_columns.contains(&self.schema.target) {
            return Err(RiskError::Config(format!(
                "target column '{}' is also listed in drop_columns",
                self.schema.target
            )));
        }
        if let Some(dup) = self
            .schema
            .numeric_features
            .iter()
            .find(|c| self.schema.drop_columns.contains(c))
        {
            return Err(RiskError::Config(format!(
                "column '{}' is listed both as a numeric feature and in drop_columns",
                dup
            )));
        }
        crate::pipeline::cleaning::validate_buckets(&self.schema.score_buckets)?;
        self.search.space.validate()?;
        Ok(())
    }

    pub fn raw_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("data.csv")
    }

    pub fn train_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("train.csv")
    }

    pub fn test_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("test.csv")
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.artifacts_dir.join("preprocessor.json")
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join("model.json")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.artifacts_dir.join("metrics.json")
    }
}
