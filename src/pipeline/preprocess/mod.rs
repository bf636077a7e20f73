//! Fitted column transform: numeric group then categorical group
//!
//! The transformer is fitted once on the training features and applied
//! unchanged to any later table with the same columns. Its state is plain
//! data and is persisted as a versioned JSON envelope.

pub mod categorical;
pub mod numeric;

use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RiskError, RiskResult};
use crate::pipeline::target::column_to_string_vec;
use crate::utils::write_atomic;

pub use categorical::CategoricalColumnState;
pub use numeric::{median, NumericColumnState};

/// On-disk format version of the transformer file.
pub const FORMAT_VERSION: u32 = 1;

/// A dense, row-major numeric matrix with named output columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Values of one output column, or `None` if the name is unknown.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Fitted imputation, scaling and one-hot state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub numeric: Vec<NumericColumnState>,
    pub categorical: Vec<CategoricalColumnState>,
}

#[derive(Serialize, Deserialize)]
struct TransformerFile {
    format_version: u32,
    crate_version: String,
    transformer: ColumnTransformer,
}

impl ColumnTransformer {
    /// Fit every column state from the training feature table.
    ///
    /// Columns of `features` not named in either list are ignored here and
    /// dropped by [`ColumnTransformer::apply`].
    pub fn fit(
        features: &DataFrame,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> RiskResult<Self> {
        require_columns(features, numeric_columns.iter().chain(categorical_columns))?;

        if features.height() == 0 {
            return Err(RiskError::Fit(
                "cannot fit the column transform on an empty table".to_string(),
            ));
        }

        let numeric = numeric_columns
            .iter()
            .map(|name| {
                let values = numeric::numeric_column(features, name)?;
                NumericColumnState::fit(name, &values)
            })
            .collect::<RiskResult<Vec<_>>>()?;

        let categorical = categorical_columns
            .iter()
            .map(|name| {
                let values = column_to_string_vec(features.column(name)?)?;
                CategoricalColumnState::fit(name, &values)
            })
            .collect::<RiskResult<Vec<_>>>()?;

        let remainder = remainder_columns(features, numeric_columns, categorical_columns);
        if !remainder.is_empty() {
            warn!(
                count = remainder.len(),
                columns = ?remainder,
                "columns not listed as numeric or categorical will be dropped"
            );
        }

        let transformer = Self {
            numeric,
            categorical,
        };
        debug!(
            numeric = transformer.numeric.len(),
            categorical = transformer.categorical.len(),
            outputs = transformer.n_outputs(),
            "fitted column transform"
        );
        Ok(transformer)
    }

    /// Transform a feature table with the fitted state.
    ///
    /// # Errors
    /// Returns a schema error listing any fit-time column absent from `features`.
    pub fn apply(&self, features: &DataFrame) -> RiskResult<FeatureMatrix> {
        require_columns(
            features,
            self.numeric
                .iter()
                .map(|s| &s.name)
                .chain(self.categorical.iter().map(|s| &s.name)),
        )?;

        let numeric_values = self
            .numeric
            .iter()
            .map(|s| numeric::numeric_column(features, &s.name))
            .collect::<RiskResult<Vec<_>>>()?;
        let categorical_values = self
            .categorical
            .iter()
            .map(|s| column_to_string_vec(features.column(&s.name)?))
            .collect::<RiskResult<Vec<_>>>()?;

        let width = self.n_outputs();
        let rows = (0..features.height())
            .map(|i| {
                let mut row = Vec::with_capacity(width);
                for (state, values) in self.numeric.iter().zip(&numeric_values) {
                    row.push(state.transform(values[i]));
                }
                for (state, values) in self.categorical.iter().zip(&categorical_values) {
                    state.transform_into(values[i].as_deref(), &mut row);
                }
                row
            })
            .collect();

        Ok(FeatureMatrix {
            columns: self.output_names(),
            rows,
        })
    }

    /// `num__<column>` for each numeric column, then
    /// `cat__<column>_<category>` for each indicator.
    pub fn output_names(&self) -> Vec<String> {
        let numeric = self.numeric.iter().map(|s| format!("num__{}", s.name));
        let categorical = self
            .categorical
            .iter()
            .flat_map(|s| s.output_names())
            .map(|n| format!("cat__{}", n));
        numeric.chain(categorical).collect()
    }

    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|s| s.width()).sum::<usize>()
    }

    /// Persist as a versioned JSON file, written atomically.
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        let file = TransformerFile {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            transformer: self.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| RiskError::Serialize {
            what: "column transform".to_string(),
            source: e,
        })?;
        write_atomic(path, &json)
    }

    /// Load a transformer written by [`ColumnTransformer::save`].
    pub fn load(path: &Path) -> RiskResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| RiskError::io(path, e))?;
        let file: TransformerFile =
            serde_json::from_slice(&bytes).map_err(|e| RiskError::Serialize {
                what: format!("column transform {}", path.display()),
                source: e,
            })?;
        if file.format_version != FORMAT_VERSION {
            return Err(RiskError::IncompatibleFormat {
                what: "column transform".to_string(),
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: file.format_version,
            });
        }
        Ok(file.transformer)
    }
}

fn require_columns<'a>(
    df: &DataFrame,
    names: impl IntoIterator<Item = &'a String>,
) -> RiskResult<()> {
    let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
    let missing: Vec<String> = names
        .into_iter()
        .filter(|n| !present.contains(&n.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RiskError::missing_columns(&missing))
    }
}

fn remainder_columns(
    df: &DataFrame,
    numeric_columns: &[String],
    categorical_columns: &[String],
) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|c| !numeric_columns.contains(c) && !categorical_columns.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn train() -> DataFrame {
        df! {
            "income" => [Some(1.0f64), Some(2.0), None, Some(5.0)],
            "n_accounts" => [1i64, 2, 3, 4],
            "score_3_bucket" => [Some("low"), Some("high"), Some("low"), None],
            "unused" => ["x", "y", "z", "w"],
        }
        .unwrap()
    }

    #[test]
    fn test_output_layout() {
        let t = ColumnTransformer::fit(
            &train(),
            &names(&["income", "n_accounts"]),
            &names(&["score_3_bucket"]),
        )
        .unwrap();

        assert_eq!(
            t.output_names(),
            vec![
                "num__income",
                "num__n_accounts",
                "cat__score_3_bucket_high",
                "cat__score_3_bucket_low",
            ]
        );
        let m = t.apply(&train()).unwrap();
        assert_eq!(m.n_rows(), 4);
        assert_eq!(m.n_cols(), 4);
        assert!(m.rows.iter().all(|r| r.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_standardized_columns_have_zero_mean() {
        let t = ColumnTransformer::fit(&train(), &names(&["income"]), &[]).unwrap();
        let m = t.apply(&train()).unwrap();
        let col = m.column("num__income").unwrap();
        let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
        let var: f64 = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column_at_apply_is_schema_error() {
        let t = ColumnTransformer::fit(&train(), &names(&["income"]), &[]).unwrap();
        let test = df! { "n_accounts" => [1i64] }.unwrap();

        let err = t.apply(&test).unwrap_err();

        assert!(matches!(err, RiskError::Schema(_)));
        assert!(err.to_string().contains("income"));
    }

    #[test]
    fn test_string_numeric_feature_rejected() {
        let err = ColumnTransformer::fit(&train(), &names(&["unused"]), &[]).unwrap_err();
        assert!(matches!(err, RiskError::Schema(_)));
    }

    #[test]
    fn test_empty_table_is_fit_error() {
        let empty = train().head(Some(0));
        let err = ColumnTransformer::fit(&empty, &names(&["income"]), &[]).unwrap_err();
        assert!(matches!(err, RiskError::Fit(_)));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        let t = ColumnTransformer::fit(
            &train(),
            &names(&["income"]),
            &names(&["score_3_bucket"]),
        )
        .unwrap();

        t.save(&path).unwrap();
        let loaded = ColumnTransformer::load(&path).unwrap();

        assert_eq!(loaded, t);
    }

    #[test]
    fn test_load_rejects_other_format_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        std::fs::write(
            &path,
            r#"{"format_version": 99, "crate_version": "0.0.0",
                "transformer": {"numeric": [], "categorical": []}}"#,
        )
        .unwrap();

        let err = ColumnTransformer::load(&path).unwrap_err();

        assert!(matches!(
            err,
            RiskError::IncompatibleFormat { found: 99, .. }
        ));
    }
}
