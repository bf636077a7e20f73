//! Row-level cleaning and score bucketing
//!
//! Every function here returns a new DataFrame and touches only the columns
//! it names, so the same sequence can be applied to the train and test
//! splits independently.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RiskError, RiskResult};
use crate::pipeline::config::FeatureSchema;
use crate::pipeline::target::normalize_target;

/// One bucket of a score: values `<= upper` (or any value when `upper` is
/// `None`) that did not fall into an earlier bucket get `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub upper: Option<f64>,
    pub label: String,
}

impl ScoreBucket {
    pub fn bounded(upper: f64, label: &str) -> Self {
        Self {
            upper: Some(upper),
            label: label.to_string(),
        }
    }

    pub fn unbounded(label: &str) -> Self {
        Self {
            upper: None,
            label: label.to_string(),
        }
    }
}

/// `score <= 300` low, `<= 700` medium, otherwise high.
pub fn default_score_buckets() -> Vec<ScoreBucket> {
    vec![
        ScoreBucket::bounded(300.0, "low"),
        ScoreBucket::bounded(700.0, "medium"),
        ScoreBucket::unbounded("high"),
    ]
}

/// Check that bucket bounds are finite, strictly increasing, and that only
/// the last bucket is unbounded.
pub fn validate_buckets(buckets: &[ScoreBucket]) -> RiskResult<()> {
    if buckets.is_empty() {
        return Err(RiskError::Schema("score buckets must not be empty".to_string()));
    }

    let mut previous: Option<f64> = None;
    for (i, bucket) in buckets.iter().enumerate() {
        match bucket.upper {
            Some(upper) => {
                if !upper.is_finite() {
                    return Err(RiskError::Schema(format!(
                        "bucket '{}' has a non-finite upper bound",
                        bucket.label
                    )));
                }
                if previous.is_some_and(|p| upper <= p) {
                    return Err(RiskError::Schema(format!(
                        "bucket '{}' upper bound {} does not exceed the previous bound",
                        bucket.label, upper
                    )));
                }
                previous = Some(upper);
            }
            None if i + 1 != buckets.len() => {
                return Err(RiskError::Schema(format!(
                    "unbounded bucket '{}' must be the last bucket",
                    bucket.label
                )));
            }
            None => {}
        }
    }
    Ok(())
}

/// Label for a single score. Missing, NaN, or out-of-range values get no label.
pub fn assign_bucket(value: Option<f64>, buckets: &[ScoreBucket]) -> Option<&str> {
    let v = value.filter(|v| !v.is_nan())?;
    buckets
        .iter()
        .find(|b| b.upper.map_or(true, |upper| v <= upper))
        .map(|b| b.label.as_str())
}

/// Read a numeric column as `Option<f64>` values.
fn numeric_values(df: &DataFrame, column: &str) -> RiskResult<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| RiskError::missing_column(column))?;

    // CSV inference types an all-empty column as String.
    if col.null_count() == col.len() {
        return Ok(vec![None; col.len()]);
    }
    if !col.dtype().is_primitive_numeric() {
        return Err(RiskError::Schema(format!(
            "column '{}' must be numeric, found {}",
            column,
            col.dtype()
        )));
    }

    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Replace exact matches of `sentinel` with missing in a numeric column.
///
/// The column is returned as `Float64`; every other value is kept.
pub fn nullify_sentinel(df: &DataFrame, column: &str, sentinel: f64) -> RiskResult<DataFrame> {
    let values = numeric_values(df, column)?;

    let mut replaced = 0usize;
    let cleaned: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| match v {
            Some(x) if x == sentinel => {
                replaced += 1;
                None
            }
            other => other,
        })
        .collect();

    debug!(column, sentinel, replaced, "nullified sentinel values");

    let mut out = df.clone();
    out.with_column(Column::new(column.into(), cleaned))?;
    Ok(out)
}

/// Replace `+inf`, `-inf` and `NaN` with missing in every floating-point column.
///
/// Columns without such values, and non-float columns, are left as they are.
pub fn nullify_non_finite(df: &DataFrame) -> RiskResult<DataFrame> {
    let mut out = df.clone();

    for col in df.get_columns() {
        let dtype = col.dtype();
        if !dtype.is_float() {
            continue;
        }

        let cast = col.cast(&DataType::Float64)?;
        let values = cast.f64()?;
        let non_finite = values
            .into_iter()
            .filter(|v| v.is_some_and(|x| !x.is_finite()))
            .count();
        if non_finite == 0 {
            continue;
        }

        let cleaned: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        let cleaned = Column::new(col.name().clone(), cleaned).cast(dtype)?;

        debug!(column = col.name().as_str(), non_finite, "nullified non-finite values");
        out.with_column(cleaned)?;
    }

    Ok(out)
}

/// Add `output_column` holding the bucket label of each `column` value.
///
/// A missing score yields a missing bucket, never a label.
pub fn bucket_score(
    df: &DataFrame,
    column: &str,
    buckets: &[ScoreBucket],
    output_column: &str,
) -> RiskResult<DataFrame> {
    validate_buckets(buckets)?;
    let values = numeric_values(df, column)?;

    let labels: Vec<Option<&str>> = values
        .iter()
        .map(|&v| assign_bucket(v, buckets))
        .collect();

    let mut out = df.clone();
    out.with_column(Column::new(output_column.into(), labels))?;
    Ok(out)
}

/// Apply the full cleaning sequence for one split.
///
/// Order: target normalization, sentinel rules, non-finite values, score
/// bucketing.
pub fn clean_dataset(df: &DataFrame, schema: &FeatureSchema) -> RiskResult<DataFrame> {
    let mut out = normalize_target(df, &schema.target)?;

    for rule in &schema.sentinels {
        out = nullify_sentinel(&out, &rule.column, rule.sentinel)?;
    }

    out = nullify_non_finite(&out)?;

    bucket_score(
        &out,
        &schema.score_column,
        &schema.score_buckets,
        &schema.bucket_column,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column).unwrap().f64().unwrap().into_iter().collect()
    }

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_sentinel_replaced_other_values_kept() {
        let df = df! {
            "credit_limit" => [Some(0.0f64), Some(1500.0), None, Some(0.5)],
        }
        .unwrap();

        let out = nullify_sentinel(&df, "credit_limit", 0.0).unwrap();

        assert_eq!(
            floats(&out, "credit_limit"),
            vec![None, Some(1500.0), None, Some(0.5)]
        );
    }

    #[test]
    fn test_sentinel_on_integer_column() {
        let df = df! { "credit_limit" => [0i64, 10, 0, 20] }.unwrap();

        let out = nullify_sentinel(&df, "credit_limit", 0.0).unwrap();

        assert_eq!(
            floats(&out, "credit_limit"),
            vec![None, Some(10.0), None, Some(20.0)]
        );
    }

    #[test]
    fn test_sentinel_on_string_column_is_schema_error() {
        let df = df! { "credit_limit" => ["a", "b"] }.unwrap();
        let err = nullify_sentinel(&df, "credit_limit", 0.0).unwrap_err();
        assert!(matches!(err, RiskError::Schema(_)));
    }

    #[test]
    fn test_non_finite_replaced_finite_kept() {
        let df = df! {
            "income" => [1.0f64, f64::INFINITY, -3.5, f64::NEG_INFINITY, f64::NAN],
            "n_accounts" => [1i64, 2, 3, 4, 5],
            "state" => ["a", "b", "c", "d", "e"],
        }
        .unwrap();

        let out = nullify_non_finite(&df).unwrap();

        assert_eq!(
            floats(&out, "income"),
            vec![Some(1.0), None, Some(-3.5), None, None]
        );
        assert_eq!(out.column("n_accounts").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("state").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_non_finite_keeps_float32_dtype() {
        let s = Series::new("ratio".into(), &[1.0f32, f32::INFINITY]);
        let df = DataFrame::new(vec![s.into()]).unwrap();

        let out = nullify_non_finite(&df).unwrap();

        let col = out.column("ratio").unwrap();
        assert_eq!(col.dtype(), &DataType::Float32);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_bucket_boundaries() {
        let df = df! {
            "score_3" => [Some(300.0f64), Some(301.0), Some(700.0), Some(701.0), None, Some(0.0)],
        }
        .unwrap();

        let out = bucket_score(&df, "score_3", &default_score_buckets(), "bucket").unwrap();

        assert_eq!(
            strings(&out, "bucket"),
            vec![
                Some("low".to_string()),
                Some("medium".to_string()),
                Some("medium".to_string()),
                Some("high".to_string()),
                None,
                Some("low".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_score_is_missing_bucket_not_last_label() {
        assert_eq!(assign_bucket(None, &default_score_buckets()), None);
        assert_eq!(assign_bucket(Some(f64::NAN), &default_score_buckets()), None);
        assert_eq!(assign_bucket(Some(10_000.0), &default_score_buckets()), Some("high"));
    }

    #[test]
    fn test_bounded_buckets_without_catch_all() {
        let buckets = vec![ScoreBucket::bounded(10.0, "a"), ScoreBucket::bounded(20.0, "b")];
        assert_eq!(assign_bucket(Some(15.0), &buckets), Some("b"));
        assert_eq!(assign_bucket(Some(25.0), &buckets), None);
    }

    #[test]
    fn test_invalid_bucket_order_rejected() {
        let unordered = vec![ScoreBucket::bounded(700.0, "a"), ScoreBucket::bounded(300.0, "b")];
        assert!(validate_buckets(&unordered).is_err());

        let early_catch_all = vec![ScoreBucket::unbounded("a"), ScoreBucket::bounded(300.0, "b")];
        assert!(validate_buckets(&early_catch_all).is_err());

        assert!(validate_buckets(&[]).is_err());
    }

    #[test]
    fn test_clean_dataset_applies_every_rule() {
        let df = df! {
            "target_default" => [Some("True"), Some("False"), None],
            "credit_limit" => [0.0f64, 500.0, 900.0],
            "income" => [f64::INFINITY, 10.0, 20.0],
            "score_3" => [Some(250.0f64), None, Some(800.0)],
        }
        .unwrap();

        let out = clean_dataset(&df, &FeatureSchema::default()).unwrap();

        let target: Vec<Option<u8>> = out
            .column("target_default")
            .unwrap()
            .u8()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(target, vec![Some(1), Some(0), Some(0)]);
        assert_eq!(floats(&out, "credit_limit"), vec![None, Some(500.0), Some(900.0)]);
        assert_eq!(floats(&out, "income"), vec![None, Some(10.0), Some(20.0)]);
        assert_eq!(
            strings(&out, "score_3_bucket"),
            vec![Some("low".to_string()), None, Some("high".to_string())]
        );
    }
}
