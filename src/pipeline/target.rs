//! Target column canonicalization
//!
//! The raw label arrives as a native boolean, a "True"/"False" string, or a
//! 0/1 number, with missing entries. It is mapped to a `UInt8` 0/1 column
//! where missing counts as a non-event.

use polars::prelude::*;

use crate::error::{RiskError, RiskResult};

/// String spellings treated as the event (maps to 1), compared lowercase.
const TRUE_LIKE: &[&str] = &["true", "1", "1.0", "yes", "y", "t"];

/// Tolerance for floating point comparison when checking a numeric 1
const TOLERANCE: f64 = 1e-9;

/// Whether a raw string label denotes the event.
pub fn is_true_like(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    TRUE_LIKE.contains(&normalized.as_str())
}

/// Map every value of a target column to 0/1.
fn target_labels(col: &Column) -> RiskResult<Vec<u8>> {
    let labels: Vec<u8> = match col.dtype() {
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| u8::from(v.unwrap_or(false)))
            .collect(),
        dtype if dtype.is_primitive_numeric() => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| u8::from(v.is_some_and(|n| (n - 1.0).abs() < TOLERANCE)))
                .collect()
        }
        _ => column_to_string_vec(col)?
            .iter()
            .map(|v| u8::from(v.as_deref().is_some_and(is_true_like)))
            .collect(),
    };
    Ok(labels)
}

/// Replace the target column with its canonical 0/1 encoding.
///
/// # Errors
/// Returns a schema error if `column` is not in the dataset.
pub fn normalize_target(df: &DataFrame, column: &str) -> RiskResult<DataFrame> {
    let target_col = df
        .column(column)
        .map_err(|_| RiskError::missing_column(column))?;

    let labels = target_labels(target_col)?;

    let mut out = df.clone();
    out.with_column(Column::new(column.into(), labels))?;
    Ok(out)
}

/// Count events and non-events in a canonical label vector.
pub fn count_classes(labels: &[u8]) -> (usize, usize) {
    let events = labels.iter().filter(|&&v| v == 1).count();
    (events, labels.len() - events)
}

/// Convert a column to a Vec of Option<String> for comparison
pub(crate) fn column_to_string_vec(col: &Column) -> RiskResult<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.filter(|n| !n.is_nan()).map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            // For other types, try to cast to string
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_of(df: &DataFrame, column: &str) -> Vec<Option<u8>> {
        df.column(column).unwrap().u8().unwrap().into_iter().collect()
    }

    #[test]
    fn test_string_true_false_with_missing() {
        let df = df! {
            "target_default" => [Some("True"), Some("False"), None, Some("True")],
            "income" => [1.0f64, 2.0, 3.0, 4.0],
        }
        .unwrap();

        let out = normalize_target(&df, "target_default").unwrap();

        assert_eq!(
            labels_of(&out, "target_default"),
            vec![Some(1), Some(0), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_native_boolean_with_missing() {
        let df = df! {
            "target" => [Some(true), None, Some(false)],
        }
        .unwrap();

        let out = normalize_target(&df, "target").unwrap();

        assert_eq!(labels_of(&out, "target"), vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_numeric_target() {
        let df = df! {
            "target" => [Some(1.0f64), Some(0.0), None, Some(1.0)],
        }
        .unwrap();

        let out = normalize_target(&df, "target").unwrap();

        assert_eq!(
            labels_of(&out, "target"),
            vec![Some(1), Some(0), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_unrelated_columns_untouched() {
        let df = df! {
            "target" => ["True", "False"],
            "income" => [10.5f64, 20.5],
        }
        .unwrap();

        let out = normalize_target(&df, "target").unwrap();

        let before = df.column("income").unwrap().as_materialized_series();
        let after = out.column("income").unwrap().as_materialized_series();
        assert!(after.equals(before));
    }

    #[test]
    fn test_missing_target_column_is_schema_error() {
        let df = df! { "income" => [1.0f64] }.unwrap();
        let err = normalize_target(&df, "target_default").unwrap_err();
        assert!(matches!(err, RiskError::Schema(_)));
    }

    #[test]
    fn test_true_like_spellings() {
        assert!(is_true_like(" TRUE "));
        assert!(is_true_like("yes"));
        assert!(is_true_like("1"));
        assert!(!is_true_like("False"));
        assert!(!is_true_like(""));
        assert!(!is_true_like("maybe"));
    }

    #[test]
    fn test_count_classes() {
        assert_eq!(count_classes(&[1, 0, 0, 1, 1]), (3, 2));
        assert_eq!(count_classes(&[]), (0, 0));
    }
}
