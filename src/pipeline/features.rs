//! Feature/target separation

use polars::prelude::*;

use crate::error::{RiskError, RiskResult};

/// Split a cleaned dataset into the feature table and the 0/1 target.
///
/// The feature table holds every column except `target` and `drop_columns`,
/// in their original order. The target column must already be normalized
/// (see [`crate::pipeline::normalize_target`]); missing labels count as 0.
///
/// # Errors
/// Returns a schema error naming every required column that is absent, or
/// when the target cannot be read as 0/1.
pub fn select_features(
    df: &DataFrame,
    target: &str,
    drop_columns: &[String],
) -> RiskResult<(DataFrame, Vec<u8>)> {
    let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();

    let missing: Vec<String> = std::iter::once(target)
        .chain(drop_columns.iter().map(|s| s.as_str()))
        .filter(|name| !present.contains(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RiskError::missing_columns(&missing));
    }

    let target_col = df.column(target)?;
    if !target_col.dtype().is_primitive_numeric() && target_col.dtype() != &DataType::Boolean {
        return Err(RiskError::Schema(format!(
            "target column '{}' must be normalized to 0/1 before feature selection, found {}",
            target,
            target_col.dtype()
        )));
    }
    let cast = target_col.cast(&DataType::UInt8)?;
    let labels: Vec<u8> = cast
        .u8()?
        .into_iter()
        .map(|v| u8::from(v.unwrap_or(0) == 1))
        .collect();

    let features = df.drop_many(
        std::iter::once(target).chain(drop_columns.iter().map(|s| s.as_str())),
    );

    Ok((features, labels))
}
