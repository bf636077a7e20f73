//! Median imputation followed by standardization

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};

/// Fitted state of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnState {
    pub name: String,
    /// Fill value for missing entries.
    pub median: f64,
    /// Mean of the imputed fit-time column.
    pub mean: f64,
    /// Population standard deviation of the imputed fit-time column, or 1.0
    /// when that deviation is zero.
    pub scale: f64,
}

impl NumericColumnState {
    /// Fit from the training values of one column. Non-finite entries count as missing.
    ///
    /// # Errors
    /// Returns a fit error when the column has no usable values.
    pub fn fit(name: &str, values: &[Option<f64>]) -> RiskResult<Self> {
        let mut present: Vec<f64> = values
            .iter()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .collect();

        if present.is_empty() {
            return Err(RiskError::Fit(format!(
                "numeric column '{}' has no non-missing values to compute a median",
                name
            )));
        }

        let median = median(&mut present);
        let n = values.len() as f64;
        let missing = values.len() - present.len();

        let sum: f64 = present.iter().sum::<f64>() + median * missing as f64;
        let mean = sum / n;

        let sq: f64 = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
            + (median - mean).powi(2) * missing as f64;
        let std = (sq / n).sqrt();

        Ok(Self {
            name: name.to_string(),
            median,
            mean,
            scale: safe_scale(std, mean),
        })
    }

    /// Impute then standardize a single value.
    #[inline]
    pub fn transform(&self, value: Option<f64>) -> f64 {
        let x = value.filter(|x| x.is_finite()).unwrap_or(self.median);
        (x - self.mean) / self.scale
    }
}

/// Standard deviations this close to zero are treated as a constant column.
pub(crate) fn safe_scale(std: f64, mean: f64) -> f64 {
    if std <= 10.0 * f64::EPSILON * mean.abs().max(1.0) {
        1.0
    } else {
        std
    }
}

/// Median of a non-empty slice; the mean of the two middle values for even lengths.
pub fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Read a column as `Option<f64>`, treating NaN as missing.
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> RiskResult<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| RiskError::missing_column(name))?;

    // CSV inference types an all-empty column as String.
    if col.null_count() == col.len() {
        return Ok(vec![None; col.len()]);
    }
    if !(col.dtype().is_primitive_numeric() || col.dtype() == &DataType::Boolean) {
        return Err(RiskError::Schema(format!(
            "numeric feature '{}' has non-numeric type {}",
            name,
            col.dtype()
        )));
    }

    let cast = col.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [7.0]), 7.0);
    }

    #[test]
    fn test_fit_imputes_before_scaling() {
        // Imputed column: [1, 2, 3, 2] -> mean 2, population std sqrt(0.5)
        let state = NumericColumnState::fit("x", &[Some(1.0), Some(2.0), Some(3.0), None]).unwrap();

        assert_eq!(state.median, 2.0);
        assert!((state.mean - 2.0).abs() < 1e-12);
        assert!((state.scale - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((state.transform(None) - 0.0).abs() < 1e-12);
        assert!((state.transform(Some(3.0)) - 1.0 / 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_does_not_divide_by_zero() {
        let state = NumericColumnState::fit("c", &[Some(5.0), Some(5.0), Some(5.0)]).unwrap();

        assert_eq!(state.scale, 1.0);
        assert_eq!(state.transform(Some(5.0)), 0.0);
        assert_eq!(state.transform(Some(7.0)), 2.0);
    }

    #[test]
    fn test_all_missing_column_is_fit_error() {
        let err = NumericColumnState::fit("empty", &[None, None]).unwrap_err();
        assert!(matches!(err, RiskError::Fit(_)));
    }

    #[test]
    fn test_non_finite_at_apply_time_is_imputed() {
        let state = NumericColumnState::fit("x", &[Some(0.0), Some(10.0)]).unwrap();
        assert_eq!(state.transform(Some(f64::INFINITY)), state.transform(None));
    }
}
