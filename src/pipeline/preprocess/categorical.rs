//! Most-frequent imputation, one-hot expansion and unit-variance scaling

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::pipeline::preprocess::numeric::safe_scale;

/// Fitted state of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnState {
    pub name: String,
    /// Fill value for missing entries.
    pub most_frequent: String,
    /// Categories seen at fit time, sorted; one indicator column each.
    pub categories: Vec<String>,
    /// Population standard deviation of each indicator column (1.0 if zero).
    pub scales: Vec<f64>,
}

impl CategoricalColumnState {
    /// Fit from the training values of one column.
    ///
    /// Ties for the most frequent category go to the lexicographically smallest.
    ///
    /// # Errors
    /// Returns a fit error when every value is missing.
    pub fn fit(name: &str, values: &[Option<String>]) -> RiskResult<Self> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_insert(0) += 1;
        }

        // BTreeMap iterates in ascending order, so the first strict maximum wins ties.
        let mut best: Option<(&str, usize)> = None;
        for (&category, &count) in &counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((category, count));
            }
        }
        let (most_frequent, _) = best.ok_or_else(|| {
            RiskError::Fit(format!(
                "categorical column '{}' has no non-missing values to impute from",
                name
            ))
        })?;
        let most_frequent = most_frequent.to_string();

        let missing = values.iter().filter(|v| v.is_none()).count();
        let n = values.len() as f64;

        let categories: Vec<String> = counts.keys().map(|c| c.to_string()).collect();
        let scales: Vec<f64> = categories
            .iter()
            .map(|category| {
                let mut count = counts[category.as_str()];
                if *category == most_frequent {
                    count += missing;
                }
                let p = count as f64 / n;
                safe_scale((p * (1.0 - p)).sqrt(), 0.0)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            most_frequent,
            categories,
            scales,
        })
    }

    /// Number of output columns this state produces.
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Append the scaled indicator values for one entry to `out`.
    ///
    /// A category not seen at fit time yields an all-zero row.
    pub fn transform_into(&self, value: Option<&str>, out: &mut Vec<f64>) {
        let value = value.unwrap_or(self.most_frequent.as_str());
        let hit = self
            .categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok();
        for (i, scale) in self.scales.iter().enumerate() {
            out.push(if hit == Some(i) { 1.0 / scale } else { 0.0 });
        }
    }

    /// Output column names, `<column>_<category>`.
    pub fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}_{}", self.name, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(|s| s.to_string())).collect()
    }

    #[test]
    fn test_categories_sorted_and_mode_imputed() {
        let values = owned(&[Some("medium"), Some("low"), None, Some("medium"), Some("high")]);
        let state = CategoricalColumnState::fit("bucket", &values).unwrap();

        assert_eq!(state.categories, vec!["high", "low", "medium"]);
        assert_eq!(state.most_frequent, "medium");

        let mut row = Vec::new();
        state.transform_into(None, &mut row);
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 0.0);
        assert!(row[2] > 0.0);
    }

    #[test]
    fn test_mode_tie_goes_to_smallest_category() {
        let values = owned(&[Some("b"), Some("a"), Some("b"), Some("a")]);
        let state = CategoricalColumnState::fit("c", &values).unwrap();
        assert_eq!(state.most_frequent, "a");
    }

    #[test]
    fn test_scale_is_indicator_std() {
        // "a" appears 1 of 4 times: p = 0.25, std = sqrt(0.1875)
        let values = owned(&[Some("a"), Some("b"), Some("b"), Some("b")]);
        let state = CategoricalColumnState::fit("c", &values).unwrap();

        let mut row = Vec::new();
        state.transform_into(Some("a"), &mut row);

        assert!((row[0] - 1.0 / 0.1875f64.sqrt()).abs() < 1e-12);
        assert_eq!(row[1], 0.0);
    }

    #[test]
    fn test_single_category_scale_is_one() {
        let values = owned(&[Some("only"), Some("only")]);
        let state = CategoricalColumnState::fit("c", &values).unwrap();
        let mut row = Vec::new();
        state.transform_into(Some("only"), &mut row);
        assert_eq!(row, vec![1.0]);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let values = owned(&[Some("low"), Some("high")]);
        let state = CategoricalColumnState::fit("c", &values).unwrap();

        let mut row = Vec::new();
        state.transform_into(Some("platinum"), &mut row);

        assert_eq!(row, vec![0.0, 0.0]);
    }

    #[test]
    fn test_all_missing_is_fit_error() {
        let err = CategoricalColumnState::fit("c", &[None, None]).unwrap_err();
        assert!(matches!(err, RiskError::Fit(_)));
    }

    #[test]
    fn test_output_names() {
        let values = owned(&[Some("low"), Some("high")]);
        let state = CategoricalColumnState::fit("score_3_bucket", &values).unwrap();
        let names: Vec<String> = state.output_names().collect();
        assert_eq!(names, vec!["score_3_bucket_high", "score_3_bucket_low"]);
    }
}
