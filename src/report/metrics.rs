//! Confusion matrix, per-class classification metrics and ROC-AUC.

use std::fmt;

use serde::Serialize;

use crate::error::{RiskError, RiskResult};

/// Binary confusion matrix.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    matrix: [[usize; 2]; 2],
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: usize,
    /// TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// 0.0 if both precision and recall are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted 0/1 labels.
    ///
    /// # Errors
    /// Returns an evaluation error for empty or mismatched inputs or labels outside {0, 1}.
    pub fn from_labels(true_labels: &[u8], predicted: &[usize]) -> RiskResult<Self> {
        if true_labels.is_empty() {
            return Err(RiskError::Evaluation("no labels to evaluate".to_string()));
        }
        if true_labels.len() != predicted.len() {
            return Err(RiskError::Evaluation(format!(
                "{} true labels but {} predictions",
                true_labels.len(),
                predicted.len()
            )));
        }
        let mut matrix = [[0usize; 2]; 2];
        for (&t, &p) in true_labels.iter().zip(predicted) {
            if t > 1 || p > 1 {
                return Err(RiskError::Evaluation(format!(
                    "labels must be 0 or 1, found true={} predicted={}",
                    t, p
                )));
            }
            matrix[t as usize][p] += 1;
        }
        Ok(Self { matrix })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct = self.matrix[0][0] + self.matrix[1][1];
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..2)
            .map(|c| {
                let other = 1 - c;
                let tp = self.matrix[c][c];
                let fp = self.matrix[other][c];
                let fn_ = self.matrix[c][other];
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn as_rows(&self) -> &[[usize; 2]; 2] {
        &self.matrix
    }
}

/// Averaged precision, recall and F1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Text-and-JSON classification report for a binary classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_labels(true_labels: &[u8], predicted: &[usize]) -> RiskResult<Self> {
        let confusion_matrix = ConfusionMatrix::from_labels(true_labels, predicted)?;
        let classes = confusion_matrix.class_metrics();
        let total = confusion_matrix.total();

        let mean = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(f).sum::<f64>() / classes.len() as f64
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };

        let macro_avg = AverageMetrics {
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1: mean(|c| c.f1),
            support: total,
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Ok(Self {
            accuracy: confusion_matrix.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
            confusion_matrix,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const W: usize = 12;
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>W$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.class, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>W$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores receive the average of the ranks they span.
///
/// # Errors
/// Returns an evaluation error when only one class is present, when the
/// inputs are empty or differ in length, or when a score is NaN.
pub fn roc_auc_score(true_labels: &[u8], scores: &[f64]) -> RiskResult<f64> {
    if true_labels.len() != scores.len() {
        return Err(RiskError::Evaluation(format!(
            "{} labels but {} scores",
            true_labels.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(RiskError::Evaluation("scores contain NaN".to_string()));
    }

    let n_pos = true_labels.iter().filter(|&&l| l == 1).count();
    let n_neg = true_labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RiskError::Evaluation(
            "ROC-AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Sum of 1-based average ranks of the positive samples.
    let mut positive_rank_sum = 0.0f64;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end]
            .iter()
            .filter(|&&i| true_labels[i] == 1)
            .count();
        positive_rank_sum += avg_rank * positives as f64;
        start = end;
    }

    let n_pos_f = n_pos as f64;
    let u = positive_rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok(u / (n_pos_f * n_neg as f64))
}
