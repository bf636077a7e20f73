//! Best-split search on class-weighted Gini impurity.

use rand::Rng;

/// Gini impurity `1 - Σ(p_i²)` of class-weighted counts.
///
/// Returns 0.0 for an empty node.
#[must_use]
pub fn gini(weighted_counts: &[f64; 2]) -> f64 {
    let total = weighted_counts[0] + weighted_counts[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = weighted_counts[0] / total;
    let p1 = weighted_counts[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

/// Weighted class totals over `sample_indices`.
pub(crate) fn weighted_counts(labels: &[u8], weights: &[f64; 2], sample_indices: &[usize]) -> [f64; 2] {
    let mut counts = [0.0f64; 2];
    for &si in sample_indices {
        let class = labels[si] as usize;
        counts[class] += weights[class];
    }
    counts
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    /// `W_node·gini(node) − W_left·gini(left) − W_right·gini(right)`.
    pub(crate) weighted_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Node-level split parameters.
pub(crate) struct SplitParams {
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Midpoint between two adjacent sorted values, kept strictly below `next`.
fn midpoint(value: f64, next: f64) -> f64 {
    let mid = value + (next - value) / 2.0;
    if mid >= next {
        value
    } else {
        mid
    }
}

/// Find the best split among a random subset of features.
///
/// Features are drawn without replacement by partial Fisher-Yates. Drawing
/// continues past `max_features` while the features seen so far are all
/// constant within the node, so a splittable node is never turned into a
/// leaf only because of an unlucky draw.
///
/// `columns` is column-major: `columns[feature_idx][sample_idx]`.
///
/// Returns `None` when no split satisfies `min_samples_leaf`.
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[u8],
    weights: &[f64; 2],
    sample_indices: &[usize],
    params: &SplitParams,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = columns.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent_counts = weighted_counts(labels, weights, sample_indices);
    let parent_weight = parent_counts[0] + parent_counts[1];
    let parent_score = parent_weight * gini(&parent_counts);

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let mut visited_non_constant = 0usize;

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

    for i in 0..n_features {
        if visited_non_constant >= params.max_features {
            break;
        }
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
        let feat_idx = feature_order[i];
        let feat_col = &columns[feat_idx];

        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (feat_col[si], si)));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if sorted[0].0 == sorted[n_samples - 1].0 {
            continue;
        }
        visited_non_constant += 1;

        // Incremental scan: left grows from empty, right shrinks from full.
        let mut left_counts = [0.0f64; 2];
        for k in 0..(n_samples - 1) {
            let (value, si) = sorted[k];
            let class = labels[si] as usize;
            left_counts[class] += weights[class];

            let next = sorted[k + 1].0;
            if value == next {
                continue;
            }
            let n_left = k + 1;
            let n_right = n_samples - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }

            let right_counts = [
                parent_counts[0] - left_counts[0],
                parent_counts[1] - left_counts[1],
            ];
            let w_left = left_counts[0] + left_counts[1];
            let w_right = right_counts[0] + right_counts[1];
            let decrease =
                parent_score - w_left * gini(&left_counts) - w_right * gini(&right_counts);

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feat_idx, midpoint(value, next)));
            }
        }
    }

    let (feature, threshold) = best?;
    let feat_col = &columns[feature];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        weighted_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}
