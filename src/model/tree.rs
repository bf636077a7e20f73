//! Arena-based CART decision tree for binary classification.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::model::split::{find_best_split, gini, weighted_counts, SplitParams};

/// A node of the tree arena. Children are indices into the same arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Samples with `x[feature] <= threshold` go to `left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class-weighted class proportions of the training samples in this leaf.
    Leaf { distribution: [f64; 2] },
}

/// Per-tree growth limits, resolved against the data.
#[derive(Debug, Clone)]
pub(crate) struct TreeParams {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// A fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    /// Unnormalized weighted impurity decrease per feature.
    pub(crate) importances: Vec<f64>,
}

struct Pending {
    slot: usize,
    indices: Vec<usize>,
    depth: usize,
}

impl DecisionTree {
    /// Grow a tree on `sample_indices` (duplicates allowed, e.g. a bootstrap).
    ///
    /// Nodes are expanded depth-first from an explicit stack, so unbounded
    /// depth cannot overflow the call stack.
    pub(crate) fn grow(
        columns: &[Vec<f64>],
        labels: &[u8],
        weights: &[f64; 2],
        sample_indices: Vec<usize>,
        params: &TreeParams,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let split_params = SplitParams {
            max_features: params.max_features,
            min_samples_leaf: params.min_samples_leaf,
        };

        let mut nodes = vec![Node::Leaf {
            distribution: [0.0; 2],
        }];
        let mut importances = vec![0.0f64; columns.len()];
        let mut stack = vec![Pending {
            slot: 0,
            indices: sample_indices,
            depth: 0,
        }];

        while let Some(Pending {
            slot,
            indices,
            depth,
        }) = stack.pop()
        {
            let counts = weighted_counts(labels, weights, &indices);
            let n = indices.len();

            let at_depth_limit = params.max_depth.is_some_and(|d| depth >= d);
            let too_small =
                n < params.min_samples_split || n < 2 * params.min_samples_leaf;
            let pure = gini(&counts) <= 0.0;

            let split = if at_depth_limit || too_small || pure {
                None
            } else {
                find_best_split(columns, labels, weights, &indices, &split_params, &mut rng)
            };

            match split {
                Some(split) => {
                    importances[split.feature] += split.weighted_decrease;
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf {
                        distribution: [0.0; 2],
                    });
                    nodes.push(Node::Leaf {
                        distribution: [0.0; 2],
                    });
                    nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    stack.push(Pending {
                        slot: right,
                        indices: split.right_indices,
                        depth: depth + 1,
                    });
                    stack.push(Pending {
                        slot: left,
                        indices: split.left_indices,
                        depth: depth + 1,
                    });
                }
                None => {
                    nodes[slot] = Node::Leaf {
                        distribution: normalize(counts),
                    };
                }
            }
        }

        Self { nodes, importances }
    }

    /// Leaf distribution reached by `sample`.
    ///
    /// `sample` must have at least as many values as the training data had features.
    pub fn predict_proba(&self, sample: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return *distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Impurity-decrease importances normalized to sum to 1 (all zero for a stump).
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.importances.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.importances.len()];
        }
        self.importances.iter().map(|v| v / total).collect()
    }
}

fn normalize(counts: [f64; 2]) -> [f64; 2] {
    let total = counts[0] + counts[1];
    if total <= 0.0 {
        [0.5, 0.5]
    } else {
        [counts[0] / total, counts[1] / total]
    }
}
