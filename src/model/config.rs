//! Configuration builder for Random Forest training.

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::model::forest::RandomForest;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least 1.
    Sqrt,
    /// `floor(log2(n_features))`, at least 1.
    Log2,
    /// All features (no subsampling).
    All,
    /// A fixed count.
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete feature count for `n_features` columns.
    ///
    /// # Errors
    /// Returns a fit error when a fixed count is outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> RiskResult<usize> {
        let resolved = match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => ((n_features as f64).log2().floor() as usize).max(1),
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(n) => n,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RiskError::Fit(format!(
                "max_features resolves to {} but the data has {} feature(s)",
                resolved, n_features
            )));
        }
        Ok(resolved)
    }
}

/// Per-class sample weighting used in impurity and leaf distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every sample weighs 1.
    None,
    /// `n_samples / (n_classes * class_count)`, computed on the full training labels.
    Balanced,
}

impl ClassWeight {
    /// Weight of class 0 and class 1 for the given labels.
    pub fn weights(self, labels: &[u8]) -> [f64; 2] {
        match self {
            ClassWeight::None => [1.0, 1.0],
            ClassWeight::Balanced => {
                let n = labels.len() as f64;
                let events = labels.iter().filter(|&&l| l == 1).count();
                let counts = [labels.len() - events, events];
                counts.map(|c| if c == 0 { 1.0 } else { n / (2.0 * c as f64) })
            }
        }
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `bootstrap`         | `true`     |
/// | `class_weight`      | `Balanced` |
/// | `seed`              | 42         |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) bootstrap: bool,
    pub(crate) class_weight: ClassWeight,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns a fit error if `n_trees` is zero.
    pub fn new(n_trees: usize) -> RiskResult<Self> {
        if n_trees == 0 {
            return Err(RiskError::Fit("n_trees must be at least 1".to_string()));
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Draw a bootstrap sample per tree (`true`) or train every tree on all rows.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check hyperparameters that do not depend on the data.
    pub fn validate(&self) -> RiskResult<()> {
        if self.n_trees == 0 {
            return Err(RiskError::Fit("n_trees must be at least 1".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(RiskError::Fit("max_depth must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(RiskError::Fit(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(RiskError::Fit(format!(
                "min_samples_leaf must be at least 1, got {}",
                self.min_samples_leaf
            )));
        }
        if self.max_features == MaxFeatures::Fixed(0) {
            return Err(RiskError::Fit("max_features must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Train a Random Forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` in row-major layout, `labels` 0/1.
    ///
    /// # Errors
    ///
    /// Returns a fit error when the data is empty, has no features, has
    /// ragged rows or non-finite values, when a label is not 0/1, or when a
    /// hyperparameter is invalid for the data.
    pub fn fit(&self, features: &[Vec<f64>], labels: &[u8]) -> RiskResult<RandomForest> {
        crate::model::forest::train(self, features, labels)
    }
}
