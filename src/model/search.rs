//! Randomized hyperparameter search scored by stratified k-fold ROC-AUC.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RiskError, RiskResult};
use crate::model::config::{ClassWeight, MaxFeatures, RandomForestConfig};
use crate::report::metrics::roc_auc_score;

/// Stratified k-fold splitter.
///
/// Groups samples by class, shuffles within each class, then round-robins
/// across folds so each fold gets approximately equal representation of
/// each class.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_folds: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// # Errors
    ///
    /// Returns a configuration error if `n_folds` < 2.
    pub fn new(n_folds: usize) -> RiskResult<Self> {
        if n_folds < 2 {
            return Err(RiskError::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                n_folds
            )));
        }
        Ok(Self { n_folds, seed: 42 })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// `(train_indices, test_indices)` for each fold, both sorted ascending.
    ///
    /// # Errors
    /// Returns an evaluation error when a present class has fewer samples than folds.
    pub fn split(&self, labels: &[u8]) -> RiskResult<Vec<(Vec<usize>, Vec<usize>)>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; 2];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[usize::from(label == 1)].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(RiskError::Evaluation(format!(
                    "class {} has {} sample(s), fewer than the {} folds requested",
                    class,
                    indices.len(),
                    self.n_folds
                )));
            }
        }

        let mut fold_assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok((0..self.n_folds)
            .map(|fold| {
                let (train, test): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| fold_assignments[i] != fold);
                (train, test)
            })
            .collect())
    }
}

/// Half-open integer range `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: usize,
    pub high: usize,
}

impl IntRange {
    pub const fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    fn sample(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(self.low..self.high)
    }
}

/// Distributions the randomized search draws hyperparameters from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSpace {
    pub n_estimators: IntRange,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: IntRange,
    pub min_samples_leaf: IntRange,
    pub max_features: Vec<MaxFeatures>,
    pub bootstrap: Vec<bool>,
    pub class_weight: ClassWeight,
}

impl Default for ParamSpace {
    fn default() -> Self {
        Self {
            n_estimators: IntRange::new(100, 1000),
            max_depth: vec![None, Some(10), Some(20), Some(30), Some(40), Some(50)],
            min_samples_split: IntRange::new(2, 20),
            min_samples_leaf: IntRange::new(1, 20),
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2],
            bootstrap: vec![true, false],
            class_weight: ClassWeight::Balanced,
        }
    }
}

impl ParamSpace {
    /// Check that every range is non-empty and every bound is a legal hyperparameter.
    pub fn validate(&self) -> RiskResult<()> {
        let ranges = [
            ("n_estimators", self.n_estimators, 1),
            ("min_samples_split", self.min_samples_split, 2),
            ("min_samples_leaf", self.min_samples_leaf, 1),
        ];
        for (name, range, min_low) in ranges {
            if range.low >= range.high {
                return Err(RiskError::Config(format!(
                    "search range for {} is empty: [{}, {})",
                    name, range.low, range.high
                )));
            }
            if range.low < min_low {
                return Err(RiskError::Config(format!(
                    "search range for {} must start at {} or above, got {}",
                    name, min_low, range.low
                )));
            }
        }
        if self.max_depth.is_empty() || self.max_features.is_empty() || self.bootstrap.is_empty() {
            return Err(RiskError::Config(
                "max_depth, max_features and bootstrap choices must not be empty".to_string(),
            ));
        }
        if self.max_depth.contains(&Some(0)) {
            return Err(RiskError::Config("max_depth choice 0 is invalid".to_string()));
        }
        if self.max_features.contains(&MaxFeatures::Fixed(0)) {
            return Err(RiskError::Config("max_features choice 0 is invalid".to_string()));
        }
        Ok(())
    }

    /// Draw one candidate configuration.
    pub fn sample(&self, rng: &mut impl Rng, seed: u64) -> RiskResult<RandomForestConfig> {
        let n_estimators = self.n_estimators.sample(rng);
        let max_depth = *choose(&self.max_depth, rng, "max_depth")?;
        let min_samples_split = self.min_samples_split.sample(rng);
        let min_samples_leaf = self.min_samples_leaf.sample(rng);
        let max_features = *choose(&self.max_features, rng, "max_features")?;
        let bootstrap = *choose(&self.bootstrap, rng, "bootstrap")?;

        Ok(RandomForestConfig::new(n_estimators)?
            .with_max_depth(max_depth)
            .with_min_samples_split(min_samples_split)
            .with_min_samples_leaf(min_samples_leaf)
            .with_max_features(max_features)
            .with_bootstrap(bootstrap)
            .with_class_weight(self.class_weight)
            .with_seed(seed))
    }

    /// Forest defaults (100 trees, unlimited depth, sqrt features, bootstrap)
    /// with this space's class weighting; used when search is disabled.
    pub fn baseline(&self, seed: u64) -> RiskResult<RandomForestConfig> {
        Ok(RandomForestConfig::new(100)?
            .with_class_weight(self.class_weight)
            .with_seed(seed))
    }
}

fn choose<'a, T>(options: &'a [T], rng: &mut impl Rng, name: &str) -> RiskResult<&'a T> {
    options
        .choose(rng)
        .ok_or_else(|| RiskError::Config(format!("no choices for {}", name)))
}

/// One scored hyperparameter candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub config: RandomForestConfig,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Every scored candidate plus the index of the best one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub candidates: Vec<Candidate>,
    pub best_index: usize,
}

impl SearchResult {
    pub fn best(&self) -> &Candidate {
        &self.candidates[self.best_index]
    }
}

/// Randomized search over a [`ParamSpace`].
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    space: ParamSpace,
    n_iter: usize,
    cv_folds: usize,
    seed: u64,
}

impl RandomizedSearch {
    pub fn new(space: ParamSpace, n_iter: usize) -> Self {
        Self {
            space,
            n_iter,
            cv_folds: 5,
            seed: 42,
        }
    }

    #[must_use]
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Seed for candidate sampling, fold shuffling and every candidate forest.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Score `n_iter` sampled candidates; the highest mean AUC wins, the
    /// first one on ties.
    ///
    /// `on_candidate` is called after each candidate is scored.
    #[instrument(skip_all, fields(n_iter = self.n_iter, cv_folds = self.cv_folds, n_samples = features.len()))]
    pub fn run<F>(
        &self,
        features: &[Vec<f64>],
        labels: &[u8],
        mut on_candidate: F,
    ) -> RiskResult<SearchResult>
    where
        F: FnMut(usize, &Candidate),
    {
        if self.n_iter == 0 {
            return Err(RiskError::Config(
                "randomized search needs at least one iteration".to_string(),
            ));
        }
        if features.len() != labels.len() {
            return Err(RiskError::Fit(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        self.space.validate()?;

        let folds = StratifiedKFold::new(self.cv_folds)?
            .with_seed(self.seed)
            .split(labels)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut candidates = Vec::with_capacity(self.n_iter);
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;

        for iteration in 0..self.n_iter {
            let config = self.space.sample(&mut rng, self.seed)?;
            let candidate = score_candidate(config, features, labels, &folds)?;

            debug!(
                iteration,
                n_trees = candidate.config.n_trees(),
                mean_auc = candidate.mean_score,
                "candidate scored"
            );

            if candidate.mean_score > best_score {
                best_score = candidate.mean_score;
                best_index = iteration;
            }
            on_candidate(iteration, &candidate);
            candidates.push(candidate);
        }

        let result = SearchResult {
            candidates,
            best_index,
        };
        info!(
            best_index,
            best_mean_auc = result.best().mean_score,
            "randomized search complete"
        );
        Ok(result)
    }
}

/// Mean and population std of per-fold ROC-AUC for one configuration.
fn score_candidate(
    config: RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[u8],
    folds: &[(Vec<usize>, Vec<usize>)],
) -> RiskResult<Candidate> {
    let mut fold_scores = Vec::with_capacity(folds.len());

    for (train_idx, test_idx) in folds {
        let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| features[i].clone()).collect();
        let train_y: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();
        let test_x: Vec<Vec<f64>> = test_idx.iter().map(|&i| features[i].clone()).collect();
        let test_y: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();

        let forest = config.fit(&train_x, &train_y)?;
        let scores = forest.positive_scores(&test_x)?;
        fold_scores.push(roc_auc_score(&test_y, &scores)?);
    }

    let n = fold_scores.len() as f64;
    let mean_score = fold_scores.iter().sum::<f64>() / n;
    let std_score =
        (fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n).sqrt();

    Ok(Candidate {
        config,
        fold_scores,
        mean_score,
        std_score,
    })
}
