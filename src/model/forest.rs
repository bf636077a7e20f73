//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RiskError, RiskResult};
use crate::model::config::RandomForestConfig;
use crate::model::tree::{DecisionTree, TreeParams};

/// A fitted Random Forest ensemble for binary targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) config: RandomForestConfig,
}

/// Check shape, finiteness and label range of a training set.
fn validate_training_data(features: &[Vec<f64>], labels: &[u8]) -> RiskResult<usize> {
    if features.is_empty() {
        return Err(RiskError::Fit("cannot train on an empty dataset".to_string()));
    }
    if features.len() != labels.len() {
        return Err(RiskError::Fit(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RiskError::Fit("training rows have zero features".to_string()));
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RiskError::Fit(format!(
                "row {} has {} features, expected {}",
                sample_index,
                row.len(),
                n_features
            )));
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::Fit(format!(
                "non-finite value at row {}, feature {}",
                sample_index, feature_index
            )));
        }
    }
    if let Some(label) = labels.iter().find(|&&l| l > 1) {
        return Err(RiskError::Fit(format!(
            "labels must be 0 or 1, found {}",
            label
        )));
    }
    Ok(n_features)
}

/// Bootstrap sample of `n_samples` indices drawn with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[u8],
) -> RiskResult<RandomForest> {
    config.validate()?;
    let n_features = validate_training_data(features, labels)?;
    let n_samples = features.len();

    let params = TreeParams {
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        max_features: config.max_features.resolve(n_features)?,
    };
    let weights = config.class_weight.weights(labels);

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        max_features = params.max_features,
        bootstrap = config.bootstrap,
        "training random forest"
    );

    // Column-major copy shared by every tree.
    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|j| features.iter().map(|row| row[j]).collect())
        .collect();

    // Per-tree seeds from the master RNG keep results independent of thread count.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.gen()).collect();
    let bootstrap = config.bootstrap;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let indices = if bootstrap {
                bootstrap_sample(n_samples, &mut rng)
            } else {
                (0..n_samples).collect()
            };
            DecisionTree::grow(&columns, labels, &weights, indices, &params, rng.gen())
        })
        .collect();

    debug!(n_trees_trained = trees.len(), "tree training complete");

    Ok(RandomForest {
        trees,
        n_features,
        feature_names: (0..n_features).map(|i| format!("x{}", i)).collect(),
        config: config.clone(),
    })
}

impl RandomForest {
    /// Attach output column names of the feature matrix the forest was trained on.
    pub fn with_feature_names(mut self, names: &[String]) -> RiskResult<Self> {
        if names.len() != self.n_features {
            return Err(RiskError::Fit(format!(
                "{} feature names for a forest trained on {} features",
                names.len(),
                self.n_features
            )));
        }
        self.feature_names = names.to_vec();
        Ok(self)
    }

    fn check_sample(&self, sample: &[f64]) -> RiskResult<()> {
        if sample.len() != self.n_features {
            return Err(RiskError::Fit(format!(
                "sample has {} features, model expects {}",
                sample.len(),
                self.n_features
            )));
        }
        Ok(())
    }

    /// Return the averaged class probability distribution `[p(0), p(1)]` for one sample.
    pub fn predict_proba(&self, sample: &[f64]) -> RiskResult<Vec<f64>> {
        self.check_sample(sample)?;

        let mut avg = vec![0.0f64; 2];
        for tree in &self.trees {
            let proba = tree.predict_proba(sample);
            avg[0] += proba[0];
            avg[1] += proba[1];
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(avg)
    }

    /// Predicted class (argmax of probabilities; class 0 wins an exact tie).
    pub fn predict(&self, sample: &[f64]) -> RiskResult<usize> {
        let proba = self.predict_proba(sample)?;
        Ok(usize::from(proba[1] > proba[0]))
    }

    /// Probability distributions for a batch of samples, in parallel.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> RiskResult<Vec<Vec<f64>>> {
        features
            .par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Predicted classes for a batch of samples, in parallel.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> RiskResult<Vec<usize>> {
        features
            .par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Probability of the event class for each sample.
    pub fn positive_scores(&self, features: &[Vec<f64>]) -> RiskResult<Vec<f64>> {
        Ok(self
            .predict_proba_batch(features)?
            .into_iter()
            .map(|p| p[1])
            .collect())
    }

    /// Mean of the per-tree normalized impurity-decrease importances.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let n = self.trees.len() as f64;
        total.iter_mut().for_each(|v| *v /= n);
        total
    }

    /// `(feature name, importance)` pairs sorted by descending importance.
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Hyperparameters the forest was trained with.
    #[must_use]
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::MaxFeatures;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_learns_separable_data() {
        let (features, labels) = separable();
        let forest = RandomForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_bootstrap(false)
            .fit(&features, &labels)
            .unwrap();

        assert_eq!(forest.predict(&[1.5, 0.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[11.5, 0.0]).unwrap(), 1);
        let proba = forest.predict_proba(&[11.5, 0.0]).unwrap();
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let (features, labels) = separable();
        let config = RandomForestConfig::new(8).unwrap().with_seed(7);

        let a = config.fit(&features, &labels).unwrap();
        let b = config.fit(&features, &labels).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_informative_feature_dominates_importance() {
        let (features, labels) = separable();
        let forest = RandomForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_bootstrap(false)
            .fit(&features, &labels)
            .unwrap();

        let imp = forest.feature_importances();
        assert!(imp[0] > 0.99);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let config = RandomForestConfig::new(3).unwrap();

        assert!(config.fit(&[], &[]).is_err());
        assert!(config.fit(&[vec![]], &[0]).is_err());
        assert!(config.fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1]).is_err());
        assert!(config.fit(&[vec![f64::NAN]], &[0]).is_err());
        assert!(config.fit(&[vec![1.0]], &[2]).is_err());
        assert!(config.fit(&[vec![1.0]], &[0, 1]).is_err());
    }

    #[test]
    fn test_prediction_feature_mismatch() {
        let (features, labels) = separable();
        let forest = RandomForestConfig::new(2).unwrap().fit(&features, &labels).unwrap();
        assert!(forest.predict(&[1.0]).is_err());
        assert!(forest.predict_batch(&[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_feature_names_length_checked() {
        let (features, labels) = separable();
        let forest = RandomForestConfig::new(2).unwrap().fit(&features, &labels).unwrap();
        assert_eq!(forest.feature_names(), &["x0".to_string(), "x1".to_string()]);

        let names = vec!["num__income".to_string(), "num__score_3".to_string()];
        let forest = forest.with_feature_names(&names).unwrap();
        assert_eq!(forest.ranked_importances()[0].0, "num__income");
        assert!(forest.with_feature_names(&names[..1]).is_err());
    }
}
