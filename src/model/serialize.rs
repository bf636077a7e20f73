//! Model persistence as a versioned JSON envelope.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RiskError, RiskResult};
use crate::model::forest::RandomForest;
use crate::utils::write_atomic;

/// Current model file format version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(Serialize, Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    crate_version: String,
    n_trees: usize,
    n_features: usize,
    feature_names: Vec<String>,
    forest: RandomForest,
}

impl RandomForest {
    /// Save the model as JSON, atomically replacing any existing file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        let envelope = ModelEnvelope {
            format_version: MODEL_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            n_trees: self.trees.len(),
            n_features: self.n_features,
            feature_names: self.feature_names.clone(),
            forest: self.clone(),
        };

        let bytes = serde_json::to_vec(&envelope).map_err(|e| RiskError::Serialize {
            what: "model".to_string(),
            source: e,
        })?;
        write_atomic(path, &bytes)?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );
        Ok(())
    }

    /// Load a model written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RiskError::Io`] | file read failed |
    /// | [`RiskError::Serialize`] | JSON decoding failed |
    /// | [`RiskError::IncompatibleFormat`] | format version mismatch |
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> RiskResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| RiskError::io(path, e))?;

        let envelope: ModelEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| RiskError::Serialize {
                what: format!("model {}", path.display()),
                source: e,
            })?;

        if envelope.format_version != MODEL_FORMAT_VERSION {
            return Err(RiskError::IncompatibleFormat {
                what: "model".to_string(),
                path: path.to_path_buf(),
                expected: MODEL_FORMAT_VERSION,
                found: envelope.format_version,
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            crate_version = %envelope.crate_version,
            "model loaded"
        );
        Ok(envelope.forest)
    }
}
