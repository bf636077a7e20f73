//! Resolve the effective pipeline configuration from file and flags

use anyhow::{Context, Result};

use super::args::Cli;
use crate::pipeline::PipelineConfig;

/// Start from the configuration file (or the defaults) and apply every flag
/// that was given on the command line.
pub fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(input) = &cli.input {
        config.input = input.clone();
    }
    if let Some(dir) = &cli.artifacts_dir {
        config.artifacts_dir = dir.clone();
    }
    if let Some(seed) = cli.seed {
        config.split.seed = seed;
        config.search.seed = seed;
    }
    if let Some(test_size) = cli.test_size {
        config.split.test_size = test_size;
    }
    if let Some(n_iter) = cli.search_iterations {
        config.search.n_iter = n_iter;
    }
    if let Some(folds) = cli.cv_folds {
        config.search.cv_folds = folds as usize;
    }
    if let Some(n) = cli.infer_schema_length {
        config.infer_schema_length = n;
    }

    config.validate().context("Invalid pipeline configuration")?;
    Ok(config)
}
