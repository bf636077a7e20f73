//! `init-config` subcommand

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::PipelineConfig;

/// Write the default configuration to `path`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    PipelineConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))?;

    println!(
        "    {} Default configuration written to {}",
        style("✓").green().bold(),
        style(path.display()).cyan()
    );
    Ok(())
}
