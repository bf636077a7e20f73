//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// credit-risk - Train and evaluate a credit default classifier from a labeled CSV
#[derive(Parser, Debug)]
#[command(name = "credit-risk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input dataset path (CSV or Parquet).
    /// Defaults to the path in the configuration file, or
    /// notebooks/data/acquisition_train.csv without one.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory receiving data.csv, train.csv, test.csv, preprocessor.json,
    /// model.json and metrics.json
    #[arg(short, long)]
    pub artifacts_dir: Option<PathBuf>,

    /// JSON configuration file (see `credit-risk init-config`).
    /// Command-line flags override values from this file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seed for the train/test split, cross-validation folds and model
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out as the test set (exclusive range 0.0 to 1.0)
    #[arg(long, value_parser = validate_test_size)]
    pub test_size: Option<f64>,

    /// Number of randomized search candidates. 0 disables the search and
    /// fits the baseline forest configuration.
    #[arg(long)]
    pub search_iterations: Option<usize>,

    /// Stratified folds used to score each search candidate
    #[arg(long, value_parser = clap::value_parser!(u64).range(2..))]
    pub cv_folds: Option<u64>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long)]
    pub infer_schema_length: Option<usize>,

    /// Log level filter (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default pipeline configuration as JSON
    InitConfig {
        /// Output file path
        #[arg(default_value = "credit-risk.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_size must be between 0.0 and 1.0 (exclusive), got {}",
            value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_test_size() {
        assert_eq!(validate_test_size("0.2"), Ok(0.2));
        assert!(validate_test_size("0").is_err());
        assert!(validate_test_size("1.0").is_err());
        assert!(validate_test_size("abc").is_err());
    }

    #[test]
    fn test_defaults_leave_overrides_unset() {
        let cli = Cli::parse_from(["credit-risk"]);
        assert!(cli.command.is_none());
        assert!(cli.input.is_none());
        assert!(cli.seed.is_none());
        assert!(cli.search_iterations.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_init_config_default_path() {
        let cli = Cli::parse_from(["credit-risk", "init-config"]);
        match cli.command {
            Some(Commands::InitConfig { path, force }) => {
                assert_eq!(path, PathBuf::from("credit-risk.json"));
                assert!(!force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cv_folds_lower_bound() {
        assert!(Cli::try_parse_from(["credit-risk", "--cv-folds", "1"]).is_err());
        let cli = Cli::try_parse_from(["credit-risk", "--cv-folds", "3"]).unwrap();
        assert_eq!(cli.cv_folds, Some(3));
    }
}
