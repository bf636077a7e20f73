//! credit-risk: Credit Default Scoring CLI
//!
//! Runs ingestion, transformation and training in sequence and writes every
//! artifact to the configured artifacts directory.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use credit_risk::cli::{build_config, run_init_config, Cli, Commands};
use credit_risk::pipeline::{run_ingestion, run_training, run_transformation, summarize};
use credit_risk::utils::{
    create_spinner, finish_with_success, init_logging, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::InitConfig { path, force } => run_init_config(path, *force),
        };
    }

    let config = build_config(&cli)?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // Step 1: Ingestion
    print_step_header(1, "Data Ingestion");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading and splitting dataset...");
    let ingestion = run_ingestion(&config)?;
    finish_with_success(&spinner, "Raw copy and splits written");
    print_count("rows read", ingestion.total_rows, None);
    print_count(
        "train / test rows",
        ingestion.train_rows,
        Some(&format!("/ {}", ingestion.test_rows)),
    );
    print_step_time(step_start.elapsed());

    // Step 2: Transformation
    print_step_header(2, "Data Transformation");
    let step_start = Instant::now();
    let spinner = create_spinner("Cleaning and fitting column transform...");
    let prepared = run_transformation(
        &config,
        &ingestion.train_data_path,
        &ingestion.test_data_path,
    )?;
    finish_with_success(&spinner, "Train and test sets prepared");
    print_count("prepared feature columns", prepared.train.n_cols(), None);
    print_info(&format!(
        "Preprocessor saved to {}",
        prepared.preprocessor_path.display()
    ));
    print_step_time(step_start.elapsed());

    // Step 3: Training
    print_step_header(3, "Model Training");
    let step_start = Instant::now();
    let outcome = run_training(&config, &prepared)?;
    print_success(&format!("Model saved to {}", outcome.model_path.display()));
    print_info(&format!(
        "Metrics saved to {}",
        outcome.metrics_path.display()
    ));
    print_step_time(step_start.elapsed());

    println!();
    for line in outcome.report.to_string().lines() {
        println!("    {}", line);
    }

    summarize(&config, &ingestion, &prepared, &outcome).display();
    print_completion();

    Ok(())
}
