//! CLI module - argument parsing, configuration resolution and subcommands

mod args;
mod config;
mod init;

pub use args::{Cli, Commands};
pub use config::build_config;
pub use init::run_init_config;
