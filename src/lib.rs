//! credit-risk: Credit Default Scoring Library
//!
//! A linear pipeline that ingests a labeled credit dataset, cleans and
//! transforms its features, selects a Random Forest configuration by
//! randomized search with stratified cross-validation and evaluates the
//! final model on a held-out test split.

pub mod cli;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{RiskError, RiskResult};
