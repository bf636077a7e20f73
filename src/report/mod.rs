//! Report module - evaluation metrics, run summary and metrics export

pub mod metrics;
pub mod metrics_export;
pub mod summary;

pub use metrics::*;
pub use metrics_export::*;
pub use summary::*;
