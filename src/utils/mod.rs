//! Utility module - terminal styling, progress indicators, logging, artifact I/O

pub mod artifact;
pub mod logging;
pub mod progress;
pub mod styling;

pub use artifact::*;
pub use logging::*;
pub use progress::*;
pub use styling::*;
