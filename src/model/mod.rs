//! Random Forest classifier, hyperparameter search and model persistence

pub mod config;
pub mod forest;
pub mod search;
pub mod serialize;
pub mod split;
pub mod tree;

pub use config::{ClassWeight, MaxFeatures, RandomForestConfig};
pub use forest::RandomForest;
pub use search::{Candidate, IntRange, ParamSpace, RandomizedSearch, SearchResult, StratifiedKFold};
pub use serialize::MODEL_FORMAT_VERSION;
pub use tree::{DecisionTree, Node};
