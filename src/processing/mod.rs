//! Reading classification, candidate storage and selection

pub mod classifier;
pub mod candidates;
pub mod selector;

pub use classifier::{ClassifierConfig, SourceClassifier, SourceLabel};
pub use candidates::CandidateStore;
pub use selector::{select, SelectError};
