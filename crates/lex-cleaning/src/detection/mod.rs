//! Read-only analyses over a loaded table.
//!
//! Both detectors leave the table untouched; their reports feed the cleaner.

mod duplicates;
pub mod models;
mod outliers;

pub use duplicates::DuplicateDetector;
pub use models::{IsolationForest, OutlierModel, ZScoreModel};
pub use outliers::OutlierDetector;
