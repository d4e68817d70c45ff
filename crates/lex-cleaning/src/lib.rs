//! Data Cleaning Library
//!
//! Loads a table of customer records from a relational store, finds duplicate
//! and anomalous records, and writes a cleaned copy back to the store or to CSV.
//!
//! # Overview
//!
//! - **Store Access**: Full-table reads and transactional table replacement
//!   behind the [`TableSource`] / [`TableSink`] traits, with a SQLite backend
//! - **Normalization**: Numeric coercion of the analysed fields
//! - **Duplicate Detection**: Grouping on an operator-chosen key-field subset
//! - **Outlier Detection**: Mean imputation, standardization and a pluggable
//!   [`OutlierModel`] (isolation forest or z-score)
//! - **Cleaning**: Deduplication, text and numeric imputation, outlier removal
//! - **Export**: CSV encoding of the cleaned table
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaning::{CleanerConfig, CleaningPipeline, SqliteStore};
//!
//! let store = SqliteStore::connect("sqlite://customers.db").await?;
//!
//! let config = CleanerConfig::builder()
//!     .contamination(0.05)
//!     .remove_outliers(true)
//!     .persist_to_store(true)
//!     .build()?;
//!
//! let run = CleaningPipeline::new(config)?.run(&store).await?;
//! println!("Loaded {} rows", run.report.rows_loaded);
//!
//! store.close().await;
//! ```
//!
//! # Interactive Sessions
//!
//! [`CleaningSession`] keeps the loaded table and the latest analyses so each
//! parameter change recomputes only its own stage:
//!
//! ```rust,ignore
//! use lex_cleaning::{CleanerConfig, CleaningSession};
//!
//! let mut session = CleaningSession::new(table, CleanerConfig::default())?;
//! session.select_duplicate_keys(vec!["name".into(), "email".into()])?;
//! session.run_outlier_analysis(0.1)?;
//! session.set_remove_outliers(true);
//! let outcome = session.apply_cleaning()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod profiler;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{CleanerConfig, CleanerConfigBuilder, ConfigValidationError, OutlierModelKind};
pub use detection::{DuplicateDetector, IsolationForest, OutlierDetector, OutlierModel, ZScoreModel};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use export::{to_delimited_bytes, write_delimited_file};
pub use pipeline::{CleaningPipeline, CleaningSession, PipelineRun};
pub use profiler::DataProfiler;
pub use store::{SqliteStore, TableSink, TableSource};
pub use types::{
    CleaningOutcome, CleaningSummary, DuplicateReport, FieldProfile, FieldRole, OutlierLabel,
    OutlierReport, RunReport, SinkOutcome,
};
