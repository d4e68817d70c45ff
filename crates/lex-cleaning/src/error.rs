//! Custom error types for the cleaning pipeline.
//!
//! Errors fall into three groups that drive how the CLI reacts:
//!
//! - **Fatal** (`Connection`, `Query`): the session cannot continue and nothing
//!   downstream runs.
//! - **Stage-local** (`Configuration`, `InvalidConfig`, `ColumnNotFound`): the
//!   affected stage pauses until the operator corrects the input.
//! - **Sink** (`Write`): the write is abandoned, but the in-memory cleaned
//!   table stays valid and can still be exported.
//!
//! Errors serialize as `{ code, message }` for machine-readable reports.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Message used when outlier removal is requested without a usable analysis.
pub const NO_OUTLIER_ANALYSIS: &str = "no outlier analysis available";

/// Message used when a duplicate scan is requested with no key fields.
pub const EMPTY_KEY_SELECTION: &str = "must select at least one field";

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The backing store could not be reached.
    #[error("Could not connect to data store: {0}")]
    Connection(String),

    /// The table does not exist or the query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Operator-supplied input is unusable for the requested stage.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid configuration values.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigValidationError),

    /// Field was not found in the table.
    #[error("Field '{0}' not found in table")]
    ColumnNotFound(String),

    /// Writing to a sink failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// The outlier model could not score the input.
    #[error("Outlier model error: {0}")]
    Model(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Error returned when outlier removal has no current analysis to use.
    pub fn no_outlier_analysis() -> Self {
        CleaningError::Configuration(NO_OUTLIER_ANALYSIS.to_string())
    }

    /// Get a stable error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::Configuration(_) | Self::InvalidConfig(_) => "CONFIGURATION_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Write(_) => "WRITE_ERROR",
            Self::Model(_) => "MODEL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error ends the session (no retry, nothing downstream runs).
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Query(_) => true,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Check if the operator can recover by correcting input or retrying the sink.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Configuration(_)
            | Self::InvalidConfig(_)
            | Self::ColumnNotFound(_)
            | Self::Write(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
