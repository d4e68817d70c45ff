//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest accepted contamination fraction.
pub const MIN_CONTAMINATION: f64 = 0.01;

/// Highest accepted contamination fraction.
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Outlier scoring model used by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutlierModelKind {
    /// Ensemble of random isolation trees
    #[default]
    IsolationForest,
    /// Largest absolute z-score of the row
    ZScore,
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleanerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::config::{CleanerConfig, OutlierModelKind};
///
/// let config = CleanerConfig::builder()
///     .contamination(0.05)
///     .outlier_model(OutlierModelKind::ZScore)
///     .remove_outliers(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Table the records are loaded from.
    /// Default: "customer_data"
    pub source_table: String,

    /// Table replaced with the cleaned records.
    /// Default: "cleaned_customer_data"
    pub target_table: String,

    /// Fields two records must agree on to count as duplicates.
    /// Fields absent from the loaded table are ignored when the session starts.
    /// Default: name, email, age, salary
    pub duplicate_key_fields: Vec<String>,

    /// Fields coerced to numbers and fed to the outlier model.
    /// Default: age, salary
    pub numeric_fields: Vec<String>,

    /// Text field whose missing values are replaced with `text_fill_value`.
    /// Default: "email"
    pub text_fill_field: String,

    /// Literal written into missing text values.
    /// Default: "unknown@gmail.com"
    pub text_fill_value: String,

    /// Numeric field whose missing values are replaced with the column mean.
    /// Default: "age"
    pub numeric_fill_field: String,

    /// Expected fraction of outlier rows (0.01 - 0.5).
    /// Default: 0.1
    pub contamination: f64,

    /// Model used to score outliers.
    /// Default: IsolationForest
    pub outlier_model: OutlierModelKind,

    /// Seed for the outlier model.
    /// Default: 42
    pub seed: u64,

    /// Whether to keep only the first record of each duplicate group.
    /// Default: true
    pub remove_duplicates: bool,

    /// Whether to fill missing values of `text_fill_field`.
    /// Default: true
    pub fill_missing_text: bool,

    /// Whether to fill missing values of `numeric_fill_field`.
    /// Default: true
    pub fill_missing_numeric: bool,

    /// Whether to drop rows labelled as outliers.
    /// Default: false
    pub remove_outliers: bool,

    /// Whether to replace `target_table` with the cleaned records.
    /// Default: false
    pub persist_to_store: bool,

    /// Whether to write the cleaned records as CSV.
    /// Default: true
    pub export_csv: bool,

    /// Destination of the CSV export.
    /// Default: "cleaned_customer_data.csv"
    pub export_path: PathBuf,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            source_table: "customer_data".to_string(),
            target_table: "cleaned_customer_data".to_string(),
            duplicate_key_fields: default_key_fields(),
            numeric_fields: default_numeric_fields(),
            text_fill_field: "email".to_string(),
            text_fill_value: "unknown@gmail.com".to_string(),
            numeric_fill_field: "age".to_string(),
            contamination: 0.1,
            outlier_model: OutlierModelKind::default(),
            seed: 42,
            remove_duplicates: true,
            fill_missing_text: true,
            fill_missing_numeric: true,
            remove_outliers: false,
            persist_to_store: false,
            export_csv: true,
            export_path: PathBuf::from("cleaned_customer_data.csv"),
        }
    }
}

fn default_key_fields() -> Vec<String> {
    ["name", "email", "age", "salary"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_numeric_fields() -> Vec<String> {
    vec!["age".to_string(), "salary".to_string()]
}

impl CleanerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleanerConfigBuilder {
        CleanerConfigBuilder::default()
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: CleanerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    ///
    /// An empty `duplicate_key_fields` list is accepted here; the duplicate
    /// detector reports it when that stage runs so the other stages still can.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(MIN_CONTAMINATION..=MAX_CONTAMINATION).contains(&self.contamination) {
            return Err(ConfigValidationError::InvalidContamination(
                self.contamination,
            ));
        }

        for (field, value) in [
            ("source_table", &self.source_table),
            ("target_table", &self.target_table),
            ("text_fill_field", &self.text_fill_field),
            ("numeric_fill_field", &self.numeric_fill_field),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName(field.to_string()));
            }
        }

        if self.numeric_fields.is_empty() {
            return Err(ConfigValidationError::NoNumericFields);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid contamination: {0} (must be between 0.01 and 0.5)")]
    InvalidContamination(f64),

    #[error("'{0}' must not be empty")]
    EmptyName(String),

    #[error("At least one numeric field is required for outlier analysis")]
    NoNumericFields,
}

/// Builder for [`CleanerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleanerConfigBuilder {
    source_table: Option<String>,
    target_table: Option<String>,
    duplicate_key_fields: Option<Vec<String>>,
    numeric_fields: Option<Vec<String>>,
    text_fill_field: Option<String>,
    text_fill_value: Option<String>,
    numeric_fill_field: Option<String>,
    contamination: Option<f64>,
    outlier_model: Option<OutlierModelKind>,
    seed: Option<u64>,
    remove_duplicates: Option<bool>,
    fill_missing_text: Option<bool>,
    fill_missing_numeric: Option<bool>,
    remove_outliers: Option<bool>,
    persist_to_store: Option<bool>,
    export_csv: Option<bool>,
    export_path: Option<PathBuf>,
}

impl CleanerConfigBuilder {
    /// Set the table records are loaded from.
    pub fn source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    /// Set the table replaced with the cleaned records.
    pub fn target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }

    /// Set the fields used to decide whether two records are duplicates.
    pub fn duplicate_key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_key_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the fields coerced to numbers and scored for outliers.
    pub fn numeric_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the text field and literal used for text imputation.
    pub fn text_fill(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.text_fill_field = Some(field.into());
        self.text_fill_value = Some(value.into());
        self
    }

    /// Set the numeric field filled with its mean.
    pub fn numeric_fill_field(mut self, field: impl Into<String>) -> Self {
        self.numeric_fill_field = Some(field.into());
        self
    }

    /// Set the expected outlier fraction.
    ///
    /// # Arguments
    /// * `contamination` - Value between 0.01 and 0.5
    pub fn contamination(mut self, contamination: f64) -> Self {
        self.contamination = Some(contamination);
        self
    }

    /// Set the outlier scoring model.
    pub fn outlier_model(mut self, model: OutlierModelKind) -> Self {
        self.outlier_model = Some(model);
        self
    }

    /// Set the seed used by randomized outlier models.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable duplicate removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Enable or disable text imputation.
    pub fn fill_missing_text(mut self, fill: bool) -> Self {
        self.fill_missing_text = Some(fill);
        self
    }

    /// Enable or disable numeric mean imputation.
    pub fn fill_missing_numeric(mut self, fill: bool) -> Self {
        self.fill_missing_numeric = Some(fill);
        self
    }

    /// Enable or disable outlier row removal.
    pub fn remove_outliers(mut self, remove: bool) -> Self {
        self.remove_outliers = Some(remove);
        self
    }

    /// Enable or disable writing the cleaned table back to the store.
    pub fn persist_to_store(mut self, persist: bool) -> Self {
        self.persist_to_store = Some(persist);
        self
    }

    /// Enable or disable the CSV export.
    pub fn export_csv(mut self, export: bool) -> Self {
        self.export_csv = Some(export);
        self
    }

    /// Set the CSV export destination.
    pub fn export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleanerConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleanerConfig, ConfigValidationError> {
        let defaults = CleanerConfig::default();
        let config = CleanerConfig {
            source_table: self.source_table.unwrap_or(defaults.source_table),
            target_table: self.target_table.unwrap_or(defaults.target_table),
            duplicate_key_fields: self
                .duplicate_key_fields
                .unwrap_or(defaults.duplicate_key_fields),
            numeric_fields: self.numeric_fields.unwrap_or(defaults.numeric_fields),
            text_fill_field: self.text_fill_field.unwrap_or(defaults.text_fill_field),
            text_fill_value: self.text_fill_value.unwrap_or(defaults.text_fill_value),
            numeric_fill_field: self
                .numeric_fill_field
                .unwrap_or(defaults.numeric_fill_field),
            contamination: self.contamination.unwrap_or(defaults.contamination),
            outlier_model: self.outlier_model.unwrap_or_default(),
            seed: self.seed.unwrap_or(defaults.seed),
            remove_duplicates: self.remove_duplicates.unwrap_or(true),
            fill_missing_text: self.fill_missing_text.unwrap_or(true),
            fill_missing_numeric: self.fill_missing_numeric.unwrap_or(true),
            remove_outliers: self.remove_outliers.unwrap_or(false),
            persist_to_store: self.persist_to_store.unwrap_or(false),
            export_csv: self.export_csv.unwrap_or(true),
            export_path: self.export_path.unwrap_or(defaults.export_path),
        };

        config.validate()?;
        Ok(config)
    }
}
