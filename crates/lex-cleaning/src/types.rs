use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the identifier field; never used as a duplicate key by default.
pub const IDENTIFIER_FIELD: &str = "id";

/// How a field takes part in the analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRole {
    /// Row identifier, excluded from duplicate-key candidates.
    Identifier,
    /// May be part of the duplicate key.
    GroupingKey,
    /// Coerced to numbers and scored by the outlier model.
    NumericAnalysis,
}

/// Label produced by the outlier detector for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierLabel {
    Normal,
    Outlier,
}

impl OutlierLabel {
    pub fn is_outlier(self) -> bool {
        matches!(self, OutlierLabel::Outlier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProfile {
    pub name: String,
    pub dtype: String,
    pub role: FieldRole,
    pub null_count: usize,
    pub null_percentage: f64,
}

/// Result of one duplicate scan.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    /// Key fields the scan was run with.
    pub key_fields: Vec<String>,
    /// Duplicate rows, sorted by key values with ties in original order.
    pub rows: DataFrame,
    /// One flag per source row; true for members of a group of size >= 2.
    pub is_duplicate: Vec<bool>,
    /// Source positions of the duplicate rows, ascending.
    pub positions: Vec<usize>,
    /// Number of equivalence classes with at least two members.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Total number of rows that belong to a duplicate group.
    pub fn duplicate_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Result of one outlier model run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub model: String,
    pub fields: Vec<String>,
    pub contamination: f64,
    /// Per-field mean used to impute missing values before scaling.
    pub imputed_means: BTreeMap<String, f64>,
    /// Anomaly score per row; higher is more anomalous.
    pub scores: Vec<f64>,
    pub labels: Vec<OutlierLabel>,
}

impl OutlierReport {
    pub fn outlier_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_outlier()).count()
    }

    /// Source positions of the rows labelled as outliers.
    pub fn outlier_positions(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(idx, label)| label.is_outlier().then_some(idx))
            .collect()
    }

    /// Position of the row with the highest score.
    pub fn strongest_candidate(&self) -> Option<usize> {
        self.scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }
}

/// What one cleaning pass did to the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub text_values_filled: usize,
    pub numeric_values_filled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_fill_value: Option<f64>,
    pub outliers_removed: usize,
    pub steps: Vec<String>,
}

/// Cleaned table plus the summary of how it was produced.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub table: DataFrame,
    pub summary: CleaningSummary,
}

/// Outcome of one sink step, recorded in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkOutcome {
    pub sink: String,
    pub destination: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_written: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Machine-readable report of one CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub source_table: String,
    pub rows_loaded: usize,
    pub missing_values: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning: Option<CleaningSummary>,
    pub sinks: Vec<SinkOutcome>,
    /// Stage-local errors that paused a stage without ending the run.
    pub warnings: Vec<String>,
}
