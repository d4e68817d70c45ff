//! Interactive cleaning session.
//!
//! A session owns the loaded table plus the latest result of each analysis.
//! Changing a parameter recomputes that stage only. Replacing the table bumps
//! its generation and drops every analysis computed over the previous one, so
//! outlier flags can never be applied to rows they were not computed for.

use crate::cleaner::DataCleaner;
use crate::config::{CleanerConfig, ConfigValidationError, MAX_CONTAMINATION, MIN_CONTAMINATION};
use crate::detection::{DuplicateDetector, OutlierDetector};
use crate::error::Result;
use crate::profiler::{DataProfiler, available_key_fields, duplicate_key_candidates};
use crate::types::{CleaningOutcome, DuplicateReport, FieldProfile, OutlierLabel, OutlierReport};
use crate::utils::{has_column, require_columns};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outlier report tagged with the table generation it was computed over.
#[derive(Debug, Clone)]
struct OutlierSnapshot {
    generation: u64,
    report: OutlierReport,
}

/// State of one cleaning session over a loaded table.
#[derive(Debug)]
pub struct CleaningSession {
    config: CleanerConfig,
    table: DataFrame,
    generation: u64,
    key_fields: Vec<String>,
    duplicates: Option<DuplicateReport>,
    outliers: Option<OutlierSnapshot>,
}

static_assertions::assert_impl_all!(CleaningSession: Send);

impl CleaningSession {
    /// Start a session over a freshly loaded table.
    ///
    /// The configured numeric fields are coerced to numbers, and the initial
    /// key selection is the configured key fields that exist in the table.
    pub fn new(mut table: DataFrame, config: CleanerConfig) -> Result<Self> {
        config.validate()?;
        DataProfiler::normalize_numeric_fields(&mut table, &config.numeric_fields)?;

        let key_fields = available_key_fields(&table, &config.duplicate_key_fields);

        info!(
            "Session started with {} rows and {} fields",
            table.height(),
            table.width()
        );

        Ok(Self {
            config,
            table,
            generation: 0,
            key_fields,
            duplicates: None,
            outliers: None,
        })
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    pub fn table(&self) -> &DataFrame {
        &self.table
    }

    /// Counter bumped on every table replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    /// Fields that may be offered as duplicate keys.
    pub fn key_candidates(&self) -> Vec<String> {
        duplicate_key_candidates(&self.table)
    }

    /// Configured numeric fields present in the current table.
    pub fn numeric_fields(&self) -> Vec<String> {
        self.config
            .numeric_fields
            .iter()
            .filter(|f| has_column(&self.table, f))
            .cloned()
            .collect()
    }

    /// Type, role and missing-value profile of every field.
    pub fn field_profiles(&self) -> Vec<FieldProfile> {
        DataProfiler::profile_fields(&self.table, &self.config.numeric_fields)
    }

    pub fn missing_value_counts(&self) -> BTreeMap<String, usize> {
        DataProfiler::missing_value_counts(&self.table)
    }

    pub fn duplicate_report(&self) -> Option<&DuplicateReport> {
        self.duplicates.as_ref()
    }

    /// Latest outlier report, if it was computed over the current table.
    pub fn outlier_report(&self) -> Option<&OutlierReport> {
        self.outliers
            .as_ref()
            .filter(|s| s.generation == self.generation)
            .map(|s| &s.report)
    }

    /// Labels of the latest outlier report over the current table.
    pub fn outlier_flags(&self) -> Option<&[OutlierLabel]> {
        self.outlier_report().map(|r| r.labels.as_slice())
    }

    /// Change the key selection and rescan for duplicates.
    ///
    /// An empty selection is kept (cleaning then skips deduplication). A
    /// selection naming unknown fields is rejected and the previous one stays.
    pub fn select_duplicate_keys(&mut self, key_fields: Vec<String>) -> Result<&DuplicateReport> {
        if !key_fields.is_empty() {
            require_columns(&self.table, &key_fields)?;
        }
        self.key_fields = key_fields;
        self.duplicates = None;
        let report = DuplicateDetector::detect(&self.table, &self.key_fields)?;
        Ok(self.duplicates.insert(report))
    }

    /// Rescan for duplicates with the current key selection.
    pub fn run_duplicate_scan(&mut self) -> Result<&DuplicateReport> {
        let key_fields = self.key_fields.clone();
        self.select_duplicate_keys(key_fields)
    }

    /// Run the outlier model with a new contamination fraction.
    pub fn run_outlier_analysis(&mut self, contamination: f64) -> Result<&OutlierReport> {
        if !(MIN_CONTAMINATION..=MAX_CONTAMINATION).contains(&contamination) {
            return Err(ConfigValidationError::InvalidContamination(contamination).into());
        }
        self.outliers = None;

        let detector = OutlierDetector::from_config(&self.config);
        let report = detector.detect(&self.table, &self.numeric_fields(), contamination)?;
        self.config.contamination = contamination;
        let snapshot = self.outliers.insert(OutlierSnapshot {
            generation: self.generation,
            report,
        });
        Ok(&snapshot.report)
    }

    /// Swap in a new table and invalidate every analysis of the old one.
    pub fn replace_table(&mut self, mut table: DataFrame) -> Result<()> {
        DataProfiler::normalize_numeric_fields(&mut table, &self.config.numeric_fields)?;
        self.table = table;
        self.generation += 1;
        self.duplicates = None;
        self.outliers = None;
        debug!("Table replaced, now at generation {}", self.generation);
        Ok(())
    }

    /// Apply the configured cleaning steps to the current table.
    pub fn apply_cleaning(&self) -> Result<CleaningOutcome> {
        DataCleaner::clean(
            &self.table,
            &self.key_fields,
            &self.config,
            self.outlier_flags(),
        )
    }

    /// Toggle outlier removal for the next cleaning pass.
    pub fn set_remove_outliers(&mut self, remove: bool) {
        self.config.remove_outliers = remove;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierModelKind;
    use crate::error::{CleaningError, EMPTY_KEY_SELECTION, NO_OUTLIER_ANALYSIS};

    fn customers() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4],
            "name" => ["Ann", "Ann", "Bob", "Cid"],
            "email" => [Some("ann@x.com"), Some("ann@x.com"), None, Some("cid@x.com")],
            "age" => [Some("20"), Some("20"), Some("n/a"), Some("200")],
            "salary" => [100.0, 100.0, 110.0, 105.0],
        ]
        .unwrap()
    }

    fn session() -> CleaningSession {
        let config = CleanerConfig::builder()
            .outlier_model(OutlierModelKind::ZScore)
            .build()
            .unwrap();
        CleaningSession::new(customers(), config).unwrap()
    }

    #[test]
    fn test_new_normalizes_and_selects_keys() {
        let session = session();
        assert_eq!(session.table().column("age").unwrap().dtype(), &DataType::Float64);
        assert_eq!(session.key_fields(), ["name", "email", "age", "salary"]);
        assert_eq!(session.missing_value_counts()["age"], 1);
        assert_eq!(session.key_candidates(), ["name", "email", "age", "salary"]);
    }

    #[test]
    fn test_key_selection_rescans() {
        let mut session = session();
        let report = session.select_duplicate_keys(vec!["name".to_string()]).unwrap();
        assert_eq!(report.positions, vec![0, 1]);

        let report = session.select_duplicate_keys(vec!["salary".to_string()]).unwrap();
        assert_eq!(report.group_count, 1);
        assert_eq!(session.key_fields(), ["salary"]);
    }

    #[test]
    fn test_empty_selection_keeps_other_stages_working() {
        let mut session = session();
        let err = session.select_duplicate_keys(Vec::new()).unwrap_err();
        assert!(err.to_string().contains(EMPTY_KEY_SELECTION));
        assert!(session.duplicate_report().is_none());

        // outlier analysis and cleaning are unaffected
        assert!(session.run_outlier_analysis(0.25).is_ok());
        let outcome = session.apply_cleaning().unwrap();
        assert_eq!(outcome.table.height(), 4);
    }

    #[test]
    fn test_replace_table_invalidates_analyses() {
        let mut session = session();
        session.run_duplicate_scan().unwrap();
        session.run_outlier_analysis(0.25).unwrap();
        assert!(session.outlier_flags().is_some());

        session.replace_table(customers().slice(0, 3)).unwrap();
        assert_eq!(session.generation(), 1);
        assert!(session.duplicate_report().is_none());
        assert!(session.outlier_flags().is_none());

        session.set_remove_outliers(true);
        let err = session.apply_cleaning().unwrap_err();
        assert!(matches!(&err, CleaningError::Configuration(m) if m == NO_OUTLIER_ANALYSIS));
    }

    #[test]
    fn test_outlier_removal_after_analysis() {
        let mut session = session();
        let report = session.run_outlier_analysis(0.25).unwrap();
        assert_eq!(report.outlier_positions(), vec![3]);

        session.set_remove_outliers(true);
        let outcome = session.apply_cleaning().unwrap();
        // one duplicate and one outlier gone
        assert_eq!(outcome.table.height(), 2);
        assert_eq!(outcome.summary.outliers_removed, 1);
        assert_eq!(session.table().height(), 4);
    }

    #[test]
    fn test_unknown_key_keeps_previous_selection() {
        let mut session = session();
        session.select_duplicate_keys(vec!["name".to_string()]).unwrap();

        let err = session
            .select_duplicate_keys(vec!["phone".to_string()])
            .unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(_)));
        assert_eq!(session.key_fields(), ["name"]);

        // cleaning still deduplicates on the previous selection
        let outcome = session.apply_cleaning().unwrap();
        assert_eq!(outcome.summary.duplicates_removed, 1);
    }

    #[test]
    fn test_failed_analysis_keeps_contamination() {
        let config = CleanerConfig::builder()
            .outlier_model(OutlierModelKind::ZScore)
            .numeric_fields(["score"])
            .build()
            .unwrap();
        let mut session = CleaningSession::new(customers(), config).unwrap();

        // no configured numeric field is present
        assert!(session.run_outlier_analysis(0.3).is_err());
        assert_eq!(session.config().contamination, 0.1);
        assert!(session.outlier_report().is_none());
    }

    #[test]
    fn test_contamination_out_of_range() {
        let mut session = session();
        let err = session.run_outlier_analysis(0.9).unwrap_err();
        assert!(matches!(err, CleaningError::InvalidConfig(_)));
        assert!(session.outlier_report().is_none());
    }
}
