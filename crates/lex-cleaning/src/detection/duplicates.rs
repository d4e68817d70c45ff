//! Duplicate detection over a key-field subset.

use crate::error::{CleaningError, EMPTY_KEY_SELECTION, Result};
use crate::types::DuplicateReport;
use crate::utils::require_columns;
use polars::prelude::*;
use tracing::debug;

/// Finds records that share identical values on a set of key fields.
pub struct DuplicateDetector;

impl DuplicateDetector {
    /// Validate a key selection against the table schema.
    pub fn validate_keys(df: &DataFrame, key_fields: &[String]) -> Result<()> {
        if key_fields.is_empty() {
            return Err(CleaningError::Configuration(EMPTY_KEY_SELECTION.to_string()));
        }
        require_columns(df, key_fields)
    }

    /// Report every record belonging to an equivalence class of size >= 2.
    ///
    /// Missing values compare equal to each other. The reported rows are sorted
    /// by the key values (missing last), ties kept in original row order.
    pub fn detect(df: &DataFrame, key_fields: &[String]) -> Result<DuplicateReport> {
        Self::validate_keys(df, key_fields)?;

        let keys = df.select(key_fields.iter().cloned())?;
        let mask = keys.is_duplicated()?;

        let is_duplicate: Vec<bool> = mask.into_iter().map(|v| v.unwrap_or(false)).collect();
        let positions: Vec<usize> = is_duplicate
            .iter()
            .enumerate()
            .filter_map(|(idx, dup)| dup.then_some(idx))
            .collect();

        let rows = df.filter(&mask)?.sort(
            key_fields.to_vec(),
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )?;

        let group_count = if positions.is_empty() {
            0
        } else {
            keys.filter(&mask)?
                .unique_stable(None, UniqueKeepStrategy::First, None)?
                .height()
        };

        debug!(
            "Found {} duplicate rows in {} groups using {:?}",
            positions.len(),
            group_count,
            key_fields
        );

        Ok(DuplicateReport {
            key_fields: key_fields.to_vec(),
            rows,
            is_duplicate,
            positions,
            group_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn keys(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn customers() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4, 5, 6],
            "name" => ["Bo", "Al", "Bo", "Cy", "Al", "Di"],
            "email" => [None, Some("al@x.com"), None, Some("cy@x.com"), Some("al@x.com"), None],
            "age" => [Some(30.0), Some(25.0), Some(30.0), None, Some(25.0), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_empty_selection_is_configuration_error() {
        let err = DuplicateDetector::detect(&customers(), &[]).unwrap_err();
        assert!(matches!(err, CleaningError::Configuration(_)));
        assert!(err.to_string().contains(EMPTY_KEY_SELECTION));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = DuplicateDetector::detect(&customers(), &keys(&["salary"])).unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(f) if f == "salary"));
    }

    #[test]
    fn test_composite_key_with_missing_values() {
        let report = DuplicateDetector::detect(&customers(), &keys(&["name", "email"])).unwrap();

        // (Bo, null) twice and (Al, al@x.com) twice
        assert_eq!(report.positions, vec![0, 1, 2, 4]);
        assert_eq!(report.duplicate_count(), 4);
        assert_eq!(report.group_count, 2);
        assert_eq!(report.is_duplicate, vec![true, true, true, false, true, false]);
    }

    #[test]
    fn test_missing_equals_missing() {
        let report = DuplicateDetector::detect(&customers(), &keys(&["age"])).unwrap();
        // 30.0 x2, 25.0 x2, null x2
        assert_eq!(report.duplicate_count(), 6);
        assert_eq!(report.group_count, 3);
    }

    #[test]
    fn test_output_sorted_by_keys_then_row_order() {
        let report = DuplicateDetector::detect(&customers(), &keys(&["name", "age"])).unwrap();
        let ids: Vec<Option<i64>> = report.rows.column("id").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some(2), Some(5), Some(1), Some(3)]);
    }

    #[test]
    fn test_no_duplicates() {
        let report = DuplicateDetector::detect(&customers(), &keys(&["id"])).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.group_count, 0);
        assert_eq!(report.rows.height(), 0);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let df = customers();
        let fields = keys(&["name", "email"]);
        let first = DuplicateDetector::detect(&df, &fields).unwrap();
        let second = DuplicateDetector::detect(&df, &fields).unwrap();
        assert_eq!(first.positions, second.positions);
        assert!(first.rows.equals_missing(&second.rows));
    }

    #[test]
    fn test_reported_rows_have_a_match_and_others_do_not() {
        let df = customers();
        let fields = keys(&["name", "age"]);
        let report = DuplicateDetector::detect(&df, &fields).unwrap();

        let key_of = |idx: usize| -> String {
            fields
                .iter()
                .map(|f| format!("{:?}", df.column(f).unwrap().get(idx).unwrap()))
                .collect::<Vec<_>>()
                .join("|")
        };
        let mut counts: HashMap<String, usize> = HashMap::new();
        for idx in 0..df.height() {
            *counts.entry(key_of(idx)).or_default() += 1;
        }
        for idx in 0..df.height() {
            assert_eq!(report.is_duplicate[idx], counts[&key_of(idx)] >= 2);
        }
    }
}
