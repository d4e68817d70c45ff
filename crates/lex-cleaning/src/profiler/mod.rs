//! Table profiling and schema normalization.
//!
//! This module provides:
//! - Numeric coercion of the configured numeric fields
//! - Per-field missing value counts
//! - Field role classification and duplicate-key candidates

mod roles;

pub use roles::{available_key_fields, classify_field, duplicate_key_candidates};

use crate::error::Result;
use crate::types::FieldProfile;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Profiler and normalizer for loaded tables.
pub struct DataProfiler;

impl DataProfiler {
    /// Coerce every configured numeric field present in the table to Float64.
    ///
    /// Values that cannot be parsed become missing. Fields that are absent are
    /// skipped. Applying this twice is a no-op.
    pub fn normalize_numeric_fields(df: &mut DataFrame, numeric_fields: &[String]) -> Result<()> {
        for field in numeric_fields {
            let Ok(column) = df.column(field) else {
                debug!("Numeric field '{}' not present, skipping", field);
                continue;
            };
            if column.dtype() == &DataType::Float64 {
                continue;
            }

            let nulls_before = column.null_count();
            let converted = column.cast(&DataType::Float64)?;
            let coerced = converted.null_count().saturating_sub(nulls_before);
            df.replace(field, converted.take_materialized_series())?;

            if coerced > 0 {
                info!(
                    "Converted '{}' to numeric ({} unparseable values set to missing)",
                    field, coerced
                );
            } else {
                debug!("Converted '{}' to numeric", field);
            }
        }
        Ok(())
    }

    /// Number of missing values per field.
    pub fn missing_value_counts(df: &DataFrame) -> BTreeMap<String, usize> {
        df.get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }

    /// Profile every field of the table.
    pub fn profile_fields(df: &DataFrame, numeric_fields: &[String]) -> Vec<FieldProfile> {
        let height = df.height();
        df.get_columns()
            .iter()
            .map(|col| {
                let null_count = col.null_count();
                FieldProfile {
                    name: col.name().to_string(),
                    dtype: col.dtype().to_string(),
                    role: classify_field(col.name(), numeric_fields),
                    null_count,
                    null_percentage: if height > 0 {
                        null_count as f64 / height as f64 * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldRole;

    fn numeric() -> Vec<String> {
        vec!["age".to_string(), "salary".to_string()]
    }

    #[test]
    fn test_normalize_text_values() {
        let mut df = df![
            "id" => [1i64, 2, 3],
            "age" => [Some("30"), Some("thirty"), None],
            "salary" => [50000i64, 60000, 70000],
        ]
        .unwrap();

        DataProfiler::normalize_numeric_fields(&mut df, &numeric()).unwrap();

        let age = df.column("age").unwrap();
        assert_eq!(age.dtype(), &DataType::Float64);
        let values: Vec<Option<f64>> = age.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(30.0), None, None]);
        assert_eq!(df.column("salary").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_normalize_skips_absent_fields() {
        let mut df = df!["name" => ["a", "b"]].unwrap();
        DataProfiler::normalize_numeric_fields(&mut df, &numeric()).unwrap();
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut df = df!["age" => [Some("20"), Some("x"), Some("22.5")]].unwrap();
        DataProfiler::normalize_numeric_fields(&mut df, &numeric()).unwrap();
        let once = df.clone();
        DataProfiler::normalize_numeric_fields(&mut df, &numeric()).unwrap();
        assert!(df.equals_missing(&once));
    }

    #[test]
    fn test_missing_value_counts() {
        let df = df![
            "name" => [Some("a"), None, Some("c")],
            "email" => [None::<&str>, None, None],
            "age" => [Some(1.0), Some(2.0), None],
        ]
        .unwrap();

        let counts = DataProfiler::missing_value_counts(&df);
        assert_eq!(counts["name"], 1);
        assert_eq!(counts["email"], 3);
        assert_eq!(counts["age"], 1);
    }

    #[test]
    fn test_profile_fields() {
        let df = df![
            "id" => [1i64, 2],
            "name" => [Some("a"), None],
            "age" => [Some(1.0), Some(2.0)],
        ]
        .unwrap();

        let profiles = DataProfiler::profile_fields(&df, &numeric());
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].role, FieldRole::Identifier);
        assert_eq!(profiles[1].role, FieldRole::GroupingKey);
        assert_eq!(profiles[1].null_percentage, 50.0);
        assert_eq!(profiles[2].role, FieldRole::NumericAnalysis);
    }
}
