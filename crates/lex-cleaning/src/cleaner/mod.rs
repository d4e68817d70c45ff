//! Cleaning engine.
//!
//! Applies, in a fixed order:
//! 1. Deduplication on the selected key fields (first record of each group kept)
//! 2. Literal fill of the designated text field
//! 3. Mean fill of the designated numeric field, computed after deduplication
//! 4. Removal of rows labelled as outliers
//!
//! Every step is toggled by [`CleanerConfig`]. The input table is never
//! modified; the engine works on its own copy.

use crate::config::CleanerConfig;
use crate::error::{CleaningError, Result};
use crate::types::{CleaningOutcome, CleaningSummary, OutlierLabel};
use crate::utils::{fill_numeric_nulls, fill_string_nulls, float_values, has_column, mean_of, require_columns};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Transient column carrying outlier labels through deduplication.
const OUTLIER_FLAG_FIELD: &str = "_outlier_flag";

/// Applies the configured cleaning steps to a table.
pub struct DataCleaner;

impl DataCleaner {
    /// Produce a cleaned copy of `df`.
    ///
    /// `outlier_flags` must be the labels of the most recent outlier analysis
    /// over this same table. They are only required when outlier removal is
    /// enabled; a missing or mismatched set fails the whole call before any
    /// step runs.
    pub fn clean(
        df: &DataFrame,
        key_fields: &[String],
        config: &CleanerConfig,
        outlier_flags: Option<&[OutlierLabel]>,
    ) -> Result<CleaningOutcome> {
        let flags = if config.remove_outliers {
            match outlier_flags {
                Some(flags) if flags.len() == df.height() => Some(flags),
                Some(flags) => {
                    warn!(
                        "Outlier flags cover {} rows but the table has {}",
                        flags.len(),
                        df.height()
                    );
                    return Err(CleaningError::no_outlier_analysis());
                }
                None => return Err(CleaningError::no_outlier_analysis()),
            }
        } else {
            None
        };

        info!("Cleaning table with {} rows...", df.height());

        let mut summary = CleaningSummary {
            rows_before: df.height(),
            ..Default::default()
        };
        let mut table = df.clone();

        if let Some(flags) = flags {
            let marked: Vec<bool> = flags.iter().map(|l| l.is_outlier()).collect();
            let column = BooleanChunked::from_slice(OUTLIER_FLAG_FIELD.into(), &marked);
            table.with_column(column.into_series())?;
        }

        // 1. Deduplicate
        if config.remove_duplicates {
            if key_fields.is_empty() {
                warn!("No duplicate key fields selected, skipping deduplication");
                summary
                    .steps
                    .push("Skipped deduplication: no key fields selected".to_string());
            } else {
                require_columns(&table, key_fields)?;
                let before = table.height();
                table = table.unique_stable(Some(key_fields), UniqueKeepStrategy::First, None)?;
                summary.duplicates_removed = before - table.height();
                summary.steps.push(format!(
                    "Removed {} duplicate rows using {:?}",
                    summary.duplicates_removed, key_fields
                ));
                debug!("Removed {} duplicate rows", summary.duplicates_removed);
            }
        }

        // 2. Fill missing text
        if config.fill_missing_text {
            let field = config.text_fill_field.as_str();
            if has_column(&table, field) {
                let series = table.column(field)?.as_materialized_series().clone();
                summary.text_values_filled = series.null_count();
                let filled = fill_string_nulls(&series, &config.text_fill_value)?;
                table.replace(field, filled)?;
                summary.steps.push(format!(
                    "Filled {} missing '{}' values with '{}'",
                    summary.text_values_filled, field, config.text_fill_value
                ));
            } else {
                warn!("Text fill field '{}' not present, skipping", field);
                summary
                    .steps
                    .push(format!("Skipped text fill: field '{}' not present", field));
            }
        }

        // 3. Fill missing numeric values with the post-dedup mean
        if config.fill_missing_numeric {
            let field = config.numeric_fill_field.as_str();
            if has_column(&table, field) {
                let values = float_values(&table, field)?;
                match mean_of(&values) {
                    Some(mean) => {
                        let series = table.column(field)?.as_materialized_series().clone();
                        summary.numeric_values_filled =
                            values.iter().filter(|v| v.is_none()).count();
                        summary.numeric_fill_value = Some(mean);
                        let filled = fill_numeric_nulls(&series, mean)?;
                        table.replace(field, filled)?;
                        summary.steps.push(format!(
                            "Filled {} missing '{}' values with mean {:.2}",
                            summary.numeric_values_filled, field, mean
                        ));
                    }
                    None => {
                        warn!("Numeric fill field '{}' has no values, skipping", field);
                        summary
                            .steps
                            .push(format!("Skipped numeric fill: no values in '{}'", field));
                    }
                }
            } else {
                warn!("Numeric fill field '{}' not present, skipping", field);
                summary
                    .steps
                    .push(format!("Skipped numeric fill: field '{}' not present", field));
            }
        }

        // 4. Drop outliers
        if flags.is_some() {
            let keep = !table.column(OUTLIER_FLAG_FIELD)?.bool()?;
            let before = table.height();
            table = table.filter(&keep)?;
            summary.outliers_removed = before - table.height();
            table = table.drop(OUTLIER_FLAG_FIELD)?;
            summary
                .steps
                .push(format!("Removed {} outlier rows", summary.outliers_removed));
        }

        summary.rows_after = table.height();
        info!(
            "Cleaning complete: {} -> {} rows",
            summary.rows_before, summary.rows_after
        );

        Ok(CleaningOutcome { table, summary })
    }
}
