//! Outlier detection over numeric fields.

use super::models::{OutlierModel, build_model, label_by_contamination};
use crate::config::{CleanerConfig, MAX_CONTAMINATION};
use crate::error::{CleaningError, Result};
use crate::types::OutlierReport;
use crate::utils::{float_values, mean_of, require_columns};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Runs an [`OutlierModel`] over the numeric fields of a table.
pub struct OutlierDetector {
    model: Box<dyn OutlierModel>,
}

impl OutlierDetector {
    pub fn new(model: Box<dyn OutlierModel>) -> Self {
        Self { model }
    }

    /// Detector using the model and seed selected in the configuration.
    pub fn from_config(config: &CleanerConfig) -> Self {
        Self::new(build_model(config.outlier_model, config.seed))
    }

    /// Build the standardized matrix the model scores.
    ///
    /// Missing values are replaced by the field mean over the current table,
    /// then each field is centred and divided by its population standard
    /// deviation. A field without variance is only centred; a field without
    /// any value becomes all zeros.
    ///
    /// Returns the matrix and the mean used for each field.
    pub fn prepare_matrix(
        df: &DataFrame,
        fields: &[String],
    ) -> Result<(Array2<f64>, BTreeMap<String, f64>)> {
        require_columns(df, fields)?;

        let mut means = BTreeMap::new();
        let mut standardized: Vec<Vec<f64>> = Vec::with_capacity(fields.len());

        for field in fields {
            let values = float_values(df, field)?;
            let mean = mean_of(&values).unwrap_or(0.0);
            let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(mean)).collect();

            let variance = if filled.is_empty() {
                0.0
            } else {
                filled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / filled.len() as f64
            };
            let std_dev = variance.sqrt();
            let scale = if std_dev > f64::EPSILON { std_dev } else { 1.0 };

            standardized.push(filled.iter().map(|v| (v - mean) / scale).collect());
            means.insert(field.clone(), mean);
        }

        let matrix = Array2::from_shape_fn((df.height(), fields.len()), |(row, col)| {
            standardized[col][row]
        });
        Ok((matrix, means))
    }

    /// Score every row and label roughly `contamination` of them as outliers.
    pub fn detect(
        &self,
        df: &DataFrame,
        fields: &[String],
        contamination: f64,
    ) -> Result<OutlierReport> {
        if fields.is_empty() {
            return Err(CleaningError::Configuration(
                "no numeric fields available for outlier analysis".to_string(),
            ));
        }
        if !(contamination > 0.0 && contamination <= MAX_CONTAMINATION) {
            return Err(CleaningError::Configuration(format!(
                "contamination must be in (0, {}], got {}",
                MAX_CONTAMINATION, contamination
            )));
        }

        let (matrix, imputed_means) = Self::prepare_matrix(df, fields)?;
        debug!(
            "Scoring {} rows over {:?} with {}",
            matrix.nrows(),
            fields,
            self.model.name()
        );

        let scores = self.model.score(&matrix)?;
        if scores.len() != df.height() {
            return Err(CleaningError::Model(format!(
                "{} returned {} scores for {} rows",
                self.model.name(),
                scores.len(),
                df.height()
            )));
        }
        let labels = label_by_contamination(&scores, contamination);

        let report = OutlierReport {
            model: self.model.name().to_string(),
            fields: fields.to_vec(),
            contamination,
            imputed_means,
            scores,
            labels,
        };
        info!(
            "Outlier analysis flagged {} of {} rows (contamination {:.2})",
            report.outlier_count(),
            df.height(),
            contamination
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierModelKind;
    use crate::detection::models::ZScoreModel;
    use crate::types::OutlierLabel;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn ages() -> DataFrame {
        df!["age" => [Some(20.0), Some(22.0), None, Some(200.0)]].unwrap()
    }

    #[test]
    fn test_mean_imputation_uses_present_values() {
        let (matrix, means) = OutlierDetector::prepare_matrix(&ages(), &fields(&["age"])).unwrap();
        assert!((means["age"] - 80.67).abs() < 0.01);
        // the imputed row sits exactly on the mean
        assert_eq!(matrix[[2, 0]], 0.0);
    }

    #[test]
    fn test_standardized_columns() {
        let df = df!["a" => [1.0, 2.0, 3.0, 4.0], "b" => [5.0, 5.0, 5.0, 5.0]].unwrap();
        let (matrix, _) = OutlierDetector::prepare_matrix(&df, &fields(&["a", "b"])).unwrap();

        let col_a: Vec<f64> = matrix.column(0).to_vec();
        let mean: f64 = col_a.iter().sum::<f64>() / 4.0;
        let var: f64 = col_a.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);

        // zero variance: centred only
        assert!(matrix.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_isolation_forest_flags_extreme_age() {
        let config = CleanerConfig::builder().contamination(0.25).build().unwrap();
        let detector = OutlierDetector::from_config(&config);
        let report = detector.detect(&ages(), &fields(&["age"]), 0.25).unwrap();

        assert_eq!(report.model, "isolation_forest");
        assert_eq!(report.strongest_candidate(), Some(3));
        assert_eq!(report.outlier_count(), 1);
        assert_eq!(report.labels[3], OutlierLabel::Outlier);
    }

    #[test]
    fn test_zscore_flags_extreme_age() {
        let detector = OutlierDetector::new(Box::new(ZScoreModel));
        let report = detector.detect(&ages(), &fields(&["age"]), 0.25).unwrap();
        assert_eq!(report.outlier_positions(), vec![3]);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let df = df![
            "age" => [20.0, 25.0, 31.0, 45.0, 38.0, 29.0, 90.0, 27.0],
            "salary" => [40e3, 52e3, 61e3, 75e3, 58e3, 49e3, 51e3, 900e3],
        ]
        .unwrap();
        let config = CleanerConfig::builder().seed(11).build().unwrap();
        let a = OutlierDetector::from_config(&config)
            .detect(&df, &fields(&["age", "salary"]), 0.25)
            .unwrap();
        let b = OutlierDetector::from_config(&config)
            .detect(&df, &fields(&["age", "salary"]), 0.25)
            .unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn test_means_recomputed_for_current_table() {
        let detector = OutlierDetector::new(build_model(OutlierModelKind::ZScore, 0));
        let first = detector.detect(&ages(), &fields(&["age"]), 0.25).unwrap();

        let shrunk = ages().slice(0, 3);
        let second = detector.detect(&shrunk, &fields(&["age"]), 0.25).unwrap();

        assert!((first.imputed_means["age"] - 80.67).abs() < 0.01);
        assert_eq!(second.imputed_means["age"], 21.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let detector = OutlierDetector::new(Box::new(ZScoreModel));
        assert!(matches!(
            detector.detect(&ages(), &[], 0.1).unwrap_err(),
            CleaningError::Configuration(_)
        ));
        assert!(matches!(
            detector.detect(&ages(), &fields(&["age"]), 0.0).unwrap_err(),
            CleaningError::Configuration(_)
        ));
        assert!(matches!(
            detector.detect(&ages(), &fields(&["salary"]), 0.1).unwrap_err(),
            CleaningError::ColumnNotFound(_)
        ));
    }
}
