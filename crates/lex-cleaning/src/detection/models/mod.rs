//! Outlier scoring models.
//!
//! The detector only needs one capability from a model: a score per row where
//! higher means more anomalous, deterministic for a fixed seed. Turning scores
//! into labels for a contamination fraction is shared by every model, see
//! [`label_by_contamination`].
//!
//! To add a model, implement [`OutlierModel`] and wire it into
//! [`build_model`].

mod isolation_forest;
mod zscore;

pub use isolation_forest::{IsolationForest, IsolationTree};
pub use zscore::ZScoreModel;

use crate::config::OutlierModelKind;
use crate::error::Result;
use crate::types::OutlierLabel;
use ndarray::Array2;

/// Unsupervised outlier scorer over a standardized matrix (rows x fields).
pub trait OutlierModel: Send + Sync {
    /// Short model name for logs and reports.
    fn name(&self) -> &'static str;

    /// Score every row; higher is more anomalous.
    fn score(&self, x: &Array2<f64>) -> Result<Vec<f64>>;
}

/// Build the model selected by configuration.
pub fn build_model(kind: OutlierModelKind, seed: u64) -> Box<dyn OutlierModel> {
    match kind {
        OutlierModelKind::IsolationForest => Box::new(IsolationForest::new().with_seed(seed)),
        OutlierModelKind::ZScore => Box::new(ZScoreModel),
    }
}

/// Label rows whose score lies above the `(1 - contamination)` percentile.
///
/// The percentile uses linear interpolation between the closest ranks, so
/// roughly `contamination * n` rows are flagged. Rows tied with the cut-off are
/// normal; when every score is equal nothing is flagged.
pub fn label_by_contamination(scores: &[f64], contamination: f64) -> Vec<OutlierLabel> {
    if scores.is_empty() {
        return Vec::new();
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (1.0 - contamination).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let threshold = sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64);

    scores
        .iter()
        .map(|&s| {
            if s > threshold {
                OutlierLabel::Outlier
            } else {
                OutlierLabel::Normal
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(labels: &[OutlierLabel]) -> usize {
        labels.iter().filter(|l| l.is_outlier()).count()
    }

    #[test]
    fn test_label_single_top_score() {
        let labels = label_by_contamination(&[0.1, 0.2, 0.3, 0.9], 0.25);
        assert_eq!(
            labels,
            vec![
                OutlierLabel::Normal,
                OutlierLabel::Normal,
                OutlierLabel::Normal,
                OutlierLabel::Outlier
            ]
        );
    }

    #[test]
    fn test_label_fraction_is_approximate() {
        let scores: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(count(&label_by_contamination(&scores, 0.1)), 10);
        assert_eq!(count(&label_by_contamination(&scores, 0.5)), 50);
    }

    #[test]
    fn test_label_equal_scores_flag_nothing() {
        let labels = label_by_contamination(&[0.5; 8], 0.5);
        assert_eq!(count(&labels), 0);
    }

    #[test]
    fn test_label_empty() {
        assert!(label_by_contamination(&[], 0.1).is_empty());
    }

    #[test]
    fn test_build_model_names() {
        assert_eq!(
            build_model(OutlierModelKind::IsolationForest, 1).name(),
            "isolation_forest"
        );
        assert_eq!(build_model(OutlierModelKind::ZScore, 1).name(), "z_score");
    }
}
