use super::OutlierModel;
use crate::error::Result;
use ndarray::Array2;

/// Scores each row by its largest absolute standardized value.
///
/// Expects the matrix the detector produces (each field already centred and
/// scaled), so no fitting is needed and the result does not depend on a seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScoreModel;

impl OutlierModel for ZScoreModel {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn score(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(x.rows()
            .into_iter()
            .map(|row| row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_largest_absolute_value() {
        let x = Array2::from_shape_vec((3, 2), vec![0.5, -2.0, 0.1, 0.2, 3.0, 0.0]).unwrap();
        assert_eq!(ZScoreModel.score(&x).unwrap(), vec![2.0, 0.2, 3.0]);
    }
}
