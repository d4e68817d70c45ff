//! Isolation forest scoring.
//!
//! Anomalies are few and different, so random axis-aligned splits isolate them
//! in fewer steps than normal points. The score of a row is
//! `2^(-E[h(x)] / c(psi))` where `h` is the path length in one tree and `c` the
//! average path length of an unsuccessful BST search over `psi` samples.

use super::OutlierModel;
use crate::error::{CleaningError, Result};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Isolation tree node.
#[derive(Debug, Clone)]
pub enum IsolationTree {
    Internal {
        feature: usize,
        threshold: f64,
        /// Values < threshold
        left: Box<IsolationTree>,
        /// Values >= threshold
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    /// Build a tree over the rows in `indices`.
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut StdRng,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Only features that still vary inside this node can split it
        let splittable: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &i| (min.min(x[[i, feature]]), max.max(x[[i, feature]])),
                );
                (max - min > 1e-10).then_some((feature, min, max))
            })
            .collect();

        if splittable.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(min..max);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        IsolationTree::Internal {
            feature,
            threshold,
            left: Box::new(Self::build(x, &left_indices, height + 1, max_height, rng)),
            right: Box::new(Self::build(x, &right_indices, height + 1, max_height, rng)),
        }
    }

    /// Path length of a sample, with the unbuilt subtree estimated at leaves.
    pub fn path_length(&self, sample: ArrayView1<f64>, current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + average_path_length(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a BST of `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest with a fixed seed.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    seed: u64,
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(2);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Grow the forest on `x`. Each tree sees a sample drawn without replacement.
    pub fn fit(&self, x: &Array2<f64>) -> Vec<IsolationTree> {
        let n_samples = x.nrows();
        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        (0..self.n_estimators)
            .map(|_| {
                let indices = sample(&mut rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_height, &mut rng)
            })
            .collect()
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlierModel for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn score(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        if x.ncols() == 0 {
            return Err(CleaningError::Model(
                "isolation forest needs at least one feature".to_string(),
            ));
        }
        // Fewer than two rows cannot be isolated from anything
        if x.nrows() < 2 {
            return Ok(vec![0.0; x.nrows()]);
        }

        let trees = self.fit(x);
        let normalizer = average_path_length(self.max_samples.min(x.nrows()));

        let scores = x
            .rows()
            .into_iter()
            .map(|row| {
                let mean_path = trees
                    .iter()
                    .map(|tree| tree.path_length(row, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-mean_path / normalizer)
            })
            .collect();

        Ok(scores)
    }
}
