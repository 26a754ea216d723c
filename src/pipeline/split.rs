//! Seeded train/test partition

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::error::{PipelineError, Result};

/// Row indices of the training and held-out partitions.
///
/// Computed once per run and shared by every backend and feature set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub seed: u64,
}

impl TrainTestSplit {
    /// Shuffle `0..n_rows` with `seed`; the first `ceil(n * test_fraction)` rows are held out
    pub fn new(n_rows: usize, test_fraction: f64, seed: u64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(PipelineError::InsufficientData(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }

        let n_test = (n_rows as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(PipelineError::InsufficientData(format!(
                "cannot split {} row(s) with test fraction {}",
                n_rows, test_fraction
            )));
        }

        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok(Self {
            train,
            test: indices,
            seed,
        })
    }

    /// Pick the values at the given rows
    pub fn take(values: &[f64], rows: &[usize]) -> Vec<f64> {
        rows.iter().map(|&i| values[i]).collect()
    }
}
