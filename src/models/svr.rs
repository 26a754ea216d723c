//! Epsilon-insensitive support vector regression with an RBF kernel
//!
//! Inputs are standardized with statistics of the training rows. The bias
//! is folded into the kernel (`K + 1`), which leaves a box-constrained dual
//!
//! ```text
//! min_b  0.5 * b'Qb - y'b + epsilon * |b|_1    subject to  -C <= b_i <= C
//! ```
//!
//! solved by cyclic coordinate descent with an exact soft-threshold step.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::scaler::StandardScaler;
use super::{check_prediction_input, check_training_input, BackendKind, RegressionBackend};
use crate::pipeline::config::SvrConfig;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::split::TrainTestSplit;
use crate::pipeline::FeatureMatrix;

#[derive(Debug, Clone)]
struct FittedSvr {
    scaler: StandardScaler,
    /// Standardized training rows with a non-zero dual coefficient
    support: FeatureMatrix,
    coef: Vec<f64>,
    gamma: f64,
}

#[derive(Debug, Clone)]
pub struct SupportVectorRegressor {
    config: SvrConfig,
    seed: u64,
    fitted: Option<FittedSvr>,
    feature_names: Option<Vec<String>>,
}

impl SupportVectorRegressor {
    pub fn new(config: SvrConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            fitted: None,
            feature_names: None,
        }
    }

    pub fn n_support(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.coef.len())
    }

    pub fn gamma(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.gamma)
    }

    /// Training rows actually used; large inputs are subsampled
    fn training_rows(&self, n: usize) -> Vec<usize> {
        let limit = self.config.max_samples.max(2);
        if n <= limit {
            return (0..n).collect();
        }
        warn!(
            "SVR: subsampling {} of {} training rows to bound kernel memory",
            limit, n
        );
        let all: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut rows: Vec<usize> = all.choose_multiple(&mut rng, limit).copied().collect();
        rows.sort_unstable();
        rows
    }
}

/// `1 / (n_features * var(X))`, or 1 when every value is the same
fn scale_gamma(z: &FeatureMatrix) -> f64 {
    let count = (z.nrows() * z.ncols()) as f64;
    let values: Vec<f64> = (0..z.ncols()).flat_map(|j| z.column(j)).collect();
    let mean = values.iter().sum::<f64>() / count;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if var > 0.0 {
        1.0 / (z.ncols() as f64 * var)
    } else {
        1.0
    }
}

#[inline]
fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * dist).exp()
}

#[inline]
fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl RegressionBackend for SupportVectorRegressor {
    fn kind(&self) -> BackendKind {
        BackendKind::SupportVector
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        check_training_input(self.kind(), x, y)?;

        let rows = self.training_rows(x.nrows());
        let x_train = x.select_rows(&rows);
        let y_train = TrainTestSplit::take(y, &rows);

        let scaler = StandardScaler::fit(&x_train);
        let z = scaler.transform(&x_train);
        let gamma = self.config.gamma.unwrap_or_else(|| scale_gamma(&z));
        let n = z.nrows();

        let z_rows: Vec<Vec<f64>> = (0..n).map(|i| z.row(i)).collect();
        let mut q = vec![0.0; n * n];
        q.par_chunks_mut(n).enumerate().for_each(|(i, q_row)| {
            for (j, cell) in q_row.iter_mut().enumerate() {
                *cell = rbf(&z_rows[i], &z_rows[j], gamma) + 1.0;
            }
        });

        let c = self.config.c;
        let epsilon = self.config.epsilon;
        let mut beta = vec![0.0; n];
        // Gradient of the smooth part, Q * beta - y
        let mut grad: Vec<f64> = y_train.iter().map(|v| -v).collect();
        let mut converged = false;
        let mut sweeps = 0;

        while sweeps < self.config.max_iter {
            sweeps += 1;
            let mut max_delta: f64 = 0.0;
            for i in 0..n {
                let q_ii = q[i * n + i];
                let target = beta[i] - grad[i] / q_ii;
                let updated = soft_threshold(target, epsilon / q_ii).clamp(-c, c);
                let delta = updated - beta[i];
                if delta == 0.0 {
                    continue;
                }
                beta[i] = updated;
                let q_row = &q[i * n..(i + 1) * n];
                for (g, q_ij) in grad.iter_mut().zip(q_row) {
                    *g += q_ij * delta;
                }
                max_delta = max_delta.max(delta.abs());
            }
            if max_delta < self.config.tol {
                converged = true;
                break;
            }
        }

        let support_rows: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        debug!(
            "SVR: gamma {:.5}, {} support vectors of {} rows, {} sweep(s){}",
            gamma,
            support_rows.len(),
            n,
            sweeps,
            if converged { "" } else { ", not converged" }
        );

        self.fitted = Some(FittedSvr {
            scaler,
            support: z.select_rows(&support_rows),
            coef: support_rows.iter().map(|&i| beta[i]).collect(),
            gamma,
        });
        self.feature_names = Some(x.column_names().to_vec());
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        check_prediction_input(self.kind(), &self.feature_names, x)?;
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| PipelineError::NotFitted(self.name().to_string()))?;

        let z = fitted.scaler.transform(x);
        let support: Vec<Vec<f64>> = (0..fitted.support.nrows())
            .map(|i| fitted.support.row(i))
            .collect();

        Ok((0..z.nrows())
            .into_par_iter()
            .map(|i| {
                let row = z.row(i);
                support
                    .iter()
                    .zip(&fitted.coef)
                    .map(|(sv, b)| b * (rbf(sv, &row, fitted.gamma) + 1.0))
                    .sum()
            })
            .collect())
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(0.5, 0.25), 0.25);
        assert_eq!(soft_threshold(-0.5, 0.25), -0.25);
        assert_eq!(soft_threshold(0.125, 0.25), 0.0);
    }

    #[test]
    fn test_fits_smooth_function() {
        let a: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = a.iter().map(|v| v.sin()).collect();
        let x = FeatureMatrix::from_columns(vec!["a".into()], &[a]).unwrap();

        let config = SvrConfig {
            max_iter: 1000,
            ..SvrConfig::default()
        };
        let mut svr = SupportVectorRegressor::new(config, 0);
        svr.fit(&x, &y).unwrap();
        let preds = svr.predict(&x).unwrap();

        for (p, t) in preds.iter().zip(&y) {
            assert!((p - t).abs() < 0.25, "pred {} target {}", p, t);
        }
        assert!(svr.n_support() > 0);
    }

    #[test]
    fn test_default_gamma_scales_with_feature_count() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = a.iter().map(|v| v * 0.1).collect();
        let x = FeatureMatrix::from_columns(vec!["a".into(), "b".into()], &[a, b]).unwrap();

        let mut svr = SupportVectorRegressor::new(SvrConfig::default(), 0);
        assert!(svr.gamma().is_none());
        svr.fit(&x, &y).unwrap();

        // Standardized columns pool to unit variance, so gamma = 1 / n_features
        assert!((svr.gamma().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_attribution() {
        let svr = SupportVectorRegressor::new(SvrConfig::default(), 0);
        assert!(svr.attribution().is_none());
    }

    #[test]
    fn test_large_training_set_is_subsampled() {
        let config = SvrConfig {
            max_samples: 30,
            ..SvrConfig::default()
        };
        let svr = SupportVectorRegressor::new(config, 3);
        let rows = svr.training_rows(100);
        assert_eq!(rows.len(), 30);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(rows, svr.training_rows(100));
    }
}
