//! Gradient-boosted regression trees with squared-error loss
//!
//! Second-order boosting in the XGBoost formulation: each round fits a
//! tree to the gradient (`pred - y`) and hessian (1) of the loss, with L2
//! regularization on leaf weights, and adds it shrunk by the learning rate.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use super::shap::tree_shap;
use super::tree::{RegressionTree, TreeParams};
use super::{
    check_prediction_input, check_training_input, normalized_gain_ranking, BackendKind,
    FeatureAttribution, RegressionBackend,
};
use crate::pipeline::config::BoostingConfig;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::ranking::Ranking;
use crate::pipeline::FeatureMatrix;

#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    config: BoostingConfig,
    seed: u64,
    base_score: f64,
    /// Leaves already multiplied by the learning rate
    trees: Vec<RegressionTree>,
    feature_names: Option<Vec<String>>,
}

impl GradientBoostedTrees {
    pub fn new(config: BoostingConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            base_score: 0.0,
            trees: Vec::new(),
            feature_names: None,
        }
    }

    /// Starting prediction, the mean training target
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    fn fitted_names(&self) -> Result<&[String]> {
        self.feature_names
            .as_deref()
            .ok_or_else(|| PipelineError::NotFitted(self.name().to_string()))
    }
}

/// Sorted sample of `ceil(n * fraction)` indices out of `0..n`, or all of them
fn sample_indices(rng: &mut ChaCha8Rng, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * fraction).ceil() as usize).clamp(1, n);
    let all: Vec<usize> = (0..n).collect();
    let mut picked: Vec<usize> = all.choose_multiple(rng, k).copied().collect();
    picked.sort_unstable();
    picked
}

impl RegressionBackend for GradientBoostedTrees {
    fn kind(&self) -> BackendKind {
        BackendKind::GradientBoosting
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        check_training_input(self.kind(), x, y)?;

        let n = x.nrows();
        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut pred = vec![base_score; n];
        let hess = vec![1.0; n];
        let params = TreeParams {
            max_depth: Some(self.config.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: self.config.min_child_weight,
            reg_lambda: self.config.reg_lambda,
            gamma: self.config.gamma,
            max_features: None,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let grad: Vec<f64> = pred.iter().zip(y).map(|(p, t)| p - t).collect();
            let rows = sample_indices(&mut rng, n, self.config.subsample);
            let features = sample_indices(&mut rng, x.ncols(), self.config.colsample_bytree);

            let mut tree = RegressionTree::fit(x, &grad, &hess, &rows, &features, &params, &mut rng);
            tree.scale(self.config.learning_rate);

            pred.par_iter_mut()
                .enumerate()
                .for_each(|(i, p)| *p += tree.predict_at(x, i));
            trees.push(tree);
        }

        let train_mse = pred
            .iter()
            .zip(y)
            .map(|(p, t)| (p - t) * (p - t))
            .sum::<f64>()
            / n as f64;
        debug!(
            "XGBoost: {} rounds, base score {:.4}, training MSE (log scale) {:.6}",
            trees.len(),
            base_score,
            train_mse
        );

        self.base_score = base_score;
        self.trees = trees;
        self.feature_names = Some(x.column_names().to_vec());
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        check_prediction_input(self.kind(), &self.feature_names, x)?;
        Ok((0..x.nrows())
            .into_par_iter()
            .map(|i| {
                self.base_score + self.trees.iter().map(|t| t.predict_at(x, i)).sum::<f64>()
            })
            .collect())
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        Some(self)
    }
}

impl FeatureAttribution for GradientBoostedTrees {
    fn expected_value(&self) -> Result<f64> {
        self.fitted_names()?;
        Ok(self.base_score + self.trees.iter().map(|t| t.expected_value()).sum::<f64>())
    }

    fn attributions(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        let names = check_prediction_input(self.kind(), &self.feature_names, x)?;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut phi = vec![0.0; x.ncols()];
                for tree in &self.trees {
                    tree_shap(tree, &row, &mut phi);
                }
                phi
            })
            .collect();

        FeatureMatrix::from_rows(names.to_vec(), &rows)
    }

    fn split_importances(&self) -> Result<Ranking> {
        let names = self.fitted_names()?;
        let mut gains = vec![0.0; names.len()];
        for tree in &self.trees {
            tree.accumulate_gains(&mut gains);
        }
        Ok(normalized_gain_ranking(names, &gains))
    }
}
