//! Bootstrap-aggregated regression trees

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use super::shap::tree_shap;
use super::tree::{RegressionTree, TreeParams};
use super::{
    check_prediction_input, check_training_input, normalized_gain_ranking, BackendKind,
    FeatureAttribution, RegressionBackend,
};
use crate::pipeline::config::ForestConfig;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::ranking::Ranking;
use crate::pipeline::FeatureMatrix;

/// Random forest regressor. Tree `t` draws its bootstrap sample and
/// feature subsets from its own stream seeded with `seed + t`, so the
/// result does not depend on thread scheduling.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    seed: u64,
    trees: Vec<RegressionTree>,
    feature_names: Option<Vec<String>>,
}

impl RandomForest {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            trees: Vec::new(),
            feature_names: None,
        }
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        let per_split = (n_features as f64 * self.config.max_features).ceil() as usize;
        let per_split = per_split.clamp(1, n_features);
        TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split.max(2),
            min_samples_leaf: self.config.min_samples_leaf.max(1),
            min_child_weight: 0.0,
            reg_lambda: 0.0,
            gamma: 0.0,
            max_features: (per_split < n_features).then_some(per_split),
        }
    }

    fn fitted_trees(&self) -> Result<&[RegressionTree]> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted(self.name().to_string()));
        }
        Ok(&self.trees)
    }
}

impl RegressionBackend for RandomForest {
    fn kind(&self) -> BackendKind {
        BackendKind::RandomForest
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        check_training_input(self.kind(), x, y)?;
        if self.config.n_estimators == 0 {
            return Err(PipelineError::InsufficientData(
                "RandomForest needs at least one tree".to_string(),
            ));
        }

        let n = x.nrows();
        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; n];
        let features: Vec<usize> = (0..x.ncols()).collect();
        let params = self.tree_params(x.ncols());
        let seed = self.seed;
        let bootstrap = self.config.bootstrap;

        let trees: Vec<RegressionTree> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
                let rows: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, &grad, &hess, &rows, &features, &params, &mut rng)
            })
            .collect();

        debug!(
            "RandomForest: {} trees, mean depth {:.1}, mean leaves {:.1}",
            trees.len(),
            trees.iter().map(|t| t.depth() as f64).sum::<f64>() / trees.len() as f64,
            trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / trees.len() as f64
        );

        self.trees = trees;
        self.feature_names = Some(x.column_names().to_vec());
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        check_prediction_input(self.kind(), &self.feature_names, x)?;
        let trees = self.fitted_trees()?;
        let n_trees = trees.len() as f64;

        Ok((0..x.nrows())
            .into_par_iter()
            .map(|i| trees.iter().map(|t| t.predict_at(x, i)).sum::<f64>() / n_trees)
            .collect())
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        Some(self)
    }
}

impl FeatureAttribution for RandomForest {
    fn expected_value(&self) -> Result<f64> {
        let trees = self.fitted_trees()?;
        Ok(trees.iter().map(|t| t.expected_value()).sum::<f64>() / trees.len() as f64)
    }

    fn attributions(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        let names = check_prediction_input(self.kind(), &self.feature_names, x)?;
        let trees = self.fitted_trees()?;
        let n_trees = trees.len() as f64;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut phi = vec![0.0; x.ncols()];
                for tree in trees {
                    tree_shap(tree, &row, &mut phi);
                }
                phi.iter_mut().for_each(|v| *v /= n_trees);
                phi
            })
            .collect();

        FeatureMatrix::from_rows(names.to_vec(), &rows)
    }

    fn split_importances(&self) -> Result<Ranking> {
        let trees = self.fitted_trees()?;
        let names = self
            .feature_names
            .as_deref()
            .ok_or_else(|| PipelineError::NotFitted(self.name().to_string()))?;
        let mut gains = vec![0.0; names.len()];
        for tree in trees {
            tree.accumulate_gains(&mut gains);
        }
        Ok(normalized_gain_ranking(names, &gains))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 20,
            ..ForestConfig::default()
        }
    }

    fn data() -> (FeatureMatrix, Vec<f64>) {
        let a: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| ((i * 7) % 5) as f64).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 0.5 * a + 0.1 * b).collect();
        let x = FeatureMatrix::from_columns(vec!["a".into(), "b".into()], &[a, b]).unwrap();
        (x, y)
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = data();
        let mut f1 = RandomForest::new(small_config(), 7);
        let mut f2 = RandomForest::new(small_config(), 7);
        f1.fit(&x, &y).unwrap();
        f2.fit(&x, &y).unwrap();
        assert_eq!(f1.predict(&x).unwrap(), f2.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = data();
        let forest = RandomForest::new(small_config(), 1);
        assert!(matches!(
            forest.predict(&x),
            Err(PipelineError::NotFitted(_))
        ));
    }

    #[test]
    fn test_attributions_are_additive() {
        let (x, y) = data();
        let mut forest = RandomForest::new(small_config(), 3);
        forest.fit(&x, &y).unwrap();
        let preds = forest.predict(&x).unwrap();
        let base = forest.expected_value().unwrap();
        let phi = forest.attributions(&x).unwrap();
        for i in 0..x.nrows() {
            let total: f64 = phi.row(i).iter().sum();
            assert!((base + total - preds[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_dominant_feature_has_most_gain() {
        let (x, y) = data();
        let mut forest = RandomForest::new(small_config(), 5);
        forest.fit(&x, &y).unwrap();
        let importances = forest.split_importances().unwrap();
        assert_eq!(importances.names()[0], "a");
    }
}
