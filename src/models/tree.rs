//! Regression trees grown on gradient statistics
//!
//! One builder serves both ensembles. With `grad = -y`, `hess = 1` and no
//! regularization the leaf weight `-G / (H + lambda)` is the mean target and
//! the split gain is the variance reduction, so random-forest trees and
//! second-order boosting trees share the same code path.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::pipeline::FeatureMatrix;

/// Splits must improve the objective by more than this
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Arena node. `cover` is the hessian mass (sample count for squared loss)
/// that reached the node during training.
#[derive(Debug, Clone, Serialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
        gain: f64,
    },
}

impl TreeNode {
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Leaf { cover, .. } | TreeNode::Split { cover, .. } => *cover,
        }
    }
}

/// Growth limits and regularization
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
    /// Features sampled at each split; `None` tries all of them
    pub max_features: Option<usize>,
}

/// A fitted regression tree. Node 0 is the root.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a TreeParams,
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Grow a tree on `rows` of `x` (duplicates allowed), using only `features`.
    ///
    /// `grad` and `hess` are indexed by row of `x`.
    pub fn fit(
        x: &FeatureMatrix,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            grad,
            hess,
            features,
            params,
            nodes: Vec::new(),
        };
        builder.build(rows.to_vec(), 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Prediction for one row of a matrix
    pub fn predict_at(&self, x: &FeatureMatrix, row: usize) -> f64 {
        self.walk(|feature| x.value(row, feature))
    }

    /// Prediction for a row given as a slice
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.walk(|feature| row[feature])
    }

    fn walk(&self, value_of: impl Fn(usize) -> f64) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if value_of(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Multiply every leaf value (learning-rate shrinkage)
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf { value, .. } = node {
                *value *= factor;
            }
        }
    }

    /// Cover-weighted mean of the leaf values: the tree's training-mean output
    pub fn expected_value(&self) -> f64 {
        let root_cover = self.nodes[0].cover();
        if root_cover <= 0.0 {
            return 0.0;
        }
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Leaf { value, cover } => Some(value * cover),
                TreeNode::Split { .. } => None,
            })
            .sum::<f64>()
            / root_cover
    }

    /// Add each split's gain to its feature's slot
    pub fn accumulate_gains(&self, totals: &mut [f64]) {
        for node in &self.nodes {
            if let TreeNode::Split { feature, gain, .. } = node {
                totals[*feature] += gain;
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[TreeNode], index: usize) -> usize {
            match &nodes[index] {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => {
                    1 + depth_of(nodes, *left).max(depth_of(nodes, *right))
                }
            }
        }
        depth_of(&self.nodes, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let g_total: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h_total: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let value = -g_total / (h_total + self.params.reg_lambda);

        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value,
            cover: h_total,
        });

        let n = rows.len();
        let should_stop = n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf.max(1)
            || self.params.max_depth.is_some_and(|d| depth >= d);
        if should_stop {
            return index;
        }

        let candidates: Vec<usize> = match self.params.max_features {
            Some(m) if m < self.features.len() => {
                self.features.choose_multiple(rng, m).copied().collect()
            }
            _ => self.features.to_vec(),
        };

        let Some(best) = self.find_best_split(&rows, &candidates, g_total, h_total) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x.value(i, best.feature) <= best.threshold);

        if left_rows.is_empty() || right_rows.is_empty() {
            return index;
        }

        let left = self.build(left_rows, depth + 1, rng);
        let right = self.build(right_rows, depth + 1, rng);

        self.nodes[index] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
            cover: h_total,
            gain: best.gain,
        };
        index
    }

    fn find_best_split(
        &self,
        rows: &[usize],
        candidates: &[usize],
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let per_feature: Vec<Option<SplitCandidate>> = candidates
            .par_iter()
            .map(|&feature| self.best_split_for_feature(rows, feature, g_total, h_total))
            .collect();

        // Sequential reduction keeps the first of equally good splits
        let min_gain = self.params.gamma.max(MIN_SPLIT_GAIN);
        per_feature
            .into_iter()
            .flatten()
            .filter(|c| c.gain > min_gain)
            .fold(None, |best: Option<SplitCandidate>, c| match best {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            })
    }

    fn best_split_for_feature(
        &self,
        rows: &[usize],
        feature: usize,
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, f64, f64)> = rows
            .iter()
            .map(|&i| (self.x.value(i, feature), self.grad[i], self.hess[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let lambda = self.params.reg_lambda;
        let parent_score = g_total * g_total / (h_total + lambda);
        let n = sorted.len();

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n.saturating_sub(1) {
            g_left += sorted[pos].1;
            h_left += sorted[pos].2;

            let current = sorted[pos].0;
            let next = sorted[pos + 1].0;
            if next <= current {
                continue;
            }

            let n_left = pos + 1;
            if n_left < self.params.min_samples_leaf || n - n_left < self.params.min_samples_leaf {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                continue;
            }

            let gain = 0.5
                * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                    - parent_score);

            if best.as_ref().map_or(true, |b| gain > b.gain) {
                let mid = (current + next) / 2.0;
                best = Some(SplitCandidate {
                    feature,
                    threshold: if mid < next { mid } else { current },
                    gain,
                });
            }
        }

        best
    }
}
