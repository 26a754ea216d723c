//! Regression backends and feature attribution
//!
//! Every backend predicts on the `log1p` scale. Tree ensembles also offer
//! [`FeatureAttribution`]; asking any other backend for it is rejected by
//! the importance stage before work starts.

pub mod boosting;
pub mod forest;
pub mod scaler;
pub mod shap;
pub mod svr;
pub mod tree;

pub use boosting::GradientBoostedTrees;
pub use forest::RandomForest;
pub use scaler::StandardScaler;
pub use svr::SupportVectorRegressor;
pub use tree::{RegressionTree, TreeNode, TreeParams};

use serde::Serialize;

use crate::pipeline::config::ModelsConfig;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::ranking::Ranking;
use crate::pipeline::FeatureMatrix;

/// The model families compared by the evaluation harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendKind {
    RandomForest,
    SupportVector,
    GradientBoosting,
}

impl BackendKind {
    /// Comparison table order
    pub const ALL: [BackendKind; 3] = [
        BackendKind::RandomForest,
        BackendKind::SupportVector,
        BackendKind::GradientBoosting,
    ];

    /// Display name used in the comparison table
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::RandomForest => "RandomForest",
            BackendKind::SupportVector => "SVR",
            BackendKind::GradientBoosting => "XGBoost",
        }
    }

    /// Whether fitted instances of this kind implement [`FeatureAttribution`]
    pub fn supports_attribution(&self) -> bool {
        matches!(
            self,
            BackendKind::RandomForest | BackendKind::GradientBoosting
        )
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Shared fit/predict contract of all model families.
///
/// `fit` records the column names of its training matrix; `predict` on a
/// matrix with any other column list fails with
/// [`PipelineError::ColumnMismatch`].
pub trait RegressionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn name(&self) -> &'static str {
        self.kind().label()
    }

    /// Train in place on `x` and the log-scale target `y`
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()>;

    /// Log-scale predictions, one per row of `x`
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Column names seen by `fit`, `None` before fitting
    fn feature_names(&self) -> Option<&[String]>;

    /// Attribution capability, offered only by tree ensembles
    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        None
    }
}

/// Additive per-feature decomposition of a fitted model's predictions.
///
/// For every row, `expected_value() + sum(attributions(x)[row]) ==
/// predict(x)[row]` up to floating-point rounding.
pub trait FeatureAttribution {
    /// Model output averaged over the training distribution
    fn expected_value(&self) -> Result<f64>;

    /// Per-row, per-feature contributions with the model's column names
    fn attributions(&self, x: &FeatureMatrix) -> Result<FeatureMatrix>;

    /// Total split gain per feature, normalized to sum to 1
    fn split_importances(&self) -> Result<Ranking>;
}

/// Construct an unfitted backend with the configured hyperparameters
pub fn build_backend(
    kind: BackendKind,
    config: &ModelsConfig,
    seed: u64,
) -> Box<dyn RegressionBackend> {
    match kind {
        BackendKind::RandomForest => Box::new(RandomForest::new(config.forest.clone(), seed)),
        BackendKind::SupportVector => {
            Box::new(SupportVectorRegressor::new(config.svr.clone(), seed))
        }
        BackendKind::GradientBoosting => {
            Box::new(GradientBoostedTrees::new(config.boosting.clone(), seed))
        }
    }
}

pub(crate) fn check_training_input(kind: BackendKind, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::InsufficientData(format!(
            "{}: {} training rows but {} target values",
            kind,
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() < 2 || x.ncols() == 0 {
        return Err(PipelineError::InsufficientData(format!(
            "{}: cannot fit on a {}x{} matrix",
            kind,
            x.nrows(),
            x.ncols()
        )));
    }
    if let Some(bad) = y.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::InsufficientData(format!(
            "{}: non-finite target at row {}",
            kind, bad
        )));
    }
    Ok(())
}

/// Fitted column list, or `NotFitted`; also rejects column drift
pub(crate) fn check_prediction_input<'a>(
    kind: BackendKind,
    fitted: &'a Option<Vec<String>>,
    x: &FeatureMatrix,
) -> Result<&'a [String]> {
    let names = fitted
        .as_deref()
        .ok_or_else(|| PipelineError::NotFitted(kind.label().to_string()))?;
    x.ensure_columns(names)?;
    Ok(names)
}

/// Normalize accumulated gains into a ranking that sums to 1
pub(crate) fn normalized_gain_ranking(names: &[String], gains: &[f64]) -> Ranking {
    let total: f64 = gains.iter().sum();
    let scale = if total > 0.0 { 1.0 / total } else { 0.0 };
    Ranking::from_scores(
        names
            .iter()
            .cloned()
            .zip(gains.iter().map(|g| g * scale)),
    )
}
