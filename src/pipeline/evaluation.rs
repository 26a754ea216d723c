//! Backend x feature-set evaluation harness
//!
//! Every cell fits a fresh backend on the shared training partition and
//! scores it on the held-out partition after undoing the log transform.
//! Cells run in parallel; the table keeps the fixed enumeration order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::error::{PipelineError, Result};
use super::matrix::FeatureMatrix;
use super::metrics::{mean_absolute_error, mean_squared_error, r2_score};
use super::preprocess::TargetTransform;
use super::split::TrainTestSplit;
use crate::models::{build_backend, BackendKind, RegressionBackend};
use crate::pipeline::config::ModelsConfig;

/// Which columns a cell is trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureSet {
    Full,
    Selected,
}

impl FeatureSet {
    pub const ALL: [FeatureSet; 2] = [FeatureSet::Full, FeatureSet::Selected];

    pub fn label(&self) -> &'static str {
        match self {
            FeatureSet::Full => "Full",
            FeatureSet::Selected => "Selected",
        }
    }
}

/// Held-out scores of one (backend, feature set) cell, natural units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    /// e.g. `"RandomForest (Full)"`
    pub model: String,
    pub backend: BackendKind,
    pub feature_set: FeatureSet,
    pub n_features: usize,
    pub r2: f64,
    pub mse: f64,
    pub mae: f64,
}

/// Actual vs predicted conductivity on the test rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityData {
    pub backend: BackendKind,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    /// RandomForest, SVR, XGBoost; Full before Selected for each
    pub rows: Vec<ModelResult>,
    /// One entry per backend, from its full-feature cell
    pub parity: Vec<ParityData>,
}

impl ComparisonTable {
    pub fn get(&self, backend: BackendKind, feature_set: FeatureSet) -> Option<&ModelResult> {
        self.rows
            .iter()
            .find(|r| r.backend == backend && r.feature_set == feature_set)
    }
}

/// Train and test partitions of the feature matrix and log-scale target
#[derive(Debug, Clone)]
pub struct PartitionedData {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

impl PartitionedData {
    pub fn new(features: &FeatureMatrix, log_target: &[f64], split: &TrainTestSplit) -> Self {
        Self {
            x_train: features.select_rows(&split.train),
            x_test: features.select_rows(&split.test),
            y_train: TrainTestSplit::take(log_target, &split.train),
            y_test: TrainTestSplit::take(log_target, &split.test),
        }
    }

    /// Same rows, restricted to the named columns
    pub fn select_columns(&self, names: &[String]) -> Result<Self> {
        Ok(Self {
            x_train: self.x_train.select_columns(names)?,
            x_test: self.x_test.select_columns(names)?,
            y_train: self.y_train.clone(),
            y_test: self.y_test.clone(),
        })
    }
}

/// Fresh backend of `kind` fitted on the training partition
pub fn fit_backend(
    kind: BackendKind,
    data: &PartitionedData,
    config: &ModelsConfig,
    seed: u64,
) -> Result<Box<dyn RegressionBackend>> {
    let mut backend = build_backend(kind, config, seed);
    backend.fit(&data.x_train, &data.y_train)?;
    Ok(backend)
}

/// Run all six cells and assemble the comparison table
pub fn evaluate_backends(
    data: &PartitionedData,
    selected: &[String],
    config: &ModelsConfig,
    seed: u64,
) -> Result<ComparisonTable> {
    if selected.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no features selected for the reduced model".to_string(),
        ));
    }
    let reduced = data.select_columns(selected)?;

    let cells: Vec<(BackendKind, FeatureSet)> = BackendKind::ALL
        .into_iter()
        .flat_map(|kind| FeatureSet::ALL.into_iter().map(move |set| (kind, set)))
        .collect();

    let outcomes = cells
        .par_iter()
        .map(|&(kind, set)| {
            let partition = match set {
                FeatureSet::Full => data,
                FeatureSet::Selected => &reduced,
            };
            evaluate_cell(kind, set, partition, config, seed)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut parity = Vec::new();
    for (result, cell_parity) in outcomes {
        if result.feature_set == FeatureSet::Full {
            parity.push(cell_parity);
        }
        rows.push(result);
    }

    Ok(ComparisonTable { rows, parity })
}

fn evaluate_cell(
    kind: BackendKind,
    set: FeatureSet,
    data: &PartitionedData,
    config: &ModelsConfig,
    seed: u64,
) -> Result<(ModelResult, ParityData)> {
    let backend = fit_backend(kind, data, config, seed)?;
    let log_predicted = backend.predict(&data.x_test)?;

    let actual = TargetTransform::inverse_all(&data.y_test);
    let predicted = TargetTransform::inverse_all(&log_predicted);

    let result = ModelResult {
        model: format!("{} ({})", kind.label(), set.label()),
        backend: kind,
        feature_set: set,
        n_features: data.x_train.ncols(),
        r2: r2_score(&actual, &predicted),
        mse: mean_squared_error(&actual, &predicted),
        mae: mean_absolute_error(&actual, &predicted),
    };
    debug!(
        "{}: R2 {:.4}, MSE {:.4}, MAE {:.4}",
        result.model, result.r2, result.mse, result.mae
    );

    Ok((
        result,
        ParityData {
            backend: kind,
            actual,
            predicted,
        },
    ))
}
