//! Tests for the six-cell model comparison

use elyte::models::BackendKind;
use elyte::pipeline::config::{BoostingConfig, DataConfig, ForestConfig, ModelsConfig};
use elyte::pipeline::{
    evaluate_backends, prepare_data, FeatureSet, PartitionedData, PipelineError, TrainTestSplit,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn quick_models() -> ModelsConfig {
    ModelsConfig {
        forest: ForestConfig {
            n_estimators: 15,
            ..Default::default()
        },
        boosting: BoostingConfig {
            n_estimators: 25,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn ten_column_data() -> PartitionedData {
    let df = create_regression_dataframe(150, 10, 11);
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();
    assert_eq!(prepared.features.ncols(), 10);
    let split = TrainTestSplit::new(prepared.features.nrows(), 0.2, 42).unwrap();
    PartitionedData::new(&prepared.features, &prepared.log_target, &split)
}

fn four_selected() -> Vec<String> {
    ["f0", "f1", "f4", "f7"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_full_and_selected_metrics_are_finite() {
    let data = ten_column_data();
    let table = evaluate_backends(&data, &four_selected(), &quick_models(), 42).unwrap();

    assert_eq!(table.rows.len(), 6);
    for row in &table.rows {
        assert!(row.mse.is_finite() && row.mse >= 0.0, "{}", row.model);
        assert!(row.mae.is_finite() && row.mae >= 0.0, "{}", row.model);
        assert!(row.r2.is_finite(), "{}", row.model);
    }

    for kind in BackendKind::ALL {
        assert_eq!(table.get(kind, FeatureSet::Full).unwrap().n_features, 10);
        assert_eq!(table.get(kind, FeatureSet::Selected).unwrap().n_features, 4);
    }
}

#[test]
fn test_rows_follow_backend_then_feature_set() {
    let data = ten_column_data();
    let table = evaluate_backends(&data, &four_selected(), &quick_models(), 42).unwrap();

    let order: Vec<(BackendKind, FeatureSet)> = table
        .rows
        .iter()
        .map(|r| (r.backend, r.feature_set))
        .collect();
    assert_eq!(
        order,
        vec![
            (BackendKind::RandomForest, FeatureSet::Full),
            (BackendKind::RandomForest, FeatureSet::Selected),
            (BackendKind::SupportVector, FeatureSet::Full),
            (BackendKind::SupportVector, FeatureSet::Selected),
            (BackendKind::GradientBoosting, FeatureSet::Full),
            (BackendKind::GradientBoosting, FeatureSet::Selected),
        ]
    );
}

#[test]
fn test_parity_data_in_natural_units() {
    let data = ten_column_data();
    let table = evaluate_backends(&data, &four_selected(), &quick_models(), 42).unwrap();

    assert_eq!(table.parity.len(), 3);
    for parity in &table.parity {
        assert_eq!(parity.actual.len(), data.y_test.len());
        assert_eq!(parity.predicted.len(), data.y_test.len());
        for (actual, log_k) in parity.actual.iter().zip(&data.y_test) {
            assert_close(*actual, log_k.exp_m1(), 1e-9);
        }
    }
}

#[test]
fn test_evaluation_is_reproducible() {
    let data = ten_column_data();
    let a = evaluate_backends(&data, &four_selected(), &quick_models(), 42).unwrap();
    let b = evaluate_backends(&data, &four_selected(), &quick_models(), 42).unwrap();

    for (ra, rb) in a.rows.iter().zip(&b.rows) {
        assert_eq!(ra.mse, rb.mse, "{}", ra.model);
        assert_eq!(ra.r2, rb.r2, "{}", ra.model);
    }
}

#[test]
fn test_unknown_selected_feature_is_rejected() {
    let data = ten_column_data();
    let selected = vec!["f0".to_string(), "missing".to_string()];

    let err = evaluate_backends(&data, &selected, &quick_models(), 42).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownColumn(_)));
}

#[test]
fn test_split_is_seeded_and_disjoint() {
    let a = TrainTestSplit::new(50, 0.2, 42).unwrap();
    let b = TrainTestSplit::new(50, 0.2, 42).unwrap();
    assert_eq!(a.test, b.test);
    assert_eq!(a.test.len(), 10);
    assert!(a.train.iter().all(|i| !a.test.contains(i)));
    assert_eq!(a.train.len() + a.test.len(), 50);
}
