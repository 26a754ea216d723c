//! Tests for table cleaning, the log1p target and one-hot encoding

use elyte::pipeline::config::DataConfig;
use elyte::pipeline::{
    clean_table, compute_pearson_correlation, prepare_data, rank_by_correlation,
    DataQualityWarning, PipelineError, TargetTransform,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_clean_table_drops_identifiers_and_bad_targets() {
    let df = create_electrolyte_dataframe();
    let clean = clean_table(&df, &DataConfig::default()).unwrap();

    let names: Vec<String> = clean
        .table
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert!(!names.contains(&"Unnamed: 0".to_string()));
    assert!(!names.contains(&"doi".to_string()));
    assert!(names.contains(&"k".to_string()));

    // One missing target, one below -1
    assert_eq!(clean.table.height(), 6);
    assert_eq!(clean.target, vec![1.5, 3.0, 7.5, 12.0, 9.0, 4.0]);
}

#[test]
fn test_clean_table_reports_absent_optional_column() {
    let df = create_electrolyte_dataframe();
    let clean = clean_table(&df, &DataConfig::default()).unwrap();

    assert!(clean.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::OptionalColumnAbsent { column } if column == "c units"
    )));
    let dropped: usize = clean
        .warnings
        .iter()
        .filter_map(|w| match w {
            DataQualityWarning::DroppedRows { count, .. } => Some(*count),
            _ => None,
        })
        .sum();
    assert_eq!(dropped, 2);
}

#[test]
fn test_missing_target_column_is_schema_error() {
    let df = create_electrolyte_dataframe();
    let config = DataConfig {
        target: "conductivity".to_string(),
        ..Default::default()
    };

    let err = clean_table(&df, &config).unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)));
    assert!(err.to_string().contains("conductivity"));
}

#[test]
fn test_target_without_usable_values_is_schema_error() {
    let df = df! {
        "k" => [None::<f64>, None, Some(-3.0)],
        "c" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();

    let err = clean_table(&df, &DataConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)));
}

#[test]
fn test_prepare_data_feature_order() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();

    assert_eq!(
        prepared.features.column_names(),
        &[
            "c",
            "T",
            "EC",
            "DMC",
            "salt_LiFSI",
            "salt_LiPF6",
            "salt_LiTFSI",
            "solvent ratio type_v",
            "solvent ratio type_w",
        ]
    );
    assert_eq!(prepared.features.nrows(), prepared.log_target.len());
}

#[test]
fn test_one_hot_rows_have_single_indicator() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();
    let x = &prepared.features;

    let salt_cols: Vec<usize> = x
        .column_names()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("salt_"))
        .map(|(i, _)| i)
        .collect();

    for row in 0..x.nrows() {
        let hot: f64 = salt_cols.iter().map(|&c| x.value(row, c)).sum();
        assert_eq!(hot, 1.0, "row {} should have exactly one salt", row);
    }
}

#[test]
fn test_missing_numeric_values_are_mean_imputed() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();
    let t = prepared.features.column_index("T").unwrap();

    // Kept T values: 25, 30, missing, 50, 45, 20
    assert_close(prepared.features.value(2, t), 34.0, 1e-12);
    assert!(prepared.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::ImputedValues { column, count: 1, .. } if column == "T"
    )));
}

#[test]
fn test_log_target_round_trips() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();

    for (log_k, k) in prepared.log_target.iter().zip(&prepared.target) {
        assert_close(*log_k, k.ln_1p(), 1e-12);
        assert_close(TargetTransform::inverse(*log_k), *k, 1e-9);
    }
}

#[test]
fn test_encoder_reapplies_to_new_table() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();

    let unseen = df! {
        "k" => [2.0f64],
        "c" => [1.0f64],
        "T" => [None::<f64>],
        "salt" => ["LiBF4"],
        "solvent ratio type" => ["w"],
        "EC" => [0.5f64],
        "DMC" => [0.5f64],
    }
    .unwrap();

    let x = prepared.encoder.transform(&unseen).unwrap();
    assert_eq!(x.column_names(), prepared.features.column_names());

    let salt_sum: f64 = ["salt_LiFSI", "salt_LiPF6", "salt_LiTFSI"]
        .iter()
        .map(|n| x.value(0, x.column_index(n).unwrap()))
        .sum();
    assert_eq!(salt_sum, 0.0, "unseen salt encodes as all zeros");
    assert_close(x.value(0, x.column_index("T").unwrap()), 34.0, 1e-12);
}

#[test]
fn test_unimputed_features_keep_gaps_for_correlation() {
    let df = create_electrolyte_dataframe();
    let prepared = prepare_data(&df, &DataConfig::default()).unwrap();
    let t = prepared.unimputed_features.column_index("T").unwrap();

    assert_eq!(
        prepared.unimputed_features.column_names(),
        prepared.features.column_names()
    );
    assert!(prepared.unimputed_features.value(2, t).is_nan());

    // Only the five rows with an observed T enter the coefficient
    let observed: Vec<usize> = vec![0, 1, 3, 4, 5];
    let t_values: Vec<f64> = observed
        .iter()
        .map(|&r| prepared.unimputed_features.value(r, t))
        .collect();
    let targets: Vec<f64> = observed.iter().map(|&r| prepared.log_target[r]).collect();
    let expected = compute_pearson_correlation(&t_values, &targets).unwrap();

    let ranking =
        rank_by_correlation(&prepared.unimputed_features, &prepared.log_target).unwrap();
    assert_close(ranking.score_of("T").unwrap(), expected, 1e-12);

    let imputed = rank_by_correlation(&prepared.features, &prepared.log_target).unwrap();
    assert!((imputed.score_of("T").unwrap() - expected).abs() > 1e-6);
}
