//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tempfile::TempDir;

/// Small electrolyte table shaped like the real dataset.
///
/// - `Unnamed: 0` and `doi`: identifier columns that preprocessing drops
/// - `k`: conductivity, one row missing and one row below the log1p domain
/// - `c`, `T`: numeric conditions, `T` has one missing value
/// - `salt`, `solvent ratio type`: categorical
/// - `EC`, `DMC`: solvent fractions
pub fn create_electrolyte_dataframe() -> DataFrame {
    df! {
        "Unnamed: 0" => [0i64, 1, 2, 3, 4, 5, 6, 7],
        "doi" => ["d1", "d1", "d2", "d2", "d3", "d3", "d4", "d4"],
        "k" => [Some(1.5f64), Some(3.0), None, Some(7.5), Some(-2.0), Some(12.0), Some(9.0), Some(4.0)],
        "c" => [0.5f64, 1.0, 1.5, 1.0, 0.8, 1.2, 1.0, 0.6],
        "T" => [Some(25.0f64), Some(30.0), Some(25.0), None, Some(40.0), Some(50.0), Some(45.0), Some(20.0)],
        "salt" => ["LiPF6", "LiPF6", "LiFSI", "LiTFSI", "LiFSI", "LiFSI", "LiTFSI", "LiPF6"],
        "solvent ratio type" => ["w", "v", "w", "w", "v", "w", "w", "v"],
        "EC" => [0.5f64, 0.3, 0.4, 0.5, 0.2, 0.3, 0.6, 0.5],
        "DMC" => [0.5f64, 0.7, 0.6, 0.5, 0.8, 0.7, 0.4, 0.5],
    }
    .unwrap()
}

/// 20 rows, `k` = 1..=20, salt A for the first ten rows and B for the rest
pub fn create_salt_scenario_dataframe() -> DataFrame {
    let k: Vec<f64> = (1..=20).map(|v| v as f64).collect();
    let salt: Vec<&str> = (0..20).map(|i| if i < 10 { "A" } else { "B" }).collect();
    let temperature: Vec<f64> = (0..20).map(|i| 20.0 + i as f64).collect();
    let concentration: Vec<f64> = (0..20).map(|i| if i < 10 { 0.8 } else { 1.2 }).collect();
    let ec: Vec<f64> = (0..20).map(|i| if i < 10 { 0.2 } else { 0.6 }).collect();
    let dmc: Vec<f64> = ec.iter().map(|v| 1.0 - v).collect();

    df! {
        "k" => k,
        "salt" => salt,
        "T" => temperature,
        "c" => concentration,
        "EC" => ec,
        "DMC" => dmc,
    }
    .unwrap()
}

/// `n` rows with `k` spread evenly over [0, n)
pub fn create_uniform_target_dataframe(n: usize) -> DataFrame {
    let k: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let salt: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "LiFSI" } else { "LiPF6" }).collect();
    let temperature: Vec<f64> = (0..n).map(|i| 25.0 + (i % 5) as f64).collect();

    df! {
        "k" => k,
        "salt" => salt,
        "T" => temperature,
    }
    .unwrap()
}

/// `n` rows that all share the same conductivity
pub fn create_identical_target_dataframe(n: usize, k: f64) -> DataFrame {
    let salt: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "LiFSI" } else { "LiPF6" }).collect();

    df! {
        "k" => vec![k; n],
        "salt" => salt,
        "T" => vec![25.0f64; n],
    }
    .unwrap()
}

/// Synthetic regression table with `n_features` numeric columns.
///
/// `k` is driven by `f0` and `f1` only, the remaining columns are noise.
pub fn create_regression_dataframe(rows: usize, n_features: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let features: Vec<Vec<f64>> = (0..n_features)
        .map(|_| (0..rows).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();

    let k: Vec<f64> = (0..rows)
        .map(|r| {
            let f1 = if n_features > 1 { features[1][r] } else { 0.0 };
            5.0 * features[0][r] + 2.0 * f1 + 0.1 * rng.gen_range(0.0..1.0)
        })
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(n_features + 1);
    columns.push(Column::new("k".into(), k));
    for (i, values) in features.into_iter().enumerate() {
        columns.push(Column::new(format!("f{}", i).into(), values));
    }
    DataFrame::new(columns).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("electrolytes.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("electrolytes.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that two floats agree within `tol`
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {} within {} of {}",
        actual,
        tol,
        expected
    );
}
