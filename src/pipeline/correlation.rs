//! Correlation ranking of features against the log-scale target

use rayon::prelude::*;
use tracing::debug;

use super::error::{PipelineError, Result};
use super::matrix::FeatureMatrix;
use super::ranking::Ranking;

/// Rank every feature by its Pearson correlation with `target`.
///
/// Sorted by signed correlation, most positive first. Zero-variance
/// features have no defined correlation and are left out. NaN cells are
/// skipped pair by pair, so pass unimputed features to keep fill values
/// out of the coefficient.
pub fn rank_by_correlation(features: &FeatureMatrix, target: &[f64]) -> Result<Ranking> {
    if features.nrows() != target.len() {
        return Err(PipelineError::InsufficientData(format!(
            "{} feature rows but {} target values",
            features.nrows(),
            target.len()
        )));
    }

    let scores: Vec<(String, f64)> = (0..features.ncols())
        .into_par_iter()
        .filter_map(|j| {
            let column = features.column(j);
            compute_pearson_correlation(&column, target)
                .map(|c| (features.column_names()[j].clone(), c))
        })
        .collect();

    let excluded = features.ncols() - scores.len();
    if excluded > 0 {
        debug!("{} constant feature(s) excluded from correlation ranking", excluded);
    }

    Ok(Ranking::from_scores(scores))
}

/// Pearson correlation using Welford's single-pass algorithm
///
/// Returns `None` for empty or mismatched input and when either side has
/// zero variance.
pub fn compute_pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n == 0 || n != y.len() {
        return None;
    }

    let mut count = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if !xi.is_finite() || !yi.is_finite() {
            continue;
        }
        count += 1.0;
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        mean_x += dx / count;
        mean_y += dy / count;
        var_x += dx * (xi - mean_x);
        var_y += dy * (yi - mean_y);
        cov_xy += dx * (yi - mean_y);
        sum_sq_x += xi * xi;
        sum_sq_y += yi * yi;
    }

    if count < 2.0 {
        return None;
    }

    // Spread below the rounding noise of the column's own magnitude counts
    // as zero variance
    let noise_floor = |sum_sq: f64| f64::EPSILON * f64::EPSILON * sum_sq * count;
    if var_x <= noise_floor(sum_sq_x) || var_y <= noise_floor(sum_sq_y) {
        return None;
    }

    let r = cov_xy / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}
