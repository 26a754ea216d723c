//! High-conductivity formulation summary
//!
//! Works on the cleaned but unencoded table: categorical conditions are
//! read as text, continuous ones as numbers, both restricted to rows whose
//! conductivity reaches the configured quantile.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::config::RecommendationConfig;
use super::error::{PipelineError, Result};
use super::loader::{numeric_values, string_values};
use super::preprocess::CleanTable;
use super::ranking::Ranking;

/// Most frequent value of a categorical condition in the subset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionMode {
    pub field: String,
    pub value: String,
    pub count: usize,
}

/// Conditions shared by the top-conductivity samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub quantile: f64,
    pub threshold: f64,
    pub subset_size: usize,
    pub total_size: usize,
    pub modes: Vec<ConditionMode>,
    /// Mean temperature, one decimal
    pub temperature: Option<f64>,
    /// Mean concentration, two decimals
    pub concentration: Option<f64>,
    /// Solvent columns by mean fraction in the subset
    pub top_solvents: Ranking,
    /// Configured condition fields missing from the table
    pub absent_fields: Vec<String>,
}

impl Recommendation {
    pub fn mode_of(&self, field: &str) -> Option<&str> {
        self.modes
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.value.as_str())
    }
}

/// Linear-interpolation quantile of the finite values, `q` in `[0, 1]`
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Most frequent value; ties go to the value seen first
fn first_mode(values: impl IntoIterator<Item = String>) -> Option<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for value in values {
        match position.get(&value) {
            Some(&i) => order[i].1 += 1,
            None => {
                position.insert(value.clone(), order.len());
                order.push((value, 1));
            }
        }
    }
    order
        .into_iter()
        .fold(None, |best: Option<(String, usize)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
}

fn mean_of(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Summarize the samples with conductivity at or above the configured quantile.
///
/// Too few rows, or an empty subset, yield
/// [`PipelineError::DegenerateSubset`] instead of statistics over nothing.
pub fn recommend(clean: &CleanTable, config: &RecommendationConfig) -> Result<Recommendation> {
    let total = clean.target.len();
    let threshold = quantile(&clean.target, config.quantile).unwrap_or(f64::NAN);

    if total < config.min_samples {
        return Err(PipelineError::DegenerateSubset {
            reason: format!("dataset smaller than {} samples", config.min_samples),
            rows: total,
            threshold,
        });
    }

    let subset: Vec<usize> = clean
        .target
        .iter()
        .enumerate()
        .filter(|(_, k)| **k >= threshold)
        .map(|(i, _)| i)
        .collect();

    if subset.is_empty() {
        return Err(PipelineError::DegenerateSubset {
            reason: "no sample reaches the quantile threshold".to_string(),
            rows: total,
            threshold,
        });
    }

    debug!(
        "Top {:.0}% cutoff {:.4}: {} of {} samples",
        (1.0 - config.quantile) * 100.0,
        threshold,
        subset.len(),
        total
    );

    let table = &clean.table;
    let has_column = |name: &str| table.get_column_index(name).is_some();
    let mut absent_fields = Vec::new();

    let mut modes = Vec::new();
    for field in &config.categorical_fields {
        if !has_column(field) {
            absent_fields.push(field.clone());
            continue;
        }
        let values = string_values(table, field)?;
        if let Some((value, count)) = first_mode(subset.iter().filter_map(|&i| values[i].clone())) {
            modes.push(ConditionMode {
                field: field.clone(),
                value,
                count,
            });
        }
    }

    let mut subset_mean = |field: &str| -> Result<Option<f64>> {
        if !has_column(field) {
            absent_fields.push(field.to_string());
            return Ok(None);
        }
        let values = numeric_values(table, field)?;
        Ok(mean_of(subset.iter().filter_map(|&i| values[i])))
    };
    let temperature = subset_mean(&config.temperature_field)?.map(|v| round_to(v, 1));
    let concentration = subset_mean(&config.concentration_field)?.map(|v| round_to(v, 2));

    let mut solvent_means = Vec::new();
    for solvent in config.solvent_columns.iter().filter(|s| has_column(s)) {
        let values = numeric_values(table, solvent)?;
        if let Some(mean) = mean_of(subset.iter().filter_map(|&i| values[i])) {
            solvent_means.push((solvent.clone(), mean));
        }
    }
    let top_solvents = Ranking::from_scores(solvent_means).top(config.top_solvents);

    for field in &absent_fields {
        warn!("Recommendation field '{}' not in the table", field);
    }

    Ok(Recommendation {
        quantile: config.quantile,
        threshold,
        subset_size: subset.len(),
        total_size: total,
        modes,
        temperature,
        concentration,
        top_solvents,
        absent_fields,
    })
}
