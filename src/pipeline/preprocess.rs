//! Raw table cleaning, target transform and feature encoding
//!
//! Order matters: identifier columns are dropped first, then rows without
//! a usable target, then the remaining columns are encoded into a
//! [`FeatureMatrix`] while the target moves to log scale.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use super::config::DataConfig;
use super::error::{DataQualityWarning, PipelineError, Result};
use super::loader::{is_categorical, numeric_values, string_values};
use super::matrix::FeatureMatrix;

/// The `log1p` / `expm1` pair applied to conductivity
pub struct TargetTransform;

impl TargetTransform {
    #[inline]
    pub fn forward(k: f64) -> f64 {
        k.ln_1p()
    }

    #[inline]
    pub fn inverse(log_k: f64) -> f64 {
        log_k.exp_m1()
    }

    pub fn forward_all(values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| Self::forward(v)).collect()
    }

    pub fn inverse_all(values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| Self::inverse(v)).collect()
    }
}

/// Table after identifier removal and target filtering, still unencoded
#[derive(Debug, Clone)]
pub struct CleanTable {
    pub table: DataFrame,
    pub target_column: String,
    /// Conductivity per kept row, natural units
    pub target: Vec<f64>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Drop identifier columns and rows whose target cannot be modeled.
///
/// Fails with [`PipelineError::Schema`] if the target column is absent or
/// holds no usable value.
pub fn clean_table(df: &DataFrame, config: &DataConfig) -> Result<CleanTable> {
    let mut warnings = Vec::new();
    let mut table = df.clone();

    for column in &config.drop_columns {
        if column == &config.target {
            continue;
        }
        if table.get_column_index(column).is_some() {
            table = table.drop(column)?;
        } else {
            warnings.push(DataQualityWarning::OptionalColumnAbsent {
                column: column.clone(),
            });
        }
    }

    if table.get_column_index(&config.target).is_none() {
        return Err(PipelineError::Schema(format!(
            "target column '{}' not found. Available columns: {:?}",
            config.target,
            table
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        )));
    }

    let raw_target = numeric_values(&table, &config.target).map_err(|_| {
        PipelineError::Schema(format!("target column '{}' is not numeric", config.target))
    })?;

    let mut missing = 0usize;
    let mut out_of_domain = 0usize;
    let keep: Vec<bool> = raw_target
        .iter()
        .map(|v| match v {
            None => {
                missing += 1;
                false
            }
            Some(k) if *k <= -1.0 || k.is_infinite() => {
                out_of_domain += 1;
                false
            }
            Some(_) => true,
        })
        .collect();

    if !keep.iter().any(|&k| k) {
        return Err(PipelineError::Schema(format!(
            "target column '{}' has no usable values",
            config.target
        )));
    }

    if missing > 0 {
        warnings.push(DataQualityWarning::DroppedRows {
            count: missing,
            reason: format!("missing target '{}'", config.target),
        });
    }
    if out_of_domain > 0 {
        warnings.push(DataQualityWarning::DroppedRows {
            count: out_of_domain,
            reason: format!("target '{}' outside the log1p domain", config.target),
        });
    }

    if missing + out_of_domain > 0 {
        let mask = BooleanChunked::from_slice(PlSmallStr::from_static("keep"), &keep);
        table = table.filter(&mask)?;
    }

    let target: Vec<f64> = raw_target
        .into_iter()
        .zip(keep.iter())
        .filter_map(|(v, &k)| if k { v } else { None })
        .collect();

    for w in &warnings {
        warn!("{}", w);
    }

    Ok(CleanTable {
        table,
        target_column: config.target.clone(),
        target,
        warnings,
    })
}

/// Numeric feature with the value used for missing cells
#[derive(Debug, Clone, Serialize)]
pub struct NumericColumn {
    pub name: String,
    pub fill: f64,
}

/// Categorical feature with its sorted category universe
#[derive(Debug, Clone, Serialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

impl CategoricalColumn {
    pub fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |value| format!("{}_{}", self.name, value))
    }
}

/// Declared mapping from table columns to model features.
///
/// Numeric columns keep table order and come first; one-hot indicators
/// follow, ordered by column name and then category value, so the same
/// encoder reproduces the same column list on any table.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureEncoder {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl FeatureEncoder {
    /// Learn fills and category universes from a cleaned table
    pub fn fit(table: &DataFrame, target: &str) -> Result<(Self, Vec<DataQualityWarning>)> {
        let mut warnings = Vec::new();
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for column in table.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }
            let dtype = column.dtype();

            if is_categorical(dtype) {
                let categories: BTreeSet<String> = string_values(table, &name)?
                    .into_iter()
                    .flatten()
                    .collect();
                categorical.push(CategoricalColumn {
                    name,
                    categories: categories.into_iter().collect(),
                });
            } else if dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean) {
                let values = numeric_values(table, &name)?;
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                if present.is_empty() {
                    warnings.push(DataQualityWarning::EmptyColumn { column: name });
                    continue;
                }
                let fill = present.iter().sum::<f64>() / present.len() as f64;
                let null_count = values.len() - present.len();
                if null_count > 0 {
                    warnings.push(DataQualityWarning::ImputedValues {
                        column: name.clone(),
                        count: null_count,
                        fill,
                    });
                }
                numeric.push(NumericColumn { name, fill });
            } else {
                debug!("Skipping column '{}' with unsupported dtype {:?}", name, dtype);
            }
        }

        categorical.sort_by(|a, b| a.name.cmp(&b.name));

        for w in &warnings {
            warn!("{}", w);
        }

        Ok((
            Self {
                numeric,
                categorical,
            },
            warnings,
        ))
    }

    /// Output column names, in matrix order
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|c| c.name.clone())
            .chain(self.categorical.iter().flat_map(|c| c.indicator_names()))
            .collect()
    }

    /// Encode a table. Unseen categories and null categories encode as all zeros.
    pub fn transform(&self, table: &DataFrame) -> Result<FeatureMatrix> {
        self.encode(table, true)
    }

    /// Encode a table leaving missing numeric cells as NaN, for statistics
    /// that skip incomplete pairs instead of seeing the fill value
    pub fn transform_unimputed(&self, table: &DataFrame) -> Result<FeatureMatrix> {
        self.encode(table, false)
    }

    fn encode(&self, table: &DataFrame, impute: bool) -> Result<FeatureMatrix> {
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.feature_names().len());

        for spec in &self.numeric {
            let missing = if impute { spec.fill } else { f64::NAN };
            let values = numeric_values(table, &spec.name)?;
            columns.push(values.into_iter().map(|v| v.unwrap_or(missing)).collect());
        }

        for spec in &self.categorical {
            let values = string_values(table, &spec.name)?;
            for category in &spec.categories {
                columns.push(
                    values
                        .iter()
                        .map(|v| match v {
                            Some(s) if s == category => 1.0,
                            _ => 0.0,
                        })
                        .collect(),
                );
            }
        }

        let matrix = FeatureMatrix::from_columns(self.feature_names(), &columns)?;
        if matrix.nrows() != table.height() && matrix.ncols() > 0 {
            return Err(PipelineError::InsufficientData(format!(
                "encoded {} rows from a table of {}",
                matrix.nrows(),
                table.height()
            )));
        }
        Ok(matrix)
    }
}

/// Model-ready data: features, log-scale target and the fitted encoding
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: FeatureMatrix,
    /// Same columns as `features` with missing numeric cells left as NaN
    pub unimputed_features: FeatureMatrix,
    /// `log1p(k)` per row, the modeling target
    pub log_target: Vec<f64>,
    /// `k` per row, natural units
    pub target: Vec<f64>,
    pub encoder: FeatureEncoder,
    /// Cleaned, unencoded table (input of the recommendation stage)
    pub clean: CleanTable,
    /// All data-quality warnings from cleaning and encoding
    pub warnings: Vec<DataQualityWarning>,
}

/// Run the whole preprocessing stage on a raw table
pub fn prepare_data(df: &DataFrame, config: &DataConfig) -> Result<PreparedData> {
    let clean = clean_table(df, config)?;
    let (encoder, encode_warnings) = FeatureEncoder::fit(&clean.table, &clean.target_column)?;

    if encoder.numeric.is_empty() && encoder.categorical.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no feature columns remain after cleaning".to_string(),
        ));
    }

    let features = encoder.transform(&clean.table)?;
    let unimputed_features = encoder.transform_unimputed(&clean.table)?;
    let log_target = TargetTransform::forward_all(&clean.target);

    debug!(
        "Prepared {} rows x {} features ({} numeric, {} categorical source columns)",
        features.nrows(),
        features.ncols(),
        encoder.numeric.len(),
        encoder.categorical.len()
    );

    let mut warnings = clean.warnings.clone();
    warnings.extend(encode_warnings);

    Ok(PreparedData {
        features,
        unimputed_features,
        log_target,
        target: clean.target.clone(),
        encoder,
        clean,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_transform_round_trip() {
        for &k in &[1e-6, 0.05, 1.0, 3.7, 12.5, 250.0] {
            let back = TargetTransform::inverse(TargetTransform::forward(k));
            assert!((back - k).abs() <= 1e-12 * k.max(1.0), "{} -> {}", k, back);
        }
    }

    #[test]
    fn test_indicator_names() {
        let col = CategoricalColumn {
            name: "salt".to_string(),
            categories: vec!["LiBF4".to_string(), "LiPF6".to_string()],
        };
        let names: Vec<String> = col.indicator_names().collect();
        assert_eq!(names, vec!["salt_LiBF4", "salt_LiPF6"]);
    }
}
