//! Dense numeric feature matrix with named columns

use faer::Mat;

use super::error::{PipelineError, Result};

/// Immutable model input: one row per sample, one named column per feature.
///
/// Column order is part of the identity of a matrix: models remember the
/// names they were fitted on and refuse to predict on a different list.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    data: Mat<f64>,
}

impl FeatureMatrix {
    /// Build from row vectors. Every row must have one value per column.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = columns.len();
        if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
            return Err(PipelineError::InsufficientData(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                n_cols
            )));
        }
        let data = Mat::from_fn(rows.len(), n_cols, |i, j| rows[i][j]);
        Ok(Self { columns, data })
    }

    /// Build from column vectors of equal length
    pub fn from_columns(columns: Vec<String>, values: &[Vec<f64>]) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(PipelineError::InsufficientData(format!(
                "{} column names for {} columns",
                columns.len(),
                values.len()
            )));
        }
        let n_rows = values.first().map_or(0, |v| v.len());
        if values.iter().any(|v| v.len() != n_rows) {
            return Err(PipelineError::InsufficientData(
                "columns have different lengths".to_string(),
            ));
        }
        let data = Mat::from_fn(n_rows, columns.len(), |i, j| values[j][i]);
        Ok(Self { columns, data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols()).map(|j| self.data[(row, j)]).collect()
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.nrows()).map(|i| self.data[(i, col)]).collect()
    }

    /// New matrix with the given rows, in the given order (duplicates allowed)
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let data = Mat::from_fn(rows.len(), self.ncols(), |i, j| self.data[(rows[i], j)]);
        Self {
            columns: self.columns.clone(),
            data,
        }
    }

    /// New matrix with the named columns, in the given order
    pub fn select_columns(&self, names: &[String]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| PipelineError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;
        let data = Mat::from_fn(self.nrows(), indices.len(), |i, j| self.data[(i, indices[j])]);
        Ok(Self {
            columns: names.to_vec(),
            data,
        })
    }

    /// Apply a function to every value, keeping the column names
    pub fn map_values(&self, f: impl Fn(usize, f64) -> f64) -> Self {
        let data = Mat::from_fn(self.nrows(), self.ncols(), |i, j| f(j, self.data[(i, j)]));
        Self {
            columns: self.columns.clone(),
            data,
        }
    }

    /// Fail unless this matrix has exactly the expected column list
    pub fn ensure_columns(&self, expected: &[String]) -> Result<()> {
        if self.columns != expected {
            return Err(PipelineError::ColumnMismatch {
                expected: expected.to_vec(),
                actual: self.columns.clone(),
            });
        }
        Ok(())
    }
}
