//! Per-column standardization

use serde::Serialize;

use crate::pipeline::FeatureMatrix;

/// Population mean and standard deviation per column.
/// Zero-variance columns keep a scale of 1 and are only centered.
#[derive(Debug, Clone, Serialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &FeatureMatrix) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());

        for j in 0..x.ncols() {
            let column = x.column(j);
            let mean = column.iter().sum::<f64>() / n;
            let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let std = var.sqrt();
            means.push(mean);
            scales.push(if std > f64::EPSILON { std } else { 1.0 });
        }

        Self { means, scales }
    }

    pub fn transform(&self, x: &FeatureMatrix) -> FeatureMatrix {
        x.map_values(|j, v| (v - self.means[j]) / self.scales[j])
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}
