//! Pipeline configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file. Command-line flags override values loaded here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Complete configuration for one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub selection: SelectionConfig,
    pub models: ModelsConfig,
    pub recommendation: RecommendationConfig,
}

/// Input schema: target column and identifier columns to discard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Conductivity column
    pub target: String,
    /// Identifier/metadata columns removed before modeling (absence tolerated)
    pub drop_columns: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            target: "k".to_string(),
            drop_columns: vec![
                "Unnamed: 0".to_string(),
                "doi".to_string(),
                "c units".to_string(),
            ],
        }
    }
}

/// Train/test partition settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Feature selection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Features taken from each ranking before the union
    pub top_k: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Hyperparameters for the three backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    pub forest: ForestConfig,
    pub svr: SvrConfig,
    pub boosting: BoostingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features tried at each split (1.0 = all)
    pub max_features: f64,
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1.0,
            bootstrap: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SvrConfig {
    pub c: f64,
    pub epsilon: f64,
    /// RBF width; `None` means 1 / (n_features * var(X))
    pub gamma: Option<f64>,
    pub tol: f64,
    pub max_iter: usize,
    /// Training rows above this count are subsampled before building the kernel
    pub max_samples: usize,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            c: 10.0,
            epsilon: 0.1,
            gamma: None,
            tol: 1e-4,
            max_iter: 200,
            max_samples: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
        }
    }
}

/// Condition fields summarized for the high-conductivity subset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationConfig {
    pub quantile: f64,
    pub categorical_fields: Vec<String>,
    pub temperature_field: String,
    pub concentration_field: String,
    pub solvent_columns: Vec<String>,
    pub top_solvents: usize,
    /// Smaller datasets are reported as having no recommendation
    pub min_samples: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            quantile: 0.90,
            categorical_fields: vec!["salt".to_string(), "solvent ratio type".to_string()],
            temperature_field: "T".to_string(),
            concentration_field: "c".to_string(),
            solvent_columns: ["EC", "DMC", "EMC", "PC", "DEC", "EA", "DME", "2-Glyme", "AN", "THF"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            top_solvents: 5,
            min_samples: 10,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.split.test_fraction > 0.0 && self.split.test_fraction < 1.0) {
            anyhow::bail!(
                "split.test_fraction must be in (0, 1), got {}",
                self.split.test_fraction
            );
        }
        if !(0.0..=1.0).contains(&self.recommendation.quantile) {
            anyhow::bail!(
                "recommendation.quantile must be in [0, 1], got {}",
                self.recommendation.quantile
            );
        }
        if self.selection.top_k == 0 {
            anyhow::bail!("selection.top_k must be at least 1");
        }
        if !(self.models.forest.max_features > 0.0 && self.models.forest.max_features <= 1.0) {
            anyhow::bail!(
                "models.forest.max_features must be in (0, 1], got {}",
                self.models.forest.max_features
            );
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.data.target, "k");
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.selection.top_k, 5);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"models": {"svr": {"c": 3.0}}}"#).unwrap();
        assert_eq!(config.models.svr.c, 3.0);
        assert_eq!(config.models.svr.epsilon, 0.1);
        assert_eq!(config.models.boosting.n_estimators, 100);
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut config = PipelineConfig::default();
        config.split.test_fraction = 1.5;
        assert!(config.validate().is_err());
    }
}
