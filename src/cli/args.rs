//! Command-line argument definitions using clap

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineConfig;

/// elyte - Predict electrolyte conductivity, rank features and recommend formulations
#[derive(Parser, Debug)]
#[command(name = "elyte")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input dataset (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Conductivity column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// JSON report path.
    /// Defaults to the input directory with a '_conductivity_report.json' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON configuration file; command-line flags take precedence over it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for the train/test split and all model randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out for evaluation
    #[arg(long, value_parser = validate_test_size)]
    pub test_size: Option<f64>,

    /// Features taken from each ranking when building the selected set
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Conductivity quantile defining the recommendation subset
    #[arg(long, value_parser = validate_quantile)]
    pub quantile: Option<f64>,

    /// Identifier columns to drop before modeling (comma-separated).
    /// Replaces the configured drop list.
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Overwrite an existing report without asking
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Log pipeline internals to stderr
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run only the top-quantile recommendation on a dataset
    Recommend {
        /// Input dataset (CSV or Parquet)
        input: PathBuf,

        /// Conductivity column name
        #[arg(short, long)]
        target: Option<String>,

        /// Conductivity quantile defining the subset
        #[arg(long, value_parser = validate_quantile)]
        quantile: Option<f64>,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of rows to use for schema inference (CSV only)
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Print the default configuration as JSON
    Config {
        /// Write to this file instead of stdout
        output: Option<PathBuf>,
    },
}

/// Values from the command line that replace configured ones
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub target: Option<String>,
    pub seed: Option<u64>,
    pub test_size: Option<f64>,
    pub top_k: Option<usize>,
    pub quantile: Option<f64>,
    pub drop_columns: Vec<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(target) = &self.target {
            config.data.target = target.clone();
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
        }
        if let Some(test_size) = self.test_size {
            config.split.test_fraction = test_size;
        }
        if let Some(top_k) = self.top_k {
            config.selection.top_k = top_k;
        }
        if let Some(quantile) = self.quantile {
            config.recommendation.quantile = quantile;
        }
        if !self.drop_columns.is_empty() {
            config.data.drop_columns = self.drop_columns.clone();
        }
    }
}

/// Load the configuration file (or defaults) and apply command-line overrides
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target: self.target.clone(),
            seed: self.seed,
            test_size: self.test_size,
            top_k: self.top_k,
            quantile: self.quantile,
            drop_columns: self.drop_columns.clone(),
        }
    }

    /// Get the report path, deriving from input if not explicitly provided.
    /// The derived path sits next to the input with a '_conductivity_report.json' suffix.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let parent = input.parent().unwrap_or_else(|| Path::new("."));
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_conductivity_report.json", stem))
        }))
    }
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("test_size must be between 0 and 1 (exclusive), got {}", value))
    }
}

/// Validator for quantile parameter
fn validate_quantile(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("quantile must be between 0.0 and 1.0, got {}", value))
    }
}
