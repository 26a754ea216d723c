//! Pipeline module - data preparation, ranking, selection, evaluation and recommendation

pub mod config;
pub mod correlation;
pub mod error;
pub mod evaluation;
pub mod importance;
pub mod loader;
pub mod matrix;
pub mod metrics;
pub mod preprocess;
pub mod ranking;
pub mod recommend;
pub mod selection;
pub mod split;

pub use config::PipelineConfig;
pub use correlation::*;
pub use error::{DataQualityWarning, PipelineError, Result};
pub use evaluation::*;
pub use importance::extract_importance;
pub use loader::*;
pub use matrix::FeatureMatrix;
pub use metrics::*;
pub use preprocess::*;
pub use ranking::{RankedFeature, Ranking};
pub use recommend::{quantile, recommend, ConditionMode, Recommendation};
pub use selection::select_features;
pub use split::TrainTestSplit;
