//! JSON report of a complete pipeline run
//!
//! Collects every structured stage output (rankings, selection, model
//! comparison, parity data and the recommendation) with run metadata so
//! results can be plotted or compared outside this tool.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::models::BackendKind;
use crate::pipeline::{
    ComparisonTable, DataQualityWarning, PipelineConfig, PipelineError, Ranking, Recommendation,
};
use crate::report::StageTimings;

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub elyte_version: String,
    pub input_file: String,
    pub output_file: String,
    pub rows: usize,
    pub features: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub settings: PipelineConfig,
}

/// Attribution ranking of one tree backend
#[derive(Debug, Clone, Serialize)]
pub struct AttributionEntry {
    pub backend: BackendKind,
    pub ranking: Ranking,
    /// Normalized split gain, for comparison with the attribution scores
    pub split_importance: Ranking,
}

/// Recommendation, or why there is none
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Available(Recommendation),
    Unavailable { reason: String },
}

impl RecommendationOutcome {
    /// Degenerate subsets become `Unavailable`; any other error is returned
    pub fn from_result(result: crate::pipeline::Result<Recommendation>) -> Result<Self> {
        match result {
            Ok(rec) => Ok(Self::Available(rec)),
            Err(err @ PipelineError::DegenerateSubset { .. }) => Ok(Self::Unavailable {
                reason: err.to_string(),
            }),
            Err(err) => Err(err).context("Recommendation stage failed"),
        }
    }
}

/// Timing information in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingInfo {
    pub load_ms: u64,
    pub preprocess_ms: u64,
    pub correlation_ms: u64,
    pub importance_ms: u64,
    pub evaluation_ms: u64,
    pub recommendation_ms: u64,
    pub total_ms: u64,
}

impl From<&StageTimings> for TimingInfo {
    fn from(t: &StageTimings) -> Self {
        Self {
            load_ms: t.load.as_millis() as u64,
            preprocess_ms: t.preprocess.as_millis() as u64,
            correlation_ms: t.correlation.as_millis() as u64,
            importance_ms: t.importance.as_millis() as u64,
            evaluation_ms: t.evaluation.as_millis() as u64,
            recommendation_ms: t.recommendation.as_millis() as u64,
            total_ms: t.total().as_millis() as u64,
        }
    }
}

/// Complete run report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub warnings: Vec<DataQualityWarning>,
    pub correlation: Ranking,
    pub attribution: Vec<AttributionEntry>,
    pub selected_features: Vec<String>,
    pub comparison: ComparisonTable,
    pub recommendation: RecommendationOutcome,
    pub timing: TimingInfo,
}

/// Inputs needed to build the metadata block
pub struct ReportContext<'a> {
    pub input_file: &'a Path,
    pub output_file: &'a Path,
    pub rows: usize,
    pub features: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub settings: &'a PipelineConfig,
}

impl ReportMetadata {
    pub fn new(ctx: &ReportContext<'_>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            elyte_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: ctx.input_file.display().to_string(),
            output_file: ctx.output_file.display().to_string(),
            rows: ctx.rows,
            features: ctx.features,
            train_rows: ctx.train_rows,
            test_rows: ctx.test_rows,
            settings: ctx.settings.clone(),
        }
    }
}

/// Export the run report to a JSON file
pub fn export_run_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
