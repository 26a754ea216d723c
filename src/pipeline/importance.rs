//! Attribution-based feature importance

use tracing::debug;

use super::error::{PipelineError, Result};
use super::matrix::FeatureMatrix;
use super::ranking::Ranking;
use crate::models::RegressionBackend;

/// Rank features by mean absolute attribution over the rows of `eval`.
///
/// Rejects backends without attribution support with
/// [`PipelineError::UnsupportedOperation`] before doing any work.
pub fn extract_importance(backend: &dyn RegressionBackend, eval: &FeatureMatrix) -> Result<Ranking> {
    let attribution = backend
        .attribution()
        .ok_or_else(|| PipelineError::UnsupportedOperation {
            backend: backend.name().to_string(),
            operation: "feature attribution".to_string(),
        })?;

    if eval.nrows() == 0 {
        return Err(PipelineError::InsufficientData(
            "attribution needs at least one evaluation row".to_string(),
        ));
    }

    let phi = attribution.attributions(eval)?;
    let n = phi.nrows() as f64;
    let scores: Vec<(String, f64)> = phi
        .column_names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let mean_abs = phi.column(j).iter().map(|v| v.abs()).sum::<f64>() / n;
            (name.clone(), mean_abs)
        })
        .collect();

    debug!(
        "{}: attribution over {} rows x {} features",
        backend.name(),
        phi.nrows(),
        phi.ncols()
    );

    Ok(Ranking::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{build_backend, BackendKind};
    use crate::pipeline::config::ModelsConfig;

    fn data() -> (FeatureMatrix, Vec<f64>) {
        let signal: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let noise: Vec<f64> = (0..30).map(|i| ((i * 11) % 3) as f64).collect();
        let y: Vec<f64> = signal.iter().map(|v| v * 0.2).collect();
        let x = FeatureMatrix::from_columns(vec!["signal".into(), "noise".into()], &[signal, noise])
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_svr_rejected_before_fitting() {
        let (x, _) = data();
        let backend = build_backend(BackendKind::SupportVector, &ModelsConfig::default(), 0);
        let err = extract_importance(backend.as_ref(), &x).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedOperation { ref backend, .. } if backend == "SVR"));
    }

    #[test]
    fn test_signal_ranks_first() {
        let (x, y) = data();
        let mut backend = build_backend(BackendKind::GradientBoosting, &ModelsConfig::default(), 0);
        backend.fit(&x, &y).unwrap();
        let ranking = extract_importance(backend.as_ref(), &x).unwrap();
        assert_eq!(ranking.names()[0], "signal");
    }
}
