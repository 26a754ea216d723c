//! Regression error metrics

/// Coefficient of determination.
///
/// A constant ground truth has no variance to explain: a perfect
/// prediction scores 1 and anything else 0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean) * (a - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / n as f64
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(mean_squared_error(&y, &y), 0.0);
        assert_eq!(mean_absolute_error(&y, &y), 0.0);
    }

    #[test]
    fn test_known_values() {
        let actual = [3.0, -0.5, 2.0, 7.0];
        let predicted = [2.5, 0.0, 2.0, 8.0];
        assert!((mean_squared_error(&actual, &predicted) - 0.375).abs() < 1e-12);
        assert!((mean_absolute_error(&actual, &predicted) - 0.5).abs() < 1e-12);
        assert!((r2_score(&actual, &predicted) - 0.948_608_137_044_968).abs() < 1e-9);
    }

    #[test]
    fn test_mean_prediction_scores_zero() {
        let actual = [1.0, 2.0, 3.0];
        assert!(r2_score(&actual, &[2.0, 2.0, 2.0]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_truth() {
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 5.0]), 0.0);
    }
}
