//! Predictive-quality metrics comparing model forecasts with realized returns.

use serde::{Deserialize, Serialize};

use crate::error::{validate_series, MetricsError};
use crate::stats::{correlation, mean, EPSILON};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveMetrics {
    pub directional_accuracy: f64,
    /// Sign accuracy among non-flat predictions only.
    pub hit_rate: f64,
    pub mae: f64,
    pub rmse: f64,
    pub r_squared: f64,
    /// Pearson correlation between predictions and actuals.
    pub information_coefficient: f64,
    pub observations: usize,
}

impl PredictiveMetrics {
    pub fn compute(predictions: &[f64], actuals: &[f64]) -> Result<Self, MetricsError> {
        check_lengths(predictions, actuals)?;
        validate_series(predictions)?;
        validate_series(actuals)?;
        Ok(Self {
            directional_accuracy: directional_accuracy(predictions, actuals),
            hit_rate: hit_rate(predictions, actuals),
            mae: mae(predictions, actuals),
            rmse: rmse(predictions, actuals),
            r_squared: r_squared(predictions, actuals),
            information_coefficient: correlation(predictions, actuals),
            observations: predictions.len(),
        })
    }
}

fn check_lengths(predictions: &[f64], actuals: &[f64]) -> Result<(), MetricsError> {
    if predictions.len() != actuals.len() {
        return Err(MetricsError::LengthMismatch {
            left: predictions.len(),
            right: actuals.len(),
        });
    }
    Ok(())
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Fraction of periods where `sign(prediction) == sign(actual)`.
pub fn directional_accuracy(predictions: &[f64], actuals: &[f64]) -> f64 {
    let n = predictions.len().min(actuals.len());
    if n == 0 {
        return 0.0;
    }
    let matches = predictions
        .iter()
        .zip(actuals)
        .filter(|(p, a)| sign(**p) == sign(**a))
        .count();
    matches as f64 / n as f64
}

/// Fraction of correct calls among periods where the model took a view.
pub fn hit_rate(predictions: &[f64], actuals: &[f64]) -> f64 {
    let calls: Vec<(f64, f64)> = predictions
        .iter()
        .zip(actuals)
        .filter(|(p, _)| **p != 0.0)
        .map(|(p, a)| (*p, *a))
        .collect();
    if calls.is_empty() {
        return 0.0;
    }
    let correct = calls.iter().filter(|(p, a)| sign(*p) == sign(*a)).count();
    correct as f64 / calls.len() as f64
}

pub fn mae(predictions: &[f64], actuals: &[f64]) -> f64 {
    let errors: Vec<f64> = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).abs())
        .collect();
    mean(&errors)
}

pub fn rmse(predictions: &[f64], actuals: &[f64]) -> f64 {
    let sq: Vec<f64> = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).powi(2))
        .collect();
    mean(&sq).sqrt()
}

/// Coefficient of determination `1 − SS_res / SS_tot`.
///
/// Returns 0.0 when actuals are constant.
pub fn r_squared(predictions: &[f64], actuals: &[f64]) -> f64 {
    let n = predictions.len().min(actuals.len());
    if n == 0 {
        return 0.0;
    }
    let actuals = &actuals[..n];
    let m = mean(actuals);
    let ss_tot: f64 = actuals.iter().map(|a| (a - m).powi(2)).sum();
    if ss_tot < EPSILON {
        return 0.0;
    }
    let ss_res: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (a - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let a = [0.01, -0.02, 0.03, -0.01];
        let m = PredictiveMetrics::compute(&a, &a).unwrap();
        assert_eq!(m.directional_accuracy, 1.0);
        assert_eq!(m.hit_rate, 1.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert!((m.r_squared - 1.0).abs() < 1e-12);
        assert!((m.information_coefficient - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_predictions() {
        let a = [0.01, -0.02, 0.03, -0.01];
        let p: Vec<f64> = a.iter().map(|x| -x).collect();
        assert_eq!(directional_accuracy(&p, &a), 0.0);
        assert!(r_squared(&p, &a) < 0.0);
    }

    #[test]
    fn flat_predictions_skip_hit_rate() {
        let p = [0.0, 0.5, 0.0, -0.5];
        let a = [0.01, 0.02, -0.01, 0.02];
        assert!((hit_rate(&p, &a) - 0.5).abs() < 1e-12);
        // zeros only match zero actuals
        assert!((directional_accuracy(&p, &a) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_error() {
        let err = PredictiveMetrics::compute(&[0.1, 0.2], &[0.1]).unwrap_err();
        assert_eq!(err, MetricsError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn non_finite_is_error() {
        assert!(PredictiveMetrics::compute(&[f64::NAN], &[0.1]).is_err());
    }

    #[test]
    fn error_magnitudes() {
        let p = [0.0, 0.0];
        let a = [0.03, -0.04];
        assert!((mae(&p, &a) - 0.035).abs() < 1e-12);
        assert!((rmse(&p, &a) - (0.00125_f64).sqrt()).abs() < 1e-12);
    }
}
