//! Input validation errors for aggregate metric computations.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("series is empty")]
    EmptySeries,

    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("length mismatch: {left} predictions vs {right} actuals")]
    LengthMismatch { left: usize, right: usize },

    #[error("{name} must be in (0, 1), got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("periods_per_year must be positive, got {0}")]
    InvalidPeriodsPerYear(f64),
}

/// Reject empty series and series containing NaN or infinities.
pub fn validate_series(values: &[f64]) -> Result<(), MetricsError> {
    if values.is_empty() {
        return Err(MetricsError::EmptySeries);
    }
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(MetricsError::NonFinite { index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_rejected() {
        assert_eq!(validate_series(&[]), Err(MetricsError::EmptySeries));
    }

    #[test]
    fn nan_is_located() {
        match validate_series(&[0.1, f64::NAN, 0.2]) {
            Err(MetricsError::NonFinite { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected NonFinite, got {other:?}"),
        }
    }

    #[test]
    fn finite_series_passes() {
        assert!(validate_series(&[0.0, -0.5, 1.0]).is_ok());
    }
}
