//! Baseline return predictors and prediction-driven strategy returns.
//!
//! Predictors see only the history strictly before the period they forecast,
//! so `predictions[t]` is a genuine out-of-sample call on `returns[t]`.

use serde::{Deserialize, Serialize};

use crate::stats::mean;

/// A one-step-ahead return forecaster.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Forecast the next period's return from `history` (oldest first).
    fn predict(&self, history: &[f64]) -> f64;
}

/// Forecasts the trailing mean return: trends persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumPredictor {
    pub lookback: usize,
}

impl Predictor for MomentumPredictor {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn predict(&self, history: &[f64]) -> f64 {
        if self.lookback == 0 || history.len() < self.lookback {
            return 0.0;
        }
        mean(&history[history.len() - self.lookback..])
    }
}

/// Forecasts the negated trailing mean: moves revert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanReversionPredictor {
    pub lookback: usize,
}

impl Predictor for MeanReversionPredictor {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn predict(&self, history: &[f64]) -> f64 {
        if self.lookback == 0 || history.len() < self.lookback {
            return 0.0;
        }
        -mean(&history[history.len() - self.lookback..])
    }
}

/// Never takes a view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZeroPredictor;

impl Predictor for ZeroPredictor {
    fn name(&self) -> &'static str {
        "zero"
    }

    fn predict(&self, _history: &[f64]) -> f64 {
        0.0
    }
}

/// Serializable predictor selector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredictorKind {
    /// Analyze the input returns as-is (or use predictions from the data).
    #[default]
    None,
    Momentum {
        lookback: usize,
    },
    MeanReversion {
        lookback: usize,
    },
}

impl PredictorKind {
    pub fn build(&self) -> Option<Box<dyn Predictor>> {
        match *self {
            PredictorKind::None => None,
            PredictorKind::Momentum { lookback } => Some(Box::new(MomentumPredictor { lookback })),
            PredictorKind::MeanReversion { lookback } => {
                Some(Box::new(MeanReversionPredictor { lookback }))
            }
        }
    }
}

/// Walk `returns` forward, forecasting each period from everything before it.
pub fn generate_predictions(predictor: &dyn Predictor, returns: &[f64]) -> Vec<f64> {
    (0..returns.len())
        .map(|t| predictor.predict(&returns[..t]))
        .collect()
}

/// Long/short/flat position per period from the prediction sign.
pub fn position_from_prediction(prediction: f64) -> f64 {
    if prediction > 0.0 {
        1.0
    } else if prediction < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Returns earned by trading the sign of each prediction.
///
/// Only the common prefix of the two slices is used.
pub fn strategy_returns(returns: &[f64], predictions: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .zip(predictions)
        .map(|(r, p)| position_from_prediction(*p) * r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_needs_full_lookback() {
        let p = MomentumPredictor { lookback: 3 };
        assert_eq!(p.predict(&[0.01, 0.02]), 0.0);
        assert!((p.predict(&[0.5, 0.01, 0.02, 0.03]) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn mean_reversion_is_negated_momentum() {
        let h = [0.01, -0.03, 0.05];
        let m = MomentumPredictor { lookback: 2 };
        let r = MeanReversionPredictor { lookback: 2 };
        assert_eq!(m.predict(&h), -r.predict(&h));
    }

    #[test]
    fn predictions_do_not_peek() {
        // A spike at t=5 must not influence the prediction for t=5.
        let mut returns = vec![0.0; 10];
        returns[5] = 1.0;
        let preds = generate_predictions(&MomentumPredictor { lookback: 1 }, &returns);
        assert_eq!(preds[5], 0.0);
        assert_eq!(preds[6], 1.0);
    }

    #[test]
    fn strategy_returns_follow_sign() {
        let r = [0.01, 0.02, -0.03];
        let p = [1.0, -0.5, 0.0];
        assert_eq!(strategy_returns(&r, &p), vec![0.01, -0.02, 0.0]);
    }

    #[test]
    fn kind_builds_predictors() {
        assert!(PredictorKind::None.build().is_none());
        let built = PredictorKind::Momentum { lookback: 5 }.build().unwrap();
        assert_eq!(built.name(), "momentum");
        let built = PredictorKind::MeanReversion { lookback: 5 }.build().unwrap();
        assert_eq!(built.name(), "mean_reversion");
        assert_eq!(ZeroPredictor.predict(&[1.0]), 0.0);
    }

    #[test]
    fn kind_deserializes_from_tagged_form() {
        let k: PredictorKind =
            serde_json::from_str(r#"{"type":"momentum","lookback":20}"#).unwrap();
        assert_eq!(k, PredictorKind::Momentum { lookback: 20 });
    }
}
