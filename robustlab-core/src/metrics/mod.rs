//! Performance metrics — pure functions over a series of period returns.
//!
//! Every scalar metric is total (degenerate input gives 0.0). The aggregate
//! [`PerformanceMetrics::compute`] validates its input first and is the entry
//! point used by the runner.

pub mod efficiency;
pub mod predictive;
pub mod returns;
pub mod risk;

use serde::{Deserialize, Serialize};

use crate::error::{validate_series, MetricsError};

pub use efficiency::EfficiencyMetrics;
pub use predictive::PredictiveMetrics;
pub use returns::ReturnMetrics;
pub use risk::RiskMetrics;

/// Annualization and tail settings shared by all metric groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub periods_per_year: f64,
    /// Annual risk-free rate used by Sharpe and Sortino.
    pub risk_free_rate: f64,
    /// Confidence level for VaR/CVaR, e.g. 0.95.
    pub var_confidence: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
            var_confidence: 0.95,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        if !(self.periods_per_year > 0.0) {
            return Err(MetricsError::InvalidPeriodsPerYear(self.periods_per_year));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(MetricsError::InvalidProbability {
                name: "var_confidence",
                value: self.var_confidence,
            });
        }
        Ok(())
    }
}

/// Return, risk and efficiency metrics for one return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub returns: ReturnMetrics,
    pub risk: RiskMetrics,
    pub efficiency: EfficiencyMetrics,
}

impl PerformanceMetrics {
    pub fn compute(returns: &[f64], config: &MetricsConfig) -> Result<Self, MetricsError> {
        config.validate()?;
        validate_series(returns)?;
        Ok(Self {
            returns: ReturnMetrics::compute(returns, config),
            risk: RiskMetrics::compute(returns, config),
            efficiency: EfficiencyMetrics::compute(returns, config),
        })
    }

    pub fn sharpe(&self) -> f64 {
        self.efficiency.sharpe
    }

    pub fn max_drawdown(&self) -> f64 {
        self.risk.max_drawdown
    }

    pub fn total_return(&self) -> f64 {
        self.returns.total_return
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_flat_series() {
        let m = PerformanceMetrics::compute(&[0.0; 100], &MetricsConfig::default()).unwrap();
        assert_eq!(m.total_return(), 0.0);
        assert_eq!(m.sharpe(), 0.0);
        assert_eq!(m.max_drawdown(), 0.0);
        assert_eq!(m.efficiency.hit_rate, 0.0);
    }

    #[test]
    fn compute_mixed_series_is_finite() {
        let r: Vec<f64> = (0..300)
            .map(|i| if i % 3 == 0 { -0.01 } else { 0.007 })
            .collect();
        let m = PerformanceMetrics::compute(&r, &MetricsConfig::default()).unwrap();
        assert!(m.total_return() > 0.0);
        assert!(m.sharpe() > 0.0);
        assert!(m.max_drawdown() < 0.0);
        assert!(m.risk.cvar <= m.risk.var);
        for v in [
            m.returns.cagr,
            m.risk.volatility,
            m.risk.parametric_var,
            m.efficiency.sortino,
            m.efficiency.calmar,
        ] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn compute_rejects_bad_input() {
        let cfg = MetricsConfig::default();
        assert_eq!(
            PerformanceMetrics::compute(&[], &cfg),
            Err(MetricsError::EmptySeries)
        );
        assert!(PerformanceMetrics::compute(&[0.1, f64::INFINITY], &cfg).is_err());
    }

    #[test]
    fn config_validation() {
        let bad = MetricsConfig {
            var_confidence: 1.5,
            ..MetricsConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = MetricsConfig {
            periods_per_year: 0.0,
            ..MetricsConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let r = [0.01, -0.02, 0.015, 0.0, 0.005];
        let m = PerformanceMetrics::compute(&r, &MetricsConfig::default()).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: PerformanceMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.returns.periods, 5);
        assert!((back.sharpe() - m.sharpe()).abs() < 1e-12);
        assert!((back.risk.var - m.risk.var).abs() < 1e-12);
    }
}
