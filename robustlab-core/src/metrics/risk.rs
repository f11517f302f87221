//! Risk metrics — volatility, drawdown and tail statistics.
//!
//! VaR and CVaR are expressed as returns (negative numbers for losses), so a
//! VaR of -0.021 at 95% means one period in twenty loses at least 2.1%.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::MetricsConfig;
use crate::domain::cumulative_returns;
use crate::stats::{self, mean, percentile, std_dev};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub max_drawdown: f64,
    /// Longest run of periods spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub var: f64,
    pub cvar: f64,
    pub parametric_var: f64,
    pub downside_deviation: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub var_confidence: f64,
}

impl RiskMetrics {
    pub fn compute(returns: &[f64], config: &MetricsConfig) -> Self {
        Self {
            volatility: volatility(returns, config.periods_per_year),
            max_drawdown: max_drawdown(returns),
            max_drawdown_duration: max_drawdown_duration(returns),
            var: value_at_risk(returns, config.var_confidence),
            cvar: conditional_value_at_risk(returns, config.var_confidence),
            parametric_var: parametric_var(returns, config.var_confidence),
            downside_deviation: downside_deviation(returns, 0.0),
            skewness: stats::skewness(returns),
            kurtosis: stats::excess_kurtosis(returns),
            var_confidence: config.var_confidence,
        }
    }
}

/// Annualized volatility: sample std × √periods_per_year.
pub fn volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    std_dev(returns) * periods_per_year.max(0.0).sqrt()
}

/// Drawdown at each period: `(cum(t) − running_max(t)) / running_max(t)`.
///
/// The running maximum is taken over the wealth index itself, so the first
/// period always has zero drawdown.
pub fn drawdown_series(returns: &[f64]) -> Vec<f64> {
    let wealth = cumulative_returns(returns);
    let mut peak = f64::NEG_INFINITY;
    wealth
        .iter()
        .map(|&w| {
            if w > peak {
                peak = w;
            }
            if peak > 0.0 {
                (w - peak) / peak
            } else {
                -1.0
            }
        })
        .collect()
}

/// Maximum drawdown as a non-positive fraction (e.g. -0.15 = 15% drawdown).
pub fn max_drawdown(returns: &[f64]) -> f64 {
    drawdown_series(returns)
        .into_iter()
        .fold(0.0_f64, f64::min)
}

/// Longest stretch of consecutive periods with a negative drawdown.
pub fn max_drawdown_duration(returns: &[f64]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for dd in drawdown_series(returns) {
        if dd < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Historical Value at Risk: the `(1 − confidence)·100`-th percentile of returns.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    percentile(returns, (1.0 - confidence.clamp(0.0, 1.0)) * 100.0)
}

/// Conditional VaR (expected shortfall): mean of returns at or below VaR.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let var = value_at_risk(returns, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
    if tail.is_empty() {
        return var;
    }
    mean(&tail)
}

/// Gaussian VaR: `μ + σ·Φ⁻¹(1 − confidence)`.
pub fn parametric_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.len() < 2 || !(0.0..1.0).contains(&confidence) || confidence == 0.0 {
        return 0.0;
    }
    let z = match Normal::new(0.0, 1.0) {
        Ok(n) => n.inverse_cdf(1.0 - confidence),
        Err(_) => return 0.0,
    };
    mean(returns) + std_dev(returns) * z
}

/// Downside deviation below a minimum acceptable return `mar`.
///
/// Uses the full observation count as denominator (Sortino convention).
pub fn downside_deviation(returns: &[f64], mar: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = returns
        .iter()
        .map(|r| (r - mar).min(0.0).powi(2))
        .sum();
    (sum_sq / returns.len() as f64).sqrt()
}
