//! Return metrics over a series of simple period returns.

use serde::{Deserialize, Serialize};

use super::MetricsConfig;
use crate::stats::mean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub cagr: f64,
    pub mean_return: f64,
    pub best_period: f64,
    pub worst_period: f64,
    pub periods: usize,
}

impl ReturnMetrics {
    pub fn compute(returns: &[f64], config: &MetricsConfig) -> Self {
        Self {
            total_return: total_return(returns),
            annualized_return: annualized_return(returns, config.periods_per_year),
            cagr: cagr(returns, config.periods_per_year),
            mean_return: mean(returns),
            best_period: returns.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_period: returns.iter().copied().reduce(f64::min).unwrap_or(0.0),
            periods: returns.len(),
        }
    }
}

/// Compounded total return: `Π(1 + rᵢ) − 1`.
pub fn total_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Arithmetic annualized return: `mean(r) · periods_per_year`.
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    mean(returns) * periods_per_year
}

/// Compound annual growth rate: `(1 + total)^(periods_per_year / n) − 1`.
///
/// Returns 0.0 for an empty series or when wealth is wiped out.
pub fn cagr(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() || periods_per_year <= 0.0 {
        return 0.0;
    }
    let wealth = 1.0 + total_return(returns);
    if wealth <= 0.0 {
        return 0.0;
    }
    let years = returns.len() as f64 / periods_per_year;
    wealth.powf(1.0 / years) - 1.0
}
