//! Risk-adjusted return (efficiency) metrics.

use serde::{Deserialize, Serialize};

use super::returns::cagr;
use super::risk::{downside_deviation, max_drawdown};
use super::MetricsConfig;
use crate::stats::{mean, std_dev, EPSILON};

/// Profit factor cap for series without any losing period.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub profit_factor: f64,
    pub hit_rate: f64,
    pub gain_to_pain: f64,
}

impl EfficiencyMetrics {
    pub fn compute(returns: &[f64], config: &MetricsConfig) -> Self {
        let ppy = config.periods_per_year;
        Self {
            sharpe: sharpe_ratio(returns, config.risk_free_rate, ppy),
            sortino: sortino_ratio(returns, config.risk_free_rate, ppy),
            calmar: calmar_ratio(returns, ppy),
            profit_factor: profit_factor(returns),
            hit_rate: hit_rate(returns),
            gain_to_pain: gain_to_pain(returns),
        }
    }
}

/// Annualized Sharpe ratio: `(annualized_mean − risk_free) / annualized_std`.
///
/// Returns 0.0 for fewer than 2 periods or zero volatility.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < EPSILON {
        return 0.0;
    }
    let annual_mean = mean(returns) * periods_per_year;
    let annual_std = std * periods_per_year.sqrt();
    (annual_mean - risk_free_rate) / annual_std
}

/// Annualized Sortino ratio, using downside deviation below the per-period
/// risk-free rate. Returns 0.0 when no period falls below it.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let period_rf = risk_free_rate / periods_per_year;
    let dd = downside_deviation(returns, period_rf);
    if dd < EPSILON {
        return 0.0;
    }
    let annual_mean = mean(returns) * periods_per_year;
    (annual_mean - risk_free_rate) / (dd * periods_per_year.sqrt())
}

/// Calmar ratio: CAGR / |max drawdown|. Returns 0.0 without a drawdown.
pub fn calmar_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let dd = max_drawdown(returns);
    if dd >= 0.0 {
        return 0.0;
    }
    cagr(returns, periods_per_year) / dd.abs()
}

/// Information ratio of `returns` against `benchmark` (annualized).
///
/// Only the common prefix is compared. Returns 0.0 for zero tracking error.
pub fn information_ratio(returns: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
    let active: Vec<f64> = returns
        .iter()
        .zip(benchmark)
        .map(|(r, b)| r - b)
        .collect();
    if active.len() < 2 {
        return 0.0;
    }
    let te = std_dev(&active);
    if te < EPSILON {
        return 0.0;
    }
    mean(&active) / te * periods_per_year.max(0.0).sqrt()
}

/// Sum of gains over the absolute sum of losses, capped at [`PROFIT_FACTOR_CAP`].
pub fn profit_factor(returns: &[f64]) -> f64 {
    let gains: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
    let losses: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    if losses < 1e-12 {
        return if gains > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gains / losses).min(PROFIT_FACTOR_CAP)
}

/// Fraction of periods with a strictly positive return.
pub fn hit_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().filter(|&&r| r > 0.0).count() as f64 / returns.len() as f64
}

/// Net sum of returns over the absolute sum of losses.
pub fn gain_to_pain(returns: &[f64]) -> f64 {
    let losses: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    if losses < 1e-12 {
        return 0.0;
    }
    returns.iter().sum::<f64>() / losses
}
