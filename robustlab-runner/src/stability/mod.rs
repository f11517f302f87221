//! Stability analysis: how consistent performance is across time.
//!
//! Rolling-window Sharpe distributions, a variance-penalized stability score,
//! and a split of the series into equal sub-periods.

mod distributions;
pub mod rolling;
mod scoring;

pub use distributions::MetricDistribution;
pub use rolling::{rolling_metric, rolling_return, rolling_sharpe, rolling_volatility};
pub use scoring::StabilityScore;

use serde::{Deserialize, Serialize};

use robustlab_core::domain::cumulative_returns;
use robustlab_core::metrics::efficiency::sharpe_ratio;
use robustlab_core::metrics::returns::total_return;
use robustlab_core::metrics::risk::max_drawdown;
use robustlab_core::stats::{linear_fit_r2, mean, population_std, EPSILON};
use robustlab_core::MetricsConfig;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Rolling window length in periods (default 63 = one quarter).
    pub window: usize,
    /// Number of equal sub-periods for the period split (default 4).
    pub n_periods: usize,
    /// IQR penalty in the stability score (default 0.5).
    pub penalty: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window: 63,
            n_periods: 4,
            penalty: 0.5,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Performance over one contiguous sub-period `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityMetrics {
    pub window: usize,
    pub rolling_sharpe: MetricDistribution,
    pub sharpe_score: StabilityScore,
    /// Coefficient of variation of rolling Sharpe; `None` when its mean is ~0.
    pub sharpe_cv: Option<f64>,
    /// Fraction of rolling windows with a positive total return.
    pub return_consistency: f64,
    pub periods: Vec<PeriodStats>,
    /// Fraction of sub-periods with a positive total return.
    pub period_consistency: f64,
    pub worst_period_sharpe: f64,
    /// R² of log wealth against time; 1.0 is a perfectly steady curve.
    pub equity_r2: f64,
}

impl StabilityMetrics {
    pub fn compute(returns: &[f64], config: &StabilityConfig, metrics: &MetricsConfig) -> Self {
        let sharpes = rolling_sharpe(returns, config.window, metrics);
        let window_returns = rolling_return(returns, config.window);

        let rolling = MetricDistribution::from_values("rolling_sharpe", &sharpes);
        let sharpe_score = StabilityScore::compute("rolling_sharpe", &sharpes, config.penalty);

        let sharpe_cv = if sharpes.len() < 2 || rolling.mean.abs() < EPSILON {
            None
        } else {
            Some(population_std(&sharpes) / rolling.mean.abs())
        };

        let return_consistency = fraction_positive(&window_returns);

        let periods = split_periods(returns, config.n_periods, metrics);
        let period_returns: Vec<f64> = periods.iter().map(|p| p.total_return).collect();
        let period_consistency = fraction_positive(&period_returns);
        let worst_period_sharpe = periods
            .iter()
            .map(|p| p.sharpe)
            .reduce(f64::min)
            .unwrap_or(0.0);

        Self {
            window: config.window,
            rolling_sharpe: rolling,
            sharpe_score,
            sharpe_cv,
            return_consistency,
            periods,
            period_consistency,
            worst_period_sharpe,
            equity_r2: equity_r2(returns),
        }
    }

    /// Stability mapped onto [0, 1] for the aggregate robustness score.
    pub fn normalized_score(&self) -> f64 {
        let score = (self.sharpe_score.score + 1.0) / 3.0;
        let parts = [
            score.clamp(0.0, 1.0),
            self.return_consistency,
            self.period_consistency,
            self.equity_r2,
        ];
        mean(&parts).clamp(0.0, 1.0)
    }
}

/// Split `returns` into `n` contiguous chunks; the last chunk absorbs the remainder.
pub fn split_periods(returns: &[f64], n: usize, metrics: &MetricsConfig) -> Vec<PeriodStats> {
    if n == 0 || returns.len() < n {
        return Vec::new();
    }
    let size = returns.len() / n;
    (0..n)
        .map(|index| {
            let start = index * size;
            let end = if index + 1 == n { returns.len() } else { start + size };
            let chunk = &returns[start..end];
            PeriodStats {
                index,
                start,
                end,
                total_return: total_return(chunk),
                sharpe: sharpe_ratio(chunk, metrics.risk_free_rate, metrics.periods_per_year),
                max_drawdown: max_drawdown(chunk),
            }
        })
        .collect()
}

fn fraction_positive(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| **v > 0.0).count() as f64 / values.len() as f64
}

fn equity_r2(returns: &[f64]) -> f64 {
    let wealth = cumulative_returns(returns);
    if wealth.iter().any(|w| *w <= 0.0) {
        return 0.0;
    }
    let log_wealth: Vec<f64> = wealth.iter().map(|w| w.ln()).collect();
    linear_fit_r2(&log_wealth)
}
