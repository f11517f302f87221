//! Adaptability analysis: behaviour across volatility regimes and recovery
//! from drawdowns.

use serde::{Deserialize, Serialize};

use robustlab_core::metrics::efficiency::{hit_rate, sharpe_ratio};
use robustlab_core::metrics::returns::annualized_return;
use robustlab_core::metrics::risk::drawdown_series;
use robustlab_core::stats::{mean, percentile};
use robustlab_core::MetricsConfig;

use crate::stability::rolling_volatility;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptabilityConfig {
    /// Rolling window for realized volatility (default 21 = one month).
    pub vol_window: usize,
    /// Rolling-volatility quantile below which a bar is `Low` (default 0.33).
    pub low_quantile: f64,
    /// Rolling-volatility quantile above which a bar is `High` (default 0.67).
    pub high_quantile: f64,
    /// Bars after a regime change averaged into `post_transition_return`.
    pub adaptation_window: usize,
}

impl Default for AdaptabilityConfig {
    fn default() -> Self {
        Self {
            vol_window: 21,
            low_quantile: 0.33,
            high_quantile: 0.67,
            adaptation_window: 10,
        }
    }
}

// ─── Regimes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

impl VolatilityRegime {
    pub const ALL: [VolatilityRegime; 3] = [Self::Low, Self::Normal, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Label every bar with the volatility regime of the window ending at it.
///
/// The first `window − 1` bars take the first full window's regime. A series
/// shorter than `window` is `Normal` throughout.
pub fn classify_regimes(
    returns: &[f64],
    window: usize,
    low_quantile: f64,
    high_quantile: f64,
    periods_per_year: f64,
) -> Vec<VolatilityRegime> {
    let vols = rolling_volatility(returns, window, periods_per_year);
    if vols.is_empty() {
        return vec![VolatilityRegime::Normal; returns.len()];
    }

    let low = percentile(&vols, low_quantile.clamp(0.0, 1.0) * 100.0);
    let high = percentile(&vols, high_quantile.clamp(0.0, 1.0) * 100.0);
    let label = |v: f64| {
        if v < low {
            VolatilityRegime::Low
        } else if v > high {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        }
    };

    let labels: Vec<VolatilityRegime> = vols.iter().map(|v| label(*v)).collect();
    let mut regimes = vec![labels[0]; window - 1];
    regimes.extend(labels);
    regimes
}

/// Number of bar-to-bar regime changes.
pub fn count_transitions(regimes: &[VolatilityRegime]) -> usize {
    regimes.windows(2).filter(|w| w[0] != w[1]).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePerformance {
    pub regime: VolatilityRegime,
    pub periods: usize,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub hit_rate: f64,
}

/// Performance of the bars in each regime; regimes with no bars are omitted.
pub fn regime_performance(
    returns: &[f64],
    regimes: &[VolatilityRegime],
    config: &MetricsConfig,
) -> Vec<RegimePerformance> {
    VolatilityRegime::ALL
        .iter()
        .filter_map(|regime| {
            let subset: Vec<f64> = returns
                .iter()
                .zip(regimes)
                .filter(|(_, r)| *r == regime)
                .map(|(x, _)| *x)
                .collect();
            if subset.is_empty() {
                return None;
            }
            Some(RegimePerformance {
                regime: *regime,
                periods: subset.len(),
                annualized_return: annualized_return(&subset, config.periods_per_year),
                sharpe: sharpe_ratio(&subset, config.risk_free_rate, config.periods_per_year),
                hit_rate: hit_rate(&subset),
            })
        })
        .collect()
}

// ─── Drawdown recovery ───────────────────────────────────────────────

/// One peak-to-recovery episode. `end` is the first bar back at the prior peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownEpisode {
    pub start: usize,
    pub trough: usize,
    pub end: Option<usize>,
    /// Deepest drawdown in the episode (negative).
    pub depth: f64,
    /// Bars from trough to recovery; `None` while still underwater.
    pub recovery_periods: Option<usize>,
}

pub fn drawdown_episodes(returns: &[f64]) -> Vec<DrawdownEpisode> {
    let mut episodes = Vec::new();
    let mut current: Option<DrawdownEpisode> = None;

    for (i, dd) in drawdown_series(returns).into_iter().enumerate() {
        if dd < 0.0 {
            let ep = current.get_or_insert(DrawdownEpisode {
                start: i,
                trough: i,
                end: None,
                depth: dd,
                recovery_periods: None,
            });
            if dd < ep.depth {
                ep.depth = dd;
                ep.trough = i;
            }
        } else if let Some(mut ep) = current.take() {
            ep.end = Some(i);
            ep.recovery_periods = Some(i - ep.trough);
            episodes.push(ep);
        }
    }
    episodes.extend(current);
    episodes
}

// ─── Aggregate ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptabilityMetrics {
    pub regimes: Vec<RegimePerformance>,
    /// Fraction of observed regimes with a positive annualized return.
    pub positive_regime_fraction: f64,
    /// Best minus worst regime Sharpe.
    pub regime_sharpe_spread: f64,
    pub regime_transitions: usize,
    /// Mean return over the bars following each regime change.
    pub post_transition_return: Option<f64>,
    pub drawdown_episodes: Vec<DrawdownEpisode>,
    pub avg_recovery_periods: Option<f64>,
    pub max_recovery_periods: Option<usize>,
    pub unrecovered_drawdowns: usize,
}

impl AdaptabilityMetrics {
    pub fn compute(returns: &[f64], config: &AdaptabilityConfig, metrics: &MetricsConfig) -> Self {
        let labels = classify_regimes(
            returns,
            config.vol_window,
            config.low_quantile,
            config.high_quantile,
            metrics.periods_per_year,
        );
        let regimes = regime_performance(returns, &labels, metrics);

        let positive_regime_fraction = if regimes.is_empty() {
            0.0
        } else {
            regimes.iter().filter(|r| r.annualized_return > 0.0).count() as f64
                / regimes.len() as f64
        };
        let sharpes = regimes.iter().map(|r| r.sharpe);
        let regime_sharpe_spread = match (
            sharpes.clone().reduce(f64::max),
            sharpes.reduce(f64::min),
        ) {
            (Some(hi), Some(lo)) => hi - lo,
            _ => 0.0,
        };

        let post: Vec<f64> = labels
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .flat_map(|(i, _)| {
                let start = i + 1;
                let end = (start + config.adaptation_window).min(returns.len());
                returns[start..end].iter().copied()
            })
            .collect();
        let post_transition_return = if post.is_empty() { None } else { Some(mean(&post)) };

        let episodes = drawdown_episodes(returns);
        let recoveries: Vec<usize> = episodes.iter().filter_map(|e| e.recovery_periods).collect();
        let avg_recovery_periods = if recoveries.is_empty() {
            None
        } else {
            Some(recoveries.iter().sum::<usize>() as f64 / recoveries.len() as f64)
        };

        Self {
            regimes,
            positive_regime_fraction,
            regime_sharpe_spread,
            regime_transitions: count_transitions(&labels),
            post_transition_return,
            avg_recovery_periods,
            max_recovery_periods: recoveries.iter().copied().max(),
            unrecovered_drawdowns: episodes.iter().filter(|e| e.end.is_none()).count(),
            drawdown_episodes: episodes,
        }
    }

    /// Adaptability mapped onto [0, 1] for the aggregate robustness score.
    pub fn normalized_score(&self) -> f64 {
        let spread = 1.0 / (1.0 + self.regime_sharpe_spread.max(0.0));
        let recovered = if self.drawdown_episodes.is_empty() {
            1.0
        } else {
            1.0 - self.unrecovered_drawdowns as f64 / self.drawdown_episodes.len() as f64
        };
        mean(&[self.positive_regime_fraction, spread, recovered]).clamp(0.0, 1.0)
    }
}
