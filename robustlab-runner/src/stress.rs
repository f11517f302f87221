//! Stress testing: deterministic shock scenarios and a Monte Carlo noise study.
//!
//! Scenarios perturb the market return series (and, for signal degradation,
//! the predictions) and re-evaluate the strategy. Shocks land at the middle of
//! the series so both pre- and post-shock behaviour is observed.

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use thiserror::Error;
use tracing::debug;

use robustlab_core::predictor::{generate_predictions, strategy_returns};
use robustlab_core::stats::mean;
use robustlab_core::{MetricsConfig, MetricsError, PerformanceMetrics, Predictor, RngHierarchy};

use crate::stability::{MetricDistribution, StabilityScore};

// ─── Scenarios ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StressScenario {
    /// Cumulative loss of `magnitude` spread evenly over `duration` bars.
    MarketCrash { magnitude: f64, duration: usize },
    /// Single-bar loss of `magnitude`.
    FlashCrash { magnitude: f64 },
    /// Deviations from the mean scaled by `multiplier` over the second half.
    VolatilitySpike { multiplier: f64 },
    /// Annual drift added to every bar of the second half.
    DriftShift { annual_drift: f64 },
    /// Gaussian noise with per-bar standard deviation `std_dev` on every bar.
    NoiseInjection { std_dev: f64 },
    /// Each bar is lost (flat) with probability `fraction`.
    DataGaps { fraction: f64 },
    /// Each prediction's sign is flipped with probability `flip_probability`.
    SignalDegradation { flip_probability: f64 },
}

impl StressScenario {
    pub fn name(&self) -> String {
        match self {
            Self::MarketCrash {
                magnitude,
                duration,
            } => format!("market_crash({:.0}% over {duration})", magnitude * 100.0),
            Self::FlashCrash { magnitude } => format!("flash_crash({:.0}%)", magnitude * 100.0),
            Self::VolatilitySpike { multiplier } => format!("volatility_spike(x{multiplier})"),
            Self::DriftShift { annual_drift } => {
                format!("drift_shift({:+.0}%/yr)", annual_drift * 100.0)
            }
            Self::NoiseInjection { std_dev } => format!("noise_injection(σ={std_dev})"),
            Self::DataGaps { fraction } => format!("data_gaps({:.0}%)", fraction * 100.0),
            Self::SignalDegradation { flip_probability } => {
                format!("signal_degradation({:.0}% flipped)", flip_probability * 100.0)
            }
        }
    }

    /// Whether the scenario has any effect on `signal`. Degrading a
    /// prediction signal is meaningless for a passive analysis.
    pub fn applies_to(&self, signal: SignalSource<'_>) -> bool {
        !matches!(
            (self, signal),
            (Self::SignalDegradation { .. }, SignalSource::Passive)
        )
    }

    /// Perturb market returns. Signal degradation leaves them untouched.
    pub fn perturb_returns(
        &self,
        returns: &[f64],
        periods_per_year: f64,
        normal: &Normal,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let mut out = returns.to_vec();
        let n = out.len();
        let mid = n / 2;
        match *self {
            Self::MarketCrash {
                magnitude,
                duration,
            } => {
                let duration = duration.max(1);
                let per_bar = (1.0 - magnitude.clamp(0.0, 0.99)).powf(1.0 / duration as f64) - 1.0;
                for r in out.iter_mut().skip(mid).take(duration) {
                    *r = per_bar;
                }
            }
            Self::FlashCrash { magnitude } => {
                if let Some(r) = out.get_mut(mid) {
                    *r = (1.0 + *r) * (1.0 - magnitude.clamp(0.0, 0.99)) - 1.0;
                }
            }
            Self::VolatilitySpike { multiplier } => {
                let m = mean(&returns[mid..]);
                for r in out.iter_mut().skip(mid) {
                    *r = (m + (*r - m) * multiplier).max(-0.99);
                }
            }
            Self::DriftShift { annual_drift } => {
                let shift = annual_drift / periods_per_year;
                for r in out.iter_mut().skip(mid) {
                    *r = (*r + shift).max(-0.99);
                }
            }
            Self::NoiseInjection { std_dev } => add_noise(&mut out, std_dev, normal, rng),
            Self::DataGaps { fraction } => {
                for r in out.iter_mut() {
                    if rng.gen::<f64>() < fraction {
                        *r = 0.0;
                    }
                }
            }
            Self::SignalDegradation { .. } => {}
        }
        out
    }

    /// Perturb predictions. Only signal degradation changes them.
    pub fn perturb_predictions(&self, predictions: &[f64], rng: &mut StdRng) -> Vec<f64> {
        match *self {
            Self::SignalDegradation { flip_probability } => predictions
                .iter()
                .map(|p| if rng.gen::<f64>() < flip_probability { -p } else { *p })
                .collect(),
            _ => predictions.to_vec(),
        }
    }

    /// Perturb returns, then predictions if any, drawing from one RNG stream.
    pub fn apply(
        &self,
        returns: &[f64],
        predictions: Option<&[f64]>,
        periods_per_year: f64,
        normal: &Normal,
        rng: &mut StdRng,
    ) -> (Vec<f64>, Option<Vec<f64>>) {
        let stressed = self.perturb_returns(returns, periods_per_year, normal, rng);
        let predictions = predictions.map(|p| self.perturb_predictions(p, rng));
        (stressed, predictions)
    }
}

fn add_noise(returns: &mut [f64], std_dev: f64, normal: &Normal, rng: &mut StdRng) {
    if std_dev <= 0.0 {
        return;
    }
    for r in returns.iter_mut() {
        *r = (*r + std_dev * normal.sample(rng)).max(-0.99);
    }
}

/// A broad default battery: crashes, volatility, drift, noise, gaps, signal decay.
pub fn default_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario::MarketCrash {
            magnitude: 0.30,
            duration: 10,
        },
        StressScenario::FlashCrash { magnitude: 0.10 },
        StressScenario::VolatilitySpike { multiplier: 3.0 },
        StressScenario::DriftShift { annual_drift: -0.20 },
        StressScenario::NoiseInjection { std_dev: 0.01 },
        StressScenario::DataGaps { fraction: 0.05 },
        StressScenario::SignalDegradation {
            flip_probability: 0.30,
        },
    ]
}

// ─── Signal ──────────────────────────────────────────────────────────

/// Where the trading signal comes from when a scenario is replayed.
#[derive(Clone, Copy)]
pub enum SignalSource<'a> {
    /// Hold the market: analyzed returns are the market returns.
    Passive,
    /// Predictions fixed in advance (e.g. supplied with the data).
    Fixed(&'a [f64]),
    /// Predictions regenerated from the perturbed returns.
    Model(&'a dyn Predictor),
}

impl SignalSource<'_> {
    fn predictions(&self, returns: &[f64]) -> Option<Vec<f64>> {
        match self {
            Self::Passive => None,
            Self::Fixed(p) => Some(p.to_vec()),
            Self::Model(m) => Some(generate_predictions(*m, returns)),
        }
    }
}

fn analyzed_returns(
    scenario: Option<&StressScenario>,
    market: &[f64],
    signal: SignalSource<'_>,
    periods_per_year: f64,
    normal: &Normal,
    rng: &mut StdRng,
) -> Vec<f64> {
    let (market, predictions) = match (scenario, signal) {
        (None, _) => (market.to_vec(), signal.predictions(market)),
        (Some(s), SignalSource::Model(model)) => {
            let stressed = s.perturb_returns(market, periods_per_year, normal, rng);
            let preds = generate_predictions(model, &stressed);
            let preds = s.perturb_predictions(&preds, rng);
            (stressed, Some(preds))
        }
        (Some(s), _) => {
            let fixed = signal.predictions(market);
            s.apply(market, fixed.as_deref(), periods_per_year, normal, rng)
        }
    };
    match predictions {
        None => market,
        Some(preds) => strategy_returns(&market, &preds),
    }
}

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of noise-injected trials (default 200, 0 disables Monte Carlo).
    pub trials: usize,
    /// Per-bar noise standard deviation (default 0.005).
    pub noise_std: f64,
    /// IQR penalty for the Sharpe stability score (default 0.5).
    pub penalty: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 200,
            noise_std: 0.005,
            penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// A scenario survives while its max drawdown stays above `-max_tolerated_drawdown`.
    pub max_tolerated_drawdown: f64,
    pub scenarios: Vec<StressScenario>,
    pub monte_carlo: MonteCarloConfig,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            max_tolerated_drawdown: 0.35,
            scenarios: default_scenarios(),
            monte_carlo: MonteCarloConfig::default(),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: StressScenario,
    pub name: String,
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub var: f64,
    /// Stressed minus baseline Sharpe.
    pub sharpe_change: f64,
    /// Stressed minus baseline max drawdown (negative = deeper).
    pub drawdown_change: f64,
    pub survived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub trials: usize,
    pub sharpe: MetricDistribution,
    pub max_drawdown: MetricDistribution,
    pub total_return: MetricDistribution,
    pub sharpe_stability: StabilityScore,
    /// Fraction of trials ending with a negative total return.
    pub probability_of_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressReport {
    pub baseline: PerformanceMetrics,
    pub scenarios: Vec<StressResult>,
    pub monte_carlo: Option<MonteCarloResult>,
    /// Fraction of evaluated scenarios survived.
    pub survival_rate: f64,
    /// Names of configured scenarios with no effect on the signal, left out
    /// of `scenarios` and `survival_rate`.
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl StressReport {
    /// Stress resilience mapped onto [0, 1] for the aggregate robustness score.
    pub fn normalized_score(&self) -> f64 {
        let mc = self
            .monte_carlo
            .as_ref()
            .map(|m| 1.0 - m.probability_of_loss)
            .unwrap_or(self.survival_rate);
        (0.5 * self.survival_rate + 0.5 * mc).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Error)]
pub enum StressError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("distribution error: {0}")]
    Distribution(String),
}

// ─── Orchestration ───────────────────────────────────────────────────

fn standard_normal() -> Result<Normal, StressError> {
    Normal::new(0.0, 1.0).map_err(|e| StressError::Distribution(e.to_string()))
}

/// Replay every configured scenario that applies to `signal` against
/// `market` returns.
pub fn run_scenarios(
    market: &[f64],
    signal: SignalSource<'_>,
    config: &StressConfig,
    metrics: &MetricsConfig,
    rng: &RngHierarchy,
) -> Result<(PerformanceMetrics, Vec<StressResult>), StressError> {
    let normal = standard_normal()?;
    let mut base_rng = rng.rng_for("stress_baseline", 0);
    let baseline_returns = analyzed_returns(
        None,
        market,
        signal,
        metrics.periods_per_year,
        &normal,
        &mut base_rng,
    );
    let baseline = PerformanceMetrics::compute(&baseline_returns, metrics)?;

    let mut results = Vec::with_capacity(config.scenarios.len());
    for (i, scenario) in config.scenarios.iter().enumerate() {
        if !scenario.applies_to(signal) {
            debug!(scenario = %scenario.name(), "stress scenario skipped for passive signal");
            continue;
        }
        let mut scenario_rng = rng.rng_for("stress_scenario", i as u64);
        let stressed = analyzed_returns(
            Some(scenario),
            market,
            signal,
            metrics.periods_per_year,
            &normal,
            &mut scenario_rng,
        );
        let m = PerformanceMetrics::compute(&stressed, metrics)?;
        let result = StressResult {
            scenario: scenario.clone(),
            name: scenario.name(),
            total_return: m.total_return(),
            sharpe: m.sharpe(),
            max_drawdown: m.max_drawdown(),
            var: m.risk.var,
            sharpe_change: m.sharpe() - baseline.sharpe(),
            drawdown_change: m.max_drawdown() - baseline.max_drawdown(),
            survived: m.max_drawdown() > -config.max_tolerated_drawdown,
        };
        debug!(
            scenario = %result.name,
            sharpe = result.sharpe,
            max_drawdown = result.max_drawdown,
            survived = result.survived,
            "stress scenario evaluated"
        );
        results.push(result);
    }
    Ok((baseline, results))
}

/// Run `trials` noise-injected replays in parallel.
///
/// Trial `i` draws from `rng_for("monte_carlo", i)`, so results do not depend
/// on the rayon thread count.
pub fn run_monte_carlo(
    market: &[f64],
    signal: SignalSource<'_>,
    config: &MonteCarloConfig,
    metrics: &MetricsConfig,
    rng: &RngHierarchy,
) -> Result<Option<MonteCarloResult>, StressError> {
    if config.trials == 0 {
        return Ok(None);
    }
    let normal = standard_normal()?;
    let noise = StressScenario::NoiseInjection {
        std_dev: config.noise_std,
    };

    let outcomes: Vec<(f64, f64, f64)> = (0..config.trials)
        .into_par_iter()
        .map(|i| -> Result<(f64, f64, f64), StressError> {
            let mut trial_rng = rng.rng_for("monte_carlo", i as u64);
            let r = analyzed_returns(
                Some(&noise),
                market,
                signal,
                metrics.periods_per_year,
                &normal,
                &mut trial_rng,
            );
            let m = PerformanceMetrics::compute(&r, metrics)?;
            Ok((m.sharpe(), m.max_drawdown(), m.total_return()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let sharpes: Vec<f64> = outcomes.iter().map(|o| o.0).collect();
    let drawdowns: Vec<f64> = outcomes.iter().map(|o| o.1).collect();
    let totals: Vec<f64> = outcomes.iter().map(|o| o.2).collect();
    let total_return = MetricDistribution::from_values("mc_total_return", &totals);

    Ok(Some(MonteCarloResult {
        trials: outcomes.len(),
        sharpe: MetricDistribution::from_values("mc_sharpe", &sharpes),
        max_drawdown: MetricDistribution::from_values("mc_max_drawdown", &drawdowns),
        probability_of_loss: total_return.fraction_below(0.0),
        total_return,
        sharpe_stability: StabilityScore::compute("mc_sharpe", &sharpes, config.penalty),
    }))
}

/// Scenarios plus Monte Carlo in one report.
pub fn run_stress_tests(
    market: &[f64],
    signal: SignalSource<'_>,
    config: &StressConfig,
    metrics: &MetricsConfig,
    rng: &RngHierarchy,
) -> Result<StressReport, StressError> {
    let (baseline, scenarios) = run_scenarios(market, signal, config, metrics, rng)?;
    let monte_carlo = run_monte_carlo(market, signal, &config.monte_carlo, metrics, rng)?;
    let survival_rate = if scenarios.is_empty() {
        1.0
    } else {
        scenarios.iter().filter(|s| s.survived).count() as f64 / scenarios.len() as f64
    };
    let skipped = config
        .scenarios
        .iter()
        .filter(|s| !s.applies_to(signal))
        .map(StressScenario::name)
        .collect();
    Ok(StressReport {
        baseline,
        scenarios,
        monte_carlo,
        survival_rate,
        skipped,
    })
}
