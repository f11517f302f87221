//! Block bootstrap confidence grading: stationary block bootstrap for a Sharpe CI.
//!
//! Geometric block lengths (Politis & Romano, 1994) preserve the serial
//! dependence of returns. The 90% interval of the resampled annualized Sharpe
//! ratio is graded into a [`ConfidenceGrade`].

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use robustlab_core::metrics::efficiency::sharpe_ratio;
use robustlab_core::stats::{percentile_sorted, sorted};
use robustlab_core::{MetricsConfig, RngHierarchy};

const RNG_SCOPE: &str = "bootstrap";

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of bootstrap resamples (default 1000).
    pub n_resamples: usize,
    /// Mean block length in periods (default 20).
    pub mean_block_length: usize,
    /// Fewer observations than this grade as `Insufficient` (default 250).
    pub min_observations: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 1000,
            mean_block_length: 20,
            min_observations: 250,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceGrade {
    /// CI lower bound strongly positive (> 0.5), CI reasonably narrow (< 3.0).
    High,
    /// CI lower bound positive (> 0.0), CI moderate (< 5.0).
    Medium,
    /// CI wide or lower bound near zero.
    Low,
    /// Too few observations to grade.
    Insufficient,
}

impl ConfidenceGrade {
    /// Grade mapped onto [0, 1] for the aggregate robustness score.
    pub fn score(&self) -> f64 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.6,
            Self::Low => 0.2,
            Self::Insufficient => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub grade: ConfidenceGrade,
    /// 5th percentile of bootstrap Sharpe distribution.
    pub sharpe_ci_lower: f64,
    /// 95th percentile of bootstrap Sharpe distribution.
    pub sharpe_ci_upper: f64,
    pub sharpe_median: f64,
    /// Width of the 90% CI.
    pub ci_width: f64,
    pub n_resamples: usize,
    pub sample_size: usize,
}

impl BootstrapResult {
    fn insufficient(sample_size: usize) -> Self {
        Self {
            grade: ConfidenceGrade::Insufficient,
            sharpe_ci_lower: 0.0,
            sharpe_ci_upper: 0.0,
            sharpe_median: 0.0,
            ci_width: 0.0,
            n_resamples: 0,
            sample_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    #[error("n_resamples must be positive")]
    NoResamples,
    #[error("mean_block_length must be positive")]
    ZeroBlockLength,
}

// ─── Bootstrap ───────────────────────────────────────────────────────

/// Run a stationary block bootstrap of the annualized Sharpe ratio.
///
/// A series shorter than `min_observations` is graded `Insufficient` rather
/// than rejected.
pub fn stationary_block_bootstrap(
    returns: &[f64],
    config: &BootstrapConfig,
    metrics: &MetricsConfig,
    rng: &RngHierarchy,
) -> Result<BootstrapResult, BootstrapError> {
    if config.n_resamples == 0 {
        return Err(BootstrapError::NoResamples);
    }
    if config.mean_block_length == 0 {
        return Err(BootstrapError::ZeroBlockLength);
    }

    let n = returns.len();
    if n < config.min_observations.max(2) {
        return Ok(BootstrapResult::insufficient(n));
    }

    let mut rng = rng.rng_for(RNG_SCOPE, 0);
    let p = 1.0 / config.mean_block_length as f64;

    let sharpes: Vec<f64> = (0..config.n_resamples)
        .map(|_| {
            let resampled = resample_stationary_block(returns, n, p, &mut rng);
            sharpe_ratio(&resampled, metrics.risk_free_rate, metrics.periods_per_year)
        })
        .filter(|s| s.is_finite())
        .collect();

    if sharpes.is_empty() {
        return Ok(BootstrapResult::insufficient(n));
    }

    let s = sorted(&sharpes);
    let ci_lower = percentile_sorted(&s, 5.0);
    let ci_upper = percentile_sorted(&s, 95.0);
    let ci_width = ci_upper - ci_lower;

    Ok(BootstrapResult {
        grade: assign_grade(ci_lower, ci_width),
        sharpe_ci_lower: ci_lower,
        sharpe_ci_upper: ci_upper,
        sharpe_median: percentile_sorted(&s, 50.0),
        ci_width,
        n_resamples: s.len(),
        sample_size: n,
    })
}

/// One stationary block bootstrap resample.
///
/// At each step: with probability `p` jump to a random position, otherwise
/// continue the current block (wrapping around).
pub fn resample_stationary_block(
    returns: &[f64],
    target_len: usize,
    p: f64,
    rng: &mut StdRng,
) -> Vec<f64> {
    let n = returns.len();
    if n == 0 {
        return Vec::new();
    }
    let mut resampled = Vec::with_capacity(target_len);
    let mut pos = rng.gen_range(0..n);

    for _ in 0..target_len {
        resampled.push(returns[pos]);
        if rng.gen::<f64>() < p {
            pos = rng.gen_range(0..n);
        } else {
            pos = (pos + 1) % n;
        }
    }
    resampled
}

fn assign_grade(ci_lower: f64, ci_width: f64) -> ConfidenceGrade {
    if ci_lower > 0.5 && ci_width < 3.0 {
        ConfidenceGrade::High
    } else if ci_lower > 0.0 && ci_width < 5.0 {
        ConfidenceGrade::Medium
    } else {
        ConfidenceGrade::Low
    }
}
