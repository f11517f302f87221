//! Walk-forward validation: expanding in-sample windows followed by fixed
//! out-of-sample periods.
//!
//! The degradation ratio (mean OOS Sharpe / mean IS Sharpe) shows how much of
//! the in-sample edge survives on unseen data.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

use robustlab_core::metrics::efficiency::sharpe_ratio;
use robustlab_core::metrics::predictive::directional_accuracy;
use robustlab_core::metrics::returns::total_return;
use robustlab_core::stats::{mean, std_dev};
use robustlab_core::MetricsConfig;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5).
    pub n_folds: usize,
    /// Minimum total observations required (default 504 = 2 years).
    pub min_total: usize,
    /// Minimum in-sample observations in the first fold (default 252).
    pub min_in_sample: usize,
    /// Minimum out-of-sample observations per fold (default 42).
    pub min_out_of_sample: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            min_total: 504,
            min_in_sample: 252,
            min_out_of_sample: 42,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Index ranges of one fold; both ranges are half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub is_start: usize,
    pub is_end: usize,
    pub oos_start: usize,
    pub oos_end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub is_sharpe: f64,
    pub oos_sharpe: f64,
    pub is_return: f64,
    pub oos_return: f64,
    /// Out-of-sample directional accuracy when predictions are available.
    pub oos_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationFlag {
    /// IS Sharpe >= 0.1, ratio computed normally.
    Normal,
    /// 0 <= IS Sharpe < 0.1, using difference metric (OOS - IS) instead.
    LowInSample,
    /// IS Sharpe is negative, ratio skipped entirely.
    NegativeInSample,
    /// IS Sharpe positive (>= 0.1) but OOS Sharpe negative: clamped to 0.0.
    FailedOutOfSample,
}

/// One-sided t-test result (H0: mean = 0, H1: mean > 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    /// P(T > t) under H0.
    pub p_value: f64,
    pub df: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub folds: Vec<FoldResult>,
    pub mean_is_sharpe: f64,
    pub mean_oos_sharpe: f64,
    /// `None` when the ratio cannot be computed (see `degradation_flag`).
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
    /// Fraction of folds with a positive OOS Sharpe.
    pub oos_positive_fraction: f64,
    pub mean_oos_accuracy: Option<f64>,
    /// t-test on fold-level OOS Sharpe values.
    pub t_test: Option<TTestResult>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalkForwardError {
    #[error("insufficient data: {total} observations < minimum {min}")]
    InsufficientData { total: usize, min: usize },
    #[error("fold creation failed: cannot fit {n_folds} folds in {total} observations")]
    FoldCreationFailed { n_folds: usize, total: usize },
    #[error("predictions cover {predictions} observations, returns {returns}")]
    PredictionLength { predictions: usize, returns: usize },
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create expanding-window folds.
///
/// Fold `i` trains on `[0, min_in_sample + i·oos)` and tests on the next
/// `oos` observations, where `oos = (total − min_in_sample) / n_folds`.
pub fn create_folds(
    total: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    if total < config.min_total {
        return Err(WalkForwardError::InsufficientData {
            total,
            min: config.min_total,
        });
    }

    let n = config.n_folds;
    let oos_size = if n == 0 {
        0
    } else {
        total.saturating_sub(config.min_in_sample) / n
    };
    if oos_size == 0 || oos_size < config.min_out_of_sample {
        return Err(WalkForwardError::FoldCreationFailed { n_folds: n, total });
    }

    let folds: Vec<FoldSpec> = (0..n)
        .map(|i| {
            let is_end = config.min_in_sample + i * oos_size;
            FoldSpec {
                fold_index: i,
                is_start: 0,
                is_end,
                oos_start: is_end,
                oos_end: is_end + oos_size,
            }
        })
        .take_while(|f| f.oos_end <= total)
        .collect();

    if folds.is_empty() {
        return Err(WalkForwardError::FoldCreationFailed { n_folds: n, total });
    }
    Ok(folds)
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Evaluate every fold of `returns`.
///
/// `predictions` is `(predictions, actuals)` aligned with `returns`; when
/// present, each fold also reports out-of-sample directional accuracy.
pub fn run_walk_forward(
    returns: &[f64],
    predictions: Option<(&[f64], &[f64])>,
    config: &WalkForwardConfig,
    metrics: &MetricsConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    if let Some((preds, actuals)) = predictions {
        if preds.len() != returns.len() || actuals.len() != returns.len() {
            return Err(WalkForwardError::PredictionLength {
                predictions: preds.len().min(actuals.len()),
                returns: returns.len(),
            });
        }
    }

    let folds = create_folds(returns.len(), config)?;
    let sharpe = |r: &[f64]| sharpe_ratio(r, metrics.risk_free_rate, metrics.periods_per_year);

    let results: Vec<FoldResult> = folds
        .iter()
        .map(|f| {
            let is = &returns[f.is_start..f.is_end];
            let oos = &returns[f.oos_start..f.oos_end];
            FoldResult {
                fold_index: f.fold_index,
                is_sharpe: sharpe(is),
                oos_sharpe: sharpe(oos),
                is_return: total_return(is),
                oos_return: total_return(oos),
                oos_accuracy: predictions.map(|(p, a)| {
                    directional_accuracy(&p[f.oos_start..f.oos_end], &a[f.oos_start..f.oos_end])
                }),
            }
        })
        .collect();

    Ok(compute_walk_forward_stats(results))
}

fn compute_walk_forward_stats(folds: Vec<FoldResult>) -> WalkForwardResult {
    let is: Vec<f64> = folds.iter().map(|f| f.is_sharpe).collect();
    let oos: Vec<f64> = folds.iter().map(|f| f.oos_sharpe).collect();
    let mean_is_sharpe = mean(&is);
    let mean_oos_sharpe = mean(&oos);

    let (degradation_ratio, degradation_flag) =
        compute_degradation_ratio(mean_is_sharpe, mean_oos_sharpe);

    let oos_positive_fraction = if oos.is_empty() {
        0.0
    } else {
        oos.iter().filter(|s| **s > 0.0).count() as f64 / oos.len() as f64
    };
    let accuracies: Vec<f64> = folds.iter().filter_map(|f| f.oos_accuracy).collect();
    let mean_oos_accuracy = if accuracies.is_empty() {
        None
    } else {
        Some(mean(&accuracies))
    };

    WalkForwardResult {
        t_test: one_sided_t_test(&oos),
        folds,
        mean_is_sharpe,
        mean_oos_sharpe,
        degradation_ratio,
        degradation_flag,
        oos_positive_fraction,
        mean_oos_accuracy,
    }
}

/// - IS >= 0.1: ratio = OOS / IS (Normal)
/// - 0 <= IS < 0.1: difference = OOS − IS (LowInSample)
/// - IS < 0: skipped (NegativeInSample)
/// - IS >= 0.1 but OOS < 0: clamped to 0.0 (FailedOutOfSample)
pub fn compute_degradation_ratio(
    mean_is_sharpe: f64,
    mean_oos_sharpe: f64,
) -> (Option<f64>, DegradationFlag) {
    if mean_is_sharpe < 0.0 {
        (None, DegradationFlag::NegativeInSample)
    } else if mean_is_sharpe < 0.1 {
        (
            Some(mean_oos_sharpe - mean_is_sharpe),
            DegradationFlag::LowInSample,
        )
    } else if mean_oos_sharpe < 0.0 {
        (Some(0.0), DegradationFlag::FailedOutOfSample)
    } else {
        (Some(mean_oos_sharpe / mean_is_sharpe), DegradationFlag::Normal)
    }
}

/// One-sided t-test on `values`. `None` below 2 values.
pub fn one_sided_t_test(values: &[f64]) -> Option<TTestResult> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let df = (n - 1) as f64;
    let m = mean(values);
    let std_err = std_dev(values) / (n as f64).sqrt();

    if std_err < 1e-15 {
        // identical values: t undefined
        let (t_statistic, p_value) = if m > 0.0 {
            (f64::INFINITY, 0.0)
        } else {
            (0.0, 0.5)
        };
        return Some(TTestResult {
            t_statistic,
            p_value,
            df,
        });
    }

    let t = m / std_err;
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some(TTestResult {
        t_statistic: t,
        p_value: 1.0 - dist.cdf(t),
        df,
    })
}
