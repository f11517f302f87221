//! Stability score calculation.
//!
//! Penalizes variance: score = median − penalty_factor × IQR.
//! Consistent performance beats high-but-erratic performance.

use robustlab_core::stats::{percentile_sorted, sorted};
use serde::{Deserialize, Serialize};

/// Stability score for a metric across windows, periods or trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityScore {
    /// Metric name (e.g., "rolling_sharpe", "mc_sharpe")
    pub metric: String,
    pub median: f64,
    /// Interquartile range (Q3 − Q1)
    pub iqr: f64,
    /// median − penalty × IQR
    pub score: f64,
    pub penalty_factor: f64,
}

impl StabilityScore {
    /// # Example
    /// ```
    /// use robustlab_runner::stability::StabilityScore;
    ///
    /// let sharpe_trials = vec![1.8, 2.0, 1.9, 2.1, 1.85];
    /// let score = StabilityScore::compute("sharpe", &sharpe_trials, 0.5);
    /// assert!(score.score > 1.8);
    /// ```
    pub fn compute(metric: &str, values: &[f64], penalty: f64) -> Self {
        if values.is_empty() {
            return Self {
                metric: metric.to_string(),
                median: 0.0,
                iqr: 0.0,
                score: 0.0,
                penalty_factor: penalty,
            };
        }

        let s = sorted(values);
        let median = percentile_sorted(&s, 50.0);
        let iqr = percentile_sorted(&s, 75.0) - percentile_sorted(&s, 25.0);

        Self {
            metric: metric.to_string(),
            median,
            iqr,
            score: median - penalty * iqr,
            penalty_factor: penalty,
        }
    }
}
