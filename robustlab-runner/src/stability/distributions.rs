//! Full distribution of a metric across windows or Monte Carlo trials.

use std::collections::BTreeMap;

use robustlab_core::stats::{mean, percentile_sorted, population_std, sorted};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDistribution {
    pub metric: String,
    pub median: f64,
    pub mean: f64,
    pub iqr: f64,
    /// Named percentiles: p2.5, p5, p10, p25, p50, p75, p90, p95, p97.5.
    pub percentiles: BTreeMap<String, f64>,
    pub all_values: Vec<f64>,
}

const LEVELS: [(&str, f64); 9] = [
    ("p2.5", 2.5),
    ("p5", 5.0),
    ("p10", 10.0),
    ("p25", 25.0),
    ("p50", 50.0),
    ("p75", 75.0),
    ("p90", 90.0),
    ("p95", 95.0),
    ("p97.5", 97.5),
];

impl MetricDistribution {
    /// # Example
    /// ```
    /// use robustlab_runner::stability::MetricDistribution;
    ///
    /// let dist = MetricDistribution::from_values("sharpe", &[1.8, 2.0, 1.9, 2.1, 1.85]);
    /// assert_eq!(dist.metric, "sharpe");
    /// assert!(dist.median > 1.8 && dist.median < 2.1);
    /// ```
    pub fn from_values(metric: &str, values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                metric: metric.to_string(),
                median: 0.0,
                mean: 0.0,
                iqr: 0.0,
                percentiles: BTreeMap::new(),
                all_values: Vec::new(),
            };
        }

        let s = sorted(values);
        let percentiles: BTreeMap<String, f64> = LEVELS
            .iter()
            .map(|(name, p)| (name.to_string(), percentile_sorted(&s, *p)))
            .collect();
        let q1 = percentile_sorted(&s, 25.0);
        let q3 = percentile_sorted(&s, 75.0);

        Self {
            metric: metric.to_string(),
            median: percentile_sorted(&s, 50.0),
            mean: mean(values),
            iqr: q3 - q1,
            percentiles,
            all_values: values.to_vec(),
        }
    }

    pub fn get_percentile(&self, p: &str) -> Option<f64> {
        self.percentiles.get(p).copied()
    }

    /// Population standard deviation of the stored values.
    pub fn std_dev(&self) -> f64 {
        population_std(&self.all_values)
    }

    /// 95% interval (p2.5, p97.5); `None` below 2 values.
    pub fn ci_95(&self) -> Option<(f64, f64)> {
        if self.all_values.len() < 2 {
            return None;
        }
        Some((self.get_percentile("p2.5")?, self.get_percentile("p97.5")?))
    }

    /// Fraction of values strictly below `threshold`.
    pub fn fraction_below(&self, threshold: f64) -> f64 {
        if self.all_values.is_empty() {
            return 0.0;
        }
        self.all_values.iter().filter(|v| **v < threshold).count() as f64
            / self.all_values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_from_values() {
        let dist = MetricDistribution::from_values("sharpe", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(dist.median, 3.0);
        assert_eq!(dist.mean, 3.0);
        assert_eq!(dist.iqr, 2.0);
        assert_eq!(dist.all_values.len(), 5);
        assert_eq!(dist.get_percentile("p50"), Some(3.0));
        assert!(dist.get_percentile("p99").is_none());
    }

    #[test]
    fn std_dev_population() {
        let dist =
            MetricDistribution::from_values("x", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((dist.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn ci_95_and_tail_fraction() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let dist = MetricDistribution::from_values("x", &values);
        let (lo, hi) = dist.ci_95().unwrap();
        assert!(lo < 5.0 && hi > 95.0);
        assert!((dist.fraction_below(10.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn ci_95_needs_two_values() {
        assert!(MetricDistribution::from_values("x", &[1.0]).ci_95().is_none());
        assert!(MetricDistribution::from_values("x", &[]).ci_95().is_none());
    }

    #[test]
    fn empty_distribution() {
        let dist = MetricDistribution::from_values("x", &[]);
        assert_eq!(dist.median, 0.0);
        assert_eq!(dist.std_dev(), 0.0);
        assert_eq!(dist.fraction_below(1.0), 0.0);
    }
}
