//! Adaptive exposure control driven by the robustness monitor.
//!
//! Exposure targets a constant volatility and is scaled down while the
//! monitor reports Warning or Critical. A prolonged Critical spell is treated
//! as a retrain: the monitor is rebaselined on recent data.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use robustlab_core::metrics::risk::volatility;
use robustlab_core::stats::EPSILON;
use robustlab_core::{MetricsConfig, MetricsError, PerformanceMetrics};

use crate::monitor::{signal_at, MonitorConfig, MonitorStatus, MonitorSummary, RobustnessMonitor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Annualized volatility the exposure aims for (default 0.15).
    pub target_volatility: f64,
    /// Trailing window for realized volatility (default 21).
    pub vol_window: usize,
    pub min_exposure: f64,
    pub max_exposure: f64,
    /// Exposure multiplier while the monitor is in Warning (default 0.5).
    pub warning_scale: f64,
    /// Exposure multiplier while the monitor is Critical (default 0.0).
    pub critical_scale: f64,
    /// Consecutive Critical bars before a retrain (default 21).
    pub retrain_after: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            target_volatility: 0.15,
            vol_window: 21,
            min_exposure: 0.0,
            max_exposure: 1.5,
            warning_scale: 0.5,
            critical_scale: 0.0,
            retrain_after: 21,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveRun {
    /// Exposure applied to each bar, decided before the bar's return was known.
    pub exposures: Vec<f64>,
    pub adapted_returns: Vec<f64>,
    /// Bar indices at which a retrain was triggered.
    pub retrain_points: Vec<usize>,
    pub baseline_metrics: PerformanceMetrics,
    pub adapted_metrics: PerformanceMetrics,
    pub monitor: MonitorSummary,
}

impl AdaptiveRun {
    /// Adapted minus unadapted max drawdown (positive = shallower).
    pub fn drawdown_improvement(&self) -> f64 {
        self.adapted_metrics.max_drawdown() - self.baseline_metrics.max_drawdown()
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveSystem {
    config: AdaptiveConfig,
    metrics: MetricsConfig,
    monitor: RobustnessMonitor,
    recent: VecDeque<f64>,
    consecutive_critical: usize,
    index: usize,
}

impl AdaptiveSystem {
    pub fn new(config: AdaptiveConfig, monitor: MonitorConfig, metrics: MetricsConfig) -> Self {
        Self {
            recent: VecDeque::with_capacity(config.vol_window),
            monitor: RobustnessMonitor::new(monitor, metrics.clone()),
            config,
            metrics,
            consecutive_critical: 0,
            index: 0,
        }
    }

    pub fn monitor(&self) -> &RobustnessMonitor {
        &self.monitor
    }

    /// Exposure for the next bar, from information available now.
    pub fn next_exposure(&self) -> f64 {
        let history: Vec<f64> = self.recent.iter().copied().collect();
        let base = if history.len() < 2 {
            1.0
        } else {
            let realized = volatility(&history, self.metrics.periods_per_year);
            if realized < EPSILON {
                self.config.max_exposure
            } else {
                self.config.target_volatility / realized
            }
        };
        let base = base.clamp(self.config.min_exposure, self.config.max_exposure);
        base * self.status_scale(self.monitor.status())
    }

    fn status_scale(&self, status: MonitorStatus) -> f64 {
        match status {
            MonitorStatus::Healthy => 1.0,
            MonitorStatus::Warning => self.config.warning_scale,
            MonitorStatus::Critical => self.config.critical_scale,
        }
    }

    /// Trade one bar. `signal` is the bar's `(prediction, market return)`.
    /// Returns `(exposure, adapted_return, retrained)`.
    pub fn step(&mut self, ret: f64, signal: Option<(f64, f64)>) -> (f64, f64, bool) {
        let exposure = self.next_exposure();
        let adapted = exposure * ret;

        if self.config.vol_window > 0 {
            if self.recent.len() == self.config.vol_window {
                self.recent.pop_front();
            }
            self.recent.push_back(ret);
        }

        let status = self.monitor.update(ret, signal).status;
        let mut retrained = false;
        if status == MonitorStatus::Critical {
            self.consecutive_critical += 1;
            if self.config.retrain_after > 0 && self.consecutive_critical >= self.config.retrain_after {
                info!(index = self.index, "prolonged critical status, retraining");
                self.monitor.rebaseline();
                self.consecutive_critical = 0;
                retrained = true;
            }
        } else {
            self.consecutive_critical = 0;
        }

        self.index += 1;
        (exposure, adapted, retrained)
    }

    /// Replay a whole series and compare adapted with unadapted performance.
    /// `signal` carries the predictions and the market returns they forecast.
    pub fn run(
        mut self,
        returns: &[f64],
        signal: Option<(&[f64], &[f64])>,
    ) -> Result<AdaptiveRun, MetricsError> {
        let mut exposures = Vec::with_capacity(returns.len());
        let mut adapted_returns = Vec::with_capacity(returns.len());
        let mut retrain_points = Vec::new();

        for (i, r) in returns.iter().enumerate() {
            let (exposure, adapted, retrained) = self.step(*r, signal_at(signal, i));
            exposures.push(exposure);
            adapted_returns.push(adapted);
            if retrained {
                retrain_points.push(i);
            }
        }

        Ok(AdaptiveRun {
            baseline_metrics: PerformanceMetrics::compute(returns, &self.metrics)?,
            adapted_metrics: PerformanceMetrics::compute(&adapted_returns, &self.metrics)?,
            monitor: self.monitor.summary(),
            exposures,
            adapted_returns,
            retrain_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> AdaptiveSystem {
        AdaptiveSystem::new(
            AdaptiveConfig::default(),
            MonitorConfig::default(),
            MetricsConfig::default(),
        )
    }

    fn healthy(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 0.012 } else { -0.009 }).collect()
    }

    #[test]
    fn first_bar_has_unit_exposure() {
        assert_eq!(system().next_exposure(), 1.0);
    }

    #[test]
    fn exposure_is_bounded() {
        let run = system().run(&healthy(300), None).unwrap();
        let cfg = AdaptiveConfig::default();
        assert!(run
            .exposures
            .iter()
            .all(|e| *e >= cfg.min_exposure && *e <= cfg.max_exposure));
        assert_eq!(run.exposures.len(), 300);
    }

    #[test]
    fn exposure_does_not_see_current_bar() {
        let mut a = system();
        let mut b = system();
        for r in healthy(50) {
            a.step(r, None);
            b.step(r, None);
        }
        let (ea, _, _) = a.step(0.5, None);
        let (eb, _, _) = b.step(-0.5, None);
        assert_eq!(ea, eb);
    }

    #[test]
    fn correct_short_calls_keep_full_exposure() {
        let market: Vec<f64> = (0..300)
            .map(|i| if i % 4 == 3 { 0.002 } else { -0.004 })
            .collect();
        let strategy: Vec<f64> = market.iter().map(|r| r.abs()).collect();
        let run = system()
            .run(&strategy, Some((market.as_slice(), market.as_slice())))
            .unwrap();
        assert_eq!(run.monitor.warning, 0);
        assert_eq!(run.monitor.critical, 0);
        assert!(run.retrain_points.is_empty());
    }

    #[test]
    fn crash_is_cut_and_retrained() {
        let mut r = healthy(200);
        r.extend(vec![-0.03; 60]);
        r.extend(healthy(100));
        let run = system().run(&r, None).unwrap();
        assert!(!run.retrain_points.is_empty());
        assert!(run.drawdown_improvement() > 0.0);
        assert!(run.monitor.critical > 0);
    }
}
