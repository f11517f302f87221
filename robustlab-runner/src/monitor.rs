//! Streaming robustness monitor.
//!
//! Fed one observation at a time. After a baseline period it compares a
//! rolling window against the baseline and raises alerts when Sharpe,
//! drawdown, volatility or directional accuracy breach their limits.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use robustlab_core::metrics::efficiency::{hit_rate, sharpe_ratio};
use robustlab_core::metrics::predictive::directional_accuracy;
use robustlab_core::metrics::risk::volatility;
use robustlab_core::stats::EPSILON;
use robustlab_core::MetricsConfig;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Observations used to establish the baseline (default 126).
    pub baseline_window: usize,
    /// Rolling window compared against the baseline (default 63).
    pub window: usize,
    /// Alert when rolling Sharpe falls below this (default 0.0).
    pub min_sharpe: f64,
    /// Alert when drawdown from peak is deeper than this fraction (default 0.2).
    pub max_drawdown: f64,
    /// Alert when rolling / baseline volatility exceeds this (default 2.0).
    pub max_volatility_ratio: f64,
    /// Alert when rolling directional accuracy falls below this (default 0.45).
    pub min_accuracy: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            baseline_window: 126,
            window: 63,
            min_sharpe: 0.0,
            max_drawdown: 0.2,
            max_volatility_ratio: 2.0,
            min_accuracy: 0.45,
        }
    }
}

// ─── Types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowSharpe,
    Drawdown,
    VolatilitySpike,
    LowAccuracy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Observation index (0-based) at which the breach was seen.
    pub index: usize,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonitorStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub sharpe: f64,
    pub volatility: f64,
    pub hit_rate: f64,
    pub observations: usize,
}

impl Baseline {
    pub fn from_returns(returns: &[f64], metrics: &MetricsConfig) -> Self {
        Self {
            sharpe: sharpe_ratio(returns, metrics.risk_free_rate, metrics.periods_per_year),
            volatility: volatility(returns, metrics.periods_per_year),
            hit_rate: hit_rate(returns),
            observations: returns.len(),
        }
    }
}

/// Outcome of a single `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorUpdate {
    pub index: usize,
    pub status: MonitorStatus,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub observations: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub final_status: MonitorStatus,
    pub rebaselines: usize,
    pub alert_counts: BTreeMap<AlertKind, usize>,
    pub alerts: Vec<Alert>,
}

// ─── Monitor ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RobustnessMonitor {
    config: MonitorConfig,
    metrics: MetricsConfig,
    baseline: Option<Baseline>,
    /// Observations collected until the baseline is established.
    warmup: Vec<f64>,
    window: VecDeque<f64>,
    /// `(prediction, market return)` pairs aligned with `window`.
    signals: VecDeque<(f64, f64)>,
    wealth: f64,
    peak: f64,
    index: usize,
    status: MonitorStatus,
    status_counts: [usize; 3],
    rebaselines: usize,
    alerts: Vec<Alert>,
}

impl RobustnessMonitor {
    pub fn new(config: MonitorConfig, metrics: MetricsConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window),
            signals: VecDeque::with_capacity(config.window),
            config,
            metrics,
            baseline: None,
            warmup: Vec::new(),
            wealth: 1.0,
            peak: 1.0,
            index: 0,
            status: MonitorStatus::Healthy,
            status_counts: [0; 3],
            rebaselines: 0,
            alerts: Vec::new(),
        }
    }

    /// Start with a baseline computed from historical returns instead of a warm-up period.
    pub fn with_baseline(config: MonitorConfig, metrics: MetricsConfig, history: &[f64]) -> Self {
        let baseline = Baseline::from_returns(history, &metrics);
        let mut monitor = Self::new(config, metrics);
        monitor.baseline = Some(baseline);
        monitor
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn observations(&self) -> usize {
        self.index
    }

    /// Current drawdown from the running peak (≤ 0).
    pub fn drawdown(&self) -> f64 {
        if self.peak > 0.0 {
            self.wealth / self.peak - 1.0
        } else {
            -1.0
        }
    }

    /// Feed one strategy return. `signal` is the prediction made for the bar
    /// paired with the realized market return it was scored against.
    pub fn update(&mut self, ret: f64, signal: Option<(f64, f64)>) -> MonitorUpdate {
        let index = self.index;
        self.index += 1;

        self.wealth *= 1.0 + ret;
        self.peak = self.peak.max(self.wealth);

        push_bounded(&mut self.window, ret, self.config.window);
        if let Some(pair) = signal {
            push_bounded(&mut self.signals, pair, self.config.window);
        }

        if self.baseline.is_none() {
            self.warmup.push(ret);
            if self.warmup.len() >= self.config.baseline_window {
                let baseline = Baseline::from_returns(&self.warmup, &self.metrics);
                info!(
                    observations = baseline.observations,
                    sharpe = baseline.sharpe,
                    volatility = baseline.volatility,
                    "monitor baseline established"
                );
                self.baseline = Some(baseline);
                self.warmup.clear();
            }
        }

        let alerts = self.check(index);
        let status = classify(&alerts);
        self.transition(index, status, &alerts);
        self.status_counts[status as usize] += 1;
        self.alerts.extend(alerts.iter().cloned());

        MonitorUpdate {
            index,
            status,
            alerts,
        }
    }

    /// Replace the baseline with statistics of the current window and reset the peak.
    pub fn rebaseline(&mut self) {
        if self.window.is_empty() {
            return;
        }
        let recent: Vec<f64> = self.window.iter().copied().collect();
        self.baseline = Some(Baseline::from_returns(&recent, &self.metrics));
        self.warmup.clear();
        self.peak = self.wealth;
        self.rebaselines += 1;
        info!(index = self.index, "monitor rebaselined");
    }

    pub fn summary(&self) -> MonitorSummary {
        let mut alert_counts = BTreeMap::new();
        for alert in &self.alerts {
            *alert_counts.entry(alert.kind).or_insert(0) += 1;
        }
        MonitorSummary {
            observations: self.index,
            healthy: self.status_counts[MonitorStatus::Healthy as usize],
            warning: self.status_counts[MonitorStatus::Warning as usize],
            critical: self.status_counts[MonitorStatus::Critical as usize],
            final_status: self.status,
            rebaselines: self.rebaselines,
            alert_counts,
            alerts: self.alerts.clone(),
        }
    }

    fn check(&self, index: usize) -> Vec<Alert> {
        let Some(baseline) = &self.baseline else {
            return Vec::new();
        };
        if self.window.len() < self.config.window || self.config.window == 0 {
            return Vec::new();
        }

        let recent: Vec<f64> = self.window.iter().copied().collect();
        let mut alerts = Vec::new();
        let mut breach = |kind, value: f64, threshold: f64| {
            alerts.push(Alert {
                index,
                kind,
                value,
                threshold,
            })
        };

        let sharpe = sharpe_ratio(&recent, self.metrics.risk_free_rate, self.metrics.periods_per_year);
        if sharpe < self.config.min_sharpe {
            breach(AlertKind::LowSharpe, sharpe, self.config.min_sharpe);
        }

        let drawdown = self.drawdown();
        if drawdown < -self.config.max_drawdown {
            breach(AlertKind::Drawdown, drawdown, -self.config.max_drawdown);
        }

        if baseline.volatility > EPSILON {
            let ratio = volatility(&recent, self.metrics.periods_per_year) / baseline.volatility;
            if ratio > self.config.max_volatility_ratio {
                breach(AlertKind::VolatilitySpike, ratio, self.config.max_volatility_ratio);
            }
        }

        if self.signals.len() >= self.config.window {
            let (preds, actuals): (Vec<f64>, Vec<f64>) = self.signals.iter().copied().unzip();
            let accuracy = directional_accuracy(&preds, &actuals);
            if accuracy < self.config.min_accuracy {
                breach(AlertKind::LowAccuracy, accuracy, self.config.min_accuracy);
            }
        }

        alerts
    }

    fn transition(&mut self, index: usize, status: MonitorStatus, alerts: &[Alert]) {
        for alert in alerts {
            debug!(
                index,
                kind = ?alert.kind,
                value = alert.value,
                threshold = alert.threshold,
                "monitor alert"
            );
        }
        if status != self.status {
            if status == MonitorStatus::Healthy {
                info!(index, from = ?self.status, "monitor recovered");
            } else {
                let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
                warn!(index, from = ?self.status, to = ?status, alerts = ?kinds, "monitor status changed");
            }
            self.status = status;
        }
    }
}

/// Critical on two or more breaches or any drawdown breach.
fn classify(alerts: &[Alert]) -> MonitorStatus {
    if alerts.len() >= 2 || alerts.iter().any(|a| a.kind == AlertKind::Drawdown) {
        MonitorStatus::Critical
    } else if alerts.len() == 1 {
        MonitorStatus::Warning
    } else {
        MonitorStatus::Healthy
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, cap: usize) {
    if cap == 0 {
        return;
    }
    if buf.len() == cap {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Bar `i` of an optional `(predictions, market)` pair of series.
pub(crate) fn signal_at(signal: Option<(&[f64], &[f64])>, i: usize) -> Option<(f64, f64)> {
    let (predictions, market) = signal?;
    Some((*predictions.get(i)?, *market.get(i)?))
}

/// Replay a whole series of strategy returns through a fresh monitor.
/// `signal` carries the predictions and the market returns they forecast.
pub fn replay(
    returns: &[f64],
    signal: Option<(&[f64], &[f64])>,
    config: &MonitorConfig,
    metrics: &MetricsConfig,
) -> MonitorSummary {
    let mut monitor = RobustnessMonitor::new(config.clone(), metrics.clone());
    for (i, r) in returns.iter().enumerate() {
        monitor.update(*r, signal_at(signal, i));
    }
    monitor.summary()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 0.002 } else { -0.001 }).collect()
    }

    fn monitor() -> RobustnessMonitor {
        RobustnessMonitor::new(MonitorConfig::default(), MetricsConfig::default())
    }

    #[test]
    fn no_checks_before_baseline() {
        let mut m = monitor();
        for _ in 0..100 {
            let u = m.update(-0.05, None);
            assert!(u.alerts.is_empty());
        }
        assert!(m.baseline().is_none());
    }

    #[test]
    fn healthy_series_raises_nothing() {
        let summary = replay(&healthy(500), None, &MonitorConfig::default(), &MetricsConfig::default());
        assert!(summary.alerts.is_empty());
        assert_eq!(summary.healthy, 500);
        assert_eq!(summary.final_status, MonitorStatus::Healthy);
    }

    #[test]
    fn crash_goes_critical() {
        let mut m = monitor();
        for r in healthy(200) {
            m.update(r, None);
        }
        let mut worst = MonitorStatus::Healthy;
        for _ in 0..30 {
            worst = worst.max(m.update(-0.02, None).status);
        }
        assert_eq!(worst, MonitorStatus::Critical);
        let summary = m.summary();
        assert!(summary.alert_counts.contains_key(&AlertKind::Drawdown));
        assert!(summary.critical > 0);
    }

    #[test]
    fn single_breach_is_warning() {
        let alerts = vec![Alert {
            index: 0,
            kind: AlertKind::LowSharpe,
            value: -0.5,
            threshold: 0.0,
        }];
        assert_eq!(classify(&alerts), MonitorStatus::Warning);
        let dd = vec![Alert {
            kind: AlertKind::Drawdown,
            ..alerts[0].clone()
        }];
        assert_eq!(classify(&dd), MonitorStatus::Critical);
        assert_eq!(classify(&[]), MonitorStatus::Healthy);
    }

    #[test]
    fn wrong_predictions_flag_accuracy() {
        let r = healthy(300);
        let preds: Vec<f64> = r.iter().map(|x| -x).collect();
        let signal = Some((preds.as_slice(), r.as_slice()));
        let summary = replay(&r, signal, &MonitorConfig::default(), &MetricsConfig::default());
        assert!(summary.alert_counts.get(&AlertKind::LowAccuracy).copied().unwrap_or(0) > 0);
        assert!(!summary.alert_counts.contains_key(&AlertKind::LowSharpe));
    }

    #[test]
    fn correct_short_calls_are_accurate() {
        // Falling market called perfectly: the strategy earns |r| every bar
        // while predictions and market returns share their sign.
        let market: Vec<f64> = (0..300)
            .map(|i| if i % 4 == 3 { 0.002 } else { -0.004 })
            .collect();
        let preds = market.clone();
        let strategy: Vec<f64> = market.iter().map(|r| r.abs()).collect();
        let summary = replay(
            &strategy,
            Some((preds.as_slice(), market.as_slice())),
            &MonitorConfig::default(),
            &MetricsConfig::default(),
        );
        assert!(!summary.alert_counts.contains_key(&AlertKind::LowAccuracy));
        assert_eq!(summary.final_status, MonitorStatus::Healthy);
    }

    #[test]
    fn accuracy_is_scored_against_market_not_strategy() {
        let config = MonitorConfig {
            baseline_window: 5,
            window: 5,
            ..MonitorConfig::default()
        };
        let mut m = RobustnessMonitor::new(config, MetricsConfig::default());
        let mut flagged = false;
        for _ in 0..20 {
            // Long call on a falling bar. The strategy return agrees with
            // the call, so only the market return reveals the miss.
            let u = m.update(0.001, Some((1.0, -0.01)));
            flagged |= u.alerts.iter().any(|a| a.kind == AlertKind::LowAccuracy);
        }
        assert!(flagged);
    }

    #[test]
    fn with_baseline_checks_immediately() {
        let config = MonitorConfig {
            window: 10,
            ..MonitorConfig::default()
        };
        let mut m = RobustnessMonitor::with_baseline(config, MetricsConfig::default(), &healthy(100));
        let mut alerted = false;
        for i in 0..10 {
            let r = if i % 2 == 0 { -0.02 } else { 0.005 };
            alerted |= !m.update(r, None).alerts.is_empty();
        }
        assert!(alerted);
    }

    #[test]
    fn rebaseline_resets_drawdown() {
        let mut m = monitor();
        for r in healthy(150) {
            m.update(r, None);
        }
        for _ in 0..20 {
            m.update(-0.02, None);
        }
        assert!(m.drawdown() < -0.2);
        m.rebaseline();
        assert_eq!(m.drawdown(), 0.0);
        assert_eq!(m.summary().rebaselines, 1);
    }
}
