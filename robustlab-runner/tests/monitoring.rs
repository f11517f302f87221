//! Monitor and adaptive system replays on injected market events.

use robustlab_core::{MetricsConfig, SyntheticConfig};
use robustlab_runner::adaptive::{AdaptiveConfig, AdaptiveSystem};
use robustlab_runner::monitor::{
    replay, AlertKind, MonitorConfig, MonitorStatus, RobustnessMonitor,
};
use robustlab_runner::synthetic_dataset;

fn steady(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| match i % 4 {
            0 => 0.006,
            1 => -0.003,
            2 => 0.004,
            _ => -0.002,
        })
        .collect()
}

#[test]
fn stationary_series_stays_healthy() {
    let summary = replay(
        &steady(1000),
        None,
        &MonitorConfig::default(),
        &MetricsConfig::default(),
    );
    assert!(summary.alerts.is_empty());
    assert_eq!(summary.final_status, MonitorStatus::Healthy);
    assert_eq!(summary.healthy, 1000);
}

#[test]
fn injected_crash_goes_critical() {
    let mut r = steady(300);
    r.extend(std::iter::repeat(-0.025).take(25));
    r.extend(steady(400));

    let mut monitor = RobustnessMonitor::new(MonitorConfig::default(), MetricsConfig::default());
    let statuses: Vec<MonitorStatus> = r.iter().map(|x| monitor.update(*x, None).status).collect();

    assert!(statuses[..300].iter().all(|s| *s == MonitorStatus::Healthy));
    assert!(statuses[300..330].contains(&MonitorStatus::Critical));
    let summary = monitor.summary();
    assert!(summary.alert_counts.contains_key(&AlertKind::Drawdown));
    assert!(summary.alert_counts.contains_key(&AlertKind::LowSharpe));
}

#[test]
fn adaptive_system_limits_crash_damage() {
    let mut r = steady(300);
    r.extend(std::iter::repeat(-0.025).take(60));
    r.extend(steady(200));

    let run = AdaptiveSystem::new(
        AdaptiveConfig::default(),
        MonitorConfig::default(),
        MetricsConfig::default(),
    )
    .run(&r, None)
    .unwrap();

    assert_eq!(run.adapted_returns.len(), r.len());
    assert!(run.adapted_metrics.max_drawdown() > run.baseline_metrics.max_drawdown());
    assert!(!run.retrain_points.is_empty());
    for (i, (e, a)) in run.exposures.iter().zip(&run.adapted_returns).enumerate() {
        assert!((e * r[i] - a).abs() < 1e-15);
    }
}

#[test]
fn synthetic_replay_runs_to_completion() {
    let dataset = synthetic_dataset(&SyntheticConfig::default()).unwrap();
    let summary = replay(
        &dataset.returns,
        None,
        &MonitorConfig::default(),
        &MetricsConfig::default(),
    );
    assert_eq!(summary.observations, dataset.len());
    assert_eq!(summary.healthy + summary.warning + summary.critical, dataset.len());
}
