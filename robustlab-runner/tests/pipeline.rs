//! End-to-end robustness evaluation on synthetic and CSV data.

use robustlab_core::{PredictorKind, SyntheticConfig};
use robustlab_runner::bootstrap::ConfidenceGrade;
use robustlab_runner::config::RobustnessConfig;
use robustlab_runner::data_loader::{read_csv, synthetic_dataset, DataSource};
use robustlab_runner::export::{export_json, import_json, load_report, rolling_table, save_report};
use robustlab_runner::monitor::AlertKind;
use robustlab_runner::report::{evaluate, SignalKind};

fn fast_config() -> RobustnessConfig {
    let mut config = RobustnessConfig::default();
    config.bootstrap.n_resamples = 200;
    config.stress.monte_carlo.trials = 40;
    config
}

#[test]
fn synthetic_passive_report_is_complete() {
    let config = fast_config();
    let dataset = synthetic_dataset(&config.synthetic).unwrap();
    let report = evaluate(&dataset, &config).unwrap();

    assert_eq!(report.signal, SignalKind::Passive);
    assert_eq!(report.manifest.observations, dataset.len());
    assert!(report.manifest.source.is_synthetic());
    assert!(report.predictive.is_none());
    assert!(report.information_ratio.is_none());
    assert!(report.walk_forward.is_some());
    assert_ne!(report.bootstrap.grade, ConfidenceGrade::Insufficient);
    assert_eq!(
        report.stress.scenarios.len() + report.stress.skipped.len(),
        config.stress.scenarios.len()
    );
    assert_eq!(report.stress.skipped.len(), 1);
    assert!(report.stress.skipped[0].starts_with("signal_degradation"));
    assert!(report.notes.iter().any(|n| n.contains("signal_degradation")));
    assert_eq!(report.stress.monte_carlo.as_ref().unwrap().trials, 40);
    assert_eq!(report.adaptive.exposures.len(), dataset.len());
    assert_eq!(report.monitor.observations, dataset.len());
    assert!(report.performance.max_drawdown() <= 0.0);

    let s = &report.score;
    for v in [s.performance, s.stability, s.adaptability, s.stress, s.confidence, s.overall] {
        assert!((0.0..=1.0).contains(&v), "score component out of range: {v}");
    }
}

#[test]
fn evaluation_is_reproducible() {
    let config = fast_config();
    let dataset = synthetic_dataset(&config.synthetic).unwrap();
    let a = evaluate(&dataset, &config).unwrap();
    let b = evaluate(&dataset, &config).unwrap();
    assert_eq!(a.score, b.score);
    assert_eq!(a.bootstrap, b.bootstrap);
    assert_eq!(a.stress, b.stress);
    assert_eq!(a.manifest.config_hash, b.manifest.config_hash);
}

#[test]
fn predictor_drives_strategy_returns() {
    let mut config = fast_config();
    config.strategy.predictor = PredictorKind::Momentum { lookback: 10 };
    let dataset = synthetic_dataset(&config.synthetic).unwrap();
    let report = evaluate(&dataset, &config).unwrap();

    assert_eq!(
        report.signal,
        SignalKind::Predictor {
            name: "momentum".to_string()
        }
    );
    let predictive = report.predictive.as_ref().unwrap();
    assert_eq!(predictive.observations, dataset.len());
    assert!((0.0..=1.0).contains(&predictive.directional_accuracy));
    assert!(report.information_ratio.is_some());
    assert!(report
        .walk_forward
        .as_ref()
        .unwrap()
        .mean_oos_accuracy
        .is_some());
}

#[test]
fn short_series_skips_walk_forward_with_note() {
    let mut config = fast_config();
    config.synthetic = SyntheticConfig {
        n_bars: 200,
        ..SyntheticConfig::default()
    };
    let dataset = synthetic_dataset(&config.synthetic).unwrap();
    let report = evaluate(&dataset, &config).unwrap();

    assert!(report.walk_forward.is_none());
    assert!(report.notes.iter().any(|n| n.contains("walk-forward")));
    assert_eq!(report.bootstrap.grade, ConfidenceGrade::Insufficient);
}

#[test]
fn csv_predictions_are_used() {
    let mut csv = String::from("date,return,prediction\n");
    let start = chrono::NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    for i in 0..300 {
        let r = if i % 3 == 0 { -0.004 } else { 0.006 };
        let p = if i % 5 == 0 { -r } else { r };
        let date = start + chrono::Duration::days(i);
        csv.push_str(&format!("{date},{r},{p}\n"));
    }
    let source = DataSource::Csv {
        path: "inline.csv".into(),
    };
    let dataset = read_csv(csv.as_bytes(), source).unwrap();
    let report = evaluate(&dataset, &fast_config()).unwrap();

    assert_eq!(report.signal, SignalKind::DataPredictions);
    let acc = report.predictive.as_ref().unwrap().directional_accuracy;
    assert!((acc - 0.8).abs() < 1e-12);
}

#[test]
fn correct_short_calls_raise_no_accuracy_alerts() {
    // Mostly falling market, every call right including the shorts.
    let mut csv = String::from("date,return,prediction\n");
    let start = chrono::NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    for i in 0..400 {
        let r = if i % 4 == 3 { 0.002 } else { -0.004 };
        let date = start + chrono::Duration::days(i);
        csv.push_str(&format!("{date},{r},{r}\n"));
    }
    let source = DataSource::Csv {
        path: "falling.csv".into(),
    };
    let dataset = read_csv(csv.as_bytes(), source).unwrap();
    let report = evaluate(&dataset, &fast_config()).unwrap();

    let acc = report.predictive.as_ref().unwrap().directional_accuracy;
    assert!((acc - 1.0).abs() < 1e-12);
    assert!(!report.monitor.alert_counts.contains_key(&AlertKind::LowAccuracy));
    assert!(!report
        .adaptive
        .monitor
        .alert_counts
        .contains_key(&AlertKind::LowAccuracy));
    assert!(report.stress.skipped.is_empty());
}

#[test]
fn artifacts_round_trip() {
    let config = fast_config();
    let dataset = synthetic_dataset(&SyntheticConfig {
        n_bars: 600,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let report = evaluate(&dataset, &config).unwrap();
    let rows = rolling_table(&report.analyzed_returns, &dataset.dates, &config);

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_report(&report, &rows, dir.path()).unwrap();
    assert!(run_dir.join("report.json").exists());
    assert!(run_dir.join("report.md").exists());

    let rolling = std::fs::read_to_string(run_dir.join("rolling.csv")).unwrap();
    assert_eq!(rolling.lines().count(), dataset.len() + 1);

    let loaded = load_report(&run_dir).unwrap();
    assert_eq!(loaded.manifest, report.manifest);
    assert_eq!(loaded.score.grade, report.score.grade);
    assert!(loaded.analyzed_returns.is_empty());
}

#[test]
fn future_schema_is_rejected() {
    let config = fast_config();
    let dataset = synthetic_dataset(&SyntheticConfig {
        n_bars: 300,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let mut report = evaluate(&dataset, &config).unwrap();
    report.schema_version = 99;
    let json = export_json(&report).unwrap();
    let err = import_json(&json).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}
