//! Config files and CSV datasets on disk.

use std::io::Write;

use robustlab_core::{generate_bars, PredictorKind, SyntheticConfig};
use robustlab_runner::config::{ConfigError, RobustnessConfig};
use robustlab_runner::data_loader::{load_csv, write_bars_csv, DataSource, LoadError};
use robustlab_runner::stress::StressScenario;

#[test]
fn config_file_loads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
seed = 11

[metrics]
periods_per_year = 52.0
var_confidence = 0.99

[strategy.predictor]
type = "momentum"
lookback = 4

[walk_forward]
n_folds = 3

[[stress.scenarios]]
type = "volatility_spike"
multiplier = 2.5

[[stress.scenarios]]
type = "signal_degradation"
flip_probability = 0.2

[monitor]
max_drawdown = 0.1
"#
    )
    .unwrap();

    let config = RobustnessConfig::from_file(file.path()).unwrap();
    assert_eq!(config.seed, 11);
    assert_eq!(config.metrics.periods_per_year, 52.0);
    assert_eq!(config.strategy.predictor, PredictorKind::Momentum { lookback: 4 });
    assert_eq!(config.walk_forward.n_folds, 3);
    assert_eq!(config.walk_forward.min_in_sample, 252);
    assert_eq!(config.stress.scenarios.len(), 2);
    assert_eq!(
        config.stress.scenarios[0],
        StressScenario::VolatilitySpike { multiplier: 2.5 }
    );
    assert_eq!(config.monitor.max_drawdown, 0.1);
    assert_eq!(config.monitor.window, 63);
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RobustnessConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn zero_lookback_is_rejected() {
    let err = RobustnessConfig::from_toml(
        "[strategy.predictor]\ntype = \"momentum\"\nlookback = 0\n",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "strategy.predictor.lookback",
            ..
        }
    ));
}

#[test]
fn written_bars_load_back_as_returns() {
    let bars = generate_bars(&SyntheticConfig {
        n_bars: 120,
        seed: 5,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    write_bars_csv(&path, &bars).unwrap();

    let dataset = load_csv(&path).unwrap();
    assert_eq!(dataset.len(), 119);
    assert_eq!(dataset.dates[0], bars[1].date);
    assert_eq!(dataset.source, DataSource::Csv { path: path.clone() });
    let expected = bars[1].close / bars[0].close - 1.0;
    assert!((dataset.returns[0] - expected).abs() < 1e-9);
}

#[test]
fn missing_csv_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn same_file_same_hash() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("r.csv");
    std::fs::write(&path, "date,return\n2024-01-02,0.01\n2024-01-03,-0.005\n").unwrap();
    let a = load_csv(&path).unwrap();
    let b = load_csv(&path).unwrap();
    assert_eq!(a.dataset_hash, b.dataset_hash);
    std::fs::write(&path, "date,return\n2024-01-02,0.01\n2024-01-03,-0.006\n").unwrap();
    assert_ne!(load_csv(&path).unwrap().dataset_hash, a.dataset_hash);
}
