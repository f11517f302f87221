//! Analysis configuration loaded from TOML.
//!
//! Every section is optional; missing sections and fields take their defaults.
//!
//! ```toml
//! seed = 42
//!
//! [metrics]
//! periods_per_year = 252
//!
//! [strategy.predictor]
//! type = "momentum"
//! lookback = 20
//!
//! [[stress.scenarios]]
//! type = "market_crash"
//! magnitude = 0.3
//! duration = 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use robustlab_core::domain::ConfigHash;
use robustlab_core::{MetricsConfig, PredictorKind, SyntheticConfig};

use crate::adaptability::AdaptabilityConfig;
use crate::adaptive::AdaptiveConfig;
use crate::bootstrap::BootstrapConfig;
use crate::monitor::MonitorConfig;
use crate::stability::StabilityConfig;
use crate::stress::{StressConfig, StressScenario};
use crate::walk_forward::WalkForwardConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How the analyzed strategy is obtained from the data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Baseline predictor run over the returns when the data carries no predictions.
    pub predictor: PredictorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustnessConfig {
    /// Master seed for every random draw in the analysis.
    pub seed: u64,
    pub metrics: MetricsConfig,
    pub strategy: StrategyConfig,
    pub stability: StabilityConfig,
    pub adaptability: AdaptabilityConfig,
    pub walk_forward: WalkForwardConfig,
    pub bootstrap: BootstrapConfig,
    pub stress: StressConfig,
    pub monitor: MonitorConfig,
    pub adaptive: AdaptiveConfig,
    /// Synthetic data settings used by `--synthetic`.
    pub synthetic: SyntheticConfig,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            metrics: MetricsConfig::default(),
            strategy: StrategyConfig::default(),
            stability: StabilityConfig::default(),
            adaptability: AdaptabilityConfig::default(),
            walk_forward: WalkForwardConfig::default(),
            bootstrap: BootstrapConfig::default(),
            stress: StressConfig::default(),
            monitor: MonitorConfig::default(),
            adaptive: AdaptiveConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be in [0, 1], got {value}")))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and non-negative, got {value}")))
    }
}

/// Scenario parameters are checked per field; the reason names the scenario.
fn check_scenario(index: usize, scenario: &StressScenario) -> Result<(), ConfigError> {
    let at = |field: &'static str, reason: String| {
        invalid(field, format!("scenario {index}: {reason}"))
    };
    let loss = |field: &'static str, value: f64| {
        if (0.0..1.0).contains(&value) {
            Ok(())
        } else {
            Err(at(field, format!("must be in [0, 1), got {value}")))
        }
    };
    let unit = |field: &'static str, value: f64| {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(at(field, format!("must be in [0, 1], got {value}")))
        }
    };
    let non_negative = |field: &'static str, value: f64| {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(at(field, format!("must be finite and non-negative, got {value}")))
        }
    };

    match *scenario {
        StressScenario::MarketCrash {
            magnitude,
            duration,
        } => {
            loss("stress.scenarios.magnitude", magnitude)?;
            if duration == 0 {
                return Err(at("stress.scenarios.duration", "must be positive".to_string()));
            }
            Ok(())
        }
        StressScenario::FlashCrash { magnitude } => loss("stress.scenarios.magnitude", magnitude),
        StressScenario::VolatilitySpike { multiplier } => {
            non_negative("stress.scenarios.multiplier", multiplier)
        }
        StressScenario::DriftShift { annual_drift } => {
            if annual_drift.is_finite() {
                Ok(())
            } else {
                Err(at("stress.scenarios.annual_drift", "must be finite".to_string()))
            }
        }
        StressScenario::NoiseInjection { std_dev } => {
            non_negative("stress.scenarios.std_dev", std_dev)
        }
        StressScenario::DataGaps { fraction } => unit("stress.scenarios.fraction", fraction),
        StressScenario::SignalDegradation { flip_probability } => {
            unit("stress.scenarios.flip_probability", flip_probability)
        }
    }
}

impl RobustnessConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metrics
            .validate()
            .map_err(|e| invalid("metrics", e.to_string()))?;

        match self.strategy.predictor {
            PredictorKind::Momentum { lookback } | PredictorKind::MeanReversion { lookback }
                if lookback == 0 =>
            {
                return Err(invalid("strategy.predictor.lookback", "must be positive"));
            }
            _ => {}
        }

        if self.stability.window < 2 {
            return Err(invalid("stability.window", "must be at least 2"));
        }
        if self.stability.n_periods == 0 {
            return Err(invalid("stability.n_periods", "must be positive"));
        }

        if self.adaptability.vol_window < 2 {
            return Err(invalid("adaptability.vol_window", "must be at least 2"));
        }
        check_fraction("adaptability.low_quantile", self.adaptability.low_quantile)?;
        check_fraction("adaptability.high_quantile", self.adaptability.high_quantile)?;
        if self.adaptability.low_quantile >= self.adaptability.high_quantile {
            return Err(invalid(
                "adaptability.low_quantile",
                "must be below high_quantile",
            ));
        }

        if self.walk_forward.n_folds == 0 {
            return Err(invalid("walk_forward.n_folds", "must be positive"));
        }

        if self.bootstrap.n_resamples == 0 {
            return Err(invalid("bootstrap.n_resamples", "must be positive"));
        }
        if self.bootstrap.mean_block_length == 0 {
            return Err(invalid("bootstrap.mean_block_length", "must be positive"));
        }

        check_fraction("stress.max_tolerated_drawdown", self.stress.max_tolerated_drawdown)?;
        for (i, scenario) in self.stress.scenarios.iter().enumerate() {
            check_scenario(i, scenario)?;
        }
        check_non_negative("stress.monte_carlo.noise_std", self.stress.monte_carlo.noise_std)?;
        check_non_negative("stress.monte_carlo.penalty", self.stress.monte_carlo.penalty)?;

        if self.monitor.window < 2 {
            return Err(invalid("monitor.window", "must be at least 2"));
        }
        if self.monitor.baseline_window < 2 {
            return Err(invalid("monitor.baseline_window", "must be at least 2"));
        }
        check_fraction("monitor.min_accuracy", self.monitor.min_accuracy)?;
        check_fraction("monitor.max_drawdown", self.monitor.max_drawdown)?;
        if self.monitor.max_volatility_ratio.is_nan() || self.monitor.max_volatility_ratio <= 0.0 {
            return Err(invalid("monitor.max_volatility_ratio", "must be positive"));
        }

        if self.adaptive.target_volatility <= 0.0 {
            return Err(invalid("adaptive.target_volatility", "must be positive"));
        }
        if self.adaptive.min_exposure < 0.0 || self.adaptive.min_exposure > self.adaptive.max_exposure {
            return Err(invalid(
                "adaptive.min_exposure",
                "must be non-negative and not above max_exposure",
            ));
        }
        if self.adaptive.vol_window < 2 {
            return Err(invalid("adaptive.vol_window", "must be at least 2"));
        }
        check_non_negative("adaptive.warning_scale", self.adaptive.warning_scale)?;
        check_non_negative("adaptive.critical_scale", self.adaptive.critical_scale)?;
        Ok(())
    }

    /// BLAKE3 digest of the canonical JSON form, for reproducibility manifests.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| invalid("config", format!("serialization failed: {e}")))?;
        Ok(ConfigHash::from_bytes(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(toml: &str) -> &'static str {
        match RobustnessConfig::from_toml(toml) {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RobustnessConfig::from_toml("").unwrap();
        assert_eq!(config, RobustnessConfig::default());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config = RobustnessConfig::from_toml(
            r#"
            seed = 7

            [stability]
            window = 21

            [strategy.predictor]
            type = "mean_reversion"
            lookback = 5

            [[stress.scenarios]]
            type = "flash_crash"
            magnitude = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.stability.window, 21);
        assert_eq!(config.stability.n_periods, 4);
        assert_eq!(
            config.strategy.predictor,
            PredictorKind::MeanReversion { lookback: 5 }
        );
        assert_eq!(
            config.stress.scenarios,
            vec![StressScenario::FlashCrash { magnitude: 0.2 }]
        );
        assert_eq!(config.stress.max_tolerated_drawdown, 0.35);
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = RobustnessConfig::from_toml("[adaptability]\nlow_quantile = 0.9\n").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "adaptability.low_quantile"),
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(RobustnessConfig::from_toml("[metrics]\nvar_confidence = 2.0\n").is_err());
    }

    #[test]
    fn out_of_range_scenarios_are_rejected() {
        let cases = [
            (
                "type = \"market_crash\"\nmagnitude = 1.5\nduration = 5",
                "stress.scenarios.magnitude",
            ),
            (
                "type = \"market_crash\"\nmagnitude = 0.3\nduration = 0",
                "stress.scenarios.duration",
            ),
            ("type = \"flash_crash\"\nmagnitude = -0.1", "stress.scenarios.magnitude"),
            ("type = \"volatility_spike\"\nmultiplier = -2.0", "stress.scenarios.multiplier"),
            ("type = \"noise_injection\"\nstd_dev = -0.01", "stress.scenarios.std_dev"),
            ("type = \"data_gaps\"\nfraction = 1.2", "stress.scenarios.fraction"),
            (
                "type = \"signal_degradation\"\nflip_probability = 2.0",
                "stress.scenarios.flip_probability",
            ),
        ];
        for (scenario, field) in cases {
            let toml = format!("[[stress.scenarios]]\n{scenario}\n");
            assert_eq!(invalid_field(&toml), field, "{scenario}");
        }
    }

    #[test]
    fn scenario_error_names_its_position() {
        let err = RobustnessConfig::from_toml(
            r#"
            [[stress.scenarios]]
            type = "flash_crash"
            magnitude = 0.2

            [[stress.scenarios]]
            type = "data_gaps"
            fraction = 3.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("scenario 1"), "{err}");
    }

    #[test]
    fn monitor_and_adaptive_limits_are_checked() {
        assert_eq!(invalid_field("[monitor]\nmax_drawdown = 1.5\n"), "monitor.max_drawdown");
        assert_eq!(
            invalid_field("[monitor]\nmax_volatility_ratio = 0.0\n"),
            "monitor.max_volatility_ratio"
        );
        assert_eq!(invalid_field("[adaptive]\nvol_window = 1\n"), "adaptive.vol_window");
        assert_eq!(invalid_field("[adaptive]\nwarning_scale = -0.5\n"), "adaptive.warning_scale");
        assert_eq!(invalid_field("[adaptive]\ncritical_scale = -1.0\n"), "adaptive.critical_scale");
        assert_eq!(
            invalid_field("[stress.monte_carlo]\npenalty = -1.0\n"),
            "stress.monte_carlo.penalty"
        );
    }

    #[test]
    fn zero_trials_disable_monte_carlo() {
        let config = RobustnessConfig::from_toml("[stress.monte_carlo]\ntrials = 0\n").unwrap();
        assert_eq!(config.stress.monte_carlo.trials, 0);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            RobustnessConfig::from_toml("seed = \"nope\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn hash_tracks_content() {
        let a = RobustnessConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.seed = 43;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
