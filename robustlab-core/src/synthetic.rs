//! Synthetic OHLCV generation for development, demos and tests.
//!
//! Prices follow a geometric Brownian motion on weekdays. Optional regime
//! segments scale drift and volatility for stretches of bars, which gives the
//! adaptability and stress analyses something to react to.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum SyntheticError {
    #[error("invalid synthetic config: {0}")]
    InvalidConfig(String),
    #[error("distribution error: {0}")]
    Distribution(String),
}

/// A stretch of bars with scaled drift and volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSegment {
    pub bars: usize,
    pub drift_multiplier: f64,
    pub volatility_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub n_bars: usize,
    pub start_price: f64,
    pub start_date: NaiveDate,
    /// Annualized drift of log prices.
    pub annual_drift: f64,
    pub annual_volatility: f64,
    pub base_volume: u64,
    /// Regime segments, applied in order and cycled. Empty = one constant regime.
    pub regimes: Vec<RegimeSegment>,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_bars: 1008,
            start_price: 100.0,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default(),
            annual_drift: 0.08,
            annual_volatility: 0.18,
            base_volume: 1_000_000,
            regimes: vec![
                RegimeSegment {
                    bars: 252,
                    drift_multiplier: 1.0,
                    volatility_multiplier: 0.8,
                },
                RegimeSegment {
                    bars: 126,
                    drift_multiplier: -1.5,
                    volatility_multiplier: 2.0,
                },
                RegimeSegment {
                    bars: 252,
                    drift_multiplier: 1.2,
                    volatility_multiplier: 1.0,
                },
            ],
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    fn validate(&self) -> Result<(), SyntheticError> {
        if self.n_bars == 0 {
            return Err(SyntheticError::InvalidConfig("n_bars must be > 0".into()));
        }
        if !(self.start_price > 0.0) {
            return Err(SyntheticError::InvalidConfig(
                "start_price must be > 0".into(),
            ));
        }
        if !(self.annual_volatility >= 0.0) {
            return Err(SyntheticError::InvalidConfig(
                "annual_volatility must be >= 0".into(),
            ));
        }
        if self.regimes.iter().any(|r| r.bars == 0 || r.volatility_multiplier < 0.0) {
            return Err(SyntheticError::InvalidConfig(
                "regime segments need bars > 0 and a non-negative volatility multiplier".into(),
            ));
        }
        Ok(())
    }

    /// Drift and volatility multipliers in effect at bar `index`.
    fn multipliers_at(&self, index: usize) -> (f64, f64) {
        let cycle: usize = self.regimes.iter().map(|r| r.bars).sum();
        if cycle == 0 {
            return (1.0, 1.0);
        }
        let mut pos = index % cycle;
        for regime in &self.regimes {
            if pos < regime.bars {
                return (regime.drift_multiplier, regime.volatility_multiplier);
            }
            pos -= regime.bars;
        }
        (1.0, 1.0)
    }
}

/// Generate `n_bars` weekday bars from `config`.
///
/// Output is fully determined by the config (seed included).
pub fn generate_bars(config: &SyntheticConfig) -> Result<Vec<Bar>, SyntheticError> {
    config.validate()?;

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| SyntheticError::Distribution(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let dt = 1.0 / 252.0;
    let mut bars = Vec::with_capacity(config.n_bars);
    let mut price = config.start_price;
    let mut date = next_weekday(config.start_date);

    for i in 0..config.n_bars {
        let (drift_mult, vol_mult) = config.multipliers_at(i);
        let mu = config.annual_drift * drift_mult;
        let sigma = config.annual_volatility * vol_mult;

        let z = normal.sample(&mut rng);
        let log_ret = (mu - 0.5 * sigma * sigma) * dt + sigma * dt.sqrt() * z;
        let daily_ret = log_ret.exp() - 1.0;

        let open = price;
        let close = price * (1.0 + daily_ret);
        let daily_sigma = sigma * dt.sqrt();
        let up = (normal.sample(&mut rng).abs() * daily_sigma * 0.5).min(0.5);
        let down = (normal.sample(&mut rng).abs() * daily_sigma * 0.5).min(0.5);
        let high = open.max(close) * (1.0 + up);
        let low = open.min(close) * (1.0 - down);

        let volume_noise = (0.25 * normal.sample(&mut rng)).exp();
        let volume =
            (config.base_volume as f64 * volume_noise * (1.0 + 10.0 * daily_ret.abs())).round();

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume: volume.max(0.0) as u64,
        });

        price = close;
        date = next_weekday(date + Duration::days(1));
    }

    Ok(bars)
}

fn next_weekday(mut date: NaiveDate) -> NaiveDate {
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SyntheticConfig {
        SyntheticConfig {
            n_bars: 300,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn generates_requested_length() {
        let bars = generate_bars(&small_config()).unwrap();
        assert_eq!(bars.len(), 300);
    }

    #[test]
    fn all_bars_are_sane() {
        let bars = generate_bars(&small_config()).unwrap();
        assert!(bars.iter().all(Bar::is_sane));
    }

    #[test]
    fn skips_weekends_and_increases_dates() {
        let bars = generate_bars(&small_config()).unwrap();
        for w in bars.windows(2) {
            assert!(w[1].date > w[0].date);
        }
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn same_seed_same_bars() {
        let a = generate_bars(&small_config()).unwrap();
        let b = generate_bars(&small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_bars() {
        let a = generate_bars(&small_config()).unwrap();
        let b = generate_bars(&SyntheticConfig {
            seed: 7,
            ..small_config()
        })
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn bars_are_continuous() {
        let bars = generate_bars(&small_config()).unwrap();
        for w in bars.windows(2) {
            assert_eq!(w[1].open, w[0].close);
        }
    }

    #[test]
    fn zero_volatility_is_pure_drift() {
        let cfg = SyntheticConfig {
            n_bars: 10,
            annual_volatility: 0.0,
            regimes: Vec::new(),
            ..SyntheticConfig::default()
        };
        let bars = generate_bars(&cfg).unwrap();
        let expected = (cfg.annual_drift / 252.0).exp() - 1.0;
        for b in &bars {
            assert!(((b.close - b.open) / b.open - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn regime_multipliers_cycle() {
        let cfg = SyntheticConfig::default();
        assert_eq!(cfg.multipliers_at(0), (1.0, 0.8));
        assert_eq!(cfg.multipliers_at(252), (-1.5, 2.0));
        assert_eq!(cfg.multipliers_at(378), (1.2, 1.0));
        assert_eq!(cfg.multipliers_at(630), (1.0, 0.8));
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = SyntheticConfig {
            n_bars: 0,
            ..SyntheticConfig::default()
        };
        assert!(generate_bars(&cfg).is_err());

        let cfg = SyntheticConfig {
            start_price: -1.0,
            ..SyntheticConfig::default()
        };
        assert!(generate_bars(&cfg).is_err());
    }
}
