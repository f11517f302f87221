//! RobustLab Core — statistics and metrics for judging trading-model robustness.
//!
//! This crate contains the pure building blocks:
//! - Descriptive statistics over return series
//! - Return, risk, efficiency and predictive metrics
//! - Bars, return/wealth conversions and content hashes
//! - Deterministic RNG hierarchy and synthetic market data
//! - Baseline predictors and prediction-driven strategy returns

pub mod domain;
pub mod error;
pub mod metrics;
pub mod predictor;
pub mod rng;
pub mod stats;
pub mod synthetic;

pub use error::MetricsError;
pub use metrics::{
    EfficiencyMetrics, MetricsConfig, PerformanceMetrics, PredictiveMetrics, ReturnMetrics,
    RiskMetrics,
};
pub use predictor::{Predictor, PredictorKind};
pub use rng::RngHierarchy;
pub use synthetic::{generate_bars, RegimeSegment, SyntheticConfig};
