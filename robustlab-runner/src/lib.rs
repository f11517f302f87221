//! RobustLab Runner — robustness analyses, monitoring and reporting.
//!
//! This crate builds on `robustlab-core` to provide:
//! - CSV and synthetic data loading
//! - TOML analysis configuration
//! - Stability (rolling windows, stability scores) and adaptability (regimes, recovery)
//! - Walk-forward validation and block bootstrap confidence grading
//! - Stress scenarios and Monte Carlo noise trials
//! - Streaming robustness monitor and adaptive exposure control
//! - Aggregate robustness report and artifact export

pub mod adaptability;
pub mod adaptive;
pub mod bootstrap;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod monitor;
pub mod report;
pub mod stability;
pub mod stress;
pub mod walk_forward;

pub use adaptability::{AdaptabilityConfig, AdaptabilityMetrics, DrawdownEpisode, VolatilityRegime};
pub use adaptive::{AdaptiveConfig, AdaptiveRun, AdaptiveSystem};
pub use bootstrap::{stationary_block_bootstrap, BootstrapConfig, BootstrapResult, ConfidenceGrade};
pub use config::{ConfigError, RobustnessConfig};
pub use data_loader::{load_csv, synthetic_dataset, DataSource, Dataset, LoadError};
pub use export::{rolling_table, save_report};
pub use monitor::{Alert, AlertKind, MonitorConfig, MonitorStatus, MonitorSummary, RobustnessMonitor};
pub use report::{
    evaluate, resolve_signal, AnalysisError, RobustnessGrade, RobustnessReport, RobustnessScore,
};
pub use stability::{MetricDistribution, StabilityConfig, StabilityMetrics, StabilityScore};
pub use stress::{StressConfig, StressReport, StressScenario};
pub use walk_forward::{DegradationFlag, TTestResult, WalkForwardConfig, WalkForwardResult};
