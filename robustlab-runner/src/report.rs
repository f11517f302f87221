//! End-to-end robustness evaluation.
//!
//! [`evaluate`] resolves the analyzed return series, runs every analysis and
//! folds the results into a [`RobustnessScore`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use robustlab_core::domain::{ConfigHash, DatasetHash, RunId};
use robustlab_core::error::validate_series;
use robustlab_core::metrics::efficiency::information_ratio;
use robustlab_core::predictor::{generate_predictions, strategy_returns, Predictor};
use robustlab_core::stats::mean;
use robustlab_core::{MetricsError, PerformanceMetrics, PredictiveMetrics, RngHierarchy};

use crate::adaptability::AdaptabilityMetrics;
use crate::adaptive::{AdaptiveRun, AdaptiveSystem};
use crate::bootstrap::{stationary_block_bootstrap, BootstrapError, BootstrapResult};
use crate::config::{ConfigError, RobustnessConfig};
use crate::data_loader::{DataSource, Dataset};
use crate::monitor::{replay, MonitorSummary};
use crate::stability::StabilityMetrics;
use crate::stress::{run_stress_tests, SignalSource, StressError, StressReport};
use crate::walk_forward::{run_walk_forward, WalkForwardError, WalkForwardResult};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("walk-forward error: {0}")]
    WalkForward(#[from] WalkForwardError),
    #[error("bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("stress error: {0}")]
    Stress(#[from] StressError),
}

// ─── Report types ────────────────────────────────────────────────────

/// What produced the analyzed return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalKind {
    /// Market returns analyzed as-is.
    Passive,
    /// Predictions supplied with the data.
    DataPredictions,
    /// Predictions from a configured baseline predictor.
    Predictor { name: String },
}

/// Reproducibility record for a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub source: DataSource,
    pub seed: u64,
    pub observations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn run_id(&self) -> RunId {
        RunId::new(self.config_hash.clone(), self.dataset_hash.clone(), self.seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobustnessGrade {
    Robust,
    Moderate,
    Fragile,
}

impl RobustnessGrade {
    pub fn from_score(overall: f64) -> Self {
        if overall >= 0.7 {
            Self::Robust
        } else if overall >= 0.4 {
            Self::Moderate
        } else {
            Self::Fragile
        }
    }
}

/// Component scores in [0, 1] and their weighted aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessScore {
    pub performance: f64,
    pub stability: f64,
    pub adaptability: f64,
    pub stress: f64,
    pub confidence: f64,
    pub overall: f64,
    pub grade: RobustnessGrade,
}

const WEIGHTS: [f64; 5] = [0.25, 0.20, 0.15, 0.20, 0.20];

impl RobustnessScore {
    pub fn new(
        performance: f64,
        stability: f64,
        adaptability: f64,
        stress: f64,
        confidence: f64,
    ) -> Self {
        let parts = [performance, stability, adaptability, stress, confidence];
        let overall: f64 = parts
            .iter()
            .zip(WEIGHTS)
            .map(|(p, w)| p.clamp(0.0, 1.0) * w)
            .sum();
        Self {
            performance,
            stability,
            adaptability,
            stress,
            confidence,
            overall,
            grade: RobustnessGrade::from_score(overall),
        }
    }
}

/// Performance mapped onto [0, 1]: Sharpe of 2 or better with no drawdown scores 1.
pub fn performance_score(metrics: &PerformanceMetrics) -> f64 {
    let sharpe = ((metrics.sharpe() + 0.5) / 2.5).clamp(0.0, 1.0);
    let drawdown = (1.0 + metrics.max_drawdown()).clamp(0.0, 1.0);
    mean(&[sharpe, drawdown])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub schema_version: u32,
    pub manifest: Manifest,
    pub signal: SignalKind,
    /// Analyses that were skipped and why.
    pub notes: Vec<String>,
    pub performance: PerformanceMetrics,
    /// Strategy against the underlying market; `None` for passive analysis.
    pub information_ratio: Option<f64>,
    pub predictive: Option<PredictiveMetrics>,
    pub stability: StabilityMetrics,
    pub adaptability: AdaptabilityMetrics,
    pub walk_forward: Option<WalkForwardResult>,
    pub bootstrap: BootstrapResult,
    pub stress: StressReport,
    pub adaptive: AdaptiveRun,
    pub monitor: MonitorSummary,
    pub score: RobustnessScore,
    /// The series every analysis ran on.
    #[serde(skip)]
    pub analyzed_returns: Vec<f64>,
}

// ─── Signal resolution ───────────────────────────────────────────────

/// The series an analysis runs on, derived from the dataset and predictor.
#[derive(Clone)]
pub struct ResolvedSignal<'a> {
    pub kind: SignalKind,
    pub source: SignalSource<'a>,
    /// Per-bar predictions, absent for a passive analysis.
    pub predictions: Option<Vec<f64>>,
    /// Strategy returns, or the market returns when passive.
    pub analyzed: Vec<f64>,
    pub notes: Vec<String>,
}

impl ResolvedSignal<'_> {
    /// `(predictions, market)` pairs for prediction-aware consumers.
    pub fn pairs<'s>(&'s self, market: &'s [f64]) -> Option<(&'s [f64], &'s [f64])> {
        self.predictions.as_deref().map(|p| (p, market))
    }
}

/// Dataset predictions take precedence over a configured predictor; with
/// neither the market itself is analyzed.
pub fn resolve_signal<'a>(
    dataset: &'a Dataset,
    predictor: Option<&'a dyn Predictor>,
) -> Result<ResolvedSignal<'a>, MetricsError> {
    let market = dataset.returns.as_slice();
    let mut notes = Vec::new();
    let (kind, source) = match (&dataset.predictions, predictor) {
        (Some(p), _) => {
            if p.len() != market.len() {
                return Err(MetricsError::LengthMismatch {
                    left: p.len(),
                    right: market.len(),
                });
            }
            if predictor.is_some() {
                notes.push("data carries predictions; configured predictor ignored".to_string());
            }
            (SignalKind::DataPredictions, SignalSource::Fixed(p))
        }
        (None, Some(model)) => (
            SignalKind::Predictor {
                name: model.name().to_string(),
            },
            SignalSource::Model(model),
        ),
        (None, None) => (SignalKind::Passive, SignalSource::Passive),
    };
    let predictions = match source {
        SignalSource::Passive => None,
        SignalSource::Fixed(p) => Some(p.to_vec()),
        SignalSource::Model(m) => Some(generate_predictions(m, market)),
    };
    let analyzed = match &predictions {
        Some(p) => strategy_returns(market, p),
        None => market.to_vec(),
    };
    Ok(ResolvedSignal {
        kind,
        source,
        predictions,
        analyzed,
        notes,
    })
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Run the full robustness analysis over `dataset`.
pub fn evaluate(
    dataset: &Dataset,
    config: &RobustnessConfig,
) -> Result<RobustnessReport, AnalysisError> {
    config.validate()?;
    validate_series(&dataset.returns)?;
    let market = dataset.returns.as_slice();
    let metrics = &config.metrics;
    let rng = RngHierarchy::new(config.seed);

    // 1. signal
    let predictor = config.strategy.predictor.build();
    let ResolvedSignal {
        kind: signal,
        source,
        predictions,
        analyzed,
        mut notes,
    } = resolve_signal(dataset, predictor.as_deref())?;
    info!(
        observations = analyzed.len(),
        signal = ?signal,
        dataset = dataset.dataset_hash.short(12),
        "starting robustness evaluation"
    );
    if dataset.source.is_synthetic() {
        warn!("evaluating synthetic data");
    }

    // 2. performance and prediction quality
    let performance = PerformanceMetrics::compute(&analyzed, metrics)?;
    let information_ratio = predictions
        .as_ref()
        .map(|_| information_ratio(&analyzed, market, metrics.periods_per_year));
    let predictive = predictions
        .as_deref()
        .map(|p| PredictiveMetrics::compute(p, market))
        .transpose()?;
    info!(
        sharpe = performance.sharpe(),
        max_drawdown = performance.max_drawdown(),
        "performance computed"
    );

    // 3. robustness analyses
    let stability = StabilityMetrics::compute(&analyzed, &config.stability, metrics);
    let adaptability = AdaptabilityMetrics::compute(&analyzed, &config.adaptability, metrics);
    info!(
        stability = stability.sharpe_score.score,
        regime_transitions = adaptability.regime_transitions,
        "stability and adaptability computed"
    );

    let pairs = predictions.as_deref().map(|p| (p, market));
    let walk_forward = match run_walk_forward(&analyzed, pairs, &config.walk_forward, metrics) {
        Ok(wf) => {
            info!(
                folds = wf.folds.len(),
                mean_oos_sharpe = wf.mean_oos_sharpe,
                flag = ?wf.degradation_flag,
                "walk-forward complete"
            );
            Some(wf)
        }
        Err(
            e @ (WalkForwardError::InsufficientData { .. }
            | WalkForwardError::FoldCreationFailed { .. }),
        ) => {
            info!(reason = %e, "walk-forward skipped");
            notes.push(format!("walk-forward skipped: {e}"));
            None
        }
        Err(e) => return Err(e.into()),
    };

    let bootstrap = stationary_block_bootstrap(&analyzed, &config.bootstrap, metrics, &rng)?;
    info!(grade = ?bootstrap.grade, ci_lower = bootstrap.sharpe_ci_lower, "bootstrap complete");

    let stress = run_stress_tests(market, source, &config.stress, metrics, &rng)?;
    info!(
        scenarios = stress.scenarios.len(),
        survival_rate = stress.survival_rate,
        "stress tests complete"
    );
    notes.extend(stress.skipped.iter().map(|name| {
        format!("stress scenario {name} skipped: no prediction signal to degrade")
    }));

    // 4. live-style replay
    let monitor = replay(&analyzed, pairs, &config.monitor, metrics);
    let adaptive = AdaptiveSystem::new(
        config.adaptive.clone(),
        config.monitor.clone(),
        metrics.clone(),
    )
    .run(&analyzed, pairs)?;
    info!(
        alerts = monitor.alerts.len(),
        retrains = adaptive.retrain_points.len(),
        "monitor replay complete"
    );

    // 5. score
    let confidence = match &walk_forward {
        Some(wf) => mean(&[bootstrap.grade.score(), wf.oos_positive_fraction]),
        None => bootstrap.grade.score(),
    };
    let score = RobustnessScore::new(
        performance_score(&performance),
        stability.normalized_score(),
        adaptability.normalized_score(),
        stress.normalized_score(),
        confidence,
    );
    info!(overall = score.overall, grade = ?score.grade, "robustness score");

    let manifest = Manifest {
        config_hash: config.config_hash()?,
        dataset_hash: dataset.dataset_hash.clone(),
        source: dataset.source.clone(),
        seed: config.seed,
        observations: analyzed.len(),
        first_date: dataset.dates.first().copied(),
        last_date: dataset.dates.last().copied(),
        generated_at: Utc::now(),
    };

    Ok(RobustnessReport {
        schema_version: SCHEMA_VERSION,
        manifest,
        signal,
        notes,
        performance,
        information_ratio,
        predictive,
        stability,
        adaptability,
        walk_forward,
        bootstrap,
        stress,
        adaptive,
        monitor,
        score,
        analyzed_returns: analyzed,
    })
}
