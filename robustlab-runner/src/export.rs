//! Report export: JSON, rolling-metric CSV and Markdown.
//!
//! Persisted reports carry a `schema_version`; unknown versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use robustlab_core::metrics::risk::drawdown_series;

use crate::adaptability::classify_regimes;
use crate::config::RobustnessConfig;
use crate::report::{RobustnessReport, SCHEMA_VERSION};
use crate::stability::rolling::{align_to_series, rolling_sharpe, rolling_volatility};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &RobustnessReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RobustnessReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RobustnessReport> {
    let report: RobustnessReport =
        serde_json::from_str(json).context("failed to deserialize RobustnessReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── Rolling table ──────────────────────────────────────────────────

/// Per-observation rolling diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingRow {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub rolling_sharpe: Option<f64>,
    pub rolling_volatility: Option<f64>,
    pub drawdown: f64,
    pub regime: &'static str,
}

pub fn rolling_table(
    returns: &[f64],
    dates: &[NaiveDate],
    config: &RobustnessConfig,
) -> Vec<RollingRow> {
    let n = returns.len();
    let ppy = config.metrics.periods_per_year;
    let sharpe = align_to_series(&rolling_sharpe(returns, config.stability.window, &config.metrics), n);
    let vol = align_to_series(&rolling_volatility(returns, config.stability.window, ppy), n);
    let drawdown = drawdown_series(returns);
    let regimes = classify_regimes(
        returns,
        config.adaptability.vol_window,
        config.adaptability.low_quantile,
        config.adaptability.high_quantile,
        ppy,
    );

    (0..n)
        .map(|i| RollingRow {
            index: i,
            date: dates.get(i).copied(),
            rolling_sharpe: sharpe[i],
            rolling_volatility: vol[i],
            drawdown: drawdown[i],
            regime: regimes[i].as_str(),
        })
        .collect()
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Columns: index, date, rolling_sharpe, rolling_volatility, drawdown, regime.
pub fn export_rolling_csv(rows: &[RollingRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "index",
        "date",
        "rolling_sharpe",
        "rolling_volatility",
        "drawdown",
        "regime",
    ])?;
    for row in rows {
        wtr.write_record([
            row.index.to_string(),
            row.date.map(|d| d.to_string()).unwrap_or_default(),
            opt(row.rolling_sharpe),
            opt(row.rolling_volatility),
            format!("{:.6}", row.drawdown),
            row.regime.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_markdown(report: &RobustnessReport) -> String {
    let mut md = String::with_capacity(2048);
    let m = &report.performance;
    let s = &report.score;

    md.push_str("# Robustness Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Observations | {} |\n", report.manifest.observations));
    if let (Some(first), Some(last)) = (report.manifest.first_date, report.manifest.last_date) {
        md.push_str(&format!("| Period | {first} to {last} |\n"));
    }
    md.push_str(&format!("| Run | {} |\n", report.manifest.run_id()));
    md.push_str(&format!("| Signal | {:?} |\n", report.signal));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.manifest.dataset_hash));
    md.push_str(&format!("| Config Hash | {} |\n", report.manifest.config_hash));
    if report.manifest.source.is_synthetic() {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Robustness Score\n\n");
    md.push_str("| Component | Score |\n| --- | --- |\n");
    for (name, value) in [
        ("Performance", s.performance),
        ("Stability", s.stability),
        ("Adaptability", s.adaptability),
        ("Stress", s.stress),
        ("Confidence", s.confidence),
    ] {
        md.push_str(&format!("| {name} | {value:.2} |\n"));
    }
    md.push_str(&format!("| **Overall** | **{:.2} ({:?})** |\n\n", s.overall, s.grade));

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return() * 100.0));
    md.push_str(&format!("| CAGR | {:.2}% |\n", m.returns.cagr * 100.0));
    md.push_str(&format!("| Volatility | {:.2}% |\n", m.risk.volatility * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe()));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.efficiency.sortino));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.efficiency.calmar));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown() * 100.0));
    md.push_str(&format!(
        "| VaR / CVaR ({:.0}%) | {:.2}% / {:.2}% |\n",
        m.risk.var_confidence * 100.0,
        m.risk.var * 100.0,
        m.risk.cvar * 100.0
    ));
    if let Some(p) = &report.predictive {
        md.push_str(&format!(
            "| Directional Accuracy | {:.1}% |\n",
            p.directional_accuracy * 100.0
        ));
        md.push_str(&format!("| Information Coefficient | {:.3} |\n", p.information_coefficient));
    }
    md.push('\n');

    md.push_str("## Stress Scenarios\n\n");
    md.push_str("| Scenario | Sharpe | Max DD | Survived |\n| --- | --- | --- | --- |\n");
    for r in &report.stress.scenarios {
        md.push_str(&format!(
            "| {} | {:.3} | {:.2}% | {} |\n",
            r.name,
            r.sharpe,
            r.max_drawdown * 100.0,
            if r.survived { "yes" } else { "no" }
        ));
    }
    md.push('\n');

    if !report.notes.is_empty() {
        md.push_str("## Notes\n\n");
        for note in &report.notes {
            md.push_str(&format!("- {note}\n"));
        }
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a report: config and dataset hash prefixes.
pub fn run_dir_name(report: &RobustnessReport) -> String {
    format!(
        "{}_{}",
        report.manifest.config_hash.short(8),
        report.manifest.dataset_hash.short(8)
    )
}

/// Save `report.json`, `rolling.csv` and `report.md` under `output_dir`.
///
/// Returns the created run directory.
pub fn save_report(
    report: &RobustnessReport,
    rolling: &[RollingRow],
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(run_dir_name(report));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("rolling.csv"), export_rolling_csv(rolling)?)?;
    std::fs::write(run_dir.join("report.md"), generate_markdown(report))?;

    Ok(run_dir)
}

pub fn load_report(dir: &Path) -> Result<RobustnessReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
