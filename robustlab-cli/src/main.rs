//! RobustLab CLI — synthetic data, robustness analysis, stress and monitor commands.
//!
//! Commands:
//! - `synth` — write a synthetic OHLCV CSV
//! - `analyze` — full robustness report from a CSV file or synthetic data
//! - `stress` — stress scenarios and Monte Carlo trials only
//! - `monitor` — replay the robustness monitor and print its alerts

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use robustlab_core::{generate_bars, RngHierarchy, SyntheticConfig};
use robustlab_runner::data_loader::write_bars_csv;
use robustlab_runner::export::rolling_table;
use robustlab_runner::monitor::replay;
use robustlab_runner::report::resolve_signal;
use robustlab_runner::stress::run_stress_tests;
use robustlab_runner::{
    evaluate, load_csv, save_report, synthetic_dataset, Dataset, MonitorSummary,
    RobustnessConfig, RobustnessReport, StressReport,
};

#[derive(Parser)]
#[command(
    name = "robustlab",
    about = "RobustLab CLI — robustness metrics for ML trading models"
)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write synthetic OHLCV bars as CSV.
    Synth {
        /// Number of bars to generate.
        #[arg(long, default_value_t = 1008)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Run the full robustness analysis and save report artifacts.
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory for report artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run stress scenarios and Monte Carlo trials only.
    Stress {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Replay the robustness monitor over the input and print alerts.
    Monitor {
        #[command(flatten)]
        input: InputArgs,

        /// Print the monitor summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// CSV file with bars (date,open,high,low,close) or returns (date,return[,prediction]).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Use synthetic data instead of an input file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Path to a TOML analysis config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Synth { bars, seed, out } => run_synth(bars, seed, out),
        Commands::Analyze { input, output_dir } => run_analyze(input, output_dir),
        Commands::Stress { input } => run_stress(input),
        Commands::Monitor { input, json } => run_monitor(input, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(args: InputArgs) -> Result<(Dataset, RobustnessConfig)> {
    if args.input.is_some() && args.synthetic {
        bail!("--input and --synthetic are mutually exclusive");
    }
    let config = match &args.config {
        Some(path) => RobustnessConfig::from_file(path)?,
        None => RobustnessConfig::default(),
    };
    let dataset = match args.input {
        Some(path) => load_csv(&path)?,
        None if args.synthetic => synthetic_dataset(&config.synthetic)?,
        None => bail!("one of --input or --synthetic is required"),
    };
    Ok((dataset, config))
}

fn run_synth(bars: usize, seed: u64, out: PathBuf) -> Result<()> {
    if bars < 2 {
        bail!("--bars must be at least 2");
    }
    let config = SyntheticConfig {
        n_bars: bars,
        seed,
        ..SyntheticConfig::default()
    };
    let generated = generate_bars(&config)?;
    write_bars_csv(&out, &generated)?;
    println!("Wrote {} bars to {}", generated.len(), out.display());
    Ok(())
}

fn run_analyze(input: InputArgs, output_dir: PathBuf) -> Result<()> {
    let (dataset, config) = load_inputs(input)?;
    let report = evaluate(&dataset, &config)?;

    print_summary(&report);

    let rows = rolling_table(&report.analyzed_returns, &dataset.dates, &config);
    let run_dir = save_report(&report, &rows, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_stress(input: InputArgs) -> Result<()> {
    let (dataset, config) = load_inputs(input)?;
    config.validate()?;
    let predictor = config.strategy.predictor.build();
    let signal = resolve_signal(&dataset, predictor.as_deref())?;
    let rng = RngHierarchy::new(config.seed);
    let report = run_stress_tests(
        &dataset.returns,
        signal.source,
        &config.stress,
        &config.metrics,
        &rng,
    )?;
    print_stress(&report);
    Ok(())
}

fn run_monitor(input: InputArgs, json: bool) -> Result<()> {
    let (dataset, config) = load_inputs(input)?;
    config.validate()?;
    let predictor = config.strategy.predictor.build();
    let signal = resolve_signal(&dataset, predictor.as_deref())?;
    info!(observations = signal.analyzed.len(), signal = ?signal.kind, "replaying monitor");
    let summary = replay(
        &signal.analyzed,
        signal.pairs(&dataset.returns),
        &config.monitor,
        &config.metrics,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_monitor(&summary, &dataset);
    }
    Ok(())
}

fn print_summary(report: &RobustnessReport) {
    let m = &report.manifest;
    let p = &report.performance;
    let s = &report.score;
    println!();
    println!("=== Robustness Report ===");
    println!("Observations:   {}", m.observations);
    if let (Some(first), Some(last)) = (m.first_date, m.last_date) {
        println!("Period:         {first} to {last}");
    }
    println!("Signal:         {:?}", report.signal);
    println!("Seed:           {}", m.seed);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", p.total_return() * 100.0);
    println!("CAGR:           {:.2}%", p.returns.cagr * 100.0);
    println!("Sharpe:         {:.3}", p.sharpe());
    println!("Sortino:        {:.3}", p.efficiency.sortino);
    println!("Max Drawdown:   {:.2}%", p.max_drawdown() * 100.0);
    println!("VaR:            {:.2}%", p.risk.var * 100.0);
    if let Some(pred) = &report.predictive {
        println!(
            "Dir. Accuracy:  {:.1}%",
            pred.directional_accuracy * 100.0
        );
    }
    println!();
    println!("--- Robustness ---");
    println!(
        "Stability:      {:.3} (rolling Sharpe score {:.3})",
        s.stability, report.stability.sharpe_score.score
    );
    println!(
        "Adaptability:   {:.3} ({} regime transitions)",
        s.adaptability, report.adaptability.regime_transitions
    );
    if let Some(wf) = &report.walk_forward {
        println!(
            "Walk-Forward:   IS {:.3} / OOS {:.3} ({:?})",
            wf.mean_is_sharpe, wf.mean_oos_sharpe, wf.degradation_flag
        );
    }
    println!(
        "Bootstrap:      {:?} [{:.3}, {:.3}]",
        report.bootstrap.grade, report.bootstrap.sharpe_ci_lower, report.bootstrap.sharpe_ci_upper
    );
    println!(
        "Stress:         {:.0}% scenarios survived",
        report.stress.survival_rate * 100.0
    );
    println!(
        "Adaptive:       {:+.2}% drawdown change, {} retrains",
        report.adaptive.drawdown_improvement() * 100.0,
        report.adaptive.retrain_points.len()
    );
    println!();
    println!("Overall Score:  {:.3} ({:?})", s.overall, s.grade);
    if m.source.is_synthetic() {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for note in &report.notes {
        println!("NOTE: {note}");
    }
    println!();
}

fn print_stress(report: &StressReport) {
    println!();
    println!("=== Stress Tests ===");
    println!(
        "Baseline:       Sharpe {:.3}, max drawdown {:.2}%",
        report.baseline.sharpe(),
        report.baseline.max_drawdown() * 100.0
    );
    println!();
    println!(
        "{:<28} {:>10} {:>10} {:>10} {:>9}",
        "Scenario", "Return", "Sharpe", "MaxDD", "Survived"
    );
    println!("{}", "-".repeat(71));
    for r in &report.scenarios {
        println!(
            "{:<28} {:>9.2}% {:>10.3} {:>9.2}% {:>9}",
            r.name,
            r.total_return * 100.0,
            r.sharpe,
            r.max_drawdown * 100.0,
            if r.survived { "yes" } else { "no" }
        );
    }
    for name in &report.skipped {
        println!("{name:<28} {:>43}", "skipped (no signal)");
    }
    if let Some(mc) = &report.monte_carlo {
        println!();
        println!("--- Monte Carlo ({} trials) ---", mc.trials);
        println!("Median Sharpe:  {:.3}", mc.sharpe.median);
        println!("Sharpe Score:   {:.3}", mc.sharpe_stability.score);
        println!("P(loss):        {:.1}%", mc.probability_of_loss * 100.0);
    }
    println!();
    println!("Survival Rate:  {:.0}%", report.survival_rate * 100.0);
    println!();
}

fn print_monitor(summary: &MonitorSummary, dataset: &Dataset) {
    println!();
    println!("=== Monitor Replay ===");
    println!("Observations:   {}", summary.observations);
    println!(
        "Status bars:    {} healthy, {} warning, {} critical",
        summary.healthy, summary.warning, summary.critical
    );
    println!("Final Status:   {:?}", summary.final_status);
    println!();
    if summary.alerts.is_empty() {
        println!("No alerts.");
        println!();
        return;
    }
    for (kind, count) in &summary.alert_counts {
        println!("{:<16} {count}", format!("{kind:?}"));
    }
    println!();
    println!("{:<12} {:<16} {:>10} {:>10}", "Date", "Alert", "Value", "Threshold");
    println!("{}", "-".repeat(51));
    for alert in &summary.alerts {
        let date = dataset
            .dates
            .get(alert.index)
            .map(|d| d.to_string())
            .unwrap_or_else(|| alert.index.to_string());
        println!(
            "{:<12} {:<16} {:>10.4} {:>10.4}",
            date,
            format!("{:?}", alert.kind),
            alert.value,
            alert.threshold
        );
    }
    println!();
}
