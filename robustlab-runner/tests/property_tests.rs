//! Property tests for robustness-analysis invariants.
//!
//! 1. Rolling series have `n − window + 1` values and stability score never exceeds the median
//! 2. Regime labels cover every bar
//! 3. Drawdown episodes are ordered, non-overlapping and at most one is unrecovered
//! 4. Bootstrap confidence intervals are ordered and reproducible per seed
//! 5. The overall robustness score stays in [0, 1]

use proptest::prelude::*;
use robustlab_core::{MetricsConfig, RngHierarchy};
use robustlab_runner::adaptability::{classify_regimes, drawdown_episodes};
use robustlab_runner::bootstrap::{stationary_block_bootstrap, BootstrapConfig};
use robustlab_runner::report::RobustnessScore;
use robustlab_runner::stability::{rolling_sharpe, StabilityScore};

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, 1..400)
}

// ── 1. Rolling and stability ─────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_length(returns in arb_returns(), window in 1usize..80) {
        let out = rolling_sharpe(&returns, window, &MetricsConfig::default());
        let expected = if returns.len() >= window { returns.len() - window + 1 } else { 0 };
        prop_assert_eq!(out.len(), expected);
    }

    #[test]
    fn stability_score_penalizes_dispersion(
        values in prop::collection::vec(-3.0..3.0_f64, 1..200),
        penalty in 0.0..2.0_f64,
    ) {
        let s = StabilityScore::compute("sharpe", &values, penalty);
        prop_assert!(s.iqr >= 0.0);
        prop_assert!(s.score <= s.median + 1e-12);
    }
}

// ── 2. Regimes ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn every_bar_gets_a_regime(returns in arb_returns(), window in 2usize..40) {
        let regimes = classify_regimes(&returns, window, 0.33, 0.67, 252.0);
        prop_assert_eq!(regimes.len(), returns.len());
    }
}

// ── 3. Drawdown episodes ─────────────────────────────────────────────

proptest! {
    #[test]
    fn episodes_are_ordered(returns in arb_returns()) {
        let episodes = drawdown_episodes(&returns);
        let unrecovered = episodes.iter().filter(|e| e.end.is_none()).count();
        prop_assert!(unrecovered <= 1);
        for e in &episodes {
            prop_assert!(e.depth < 0.0 && e.depth >= -1.0);
            prop_assert!(e.start <= e.trough);
            if let Some(end) = e.end {
                prop_assert!(e.trough < end);
            }
        }
        for pair in episodes.windows(2) {
            prop_assert!(pair[0].end.is_some());
            prop_assert!(pair[0].end.unwrap_or(0) < pair[1].start);
        }
    }
}

// ── 4. Bootstrap ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn bootstrap_interval_is_ordered(
        returns in prop::collection::vec(-0.03..0.03_f64, 260..400),
        seed in any::<u64>(),
    ) {
        let cfg = BootstrapConfig { n_resamples: 100, ..BootstrapConfig::default() };
        let metrics = MetricsConfig::default();
        let rng = RngHierarchy::new(seed);
        let a = stationary_block_bootstrap(&returns, &cfg, &metrics, &rng).unwrap();
        prop_assert!(a.sharpe_ci_lower <= a.sharpe_median);
        prop_assert!(a.sharpe_median <= a.sharpe_ci_upper);
        prop_assert!(a.ci_width >= 0.0);

        let b = stationary_block_bootstrap(&returns, &cfg, &metrics, &rng).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ── 5. Aggregate score ───────────────────────────────────────────────

proptest! {
    #[test]
    fn overall_score_is_bounded(parts in prop::array::uniform5(-1.0..2.0_f64)) {
        let s = RobustnessScore::new(parts[0], parts[1], parts[2], parts[3], parts[4]);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&s.overall));
    }
}
