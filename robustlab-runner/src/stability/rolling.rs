//! Rolling-window metrics.
//!
//! A rolling series over `n` observations with window `w` has `n − w + 1`
//! entries; entry `i` covers observations `i..i + w`.

use robustlab_core::metrics::efficiency::sharpe_ratio;
use robustlab_core::metrics::returns::total_return;
use robustlab_core::metrics::risk::volatility;
use robustlab_core::MetricsConfig;

/// Apply `f` to every full window of `returns`.
///
/// Empty when `window` is 0 or longer than the series.
pub fn rolling_metric<F>(returns: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 || returns.len() < window {
        return Vec::new();
    }
    returns.windows(window).map(f).collect()
}

pub fn rolling_sharpe(returns: &[f64], window: usize, config: &MetricsConfig) -> Vec<f64> {
    rolling_metric(returns, window, |w| {
        sharpe_ratio(w, config.risk_free_rate, config.periods_per_year)
    })
}

pub fn rolling_volatility(returns: &[f64], window: usize, periods_per_year: f64) -> Vec<f64> {
    rolling_metric(returns, window, |w| volatility(w, periods_per_year))
}

pub fn rolling_return(returns: &[f64], window: usize) -> Vec<f64> {
    rolling_metric(returns, window, total_return)
}

/// Pad a rolling series on the left so index `t` refers to the window ending at `t`.
pub fn align_to_series(rolling: &[f64], series_len: usize) -> Vec<Option<f64>> {
    let pad = series_len.saturating_sub(rolling.len());
    std::iter::repeat(None)
        .take(pad)
        .chain(rolling.iter().copied().map(Some))
        .take(series_len)
        .collect()
}
