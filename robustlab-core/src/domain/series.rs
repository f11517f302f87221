//! Conversions between prices, returns, wealth and equity.

/// Simple period returns from a price series.
///
/// A non-positive previous price yields a 0.0 return for that step.
pub fn returns_from_prices(prices: &[f64]) -> Vec<f64> {
    if prices.len() < 2 {
        return Vec::new();
    }
    prices
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Wealth index `Π(1 + rᵢ)` after each period (starts implicitly at 1.0).
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut wealth = 1.0;
    returns
        .iter()
        .map(|r| {
            wealth *= 1.0 + r;
            wealth
        })
        .collect()
}

/// Equity curve of length `returns.len() + 1` starting at `initial`.
pub fn equity_from_returns(initial: f64, returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    curve.push(initial);
    let mut equity = initial;
    for r in returns {
        equity *= 1.0 + r;
        curve.push(equity);
    }
    curve
}
