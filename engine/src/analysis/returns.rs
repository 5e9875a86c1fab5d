// Simple-return statistics over a price series
use shared::models::ReturnStats;

use super::clean::to_finite_array;

pub const MIN_POINTS: usize = 3;
const MIN_RETURNS: usize = 2;

/// Mean, sample volatility (n - 1 divisor), min and max of the simple returns
/// `curr / prev - 1` between consecutive finite prices.
///
/// Pairs whose previous price is zero are skipped, as are returns that
/// overflow to infinity (a previous price close to zero).
pub fn summarize_returns(prices: &[f64]) -> ReturnStats {
    let x = to_finite_array(prices);
    if x.len() < MIN_POINTS {
        tracing::warn!(points = x.len(), "Too few points to compute returns");
        return ReturnStats::insufficient(format!(
            "too few points to compute returns (minimum: {})",
            MIN_POINTS
        ));
    }

    let pairs: Vec<(f64, f64)> = x
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(prev, _)| *prev != 0.0)
        .collect();
    if pairs.len() < MIN_RETURNS {
        tracing::warn!(pairs = pairs.len(), "Too many zero prices to compute returns");
        return ReturnStats::insufficient("insufficient non-zero data to compute returns");
    }

    let rets: Vec<f64> = pairs
        .iter()
        .map(|(prev, curr)| curr / prev - 1.0)
        .filter(|r| r.is_finite())
        .collect();
    if rets.len() < MIN_RETURNS {
        tracing::warn!(returns = rets.len(), "Returns overflowed, too few left");
        return ReturnStats::insufficient("insufficient returns to compute statistics");
    }

    let n = rets.len() as f64;
    let mean = rets.iter().sum::<f64>() / n;
    let variance = rets.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let min_return = rets.iter().copied().fold(f64::INFINITY, f64::min);
    let max_return = rets.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    ReturnStats::Summary {
        count: rets.len(),
        mean_return: mean,
        volatility: variance.sqrt(),
        min_return,
        max_return,
    }
}
