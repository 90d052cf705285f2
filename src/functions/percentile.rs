//! Rank-based percentile estimation
//!
//! Nearest-rank estimator (NIST style): the result is always one of the
//! present samples unless rank interpolation is requested.

use std::cmp::Ordering;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions::format_number;
use crate::types::TimeSeries;

/// Percentile of the present samples
///
/// `fractional_rank = p/100 * (N+1)`; without interpolation the rank is
/// rounded up, converted to a zero-based index and clamped to `[0, N-1]`.
/// With interpolation the selected sample is moved towards the next one by
/// the fractional part of the rank. Returns `None` when no sample is present.
///
/// ```rust
/// use render_functions::functions::percentile;
///
/// let values: Vec<Option<f64>> = [15.0, 20.0, 35.0, 40.0, 50.0].iter().copied().map(Some).collect();
/// assert_eq!(percentile(&values, 30.0, false), Some(20.0));
/// ```
pub fn percentile(values: &[Option<f64>], p: f64, interpolate: bool) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let count = sorted.len();
    let fractional_rank = (p / 100.0) * (count + 1) as f64;
    let mut rank = fractional_rank.floor();
    let fraction = fractional_rank - rank;
    if !interpolate {
        rank += fraction.ceil();
    }

    let index = (rank as i64 - 1).clamp(0, count as i64 - 1) as usize;
    let mut result = sorted[index];

    if interpolate {
        let next_index = rank.max(0.0) as usize;
        if next_index < count {
            let next = sorted[next_index];
            result = (result + fraction * (next - result)).min(next);
        }
    }

    Some(result)
}

/// Replace each series by a constant series holding its `p`-th percentile
///
/// Series without any present sample are dropped. The output keeps the
/// input's start and step and holds `max(1, (end - start) / step)` samples.
pub fn n_percentile(ctx: &EvalContext, series_list: Vec<TimeSeries>, p: f64) -> Result<Vec<TimeSeries>> {
    if p <= 0.0 {
        return Err(Error::argument(
            "nPercentile",
            1,
            "the requested percent must be greater than 0",
        ));
    }
    let interpolate = ctx.config().engine.percentile_interpolate;

    let mut results = Vec::with_capacity(series_list.len());
    for series in series_list {
        let Some(value) = percentile(series.values(), p, interpolate) else {
            continue;
        };
        let name = format!("nPercentile({}, {})", series.name, format_number(p));
        let points = if series.step > 0 {
            ((series.end - series.start) / series.step).max(1) as usize
        } else {
            1
        };
        results.push(series.derive(name, vec![Some(value); points]));
    }
    Ok(results)
}
