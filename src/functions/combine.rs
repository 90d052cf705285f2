//! Series combiners
//!
//! Each combiner folds a list of series into a single series, column by
//! column. Absent samples are skipped; a column with no present sample is
//! absent in the output. These are the reducers `reduceSeries` dispatches to.

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::types::TimeSeries;

/// Fold every column of `series_list` with `fold`
///
/// The output takes its start and step from the first series and is as long
/// as the longest member.
fn combine<F>(function: &str, series_list: &[TimeSeries], fold: F) -> Vec<TimeSeries>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let Some(first) = series_list.first() else {
        return Vec::new();
    };
    let width = series_list.iter().map(TimeSeries::len).max().unwrap_or(0);
    let mut column = Vec::with_capacity(series_list.len());

    let values = (0..width)
        .map(|i| {
            column.clear();
            column.extend(series_list.iter().filter_map(|s| s.values.get(i).copied().flatten()));
            if column.is_empty() {
                None
            } else {
                fold(&column)
            }
        })
        .collect();

    let names: Vec<&str> = series_list.iter().map(|s| s.name.as_str()).collect();
    let name = format!("{}({})", function, names.join(","));
    vec![first.derive(name, values)]
}

/// Column-wise sum
pub fn sum_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    combine("sumSeries", &series_list, |col| Some(col.iter().sum()))
}

/// Column-wise mean of present samples
pub fn average_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    combine("averageSeries", &series_list, |col| {
        Some(col.iter().sum::<f64>() / col.len() as f64)
    })
}

/// Column-wise maximum
pub fn max_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    combine("maxSeries", &series_list, |col| {
        col.iter().copied().reduce(f64::max)
    })
}

/// Column-wise minimum
pub fn min_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    combine("minSeries", &series_list, |col| {
        col.iter().copied().reduce(f64::min)
    })
}

/// First present sample minus the other present samples of each column
pub fn diff_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    combine("diffSeries", &series_list, |col| {
        col.split_first()
            .map(|(first, rest)| first - rest.iter().sum::<f64>())
    })
}

/// Pairwise ratio of exactly two series, scaled by `multiplier`
///
/// Absent operands and a zero divisor produce absent samples.
fn ratio(function: &str, series_list: Vec<TimeSeries>, multiplier: f64) -> Result<Vec<TimeSeries>> {
    let [dividend, divisor] = <[TimeSeries; 2]>::try_from(series_list).map_err(|list| {
        Error::argument(
            function,
            0,
            format!("expected exactly 2 series, got {}", list.len()),
        )
    })?;

    let width = dividend.len().max(divisor.len());
    let values = (0..width)
        .map(|i| {
            let a = dividend.values.get(i).copied().flatten()?;
            let b = divisor.values.get(i).copied().flatten()?;
            if b == 0.0 {
                None
            } else {
                Some(a / b * multiplier)
            }
        })
        .collect();

    let name = format!("{}({},{})", function, dividend.name, divisor.name);
    Ok(vec![dividend.derive(name, values)])
}

/// First series divided by the second
pub fn divide_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Result<Vec<TimeSeries>> {
    ratio("divideSeries", series_list, 1.0)
}

/// First series as a percentage of the second
pub fn as_percent(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Result<Vec<TimeSeries>> {
    ratio("asPercent", series_list, 100.0)
}
