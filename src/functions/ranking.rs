//! Ranking and filtering of series lists
//!
//! Rankings use the null-safe folds from [`super::aggregate`], so a series
//! with no data ranks below every series with data. Filters blank samples in
//! place of removing them: series length and sample positions never change.

use std::cmp::Ordering;

use crate::context::EvalContext;
use crate::functions::aggregate::{safe_max, safe_sum};
use crate::functions::format_number;
use crate::functions::percentile::percentile;
use crate::types::TimeSeries;

/// Descending order on optional keys, absent keys last
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by a per-series key, largest first
fn sort_descending_by<F>(series_list: Vec<TimeSeries>, key: F) -> Vec<TimeSeries>
where
    F: Fn(&TimeSeries) -> Option<f64>,
{
    let mut keyed: Vec<(Option<f64>, TimeSeries)> =
        series_list.into_iter().map(|s| (key(&s), s)).collect();
    keyed.sort_by(|a, b| descending(a.0, b.0));
    keyed.into_iter().map(|(_, s)| s).collect()
}

/// The `n` series with the largest maximum, largest first
///
/// Ties keep their input order.
pub fn highest_max(_ctx: &EvalContext, series_list: Vec<TimeSeries>, n: usize) -> Vec<TimeSeries> {
    let mut sorted = sort_descending_by(series_list, |s| safe_max(s.values()));
    sorted.truncate(n);
    sorted
}

/// Sort by the sum of present samples, largest first
pub fn sort_by_total(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    sort_descending_by(series_list, |s| safe_sum(s.values()))
}

/// First `n` series, in order
pub fn limit(_ctx: &EvalContext, mut series_list: Vec<TimeSeries>, n: usize) -> Vec<TimeSeries> {
    series_list.truncate(n);
    series_list
}

/// Blank every sample for which `remove(sample)` holds
fn blank_where<F>(series: &mut TimeSeries, remove: F)
where
    F: Fn(f64) -> bool,
{
    for value in series.values.iter_mut() {
        if matches!(value, Some(v) if remove(*v)) {
            *value = None;
        }
    }
}

fn rename(series: &mut TimeSeries, function: &str, argument: f64) {
    series.name = format!("{}({}, {})", function, series.name, format_number(argument));
    series.path_expression = series.name.clone();
}

/// Blank samples above each series' own `p`-th percentile
pub fn remove_above_percentile(ctx: &EvalContext, series_list: Vec<TimeSeries>, p: f64) -> Vec<TimeSeries> {
    let interpolate = ctx.config().engine.percentile_interpolate;
    series_list
        .into_iter()
        .map(|mut series| {
            rename(&mut series, "removeAbovePercentile", p);
            if let Some(threshold) = percentile(series.values(), p, interpolate) {
                blank_where(&mut series, |v| v > threshold);
            }
            series
        })
        .collect()
}

/// Blank samples below each series' own `p`-th percentile
pub fn remove_below_percentile(ctx: &EvalContext, series_list: Vec<TimeSeries>, p: f64) -> Vec<TimeSeries> {
    let interpolate = ctx.config().engine.percentile_interpolate;
    series_list
        .into_iter()
        .map(|mut series| {
            rename(&mut series, "removeBelowPercentile", p);
            if let Some(threshold) = percentile(series.values(), p, interpolate) {
                blank_where(&mut series, |v| v < threshold);
            }
            series
        })
        .collect()
}

/// Blank samples above a literal threshold
pub fn remove_above_value(_ctx: &EvalContext, series_list: Vec<TimeSeries>, threshold: f64) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            rename(&mut series, "removeAboveValue", threshold);
            blank_where(&mut series, |v| v > threshold);
            series
        })
        .collect()
}

/// Blank samples below a literal threshold
pub fn remove_below_value(_ctx: &EvalContext, series_list: Vec<TimeSeries>, threshold: f64) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            rename(&mut series, "removeBelowValue", threshold);
            blank_where(&mut series, |v| v < threshold);
            series
        })
        .collect()
}
