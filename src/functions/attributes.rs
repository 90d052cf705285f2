//! Display-hint tagging
//!
//! Each function sets one attribute to the same literal on every series and
//! returns the list. Numeric code never reads these hints.

use crate::context::EvalContext;
use crate::types::{OptionValue, TimeSeries};

fn tag(series_list: Vec<TimeSeries>, key: &str, value: OptionValue) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            series.options.insert(key.to_string(), value.clone());
            series
        })
        .collect()
}

/// Set the colour attribute
pub fn color(_ctx: &EvalContext, series_list: Vec<TimeSeries>, color: &str) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            series.color = Some(color.to_string());
            series
        })
        .collect()
}

/// Set the `alpha` (opacity) hint
pub fn alpha(_ctx: &EvalContext, series_list: Vec<TimeSeries>, alpha: f64) -> Vec<TimeSeries> {
    tag(series_list, "alpha", OptionValue::Number(alpha))
}

/// Set the `lineWidth` hint
pub fn line_width(_ctx: &EvalContext, series_list: Vec<TimeSeries>, width: f64) -> Vec<TimeSeries> {
    tag(series_list, "lineWidth", OptionValue::Number(width))
}

/// Plot against the second Y axis
pub fn second_y_axis(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    tag(series_list, "secondYAxis", OptionValue::Bool(true))
}

/// Draw non-zero samples as vertical lines
pub fn draw_as_infinite(_ctx: &EvalContext, series_list: Vec<TimeSeries>) -> Vec<TimeSeries> {
    tag(series_list, "drawAsInfinite", OptionValue::Bool(true))
}
