//! Per-sample value transforms

use crate::context::EvalContext;
use crate::functions::format_number;
use crate::types::TimeSeries;

/// Multiply every present sample by `factor`
pub fn scale(_ctx: &EvalContext, series_list: Vec<TimeSeries>, factor: f64) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            series.name = format!("scale({},{})", series.name, format_number(factor));
            series.path_expression = series.name.clone();
            for value in series.values.iter_mut().flatten() {
                *value *= factor;
            }
            series
        })
        .collect()
}
