//! Render functions
//!
//! Every entry point takes an [`EvalContext`](crate::context::EvalContext)
//! and a series list by value, and returns a new list. Inputs are never
//! shared with outputs; callers that need the originals clone first.
//!
//! # Function Families
//!
//! - **Aggregation**: null-safe folds (`safe_sum`, `safe_max`, ...)
//! - **Gap-fill**: `replace_missing`, `transform_null`
//! - **Percentiles**: `percentile`, `n_percentile`
//! - **Ranking / filtering**: `highest_max`, `sort_by_total`, `limit`,
//!   `remove_*_percentile`, `remove_*_value`
//! - **Naming / attributes**: `alias*`, `color`, `alpha`, ...
//! - **Grouping**: `map_series`, `reduce_series`
//! - **Combiners**: `sum_series`, `divide_series`, ...
//! - **Forecasting**: `six_sigma`, `linregress`

pub mod aggregate;
pub mod attributes;
pub mod combine;
pub mod grouping;
pub mod interpolate;
pub mod naming;
pub mod percentile;
pub mod ranking;
pub mod regression;
pub mod six_sigma;
pub mod transform;

pub use aggregate::{safe_avg, safe_count, safe_last, safe_max, safe_min, safe_sum};
pub use attributes::{alpha, color, draw_as_infinite, line_width, second_y_axis};
pub use combine::{as_percent, average_series, diff_series, divide_series, max_series, min_series, sum_series};
pub use grouping::{map_series, reduce_series};
pub use interpolate::{replace_missing, transform_null};
pub use naming::{alias, alias_by_node, alias_sub};
pub use percentile::{n_percentile, percentile};
pub use ranking::{
    highest_max, limit, remove_above_percentile, remove_above_value, remove_below_percentile,
    remove_below_value, sort_by_total,
};
pub use regression::{linregress, LinearFit};
pub use six_sigma::{align_to_hour, parse_factor, parse_time_offset, six_sigma, six_sigma_core, Alignment};
pub use transform::scale;

/// Shortest decimal rendering of a numeric argument (`30`, not `30.0`)
pub(crate) fn format_number(value: f64) -> String {
    format!("{}", value)
}
