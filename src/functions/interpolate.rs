//! Gap filling
//!
//! `replace_missing` fills runs of absent samples: linear interpolation
//! between the known neighbours, holding the nearest known sample at the
//! edges. A sequence with no known sample has no anchor and stays absent.

use crate::context::EvalContext;
use crate::types::TimeSeries;

/// Fill absent samples by interpolation and edge-hold
///
/// A run of `n` absent samples between `a` and `b` gets
/// `a + (b - a) * i / (n + 1)` at its `i`-th position (1-based).
///
/// ```rust
/// use render_functions::functions::replace_missing;
///
/// let filled = replace_missing(&[Some(1.0), None, None, Some(4.0)]);
/// assert_eq!(filled, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
/// ```
pub fn replace_missing(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = values.to_vec();
    let mut previous: Option<f64> = None;
    let mut i = 0;

    while i < result.len() {
        if let Some(v) = result[i] {
            previous = Some(v);
            i += 1;
            continue;
        }

        // Find the end of this run of absent samples
        let run_start = i;
        while i < result.len() && result[i].is_none() {
            i += 1;
        }
        let next = result.get(i).copied().flatten();
        let run_len = i - run_start;

        match (previous, next) {
            (Some(a), Some(b)) => {
                for (offset, slot) in result[run_start..i].iter_mut().enumerate() {
                    let position = (offset + 1) as f64;
                    *slot = Some(a + (b - a) * position / (run_len + 1) as f64);
                }
            }
            (None, Some(b)) => {
                result[run_start..i].fill(Some(b));
            }
            (Some(a), None) => {
                result[run_start..i].fill(Some(a));
            }
            (None, None) => {}
        }
    }

    result
}

/// Replace absent samples with a constant
///
/// Series are renamed `transformNull(<name>, <default>)`.
pub fn transform_null(_ctx: &EvalContext, series_list: Vec<TimeSeries>, default: f64) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            series.name = format!("transformNull({}, {})", series.name, default);
            series.path_expression = series.name.clone();
            for value in series.values.iter_mut() {
                if value.is_none() {
                    *value = Some(default);
                }
            }
            series
        })
        .collect()
}
