//! Least-squares trend lines

use tracing::debug;

use crate::context::EvalContext;
use crate::types::TimeSeries;

/// Fitted line `value = slope * index + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change in value per sample index
    pub slope: f64,
    /// Value at index zero
    pub intercept: f64,
}

impl LinearFit {
    /// Ordinary least squares over `(x, y)` points
    ///
    /// A single point, or points sharing one `x`, yield a flat line through
    /// the mean.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

        let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Value of the line at `x`
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Project each series' linear trend over the display window
///
/// Series with no present samples are omitted, as are series whose share of
/// present samples is below `min_valid_values` when one is given. Output
/// keeps the input step.
pub fn linregress(ctx: &EvalContext, series_list: Vec<TimeSeries>, min_valid_values: Option<f64>) -> Vec<TimeSeries> {
    let start = ctx.start_timestamp();
    let end = ctx.end_timestamp();

    series_list
        .into_iter()
        .filter_map(|series| {
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
                .collect();

            if let Some(min) = min_valid_values {
                let ratio = points.len() as f64 / series.len().max(1) as f64;
                if ratio < min {
                    debug!(series = %series.name, ratio, min, "Too few valid samples for regression");
                    return None;
                }
            }

            let fit = LinearFit::fit(&points)?;
            let step = series.step.max(1);
            let count = ((end - start) / step + 1).max(0) as usize;
            let values = (0..count)
                .map(|i| {
                    let t = start + i as i64 * step;
                    Some(fit.at((t - series.start) as f64 / step as f64))
                })
                .collect();

            let name = format!("linregress({})", series.name);
            let mut projected = TimeSeries::new(name, start, start + step * (count as i64 - 1).max(0), step, values);
            projected.consolidation = series.consolidation;
            Some(projected)
        })
        .collect()
}
