//! Six-sigma anomaly bands
//!
//! The history preceding the display window is split into `repeats`
//! consecutive periods. Samples at the same offset within each period are
//! treated as observations of one seasonal slot; the bands are the per-slot
//! mean plus and minus a multiple of the population standard deviation.
//!
//! ```text
//!   history_start                                  history_end   end_time
//!   |-- period 1 --|-- period 2 --| ... |-- period N --|== bands ==|
//!                                                      ^ aligned to the hour
//! ```

use chrono::{DateTime, Duration, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions::interpolate::replace_missing;
use crate::types::TimeSeries;

lazy_static! {
    static ref TIME_OFFSET: Regex =
        Regex::new(r"^\s*([+-])?(\d+)\s*([A-Za-z]+)\s*$").expect("valid offset regex");
}

const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// Parameter parsing
// ============================================================================

/// Parse a band factor
///
/// `"v"` yields `(v, v)`; `"a:b"` yields `(max(a, b), min(a, b))`, the upper
/// factor first.
///
/// # Example
///
/// ```rust
/// use render_functions::functions::parse_factor;
///
/// assert_eq!(parse_factor("3").unwrap(), (3.0, 3.0));
/// assert_eq!(parse_factor("3:4").unwrap(), (4.0, 3.0));
/// assert!(parse_factor("1:2:3").is_err());
/// ```
pub fn parse_factor(factor: &str) -> Result<(f64, f64)> {
    let parse = |part: &str| -> Result<f64> {
        part.trim()
            .parse::<f64>()
            .map_err(|_| Error::format("factor", format!("'{}' is not a number", part)))
    };

    let parts: Vec<&str> = factor.split(':').collect();
    match parts.as_slice() {
        [single] => {
            let v = parse(single)?;
            Ok((v, v))
        }
        [a, b] => {
            let (a, b) = (parse(a)?, parse(b)?);
            Ok((a.max(b), a.min(b)))
        }
        _ => Err(Error::format(
            "factor",
            format!("'{}' has more than one ':' separator", factor),
        )),
    }
}

/// Parse a relative time offset such as `7d`, `-2h` or `30min`
///
/// Months are 30 days and years 365 days.
pub fn parse_time_offset(offset: &str) -> Result<Duration> {
    let caps = TIME_OFFSET
        .captures(offset)
        .ok_or_else(|| Error::format("period", format!("'{}' is not a time offset", offset)))?;

    let amount: i64 = caps[2]
        .parse()
        .map_err(|_| Error::format("period", format!("'{}' amount is out of range", offset)))?;

    let unit_seconds = match &caps[3] {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => SECONDS_PER_DAY,
        "w" | "week" | "weeks" => 7 * SECONDS_PER_DAY,
        "mon" | "month" | "months" => 30 * SECONDS_PER_DAY,
        "y" | "year" | "years" => 365 * SECONDS_PER_DAY,
        unit => {
            return Err(Error::format(
                "period",
                format!("unknown unit '{}' in '{}'", unit, offset),
            ))
        }
    };

    let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1 } else { 1 };
    amount
        .checked_mul(unit_seconds)
        .and_then(|secs| Duration::try_seconds(sign * secs))
        .ok_or_else(|| Error::format("period", format!("'{}' is out of range", offset)))
}

// ============================================================================
// Time alignment
// ============================================================================

/// Direction used when snapping a timestamp to a whole hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Truncate, then move one hour later
    Forward,
    /// Truncate to the start of the hour
    Backward,
}

/// Snap a timestamp to a whole hour, discarding sub-hour components
///
/// Fails only when forward alignment would leave the representable range.
pub fn align_to_hour(t: DateTime<Utc>, alignment: Alignment) -> Result<DateTime<Utc>> {
    let truncated = t
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(t);

    match alignment {
        Alignment::Backward => Ok(truncated),
        Alignment::Forward => truncated
            .checked_add_signed(Duration::hours(1))
            .ok_or_else(|| Error::format("timestamp", format!("{} cannot be aligned forward", t))),
    }
}

// ============================================================================
// Band computation
// ============================================================================

/// Per-slot mean and population standard deviation over `repeats` periods
///
/// `values` is split into `repeats` contiguous chunks of `len / repeats`
/// samples; trailing samples that do not fill a chunk are ignored.
pub fn six_sigma_core(values: &[f64], repeats: usize) -> (Vec<f64>, Vec<f64>) {
    if repeats == 0 {
        return (Vec::new(), Vec::new());
    }
    let period_length = values.len() / repeats;
    let n = repeats as f64;

    let mut mean = vec![0.0; period_length];
    for chunk in values.chunks_exact(period_length.max(1)).take(repeats) {
        for (m, v) in mean.iter_mut().zip(chunk) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut variance = vec![0.0; period_length];
    for chunk in values.chunks_exact(period_length.max(1)).take(repeats) {
        for ((var, m), v) in variance.iter_mut().zip(&mean).zip(chunk) {
            *var += (v - m) * (v - m);
        }
    }
    let std = variance.into_iter().map(|var| (var / n).sqrt()).collect();

    (mean, std)
}

/// Mean, upper and lower band for one seasonal period
struct Bands {
    mean: Vec<Option<f64>>,
    upper: Vec<Option<f64>>,
    lower: Vec<Option<f64>>,
}

impl Bands {
    /// `None` when the history has no present sample at all
    fn compute(history: &[Option<f64>], repeats: usize, upper_factor: f64, lower_factor: f64) -> Option<Self> {
        let values: Vec<f64> = replace_missing(history).into_iter().collect::<Option<_>>()?;
        let (mean, std) = six_sigma_core(&values, repeats);

        Some(Self {
            upper: mean.iter().zip(&std).map(|(m, s)| Some(m + upper_factor * s)).collect(),
            lower: mean.iter().zip(&std).map(|(m, s)| Some(m - lower_factor * s)).collect(),
            mean: mean.into_iter().map(Some).collect(),
        })
    }

    fn empty(period_length: usize) -> Self {
        Self {
            mean: vec![None; period_length],
            upper: vec![None; period_length],
            lower: vec![None; period_length],
        }
    }
}

fn period_label(period: &str) -> String {
    let period = period.trim();
    if period.starts_with('-') {
        period.to_string()
    } else {
        format!("-{}", period)
    }
}

fn tile(values: &[Option<f64>], tiles: usize) -> Vec<Option<f64>> {
    values.iter().copied().cycle().take(values.len() * tiles).collect()
}

/// Six-sigma bands for each series
///
/// Returns `sixSigmaMean`, `sixSigmaUpper` and `sixSigmaLower` for every
/// input, in that order. History is fetched through the context evaluator
/// using each series' path expression. Series whose history comes back
/// empty or shorter than `repeats` samples are skipped.
pub fn six_sigma(
    ctx: &EvalContext,
    series_list: Vec<TimeSeries>,
    period: &str,
    repeats: usize,
    factor: &str,
) -> Result<Vec<TimeSeries>> {
    let (upper_factor, lower_factor) = parse_factor(factor)?;
    let period_secs = parse_time_offset(period)?.num_seconds().abs();
    if period_secs == 0 {
        return Err(Error::argument("sixSigma", 1, "period must be non-zero"));
    }
    if repeats == 0 {
        return Err(Error::argument("sixSigma", 2, "repeats must be > 0"));
    }

    let history_end = align_to_hour(ctx.start_time, Alignment::Backward)?;
    let history_start = (repeats as i64)
        .checked_mul(period_secs)
        .and_then(Duration::try_seconds)
        .and_then(|span| history_end.checked_sub_signed(span))
        .ok_or_else(|| Error::argument("sixSigma", 1, "history window is out of range"))?;
    let history_ctx = ctx.with_window(history_start, history_end);

    let remaining = (ctx.end_timestamp() - history_end.timestamp()).max(0);
    let tiles = ((remaining + period_secs - 1) / period_secs).max(1) as usize;

    let label = period_label(period);
    let mut results = Vec::with_capacity(series_list.len() * 3);

    for series in series_list {
        let target = if series.path_expression.is_empty() {
            series.name.as_str()
        } else {
            series.path_expression.as_str()
        };
        debug!(
            series = %series.name,
            target,
            from = history_ctx.start_timestamp(),
            until = history_ctx.end_timestamp(),
            "Fetching six-sigma history"
        );

        let Some(history) = ctx.evaluate_target(&history_ctx, target)?.into_iter().next() else {
            warn!(series = %series.name, target, "No history returned, skipping series");
            continue;
        };

        let period_length = history.len() / repeats;
        if period_length == 0 {
            warn!(
                series = %series.name,
                samples = history.len(),
                repeats,
                "History shorter than repeat count, skipping series"
            );
            continue;
        }

        let bands = Bands::compute(
            &history.values[..period_length * repeats],
            repeats,
            upper_factor,
            lower_factor,
        )
        .unwrap_or_else(|| {
            warn!(series = %series.name, "History has no samples, bands are empty");
            Bands::empty(period_length)
        });

        let step = (period_secs / period_length as i64).max(1);
        let start = history_end.timestamp();
        let band = |name: String, values: &[Option<f64>]| {
            let values = tile(values, tiles);
            let end = start + step * (values.len() as i64 - 1);
            let mut band = TimeSeries::new(name, start, end, step, values);
            band.consolidation = series.consolidation;
            band
        };

        results.push(band(
            format!("sixSigmaMean({}, period='{}', repeats={})", series.name, label, repeats),
            &bands.mean,
        ));
        results.push(band(
            format!(
                "sixSigmaUpper({}, period='{}', repeats={}, factor={:?})",
                series.name, label, repeats, upper_factor
            ),
            &bands.upper,
        ));
        results.push(band(
            format!(
                "sixSigmaLower({}, period='{}', repeats={}, factor={:?})",
                series.name, label, repeats, lower_factor
            ),
            &bands.lower,
        ));
    }

    Ok(results)
}
