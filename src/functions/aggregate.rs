//! Null-safe aggregation over optional samples
//!
//! Every fold skips absent samples. An empty or all-absent input yields
//! `None`, never zero, so missing data cannot win or lose a comparison.

/// Sum of present samples
pub fn safe_sum(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .fold(None, |acc, &v| Some(acc.unwrap_or(0.0) + v))
}

/// Largest present sample
pub fn safe_max(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .fold(None, |acc: Option<f64>, &v| Some(acc.map_or(v, |m| m.max(v))))
}

/// Smallest present sample
pub fn safe_min(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .fold(None, |acc: Option<f64>, &v| Some(acc.map_or(v, |m| m.min(v))))
}

/// Number of present samples
pub fn safe_count(values: &[Option<f64>]) -> usize {
    values.iter().flatten().count()
}

/// Mean of present samples
pub fn safe_avg(values: &[Option<f64>]) -> Option<f64> {
    let count = safe_count(values);
    if count == 0 {
        return None;
    }
    safe_sum(values).map(|sum| sum / count as f64)
}

/// Most recent present sample
pub fn safe_last(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().flatten().next().copied()
}
