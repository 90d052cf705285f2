//! Core data types used throughout the function engine
//!
//! # Key Types
//!
//! - **`TimeSeries`**: A named, fixed-step sequence of optional samples
//! - **`Consolidation`**: How raw points were reduced to the series resolution
//! - **`OptionValue`**: A render hint attached to a series
//!
//! # Example
//!
//! ```rust
//! use render_functions::types::TimeSeries;
//!
//! let series = TimeSeries::new("collectd.db1.load.value", 0, 4, 1, vec![Some(1.0), None, Some(3.0)]);
//! assert_eq!(series.len(), 3);
//! assert_eq!(series.valid_count(), 2);
//! assert_eq!(series.timestamps(), vec![0, 1, 2]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between the nodes of a metric name
pub const NODE_SEPARATOR: char = '.';

/// How raw sub-step points were consolidated into one sample
///
/// Advisory metadata only; no function enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consolidation {
    /// Arithmetic mean of the raw points
    #[default]
    Average,
    /// Sum of the raw points
    Sum,
    /// Largest raw point
    Max,
    /// Smallest raw point
    Min,
    /// Most recent raw point
    Last,
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consolidation::Average => write!(f, "average"),
            Consolidation::Sum => write!(f, "sum"),
            Consolidation::Max => write!(f, "max"),
            Consolidation::Min => write!(f, "min"),
            Consolidation::Last => write!(f, "last"),
        }
    }
}

/// Value of a render hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Flag hints such as `secondYAxis`
    Bool(bool),
    /// Numeric hints such as `lineWidth` or `alpha`
    Number(f64),
    /// Free-form hints
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Number(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

/// A named, fixed-interval sequence of optional numeric samples
///
/// `values[i]` is the sample at `start + i * step`. An absent sample (`None`)
/// means "no data" and is distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// Display label
    pub name: String,
    /// First sample timestamp (epoch seconds)
    pub start: i64,
    /// Last sample timestamp (epoch seconds)
    pub end: i64,
    /// Seconds between samples
    pub step: i64,
    /// Samples in chronological order
    pub values: Vec<Option<f64>>,
    /// Consolidation used upstream
    #[serde(default)]
    pub consolidation: Consolidation,
    /// Render hints, never read by numeric code
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    /// Colour attribute set by `color()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Query this series was derived from
    #[serde(default)]
    pub path_expression: String,
}

impl TimeSeries {
    /// Create a series; the path expression starts out equal to the name
    pub fn new(
        name: impl Into<String>,
        start: i64,
        end: i64,
        step: i64,
        values: Vec<Option<f64>>,
    ) -> Self {
        let name = name.into();
        Self {
            path_expression: name.clone(),
            name,
            start,
            end,
            step,
            values,
            consolidation: Consolidation::default(),
            options: BTreeMap::new(),
            color: None,
        }
    }

    /// Create a series with every sample present
    pub fn from_values(name: impl Into<String>, start: i64, step: i64, values: &[f64]) -> Self {
        let end = start + step * (values.len() as i64 - 1).max(0);
        Self::new(name, start, end, step, values.iter().copied().map(Some).collect())
    }

    /// Builder-style path expression setter
    pub fn with_path_expression(mut self, path: impl Into<String>) -> Self {
        self.path_expression = path.into();
        self
    }

    /// Copy of this series' metadata with a new name and new samples
    ///
    /// Start and step are kept; the end is recomputed from the sample count.
    pub fn derive(&self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let name = name.into();
        let end = self.start + self.step * (values.len() as i64 - 1).max(0);
        Self {
            path_expression: name.clone(),
            name,
            start: self.start,
            end,
            step: self.step,
            values,
            consolidation: self.consolidation,
            options: self.options.clone(),
            color: self.color.clone(),
        }
    }

    /// Number of sample slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series has no sample slots
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples as a slice
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Number of present samples
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Timestamp of every sample slot
    pub fn timestamps(&self) -> Vec<i64> {
        (0..self.values.len() as i64)
            .map(|i| self.start + i * self.step)
            .collect()
    }

    /// `[value, timestamp]` pairs in graphite render-JSON order
    pub fn datapoints(&self) -> Vec<(Option<f64>, i64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, self.start + i as i64 * self.step))
            .collect()
    }

    /// Set a render hint
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.options.insert(key.into(), value.into());
    }

    /// Look up a render hint
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Split the name into its nodes
    pub fn nodes(&self) -> Vec<&str> {
        self.name.split(NODE_SEPARATOR).collect()
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeSeries(name={}, start={}, end={}, step={})",
            self.name, self.start, self.end, self.step
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_basics() {
        let series = TimeSeries::new("a.b.c", 10, 30, 10, vec![Some(1.0), None, Some(2.0)]);
        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
        assert_eq!(series.valid_count(), 2);
        assert_eq!(series.timestamps(), vec![10, 20, 30]);
        assert_eq!(series.path_expression, "a.b.c");
        assert_eq!(series.nodes(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_datapoints() {
        let series = TimeSeries::new("x", 100, 120, 10, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(
            series.datapoints(),
            vec![(Some(1.0), 100), (None, 110), (Some(3.0), 120)]
        );
    }

    #[test]
    fn test_derive_keeps_metadata() {
        let mut series = TimeSeries::from_values("x", 0, 5, &[1.0, 2.0]);
        series.set_option("lineWidth", 3.0);
        let derived = series.derive("y", vec![Some(9.0); 4]);
        assert_eq!(derived.name, "y");
        assert_eq!(derived.path_expression, "y");
        assert_eq!(derived.end, 15);
        assert_eq!(derived.option("lineWidth"), Some(&OptionValue::Number(3.0)));
    }

    #[test]
    fn test_serde_camel_case() {
        let series = TimeSeries::from_values("x", 0, 1, &[1.0]).with_path_expression("foo.*");
        let json = serde_json::to_string(&series).unwrap();
        assert!(json.contains("\"pathExpression\":\"foo.*\""));
        let back: TimeSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_consolidation_display() {
        assert_eq!(Consolidation::Average.to_string(), "average");
        assert_eq!(Consolidation::Last.to_string(), "last");
    }
}
