//! Render Functions - graphite-style time-series function engine
//!
//! This library provides the series-transforming half of a render pipeline:
//! - Null-safe aggregation, gap-filling and percentiles over sparse series
//! - Ranking, filtering, naming and render-attribute functions
//! - Name-driven grouping and reduction (`mapSeries` / `reduceSeries`)
//! - Six-sigma anomaly bands and least-squares trend projection
//! - A name → function registry for dispatch from expression evaluators
//!
//! Fetching data and parsing target expressions belong to the caller, which
//! plugs in through [`context::TargetEvaluator`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Render functions grouped by family
pub mod functions;

/// Function registry for name-based dispatch
pub mod registry;

// Re-export main types
pub use context::{EvalContext, TargetEvaluator};
pub use error::{Error, Result};
pub use registry::{standard_registry, Arg, Args, FunctionRegistry, Output};
pub use types::{Consolidation, OptionValue, TimeSeries};
