//! Evaluation context passed to every function call
//!
//! The context carries the requested display window plus the capabilities a
//! function may need from its caller: a way to evaluate nested targets
//! (used by six-sigma to pull a longer history), the function registry
//! (used by `reduceSeries` to find its reducer) and the engine configuration.
//! All of them are injected; the engine has no hidden global lookups beyond
//! the default standard registry.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::{standard_registry, FunctionRegistry};
use crate::types::TimeSeries;

/// Capability to evaluate a target expression into series
///
/// Supplied by the external resolver that owns storage access and the
/// expression grammar.
pub trait TargetEvaluator: Send + Sync {
    /// Evaluate `target` over the window of `ctx`
    fn evaluate(&self, ctx: &EvalContext, target: &str) -> Result<Vec<TimeSeries>>;
}

impl<F> TargetEvaluator for F
where
    F: Fn(&EvalContext, &str) -> Result<Vec<TimeSeries>> + Send + Sync,
{
    fn evaluate(&self, ctx: &EvalContext, target: &str) -> Result<Vec<TimeSeries>> {
        self(ctx, target)
    }
}

/// Per-request evaluation context
#[derive(Clone)]
pub struct EvalContext {
    /// Start of the requested display window
    pub start_time: DateTime<Utc>,
    /// End of the requested display window
    pub end_time: DateTime<Utc>,
    evaluator: Option<Arc<dyn TargetEvaluator>>,
    registry: Arc<FunctionRegistry>,
    config: Arc<Config>,
}

impl EvalContext {
    /// Create a context for a display window using the standard registry
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            evaluator: None,
            registry: standard_registry(),
            config: Arc::new(Config::default()),
        }
    }

    /// Create a context from epoch-second bounds
    ///
    /// Out-of-range timestamps fall back to the epoch with a warning; use
    /// [`EvalContext::try_from_timestamps`] to reject them instead.
    pub fn from_timestamps(start: i64, end: i64) -> Self {
        let bound = |ts: i64, which: &str| {
            DateTime::from_timestamp(ts, 0).unwrap_or_else(|| {
                warn!(timestamp = ts, bound = which, "Timestamp out of range, using the epoch");
                DateTime::default()
            })
        };
        Self::new(bound(start, "start"), bound(end, "end"))
    }

    /// Create a context from epoch-second bounds, rejecting out-of-range values
    pub fn try_from_timestamps(start: i64, end: i64) -> Result<Self> {
        let bound = |ts: i64, which: &str| {
            DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                Error::format(which, format!("{} is not a representable epoch timestamp", ts))
            })
        };
        Ok(Self::new(bound(start, "from")?, bound(end, "until")?))
    }

    /// Attach a target evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn TargetEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Replace the function registry
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = config;
        self
    }

    /// Same capabilities, different window
    pub fn with_window(&self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            ..self.clone()
        }
    }

    /// Start of the window in epoch seconds
    pub fn start_timestamp(&self) -> i64 {
        self.start_time.timestamp()
    }

    /// End of the window in epoch seconds
    pub fn end_timestamp(&self) -> i64 {
        self.end_time.timestamp()
    }

    /// Function registry used for name-based dispatch
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True when a target evaluator is attached
    pub fn has_evaluator(&self) -> bool {
        self.evaluator.is_some()
    }

    /// Evaluate a nested target over the window of `ctx`
    ///
    /// `ctx` is usually derived from `self` with [`EvalContext::with_window`].
    pub fn evaluate_target(&self, ctx: &EvalContext, target: &str) -> Result<Vec<TimeSeries>> {
        let evaluator = self
            .evaluator
            .as_ref()
            .ok_or_else(|| Error::NoEvaluator(target.to_string()))?;
        evaluator.evaluate(ctx, target)
    }
}

impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("has_evaluator", &self.evaluator.is_some())
            .field("functions", &self.registry.len())
            .finish()
    }
}
