//! Name-based function dispatch
//!
//! Maps graphite function names to entry points so that callers holding
//! only a name (an expression evaluator, `reduceSeries` looking up its
//! reducer, the CLI) can invoke a function with loosely typed arguments.
//!
//! # Example
//!
//! ```rust
//! use render_functions::context::EvalContext;
//! use render_functions::registry::{Arg, Args};
//! use render_functions::types::TimeSeries;
//!
//! let ctx = EvalContext::from_timestamps(0, 10);
//! let series = vec![
//!     TimeSeries::from_values("a", 0, 1, &[1.0, 2.0]),
//!     TimeSeries::from_values("b", 0, 1, &[5.0, 1.0]),
//! ];
//! let args = Args::new("highestMax", vec![Arg::SeriesList(series), Arg::Int(1)]);
//! let top = ctx.registry().call(&ctx, args).unwrap().into_series_list().unwrap();
//! assert_eq!(top[0].name, "b");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::debug_span;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions;
use crate::types::TimeSeries;

/// One positional argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A list of series
    SeriesList(Vec<TimeSeries>),
    /// Series partitioned into groups (output of `mapSeries`)
    SeriesGroups(Vec<Vec<TimeSeries>>),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Arg::SeriesList(_) => "series list",
            Arg::SeriesGroups(_) => "series groups",
            Arg::Int(_) => "integer",
            Arg::Float(_) => "number",
            Arg::Str(_) => "string",
            Arg::Bool(_) => "boolean",
        }
    }
}

/// Positional arguments for one call, tagged with the function name
///
/// Accessors report [`Error::InvalidArgument`] naming the function and the
/// zero-based position. Series arguments are moved out on access.
#[derive(Debug, Clone)]
pub struct Args {
    function: String,
    args: Vec<Option<Arg>>,
}

impl Args {
    /// Arguments for a call to `function`
    pub fn new(function: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            function: function.into(),
            args: args.into_iter().map(Some).collect(),
        }
    }

    /// Name of the function being called
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Number of positional arguments, including ones already moved out
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// True when the call has no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn error(&self, position: usize, message: impl Into<String>) -> Error {
        Error::argument(self.function.as_str(), position, message)
    }

    fn peek(&self, position: usize) -> Option<&Arg> {
        self.args.get(position).and_then(Option::as_ref)
    }

    fn require(&self, position: usize) -> Result<&Arg> {
        self.peek(position)
            .ok_or_else(|| self.error(position, "missing required argument"))
    }

    fn mismatch(&self, position: usize, expected: &str, found: &Arg) -> Error {
        self.error(position, format!("expected {}, found {}", expected, found.kind()))
    }

    /// Move a series list out of `position`
    pub fn series_list(&mut self, position: usize) -> Result<Vec<TimeSeries>> {
        match self.args.get_mut(position).and_then(Option::take) {
            Some(Arg::SeriesList(list)) => Ok(list),
            Some(other) => {
                let err = self.mismatch(position, "series list", &other);
                self.args[position] = Some(other);
                Err(err)
            }
            None => Err(self.error(position, "missing required argument")),
        }
    }

    /// Move every series list from `position` onwards into one list
    pub fn series_lists_from(&mut self, position: usize) -> Result<Vec<TimeSeries>> {
        let mut merged = Vec::new();
        for pos in position..self.args.len() {
            merged.extend(self.series_list(pos)?);
        }
        Ok(merged)
    }

    /// Move series groups out of `position`; a plain list counts as one group
    pub fn series_groups(&mut self, position: usize) -> Result<Vec<Vec<TimeSeries>>> {
        match self.args.get_mut(position).and_then(Option::take) {
            Some(Arg::SeriesGroups(groups)) => Ok(groups),
            Some(Arg::SeriesList(list)) => Ok(vec![list]),
            Some(other) => {
                let err = self.mismatch(position, "series groups", &other);
                self.args[position] = Some(other);
                Err(err)
            }
            None => Err(self.error(position, "missing required argument")),
        }
    }

    /// Integer; whole floats are accepted
    pub fn int(&self, position: usize) -> Result<i64> {
        match self.require(position)? {
            Arg::Int(v) => Ok(*v),
            Arg::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(self.mismatch(position, "integer", other)),
        }
    }

    /// Integer with a default when the position is absent
    pub fn int_or(&self, position: usize, default: i64) -> Result<i64> {
        match self.peek(position) {
            Some(_) => self.int(position),
            None => Ok(default),
        }
    }

    /// Non-negative integer, used for counts
    pub fn count_or(&self, position: usize, default: usize) -> Result<usize> {
        match self.peek(position) {
            Some(_) => usize::try_from(self.int(position)?)
                .map_err(|_| self.error(position, "expected a non-negative integer")),
            None => Ok(default),
        }
    }

    /// Every integer from `position` onwards
    pub fn ints_from(&self, position: usize) -> Result<Vec<i64>> {
        (position..self.args.len()).map(|pos| self.int(pos)).collect()
    }

    /// Number; integers are widened
    pub fn float(&self, position: usize) -> Result<f64> {
        match self.require(position)? {
            Arg::Float(v) => Ok(*v),
            Arg::Int(v) => Ok(*v as f64),
            other => Err(self.mismatch(position, "number", other)),
        }
    }

    /// Number with a default when the position is absent
    pub fn float_or(&self, position: usize, default: f64) -> Result<f64> {
        match self.peek(position) {
            Some(_) => self.float(position),
            None => Ok(default),
        }
    }

    /// Number, or `None` when the position is absent
    pub fn optional_float(&self, position: usize) -> Result<Option<f64>> {
        match self.peek(position) {
            Some(_) => self.float(position).map(Some),
            None => Ok(None),
        }
    }

    /// String literal
    pub fn str(&self, position: usize) -> Result<&str> {
        match self.require(position)? {
            Arg::Str(v) => Ok(v.as_str()),
            other => Err(self.mismatch(position, "string", other)),
        }
    }

    /// String argument; numbers are rendered, so `period=7` style calls
    /// and numeric factors both work
    pub fn text_or(&self, position: usize, default: &str) -> Result<String> {
        match self.peek(position) {
            None => Ok(default.to_string()),
            Some(Arg::Str(v)) => Ok(v.clone()),
            Some(Arg::Int(v)) => Ok(v.to_string()),
            Some(Arg::Float(v)) => Ok(v.to_string()),
            Some(other) => Err(self.mismatch(position, "string", other)),
        }
    }

    /// Every string from `position` onwards
    pub fn strs_from(&self, position: usize) -> Result<Vec<String>> {
        (position..self.args.len())
            .map(|pos| self.str(pos).map(str::to_string))
            .collect()
    }
}

/// Result of a call
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A list of series
    SeriesList(Vec<TimeSeries>),
    /// Grouped series
    SeriesGroups(Vec<Vec<TimeSeries>>),
}

impl Output {
    /// Unwrap a series list; groups are an evaluation error
    pub fn into_series_list(self) -> Result<Vec<TimeSeries>> {
        match self {
            Output::SeriesList(list) => Ok(list),
            Output::SeriesGroups(_) => Err(Error::Evaluation {
                target: "output".to_string(),
                message: "expected a series list, got series groups".to_string(),
            }),
        }
    }

    /// Flatten into a single list regardless of shape
    pub fn flatten(self) -> Vec<TimeSeries> {
        match self {
            Output::SeriesList(list) => list,
            Output::SeriesGroups(groups) => groups.into_iter().flatten().collect(),
        }
    }
}

impl From<Vec<TimeSeries>> for Output {
    fn from(list: Vec<TimeSeries>) -> Self {
        Output::SeriesList(list)
    }
}

impl From<Output> for Arg {
    fn from(output: Output) -> Self {
        match output {
            Output::SeriesList(list) => Arg::SeriesList(list),
            Output::SeriesGroups(groups) => Arg::SeriesGroups(groups),
        }
    }
}

/// Registered entry point
pub type SeriesFunction = Arc<dyn Fn(&EvalContext, Args) -> Result<Output> + Send + Sync>;

lazy_static! {
    static ref STANDARD: Arc<FunctionRegistry> = Arc::new(FunctionRegistry::standard());
}

/// Shared registry holding every built-in function
pub fn standard_registry() -> Arc<FunctionRegistry> {
    Arc::clone(&STANDARD)
}

/// Immutable name → function table
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, SeriesFunction>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a registry from scratch
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with every built-in function
    pub fn standard() -> Self {
        RegistryBuilder::standard().build()
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Result<SeriesFunction> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    /// True when `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Dispatch a call to the function named in `args`
    pub fn call(&self, ctx: &EvalContext, args: Args) -> Result<Output> {
        let function = self.get(args.function())?;
        let span = debug_span!("render_function", function = %args.function(), args = args.len());
        let _enter = span.enter();
        function(ctx, args)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Builder for custom registries
#[derive(Default)]
pub struct RegistryBuilder {
    functions: HashMap<String, SeriesFunction>,
}

impl RegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the built-in functions
    pub fn standard() -> Self {
        let mut builder = Self::new();
        register_standard(&mut builder);
        builder
    }

    /// Add or replace a function
    pub fn register<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&EvalContext, Args) -> Result<Output> + Send + Sync + 'static,
    {
        self.insert(name, function);
        self
    }

    fn insert<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&EvalContext, Args) -> Result<Output> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Freeze into a registry
    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry {
            functions: self.functions,
        }
    }
}

// ============================================================================
// Built-in bindings
// ============================================================================

/// Register a function whose only argument is a series list
fn unary(
    builder: &mut RegistryBuilder,
    name: &str,
    function: fn(&EvalContext, Vec<TimeSeries>) -> Vec<TimeSeries>,
) {
    builder.insert(name, move |ctx: &EvalContext, mut args: Args| {
        Ok(function(ctx, args.series_list(0)?).into())
    });
}

/// Register a combiner taking any number of series lists
fn combiner(
    builder: &mut RegistryBuilder,
    name: &str,
    function: fn(&EvalContext, Vec<TimeSeries>) -> Vec<TimeSeries>,
) {
    builder.insert(name, move |ctx: &EvalContext, mut args: Args| {
        Ok(function(ctx, args.series_lists_from(0)?).into())
    });
}

fn register_standard(b: &mut RegistryBuilder) {
    // Ranking and filtering
    b.insert("highestMax", |ctx: &EvalContext, mut args: Args| {
        let n = args.count_or(1, 1)?;
        Ok(functions::highest_max(ctx, args.series_list(0)?, n).into())
    });
    unary(b, "sortByTotal", functions::sort_by_total);
    b.insert("limit", |ctx: &EvalContext, mut args: Args| {
        let n = args.count_or(1, usize::MAX)?;
        Ok(functions::limit(ctx, args.series_list(0)?, n).into())
    });
    b.insert("removeAbovePercentile", |ctx: &EvalContext, mut args: Args| {
        let p = args.float(1)?;
        Ok(functions::remove_above_percentile(ctx, args.series_list(0)?, p).into())
    });
    b.insert("removeBelowPercentile", |ctx: &EvalContext, mut args: Args| {
        let p = args.float(1)?;
        Ok(functions::remove_below_percentile(ctx, args.series_list(0)?, p).into())
    });
    b.insert("removeAboveValue", |ctx: &EvalContext, mut args: Args| {
        let v = args.float(1)?;
        Ok(functions::remove_above_value(ctx, args.series_list(0)?, v).into())
    });
    b.insert("removeBelowValue", |ctx: &EvalContext, mut args: Args| {
        let v = args.float(1)?;
        Ok(functions::remove_below_value(ctx, args.series_list(0)?, v).into())
    });

    // Percentiles and gap-fill
    b.insert("nPercentile", |ctx: &EvalContext, mut args: Args| {
        let p = args.float(1)?;
        Ok(functions::n_percentile(ctx, args.series_list(0)?, p)?.into())
    });
    b.insert("transformNull", |ctx: &EvalContext, mut args: Args| {
        let default = args.float_or(1, 0.0)?;
        Ok(functions::transform_null(ctx, args.series_list(0)?, default).into())
    });
    b.insert("scale", |ctx: &EvalContext, mut args: Args| {
        let factor = args.float(1)?;
        Ok(functions::scale(ctx, args.series_list(0)?, factor).into())
    });

    // Naming
    b.insert("alias", |ctx: &EvalContext, mut args: Args| {
        let name = args.str(1)?.to_string();
        Ok(functions::alias(ctx, args.series_list(0)?, &name).into())
    });
    b.insert("aliasSub", |ctx: &EvalContext, mut args: Args| {
        let pattern = args.str(1)?.to_string();
        let replacement = args.str(2)?.to_string();
        Ok(functions::alias_sub(ctx, args.series_list(0)?, &pattern, &replacement)?.into())
    });
    b.insert("aliasByNode", |ctx: &EvalContext, mut args: Args| {
        let nodes = args.ints_from(1)?;
        Ok(functions::alias_by_node(ctx, args.series_list(0)?, &nodes)?.into())
    });

    // Render attributes
    b.insert("color", |ctx: &EvalContext, mut args: Args| {
        let color = args.str(1)?.to_string();
        Ok(functions::color(ctx, args.series_list(0)?, &color).into())
    });
    b.insert("alpha", |ctx: &EvalContext, mut args: Args| {
        let alpha = args.float(1)?;
        Ok(functions::alpha(ctx, args.series_list(0)?, alpha).into())
    });
    b.insert("lineWidth", |ctx: &EvalContext, mut args: Args| {
        let width = args.float(1)?;
        Ok(functions::line_width(ctx, args.series_list(0)?, width).into())
    });
    unary(b, "secondYAxis", functions::second_y_axis);
    unary(b, "drawAsInfinite", functions::draw_as_infinite);

    // Grouping
    b.insert("mapSeries", |ctx: &EvalContext, mut args: Args| {
        let node = args.int(1)?;
        Ok(Output::SeriesGroups(functions::map_series(ctx, args.series_list(0)?, node)?))
    });
    b.insert("reduceSeries", |ctx: &EvalContext, mut args: Args| {
        let reducer = args.str(1)?.to_string();
        let node = args.int(2)?;
        let matchers = args.strs_from(3)?;
        let groups = args.series_groups(0)?;
        Ok(functions::reduce_series(ctx, groups, &reducer, node, &matchers)?.into())
    });

    // Forecasting
    b.insert("sixSigma", |ctx: &EvalContext, mut args: Args| {
        let defaults = &ctx.config().six_sigma;
        let period = args.text_or(1, &defaults.period)?;
        let repeats = args.count_or(2, defaults.repeats)?;
        let factor = args.text_or(3, &defaults.factor)?;
        Ok(functions::six_sigma(ctx, args.series_list(0)?, &period, repeats, &factor)?.into())
    });
    b.insert("linregress", |ctx: &EvalContext, mut args: Args| {
        let min_valid_values = args.optional_float(1)?;
        Ok(functions::linregress(ctx, args.series_list(0)?, min_valid_values).into())
    });

    // Combiners
    combiner(b, "sumSeries", functions::sum_series);
    combiner(b, "averageSeries", functions::average_series);
    combiner(b, "maxSeries", functions::max_series);
    combiner(b, "minSeries", functions::min_series);
    combiner(b, "diffSeries", functions::diff_series);
    b.insert("divideSeries", |ctx: &EvalContext, mut args: Args| {
        Ok(functions::divide_series(ctx, args.series_lists_from(0)?)?.into())
    });
    b.insert("asPercent", |ctx: &EvalContext, mut args: Args| {
        Ok(functions::as_percent(ctx, args.series_lists_from(0)?)?.into())
    });
}
