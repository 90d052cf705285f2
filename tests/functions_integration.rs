//! Integration tests for render function pipelines
//!
//! These tests chain functions the way a render request would:
//! - Gap filling ahead of ranking
//! - Percentile filters driven by the engine configuration
//! - Renaming of function-wrapped series
//! - Map/reduce over related series with real and custom reducers
//! - Trend projection

use std::sync::Arc;

use parking_lot::Mutex;

use render_functions::config::Config;
use render_functions::functions::*;
use render_functions::registry::{FunctionRegistry, Output};
use render_functions::types::OptionValue;
use render_functions::{Arg, Args, EvalContext, Error, TimeSeries};

// ============================================================================
// Helper Functions
// ============================================================================

fn ctx() -> EvalContext {
    EvalContext::from_timestamps(0, 100)
}

fn hosts() -> Vec<TimeSeries> {
    vec![
        TimeSeries::new(
            "collectd.db1.load.value",
            0,
            40,
            10,
            vec![Some(1.0), None, Some(5.0), None, Some(3.0)],
        ),
        TimeSeries::new("collectd.db2.load.value", 0, 40, 10, vec![None; 5]),
        TimeSeries::new(
            "collectd.db3.load.value",
            0,
            40,
            10,
            vec![Some(2.0), Some(8.0), None, Some(4.0), Some(2.0)],
        ),
    ]
}

fn names(series_list: &[TimeSeries]) -> Vec<&str> {
    series_list.iter().map(|s| s.name.as_str()).collect()
}

// ============================================================================
// Ranking pipelines
// ============================================================================

#[test]
fn test_highest_max_then_alias_by_node() {
    let top = highest_max(&ctx(), hosts(), 2);
    let renamed = alias_by_node(&ctx(), top, &[1]).unwrap();
    assert_eq!(names(&renamed), vec!["db3", "db1"]);
}

#[test]
fn test_inputs_survive_when_cloned() {
    let original = hosts();
    let sorted = sort_by_total(&ctx(), original.clone());
    assert_eq!(names(&sorted)[0], "collectd.db3.load.value");
    assert_eq!(original[0].name, "collectd.db1.load.value");
    assert_eq!(original[0].values[1], None);
}

#[test]
fn test_gap_fill_before_ranking() {
    let filled: Vec<TimeSeries> = hosts()
        .into_iter()
        .map(|s| {
            let values = replace_missing(s.values());
            s.derive(s.name.clone(), values)
        })
        .collect();

    assert_eq!(
        filled[0].values,
        vec![Some(1.0), Some(3.0), Some(5.0), Some(4.0), Some(3.0)]
    );
    assert_eq!(filled[1].valid_count(), 0);
    assert_eq!(sort_by_total(&ctx(), filled)[0].name, "collectd.db3.load.value");
}

#[test]
fn test_transform_null_then_total() {
    let zeroed = transform_null(&ctx(), hosts(), 0.0);
    assert_eq!(zeroed[1].name, "transformNull(collectd.db2.load.value, 0)");
    assert_eq!(safe_sum(zeroed[1].values()), Some(0.0));
    assert_eq!(safe_sum(zeroed[0].values()), Some(9.0));
}

// ============================================================================
// Percentiles and configuration
// ============================================================================

#[test]
fn test_percentile_interpolation_follows_config() {
    let series = vec![TimeSeries::from_values("x", 0, 1, &[1.0, 2.0, 3.0, 4.0])];

    let plain = n_percentile(&ctx(), series.clone(), 50.0).unwrap();
    assert_eq!(plain[0].values[0], Some(3.0));

    let mut config = Config::default();
    config.engine.percentile_interpolate = true;
    let interpolating = ctx().with_config(Arc::new(config));
    let smooth = n_percentile(&interpolating, series, 50.0).unwrap();
    assert_eq!(smooth[0].values[0], Some(2.5));
}

#[test]
fn test_remove_above_percentile_blanks_outliers() {
    let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
    let series = vec![TimeSeries::from_values("latency", 0, 1, &values)];

    let trimmed = remove_above_percentile(&ctx(), series, 90.0);
    assert_eq!(trimmed[0].len(), 101);
    assert_eq!(trimmed[0].valid_count(), 92);
    assert!(trimmed[0].values.iter().flatten().all(|v| *v <= 91.0));
}

#[test]
fn test_n_percentile_through_registry_rejects_bad_percent() {
    let args = Args::new("nPercentile", vec![Arg::SeriesList(hosts()), Arg::Int(0)]);
    let err = ctx().registry().call(&ctx(), args).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

// ============================================================================
// Naming and attributes
// ============================================================================

#[test]
fn test_alias_by_node_on_wrapped_name() {
    let summed = sum_series(&ctx(), hosts());
    assert!(summed[0].name.starts_with("sumSeries(collectd.db1.load.value,"));

    let wrapped = vec![TimeSeries::from_values("sumSeries(collectd.db1.load.value)", 0, 1, &[1.0])];
    let renamed = alias_by_node(&ctx(), wrapped, &[1, 2]).unwrap();
    assert_eq!(renamed[0].name, "db1.load");
}

#[test]
fn test_alias_by_node_out_of_range_aborts() {
    let err = alias_by_node(&ctx(), hosts(), &[10000]).unwrap_err();
    assert!(err.is_addressing_error());
}

#[test]
fn test_alias_sub_with_backreference() {
    let renamed = alias_sub(&ctx(), hosts(), r"collectd\.(\w+)\.load\.value", r"\1 load").unwrap();
    assert_eq!(names(&renamed), vec!["db1 load", "db2 load", "db3 load"]);
}

#[test]
fn test_alias_sub_invalid_pattern() {
    assert!(matches!(
        alias_sub(&ctx(), hosts(), "(unclosed", "x"),
        Err(Error::Regex(_))
    ));
}

#[test]
fn test_attributes_do_not_touch_samples() {
    let before = hosts();
    let styled = line_width(&ctx(), color(&ctx(), before.clone(), "red"), 2.0);
    let styled = second_y_axis(&ctx(), draw_as_infinite(&ctx(), alpha(&ctx(), styled, 0.5)));

    for (a, b) in before.iter().zip(&styled) {
        assert_eq!(a.values, b.values);
        assert_eq!(b.color.as_deref(), Some("red"));
        assert_eq!(b.option("lineWidth"), Some(&OptionValue::Number(2.0)));
        assert_eq!(b.option("alpha"), Some(&OptionValue::Number(0.5)));
        assert_eq!(b.option("secondYAxis"), Some(&OptionValue::Bool(true)));
        assert_eq!(b.option("drawAsInfinite"), Some(&OptionValue::Bool(true)));
    }
}

// ============================================================================
// Map / reduce
// ============================================================================

fn disk_series() -> Vec<TimeSeries> {
    vec![
        TimeSeries::from_values("servers.web1.disk.used", 0, 60, &[30.0, 40.0]),
        TimeSeries::from_values("servers.web1.disk.total", 0, 60, &[100.0, 100.0]),
        TimeSeries::from_values("servers.web2.disk.used", 0, 60, &[10.0, 0.0]),
        TimeSeries::from_values("servers.web2.disk.total", 0, 60, &[50.0, 0.0]),
        TimeSeries::from_values("servers.web2.disk.free", 0, 60, &[40.0, 0.0]),
    ]
}

#[test]
fn test_map_reduce_as_percent() {
    let mapped = map_series(&ctx(), disk_series(), 1).unwrap();
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[1].len(), 3);

    let matchers = vec!["used".to_string(), "total".to_string()];
    let reduced = reduce_series(&ctx(), mapped, "asPercent", 3, &matchers).unwrap();

    assert_eq!(names(&reduced), vec![
        "servers.web1.disk.reduce.asPercent",
        "servers.web2.disk.reduce.asPercent",
    ]);
    assert_eq!(reduced[0].values, vec![Some(30.0), Some(40.0)]);
    assert_eq!(reduced[1].values, vec![Some(20.0), None]);
    assert_eq!(reduced[0].path_expression, reduced[0].name);
}

#[test]
fn test_reduce_with_custom_reducer() {
    let calls: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);

    let registry = FunctionRegistry::builder()
        .register("mock", move |_ctx: &EvalContext, mut args: Args| {
            let members = args.series_list(0)?;
            seen.lock().push(members.iter().map(|s| s.name.clone()).collect());
            Ok(Output::SeriesList(vec![members[0].clone()]))
        })
        .build();
    let ctx = ctx().with_registry(Arc::new(registry));

    let matchers = vec!["total".to_string(), "used".to_string()];
    let reduced = reduce_series(&ctx, vec![disk_series()], "mock", 3, &matchers).unwrap();

    assert_eq!(names(&reduced), vec![
        "servers.web1.disk.reduce.mock",
        "servers.web2.disk.reduce.mock",
    ]);
    let calls = calls.lock();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], vec!["servers.web1.disk.total", "servers.web1.disk.used"]);
    assert_eq!(calls[1], vec!["servers.web2.disk.total", "servers.web2.disk.used"]);
}

#[test]
fn test_reduce_missing_member_aborts() {
    let matchers = vec!["used".to_string(), "free".to_string()];
    let err = reduce_series(&ctx(), vec![disk_series()], "sumSeries", 3, &matchers).unwrap_err();
    assert!(err.is_addressing_error());
}

#[test]
fn test_reducer_returning_nothing_is_an_error() {
    let registry = FunctionRegistry::builder()
        .register("nothing", |_ctx: &EvalContext, _args: Args| Ok(Output::SeriesList(Vec::new())))
        .build();
    let ctx = ctx().with_registry(Arc::new(registry));

    let matchers = vec!["used".to_string()];
    let err = reduce_series(&ctx, vec![disk_series()], "nothing", 3, &matchers).unwrap_err();
    assert!(matches!(err, Error::Evaluation { .. }));
}

// ============================================================================
// Combiners and regression
// ============================================================================

#[test]
fn test_divide_series_requires_two() {
    let err = divide_series(&ctx(), hosts()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test]
fn test_average_skips_absent_columns() {
    let averaged = average_series(&ctx(), hosts());
    assert_eq!(
        averaged[0].values,
        vec![Some(1.5), Some(8.0), Some(5.0), Some(4.0), Some(2.5)]
    );
}

#[test]
fn test_linregress_through_registry() {
    let values: Vec<f64> = (0..50).map(|i| (i * 4) as f64).collect();
    let series = TimeSeries::from_values("test", 0, 2, &values);
    let ctx = EvalContext::from_timestamps(0, 200);

    let args = Args::new("linregress", vec![Arg::SeriesList(vec![series])]);
    let projected = ctx.registry().call(&ctx, args).unwrap().into_series_list().unwrap();

    assert_eq!(projected[0].name, "linregress(test)");
    assert_eq!(projected[0].values.first(), Some(&Some(0.0)));
    assert_eq!(projected[0].values.last(), Some(&Some(400.0)));
}
