//! Property tests for the render functions
//!
//! Uses property-based testing (proptest) to check invariants that must hold
//! for any input: monotonicity, idempotence and shape preservation.

use proptest::prelude::*;

use render_functions::functions::{
    alias_by_node, highest_max, percentile, remove_above_percentile, replace_missing, safe_max,
    safe_sum, sort_by_total,
};
use render_functions::{EvalContext, TimeSeries};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for finite sample values
fn sample() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-1e6..1e6f64),
        (-1000i32..1000).prop_map(|i| i as f64),
        Just(0.0),
    ]
}

/// Strategy for sparse sample sequences (roughly a third absent)
fn sparse_values(max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(
        prop_oneof![
            2 => sample().prop_map(Some),
            1 => Just(None),
        ],
        0..max_len,
    )
}

/// Strategy for series lists with distinct names
fn series_list(max_series: usize) -> impl Strategy<Value = Vec<TimeSeries>> {
    prop::collection::vec(sparse_values(20), 0..max_series).prop_map(|all| {
        all.into_iter()
            .enumerate()
            .map(|(i, values)| {
                let end = (values.len() as i64 - 1).max(0) * 10;
                TimeSeries::new(format!("metric.s{}", i), 0, end, 10, values)
            })
            .collect()
    })
}

/// Strategy for dotted metric names
fn metric_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_-]{0,7}", 1..6).prop_map(|nodes| nodes.join("."))
}

fn ctx() -> EvalContext {
    EvalContext::from_timestamps(0, 200)
}

// =============================================================================
// Percentiles
// =============================================================================

mod percentile_props {
    use super::*;

    proptest! {
        #[test]
        fn monotone_in_p(values in sparse_values(50), p1 in 0.0..100.0f64, p2 in 0.0..100.0f64, interpolate in any::<bool>()) {
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            match (percentile(&values, lo, interpolate), percentile(&values, hi, interpolate)) {
                (Some(a), Some(b)) => prop_assert!(a <= b, "p{} = {} > p{} = {}", lo, a, hi, b),
                (None, None) => prop_assert!(values.iter().all(Option::is_none)),
                other => prop_assert!(false, "inconsistent presence: {:?}", other),
            }
        }

        #[test]
        fn result_within_sample_range(values in sparse_values(50), p in 0.0..=100.0f64, interpolate in any::<bool>()) {
            if let Some(v) = percentile(&values, p, interpolate) {
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                let min = present.iter().copied().fold(f64::INFINITY, f64::min);
                let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(v >= min && v <= max);
            }
        }

        #[test]
        fn remove_above_percentile_bounds(list in series_list(5), p in 1.0..100.0f64) {
            let thresholds: Vec<Option<f64>> =
                list.iter().map(|s| percentile(s.values(), p, false)).collect();
            let filtered = remove_above_percentile(&ctx(), list.clone(), p);

            prop_assert_eq!(filtered.len(), list.len());
            for ((before, after), threshold) in list.iter().zip(&filtered).zip(thresholds) {
                prop_assert_eq!(before.len(), after.len());
                if let Some(t) = threshold {
                    prop_assert!(after.values.iter().flatten().all(|v| *v <= t));
                }
            }
        }
    }
}

// =============================================================================
// Gap filling
// =============================================================================

mod gap_fill_props {
    use super::*;

    proptest! {
        #[test]
        fn idempotent(values in sparse_values(40)) {
            let once = replace_missing(&values);
            let twice = replace_missing(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn preserves_known_samples(values in sparse_values(40)) {
            let filled = replace_missing(&values);
            prop_assert_eq!(filled.len(), values.len());
            for (before, after) in values.iter().zip(&filled) {
                if before.is_some() {
                    prop_assert_eq!(before, after);
                }
            }
            let any_present = values.iter().any(Option::is_some);
            prop_assert_eq!(filled.iter().all(Option::is_some), any_present || values.is_empty());
        }
    }
}

// =============================================================================
// Ranking
// =============================================================================

mod ranking_props {
    use super::*;

    proptest! {
        #[test]
        fn highest_max_is_prefix_of_larger_n(list in series_list(8), n in 0usize..8) {
            let small = highest_max(&ctx(), list.clone(), n);
            let large = highest_max(&ctx(), list, n + 1);
            prop_assert_eq!(&small[..], &large[..small.len()]);
            prop_assert!(small.len() <= n);
        }

        #[test]
        fn highest_max_is_sorted(list in series_list(8)) {
            let n = list.len();
            let ranked = highest_max(&ctx(), list, n);
            let maxes: Vec<Option<f64>> = ranked.iter().map(|s| safe_max(s.values())).collect();
            for pair in maxes.windows(2) {
                match (pair[0], pair[1]) {
                    (Some(a), Some(b)) => prop_assert!(a >= b),
                    (None, Some(_)) => prop_assert!(false, "absent max ranked above present"),
                    _ => {}
                }
            }
        }

        #[test]
        fn sort_by_total_keeps_every_series(list in series_list(8)) {
            let mut before: Vec<String> = list.iter().map(|s| s.name.clone()).collect();
            let sorted = sort_by_total(&ctx(), list);
            let mut after: Vec<String> = sorted.iter().map(|s| s.name.clone()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
            let totals: Vec<Option<f64>> = sorted.iter().map(|s| safe_sum(s.values())).collect();
            for pair in totals.windows(2) {
                if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                    prop_assert!(a >= b);
                }
            }
        }
    }
}

// =============================================================================
// Naming
// =============================================================================

mod naming_props {
    use super::*;

    proptest! {
        #[test]
        fn alias_by_all_nodes_reconstructs_name(name in metric_name()) {
            let nodes: Vec<i64> = (0..name.split('.').count() as i64).collect();
            let series = TimeSeries::from_values(name.clone(), 0, 1, &[1.0]);
            let renamed = alias_by_node(&ctx(), vec![series], &nodes).unwrap();
            prop_assert_eq!(&renamed[0].name, &name);
        }

        #[test]
        fn negative_nodes_mirror_positive(name in metric_name()) {
            let count = name.split('.').count() as i64;
            let series = TimeSeries::from_values(name, 0, 1, &[1.0]);
            let forward = alias_by_node(&ctx(), vec![series.clone()], &[count - 1]).unwrap();
            let backward = alias_by_node(&ctx(), vec![series], &[-1]).unwrap();
            prop_assert_eq!(&forward[0].name, &backward[0].name);
        }
    }
}
