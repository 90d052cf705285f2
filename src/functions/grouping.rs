//! Name-driven grouping and reduction
//!
//! `map_series` partitions a list by one name node; `reduce_series` folds
//! each partition with a reducer looked up by name in the context registry.
//!
//! ```text
//! group.server1.metric1 ┐                   ┌ group.server1.reduce.divideSeries
//! group.server1.metric2 ┘ ── reduceSeries ──┤
//! group.server2.metric1 ┐   (node 2)        └ group.server2.reduce.divideSeries
//! group.server2.metric2 ┘
//! ```

use tracing::debug;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::functions::naming::{node_at, resolve_node};
use crate::registry::{Arg, Args};
use crate::types::{TimeSeries, NODE_SEPARATOR};

/// Group series by the name node at `node`
///
/// Groups appear in first-seen order; members keep their input order.
pub fn map_series(_ctx: &EvalContext, series_list: Vec<TimeSeries>, node: i64) -> Result<Vec<Vec<TimeSeries>>> {
    let mut keys: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<TimeSeries>> = Vec::new();

    for series in series_list {
        let key = node_at(&series.name, node)?.to_string();
        match keys.iter().position(|k| *k == key) {
            Some(index) => groups[index].push(series),
            None => {
                keys.push(key);
                groups.push(vec![series]);
            }
        }
    }

    Ok(groups)
}

/// Reduction key: the nodes before `position` followed by `reduce.<reducer>`
fn reduction_key(fragments: &[&str], position: usize, reducer: &str) -> String {
    let mut key: Vec<&str> = fragments[..position].to_vec();
    key.push("reduce");
    key.push(reducer);
    key.join(&NODE_SEPARATOR.to_string())
}

/// Reduce each group of related series to a single series
///
/// The node at `node` of every member name selects its slot among
/// `matchers`; members matching no matcher are ignored. Each reduction key
/// must have a member for every matcher, otherwise the whole call fails.
/// The reducer receives the members in matcher order and its first result
/// is renamed `<prefix>.reduce.<reducer>`.
pub fn reduce_series(
    ctx: &EvalContext,
    groups: Vec<Vec<TimeSeries>>,
    reducer: &str,
    node: i64,
    matchers: &[String],
) -> Result<Vec<TimeSeries>> {
    let reduce = ctx.registry().get(reducer)?;

    let mut keys: Vec<String> = Vec::new();
    let mut slots: Vec<Vec<Option<TimeSeries>>> = Vec::new();

    for series in groups.into_iter().flatten() {
        let fragments: Vec<&str> = series.name.split(NODE_SEPARATOR).collect();
        let position = resolve_node(&series.name, fragments.len(), node)?;
        let Some(slot) = matchers.iter().position(|m| m == fragments[position]) else {
            continue;
        };

        let key = reduction_key(&fragments, position, reducer);
        let index = match keys.iter().position(|k| *k == key) {
            Some(index) => index,
            None => {
                keys.push(key);
                slots.push(vec![None; matchers.len()]);
                keys.len() - 1
            }
        };
        slots[index][slot] = Some(series);
    }

    let mut results = Vec::with_capacity(keys.len());
    for (key, members) in keys.into_iter().zip(slots) {
        let members = members
            .into_iter()
            .zip(matchers)
            .map(|(member, matcher)| {
                member.ok_or_else(|| Error::MissingGroupMember {
                    group: key.clone(),
                    matcher: matcher.clone(),
                })
            })
            .collect::<Result<Vec<TimeSeries>>>()?;

        debug!(reducer, group = %key, members = members.len(), "Reducing series group");
        let reduced = reduce(ctx, Args::new(reducer, vec![Arg::SeriesList(members)]))?;
        let mut series = reduced
            .into_series_list()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Evaluation {
                target: key.clone(),
                message: format!("reducer {} returned no series", reducer),
            })?;
        series.name = key.clone();
        series.path_expression = key;
        results.push(series);
    }

    Ok(results)
}
