//! Series renaming
//!
//! Node-based addressing splits a metric name on `.`; negative indices count
//! from the end. Addressing a node that does not exist fails the whole call.

use lazy_static::lazy_static;
use regex::Regex;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::types::{TimeSeries, NODE_SEPARATOR};

lazy_static! {
    /// Innermost metric path of a possibly function-wrapped name
    static ref METRIC_PATH: Regex =
        Regex::new(r"(?:.*\()?(?P<name>[-\w*\.]+)(?:,|\)?.*)?").expect("metric path pattern is valid");

    /// `\1`-style back-references in replacement strings
    static ref BACKREFERENCE: Regex = Regex::new(r"\\(\d+)").expect("back-reference pattern is valid");
}

/// Resolve a possibly negative node index against `nodes` fragments
pub(crate) fn resolve_node(name: &str, nodes: usize, index: i64) -> Result<usize> {
    let resolved = if index < 0 { nodes as i64 + index } else { index };
    if resolved < 0 || resolved >= nodes as i64 {
        return Err(Error::NodeOutOfRange {
            name: name.to_string(),
            index,
            nodes,
        });
    }
    Ok(resolved as usize)
}

/// Fragment of `name` at node `index`
pub(crate) fn node_at<'a>(name: &'a str, index: i64) -> Result<&'a str> {
    let fragments: Vec<&str> = name.split(NODE_SEPARATOR).collect();
    let position = resolve_node(name, fragments.len(), index)?;
    Ok(fragments[position])
}

/// Strip function wrappers: `sumSeries(a.b.c)` -> `a.b.c`
pub(crate) fn metric_path(name: &str) -> &str {
    METRIC_PATH
        .captures(name)
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str())
        .unwrap_or(name)
}

/// Replace every name with a literal
pub fn alias(_ctx: &EvalContext, series_list: Vec<TimeSeries>, new_name: &str) -> Vec<TimeSeries> {
    series_list
        .into_iter()
        .map(|mut series| {
            series.name = new_name.to_string();
            series
        })
        .collect()
}

/// Replace the first match of `pattern` in every name
///
/// `\1` back-references in `replacement` refer to capture groups.
pub fn alias_sub(
    _ctx: &EvalContext,
    series_list: Vec<TimeSeries>,
    pattern: &str,
    replacement: &str,
) -> Result<Vec<TimeSeries>> {
    let regex = Regex::new(pattern)?;
    let replacement = BACKREFERENCE.replace_all(replacement, "$${$1}").into_owned();

    Ok(series_list
        .into_iter()
        .map(|mut series| {
            series.name = regex.replace(&series.name, replacement.as_str()).into_owned();
            series
        })
        .collect())
}

/// Rename every series to the selected nodes of its metric path
///
/// ```rust
/// use render_functions::context::EvalContext;
/// use render_functions::functions::alias_by_node;
/// use render_functions::types::TimeSeries;
///
/// let ctx = EvalContext::from_timestamps(0, 1);
/// let series = TimeSeries::from_values("collectd.db1.load.value", 0, 1, &[1.0]);
/// let renamed = alias_by_node(&ctx, vec![series], &[1, -1]).unwrap();
/// assert_eq!(renamed[0].name, "db1.value");
/// ```
pub fn alias_by_node(_ctx: &EvalContext, series_list: Vec<TimeSeries>, nodes: &[i64]) -> Result<Vec<TimeSeries>> {
    series_list
        .into_iter()
        .map(|mut series| {
            let path = metric_path(&series.name);
            let fragments: Vec<&str> = path.split(NODE_SEPARATOR).collect();
            let selected = nodes
                .iter()
                .map(|&index| resolve_node(path, fragments.len(), index).map(|i| fragments[i]))
                .collect::<Result<Vec<&str>>>()?;
            series.name = selected.join(&NODE_SEPARATOR.to_string());
            Ok(series)
        })
        .collect()
}
