//! render-eval - apply render functions to graphite render JSON
//!
//! Reads series in graphite render JSON (`[{"target": ..., "datapoints":
//! [[value, ts], ...]}]`), applies one registered function and writes the
//! result in the same format.
//!
//! ```text
//! render-eval apply --function highestMax --input series.json --arg 2
//! render-eval apply --function sixSigma --input day.json --history weeks.json
//! render-eval functions
//! render-eval check-config --config render.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use render_functions::config::{init_logging, Config};
use render_functions::{Arg, Args, EvalContext, Output, TimeSeries};

#[derive(Parser)]
#[command(name = "render-eval")]
#[command(version)]
#[command(about = "Apply graphite render functions to series stored as render JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one function to the input series
    Apply {
        /// Registered function name (e.g. highestMax, sixSigma)
        #[arg(short, long)]
        function: String,

        /// Render JSON file holding the input series
        #[arg(short, long)]
        input: PathBuf,

        /// Extra positional argument; repeat for more
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Render JSON file answering history fetches
        #[arg(long)]
        history: Option<PathBuf>,

        /// Window start (epoch seconds); defaults to the earliest input start
        #[arg(long)]
        from: Option<i64>,

        /// Window end (epoch seconds); defaults to the latest input end
        #[arg(long)]
        until: Option<i64>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// List registered functions
    Functions,

    /// Validate configuration file and print summary
    CheckConfig,
}

// =============================================================================
// Render JSON
// =============================================================================

/// One series in graphite render JSON
#[derive(Debug, Serialize, Deserialize)]
struct RenderSeries {
    target: String,
    datapoints: Vec<(Option<f64>, i64)>,
    /// Explicit step; inferred from the first two datapoints when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<i64>,
}

impl RenderSeries {
    fn into_series(self) -> TimeSeries {
        let start = self.datapoints.first().map(|(_, ts)| *ts).unwrap_or(0);
        let end = self.datapoints.last().map(|(_, ts)| *ts).unwrap_or(start);
        let step = self
            .step
            .or_else(|| match self.datapoints.as_slice() {
                [(_, a), (_, b), ..] => Some(b - a),
                _ => None,
            })
            .filter(|step| *step > 0)
            .unwrap_or(1);
        let values = self.datapoints.into_iter().map(|(v, _)| v).collect();
        TimeSeries::new(self.target, start, end, step, values)
    }

    fn from_series(series: &TimeSeries) -> Self {
        Self {
            target: series.name.clone(),
            datapoints: series.datapoints(),
            step: None,
        }
    }
}

fn read_render_json(path: &Path) -> Result<Vec<TimeSeries>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let parsed: Vec<RenderSeries> = serde_json::from_str(&contents)?;
    Ok(parsed.into_iter().map(RenderSeries::into_series).collect())
}

/// Integers, then floats, then booleans; anything else is a string
fn parse_arg(raw: &str) -> Arg {
    if let Ok(v) = raw.parse::<i64>() {
        Arg::Int(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        Arg::Float(v)
    } else if let Ok(v) = raw.parse::<bool>() {
        Arg::Bool(v)
    } else {
        Arg::Str(raw.to_string())
    }
}

/// Explicit bounds win; otherwise the earliest start and latest end of the input
fn default_window(series_list: &[TimeSeries], from: Option<i64>, until: Option<i64>) -> (i64, i64) {
    let from = from.unwrap_or_else(|| series_list.iter().map(|s| s.start).min().unwrap_or(0));
    let until = until.unwrap_or_else(|| series_list.iter().map(|s| s.end).max().unwrap_or(from));
    (from, until)
}

/// Series named like `target`, or the whole history when none is
fn serve_history(history: &[TimeSeries], target: &str) -> Vec<TimeSeries> {
    let matching: Vec<TimeSeries> = history.iter().filter(|s| s.name == target).cloned().collect();
    if matching.is_empty() {
        history.to_vec()
    } else {
        matching
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => Config::from_file_with_env(&path.to_string_lossy())?,
        None => Config::from_env(),
    };
    Ok(config)
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_apply(
    config: Config,
    function: &str,
    input: &Path,
    raw_args: &[String],
    history: Option<&Path>,
    from: Option<i64>,
    until: Option<i64>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let series_list = read_render_json(input)?;
    let (from, until) = default_window(&series_list, from, until);

    let mut ctx = EvalContext::try_from_timestamps(from, until)?.with_config(Arc::new(config));
    if let Some(path) = history {
        let history = read_render_json(path)?;
        info!(path = %path.display(), series = history.len(), "Loaded history");
        let evaluator = move |_ctx: &EvalContext, target: &str| -> render_functions::Result<Vec<TimeSeries>> {
            Ok(serve_history(&history, target))
        };
        ctx = ctx.with_evaluator(Arc::new(evaluator));
    }

    let mut args = vec![Arg::SeriesList(series_list)];
    args.extend(raw_args.iter().map(|raw| parse_arg(raw)));
    debug!(function, args = args.len(), from, until, "Applying function");

    let output = ctx.registry().call(&ctx, Args::new(function, args))?;
    let rendered: Vec<RenderSeries> = match output {
        Output::SeriesList(list) => list.iter().map(RenderSeries::from_series).collect(),
        Output::SeriesGroups(groups) => groups.iter().flatten().map(RenderSeries::from_series).collect(),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    println!("{}", json);
    Ok(())
}

fn cmd_functions(ctx: &EvalContext) {
    for name in ctx.registry().names() {
        println!("{}", name);
    }
}

fn cmd_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    println!("Configuration is valid!");
    println!();
    println!("Engine Settings:");
    println!("  Percentile interpolation: {}", config.engine.percentile_interpolate);
    println!();
    println!("Six-Sigma Defaults:");
    println!("  Period: {}", config.six_sigma.period);
    println!("  Repeats: {}", config.six_sigma.repeats);
    println!("  Factor: {}", config.six_sigma.factor);
    println!();
    println!("Log level: {}", config.logging.level);

    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging);

    match &cli.command {
        Commands::Apply {
            function,
            input,
            args,
            history,
            from,
            until,
            pretty,
        } => cmd_apply(
            config,
            function,
            input,
            args,
            history.as_deref(),
            *from,
            *until,
            *pretty,
        ),
        Commands::Functions => {
            cmd_functions(&EvalContext::from_timestamps(0, 0));
            Ok(())
        }
        Commands::CheckConfig => cmd_check_config(&config),
    }
}
