//! Configuration management for the render function engine
//!
//! TOML file support, environment variable overrides, and defaults that
//! mirror the stock graphite function signatures.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::functions::six_sigma::{parse_factor, parse_time_offset};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// General engine behaviour
    #[serde(default)]
    pub engine: EngineConfig,

    /// Six-sigma defaults used when a call omits its parameters
    #[serde(default)]
    pub six_sigma: SixSigmaConfig,

    /// Logging setup
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Interpolate between neighbouring ranks in percentile functions
    #[serde(default)]
    pub percentile_interpolate: bool,
}

/// Six-sigma defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SixSigmaConfig {
    /// Length of one cycle (e.g. "7d", "1d")
    #[serde(default = "default_period")]
    pub period: String,

    /// Number of historical cycles averaged together
    #[serde(default = "default_repeats")]
    pub repeats: usize,

    /// Band width in standard deviations, "v" or "upper:lower"
    #[serde(default = "default_factor")]
    pub factor: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

// Default value functions
fn default_period() -> String { "7d".to_string() }
fn default_repeats() -> usize { 8 }
fn default_factor() -> String { "3".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for SixSigmaConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            repeats: default_repeats(),
            factor: default_factor(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file {}: {}", path, e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(interpolate) = std::env::var("RENDER_PERCENTILE_INTERPOLATE") {
            if let Ok(v) = interpolate.parse() {
                self.engine.percentile_interpolate = v;
            }
        }

        // Six-sigma
        if let Ok(period) = std::env::var("RENDER_SIX_SIGMA_PERIOD") {
            self.six_sigma.period = period;
        }
        if let Ok(repeats) = std::env::var("RENDER_SIX_SIGMA_REPEATS") {
            if let Ok(r) = repeats.parse() {
                self.six_sigma.repeats = r;
            }
        }
        if let Ok(factor) = std::env::var("RENDER_SIX_SIGMA_FACTOR") {
            self.six_sigma.factor = factor;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let period = parse_time_offset(&self.six_sigma.period)?;
        if period.num_seconds() == 0 {
            return Err(Error::Configuration(
                "Six-sigma period must be non-zero".to_string(),
            ));
        }
        if self.six_sigma.repeats == 0 {
            return Err(Error::Configuration(
                "Six-sigma repeats must be > 0".to_string(),
            ));
        }
        parse_factor(&self.six_sigma.factor)?;

        if self.logging.level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr so stdout stays free for render JSON. Calling this more than once
/// is harmless; only the first subscriber is installed.
pub fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init();
}
