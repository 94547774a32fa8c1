//! Tracing setup for the `digi-daq` binary.
//!
//! Builds a `tracing-subscriber` registry with a single fmt layer in one of
//! three formats (pretty, compact, JSON) and an env filter. `RUST_LOG`
//! overrides the configured level when set.
//!
//! # Example
//! ```no_run
//! use digi_daq::logging::{self, OutputFormat, TracingConfig};
//! use tracing::Level;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TracingConfig::new(Level::DEBUG).with_format(OutputFormat::Compact);
//! logging::init(config)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::AppConfig;

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for interactive use)
    #[default]
    Pretty,
    /// Compact single-line format without colors
    Compact,
    /// JSON format for log aggregation
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to include the event target
    pub with_target: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            with_file_and_line: false,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the `[daq]` application settings
    pub fn from_app_config(config: &AppConfig) -> Result<Self, String> {
        let level = parse_log_level(&config.log_level)?;

        Ok(Self {
            level,
            format: config.log_format,
            ..Default::default()
        })
    }

    /// Create tracing config with custom settings
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable file and line numbers
    pub fn with_file_and_line(mut self, enabled: bool) -> Self {
        self.with_file_and_line = enabled;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize the global subscriber.
///
/// Idempotent: if a global subscriber is already set, returns `Ok(())`.
pub fn init(config: TracingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(config.level)));

    let fmt_layer = fmt::layer()
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line)
        .with_target(config.with_target);

    let layer = match config.format {
        OutputFormat::Pretty => fmt_layer
            .pretty()
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => fmt_layer
            .compact()
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt_layer.json().with_filter(env_filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            // Tests and embedding applications may have set one already
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}

fn level_to_filter_string(level: Level) -> String {
    match level {
        Level::TRACE => "trace".to_string(),
        Level::DEBUG => "debug".to_string(),
        Level::INFO => "info".to_string(),
        Level::WARN => "warn".to_string(),
        Level::ERROR => "error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));

        // Case insensitive
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));

        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_tracing_config_from_app_config() {
        let app = AppConfig {
            log_level: "debug".to_string(),
            log_format: OutputFormat::Json,
            ..Default::default()
        };

        let tracing_config = TracingConfig::from_app_config(&app).unwrap();
        assert!(matches!(tracing_config.level, Level::DEBUG));
        assert_eq!(tracing_config.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_level_in_app_config() {
        let app = AppConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(TracingConfig::from_app_config(&app).is_err());
    }

    #[test]
    fn test_tracing_config_builder() {
        let config = TracingConfig::new(Level::WARN)
            .with_format(OutputFormat::Json)
            .with_file_and_line(true)
            .with_ansi(false);

        assert!(matches!(config.level, Level::WARN));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.with_file_and_line);
        assert!(!config.with_ansi);
    }
}
