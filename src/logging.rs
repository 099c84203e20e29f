//! Structured logging setup.
//!
//! Library code only emits `tracing` events. Binaries (and tests that want output)
//! install a subscriber with [`init`]:
//!
//! ```no_run
//! use neuro_roi::{config::RoiConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RoiConfig::load()?;
//! logging::init(&config.logging)?;
//! tracing::info!(component = "cli", "started");
//! # Ok(())
//! # }
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use crate::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, colored (for development)
    Pretty,
    /// One line per event, no colors
    Compact,
    /// One JSON object per event (for log aggregation)
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self, String> {
        match format.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Invalid log format '{}'. Must be one of: pretty, compact, json",
                format
            )),
        }
    }
}

/// Filtered formatting layer for `config`, not yet installed.
pub fn build_layer(
    config: &LoggingConfig,
) -> Result<Box<dyn Layer<Registry> + Send + Sync>, String> {
    let level = parse_log_level(&config.level)?;
    let format = OutputFormat::parse(&config.format)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        OutputFormat::Pretty => fmt::layer().pretty().with_target(true).boxed(),
        OutputFormat::Compact => fmt::layer().compact().with_ansi(false).boxed(),
        OutputFormat::Json => fmt::layer().json().boxed(),
    };
    Ok(fmt_layer.with_filter(env_filter).boxed())
}

/// Install the global subscriber.
///
/// Idempotent: if a global subscriber is already set this returns `Ok(())`.
pub fn init(config: &LoggingConfig) -> Result<(), String> {
    tracing_subscriber::registry()
        .with(build_layer(config)?)
        .try_init()
        .or_else(|e| {
            if e.to_string().contains("a global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse a log level string, case-insensitively.
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
