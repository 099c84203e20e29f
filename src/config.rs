//! Configuration loaded with Figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults (every field has one)
//! 2. `config/neuro_roi.toml`, or the file passed to [`RoiConfig::load_from`]
//! 3. environment variables prefixed `NEURO_ROI_`, nested keys separated by `__`
//!
//! # Example
//! ```no_run
//! use neuro_roi::config::RoiConfig;
//!
//! // NEURO_ROI_SEGMENTATION__FAN_SEGMENTS=12 overrides the file value
//! let config = RoiConfig::load()?;
//! config.validate()?;
//! println!("fan columns: {}", config.segmentation.fan_segments);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{RoiError, RoiResult};
use crate::geometry::tour::{DEFAULT_TOUR_CEILING, MAX_TOUR_NODES};
use crate::roi::{ellipse, fan};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/neuro_roi.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "NEURO_ROI_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoiConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Segmentation defaults
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_format")]
    pub format: String,
}

/// Segmentation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Wedges per ellipse
    #[serde(default = "default_ellipse_segments")]
    pub ellipse_segments: usize,
    /// Columns per fan
    #[serde(default = "default_fan_segments")]
    pub fan_segments: usize,
    /// Largest glomerulus count ordered by shortest path
    #[serde(default = "default_max_tour")]
    pub max_tour_glomeruli: usize,
}

/// Persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend used when none is requested (json, hdf5)
    #[serde(default = "default_storage_format")]
    pub default_format: String,
    /// Directory region files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_ellipse_segments() -> usize {
    ellipse::DEFAULT_SEGMENTS
}

fn default_fan_segments() -> usize {
    fan::DEFAULT_SEGMENTS
}

fn default_max_tour() -> usize {
    DEFAULT_TOUR_CEILING
}

fn default_storage_format() -> String {
    "json".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("rois")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            ellipse_segments: default_ellipse_segments(),
            fan_segments: default_fan_segments(),
            max_tour_glomeruli: default_max_tour(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_format: default_storage_format(),
            output_dir: default_output_dir(),
        }
    }
}

/// Accepted log levels.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted log output formats.
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Accepted storage formats.
pub const STORAGE_FORMATS: [&str; 2] = ["json", "hdf5"];

impl RoiConfig {
    /// Load from the default file and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` and the environment. A missing file yields the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(RoiConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Check values the type system cannot.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> RoiResult<()> {
        let check = |field: &str, value: &str, allowed: &[&str]| -> RoiResult<()> {
            if allowed.contains(&value.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(RoiError::InvalidParameter(format!(
                    "Invalid {} '{}'. Must be one of: {}",
                    field,
                    value,
                    allowed.join(", ")
                )))
            }
        };
        check("logging.level", &self.logging.level, &LOG_LEVELS)?;
        check("logging.format", &self.logging.format, &LOG_FORMATS)?;
        check("storage.default_format", &self.storage.default_format, &STORAGE_FORMATS)?;

        let segments = [
            ("segmentation.ellipse_segments", self.segmentation.ellipse_segments),
            ("segmentation.fan_segments", self.segmentation.fan_segments),
        ];
        for (field, value) in segments {
            if value == 0 {
                return Err(RoiError::InvalidParameter(format!(
                    "{} must be at least 1",
                    field
                )));
            }
        }

        if self.segmentation.max_tour_glomeruli > MAX_TOUR_NODES {
            return Err(RoiError::InvalidParameter(format!(
                "segmentation.max_tour_glomeruli {} exceeds the solver limit of {}",
                self.segmentation.max_tour_glomeruli, MAX_TOUR_NODES
            )));
        }
        Ok(())
    }
}

impl SegmentationConfig {
    /// Glomerulus ceiling for shortest-path ordering. An explicit request wins over
    /// `max_tour_glomeruli`; the solver clamps either to its own limit.
    pub fn tour_ceiling(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.max_tour_glomeruli)
    }
}
