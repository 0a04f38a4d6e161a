//! Configuration for the image matcher.
//!
//! Use [`MatchConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use email_image_match::MatchConfig;
//!
//! let config = MatchConfig::builder()
//!     .threshold(0.9)
//!     .images_dir("./targets")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.pixel_threshold, 0.1);
//! ```

use crate::error::{Error, Result};
use crate::scanner::DEFAULT_LOAD_TIMEOUT;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable for [`MatchConfig::threshold`].
pub const ENV_IMAGE_MATCH_THRESHOLD: &str = "IMAGE_MATCH_THRESHOLD";
/// Environment variable for [`MatchConfig::pixel_threshold`].
pub const ENV_PIXEL_MATCH_THRESHOLD: &str = "PIXEL_MATCH_THRESHOLD";
/// Environment variable for [`MatchConfig::images_dir`].
pub const ENV_IMAGES_DIR: &str = "IMAGES_DIR";
/// Environment variable for [`MatchConfig::debug_dir`].
pub const ENV_DEBUG_IMAGES_DIR: &str = "DEBUG_IMAGES_DIR";

/// Settings for reference loading, scanning and matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum match rate for a candidate to count as a match (default: 0.8).
    pub threshold: f64,
    /// Per-pixel colour tolerance; smaller is stricter (default: 0.1).
    pub pixel_threshold: f64,
    /// Directory holding reference images (default: `./images`).
    pub images_dir: PathBuf,
    /// Directory receiving failed-candidate screenshots (default: `./debug`).
    pub debug_dir: PathBuf,
    /// Per-element wait for images to finish loading (default: 1000 ms).
    pub load_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            pixel_threshold: 0.1,
            images_dir: PathBuf::from("./images"),
            debug_dir: PathBuf::from("./debug"),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

impl MatchConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> MatchConfigBuilder {
        MatchConfigBuilder::default()
    }

    /// Builds a configuration from environment variables.
    ///
    /// Reads `IMAGE_MATCH_THRESHOLD`, `PIXEL_MATCH_THRESHOLD`, `IMAGES_DIR` and
    /// `DEBUG_IMAGES_DIR`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a value cannot be parsed or is out of range.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(threshold) = env_parse::<f64>(ENV_IMAGE_MATCH_THRESHOLD)? {
            builder = builder.threshold(threshold);
        }
        if let Some(pixel_threshold) = env_parse::<f64>(ENV_PIXEL_MATCH_THRESHOLD)? {
            builder = builder.pixel_threshold(pixel_threshold);
        }
        if let Ok(dir) = env::var(ENV_IMAGES_DIR) {
            builder = builder.images_dir(dir);
        }
        if let Ok(dir) = env::var(ENV_DEBUG_IMAGES_DIR) {
            builder = builder.debug_dir(dir);
        }

        builder.build()
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidConfig {
                message: format!("{name}='{raw}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn validate_unit_interval(name: &str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidConfig {
            message: format!("{name} must be within [0, 1], got {value}"),
        })
    }
}

/// Builder for [`MatchConfig`].
#[derive(Debug, Default)]
pub struct MatchConfigBuilder {
    threshold: Option<f64>,
    pixel_threshold: Option<f64>,
    images_dir: Option<PathBuf>,
    debug_dir: Option<PathBuf>,
    load_timeout: Option<Duration>,
}

impl MatchConfigBuilder {
    /// Sets the minimum match rate.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Sets the per-pixel colour tolerance.
    #[must_use]
    pub fn pixel_threshold(mut self, pixel_threshold: f64) -> Self {
        self.pixel_threshold = Some(pixel_threshold);
        self
    }

    /// Sets the reference image directory.
    #[must_use]
    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = Some(dir.into());
        self
    }

    /// Sets the diagnostics directory.
    #[must_use]
    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Sets the per-element image load timeout.
    #[must_use]
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold is outside `[0, 1]` or the load timeout is zero.
    pub fn build(self) -> Result<MatchConfig> {
        let defaults = MatchConfig::default();

        let threshold = validate_unit_interval(
            "threshold",
            self.threshold.unwrap_or(defaults.threshold),
        )?;
        let pixel_threshold = validate_unit_interval(
            "pixel_threshold",
            self.pixel_threshold.unwrap_or(defaults.pixel_threshold),
        )?;

        let load_timeout = self.load_timeout.unwrap_or(defaults.load_timeout);
        if load_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "load_timeout must be non-zero".into(),
            });
        }

        Ok(MatchConfig {
            threshold,
            pixel_threshold,
            images_dir: self.images_dir.unwrap_or(defaults.images_dir),
            debug_dir: self.debug_dir.unwrap_or(defaults.debug_dir),
            load_timeout,
        })
    }
}
