//! Configuration for rendering-stats aggregation
//!
//! Loaded from TOML or built in code; every field has a default so partial
//! files are accepted.

use crate::error::StatsError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do with a window that received no frame-output events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyWindowPolicy {
    /// Emit empty series for the window and keep going (default)
    #[default]
    Lenient,
    /// Fail construction with `StatsError::NotEnoughFrames`
    Strict,
}

/// Aggregation options
///
/// # Example
/// ```
/// use renderstats::config::{EmptyWindowPolicy, StatsConfig};
///
/// let config = StatsConfig::default();
/// assert_eq!(config.empty_window_policy, EmptyWindowPolicy::Lenient);
/// assert!(!config.scan_renderer_for_input_latency);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Handling of windows without frames
    pub empty_window_policy: EmptyWindowPolicy,

    /// Also scan the renderer process for `InputLatency` slices.
    ///
    /// Plugin input events record their latency slices renderer-side; their
    /// records are appended after the browser's.
    pub scan_renderer_for_input_latency: bool,

    /// Decimal places kept for inter-frame intervals
    pub frame_time_precision: u32,

    /// Decimal places kept for approximated pixel percentages
    pub approximation_precision: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            empty_window_policy: EmptyWindowPolicy::Lenient,
            scan_renderer_for_input_latency: false,
            frame_time_precision: 2,
            approximation_precision: 3,
        }
    }
}

impl StatsConfig {
    /// Default options, but a window without frames is an error
    pub fn strict() -> Self {
        Self {
            empty_window_policy: EmptyWindowPolicy::Strict,
            ..Self::default()
        }
    }

    /// Load options from a TOML file
    ///
    /// # Example TOML
    /// ```toml
    /// empty_window_policy = "strict"
    /// scan_renderer_for_input_latency = true
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: StatsConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML stats config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), StatsError> {
        // f64 carries about 15 significant decimal digits
        if self.frame_time_precision > 15 {
            return Err(StatsError::InvalidConfig(format!(
                "frame_time_precision must be <= 15, got {}",
                self.frame_time_precision
            )));
        }
        if self.approximation_precision > 15 {
            return Err(StatsError::InvalidConfig(format!(
                "approximation_precision must be <= 15, got {}",
                self.approximation_precision
            )));
        }
        Ok(())
    }
}
