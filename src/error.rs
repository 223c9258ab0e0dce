//! Error types for timeline handling and rendering-stats aggregation

use thiserror::Error;

/// Errors raised while building, importing or querying a timeline
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Markers {found:?} do not match the requested names {expected:?}")]
    MarkerMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Marker '{first}' overlaps marker '{second}'")]
    MarkerOverlap { first: String, second: String },

    #[error("Invalid trace event: {0}")]
    InvalidEvent(String),

    #[error("Failed to parse trace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while constructing [`RenderingStats`](crate::rendering_stats::RenderingStats)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Not enough frames in window {window_index} [{start}, {end})")]
    NotEnoughFrames {
        window_index: usize,
        start: f64,
        end: f64,
    },

    #[error("Invalid window {index}: {reason}")]
    InvalidWindows { index: usize, reason: String },

    #[error("Process {pid} has not been finalized")]
    UnfinalizedProcess { pid: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for timeline operations
pub type TimelineResult<T> = std::result::Result<T, TimelineError>;

/// Result type for aggregation
pub type Result<T> = std::result::Result<T, StatsError>;
