//! Half-open time windows ("action ranges")

use crate::error::{Result, StatsError};
use crate::timeline::model::{Marker, Slice};
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` on the trace time axis (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Window spanning a marker slice
    pub fn from_slice(marker: &Slice) -> Self {
        Self::new(marker.start, marker.end())
    }

    /// Window spanning a marker found by marker lookup
    pub fn from_marker(marker: &Marker<'_>) -> Self {
        Self::new(marker.start(), marker.end())
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// True when no timestamp can fall inside the window
    pub fn is_empty(&self) -> bool {
        !(self.start < self.end)
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Check that windows are well formed, ordered and non-overlapping
pub fn validate_windows(windows: &[TimeWindow]) -> Result<()> {
    for (index, window) in windows.iter().enumerate() {
        if !window.start.is_finite() || !window.end.is_finite() {
            return Err(StatsError::InvalidWindows {
                index,
                reason: "bounds must be finite".to_string(),
            });
        }
        if window.end < window.start {
            return Err(StatsError::InvalidWindows {
                index,
                reason: format!("end {} precedes start {}", window.end, window.start),
            });
        }
    }

    for (index, pair) in windows.windows(2).enumerate() {
        if pair[1].start < pair[0].end {
            return Err(StatsError::InvalidWindows {
                index: index + 1,
                reason: format!(
                    "starts at {} before the previous window ends at {}",
                    pair[1].start, pair[0].end
                ),
            });
        }
    }

    Ok(())
}

/// Index of the window containing `timestamp`.
///
/// `windows` must have passed [`validate_windows`], so their ends are non-decreasing.
pub fn locate(windows: &[TimeWindow], timestamp: f64) -> Option<usize> {
    let index = windows.partition_point(|window| window.end <= timestamp);
    windows
        .get(index)
        .filter(|window| window.contains(timestamp))
        .map(|_| index)
}
