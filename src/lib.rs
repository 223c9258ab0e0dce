//! Renderstats - frame-timing and input-latency metrics from browser traces
//!
//! This library imports Chrome trace-event timelines, picks the most
//! authoritative source of frame timestamps available, and aggregates
//! per-window frame times, approximated-pixel percentages, and input
//! latencies correlated from the browser's async latency records.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod latency;
pub mod numeric;
pub mod rendering_stats;
pub mod report;
pub mod timeline;

pub use config::{EmptyWindowPolicy, StatsConfig};
pub use error::{StatsError, TimelineError};
pub use rendering_stats::{FrameSource, RenderingStats};
