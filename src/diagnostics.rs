//! Non-fatal, per-event faults observed while aggregating
//!
//! Instrumentation data is often partial. A broken event is skipped and
//! recorded here instead of aborting the whole computation.

use serde::Serialize;
use std::fmt;

/// One skipped or partially used trace event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A qualifying event lacks a payload field it needs
    MalformedPayload {
        event: String,
        timestamp: f64,
        field: String,
    },
    /// A rendering-stats event reports more than one frame
    MultiFrameStats {
        event: String,
        timestamp: f64,
        frame_count: u64,
    },
    /// A recognized input event lacks a latency component
    MissingComponent {
        event: String,
        timestamp: f64,
        component: String,
    },
}

impl Diagnostic {
    /// Log the diagnostic and pass it through
    pub(crate) fn emit(self) -> Self {
        tracing::warn!("{}", self);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedPayload {
                event,
                timestamp,
                field,
            } => write!(f, "{} at {}: missing payload field '{}'", event, timestamp, field),
            Diagnostic::MultiFrameStats {
                event,
                timestamp,
                frame_count,
            } => write!(
                f,
                "{} at {}: multi-frame stats (frame_count={})",
                event, timestamp, frame_count
            ),
            Diagnostic::MissingComponent {
                event,
                timestamp,
                component,
            } => write!(f, "{} at {}: missing component {}", event, timestamp, component),
        }
    }
}
