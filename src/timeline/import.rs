//! Chrome trace-event JSON import
//!
//! Accepts both the JSON array form and the JSON object form (`traceEvents`).
//! Event timestamps are microseconds on disk and milliseconds in the model.
//!
//! Handled phases:
//! - `M`: `process_name` / `thread_name` metadata
//! - `X`: complete slices; `B`/`E`: duration slices
//! - `b`/`e` (and legacy `S`/`F`): async slices, nested by `(pid, cat, id)`
//!
//! Everything else is counted and skipped.

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::model::{AsyncSlice, ThreadRef, Timeline};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const MICROS_PER_MILLI: f64 = 1000.0;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceFile {
    Array(Vec<RawEvent>),
    Object {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<RawEvent>,
    },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    cat: String,
    ph: String,
    #[serde(default)]
    ts: Option<f64>,
    #[serde(default)]
    dur: Option<f64>,
    #[serde(default)]
    pid: u64,
    #[serde(default)]
    tid: u64,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    args: Value,
}

impl RawEvent {
    fn thread(&self) -> ThreadRef {
        ThreadRef::new(self.pid, self.tid)
    }

    fn timestamp_ms(&self) -> TimelineResult<f64> {
        self.ts
            .map(|ts| ts / MICROS_PER_MILLI)
            .ok_or_else(|| {
                TimelineError::InvalidEvent(format!("'{}' ({}) has no ts", self.name, self.ph))
            })
    }

    fn async_key(&self) -> TimelineResult<(u64, String, String)> {
        let id = match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(TimelineError::InvalidEvent(format!(
                    "async event '{}' has no id",
                    self.name
                )))
            }
        };
        Ok((self.pid, self.cat.clone(), id))
    }
}

impl Timeline {
    /// Import a trace from a Chrome trace-event JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TimelineResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Import and finalize a trace from Chrome trace-event JSON text
    pub fn from_json_str(json: &str) -> TimelineResult<Self> {
        let events = match serde_json::from_str::<TraceFile>(json)? {
            TraceFile::Array(events) => events,
            TraceFile::Object { trace_events } => trace_events,
        };
        Importer::default().run(events)
    }
}

#[derive(Default)]
struct Importer {
    timeline: Timeline,
    open_async: HashMap<(u64, String, String), Vec<AsyncSlice>>,
    skipped: usize,
}

impl Importer {
    fn run(mut self, mut events: Vec<RawEvent>) -> TimelineResult<Timeline> {
        // Stable sort keeps file order between events sharing a timestamp.
        events.sort_by(|a, b| {
            a.ts.unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.ts.unwrap_or(f64::NEG_INFINITY))
        });

        for event in &events {
            self.import_event(event)?;
        }

        let unterminated: usize = self.open_async.values().map(Vec::len).sum();
        if unterminated > 0 {
            tracing::warn!("Dropping {} unterminated async slice(s)", unterminated);
        }
        if self.skipped > 0 {
            tracing::debug!("Skipped {} trace event(s) with unhandled phases", self.skipped);
        }

        self.timeline.finalize_import();
        Ok(self.timeline)
    }

    fn import_event(&mut self, event: &RawEvent) -> TimelineResult<()> {
        match event.ph.as_str() {
            "M" => self.import_metadata(event),
            "X" => {
                let start = event.timestamp_ms()?;
                let duration = event.dur.unwrap_or(0.0) / MICROS_PER_MILLI;
                self.timeline.thread_mut(event.thread()).push_complete_slice(
                    &event.cat,
                    &event.name,
                    start,
                    duration,
                    event.args.clone(),
                );
            }
            "B" => {
                let start = event.timestamp_ms()?;
                self.timeline.thread_mut(event.thread()).begin_slice(
                    &event.cat,
                    &event.name,
                    start,
                    event.args.clone(),
                );
            }
            "E" => {
                let end = event.timestamp_ms()?;
                if self.timeline.thread_mut(event.thread()).end_slice(end).is_none() {
                    tracing::warn!(
                        "pid {} tid {}: end event at {} with no open slice",
                        event.pid,
                        event.tid,
                        end
                    );
                }
            }
            "b" | "S" => {
                let start = event.timestamp_ms()?;
                let slice = AsyncSlice::new(&event.cat, &event.name, start, event.thread())
                    .with_args(event.args.clone());
                self.open_async
                    .entry(event.async_key()?)
                    .or_default()
                    .push(slice);
            }
            "e" | "F" => self.end_async(event)?,
            _ => self.skipped += 1,
        }
        Ok(())
    }

    fn import_metadata(&mut self, event: &RawEvent) {
        let Some(name) = event.args.get("name").and_then(Value::as_str) else {
            return;
        };
        match event.name.as_str() {
            "process_name" => {
                self.timeline.get_or_create_process(event.pid).name = Some(name.to_string());
            }
            "thread_name" => {
                self.timeline.thread_mut(event.thread()).name = Some(name.to_string());
            }
            _ => self.skipped += 1,
        }
    }

    fn end_async(&mut self, event: &RawEvent) -> TimelineResult<()> {
        let end = event.timestamp_ms()?;
        let key = event.async_key()?;
        let Some(stack) = self.open_async.get_mut(&key) else {
            tracing::warn!("Async end '{}' at {} with no matching begin", event.name, end);
            return Ok(());
        };
        let Some(mut slice) = stack.pop() else {
            tracing::warn!("Async end '{}' at {} with no matching begin", event.name, end);
            return Ok(());
        };

        slice.duration = (end - slice.start).max(0.0);
        slice.end_thread = event.thread();
        if let Value::Object(extra) = &event.args {
            if let Value::Object(args) = &mut slice.args {
                for (k, v) in extra {
                    args.entry(k.clone()).or_insert_with(|| v.clone());
                }
            } else if !extra.is_empty() {
                slice.args = event.args.clone();
            }
        }

        match stack.last_mut() {
            Some(parent) => parent.sub_slices.push(slice),
            None => {
                self.open_async.remove(&key);
                self.timeline.thread_mut(slice.start_thread).add_async_slice(slice);
            }
        }
        Ok(())
    }
}
