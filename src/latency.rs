//! Input latency correlation
//!
//! Input events dump their latency history into the trace as async slices
//! named `InputLatency`. Each sub-slice names the input event type and carries
//! the pipeline "component times" (microseconds) the event passed through:
//!
//! ```text
//! InputLatency                              (browser thread → renderer thread)
//! └─ InputLatency::GestureScrollUpdate     args.data = {
//!        INPUT_EVENT_LATENCY_ORIGINAL_COMPONENT:            {time: 1200.0},
//!        INPUT_EVENT_LATENCY_TERMINATED_FRAME_SWAP_COMPONENT: {time: 18400.0},
//!    }
//! ```
//!
//! A recognized sub-slice reduces to one latency in milliseconds:
//! `(end_component_time - start_component_time) / 1000`.

use crate::diagnostics::Diagnostic;
use crate::timeline::{AsyncSlice, Process, TimeWindow};
use serde::Serialize;
use serde_json::Value;

/// Name of the top-level async slice input events are recorded under
pub const INPUT_LATENCY_EVENT_NAME: &str = "InputLatency";

/// When the input event was originally created by the OS
pub const ORIGINAL_COMP_NAME: &str = "INPUT_EVENT_LATENCY_ORIGINAL_COMPONENT";
/// When the input event first reached the browser
pub const UI_COMP_NAME: &str = "INPUT_EVENT_LATENCY_UI_COMPONENT";
/// When the input event was sent from browser to renderer
pub const BEGIN_COMP_NAME: &str = "INPUT_EVENT_LATENCY_BEGIN_RWH_COMPONENT";
/// When an input event was turned into a scroll update
pub const BEGIN_SCROLL_UPDATE_COMP_NAME: &str =
    "INPUT_EVENT_LATENCY_BEGIN_SCROLL_UPDATE_MAIN_COMPONENT";
/// When a scroll update was forwarded to the main thread
pub const FORWARD_SCROLL_UPDATE_COMP_NAME: &str =
    "INPUT_EVENT_LATENCY_FORWARD_SCROLL_UPDATE_TO_MAIN_COMPONENT";
/// When the resulting frame was swapped
pub const END_COMP_NAME: &str = "INPUT_EVENT_LATENCY_TERMINATED_FRAME_SWAP_COMPONENT";

/// Coalesced main-thread scroll update
pub const SCROLL_UPDATE_EVENT_NAME: &str = "InputLatency::ScrollUpdate";
/// Gesture scroll update
pub const GESTURE_SCROLL_UPDATE_EVENT_NAME: &str = "InputLatency::GestureScrollUpdate";
pub const MOUSE_WHEEL_EVENT_NAME: &str = "InputLatency::MouseWheel";
pub const TOUCH_MOVE_EVENT_NAME: &str = "InputLatency::TouchMove";

/// Start components of pointer/gesture events, earliest pipeline stage first
const GENERIC_START_COMPONENTS: &[&str] = &[ORIGINAL_COMP_NAME, UI_COMP_NAME, BEGIN_COMP_NAME];

/// An input event type the correlator knows how to measure
#[derive(Debug, Clone, Copy)]
pub struct InputEventKind {
    pub name: &'static str,
    /// Candidate start components; the first one present is used
    pub start_components: &'static [&'static str],
    pub end_component: &'static str,
}

/// Every recognized sub-slice name with its component pair
pub const RECOGNIZED_INPUT_EVENTS: &[InputEventKind] = &[
    InputEventKind {
        name: GESTURE_SCROLL_UPDATE_EVENT_NAME,
        start_components: GENERIC_START_COMPONENTS,
        end_component: END_COMP_NAME,
    },
    InputEventKind {
        name: MOUSE_WHEEL_EVENT_NAME,
        start_components: GENERIC_START_COMPONENTS,
        end_component: END_COMP_NAME,
    },
    InputEventKind {
        name: TOUCH_MOVE_EVENT_NAME,
        start_components: GENERIC_START_COMPONENTS,
        end_component: END_COMP_NAME,
    },
    InputEventKind {
        name: SCROLL_UPDATE_EVENT_NAME,
        start_components: &[BEGIN_SCROLL_UPDATE_COMP_NAME],
        end_component: END_COMP_NAME,
    },
];

/// Look up a sub-slice name among the recognized input events
pub fn recognize(name: &str) -> Option<&'static InputEventKind> {
    RECOGNIZED_INPUT_EVENTS.iter().find(|kind| kind.name == name)
}

/// Latency of one input event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputLatency {
    /// Sub-slice name, e.g. `InputLatency::GestureScrollUpdate`
    pub name: String,
    /// End-to-end latency (milliseconds)
    pub latency_ms: f64,
    /// The start component time used (microseconds)
    pub start_component_time: f64,
}

/// Output of one [`scan`]: latencies in encounter order plus skipped events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyScan {
    pub records: Vec<InputLatency>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LatencyScan {
    /// Append another scan's records and diagnostics after this one's
    pub fn extend(&mut self, other: LatencyScan) {
        self.records.extend(other.records);
        self.diagnostics.extend(other.diagnostics);
    }

    /// Latencies of records whose name satisfies `keep`
    pub fn latencies_where(&self, keep: impl Fn(&str) -> bool) -> Vec<f64> {
        self.records
            .iter()
            .filter(|record| keep(&record.name))
            .map(|record| record.latency_ms)
            .collect()
    }
}

/// Collect the latency of every recognized input event starting in `window`.
///
/// Visits each top-level `InputLatency` async slice of `root` whose start lies
/// in `window` (threads in id order, slices in recorded order) and each of its
/// immediate sub-slices. Unrecognized sub-slice names are skipped silently.
pub fn scan(root: &Process, window: &TimeWindow) -> LatencyScan {
    let mut result = LatencyScan::default();

    for event in root
        .iter_all_async_slices_of_name(INPUT_LATENCY_EVENT_NAME)
        .filter(|event| window.contains(event.start))
    {
        for sub_slice in &event.sub_slices {
            let Some(kind) = recognize(&sub_slice.name) else {
                continue;
            };
            match correlate(sub_slice, kind) {
                Ok(record) => result.records.push(record),
                Err(diagnostic) => result.diagnostics.push(diagnostic.emit()),
            }
        }
    }

    tracing::debug!(
        "pid {}: {} input latency record(s) in [{}, {})",
        root.pid(),
        result.records.len(),
        window.start,
        window.end
    );
    result
}

/// Reduce one recognized sub-slice to a latency
fn correlate(sub_slice: &AsyncSlice, kind: &InputEventKind) -> Result<InputLatency, Diagnostic> {
    let data = sub_slice.data().unwrap_or(&Value::Null);
    let missing = |component: &str| Diagnostic::MissingComponent {
        event: sub_slice.name.clone(),
        timestamp: sub_slice.start,
        component: component.to_string(),
    };

    let end = component_time(data, kind.end_component).ok_or_else(|| missing(kind.end_component))?;
    let start = kind
        .start_components
        .iter()
        .find_map(|component| component_time(data, component))
        .ok_or_else(|| missing(kind.start_components.join("|").as_str()))?;

    Ok(InputLatency {
        name: sub_slice.name.clone(),
        latency_ms: (end - start) / 1000.0,
        start_component_time: start,
    })
}

fn component_time(data: &Value, component: &str) -> Option<f64> {
    data.get(component)?.get("time")?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{ThreadRef, Timeline};
    use serde_json::json;

    const BROWSER_MAIN: ThreadRef = ThreadRef { pid: 1, tid: 11 };
    const RENDERER_MAIN: ThreadRef = ThreadRef { pid: 2, tid: 21 };

    fn input_latency(start: f64, sub_name: &str, data: Value) -> AsyncSlice {
        let sub_slice = AsyncSlice::new("benchmark", sub_name, start, BROWSER_MAIN)
            .with_end_thread(RENDERER_MAIN)
            .with_args(json!({ "data": data }));
        AsyncSlice::new("benchmark", INPUT_LATENCY_EVENT_NAME, start, BROWSER_MAIN)
            .with_end_thread(RENDERER_MAIN)
            .with_sub_slice(sub_slice)
    }

    fn browser_with(slices: Vec<AsyncSlice>) -> Timeline {
        let mut timeline = Timeline::new();
        for slice in slices {
            timeline.thread_mut(BROWSER_MAIN).add_async_slice(slice);
        }
        timeline.finalize_import();
        timeline
    }

    #[test]
    fn test_gesture_scroll_update_uses_original_component() {
        let data = json!({
            ORIGINAL_COMP_NAME: {"time": 1000.0},
            UI_COMP_NAME: {"time": 3000.0},
            END_COMP_NAME: {"time": 18500.0},
        });
        let timeline =
            browser_with(vec![input_latency(5.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, data)]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].name, GESTURE_SCROLL_UPDATE_EVENT_NAME);
        assert_eq!(result.records[0].latency_ms, 17.5);
        assert_eq!(result.records[0].start_component_time, 1000.0);
    }

    #[test]
    fn test_generic_event_falls_back_to_ui_component() {
        let data = json!({
            UI_COMP_NAME: {"time": 2000.0},
            BEGIN_COMP_NAME: {"time": 2500.0},
            END_COMP_NAME: {"time": 12000.0},
        });
        let timeline = browser_with(vec![input_latency(1.0, MOUSE_WHEEL_EVENT_NAME, data)]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));
        assert_eq!(result.records[0].latency_ms, 10.0);
    }

    #[test]
    fn test_scroll_update_uses_begin_scroll_update_component() {
        let data = json!({
            BEGIN_SCROLL_UPDATE_COMP_NAME: {"time": 4000.0},
            FORWARD_SCROLL_UPDATE_COMP_NAME: {"time": 6000.0},
            END_COMP_NAME: {"time": 9000.0},
        });
        let timeline = browser_with(vec![input_latency(1.0, SCROLL_UPDATE_EVENT_NAME, data)]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));
        assert_eq!(result.records[0].latency_ms, 5.0);
    }

    #[test]
    fn test_unrecognized_sub_slice_is_skipped() {
        let data = json!({ END_COMP_NAME: {"time": 9000.0} });
        let timeline = browser_with(vec![input_latency(1.0, "InputLatency::KeyPress", data)]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));
        assert!(result.records.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_component_is_reported() {
        let data = json!({ ORIGINAL_COMP_NAME: {"time": 1000.0} });
        let timeline =
            browser_with(vec![input_latency(1.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, data)]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));
        assert!(result.records.is_empty());
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::MissingComponent {
                event: GESTURE_SCROLL_UPDATE_EVENT_NAME.to_string(),
                timestamp: 1.0,
                component: END_COMP_NAME.to_string(),
            }]
        );
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let data = json!({
            ORIGINAL_COMP_NAME: {"time": 0.0},
            END_COMP_NAME: {"time": 1000.0},
        });
        let timeline = browser_with(vec![
            input_latency(1.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, data.clone()),
            input_latency(2.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, data.clone()),
            input_latency(3.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, data),
        ]);
        let browser = timeline.process(1).unwrap();
        assert_eq!(scan(browser, &TimeWindow::new(1.0, 3.0)).records.len(), 2);
        assert!(scan(browser, &TimeWindow::new(10.0, 20.0)).records.is_empty());
    }

    #[test]
    fn test_encounter_order_is_preserved() {
        let gesture = json!({
            ORIGINAL_COMP_NAME: {"time": 0.0},
            END_COMP_NAME: {"time": 3000.0},
        });
        let scroll = json!({
            BEGIN_SCROLL_UPDATE_COMP_NAME: {"time": 0.0},
            END_COMP_NAME: {"time": 1000.0},
        });
        let timeline = browser_with(vec![
            input_latency(1.0, GESTURE_SCROLL_UPDATE_EVENT_NAME, gesture),
            input_latency(1.0, SCROLL_UPDATE_EVENT_NAME, scroll),
        ]);
        let result = scan(timeline.process(1).unwrap(), &TimeWindow::new(0.0, 10.0));
        let names: Vec<&str> = result.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![GESTURE_SCROLL_UPDATE_EVENT_NAME, SCROLL_UPDATE_EVENT_NAME]);
        assert_eq!(
            result.latencies_where(|name| name != SCROLL_UPDATE_EVENT_NAME),
            vec![3.0]
        );
    }
}
