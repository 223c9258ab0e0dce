// Shared fixtures for rendering-stats integration tests
//
// Builds synthetic timelines event by event and records, alongside, the
// values the aggregator is expected to report for them.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderstats::latency::{
    BEGIN_COMP_NAME, BEGIN_SCROLL_UPDATE_COMP_NAME, END_COMP_NAME,
    FORWARD_SCROLL_UPDATE_COMP_NAME, GESTURE_SCROLL_UPDATE_EVENT_NAME, INPUT_LATENCY_EVENT_NAME,
    ORIGINAL_COMP_NAME, SCROLL_UPDATE_EVENT_NAME, UI_COMP_NAME,
};
use renderstats::numeric::{divide_if_possible_or_zero, round_to};
use renderstats::rendering_stats::{
    DISPLAY_RENDERING_STATS_EVENT_NAME, IMPL_THREAD_RENDERING_STATS_EVENT_NAME, VSYNC_EVENT_NAME,
};
use renderstats::timeline::{AsyncSlice, Thread, ThreadRef, TimeWindow, Timeline};
use serde_json::{json, Value};

/// Monotonic clock advancing by random amounts (milliseconds)
pub struct MockTimer {
    pub milliseconds: f64,
    rng: StdRng,
}

impl MockTimer {
    pub fn new(seed: u64) -> Self {
        Self {
            milliseconds: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn advance(&mut self, low: f64, high: f64) -> f64 {
        let delta = self.rng.gen_range(low..high);
        self.milliseconds += delta;
        delta
    }

    pub fn advance_and_get(&mut self, low: f64, high: f64) -> f64 {
        self.advance(low, high);
        self.milliseconds
    }

    /// Advance by the default 0.1..1 ms step
    pub fn tick(&mut self) -> f64 {
        self.advance_and_get(0.1, 1.0)
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }
}

/// Expected frame series, one inner list per window
#[derive(Debug, Default)]
pub struct ReferenceRenderingStats {
    pub frame_timestamps: Vec<Vec<f64>>,
    pub frame_times: Vec<Vec<f64>>,
    pub approximated_pixel_percentages: Vec<Vec<f64>>,
}

impl ReferenceRenderingStats {
    pub fn append_new_range(&mut self) {
        self.frame_timestamps.push(Vec::new());
        self.frame_times.push(Vec::new());
        self.approximated_pixel_percentages.push(Vec::new());
    }

    fn record_frame(&mut self, timestamp: f64, first_frame: bool) {
        if !first_frame {
            if let Some(&previous) = self.frame_timestamps.last().and_then(|t| t.last()) {
                if let Some(times) = self.frame_times.last_mut() {
                    times.push(round_to(timestamp - previous, 2));
                }
            }
        }
        if let Some(timestamps) = self.frame_timestamps.last_mut() {
            timestamps.push(timestamp);
        }
    }
}

/// Expected input latencies as `(sub-slice name, latency)` in encounter order
#[derive(Debug, Default)]
pub struct ReferenceInputLatencyStats {
    pub input_event_latency: Vec<(String, f64)>,
}

impl ReferenceInputLatencyStats {
    pub fn latencies_where(&self, keep: impl Fn(&str) -> bool) -> Vec<f64> {
        self.input_event_latency
            .iter()
            .filter(|(name, _)| keep(name))
            .map(|(_, latency)| *latency)
            .collect()
    }
}

/// Add a display-compositor vsync frame
pub fn add_surface_flinger_stats(
    timer: &mut MockTimer,
    thread: &mut Thread,
    first_frame: bool,
    reference: Option<&mut ReferenceRenderingStats>,
) {
    let timestamp = timer.tick();
    thread.push_complete_slice(
        "SurfaceFlinger",
        VSYNC_EVENT_NAME,
        timestamp,
        0.0,
        json!({"data": {"frame_count": 1, "refresh_period": 16.6666}}),
    );
    if let Some(reference) = reference {
        reference.record_frame(timestamp, first_frame);
    }
}

/// Add a browser display frame
pub fn add_display_rendering_stats(
    timer: &mut MockTimer,
    thread: &mut Thread,
    first_frame: bool,
    reference: Option<&mut ReferenceRenderingStats>,
) {
    let timestamp = timer.tick();
    thread.push_complete_slice(
        "benchmark",
        DISPLAY_RENDERING_STATS_EVENT_NAME,
        timestamp,
        0.0,
        json!({"data": {"frame_count": 1}}),
    );
    if let Some(reference) = reference {
        reference.record_frame(timestamp, first_frame);
    }
}

/// Add a compositor-thread frame with random content areas
pub fn add_impl_thread_rendering_stats(
    timer: &mut MockTimer,
    thread: &mut Thread,
    first_frame: bool,
    reference: Option<&mut ReferenceRenderingStats>,
) {
    let visible = timer.uniform(0.0, 100.0);
    let approximated = timer.uniform(0.0, 5.0);
    let timestamp = timer.tick();
    thread.push_complete_slice(
        "benchmark",
        IMPL_THREAD_RENDERING_STATS_EVENT_NAME,
        timestamp,
        0.0,
        json!({"data": {
            "frame_count": 1,
            "visible_content_area": visible,
            "approximated_visible_content_area": approximated,
        }}),
    );
    if let Some(reference) = reference {
        reference.record_frame(timestamp, first_frame);
        if let Some(percentages) = reference.approximated_pixel_percentages.last_mut() {
            percentages.push(round_to(
                divide_if_possible_or_zero(approximated, visible) * 100.0,
                3,
            ));
        }
    }
}

fn input_latency_slice(
    timestamp: f64,
    sub_name: &str,
    data: Value,
    start: ThreadRef,
    end: ThreadRef,
) -> AsyncSlice {
    let sub_slice = AsyncSlice::new("benchmark", sub_name, timestamp, start)
        .with_end_thread(end)
        .with_args(json!({ "data": data }));
    AsyncSlice::new("benchmark", INPUT_LATENCY_EVENT_NAME, timestamp, start)
        .with_end_thread(end)
        .with_sub_slice(sub_slice)
}

/// Add one gesture scroll update and its coalesced scroll update, plus a
/// dummy compositor frame on the end thread
pub fn add_input_latency_stats(
    timer: &mut MockTimer,
    timeline: &mut Timeline,
    start_thread: ThreadRef,
    end_thread: ThreadRef,
    reference: Option<&mut ReferenceInputLatencyStats>,
) {
    let original = timer.advance_and_get(2.0, 4.0) * 1000.0;
    let ui = timer.advance_and_get(2.0, 4.0) * 1000.0;
    let begin = timer.advance_and_get(2.0, 4.0) * 1000.0;
    let forward = timer.advance_and_get(2.0, 4.0) * 1000.0;
    let end = timer.advance_and_get(10.0, 20.0) * 1000.0;
    let timestamp = timer.advance_and_get(2.0, 4.0);

    let gesture = input_latency_slice(
        timestamp,
        GESTURE_SCROLL_UPDATE_EVENT_NAME,
        json!({
            ORIGINAL_COMP_NAME: {"time": original},
            UI_COMP_NAME: {"time": ui},
            BEGIN_COMP_NAME: {"time": begin},
            END_COMP_NAME: {"time": end},
        }),
        start_thread,
        end_thread,
    );
    let scroll = input_latency_slice(
        timestamp,
        SCROLL_UPDATE_EVENT_NAME,
        json!({
            BEGIN_SCROLL_UPDATE_COMP_NAME: {"time": begin},
            FORWARD_SCROLL_UPDATE_COMP_NAME: {"time": forward},
            END_COMP_NAME: {"time": end},
        }),
        start_thread,
        end_thread,
    );

    let thread = timeline.thread_mut(start_thread);
    thread.add_async_slice(gesture);
    thread.add_async_slice(scroll);

    add_impl_thread_rendering_stats(timer, timeline.thread_mut(end_thread), false, None);

    if let Some(reference) = reference {
        reference
            .input_event_latency
            .push((GESTURE_SCROLL_UPDATE_EVENT_NAME.to_string(), (end - original) / 1000.0));
        reference
            .input_event_latency
            .push((SCROLL_UPDATE_EVENT_NAME.to_string(), (end - begin) / 1000.0));
    }
}

/// Windows for the named top-level markers, in order
pub fn windows_for(timeline: &Timeline, names: &[&str]) -> Vec<TimeWindow> {
    timeline
        .find_timeline_markers(names)
        .expect("markers should resolve")
        .iter()
        .map(TimeWindow::from_marker)
        .collect()
}

pub fn flatten(series: &[Vec<f64>]) -> Vec<f64> {
    series.iter().flatten().copied().collect()
}
