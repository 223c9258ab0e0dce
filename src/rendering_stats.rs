//! Rendering statistics extracted from a finalized timeline
//!
//! Frame timing comes from exactly one of three instrumentation sources,
//! chosen once per trace in strict priority order:
//!
//! 1. display compositor `vsync_before` events,
//! 2. browser `BenchmarkInstrumentation::DisplayRenderingStats` events,
//! 3. renderer `BenchmarkInstrumentation::ImplThreadRenderingStats` events.
//!
//! Only events with `data.frame_count == 1` count as frames. Every series is a
//! list of lists: one inner list per supplied time window, in window order.
//! All times are milliseconds.

use crate::config::{EmptyWindowPolicy, StatsConfig};
use crate::diagnostics::Diagnostic;
use crate::error::{Result, StatsError};
use crate::latency::{
    self, LatencyScan, GESTURE_SCROLL_UPDATE_EVENT_NAME, SCROLL_UPDATE_EVENT_NAME,
};
use crate::numeric::{divide_if_possible_or_zero, round_to};
use crate::timeline::{locate, validate_windows, Process, Slice, TimeWindow};
use serde::Serialize;
use std::iter;

/// Display compositor frame event
pub const VSYNC_EVENT_NAME: &str = "vsync_before";
/// Browser-side display frame event
pub const DISPLAY_RENDERING_STATS_EVENT_NAME: &str =
    "BenchmarkInstrumentation::DisplayRenderingStats";
/// Renderer compositor-thread frame event
pub const IMPL_THREAD_RENDERING_STATS_EVENT_NAME: &str =
    "BenchmarkInstrumentation::ImplThreadRenderingStats";

const FRAME_COUNT_DATA: &str = "frame_count";
const REFRESH_PERIOD_DATA: &str = "refresh_period";
const VISIBLE_CONTENT_DATA: &str = "visible_content_area";
const APPROX_VISIBLE_CONTENT_DATA: &str = "approximated_visible_content_area";

/// Origin of the frame timestamps for one computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    DisplayCompositor,
    BrowserDisplay,
    RendererImpl,
    /// No process carries a single qualifying frame event
    None,
}

impl FrameSource {
    /// Name of the slices this source reads frames from
    pub fn event_name(self) -> Option<&'static str> {
        match self {
            FrameSource::DisplayCompositor => Some(VSYNC_EVENT_NAME),
            FrameSource::BrowserDisplay => Some(DISPLAY_RENDERING_STATS_EVENT_NAME),
            FrameSource::RendererImpl => Some(IMPL_THREAD_RENDERING_STATS_EVENT_NAME),
            FrameSource::None => None,
        }
    }
}

/// The `data.frame_count` of a rendering-stats event
fn frame_count(event: &Slice) -> std::result::Result<u64, Diagnostic> {
    let malformed = |field: &str| Diagnostic::MalformedPayload {
        event: event.name.clone(),
        timestamp: event.start,
        field: field.to_string(),
    };
    let data = event.data().ok_or_else(|| malformed("data"))?;
    data.get(FRAME_COUNT_DATA)
        .and_then(as_count)
        .ok_or_else(|| malformed(FRAME_COUNT_DATA))
}

/// A non-negative whole number, whether encoded as `1` or `1.0`
fn as_count(value: &serde_json::Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|count| count.fract() == 0.0 && *count >= 0.0 && *count <= u64::MAX as f64)
            .map(|count| count as u64)
    })
}

fn is_frame(event: &Slice) -> bool {
    matches!(frame_count(event), Ok(1))
}

fn has_frames(process: &Process, event_name: &str) -> bool {
    process.iter_all_slices_of_name(event_name).any(is_frame)
}

/// True when `process` carries a display or impl-thread rendering-stats frame
pub fn has_rendering_stats(process: &Process) -> bool {
    has_frames(process, DISPLAY_RENDERING_STATS_EVENT_NAME)
        || has_frames(process, IMPL_THREAD_RENDERING_STATS_EVENT_NAME)
}

/// Pick the frame-timing source for a trace
pub fn select_frame_source(
    renderer: &Process,
    browser: Option<&Process>,
    display_compositor: Option<&Process>,
) -> FrameSource {
    if display_compositor.is_some_and(|p| has_frames(p, VSYNC_EVENT_NAME)) {
        FrameSource::DisplayCompositor
    } else if browser.is_some_and(|p| has_frames(p, DISPLAY_RENDERING_STATS_EVENT_NAME)) {
        FrameSource::BrowserDisplay
    } else if has_frames(renderer, IMPL_THREAD_RENDERING_STATS_EVENT_NAME) {
        FrameSource::RendererImpl
    } else {
        FrameSource::None
    }
}

/// Per-window frame and input-latency series for one trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderingStats {
    frame_source: FrameSource,
    refresh_period: Option<f64>,
    windows: Vec<TimeWindow>,
    frame_timestamps: Vec<Vec<f64>>,
    frame_times: Vec<Vec<f64>>,
    approximated_pixel_percentages: Vec<Vec<f64>>,
    input_event_latency: Vec<Vec<f64>>,
    scroll_update_latency: Vec<Vec<f64>>,
    gesture_scroll_update_latency: Vec<Vec<f64>>,
    diagnostics: Vec<Diagnostic>,
}

impl RenderingStats {
    /// Compute every series for `windows`.
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` does not validate
    /// - `InvalidWindows` if windows are inverted, unordered or overlapping
    /// - `UnfinalizedProcess` if a supplied process was never finalized
    /// - `NotEnoughFrames` in strict mode, for the first window without frames
    pub fn new(
        renderer: &Process,
        browser: Option<&Process>,
        display_compositor: Option<&Process>,
        windows: &[TimeWindow],
        config: &StatsConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_windows(windows)?;
        for process in iter::once(renderer).chain(browser).chain(display_compositor) {
            if !process.is_finalized() {
                return Err(StatsError::UnfinalizedProcess { pid: process.pid() });
            }
        }

        let frame_source = select_frame_source(renderer, browser, display_compositor);
        tracing::debug!("Frame source: {:?} over {} window(s)", frame_source, windows.len());

        let mut stats = Self::empty(frame_source, windows);
        let timing_process = match frame_source {
            FrameSource::DisplayCompositor => display_compositor,
            FrameSource::BrowserDisplay => browser,
            FrameSource::RendererImpl => Some(renderer),
            FrameSource::None => None,
        };
        if let (Some(process), Some(event_name)) = (timing_process, frame_source.event_name()) {
            stats.collect_frames(process, event_name, config);
        }
        if frame_source == FrameSource::DisplayCompositor {
            stats.refresh_period = display_compositor.and_then(first_refresh_period);
        }

        if config.empty_window_policy == EmptyWindowPolicy::Strict {
            if let Some(index) = stats.frame_timestamps.iter().position(Vec::is_empty) {
                return Err(StatsError::NotEnoughFrames {
                    window_index: index,
                    start: windows[index].start,
                    end: windows[index].end,
                });
            }
        }

        for (index, window) in windows.iter().enumerate() {
            if window.is_empty() {
                continue;
            }
            let mut scan = browser
                .map(|process| latency::scan(process, window))
                .unwrap_or_default();
            if config.scan_renderer_for_input_latency {
                scan.extend(latency::scan(renderer, window));
            }
            stats.record_latencies(index, scan);
        }

        Ok(stats)
    }

    fn empty(frame_source: FrameSource, windows: &[TimeWindow]) -> Self {
        let series = || vec![Vec::new(); windows.len()];
        Self {
            frame_source,
            refresh_period: None,
            windows: windows.to_vec(),
            frame_timestamps: series(),
            frame_times: series(),
            approximated_pixel_percentages: series(),
            input_event_latency: series(),
            scroll_update_latency: series(),
            gesture_scroll_update_latency: series(),
            diagnostics: Vec::new(),
        }
    }

    fn collect_frames(&mut self, process: &Process, event_name: &str, config: &StatsConfig) {
        let mut events: Vec<&Slice> = process.iter_all_slices_of_name(event_name).collect();
        events.sort_by(|a, b| a.start.total_cmp(&b.start));

        for event in events {
            let Some(index) = locate(&self.windows, event.start) else {
                continue;
            };
            match frame_count(event) {
                Ok(1) => {}
                Ok(0) => continue,
                Ok(frame_count) => {
                    self.diagnose(Diagnostic::MultiFrameStats {
                        event: event.name.clone(),
                        timestamp: event.start,
                        frame_count,
                    });
                    continue;
                }
                Err(diagnostic) => {
                    self.diagnose(diagnostic);
                    continue;
                }
            }

            let timestamps = &mut self.frame_timestamps[index];
            if let Some(&previous) = timestamps.last() {
                self.frame_times[index]
                    .push(round_to(event.start - previous, config.frame_time_precision));
            }
            timestamps.push(event.start);

            if self.frame_source == FrameSource::RendererImpl {
                self.record_approximation(index, event, config);
            }
        }

        for (index, timestamps) in self.frame_timestamps.iter().enumerate() {
            tracing::debug!("Window {}: {} frame(s)", index, timestamps.len());
        }
    }

    fn record_approximation(&mut self, index: usize, event: &Slice, config: &StatsConfig) {
        let area = |field: &str| event.data().and_then(|d| d.get(field)).and_then(|v| v.as_f64());
        let Some(visible) = area(VISIBLE_CONTENT_DATA) else {
            self.diagnose(Diagnostic::MalformedPayload {
                event: event.name.clone(),
                timestamp: event.start,
                field: VISIBLE_CONTENT_DATA.to_string(),
            });
            return;
        };
        let Some(approximated) = area(APPROX_VISIBLE_CONTENT_DATA) else {
            self.diagnose(Diagnostic::MalformedPayload {
                event: event.name.clone(),
                timestamp: event.start,
                field: APPROX_VISIBLE_CONTENT_DATA.to_string(),
            });
            return;
        };

        let percentage = divide_if_possible_or_zero(approximated, visible) * 100.0;
        self.approximated_pixel_percentages[index]
            .push(round_to(percentage, config.approximation_precision));
    }

    fn record_latencies(&mut self, index: usize, scan: LatencyScan) {
        self.input_event_latency[index] =
            scan.latencies_where(|name| name != SCROLL_UPDATE_EVENT_NAME);
        self.scroll_update_latency[index] =
            scan.latencies_where(|name| name == SCROLL_UPDATE_EVENT_NAME);
        self.gesture_scroll_update_latency[index] =
            scan.latencies_where(|name| name == GESTURE_SCROLL_UPDATE_EVENT_NAME);
        self.diagnostics.extend(scan.diagnostics);
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic.emit());
    }

    pub fn frame_source(&self) -> FrameSource {
        self.frame_source
    }

    /// Refresh period reported by the display compositor, when it is the source
    pub fn refresh_period(&self) -> Option<f64> {
        self.refresh_period
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Timestamp of every frame, per window
    pub fn frame_timestamps(&self) -> &[Vec<f64>] {
        &self.frame_timestamps
    }

    /// Interval between consecutive frames of a window, per window
    pub fn frame_times(&self) -> &[Vec<f64>] {
        &self.frame_times
    }

    /// Percentage of visible content that was approximated, per frame (impl-thread source only)
    pub fn approximated_pixel_percentages(&self) -> &[Vec<f64>] {
        &self.approximated_pixel_percentages
    }

    /// Latency of every input event except coalesced scroll updates
    pub fn input_event_latency(&self) -> &[Vec<f64>] {
        &self.input_event_latency
    }

    pub fn scroll_update_latency(&self) -> &[Vec<f64>] {
        &self.scroll_update_latency
    }

    pub fn gesture_scroll_update_latency(&self) -> &[Vec<f64>] {
        &self.gesture_scroll_update_latency
    }

    /// Events skipped or partially used, in the order they were met
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn first_refresh_period(process: &Process) -> Option<f64> {
    process
        .iter_all_slices_of_name(VSYNC_EVENT_NAME)
        .min_by(|a, b| a.start.total_cmp(&b.start))?
        .data()?
        .get(REFRESH_PERIOD_DATA)?
        .as_f64()
}
