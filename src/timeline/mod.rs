// Trace timeline: the process/thread/slice store the metrics are computed from
//
// The model is filled either programmatically (tests, synthetic traces) or by
// the Chrome trace-event JSON importer, then finalized before analysis.

mod bounds;
mod import;
mod model;

pub use bounds::{locate, validate_windows, TimeWindow};
pub use model::{AsyncSlice, Marker, Process, Slice, Thread, ThreadRef, Timeline};
