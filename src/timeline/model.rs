//! In-memory trace model: processes, threads, slices and async slices
//!
//! Timestamps and durations are milliseconds. A process must be finalized
//! (see [`Process::finalize_import`]) before it is handed to the aggregator.

use crate::error::{TimelineError, TimelineResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Identity of one thread within one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadRef {
    pub pid: u64,
    pub tid: u64,
}

impl ThreadRef {
    pub fn new(pid: u64, tid: u64) -> Self {
        Self { pid, tid }
    }
}

/// A named interval recorded on a single thread
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub category: String,
    pub name: String,
    /// Start timestamp (milliseconds)
    pub start: f64,
    /// Duration (milliseconds)
    pub duration: f64,
    /// Owning thread
    pub thread: ThreadRef,
    /// Arbitrary key/value payload
    pub args: Value,
    /// Nesting depth on the owning thread (0 = top level)
    pub depth: u32,
    /// Closed by finalization instead of an explicit end
    pub did_not_finish: bool,
}

impl Slice {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// The `data` member of the payload, where instrumentation stores its fields
    pub fn data(&self) -> Option<&Value> {
        self.args.get("data")
    }
}

/// An interval that is handed off between threads (and possibly processes)
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncSlice {
    pub category: String,
    pub name: String,
    pub start: f64,
    pub duration: f64,
    pub start_thread: ThreadRef,
    pub end_thread: ThreadRef,
    pub sub_slices: Vec<AsyncSlice>,
    pub args: Value,
}

impl AsyncSlice {
    /// Create an async slice that starts and ends on `thread` with no payload
    pub fn new(category: &str, name: &str, start: f64, thread: ThreadRef) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            start,
            duration: 0.0,
            start_thread: thread,
            end_thread: thread,
            sub_slices: Vec::new(),
            args: Value::Null,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn with_end_thread(mut self, thread: ThreadRef) -> Self {
        self.end_thread = thread;
        self
    }

    pub fn with_sub_slice(mut self, sub_slice: AsyncSlice) -> Self {
        self.sub_slices.push(sub_slice);
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn data(&self) -> Option<&Value> {
        self.args.get("data")
    }
}

/// One thread's closed slices, open slice stack and async slices
#[derive(Debug, Clone)]
pub struct Thread {
    id: ThreadRef,
    pub name: Option<String>,
    slices: Vec<Slice>,
    open: Vec<Slice>,
    async_slices: Vec<AsyncSlice>,
}

impl Thread {
    fn new(id: ThreadRef) -> Self {
        Self {
            id,
            name: None,
            slices: Vec::new(),
            open: Vec::new(),
            async_slices: Vec::new(),
        }
    }

    pub fn id(&self) -> ThreadRef {
        self.id
    }

    /// Open a slice; it stays on the open stack until [`Thread::end_slice`]
    pub fn begin_slice(&mut self, category: &str, name: &str, timestamp: f64, args: Value) {
        let depth = self.open.len() as u32;
        self.open.push(Slice {
            category: category.to_string(),
            name: name.to_string(),
            start: timestamp,
            duration: 0.0,
            thread: self.id,
            args,
            depth,
            did_not_finish: false,
        });
    }

    /// Close the innermost open slice, returning it, or `None` if nothing is open
    pub fn end_slice(&mut self, timestamp: f64) -> Option<&Slice> {
        let mut slice = self.open.pop()?;
        slice.duration = (timestamp - slice.start).max(0.0);
        self.slices.push(slice);
        self.slices.last()
    }

    /// Record a slice whose duration is already known
    pub fn push_complete_slice(
        &mut self,
        category: &str,
        name: &str,
        timestamp: f64,
        duration: f64,
        args: Value,
    ) {
        self.slices.push(Slice {
            category: category.to_string(),
            name: name.to_string(),
            start: timestamp,
            duration,
            thread: self.id,
            args,
            depth: self.open.len() as u32,
            did_not_finish: false,
        });
    }

    pub fn add_async_slice(&mut self, slice: AsyncSlice) {
        self.async_slices.push(slice);
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn async_slices(&self) -> &[AsyncSlice] {
        &self.async_slices
    }

    pub fn open_slice_count(&self) -> usize {
        self.open.len()
    }

    fn latest_timestamp(&self) -> Option<f64> {
        let closed = self.slices.iter().map(Slice::end);
        let open = self.open.iter().map(|s| s.start);
        let asynchronous = self.async_slices.iter().map(AsyncSlice::end);
        closed.chain(open).chain(asynchronous).reduce(f64::max)
    }

    fn finalize(&mut self, close_at: f64) {
        while let Some(mut slice) = self.open.pop() {
            slice.duration = (close_at - slice.start).max(0.0);
            slice.did_not_finish = true;
            self.slices.push(slice);
        }
        self.slices.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.async_slices.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
}

/// A process and its threads
#[derive(Debug, Clone)]
pub struct Process {
    pid: u64,
    pub name: Option<String>,
    threads: BTreeMap<u64, Thread>,
    finalized: bool,
}

impl Process {
    pub fn new(pid: u64) -> Self {
        Self {
            pid,
            name: None,
            threads: BTreeMap::new(),
            finalized: false,
        }
    }

    pub fn pid(&self) -> u64 {
        self.pid
    }

    pub fn get_or_create_thread(&mut self, tid: u64) -> &mut Thread {
        let id = ThreadRef::new(self.pid, tid);
        self.threads.entry(tid).or_insert_with(|| Thread::new(id))
    }

    pub fn thread(&self, tid: u64) -> Option<&Thread> {
        self.threads.get(&tid)
    }

    /// Threads in ascending thread id order
    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// Every closed slice named `name`, at any depth, thread by thread
    pub fn iter_all_slices_of_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Slice> + 'a {
        self.threads()
            .flat_map(|thread| thread.slices().iter())
            .filter(move |slice| slice.name == name)
    }

    /// Every top-level async slice named `name`, thread by thread
    pub fn iter_all_async_slices_of_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a AsyncSlice> + 'a {
        self.threads()
            .flat_map(|thread| thread.async_slices().iter())
            .filter(move |slice| slice.name == name)
    }

    /// Close dangling slices at the latest observed timestamp and sort every thread
    pub fn finalize_import(&mut self) {
        let close_at = self
            .threads
            .values()
            .filter_map(Thread::latest_timestamp)
            .reduce(f64::max)
            .unwrap_or(0.0);

        for thread in self.threads.values_mut() {
            if thread.open_slice_count() > 0 {
                tracing::warn!(
                    "pid {} tid {}: closing {} unfinished slice(s) at {}",
                    self.pid,
                    thread.id.tid,
                    thread.open_slice_count(),
                    close_at
                );
            }
            thread.finalize(close_at);
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// All processes of one recorded trace
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    processes: BTreeMap<u64, Process>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_process(&mut self, pid: u64) -> &mut Process {
        self.processes.entry(pid).or_insert_with(|| Process::new(pid))
    }

    /// The thread identified by `thread`, creating its process and thread as needed
    pub fn thread_mut(&mut self, thread: ThreadRef) -> &mut Thread {
        self.get_or_create_process(thread.pid)
            .get_or_create_thread(thread.tid)
    }

    pub fn process(&self, pid: u64) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// First process (by pid) whose name equals `name`
    pub fn find_process_by_name(&self, name: &str) -> Option<&Process> {
        self.processes()
            .find(|process| process.name.as_deref() == Some(name))
    }

    pub fn finalize_import(&mut self) {
        for process in self.processes.values_mut() {
            process.finalize_import();
        }
    }

    /// Find the top-level markers named by `names`, in order.
    ///
    /// Candidates are depth-0 thread slices and top-level async slices (the
    /// form `console.time` markers take). The markers found must match `names`
    /// one-to-one by position once sorted by start time, and no two markers
    /// may overlap.
    pub fn find_timeline_markers(&self, names: &[&str]) -> TimelineResult<Vec<Marker<'_>>> {
        let wanted: BTreeSet<&str> = names.iter().copied().collect();
        let threads = || self.processes().flat_map(|process| process.threads());
        let slices = threads()
            .flat_map(|thread| thread.slices().iter())
            .filter(|slice| slice.depth == 0)
            .map(Marker::Slice);
        let async_slices = threads()
            .flat_map(|thread| thread.async_slices().iter())
            .map(Marker::Async);
        let mut markers: Vec<Marker<'_>> = slices
            .chain(async_slices)
            .filter(|marker| wanted.contains(marker.name()))
            .collect();
        markers.sort_by(|a, b| a.start().total_cmp(&b.start()));

        let matches = markers.len() == names.len()
            && markers.iter().zip(names).all(|(marker, name)| marker.name() == *name);
        if !matches {
            return Err(TimelineError::MarkerMismatch {
                expected: names.iter().map(|n| n.to_string()).collect(),
                found: markers.iter().map(|m| m.name().to_string()).collect(),
            });
        }

        // Sorted by start, so any overlap shows up between neighbours.
        for pair in markers.windows(2) {
            if pair[1].start() < pair[0].end() {
                return Err(TimelineError::MarkerOverlap {
                    first: pair[0].name().to_string(),
                    second: pair[1].name().to_string(),
                });
            }
        }

        Ok(markers)
    }
}

/// A top-level slice bounding one action, found by [`Timeline::find_timeline_markers`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker<'a> {
    Slice(&'a Slice),
    Async(&'a AsyncSlice),
}

impl<'a> Marker<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Marker::Slice(slice) => slice.name.as_str(),
            Marker::Async(slice) => slice.name.as_str(),
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Marker::Slice(slice) => slice.start,
            Marker::Async(slice) => slice.start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Marker::Slice(slice) => slice.end(),
            Marker::Async(slice) => slice.end(),
        }
    }
}
