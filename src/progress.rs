//! Progress reporting seam.
//!
//! Both utilities report through an injected [`ProgressObserver`] instead of a
//! global progress widget, so the core logic runs silently under test and any
//! display (terminal bar, GUI, log lines) can be plugged in by the caller.

use std::{fmt, sync::Mutex};

use crate::observability::{log_debug, log_info};

/// Which stream of progress observations is being reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressStage {
    /// Rows consumed by the batch reader.
    Reading,
    /// Batch files written by the split phase.
    Splitting,
    /// Batch files read back by the merge phase.
    Merging,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressStage::Reading => "reading",
            ProgressStage::Splitting => "splitting",
            ProgressStage::Merging => "merging",
        };
        f.write_str(name)
    }
}

/// Receives progress and per-batch log observations.
///
/// Observations are side effects only; nothing an observer does feeds back into
/// the operation.
pub trait ProgressObserver: Send + Sync {
    /// A new progress stream starts; `total` is its final `done` value.
    fn on_start(&self, stage: ProgressStage, total: u64) {
        let _ = (stage, total);
    }

    /// Cumulative progress within the current stage.
    fn on_progress(&self, done: u64, total: u64);

    /// One human-readable record for a 1-based batch index.
    fn on_batch_log(&self, index: usize, detail: &str);
}

/// Observer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _done: u64, _total: u64) {}

    fn on_batch_log(&self, _index: usize, _detail: &str) {}
}

/// Observer that forwards observations to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_start(&self, stage: ProgressStage, total: u64) {
        log_info!(component = "progress", event = "stage_started", stage = %stage, total);
    }

    fn on_progress(&self, done: u64, total: u64) {
        log_debug!(component = "progress", event = "progress", done, total);
    }

    fn on_batch_log(&self, index: usize, detail: &str) {
        log_info!(component = "progress", event = "batch", index, detail = %detail);
    }
}

/// One observation captured by [`RecordingObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A stage started.
    Start {
        /// Stage that started.
        stage: ProgressStage,
        /// Expected final progress value.
        total: u64,
    },
    /// Cumulative progress.
    Progress {
        /// Units completed so far.
        done: u64,
        /// Units expected in total.
        total: u64,
    },
    /// Per-batch log record.
    Batch {
        /// 1-based batch index.
        index: usize,
        /// Human-readable detail.
        detail: String,
    },
}

/// Observer that keeps every observation in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all observations so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    /// `(done, total)` pairs observed for `stage`, in order.
    pub fn progress_for(&self, stage: ProgressStage) -> Vec<(u64, u64)> {
        let mut current = None;
        let mut out = Vec::new();
        for event in self.lock().iter() {
            match event {
                ProgressEvent::Start { stage: started, .. } => current = Some(*started),
                ProgressEvent::Progress { done, total } if current == Some(stage) => {
                    out.push((*done, *total))
                }
                _ => {}
            }
        }
        out
    }

    /// Per-batch log records, in order.
    pub fn batch_logs(&self) -> Vec<(usize, String)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Batch { index, detail } => Some((*index, detail.clone())),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProgressEvent>> {
        // Events stay readable after a panic inside another observer call.
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, event: ProgressEvent) {
        self.lock().push(event);
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_start(&self, stage: ProgressStage, total: u64) {
        self.push(ProgressEvent::Start { stage, total });
    }

    fn on_progress(&self, done: u64, total: u64) {
        self.push(ProgressEvent::Progress { done, total });
    }

    fn on_batch_log(&self, index: usize, detail: &str) {
        self.push(ProgressEvent::Batch {
            index,
            detail: detail.to_string(),
        });
    }
}

/// Monotonic counter feeding one progress stream into an observer.
pub(crate) struct ProgressCounter<'a> {
    observer: &'a dyn ProgressObserver,
    done: u64,
    total: u64,
}

impl<'a> ProgressCounter<'a> {
    /// Announce `stage` and start counting from zero.
    pub(crate) fn start(
        observer: &'a dyn ProgressObserver,
        stage: ProgressStage,
        total: u64,
    ) -> Self {
        observer.on_start(stage, total);
        Self {
            observer,
            done: 0,
            total,
        }
    }

    /// Advance by `amount` and report the new cumulative value.
    pub(crate) fn advance(&mut self, amount: u64) -> u64 {
        self.done = self.done.saturating_add(amount);
        self.observer.on_progress(self.done, self.total);
        self.done
    }

    pub(crate) fn done(&self) -> u64 {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_reports_cumulative_values() {
        let observer = RecordingObserver::new();
        let mut counter = ProgressCounter::start(&observer, ProgressStage::Reading, 10);
        assert_eq!(counter.advance(4), 4);
        assert_eq!(counter.advance(0), 4);
        assert_eq!(counter.advance(6), 10);
        assert_eq!(counter.done(), 10);

        assert_eq!(
            observer.progress_for(ProgressStage::Reading),
            vec![(4, 10), (4, 10), (10, 10)]
        );
    }

    #[test]
    fn progress_is_split_per_stage() {
        let observer = RecordingObserver::new();
        let mut split = ProgressCounter::start(&observer, ProgressStage::Splitting, 2);
        split.advance(1);
        split.advance(1);
        let mut merge = ProgressCounter::start(&observer, ProgressStage::Merging, 2);
        merge.advance(1);
        observer.on_batch_log(1, "rows [0:3]");

        assert_eq!(
            observer.progress_for(ProgressStage::Splitting),
            vec![(1, 2), (2, 2)]
        );
        assert_eq!(observer.progress_for(ProgressStage::Merging), vec![(1, 2)]);
        assert_eq!(observer.batch_logs(), vec![(1, "rows [0:3]".to_string())]);
    }
}
