//! Progress reporting for ingestion runs.
//!
//! The engine emits a [`ProgressEvent`] after every batch and a state
//! notification on every run transition to an injected
//! [`ProgressObserver`]. What happens with them (log lines, a progress bar,
//! assertions in a test) is the observer's business.

use crate::run::RunState;
use std::time::Duration;
use tracing::info;

/// Cumulative counters after one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 0-based index of the batch just processed.
    pub batch_index: usize,
    /// Source rows in that batch, malformed ones included.
    pub rows_in_batch: usize,
    /// Rows appended to any partition so far.
    pub total_loaded: u64,
    /// Rows dropped as malformed so far.
    pub malformed: u64,
    /// Rows dropped because their year was not requested, so far.
    pub out_of_range: u64,
    /// Time since loading started.
    pub elapsed: Duration,
}

/// Receiver of progress events and run transitions.
pub trait ProgressObserver {
    fn on_batch(&mut self, event: &ProgressEvent);

    fn on_state(&mut self, _state: RunState) {}
}

impl<F: FnMut(&ProgressEvent)> ProgressObserver for F {
    fn on_batch(&mut self, event: &ProgressEvent) {
        self(event);
    }
}

/// Logs one line per batch through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_batch(&mut self, event: &ProgressEvent) {
        info!(
            batch = event.batch_index,
            malformed = event.malformed,
            out_of_range = event.out_of_range,
            "Loaded {} rows. Total time: {:.2} seconds.",
            event.total_loaded,
            event.elapsed.as_secs_f64()
        );
    }

    fn on_state(&mut self, state: RunState) {
        info!(state = %state, "run.state");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_batch(&mut self, _event: &ProgressEvent) {}
}

/// Keeps every event and transition, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    pub events: Vec<ProgressEvent>,
    pub states: Vec<RunState>,
}

impl ProgressObserver for RecordingProgress {
    fn on_batch(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }

    fn on_state(&mut self, state: RunState) {
        self.states.push(state);
    }
}
