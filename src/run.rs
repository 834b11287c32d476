//! One ingestion run: provision the requested years, then stream the source
//! through the load executor.
//!
//! ```text
//! Idle -> Provisioning -> Loading { batch } -> Complete
//!             |                  |
//!             +------------------+---------> Failed
//! ```
//!
//! Every transition is logged and forwarded to the progress observer. A
//! failed run is not retried; rerunning the same years re-provisions them,
//! which wipes whatever a partial load left behind.

use crate::config::IngestConfig;
use crate::dataset::DatasetType;
use crate::error::IngestError;
use crate::io::csv::{ChunkedReader, DEFAULT_BATCH_SIZE, SourceFile};
use crate::load::{LoadExecutor, LoadSummary};
use crate::progress::{LogProgress, ProgressEvent, ProgressObserver};
use crate::provision::provision;
use crate::router::{PartitionKey, YearSet};
use crate::sink::DataSink;
use crate::temporal::DEFAULT_TIME_FORMAT;
use crate::validation::{
    RejectLog, Validate, ValidationError, ValidationResult, combine_validations, format_errors,
};
use std::fmt;
use std::io::Read;
use tracing::{debug, error, info, warn};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Provisioning,
    /// Loading; `batch` is the index of the next batch to be appended.
    Loading { batch: usize },
    Complete,
    Failed,
}

impl RunState {
    /// `Complete` or `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Provisioning => f.write_str("provisioning"),
            Self::Loading { batch } => write!(f, "loading(batch {batch})"),
            Self::Complete => f.write_str("complete"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// What to load and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub dataset: DatasetType,
    pub years: YearSet,
    pub batch_size: usize,
    pub time_format: String,
    /// Malformed-row samples kept for inspection.
    pub reject_capacity: usize,
}

impl RunParams {
    #[must_use]
    pub fn new(dataset: DatasetType, years: YearSet) -> Self {
        Self {
            dataset,
            years,
            batch_size: DEFAULT_BATCH_SIZE,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            reject_capacity: RejectLog::DEFAULT_CAPACITY,
        }
    }

    /// Parameters with the tunables taken from `config`.
    #[must_use]
    pub fn from_config(dataset: DatasetType, years: YearSet, config: &IngestConfig) -> Self {
        Self {
            dataset,
            years,
            batch_size: config.batch_size,
            time_format: config.time_format.clone(),
            reject_capacity: config.reject_samples,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    #[must_use]
    pub fn with_reject_capacity(mut self, capacity: usize) -> Self {
        self.reject_capacity = capacity;
        self
    }
}

impl Validate for RunParams {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if self.batch_size == 0 {
            errors.push(ValidationError::field("batch_size", "must be at least 1"));
        }
        if self.time_format.trim().is_empty() {
            errors.push(ValidationError::field("time_format", "must not be empty"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A single-use ingestion run.
pub struct IngestionRun {
    params: RunParams,
    state: RunState,
    rejects: RejectLog,
    summary: Option<LoadSummary>,
}

impl IngestionRun {
    #[must_use]
    pub fn new(params: RunParams) -> Self {
        let rejects = RejectLog::with_capacity(params.reject_capacity);
        Self {
            params,
            state: RunState::Idle,
            rejects,
            summary: None,
        }
    }

    #[must_use]
    pub fn params(&self) -> &RunParams {
        &self.params
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Malformed rows seen so far, with samples.
    #[must_use]
    pub fn rejects(&self) -> &RejectLog {
        &self.rejects
    }

    /// Summary of a completed run.
    #[must_use]
    pub fn summary(&self) -> Option<&LoadSummary> {
        self.summary.as_ref()
    }

    /// Run against `source`, logging progress through `tracing`.
    ///
    /// # Errors
    /// See [`execute_with`](Self::execute_with).
    pub fn execute<R: Read>(
        &mut self,
        source: R,
        sink: &dyn DataSink,
    ) -> Result<LoadSummary, IngestError> {
        self.execute_with(source, sink, &mut LogProgress)
    }

    /// Open `file` (decompressing if needed) and run against it.
    ///
    /// # Errors
    /// [`IngestError::Source`] if the file cannot be opened; otherwise see
    /// [`execute_with`](Self::execute_with).
    pub fn execute_file(
        &mut self,
        file: &SourceFile,
        sink: &dyn DataSink,
        observer: &mut dyn ProgressObserver,
    ) -> Result<LoadSummary, IngestError> {
        match file.open() {
            Ok(reader) => self.execute_with(reader, sink, observer),
            Err(e) => Err(self.fail(
                IngestError::Source {
                    batch: 0,
                    source: e.into(),
                },
                observer,
            )),
        }
    }

    /// Run against `source`, reporting to `observer`.
    ///
    /// The source header is read and checked against the keep-list before
    /// anything is provisioned, so an unreadable, empty or mismatched source
    /// leaves existing partitions untouched.
    ///
    /// # Errors
    /// - [`IngestError::InvalidParams`] if the run already executed, or the
    ///   parameters or the dataset's schema declaration are invalid
    /// - [`IngestError::MissingColumns`] if the header lacks kept columns
    /// - [`IngestError::PartitionProvisioningFailed`] if a table could not be
    ///   created; nothing is loaded
    /// - [`IngestError::Source`] / [`IngestError::AppendFailed`] if loading
    ///   stopped part-way
    pub fn execute_with<R: Read>(
        &mut self,
        source: R,
        sink: &dyn DataSink,
        observer: &mut dyn ProgressObserver,
    ) -> Result<LoadSummary, IngestError> {
        if self.state != RunState::Idle {
            return Err(IngestError::InvalidParams(format!(
                "run already {}; start a new run to reload",
                self.state
            )));
        }
        let dataset = self.params.dataset;
        let schema = dataset.schema();
        let checked = combine_validations(vec![schema.validate(), self.params.validate()]);
        if let Err(errors) = checked {
            let err = IngestError::InvalidParams(format!("{dataset}: {}", format_errors(&errors)));
            return Err(self.fail(err, observer));
        }

        let reader = match ChunkedReader::new(source, self.params.batch_size) {
            Ok(reader) => reader,
            Err(e) => {
                let err = IngestError::Source {
                    batch: 0,
                    source: e.into(),
                };
                return Err(self.fail(err, observer));
            }
        };
        let missing: Vec<String> = schema
            .keep_list()
            .filter(|name| reader.header().position(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            let err = IngestError::MissingColumns { dataset, missing };
            return Err(self.fail(err, observer));
        }
        info!(
            %dataset,
            years = %self.params.years,
            batch_size = reader.batch_size(),
            "run.start"
        );

        self.transition(RunState::Provisioning, observer);
        if let Err(err) = provision(dataset, &self.params.years, schema, sink) {
            return Err(self.fail(err, observer));
        }

        self.transition(RunState::Loading { batch: 0 }, observer);
        let mut executor = LoadExecutor::new(dataset, schema, &self.params.years)
            .with_time_format(&self.params.time_format)
            .with_reject_capacity(self.params.reject_capacity);
        let outcome = {
            let mut tracking = TrackState {
                state: &mut self.state,
                inner: &mut *observer,
            };
            executor.load(reader, sink, &mut tracking)
        };
        self.rejects = executor.into_rejects();

        match outcome {
            Ok(summary) => {
                self.transition(RunState::Complete, observer);
                info!(
                    %dataset,
                    rows = summary.total_rows,
                    malformed = summary.malformed,
                    out_of_range = summary.out_of_range,
                    batches = summary.batches,
                    seconds = summary.elapsed.as_secs_f64(),
                    "run.complete"
                );
                if summary.malformed > 0 {
                    warn!(%dataset, rejects = %self.rejects, "run.malformed_rows");
                }
                self.summary = Some(summary.clone());
                Ok(summary)
            }
            Err(err) => Err(self.fail(err, observer)),
        }
    }

    fn transition(&mut self, next: RunState, observer: &mut dyn ProgressObserver) {
        info!(dataset = %self.params.dataset, from = %self.state, to = %next, "run.transition");
        self.state = next;
        observer.on_state(next);
    }

    fn fail(&mut self, err: IngestError, observer: &mut dyn ProgressObserver) -> IngestError {
        let batch = err.batch().or(match self.state {
            RunState::Loading { batch } => Some(batch),
            _ => None,
        });
        let partition = err
            .partition()
            .map(|(dataset, year)| PartitionKey::new(dataset, year).to_string());
        error!(
            dataset = %self.params.dataset,
            from = %self.state,
            partition = partition.as_deref().unwrap_or("-"),
            batch = ?batch,
            error = %err,
            "run.failed"
        );
        self.state = RunState::Failed;
        observer.on_state(RunState::Failed);
        err
    }
}

/// Forwards everything and advances `Loading { batch }` after each batch.
struct TrackState<'a, O: ProgressObserver + ?Sized> {
    state: &'a mut RunState,
    inner: &'a mut O,
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for TrackState<'_, O> {
    fn on_batch(&mut self, event: &ProgressEvent) {
        self.inner.on_batch(event);
        let next = RunState::Loading {
            batch: event.batch_index + 1,
        };
        debug!(from = %self.state, to = %next, "run.transition");
        *self.state = next;
        self.inner.on_state(next);
    }

    fn on_state(&mut self, state: RunState) {
        self.inner.on_state(state);
    }
}
