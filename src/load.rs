//! The load executor: project, resolve, route and append, one batch at a
//! time.
//!
//! For each [`RawBatch`]:
//! 1. every row is projected onto the schema and resolved; defects go to the
//!    [`RejectLog`] and the row is dropped,
//! 2. survivors are routed and grouped per partition (source order kept),
//! 3. each group is appended with one bulk call, partitions in ascending
//!    year order,
//! 4. a [`ProgressEvent`] is emitted.
//!
//! The batch is released before the next one is pulled from the source. A
//! failed append stops the run: rows already appended by earlier batches
//! stay where they are, and a clean retry goes through re-provisioning.

use crate::dataset::DatasetType;
use crate::error::IngestError;
use crate::io::csv::RawBatch;
use crate::metrics::MetricsCollector;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::projection::{ResolvedRow, project_and_resolve};
use crate::router::{PartitionKey, RoutedBatch, YearSet, route_batch};
use crate::schema::SchemaDeclaration;
use crate::sink::DataSink;
use crate::temporal::DEFAULT_TIME_FORMAT;
use crate::validation::RejectLog;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Outcome of a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows appended across all partitions.
    pub total_rows: u64,
    /// Rows appended per partition. Provisioned partitions that received no
    /// rows are absent.
    pub per_partition: BTreeMap<PartitionKey, u64>,
    /// Rows dropped as malformed (projection or date defects).
    pub malformed: u64,
    /// Valid rows dropped because their year was not requested.
    pub out_of_range: u64,
    /// Integer values stored as null because their text was unreadable.
    pub coerced_values: u64,
    /// Batches processed.
    pub batches: usize,
    pub elapsed: Duration,
}

impl LoadSummary {
    /// Rows appended to one partition.
    #[must_use]
    pub fn rows_for(&self, dataset: DatasetType, year: i32) -> u64 {
        self.per_partition
            .get(&PartitionKey::new(dataset, year))
            .copied()
            .unwrap_or(0)
    }

    /// Source rows seen: loaded plus every kind of drop.
    #[must_use]
    pub fn rows_seen(&self) -> u64 {
        self.total_rows + self.malformed + self.out_of_range
    }

    /// Record this summary as counters and gauges.
    pub fn record_into(&self, metrics: &MetricsCollector) {
        metrics.set_counter("rows_loaded", self.total_rows);
        metrics.set_counter("rows_malformed", self.malformed);
        metrics.set_counter("rows_out_of_range", self.out_of_range);
        metrics.set_counter("values_coerced", self.coerced_values);
        metrics.set_counter("batches", self.batches as u64);
        for (key, n) in &self.per_partition {
            metrics.set_counter(&format!("rows_loaded.{}", key.table_name()), *n);
        }
        metrics.set_gauge("load_seconds", self.elapsed.as_secs_f64());
    }
}

/// Streams batches into partitions for one dataset type and year set.
pub struct LoadExecutor<'a> {
    dataset: DatasetType,
    schema: &'a SchemaDeclaration,
    years: &'a YearSet,
    time_format: &'a str,
    rejects: RejectLog,
}

impl<'a> LoadExecutor<'a> {
    #[must_use]
    pub fn new(dataset: DatasetType, schema: &'a SchemaDeclaration, years: &'a YearSet) -> Self {
        Self {
            dataset,
            schema,
            years,
            time_format: DEFAULT_TIME_FORMAT,
            rejects: RejectLog::new(),
        }
    }

    #[must_use]
    pub fn with_time_format(mut self, time_format: &'a str) -> Self {
        self.time_format = time_format;
        self
    }

    /// Keep at most `capacity` malformed-row samples.
    #[must_use]
    pub fn with_reject_capacity(mut self, capacity: usize) -> Self {
        self.rejects = RejectLog::with_capacity(capacity);
        self
    }

    /// Rows dropped as malformed so far, with samples.
    #[must_use]
    pub fn rejects(&self) -> &RejectLog {
        &self.rejects
    }

    /// Consume the executor, keeping the reject log.
    #[must_use]
    pub fn into_rejects(self) -> RejectLog {
        self.rejects
    }

    /// Project, resolve and route one batch without touching the sink.
    pub fn route(&mut self, batch: RawBatch) -> (RoutedBatch, u64) {
        let mut coerced = 0u64;
        let mut resolved: Vec<ResolvedRow> = Vec::with_capacity(batch.rows.len());
        for record in batch.rows {
            let outcome = record
                .row
                .and_then(|raw| project_and_resolve(&raw, self.schema, self.time_format));
            match outcome {
                Ok(row) => {
                    coerced += row.coerced_values as u64;
                    resolved.push(row);
                }
                Err(reason) => self.rejects.record(record.line, reason),
            }
        }
        (route_batch(resolved, self.dataset, self.years), coerced)
    }

    /// Drain `batches` into `sink`.
    ///
    /// # Errors
    /// [`IngestError::Source`] if the source fails to yield a batch;
    /// [`IngestError::AppendFailed`] if the sink rejects an append. Either
    /// stops the load at that batch.
    pub fn load<I>(
        &mut self,
        batches: I,
        sink: &dyn DataSink,
        observer: &mut dyn ProgressObserver,
    ) -> Result<LoadSummary, IngestError>
    where
        I: IntoIterator<Item = anyhow::Result<RawBatch>>,
    {
        let start = Instant::now();
        let mut summary = LoadSummary::default();

        for (position, next) in batches.into_iter().enumerate() {
            let batch = next.map_err(|e| IngestError::Source {
                batch: position,
                source: e.into(),
            })?;
            let index = batch.index;
            let rows_in_batch = batch.len();
            let malformed_before = self.rejects.total();

            let (routed, coerced) = self.route(batch);
            summary.out_of_range += routed.dropped as u64;
            summary.coerced_values += coerced;

            for (key, rows) in &routed.groups {
                let table = key.table_name();
                let appended = sink
                    .append_rows(&table, self.schema.columns(), rows)
                    .map_err(|source| {
                        error!(%table, batch = index, error = %source, "load.append_failed");
                        IngestError::AppendFailed {
                            dataset: key.dataset,
                            year: key.year,
                            batch: index,
                            source,
                        }
                    })?;
                *summary.per_partition.entry(*key).or_insert(0) += appended;
                summary.total_rows += appended;
                debug!(%table, batch = index, rows = appended, "load.append");
            }

            summary.malformed = self.rejects.total();
            summary.batches += 1;
            summary.elapsed = start.elapsed();
            debug!(
                batch = index,
                malformed = summary.malformed - malformed_before,
                dropped = routed.dropped,
                "load.batch_done"
            );
            observer.on_batch(&ProgressEvent {
                batch_index: index,
                rows_in_batch,
                total_loaded: summary.total_rows,
                malformed: summary.malformed,
                out_of_range: summary.out_of_range,
                elapsed: summary.elapsed,
            });
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}
