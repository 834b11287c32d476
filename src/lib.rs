//! # yearload
//!
//! Bounded-memory ingestion of large collision exports into per-year
//! partition tables.
//!
//! A run streams a delimited source in fixed-size batches, projects each row
//! onto a declared schema (keep, rename, type), parses its date and time
//! tolerantly, and appends it to the table of its calendar year. Rows of
//! years that were not requested are dropped; rows that cannot be projected
//! or dated are counted as malformed and dropped. A separate, read-only
//! reconciliation pass reports row counts per year and dataset.
//!
//! ## Quick Start
//!
//! ```
//! use yearload::*;
//! use yearload::testing::CsvFixture;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = CsvFixture::new(DatasetType::Crashes)
//!     .row("03/01/2022")
//!     .row("2023-07-04")
//!     .row("notadate")
//!     .to_csv_string()?;
//!
//! let sink = MemorySink::new();
//! let years = YearSet::new([2022, 2023])?;
//! let mut run = IngestionRun::new(RunParams::new(DatasetType::Crashes, years));
//! let summary = run.execute_with(source.as_bytes(), &sink, &mut NoProgress)?;
//!
//! assert_eq!(summary.rows_for(DatasetType::Crashes, 2022), 1);
//! assert_eq!(summary.rows_for(DatasetType::Crashes, 2023), 1);
//! assert_eq!(summary.malformed, 1);
//!
//! let report = reconcile(2012..=2023, &DatasetType::ALL, &sink)?;
//! assert_eq!(report.column_total(DatasetType::Crashes), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! - [`io::csv`] - [`ChunkedReader`] yields [`RawBatch`]es lazily;
//!   [`io::compression`] decodes `.gz` / `.zst` sources on the fly
//! - [`projection`] - [`project`] and [`resolve`] turn raw rows into typed
//!   [`ResolvedRow`]s
//! - [`temporal`] - the accepted date grammars and the time format
//! - [`router`] - [`route`] picks the partition of a row
//! - [`provision`] - drop-and-recreate of the requested year tables
//! - [`load`] - [`LoadExecutor`] appends one bulk call per partition per
//!   batch
//! - [`run`] - [`IngestionRun`] ties it together as a state machine
//! - [`reconcile`] - row counts per year and dataset
//!
//! ## Destination stores
//!
//! Everything writes through the [`DataSink`] trait. [`MemorySink`] keeps
//! tables in process (with fault injection for tests); [`SqliteSink`]
//! (feature `sink-sqlite`) writes a SQLite database.
//!
//! ## Feature Flags
//!
//! - `compression-gzip`, `compression-zstd` - transparent source decoding
//! - `sink-sqlite` - the SQLite sink
//! - `parallel-reconcile` - count partitions on the rayon pool

pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod load;
pub mod metrics;
pub mod progress;
pub mod projection;
pub mod provision;
pub mod reconcile;
pub mod router;
pub mod run;
pub mod schema;
pub mod sink;
pub mod temporal;
pub mod testing;
pub mod validation;

// General re-exports
pub use config::IngestConfig;
pub use dataset::DatasetType;
pub use error::{IngestError, SinkError, SinkErrorKind, SinkResult};
pub use io::csv::{ChunkedReader, RawBatch, SourceFile};
pub use load::{LoadExecutor, LoadSummary};
pub use metrics::MetricsCollector;
pub use progress::{LogProgress, NoProgress, ProgressEvent, ProgressObserver, RecordingProgress};
pub use projection::{ResolvedRow, project, resolve};
pub use provision::{Partition, provision};
pub use reconcile::{DEFAULT_YEARS, ReconciliationReport, reconcile};
pub use router::{PartitionKey, Route, YearSet, route};
pub use run::{IngestionRun, RunParams, RunState};
pub use schema::{ColumnSpec, ColumnType, SchemaDeclaration, Value};
pub use sink::{DataSink, MemorySink};
pub use validation::{Malformed, RejectLog};

// Gated re-exports
#[cfg(feature = "sink-sqlite")]
pub use sink::SqliteSink;
