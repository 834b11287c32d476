//! Error types for ingestion runs and destination sinks.
//!
//! Row-level defects are not errors at this level: they are recorded as
//! [`Malformed`](crate::validation::Malformed) and counted. Only conditions
//! that terminate a run, or that a sink reports, live here.

use crate::dataset::DatasetType;
use std::fmt;
use thiserror::Error;

/// Category of a destination sink failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// The table does not exist.
    NotFound,
    /// Rows or columns do not fit the table definition.
    InvalidInput,
    /// The sink (or its connection) cannot be used right now.
    Unavailable,
    /// Anything else the store reports.
    Internal,
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::InvalidInput => "invalid input",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Error reported by a [`DataSink`](crate::sink::DataSink).
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct SinkError {
    pub kind: SinkErrorKind,
    pub message: String,
}

impl SinkError {
    pub fn new(kind: SinkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(table: &str) -> Self {
        Self::new(SinkErrorKind::NotFound, format!("table {table} does not exist"))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == SinkErrorKind::NotFound
    }
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Terminating conditions of an ingestion run.
///
/// Each variant carries enough context (dataset type, year, batch index) for
/// the caller to retry cleanly by re-provisioning the affected partitions.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The sink rejected creating or replacing a partition table. Raised
    /// before any row is loaded.
    #[error("provisioning partition {dataset}/{year} failed: {source}")]
    PartitionProvisioningFailed {
        dataset: DatasetType,
        year: i32,
        #[source]
        source: SinkError,
    },

    /// The sink rejected a bulk append; the run stops at this batch.
    #[error("append to partition {dataset}/{year} failed at batch {batch}: {source}")]
    AppendFailed {
        dataset: DatasetType,
        year: i32,
        batch: usize,
        #[source]
        source: SinkError,
    },

    /// The source stream itself failed (I/O, decompression).
    #[error("reading source failed at batch {batch}: {source}")]
    Source {
        batch: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The source header lacks keep-list columns (all of them when the
    /// source is empty). Raised before any partition is provisioned.
    #[error("source for {dataset} is missing columns {missing:?}")]
    MissingColumns {
        dataset: DatasetType,
        missing: Vec<String>,
    },

    /// Run parameters or schema declaration rejected up front.
    #[error("invalid run parameters: {0}")]
    InvalidParams(String),
}

impl IngestError {
    /// Batch index at which the run stopped, when the failure happened
    /// during loading.
    #[must_use]
    pub fn batch(&self) -> Option<usize> {
        match self {
            Self::AppendFailed { batch, .. } | Self::Source { batch, .. } => Some(*batch),
            _ => None,
        }
    }

    /// `(dataset, year)` of the partition involved, if any.
    #[must_use]
    pub fn partition(&self) -> Option<(DatasetType, i32)> {
        match self {
            Self::PartitionProvisioningFailed { dataset, year, .. }
            | Self::AppendFailed { dataset, year, .. } => Some((*dataset, *year)),
            _ => None,
        }
    }
}
