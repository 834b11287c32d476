//! Data quality: declaration checks and the malformed-row ledger.
//!
//! Two kinds of defects are handled here:
//! - **Declaration defects** ([`ValidationError`]) - a schema or run
//!   configuration that breaks an invariant. These are rejected before a run
//!   starts.
//! - **Row defects** ([`Malformed`]) - a single source record that cannot be
//!   projected or has no usable date. These never abort a run; the row is
//!   dropped and recorded in a [`RejectLog`].
//!
//! # Example
//!
//! ```
//! use yearload::validation::{Malformed, RejectLog};
//!
//! let mut log = RejectLog::with_capacity(2);
//! log.record(2, Malformed::UnparseableDate(Some("notadate".into())));
//! log.record(7, Malformed::MissingField("CRASH DATE".into()));
//! log.record(9, Malformed::FieldCount { expected: 14, found: 3 });
//!
//! assert_eq!(log.total(), 3);
//! assert_eq!(log.samples().len(), 2); // only the first two are retained
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

/// Result type for validation operations.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Trait for declarations that can be checked before use.
pub trait Validate {
    /// Validate this instance and return every violated invariant.
    fn validate(&self) -> ValidationResult;
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The field that failed validation (optional)
    pub field: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Error code for categorization (optional)
    pub code: Option<String>,
}

impl ValidationError {
    /// Create a new validation error with just a message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            field: None,
            message: message.into(),
            code: None,
        }
    }

    /// Create a validation error for a specific field.
    pub fn field<S: Into<String>, M: Into<String>>(field: S, message: M) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Attach an error code.
    #[must_use]
    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "[{field}] {}", self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref code) = self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Join a list of errors into one line.
#[must_use]
pub fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Combine multiple validation results.
pub fn combine_validations(results: Vec<ValidationResult>) -> ValidationResult {
    let mut all_errors = Vec::new();
    for result in results {
        if let Err(mut errors) = result {
            all_errors.append(&mut errors);
        }
    }
    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}

/// Why a single source record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Malformed {
    /// A keep-list field is absent from the row.
    #[error("missing field {0:?}")]
    MissingField(String),
    /// The line has a different number of fields than the header.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    /// The date field is empty or matches none of the accepted grammars.
    #[error("unparseable date {0:?}")]
    UnparseableDate(Option<String>),
}

impl Malformed {
    /// Stable short name, used as a counter key.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::FieldCount { .. } => "field_count",
            Self::UnparseableDate(_) => "unparseable_date",
        }
    }
}

/// A dropped record and the source line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: Malformed,
}

/// Counts every malformed row and keeps the first few for inspection.
///
/// Only `capacity` samples are retained so the log stays bounded no matter
/// how dirty the source is.
#[derive(Debug, Clone)]
pub struct RejectLog {
    capacity: usize,
    samples: Vec<RejectedRow>,
    by_kind: BTreeMap<&'static str, u64>,
    total: u64,
}

impl RejectLog {
    /// Number of samples kept when no capacity is given.
    pub const DEFAULT_CAPACITY: usize = 100;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::new(),
            by_kind: BTreeMap::new(),
            total: 0,
        }
    }

    /// Record one dropped row.
    pub fn record(&mut self, line: u64, reason: Malformed) {
        self.total += 1;
        *self.by_kind.entry(reason.kind()).or_insert(0) += 1;
        if self.samples.len() < self.capacity {
            self.samples.push(RejectedRow { line, reason });
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count of rows dropped for one [`Malformed::kind`].
    #[must_use]
    pub fn count(&self, kind: &str) -> u64 {
        self.by_kind.get(kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn by_kind(&self) -> &BTreeMap<&'static str, u64> {
        &self.by_kind
    }

    #[must_use]
    pub fn samples(&self) -> &[RejectedRow] {
        &self.samples
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Export the retained samples as JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.samples)
    }

    /// Write the retained samples to a file in JSON format.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for RejectLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RejectLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RejectLog({} rows", self.total)?;
        for (kind, n) in &self.by_kind {
            write!(f, ", {kind}={n}")?;
        }
        write!(f, ")")
    }
}
