//! Run configuration.
//!
//! Every field has a default, so a config file only names what it changes:
//!
//! ```json
//! { "batch_size": 50000, "database": "/var/lib/mvc/mvc.db" }
//! ```
//!
//! CLI flags override whatever the file sets.

use crate::io::csv::DEFAULT_BATCH_SIZE;
use crate::reconcile::DEFAULT_YEARS;
use crate::temporal::DEFAULT_TIME_FORMAT;
use crate::validation::{RejectLog, Validate, ValidationError, ValidationResult, format_errors};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows per batch.
    pub batch_size: usize,
    /// `chrono` format of the time column.
    pub time_format: String,
    /// SQLite database file.
    pub database: PathBuf,
    /// First year of the reconciliation report.
    pub report_from: i32,
    /// Last year of the reconciliation report, inclusive.
    pub report_to: i32,
    /// Malformed-row samples kept per run.
    pub reject_samples: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            database: PathBuf::from("mvc.db"),
            report_from: *DEFAULT_YEARS.start(),
            report_to: *DEFAULT_YEARS.end(),
            reject_samples: RejectLog::DEFAULT_CAPACITY,
        }
    }
}

impl IngestConfig {
    /// Read a JSON config file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON for
    /// this shape, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        if let Err(errors) = config.validate() {
            bail!("invalid config {}: {}", path.display(), format_errors(&errors));
        }
        Ok(config)
    }

    /// Years covered by the reconciliation report.
    #[must_use]
    pub fn report_years(&self) -> RangeInclusive<i32> {
        self.report_from..=self.report_to
    }
}

impl Validate for IngestConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if self.batch_size == 0 {
            errors.push(ValidationError::field("batch_size", "must be at least 1"));
        }
        if self.time_format.trim().is_empty() {
            errors.push(ValidationError::field("time_format", "must not be empty"));
        }
        if self.report_from > self.report_to {
            errors.push(ValidationError::field(
                "report_from",
                format!("{} is after report_to {}", self.report_from, self.report_to),
            ));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
