//! Row-count reconciliation across year partitions.
//!
//! Read-only: for each `(year, dataset)` pair the partition's row count is
//! fetched from the sink. A partition that was never loaded counts as 0;
//! any other sink failure is an error, so an outage never reads as "empty".
//!
//! The rendered report is a fixed-width table:
//!
//! ```text
//!    Downloaded data report:
//!
//!        year    Crashes   Vehicles     Person
//!        2022          5          0          0
//!        2023     12,345          0          0
//!
//!       total     12,350          0          0
//! ```

use crate::dataset::DatasetType;
use crate::error::SinkError;
use crate::sink::DataSink;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

#[cfg(feature = "parallel-reconcile")]
use rayon::prelude::*;

/// Years the report covers when none are given.
pub const DEFAULT_YEARS: RangeInclusive<i32> = 2012..=2023;

const COLUMN_WIDTH: usize = 11;

/// Row counts per `(year, dataset)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    years: Vec<i32>,
    datasets: Vec<DatasetType>,
    counts: BTreeMap<(i32, DatasetType), u64>,
}

impl ReconciliationReport {
    #[must_use]
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    #[must_use]
    pub fn datasets(&self) -> &[DatasetType] {
        &self.datasets
    }

    /// Count for one cell; 0 outside the report.
    #[must_use]
    pub fn count(&self, year: i32, dataset: DatasetType) -> u64 {
        self.counts.get(&(year, dataset)).copied().unwrap_or(0)
    }

    /// Sum over all years for one dataset.
    #[must_use]
    pub fn column_total(&self, dataset: DatasetType) -> u64 {
        self.years.iter().map(|&y| self.count(y, dataset)).sum()
    }

    #[must_use]
    pub fn grand_total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// `12345` -> `"12,345"`.
fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = COLUMN_WIDTH;
        writeln!(f, "   Downloaded data report:")?;
        writeln!(f)?;
        write!(f, "{:>w$}", "year")?;
        for d in &self.datasets {
            write!(f, "{:>w$}", d.label())?;
        }
        writeln!(f)?;
        for year in &self.years {
            write!(f, "{year:>w$}")?;
            for d in &self.datasets {
                write!(f, "{:>w$}", with_thousands(self.count(*year, *d)))?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        write!(f, "{:>w$}", "total")?;
        for d in &self.datasets {
            write!(f, "{:>w$}", with_thousands(self.column_total(*d)))?;
        }
        writeln!(f)
    }
}

fn count_cell(
    sink: &dyn DataSink,
    year: i32,
    dataset: DatasetType,
) -> Result<((i32, DatasetType), u64), SinkError> {
    let table = dataset.table_name(year);
    match sink.count_rows(&table) {
        Ok(n) => {
            debug!(%table, rows = n, "reconcile.count");
            Ok(((year, dataset), n))
        }
        Err(e) if e.is_not_found() => {
            debug!(%table, "reconcile.missing");
            Ok(((year, dataset), 0))
        }
        Err(e) => {
            warn!(%table, error = %e, "reconcile.count_failed");
            Err(e)
        }
    }
}

/// Count every `(year, dataset)` partition.
///
/// # Errors
/// The first sink failure other than `NotFound`.
pub fn reconcile(
    years: RangeInclusive<i32>,
    datasets: &[DatasetType],
    sink: &dyn DataSink,
) -> Result<ReconciliationReport, SinkError> {
    let years: Vec<i32> = years.collect();
    let cells: Vec<(i32, DatasetType)> = years
        .iter()
        .flat_map(|&y| datasets.iter().map(move |&d| (y, d)))
        .collect();

    #[cfg(feature = "parallel-reconcile")]
    let counted: Result<Vec<_>, SinkError> = cells
        .par_iter()
        .map(|&(y, d)| count_cell(sink, y, d))
        .collect();
    #[cfg(not(feature = "parallel-reconcile"))]
    let counted: Result<Vec<_>, SinkError> = cells
        .iter()
        .map(|&(y, d)| count_cell(sink, y, d))
        .collect();

    Ok(ReconciliationReport {
        years,
        datasets: datasets.to_vec(),
        counts: counted?.into_iter().collect(),
    })
}
