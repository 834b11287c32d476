//! Year partition routing.
//!
//! A resolved row carries exactly one date, so it has exactly one candidate
//! year. [`route`] sends it to `(dataset, year)` when that year was
//! requested and drops it otherwise. Rows outside the requested years are
//! expected and are only counted.

use crate::dataset::DatasetType;
use crate::error::IngestError;
use crate::projection::ResolvedRow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Non-empty set of years an ingestion run loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSet(BTreeSet<i32>);

impl YearSet {
    /// # Errors
    /// [`IngestError::InvalidParams`] when `years` is empty.
    pub fn new(years: impl IntoIterator<Item = i32>) -> Result<Self, IngestError> {
        let set: BTreeSet<i32> = years.into_iter().collect();
        if set.is_empty() {
            return Err(IngestError::InvalidParams("year list must not be empty".into()));
        }
        Ok(Self(set))
    }

    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        self.0.contains(&year)
    }

    /// Years in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for YearSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let years: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", years.join(", "))
    }
}

/// Identity of one destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub dataset: DatasetType,
    pub year: i32,
}

impl PartitionKey {
    #[must_use]
    pub fn new(dataset: DatasetType, year: i32) -> Self {
        Self { dataset, year }
    }

    #[must_use]
    pub fn table_name(&self) -> String {
        self.dataset.table_name(self.year)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dataset, self.year)
    }
}

/// Outcome of routing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    To(PartitionKey),
    Dropped,
}

/// Decide the destination partition of `row`.
#[must_use]
pub fn route(row: &ResolvedRow, dataset: DatasetType, years: &YearSet) -> Route {
    let year = row.year();
    if years.contains(year) {
        Route::To(PartitionKey::new(dataset, year))
    } else {
        Route::Dropped
    }
}

/// Rows of one batch grouped by destination, each group in source order.
#[derive(Debug, Default)]
pub struct RoutedBatch {
    pub groups: BTreeMap<PartitionKey, Vec<ResolvedRow>>,
    pub dropped: usize,
}

impl RoutedBatch {
    /// Rows that reached some partition.
    #[must_use]
    pub fn routed(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Route every row and group the survivors by partition.
pub fn route_batch<I>(rows: I, dataset: DatasetType, years: &YearSet) -> RoutedBatch
where
    I: IntoIterator<Item = ResolvedRow>,
{
    let mut out = RoutedBatch::default();
    for row in rows {
        match route(&row, dataset, years) {
            Route::To(key) => out.groups.entry(key).or_default().push(row),
            Route::Dropped => out.dropped += 1,
        }
    }
    out
}
