//! Destination sink seam.
//!
//! The engine never manages connections itself. It is handed a ready
//! [`DataSink`] and uses three operations: create-or-replace a typed table,
//! bulk-append rows, count rows. `count_rows` on a missing table fails with
//! [`SinkErrorKind::NotFound`](crate::error::SinkErrorKind::NotFound) so
//! callers can tell "never loaded" from a real failure.
//!
//! All methods take `&self` and the trait is `Send + Sync`: an ingestion run
//! and a reconciliation pass may share one sink concurrently.
//!
//! Implementations:
//! - [`MemorySink`] - in-process tables with fault injection, for tests
//! - [`SqliteSink`] - a SQLite database file (feature `sink-sqlite`)

pub mod memory;
#[cfg_attr(docsrs, doc(cfg(feature = "sink-sqlite")))]
#[cfg(feature = "sink-sqlite")]
pub mod sqlite;

use crate::error::SinkResult;
use crate::projection::ResolvedRow;
use crate::schema::ColumnSpec;

pub use memory::MemorySink;
#[cfg(feature = "sink-sqlite")]
pub use sqlite::SqliteSink;

/// Capability over the destination relational store.
pub trait DataSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str {
        "sink"
    }

    /// Create `table` with exactly `columns` (canonical names and types),
    /// dropping any existing table of that name first.
    ///
    /// # Errors
    /// Returns an error if the store rejects the drop or the create.
    fn create_or_replace_table(&self, table: &str, columns: &[ColumnSpec]) -> SinkResult<()>;

    /// Append `rows` to `table` as one bulk operation. Returns the number of
    /// rows written.
    ///
    /// # Errors
    /// Returns an error if the table is missing or rejects any row; no row of
    /// the call is kept in that case.
    fn append_rows(&self, table: &str, columns: &[ColumnSpec], rows: &[ResolvedRow])
    -> SinkResult<u64>;

    /// Number of rows in `table`.
    ///
    /// # Errors
    /// `NotFound` if the table does not exist; other kinds on store failure.
    fn count_rows(&self, table: &str) -> SinkResult<u64>;
}
