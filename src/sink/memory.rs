//! In-memory sink.
//!
//! Tables live in a shared map behind a mutex, so clones of a `MemorySink`
//! see the same store. Appends are type-checked against the table's
//! declared columns the way a typed database would reject them, and
//! failures can be injected per table to exercise the engine's error paths.

use crate::error::{SinkError, SinkErrorKind, SinkResult};
use crate::projection::ResolvedRow;
use crate::schema::{ColumnSpec, ColumnType, Value};
use crate::sink::DataSink;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<(String, ColumnType)>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
struct Faults {
    create: HashSet<String>,
    append: HashSet<String>,
    count: HashSet<String>,
}

type TableMap = Arc<Mutex<HashMap<String, MemoryTable>>>;

#[derive(Clone, Default)]
pub struct MemorySink {
    tables: TableMap,
    faults: Arc<Mutex<Faults>>,
}

fn lock<T>(m: &Mutex<T>) -> SinkResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| SinkError::new(SinkErrorKind::Unavailable, "memory sink lock poisoned"))
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `create_or_replace_table` of `table` fail.
    pub fn fail_creates_of(&self, table: &str) {
        if let Ok(mut f) = self.faults.lock() {
            f.create.insert(table.to_string());
        }
    }

    /// Make every later `append_rows` to `table` fail.
    pub fn fail_appends_to(&self, table: &str) {
        if let Ok(mut f) = self.faults.lock() {
            f.append.insert(table.to_string());
        }
    }

    /// Make every later `count_rows` of `table` fail with an internal error.
    pub fn fail_counts_of(&self, table: &str) {
        if let Ok(mut f) = self.faults.lock() {
            f.count.insert(table.to_string());
        }
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        if let Ok(mut f) = self.faults.lock() {
            *f = Faults::default();
        }
    }

    /// Names of all existing tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Declared columns of `table`.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<Vec<(String, ColumnType)>> {
        self.tables.lock().ok()?.get(table).map(|t| t.columns.clone())
    }

    /// Snapshot of the rows stored in `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        self.tables.lock().ok()?.get(table).map(|t| t.rows.clone())
    }

    /// Insert rows directly, bypassing type checks. Creates the table with
    /// no declared columns if it is missing.
    pub fn seed_rows(&self, table: &str, rows: Vec<Vec<Value>>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().rows.extend(rows);
        }
    }

    fn injected(&self, table: &str, pick: impl Fn(&Faults) -> &HashSet<String>) -> SinkResult<bool> {
        Ok(pick(&*lock(&self.faults)?).contains(table))
    }
}

impl DataSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_or_replace_table(&self, table: &str, columns: &[ColumnSpec]) -> SinkResult<()> {
        if self.injected(table, |f| &f.create)? {
            return Err(SinkError::new(
                SinkErrorKind::Internal,
                format!("injected create failure for {table}"),
            ));
        }
        let def = MemoryTable {
            columns: columns.iter().map(|c| (c.canonical.clone(), c.ty)).collect(),
            rows: Vec::new(),
        };
        lock(&self.tables)?.insert(table.to_string(), def);
        Ok(())
    }

    fn append_rows(
        &self,
        table: &str,
        columns: &[ColumnSpec],
        rows: &[ResolvedRow],
    ) -> SinkResult<u64> {
        if self.injected(table, |f| &f.append)? {
            return Err(SinkError::new(
                SinkErrorKind::Internal,
                format!("injected append failure for {table}"),
            ));
        }
        let mut tables = lock(&self.tables)?;
        let target = tables.get_mut(table).ok_or_else(|| SinkError::not_found(table))?;

        let names: Vec<&str> = columns.iter().map(|c| c.canonical.as_str()).collect();
        let declared: Vec<&str> = target.columns.iter().map(|(n, _)| n.as_str()).collect();
        if names != declared {
            return Err(SinkError::new(
                SinkErrorKind::InvalidInput,
                format!("column list {names:?} does not match {table} {declared:?}"),
            ));
        }
        // Check everything before storing anything: appends are all-or-nothing.
        for (i, row) in rows.iter().enumerate() {
            if row.values.len() != target.columns.len() {
                return Err(SinkError::new(
                    SinkErrorKind::InvalidInput,
                    format!("row {i} has {} values, {table} has {} columns", row.values.len(), target.columns.len()),
                ));
            }
            if let Some(((name, ty), v)) = target
                .columns
                .iter()
                .zip(&row.values)
                .find(|((_, ty), v)| !v.fits(*ty))
            {
                return Err(SinkError::new(
                    SinkErrorKind::InvalidInput,
                    format!("row {i}: value {v} does not fit {name} {ty}"),
                ));
            }
        }
        target.rows.extend(rows.iter().map(|r| r.values.clone()));
        Ok(rows.len() as u64)
    }

    fn count_rows(&self, table: &str) -> SinkResult<u64> {
        if self.injected(table, |f| &f.count)? {
            return Err(SinkError::new(
                SinkErrorKind::Internal,
                format!("injected count failure for {table}"),
            ));
        }
        lock(&self.tables)?
            .get(table)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| SinkError::not_found(table))
    }
}
