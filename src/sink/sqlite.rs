//! SQLite-backed sink.
//!
//! Partition tables are plain SQLite tables with the declared SQL types.
//! Each `append_rows` call runs inside one transaction with a cached
//! prepared `INSERT`, so a batch lands completely or not at all.
//!
//! Dates are stored as `YYYY-MM-DD` text and times as `HH:MM:SS` text.

use crate::error::{SinkError, SinkErrorKind, SinkResult};
use crate::projection::ResolvedRow;
use crate::schema::{ColumnSpec, Value};
use crate::sink::DataSink;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Sql::Null),
            Self::Integer(v) => ToSqlOutput::Owned(Sql::Integer(*v)),
            Self::Date(d) => ToSqlOutput::Owned(Sql::Text(d.format("%Y-%m-%d").to_string())),
            Self::Time(t) => ToSqlOutput::Owned(Sql::Text(t.format("%H:%M:%S").to_string())),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn internal(e: rusqlite::Error) -> SinkError {
    SinkError::new(SinkErrorKind::Internal, e.to_string())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A SQLite database used as the destination store.
pub struct SqliteSink {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteSink {
    /// Open (or create) a database file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened as a SQLite database.
    pub fn open(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            SinkError::new(SinkErrorKind::Unavailable, format!("open {}: {e}", path.display()))
        })?;
        Self::from_connection(conn, path.display().to_string())
    }

    /// A private in-memory database.
    ///
    /// # Errors
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SinkError::new(SinkErrorKind::Unavailable, e.to_string()))?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    /// Wrap a connection the caller already configured.
    ///
    /// # Errors
    /// Returns an error if the session pragmas cannot be applied.
    pub fn from_connection(conn: Connection, label: String) -> SinkResult<Self> {
        conn.execute_batch(
            r"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )
        .map_err(internal)?;
        Ok(Self {
            conn: Mutex::new(conn),
            label,
        })
    }

    fn conn(&self) -> SinkResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SinkError::new(SinkErrorKind::Unavailable, "sqlite connection lock poisoned"))
    }

    fn table_exists(conn: &Connection, table: &str) -> SinkResult<bool> {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()
        .map(|hit| hit.is_some())
        .map_err(internal)
    }

    /// Declared `(name, type)` pairs of `table`.
    ///
    /// # Errors
    /// `NotFound` if the table does not exist.
    pub fn table_columns(&self, table: &str) -> SinkResult<Vec<(String, String)>> {
        let conn = self.conn()?;
        if !Self::table_exists(&conn, table)? {
            return Err(SinkError::not_found(table));
        }
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
            .map_err(internal)?;
        let cols = stmt
            .query_map([], |r| Ok((r.get::<_, String>(1)?, r.get::<_, String>(2)?)))
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        Ok(cols)
    }

    /// All values of one column as text, in insertion order; `None` for
    /// SQL `NULL`.
    ///
    /// # Errors
    /// `NotFound` if the table does not exist.
    pub fn column_values(&self, table: &str, column: &str) -> SinkResult<Vec<Option<String>>> {
        use rusqlite::types::Value as Sql;
        let conn = self.conn()?;
        if !Self::table_exists(&conn, table)? {
            return Err(SinkError::not_found(table));
        }
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            quote_ident(column),
            quote_ident(table)
        );
        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let values = stmt
            .query_map([], |r| {
                Ok(match r.get::<_, Sql>(0)? {
                    Sql::Null => None,
                    Sql::Integer(v) => Some(v.to_string()),
                    Sql::Real(v) => Some(v.to_string()),
                    Sql::Text(s) => Some(s),
                    Sql::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
                })
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        Ok(values)
    }
}

impl DataSink for SqliteSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn create_or_replace_table(&self, table: &str, columns: &[ColumnSpec]) -> SinkResult<()> {
        let defs: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.canonical), c.ty.sql_type()))
            .collect();
        let ident = quote_ident(table);
        let sql = format!(
            "BEGIN;\nDROP TABLE IF EXISTS {ident};\nCREATE TABLE {ident} ({});\nCOMMIT;",
            defs.join(", ")
        );
        let conn = self.conn()?;
        if let Err(e) = conn.execute_batch(&sql) {
            // Leave no half-open transaction behind on the shared connection.
            let _ = conn.execute_batch("ROLLBACK;");
            return Err(internal(e));
        }
        debug!(table, columns = columns.len(), "sqlite.create_or_replace");
        Ok(())
    }

    fn append_rows(
        &self,
        table: &str,
        columns: &[ColumnSpec],
        rows: &[ResolvedRow],
    ) -> SinkResult<u64> {
        let mut conn = self.conn()?;
        if !Self::table_exists(&conn, table)? {
            return Err(SinkError::not_found(table));
        }
        let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.canonical)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        );

        let tx = conn.transaction().map_err(internal)?;
        {
            let mut stmt = tx.prepare_cached(&sql).map_err(|e| {
                SinkError::new(SinkErrorKind::InvalidInput, format!("{table}: {e}"))
            })?;
            for row in rows {
                if row.values.len() != columns.len() {
                    return Err(SinkError::new(
                        SinkErrorKind::InvalidInput,
                        format!("{table}: row has {} values for {} columns", row.values.len(), columns.len()),
                    ));
                }
                stmt.execute(params_from_iter(row.values.iter()))
                    .map_err(internal)?;
            }
        }
        tx.commit().map_err(internal)?;
        Ok(rows.len() as u64)
    }

    fn count_rows(&self, table: &str) -> SinkResult<u64> {
        let conn = self.conn()?;
        if !Self::table_exists(&conn, table)? {
            return Err(SinkError::not_found(table));
        }
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |r| r.get(0))
            .map_err(internal)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
