//! Raw, projected and resolved rows.
//!
//! - [`RawRow`] - what the reader produces: values keyed by the source's own
//!   header names, in source order.
//! - [`ProjectedRow`] - restricted to a schema's keep-list and ordered by it;
//!   values are still text.
//! - [`ResolvedRow`] - typed values with the date parsed; only these can be
//!   routed to a partition.
//!
//! [`project`] and [`resolve`] are pure functions. Defects come back as
//! [`Malformed`] so the caller can count and drop the row.

use crate::schema::{ColumnType, SchemaDeclaration, Value};
use crate::temporal::{resolve_date, resolve_time};
use crate::validation::Malformed;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;

/// Field names of a source, shared by every row read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Build a header. When a name repeats, lookups resolve to its first
    /// occurrence.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// One source record: header-ordered values, `None` for empty fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    header: Arc<Header>,
    values: Vec<Option<String>>,
}

impl RawRow {
    /// Pair values with a header. `values` must be as long as the header;
    /// the reader reports other lengths as [`Malformed::FieldCount`].
    #[must_use]
    pub fn new(header: Arc<Header>, values: Vec<Option<String>>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Self { header, values }
    }

    /// Build a standalone row from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Option<String>>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .unzip();
        Self::new(Arc::new(Header::new(names)), values)
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Look up a field by raw name. The outer `None` means the field does not
    /// exist; the inner one means it exists but is empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        let i = self.header.position(name)?;
        self.values.get(i).map(Option::as_deref)
    }
}

/// A raw row restricted to the keep-list, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    values: Vec<Option<String>>,
}

impl ProjectedRow {
    #[must_use]
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Value of a canonical column.
    #[must_use]
    pub fn get<'a>(&'a self, schema: &SchemaDeclaration, canonical: &str) -> Option<&'a str> {
        let i = schema.canonical_names().position(|c| c == canonical)?;
        self.values.get(i)?.as_deref()
    }
}

/// A projected row whose values are typed and whose date is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    /// Values in declaration order.
    pub values: Vec<Value>,
    /// The row's calendar date; decides its partition.
    pub date: NaiveDate,
    /// Integer fields whose text could not be read and were stored as null.
    pub coerced_values: usize,
}

impl ResolvedRow {
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Restrict `row` to the schema's keep-list and rename it.
///
/// # Errors
/// [`Malformed::MissingField`] naming the first keep-list field absent from
/// the row.
pub fn project(row: &RawRow, schema: &SchemaDeclaration) -> Result<ProjectedRow, Malformed> {
    let values = schema
        .columns()
        .iter()
        .map(|col| {
            row.get(&col.raw)
                .map(|v| v.map(str::to_owned))
                .ok_or_else(|| Malformed::MissingField(col.raw.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProjectedRow { values })
}

/// Type every value of a projected row.
///
/// The date column must resolve; an unreadable time or integer becomes
/// [`Value::Null`] and the row is kept.
///
/// # Errors
/// [`Malformed::UnparseableDate`] when the date is empty or matches no
/// accepted layout.
pub fn resolve(
    row: ProjectedRow,
    schema: &SchemaDeclaration,
    time_format: &str,
) -> Result<ResolvedRow, Malformed> {
    let mut date = None;
    let mut coerced_values = 0;
    let mut values = Vec::with_capacity(row.values.len());

    for (col, raw) in schema.columns().iter().zip(row.values) {
        let value = match (col.ty, raw) {
            (ColumnType::Date, raw) => {
                let Some(d) = raw.as_deref().and_then(resolve_date) else {
                    return Err(Malformed::UnparseableDate(raw));
                };
                date = Some(d);
                Value::Date(d)
            }
            (_, None) => Value::Null,
            (ColumnType::Time, Some(s)) => {
                resolve_time(&s, time_format).map_or(Value::Null, Value::Time)
            }
            (ColumnType::Integer, Some(s)) => match parse_integer(&s) {
                Some(v) => Value::Integer(v),
                None => {
                    coerced_values += 1;
                    Value::Null
                }
            },
            (ColumnType::Text, Some(s)) => Value::Text(s),
        };
        values.push(value);
    }

    let date = date.ok_or(Malformed::UnparseableDate(None))?;
    Ok(ResolvedRow {
        values,
        date,
        coerced_values,
    })
}

/// Project then resolve in one step.
///
/// # Errors
/// See [`project`] and [`resolve`].
pub fn project_and_resolve(
    row: &RawRow,
    schema: &SchemaDeclaration,
    time_format: &str,
) -> Result<ResolvedRow, Malformed> {
    resolve(project(row, schema)?, schema, time_format)
}

/// Integral text, allowing a zero fraction (`"3.0"`) as float-typed exports
/// write it.
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let (int, frac) = s.split_once('.')?;
    if !frac.is_empty() && frac.bytes().all(|b| b == b'0') {
        int.parse::<i64>().ok()
    } else {
        None
    }
}
