//! Declared target schemas: which raw columns to keep, what to call them,
//! and how to store them.
//!
//! A [`SchemaDeclaration`] is an ordered list of [`ColumnSpec`]s. Each spec
//! carries the raw source name, the canonical storage name and the storage
//! type together, so the keep-list, rename table and type table can never
//! disagree in length or membership. The remaining invariants (unique names,
//! exactly one date column, at most one time column) are checked by
//! [`Validate`].

use crate::validation::{Validate, ValidationError, ValidationResult};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Storage type tag of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Date,
    Time,
    Text,
}

impl ColumnType {
    /// SQL type name used when creating partition tables.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// A typed storage value of a resolved row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Date(NaiveDate),
    Time(NaiveTime),
    Text(String),
}

impl Value {
    /// Whether this value may be stored in a column of type `ty`.
    #[must_use]
    pub fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Self::Null, _)
                | (Self::Integer(_), ColumnType::Integer)
                | (Self::Date(_), ColumnType::Date)
                | (Self::Time(_), ColumnType::Time)
                | (Self::Text(_), ColumnType::Text)
        )
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One retained column: raw source name, canonical name, storage type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub raw: String,
    pub canonical: String,
    pub ty: ColumnType,
}

impl ColumnSpec {
    pub fn new(raw: impl Into<String>, canonical: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            raw: raw.into(),
            canonical: canonical.into(),
            ty,
        }
    }
}

/// Ordered column declaration for one dataset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    columns: Vec<ColumnSpec>,
}

impl SchemaDeclaration {
    /// Build and validate a declaration from column specs.
    ///
    /// # Errors
    /// Returns every violated invariant.
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self, Vec<ValidationError>> {
        let schema = Self { columns };
        schema.validate()?;
        Ok(schema)
    }

    /// Built-in declarations are checked by tests rather than at runtime.
    pub(crate) fn declared(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Build a declaration from the three separate tables a keep-list
    /// configuration is usually written as. Output order follows `keep`.
    ///
    /// # Errors
    /// Fails when a kept name lacks a rename or type entry, when a table
    /// mentions a name that is not kept, or when [`Validate`] fails.
    pub fn from_tables(
        keep: &[&str],
        rename: &[(&str, &str)],
        types: &[(&str, ColumnType)],
    ) -> Result<Self, Vec<ValidationError>> {
        let renames: HashMap<&str, &str> = rename.iter().copied().collect();
        let type_of: HashMap<&str, ColumnType> = types.iter().copied().collect();
        let mut errors = Vec::new();
        let mut columns = Vec::with_capacity(keep.len());

        for raw in keep {
            let Some(canonical) = renames.get(raw) else {
                errors.push(ValidationError::field(*raw, "no rename entry").with_code("rename"));
                continue;
            };
            let Some(ty) = type_of.get(canonical) else {
                errors.push(ValidationError::field(*canonical, "no type entry").with_code("type"));
                continue;
            };
            columns.push(ColumnSpec::new(*raw, *canonical, *ty));
        }

        let kept: HashSet<&str> = keep.iter().copied().collect();
        for (raw, _) in rename {
            if !kept.contains(raw) {
                errors.push(ValidationError::field(*raw, "renamed but not kept").with_code("rename"));
            }
        }
        let canon: HashSet<&str> = rename.iter().map(|(_, c)| *c).collect();
        for (name, _) in types {
            if !canon.contains(name) {
                errors.push(ValidationError::field(*name, "typed but never produced").with_code("type"));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Self::new(columns)
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Raw field names to retain, in output order.
    pub fn keep_list(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.raw.as_str())
    }

    /// Canonical storage names, in output order.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.canonical.as_str())
    }

    /// Position of the (single) date column.
    #[must_use]
    pub fn date_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.ty == ColumnType::Date)
    }

    /// Position of the time column, if the schema declares one.
    #[must_use]
    pub fn time_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.ty == ColumnType::Time)
    }
}

impl Validate for SchemaDeclaration {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        if self.columns.is_empty() {
            errors.push(ValidationError::new("schema declares no columns"));
        }

        let mut raws = HashSet::new();
        let mut canon = HashSet::new();
        for col in &self.columns {
            if !raws.insert(col.raw.as_str()) {
                errors.push(ValidationError::field(&col.raw, "raw name kept twice").with_code("duplicate"));
            }
            if !canon.insert(col.canonical.as_str()) {
                errors.push(
                    ValidationError::field(&col.canonical, "canonical name not unique").with_code("duplicate"),
                );
            }
            if col.canonical.is_empty() {
                errors.push(ValidationError::field(&col.raw, "empty canonical name"));
            }
        }

        match self.columns.iter().filter(|c| c.ty == ColumnType::Date).count() {
            1 => {}
            n => errors.push(
                ValidationError::new(format!("expected exactly one date column, found {n}"))
                    .with_code("date"),
            ),
        }
        if self.columns.iter().filter(|c| c.ty == ColumnType::Time).count() > 1 {
            errors.push(ValidationError::new("more than one time column").with_code("time"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
