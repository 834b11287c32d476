//! Test fixtures: synthetic collision exports.
//!
//! [`CsvFixture`] builds a source file with the exact raw header of a
//! [`DatasetType`], so tests can describe only what matters (dates, times,
//! broken lines) and get every other column filled with plausible values.
//!
//! ```
//! use yearload::dataset::DatasetType;
//! use yearload::testing::CsvFixture;
//!
//! # fn main() -> anyhow::Result<()> {
//! let csv = CsvFixture::new(DatasetType::Crashes)
//!     .row("03/01/2022")
//!     .row_at("2023-07-04", "17:45")
//!     .raw_line("1,notadate")
//!     .to_csv_string()?;
//! assert_eq!(csv.lines().count(), 4);
//! # Ok(())
//! # }
//! ```

use crate::dataset::DatasetType;
use crate::schema::ColumnType;
use anyhow::{Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;

enum Line {
    Row { date: String, time: String },
    Raw(String),
}

/// Builder for an in-memory CSV export of one dataset type.
pub struct CsvFixture {
    dataset: DatasetType,
    lines: Vec<Line>,
    reversed: bool,
    extra: Vec<(String, String)>,
}

impl CsvFixture {
    #[must_use]
    pub fn new(dataset: DatasetType) -> Self {
        Self {
            dataset,
            lines: Vec::new(),
            reversed: false,
            extra: Vec::new(),
        }
    }

    /// A well-formed row dated `date` (any accepted grammar) at `12:30`.
    #[must_use]
    pub fn row(self, date: &str) -> Self {
        self.row_at(date, "12:30")
    }

    /// A well-formed row with an explicit date and time text.
    #[must_use]
    pub fn row_at(mut self, date: &str, time: &str) -> Self {
        self.lines.push(Line::Row {
            date: date.to_string(),
            time: time.to_string(),
        });
        self
    }

    /// `n` rows spread over `year`, in `MM/DD/YYYY` form.
    #[must_use]
    pub fn rows_in_year(mut self, year: i32, n: usize) -> Self {
        for i in 0..n {
            let month = (i / 28) % 12 + 1;
            let day = i % 28 + 1;
            self = self.row(&format!("{month:02}/{day:02}/{year}"));
        }
        self
    }

    /// A line written verbatim (no quoting), for broken input.
    #[must_use]
    pub fn raw_line(mut self, line: &str) -> Self {
        self.lines.push(Line::Raw(line.to_string()));
        self
    }

    /// Emit the columns in reverse declaration order.
    #[must_use]
    pub fn reversed_columns(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Append a column the schema does not declare.
    #[must_use]
    pub fn extra_column(mut self, name: &str, value: &str) -> Self {
        self.extra.push((name.to_string(), value.to_string()));
        self
    }

    /// Number of data lines (well-formed and raw).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Header fields in output order.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dataset
            .schema()
            .keep_list()
            .map(str::to_string)
            .collect();
        if self.reversed {
            names.reverse();
        }
        names.extend(self.extra.iter().map(|(name, _)| name.clone()));
        names
    }

    fn record(&self, id: usize, date: &str, time: &str) -> Vec<String> {
        let mut fields: Vec<String> = self
            .dataset
            .schema()
            .columns()
            .iter()
            .map(|col| match col.ty {
                ColumnType::Date => date.to_string(),
                ColumnType::Time => time.to_string(),
                ColumnType::Integer if col.canonical.ends_with("id") => id.to_string(),
                ColumnType::Integer => "1".to_string(),
                ColumnType::Text => format!("{} {id}", col.canonical),
            })
            .collect();
        if self.reversed {
            fields.reverse();
        }
        fields.extend(self.extra.iter().map(|(_, value)| value.clone()));
        fields
    }

    /// Render the whole file.
    ///
    /// # Errors
    /// Returns an error if the CSV writer fails.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut out = encode(&self.header())?;
        for (i, line) in self.lines.iter().enumerate() {
            match line {
                Line::Row { date, time } => out.push_str(&encode(&self.record(i + 1, date, time))?),
                Line::Raw(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }

    /// Write the rendered file to `path`.
    ///
    /// # Errors
    /// Returns an error if rendering or the write fails.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_csv_string()?)
            .with_context(|| format!("write fixture {}", path.display()))
    }

    /// Write the rendered file to a fresh temporary `.csv` file, removed
    /// when the handle drops.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let file = tempfile::Builder::new()
            .prefix("yearload-fixture-")
            .suffix(".csv")
            .tempfile()
            .context("create temporary fixture")?;
        self.write_to(file.path())?;
        Ok(file)
    }

    /// Write the rendered file gzip-compressed to `path`.
    ///
    /// # Errors
    /// Returns an error if rendering, compression or the write fails.
    #[cfg(feature = "compression-gzip")]
    pub fn write_gzip_to(&self, path: impl AsRef<Path>) -> Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("create fixture {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(self.to_csv_string()?.as_bytes())?;
        encoder.finish()?;
        Ok(())
    }
}

fn encode(fields: &[String]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
