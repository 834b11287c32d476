//! Chunked CSV source reader.
//!
//! [`ChunkedReader`] turns any byte stream with a header row into a lazy,
//! finite sequence of [`RawBatch`]es of at most `batch_size` rows. Each batch
//! owns its rows and the reader keeps no reference to a batch once yielded,
//! so peak memory is bounded by the batch size rather than the file size.
//!
//! # Design notes
//! - Records are read as bytes and decoded lossily: one bad byte sequence
//!   must not take the whole file down.
//! - The CSV layer runs in flexible mode; a line whose field count differs
//!   from the header becomes a per-row [`Malformed::FieldCount`] instead of a
//!   reader error.
//! - A reader is single-pass. [`SourceFile::batches`] re-opens the file from
//!   the beginning each time it is called.

use crate::io::compression::auto_detect_reader;
use crate::projection::{Header, RawRow};
use crate::validation::Malformed;
use anyhow::{Context, Result};
use csv::ByteRecord;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rows per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Initial allocation cap for a batch buffer, so huge batch sizes do not
/// reserve memory a short file never uses.
const PREALLOC_ROWS: usize = 8_192;

/// A source record, or the reason it could not be split into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    /// 1-based line number in the source (the header is line 1).
    pub line: u64,
    pub row: Result<RawRow, Malformed>,
}

/// An in-order slice of source rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBatch {
    /// 0-based position of this batch in the source.
    pub index: usize,
    pub rows: Vec<RowRecord>,
}

impl RawBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lazy batch iterator over a delimited byte stream.
pub struct ChunkedReader<R: Read> {
    reader: csv::Reader<R>,
    header: Arc<Header>,
    batch_size: usize,
    next_index: usize,
    done: bool,
}

impl<R: Read> ChunkedReader<R> {
    /// Read the header row and prepare to yield batches of `batch_size`
    /// rows (a size of 0 is treated as 1).
    ///
    /// # Errors
    /// Returns an error if the header cannot be read.
    pub fn new(reader: R, batch_size: usize) -> Result<Self> {
        Self::with_delimiter(reader, batch_size, b',')
    }

    /// Like [`new`](Self::new) with a custom field delimiter.
    ///
    /// # Errors
    /// Returns an error if the header cannot be read.
    pub fn with_delimiter(reader: R, batch_size: usize, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);
        let names: Vec<String> = reader
            .byte_headers()
            .context("read CSV header")?
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let name = String::from_utf8_lossy(raw);
                if i == 0 {
                    name.trim_start_matches('\u{feff}').to_string()
                } else {
                    name.into_owned()
                }
            })
            .collect();
        let done = names.is_empty();
        Ok(Self {
            reader,
            header: Arc::new(Header::new(names)),
            batch_size: batch_size.max(1),
            next_index: 0,
            done,
        })
    }

    /// The source header shared by every row this reader yields.
    #[must_use]
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn to_record(&self, record: &ByteRecord) -> RowRecord {
        let line = record.position().map_or(0, csv::Position::line);
        let expected = self.header.len();
        if record.len() != expected {
            return RowRecord {
                line,
                row: Err(Malformed::FieldCount {
                    expected,
                    found: record.len(),
                }),
            };
        }
        let values = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(field).into_owned())
                }
            })
            .collect();
        RowRecord {
            line,
            row: Ok(RawRow::new(Arc::clone(&self.header), values)),
        }
    }
}

impl<R: Read> Iterator for ChunkedReader<R> {
    type Item = Result<RawBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut rows = Vec::with_capacity(self.batch_size.min(PREALLOC_ROWS));
        let mut record = ByteRecord::new();
        while rows.len() < self.batch_size {
            match self.reader.read_byte_record(&mut record) {
                Ok(true) => rows.push(self.to_record(&record)),
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    let index = self.next_index;
                    return Some(
                        Err(e).with_context(|| format!("read CSV record in batch {index}")),
                    );
                }
            }
        }
        if rows.is_empty() {
            return None;
        }
        let batch = RawBatch {
            index: self.next_index,
            rows,
        };
        self.next_index += 1;
        Some(Ok(batch))
    }
}

/// A source file on disk that can be read from the start any number of
/// times. Compressed files are decoded transparently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh decompressed byte stream positioned at the start.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or decoded.
    pub fn open(&self) -> Result<Box<dyn Read>> {
        let f = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        auto_detect_reader(f, &self.path)
            .with_context(|| format!("setup decompression for {}", self.path.display()))
    }

    /// Start a new single pass over the file in batches of `batch_size`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header read.
    pub fn batches(&self, batch_size: usize) -> Result<ChunkedReader<Box<dyn Read>>> {
        ChunkedReader::new(self.open()?, batch_size)
            .with_context(|| format!("read header of {}", self.path.display()))
    }
}
