//! Source-side I/O: decompression and chunked CSV reading.

pub mod compression;
pub mod csv;

pub use self::csv::{ChunkedReader, DEFAULT_BATCH_SIZE, RawBatch, RowRecord, SourceFile};
