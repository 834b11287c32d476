//! Transparent decompression of source files.
//!
//! Large source exports are often shipped compressed. [`auto_detect_reader`]
//! wraps a reader with the matching decoder so the CSV layer never needs to
//! know.
//!
//! Detection order:
//! 1. file extension of the path hint (no bytes read),
//! 2. magic bytes at the start of the stream,
//! 3. otherwise the stream is passed through buffered.
//!
//! Built-in codecs, each behind a feature flag:
//! - **gzip** (`.gz`, `.gzip`) - `flate2` (feature `compression-gzip`)
//! - **zstd** (`.zst`, `.zstd`) - `zstd` (feature `compression-zstd`)
//!
//! Further codecs can be added at runtime with [`register_codec`].

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

static CODEC_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionCodec>>>> = RwLock::new(None);

fn builtin_codecs() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
    ]
}

fn codecs() -> Vec<Arc<dyn CompressionCodec>> {
    let mut lock = CODEC_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(builtin_codecs).clone()
}

/// Register an additional decompression codec for all later reads.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    let mut lock = CODEC_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(builtin_codecs).push(codec);
}

/// A decompression codec that can be detected from a path or a stream.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g. "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions including the leading dot.
    fn extensions(&self) -> &[&str];

    /// Leading byte signature, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` so reads return decompressed bytes.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

fn detect_from_extension(path: &Path) -> Option<Arc<dyn CompressionCodec>> {
    let name = path.to_string_lossy().to_lowercase();
    codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| name.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn CompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    codecs().into_iter().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.starts_with(magic))
    })
}

/// Wrap `reader` with the decoder matching `path_hint` or its leading bytes.
///
/// # Errors
/// Returns an error if the selected codec cannot initialise its decoder.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(path_hint.as_ref()) {
        return codec
            .wrap_reader(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buffered = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buffered) {
        return codec
            .wrap_reader(Box::new(buffered))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buffered))
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        // Multi-member archives are common for concatenated exports.
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}
