//! Tests for transparent source decompression.

use std::io::{Cursor, Read};
use std::sync::Arc;
use yearload::io::compression::{CompressionCodec, auto_detect_reader, register_codec};

fn read_all(mut reader: Box<dyn Read>) -> String {
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn plain_passthrough() -> anyhow::Result<()> {
    let reader = auto_detect_reader(Cursor::new(b"A,B\n1,2\n".to_vec()), "MVC_C.csv")?;
    assert_eq!(read_all(reader), "A,B\n1,2\n");
    Ok(())
}

#[test]
fn empty_stream_passthrough() -> anyhow::Result<()> {
    let reader = auto_detect_reader(Cursor::new(Vec::new()), "empty")?;
    assert_eq!(read_all(reader), "");
    Ok(())
}

/// Reverses the bytes of `.rev` streams.
struct ReverseCodec;

impl CompressionCodec for ReverseCodec {
    fn name(&self) -> &str {
        "reverse"
    }

    fn extensions(&self) -> &[&str] {
        &[".rev"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    fn wrap_reader(&self, mut reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        buf.reverse();
        Ok(Box::new(Cursor::new(buf)))
    }
}

#[test]
fn registered_codec_by_extension() -> anyhow::Result<()> {
    register_codec(Arc::new(ReverseCodec));
    let reader = auto_detect_reader(Cursor::new(b"cba".to_vec()), "data.REV")?;
    assert_eq!(read_all(reader), "abc");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_roundtrip_by_magic() -> anyhow::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(b"A,B\n1,2\n")?;
    let bytes = enc.finish()?;

    let reader = auto_detect_reader(Cursor::new(bytes), "download.bin")?;
    assert_eq!(read_all(reader), "A,B\n1,2\n");
    Ok(())
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd_by_extension() -> anyhow::Result<()> {
    let bytes = zstd::encode_all(&b"A,B\n3,4\n"[..], 3)?;
    let reader = auto_detect_reader(Cursor::new(bytes), "MVC_V.csv.zst")?;
    assert_eq!(read_all(reader), "A,B\n3,4\n");
    Ok(())
}
