//! Compression envelopes layered around byte streams.
//!
//! Each envelope is a [`CompressionCodec`]. Readers are wrapped as plain
//! `Read` trait objects; writers are wrapped as [`Sink`]s so that framing can
//! be finalized (gzip trailer) before the underlying target commits.
//!
//! Gzip writes are streaming: rows can be written one at a time and the
//! matching reader reverses the framing exactly.

use crate::format::Compression;
use std::io::{self, Read, Write};

/// A writable target that must be explicitly finished.
///
/// `finish` flushes buffered bytes, writes any trailing framing and commits the
/// target (closing a file, uploading a remote object). Dropping a sink without
/// finishing it releases its resources but never commits a remote object.
pub trait Sink: Write + Send {
    /// # Errors
    /// Returns an error if flushing, framing or committing fails.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Pluggable compression envelope.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Wrap a reader with decompression.
    ///
    /// # Errors
    /// Returns an error if the envelope header cannot be prepared.
    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>>;

    /// Wrap a sink with compression.
    ///
    /// # Errors
    /// Returns an error if the envelope cannot be started.
    fn wrap_writer(&self, writer: Box<dyn Sink>) -> io::Result<Box<dyn Sink>>;
}

/// Codec implementing a stream envelope, or `None` when bytes pass through.
///
/// Only `none` and `gzip` are stream envelopes; archive extraction and parquet
/// page codecs are handled by their own modules.
#[must_use]
pub fn codec_for(compression: Compression) -> Option<Box<dyn CompressionCodec>> {
    match compression {
        Compression::Gzip => Some(Box::new(GzipCodec)),
        Compression::None | Compression::Snappy | Compression::Zip => None,
    }
}

struct GzipCodec;

impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Sink>) -> io::Result<Box<dyn Sink>> {
        use flate2::write::GzEncoder;
        Ok(Box::new(GzipSink {
            encoder: GzEncoder::new(writer, flate2::Compression::default()),
        }))
    }
}

struct GzipSink {
    encoder: flate2::write::GzEncoder<Box<dyn Sink>>,
}

impl Write for GzipSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl Sink for GzipSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = self.encoder.finish()?;
        inner.finish()
    }
}
