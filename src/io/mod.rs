//! Byte-stream adapter and per-format codecs.
//!
//! - [`locator`] parses local, standard-stream and remote locators
//! - [`stream`] opens them for reading and writing ([`open_read`], [`open_write`])
//! - [`compression`] and [`archive`] provide the gzip envelope and zip extraction
//! - [`cloud`] holds the object store and query service capabilities
//! - [`csv`], [`json`], [`jsonl`] and [`parquet`] encode and decode records

pub mod archive;
pub mod cloud;
pub mod compression;
pub mod csv;
pub mod json;
pub mod jsonl;
pub mod locator;
pub mod parquet;
pub mod stream;

pub use locator::{Locator, STDIO_MARKER};
pub use stream::{ByteSink, ByteSource, IoContext, open_read, open_write, read_bytes};
