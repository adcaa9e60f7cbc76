//! Format and compression names.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record encodings understood by the deserializer and serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Tsv,
    Json,
    Jsonl,
    Parquet,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Csv,
        Format::Tsv,
        Format::Json,
        Format::Jsonl,
        Format::Parquet,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Tsv => "tsv",
            Format::Json => "json",
            Format::Jsonl => "jsonl",
            Format::Parquet => "parquet",
        }
    }

    /// File extension used for partition files and inferred member names.
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.name()
    }

    /// Field delimiter for the delimited-text formats.
    pub(crate) fn delimiter(self) -> Option<u8> {
        match self {
            Format::Csv => Some(b','),
            Format::Tsv => Some(b'\t'),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "tsv" => Ok(Format::Tsv),
            "json" => Ok(Format::Json),
            "jsonl" | "ndjson" => Ok(Format::Jsonl),
            "parquet" => Ok(Format::Parquet),
            other => Err(Error::config(format!(
                "invalid format {other:?}: supported formats are {}",
                formats().join(", ")
            ))),
        }
    }
}

/// Compression applied around (or, for parquet, inside) the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    /// Parquet page codec only.
    Snappy,
    /// Read-only archive member extraction.
    Zip,
}

impl Compression {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Zip => "zip",
        }
    }

    /// Parse an optional user-supplied name; empty means no compression.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for unknown algorithm names.
    pub fn parse_opt(s: Option<&str>) -> Result<Self> {
        match s {
            None => Ok(Compression::None),
            Some(s) if s.trim().is_empty() => Ok(Compression::None),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "snappy" => Ok(Compression::Snappy),
            "zip" => Ok(Compression::Zip),
            other => Err(Error::config(format!(
                "invalid compression {other:?}: supported algorithms are {}",
                algorithms().join(", ")
            ))),
        }
    }
}

/// Names of every supported format.
#[must_use]
pub fn formats() -> Vec<&'static str> {
    Format::ALL.iter().map(|f| f.name()).collect()
}

/// Names of every supported compression algorithm.
#[must_use]
pub fn algorithms() -> Vec<&'static str> {
    vec!["gzip", "snappy", "zip"]
}

/// Reject (format, compression) pairs no reader or writer implements.
///
/// # Errors
/// Returns [`Error::Format`] for unsupported pairs and
/// [`Error::UnsupportedOperation`] when writing through an archive.
pub fn check_pair(format: Format, compression: Compression, writing: bool) -> Result<()> {
    match (format, compression) {
        (_, Compression::None | Compression::Gzip) => Ok(()),
        (Format::Parquet, Compression::Snappy) => Ok(()),
        (Format::Parquet, Compression::Zip) => Err(Error::Format(
            "parquet cannot be read from inside a zip archive".into(),
        )),
        (_, Compression::Zip) if writing => Err(Error::UnsupportedOperation(
            "cannot write through a zip archive".into(),
        )),
        (_, Compression::Zip) => Ok(()),
        (f, Compression::Snappy) => Err(Error::Format(format!(
            "snappy compression is only supported for parquet, not {f}"
        ))),
    }
}
