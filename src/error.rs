//! Error taxonomy shared by every reader, writer and worker task.
//!
//! Configuration problems ([`Error::Config`], [`Error::Format`],
//! [`Error::UnsupportedOperation`]) are raised before any stream is opened.
//! Everything else surfaces while bytes are moving.

use crate::io::cloud::StoreError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid option (unknown format name, bad locator, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested operation cannot be expressed for this stream.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Stream open/read/write failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Remote object storage failure.
    #[error("backend error: {0}")]
    Backend(#[from] StoreError),

    /// Malformed content.
    #[error("decode error: {0}")]
    Decode(String),

    /// Unsupported (format, compression) pairing.
    #[error("format error: {0}")]
    Format(String),

    /// Partitioning or projection references columns that cannot be satisfied.
    #[error("schema error: {0}")]
    Schema(String),

    /// The in-memory representation cannot be written in the target format.
    #[error("type error: {0}")]
    Type(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// A worker task was not observed within its wait timeout. The task itself
    /// may still be running.
    #[error("task {task} did not complete within {after:?}")]
    Timeout { task: String, after: Duration },

    /// A worker task panicked or exited without reporting a result.
    #[error("task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    /// Every locator still failing after the last fetch attempt.
    #[error("failed to fetch {} input(s): {}", failed.len(), failed.join(", "))]
    Fetch { failed: Vec<String> },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
