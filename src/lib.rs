//! # recordshift
//!
//! A **transcoding and partitioned-write engine** for record data. recordshift
//! moves rows between storage formats, compression envelopes and storage
//! backends, optionally splitting the output into a hive-style parquet dataset
//! written in parallel.
//!
//! ## Key Features
//!
//! - **Formats** - CSV, TSV, JSON documents, JSON Lines and Parquet
//! - **Envelopes** - gzip streams, zip member extraction, parquet page codecs
//! - **Locations** - local files, standard streams (`-`) and remote objects
//!   (`scheme://bucket/key`) behind the [`ObjectStore`](io::cloud::ObjectStore) trait
//! - **Cleaning** - drop null and blank fields at any depth
//! - **Partitioned datasets** - one parquet file per partition value tuple,
//!   written concurrently on a bounded worker pool
//! - **Fetch aggregation** - fetch many inputs in parallel with bounded retry
//!
//! ## Quick Start
//!
//! ```no_run
//! use recordshift::*;
//!
//! # fn main() -> Result<()> {
//! let src = Locator::parse("events.jsonl.gz")?;
//! let data = deserialize(
//!     &src,
//!     &DeserializeOptions::new(Format::Jsonl)
//!         .with_compression(Compression::Gzip)
//!         .with_drop_nulls(true),
//! )?;
//!
//! let dest = Locator::parse("out/events")?;
//! serialize(
//!     &dest,
//!     data,
//!     &SerializeOptions::new(Format::Parquet)
//!         .with_compression(Compression::Snappy)
//!         .with_partition_columns(["year", "month"])
//!         .with_makedirs(true),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Data
//!
//! Every reader produces a [`Data`] and every writer consumes one: a record
//! sequence (`Vec<serde_json::Value>`), an Arrow [`RecordBatch`](arrow::record_batch::RecordBatch),
//! or a single JSON document. Records and tables convert into each other.
//!
//! ### Locators and streams
//!
//! A [`Locator`] names where bytes live. [`io::open_read`] and
//! [`io::open_write`] turn a locator plus a [`Compression`] into a byte
//! stream; remote locators need an object store in the [`IoContext`].
//!
//! ### Partitioned writes
//!
//! [`DatasetWriter`] groups rows by partition columns and writes
//! `root/col=value/.../value-....parquet` files. Every partition task is
//! awaited before the first failure is raised.
//!
//! ### Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`] with the crate [`Error`].
//! Option and pairing problems are reported before any stream is opened.

pub mod aggregate;
pub mod clean;
pub mod data;
pub mod dataset;
pub mod deserialize;
pub mod encoder;
pub mod error;
pub mod format;
pub mod io;
pub mod pool;
pub mod serialize;
pub mod testing;
pub mod transform;

pub use aggregate::{FetchConfig, Fetched, OutputShape, deserialize_all, fetch_all, run_query};
pub use clean::{CleanPolicy, clean, clean_records};
pub use data::{Data, Record, records_to_table};
pub use dataset::{
    DatasetWriter, DatasetWriterConfig, WriteDatasetOptions, format_partition_directory,
    format_partition_filename, format_partition_parent, format_partition_value,
};
pub use deserialize::{DeserializeOptions, Filter, FilterOp, deserialize};
pub use encoder::{DecimalFormat, EncodeOptions, JsonFormats, NanPolicy, table_to_records};
pub use error::{Error, Result};
pub use format::{Compression, Format, algorithms, formats};
pub use io::{IoContext, Locator};
pub use pool::{TaskHandle, WorkerPool, join_all};
pub use serialize::{SerializeOptions, serialize};
pub use transform::{TransformRequest, transform, transform_with};
