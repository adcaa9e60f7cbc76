//! Serializer: [`Data`] into any supported (format, compression, location).
//!
//! Delimited text, JSON Lines and unpartitioned parquet write nothing at all
//! for zero rows; no file is created. JSON always writes a document (`[]`
//! for an empty sequence). Partitioned parquet output is delegated to
//! [`DatasetWriter`].

use crate::clean::{CleanPolicy, clean_in_place};
use crate::data::Data;
use crate::dataset::{DEFAULT_TASK_TIMEOUT, DatasetWriter, DatasetWriterConfig, WriteDatasetOptions, millis};
use crate::encoder::{EncodeOptions, JsonFormats, NanPolicy};
use crate::error::{Error, Result};
use crate::format::{Compression, Format, check_pair};
use crate::io::csv::{check_fields, write_delimited};
use crate::io::json::write_document;
use crate::io::jsonl::write_lines;
use crate::io::parquet::{ParquetWriteOptions, write_table};
use crate::io::{IoContext, Locator, open_write};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Field name of the ordinal added by the `index` option.
pub const INDEX_FIELD: &str = "Index";

/// Options of one [`serialize`] call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    pub format: Format,
    /// Stream envelope, or the page codec for parquet.
    pub compression: Compression,
    /// Delimited-text header, in order. Defaults to the sorted union of keys.
    /// Rows with fields outside an explicit header are rejected.
    pub columns: Option<Vec<String>>,
    /// Maximum rows written (per partition when partitioning).
    pub limit: Option<usize>,
    /// Spaced JSON separators.
    pub pretty: bool,
    pub formats: JsonFormats,
    pub nan: NanPolicy,
    /// Prefix every row of a table with its ordinal as `Index`.
    pub index: bool,
    pub row_group_size: Option<usize>,
    pub row_group_columns: Vec<String>,
    /// Parquet only: write one file per distinct value tuple of these columns.
    pub partition_columns: Vec<String>,
    /// Create missing parent directories of local destinations.
    pub makedirs: bool,
    /// Canned ACL of uploaded objects.
    pub acl: Option<String>,
    /// Worker threads of partitioned writes.
    pub threads: Option<usize>,
    /// Wait per partition task, in milliseconds.
    pub timeout_ms: u64,
    /// Per-row cleaning of JSON output.
    #[serde(flatten)]
    pub clean: CleanPolicy,
    #[serde(skip)]
    pub io: IoContext,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new(Format::Jsonl)
    }
}

impl SerializeOptions {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            compression: Compression::None,
            columns: None,
            limit: None,
            pretty: false,
            formats: JsonFormats::default(),
            nan: NanPolicy::default(),
            index: false,
            row_group_size: None,
            row_group_columns: Vec::new(),
            partition_columns: Vec::new(),
            makedirs: false,
            acl: None,
            threads: None,
            timeout_ms: millis(DEFAULT_TASK_TIMEOUT),
            clean: CleanPolicy::default(),
            io: IoContext::default(),
        }
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: JsonFormats) -> Self {
        self.formats = formats;
        self
    }

    #[must_use]
    pub fn with_nan(mut self, nan: NanPolicy) -> Self {
        self.nan = nan;
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = Some(rows);
        self
    }

    #[must_use]
    pub fn with_row_group_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.row_group_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_partition_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.partition_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_makedirs(mut self, makedirs: bool) -> Self {
        self.makedirs = makedirs;
        self
    }

    #[must_use]
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis(timeout).max(1);
        self
    }

    #[must_use]
    pub fn with_clean(mut self, clean: CleanPolicy) -> Self {
        self.clean = clean;
        self
    }

    #[must_use]
    pub fn with_io(mut self, io: IoContext) -> Self {
        self.io = io;
        self
    }

    fn encode(&self) -> EncodeOptions {
        EncodeOptions {
            formats: self.formats.clone(),
            nan: self.nan,
        }
    }

    fn io_context(&self) -> IoContext {
        let io = self.io.clone().with_makedirs(self.makedirs);
        match &self.acl {
            Some(acl) => io.with_acl(acl.clone()),
            None => io,
        }
    }

    fn parquet(&self) -> ParquetWriteOptions {
        ParquetWriteOptions {
            compression: self.compression,
            row_group_size: self.row_group_size,
            row_group_columns: self.row_group_columns.clone(),
        }
    }
}

/// Encode `data` and write it to `locator`.
///
/// # Errors
/// Returns [`Error::Format`] or [`Error::UnsupportedOperation`] for unsupported
/// (format, compression) pairs and [`Error::Config`] for partitioned
/// non-parquet output, all before any I/O. [`Error::Type`] when the payload
/// cannot be represented in the target format, [`Error::Io`] and
/// [`Error::Backend`] when the destination cannot be written.
pub fn serialize(locator: &Locator, data: Data, opts: &SerializeOptions) -> Result<()> {
    check_pair(opts.format, opts.compression, true)?;
    if !opts.partition_columns.is_empty() {
        if opts.format != Format::Parquet {
            return Err(Error::config(format!(
                "partitioned output is only supported for parquet, not {}",
                opts.format
            )));
        }
        return write_partitioned(locator, &data, opts);
    }

    let io = opts.io_context();
    let from_table = matches!(data, Data::Table(_));
    let data = data.truncate(opts.limit);
    match opts.format {
        Format::Csv | Format::Tsv => {
            let rows = rows_of(data, from_table, opts)?;
            if rows.is_empty() {
                log::debug!("no rows to write to {locator}");
                return Ok(());
            }
            if let Some(columns) = &opts.columns {
                check_fields(&rows, columns)?;
            }
            let delimiter = opts.format.delimiter().unwrap_or(b',');
            let mut sink = open_write(locator, opts.compression, &io)?;
            let n = write_delimited(&mut sink, &rows, opts.columns.as_deref(), delimiter)?;
            sink.finish()?;
            log::debug!("wrote {n} row(s) to {locator}");
        }
        Format::Json => {
            let mut value = data.into_value(&opts.encode())?;
            clean_in_place(&mut value, opts.clean);
            let mut sink = open_write(locator, opts.compression, &io)?;
            write_document(&mut sink, &value, opts.pretty)?;
            sink.finish()?;
        }
        Format::Jsonl => {
            let rows = rows_of(data, from_table, opts)?;
            if rows.is_empty() {
                log::debug!("no rows to write to {locator}");
                return Ok(());
            }
            let mut sink = open_write(locator, opts.compression, &io)?;
            let n = write_lines(&mut sink, &rows, opts.pretty, opts.clean)?;
            sink.finish()?;
            log::debug!("wrote {n} row(s) to {locator}");
        }
        Format::Parquet => {
            let batch = data.into_table()?;
            if batch.num_rows() == 0 {
                log::debug!("no rows to write to {locator}");
                return Ok(());
            }
            write_table(locator, &batch, &opts.parquet(), &io)?;
            log::debug!("wrote {} row(s) to {locator}", batch.num_rows());
        }
    }
    Ok(())
}

fn writer_config(opts: &SerializeOptions) -> DatasetWriterConfig {
    DatasetWriterConfig {
        threads: opts.threads,
        timeout_ms: opts.timeout_ms,
        makedirs: opts.makedirs,
    }
}

fn write_partitioned(locator: &Locator, data: &Data, opts: &SerializeOptions) -> Result<()> {
    let config = writer_config(opts);
    let options = WriteDatasetOptions {
        limit: opts.limit,
        compression: opts.compression,
        row_group_size: opts.row_group_size,
        row_group_columns: opts.row_group_columns.clone(),
    };
    let files = DatasetWriter::new(locator.clone(), opts.partition_columns.clone(), config)
        .with_io(opts.io_context())
        .write_dataset(data, &options)?;
    log::info!("wrote {} partition file(s) under {locator}", files.len());
    Ok(())
}

fn rows_of(data: Data, from_table: bool, opts: &SerializeOptions) -> Result<Vec<Value>> {
    let rows = data.into_records_with(&opts.encode())?;
    if from_table && opts.index {
        return Ok(with_index(rows));
    }
    Ok(rows)
}

fn with_index(rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(fields) => {
                let mut indexed = Map::with_capacity(fields.len() + 1);
                indexed.insert(INDEX_FIELD.to_string(), Value::from(i));
                indexed.extend(fields);
                Value::Object(indexed)
            }
            other => other,
        })
        .collect()
}
