//! Partitioned dataset writer.
//!
//! A table is split by the values of its partition columns and every distinct
//! value tuple becomes one parquet file:
//!
//! ```text
//! root/year=2001/month=1/2001-1.parquet
//! root/year=2001/month=2/2001-2.parquet
//! ```
//!
//! Partition columns are removed from the files themselves. Files are written
//! concurrently on a bounded [`WorkerPool`]; every task is awaited before the
//! first failure is raised.
//!
//! Partition values are compared after canonical stringification
//! ([`format_partition_value`]), so `1` and `"1"` land in the same partition.

use crate::data::Data;
use crate::encoder::{EncodeOptions, value_at};
use crate::error::{Error, Result};
use crate::format::{Compression, Format, check_pair};
use crate::io::parquet::{ParquetWriteOptions, write_table};
use crate::io::{IoContext, Locator};
use crate::pool::{WorkerPool, join_all};
use arrow::array::UInt32Array;
use arrow::record_batch::RecordBatch;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Directory value used for null partition keys.
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Default wait per partition task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(600);

/// Canonical text of one partition value.
///
/// Booleans are `1`/`0`, null is [`NULL_PARTITION`], strings are used as-is,
/// numbers use their JSON text and nested values their compact JSON.
#[must_use]
pub fn format_partition_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_PARTITION.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// `col1=v1/col2=v2/...`
#[must_use]
pub fn format_partition_directory<S: AsRef<str>>(columns: &[S], values: &[String]) -> String {
    columns
        .iter()
        .zip(values)
        .map(|(c, v)| format!("{}={v}", c.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory of a partition under `root`.
///
/// # Errors
/// Returns [`Error::UnsupportedOperation`] if `root` is a standard stream.
pub fn format_partition_parent<S: AsRef<str>>(
    root: &Locator,
    columns: &[S],
    values: &[String],
) -> Result<Locator> {
    root.join(&format_partition_directory(columns, values))
}

/// `v1-v2-....parquet`
#[must_use]
pub fn format_partition_filename(values: &[String]) -> String {
    format!("{}.{}", values.join("-"), Format::Parquet.extension())
}

/// Rows sharing one canonical key tuple.
#[derive(Debug, Clone)]
pub struct RowGroup {
    pub values: Vec<String>,
    pub indices: UInt32Array,
}

/// Group row indices by the canonical values of `columns`, groups in order of
/// first appearance, rows in input order within each group.
///
/// # Errors
/// Returns [`Error::Schema`] for unknown columns.
pub fn group_rows<S: AsRef<str>>(batch: &RecordBatch, columns: &[S]) -> Result<Vec<RowGroup>> {
    let schema = batch.schema();
    let arrays = columns
        .iter()
        .map(|c| {
            let c = c.as_ref();
            schema
                .index_of(c)
                .map(|i| batch.column(i))
                .map_err(|_| Error::Schema(format!("unknown partition column {c:?}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let opts = EncodeOptions::lenient();
    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<u32>)> = Vec::new();
    for row in 0..batch.num_rows() {
        let key = arrays
            .iter()
            .map(|a| value_at(a.as_ref(), row, &opts).map(|v| format_partition_value(&v)))
            .collect::<Result<Vec<_>>>()?;
        let row = u32::try_from(row)
            .map_err(|_| Error::Type("table too large to partition".into()))?;
        match slots.get(&key) {
            Some(&slot) => groups[slot].1.push(row),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    Ok(groups
        .into_iter()
        .map(|(values, rows)| RowGroup {
            values,
            indices: UInt32Array::from(rows),
        })
        .collect())
}

/// Pool and filesystem settings of a [`DatasetWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatasetWriterConfig {
    /// Worker threads; `None` means [`crate::pool::default_threads`].
    pub threads: Option<usize>,
    /// Wait per partition task, in milliseconds.
    pub timeout_ms: u64,
    /// Create partition directories that do not exist yet.
    pub makedirs: bool,
}

impl Default for DatasetWriterConfig {
    fn default() -> Self {
        Self {
            threads: None,
            timeout_ms: millis(DEFAULT_TASK_TIMEOUT),
            makedirs: true,
        }
    }
}

impl DatasetWriterConfig {
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
    pub fn with_makedirs(mut self, makedirs: bool) -> Self {
        self.makedirs = makedirs;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Per-call options of [`DatasetWriter::write_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteDatasetOptions {
    /// Maximum rows per partition file.
    pub limit: Option<usize>,
    /// Parquet page codec.
    pub compression: Compression,
    pub row_group_size: Option<usize>,
    pub row_group_columns: Vec<String>,
}

impl WriteDatasetOptions {
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
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

    fn parquet(&self) -> ParquetWriteOptions {
        ParquetWriteOptions {
            compression: self.compression,
            row_group_size: self.row_group_size,
            row_group_columns: self.row_group_columns.clone(),
        }
    }
}

/// Writes one parquet file per partition value tuple under a root locator.
pub struct DatasetWriter {
    root: Locator,
    partition_columns: Vec<String>,
    config: DatasetWriterConfig,
    io: IoContext,
}

impl DatasetWriter {
    pub fn new<S: Into<String>>(
        root: Locator,
        partition_columns: impl IntoIterator<Item = S>,
        config: DatasetWriterConfig,
    ) -> Self {
        Self {
            root,
            partition_columns: partition_columns.into_iter().map(Into::into).collect(),
            config,
            io: IoContext::default(),
        }
    }

    /// Object store, ACL and other stream settings for the partition files.
    /// `makedirs` always follows the writer's config.
    #[must_use]
    pub fn with_io(mut self, io: IoContext) -> Self {
        self.io = io;
        self
    }

    #[must_use]
    pub fn partition_columns(&self) -> &[String] {
        &self.partition_columns
    }

    /// Split `data` by partition values and write every partition.
    ///
    /// Returns the written file locators in first-appearance order of their
    /// partitions. Empty input and `limit == 0` write nothing.
    ///
    /// # Errors
    /// Returns [`Error::Schema`] if a partition column is unknown or no column
    /// would be left in the files, [`Error::Format`] for unsupported page
    /// codecs, otherwise the first partition failure in submission order.
    pub fn write_dataset(&self, data: &Data, opts: &WriteDatasetOptions) -> Result<Vec<Locator>> {
        check_pair(Format::Parquet, opts.compression, true)?;
        if data.is_empty() || opts.limit == Some(0) {
            log::info!("nothing to write under {}", self.root);
            return Ok(Vec::new());
        }
        if self.partition_columns.is_empty() {
            return Err(Error::Schema("no partition columns given".into()));
        }
        let batch = data.clone().into_table()?;
        let schema = batch.schema();
        let mut partition_idx = Vec::with_capacity(self.partition_columns.len());
        for c in &self.partition_columns {
            let idx = schema
                .index_of(c)
                .map_err(|_| Error::Schema(format!("unknown partition column {c:?}")))?;
            partition_idx.push(idx);
        }
        let keep: Vec<usize> = (0..schema.fields().len())
            .filter(|i| !partition_idx.contains(i))
            .collect();
        if keep.is_empty() {
            return Err(Error::Schema(
                "no data left to save outside partition columns".into(),
            ));
        }
        let payload = batch.project(&keep)?;
        let groups = group_rows(&batch, &self.partition_columns)?;

        let pool = WorkerPool::new(self.config.threads)?;
        let io = self.io.clone().with_makedirs(self.config.makedirs);
        let parquet = opts.parquet();
        let mut handles = Vec::with_capacity(groups.len());
        let mut written = Vec::with_capacity(groups.len());
        for group in groups {
            let target = format_partition_parent(&self.root, &self.partition_columns, &group.values)?
                .join(&format_partition_filename(&group.values))?;
            let payload = payload.clone();
            let io = io.clone();
            let parquet = parquet.clone();
            let limit = opts.limit;
            let dest = target.clone();
            handles.push(pool.submit(target.to_string(), move || {
                let rows = arrow::compute::take_record_batch(&payload, &group.indices)?;
                let rows = match limit {
                    Some(n) if rows.num_rows() > n => rows.slice(0, n),
                    _ => rows,
                };
                log::debug!("writing {} row(s) to {dest}", rows.num_rows());
                write_table(&dest, &rows, &parquet, &io)
            }));
            written.push(target);
        }
        log::info!(
            "writing {} partition(s) under {} on {} thread(s)",
            written.len(),
            self.root,
            pool.threads()
        );
        join_all(handles, self.config.timeout())?;
        Ok(written)
    }
}
