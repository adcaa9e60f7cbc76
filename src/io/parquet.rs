//! Parquet encoding of tables and hive-style datasets.
//!
//! This module provides:
//! - [`write_table`]: one table to one parquet file, optionally splitting it
//!   into physical row groups by the values of some columns
//! - [`read_file`]: one parquet file (projection and batch size applied)
//! - [`read_dataset`]: a single file, or every `*.parquet` file below a local
//!   directory or remote prefix, with `key=value` path segments re-attached as
//!   columns and row filters applied
//!
//! # Design notes
//! - Row-group columns work like partition columns inside one file: rows are
//!   grouped by canonical value, each group is flushed as its own row group.
//!   `row_group_size` additionally caps the rows of every row group.
//! - Partition values that all parse as integers come back as `Int64`; the
//!   hive null marker comes back as null.

use crate::dataset::{NULL_PARTITION, group_rows};
use crate::encoder::{EncodeOptions, value_at};
use crate::error::{Error, Result};
use crate::format::{Compression, Format, check_pair};
use crate::io::locator::Locator;
use crate::io::stream::{IoContext, open_write, read_bytes};
use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray, new_null_array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use bytes::Bytes;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::{Compression as PageCodec, GzipLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Rows per decoded batch when no buffer size is given.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Settings of one parquet file write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParquetWriteOptions {
    /// Page codec: none, gzip or snappy.
    pub compression: Compression,
    /// Maximum rows per row group.
    pub row_group_size: Option<usize>,
    /// Columns whose distinct values each get their own row group.
    pub row_group_columns: Vec<String>,
}

impl ParquetWriteOptions {
    fn properties(&self) -> Result<WriterProperties> {
        let codec = match self.compression {
            Compression::None => PageCodec::UNCOMPRESSED,
            Compression::Gzip => PageCodec::GZIP(GzipLevel::default()),
            Compression::Snappy => PageCodec::SNAPPY,
            Compression::Zip => {
                return Err(Error::Format("zip is not a parquet page codec".into()));
            }
        };
        let mut props = WriterProperties::builder().set_compression(codec);
        if let Some(rows) = self.row_group_size {
            if rows == 0 {
                return Err(Error::config("row_group_size must be positive"));
            }
            props = props.set_max_row_group_size(rows);
        }
        Ok(props.build())
    }
}

/// Write a table as one parquet file.
///
/// # Errors
/// Returns [`Error::Schema`] for unknown row-group columns, [`Error::Parquet`]
/// if encoding fails, [`Error::Io`]/[`Error::Backend`] if the destination
/// cannot be written.
pub fn write_table(
    dest: &Locator,
    batch: &RecordBatch,
    opts: &ParquetWriteOptions,
    io: &IoContext,
) -> Result<()> {
    let props = opts.properties()?;
    let groups = if opts.row_group_columns.is_empty() {
        None
    } else {
        Some(group_rows(batch, &opts.row_group_columns)?)
    };

    let mut sink = open_write(dest, Compression::None, io)?;
    let mut writer = ArrowWriter::try_new(&mut sink, batch.schema(), Some(props))?;
    match groups {
        None => writer.write(batch)?,
        Some(groups) => {
            for group in &groups {
                let rows = arrow::compute::take_record_batch(batch, &group.indices)?;
                writer.write(&rows)?;
                writer.flush()?;
            }
        }
    }
    writer.close()?;
    sink.finish()
}

/// Projection and batching of parquet reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ParquetReadOptions {
    /// Columns to keep, in output order. Partition columns may be named.
    pub columns: Option<Vec<String>>,
    /// Rows per decoded batch.
    pub batch_size: usize,
    /// Row predicates, all of which must hold.
    pub filters: Vec<Filter>,
}

impl Default for ParquetReadOptions {
    fn default() -> Self {
        Self {
            columns: None,
            batch_size: DEFAULT_BATCH_SIZE,
            filters: Vec::new(),
        }
    }
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

/// Row predicate `column op value`. For `In`/`NotIn`, `value` is an array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether `cell` satisfies the predicate. Nulls only match equality with
    /// null (and its negations).
    #[must_use]
    pub fn matches(&self, cell: &Value) -> bool {
        match self.op {
            FilterOp::Eq => json_eq(cell, &self.value),
            FilterOp::NotEq => !json_eq(cell, &self.value),
            FilterOp::Lt => json_cmp(cell, &self.value) == Some(Ordering::Less),
            FilterOp::LtEq => matches!(
                json_cmp(cell, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => json_cmp(cell, &self.value) == Some(Ordering::Greater),
            FilterOp::GtEq => matches!(
                json_cmp(cell, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::In => self.members().iter().any(|v| json_eq(cell, v)),
            FilterOp::NotIn => !self.members().iter().any(|v| json_eq(cell, v)),
        }
    }

    fn members(&self) -> &[Value] {
        match &self.value {
            Value::Array(items) => items,
            single => std::slice::from_ref(single),
        }
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Read one parquet file into a single table.
///
/// Requested columns missing from the file are ignored here; callers that
/// need them (partition columns) add them afterwards.
///
/// # Errors
/// Returns [`Error::Parquet`]/[`Error::Arrow`] if the file cannot be decoded.
pub fn read_file<R: ChunkReader + 'static>(reader: R, opts: &ParquetReadOptions) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
    let builder = match &opts.columns {
        Some(cols) => {
            let file_schema = builder.schema();
            let mut roots: Vec<usize> = cols
                .iter()
                .filter_map(|c| file_schema.index_of(c).ok())
                .collect();
            roots.sort_unstable();
            let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
            builder.with_projection(mask)
        }
        None => builder,
    };
    let reader = builder.with_batch_size(opts.batch_size.max(1)).build()?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// One parquet file of a dataset and the partition values of its path.
struct Part {
    source: PartSource,
    partitions: Vec<(String, String)>,
}

enum PartSource {
    File(std::path::PathBuf),
    Bytes(Bytes),
}

/// Read a parquet file or dataset.
///
/// # Errors
/// Returns [`Error::Decode`] if no parquet file is found, [`Error::Schema`]
/// for unknown projected columns, otherwise read and decode errors.
pub fn read_dataset(locator: &Locator, io: &IoContext, opts: &ParquetReadOptions) -> Result<RecordBatch> {
    check_pair(Format::Parquet, Compression::None, false)?;
    let parts = discover(locator, io)?;
    if parts.is_empty() {
        return Err(Error::decode(format!("no parquet files found under {locator}")));
    }
    log::debug!("reading {} parquet file(s) from {locator}", parts.len());

    let partition_types = partition_types(&parts);
    let mut batches = Vec::with_capacity(parts.len());
    for part in parts {
        let batch = match &part.source {
            PartSource::File(path) => {
                let f = File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;
                read_file(f, opts)?
            }
            PartSource::Bytes(bytes) => read_file(bytes.clone(), opts)?,
        };
        batches.push(attach_partitions(batch, &part.partitions, &partition_types, opts)?);
    }

    let merged = merge(&batches)?;
    let filtered = apply_filters(merged, &opts.filters)?;
    match &opts.columns {
        Some(cols) => select(&filtered, cols),
        None => Ok(filtered),
    }
}

fn discover(locator: &Locator, io: &IoContext) -> Result<Vec<Part>> {
    match locator {
        Locator::Local(path) if path.is_dir() => {
            let pattern = format!("{}/**/*.parquet", glob::Pattern::escape(&path.to_string_lossy()));
            let mut files: Vec<_> = glob::glob(&pattern)
                .map_err(|e| Error::config(format!("invalid dataset path {}: {e}", path.display())))?
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::io(format!("walk {}", path.display()), e.into_error()))?;
            files.sort();
            Ok(files
                .into_iter()
                .map(|file| {
                    let partitions = file
                        .strip_prefix(path)
                        .map(local_partitions)
                        .unwrap_or_default();
                    Part {
                        source: PartSource::File(file),
                        partitions,
                    }
                })
                .collect())
        }
        Locator::Local(path) => Ok(vec![Part {
            source: PartSource::File(path.clone()),
            partitions: Vec::new(),
        }]),
        Locator::Stdio => Ok(vec![Part {
            source: PartSource::Bytes(Bytes::from(read_bytes(locator, io)?)),
            partitions: Vec::new(),
        }]),
        Locator::Remote { bucket, key, .. } => {
            let store = io.store_for(locator)?;
            if key.ends_with(".parquet") && store.object_exists(bucket, key)? {
                return Ok(vec![Part {
                    source: PartSource::Bytes(Bytes::from(store.get_object(bucket, key)?)),
                    partitions: Vec::new(),
                }]);
            }
            let prefix = if key.is_empty() { String::new() } else { format!("{key}/") };
            let mut parts = Vec::new();
            for meta in store.list_objects(bucket, Some(&prefix))? {
                if !meta.key.ends_with(".parquet") {
                    continue;
                }
                let relative = &meta.key[prefix.len()..];
                parts.push(Part {
                    partitions: key_partitions(relative.split('/')),
                    source: PartSource::Bytes(Bytes::from(store.get_object(bucket, &meta.key)?)),
                });
            }
            Ok(parts)
        }
    }
}

fn local_partitions(relative: &Path) -> Vec<(String, String)> {
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    key_partitions(segments.iter().map(String::as_str))
}

/// `key=value` directory segments; the last segment is the file name.
fn key_partitions<'a>(segments: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    let segments: Vec<&str> = segments.collect();
    let dirs = segments.len().saturating_sub(1);
    segments[..dirs]
        .iter()
        .filter_map(|s| s.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Column type per partition key, in first-seen order: `Int64` when every
/// non-null value is canonical integer text (`7`, `-12`, never `007` or
/// `+7`), `Utf8` otherwise.
fn partition_types(parts: &[Part]) -> Vec<(String, DataType)> {
    let mut out: Vec<(String, DataType)> = Vec::new();
    for (k, v) in parts.iter().flat_map(|p| &p.partitions) {
        let integer = v == NULL_PARTITION || is_canonical_integer(v);
        match out.iter_mut().find(|(name, _)| name == k) {
            Some((_, ty)) => {
                if !integer {
                    *ty = DataType::Utf8;
                }
            }
            None => out.push((
                k.clone(),
                if integer { DataType::Int64 } else { DataType::Utf8 },
            )),
        }
    }
    out
}

fn is_canonical_integer(v: &str) -> bool {
    v.parse::<i64>().is_ok_and(|n| n.to_string() == v)
}

fn attach_partitions(
    batch: RecordBatch,
    partitions: &[(String, String)],
    types: &[(String, DataType)],
    opts: &ParquetReadOptions,
) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let mut fields: Vec<Field> = batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    for (name, ty) in types {
        let wanted = opts.columns.as_ref().is_none_or(|cols| cols.contains(name));
        if !wanted || batch.schema().index_of(name).is_ok() {
            continue;
        }
        let value = partitions
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| *v != NULL_PARTITION);
        let array: ArrayRef = match (ty, value) {
            (_, None) => new_null_array(ty, rows),
            (DataType::Int64, Some(v)) => {
                let v: i64 = v
                    .parse()
                    .map_err(|_| Error::decode(format!("partition value {v:?} is not an integer")))?;
                Arc::new(Int64Array::from(vec![v; rows]))
            }
            (_, Some(v)) => Arc::new(StringArray::from(vec![v; rows])),
        };
        fields.push(Field::new(name, ty.clone(), true));
        columns.push(array);
    }
    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new_with_options(
        schema,
        columns,
        &arrow::array::RecordBatchOptions::new().with_row_count(Some(rows)),
    )?)
}

/// Union of per-file tables. Fields keep their first-seen type; later files
/// are cast to it and missing columns are filled with nulls.
fn merge(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let first_schema = batches[0].schema();
    if batches.iter().all(|b| b.schema() == first_schema) {
        return Ok(arrow::compute::concat_batches(&first_schema, batches)?);
    }
    let mut fields: Vec<Field> = Vec::new();
    for batch in batches {
        for f in batch.schema().fields() {
            if !fields.iter().any(|g| g.name() == f.name()) {
                fields.push(Field::new(f.name(), f.data_type().clone(), true));
            }
        }
    }
    let schema: SchemaRef = Arc::new(Schema::new(fields));
    let aligned = batches
        .iter()
        .map(|batch| {
            let columns = schema
                .fields()
                .iter()
                .map(|f| match batch.column_by_name(f.name()) {
                    Some(col) if col.data_type() == f.data_type() => Ok(Arc::clone(col)),
                    Some(col) => Ok(arrow::compute::cast(col, f.data_type())?),
                    None => Ok(new_null_array(f.data_type(), batch.num_rows())),
                })
                .collect::<Result<Vec<ArrayRef>>>()?;
            Ok(RecordBatch::try_new(Arc::clone(&schema), columns)?)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(arrow::compute::concat_batches(&schema, &aligned)?)
}

fn apply_filters(batch: RecordBatch, filters: &[Filter]) -> Result<RecordBatch> {
    if filters.is_empty() {
        return Ok(batch);
    }
    let opts = EncodeOptions::lenient();
    let columns = filters
        .iter()
        .map(|f| {
            batch
                .column_by_name(&f.column)
                .ok_or_else(|| Error::Schema(format!("unknown filter column {:?}", f.column)))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut keep = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut ok = true;
        for (filter, column) in filters.iter().zip(&columns) {
            if !filter.matches(&value_at(column.as_ref(), row, &opts)?) {
                ok = false;
                break;
            }
        }
        keep.push(ok);
    }
    Ok(arrow::compute::filter_record_batch(&batch, &BooleanArray::from(keep))?)
}

fn select(batch: &RecordBatch, columns: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = columns
        .iter()
        .map(|c| {
            schema
                .index_of(c)
                .map_err(|_| Error::Schema(format!("unknown column {c:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records_to_table;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use serde_json::json;

    #[test]
    fn only_canonical_integer_text_is_typed_as_integer() {
        assert!(is_canonical_integer("7"));
        assert!(is_canonical_integer("-12"));
        assert!(!is_canonical_integer("007"));
        assert!(!is_canonical_integer("+7"));
        assert!(!is_canonical_integer("-0"));
        assert!(!is_canonical_integer("1.0"));
    }

    #[test]
    fn filters_compare_numbers_and_strings() {
        assert!(Filter::new("a", FilterOp::Eq, 1).matches(&json!(1.0)));
        assert!(Filter::new("a", FilterOp::Lt, 5).matches(&json!(3)));
        assert!(!Filter::new("a", FilterOp::Gt, "m").matches(&json!("a")));
        assert!(Filter::new("a", FilterOp::In, json!(["x", "y"])).matches(&json!("y")));
        assert!(Filter::new("a", FilterOp::NotIn, json!(["x"])).matches(&json!("y")));
        assert!(!Filter::new("a", FilterOp::GtEq, 0).matches(&Value::Null));
        let parsed: Filter = serde_json::from_value(json!({"column": "a", "op": "not in", "value": [1]})).unwrap();
        assert_eq!(parsed.op, FilterOp::NotIn);
    }

    #[test]
    fn row_group_columns_split_row_groups() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Locator::local(dir.path().join("out.parquet"));
        let batch = records_to_table(&[
            json!({"k": "a", "v": 1}),
            json!({"k": "b", "v": 2}),
            json!({"k": "a", "v": 3}),
        ])
        .unwrap();
        let opts = ParquetWriteOptions {
            compression: Compression::Snappy,
            row_group_size: None,
            row_group_columns: vec!["k".into()],
        };
        write_table(&dest, &batch, &opts, &IoContext::new()).unwrap();

        let reader = SerializedFileReader::new(File::open(dir.path().join("out.parquet")).unwrap()).unwrap();
        let groups: Vec<i64> = (0..reader.metadata().num_row_groups())
            .map(|i| reader.metadata().row_group(i).num_rows())
            .collect();
        assert_eq!(groups, vec![2, 1]);
    }

    #[test]
    fn partition_segments_come_from_directories_only() {
        let parts = key_partitions("year=2001/month=1/2001-1.parquet".split('/'));
        assert_eq!(
            parts,
            vec![("year".into(), "2001".into()), ("month".into(), "1".into())]
        );
        assert!(key_partitions("a=b.parquet".split('/')).is_empty());
    }
}
