//! In-memory data model shared by readers and writers.
//!
//! Every reader produces a [`Data`] and every writer consumes one. A record
//! sequence and an Arrow table are interchangeable: [`records_to_table`] infers
//! a schema over all rows, [`crate::encoder::table_to_records`] goes back.

use crate::encoder::{EncodeOptions, table_to_records};
use crate::error::{Error, Result};
use arrow::array::RecordBatchOptions;
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use arrow::json::ReaderBuilder;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One row: field name to JSON value, in insertion order.
pub type Record = Map<String, Value>;

/// Rows decoded per Arrow batch while building a table from records.
const DECODE_BATCH_ROWS: usize = 8192;

/// Payload moving between a reader and a writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Ordered row sequence; rows are normally JSON objects.
    Records(Vec<Value>),
    /// Columnar table with a fixed schema.
    Table(RecordBatch),
    /// A JSON document that is not a row sequence.
    Document(Value),
}

impl Data {
    /// Classify a parsed JSON document: arrays are row sequences.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(rows) => Data::Records(rows),
            other => Data::Document(other),
        }
    }

    /// Number of rows. A document counts as one.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Data::Records(rows) => rows.len(),
            Data::Table(batch) => batch.num_rows(),
            Data::Document(_) => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row sequence view. Table values are encoded with lenient options
    /// (non-finite floats become null).
    ///
    /// # Errors
    /// Returns [`Error::Type`] for a document.
    pub fn into_records(self) -> Result<Vec<Value>> {
        self.into_records_with(&EncodeOptions::lenient())
    }

    /// Row sequence view with explicit encoding options for table values.
    ///
    /// # Errors
    /// Returns [`Error::Type`] for a document or for table values the options
    /// reject.
    pub fn into_records_with(self, opts: &EncodeOptions) -> Result<Vec<Value>> {
        match self {
            Data::Records(rows) => Ok(rows),
            Data::Table(batch) => table_to_records(&batch, opts),
            Data::Document(_) => Err(Error::Type(
                "a single JSON document is not a record sequence".into(),
            )),
        }
    }

    /// Columnar view.
    ///
    /// # Errors
    /// Returns [`Error::Type`] for a document or for rows that are not
    /// objects, [`Error::Arrow`] if the rows cannot be decoded.
    pub fn into_table(self) -> Result<RecordBatch> {
        match self {
            Data::Table(batch) => Ok(batch),
            Data::Records(rows) => records_to_table(&rows),
            Data::Document(_) => Err(Error::Type(
                "a single JSON document cannot be converted to a table".into(),
            )),
        }
    }

    /// JSON value of the whole payload: records become an array.
    ///
    /// # Errors
    /// Returns the same errors as [`Data::into_records_with`].
    pub fn into_value(self, opts: &EncodeOptions) -> Result<Value> {
        match self {
            Data::Document(doc) => Ok(doc),
            other => other.into_records_with(opts).map(Value::Array),
        }
    }

    /// Keep at most `limit` rows. Documents are left alone.
    #[must_use]
    pub fn truncate(self, limit: Option<usize>) -> Self {
        let Some(limit) = limit else {
            return self;
        };
        match self {
            Data::Records(mut rows) => {
                rows.truncate(limit);
                Data::Records(rows)
            }
            Data::Table(batch) if batch.num_rows() > limit => Data::Table(batch.slice(0, limit)),
            other => other,
        }
    }
}

impl From<Vec<Value>> for Data {
    fn from(rows: Vec<Value>) -> Self {
        Data::Records(rows)
    }
}

impl From<RecordBatch> for Data {
    fn from(batch: RecordBatch) -> Self {
        Data::Table(batch)
    }
}

/// Build a table from JSON object rows.
///
/// The schema is inferred over every row, fields in first-seen order.
/// Integer/float mixes widen to float and scalar/string mixes widen to
/// string. Missing fields are null.
///
/// # Errors
/// Returns [`Error::Type`] if a row is not an object, or [`Error::Arrow`] if
/// inference or decoding fails (for example an object field that is a scalar
/// in another row).
pub fn records_to_table(rows: &[Value]) -> Result<RecordBatch> {
    if let Some(pos) = rows.iter().position(|r| !r.is_object()) {
        return Err(Error::Type(format!(
            "row {} is not an object and cannot be placed in a table",
            pos + 1
        )));
    }
    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    let schema = Arc::new(infer_json_schema_from_iterator(
        rows.iter().map(|r| Ok::<_, ArrowError>(r.clone())),
    )?);
    if schema.fields().is_empty() {
        let opts = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        return Ok(RecordBatch::try_new_with_options(schema, vec![], &opts)?);
    }

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
        .with_coerce_primitive(true)
        .with_batch_size(DECODE_BATCH_ROWS)
        .build_decoder()?;
    let mut batches = Vec::with_capacity(rows.len().div_ceil(DECODE_BATCH_ROWS));
    for chunk in rows.chunks(DECODE_BATCH_ROWS) {
        decoder.serialize(chunk)?;
        if let Some(batch) = decoder.flush()? {
            batches.push(batch);
        }
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Borrow a row as an object.
///
/// # Errors
/// Returns [`Error::Type`] naming the 1-based row position otherwise.
pub(crate) fn as_record(row: &Value, index: usize) -> Result<&Record> {
    row.as_object()
        .ok_or_else(|| Error::Type(format!("row {} is not an object", index + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;
    use serde_json::json;

    #[test]
    fn inference_widens_mixed_columns() {
        let rows = vec![
            json!({"n": 1, "s": "x", "m": 1}),
            json!({"n": 2.5, "s": "y", "m": "two", "extra": true}),
        ];
        let batch = records_to_table(&rows).unwrap();
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["n", "s", "m", "extra"]);
        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(batch.num_rows(), 2);

        let back = Data::Table(batch).into_records().unwrap();
        assert_eq!(back[0], json!({"n": 1.0, "s": "x", "m": "1", "extra": null}));
        assert_eq!(back[1], json!({"n": 2.5, "s": "y", "m": "two", "extra": true}));
    }

    #[test]
    fn non_object_rows_are_type_errors() {
        assert!(matches!(
            records_to_table(&[json!({"a": 1}), json!(3)]),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            Data::Document(json!({"a": 1})).into_table(),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn empty_rows_make_empty_table() {
        let batch = records_to_table(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(records_to_table(&[json!({}), json!({})]).unwrap().num_rows(), 2);
    }

    #[test]
    fn classify_and_truncate() {
        assert!(matches!(Data::from_value(json!([1, 2])), Data::Records(_)));
        assert!(matches!(Data::from_value(json!({"a": 1})), Data::Document(_)));
        let d = Data::Records(vec![json!({"a": 1}), json!({"a": 2})]).truncate(Some(1));
        assert_eq!(d.len(), 1);
        let t = Data::Table(records_to_table(&[json!({"a": 1}), json!({"a": 2})]).unwrap());
        assert_eq!(t.truncate(Some(0)).len(), 0);
    }
}
