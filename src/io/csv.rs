//! Delimited text (CSV/TSV) encoding of record sequences.
//!
//! This module provides:
//! - [`read_delimited`]: header row as field names, one object per data row,
//!   every value a string
//! - [`write_delimited`]: header from an explicit column list or the sorted
//!   union of keys, one line per row
//!
//! # Notes
//! - Ragged rows (a different number of fields than the header) are decode
//!   errors, reported with the CSV position.
//! - Nested values are written as compact JSON text; null and missing fields
//!   are written as empty cells.

use crate::data::as_record;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// Read a delimited stream into one JSON object per data row.
///
/// # Errors
/// Returns [`Error::Decode`] for malformed or ragged rows and [`Error::Io`] if
/// the stream fails.
pub fn read_delimited<R: Read>(source: R, delimiter: u8) -> Result<Vec<Value>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(source);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(e, "read CSV header".into()))?
        .clone();

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| csv_error(e, format!("parse CSV record #{}", i + 1)))?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(rec.iter())
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        out.push(Value::Object(row));
    }
    log::debug!("read {} delimited rows", out.len());
    Ok(out)
}

/// Header used when no explicit column list is given: the sorted union of
/// every row's keys.
///
/// # Errors
/// Returns [`Error::Type`] if a row is not an object.
pub fn union_columns(rows: &[Value]) -> Result<Vec<String>> {
    let mut keys = BTreeSet::new();
    for (i, row) in rows.iter().enumerate() {
        keys.extend(as_record(row, i)?.keys().cloned());
    }
    Ok(keys.into_iter().collect())
}

/// Write rows as delimited text with a header line.
///
/// Columns missing from a row are written empty. With an explicit `columns`
/// list, a row carrying any other field is rejected.
///
/// # Returns
/// The number of data rows written.
///
/// # Errors
/// Returns [`Error::Type`] if a row is not an object or has a field outside
/// `columns`, and [`Error::Io`] if the sink fails.
pub fn write_delimited<W: Write>(
    sink: W,
    rows: &[Value],
    columns: Option<&[String]>,
    delimiter: u8,
) -> Result<usize> {
    let header = match columns {
        Some(cols) => {
            check_fields(rows, cols)?;
            cols.to_vec()
        }
        None => union_columns(rows)?,
    };
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(sink);
    wtr.write_record(&header)
        .map_err(|e| csv_error(e, "write CSV header".into()))?;

    let mut cells = Vec::with_capacity(header.len());
    for (i, row) in rows.iter().enumerate() {
        let record = as_record(row, i)?;
        cells.clear();
        cells.extend(header.iter().map(|col| cell(record.get(col))));
        wtr.write_record(&cells)
            .map_err(|e| csv_error(e, format!("write CSV row #{}", i + 1)))?;
    }
    wtr.flush().map_err(|e| Error::io("flush CSV writer", e))?;
    Ok(rows.len())
}

/// Every key of every row must be a header column.
///
/// # Errors
/// Returns [`Error::Type`] naming the first row and field outside `columns`.
pub fn check_fields(rows: &[Value], columns: &[String]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if let Some(extra) = as_record(row, i)?.keys().find(|k| !columns.contains(k)) {
            return Err(Error::Type(format!(
                "row #{} has field {extra:?} that is not in the header columns",
                i + 1
            )));
        }
    }
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn csv_error(e: csv::Error, context: String) -> Error {
    if !e.is_io_error() {
        return Error::decode(format!("{context}: {e}"));
    }
    match e.into_kind() {
        csv::ErrorKind::Io(source) => Error::io(context, source),
        other => Error::decode(format!("{context}: {other:?}")),
    }
}
