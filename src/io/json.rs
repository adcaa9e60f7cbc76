//! Single-document JSON encoding.

use crate::encoder::write_value;
use crate::error::{Error, Result};
use serde_json::Value;
use std::io::{Read, Write};

/// Parse the whole stream as one JSON value.
///
/// # Errors
/// Returns [`Error::Decode`] for malformed JSON and [`Error::Io`] if the
/// stream fails.
pub fn read_document<R: Read>(source: R) -> Result<Value> {
    serde_json::from_reader(source).map_err(|e| match e.io_error_kind() {
        Some(kind) => Error::io("read JSON document", std::io::Error::new(kind, e.to_string())),
        None => Error::decode(format!("parse JSON document: {e}")),
    })
}

/// Write one JSON value, compact or with spaced separators.
///
/// # Errors
/// Returns [`Error::Io`] if the sink fails.
pub fn write_document<W: Write>(mut sink: W, value: &Value, pretty: bool) -> Result<()> {
    write_value(&mut sink, value, pretty)?;
    sink.flush().map_err(|e| Error::io("flush JSON writer", e))
}
