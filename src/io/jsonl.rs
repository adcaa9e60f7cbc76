//! JSON Lines (JSONL) encoding of record sequences.
//!
//! # Notes
//! - Empty/whitespace-only lines are skipped on read; a final line without a
//!   terminating newline is still parsed.
//! - Values are joined by `\n` on write, with no trailing newline.

use crate::clean::{CleanPolicy, clean_in_place};
use crate::encoder::write_value;
use crate::error::{Error, Result};
use serde_json::Value;
use std::io::{self, BufRead, Write};

/// Read one JSON value per non-blank line.
///
/// # Errors
/// Returns [`Error::Decode`] naming the 1-based line number of the first line
/// that is not valid UTF-8 or fails to parse, or [`Error::Io`] if the stream
/// fails.
pub fn read_lines<R: BufRead>(source: R) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    for (i, line) in source.lines().enumerate() {
        let line = line.map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => Error::decode(format!("parse JSONL line {}: {e}", i + 1)),
            _ => Error::io(format!("read JSONL line {}", i + 1), e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let v: Value = serde_json::from_str(&line)
            .map_err(|e| Error::decode(format!("parse JSONL line {}: {e}", i + 1)))?;
        out.push(v);
    }
    log::debug!("read {} JSONL values", out.len());
    Ok(out)
}

/// Write values one per line, cleaning each row first when `policy` asks to.
///
/// # Returns
/// The number of values written.
///
/// # Errors
/// Returns [`Error::Io`] if the sink fails.
pub fn write_lines<'a, W, I>(mut sink: W, values: I, pretty: bool, policy: CleanPolicy) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Value>,
{
    let mut n = 0;
    for value in values {
        if n > 0 {
            sink.write_all(b"\n")
                .map_err(|e| Error::io("write JSONL separator", e))?;
        }
        if policy.is_noop() {
            write_value(&mut sink, value, pretty)?;
        } else {
            let mut row = value.clone();
            clean_in_place(&mut row, policy);
            write_value(&mut sink, &row, pretty)?;
        }
        n += 1;
    }
    sink.flush().map_err(|e| Error::io("flush JSONL writer", e))?;
    Ok(n)
}
