#![allow(dead_code)]

use recordshift::{Data, DeserializeOptions, Format, Locator, deserialize};
use serde_json::Value;
use std::path::Path;

/// Route library logs to the test harness; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn local(path: impl AsRef<Path>) -> Locator {
    Locator::local(path)
}

pub fn read_text(path: impl AsRef<Path>) -> anyhow::Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Read records back with default options for `format`.
pub fn read_records(locator: &Locator, format: Format) -> anyhow::Result<Vec<Value>> {
    Ok(deserialize(locator, &DeserializeOptions::new(format))?.into_records()?)
}

pub fn records(rows: Vec<Value>) -> Data {
    Data::Records(rows)
}
