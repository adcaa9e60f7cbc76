//! Source to destination transcoding: deserialize, clean, serialize.

use crate::clean::CleanPolicy;
use crate::deserialize::{DeserializeOptions, deserialize};
use crate::error::{Error, Result};
use crate::format::{Compression, Format, check_pair};
use crate::io::cloud::{BackendCache, BackendKey};
use crate::io::{IoContext, Locator};
use crate::serialize::{SerializeOptions, serialize};
use serde::Deserialize;

/// One transcoding job. Names are validated before anything is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransformRequest {
    pub src: String,
    pub dest: String,
    pub input_format: String,
    pub output_format: String,
    pub input_compression: Option<String>,
    pub output_compression: Option<String>,
    pub input_endpoint: Option<String>,
    pub input_region: Option<String>,
    pub output_endpoint: Option<String>,
    pub output_region: Option<String>,
    pub drop_nulls: bool,
    pub drop_blanks: bool,
    pub limit: Option<usize>,
}

impl TransformRequest {
    pub fn new(
        src: impl Into<String>,
        input_format: impl Into<String>,
        dest: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            input_format: input_format.into(),
            output_format: output_format.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input_compression(mut self, compression: impl Into<String>) -> Self {
        self.input_compression = Some(compression.into());
        self
    }

    #[must_use]
    pub fn with_output_compression(mut self, compression: impl Into<String>) -> Self {
        self.output_compression = Some(compression.into());
        self
    }

    #[must_use]
    pub fn with_drop_nulls(mut self, drop: bool) -> Self {
        self.drop_nulls = drop;
        self
    }

    #[must_use]
    pub fn with_drop_blanks(mut self, drop: bool) -> Self {
        self.drop_blanks = drop;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

struct Plan {
    src: Locator,
    dest: Locator,
    input_format: Format,
    output_format: Format,
    input_compression: Compression,
    output_compression: Compression,
}

fn required<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{name} is missing")));
    }
    Ok(value)
}

fn plan(req: &TransformRequest) -> Result<Plan> {
    let src = Locator::parse(required(&req.src, "src")?)?;
    let dest = Locator::parse(required(&req.dest, "dest")?)?;
    let input_compression = Compression::parse_opt(req.input_compression.as_deref())
        .map_err(|e| Error::config(format!("input_compression is invalid: {e}")))?;
    let output_compression = Compression::parse_opt(req.output_compression.as_deref())
        .map_err(|e| Error::config(format!("output_compression is invalid: {e}")))?;
    let input_format: Format = required(&req.input_format, "input_format")?.parse()?;
    let output_format: Format = required(&req.output_format, "output_format")?.parse()?;
    check_pair(input_format, input_compression, false)?;
    check_pair(output_format, output_compression, true)?;
    Ok(Plan {
        src,
        dest,
        input_format,
        output_format,
        input_compression,
        output_compression,
    })
}

fn io_for(
    locator: &Locator,
    endpoint: Option<&String>,
    region: Option<&String>,
    backends: Option<&BackendCache>,
) -> Result<IoContext> {
    let (true, Some(cache)) = (locator.is_remote(), backends) else {
        return Ok(IoContext::new());
    };
    let mut key = BackendKey::new();
    if let Some(endpoint) = endpoint {
        key = key.with_endpoint(endpoint.clone());
    }
    if let Some(region) = region {
        key = key.with_region(region.clone());
    }
    Ok(IoContext::new().with_store(cache.get(&key)?))
}

/// Transcode `src` into `dest` on local files and standard streams.
///
/// Returns the number of rows read from the source.
///
/// # Errors
/// Returns the same errors as [`transform_with`].
pub fn transform(req: &TransformRequest) -> Result<usize> {
    transform_with(req, None)
}

/// Transcode `src` into `dest`, resolving remote locators through `backends`.
///
/// # Errors
/// Returns [`Error::Config`] for missing or invalid names before any I/O,
/// then any deserializer or serializer error.
pub fn transform_with(req: &TransformRequest, backends: Option<&BackendCache>) -> Result<usize> {
    let plan = plan(req)?;
    let input_io = io_for(
        &plan.src,
        req.input_endpoint.as_ref(),
        req.input_region.as_ref(),
        backends,
    )?;
    let output_io = io_for(
        &plan.dest,
        req.output_endpoint.as_ref(),
        req.output_region.as_ref(),
        backends,
    )?;

    let mut read = DeserializeOptions::new(plan.input_format)
        .with_compression(plan.input_compression)
        .with_io(input_io);
    read.clean = CleanPolicy::new(req.drop_nulls, req.drop_blanks);
    let data = deserialize(&plan.src, &read)?;
    let rows = data.len();

    let mut write = SerializeOptions::new(plan.output_format)
        .with_compression(plan.output_compression)
        .with_io(output_io);
    write.limit = req.limit;
    serialize(&plan.dest, data, &write)?;
    log::info!(
        "transformed {rows} row(s) from {} ({}) to {} ({})",
        plan.src,
        plan.input_format,
        plan.dest,
        plan.output_format
    );
    Ok(rows)
}
