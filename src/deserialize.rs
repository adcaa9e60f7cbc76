//! Deserializer: any supported (format, compression, location) into [`Data`].
//!
//! ```no_run
//! use recordshift::{Compression, DeserializeOptions, Format, Locator, deserialize};
//!
//! let opts = DeserializeOptions::new(Format::Csv)
//!     .with_compression(Compression::Gzip)
//!     .with_drop_nulls(true);
//! let data = deserialize(&Locator::parse("input.csv.gz")?, &opts)?;
//! println!("{} rows", data.len());
//! # Ok::<(), recordshift::Error>(())
//! ```

use crate::clean::{CleanPolicy, clean_in_place, clean_records};
use crate::data::Data;
use crate::encoder::{EncodeOptions, table_to_records};
use crate::error::Result;
use crate::format::{Compression, Format, check_pair};
use crate::io::csv::read_delimited;
use crate::io::json::read_document;
use crate::io::jsonl::read_lines;
use crate::io::parquet::{DEFAULT_BATCH_SIZE, ParquetReadOptions, read_dataset};
use crate::io::{IoContext, Locator, open_read};
use serde::Deserialize;

pub use crate::io::parquet::{Filter, FilterOp};

/// Options of one [`deserialize`] call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeserializeOptions {
    pub format: Format,
    /// Stream envelope. Ignored for parquet, whose codecs live inside the file.
    pub compression: Compression,
    /// Archive member to extract when `compression` is `zip`.
    pub member: Option<String>,
    /// Parquet column projection, in output order.
    pub columns: Option<Vec<String>>,
    /// Parquet row predicates, all of which must hold.
    pub filters: Vec<Filter>,
    /// Parquet rows per decoded batch.
    pub buffer_size: Option<usize>,
    /// Return a table instead of records.
    pub as_table: bool,
    #[serde(flatten)]
    pub clean: CleanPolicy,
    /// Object store and archive settings.
    #[serde(skip)]
    pub io: IoContext,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self::new(Format::Jsonl)
    }
}

impl DeserializeOptions {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            compression: Compression::None,
            member: None,
            columns: None,
            filters: Vec::new(),
            buffer_size: None,
            as_table: false,
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
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    #[must_use]
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, rows: usize) -> Self {
        self.buffer_size = Some(rows);
        self
    }

    #[must_use]
    pub fn with_as_table(mut self, as_table: bool) -> Self {
        self.as_table = as_table;
        self
    }

    #[must_use]
    pub fn with_drop_nulls(mut self, drop: bool) -> Self {
        self.clean.drop_nulls = drop;
        self
    }

    #[must_use]
    pub fn with_drop_blanks(mut self, drop: bool) -> Self {
        self.clean.drop_blanks = drop;
        self
    }

    #[must_use]
    pub fn with_io(mut self, io: IoContext) -> Self {
        self.io = io;
        self
    }

    fn io_context(&self) -> IoContext {
        match &self.member {
            Some(member) => self.io.clone().with_member(member.clone()),
            None => self.io.clone(),
        }
    }

    fn parquet(&self) -> ParquetReadOptions {
        ParquetReadOptions {
            columns: self.columns.clone(),
            batch_size: self.buffer_size.unwrap_or(DEFAULT_BATCH_SIZE),
            filters: self.filters.clone(),
        }
    }
}

/// Read and decode everything behind `locator`.
///
/// JSON arrays, delimited text and JSON Lines become records; any other JSON
/// document is returned as-is. Parquet returns records unless `as_table` is
/// set. The clean policy is applied to records and documents; a table keeps
/// its fixed schema and is not cleaned.
///
/// # Errors
/// Returns [`crate::Error::Format`] or [`crate::Error::UnsupportedOperation`]
/// for unsupported (format, compression) pairs before any I/O, then read and
/// decode errors.
pub fn deserialize(locator: &Locator, opts: &DeserializeOptions) -> Result<Data> {
    check_pair(opts.format, opts.compression, false)?;
    let io = opts.io_context();

    let data = match opts.format {
        Format::Csv | Format::Tsv => {
            let delimiter = opts.format.delimiter().unwrap_or(b',');
            Data::Records(read_delimited(open_read(locator, opts.compression, &io)?, delimiter)?)
        }
        Format::Json => Data::from_value(read_document(open_read(locator, opts.compression, &io)?)?),
        Format::Jsonl => Data::Records(read_lines(open_read(locator, opts.compression, &io)?)?),
        Format::Parquet => {
            let batch = read_dataset(locator, &io, &opts.parquet())?;
            if opts.as_table {
                return Ok(Data::Table(batch));
            }
            Data::Records(table_to_records(&batch, &EncodeOptions::lenient())?)
        }
    };
    log::debug!("deserialized {} row(s) of {} from {locator}", data.len(), opts.format);

    let data = clean_data(data, opts.clean);
    if opts.as_table && !matches!(data, Data::Table(_)) {
        return Ok(Data::Table(data.into_table()?));
    }
    Ok(data)
}

fn clean_data(data: Data, policy: CleanPolicy) -> Data {
    if policy.is_noop() {
        return data;
    }
    match data {
        Data::Records(mut rows) => {
            clean_records(&mut rows, policy);
            Data::Records(rows)
        }
        Data::Document(mut doc) => {
            clean_in_place(&mut doc, policy);
            Data::Document(doc)
        }
        table @ Data::Table(_) => table,
    }
}
