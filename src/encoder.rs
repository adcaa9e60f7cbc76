//! JSON encoding of table values.
//!
//! Tables carry types JSON has no notion of: decimals, dates, datetimes,
//! timestamps and non-finite floats. [`EncodeOptions`] decides how each one is
//! written. The defaults render decimals as numbers, dates as `%Y-%m-%d`,
//! datetimes and timestamps as `%Y-%m-%dT%H:%M:%S%.6f%z`, and reject NaN.
//!
//! Options can be given as `key:value` strings:
//!
//! ```
//! use recordshift::encoder::{DecimalFormat, JsonFormats};
//!
//! let formats = JsonFormats::from_options(["decimal:string", "date:%m/%d/%Y"]).unwrap();
//! assert_eq!(formats.decimal, DecimalFormat::String);
//! assert_eq!(formats.date, "%m/%d/%Y");
//! ```

use crate::error::{Error, Result};
use arrow::array::timezone::Tz;
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Decimal256Type, Float16Type, Float32Type,
    Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type,
    UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::temporal_conversions::{
    date32_to_datetime, date64_to_datetime, timestamp_ms_to_datetime, timestamp_ns_to_datetime,
    timestamp_s_to_datetime, timestamp_us_to_datetime,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt::Write as _;
use std::io;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%z";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%z";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalFormat {
    #[default]
    Float,
    String,
}

/// What to do with NaN and infinite floats, which JSON cannot represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NanPolicy {
    #[default]
    Error,
    Null,
}

/// strftime patterns and decimal rendering for typed table values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFormats {
    pub decimal: DecimalFormat,
    pub date: String,
    pub datetime: String,
    pub timestamp: String,
}

impl Default for JsonFormats {
    fn default() -> Self {
        Self {
            decimal: DecimalFormat::Float,
            date: DEFAULT_DATE_FORMAT.to_string(),
            datetime: DEFAULT_DATETIME_FORMAT.to_string(),
            timestamp: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl JsonFormats {
    /// Apply one `key:value` option (`decimal:float`, `decimal:string`,
    /// `date:<pattern>`, `datetime:<pattern>`, `timestamp:<pattern>`).
    ///
    /// # Errors
    /// Returns [`Error::Config`] for unknown keys or decimal modes.
    pub fn set(&mut self, option: &str) -> Result<()> {
        let (key, value) = option
            .split_once(':')
            .ok_or_else(|| Error::config(format!("format option {option:?} is not key:value")))?;
        match key.trim() {
            "decimal" => {
                self.decimal = match value.trim() {
                    "float" => DecimalFormat::Float,
                    "string" => DecimalFormat::String,
                    other => {
                        return Err(Error::config(format!(
                            "decimal format must be float or string, not {other:?}"
                        )));
                    }
                }
            }
            "date" => self.date = value.to_string(),
            "datetime" => self.datetime = value.to_string(),
            "timestamp" => self.timestamp = value.to_string(),
            other => return Err(Error::config(format!("unknown format option {other:?}"))),
        }
        Ok(())
    }

    /// Build formats from `key:value` option strings, later options winning.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for any invalid option.
    pub fn from_options<I, S>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut formats = Self::default();
        for option in options {
            formats.set(option.as_ref())?;
        }
        Ok(formats)
    }
}

/// Everything that controls how table values become JSON values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub formats: JsonFormats,
    pub nan: NanPolicy,
}

impl EncodeOptions {
    /// Options used when a table is only converted to records (no JSON output
    /// requested): non-finite floats become null.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            formats: JsonFormats::default(),
            nan: NanPolicy::Null,
        }
    }
}

/// Convert every row of a table to a JSON object, in row order.
///
/// # Errors
/// Returns [`Error::Type`] for non-finite floats under [`NanPolicy::Error`] and
/// [`Error::Config`] for unusable strftime patterns.
pub fn table_to_records(batch: &RecordBatch, opts: &EncodeOptions) -> Result<Vec<Value>> {
    let schema = batch.schema();
    let mut out = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut record = Map::with_capacity(schema.fields().len());
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            record.insert(field.name().clone(), value_at(column.as_ref(), row, opts)?);
        }
        out.push(Value::Object(record));
    }
    Ok(out)
}

/// JSON value of one slot of an Arrow array.
///
/// # Errors
/// Returns the same errors as [`table_to_records`].
pub fn value_at(array: &dyn Array, row: usize, opts: &EncodeOptions) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Value::from(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::from(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::from(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::from(array.as_primitive::<UInt8Type>().value(row)),
        DataType::UInt16 => Value::from(array.as_primitive::<UInt16Type>().value(row)),
        DataType::UInt32 => Value::from(array.as_primitive::<UInt32Type>().value(row)),
        DataType::UInt64 => Value::from(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float16 => float(
            f64::from(array.as_primitive::<Float16Type>().value(row).to_f32()),
            opts.nan,
        )?,
        DataType::Float32 => float(
            f64::from(array.as_primitive::<Float32Type>().value(row)),
            opts.nan,
        )?,
        DataType::Float64 => float(array.as_primitive::<Float64Type>().value(row), opts.nan)?,
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::String(array.as_string_view().value(row).to_string()),
        DataType::Binary => bytes(array.as_binary::<i32>().value(row)),
        DataType::LargeBinary => bytes(array.as_binary::<i64>().value(row)),
        DataType::FixedSizeBinary(_) => bytes(array.as_fixed_size_binary().value(row)),
        DataType::Date32 => {
            let days = array.as_primitive::<Date32Type>().value(row);
            let dt = date32_to_datetime(days)
                .ok_or_else(|| Error::Type(format!("date out of range: {days}")))?;
            Value::String(format_date(dt.date(), &opts.formats.date)?)
        }
        DataType::Date64 => {
            let millis = array.as_primitive::<Date64Type>().value(row);
            let dt = date64_to_datetime(millis)
                .ok_or_else(|| Error::Type(format!("datetime out of range: {millis}")))?;
            Value::String(format_naive(dt, &opts.formats.datetime)?)
        }
        DataType::Timestamp(unit, tz) => {
            let naive = timestamp_at(array, *unit, row)?;
            let text = match tz {
                None => format_naive(naive, &opts.formats.timestamp)?,
                Some(tz) => {
                    let tz: Tz = tz
                        .parse()
                        .map_err(|e| Error::Type(format!("invalid timezone {tz}: {e}")))?;
                    render(tz.from_utc_datetime(&naive).format(&opts.formats.timestamp), &opts.formats.timestamp)?
                }
            };
            Value::String(text)
        }
        DataType::Decimal128(_, _) => {
            decimal(array.as_primitive::<Decimal128Type>().value_as_string(row), opts)?
        }
        DataType::Decimal256(_, _) => {
            decimal(array.as_primitive::<Decimal256Type>().value_as_string(row), opts)?
        }
        DataType::List(_) => list(array.as_list::<i32>().value(row).as_ref(), opts)?,
        DataType::LargeList(_) => list(array.as_list::<i64>().value(row).as_ref(), opts)?,
        DataType::FixedSizeList(_, _) => list(array.as_fixed_size_list().value(row).as_ref(), opts)?,
        DataType::Struct(fields) => {
            let s = array.as_struct();
            let mut map = Map::with_capacity(fields.len());
            for (field, column) in fields.iter().zip(s.columns()) {
                map.insert(field.name().clone(), value_at(column.as_ref(), row, opts)?);
            }
            Value::Object(map)
        }
        DataType::Map(_, _) => {
            let entries = array.as_map().value(row);
            let mut map = Map::with_capacity(entries.len());
            for i in 0..entries.len() {
                let key = match value_at(entries.column(0).as_ref(), i, opts)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, value_at(entries.column(1).as_ref(), i, opts)?);
            }
            Value::Object(map)
        }
        DataType::Dictionary(_, value_type) => {
            let decoded = arrow::compute::cast(&array.slice(row, 1), value_type)?;
            value_at(decoded.as_ref(), 0, opts)?
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
            Value::String(formatter.value(row).to_string())
        }
    };
    Ok(value)
}

fn float(v: f64, nan: NanPolicy) -> Result<Value> {
    match Number::from_f64(v) {
        Some(n) => Ok(Value::Number(n)),
        None => match nan {
            NanPolicy::Null => Ok(Value::Null),
            NanPolicy::Error => Err(Error::Type(format!(
                "out of range float value {v} is not JSON compliant"
            ))),
        },
    }
}

fn bytes(b: &[u8]) -> Value {
    Value::Array(b.iter().map(|x| Value::from(*x)).collect())
}

fn list(values: &dyn Array, opts: &EncodeOptions) -> Result<Value> {
    (0..values.len())
        .map(|i| value_at(values, i, opts))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn decimal(text: String, opts: &EncodeOptions) -> Result<Value> {
    match opts.formats.decimal {
        DecimalFormat::String => Ok(Value::String(text)),
        DecimalFormat::Float => {
            let v: f64 = text
                .parse()
                .map_err(|_| Error::Type(format!("decimal {text} is not representable as float")))?;
            float(v, opts.nan)
        }
    }
}

fn timestamp_at(array: &dyn Array, unit: TimeUnit, row: usize) -> Result<NaiveDateTime> {
    let (raw, dt) = match unit {
        TimeUnit::Second => {
            let v = array.as_primitive::<TimestampSecondType>().value(row);
            (v, timestamp_s_to_datetime(v))
        }
        TimeUnit::Millisecond => {
            let v = array.as_primitive::<TimestampMillisecondType>().value(row);
            (v, timestamp_ms_to_datetime(v))
        }
        TimeUnit::Microsecond => {
            let v = array.as_primitive::<TimestampMicrosecondType>().value(row);
            (v, timestamp_us_to_datetime(v))
        }
        TimeUnit::Nanosecond => {
            let v = array.as_primitive::<TimestampNanosecondType>().value(row);
            (v, timestamp_ns_to_datetime(v))
        }
    };
    dt.ok_or_else(|| Error::Type(format!("timestamp out of range: {raw}")))
}

/// Format a date with a strftime pattern.
///
/// # Errors
/// Returns [`Error::Config`] if the pattern cannot be rendered.
pub fn format_date(date: chrono::NaiveDate, pattern: &str) -> Result<String> {
    render(date.format(pattern), pattern)
}

/// Format a zone-less datetime. Offset directives (`%z`, `%:z`, `%Z`) render
/// as empty, the way strftime treats naive values.
///
/// # Errors
/// Returns [`Error::Config`] if the pattern cannot be rendered.
pub fn format_naive(dt: NaiveDateTime, pattern: &str) -> Result<String> {
    let stripped = pattern.replace("%:z", "").replace("%z", "").replace("%Z", "");
    render(dt.format(&stripped), pattern)
}

fn render(display: impl std::fmt::Display, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{display}")
        .map_err(|_| Error::config(format!("invalid strftime pattern {pattern:?}")))?;
    Ok(out)
}

/// Compact JSON with `", "` and `": "` separators on a single line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Write one JSON value, compact or with spaced separators.
///
/// # Errors
/// Returns [`Error::Io`] if the writer fails.
pub fn write_value<W: io::Write>(writer: &mut W, value: &Value, pretty: bool) -> Result<()> {
    let result = if pretty {
        let mut ser = serde_json::Serializer::with_formatter(&mut *writer, SpacedFormatter);
        value.serialize(&mut ser)
    } else {
        serde_json::to_writer(&mut *writer, value)
    };
    result.map_err(|e| match e.io_error_kind() {
        Some(kind) => Error::io("write json", io::Error::new(kind, e.to_string())),
        None => Error::Type(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        ArrayRef, Date32Array, Decimal128Array, Float64Array, TimestampMicrosecondArray,
    };
    use arrow::datatypes::{Field, Schema};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;

    fn ts_micros(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, us: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_micro_opt(h, mi, s, us)
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    #[test]
    fn decimal_float_and_string() {
        let arr = Decimal128Array::from(vec![123_456_i128])
            .with_precision_and_scale(10, 3)
            .unwrap();
        let default = EncodeOptions::default();
        assert_eq!(value_at(&arr, 0, &default).unwrap(), json!(123.456));

        let mut as_string = EncodeOptions::default();
        as_string.formats.set("decimal:string").unwrap();
        assert_eq!(value_at(&arr, 0, &as_string).unwrap(), json!("123.456"));
    }

    #[test]
    fn dates_and_timestamps() {
        let days = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
            .num_days();
        let date = Date32Array::from(vec![i32::try_from(days).unwrap()]);
        let mut opts = EncodeOptions::default();
        assert_eq!(value_at(&date, 0, &opts).unwrap(), json!("2001-01-01"));
        opts.formats.set("date:%m/%d/%Y").unwrap();
        assert_eq!(value_at(&date, 0, &opts).unwrap(), json!("01/01/2001"));

        let ts = TimestampMicrosecondArray::from(vec![ts_micros(2001, 1, 1, 1, 1, 1, 1)]);
        let opts = EncodeOptions::default();
        assert_eq!(
            value_at(&ts, 0, &opts).unwrap(),
            json!("2001-01-01T01:01:01.000001")
        );
        let custom = EncodeOptions {
            formats: JsonFormats::from_options(["timestamp:%m/%d/%Y %H:%M:%S%.6f"]).unwrap(),
            nan: NanPolicy::Error,
        };
        assert_eq!(
            value_at(&ts, 0, &custom).unwrap(),
            json!("01/01/2001 01:01:01.000001")
        );
    }

    #[test]
    fn nan_policy() {
        let arr = Float64Array::from(vec![f64::NAN, 1.5]);
        assert!(matches!(
            value_at(&arr, 0, &EncodeOptions::default()),
            Err(Error::Type(_))
        ));
        assert_eq!(value_at(&arr, 0, &EncodeOptions::lenient()).unwrap(), Value::Null);
        assert_eq!(value_at(&arr, 1, &EncodeOptions::default()).unwrap(), json!(1.5));
    }

    #[test]
    fn rows_keep_schema_order_and_nulls() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("b", DataType::Float64, true),
            Field::new("a", DataType::Float64, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(vec![Some(1.0), None])),
            Arc::new(Float64Array::from(vec![Some(2.0), Some(3.0)])),
        ];
        let batch = RecordBatch::try_new(schema, columns).unwrap();
        let rows = table_to_records(&batch, &EncodeOptions::default()).unwrap();
        assert_eq!(rows, vec![json!({"b": 1.0, "a": 2.0}), json!({"b": null, "a": 3.0})]);
        let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn spaced_separators() {
        let mut out = Vec::new();
        write_value(&mut out, &json!({"hello": "world", "n": [1, 2]}), true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"hello": "world", "n": [1, 2]}"#);
    }

    #[test]
    fn rejects_unknown_options() {
        assert!(JsonFormats::from_options(["decimal:int"]).is_err());
        assert!(JsonFormats::from_options(["colour:red"]).is_err());
        assert!(JsonFormats::from_options(["nocolon"]).is_err());
    }
}
