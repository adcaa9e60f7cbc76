mod common;

use anyhow::Result;
use arrow::array::{ArrayRef, Date32Array, Decimal128Array, Float64Array, TimestampMicrosecondArray};
use arrow::record_batch::RecordBatch;
use common::{init_logging, local, read_records, read_text, records};
use recordshift::io::archive;
use recordshift::io::cloud::{MemoryObjectStore, ObjectStore, StoreErrorKind};
use recordshift::testing::{TempDirPath, greetings_as_text, gzip_bytes, zip_archive};
use recordshift::{
    Compression, Data, DeserializeOptions, Error, Format, IoContext, JsonFormats, Locator, NanPolicy,
    SerializeOptions, deserialize, serialize,
};
use serde_json::json;
use std::sync::Arc;

const GREETINGS_CSV: &[u8] = b"ciao,hello,order\nsun,world,1\nmoon,world,2\nsun,planet,3\nmoon,planet,4\n";

#[test]
fn zip_member_is_inferred_from_archive_name() -> Result<()> {
    init_logging();
    let dir = TempDirPath::new()?;
    let path = dir.file_path("greetings.csv.zip");
    std::fs::write(&path, zip_archive(&[("greetings.csv", GREETINGS_CSV)])?)?;

    let rows = deserialize(
        &local(&path),
        &DeserializeOptions::new(Format::Csv).with_compression(Compression::Zip),
    )?
    .into_records()?;
    assert_eq!(rows, greetings_as_text());
    Ok(())
}

#[test]
fn explicit_zip_member_and_listing() -> Result<()> {
    let dir = TempDirPath::new()?;
    let path = dir.file_path("bundle.zip");
    std::fs::write(
        &path,
        zip_archive(&[
            ("readme.txt", b"not data".as_slice()),
            ("rows.jsonl", b"{\"a\":1}\n{\"a\":2}".as_slice()),
        ])?,
    )?;
    let archive_path = local(&path);

    assert_eq!(
        archive::names(&archive_path, &IoContext::new())?,
        vec!["readme.txt", "rows.jsonl"]
    );

    let opts = DeserializeOptions::new(Format::Jsonl).with_compression(Compression::Zip);
    let rows = deserialize(&archive_path, &opts.clone().with_member("rows.jsonl"))?.into_records()?;
    assert_eq!(rows, vec![json!({"a": 1}), json!({"a": 2})]);

    let missing = deserialize(&archive_path, &opts.with_member("other.jsonl"));
    assert!(matches!(missing, Err(Error::Decode(_))));
    Ok(())
}

#[test]
fn archive_errors_come_before_io() -> Result<()> {
    let nowhere = Locator::parse("does/not/exist/blob.bin")?;

    let no_member = deserialize(
        &nowhere,
        &DeserializeOptions::new(Format::Csv).with_compression(Compression::Zip),
    );
    assert!(matches!(no_member, Err(Error::UnsupportedOperation(_))));

    let write = serialize(
        &nowhere,
        records(vec![json!({"a": 1})]),
        &SerializeOptions::new(Format::Csv).with_compression(Compression::Zip),
    );
    assert!(matches!(write, Err(Error::UnsupportedOperation(_))));

    let parquet = deserialize(
        &nowhere,
        &DeserializeOptions::new(Format::Parquet).with_compression(Compression::Zip),
    );
    assert!(matches!(parquet, Err(Error::Format(_))));

    let snappy = deserialize(
        &nowhere,
        &DeserializeOptions::new(Format::Jsonl).with_compression(Compression::Snappy),
    );
    assert!(matches!(snappy, Err(Error::Format(_))));
    Ok(())
}

#[test]
fn concatenated_gzip_members_read_as_one_stream() -> Result<()> {
    let dir = TempDirPath::new()?;
    let path = dir.file_path("joined.jsonl.gz");
    let mut bytes = gzip_bytes(b"{\"part\":1}\n")?;
    bytes.extend(gzip_bytes(b"{\"part\":2}\n")?);
    std::fs::write(&path, bytes)?;

    let rows = deserialize(
        &local(&path),
        &DeserializeOptions::new(Format::Jsonl).with_compression(Compression::Gzip),
    )?
    .into_records()?;
    assert_eq!(rows, vec![json!({"part": 1}), json!({"part": 2})]);
    Ok(())
}

#[test]
fn remote_objects_roundtrip_through_the_store() -> Result<()> {
    let store = MemoryObjectStore::new();
    let io = IoContext::new().with_store(Arc::new(store.clone()));
    let dest = Locator::parse("mem://bucket/exports/rows.jsonl.gz")?;

    serialize(
        &dest,
        records(greetings_as_text()),
        &SerializeOptions::new(Format::Jsonl)
            .with_compression(Compression::Gzip)
            .with_acl("private")
            .with_io(io.clone()),
    )?;
    assert_eq!(store.keys("bucket"), vec!["exports/rows.jsonl.gz"]);
    assert_eq!(
        store.acl_of("bucket", "exports/rows.jsonl.gz"),
        Some(Some("private".to_string()))
    );
    assert_eq!(&store.get_object("bucket", "exports/rows.jsonl.gz")?[..2], &[0x1f, 0x8b]);

    let back = deserialize(
        &dest,
        &DeserializeOptions::new(Format::Jsonl)
            .with_compression(Compression::Gzip)
            .with_io(io.clone()),
    )?
    .into_records()?;
    assert_eq!(back, greetings_as_text());

    let missing = deserialize(
        &Locator::parse("mem://bucket/missing.jsonl")?,
        &DeserializeOptions::new(Format::Jsonl).with_io(io),
    );
    assert!(matches!(missing, Err(Error::Backend(ref e)) if e.kind == StoreErrorKind::NotFound));
    Ok(())
}

#[test]
fn remote_locator_without_store_is_config_error() -> Result<()> {
    let result = deserialize(
        &Locator::parse("mem://bucket/rows.jsonl")?,
        &DeserializeOptions::new(Format::Jsonl),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    Ok(())
}

#[test]
fn rejected_remote_write_is_backend_error() -> Result<()> {
    let store = MemoryObjectStore::new();
    store.reject_writes_under("bucket", "locked/");
    let result = serialize(
        &Locator::parse("mem://bucket/locked/rows.csv")?,
        records(greetings_as_text()),
        &SerializeOptions::new(Format::Csv).with_io(IoContext::new().with_store(Arc::new(store.clone()))),
    );
    assert!(matches!(result, Err(Error::Backend(ref e)) if e.kind == StoreErrorKind::Authorization));
    assert!(store.keys("bucket").is_empty());
    Ok(())
}

fn typed_table() -> Result<RecordBatch> {
    // 2001-01-01 and 2001-01-01T01:01:01.000001
    let amount = Decimal128Array::from(vec![123_456_i128]).with_precision_and_scale(10, 3)?;
    let day = Date32Array::from(vec![11_323]);
    let at = TimestampMicrosecondArray::from(vec![978_310_861_000_001_i64]);
    Ok(RecordBatch::try_from_iter(vec![
        ("amount", Arc::new(amount) as ArrayRef),
        ("day", Arc::new(day) as ArrayRef),
        ("at", Arc::new(at) as ArrayRef),
    ])?)
}

#[test]
fn json_output_uses_configured_formats() -> Result<()> {
    let dir = TempDirPath::new()?;

    let plain = dir.file_path("plain.json");
    serialize(&local(&plain), Data::Table(typed_table()?), &SerializeOptions::new(Format::Json))?;
    assert_eq!(
        read_text(&plain)?,
        r#"[{"amount":123.456,"day":"2001-01-01","at":"2001-01-01T01:01:01.000001"}]"#
    );

    let custom = dir.file_path("custom.json");
    let formats = JsonFormats::from_options([
        "decimal:string",
        "date:%m/%d/%Y",
        "timestamp:%m/%d/%Y %H:%M:%S%.6f",
    ])?;
    serialize(
        &local(&custom),
        Data::Table(typed_table()?),
        &SerializeOptions::new(Format::Json).with_formats(formats),
    )?;
    assert_eq!(
        read_text(&custom)?,
        r#"[{"amount":"123.456","day":"01/01/2001","at":"01/01/2001 01:01:01.000001"}]"#
    );
    Ok(())
}

#[test]
fn nan_policy_controls_non_finite_floats() -> Result<()> {
    let dir = TempDirPath::new()?;
    let table = RecordBatch::try_from_iter(vec![(
        "x",
        Arc::new(Float64Array::from(vec![1.5, f64::NAN])) as ArrayRef,
    )])?;
    let path = dir.file_path("floats.jsonl");

    let strict = serialize(&local(&path), Data::Table(table.clone()), &SerializeOptions::new(Format::Jsonl));
    assert!(matches!(strict, Err(Error::Type(_))));

    serialize(
        &local(&path),
        Data::Table(table),
        &SerializeOptions::new(Format::Jsonl).with_nan(NanPolicy::Null),
    )?;
    assert_eq!(read_records(&local(&path), Format::Jsonl)?, vec![json!({"x": 1.5}), json!({"x": null})]);
    Ok(())
}

#[test]
fn explicit_header_rejects_unlisted_fields_before_writing() -> Result<()> {
    let dir = TempDirPath::new()?;
    let path = dir.file_path("people.csv");
    let rows = vec![json!({"name": "ada"}), json!({"name": "bob", "ssn": "123"})];

    let result = serialize(
        &local(&path),
        records(rows),
        &SerializeOptions::new(Format::Csv).with_columns(["name"]),
    );
    match result {
        Err(Error::Type(msg)) => assert!(msg.contains("ssn"), "{msg}"),
        other => panic!("expected type error, got {other:?}"),
    }
    assert!(!path.exists());

    serialize(
        &local(&path),
        records(vec![json!({"name": "ada"}), json!({"age": "36"})]),
        &SerializeOptions::new(Format::Csv).with_columns(["name", "age"]),
    )?;
    assert_eq!(read_text(&path)?, "name,age\nada,\n,36\n");
    Ok(())
}
