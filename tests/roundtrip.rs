mod common;

use anyhow::Result;
use common::{init_logging, local, read_records, read_text, records};
use recordshift::testing::{assert_records_unordered_eq, greetings, greetings_as_text, numbered, sparse_records};
use recordshift::{
    CleanPolicy, Compression, Data, DeserializeOptions, Error, Format, SerializeOptions, deserialize,
    records_to_table, serialize,
};
use serde_json::json;

#[test]
fn csv_roundtrip_keeps_string_rows() -> Result<()> {
    init_logging();
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("greetings.csv"));

    serialize(&dest, records(greetings_as_text()), &SerializeOptions::new(Format::Csv))?;
    assert_eq!(
        read_text(tmp.path().join("greetings.csv"))?,
        "ciao,hello,order\nsun,world,1\nmoon,world,2\nsun,planet,3\nmoon,planet,4\n"
    );
    assert_eq!(read_records(&dest, Format::Csv)?, greetings_as_text());
    Ok(())
}

#[test]
fn tsv_gzip_roundtrip() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("greetings.tsv.gz"));

    serialize(
        &dest,
        records(greetings_as_text()),
        &SerializeOptions::new(Format::Tsv).with_compression(Compression::Gzip),
    )?;
    let raw = std::fs::read(tmp.path().join("greetings.tsv.gz"))?;
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let back = deserialize(
        &dest,
        &DeserializeOptions::new(Format::Tsv).with_compression(Compression::Gzip),
    )?
    .into_records()?;
    assert_eq!(back, greetings_as_text());
    Ok(())
}

#[test]
fn json_roundtrip_is_exact_for_nested_values() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("doc.json"));
    let doc = json!([
        {"a": 1, "b": [1.5, "x", null, {"c": true}], "d": {"e": {"f": []}}},
        {"a": -2, "z": "last"}
    ]);

    serialize(&dest, Data::from_value(doc.clone()), &SerializeOptions::new(Format::Json))?;
    let back = deserialize(&dest, &DeserializeOptions::new(Format::Json))?;
    assert_eq!(back, Data::from_value(doc));
    Ok(())
}

#[test]
fn json_document_is_written_as_is() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("doc.json"));

    serialize(&dest, Data::from_value(json!({"hello": "world"})), &SerializeOptions::new(Format::Json))?;
    assert_eq!(read_text(tmp.path().join("doc.json"))?, r#"{"hello":"world"}"#);
    assert!(matches!(
        deserialize(&dest, &DeserializeOptions::new(Format::Json))?,
        Data::Document(_)
    ));
    Ok(())
}

#[test]
fn jsonl_gzip_roundtrip() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("rows.jsonl.gz"));

    serialize(
        &dest,
        records(numbered(25)),
        &SerializeOptions::new(Format::Jsonl).with_compression(Compression::Gzip),
    )?;
    let back = deserialize(
        &dest,
        &DeserializeOptions::new(Format::Jsonl).with_compression(Compression::Gzip),
    )?
    .into_records()?;
    assert_eq!(back, numbered(25));
    Ok(())
}

#[test]
fn jsonl_from_table_with_index_and_pretty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let table = records_to_table(&[json!({"hello": "world"}), json!({"hello": "planet"})])?;

    let indexed = local(tmp.path().join("indexed.jsonl"));
    serialize(
        &indexed,
        Data::Table(table.clone()),
        &SerializeOptions::new(Format::Jsonl).with_index(true),
    )?;
    assert_eq!(
        read_text(tmp.path().join("indexed.jsonl"))?,
        "{\"Index\":0,\"hello\":\"world\"}\n{\"Index\":1,\"hello\":\"planet\"}"
    );

    let pretty = local(tmp.path().join("pretty.jsonl"));
    serialize(
        &pretty,
        Data::Table(table),
        &SerializeOptions::new(Format::Jsonl).with_pretty(true),
    )?;
    assert_eq!(
        read_text(tmp.path().join("pretty.jsonl"))?,
        "{\"hello\": \"world\"}\n{\"hello\": \"planet\"}"
    );
    Ok(())
}

#[test]
fn parquet_file_roundtrip_keeps_types() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = local(tmp.path().join("greetings.parquet"));

    serialize(
        &dest,
        records(greetings()),
        &SerializeOptions::new(Format::Parquet).with_compression(Compression::Snappy),
    )?;
    let back = read_records(&dest, Format::Parquet)?;
    assert_records_unordered_eq(&back, &greetings(), "order");

    let table = deserialize(&dest, &DeserializeOptions::new(Format::Parquet).with_as_table(true))?;
    assert!(matches!(table, Data::Table(ref t) if t.num_rows() == 4));
    Ok(())
}

#[test]
fn zero_rows_create_no_file() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    for format in [Format::Csv, Format::Tsv, Format::Jsonl, Format::Parquet] {
        let path = tmp.path().join(format!("empty.{format}"));
        serialize(&local(&path), records(vec![]), &SerializeOptions::new(format))?;
        assert!(!path.exists(), "{format} created a file");
    }
    Ok(())
}

#[test]
fn limit_caps_unpartitioned_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;

    let jsonl = local(tmp.path().join("limited.jsonl"));
    serialize(&jsonl, records(numbered(10)), &SerializeOptions::new(Format::Jsonl).with_limit(3))?;
    assert_eq!(read_records(&jsonl, Format::Jsonl)?, numbered(3));

    let csv = tmp.path().join("limited.csv");
    serialize(&local(&csv), records(numbered(10)), &SerializeOptions::new(Format::Csv).with_limit(3))?;
    assert_eq!(read_text(&csv)?.lines().count(), 4);

    let parquet = local(tmp.path().join("limited.parquet"));
    serialize(&parquet, records(numbered(10)), &SerializeOptions::new(Format::Parquet).with_limit(3))?;
    assert_eq!(read_records(&parquet, Format::Parquet)?, numbered(3));
    Ok(())
}

#[test]
fn missing_parent_needs_makedirs() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let nested = tmp.path().join("a/b/c/out.jsonl");

    let err = serialize(&local(&nested), records(numbered(1)), &SerializeOptions::new(Format::Jsonl))
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");

    serialize(
        &local(&nested),
        records(numbered(1)),
        &SerializeOptions::new(Format::Jsonl).with_makedirs(true),
    )?;
    assert!(nested.exists());
    Ok(())
}

#[test]
fn deserialize_applies_clean_policy() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let src = local(tmp.path().join("sparse.jsonl"));
    serialize(&src, records(sparse_records()), &SerializeOptions::new(Format::Jsonl))?;

    let cleaned = deserialize(
        &src,
        &DeserializeOptions::new(Format::Jsonl)
            .with_drop_nulls(true)
            .with_drop_blanks(true),
    )?
    .into_records()?;
    assert_eq!(
        cleaned,
        vec![
            json!({"id": 1, "name": "alpha", "tags": ["a", ""], "meta": {"y": 1}}),
            json!({"id": 2, "note": "present", "tags": [], "meta": {}}),
            json!({"id": 3, "name": "gamma", "meta": {}}),
        ]
    );
    Ok(())
}

#[test]
fn serialize_cleans_jsonl_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dest = tmp.path().join("clean.jsonl");
    serialize(
        &local(&dest),
        records(vec![json!({"a": null, "b": "", "c": 1})]),
        &SerializeOptions::new(Format::Jsonl).with_clean(CleanPolicy::new(true, true)),
    )?;
    assert_eq!(read_text(&dest)?, r#"{"c":1}"#);
    Ok(())
}

#[test]
fn decode_errors_name_the_line() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bad.jsonl");
    std::fs::write(&path, "{\"a\":1}\n{\"a\":\n")?;

    match deserialize(&local(&path), &DeserializeOptions::new(Format::Jsonl)) {
        Err(Error::Decode(msg)) => assert!(msg.contains("line 2"), "{msg}"),
        other => panic!("expected decode error, got {other:?}"),
    }

    let missing = deserialize(&local(tmp.path().join("nope.csv")), &DeserializeOptions::new(Format::Csv));
    assert!(matches!(missing, Err(Error::Io { .. })));
    Ok(())
}

#[test]
fn invalid_utf8_jsonl_is_a_decode_error() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("latin1.jsonl");
    std::fs::write(&path, b"{\"a\":1}\n{\"a\":\"\xff\xfe\"}\n")?;

    match deserialize(&local(&path), &DeserializeOptions::new(Format::Jsonl)) {
        Err(Error::Decode(msg)) => assert!(msg.contains("line 2"), "{msg}"),
        other => panic!("expected decode error, got {other:?}"),
    }
    Ok(())
}
