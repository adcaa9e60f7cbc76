//! Pre-built record sets for common testing scenarios.

use serde_json::{Value, json};

/// Four greetings keyed by `hello` and `ciao`, ordered by `order`.
///
/// The usual input of partitioned writes: partition by `hello`, row-group by
/// `ciao`.
///
/// # Example
///
/// ```
/// use recordshift::testing::greetings;
///
/// assert_eq!(greetings().len(), 4);
/// ```
#[must_use]
pub fn greetings() -> Vec<Value> {
    vec![
        json!({"hello": "world", "ciao": "sun", "order": 1}),
        json!({"hello": "world", "ciao": "moon", "order": 2}),
        json!({"hello": "planet", "ciao": "sun", "order": 3}),
        json!({"hello": "planet", "ciao": "moon", "order": 4}),
    ]
}

/// [`greetings`] with every value as a string, the shape delimited text
/// reads back.
#[must_use]
pub fn greetings_as_text() -> Vec<Value> {
    greetings()
        .into_iter()
        .map(|row| match row {
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| {
                        let text = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, Value::String(text))
                    })
                    .collect(),
            ),
            other => other,
        })
        .collect()
}

/// `n` rows `{"id": i, "group": i % 2, "name": "row-i"}`.
#[must_use]
pub fn numbered(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| json!({"id": i, "group": i % 2, "name": format!("row-{i}")}))
        .collect()
}

/// Nested rows with nulls and blank strings at several depths.
#[must_use]
pub fn sparse_records() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "alpha", "note": null, "tags": ["a", ""], "meta": {"x": "", "y": 1}}),
        json!({"id": 2, "name": "", "note": "present", "tags": [], "meta": {"x": null}}),
        json!({"id": 3, "name": "gamma", "note": null, "tags": null, "meta": {}}),
    ]
}
