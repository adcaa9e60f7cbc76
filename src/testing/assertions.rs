//! Assertion functions for comparing record sequences.

use serde_json::Value;
use std::cmp::Ordering;

/// Order rows by the value of `key`: numbers numerically, everything else by
/// JSON text.
fn by_key(key: &str) -> impl Fn(&Value, &Value) -> Ordering + '_ {
    move |a, b| {
        let (a, b) = (&a[key], &b[key]);
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        }
    }
}

/// Sort a copy of `rows` by `key`.
#[must_use]
pub fn sorted_by(rows: &[Value], key: &str) -> Vec<Value> {
    let mut rows = rows.to_vec();
    rows.sort_by(by_key(key));
    rows
}

/// Assert that two record sequences hold the same rows, ignoring row order.
/// Rows are aligned by sorting both sides on `key`.
///
/// # Panics
///
/// Panics if the sequences differ in length or in any row.
///
/// # Example
///
/// ```
/// use recordshift::testing::assert_records_unordered_eq;
/// use serde_json::json;
///
/// let actual = vec![json!({"id": 2}), json!({"id": 1})];
/// let expected = vec![json!({"id": 1}), json!({"id": 2})];
/// assert_records_unordered_eq(&actual, &expected, "id");
/// ```
pub fn assert_records_unordered_eq(actual: &[Value], expected: &[Value], key: &str) {
    let actual = sorted_by(actual, key);
    let expected = sorted_by(expected, key);
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(&expected).enumerate() {
        assert_eq!(a, e, "Row mismatch at sorted position {i}:\n  Expected: {e}\n  Actual: {a}");
    }
}
