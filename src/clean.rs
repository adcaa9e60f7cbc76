//! Record cleaning: drop null-like and blank fields from nested structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which fields [`clean`] removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanPolicy {
    pub drop_nulls: bool,
    pub drop_blanks: bool,
}

impl CleanPolicy {
    #[must_use]
    pub fn new(drop_nulls: bool, drop_blanks: bool) -> Self {
        Self {
            drop_nulls,
            drop_blanks,
        }
    }

    #[must_use]
    pub fn is_noop(self) -> bool {
        !self.drop_nulls && !self.drop_blanks
    }

    fn drops(self, value: &Value) -> bool {
        (self.drop_nulls && is_null_like(value))
            || (self.drop_blanks && matches!(value, Value::String(s) if s.is_empty()))
    }
}

/// Missing-value check. Null slots of a table are materialized as JSON null
/// when the table is converted to records, so this covers them too.
#[must_use]
pub fn is_null_like(value: &Value) -> bool {
    value.is_null()
}

/// Recursively remove object entries the policy drops.
///
/// Arrays are recursed into but their elements are never removed; scalars are
/// returned unchanged. Cleaning is idempotent.
#[must_use]
pub fn clean(value: Value, drop_nulls: bool, drop_blanks: bool) -> Value {
    let mut value = value;
    clean_in_place(&mut value, CleanPolicy::new(drop_nulls, drop_blanks));
    value
}

/// In-place form of [`clean`].
pub fn clean_in_place(value: &mut Value, policy: CleanPolicy) {
    if policy.is_noop() {
        return;
    }
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !policy.drops(v));
            for v in map.values_mut() {
                clean_in_place(v, policy);
            }
        }
        Value::Array(items) => {
            for item in items {
                clean_in_place(item, policy);
            }
        }
        _ => {}
    }
}

/// Clean every row of a record sequence.
pub fn clean_records(records: &mut [Value], policy: CleanPolicy) {
    for record in records {
        clean_in_place(record, policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Value {
        json!({
            "a": null,
            "b": "",
            "c": "keep",
            "d": {"e": null, "f": "", "g": [ {"h": null, "i": 1}, null, "" ]},
            "j": [],
            "k": {}
        })
    }

    #[test]
    fn drops_nulls_and_blanks_recursively() {
        let cleaned = clean(nested(), true, true);
        assert_eq!(
            cleaned,
            json!({
                "c": "keep",
                "d": {"g": [ {"i": 1}, null, "" ]},
                "j": [],
                "k": {}
            })
        );
    }

    #[test]
    fn policies_are_independent() {
        let only_nulls = clean(json!({"a": null, "b": ""}), true, false);
        assert_eq!(only_nulls, json!({"b": ""}));
        let only_blanks = clean(json!({"a": null, "b": ""}), false, true);
        assert_eq!(only_blanks, json!({"a": null}));
        assert_eq!(clean(nested(), false, false), nested());
    }

    #[test]
    fn idempotent() {
        for (n, b) in [(true, true), (true, false), (false, true)] {
            let once = clean(nested(), n, b);
            assert_eq!(clean(once.clone(), n, b), once);
        }
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(clean(json!(null), true, true), json!(null));
        assert_eq!(clean(json!(""), true, true), json!(""));
        assert_eq!(clean(json!(3.5), true, true), json!(3.5));
    }
}
