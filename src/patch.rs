//! Patch operations over instance documents.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A single patch operation. Paths name a top-level key, optionally with a
/// leading `/` and JSON Pointer escaping (`~1` for `/`, `~0` for `~`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Replace { path: String, value: Value },
    Remove { path: String },
    Add { path: String, value: Value },
}

/// Decode a JSON array of patch operations.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` for anything that is not a list of
/// well-formed `replace`/`remove`/`add` operations.
pub fn parse_patch(value: &Value) -> Result<Vec<PatchOp>, ApiError> {
    if !value.is_array() {
        return Err(ApiError::bad_request(
            "patch must be a list of operations",
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::bad_request(format!("malformed patch operation: {}", e)))
}

/// Apply `ops` to a copy of `doc`.
///
/// `add` on an existing key merges both values into a deduplicated, sorted list.
pub fn apply_patch(doc: &Map<String, Value>, ops: &[PatchOp]) -> Map<String, Value> {
    let mut patched = doc.clone();
    for op in ops {
        match op {
            PatchOp::Replace { path, value } => {
                patched.insert(key_of(path), value.clone());
            }
            PatchOp::Remove { path } => {
                patched.remove(&key_of(path));
            }
            PatchOp::Add { path, value } => {
                let key = key_of(path);
                let merged = match patched.remove(&key) {
                    Some(existing) => union(existing, value.clone()),
                    None => value.clone(),
                };
                patched.insert(key, merged);
            }
        }
    }
    patched
}

fn key_of(path: &str) -> String {
    path.strip_prefix('/')
        .unwrap_or(path)
        .replace("~1", "/")
        .replace("~0", "~")
}

fn union(existing: Value, added: Value) -> Value {
    let mut values = Vec::new();
    for v in flatten(existing).into_iter().chain(flatten(added)) {
        if !values.contains(&v) {
            values.push(v);
        }
    }
    values.sort_by(compare);
    Value::Array(values)
}

fn flatten(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        other => vec![other],
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn ops(value: Value) -> Vec<PatchOp> {
        parse_patch(&value).unwrap()
    }

    #[test]
    fn replace_value() {
        let patched = apply_patch(
            &doc(json!({"age": 4, "name": "Flipper"})),
            &ops(json!([{"op": "replace", "path": "age", "value": 5}])),
        );
        assert_eq!(Value::Object(patched), json!({"age": 5, "name": "Flipper"}));
    }

    #[test]
    fn remove_key() {
        let patched = apply_patch(
            &doc(json!({"age": 4, "name": "Flipper"})),
            &ops(json!([{"op": "remove", "path": "/age"}])),
        );
        assert_eq!(Value::Object(patched), json!({"name": "Flipper"}));
    }

    #[test]
    fn add_to_existing_scalar_makes_sorted_union() {
        let patched = apply_patch(
            &doc(json!({"friends": "Zeca"})),
            &ops(json!([{"op": "add", "path": "friends", "value": ["Ana", "Zeca"]}])),
        );
        assert_eq!(patched["friends"], json!(["Ana", "Zeca"]));

        let patched = apply_patch(
            &doc(json!({"n": [3, 1]})),
            &ops(json!([{"op": "add", "path": "n", "value": 2}])),
        );
        assert_eq!(patched["n"], json!([1, 2, 3]));
    }

    #[test]
    fn add_new_key_keeps_value() {
        let patched = apply_patch(
            &doc(json!({})),
            &ops(json!([{"op": "add", "path": "/upper:name", "value": "Flipper"}])),
        );
        assert_eq!(patched["upper:name"], "Flipper");
    }

    #[test]
    fn escaped_paths() {
        let patched = apply_patch(
            &doc(json!({"http://example.org/a": 1})),
            &ops(json!([{"op": "remove", "path": "/http:~1~1example.org~1a"}])),
        );
        assert!(patched.is_empty());
    }

    #[test]
    fn input_is_not_mutated() {
        let original = doc(json!({"age": 4}));
        let _ = apply_patch(&original, &ops(json!([{"op": "remove", "path": "age"}])));
        assert_eq!(original["age"], 4);
    }

    #[test]
    fn malformed_operations_are_bad_requests() {
        for bad in [
            json!({"op": "replace", "path": "age", "value": 5}),
            json!([{"op": "move", "path": "age"}]),
            json!([{"op": "replace", "path": "age"}]),
            json!([{"path": "age", "value": 1}]),
        ] {
            let err = parse_patch(&bad).unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
    }
}
