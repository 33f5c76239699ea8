//! Key case conversion at the wire boundary.
//!
//! The cable server speaks snake_case; SDK types are camelCase. Inbound
//! payloads are camelized once before validation and outbound action data
//! is snakeized once before framing. Only object keys change, never values.

use serde_json::{Map, Value};

/// Converts a snake_case key to camelCase.
///
/// Leading underscores are preserved and repeated underscores collapse.
///
/// ```
/// use codecamp_sdk::case::camelize_key;
///
/// assert_eq!(camelize_key("submission_uuid"), "submissionUuid");
/// assert_eq!(camelize_key("num_iterations"), "numIterations");
/// ```
#[must_use]
pub fn camelize_key(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.extend(std::iter::repeat('_').take(key.len() - body.len()));

    let mut upper_next = false;
    for ch in body.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a camelCase key to snake_case.
///
/// ```
/// use codecamp_sdk::case::snakeize_key;
///
/// assert_eq!(snakeize_key("submissionUuid"), "submission_uuid");
/// ```
#[must_use]
pub fn snakeize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively camelizes every object key in `value`.
#[must_use]
pub fn camelize(value: Value) -> Value {
    convert_keys(value, &camelize_key)
}

/// Recursively snakeizes every object key in `value`.
#[must_use]
pub fn snakeize(value: Value) -> Value {
    convert_keys(value, &snakeize_key)
}

fn convert_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (convert(&k), convert_keys(v, convert)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| convert_keys(v, convert))
                .collect(),
        ),
        other => other,
    }
}
