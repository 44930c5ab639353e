//! Reversible escaping of `.` in metadata keys.
//!
//! The unit store forbids literal periods in field names, so every key in a
//! stored metadata tree has `.` replaced by U+FF0E (FULLWIDTH FULL STOP).
//! Decoding performs the inverse replacement. Both walks visit objects at
//! every depth, including objects nested inside arrays. Values are never
//! touched.

use serde_json::{Map, Value};

/// Substitute stored in place of `.` inside keys.
pub const ESCAPED_DOT: char = '\u{ff0e}';

/// Replace `.` with [`ESCAPED_DOT`] in every key of `metadata`, recursively.
pub fn encode_metadata(metadata: &mut Map<String, Value>) {
    rewrite_map_keys(metadata, '.', ESCAPED_DOT);
}

/// Replace [`ESCAPED_DOT`] with `.` in every key of `metadata`, recursively.
pub fn decode_metadata(metadata: &mut Map<String, Value>) {
    rewrite_map_keys(metadata, ESCAPED_DOT, '.');
}

/// Whether any key at any depth still contains `needle`.
#[cfg(test)]
pub(crate) fn has_key_containing(value: &Value, needle: char) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(k, v)| k.contains(needle) || has_key_containing(v, needle)),
        Value::Array(items) => items.iter().any(|v| has_key_containing(v, needle)),
        _ => false,
    }
}

fn rewrite_keys(value: &mut Value, from: char, to: char) {
    match value {
        Value::Object(map) => rewrite_map_keys(map, from, to),
        Value::Array(items) => {
            for item in items {
                rewrite_keys(item, from, to);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn rewrite_map_keys(map: &mut Map<String, Value>, from: char, to: char) {
    let entries = std::mem::take(map);
    for (key, mut value) in entries {
        rewrite_keys(&mut value, from, to);
        let key = if key.contains(from) {
            key.replace(from, &to.to_string())
        } else {
            key
        };
        map.insert(key, value);
    }
}
