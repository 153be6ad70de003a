//! Markup neutralisation.
//!
//! Every `<` in a string value or key is replaced with `&lt;`, at any depth.
//! Nothing else is rewritten, so data stays readable.

use serde_json::{Map, Value};

pub fn escape_str(input: &str) -> String {
    input.replace('<', "&lt;")
}

/// Escape markup in `value`, recursively.
pub fn escape_markup(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('<') {
                *s = escape_str(s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(escape_markup),
        Value::Object(map) => escape_map(map),
        _ => {}
    }
}

/// Escape markup in keys and values of `map`, recursively.
pub fn escape_map(map: &mut Map<String, Value>) {
    let entries = std::mem::take(map);
    for (key, mut value) in entries {
        escape_markup(&mut value);
        let key = if key.contains('<') { escape_str(&key) } else { key };
        map.insert(key, value);
    }
}
