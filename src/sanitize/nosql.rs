//! Query-operator injection guard.
//!
//! Document stores interpret keys that start with `$` as operators and keys
//! containing `.` as nested paths. Both are removed from client input, at
//! any depth.

use serde_json::{Map, Value};

pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

/// Remove operator keys from `value`, recursively.
pub fn strip_operators(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => strip_operator_keys(map),
        Value::Array(items) => items.iter_mut().map(strip_operators).sum(),
        _ => 0,
    }
}

/// Remove operator keys from `map`, recursively. Returns how many were removed.
pub fn strip_operator_keys(map: &mut Map<String, Value>) -> usize {
    let before = map.len();
    map.retain(|key, _| !is_operator_key(key));
    let mut removed = before - map.len();

    for nested in map.values_mut() {
        removed += strip_operators(nested);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_top_level_operators() {
        let mut value = json!({"email": {"$gt": ""}, "password": "x", "$where": "1"});
        let removed = strip_operators(&mut value);

        assert_eq!(removed, 2);
        assert_eq!(value, json!({"email": {}, "password": "x"}));
    }

    #[test]
    fn test_strips_dotted_keys_in_arrays() {
        let mut value = json!({"lines": [{"item.id": 1, "qty": 2}, {"$ne": null}]});
        strip_operators(&mut value);

        assert_eq!(value, json!({"lines": [{"qty": 2}, {}]}));
    }

    #[test]
    fn test_leaves_operator_looking_values() {
        let mut value = json!({"memo": "$100.00"});
        assert_eq!(strip_operators(&mut value), 0);
        assert_eq!(value, json!({"memo": "$100.00"}));
    }
}
