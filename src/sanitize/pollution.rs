//! Parameter pollution filtering.
//!
//! A top-level key sent more than once arrives as an array. Unless the key
//! is allow-listed, the array is replaced with its last element and the
//! original array is kept aside for handler-sets that want it.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Collapse polluted keys in `map`. Returns the arrays that were removed.
pub fn collapse(map: &mut Map<String, Value>, allow_list: &HashSet<String>) -> Map<String, Value> {
    let polluted_keys: Vec<String> = map
        .iter()
        .filter(|(key, value)| value.is_array() && !allow_list.contains(key.as_str()))
        .map(|(key, _)| key.clone())
        .collect();

    let mut polluted = Map::new();
    for key in polluted_keys {
        let Some(Value::Array(items)) = map.remove(&key) else {
            continue;
        };
        let last = items.last().cloned();
        polluted.insert(key.clone(), Value::Array(items));
        if let Some(last) = last {
            map.insert(key, last);
        }
    }
    polluted
}
