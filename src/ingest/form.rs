//! URL-encoded key/value parsing, shared by query strings and form bodies.

use serde_json::{Map, Value};

/// Deepest bracket nesting expanded into objects.
const MAX_DEPTH: usize = 5;

/// Parse `a=1&b=2` into an object.
///
/// - A repeated key becomes an array in arrival order.
/// - `key[]` is always an array, even with a single value.
/// - `key[child]` nests: `price[gte]=10` becomes `{"price": {"gte": "10"}}`.
/// - Empty names are skipped.
pub fn parse_pairs(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();

    for (key, value) in url::form_urlencoded::parse(input) {
        if key.is_empty() {
            continue;
        }
        let value = Value::String(value.into_owned());
        match split_key(&key) {
            Some((root, path)) => insert_path(&mut map, root.to_string(), &path, value),
            None => insert_value(&mut map, key.into_owned(), value, false),
        }
    }

    map
}

/// Split `a[b][c]` into `("a", ["b", "c"])`. `None` for plain or malformed keys.
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let open = key.find('[')?;
    let (root, mut rest) = key.split_at(open);
    if root.is_empty() {
        return None;
    }

    let mut path = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if path.len() > MAX_DEPTH {
        return None;
    }
    Some((root, path))
}

fn insert_path(map: &mut Map<String, Value>, key: String, path: &[&str], value: Value) {
    match path.split_first() {
        None => insert_value(map, key, value, false),
        Some((&"", [])) => insert_value(map, key, value, true),
        Some((&"", _)) => {}
        Some((child, tail)) => {
            let entry = map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            // A scalar or array already under this key keeps its shape.
            if let Value::Object(inner) = entry {
                insert_path(inner, child.to_string(), tail, value);
            }
        }
    }
}

/// Insert `value` under `key`, turning repeats into an array.
pub fn insert_value(map: &mut Map<String, Value>, key: String, value: Value, force_array: bool) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            let value = if force_array { Value::Array(vec![value]) } else { value };
            map.insert(key, value);
        }
    }
}
