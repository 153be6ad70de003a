//! `Cookie` header parsing.

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap};
use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Parse every `Cookie` header into a name → value map.
///
/// The first occurrence of a name wins. Values are percent-decoded and
/// stripped of surrounding quotes. A value of the form `j:<json>` is
/// parsed as JSON when it is valid JSON.
pub fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, Value> {
    let mut cookies = BTreeMap::new();

    for header in headers.get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };

        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || cookies.contains_key(name) {
                continue;
            }

            let mut value = value.trim();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = &value[1..value.len() - 1];
            }

            let decoded = percent_decode_str(value)
                .decode_utf8()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            cookies.insert(name.to_string(), json_cookie(decoded));
        }
    }

    cookies
}

fn json_cookie(value: String) -> Value {
    if let Some(json) = value.strip_prefix("j:") {
        if let Ok(parsed) = serde_json::from_str::<Value>(json) {
            return parsed;
        }
    }
    Value::String(value)
}
