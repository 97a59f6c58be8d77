//! Key-case translation between the wire format and the internal model.
//!
//! The Catalyst wire format uses `camelCase` object keys while everything in
//! this crate (and every DTO built on top of it) uses `snake_case`. Conversion
//! recurses into nested objects and arrays, including objects inside
//! list-valued fields, so normalized payloads are uniform at every depth.

use serde_json::Value;

/// Convert one `camelCase` (or `PascalCase`) identifier to `snake_case`.
///
/// Acronym runs keep a single boundary: `HTTPCode` becomes `http_code`.
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert one `snake_case` identifier to `camelCase`.
#[must_use]
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively rewrite all object keys in `value` to `snake_case`.
#[must_use]
pub fn keys_to_snake(value: Value) -> Value {
    map_keys(value, &camel_to_snake)
}

/// Recursively rewrite all object keys in `value` to `camelCase`.
#[must_use]
pub fn keys_to_camel(value: Value) -> Value {
    map_keys(value, &snake_to_camel)
}

fn map_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (convert(&key), map_keys(val, convert)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| map_keys(item, convert))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_to_snake_basics() {
        assert_eq!(camel_to_snake("reqId"), "req_id");
        assert_eq!(camel_to_snake("userFirstName"), "user_first_name");
        assert_eq!(camel_to_snake("typeId"), "type_id");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("plain"), "plain");
        assert_eq!(camel_to_snake(""), "");
    }

    #[test]
    fn camel_to_snake_acronyms() {
        assert_eq!(camel_to_snake("HTTPCode"), "http_code");
        assert_eq!(camel_to_snake("dataID"), "data_id");
    }

    #[test]
    fn snake_to_camel_basics() {
        assert_eq!(snake_to_camel("req_id"), "reqId");
        assert_eq!(snake_to_camel("user_first_name"), "userFirstName");
        assert_eq!(snake_to_camel("plain"), "plain");
        assert_eq!(snake_to_camel(""), "");
    }

    #[test]
    fn round_trip_common_fields() {
        for field in ["req_id", "type_id", "data_sources", "created_at"] {
            assert_eq!(camel_to_snake(&snake_to_camel(field)), field);
        }
    }

    #[test]
    fn keys_to_snake_recurses_into_arrays() {
        let value = json!({
            "reqId": "abc",
            "data": [
                {"userId": 1, "collections": [{"typeSlug": "x"}]},
                {"userId": 2}
            ],
            "total": 2
        });
        let normalized = keys_to_snake(value);
        assert_eq!(
            normalized,
            json!({
                "req_id": "abc",
                "data": [
                    {"user_id": 1, "collections": [{"type_slug": "x"}]},
                    {"user_id": 2}
                ],
                "total": 2
            })
        );
    }

    #[test]
    fn keys_to_camel_recurses() {
        let value = json!({"type_id": 1, "data_sources": [{"user_id": 7}]});
        assert_eq!(
            keys_to_camel(value),
            json!({"typeId": 1, "dataSources": [{"userId": 7}]})
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(keys_to_snake(json!("reqId")), json!("reqId"));
        assert_eq!(keys_to_snake(json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(keys_to_snake(json!(null)), json!(null));
    }
}
