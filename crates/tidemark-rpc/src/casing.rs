//! Wire-key casing dialects.
//!
//! Older daemons speak kebab-case (`download-dir`) and camelCase
//! (`altSpeedDown`); newer ones expect snake_case arguments. Outgoing keys
//! are rewritten once the learned protocol version reaches
//! [`SNAKE_CASE_RPC_VERSION`]; incoming keys are always read defensively via
//! [`field`], so the sync layer never notices which dialect answered.

use serde_json::{Map, Value};

/// First protocol version whose servers expect snake_case argument keys.
pub const SNAKE_CASE_RPC_VERSION: i64 = 18;

/// Rewrite one kebab- or camel-case key to snake_case.
///
/// Kebab segments map `-` to `_`; camel segments gain a `_` before each
/// uppercase letter, which is lower-cased. The transform is pure and
/// reversible by convention.
#[must_use]
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch == '-' {
            out.push('_');
        } else if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rewrite every key of an argument map to snake_case, recursing into
/// nested objects and arrays.
#[must_use]
pub fn snake_case_keys(arguments: Map<String, Value>) -> Map<String, Value> {
    arguments
        .into_iter()
        .map(|(key, value)| (to_snake_case(&key), snake_case_value(value)))
        .collect()
}

fn snake_case_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(snake_case_keys(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_value).collect()),
        other => other,
    }
}

/// Look up a response field by its canonical (kebab or camel) name, trying
/// the snake_case variant first and the literal spelling second.
#[must_use]
pub fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(&to_snake_case(key)).or_else(|| map.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kebab_keys_become_snake() {
        assert_eq!(to_snake_case("download-dir"), "download_dir");
        assert_eq!(to_snake_case("peer-limit-global"), "peer_limit_global");
    }

    #[test]
    fn camel_keys_become_snake() {
        assert_eq!(to_snake_case("altSpeedDown"), "alt_speed_down");
        assert_eq!(to_snake_case("queuePosition"), "queue_position");
    }

    #[test]
    fn already_snake_keys_are_untouched() {
        assert_eq!(to_snake_case("alt_speed_down"), "alt_speed_down");
    }

    #[test]
    fn nested_objects_are_rewritten() {
        let mut arguments = Map::new();
        arguments.insert(
            "speed-limit".to_string(),
            json!({"rateDown": 10, "items": [{"peer-limit": 3}]}),
        );
        let rewritten = snake_case_keys(arguments);
        let nested = rewritten
            .get("speed_limit")
            .and_then(Value::as_object)
            .expect("nested object");
        assert!(nested.contains_key("rate_down"));
        let item = nested["items"][0].as_object().expect("nested array item");
        assert!(item.contains_key("peer_limit"));
    }

    #[test]
    fn field_lookup_prefers_snake_then_falls_back() {
        let snake: Map<String, Value> =
            serde_json::from_value(json!({"download_dir": "/snake"})).expect("map");
        let kebab: Map<String, Value> =
            serde_json::from_value(json!({"download-dir": "/kebab"})).expect("map");
        assert_eq!(field(&snake, "download-dir"), Some(&json!("/snake")));
        assert_eq!(field(&kebab, "download-dir"), Some(&json!("/kebab")));
        assert_eq!(field(&kebab, "missing"), None);
    }
}
