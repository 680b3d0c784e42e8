//! Text helpers for turning JSON documents into displayable rows.

use serde_json::{Map, Value};

/// Column title for a response key: `.` and `_` become spaces, then every
/// word is capitalized (`docs.count` → `Docs Count`, `load_1m` → `Load 1M`).
pub fn title_from_key(key: &str) -> String {
    let spaced = key.replace(['.', '_'], " ");
    let mut title = String::with_capacity(spaced.len());
    let mut previous_cased = false;

    for c in spaced.chars() {
        if c.is_alphabetic() {
            if previous_cased {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            title.push(c);
            previous_cased = false;
        }
    }
    title
}

/// Flatten nested objects into dotted keys. Arrays are kept as values.
pub fn flatten_json(map: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, map);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(flat, Some(&key), inner),
            other => {
                flat.insert(key, other.clone());
            }
        }
    }
}

/// Render a JSON value as a table cell.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Prefix `name` with `prefix.` unless it already starts with `prefix`.
pub fn ensure_prefix(name: &str, prefix: &str) -> String {
    if name.starts_with(prefix) {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_from_key() {
        assert_eq!(title_from_key("docs.count"), "Docs Count");
        assert_eq!(title_from_key("pri.store.size"), "Pri Store Size");
        assert_eq!(title_from_key("load_1m"), "Load 1M");
        assert_eq!(title_from_key("health"), "Health");
        assert_eq!(title_from_key("UUID"), "Uuid");
    }

    #[test]
    fn test_flatten_json() {
        let value = json!({
            "status": "green",
            "nodes": {"count": {"total": 3}, "plugins": [{"name": "x"}]},
            "empty": {}
        });
        let flat = flatten_json(value.as_object().unwrap());

        assert_eq!(flat["status"], "green");
        assert_eq!(flat["nodes.count.total"], 3);
        assert!(flat["nodes.plugins"].is_array());
        assert_eq!(flat["empty"], json!({}));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!("open")), "open");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!(true)), "true");
    }

    #[test]
    fn test_ensure_prefix() {
        assert_eq!(
            ensure_prefix("org.elasticsearch.discovery", "logger"),
            "logger.org.elasticsearch.discovery"
        );
        assert_eq!(ensure_prefix("logger._root", "logger"), "logger._root");
    }
}
