//! Field-level `deserialize_with` helpers for documents and push data the
//! core does not own. A wrong-typed field falls back to its default on its
//! own; the rest of the record still decodes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings as-is, numbers and booleans stringified, anything else empty.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(scalar_text).unwrap_or_default())
}

pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(scalar_text))
}

/// `true`/`false` as booleans, strings (`"true"`, `"1"`, `"yes"`) or numbers.
pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.trim().is_empty())
                .collect(),
        ),
        // Push data flattens arrays into JSON text.
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(inner @ Value::Array(_)) => list(inner),
            _ if s.trim().is_empty() => Some(Vec::new()),
            _ => Some(vec![s]),
        },
        _ => None,
    }
}

pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(list).unwrap_or_default())
}

pub fn opt_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(list))
}

/// Nested objects: a malformed one becomes `T::default()`.
pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "string")]
        name: String,
        #[serde(deserialize_with = "opt_bool")]
        urgent: Option<bool>,
        #[serde(deserialize_with = "string_list")]
        images: Vec<String>,
    }

    fn sample(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numbers_become_text() {
        assert_eq!(sample(json!({"name": 9_171_234_567_u64})).name, "9171234567");
        assert_eq!(sample(json!({"name": {"nested": true}})).name, "");
        assert_eq!(sample(json!({"name": null})).name, "");
    }

    #[test]
    fn booleans_from_strings() {
        assert_eq!(sample(json!({"urgent": "true"})).urgent, Some(true));
        assert_eq!(sample(json!({"urgent": "FALSE"})).urgent, Some(false));
        assert_eq!(sample(json!({"urgent": 1})).urgent, Some(true));
        assert_eq!(sample(json!({"urgent": "maybe"})).urgent, None);
    }

    #[test]
    fn lists_from_arrays_and_text() {
        assert_eq!(
            sample(json!({"images": ["a", "", 3]})).images,
            vec!["a".to_string(), "3".to_string()]
        );
        assert_eq!(
            sample(json!({"images": "[\"a\",\"b\"]"})).images,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(sample(json!({"images": "https://x/a.jpg"})).images, vec!["https://x/a.jpg"]);
        assert!(sample(json!({"images": 5})).images.is_empty());
    }

    #[test]
    fn one_bad_field_keeps_the_others() {
        let s = sample(json!({"name": "ok", "urgent": [1], "images": {"a": 1}}));
        assert_eq!(s.name, "ok");
        assert_eq!(s.urgent, None);
        assert!(s.images.is_empty());
    }
}
