//! Tolerant field decoding for model-produced records
//!
//! Generative models rarely respect a schema exactly: numbers show up where
//! strings were requested, lists arrive as a single string, and missing values
//! are written as `""` or `"null"`. These helpers accept those shapes instead
//! of rejecting the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A structured list element that can also be written as bare text
pub(crate) trait ListItem: DeserializeOwned + PartialEq {
    /// Build the item from a bare string (e.g. a pest given only by name)
    fn from_text(text: String) -> Self;

    /// True when every field of the item is empty
    fn is_blank(&self) -> bool;
}

/// Convert a JSON value into a trimmed string, treating blanks as missing
pub(crate) fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        other @ Value::Object(_) => Some(other.to_string()),
    }
}

pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// A list of strings; accepts a single string and drops blanks and duplicates
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };

    let mut out: Vec<String> = Vec::new();
    for item in items {
        if let Some(text) = value_to_string(item) {
            if !out.contains(&text) {
                out.push(text);
            }
        }
    }
    Ok(out)
}

/// A list of structured items; bare strings become items, invalid entries are skipped
pub(crate) fn item_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: ListItem,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };

    let mut out: Vec<T> = Vec::new();
    for item in items {
        if let Some(parsed) = item_from_value::<T>(item) {
            if !out.contains(&parsed) {
                out.push(parsed);
            }
        }
    }
    Ok(out)
}

/// An optional structured group that may also be given as bare text
pub(crate) fn opt_item<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: ListItem,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(item_from_value))
}

/// A nested attribute group; anything that is not an object decodes as empty
pub(crate) fn group<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(object @ Value::Object(_)) => serde_json::from_value(object).unwrap_or_default(),
        _ => T::default(),
    })
}

fn item_from_value<T: ListItem>(value: Value) -> Option<T> {
    let item = match value {
        Value::Object(_) => serde_json::from_value::<T>(value).ok()?,
        other => T::from_text(value_to_string(other)?),
    };
    if item.is_blank() {
        None
    } else {
        Some(item)
    }
}
