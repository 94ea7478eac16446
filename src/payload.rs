//! Bounded snapshots of tool inputs and outputs.
//!
//! Hosts hand the tracker arbitrary JSON-shaped payloads. Nothing raw is kept:
//! every payload is cut down with [`summarize`] before it is stored in the
//! pending map or written to a log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder for payloads that cannot be represented as JSON.
pub const UNSERIALIZABLE: &str = "<unserializable>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryLimits {
    /// Strings longer than this many characters are truncated.
    pub max_string_chars: usize,
    /// Arrays and objects keep at most this many entries.
    pub max_items: usize,
    /// Containers nested deeper than this collapse to a size marker.
    pub max_depth: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_string_chars: 200,
            max_items: 20,
            max_depth: 4,
        }
    }
}

/// Convert any serializable value into a payload, falling back to
/// [`UNSERIALIZABLE`] instead of failing.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(UNSERIALIZABLE.to_string()))
}

/// Produce a bounded copy of `value`.
pub fn summarize(value: &Value, limits: &SummaryLimits) -> Value {
    summarize_at(value, limits, 0)
}

fn summarize_at(value: &Value, limits: &SummaryLimits, depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s, limits.max_string_chars)),
        Value::Array(items) => {
            if depth >= limits.max_depth {
                return Value::String(format!("<{} items>", items.len()));
            }
            let mut out: Vec<Value> = items
                .iter()
                .take(limits.max_items)
                .map(|v| summarize_at(v, limits, depth + 1))
                .collect();
            if items.len() > limits.max_items {
                out.push(Value::String(format!(
                    "... {} more",
                    items.len() - limits.max_items
                )));
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            if depth >= limits.max_depth {
                return Value::String(format!("<{} keys>", map.len()));
            }
            let mut out = Map::new();
            for (key, v) in map.iter().take(limits.max_items) {
                out.insert(key.clone(), summarize_at(v, limits, depth + 1));
            }
            if map.len() > limits.max_items {
                out.insert(
                    "...".to_string(),
                    Value::String(format!("{} more keys", map.len() - limits.max_items)),
                );
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Truncate on a character boundary, appending `...` when anything was cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

/// Byte size reported for a tool output.
///
/// Strings count their UTF-8 bytes; anything else counts its compact JSON
/// encoding. `null` is empty.
pub fn output_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::String(s) => s.len(),
        other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
    }
}

/// One-line rendering used for transcript `Input:` lines.
pub fn inline(value: &Value, max_chars: usize) -> String {
    let rendered = match value {
        Value::Object(map) if map.is_empty() => "(none)".to_string(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", compact(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => "(none)".to_string(),
        other => compact(other),
    };
    truncate(&rendered, max_chars)
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| UNSERIALIZABLE.to_string())
}
