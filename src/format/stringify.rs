//! Flat `key=value` rendering of nested metadata.
//!
//! Nested objects are spliced into the parent without a key prefix, arrays
//! render as `key=[a, b]`, and empty containers render as `[]`.

use serde_json::{Map, Value};

const SEPARATOR: &str = ", ";

/// Render an object as a single comma-separated `key=value` line.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use svclog_core::stringify_object;
///
/// let meta = json!({"req": {"method": "GET"}, "tags": ["a", "b"], "query": {}});
/// assert_eq!(
///     stringify_object(meta.as_object().unwrap()),
///     "method=GET, tags=[a, b], query=[]"
/// );
/// ```
pub fn stringify_object(obj: &Map<String, Value>) -> String {
    let mut output = Vec::with_capacity(obj.len());

    for (key, value) in obj {
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                output.push(stringify_object(nested));
            }
            Value::Array(items) if !items.is_empty() => {
                output.push(format!("{}=[{}]", key, stringify_items(items)));
            }
            _ => {
                output.push(format!("{}={}", key, stringify_value(Some(value))));
            }
        }
    }

    output.join(SEPARATOR)
}

/// Render a single value. `None` stands for an absent value.
pub fn stringify_value(value: Option<&Value>) -> String {
    let value = match value {
        Some(v) => v,
        None => return "undefined".to_string(),
    };

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{}]", stringify_items(items)),
        Value::Object(obj) if obj.is_empty() => "[]".to_string(),
        Value::Object(obj) => stringify_object(obj),
    }
}

fn stringify_items(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| stringify_value(Some(item)))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
