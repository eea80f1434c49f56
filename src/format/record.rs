//! Per-call log record.
//!
//! A record is built for one log call, rendered once and dropped.

use serde_json::{Map, Value};

use crate::levels::Level;

/// Caller-supplied metadata.
pub type Fields = Map<String, Value>;

/// Metadata key lifted into [`LogRecord::logger_name`].
pub const LOGGER_NAME_KEY: &str = "name";
/// Metadata key lifted into [`LogRecord::request_id`].
pub const REQUEST_ID_KEY: &str = "requestId";
/// Metadata key whose frames populate [`LogRecord::stack_trace`].
pub const STACK_KEY: &str = "stack";

/// A fully resolved log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub service: String,
    pub logger_name: Option<String>,
    pub request_id: Option<Value>,
    /// Remaining metadata; `None` when nothing is left after lifting.
    pub meta: Option<Fields>,
    pub stack_trace: Option<String>,
    /// Metadata exactly as supplied, lifted keys included.
    supplied: Fields,
}

impl LogRecord {
    /// Build a record, lifting `name` and `requestId` out of `fields`.
    pub fn new(level: &Level, service: &str, message: &str, fields: Option<Fields>) -> Self {
        let supplied = fields.unwrap_or_default();
        let mut meta = supplied.clone();

        let logger_name = meta.shift_remove(LOGGER_NAME_KEY).map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });
        let request_id = meta.shift_remove(REQUEST_ID_KEY);
        let stack_trace = meta.get(STACK_KEY).and_then(join_stack);

        Self {
            level: level.clone(),
            message: message.to_string(),
            service: service.to_string(),
            logger_name,
            request_id,
            meta: if meta.is_empty() { None } else { Some(meta) },
            stack_trace,
            supplied,
        }
    }

    /// Metadata as the caller supplied it, in the caller's key order.
    pub fn display_fields(&self) -> &Fields {
        &self.supplied
    }
}

fn join_stack(stack: &Value) -> Option<String> {
    match stack {
        Value::String(s) => Some(s.clone()),
        Value::Array(frames) => Some(
            frames
                .iter()
                .map(|f| match f {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}
