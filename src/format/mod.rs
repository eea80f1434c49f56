//! Record formatting.
//!
//! Turns a [`LogRecord`] into the text that reaches a sink:
//! - `stringify` - flat `key=value` dumps of nested metadata
//! - `record` - the per-call record and its field-lifting rules
//! - `pipeline` - stage selection and composition (color, JSON, plain text)

pub mod pipeline;
pub mod record;
pub mod stringify;

pub use pipeline::*;
pub use record::*;
pub use stringify::*;
