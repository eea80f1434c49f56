//! Request-logging middleware.
//!
//! Turns one request/response exchange into one log record:
//! - `exchange` - the request and response data the middleware observes
//! - `redact` - header masking
//! - `graphql` - operation detection and variables size limits
//! - `request_logger` - level selection, metadata assembly and emission

pub mod exchange;
pub mod graphql;
pub mod redact;
pub mod request_logger;

pub use exchange::*;
pub use graphql::*;
pub use redact::*;
pub use request_logger::*;
