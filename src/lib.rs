//! svclog Core - Leveled structured logging for server processes
//!
//! This crate shapes and classifies log records; delivering bytes is left to
//! a [`Sink`]. The implementation prioritizes:
//!
//! 1. **Predictability** - Same record, same output (apart from the timestamp)
//! 2. **Safety** - Sensitive headers are masked, large payloads are cut
//! 3. **Loud failure** - Uncaught failures are logged at the highest severity
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `levels` - Named severity levels and their rank ordering
//! - `format` - Records, the `key=value` stringifier and the format pipeline
//! - `logger` - The service logger, sinks, fault hooks and the `log` bridge
//! - `middleware` - One log record per HTTP request/response exchange
//! - `error` - Error types
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use http::{Method, StatusCode};
//! use svclog_core::{
//!     FaultHub, Logger, LoggerOptions, MemorySink, RequestInfo, RequestLogger, ResponseInfo,
//! };
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Arc::new(
//!     Logger::with_parts(
//!         LoggerOptions::new("pizza-shop").production(true),
//!         sink.clone(),
//!         Arc::new(FaultHub::new()),
//!     )
//!     .unwrap(),
//! );
//!
//! let requests = RequestLogger::new(logger.clone());
//! let in_flight = requests.start(RequestInfo::new(Method::GET, "/404"));
//! in_flight.finish(ResponseInfo::new(StatusCode::NOT_FOUND)).unwrap();
//!
//! let record: serde_json::Value = serde_json::from_str(&sink.stdout()[0]).unwrap();
//! assert_eq!(record["level"], "WARN");
//! assert_eq!(record["logger_name"], "http");
//! ```

pub mod error;
pub mod format;
pub mod levels;
pub mod logger;
pub mod middleware;

pub use error::{LoggerError, Result};
pub use format::{
    stringify_object, stringify_value, Fields, FormatPipeline, FormatStage, LogRecord,
};
pub use levels::{default_levels, Color, Level, LevelRegistry};
pub use logger::{
    install_panic_hook, ConsoleSink, Fault, FaultHub, FaultKind, LogFacade, Logger,
    LoggerConfig, LoggerOptions, MemorySink, Sink, Stream,
};
pub use middleware::{
    GraphQLMeta, InFlightRequest, RedactionRule, RequestInfo, RequestLogger, ResponseInfo,
    VariablesLimit,
};
