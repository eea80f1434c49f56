//! Leveled logger.
//!
//! - `config` - options merged over defaults, active level resolution
//! - `sink` - standard/error stream destinations
//! - `fault` - process-wide uncaught-failure notifications
//! - `service_logger` - the [`Logger`] itself
//! - `facade` - bridge so `log` crate macros reach a [`Logger`]

pub mod config;
pub mod facade;
pub mod fault;
pub mod service_logger;
pub mod sink;

pub use config::*;
pub use facade::*;
pub use fault::*;
pub use service_logger::*;
pub use sink::*;
