//! `log` crate backend.
//!
//! Lets code that uses `log::info!` and friends write through a [`Logger`].
//! `log` levels map onto the logger's levels by upper-case name, and the
//! emitting module becomes the record's logger name.

use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use serde_json::json;

use crate::format::{Fields, LOGGER_NAME_KEY};

use super::service_logger::Logger;

/// Targets under this prefix are this crate's own diagnostics.
const OWN_TARGET_PREFIX: &str = "svclog_core";

/// Adapter implementing [`log::Log`] on top of a [`Logger`].
#[derive(Debug, Clone)]
pub struct LogFacade {
    logger: Arc<Logger>,
}

impl LogFacade {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    /// Install `logger` as the process-wide `log` backend.
    pub fn install(logger: Arc<Logger>) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(logger)))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

impl Log for LogFacade {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        // Own diagnostics would recurse into the logger.
        !metadata.target().starts_with(OWN_TARGET_PREFIX)
            && self.logger.is_enabled(metadata.level().as_str())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut fields = Fields::new();
        let name = record.module_path().unwrap_or_else(|| record.target());
        fields.insert(LOGGER_NAME_KEY.to_string(), json!(name));

        let _ = self.logger.log_with_fields(
            record.level().as_str(),
            &record.args().to_string(),
            fields,
        );
    }

    fn flush(&self) {}
}

impl Logger {
    /// Install this logger as the process-wide `log` backend.
    pub fn install_as_log_backend(self: Arc<Self>) -> Result<(), SetLoggerError> {
        LogFacade::install(self)
    }
}
