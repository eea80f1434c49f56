//! The service logger.
//!
//! Owns the level registry, the format pipeline and the sink. Every call is
//! formatted and written synchronously on the calling thread.

use std::process;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::error::{LoggerError, Result};
use crate::format::{Fields, FormatPipeline, LogRecord, LOGGER_NAME_KEY, STACK_KEY};
use crate::levels::{Level, LevelRegistry};

use super::config::{LoggerConfig, LoggerOptions};
use super::fault::{EmitGuard, Fault, FaultHandler, FaultHub, FaultKind, SubscriptionId};
use super::sink::{ConsoleSink, Sink, Stream};

/// Logger name attached to records produced by the fault handler.
pub const FAULT_LOGGER_NAME: &str = "fault";

/// Exit status used when a fault terminates the process.
const FAULT_EXIT_CODE: i32 = 1;

struct LoggerInner {
    config: LoggerConfig,
    pipeline: FormatPipeline,
    sink: RwLock<Option<Arc<dyn Sink>>>,
}

impl LoggerInner {
    fn emit(&self, level_name: &str, message: &str, fields: Option<Fields>) -> Result<()> {
        let _guard = EmitGuard::enter();

        let sink = match self.sink.read().as_ref() {
            Some(sink) => Arc::clone(sink),
            None => return Err(LoggerError::Destroyed),
        };

        let level = self
            .config
            .registry
            .get(level_name)
            .ok_or_else(|| LoggerError::UnknownLevel(level_name.to_string()))?;

        if level.rank < self.config.threshold().rank {
            return Ok(());
        }

        let record = LogRecord::new(level, &self.config.service, message, fields);
        let mut line = self.pipeline.render(&record);
        line.push('\n');

        sink.write(self.stream_for(level), &line)?;
        Ok(())
    }

    fn stream_for(&self, level: &Level) -> Stream {
        if self.config.stderr_levels.contains(&level.name) {
            Stream::Error
        } else {
            Stream::Standard
        }
    }

    fn handle_fault(&self, fault: &Fault) {
        if EmitGuard::is_active() {
            // Raised while this thread was writing a record.
            log::warn!(
                "FAULT_DURING_EMIT service={} kind={}",
                self.config.service,
                fault.kind.as_str()
            );
        } else {
            self.log_fault(fault);
        }

        // A panic ends its thread once unwinding finishes, unless something
        // recovers it.
        if self.config.exit_on_fault && fault.kind != FaultKind::Panic {
            process::exit(FAULT_EXIT_CODE);
        }
    }

    fn log_fault(&self, fault: &Fault) {
        let level = self.config.registry.most_severe().name.clone();

        let mut fields = Fields::new();
        fields.insert(LOGGER_NAME_KEY.to_string(), json!(FAULT_LOGGER_NAME));
        fields.insert("kind".to_string(), json!(fault.kind.as_str()));
        fields.insert(
            STACK_KEY.to_string(),
            Value::Array(fault.stack.iter().map(|f| json!(f)).collect()),
        );

        // Nothing left to report to if this fails.
        let _ = self.emit(&level, &fault.message, Some(fields));
    }
}

/// Leveled logger for one service.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use svclog_core::{FaultHub, Logger, LoggerOptions, MemorySink};
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::with_parts(
///     LoggerOptions::new("pizza-shop").production(false).colorize(false),
///     sink.clone(),
///     Arc::new(FaultHub::new()),
/// )
/// .unwrap();
///
/// logger.info("putting it in the oven").unwrap();
/// assert_eq!(sink.stdout(), vec!["INFO: putting it in the oven\n"]);
/// ```
pub struct Logger {
    inner: Arc<LoggerInner>,
    hub: Arc<FaultHub>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("service", &self.inner.config.service)
            .field("level", &self.inner.config.level)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Logger {
    /// Logger writing to stdout/stderr, subscribed to the global fault hub.
    pub fn new(opts: LoggerOptions) -> Result<Self> {
        Self::with_parts(opts, Arc::new(ConsoleSink), FaultHub::global())
    }

    /// Logger writing to `sink`, subscribed to the global fault hub.
    pub fn with_sink(opts: LoggerOptions, sink: Arc<dyn Sink>) -> Result<Self> {
        Self::with_parts(opts, sink, FaultHub::global())
    }

    /// Logger with an explicit sink and fault hub.
    pub fn with_parts(opts: LoggerOptions, sink: Arc<dyn Sink>, hub: Arc<FaultHub>) -> Result<Self> {
        let config = LoggerConfig::from_options(opts)?;
        let pipeline = FormatPipeline::select(config.is_production, config.colorize);

        log::info!(
            "LOGGER_CREATED service={} level={} production={} stages={:?}",
            config.service,
            config.level,
            config.is_production,
            pipeline.stage_names()
        );

        let inner = Arc::new(LoggerInner {
            config,
            pipeline,
            sink: RwLock::new(Some(sink)),
        });

        let weak: Weak<LoggerInner> = Arc::downgrade(&inner);
        let handler: FaultHandler = Arc::new(move |fault: &Fault| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_fault(fault);
            }
        });
        let subscription = hub.subscribe(handler);

        Ok(Self {
            inner,
            hub,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &LevelRegistry {
        &self.inner.config.registry
    }

    pub fn service(&self) -> &str {
        &self.inner.config.service
    }

    /// Name of the active threshold level.
    pub fn level(&self) -> &str {
        &self.inner.config.level
    }

    /// Whether a call at `level_name` would be written.
    pub fn is_enabled(&self, level_name: &str) -> bool {
        match self.registry().get(level_name) {
            Some(level) => level.rank >= self.inner.config.threshold().rank,
            None => false,
        }
    }

    /// Stream that records at `level_name` are written to.
    pub fn stream_for(&self, level_name: &str) -> Option<Stream> {
        self.registry()
            .get(level_name)
            .map(|level| self.inner.stream_for(level))
    }

    /// Log a plain message at `level_name`.
    pub fn log(&self, level_name: &str, message: &str) -> Result<()> {
        self.inner.emit(level_name, message, None)
    }

    /// Log a message with metadata. `name` and `requestId` become the
    /// record's logger name and request id.
    pub fn log_with_fields(&self, level_name: &str, message: &str, fields: Fields) -> Result<()> {
        self.inner.emit(level_name, message, Some(fields))
    }

    pub fn error(&self, message: &str) -> Result<()> {
        self.log("ERROR", message)
    }

    pub fn warn(&self, message: &str) -> Result<()> {
        self.log("WARN", message)
    }

    pub fn info(&self, message: &str) -> Result<()> {
        self.log("INFO", message)
    }

    pub fn debug(&self, message: &str) -> Result<()> {
        self.log("DEBUG", message)
    }

    pub fn trace(&self, message: &str) -> Result<()> {
        self.log("TRACE", message)
    }

    /// Unsubscribe from the fault hub and release the sink. Later log calls
    /// return [`LoggerError::Destroyed`]. Idempotent.
    pub fn destroy(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.hub.unsubscribe(id);
        }
        if self.inner.sink.write().take().is_some() {
            log::info!("LOGGER_DESTROYED service={}", self.inner.config.service);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.sink.read().is_none()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Fields;
    use crate::logger::sink::MemorySink;
    use serde_json::json;

    fn logger(opts: LoggerOptions) -> (Logger, Arc<MemorySink>, Arc<FaultHub>) {
        let sink = Arc::new(MemorySink::new());
        let hub = Arc::new(FaultHub::new());
        let logger = Logger::with_parts(opts.exit_on_fault(false), sink.clone(), hub.clone()).unwrap();
        (logger, sink, hub)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_development_plain_lines() {
        let (logger, sink, _) = logger(
            LoggerOptions::new("pizza-shop")
                .production(false)
                .colorize(false)
                .level("TRACE"),
        );

        logger.trace("making a salami pizza").unwrap();
        logger.debug("adding salami").unwrap();
        logger.info("putting it in the oven").unwrap();
        logger.warn("don't forget to get it out in time").unwrap();
        logger.error("pizza is burned!").unwrap();

        assert_eq!(
            sink.stdout(),
            vec![
                "TRACE: making a salami pizza\n",
                "DEBUG: adding salami\n",
                "INFO: putting it in the oven\n",
                "WARN: don't forget to get it out in time\n",
            ]
        );
        assert_eq!(sink.stderr(), vec!["ERROR: pizza is burned!\n"]);
    }

    #[test]
    fn test_threshold_by_rank() {
        let (logger, sink, _) = logger(LoggerOptions::new("svc").production(false).colorize(false));
        for name in ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"] {
            logger.log(name, "x").unwrap();
        }
        assert_eq!(sink.stdout().len(), 2);
        assert_eq!(sink.stderr().len(), 1);
        assert!(!logger.is_enabled("DEBUG"));
        assert!(logger.is_enabled("INFO"));
    }

    #[test]
    fn test_unknown_level() {
        let (logger, _, _) = logger(LoggerOptions::new("svc"));
        assert!(matches!(logger.log("FATAL", "x"), Err(LoggerError::UnknownLevel(_))));
        assert!(!logger.is_enabled("FATAL"));
    }

    #[test]
    fn test_fields_become_logger_name() {
        let (logger, sink, _) = logger(LoggerOptions::new("pizza-shop").production(true));
        logger
            .log_with_fields("TRACE", "Making a salami pizza", fields(json!({"name": "cook"})))
            .unwrap();

        let parsed: Value = serde_json::from_str(&sink.stdout()[0]).unwrap();
        assert_eq!(parsed["logger_name"], "cook");
        assert_eq!(parsed["message"], "Making a salami pizza");
        assert!(parsed.get("meta").is_none());
    }

    #[test]
    fn test_custom_stderr_levels() {
        let (logger, sink, _) = logger(
            LoggerOptions::new("svc")
                .production(false)
                .colorize(false)
                .stderr_levels(&["ERROR", "WARN"]),
        );
        logger.warn("careful").unwrap();
        assert_eq!(sink.stderr(), vec!["WARN: careful\n"]);
        assert_eq!(logger.stream_for("INFO"), Some(Stream::Standard));
    }

    #[test]
    fn test_destroy_fails_loudly() {
        let (logger, sink, hub) = logger(LoggerOptions::new("svc"));
        assert_eq!(hub.subscriber_count(), 1);

        logger.destroy();
        logger.destroy();

        assert!(logger.is_destroyed());
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(logger.error("late"), Err(LoggerError::Destroyed)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (logger, _, hub) = logger(LoggerOptions::new("svc"));
        drop(logger);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_fault_logged_at_most_severe_level() {
        let (_logger, sink, hub) = logger(LoggerOptions::new("svc").production(true));

        hub.notify(&Fault::new(
            FaultKind::Panic,
            "index out of bounds",
            vec!["panicked at src/main.rs:3:5".to_string(), "0: main".to_string()],
        ));

        let lines = sink.stderr();
        assert_eq!(lines.len(), 1);
        let parsed: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["logger_name"], FAULT_LOGGER_NAME);
        assert_eq!(parsed["message"], "index out of bounds");
        assert_eq!(parsed["stack_trace"], "panicked at src/main.rs:3:5\n0: main");
        assert_eq!(parsed["meta"]["kind"], "panic");
    }

    #[test]
    fn test_panic_fault_does_not_exit() {
        let sink = Arc::new(MemorySink::new());
        let hub = Arc::new(FaultHub::new());
        let logger =
            Logger::with_parts(LoggerOptions::new("svc").production(true), sink.clone(), hub.clone())
                .unwrap();
        assert!(logger.config().exit_on_fault);

        hub.notify(&Fault::new(FaultKind::Panic, "handler failed", vec![]));

        assert_eq!(sink.stderr().len(), 1);
        logger.info("still serving").unwrap();
        assert_eq!(sink.stdout().len(), 1);
    }

    /// Sink that reports a fault from inside every write.
    struct NotifyingSink {
        hub: Arc<FaultHub>,
        lines: MemorySink,
    }

    impl Sink for NotifyingSink {
        fn write(&self, stream: Stream, line: &str) -> std::io::Result<()> {
            self.lines.write(stream, line)?;
            self.hub
                .notify(&Fault::new(FaultKind::Panic, "sink failed", vec![]));
            Ok(())
        }
    }

    #[test]
    fn test_fault_raised_inside_write_is_not_logged() {
        let hub = Arc::new(FaultHub::new());
        let sink = Arc::new(NotifyingSink {
            hub: hub.clone(),
            lines: MemorySink::new(),
        });
        let logger = Logger::with_parts(
            LoggerOptions::new("svc").production(false).colorize(false),
            sink.clone(),
            hub.clone(),
        )
        .unwrap();

        logger.warn("careful").unwrap();

        assert_eq!(sink.lines.stdout(), vec!["WARN: careful\n"]);
        assert!(sink.lines.stderr().is_empty());
    }

    #[test]
    fn test_loggers_do_not_share_fault_handlers() {
        let (first, first_sink, hub) = logger(LoggerOptions::new("a").production(true));
        let second_sink = Arc::new(MemorySink::new());
        let second = Logger::with_parts(
            LoggerOptions::new("b").production(true).exit_on_fault(false),
            second_sink.clone(),
            hub.clone(),
        )
        .unwrap();

        first.destroy();
        hub.notify(&Fault::new(FaultKind::UnhandledRejection, "lost", vec![]));

        assert!(first_sink.is_empty());
        assert_eq!(second_sink.stderr().len(), 1);
        drop(second);
    }
}
