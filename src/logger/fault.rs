//! Process-wide fault notifications.
//!
//! A [`FaultHub`] fans uncaught failures out to subscribed handlers. Loggers
//! subscribe while alive and unsubscribe on teardown, so handlers never leak
//! across logger instances. Panics reach the global hub once
//! [`install_panic_hook`] has run; async runtimes report unhandled task
//! failures through [`FaultHub::notify`].

use std::backtrace::Backtrace;
use std::cell::Cell;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// What kind of failure escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Panic,
    UnhandledRejection,
}

impl FaultKind {
    pub fn as_str(&self) -> &str {
        match self {
            FaultKind::Panic => "panic",
            FaultKind::UnhandledRejection => "unhandled_rejection",
        }
    }
}

/// An uncaught failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
    /// Stack frames, outermost first.
    pub stack: Vec<String>,
}

impl Fault {
    pub fn new(kind: FaultKind, message: &str, stack: Vec<String>) -> Self {
        Self {
            kind,
            message: message.to_string(),
            stack,
        }
    }

    /// Build a fault from an error; the source chain becomes the stack.
    pub fn from_error(kind: FaultKind, err: &(dyn Error + 'static)) -> Self {
        let mut stack = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        Self {
            kind,
            message: err.to_string(),
            stack,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Callback invoked for every fault. Must not panic.
pub type FaultHandler = Arc<dyn Fn(&Fault) + Send + Sync>;

/// Handle returned by [`FaultHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out channel for uncaught failures.
#[derive(Default)]
pub struct FaultHub {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, FaultHandler)>>,
}

impl fmt::Debug for FaultHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

lazy_static! {
    static ref GLOBAL_FAULT_HUB: Arc<FaultHub> = Arc::new(FaultHub::new());
}

impl FaultHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hub fed by the panic hook.
    pub fn global() -> Arc<FaultHub> {
        Arc::clone(&GLOBAL_FAULT_HUB)
    }

    pub fn subscribe(&self, handler: FaultHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        log::debug!("FAULT_SUBSCRIBED id={}", id.0);
        id
    }

    /// Remove a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        let removed = handlers.len() != before;
        log::debug!("FAULT_UNSUBSCRIBED id={} removed={}", id.0, removed);
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Deliver `fault` to every handler. Returns the number of handlers run.
    pub fn notify(&self, fault: &Fault) -> usize {
        // Handlers run outside the lock so they may (un)subscribe.
        let handlers: Vec<FaultHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        for handler in &handlers {
            handler(fault);
        }
        handlers.len()
    }
}

thread_local! {
    static EMIT_DEPTH: Cell<u32> = Cell::new(0);
}

/// Marks the current thread as writing a log record.
///
/// Faults raised on this thread while a guard is alive are not delivered to
/// loggers: the sink may still hold its own locks.
pub(crate) struct EmitGuard {
    _private: (),
}

impl EmitGuard {
    pub(crate) fn enter() -> Self {
        EMIT_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self { _private: () }
    }

    pub(crate) fn is_active() -> bool {
        EMIT_DEPTH.try_with(|depth| depth.get() > 0).unwrap_or(false)
    }
}

impl Drop for EmitGuard {
    fn drop(&mut self) {
        let _ = EMIT_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

static PANIC_HOOK: Once = Once::new();

/// Route panics to [`FaultHub::global`].
///
/// Idempotent. When the global hub has no subscribers, or the panic started
/// while this thread was writing a record, the previously installed hook runs
/// instead.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if EmitGuard::is_active() {
                previous(info);
                return;
            }

            let payload = info.payload();
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "Box<dyn Any>".to_string()
            };

            let mut stack = Vec::new();
            if let Some(location) = info.location() {
                stack.push(format!(
                    "panicked at {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ));
            }
            stack.extend(
                Backtrace::force_capture()
                    .to_string()
                    .lines()
                    .map(|l| l.to_string()),
            );

            let fault = Fault::new(FaultKind::Panic, &message, stack);
            if FaultHub::global().notify(&fault) == 0 {
                previous(info);
            }
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_notify_unsubscribe() {
        let hub = FaultHub::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = hub.subscribe(Arc::new(move |_fault: &Fault| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let fault = Fault::new(FaultKind::Panic, "boom", vec![]);
        assert_eq!(hub.notify(&fault), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.notify(&fault), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let hub = Arc::new(FaultHub::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let hub_ref = Arc::clone(&hub);
        let slot_ref = Arc::clone(&slot);
        let id = hub.subscribe(Arc::new(move |_fault: &Fault| {
            if let Some(id) = *slot_ref.lock() {
                hub_ref.unsubscribe(id);
            }
        }));
        *slot.lock() = Some(id);

        hub.notify(&Fault::new(FaultKind::UnhandledRejection, "x", vec![]));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_guard_nests() {
        assert!(!EmitGuard::is_active());
        let outer = EmitGuard::enter();
        {
            let _inner = EmitGuard::enter();
            assert!(EmitGuard::is_active());
        }
        assert!(EmitGuard::is_active());
        drop(outer);
        assert!(!EmitGuard::is_active());
    }

    #[test]
    fn test_emit_guard_is_per_thread() {
        let _guard = EmitGuard::enter();
        let other = std::thread::spawn(EmitGuard::is_active).join().unwrap();
        assert!(!other);
    }

    #[test]
    fn test_fault_from_error_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "request failed")
            }
        }
        impl Error for Outer {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "socket closed"));
        let fault = Fault::from_error(FaultKind::UnhandledRejection, &err);

        assert_eq!(fault.message, "request failed");
        assert_eq!(fault.stack, vec!["request failed", "caused by: socket closed"]);
        assert_eq!(fault.to_string(), "unhandled_rejection: request failed");
    }
}
