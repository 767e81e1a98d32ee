//! Lifecycle event bus
//!
//! A fixed dispatch table from [`EventKind`] to handlers. Handlers for one
//! kind run synchronously, in the order they were registered.

use super::kind::{EventKind, LifecycleEvent};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Handler function type
pub type Handler = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Event bus for one session
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.entry(kind).or_default().push(Arc::new(handler)),
            Err(_) => warn!("Handler table poisoned, dropping handler for {}", kind),
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .map(|handlers| handlers.get(&kind).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Deliver `event` to every handler for its kind.
    ///
    /// A panicking handler is logged and skipped; the remaining handlers
    /// still run.
    pub fn publish(&self, event: &LifecycleEvent) {
        // Snapshot so handlers may register further handlers without deadlocking
        let handlers: Vec<Handler> = match self.handlers.read() {
            Ok(handlers) => handlers.get(&event.kind).cloned().unwrap_or_default(),
            Err(_) => {
                warn!("Handler table poisoned, dropping {}", event.kind);
                return;
            }
        };

        debug!("Publishing {} to {} handlers", event.kind, handlers.len());

        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!("Handler for {} panicked", event.kind);
            }
        }
    }

    /// Publish every event received on `rx` until the sender side closes.
    #[instrument(skip(self, rx))]
    pub async fn pump(&self, mut rx: mpsc::Receiver<LifecycleEvent>) {
        while let Some(event) = rx.recv().await {
            self.publish(&event);
        }
        debug!("Lifecycle event source closed");
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self.handlers.read().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("EventBus").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_handlers_fire_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let seen = seen.clone();
            bus.on(EventKind::LoadStarted, move |_| seen.lock().unwrap().push(id));
        }

        bus.publish(&LifecycleEvent::bare(EventKind::LoadStarted));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_dispatch_is_by_kind() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            bus.on(EventKind::LoadFinished, move |e| seen.lock().unwrap().push(e.kind));
        }

        bus.publish(&LifecycleEvent::bare(EventKind::LoadStarted));
        bus.publish(&LifecycleEvent::bare(EventKind::LoadFinished));

        assert_eq!(*seen.lock().unwrap(), vec![EventKind::LoadFinished]);
        assert_eq!(bus.handler_count(EventKind::LoadFinished), 1);
        assert_eq!(bus.handler_count(EventKind::Timeout), 0);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_others() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(false));

        bus.on(EventKind::PageError, |_| panic!("handler bug"));
        {
            let reached = reached.clone();
            bus.on(EventKind::PageError, move |_| *reached.lock().unwrap() = true);
        }

        bus.publish(&LifecycleEvent::bare(EventKind::PageError));
        assert!(*reached.lock().unwrap());
    }

    #[tokio::test]
    async fn test_pump_drains_channel() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(Mutex::new(0));
        {
            let count = count.clone();
            bus.on(EventKind::RemoteMessage, move |_| *count.lock().unwrap() += 1);
        }

        let (tx, rx) = mpsc::channel(8);
        let pump = {
            let bus = bus.clone();
            tokio::spawn(async move { bus.pump(rx).await })
        };

        for _ in 0..3 {
            tx.send(LifecycleEvent::bare(EventKind::RemoteMessage)).await.unwrap();
        }
        drop(tx);
        pump.await.unwrap();

        assert_eq!(*count.lock().unwrap(), 3);
    }
}
