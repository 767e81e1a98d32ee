//! Page readiness tracking
//!
//! A single flag that reads "not ready" between a navigation starting and
//! finishing. Only the lifecycle handlers in [`crate::events::subscriber`]
//! write it; everything else reads.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Shared readiness flag for one session.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    ready: Arc<AtomicBool>,
}

impl ReadinessTracker {
    /// Create a tracker in the ready state (no navigation pending).
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Current state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_loading(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    pub(crate) fn mark_loaded(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Yield to the scheduler every `poll_interval` until the flag reads
    /// ready, then run `on_ready` exactly once.
    ///
    /// There is no timeout here; bound the returned future with the driver's
    /// native wait (see [`crate::session::Session::wait_for_page_load`]).
    pub fn await_ready<F, R>(&self, poll_interval: Duration, on_ready: F) -> impl Future<Output = R>
    where
        F: FnOnce() -> R,
    {
        let tracker = self.clone();
        async move {
            while !tracker.is_ready() {
                trace!("Page not ready, polling again in {:?}", poll_interval);
                tokio::time::sleep(poll_interval).await;
            }
            on_ready()
        }
    }
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}
