//! Lifecycle event types

use serde_json::Value;
use std::fmt;

/// Tag for every lifecycle event the driver raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Main-frame navigation began
    LoadStarted,
    /// Main-frame navigation completed (successfully or not)
    LoadFinished,
    /// A new document was committed in the main frame
    PageInitialized,
    /// Uncaught exception in page script
    PageError,
    /// Driver-level error with no more specific kind
    Error,
    /// The run exceeded its overall step timeout
    Timeout,
    /// A native wait exceeded the wait timeout
    WaitTimeout,
    /// The completion callback of a run failed
    CompleteError,
    /// Navigation could not be started or committed
    LoadFailed,
    /// A scripted step returned an error
    StepError,
    /// A sub-resource failed to load
    ResourceError,
    /// Console output from page script
    RemoteMessage,
    /// `alert()` from page script
    RemoteAlert,
    /// A sub-resource request was issued
    ResourceRequested,
    /// A sub-resource response arrived
    ResourceReceived,
}

impl EventKind {
    /// Every kind, in subscription order.
    pub const ALL: [EventKind; 15] = [
        EventKind::PageInitialized,
        EventKind::PageError,
        EventKind::Timeout,
        EventKind::WaitTimeout,
        EventKind::CompleteError,
        EventKind::LoadFailed,
        EventKind::StepError,
        EventKind::ResourceError,
        EventKind::Error,
        EventKind::RemoteMessage,
        EventKind::RemoteAlert,
        EventKind::LoadStarted,
        EventKind::LoadFinished,
        EventKind::ResourceRequested,
        EventKind::ResourceReceived,
    ];

    /// Dotted event name
    pub fn name(self) -> &'static str {
        match self {
            EventKind::LoadStarted => "load.started",
            EventKind::LoadFinished => "load.finished",
            EventKind::PageInitialized => "page.initialized",
            EventKind::PageError => "page.error",
            EventKind::Error => "error",
            EventKind::Timeout => "timeout",
            EventKind::WaitTimeout => "waitFor.timeout",
            EventKind::CompleteError => "complete.error",
            EventKind::LoadFailed => "load.failed",
            EventKind::StepError => "step.error",
            EventKind::ResourceError => "resource.error",
            EventKind::RemoteMessage => "remote.message",
            EventKind::RemoteAlert => "remote.alert",
            EventKind::ResourceRequested => "resource.requested",
            EventKind::ResourceReceived => "resource.received",
        }
    }

    /// Look a kind up by its dotted name.
    pub fn from_name(name: &str) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    /// Event tag
    pub kind: EventKind,
    /// Event data (error object, request, message text ...)
    pub payload: Value,
    /// Stack trace, for script errors
    pub trace: Option<Value>,
}

impl LifecycleEvent {
    /// Create an event without a stack trace
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            trace: None,
        }
    }

    /// Event with no payload
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Attach a stack trace
    pub fn with_trace(mut self, trace: Value) -> Self {
        self.trace = Some(trace);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_and_round_trip() {
        let names: HashSet<_> = EventKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("load.unknown"), None);
    }

    #[test]
    fn test_builder() {
        let event = LifecycleEvent::new(EventKind::PageError, serde_json::json!("boom"))
            .with_trace(serde_json::json!([]));
        assert_eq!(event.kind, EventKind::PageError);
        assert!(event.trace.is_some());
        assert!(LifecycleEvent::bare(EventKind::LoadStarted).payload.is_null());
    }
}
