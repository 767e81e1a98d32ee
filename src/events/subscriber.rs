//! Lifecycle event subscriber
//!
//! Translates every lifecycle event into a readiness update and/or one
//! diagnostic line. Handlers never propagate failures: anything that goes
//! wrong while describing an event is itself reported at WARN.

use super::bus::EventBus;
use super::kind::{EventKind, LifecycleEvent};
use crate::logging::{ChannelFormatter, Severity};
use crate::readiness::ReadinessTracker;
use crate::session::SessionContext;
use crate::{util, Result};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Handler table for one session
#[derive(Debug, Clone)]
pub struct EventSubscriber {
    formatter: ChannelFormatter,
    readiness: ReadinessTracker,
    verbose: bool,
}

impl EventSubscriber {
    /// Build a subscriber over the session's formatter and readiness flag.
    pub fn new(context: &SessionContext) -> Self {
        Self {
            formatter: context.formatter().clone(),
            readiness: context.readiness().clone(),
            verbose: context.config().verbose,
        }
    }

    /// Register one handler per lifecycle event kind on `bus`.
    pub fn attach(self, bus: &EventBus) {
        let subscriber = Arc::new(self);
        for kind in EventKind::ALL {
            let subscriber = subscriber.clone();
            bus.on(kind, move |event| subscriber.dispatch(event));
        }
    }

    /// Handle `event`, reporting any failure at WARN instead of returning it.
    pub fn dispatch(&self, event: &LifecycleEvent) {
        self.guarded(event, |event| self.handle(event));
    }

    fn guarded<F>(&self, event: &LifecycleEvent, handler: F)
    where
        F: FnOnce(&LifecycleEvent) -> Result<()>,
    {
        match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.formatter.emit(
                &format!("Failed to handle {} event: {}", event.kind, e),
                Some(Severity::Warn),
            ),
            Err(_) => self.formatter.emit(
                &format!("Handler for {} event panicked", event.kind),
                Some(Severity::Warn),
            ),
        }
    }

    fn handle(&self, event: &LifecycleEvent) -> Result<()> {
        let payload = &event.payload;
        match event.kind {
            EventKind::LoadStarted => self.readiness.mark_loading(),
            EventKind::LoadFinished => self.readiness.mark_loaded(),
            EventKind::PageInitialized => {
                let url = payload
                    .get("url")
                    .and_then(Value::as_str)
                    .or_else(|| payload.as_str())
                    .unwrap_or("about:blank");
                self.info(&format!("Current URL: {}", url));
            }
            EventKind::PageError => self.warn_with_trace("Page error", event)?,
            EventKind::Error => self.warn_with_trace("Unknown error", event)?,
            EventKind::Timeout => self.error_with_payload("Timeout", payload)?,
            EventKind::WaitTimeout => self.error_with_payload("waitFor timeout", payload)?,
            EventKind::CompleteError => self.warn_with_payload("Complete error", payload)?,
            EventKind::LoadFailed => self.warn_with_payload("Load failed", payload)?,
            EventKind::StepError => self.warn_with_payload("Step error", payload)?,
            EventKind::ResourceError => self.warn_with_payload("Resource error", payload)?,
            EventKind::RemoteMessage | EventKind::RemoteAlert => {
                let text = match payload.as_str() {
                    Some(text) => text.to_string(),
                    None => util::render_json(payload)?,
                };
                self.formatter.emit(&text, Some(Severity::Message));
            }
            EventKind::ResourceRequested if self.verbose => {
                self.formatter.emit(&util::render_json(payload)?, Some(Severity::Request));
            }
            EventKind::ResourceReceived if self.verbose => {
                self.formatter.emit(&util::render_json(payload)?, Some(Severity::Response));
            }
            EventKind::ResourceRequested | EventKind::ResourceReceived => {}
        }
        Ok(())
    }

    fn info(&self, message: &str) {
        self.formatter.emit(message, Some(Severity::Info));
    }

    fn warn_with_payload(&self, title: &str, payload: &Value) -> Result<()> {
        let message = format!("{}\n{}", title, util::render_json(payload)?);
        self.formatter.emit(&message, Some(Severity::Warn));
        Ok(())
    }

    fn error_with_payload(&self, title: &str, payload: &Value) -> Result<()> {
        let message = format!("{}\n{}", title, util::render_json(payload)?);
        self.formatter.emit(&message, Some(Severity::Error));
        Ok(())
    }

    fn warn_with_trace(&self, title: &str, event: &LifecycleEvent) -> Result<()> {
        let mut message = format!("{}\n{}", title, util::render_json(&event.payload)?);
        if let Some(trace) = &event.trace {
            message.push_str(&format_trace(trace));
        }
        self.formatter.emit(&message, Some(Severity::Warn));
        Ok(())
    }
}

/// Render a stack trace as `at function (url:line)` lines.
///
/// Accepts CDP call frames, `{file, line, function}`
/// frames, or a preformatted string.
pub fn format_trace(trace: &Value) -> String {
    match trace {
        Value::Array(frames) => frames
            .iter()
            .map(|frame| {
                let function = frame
                    .get("functionName")
                    .or_else(|| frame.get("function"))
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .unwrap_or("<anonymous>");
                let location = frame
                    .get("url")
                    .or_else(|| frame.get("file"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let line = frame
                    .get("lineNumber")
                    .or_else(|| frame.get("line"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                format!("\n    at {} ({}:{})", function, location, line)
            })
            .collect(),
        Value::String(text) if !text.is_empty() => format!("\n{}", text),
        Value::Null | Value::String(_) => String::new(),
        other => format!("\n{}", other),
    }
}
