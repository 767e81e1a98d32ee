//! CDP notification to lifecycle event translation

use super::kind::{EventKind, LifecycleEvent};
use crate::cdp::CdpEvent;
use serde_json::{json, Value};
use tracing::trace;

/// CDP domains whose events the translator understands. Enable these on the
/// target before pumping its event stream.
pub const REQUIRED_DOMAINS: [&str; 4] = ["Page", "Runtime", "Network", "Inspector"];

/// Stateful translator for one page target.
///
/// Tracks the main frame id so that sub-frame loads do not flip page
/// readiness.
#[derive(Debug, Default)]
pub struct EventTranslator {
    main_frame_id: Option<String>,
}

impl EventTranslator {
    /// Create a translator with no main frame known yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Main frame id, once a top-level navigation has been seen.
    pub fn main_frame_id(&self) -> Option<&str> {
        self.main_frame_id.as_deref()
    }

    /// Map one CDP notification. Returns `None` for notifications with no
    /// lifecycle meaning.
    pub fn translate(&mut self, event: &CdpEvent) -> Option<LifecycleEvent> {
        let params = &event.params;
        let translated = match event.method.as_str() {
            "Page.frameStartedLoading" => {
                if !self.is_main_frame(params.get("frameId")) {
                    return None;
                }
                LifecycleEvent::bare(EventKind::LoadStarted)
            }
            "Page.navigatedWithinDocument" => {
                if !self.is_main_frame(params.get("frameId")) {
                    return None;
                }
                let url = params.get("url").cloned().unwrap_or(Value::Null);
                LifecycleEvent::new(EventKind::LoadFinished, json!({ "status": "success", "url": url }))
            }
            "Page.loadEventFired" => {
                LifecycleEvent::new(EventKind::LoadFinished, json!({ "status": "success" }))
            }
            "Page.frameNavigated" => {
                let frame = params.get("frame")?;
                if frame.get("parentId").is_some() {
                    return None;
                }
                self.main_frame_id = frame.get("id").and_then(Value::as_str).map(str::to_string);
                let url = frame.get("url").cloned().unwrap_or(Value::Null);
                LifecycleEvent::new(EventKind::PageInitialized, json!({ "url": url }))
            }
            "Runtime.exceptionThrown" => {
                let details = params.get("exceptionDetails")?;
                let message = details
                    .get("exception")
                    .and_then(|e| e.get("description"))
                    .or_else(|| details.get("text"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let payload = json!({
                    "message": message,
                    "url": details.get("url").cloned().unwrap_or(Value::Null),
                    "line": details.get("lineNumber").cloned().unwrap_or(Value::Null),
                });
                let event = LifecycleEvent::new(EventKind::PageError, payload);
                match details.get("stackTrace").and_then(|s| s.get("callFrames")) {
                    Some(frames) => event.with_trace(frames.clone()),
                    None => event,
                }
            }
            "Runtime.consoleAPICalled" => {
                let text = params
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|args| args.iter().map(remote_object_text).collect::<Vec<_>>().join(" "))
                    .unwrap_or_default();
                LifecycleEvent::new(EventKind::RemoteMessage, Value::String(text))
            }
            "Page.javascriptDialogOpening" => {
                if params.get("type").and_then(Value::as_str) != Some("alert") {
                    return None;
                }
                let message = params.get("message").cloned().unwrap_or(Value::Null);
                LifecycleEvent::new(EventKind::RemoteAlert, message)
            }
            "Network.requestWillBeSent" => {
                let request = params.get("request").cloned().unwrap_or(Value::Null);
                LifecycleEvent::new(
                    EventKind::ResourceRequested,
                    json!({
                        "id": params.get("requestId").cloned().unwrap_or(Value::Null),
                        "url": request.get("url").cloned().unwrap_or(Value::Null),
                        "method": request.get("method").cloned().unwrap_or(Value::Null),
                        "headers": request.get("headers").cloned().unwrap_or(Value::Null),
                    }),
                )
            }
            "Network.responseReceived" => {
                let response = params.get("response").cloned().unwrap_or(Value::Null);
                LifecycleEvent::new(
                    EventKind::ResourceReceived,
                    json!({
                        "id": params.get("requestId").cloned().unwrap_or(Value::Null),
                        "url": response.get("url").cloned().unwrap_or(Value::Null),
                        "status": response.get("status").cloned().unwrap_or(Value::Null),
                        "statusText": response.get("statusText").cloned().unwrap_or(Value::Null),
                        "contentType": response.get("mimeType").cloned().unwrap_or(Value::Null),
                    }),
                )
            }
            "Network.loadingFailed" => LifecycleEvent::new(
                EventKind::ResourceError,
                json!({
                    "id": params.get("requestId").cloned().unwrap_or(Value::Null),
                    "errorString": params.get("errorText").cloned().unwrap_or(Value::Null),
                    "canceled": params.get("canceled").cloned().unwrap_or(Value::Bool(false)),
                }),
            ),
            "Inspector.targetCrashed" => {
                LifecycleEvent::new(EventKind::Error, json!({ "message": "Target crashed" }))
            }
            other => {
                trace!("Ignoring CDP event {}", other);
                return None;
            }
        };
        Some(translated)
    }

    fn is_main_frame(&self, frame_id: Option<&Value>) -> bool {
        match (&self.main_frame_id, frame_id.and_then(Value::as_str)) {
            (Some(main), Some(id)) => main == id,
            _ => true,
        }
    }
}

/// Text of a console argument: its primitive value, else its description.
fn remote_object_text(arg: &Value) -> String {
    match arg.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(value) if !value.is_null() => value.to_string(),
        _ => arg
            .get("description")
            .and_then(Value::as_str)
            .or_else(|| arg.get("type").and_then(Value::as_str))
            .unwrap_or("")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdp(method: &str, params: Value) -> CdpEvent {
        CdpEvent {
            method: method.to_string(),
            params,
            session_id: None,
        }
    }

    #[test]
    fn test_main_frame_navigation() {
        let mut translator = EventTranslator::new();

        let started = translator
            .translate(&cdp("Page.frameStartedLoading", json!({ "frameId": "F1" })))
            .unwrap();
        assert_eq!(started.kind, EventKind::LoadStarted);

        let navigated = translator
            .translate(&cdp(
                "Page.frameNavigated",
                json!({ "frame": { "id": "F1", "url": "https://example.com/" } }),
            ))
            .unwrap();
        assert_eq!(navigated.kind, EventKind::PageInitialized);
        assert_eq!(navigated.payload["url"], "https://example.com/");
        assert_eq!(translator.main_frame_id(), Some("F1"));

        let finished = translator.translate(&cdp("Page.loadEventFired", json!({}))).unwrap();
        assert_eq!(finished.kind, EventKind::LoadFinished);
    }

    #[test]
    fn test_sub_frames_are_ignored() {
        let mut translator = EventTranslator::new();
        translator.translate(&cdp(
            "Page.frameNavigated",
            json!({ "frame": { "id": "F1", "url": "https://example.com/" } }),
        ));

        assert!(translator
            .translate(&cdp("Page.frameStartedLoading", json!({ "frameId": "IFRAME" })))
            .is_none());
        assert!(translator
            .translate(&cdp(
                "Page.frameNavigated",
                json!({ "frame": { "id": "IFRAME", "parentId": "F1", "url": "https://ads.example/" } }),
            ))
            .is_none());
        assert_eq!(translator.main_frame_id(), Some("F1"));
    }

    #[test]
    fn test_fragment_navigation_finishes_load() {
        let mut translator = EventTranslator::new();
        translator.translate(&cdp(
            "Page.frameNavigated",
            json!({ "frame": { "id": "F1", "url": "https://example.com/" } }),
        ));

        let finished = translator
            .translate(&cdp(
                "Page.navigatedWithinDocument",
                json!({ "frameId": "F1", "url": "https://example.com/#section" }),
            ))
            .unwrap();
        assert_eq!(finished.kind, EventKind::LoadFinished);
        assert_eq!(finished.payload["url"], "https://example.com/#section");

        assert!(translator
            .translate(&cdp(
                "Page.navigatedWithinDocument",
                json!({ "frameId": "IFRAME", "url": "https://ads.example/#x" }),
            ))
            .is_none());
    }

    #[test]
    fn test_exception_carries_call_frames() {
        let mut translator = EventTranslator::new();
        let event = translator
            .translate(&cdp(
                "Runtime.exceptionThrown",
                json!({
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "lineNumber": 4,
                        "url": "https://example.com/app.js",
                        "exception": { "description": "TypeError: boom" },
                        "stackTrace": { "callFrames": [
                            { "functionName": "main", "url": "https://example.com/app.js", "lineNumber": 4 }
                        ] }
                    }
                }),
            ))
            .unwrap();
        assert_eq!(event.kind, EventKind::PageError);
        assert_eq!(event.payload["message"], "TypeError: boom");
        assert_eq!(event.trace.unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_console_arguments_are_joined() {
        let mut translator = EventTranslator::new();
        let event = translator
            .translate(&cdp(
                "Runtime.consoleAPICalled",
                json!({ "type": "log", "args": [
                    { "type": "string", "value": "count" },
                    { "type": "number", "value": 3 },
                    { "type": "object", "description": "Window" }
                ] }),
            ))
            .unwrap();
        assert_eq!(event.kind, EventKind::RemoteMessage);
        assert_eq!(event.payload, json!("count 3 Window"));
    }

    #[test]
    fn test_only_alert_dialogs_are_forwarded() {
        let mut translator = EventTranslator::new();
        let alert = translator
            .translate(&cdp("Page.javascriptDialogOpening", json!({ "type": "alert", "message": "hi" })))
            .unwrap();
        assert_eq!(alert.kind, EventKind::RemoteAlert);
        assert_eq!(alert.payload, json!("hi"));

        assert!(translator
            .translate(&cdp("Page.javascriptDialogOpening", json!({ "type": "confirm", "message": "?" })))
            .is_none());
    }

    #[test]
    fn test_network_events() {
        let mut translator = EventTranslator::new();

        let requested = translator
            .translate(&cdp(
                "Network.requestWillBeSent",
                json!({ "requestId": "1", "request": { "url": "https://example.com/a.css", "method": "GET" } }),
            ))
            .unwrap();
        assert_eq!(requested.kind, EventKind::ResourceRequested);
        assert_eq!(requested.payload["method"], "GET");

        let received = translator
            .translate(&cdp(
                "Network.responseReceived",
                json!({ "requestId": "1", "response": { "url": "https://example.com/a.css", "status": 200, "mimeType": "text/css" } }),
            ))
            .unwrap();
        assert_eq!(received.kind, EventKind::ResourceReceived);
        assert_eq!(received.payload["contentType"], "text/css");

        let failed = translator
            .translate(&cdp(
                "Network.loadingFailed",
                json!({ "requestId": "2", "errorText": "net::ERR_NAME_NOT_RESOLVED" }),
            ))
            .unwrap();
        assert_eq!(failed.kind, EventKind::ResourceError);
        assert_eq!(failed.payload["errorString"], "net::ERR_NAME_NOT_RESOLVED");
    }

    #[test]
    fn test_unknown_events_are_dropped() {
        let mut translator = EventTranslator::new();
        assert!(translator.translate(&cdp("DOM.documentUpdated", json!({}))).is_none());
    }
}
