//! Mock CDP implementation for testing
//!
//! The mock answers commands from canned results and lets the test push
//! notifications into the event stream. With auto-load on, `Page.navigate`
//! plays back the frame events a real browser would send.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::cdp::traits::*;
use crate::Error;

/// Frame id the mock reports for the main frame
pub const MOCK_FRAME_ID: &str = "MOCK-MAIN-FRAME";

/// 1x1 PNG returned by `Page.captureScreenshot`
const MOCK_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[derive(Debug)]
struct NavigationScript {
    auto_load: bool,
    load_delay: Duration,
    error_text: Option<String>,
    document: Option<String>,
}

/// `url` only changes the fragment of the loaded `document`.
fn is_same_document(document: Option<&str>, url: &str) -> bool {
    let without_fragment = |u: &str| u.split('#').next().unwrap_or("").to_string();
    match document {
        Some(document) => url.contains('#') && without_fragment(document) == without_fragment(url),
        None => false,
    }
}

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: Arc<AtomicBool>,
    next_id: AtomicU64,
    events: broadcast::Sender<CdpEvent>,
    calls: Mutex<Vec<(String, Value)>>,
    navigation: Mutex<NavigationScript>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            is_active: Arc::new(AtomicBool::new(true)),
            next_id: AtomicU64::new(1),
            events,
            calls: Mutex::new(Vec::new()),
            navigation: Mutex::new(NavigationScript {
                auto_load: true,
                load_delay: Duration::from_millis(10),
                error_text: None,
                document: None,
            }),
        }
    }

    /// Push a notification to every listener.
    pub fn emit(&self, method: &str, params: Value) {
        let event = CdpEvent {
            method: method.to_string(),
            params,
            session_id: None,
        };
        // No listeners yet is fine; the event is simply dropped
        let _ = self.events.send(event);
    }

    /// Methods sent so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(method, _)| method.clone()).collect())
            .unwrap_or_default()
    }

    /// Parameters of the most recent call to `method`.
    pub fn last_params(&self, method: &str) -> Option<Value> {
        let calls = self.calls.lock().ok()?;
        calls
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }

    fn record(&self, method: &str, params: &Value) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((method.to_string(), params.clone()));
        }
    }

    fn navigate(&self, params: &Value) -> Value {
        let url = params.get("url").and_then(Value::as_str).unwrap_or("about:blank").to_string();
        let (auto_load, delay, error_text, same_document) = match self.navigation.lock() {
            Ok(mut script) => {
                let same_document = is_same_document(script.document.as_deref(), &url);
                if script.error_text.is_none() {
                    script.document = Some(url.clone());
                }
                (script.auto_load, script.load_delay, script.error_text.clone(), same_document)
            }
            Err(_) => (false, Duration::ZERO, None, false),
        };

        if let Some(error_text) = error_text {
            return json!({ "frameId": MOCK_FRAME_ID, "errorText": error_text });
        }

        // Fragment changes never start a new document, so there is no loader
        if same_document {
            if auto_load {
                let _ = self.events.send(CdpEvent {
                    method: "Page.navigatedWithinDocument".to_string(),
                    params: json!({ "frameId": MOCK_FRAME_ID, "url": url }),
                    session_id: None,
                });
            }
            return json!({ "frameId": MOCK_FRAME_ID });
        }

        if auto_load {
            let events = self.events.clone();
            tokio::spawn(async move {
                let send = |method: &str, params: Value| {
                    let _ = events.send(CdpEvent {
                        method: method.to_string(),
                        params,
                        session_id: None,
                    });
                };
                send("Page.frameStartedLoading", json!({ "frameId": MOCK_FRAME_ID }));
                tokio::time::sleep(delay).await;
                send(
                    "Page.frameNavigated",
                    json!({ "frame": { "id": MOCK_FRAME_ID, "url": url } }),
                );
                tokio::time::sleep(delay).await;
                send("Page.loadEventFired", json!({ "timestamp": 1.0 }));
            });
        }

        json!({ "frameId": MOCK_FRAME_ID, "loaderId": uuid::Uuid::new_v4().to_string() })
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(method, &params);

        let result = match method {
            "Page.navigate" => self.navigate(&params),
            "Page.captureScreenshot" => json!({ "data": MOCK_PNG }),
            _ => json!({}),
        };

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let mut events = self.events.subscribe();
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Mock event listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

/// Mock CDP client
#[derive(Debug)]
pub struct MockCdpClient {
    connection: Arc<MockCdpConnection>,
    url: Mutex<Option<String>>,
    title: String,
}

impl MockCdpClient {
    /// Create a mock client whose navigations load successfully
    pub fn new() -> Self {
        Self {
            connection: Arc::new(MockCdpConnection::new()),
            url: Mutex::new(None),
            title: "Test Page".to_string(),
        }
    }

    /// Title reported for `document.title`
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    /// Stop playing back load events on navigation; the test drives them.
    pub fn without_auto_load(self) -> Self {
        if let Ok(mut script) = self.connection.navigation.lock() {
            script.auto_load = false;
        }
        self
    }

    /// Delay between the played-back load events
    pub fn with_load_delay(self, delay: Duration) -> Self {
        if let Ok(mut script) = self.connection.navigation.lock() {
            script.load_delay = delay;
        }
        self
    }

    /// Make every navigation fail with `error_text`.
    pub fn failing_navigation<S: Into<String>>(self, error_text: S) -> Self {
        if let Ok(mut script) = self.connection.navigation.lock() {
            script.error_text = Some(error_text.into());
        }
        self
    }

    /// The mock connection, for injecting events and inspecting calls
    pub fn mock_connection(&self) -> Arc<MockCdpConnection> {
        Arc::clone(&self.connection)
    }

    /// Push a notification into the event stream.
    pub fn emit(&self, method: &str, params: Value) {
        self.connection.emit(method, params);
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        self.connection.clone()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        let result = self.call_method("Page.navigate", json!({ "url": url })).await?;
        let error_text = result.get("errorText").and_then(Value::as_str).map(str::to_string);

        if error_text.is_none() {
            if let Ok(mut current) = self.url.lock() {
                *current = Some(url.to_string());
            }
        }

        Ok(NavigationResult {
            frame_id: result.get("frameId").and_then(Value::as_str).map(str::to_string),
            loader_id: result.get("loaderId").and_then(Value::as_str).map(str::to_string),
            url: url.to_string(),
            error_text,
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        self.call_method("Runtime.evaluate", json!({ "expression": script })).await?;

        if script.contains("throw") {
            Err(Error::script_execution_failed(format!("Uncaught Error in: {}", script)))
        } else if script.contains("document.title") {
            Ok(EvaluationResult::String(self.title.clone()))
        } else if script.contains("window.location.href") {
            let url = self
                .url
                .lock()
                .ok()
                .and_then(|url| url.clone())
                .unwrap_or_else(|| "about:blank".to_string());
            Ok(EvaluationResult::String(url))
        } else {
            Ok(EvaluationResult::String("mock result".to_string()))
        }
    }

    async fn screenshot(&self, _format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

        let result = self.call_method("Page.captureScreenshot", json!({ "format": "png" })).await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;
        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        self.call_method(&format!("{}.enable", domain), json!({})).await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: Value) -> Result<Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }

    async fn subscribe_events(&self, event_type: &str) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let mut events = self.connection.listen_events().await?;
        let (tx, rx) = mpsc::channel(100);
        let filter = event_type.to_string();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if (filter == "*" || event.method == filter) && tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection() {
        let conn = MockCdpConnection::new();
        assert!(conn.is_active());

        let response = conn.send_command("Page.enable", json!({})).await.unwrap();
        assert!(response.result.is_some());
        assert_eq!(conn.calls(), vec!["Page.enable"]);

        conn.close().await.unwrap();
        assert!(conn.send_command("Page.enable", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_navigation_plays_back_load_events() {
        let client = MockCdpClient::new().with_load_delay(Duration::from_millis(1));
        let mut events = client.subscribe_events("*").await.unwrap();

        let result = client.navigate("https://example.com").await.unwrap();
        assert!(!result.is_failure());

        let mut methods = Vec::new();
        for _ in 0..3 {
            methods.push(events.recv().await.unwrap().method);
        }
        assert_eq!(
            methods,
            vec!["Page.frameStartedLoading", "Page.frameNavigated", "Page.loadEventFired"]
        );
        assert_eq!(client.current_url().await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_fragment_navigation_stays_in_document() {
        let client = MockCdpClient::new().with_load_delay(Duration::from_millis(1));
        let first = client.navigate("https://example.com/").await.unwrap();
        assert!(first.loader_id.is_some());

        let mut events = client.subscribe_events("Page.navigatedWithinDocument").await.unwrap();
        let fragment = client.navigate("https://example.com/#section").await.unwrap();
        assert!(fragment.loader_id.is_none());
        assert_eq!(events.recv().await.unwrap().params["url"], "https://example.com/#section");

        let other = client.navigate("https://other.example/#section").await.unwrap();
        assert!(other.loader_id.is_some());
    }

    #[tokio::test]
    async fn test_failing_navigation() {
        let client = MockCdpClient::new().failing_navigation("net::ERR_NAME_NOT_RESOLVED");
        let result = client.navigate("https://nowhere.invalid").await.unwrap();
        assert_eq!(result.error_text.as_deref(), Some("net::ERR_NAME_NOT_RESOLVED"));
        assert_eq!(client.current_url().await.unwrap(), "about:blank");
    }

    #[tokio::test]
    async fn test_subscribe_filters_by_method() {
        let client = MockCdpClient::new();
        let mut alerts = client.subscribe_events("Page.javascriptDialogOpening").await.unwrap();

        client.emit("Runtime.consoleAPICalled", json!({ "args": [] }));
        client.emit("Page.javascriptDialogOpening", json!({ "type": "alert", "message": "hi" }));

        let event = alerts.recv().await.unwrap();
        assert_eq!(event.params["message"], "hi");
    }

    #[tokio::test]
    async fn test_screenshot_decodes_png() {
        let client = MockCdpClient::new();
        let png = client.screenshot(ScreenshotFormat::Png).await.unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_apply_page_settings() {
        let client = MockCdpClient::new();
        client
            .apply_page_settings(&crate::config::PageSettings::default())
            .await
            .unwrap();

        let connection = client.mock_connection();
        let calls = connection.calls();
        assert!(calls.contains(&"Network.setUserAgentOverride".to_string()));
        assert!(calls.contains(&"Network.setBlockedURLs".to_string()));
        assert!(calls.contains(&"Security.setIgnoreCertificateErrors".to_string()));
        assert!(calls.contains(&"Page.setBypassCSP".to_string()));
        assert_eq!(
            connection.last_params("Network.setUserAgentOverride").unwrap()["userAgent"],
            "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0"
        );
    }
}
