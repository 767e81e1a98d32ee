//! CDP browser control implementation
//!
//! Discovers targets through the browser's HTTP endpoints and opens one
//! WebSocket connection per page target.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser WebSocket endpoint (e.g., "ws://localhost:9222")
    endpoint: String,
    /// HTTP client for the discovery endpoints
    http: reqwest::Client,
    /// Active connections (target_id -> connection)
    connections: Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser WebSocket endpoint (e.g., "ws://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into();
        info!("Creating CDP browser controller for endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint this controller talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP base URL for the discovery endpoints
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replace("ws://", "http://")
            .replace("wss://", "https://")
            .trim_end_matches('/')
            .to_string()
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value, Error> {
        let response = request.send().await.map_err(|e| {
            Error::websocket(format!(
                "Failed to reach CDP endpoint {} ({}). Start Chrome with --remote-debugging-port=9222. Original error: {}",
                self.endpoint, what, e
            ))
        })?;

        let text = response
            .text()
            .await
            .map_err(|e| Error::cdp(format!("Failed to read {} response: {}", what, e)))?;
        debug!("Response from {}: {}", what, text);

        serde_json::from_str(&text)
            .map_err(|e| Error::cdp(format!("Failed to parse {} response: {} (response was: {})", what, e, text)))
    }
}

fn string_field(json: &Value, key: &str) -> String {
    json.get(key).and_then(Value::as_str).unwrap_or("unknown").to_string()
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::connect(target_url).await?;
        let target_id = target_url.rsplit('/').next().unwrap_or("unknown").to_string();

        self.connections
            .lock()
            .await
            .insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);

        Ok(Arc::new(CdpClientImpl::new(connection)))
    }

    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        info!("Closing {} CDP connections at {}", connections.len(), self.endpoint);

        for (target_id, connection) in connections.drain() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let url = format!("{}/json/version", self.http_endpoint());
        let version = self.get_json(self.http.get(&url), "/json/version").await?;

        Ok(BrowserVersion {
            protocol_version: string_field(&version, "Protocol-Version"),
            product: string_field(&version, "Browser"),
            user_agent: string_field(&version, "User-Agent"),
        })
    }

    /// Create a new page through the `/json/new` endpoint.
    async fn create_target(&self, url: &str) -> Result<String, Error> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint(), url);
        let target = self.get_json(self.http.put(&new_url), "/json/new").await?;

        let ws_url = target
            .get("webSocketDebuggerUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in new target response"))?;

        debug!("Created new target with WebSocket URL: {}", ws_url);
        Ok(ws_url.to_string())
    }
}
