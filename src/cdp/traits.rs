//! CDP (Chrome DevTools Protocol) layer traits
//!
//! This module defines the abstract interfaces the session drives.

use crate::config::PageSettings;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// CDP event representation
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    pub params: Value,
    /// Session ID (for multi-session targets)
    pub session_id: Option<String>,
}

/// CDP response representation
#[derive(Debug, Clone)]
pub struct CdpResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    pub result: Option<Value>,
    /// Error if any
    pub error: Option<CdpError>,
}

/// CDP error representation
#[derive(Debug, Clone)]
pub struct CdpError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    pub data: Option<Value>,
}

/// CDP connection trait
///
/// Represents a WebSocket connection to a Chrome DevTools Protocol target.
#[async_trait]
pub trait CdpConnection: Send + Sync + std::fmt::Debug {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, crate::Error>;

    /// Subscribe to CDP events
    async fn listen_events(&self) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;

    /// Close the connection
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if connection is active
    fn is_active(&self) -> bool;
}

/// CDP client trait
///
/// High-level CDP client that provides typed methods for the operations a
/// step session needs.
#[async_trait]
pub trait CdpClient: Send + Sync + std::fmt::Debug {
    /// Get the underlying connection
    fn connection(&self) -> Arc<dyn CdpConnection>;

    /// Start navigating to a URL.
    ///
    /// Returns once the browser has accepted (or rejected) the navigation;
    /// page load progress arrives through the event stream.
    async fn navigate(&self, url: &str) -> Result<NavigationResult, crate::Error>;

    /// Evaluate JavaScript in the page
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, crate::Error>;

    /// Capture a screenshot
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, crate::Error>;

    /// Enable a domain
    async fn enable_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Call a raw CDP method (returns JSON Value)
    async fn call_method(&self, method: &str, params: Value) -> Result<Value, crate::Error>;

    /// Subscribe to events (`"*"` for all)
    async fn subscribe_events(&self, event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;

    /// URL of the document currently loaded in the page
    async fn current_url(&self) -> Result<String, crate::Error> {
        match self.evaluate("window.location.href", false).await? {
            EvaluationResult::String(url) => Ok(url),
            other => Err(crate::Error::script_execution_failed(format!(
                "location.href evaluated to {:?}",
                other
            ))),
        }
    }

    /// Apply page settings to the target.
    ///
    /// Plugin loading has no CDP switch and is left to the browser's launch flags.
    async fn apply_page_settings(&self, settings: &PageSettings) -> Result<(), crate::Error> {
        if let Some(user_agent) = &settings.user_agent {
            self.call_method(
                "Network.setUserAgentOverride",
                serde_json::json!({ "userAgent": user_agent }),
            )
            .await?;
        }

        if !settings.load_images {
            self.call_method(
                "Network.setBlockedURLs",
                serde_json::json!({ "urls": BLOCKED_IMAGE_PATTERNS }),
            )
            .await?;
        }

        if settings.ignore_ssl_errors {
            self.call_method(
                "Security.setIgnoreCertificateErrors",
                serde_json::json!({ "ignore": true }),
            )
            .await?;
        }

        if !settings.web_security_enabled {
            self.call_method("Page.setBypassCSP", serde_json::json!({ "enabled": true }))
                .await?;
        }

        Ok(())
    }
}

/// URL patterns blocked when image loading is off
pub const BLOCKED_IMAGE_PATTERNS: [&str; 7] =
    ["*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico"];

/// Navigation result
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// Frame the navigation happened in
    pub frame_id: Option<String>,
    /// Loader ID of the new document
    pub loader_id: Option<String>,
    /// Requested URL
    pub url: String,
    /// Browser-reported failure (e.g. `net::ERR_NAME_NOT_RESOLVED`)
    pub error_text: Option<String>,
}

impl NavigationResult {
    /// Whether the browser rejected the navigation.
    pub fn is_failure(&self) -> bool {
        self.error_text.is_some()
    }
}

/// JavaScript evaluation result
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    /// String value
    String(String),
    /// Number value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Null value
    Null,
    /// Object/Array (as JSON)
    Object(Value),
}

impl EvaluationResult {
    /// String value, if the result is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EvaluationResult::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Screenshot format
#[derive(Debug, Clone, Copy)]
pub enum ScreenshotFormat {
    /// PNG format
    Png,
    /// JPEG format
    Jpeg(u8), // quality 0-100
}

/// CDP browser trait
///
/// Controls browser-level operations via CDP.
#[async_trait]
pub trait CdpBrowser: Send + Sync + std::fmt::Debug {
    /// Create a new CDP client for a page target
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, crate::Error>;

    /// Close every connection opened through this browser
    async fn close(&self) -> Result<(), crate::Error>;

    /// Get browser version
    async fn get_version(&self) -> Result<BrowserVersion, crate::Error>;

    /// Create a new page target and return its WebSocket URL
    async fn create_target(&self, url: &str) -> Result<String, crate::Error>;
}

/// Browser version information
#[derive(Debug, Clone)]
pub struct BrowserVersion {
    /// Protocol version
    pub protocol_version: String,
    /// Product name
    pub product: String,
    /// User agent
    pub user_agent: String,
}
