//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value.as_ref().and_then(Value::as_str).unwrap_or("").to_string(),
            ),
            "number" => EvaluationResult::Number(obj.value.as_ref().and_then(Value::as_f64).unwrap_or(0.0)),
            "boolean" => EvaluationResult::Bool(obj.value.as_ref().and_then(Value::as_bool).unwrap_or(false)),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                EvaluationResult::Object(obj.value.clone().unwrap_or(Value::Null))
            }
            "undefined" => EvaluationResult::Null,
            other => {
                debug!("parse_remote_object: unknown type '{}', returning Null", other);
                EvaluationResult::Null
            }
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };
        let result = self.call_method("Page.navigate", serde_json::to_value(params)?).await?;

        Ok(NavigationResult {
            frame_id: result.get("frameId").and_then(Value::as_str).map(str::to_string),
            loader_id: result.get("loaderId").and_then(Value::as_str).map(str::to_string),
            url: url.to_string(),
            error_text: result.get("errorText").and_then(Value::as_str).map(str::to_string),
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        debug!("Evaluating script: {}", script);

        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };
        let result = self.call_method("Runtime.evaluate", serde_json::to_value(params)?).await?;

        if let Some(exception) = result.get("exceptionDetails") {
            return Err(Error::script_execution_failed(
                exception
                    .get("exception")
                    .and_then(|e| e.get("description"))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string(),
            ));
        }

        let response: EvaluateResponse = serde_json::from_value(result)?;
        Ok(Self::parse_remote_object(&response.result))
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        info!("Capturing screenshot");

        let params = match format {
            ScreenshotFormat::Png => serde_json::json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => serde_json::json!({ "format": "jpeg", "quality": quality }),
        };
        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({})).await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: Value) -> Result<Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }

    async fn subscribe_events(&self, event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        info!("Subscribing to events: {}", event_type);

        let mut event_receiver = self.connection.listen_events().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let filter_event_type = event_type.to_string();

        tokio::spawn(async move {
            while let Some(event) = event_receiver.recv().await {
                if (filter_event_type == "*" || event.method == filter_event_type)
                    && tx.send(event).await.is_err()
                {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
