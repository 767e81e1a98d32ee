//! CDP WebSocket connection implementation
//!
//! One reader task owns the receiving half of the socket and routes every
//! frame either to the command waiting for it or to the event subscribers.
//! Commands go out through the sending half under a short-lived lock.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpEvent, CdpResponse};
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;
type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>;

/// Per-command timeouts
#[derive(Debug, Clone)]
pub struct CdpTimeoutConfig {
    /// Default timeout for most commands
    pub default_timeout: Duration,
    /// Timeout for screenshot commands
    pub screenshot_timeout: Duration,
    /// Timeout for navigation commands
    pub navigation_timeout: Duration,
    /// Timeout for JavaScript execution
    pub execution_timeout: Duration,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            screenshot_timeout: Duration::from_secs(90),
            navigation_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(30),
        }
    }
}

impl CdpTimeoutConfig {
    /// Get timeout duration for a specific command method
    fn for_command(&self, method: &str) -> Duration {
        match method {
            "Page.captureScreenshot" => self.screenshot_timeout,
            "Page.navigate" | "Page.reload" => self.navigation_timeout,
            "Runtime.evaluate" | "Runtime.callFunctionOn" => self.execution_timeout,
            _ => self.default_timeout,
        }
    }
}

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    sender: oneshot::Sender<CdpResponse>,
    method: String,
}

/// CDP WebSocket connection implementation
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Sending half of the socket
    sink: Mutex<WsSink>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending_commands: PendingMap,
    /// Event subscribers
    event_subscribers: Subscribers,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Timeout configuration
    timeouts: CdpTimeoutConfig,
}

impl CdpWebSocketConnection {
    /// Connect to a target
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn connect<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        Self::connect_with_timeouts(url, CdpTimeoutConfig::default()).await
    }

    /// Connect to a target with explicit command timeouts
    pub async fn connect_with_timeouts<S: Into<String>>(
        url: S,
        timeouts: CdpTimeoutConfig,
    ) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect: {}", e)))?;
        let (sink, stream) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(1),
            pending_commands: Arc::new(Mutex::new(HashMap::new())),
            event_subscribers: Arc::new(Mutex::new(Vec::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            timeouts,
        });

        tokio::spawn(Self::read_loop(
            stream,
            connection.pending_commands.clone(),
            connection.event_subscribers.clone(),
            connection.is_active.clone(),
        ));

        info!("WebSocket connection established");
        Ok(connection)
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Route incoming frames until the socket closes.
    async fn read_loop(
        mut stream: SplitStream<WsStream>,
        pending_commands: PendingMap,
        event_subscribers: Subscribers,
        is_active: Arc<AtomicBool>,
    ) {
        debug!("CDP read loop started");

        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    Self::route(&text, &pending_commands, &event_subscribers).await;
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket close frame received");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket read failed, deactivating connection: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with a closed channel
        pending_commands.lock().await.clear();
        event_subscribers.lock().await.clear();
        debug!("CDP read loop exited");
    }

    async fn route(text: &str, pending_commands: &PendingMap, event_subscribers: &Subscribers) {
        match serde_json::from_str::<CdpIncoming>(text) {
            Ok(CdpIncoming::Response(response)) => {
                let pending = pending_commands.lock().await.remove(&response.id);
                match pending {
                    Some(command) => {
                        debug!("Response for command {} ({})", response.id, command.method);
                        let _ = command.sender.send(CdpResponse {
                            id: response.id,
                            result: Some(response.result),
                            error: response.error.map(|e| CdpErrorResponse {
                                code: e.code,
                                message: e.message,
                                data: e.data,
                            }),
                        });
                    }
                    None => warn!("Received response for unknown command ID: {}", response.id),
                }
            }
            Ok(CdpIncoming::Notification(notification)) => {
                let event = CdpEvent {
                    method: notification.method,
                    params: notification.params,
                    session_id: notification.session_id,
                };
                let mut subscribers = event_subscribers.lock().await;
                subscribers.retain(|sender| sender.send(event.clone()).is_ok());
            }
            Err(e) => error!("Unknown message format ({}): {}", e, text),
        }
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
            session_id: None,
        };
        let json = serde_json::to_string(&request)?;

        let (sender, receiver) = oneshot::channel();
        self.pending_commands.lock().await.insert(
            id,
            PendingCommand {
                sender,
                method: method.to_string(),
            },
        );

        debug!("Sending CDP command {}: {}", id, method);
        let sent = self.sink.lock().await.send(Message::Text(json)).await;
        if let Err(e) = sent {
            self.pending_commands.lock().await.remove(&id);
            return Err(Error::websocket(format!("Failed to send message: {}", e)));
        }

        match tokio::time::timeout(self.timeouts.for_command(method), receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{}: {} (code: {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed before command {} ({}) completed",
                id, method
            ))),
            Err(_) => {
                self.pending_commands.lock().await.remove(&id);
                Err(Error::timeout(format!("Command {} ({}) timed out", id, method)))
            }
        }
    }

    /// Subscribe to CDP events
    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let (sender, receiver) = mpsc::channel(100);
        let (unbounded_sender, mut unbounded_receiver) = mpsc::unbounded_channel();
        self.event_subscribers.lock().await.push(unbounded_sender);

        // Forward to a bounded channel so slow consumers apply backpressure here
        tokio::spawn(async move {
            while let Some(event) = unbounded_receiver.recv().await {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver)
    }

    /// Close the connection
    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing CDP WebSocket connection to {}", self.url);

        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))
    }

    /// Check if connection is active
    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
