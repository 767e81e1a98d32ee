//! # Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket plumbing between a step session and a Chrome/Chromium target.
//!
//! ## Module layout
//! - `traits`: the connection, client and browser interfaces
//! - `types`: JSON-RPC wire types
//! - `connection`: WebSocket connection with command/response matching
//! - `client`: typed client over a connection
//! - `browser`: target discovery over the HTTP endpoints
//! - `mock`: scripted client for tests
//!
//! ## Example
//! ```rust,no_run
//! use chaser_steps::cdp::{CdpBrowser, CdpBrowserImpl, CdpClient};
//!
//! # async fn example() -> chaser_steps::Result<()> {
//! let browser = CdpBrowserImpl::new("ws://localhost:9222");
//! let target = browser.create_target("about:blank").await?;
//! let client = browser.create_client(&target).await?;
//!
//! let result = client.navigate("https://example.com").await?;
//! println!("Navigating to: {}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod mock;

#[cfg(test)]
mod tests;

pub use traits::{
    CdpConnection, CdpClient, CdpBrowser, CdpEvent, CdpResponse, CdpError,
    NavigationResult, EvaluationResult, ScreenshotFormat, BrowserVersion,
};

pub use connection::{CdpTimeoutConfig, CdpWebSocketConnection};
pub use client::CdpClientImpl;
pub use browser::CdpBrowserImpl;

pub use mock::{MockCdpClient, MockCdpConnection};
