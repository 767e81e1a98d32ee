//! Common test utilities
//!
//! Shared helpers for the integration tests: a session wired to the mock
//! Chrome server through the real WebSocket connection, with both output
//! streams captured.

use chaser_steps::cdp::{CdpClientImpl, CdpWebSocketConnection};
use chaser_steps::config::Config;
use chaser_steps::logging::{Severity, SharedBuffer};
use chaser_steps::{Session, SessionContext};
use std::sync::Arc;

use crate::mock_chrome::MockChromeServer;

/// A started session plus its captured streams
pub struct TestSession {
    pub session: Session,
    pub diagnostics: SharedBuffer,
    pub results: SharedBuffer,
    // Keeps the server alive for the test's duration
    _server: MockChromeServer,
}

/// Config with short timings suitable for tests
pub fn test_config(threshold: Severity) -> Config {
    Config {
        log_level: threshold,
        wait_timeout_ms: 2_000,
        poll_interval_ms: 5,
        ..Config::default()
    }
}

/// Start a mock server and attach a session to it
pub async fn start_session(config: Config) -> TestSession {
    let server = MockChromeServer::start()
        .await
        .expect("Failed to start mock Chrome");
    let connection = CdpWebSocketConnection::connect(server.ws_endpoint())
        .await
        .expect("Failed to connect to mock Chrome");
    let client = Arc::new(CdpClientImpl::new(connection));

    let diagnostics = SharedBuffer::new();
    let results = SharedBuffer::new();
    let context = SessionContext::with_streams(
        config,
        diagnostics.stream("diagnostic"),
        results.stream("result"),
    );
    let session = Session::start(context, client)
        .await
        .expect("Failed to start session");

    TestSession {
        session,
        diagnostics,
        results,
        _server: server,
    }
}

/// Number of diagnostic lines carrying `label`
pub fn count_label(buffer: &SharedBuffer, label: &str) -> usize {
    buffer.contents().matches(label).count()
}
