//! Per-session state
//!
//! Everything a session's handlers and steps share: the configuration, the
//! diagnostic formatter, the readiness flag, the result reporter and the
//! terminated flag. Two contexts never share any of it, so independent
//! sessions can run side by side in one process.

use crate::config::Config;
use crate::logging::{ChannelFormatter, OutputStream, Severity};
use crate::readiness::ReadinessTracker;
use crate::reporter::{ErrorReport, ResultReporter};
use crate::Error;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared state for one automation session
#[derive(Debug, Clone)]
pub struct SessionContext {
    config: Arc<Config>,
    formatter: ChannelFormatter,
    readiness: ReadinessTracker,
    reporter: ResultReporter,
    terminated: Arc<AtomicBool>,
}

impl SessionContext {
    /// Context writing diagnostics to stderr and the result to stdout
    pub fn new(config: Config) -> Self {
        Self::with_streams(config, OutputStream::stderr(), OutputStream::stdout())
    }

    /// Context over explicit diagnostic and result streams
    pub fn with_streams(config: Config, diagnostics: OutputStream, results: OutputStream) -> Self {
        Self {
            formatter: ChannelFormatter::new(config.log_level, diagnostics),
            readiness: ReadinessTracker::new(),
            reporter: ResultReporter::new(results),
            terminated: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        }
    }

    /// Read-only configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Diagnostic formatter
    pub fn formatter(&self) -> &ChannelFormatter {
        &self.formatter
    }

    /// Readiness flag
    pub fn readiness(&self) -> &ReadinessTracker {
        &self.readiness
    }

    /// Result reporter
    pub fn reporter(&self) -> &ResultReporter {
        &self.reporter
    }

    /// Emit a diagnostic at `category` (INFO when absent).
    pub fn log(&self, message: &str, category: Option<Severity>) {
        self.formatter.emit(message, category);
    }

    /// Write the failure report and terminate the session.
    ///
    /// Only the first call reports. The returned error is meant to be
    /// propagated out of the current step.
    pub fn fail(
        &self,
        error_code: impl Into<Value>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Error {
        let report = ErrorReport::new(error_code, error_type, error_message);
        if self.reporter.report(&report) {
            info!("Session failed with {} ({})", report.error_type, report.error_code);
        }
        self.terminate();
        Error::SessionTerminated
    }

    /// Terminate without a report. Later emissions and steps are dropped.
    pub fn terminate(&self) {
        self.formatter.close();
        self.terminated.store(true, Ordering::SeqCst);
    }

    /// Whether `fail` or `terminate` has been called.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}
