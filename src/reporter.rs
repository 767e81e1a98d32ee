//! Result reporter
//!
//! The result stream carries nothing on success and exactly one JSON error
//! object on fatal failure.

use crate::logging::OutputStream;
use crate::util;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Fatal error object written to the result stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Always `false`
    pub success: bool,
    /// Caller-chosen code (string or number)
    #[serde(rename = "errorCode")]
    pub error_code: Value,
    /// Caller-chosen error class
    #[serde(rename = "errorType")]
    pub error_type: String,
    /// Human-readable description
    #[serde(rename = "errorMsg")]
    pub error_message: String,
}

impl ErrorReport {
    /// Build a failure report
    pub fn new(
        error_code: impl Into<Value>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error_code: error_code.into(),
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

/// Writes the session's single failure report.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    stream: OutputStream,
    reported: Arc<AtomicBool>,
}

impl ResultReporter {
    /// Create a reporter writing to `stream`
    pub fn new(stream: OutputStream) -> Self {
        Self {
            stream,
            reported: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Write `report` unless a report was already written.
    ///
    /// Returns `true` if this call produced the report.
    pub fn report(&self, report: &ErrorReport) -> bool {
        if self.reported.swap(true, Ordering::SeqCst) {
            info!("Result already reported, dropping {:?}", report.error_code);
            return false;
        }

        let rendered = match util::render_json(report) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!("Failed to serialize error report: {}", e);
                return true;
            }
        };

        if let Err(e) = self.stream.write_line(&rendered) {
            error!("Failed to write error report to {}: {}", self.stream.name(), e);
        }
        true
    }

    /// Whether a report has been written.
    pub fn has_reported(&self) -> bool {
        self.reported.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SharedBuffer;

    #[test]
    fn test_report_shape() {
        let buffer = SharedBuffer::new();
        let reporter = ResultReporter::new(buffer.stream("result"));

        assert!(reporter.report(&ErrorReport::new("E1", "TypeA", "boom")));

        let written: Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "success": false,
                "errorCode": "E1",
                "errorType": "TypeA",
                "errorMsg": "boom"
            })
        );
    }

    #[test]
    fn test_report_key_order_and_indent() {
        let buffer = SharedBuffer::new();
        let reporter = ResultReporter::new(buffer.stream("result"));
        reporter.report(&ErrorReport::new(404, "HttpError", "not found"));

        let expected = "{\n    \"success\": false,\n    \"errorCode\": 404,\n    \"errorType\": \"HttpError\",\n    \"errorMsg\": \"not found\"\n}\n";
        assert_eq!(buffer.contents(), expected);
    }

    #[test]
    fn test_report_is_written_once() {
        let buffer = SharedBuffer::new();
        let reporter = ResultReporter::new(buffer.stream("result"));

        assert!(reporter.report(&ErrorReport::new("E1", "TypeA", "boom")));
        assert!(!reporter.report(&ErrorReport::new("E2", "TypeB", "again")));

        assert!(reporter.has_reported());
        assert!(!buffer.contents().contains("E2"));
    }
}
