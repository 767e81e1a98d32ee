//! Channel formatter
//!
//! Renders diagnostics as styled terminal lines and writes the admitted ones
//! to the diagnostic stream. It never touches the result stream.

use super::severity::Severity;
use super::stream::OutputStream;
use crate::util;
use owo_colors::{OwoColorize, Style};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Label text and style for a category.
fn label(category: Severity) -> (&'static str, Style) {
    match category {
        Severity::Message => ("[REMSG]", Style::new().bold().bright_white().on_green()),
        Severity::Request => ("[ RQST]", Style::new().bold().bright_white().on_magenta()),
        Severity::Response => ("[ RESP]", Style::new().bold().bright_white().on_blue()),
        Severity::Debug => ("[DEBUG]", Style::new().bright_yellow()),
        Severity::Error => ("[ERROR]", Style::new().bold().bright_white().on_red()),
        Severity::Warn => ("[ WARN]", Style::new().bold().bright_red()),
        Severity::Info => ("[ INFO]", Style::new().bright_green()),
    }
}

/// Render one diagnostic line (without trailing newline).
pub fn render(category: Severity, message: &str, timestamp: &str) -> String {
    let (text, style) = label(category);
    format!(
        "{} {} {}",
        text.style(style),
        timestamp.style(Style::new().bright_cyan()),
        message.style(Style::new().bright_white())
    )
}

/// Severity-filtered writer for the diagnostic stream.
#[derive(Debug, Clone)]
pub struct ChannelFormatter {
    threshold: Severity,
    stream: OutputStream,
    closed: Arc<AtomicBool>,
}

impl ChannelFormatter {
    /// Create a formatter admitting events at or above `threshold`.
    pub fn new(threshold: Severity, stream: OutputStream) -> Self {
        Self {
            threshold,
            stream,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configured minimum severity.
    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Whether `category` would currently produce a line.
    pub fn is_enabled(&self, category: Severity) -> bool {
        !self.closed.load(Ordering::SeqCst) && category.admitted_by(self.threshold)
    }

    /// Emit `message` at `category` (INFO when absent).
    ///
    /// Write failures are reported through tracing and otherwise ignored.
    pub fn emit(&self, message: &str, category: Option<Severity>) {
        let category = category.unwrap_or_default();
        if !self.is_enabled(category) {
            return;
        }

        let line = render(category, message, &util::timestamp());
        if let Err(e) = self.stream.write_line(&line) {
            debug!("Failed to write diagnostic to {}: {}", self.stream.name(), e);
        }
    }

    /// Emit with a category given by name; unknown names are treated as INFO.
    pub fn emit_named(&self, message: &str, category: &str) {
        self.emit(message, Some(Severity::parse_lenient(category)));
    }

    /// Stop emitting for good. Called once the session has terminated.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SharedBuffer;

    fn capture(threshold: Severity) -> (ChannelFormatter, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (ChannelFormatter::new(threshold, buffer.stream("diagnostic")), buffer)
    }

    #[test]
    fn test_render_layout() {
        let line = render(Severity::Warn, "Step error", "Mon Oct 19 2026 3:04:05 PM");
        let label_at = line.find("[ WARN]").unwrap();
        let ts_at = line.find("Mon Oct 19 2026 3:04:05 PM").unwrap();
        let msg_at = line.find("Step error").unwrap();
        assert!(label_at < ts_at && ts_at < msg_at);
        assert!(line.starts_with('\u{1b}'));
        assert!(line.ends_with("\u{1b}[0m"));
    }

    #[test]
    fn test_render_labels_are_fixed_width() {
        for category in Severity::ALL {
            let (text, _) = label(category);
            assert_eq!(text.len(), 7, "{}", category);
        }
    }

    #[test]
    fn test_emit_respects_threshold() {
        for threshold in Severity::ALL {
            for category in Severity::ALL {
                let (formatter, buffer) = capture(threshold);
                formatter.emit("msg", Some(category));
                let expected = usize::from(category.rank() >= threshold.rank());
                assert_eq!(buffer.lines().len(), expected, "{} at {}", category, threshold);
            }
        }
    }

    #[test]
    fn test_emit_defaults_to_info() {
        let (formatter, buffer) = capture(Severity::Info);
        formatter.emit("hello", None);
        assert!(buffer.contents().contains("[ INFO]"));

        let (formatter, buffer) = capture(Severity::Warn);
        formatter.emit("hello", None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_emit_named_treats_unknown_as_info() {
        let (formatter, buffer) = capture(Severity::Debug);
        formatter.emit_named("odd", "shouting");
        formatter.emit_named("warned", "warn");
        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[ INFO]"));
        assert!(lines[1].contains("[ WARN]"));
    }

    #[test]
    fn test_emit_does_not_deduplicate() {
        let (formatter, buffer) = capture(Severity::Info);
        formatter.emit("same", Some(Severity::Info));
        formatter.emit("same", Some(Severity::Info));
        assert_eq!(buffer.lines().len(), 2);
    }

    #[test]
    fn test_closed_formatter_is_silent() {
        let (formatter, buffer) = capture(Severity::Debug);
        formatter.close();
        formatter.emit("late", Some(Severity::Error));
        assert!(buffer.is_empty());
        assert!(formatter.is_closed());
    }
}
