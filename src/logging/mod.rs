//! # Diagnostic logging
//!
//! Severity-filtered, color-coded diagnostics for a step session.
//!
//! Diagnostics are written to their own stream (stderr by default) so the
//! result stream stays machine-readable. This is the product channel that
//! script authors read; the crate's own operational logging goes through
//! `tracing`.
//!
//! ## Module structure
//! - `severity`: the category ranking and threshold test
//! - `formatter`: line rendering and the filtered emitter
//! - `stream`: shared writers for the two channels

pub mod formatter;
pub mod severity;
pub mod stream;

pub use formatter::{render, ChannelFormatter};
pub use severity::{should_emit, Severity};
pub use stream::{OutputStream, SharedBuffer};
