//! chaser-steps: step-scripted browser automation over the Chrome DevTools Protocol
//!
//! Browser lifecycle events are turned into severity-filtered, color-coded
//! diagnostics on one stream while a second stream stays reserved for the
//! single machine-readable failure report. A readiness flag driven by the
//! same events lets flat sequences of steps wait for in-flight navigation.

pub mod error;
pub mod config;
pub mod util;

pub mod logging;
pub mod readiness;
pub mod reporter;

pub mod cdp;
pub mod events;
pub mod session;

// Re-exports
pub use error::{Error, Result};
pub use logging::Severity;
pub use session::{Session, SessionContext};

/// chaser-steps library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
