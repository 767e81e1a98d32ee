//! # Lifecycle events
//!
//! The driver reports navigation, script errors, console output and
//! resource traffic as a stream of lifecycle events. This module defines
//! those events, the bus that dispatches them, the subscriber that turns
//! them into diagnostics and readiness updates, and the translation from
//! raw CDP notifications.
//!
//! ## Module structure
//! - `kind`: event tags and the event record
//! - `bus`: the per-session dispatch table
//! - `subscriber`: the diagnostic/readiness handlers
//! - `translate`: CDP notification mapping

pub mod bus;
pub mod kind;
pub mod subscriber;
pub mod translate;

pub use bus::{EventBus, Handler};
pub use kind::{EventKind, LifecycleEvent};
pub use subscriber::{format_trace, EventSubscriber};
pub use translate::{EventTranslator, REQUIRED_DOMAINS};
