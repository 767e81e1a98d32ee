//! # Step sessions
//!
//! A session drives one page target through a queue of steps while its
//! lifecycle handlers keep the readiness flag and the diagnostic stream up
//! to date.
//!
//! ## Core concepts
//! - **SessionContext**: per-session state (config, formatter, readiness,
//!   reporter, terminated flag)
//! - **Session**: the step queue and the driver operations steps call
//!
//! ## Example
//! ```rust,no_run
//! use chaser_steps::cdp::MockCdpClient;
//! use chaser_steps::config::Config;
//! use chaser_steps::session::{Session, SessionContext};
//! use std::sync::Arc;
//!
//! # async fn example() -> chaser_steps::Result<()> {
//! let context = SessionContext::new(Config::default());
//! let session = Session::start(context, Arc::new(MockCdpClient::new())).await?;
//!
//! session
//!     .then(|s| Box::pin(async move { s.open("https://example.com").await }))
//!     .then(|s| {
//!         Box::pin(async move {
//!             s.wait_for_page_load(|| s.log("Page loaded", None)).await?;
//!             Ok(())
//!         })
//!     });
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod runner;


pub use context::SessionContext;
pub use runner::{Session, Step};
