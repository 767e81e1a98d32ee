//! # chaser-steps
//!
//! Opens each URL given on the command line in a fresh page target, waits
//! for it to finish loading and logs its title.
//!
//! Diagnostics go to stderr. Stdout stays empty on success and carries one
//! JSON error object when the run fails.
//!
//! ## Environment variables
//! - `CHASER_CONFIG`: TOML config file (replaces the variables below)
//! - `CHASER_CDP_ENDPOINT`: CDP endpoint (default: ws://localhost:9222)
//! - `CHASER_LOG_LEVEL`: minimum diagnostic severity (default: info)
//! - `CHASER_VERBOSE`: trace resource requests and responses
//! - `CHASER_WAIT_TIMEOUT` / `CHASER_STEP_TIMEOUT` / `CHASER_POLL_INTERVAL`: milliseconds
//! - `RUST_LOG`: operational tracing filter

use chaser_steps::{
    cdp::{CdpBrowser, CdpBrowserImpl, CdpClient},
    config::Config,
    Error, Session, SessionContext,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn load_config() -> chaser_steps::Result<Config> {
    match std::env::var("CHASER_CONFIG") {
        Ok(path) => Config::from_file(&path),
        Err(_) => Config::from_env(),
    }
}

async fn connect(browser: &CdpBrowserImpl) -> chaser_steps::Result<Arc<dyn CdpClient>> {
    let version = browser.get_version().await?;
    info!("Connected to {} (protocol {})", version.product, version.protocol_version);

    let target = browser.create_target("about:blank").await?;
    browser.create_client(&target).await
}

fn queue_url(session: &Session, url: String) {
    session.then(move |s| {
        Box::pin(async move {
            if let Err(e) = s.open(&url).await {
                return Err(s.fail("NAVIGATION_FAILED", e.kind(), e.to_string()).await);
            }

            if s.wait_for_page_load(|| ()).await?.is_none() {
                let message = format!("{} did not finish loading", url);
                return Err(s.fail("NAVIGATION_FAILED", "TimeoutError", message).await);
            }

            let title = s.evaluate("document.title").await?;
            let location = s.current_url().await?;
            s.log(
                &format!("Loaded {} ({})", location, title.as_str().unwrap_or_default()),
                None,
            );
            Ok(())
        })
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    // Operational tracing shares stderr with diagnostics; stdout is the result stream
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    info!("chaser-steps v{}", chaser_steps::VERSION);

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            let context = SessionContext::new(Config::default());
            context.fail("CONFIGURATION_ERROR", e.kind(), e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let urls: Vec<String> = std::env::args().skip(1).collect();
    let context = SessionContext::new(config);
    if urls.is_empty() {
        context.log("Usage: chaser-steps <url>...", Some(chaser_steps::Severity::Error));
        return ExitCode::from(2);
    }

    let browser = CdpBrowserImpl::new(context.config().cdp_endpoint.clone());
    let client = match connect(&browser).await {
        Ok(client) => client,
        Err(e) => {
            context.fail("CONNECTION_FAILED", e.kind(), e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let session = match Session::start(context.clone(), client).await {
        Ok(session) => session,
        Err(e) => {
            context.fail("CONNECTION_FAILED", e.kind(), e.to_string());
            close_browser(&browser).await;
            return ExitCode::FAILURE;
        }
    };

    for url in urls {
        queue_url(&session, url);
    }

    let outcome = match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::SessionTerminated) => ExitCode::FAILURE,
        Err(e) => {
            let _ = session.fail("RUN_FAILED", e.kind(), e.to_string()).await;
            ExitCode::FAILURE
        }
    };

    close_browser(&browser).await;
    outcome
}

async fn close_browser(browser: &CdpBrowserImpl) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser connections: {}", e);
    }
}
