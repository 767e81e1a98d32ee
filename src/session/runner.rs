//! Step session
//!
//! Drives one page target through a queue of steps. CDP notifications are
//! translated into lifecycle events and published on the session's bus,
//! where the subscriber keeps the readiness flag and the diagnostic stream
//! up to date while the steps run.

use super::context::SessionContext;
use crate::cdp::{CdpClient, EvaluationResult, ScreenshotFormat};
use crate::events::{EventBus, EventKind, EventSubscriber, EventTranslator, LifecycleEvent, REQUIRED_DOMAINS};
use crate::logging::Severity;
use crate::{util, Error, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// A queued step
pub type Step = Box<dyn for<'a> FnOnce(&'a Session) -> BoxFuture<'a, Result<()>> + Send>;

/// One automation session over one page target
pub struct Session {
    context: SessionContext,
    bus: Arc<EventBus>,
    client: Arc<dyn CdpClient>,
    steps: Mutex<VecDeque<Step>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session with its subscriber attached but no event source.
    ///
    /// Lifecycle events only arrive through [`publish`](Self::publish) until
    /// [`start`](Self::start) wires up the client's event stream.
    pub fn new(context: SessionContext, client: Arc<dyn CdpClient>) -> Self {
        let bus = Arc::new(EventBus::new());
        EventSubscriber::new(&context).attach(&bus);
        Self {
            context,
            bus,
            client,
            steps: Mutex::new(VecDeque::new()),
            pump: Mutex::new(None),
        }
    }

    /// Create a session, prepare the target and start pumping its events.
    pub async fn start(context: SessionContext, client: Arc<dyn CdpClient>) -> Result<Self> {
        let session = Self::new(context, client);
        session.attach().await?;
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn attach(&self) -> Result<()> {
        for domain in REQUIRED_DOMAINS {
            self.client.enable_domain(domain).await?;
        }
        self.client.apply_page_settings(&self.context.config().page).await?;

        let mut events = self.client.subscribe_events("*").await?;
        let bus = Arc::clone(&self.bus);
        let handle = tokio::spawn(async move {
            let mut translator = EventTranslator::new();
            while let Some(event) = events.recv().await {
                if let Some(lifecycle) = translator.translate(&event) {
                    bus.publish(&lifecycle);
                }
            }
            debug!("CDP event stream closed");
        });

        if let Ok(mut pump) = self.pump.lock() {
            *pump = Some(handle);
        }
        info!("Session attached");
        Ok(())
    }

    /// Session state
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Event bus, for registering additional handlers
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Underlying CDP client
    pub fn client(&self) -> &Arc<dyn CdpClient> {
        &self.client
    }

    /// Whether the page is settled (no navigation in flight).
    pub fn is_page_loaded(&self) -> bool {
        self.context.readiness().is_ready()
    }

    /// Publish a lifecycle event to this session's handlers.
    pub fn publish(&self, event: LifecycleEvent) {
        if self.context.is_terminated() {
            debug!("Session terminated, dropping {}", event.kind);
            return;
        }
        self.bus.publish(&event);
    }

    fn ensure_active(&self) -> Result<()> {
        if self.context.is_terminated() {
            return Err(Error::SessionTerminated);
        }
        Ok(())
    }

    /// Start navigating to `url`.
    ///
    /// Returns as soon as the browser has accepted the navigation; use
    /// [`wait_for_page_load`](Self::wait_for_page_load) to wait for it to
    /// finish. A rejected navigation publishes `load.failed` and settles the
    /// readiness flag again, as does a navigation that stays in the current
    /// document.
    pub async fn open(&self, url: &str) -> Result<()> {
        self.ensure_active()?;
        self.publish(LifecycleEvent::new(EventKind::LoadStarted, json!({ "url": url })));

        let failure = match self.client.navigate(url).await {
            Ok(result) => match result.error_text {
                None => {
                    // Same-document navigations never fire a load event
                    if result.loader_id.is_none() {
                        self.publish(LifecycleEvent::new(
                            EventKind::LoadFinished,
                            json!({ "status": "success", "url": url }),
                        ));
                    }
                    return Ok(());
                }
                Some(reason) => Error::navigation_failed(format!("{}: {}", url, reason)),
            },
            Err(e) => e,
        };

        self.publish(LifecycleEvent::new(
            EventKind::LoadFailed,
            json!({ "url": url, "errorString": failure.to_string() }),
        ));
        self.publish(LifecycleEvent::new(EventKind::LoadFinished, json!({ "status": "fail" })));
        Err(failure)
    }

    /// Poll `predicate` until it holds or the wait timeout expires.
    ///
    /// Returns `Ok(false)` after publishing `waitFor.timeout` when the wait
    /// was abandoned.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<bool>
    where
        F: FnMut(&Session) -> bool,
    {
        self.ensure_active()?;
        let config = self.context.config();

        let poll = async {
            while !predicate(self) {
                tokio::time::sleep(config.poll_interval()).await;
            }
        };

        match tokio::time::timeout(config.wait_timeout(), poll).await {
            Ok(()) => Ok(true),
            Err(_) => {
                self.publish(LifecycleEvent::new(
                    EventKind::WaitTimeout,
                    json!({ "timeout": config.wait_timeout_ms }),
                ));
                Ok(false)
            }
        }
    }

    /// Wait for in-flight navigation to settle, then run `on_ready` once.
    ///
    /// Returns `Ok(None)` after publishing `waitFor.timeout` when the page
    /// did not settle within the wait timeout; `on_ready` is not run then.
    pub async fn wait_for_page_load<F, R>(&self, on_ready: F) -> Result<Option<R>>
    where
        F: FnOnce() -> R,
    {
        self.ensure_active()?;
        let config = self.context.config();

        let ready = self.context.readiness().await_ready(config.poll_interval(), on_ready);
        match tokio::time::timeout(config.wait_timeout(), ready).await {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                self.publish(LifecycleEvent::new(
                    EventKind::WaitTimeout,
                    json!({ "timeout": config.wait_timeout_ms, "condition": "page load" }),
                ));
                Ok(None)
            }
        }
    }

    /// Queue a step.
    pub fn then<F>(&self, step: F) -> &Self
    where
        F: for<'a> FnOnce(&'a Session) -> BoxFuture<'a, Result<()>> + Send + 'static,
    {
        match self.steps.lock() {
            Ok(mut steps) => steps.push_back(Box::new(step)),
            Err(_) => warn!("Step queue poisoned, dropping step"),
        }
        self
    }

    /// Number of steps still queued
    pub fn pending_steps(&self) -> usize {
        self.steps.lock().map(|steps| steps.len()).unwrap_or(0)
    }

    fn next_step(&self) -> Option<Step> {
        self.steps.lock().ok()?.pop_front()
    }

    fn clear_steps(&self) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.clear();
        }
    }

    /// Run queued steps in order.
    ///
    /// A failing step publishes `step.error` and the run continues with the
    /// next step. If the step timeout expires, `timeout` is published and
    /// the remaining steps are dropped. Terminating the session stops the
    /// run with [`Error::SessionTerminated`].
    pub async fn run(&self) -> Result<()> {
        self.run_then(|_| Ok(())).await
    }

    /// [`run`](Self::run), then call `on_complete`. A failing completion
    /// callback publishes `complete.error`.
    #[instrument(skip_all)]
    pub async fn run_then<F>(&self, on_complete: F) -> Result<()>
    where
        F: FnOnce(&Session) -> Result<()>,
    {
        self.ensure_active()?;

        let steps = async {
            let mut index = 0usize;
            while let Some(step) = self.next_step() {
                index += 1;
                debug!("Running step {}", index);
                match step(self).await {
                    Ok(()) => {}
                    Err(Error::SessionTerminated) => return Err(Error::SessionTerminated),
                    Err(e) => self.publish(LifecycleEvent::new(
                        EventKind::StepError,
                        json!({ "step": index, "errorType": e.kind(), "message": e.to_string() }),
                    )),
                }
                self.ensure_active()?;
            }
            Ok(())
        };

        let config = self.context.config();
        match config.step_timeout() {
            Some(limit) => match tokio::time::timeout(limit, steps).await {
                Ok(result) => result?,
                Err(_) => {
                    let dropped = self.pending_steps();
                    self.clear_steps();
                    self.publish(LifecycleEvent::new(
                        EventKind::Timeout,
                        json!({ "timeout": config.step_timeout_ms, "droppedSteps": dropped }),
                    ));
                    return Err(Error::timeout(format!("Run exceeded {:?}", limit)));
                }
            },
            None => steps.await?,
        }

        if let Err(e) = on_complete(self) {
            self.publish(LifecycleEvent::new(
                EventKind::CompleteError,
                json!({ "errorType": e.kind(), "message": e.to_string() }),
            ));
        }
        Ok(())
    }

    /// Emit a diagnostic at `category` (INFO when absent).
    pub fn log(&self, message: &str, category: Option<Severity>) {
        self.context.log(message, category);
    }

    /// Log `message` at ERROR unless `test` holds. Returns `test`.
    pub fn assert(&self, test: bool, message: &str) -> bool {
        self.assert_with(test, message, || {})
    }

    /// Like [`assert`](Self::assert), also running `on_fail` when `test`
    /// does not hold.
    pub fn assert_with<F: FnOnce()>(&self, test: bool, message: &str, on_fail: F) -> bool {
        if !test {
            self.log(message, Some(Severity::Error));
            on_fail();
        }
        test
    }

    /// Log `message` at ERROR if `test` holds. Returns `!test`.
    pub fn assert_not(&self, test: bool, message: &str) -> bool {
        self.assert_with(!test, message, || {})
    }

    /// Like [`assert_not`](Self::assert_not), also running `on_fail` when
    /// `test` holds.
    pub fn assert_not_with<F: FnOnce()>(&self, test: bool, message: &str, on_fail: F) -> bool {
        self.assert_with(!test, message, on_fail)
    }

    /// Save a PNG screenshot to `path`, or to `<epoch-millis>_screenshot.png`
    /// in the working directory.
    pub async fn snap(&self, path: Option<&Path>) -> Result<PathBuf> {
        self.ensure_active()?;
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(format!(
                "{}_screenshot.png",
                chrono::Utc::now().timestamp_millis()
            )),
        };

        let png = self.client.screenshot(ScreenshotFormat::Png).await?;
        tokio::fs::write(&path, png).await?;
        debug!("Screenshot saved to {}", path.display());
        Ok(path)
    }

    /// [`snap`](Self::snap), then end the session.
    pub async fn snap_and_exit(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = self.snap(path).await?;
        self.exit().await;
        Ok(path)
    }

    /// Pretty-print `value` with a 4-space indent.
    pub fn render_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        util::render_json(value)
    }

    /// Report a fatal failure on the result stream and end the session.
    ///
    /// Returns the error to propagate out of the current step.
    pub async fn fail(
        &self,
        error_code: impl Into<Value>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Error {
        let error = self.context.fail(error_code, error_type, error_message);
        self.disconnect().await;
        error
    }

    /// End the session without a report.
    pub async fn exit(&self) {
        self.context.terminate();
        self.disconnect().await;
    }

    async fn disconnect(&self) {
        self.clear_steps();
        if let Err(e) = self.client.connection().close().await {
            debug!("Failed to close CDP connection: {}", e);
        }
    }

    /// URL of the current document.
    pub async fn current_url(&self) -> Result<String> {
        self.ensure_active()?;
        self.client.current_url().await
    }

    /// Evaluate `script` in the page, awaiting promises.
    pub async fn evaluate(&self, script: &str) -> Result<EvaluationResult> {
        self.ensure_active()?;
        self.client.evaluate(script, true).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("bus", &self.bus)
            .field("pending_steps", &self.pending_steps())
            .finish()
    }
}
