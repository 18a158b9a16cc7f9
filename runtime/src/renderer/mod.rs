//! Headless browser seam.
//!
//! Discovery reads the rendered DOM of layout pages through a
//! [`RenderContext`]; thumbnail capture uses one for meta tags and
//! viewport screenshots. [`chromium`] is the real engine, [`NoopRenderer`]
//! stands in when no browser can be launched.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Selectors of cookie/consent "accept" buttons, tried as one group.
pub const CONSENT_SELECTORS: &str = "#onetrust-accept-btn-handler, \
     .cky-btn-accept, \
     #cookie_action_close_header, \
     .cmplz-accept, \
     button[aria-label='Accept all'], \
     button[data-testid='uc-accept-all-button']";

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Wait until an element matching `selector` exists.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str, timeout_ms: u64) -> Result<()>;
    /// PNG screenshot of the current viewport (not the full page).
    async fn screenshot(&self) -> Result<Vec<u8>>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Best-effort dismissal of a cookie/consent overlay.
///
/// Returns whether a button was clicked. Never fails.
pub async fn dismiss_consent(ctx: &dyn RenderContext, timeout_ms: u64) -> bool {
    match ctx.click(CONSENT_SELECTORS, timeout_ms).await {
        Ok(()) => {
            tracing::debug!("dismissed consent overlay");
            true
        }
        Err(_) => false,
    }
}

/// Poll `probe` until it succeeds or `timeout` elapses.
pub(crate) async fn poll_until<F, Fut>(timeout: Duration, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if probe().await {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            anyhow::bail!("timed out after {}ms", timeout.as_millis());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Static HTTP tiers keep working; every browser tier fails and is
/// skipped by its caller.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available (HTTP-only mode)"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
