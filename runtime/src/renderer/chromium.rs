//! [`Renderer`] backed by a headless Chromium over CDP (chromiumoxide).

use super::{poll_until, NavigationResult, RenderContext, Renderer};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Environment variable pointing at a Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "CATALOG_CHROMIUM_PATH";

const PATH_BINARIES: [&str; 3] = ["google-chrome", "chromium", "chromium-browser"];

const MACOS_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

const LAUNCH_FLAGS: [&str; 6] = [
    "--headless=new",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
];

/// Locate a Chromium binary: env override, home installs, `PATH`, then
/// the macOS app bundle.
pub fn find_chromium() -> Option<PathBuf> {
    let env = std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from);
    let home = dirs::home_dir()
        .map(|h| {
            vec![
                h.join(".local/share/chromium/chrome-linux64/chrome"),
                h.join(".chromium/chrome"),
            ]
        })
        .unwrap_or_default();

    env.into_iter()
        .chain(home)
        .find(|p| p.exists())
        .or_else(|| PATH_BINARIES.iter().find_map(|b| which::which(b).ok()))
        .or_else(|| {
            let mac = PathBuf::from(MACOS_CHROME);
            (cfg!(target_os = "macos") && mac.exists()).then_some(mac)
        })
}

/// Launch options for the headless browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
}

/// A launched headless Chromium.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    open: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    pub async fn new(options: &BrowserOptions) -> Result<Self> {
        let binary = find_chromium().with_context(|| {
            format!("Chromium not found. Install Chrome or set {CHROMIUM_PATH_ENV}.")
        })?;
        let (width, height) = (options.viewport_width, options.viewport_height);

        let config = LAUNCH_FLAGS
            .iter()
            .fold(BrowserConfig::builder(), |b, flag| b.arg(*flag))
            .arg(format!("--user-agent={}", options.user_agent))
            .chrome_executable(binary)
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The CDP connection only makes progress while its event stream is polled.
        tokio::spawn(async move { while events.next().await.is_some() {} });

        tracing::info!("Chromium up, viewport {width}x{height}");
        Ok(Self {
            browser: Mutex::new(browser),
            open: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to open a tab")?;
        self.open.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(ChromiumContext {
            page,
            open: Arc::clone(&self.open),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        let _ = browser.wait().await;
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.open.load(Ordering::Relaxed)
    }
}

/// One tab.
pub struct ChromiumContext {
    page: Page,
    open: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let started = Instant::now();
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await {
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Ok(Ok(_)) => {}
        }
        let final_url = match self.page.url().await {
            Ok(Some(current)) => current,
            _ => url.to_string(),
        };
        Ok(NavigationResult {
            final_url,
            load_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to read page HTML")
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let page = &self.page;
        poll_until(Duration::from_millis(timeout_ms), move || async move {
            page.find_element(selector).await.is_ok()
        })
        .await
        .with_context(|| format!("selector {selector:?} never appeared"))
    }

    async fn click(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        self.wait_for_selector(selector, timeout_ms).await?;
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("no element for {selector:?}"))?
            .click()
            .await
            .context("click failed")?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        self.page
            .screenshot(params)
            .await
            .context("screenshot failed")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.open.fetch_sub(1, Ordering::Relaxed);
        if let Err(e) = self.page.close().await {
            tracing::debug!("closing tab: {e}");
        }
        Ok(())
    }
}
