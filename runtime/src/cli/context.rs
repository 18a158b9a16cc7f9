//! Everything a stage needs: the workspace, its configuration, and
//! constructors for the shared fetch layer and the browser.

use crate::acquisition::{FetchCache, FsCacheStore, HttpClient, RetryPolicy};
use crate::config::{CatalogConfig, Workspace};
use crate::renderer::chromium::{BrowserOptions, ChromiumRenderer};
use crate::renderer::{NoopRenderer, Renderer};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Resolved workspace plus configuration for one CLI invocation.
pub struct StageContext {
    pub workspace: Workspace,
    pub config: CatalogConfig,
}

impl StageContext {
    /// Load the configuration for `root` and make sure its directories exist.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let workspace = Workspace::new(root);
        let config = CatalogConfig::load(&workspace, config_path)?;
        workspace.ensure_dirs()?;
        Ok(Self { workspace, config })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.config.link_health.retry_count,
            base_backoff: Duration::from_millis(self.config.link_health.retry_backoff_ms),
        }
    }

    /// Fetch layer backed by the on-disk HTTP cache.
    pub fn fetch_cache(&self) -> Result<FetchCache> {
        let client = HttpClient::new(&self.config.user_agent, self.config.timeouts.request())?;
        let store = FsCacheStore::new(self.workspace.http_cache_dir())?;
        Ok(FetchCache::new(client, Arc::new(store), self.retry_policy()))
    }

    /// Headless Chromium, or a renderer that refuses every context.
    pub async fn renderer(&self) -> Arc<dyn Renderer> {
        let options = BrowserOptions {
            viewport_width: self.config.viewports.w,
            viewport_height: self.config.viewports.h,
            user_agent: self.config.user_agent.clone(),
        };
        match ChromiumRenderer::new(&options).await {
            Ok(renderer) => {
                info!("Chromium renderer initialized");
                Arc::new(renderer)
            }
            Err(e) => {
                warn!("Failed to initialize Chromium: {e:#}");
                warn!("Running in HTTP-only mode (browser pages are skipped)");
                Arc::new(NoopRenderer)
            }
        }
    }
}
