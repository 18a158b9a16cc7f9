//! Pipeline configuration and the on-disk workspace layout.
//!
//! Configuration is a JSON document, resolved in this order:
//! 1. an explicit `--config` path
//! 2. `CATALOG_CONFIG`
//! 3. `<root>/SPECS/config.json`
//! 4. `<root>/SPECS/config.example.json`
//!
//! Missing sections fall back to their defaults.

use anyhow::{Context, Result};
use pack_catalog::{ThumbnailSpec, ThumbnailRewrite};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "DiviCatalogBot/1.0";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogConfig {
    pub user_agent: String,
    pub site: SiteConfig,
    pub viewports: Viewport,
    pub timeouts: Timeouts,
    pub thumbs: ThumbsConfig,
    pub rate_limit: RateLimit,
    pub link_health: LinkHealth,
    pub cdn: CdnConfig,
    pub discover: DiscoverConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            site: SiteConfig::default(),
            viewports: Viewport::default(),
            timeouts: Timeouts::default(),
            thumbs: ThumbsConfig::default(),
            rate_limit: RateLimit::default(),
            link_health: LinkHealth::default(),
            cdn: CdnConfig::default(),
            discover: DiscoverConfig::default(),
        }
    }
}

/// The crawled source site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    /// Scheme and host, without a trailing slash.
    pub origin: String,
    /// Hub page listing layout links. Also the default `source_post`.
    pub hub_url: String,
    pub sitemap_index_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.elegantthemes.com".to_string(),
            hub_url: "https://www.elegantthemes.com/layouts/".to_string(),
            sitemap_index_url: "https://www.elegantthemes.com/sitemap_index.xml".to_string(),
        }
    }
}

/// Browser viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub w: u32,
    pub h: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { w: 1440, h: 810 }
    }
}

/// Time budgets, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
    pub nav_ms: u64,
    pub selector_ms: u64,
    pub settle_ms: u64,
    pub consent_ms: u64,
    pub request_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            nav_ms: 30_000,
            selector_ms: 10_000,
            settle_ms: 1_500,
            consent_ms: 2_000,
            request_ms: 30_000,
        }
    }
}

impl Timeouts {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Thumbnail geometry and encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbsConfig {
    pub max_w: u32,
    pub max_h: u32,
    pub quality: u8,
    /// Selector awaited before a fallback screenshot.
    pub content_selector: String,
}

impl Default for ThumbsConfig {
    fn default() -> Self {
        Self {
            max_w: 1200,
            max_h: 675,
            quality: 80,
            content_selector: "body".to_string(),
        }
    }
}

impl ThumbsConfig {
    pub fn spec(&self) -> Result<ThumbnailSpec> {
        ThumbnailSpec::new(self.max_w, self.max_h, self.quality)
            .context("invalid thumbs configuration")
    }
}

/// Discovery parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimit {
    /// Maximum simultaneous page visits.
    pub concurrency: usize,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

/// Retry policy for transient HTTP failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkHealth {
    /// Retries after the first attempt.
    pub retry_count: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_backoff_ms: 1_000,
        }
    }
}

/// Where the published artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdnConfig {
    pub base_url: Option<String>,
    pub rewrite_thumb_paths: bool,
    /// Manifest location relative to `base_url`.
    pub manifest_path: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            rewrite_thumb_paths: false,
            manifest_path: "manifest.json".to_string(),
        }
    }
}

impl CdnConfig {
    pub fn rewrite(&self) -> ThumbnailRewrite {
        ThumbnailRewrite::new(self.base_url.as_deref(), self.rewrite_thumb_paths)
    }

    /// Absolute URL of the deployed manifest, if a base is configured.
    pub fn manifest_url(&self) -> Option<String> {
        let base = self.base_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        Some(format!(
            "{base}/{}",
            self.manifest_path.trim_start_matches('/')
        ))
    }
}

/// Discovery defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverConfig {
    /// Used when `--max` is not given. 0 means unbounded.
    pub default_max: usize,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self { default_max: 100 }
    }
}

impl CatalogConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Resolve and load the configuration for a workspace.
    pub fn load(workspace: &Workspace, explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(workspace, explicit);
        match path {
            Some(p) => {
                tracing::debug!("loading config from {}", p.display());
                Self::from_file(&p)
            }
            None => {
                tracing::warn!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn resolve_config_path(workspace: &Workspace, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(env_path) = std::env::var("CATALOG_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    let local = workspace.specs_dir().join("config.json");
    if local.exists() {
        return Some(local);
    }
    let example = workspace.specs_dir().join("config.example.json");
    if example.exists() {
        return Some(example);
    }
    None
}

/// Filesystem layout of a catalog checkout.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn specs_dir(&self) -> PathBuf {
        self.root.join("SPECS")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Published artifacts: manifest and thumbnails.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    pub fn http_cache_dir(&self) -> PathBuf {
        self.root.join(".cache").join("http")
    }

    pub fn discovered_path(&self) -> PathBuf {
        self.data_dir().join("work").join("discovered.json")
    }

    pub fn raw_urls_path(&self) -> PathBuf {
        self.data_dir().join("raw").join("layout_pages.json")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir().join("history")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dist_dir().join("manifest.json")
    }

    pub fn schema_path(&self) -> PathBuf {
        self.specs_dir().join("manifest.schema.json")
    }

    /// Create every directory the pipeline writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.data_dir().join("raw"),
            self.data_dir().join("work"),
            self.history_dir(),
            self.dist_dir().join("thumbs"),
            self.http_cache_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: CatalogConfig = serde_json::from_str(
            r#"{"userAgent":"TestBot/2","thumbs":{"maxW":640},"cdn":{"baseUrl":"https://cdn.example","rewriteThumbPaths":true}}"#,
        )
        .unwrap();
        assert_eq!(cfg.user_agent, "TestBot/2");
        assert_eq!(cfg.thumbs.max_w, 640);
        assert_eq!(cfg.thumbs.max_h, 675);
        assert_eq!(cfg.link_health.retry_count, 3);
        assert!(cfg.cdn.rewrite_thumb_paths);
        assert_eq!(cfg.rate_limit.concurrency, 3);
    }

    #[test]
    fn test_shipped_example_config_parses() {
        let cfg: CatalogConfig =
            serde_json::from_str(include_str!("../../SPECS/config.example.json")).unwrap();
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.timeouts.consent_ms, 2_000);
        assert!(cfg.cdn.base_url.is_none());
        assert!(cfg.thumbs.spec().is_ok());
    }

    #[test]
    fn test_manifest_url() {
        let mut cdn = CdnConfig::default();
        assert!(cdn.manifest_url().is_none());
        cdn.base_url = Some("https://cdn.example/".into());
        assert_eq!(
            cdn.manifest_url().as_deref(),
            Some("https://cdn.example/manifest.json")
        );
    }

    #[test]
    fn test_load_prefers_local_over_example() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        std::fs::create_dir_all(ws.specs_dir()).unwrap();
        std::fs::write(
            ws.specs_dir().join("config.example.json"),
            r#"{"userAgent":"Example/1"}"#,
        )
        .unwrap();
        assert_eq!(
            resolve_config_path(&ws, None),
            Some(ws.specs_dir().join("config.example.json"))
        );
        std::fs::write(ws.specs_dir().join("config.json"), r#"{"userAgent":"Local/1"}"#).unwrap();
        let cfg = CatalogConfig::from_file(&resolve_config_path(&ws, None).unwrap()).unwrap();
        assert_eq!(cfg.user_agent, "Local/1");
    }

    #[test]
    fn test_workspace_layout() {
        let ws = Workspace::new("/tmp/catalog");
        assert_eq!(
            ws.discovered_path(),
            PathBuf::from("/tmp/catalog/data/work/discovered.json")
        );
        assert_eq!(
            ws.manifest_path(),
            PathBuf::from("/tmp/catalog/dist/manifest.json")
        );
    }
}
