//! Thumbnail acquisition: one image per page, first successful tier wins.
//!
//! | Tier | Source |
//! |------|--------|
//! | 1 | Encoded file already on disk, no network |
//! | 2 | `og:image` / `twitter:image` in the static HTML |
//! | 3 | The same meta tags in the browser-rendered DOM |
//! | 4 | Viewport screenshot of the live demo |
//!
//! Tiers 2 to 4 yield raw image bytes that are normalized and written by
//! the caller. A failing tier hands over to the next one; when all fail the
//! page simply keeps no thumbnail.

use crate::acquisition::{structured, FetchCache};
use crate::cartography::robots::RobotsPolicy;
use crate::config::CatalogConfig;
use crate::renderer::{dismiss_consent, RenderContext, Renderer};
use anyhow::{Context, Result};
use pack_catalog::{
    normalize_thumbnail, thumbnail_file_path, thumbnail_relative_path, write_thumbnail, Pack,
    Page, ThumbnailSpec,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a thumbnail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Existing,
    StaticMeta,
    RenderedMeta,
    Screenshot,
}

impl Tier {
    /// Tiers that need the network, in the order they are tried.
    pub const NETWORK: [Tier; 3] = [Tier::StaticMeta, Tier::RenderedMeta, Tier::Screenshot];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Existing => "existing file",
            Tier::StaticMeta => "static meta image",
            Tier::RenderedMeta => "rendered meta image",
            Tier::Screenshot => "demo screenshot",
        };
        f.write_str(name)
    }
}

/// Knobs for the acquirer, usually taken from [`CatalogConfig`].
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    pub spec: ThumbnailSpec,
    /// Directory that `thumbs/` lives under.
    pub artifact_root: PathBuf,
    /// Backfilled into packs without a `source_post`.
    pub hub_url: String,
    pub nav_timeout_ms: u64,
    pub consent_timeout_ms: u64,
    pub selector_timeout_ms: u64,
    pub settle: Duration,
    pub content_selector: String,
}

impl AcquireOptions {
    pub fn from_config(config: &CatalogConfig, artifact_root: PathBuf) -> Result<Self> {
        Ok(Self {
            spec: config.thumbs.spec()?,
            artifact_root,
            hub_url: config.site.hub_url.clone(),
            nav_timeout_ms: config.timeouts.nav_ms,
            consent_timeout_ms: config.timeouts.consent_ms,
            selector_timeout_ms: config.timeouts.selector_ms,
            settle: config.timeouts.settle(),
            content_selector: config.thumbs.content_selector.clone(),
        })
    }
}

/// Per-run tally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquireSummary {
    pub by_tier: BTreeMap<Tier, usize>,
    pub failed: usize,
}

impl AcquireSummary {
    pub fn total(&self) -> usize {
        self.by_tier.values().sum::<usize>() + self.failed
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.by_tier.get(&tier).copied().unwrap_or(0)
    }
}

/// Sequential thumbnail capture over a work list.
pub struct ThumbnailAcquirer {
    fetch: FetchCache,
    renderer: Arc<dyn Renderer>,
    options: AcquireOptions,
    robots: RobotsPolicy,
}

impl ThumbnailAcquirer {
    pub fn new(fetch: FetchCache, renderer: Arc<dyn Renderer>, options: AcquireOptions) -> Self {
        Self {
            fetch,
            renderer,
            options,
            robots: RobotsPolicy::permissive(),
        }
    }

    /// Honor a crawl delay before each page that needs the network.
    pub fn with_robots(mut self, robots: RobotsPolicy) -> Self {
        self.robots = robots;
        self
    }

    /// Acquire thumbnails for every page of every pack, one page at a time.
    pub async fn acquire_all(&self, items: &mut [Pack]) -> AcquireSummary {
        let start = Instant::now();
        let mut summary = AcquireSummary::default();

        for pack in items.iter_mut() {
            let category = pack.category.clone();
            let mut any = false;
            for page in pack.pages.iter_mut() {
                match self.acquire_page(&category, page).await {
                    Some(tier) => {
                        *summary.by_tier.entry(tier).or_default() += 1;
                        any = true;
                    }
                    None => summary.failed += 1,
                }
            }
            if any && pack.source_post().is_none() {
                pack.source_post = Some(self.options.hub_url.clone());
            }
        }

        info!(
            "thumbnails: {} page(s), {} failed, in {:.1}s",
            summary.total(),
            summary.failed,
            start.elapsed().as_secs_f64()
        );
        summary
    }

    /// Run the tiers for one page. Sets `page.thumbnail` on success.
    pub async fn acquire_page(&self, category: &str, page: &mut Page) -> Option<Tier> {
        let relative = thumbnail_relative_path(category, &page.layout_slug);
        let path = thumbnail_file_path(&self.options.artifact_root, category, &page.layout_slug);

        if path.exists() {
            debug!("{}: thumbnail already on disk", page.layout_slug);
            page.thumbnail = Some(relative);
            return Some(Tier::Existing);
        }

        self.robots.wait().await;

        for tier in Tier::NETWORK {
            let raw = match self.run_tier(tier, page).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!("{}: {tier} not available", page.layout_slug);
                    continue;
                }
                Err(e) => {
                    warn!("{}: {tier} failed: {e:#}", page.layout_slug);
                    continue;
                }
            };

            let stored = normalize_thumbnail(&raw, &self.options.spec)
                .and_then(|encoded| write_thumbnail(&path, &encoded));
            match stored {
                Ok(()) => {
                    info!("{}: thumbnail from {tier}", page.layout_slug);
                    page.thumbnail = Some(relative);
                    return Some(tier);
                }
                Err(e) => warn!("{}: unusable image from {tier}: {e}", page.layout_slug),
            }
        }

        warn!("{}: no thumbnail from any source", page.layout_slug);
        None
    }

    async fn run_tier(&self, tier: Tier, page: &Page) -> Result<Option<Vec<u8>>> {
        match tier {
            Tier::Existing => Ok(None),
            Tier::StaticMeta => self.static_meta_image(page).await,
            Tier::RenderedMeta => self.rendered_meta_image(page).await,
            Tier::Screenshot => self.demo_screenshot(page).await,
        }
    }

    /// Tier 2: meta image from the plain HTTP body.
    pub async fn static_meta_image(&self, page: &Page) -> Result<Option<Vec<u8>>> {
        let html = self.fetch.fetch(&page.layout_url).await?;
        let Some(image_url) = structured::extract_meta_image(&html, &page.layout_url) else {
            return Ok(None);
        };
        debug!("{}: static meta image {image_url}", page.layout_slug);
        Ok(Some(self.fetch.fetch_bytes(&image_url).await?))
    }

    /// Tier 3: meta image from the rendered DOM.
    pub async fn rendered_meta_image(&self, page: &Page) -> Result<Option<Vec<u8>>> {
        let mut ctx = self.open_context().await?;
        let rendered = async {
            ctx.navigate(&page.layout_url, self.options.nav_timeout_ms)
                .await?;
            dismiss_consent(ctx.as_ref(), self.options.consent_timeout_ms).await;
            ctx.get_html().await
        }
        .await;
        let _ = ctx.close().await;
        let html = rendered?;

        let Some(image_url) = structured::extract_meta_image(&html, &page.layout_url) else {
            return Ok(None);
        };
        debug!("{}: rendered meta image {image_url}", page.layout_slug);
        Ok(Some(self.fetch.fetch_bytes(&image_url).await?))
    }

    /// Tier 4: viewport screenshot of the demo, or of its embedded frame.
    pub async fn demo_screenshot(&self, page: &Page) -> Result<Option<Vec<u8>>> {
        let mut ctx = self.open_context().await?;
        let shot = async {
            ctx.navigate(&page.demo_url, self.options.nav_timeout_ms)
                .await?;
            dismiss_consent(ctx.as_ref(), self.options.consent_timeout_ms).await;

            let html = ctx.get_html().await?;
            if let Some(frame) = structured::extract_iframe_src(&html, &page.demo_url) {
                debug!("{}: demo is framed, opening {frame}", page.layout_slug);
                ctx.navigate(&frame, self.options.nav_timeout_ms).await?;
            }

            if let Err(e) = ctx
                .wait_for_selector(
                    &self.options.content_selector,
                    self.options.selector_timeout_ms,
                )
                .await
            {
                debug!("{}: {e:#}, capturing anyway", page.layout_slug);
            }
            if !self.options.settle.is_zero() {
                tokio::time::sleep(self.options.settle).await;
            }
            ctx.screenshot().await
        }
        .await;
        let _ = ctx.close().await;
        Ok(Some(shot?))
    }

    async fn open_context(&self) -> Result<Box<dyn RenderContext>> {
        self.renderer
            .new_context()
            .await
            .context("failed to create browser context")
    }
}
