//! Discoverer: resolves which layout pages exist and groups them into packs.
//!
//! Candidate layout URLs come from two sources, merged and de-duplicated:
//!
//! 1. **Hub**: anchors on the layouts hub page shaped `/layouts/<cat>/<slug>`
//! 2. **Sitemaps**: `<loc>` entries of the layout-related child sitemaps
//!
//! Each candidate is then rendered in the browser to find sibling pages of
//! the same pack. Visits run with bounded parallelism; the crawl delay from
//! robots.txt is honored by every visit before it touches the site.

use crate::acquisition::{structured, FetchCache};
use crate::cartography::layout_url::{self, LayoutRef};
use crate::cartography::robots::{self, RobotsPolicy};
use crate::cartography::sitemap;
use crate::config::{CatalogConfig, SiteConfig};
use crate::renderer::{dismiss_consent, Renderer};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use pack_catalog::{Pack, Page, WorkList};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Output of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutput {
    /// Packs found in this pass, not merged with any history.
    pub work: WorkList,
    /// Every inner-page URL that ended up as a page.
    pub urls: Vec<String>,
}

/// The raw URL artifact written next to the work list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlList {
    pub urls: Vec<String>,
}

/// Pages found while visiting one candidate layout.
#[derive(Debug, Clone)]
pub struct Visit {
    pub layout: LayoutRef,
    pub inner: Vec<LayoutRef>,
}

/// Link discovery over hub, sitemaps and rendered pages.
pub struct Discoverer {
    fetch: FetchCache,
    renderer: Arc<dyn Renderer>,
    site: SiteConfig,
    concurrency: usize,
    nav_timeout_ms: u64,
    consent_timeout_ms: u64,
}

impl Discoverer {
    pub fn new(fetch: FetchCache, renderer: Arc<dyn Renderer>, config: &CatalogConfig) -> Self {
        Self {
            fetch,
            renderer,
            site: config.site.clone(),
            concurrency: config.rate_limit.concurrency.max(1),
            nav_timeout_ms: config.timeouts.nav_ms,
            consent_timeout_ms: config.timeouts.consent_ms,
        }
    }

    /// Run a full discovery pass. `max` bounds the candidates visited; 0 is unbounded.
    pub async fn discover(&self, max: usize) -> Result<DiscoveryOutput> {
        let start = Instant::now();
        let robots = robots::fetch_robots(&self.fetch, &self.site.origin).await;

        let mut candidates = self.candidate_links().await?;
        let total = candidates.len();
        if max > 0 {
            candidates.truncate(max);
        }
        info!(
            "visiting {} of {} candidate layout(s) with concurrency {}",
            candidates.len(),
            total,
            self.concurrency
        );

        let visits: Vec<Visit> = stream::iter(candidates)
            .map(|layout| self.visit(layout, robots))
            .buffered(self.concurrency)
            .collect()
            .await;

        let output = assemble(&visits);
        info!(
            "discovered {} pack(s), {} page(s) in {:.1}s",
            output.work.items.len(),
            output.urls.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(output)
    }

    /// Hub and sitemap candidates, de-duplicated by normalized URL.
    ///
    /// Fails only when the hub is unreachable and the sitemaps gave nothing.
    pub async fn candidate_links(&self) -> Result<Vec<LayoutRef>> {
        let hub = self.hub_links().await;
        let from_sitemaps = self.sitemap_links().await;

        let hub = match hub {
            Ok(links) => links,
            Err(e) if !from_sitemaps.is_empty() => {
                warn!("hub unavailable, using sitemaps only: {e:#}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        info!(
            "candidates: {} from hub, {} from sitemaps",
            hub.len(),
            from_sitemaps.len()
        );
        Ok(dedupe(hub.into_iter().chain(from_sitemaps)))
    }

    /// Layout links on the hub page.
    pub async fn hub_links(&self) -> Result<Vec<LayoutRef>> {
        let html = self
            .fetch
            .fetch(&self.site.hub_url)
            .await
            .with_context(|| format!("failed to fetch hub {}", self.site.hub_url))?;
        Ok(hub_layout_links(&html, &self.site.hub_url))
    }

    /// Layout links from layout-related child sitemaps. Failures are per sitemap.
    pub async fn sitemap_links(&self) -> Vec<LayoutRef> {
        let index = match self.fetch.fetch(&self.site.sitemap_index_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("sitemap index unavailable: {e}");
                return Vec::new();
            }
        };
        let children = match sitemap::parse_sitemap(&index) {
            Ok(parsed) => parsed.sitemaps,
            Err(e) => {
                warn!("sitemap index unparseable: {e:#}");
                return Vec::new();
            }
        };

        let mut links = Vec::new();
        for child in children.iter().filter(|u| sitemap::is_layout_sitemap(u)) {
            let body = match self.fetch.fetch(child).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("skipping sitemap {child}: {e}");
                    continue;
                }
            };
            match sitemap::parse_sitemap(&body) {
                Ok(parsed) => {
                    let before = links.len();
                    links.extend(
                        parsed
                            .urls
                            .iter()
                            .filter_map(|u| layout_url::parse_layout_url(u)),
                    );
                    debug!("{} layout(s) in {child}", links.len() - before);
                }
                Err(e) => warn!("skipping sitemap {child}: {e:#}"),
            }
        }
        links
    }

    /// Render one candidate and collect its sibling pages.
    ///
    /// Rendering failures degrade to the candidate alone.
    pub async fn visit(&self, layout: LayoutRef, robots: RobotsPolicy) -> Visit {
        robots.wait().await;
        match self.rendered_html(&layout.url).await {
            Ok(html) => {
                let inner = inner_pages(&html, &layout);
                debug!("{}: {} inner page(s)", layout.url, inner.len());
                Visit { layout, inner }
            }
            Err(e) => {
                warn!("render failed for {}: {e:#}", layout.url);
                let inner = vec![layout.clone()];
                Visit { layout, inner }
            }
        }
    }

    async fn rendered_html(&self, url: &str) -> Result<String> {
        let mut ctx = self
            .renderer
            .new_context()
            .await
            .context("failed to create browser context")?;

        let result = async {
            ctx.navigate(url, self.nav_timeout_ms).await?;
            dismiss_consent(ctx.as_ref(), self.consent_timeout_ms).await;
            ctx.get_html().await
        }
        .await;

        let _ = ctx.close().await;
        result
    }
}

/// Links on a hub page matching `/layouts/<category>/<slug>`.
pub fn hub_layout_links(html: &str, hub_url: &str) -> Vec<LayoutRef> {
    dedupe(
        structured::extract_links(html, hub_url)
            .iter()
            .filter_map(|href| layout_url::parse_layout_url(href)),
    )
}

/// Sibling pages of `layout` linked from its rendered HTML.
///
/// Keeps links in the same category whose slug carries a recognized page
/// suffix and reduces to the same pack base. The visited page itself is
/// always part of the result.
pub fn inner_pages(html: &str, layout: &LayoutRef) -> Vec<LayoutRef> {
    let base = layout.pack_base();
    let siblings = structured::extract_links(html, &layout.url)
        .into_iter()
        .filter_map(|href| layout_url::parse_layout_url(&href))
        .filter(|r| {
            r.category == layout.category
                && layout_url::has_page_suffix(&r.layout_slug)
                && r.pack_base() == base
        });
    dedupe(std::iter::once(layout.clone()).chain(siblings))
}

/// Group visited pages into packs keyed by pack base.
///
/// Packs are created on first sighting; a `(category, slug)` pair is only
/// turned into a page once.
pub fn assemble(visits: &[Visit]) -> DiscoveryOutput {
    let mut packs: Vec<Pack> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut urls = Vec::new();

    for page_ref in visits.iter().flat_map(|v| v.inner.iter()) {
        let key = (page_ref.category.clone(), page_ref.layout_slug.clone());
        if !seen.insert(key) {
            continue;
        }

        let base = page_ref.pack_base();
        let idx = *by_id.entry(base.clone()).or_insert_with(|| {
            packs.push(Pack::new(
                &base,
                &layout_url::title_case(&base),
                &page_ref.category,
            ));
            packs.len() - 1
        });

        packs[idx].upsert_page(Page {
            page_name: layout_url::page_name(&page_ref.layout_slug),
            layout_slug: page_ref.layout_slug.clone(),
            demo_url: page_ref.demo_url(),
            layout_url: page_ref.url.clone(),
            ..Default::default()
        });
        urls.push(page_ref.url.clone());
    }

    DiscoveryOutput {
        work: WorkList { items: packs },
        urls,
    }
}

fn dedupe(refs: impl IntoIterator<Item = LayoutRef>) -> Vec<LayoutRef> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}
