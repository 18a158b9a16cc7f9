//! Mirror a deployed catalog: its manifest plus every thumbnail it names.

use crate::acquisition::FetchCache;
use crate::artifacts;
use anyhow::{Context, Result};
use pack_catalog::{Manifest, THUMBNAIL_EXT};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Counts from one mirror run.
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    pub manifest_path: PathBuf,
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads a published manifest and its thumbnails into a directory.
pub struct Mirrorer {
    fetch: FetchCache,
    out_dir: PathBuf,
}

impl Mirrorer {
    pub fn new(fetch: FetchCache, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetch,
            out_dir: out_dir.into(),
        }
    }

    /// Fetch the manifest at `manifest_url`, then each thumbnail.
    ///
    /// The manifest must download; individual thumbnails may fail.
    pub async fn mirror(&self, manifest_url: &str) -> Result<MirrorReport> {
        info!("downloading manifest from {manifest_url}");
        let body = self
            .fetch
            .fetch_bytes(manifest_url)
            .await
            .context("failed to fetch manifest")?;
        let manifest: Manifest =
            serde_json::from_slice(&body).context("manifest is not valid JSON")?;

        let manifest_path = self.out_dir.join("manifest.json");
        artifacts::write_json(&manifest_path, &manifest)?;

        let mut report = MirrorReport {
            manifest_path,
            ..Default::default()
        };

        for pack in &manifest.items {
            let category = if pack.category.is_empty() {
                "unknown"
            } else {
                pack.category.as_str()
            };
            for page in &pack.pages {
                let Some(url) = page.thumbnail() else {
                    continue;
                };
                let Some(target) = mirror_path(&self.out_dir, category, &page.layout_slug, url)
                else {
                    report.failed += 1;
                    warn!(
                        "skipping {url}: unsafe category or slug {category:?}/{:?}",
                        page.layout_slug
                    );
                    continue;
                };
                match self.download(url, &target).await {
                    Ok(()) => report.downloaded += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!("failed: {url}: {e:#}");
                    }
                }
            }
        }

        info!(
            "mirrored {} thumbnail(s), {} failure(s)",
            report.downloaded, report.failed
        );
        Ok(report)
    }

    async fn download(&self, url: &str, target: &Path) -> Result<()> {
        let bytes = self.fetch.fetch_bytes(url).await?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, bytes)
            .with_context(|| format!("failed to write {}", target.display()))
    }
}

/// Whether `name` is exactly one plain path component.
fn is_single_segment(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `<out>/thumbs/<category>/<slug>.<ext>`, keeping the extension of `url`.
///
/// `None` when the category or slug would leave `out_dir`.
pub fn mirror_path(
    out_dir: &Path,
    category: &str,
    layout_slug: &str,
    url: &str,
) -> Option<PathBuf> {
    if !is_single_segment(category) || !is_single_segment(layout_slug) {
        return None;
    }
    let ext = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|e| !e.is_empty() && e.len() <= 5)
        .unwrap_or_else(|| THUMBNAIL_EXT.to_string());
    Some(
        out_dir
            .join("thumbs")
            .join(category)
            .join(format!("{layout_slug}.{ext}")),
    )
}
