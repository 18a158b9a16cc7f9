//! Cross-run manifest accumulation and publish-time finalization.
//!
//! Accumulation is monotonic: a page that was published once stays in the
//! catalog until a later crawl produces a page with the same `layout_slug`,
//! which overwrites it field by field. Nothing is ever removed.

use std::collections::HashMap;

use crate::types::{CatalogError, CatalogResult, Pack};

/// Packs keyed by `pack_id`, in first-seen order.
#[derive(Debug, Default)]
pub struct Accumulator {
    packs: Vec<Pack>,
    index: HashMap<String, usize>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the accumulator from an iterator of packs.
    pub fn from_packs<'a>(packs: impl IntoIterator<Item = &'a Pack>) -> Self {
        let mut acc = Self::new();
        for pack in packs {
            acc.absorb(pack);
        }
        acc
    }

    /// Merge one pack into the accumulated set.
    ///
    /// Unknown packs are inserted (with their pages de-duplicated by slug).
    /// Known packs keep their first non-empty `pack_name`, `category`,
    /// `source_post` and facets; pages are merged by `layout_slug`.
    pub fn absorb(&mut self, pack: &Pack) {
        match self.index.get(&pack.pack_id) {
            Some(&i) => merge_into(&mut self.packs[i], pack),
            None => {
                let mut fresh = pack.clone();
                fresh.pages.clear();
                for page in &pack.pages {
                    fresh.upsert_page(page.clone());
                }
                self.index.insert(pack.pack_id.clone(), self.packs.len());
                self.packs.push(fresh);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn into_packs(self) -> Vec<Pack> {
        self.packs
    }
}

fn merge_into(existing: &mut Pack, newer: &Pack) {
    if existing.pack_name.is_empty() {
        existing.pack_name = newer.pack_name.clone();
    }
    if existing.category.is_empty() {
        existing.category = newer.category.clone();
    }
    if existing.source_post().is_none() && newer.source_post().is_some() {
        existing.source_post = newer.source_post.clone();
    }
    if existing.facets.is_empty() {
        existing.facets = newer.facets.clone();
    }
    for page in &newer.pages {
        existing.upsert_page(page.clone());
    }
}

/// Merge freshly discovered packs into previously published ones.
pub fn accumulate(prior: &[Pack], fresh: &[Pack]) -> Vec<Pack> {
    let mut acc = Accumulator::from_packs(prior);
    for pack in fresh {
        acc.absorb(pack);
    }
    acc.into_packs()
}

/// Drop fields that must never be published empty.
pub fn prune_empty_fields(items: &mut [Pack]) {
    for pack in items {
        if pack.source_post().is_none() {
            pack.source_post = None;
        }
        for page in &mut pack.pages {
            if page.thumbnail().is_none() {
                page.thumbnail = None;
            }
        }
    }
}

/// How relative thumbnail paths become absolute URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailRewrite {
    pub base_url: Option<String>,
    pub enabled: bool,
}

impl ThumbnailRewrite {
    pub fn new(base_url: Option<&str>, enabled: bool) -> Self {
        Self {
            base_url: base_url
                .map(|b| b.trim_end_matches('/').to_string())
                .filter(|b| !b.is_empty()),
            enabled,
        }
    }

    /// Rewrite a single thumbnail value, or `None` if it cannot be.
    pub fn apply(&self, thumbnail: &str) -> Option<String> {
        if is_absolute_url(thumbnail) {
            return Some(thumbnail.to_string());
        }
        match (&self.base_url, self.enabled) {
            (Some(base), true) => Some(format!("{base}/{}", thumbnail.trim_start_matches('/'))),
            _ => None,
        }
    }
}

/// Whether `value` already is an http(s) URL.
pub fn is_absolute_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Rewrite every relative thumbnail to an absolute URL.
///
/// Fails on the first thumbnail that cannot be made absolute; `items` may
/// be partially rewritten in that case and must not be published.
pub fn rewrite_thumbnails(items: &mut [Pack], rewrite: &ThumbnailRewrite) -> CatalogResult<()> {
    for pack in items.iter_mut() {
        for page in &mut pack.pages {
            let Some(thumb) = page.thumbnail() else {
                continue;
            };
            match rewrite.apply(thumb) {
                Some(url) => page.thumbnail = Some(url),
                None => {
                    return Err(CatalogError::UnrewritableThumbnail {
                        pack_id: pack.pack_id.clone(),
                        layout_slug: page.layout_slug.clone(),
                        thumbnail: thumb.to_string(),
                    })
                }
            }
        }
    }
    Ok(())
}

/// Accumulate, prune, and rewrite in one step: the publishable item list.
pub fn finalize(
    prior: &[Pack],
    fresh: &[Pack],
    rewrite: &ThumbnailRewrite,
) -> CatalogResult<Vec<Pack>> {
    let mut items = accumulate(prior, fresh);
    prune_empty_fields(&mut items);
    rewrite_thumbnails(&mut items, rewrite)?;
    tracing::debug!(
        "finalized {} pack(s) from {} prior and {} fresh",
        items.len(),
        prior.len(),
        fresh.len()
    );
    Ok(items)
}
