//! Core data types for layout packs, their pages, and the published manifest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Manifest schema version written by this crate.
pub const MANIFEST_SCHEMA_VERSION: &str = "1.2";

/// Seeds recorded in the manifest `source` block.
pub const MANIFEST_SEEDS: [&str; 2] = ["blog-packs", "layout-pages"];

/// One crawlable page inside a pack.
///
/// `layout_slug` is the stable key of a page within its pack. `thumbnail`
/// is absent until acquired, then a site-relative path such as
/// `thumbs/business/consulting-home-page.jpg`, and an absolute URL once
/// the manifest is published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page_name: String,
    pub layout_slug: String,
    #[serde(default)]
    pub demo_url: String,
    #[serde(default)]
    pub layout_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Fields written by newer or older versions of the pipeline.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Page {
    /// The thumbnail, if it holds a non-empty value.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref().filter(|t| !t.is_empty())
    }

    /// Overlay `newer` onto `self`: every non-empty field of `newer` wins.
    pub fn union_with(&mut self, newer: &Page) {
        overlay(&mut self.page_name, &newer.page_name);
        overlay(&mut self.layout_slug, &newer.layout_slug);
        overlay(&mut self.demo_url, &newer.demo_url);
        overlay(&mut self.layout_url, &newer.layout_url);
        if newer.thumbnail().is_some() {
            self.thumbnail = newer.thumbnail.clone();
        }
        for (key, value) in &newer.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// A themed group of pages sharing one base slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub pack_id: String,
    #[serde(default)]
    pub pack_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_post: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub facets: BTreeMap<String, Value>,
    #[serde(default = "default_approved")]
    pub approved: bool,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_approved() -> bool {
    true
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Pack {
    /// Create an empty, approved pack with default metadata.
    pub fn new(pack_id: &str, pack_name: &str, category: &str) -> Self {
        Self {
            pack_id: pack_id.to_string(),
            pack_name: pack_name.to_string(),
            category: category.to_string(),
            source_post: None,
            pages: Vec::new(),
            facets: BTreeMap::new(),
            approved: default_approved(),
            version: default_version(),
            notes: String::new(),
            extra: BTreeMap::new(),
        }
    }

    /// The source post, if it holds a non-empty value.
    pub fn source_post(&self) -> Option<&str> {
        self.source_post.as_deref().filter(|s| !s.is_empty())
    }

    /// Find a page by its layout slug.
    pub fn page(&self, layout_slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.layout_slug == layout_slug)
    }

    /// Insert a page, or union it into the page with the same slug.
    pub fn upsert_page(&mut self, page: Page) {
        match self
            .pages
            .iter_mut()
            .find(|p| p.layout_slug == page.layout_slug)
        {
            Some(existing) => existing.union_with(&page),
            None => self.pages.push(page),
        }
    }
}

/// Provenance block of a published manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestSourceInfo {
    #[serde(default)]
    pub crawl_version: String,
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// The published catalog document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub source: ManifestSourceInfo,
    #[serde(default)]
    pub items: Vec<Pack>,
}

impl Manifest {
    /// A manifest with no packs and an empty envelope.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap merged items in a fresh envelope.
    ///
    /// `generated_at` is an RFC 3339 timestamp and `crawl_version` the
    /// `YYYY.MM.DD` date of the run.
    pub fn publishable(items: Vec<Pack>, generated_at: &str, crawl_version: &str) -> Self {
        Self {
            schema: MANIFEST_SCHEMA_VERSION.to_string(),
            generated_at: generated_at.to_string(),
            source: ManifestSourceInfo {
                crawl_version: crawl_version.to_string(),
                seeds: MANIFEST_SEEDS.iter().map(|s| s.to_string()).collect(),
            },
            items,
        }
    }

    /// Find a pack by id.
    pub fn pack(&self, pack_id: &str) -> Option<&Pack> {
        self.items.iter().find(|p| p.pack_id == pack_id)
    }

    /// Total number of pages across all packs.
    pub fn page_count(&self) -> usize {
        self.items.iter().map(|p| p.pages.len()).sum()
    }
}

/// The intermediate, not-yet-merged output of discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkList {
    #[serde(default)]
    pub items: Vec<Pack>,
}

/// Replace `target` with `value` when `value` is non-empty.
fn overlay(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

/// Errors that can occur in the catalog library.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "thumbnail for {pack_id}/{layout_slug} is not http(s) ({thumbnail}). \
         Set cdn.baseUrl and cdn.rewriteThumbPaths=true."
    )]
    UnrewritableThumbnail {
        pack_id: String,
        layout_slug: String,
        thumbnail: String,
    },

    #[error("Invalid thumbnail spec: {0}")]
    InvalidSpec(String),
}

/// Convenience result type.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_union_prefers_new_non_empty_fields() {
        let mut old = Page {
            page_name: "Home".into(),
            layout_slug: "cafe-home-page".into(),
            demo_url: "https://old/live-demo".into(),
            layout_url: "https://old".into(),
            thumbnail: Some("https://cdn/thumbs/food/cafe-home-page.jpg".into()),
            extra: BTreeMap::new(),
        };
        let newer = Page {
            page_name: String::new(),
            layout_slug: "cafe-home-page".into(),
            demo_url: "https://new/live-demo".into(),
            layout_url: "https://new".into(),
            thumbnail: None,
            extra: BTreeMap::new(),
        };
        old.union_with(&newer);
        assert_eq!(old.page_name, "Home");
        assert_eq!(old.demo_url, "https://new/live-demo");
        assert_eq!(
            old.thumbnail(),
            Some("https://cdn/thumbs/food/cafe-home-page.jpg")
        );
    }

    #[test]
    fn test_page_union_keeps_published_thumbnail_over_empty_one() {
        let published = "https://cdn/thumbs/food/cafe-home-page.jpg";
        let mut old = Page {
            layout_slug: "cafe-home-page".into(),
            thumbnail: Some(published.into()),
            ..Default::default()
        };
        let newer = Page {
            layout_slug: "cafe-home-page".into(),
            thumbnail: Some(String::new()),
            ..Default::default()
        };
        old.union_with(&newer);
        assert_eq!(old.thumbnail(), Some(published));
    }

    #[test]
    fn test_pack_deserializes_with_defaults() {
        let pack: Pack = serde_json::from_str(r#"{"pack_id":"cafe","pages":[]}"#).unwrap();
        assert!(pack.approved);
        assert_eq!(pack.version, "1.0.0");
        assert!(pack.source_post.is_none());
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let json = r#"{"pack_id":"cafe","pages":[{"layout_slug":"cafe-home-page","tags":["x"]}],"rating":4}"#;
        let pack: Pack = serde_json::from_str(json).unwrap();
        assert_eq!(pack.extra.get("rating"), Some(&Value::from(4)));
        let out = serde_json::to_value(&pack).unwrap();
        assert_eq!(out["pages"][0]["tags"][0], "x");
    }

    #[test]
    fn test_empty_thumbnail_is_not_a_thumbnail() {
        let page = Page {
            layout_slug: "a".into(),
            thumbnail: Some(String::new()),
            ..Default::default()
        };
        assert!(page.thumbnail().is_none());
    }
}
