//! The `/layouts/<category>/<slug>` URL convention and slug arithmetic.
//!
//! A layout slug is `<pack-base>-<page-type>-page`, e.g.
//! `design-agency-contact-page` belongs to pack `design-agency`.

use regex::Regex;
use std::sync::OnceLock;

/// Page-type tokens stripped from a slug to find its pack base.
pub const PAGE_TYPES: [&str; 6] = ["home", "about", "contact", "team", "services", "portfolio"];

/// Path segment introducing layout pages.
pub const LAYOUTS_SEGMENT: &str = "layouts";

fn page_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"-({})-page$", PAGE_TYPES.join("|"))).expect("valid suffix regex")
    })
}

/// A parsed layout page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutRef {
    /// Absolute URL without query, fragment, or trailing slash.
    pub url: String,
    pub category: String,
    pub layout_slug: String,
}

impl LayoutRef {
    /// Pack id this page belongs to.
    pub fn pack_base(&self) -> String {
        pack_base(&self.layout_slug)
    }

    /// The live demo of this layout.
    pub fn demo_url(&self) -> String {
        format!("{}/live-demo", self.url)
    }
}

/// Canonical form of an absolute URL: no query, no fragment, no trailing slash.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = url::Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    let s = url.to_string();
    Some(s.trim_end_matches('/').to_string())
}

/// Parse a URL of the exact shape `/layouts/<category>/<slug>`.
pub fn parse_layout_url(raw: &str) -> Option<LayoutRef> {
    let url = normalize_url(raw)?;
    let parsed = url::Url::parse(&url).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    match segments.as_slice() {
        [LAYOUTS_SEGMENT, category, slug] => Some(LayoutRef {
            url,
            category: (*category).to_string(),
            layout_slug: (*slug).to_string(),
        }),
        _ => None,
    }
}

/// Strip a known `-<type>-page` suffix: `consulting-home-page` → `consulting`.
pub fn pack_base(slug: &str) -> String {
    page_suffix_re().replace(slug, "").into_owned()
}

/// Whether the slug ends in one of the recognized `-<type>-page` suffixes.
pub fn has_page_suffix(slug: &str) -> bool {
    page_suffix_re().is_match(slug)
}

/// The page-type token of a `...-<token>-page` slug.
pub fn page_token(slug: &str) -> Option<&str> {
    let rest = slug.strip_suffix("-page")?;
    let token = rest.rsplit('-').next()?;
    if token.is_empty() || token == rest {
        return None;
    }
    Some(token)
}

/// `design-agency` → `Design Agency`.
pub fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display name of a page: its title-cased page-type token, or `Page`.
pub fn page_name(slug: &str) -> String {
    page_token(slug)
        .map(title_case)
        .unwrap_or_else(|| "Page".to_string())
}
