//! Pull preview images, links and embedded frames out of raw HTML.
//!
//! Works the same on a plain HTTP body and on the serialized DOM of a
//! rendered page, using the `scraper` crate for CSS selector parsing.

use scraper::{Html, Selector};

/// Meta tags that may carry a preview image, in priority order.
const IMAGE_META_SELECTORS: [&str; 5] = [
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:url"]"#,
    r#"meta[property="og:image:secure_url"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[name="twitter:image:src"]"#,
];

/// Find the Open Graph or Twitter preview image, resolved against `base_url`.
pub fn extract_meta_image(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for raw in IMAGE_META_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let content = document
            .select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty());
        if let Some(content) = content {
            return resolve(base_url, content);
        }
    }
    None
}

/// All `<a href>` targets, resolved to absolute URLs.
///
/// Fragments, `javascript:` and `mailto:` links are skipped.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&sel) {
        let href = element.value().attr("href").unwrap_or("").trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        if let Some(resolved) = resolve(base_url, href) {
            links.push(resolved);
        }
    }
    links
}

/// `src` of the first `<iframe>` with one, resolved.
pub fn extract_iframe_src(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("iframe[src]").ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "about:blank")
        .find_map(|s| resolve(base_url, s))
}

fn resolve(base_url: &str, href: &str) -> Option<String> {
    match url::Url::parse(base_url) {
        Ok(base) => base.join(href).ok().map(|u| u.to_string()),
        Err(_) => url::Url::parse(href).ok().map(|u| u.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_og_image_preferred_over_twitter() {
        let html = r#"
        <html><head>
        <meta name="twitter:image" content="https://cdn.site/tw.png" />
        <meta property="og:image" content="/img/og.png" />
        </head><body></body></html>
        "#;
        assert_eq!(
            extract_meta_image(html, "https://site/layouts/business/x").as_deref(),
            Some("https://site/img/og.png")
        );
    }

    #[test]
    fn test_twitter_image_fallback() {
        let html = r#"<html><head><meta name="twitter:image" content="https://cdn.site/tw.png"></head></html>"#;
        assert_eq!(
            extract_meta_image(html, "https://site/").as_deref(),
            Some("https://cdn.site/tw.png")
        );
    }

    #[test]
    fn test_empty_meta_ignored() {
        let html = r#"<html><head><meta property="og:image" content="  "></head></html>"#;
        assert!(extract_meta_image(html, "https://site/").is_none());
        assert!(extract_meta_image("", "https://site/").is_none());
    }

    #[test]
    fn test_extract_links() {
        let html = r##"
        <html><body>
        <a href="/layouts/business/cafe-about-page">About</a>
        <a href="https://site/layouts/business/cafe-home-page/">Home</a>
        <a href="#top">Top</a>
        <a href="javascript:void(0)">Nope</a>
        <a href="mailto:hi@site">Mail</a>
        </body></html>
        "##;
        let links = extract_links(html, "https://site/layouts/business/cafe-home-page");
        assert_eq!(
            links,
            vec![
                "https://site/layouts/business/cafe-about-page",
                "https://site/layouts/business/cafe-home-page/",
            ]
        );
    }

    #[test]
    fn test_iframe_src() {
        let html = r#"<body><iframe src="about:blank"></iframe><iframe src="/demo/frame"></iframe></body>"#;
        assert_eq!(
            extract_iframe_src(html, "https://site/layouts/a/b/live-demo").as_deref(),
            Some("https://site/demo/frame")
        );
        assert!(extract_iframe_src("<body></body>", "https://site/").is_none());
    }
}
