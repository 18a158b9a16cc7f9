//! Sitemap documents: `<urlset>` pages and `<sitemapindex>` children.
//!
//! Only `<loc>` values are read. Anything else in an entry is ignored.

use anyhow::{bail, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// `<loc>` values of one sitemap document.
///
/// A `<sitemapindex>` fills `sitemaps`; a `<urlset>` fills `urls`.
/// Documents that mix both are accepted as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSitemap {
    pub urls: Vec<String>,
    pub sitemaps: Vec<String>,
}

/// The entry element currently open.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Entry {
    None,
    Url,
    Sitemap,
}

/// Parse a sitemap or sitemap index.
pub fn parse_sitemap(xml: &str) -> Result<ParsedSitemap> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedSitemap::default();
    let mut entry = Entry::None;
    let mut in_loc = false;
    let mut loc = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => bail!(
                "malformed sitemap at byte {}: {e}",
                reader.buffer_position()
            ),
        };
        match event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"url" => {
                    entry = Entry::Url;
                    loc.clear();
                }
                b"sitemap" => {
                    entry = Entry::Sitemap;
                    loc.clear();
                }
                b"loc" => in_loc = entry != Entry::None,
                _ => {}
            },
            Event::Text(text) if in_loc => {
                loc.push_str(text.unescape().unwrap_or_default().trim());
            }
            Event::CData(data) if in_loc => {
                loc.push_str(String::from_utf8_lossy(&data).trim());
            }
            Event::End(tag) => match tag.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" | b"sitemap" => {
                    let target = match entry {
                        Entry::Url => Some(&mut parsed.urls),
                        Entry::Sitemap => Some(&mut parsed.sitemaps),
                        Entry::None => None,
                    };
                    if let Some(target) = target {
                        if !loc.is_empty() {
                            target.push(std::mem::take(&mut loc));
                        }
                    }
                    entry = Entry::None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parsed)
}

/// Whether a child sitemap's file name hints at layout pages.
pub fn is_layout_sitemap(url: &str) -> bool {
    url.rsplit('/')
        .next()
        .unwrap_or(url)
        .to_ascii_lowercase()
        .contains("layout")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlset_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>https://site/layouts/business/consulting-home-page/</loc><lastmod>2024-01-15</lastmod></url>
          <url><loc>https://site/layouts/business/consulting-about-page</loc></url>
          <url><lastmod>2024-01-15</lastmod></url>
        </urlset>"#;
        let parsed = parse_sitemap(xml).unwrap();
        assert!(parsed.sitemaps.is_empty());
        assert_eq!(
            parsed.urls,
            vec![
                "https://site/layouts/business/consulting-home-page/",
                "https://site/layouts/business/consulting-about-page",
            ]
        );
    }

    #[test]
    fn test_index_children() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sitemap><loc>https://site/et_layout-sitemap.xml</loc></sitemap>
          <sitemap><loc><![CDATA[ https://site/post-sitemap.xml ]]></loc></sitemap>
        </sitemapindex>"#;
        let parsed = parse_sitemap(xml).unwrap();
        assert!(parsed.urls.is_empty());
        assert_eq!(parsed.sitemaps.len(), 2);
        assert_eq!(parsed.sitemaps[1], "https://site/post-sitemap.xml");
        assert!(is_layout_sitemap(&parsed.sitemaps[0]));
        assert!(!is_layout_sitemap(&parsed.sitemaps[1]));
    }

    #[test]
    fn test_escaped_loc() {
        let xml = "<urlset><url><loc>https://site/a?x=1&amp;y=2</loc></url></urlset>";
        assert_eq!(parse_sitemap(xml).unwrap().urls, vec!["https://site/a?x=1&y=2"]);
    }

    #[test]
    fn test_layout_hint_only_in_file_name() {
        assert!(is_layout_sitemap("https://site/LAYOUT-sitemap2.xml"));
        assert!(!is_layout_sitemap("https://layouts.site/page-sitemap.xml"));
    }

    #[test]
    fn test_garbage_never_panics() {
        let long = "<url>".repeat(10_000);
        let inputs = [
            "",
            "plain text",
            "<",
            "<url><loc>",
            "<<<>>>",
            "<urlset><url><loc></loc></url></urlset>",
            "<loc>https://orphan</loc>",
            "\x00\x01\x02",
            long.as_str(),
        ];
        for input in inputs {
            let _ = parse_sitemap(input);
        }
        assert!(parse_sitemap("<loc>https://orphan</loc>")
            .unwrap()
            .urls
            .is_empty());
    }
}
