//! Thumbnail tier ordering with a mock site and a scripted browser.

mod common;

use catalog_runtime::cartography::robots::RobotsPolicy;
use catalog_runtime::renderer::{NoopRenderer, Renderer};
use catalog_runtime::thumbnail::{AcquireOptions, ThumbnailAcquirer, Tier};
use common::ScriptedRenderer;
use pack_catalog::{Pack, Page, ThumbnailSpec};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HUB: &str = "https://site.example/layouts/";

fn options(root: &Path) -> AcquireOptions {
    AcquireOptions {
        spec: ThumbnailSpec::new(320, 180, 75).unwrap(),
        artifact_root: root.to_path_buf(),
        hub_url: HUB.to_string(),
        nav_timeout_ms: 1_000,
        consent_timeout_ms: 10,
        selector_timeout_ms: 10,
        settle: Duration::ZERO,
        content_selector: "main".to_string(),
    }
}

fn pack_for(base: &str) -> Pack {
    let layout = format!("{base}/layouts/business/consulting-home-page");
    let mut pack = Pack::new("consulting", "Consulting", "business");
    pack.pages.push(Page {
        page_name: "Home".into(),
        layout_slug: "consulting-home-page".into(),
        demo_url: format!("{layout}/live-demo"),
        layout_url: layout,
        ..Default::default()
    });
    pack
}

#[tokio::test]
async fn existing_file_short_circuits_without_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let existing = dir
        .path()
        .join("thumbs/business/consulting-home-page.jpg");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"already here").unwrap();

    let renderer = Arc::new(ScriptedRenderer::new());
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, renderer.clone(), options(dir.path()));

    let mut items = vec![pack_for(&server.uri())];
    let summary = acquirer.acquire_all(&mut items).await;

    assert_eq!(summary.count(Tier::Existing), 1);
    assert_eq!(
        items[0].pages[0].thumbnail.as_deref(),
        Some("thumbs/business/consulting-home-page.jpg")
    );
    assert_eq!(items[0].source_post.as_deref(), Some(HUB));
    assert_eq!(renderer.opened(), 0);
    assert_eq!(std::fs::read(&existing).unwrap(), b"already here");
}

#[tokio::test]
async fn static_meta_image_skips_browser() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/layouts/business/consulting-home-page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta property="og:image" content="/img/cover.png"></head></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/cover.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(common::png(800, 800)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(ScriptedRenderer::new());
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, renderer.clone(), options(dir.path()));

    let mut pack = pack_for(&server.uri());
    let tier = acquirer.acquire_page("business", &mut pack.pages[0]).await;

    assert_eq!(tier, Some(Tier::StaticMeta));
    assert_eq!(renderer.screenshots(), 0);
    assert_eq!(renderer.opened(), 0);

    let written = dir.path().join("thumbs/business/consulting-home-page.jpg");
    let img = image::open(&written).unwrap();
    assert_eq!((img.width(), img.height()), (320, 180));
}

#[tokio::test]
async fn framed_demo_screenshot_is_last_resort() {
    let server = MockServer::start().await;
    // The layout page is blocked for plain HTTP clients.
    Mock::given(method("GET"))
        .and(path("/layouts/business/consulting-home-page"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let layout = format!("{uri}/layouts/business/consulting-home-page");
    let demo = format!("{layout}/live-demo");
    let frame = format!("{uri}/demo-frame/consulting");
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .with_page(&layout, "<html><head><title>No meta</title></head></html>")
            .with_page(&demo, format!(r#"<iframe src="{frame}"></iframe>"#))
            .with_page(&frame, "<main>content</main>"),
    );
    let dir = tempfile::tempdir().unwrap();
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, renderer.clone(), options(dir.path()));

    let mut items = vec![pack_for(&uri)];
    let summary = acquirer.acquire_all(&mut items).await;

    assert_eq!(summary.count(Tier::Screenshot), 1);
    assert_eq!(renderer.screenshots(), 1);
    assert_eq!(renderer.navigations(), vec![layout, demo, frame]);
    assert_eq!(renderer.active_contexts(), 0);
    assert!(dir
        .path()
        .join("thumbs/business/consulting-home-page.jpg")
        .exists());
}

#[tokio::test]
async fn exhausted_tiers_leave_page_without_thumbnail() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let renderer: Arc<dyn Renderer> = Arc::new(NoopRenderer);
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, renderer, options(dir.path()));

    let mut items = vec![pack_for(&server.uri())];
    let summary = acquirer.acquire_all(&mut items).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total(), 1);
    assert!(items[0].pages[0].thumbnail.is_none());
    assert!(items[0].source_post.is_none());
}

#[tokio::test]
async fn undecodable_meta_image_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/layouts/business/consulting-home-page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<meta name="twitter:image" content="/img/broken.png">"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let demo = format!("{uri}/layouts/business/consulting-home-page/live-demo");
    let renderer = Arc::new(ScriptedRenderer::new().with_page(&demo, "<main>demo</main>"));
    let dir = tempfile::tempdir().unwrap();
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, renderer.clone(), options(dir.path()));

    let mut pack = pack_for(&uri);
    let tier = acquirer.acquire_page("business", &mut pack.pages[0]).await;

    assert_eq!(tier, Some(Tier::Screenshot));
    assert_eq!(renderer.screenshots(), 1);
}

fn delay(ms: u64) -> RobotsPolicy {
    RobotsPolicy {
        allowed: true,
        crawl_delay: Duration::from_millis(ms),
    }
}

#[tokio::test]
async fn crawl_delay_precedes_each_network_page() {
    // Nothing is mounted, so every tier fails after the wait.
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, Arc::new(NoopRenderer), options(dir.path()))
        .with_robots(delay(150));

    let mut items = vec![pack_for(&server.uri()), pack_for(&server.uri())];
    items[1].pages[0].layout_slug = "consulting-about-page".into();

    let start = std::time::Instant::now();
    let summary = acquirer.acquire_all(&mut items).await;

    assert_eq!(summary.failed, 2);
    assert!(
        start.elapsed() >= Duration::from_millis(300),
        "two pages at 150ms each, got {:?}",
        start.elapsed()
    );
}

#[tokio::test(start_paused = true)]
async fn existing_file_skips_crawl_delay() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("thumbs/business/consulting-home-page.jpg");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"already here").unwrap();

    let (fetch, _) = common::fetch_cache("TestBot/1.0", 0);
    let acquirer = ThumbnailAcquirer::new(fetch, Arc::new(NoopRenderer), options(dir.path()))
        .with_robots(delay(3_600_000));

    let mut page = pack_for("https://site.example").pages.remove(0);
    let start = tokio::time::Instant::now();
    let tier = acquirer.acquire_page("business", &mut page).await;

    assert_eq!(tier, Some(Tier::Existing));
    assert!(start.elapsed() < Duration::from_secs(1));
}
