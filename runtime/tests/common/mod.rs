//! Shared test fixtures: a scripted browser and fetch-layer builders.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use catalog_runtime::acquisition::{FetchCache, HttpClient, MemoryCacheStore, RetryPolicy};
use catalog_runtime::renderer::{NavigationResult, RenderContext, Renderer};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters shared between a renderer and its contexts.
#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub active: AtomicUsize,
    /// Most contexts ever open at once.
    pub peak: AtomicUsize,
    pub screenshots: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
}

/// A browser that serves canned HTML per URL and a fixed screenshot.
pub struct ScriptedRenderer {
    pages: HashMap<String, String>,
    screenshot: Vec<u8>,
    latency: Duration,
    pub counters: Arc<Counters>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            screenshot: png(1600, 900),
            latency: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Make every navigation take `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> usize {
        self.counters.screenshots.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.counters.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let now_open = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now_open, Ordering::SeqCst);
        Ok(Box::new(ScriptedContext {
            pages: self.pages.clone(),
            screenshot: self.screenshot.clone(),
            latency: self.latency,
            current: None,
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }
}

struct ScriptedContext {
    pages: HashMap<String, String>,
    screenshot: Vec<u8>,
    latency: Duration,
    current: Option<String>,
    counters: Arc<Counters>,
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.counters
            .navigations
            .lock()
            .unwrap()
            .push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.pages.contains_key(url) {
            bail!("net::ERR_NAME_NOT_RESOLVED at {url}");
        }
        self.current = Some(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn get_html(&self) -> Result<String> {
        match &self.current {
            Some(url) => Ok(self.pages[url].clone()),
            None => bail!("no page loaded"),
        }
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout_ms: u64) -> Result<()> {
        bail!("no element for {selector:?}")
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.counters.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(self.screenshot.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A solid-color PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Fetch layer with an in-memory cache and millisecond backoff.
pub fn fetch_cache(user_agent: &str, retries: u32) -> (FetchCache, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    let client = HttpClient::new(user_agent, Duration::from_secs(5)).unwrap();
    let cache = FetchCache::new(
        client,
        store.clone(),
        RetryPolicy {
            retries,
            base_backoff: Duration::from_millis(10),
        },
    );
    (cache, store)
}
