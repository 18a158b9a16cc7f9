//! Where the previously published manifest is read from.
//!
//! Sources are tried in order; the first one that yields a manifest wins.
//! The usual chain is the deployed copy, then the last local publish,
//! then an empty manifest.

use crate::acquisition::FetchCache;
use crate::artifacts;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pack_catalog::Manifest;
use std::path::PathBuf;
use tracing::{info, warn};

/// A place a prior manifest may live.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// `Ok(None)` when the source has nothing; `Err` when reading failed.
    async fn load(&self) -> Result<Option<Manifest>>;
}

/// The manifest deployed behind the CDN.
pub struct RemoteManifestSource {
    fetch: FetchCache,
    url: String,
}

impl RemoteManifestSource {
    pub fn new(fetch: FetchCache, url: impl Into<String>) -> Self {
        Self {
            fetch,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ManifestSource for RemoteManifestSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> Result<Option<Manifest>> {
        let body = self.fetch.fetch(&self.url).await?;
        let manifest = serde_json::from_str(&body)
            .with_context(|| format!("invalid manifest at {}", self.url))?;
        Ok(Some(manifest))
    }
}

/// The manifest written by the last local publish.
pub struct LocalManifestSource {
    path: PathBuf,
}

impl LocalManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManifestSource for LocalManifestSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Option<Manifest>> {
        if !self.path.exists() {
            return Ok(None);
        }
        artifacts::read_json(&self.path).map(Some)
    }
}

/// First manifest any source yields, or an empty one.
pub async fn load_prior(sources: &[Box<dyn ManifestSource>]) -> Manifest {
    for source in sources {
        match source.load().await {
            Ok(Some(manifest)) => {
                info!(
                    "prior manifest from {}: {} pack(s)",
                    source.describe(),
                    manifest.items.len()
                );
                return manifest;
            }
            Ok(None) => info!("no prior manifest at {}", source.describe()),
            Err(e) => warn!("prior manifest unavailable from {}: {e:#}", source.describe()),
        }
    }
    info!("starting from an empty manifest");
    Manifest::empty()
}
