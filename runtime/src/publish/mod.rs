//! Publishing: accumulate the work list into the prior manifest, snapshot
//! it, and swap it into place. Also the post-publish schema gate and the
//! mirror of a deployed catalog.

pub mod mirror;
pub mod schema;
pub mod source;

pub use mirror::{MirrorReport, Mirrorer};
pub use schema::{SchemaGate, SchemaReport, Violation};
pub use source::{load_prior, LocalManifestSource, ManifestSource, RemoteManifestSource};

use crate::artifacts;
use crate::config::Workspace;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use pack_catalog::{finalize, Manifest, Pack, ThumbnailRewrite};
use std::path::PathBuf;
use tracing::info;

/// What a publish wrote.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub packs: usize,
    pub pages: usize,
    pub manifest_path: PathBuf,
    pub snapshot_path: PathBuf,
}

/// Writes the accumulated manifest for a workspace.
pub struct Publisher {
    workspace: Workspace,
    rewrite: ThumbnailRewrite,
}

impl Publisher {
    pub fn new(workspace: Workspace, rewrite: ThumbnailRewrite) -> Self {
        Self { workspace, rewrite }
    }

    /// Merge `fresh` into `prior` and publish the result as of `now`.
    ///
    /// Nothing is written when a thumbnail cannot be made absolute.
    pub fn publish(
        &self,
        prior: &Manifest,
        fresh: &[Pack],
        now: DateTime<Utc>,
    ) -> Result<PublishReport> {
        let items = finalize(&prior.items, fresh, &self.rewrite)
            .context("refusing to publish")?;
        let manifest = build_manifest(items, now);

        let snapshot_path = self
            .workspace
            .history_dir()
            .join(format!("manifest-{}.json", now.format("%Y%m%d")));
        artifacts::write_json(&snapshot_path, &manifest)?;

        let manifest_path = self.workspace.manifest_path();
        artifacts::write_json_atomic(&manifest_path, &manifest)?;

        info!(
            "published {} pack(s), {} page(s) to {}",
            manifest.items.len(),
            manifest.page_count(),
            manifest_path.display()
        );

        Ok(PublishReport {
            packs: manifest.items.len(),
            pages: manifest.page_count(),
            manifest_path,
            snapshot_path,
        })
    }
}

/// Wrap items in the manifest envelope stamped with `now`.
pub fn build_manifest(items: Vec<Pack>, now: DateTime<Utc>) -> Manifest {
    Manifest::publishable(
        items,
        &now.to_rfc3339_opts(SecondsFormat::Millis, true),
        &now.format("%Y.%m.%d").to_string(),
    )
}
