//! `catalog mirror`: download a deployed catalog for offline use.

use crate::cli::context::StageContext;
use crate::publish::Mirrorer;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn run(ctx: &StageContext, out: &Path, manifest_url: Option<&str>) -> Result<()> {
    let url = match manifest_url {
        Some(u) => u.to_string(),
        None => ctx
            .config
            .cdn
            .manifest_url()
            .context("no --manifest-url given and cdn.baseUrl is not configured")?,
    };

    let report = Mirrorer::new(ctx.fetch_cache()?, out).mirror(&url).await?;

    println!("Saved manifest to {}", report.manifest_path.display());
    println!(
        "Downloaded {} thumbnail(s); failures: {}",
        report.downloaded, report.failed
    );
    Ok(())
}
