//! `catalog publish`: accumulate the work list into the published manifest.

use crate::artifacts;
use crate::cli::context::StageContext;
use crate::publish::{
    load_prior, LocalManifestSource, ManifestSource, Publisher, RemoteManifestSource,
};
use anyhow::Result;

/// Prior-manifest sources in priority order: deployed copy, then local.
pub fn prior_sources(ctx: &StageContext) -> Result<Vec<Box<dyn ManifestSource>>> {
    let mut sources: Vec<Box<dyn ManifestSource>> = Vec::new();
    if let Some(url) = ctx.config.cdn.manifest_url() {
        sources.push(Box::new(RemoteManifestSource::new(ctx.fetch_cache()?, url)));
    }
    sources.push(Box::new(LocalManifestSource::new(
        ctx.workspace.manifest_path(),
    )));
    Ok(sources)
}

pub async fn run(ctx: &StageContext) -> Result<()> {
    let work = artifacts::read_work_list(&ctx.workspace.discovered_path())?;
    let prior = load_prior(&prior_sources(ctx)?).await;

    let publisher = Publisher::new(ctx.workspace.clone(), ctx.config.cdn.rewrite());
    let report = publisher.publish(&prior, &work.items, chrono::Utc::now())?;

    println!(
        "publish: wrote {} ({} pack(s), {} page(s), accumulated)",
        report.manifest_path.display(),
        report.packs,
        report.pages
    );
    Ok(())
}
