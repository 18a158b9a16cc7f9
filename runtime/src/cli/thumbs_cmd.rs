//! `catalog thumbs`: acquire a thumbnail for every discovered page.

use crate::artifacts;
use crate::cartography::robots;
use crate::cli::context::StageContext;
use crate::thumbnail::{AcquireOptions, ThumbnailAcquirer, Tier};
use anyhow::Result;

/// Acquire thumbnails and write the updated work list back.
pub async fn run(ctx: &StageContext) -> Result<()> {
    let path = ctx.workspace.discovered_path();
    let mut work = artifacts::read_work_list(&path)?;

    let fetch = ctx.fetch_cache()?;
    let policy = robots::fetch_robots(&fetch, &ctx.config.site.origin).await;
    let options = AcquireOptions::from_config(&ctx.config, ctx.workspace.dist_dir())?;
    let renderer = ctx.renderer().await;

    let acquirer = ThumbnailAcquirer::new(fetch, renderer.clone(), options).with_robots(policy);
    let summary = acquirer.acquire_all(&mut work.items).await;
    let _ = renderer.shutdown().await;

    artifacts::write_json(&path, &work)?;

    println!(
        "thumbs: {} existing, {} static meta, {} rendered meta, {} screenshot, {} failed",
        summary.count(Tier::Existing),
        summary.count(Tier::StaticMeta),
        summary.count(Tier::RenderedMeta),
        summary.count(Tier::Screenshot),
        summary.failed
    );
    Ok(())
}
