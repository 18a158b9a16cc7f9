//! `catalog discover [--max N]`: find layout packs and their pages.

use crate::artifacts;
use crate::cartography::discover::{Discoverer, UrlList};
use crate::cli::context::StageContext;
use anyhow::Result;

/// Run discovery and write the work list and raw URL list.
pub async fn run(ctx: &StageContext, max: Option<usize>) -> Result<()> {
    let max = max.unwrap_or(ctx.config.discover.default_max);
    let renderer = ctx.renderer().await;
    let discoverer = Discoverer::new(ctx.fetch_cache()?, renderer.clone(), &ctx.config);

    let result = discoverer.discover(max).await;
    let _ = renderer.shutdown().await;
    let output = result?;

    artifacts::write_json(&ctx.workspace.discovered_path(), &output.work)?;
    artifacts::write_json(
        &ctx.workspace.raw_urls_path(),
        &UrlList {
            urls: output.urls.clone(),
        },
    )?;

    println!(
        "discover: {} pack(s), {} page(s) -> {}",
        output.work.items.len(),
        output.urls.len(),
        ctx.workspace.discovered_path().display()
    );
    Ok(())
}
