//! `catalog enrich`: attach facet values to discovered packs.

use crate::artifacts;
use crate::cli::context::StageContext;
use anyhow::Result;

pub fn run(ctx: &StageContext) -> Result<()> {
    let path = ctx.workspace.discovered_path();
    let mut work = artifacts::read_work_list(&path)?;
    let count = pack_catalog::enrich_packs(&mut work.items);
    artifacts::write_json(&path, &work)?;
    println!("enrich: updated facets for {count} pack(s)");
    Ok(())
}
