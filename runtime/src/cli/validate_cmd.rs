//! `catalog validate`: check the published manifest against its schema.

use crate::cli::context::StageContext;
use crate::publish::SchemaGate;
use anyhow::{bail, Result};

pub fn run(ctx: &StageContext) -> Result<()> {
    let gate = SchemaGate::from_file(&ctx.workspace.schema_path())?;
    let report = gate.check_file(&ctx.workspace.manifest_path())?;

    if !report.is_valid() {
        eprintln!("Schema validation failed");
        for v in &report.violations {
            let at = if v.instance_path.is_empty() {
                "/"
            } else {
                v.instance_path.as_str()
            };
            eprintln!("  {at}: {} ({})", v.message, v.schema_path);
        }
        bail!(
            "manifest.json has {} schema violation(s)",
            report.violations.len()
        );
    }

    println!("validate: manifest.json is valid");
    Ok(())
}
