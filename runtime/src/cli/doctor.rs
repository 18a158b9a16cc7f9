//! `catalog doctor`: check that a workspace is ready to run the pipeline.

use crate::cli::context::StageContext;
use crate::publish::SchemaGate;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::process::Command;

/// Report Chromium, schema, cache and memory readiness.
pub async fn run(ctx: &StageContext) -> Result<()> {
    println!("Catalog Doctor");
    println!("==============");
    println!();
    println!("Root:       {}", ctx.workspace.root().display());
    println!("Site:       {}", ctx.config.site.origin);
    println!("User agent: {}", ctx.config.user_agent);
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Set CATALOG_CHROMIUM_PATH; discovery and screenshots will be skipped."
        ),
    }

    let schema_path = ctx.workspace.schema_path();
    let schema_ok = match SchemaGate::from_file(&schema_path) {
        Ok(_) => {
            println!("[OK] Schema compiles: {}", schema_path.display());
            true
        }
        Err(e) => {
            println!("[!!] Schema unusable: {e:#}");
            false
        }
    };

    match ctx.config.cdn.manifest_url() {
        Some(url) if ctx.config.cdn.rewrite_thumb_paths => {
            println!("[OK] Publishing to {url}")
        }
        Some(url) => println!(
            "[!!] cdn.rewriteThumbPaths is off; publish fails on relative thumbnails ({url})"
        ),
        None => println!("[!!] cdn.baseUrl not set; publish fails on relative thumbnails"),
    }

    let cache_dir = ctx.workspace.http_cache_dir();
    let cached = std::fs::read_dir(&cache_dir)
        .map(|d| d.filter_map(|e| e.ok()).count())
        .unwrap_or(0);
    println!("[OK] HTTP cache: {} ({cached} entries)", cache_dir.display());

    match get_available_memory_mb() {
        Some(mb) if mb >= 512 => println!("[OK] Available memory: {mb}MB (>= 512MB for Chromium)"),
        Some(mb) => println!("[!!] Available memory: {mb}MB (< 512MB, browser tiers may fail)"),
        None => println!("[??] Could not determine available memory"),
    }

    println!();
    if chromium.is_some() && schema_ok {
        println!("Status: READY");
    } else {
        println!("Status: DEGRADED");
    }
    Ok(())
}

/// Available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        let bytes: u64 = s.trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").args(["-m"]).output().ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        s.lines()
            .find(|line| line.starts_with("Mem:"))
            .and_then(|line| line.split_whitespace().nth(6))
            .and_then(|v| v.parse().ok())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
