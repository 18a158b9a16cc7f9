// Copyright 2026 Layout Catalog Contributors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use catalog_runtime::cli::{self, StageContext};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Layout catalog pipeline: discover, capture thumbnails, publish",
    version,
    after_help = "Stages run in order: discover, thumbs, enrich, publish, validate."
)]
struct Cli {
    /// Workspace root holding SPECS/, data/ and dist/
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Configuration file (defaults to SPECS/config.json, then SPECS/config.example.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find layout packs on the hub and in the sitemaps
    Discover {
        /// Maximum candidate layouts to visit (0 = unbounded)
        #[arg(long)]
        max: Option<usize>,
    },
    /// Acquire a thumbnail for every discovered page
    Thumbs,
    /// Attach facet values to discovered packs
    Enrich,
    /// Merge discovered packs into the published manifest
    Publish,
    /// Validate the published manifest against its JSON Schema
    Validate,
    /// Download a published manifest and its thumbnails
    Mirror {
        /// Output directory
        #[arg(long, default_value = "catalog_local")]
        out: PathBuf,
        /// Manifest to download (defaults to the configured CDN manifest)
        #[arg(long)]
        manifest_url: Option<String>,
    },
    /// Check Chromium, schema and configuration readiness
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default = if verbose {
        "catalog_runtime=debug,pack_catalog=debug"
    } else if quiet {
        "catalog_runtime=warn,pack_catalog=warn"
    } else {
        "catalog_runtime=info,pack_catalog=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write the completion script for `shell`, and nothing else, to `out`.
fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "catalog", out);
}

async fn run(command: Commands, root: &Path, config: Option<&Path>) -> Result<()> {
    let ctx = StageContext::load(root, config)?;
    match command {
        Commands::Discover { max } => cli::discover_cmd::run(&ctx, max).await,
        Commands::Thumbs => cli::thumbs_cmd::run(&ctx).await,
        Commands::Enrich => cli::enrich_cmd::run(&ctx),
        Commands::Publish => cli::publish_cmd::run(&ctx).await,
        Commands::Validate => cli::validate_cmd::run(&ctx),
        Commands::Mirror { out, manifest_url } => {
            cli::mirror_cmd::run(&ctx, &out, manifest_url.as_deref()).await
        }
        Commands::Doctor => cli::doctor::run(&ctx).await,
        Commands::Completions { shell } => {
            write_completions(shell, &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Usage errors exit with 2, help and version with 0.
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    // Completion scripts are sourced by the shell; stdout must hold only the script.
    if let Commands::Completions { shell } = cli.command {
        write_completions(shell, &mut std::io::stdout());
        return;
    }

    let start = Instant::now();
    let result = run(cli.command, &cli.root, cli.config.as_deref()).await;
    println!("Done in {} ms", start.elapsed().as_millis());

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
}
