use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use tracing_subscriber::EnvFilter;

use page_mirror::{
    normalize_url, FileManager, LedgerStore, MirrorCommand, MirrorConfig, Mode, PageMetadata,
    PageMirror,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();
    setup_logging(args.verbose, args.quiet);

    let Some(mode) = args.mode.clone() else {
        MirrorCommand::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = args.to_config();
    match mode {
        Mode::Mirror { urls } => run_mirror(config, &urls).await,
        Mode::Metadata { urls } => show_metadata(config, &urls).await,
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "page_mirror=info,warn",
            1 => "page_mirror=debug,info",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_mirror(config: MirrorConfig, urls: &[String]) -> Result<()> {
    println!("📁 Output directory: {:?}", config.output_dir);

    let mut mirror = PageMirror::new(config)
        .await
        .context("Failed to set up the mirror")?;
    let outcomes = mirror.mirror_all(urls).await;

    let mut mirrored = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                mirrored += 1;
                println!(
                    "✅ {} → {} ({} resources saved, {} failed)",
                    report.target.url.blue(),
                    report.target.page_path.display(),
                    report.resources.saved.len(),
                    report.resources.failed.len()
                );
                for failure in &report.resources.failed {
                    println!("   ⚠️  {}", failure.error.to_string().yellow());
                }
            }
            Err(e) => println!("❌ {}: {}", outcome.url.red(), e),
        }
    }

    println!("📊 Pages mirrored: {}/{}", mirrored, outcomes.len());
    Ok(())
}

async fn show_metadata(config: MirrorConfig, urls: &[String]) -> Result<()> {
    let file_manager = FileManager::new(&config.output_dir)
        .with_context(|| format!("Failed to open output directory: {:?}", config.output_dir))?;
    let ledger = LedgerStore::new(file_manager).load().await;

    for raw in urls {
        let url = match normalize_url(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(url = raw.as_str(), error = %e, "skipping metadata lookup");
                continue;
            }
        };

        match ledger.lookup(&url) {
            Some(entry) => print_metadata(entry),
            None => println!("🔍 {}: {}", url.blue(), "no metadata recorded".yellow()),
        }
    }
    Ok(())
}

fn print_metadata(entry: &PageMetadata) {
    println!("📄 {}", entry.url.blue().bold());
    println!("   links:      {}", entry.link_count);
    println!("   images:     {}", entry.image_count);
    println!("   fetches:    {}", entry.fetch_count);
    println!("   last fetch: {}", entry.last_fetch.to_rfc3339());
}
