//! CLI entry point for the tiktok-downloader tool.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tiktok_downloader_core::{ArchiveEngine, ProgressReporter, ResultSet, load_export};
use tracing::{debug, error, info};

mod cli;
mod logging;
mod progress_ui;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let _log_guard = logging::init(args.quiet, args.verbose, args.log.as_deref())?;

    debug!(?args, "CLI arguments parsed");
    info!("TikTok downloader starting");

    let links = match load_export(&args.file).await {
        Ok(links) => links,
        Err(e) => {
            error!(error = %e, "cannot read export document");
            return Err(e).context("reading the user data export failed");
        }
    };

    let config = args.run_config();
    let engine = ArchiveEngine::from_config(&config)?;
    let show_progress = !args.no_progress && !args.quiet && std::io::stderr().is_terminal();

    let favorites = run_list(
        &engine,
        "favorites",
        links.favorites,
        &config.favorites_dir(),
        &config.favorites_report(),
        show_progress,
    )
    .await;
    let likes = run_list(
        &engine,
        "likes",
        links.likes,
        &config.likes_dir(),
        &config.likes_report(),
        show_progress,
    )
    .await;

    info!(summary = %favorites, "favorite videos");
    info!(summary = %likes, "liked videos");
    Ok(())
}

/// Processes one link list and writes its report. Report write failures are
/// logged, not fatal.
async fn run_list(
    engine: &ArchiveEngine,
    label: &str,
    urls: Vec<String>,
    destination: &Path,
    report: &Path,
    show_progress: bool,
) -> ResultSet {
    info!(list = label, items = urls.len(), "processing list");
    let (progress, events) = ProgressReporter::channel();
    let ui = progress_ui::spawn_progress_ui(label, urls.len(), show_progress, events);

    let results = engine.run(urls, destination, progress).await;
    if let Err(e) = ui.await {
        debug!(error = %e, "progress display ended abnormally");
    }

    if let Err(e) = results.persist(report).await {
        error!(error = %e, "failed to write report");
    }
    results
}
