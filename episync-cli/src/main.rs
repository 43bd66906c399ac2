//! # episync
//!
//! One-shot Crunchyroll → AniList watch-progress synchronizer.
//!
//! Each run fetches the viewer's watch history (cached on disk between
//! runs), reduces it to one highest-fully-watched-episode fact per
//! series, resolves those series against AniList in a single combined
//! query, and raises any AniList entries that are behind — never
//! lowering progress. Credentials come from the environment or a `.env`
//! file; see `episync-config` for the variable names.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use episync_config::Config;
use episync_core::{
    SyncEngine, SyncPlan, SyncReport,
    cache::CachedHistorySource,
    providers::{AnilistClient, CrunchyrollProvider},
};

#[derive(Parser, Debug)]
#[command(name = "episync", version, about = "Sync Crunchyroll watch progress to AniList")]
struct Cli {
    /// Compute and print the update plan without submitting anything
    #[arg(long)]
    dry_run: bool,

    /// Discard the cached watch history before running
    #[arg(long)]
    refresh: bool,

    /// Explicit .env file to load before reading configuration
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Override the on-disk history cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| {
                format!("failed to load env file {}", path.display())
            })?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().context("configuration error")?;
    if let Some(dir) = cli.cache_dir {
        config.sync.cache_dir = dir;
    }
    config.ensure_directories()?;

    let history = CachedHistorySource::new(
        CrunchyrollProvider::new(
            config.crunchyroll.access_token.clone(),
            config.crunchyroll.user_id.clone(),
        ),
        config.cache_dir(),
    );
    if cli.refresh {
        history
            .invalidate()
            .await
            .context("failed to invalidate history cache")?;
    }

    let anilist = AnilistClient::new(config.anilist.access_token.clone());
    let engine = SyncEngine::new(history, anilist)
        .with_completion_threshold(config.sync.completion_threshold)
        .with_max_batch_size(config.sync.max_batch_size);

    if cli.dry_run {
        let plan = engine.plan().await?;
        print_plan(&plan);
        return Ok(ExitCode::SUCCESS);
    }

    let report = engine.run().await?;
    print_report(&report);
    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_plan(plan: &SyncPlan) {
    for series in &plan.no_completed_episode {
        println!("no completed episode  {series}");
    }
    for series in &plan.unmatched {
        println!("no AniList match      {series}");
    }
    for skip in &plan.skipped {
        println!(
            "up to date            {} (local {} / remote {})",
            skip.series_key, skip.completed_episode, skip.remote_progress
        );
    }
    for item in &plan.items {
        println!(
            "would update          {} -> episode {} (media {})",
            item.series_key, item.target_progress, item.remote_media_id
        );
    }
    if plan.items.is_empty() {
        println!("nothing to update");
    }
}

fn print_report(report: &SyncReport) {
    for series in &report.no_completed_episode {
        println!("no completed episode  {series}");
    }
    for series in &report.unmatched {
        println!("no AniList match      {series}");
    }
    for skip in &report.skipped {
        println!(
            "up to date            {} (local {} / remote {})",
            skip.series_key, skip.completed_episode, skip.remote_progress
        );
    }
    for result in &report.results {
        let target = report
            .planned
            .iter()
            .find(|item| item.series_key == result.series_key)
            .map(|item| item.target_progress);
        match (result.succeeded, target) {
            (true, Some(target)) => {
                println!("updated               {} -> episode {target}", result.series_key);
            }
            (true, None) => {
                println!("updated               {}", result.series_key);
            }
            (false, _) => {
                println!(
                    "update failed         {}: {}",
                    result.series_key,
                    result.error_detail.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
    println!(
        "{} updated, {} failed, {} skipped, {} unmatched",
        report.updated_count(),
        report.failed_count(),
        report.skipped.len(),
        report.unmatched.len()
    );
}
