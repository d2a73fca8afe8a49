// src/main.rs
// =============================================================================
// Entry point of the sitemap-sentinel CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Dispatch to the subcommand handler
// 4. Exit with a proper code:
//      0 = success
//      1 = the scan ran but found nothing useful (no URLs, or every URL failed)
//      2 = error (bad input, config, I/O)
//
// Rust concepts used:
// - async/await: scans make many network requests concurrently
// - anyhow::Context: attach a human-readable reason to any error
// - Arc: the Scanner is shared with the background scan task
// =============================================================================

mod checker;
mod classify;
mod cli;
mod config;
mod diff;
mod error;
mod model;
mod output;
mod scan;
mod sitemap;
mod store;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use cli::{Cli, Commands};
use config::ScanConfig;
use error::ScanError;
use scan::{parse_base_url, spawn_scan, ScanSummary, Scanner, TaskRegistry};
use model::Snapshot;
use std::sync::Arc;
use store::{site_id, SnapshotStore};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(output::LogWriterFactory))
        .with(filter)
        .init();

    let mut config = ScanConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    debug!("Using data directory {}", config.data_dir.display());

    match cli.command {
        Commands::Scan {
            base_url,
            concurrency,
            json,
        } => {
            if let Some(limit) = concurrency {
                config.max_concurrency = limit;
            }
            config.validate().context("Invalid configuration")?;
            handle_scan(config, base_url, json).await
        }
        Commands::Scans { site } => handle_scans(&store_for(&config), &site).await,
        Commands::Sites => handle_sites(&store_for(&config)).await,
        Commands::Show { site, scan_id, json } => {
            handle_show(&store_for(&config), &site, scan_id.as_deref(), json).await
        }
        Commands::Diff { site, old, new, json } => handle_diff(&store_for(&config), &site, &old, &new, json).await,
        Commands::Recent { base_url, days } => handle_recent(config, &base_url, days).await,
    }
}

fn store_for(config: &ScanConfig) -> SnapshotStore {
    SnapshotStore::new(config.data_dir.clone())
}

// Accepts either a base URL or an already-sanitized site id.
fn site_key(site: &str) -> Result<String> {
    if site.contains("://") {
        Ok(site_id(&parse_base_url(site)?))
    } else {
        Ok(site.to_string())
    }
}

// `latest` / `previous` name the newest and second-newest scans.
async fn resolve_scan_id(store: &SnapshotStore, site: &str, scan_id: &str) -> Result<String> {
    let position = match scan_id {
        "latest" => 0,
        "previous" => 1,
        other => return Ok(other.to_string()),
    };

    let scans = store.list(site).await.context("Failed to list scans")?;
    match scans.into_iter().nth(position) {
        Some(meta) => Ok(meta.scan_id),
        None => bail!("Site {} has no '{}' scan", site, scan_id),
    }
}

async fn handle_scan(config: ScanConfig, base_url: String, json: bool) -> Result<i32> {
    let base = parse_base_url(&base_url)?;
    if !json {
        println!("🔍 Scanning {} (up to {} URLs at once)", base, config.max_concurrency);
    }

    let scanner = Arc::new(Scanner::new(config)?);
    let registry = TaskRegistry::new();
    let handle = spawn_scan(Arc::clone(&scanner), base_url.clone(), &registry);
    info!("Started scan {}", handle.scan_id);

    let bar = output::scan_bar();
    let mut updates = handle.status.clone();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;
    loop {
        let current = registry.status(&handle.scan_id);
        output::update_bar(&bar, &current);
        if current.is_finished() {
            break;
        }
        tokio::select! {
            more = updates.changed() => {
                if !more {
                    break;
                }
            }
            _ = &mut ctrl_c, if !stopping => {
                warn!("Interrupted: URLs not yet checked will be recorded as errors");
                handle.stop();
                stopping = true;
            }
        }
    }
    bar.finish_and_clear();

    let meta = match handle.wait().await {
        Ok(meta) => meta,
        Err(ScanError::NoUrlsFound) => {
            println!("⚠️  No URLs found or sitemap not accessible.");
            return Ok(1);
        }
        Err(e) => return Err(e).context(format!("Scan of {} failed", base_url)),
    };

    let snapshot = scanner
        .store()
        .load(&meta.site_id, &meta.scan_id)
        .await
        .context("Failed to read back the saved snapshot")?;
    let summary = ScanSummary::from_results(&snapshot.results);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.results)?);
    } else {
        println!("📄 Saved scan {} to {}\n", meta.scan_id, meta.path.display());
        output::print_summary(&summary);
    }

    Ok(if summary.all_failed() { 1 } else { 0 })
}

async fn handle_scans(store: &SnapshotStore, site: &str) -> Result<i32> {
    let site = site_key(site)?;
    let scans = store.list(&site).await.context("Failed to list scans")?;
    if scans.is_empty() {
        println!("No scans stored for {}", site);
        return Ok(1);
    }

    let mut rows = Vec::with_capacity(scans.len());
    for meta in scans {
        // a corrupt file still gets listed, just without a count
        let count = store.load(&site, &meta.scan_id).await.ok().map(|s| s.results.len());
        rows.push((meta, count));
    }
    output::print_scan_list(&site, &rows);
    Ok(0)
}

async fn handle_sites(store: &SnapshotStore) -> Result<i32> {
    let sites = store.list_sites().await.context("Failed to list sites")?;
    if sites.is_empty() {
        println!("No scans stored in {}", store.root().display());
        return Ok(1);
    }
    for site in sites {
        println!("{}", site);
    }
    Ok(0)
}

// The named scan, or the newest one when no id is given.
async fn load_scan(store: &SnapshotStore, site: &str, scan_id: Option<&str>) -> Result<Snapshot> {
    let Some(scan_id) = scan_id else {
        return store
            .latest(site)
            .await
            .with_context(|| format!("Failed to load the latest scan of {}", site));
    };

    let scan_id = resolve_scan_id(store, site, scan_id).await?;
    store
        .load(site, &scan_id)
        .await
        .with_context(|| format!("Failed to load scan {} of {}", scan_id, site))
}

async fn handle_show(store: &SnapshotStore, site: &str, scan_id: Option<&str>, json: bool) -> Result<i32> {
    let site = site_key(site)?;
    let snapshot = load_scan(store, &site, scan_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.results)?);
    } else {
        println!(
            "Scan {} of {} ({})\n",
            snapshot.scan_id,
            snapshot.site_id,
            snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        output::print_results_table(&snapshot.results);
        output::print_summary(&ScanSummary::from_results(&snapshot.results));
    }
    Ok(0)
}

async fn handle_diff(store: &SnapshotStore, site: &str, old: &str, new: &str, json: bool) -> Result<i32> {
    let site = site_key(site)?;
    let old_id = resolve_scan_id(store, &site, old).await?;
    let new_id = resolve_scan_id(store, &site, new).await?;

    let before = store
        .load(&site, &old_id)
        .await
        .with_context(|| format!("Failed to load scan {}", old_id))?;
    let after = store
        .load(&site, &new_id)
        .await
        .with_context(|| format!("Failed to load scan {}", new_id))?;

    let changes = diff::diff(&before.results, &after.results);
    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        println!("🔀 {} -> {}\n", old_id, new_id);
        output::print_diff(&changes);
    }
    Ok(0)
}

async fn handle_recent(config: ScanConfig, base_url: &str, days: u32) -> Result<i32> {
    let base = parse_base_url(base_url)?;
    let scanner = Scanner::new(config)?;

    let records = scanner.resolver().resolve(&base).await;
    if records.is_empty() {
        println!("⚠️  No URLs found or sitemap not accessible.");
        return Ok(1);
    }

    let since = recent_cutoff(Utc::now(), days)?;
    let recent = sitemap::modified_since(&records, since);
    output::print_recent(&recent, days);
    Ok(0)
}

// `days` before `now`, or an error when that is outside chrono's range.
fn recent_cutoff(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    ChronoDuration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .with_context(|| format!("--days {} reaches too far back", days))
}
