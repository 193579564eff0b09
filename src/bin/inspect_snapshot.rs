//! Print a summary of a saved engine snapshot.
//!
//! Usage:
//!   cargo run --bin inspect-snapshot -- path/to/snapshot.json
//!   cargo run --bin inspect-snapshot                # uses SNAPSHOT_PATH
//!
//! Loads the snapshot into a throwaway service (no providers) and reports
//! job, batch, queue and asset state.

use anyhow::{Context, Result};
use localization_engine::snapshot::Snapshot;
use localization_engine::LocalizationService;
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_engine=warn".parse()?),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SNAPSHOT_PATH").ok())
        .map(PathBuf::from)
        .context("Pass a snapshot path or set SNAPSHOT_PATH")?;

    let snapshot = Snapshot::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Read snapshot version {}", snapshot.version);

    println!("Snapshot: {}", path.display());
    println!("Exported at: {}", snapshot.exported_at);
    println!();

    let service = LocalizationService::builder().build();
    service.import_snapshot(snapshot)?;

    let stats = service.get_job_statistics();
    println!("Jobs: {} total", stats.jobs.total);
    println!("  pending:     {}", stats.jobs.pending);
    println!("  in_progress: {}", stats.jobs.in_progress);
    println!("  completed:   {}", stats.jobs.completed);
    println!("  failed:      {}", stats.jobs.failed);
    println!("  reviewed:    {}", stats.jobs.reviewed);
    if let Some(quality) = stats.jobs.average_quality {
        println!("  average quality: {:.2}", quality);
    }
    println!("Queue depth: {}", stats.queue_depth);
    println!();

    let exported = service.export_snapshot();
    println!("Batches: {}", exported.batches.len());
    for batch in &exported.batches {
        println!(
            "  {} '{}' {} ({}/{} done, {} failed)",
            batch.id, batch.name, batch.status, batch.completed_jobs, batch.total_jobs, batch.failed_jobs
        );
    }
    println!();

    let assets = service.get_asset_statistics();
    println!(
        "Assets: {} variants of {} base assets, {} cached URLs",
        assets.total_variants, assets.total_base_assets, assets.cache_size
    );
    for (language, coverage) in &assets.coverage {
        println!("  {}: {:.0}% coverage", language, coverage);
    }

    Ok(())
}
