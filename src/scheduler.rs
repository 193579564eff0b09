use crate::config::Config;
use crate::service::{CleanupReport, LocalizationService};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Start the maintenance scheduler: on every `MAINTENANCE_SCHEDULE` tick,
/// remove expired completed jobs and persist a snapshot.
pub async fn start_scheduler(config: Arc<Config>, service: Arc<LocalizationService>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    info!(
        "Scheduling maintenance (cron: {}, retention: {}h)",
        config.maintenance_schedule, config.job_retention_hours
    );

    let config_clone = Arc::clone(&config);
    let service_clone = Arc::clone(&service);
    let job = Job::new_async(config.maintenance_schedule.as_str(), move |_uuid, _l| {
        let config = Arc::clone(&config_clone);
        let service = Arc::clone(&service_clone);

        Box::pin(async move {
            info!("Maintenance triggered");
            if let Err(e) =
                run_maintenance(&service, config.job_retention_hours, config.snapshot_path.as_deref()).await
            {
                error!("Maintenance failed: {}", e);
            }
        })
    })
    .with_context(|| format!("Invalid MAINTENANCE_SCHEDULE: {}", config.maintenance_schedule))?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("Scheduler started");

    Ok(scheduler)
}

/// Cleanup followed by an optional snapshot save.
pub async fn run_maintenance(
    service: &LocalizationService,
    retention_hours: u64,
    snapshot_path: Option<&Path>,
) -> Result<CleanupReport> {
    // Capped at a century so the duration cannot overflow
    let retention = chrono::Duration::hours(retention_hours.min(24 * 365 * 100) as i64);
    let report = service.cleanup(retention);

    if let Some(path) = snapshot_path {
        service
            .persist_snapshot(path)
            .await
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
    }

    info!(
        "Maintenance done: {} jobs and {} batches removed",
        report.removed_jobs, report.removed_batches
    );
    Ok(report)
}
