use anyhow::{Context, Result};
use localization_engine::api::{self, AppState};
use localization_engine::config::Config;
use localization_engine::scheduler;
use localization_engine::LocalizationService;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_engine=info".parse()?),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    info!("Starting localization engine ({})", config.environment);

    let service = Arc::new(LocalizationService::from_config(&config));
    if let Some(path) = &config.snapshot_path {
        service
            .load_snapshot(path)
            .with_context(|| format!("Failed to load snapshot from {}", path.display()))?;
    }

    let worker = service.start_worker();
    let mut maintenance = scheduler::start_scheduler(Arc::clone(&config), Arc::clone(&service)).await?;

    if config.api_key.is_none() {
        warn!("API_KEY is not set; mutating routes are open");
    }
    let app = api::router(Arc::new(AppState {
        service: Arc::clone(&service),
        api_key: config.api_key.clone(),
    }));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!("Listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Server error")?;

    if let Err(e) = maintenance.shutdown().await {
        warn!("Scheduler did not stop cleanly: {}", e);
    }
    worker.shutdown().await;

    if let Some(path) = &config.snapshot_path {
        service
            .persist_snapshot(path)
            .await
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
    }

    info!("Localization engine stopped");
    Ok(())
}
