//! `LocalizationService` wires the job engine and the asset resolver
//! together and is the only type callers (the HTTP layer, the scheduler,
//! tests) talk to.

use crate::assets::{
    AssetPatch, AssetProbe, AssetRegistration, AssetResolver, AssetStatistics, AssetType,
    AssetWarning, AssumeReachable, HttpAssetProbe, LocalizedAsset, PreloadReport,
};
use crate::config::Config;
use crate::error::Result;
use crate::jobs::{
    spawn_worker, BatchCoordinator, BatchProgress, JobFilter, JobProcessor, JobQueue, JobRequest,
    JobStatistics, JobStore, TranslationBatch, TranslationJob, WorkerHandle, WorkerSettings,
};
use crate::metrics::{EngineMetrics, MetricsReport};
use crate::providers::{build_providers, ProviderChain, TranslationProvider};
use crate::quality::QualityScorer;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatisticsReport {
    #[serde(flatten)]
    pub jobs: JobStatistics,
    pub queue_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub providers: Vec<String>,
    pub available_providers: usize,
    pub queue_depth: usize,
    pub jobs_in_progress: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub removed_jobs: usize,
    pub removed_batches: usize,
}

/// Assembles a `LocalizationService`.
pub struct ServiceBuilder {
    storage: Storage,
    providers: Vec<Arc<dyn TranslationProvider>>,
    probe: Arc<dyn AssetProbe>,
    scorer: QualityScorer,
    settings: WorkerSettings,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self {
            storage: Storage::in_memory(),
            providers: Vec::new(),
            probe: Arc::new(AssumeReachable),
            scorer: QualityScorer::default(),
            settings: WorkerSettings::default(),
        }
    }
}

impl ServiceBuilder {
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        self.providers = providers;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn AssetProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn worker_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> LocalizationService {
        let metrics = Arc::new(EngineMetrics::new());
        let chain = ProviderChain::new(self.providers, metrics.clone());

        let jobs = Arc::new(JobStore::new(self.storage.jobs.clone()));
        let batches = Arc::new(BatchCoordinator::new(self.storage.batches.clone()));
        let queue = Arc::new(JobQueue::new());
        let processor = Arc::new(JobProcessor::new(
            jobs.clone(),
            batches.clone(),
            queue.clone(),
            chain.clone(),
            Arc::new(self.scorer),
            self.settings,
        ));
        let assets = Arc::new(AssetResolver::new(
            self.storage.assets.clone(),
            self.probe,
            metrics.clone(),
        ));

        LocalizationService {
            jobs,
            batches,
            queue,
            processor,
            assets,
            providers: chain,
            metrics,
            started_at: Utc::now(),
        }
    }
}

pub struct LocalizationService {
    pub(crate) jobs: Arc<JobStore>,
    pub(crate) batches: Arc<BatchCoordinator>,
    pub(crate) queue: Arc<JobQueue>,
    processor: Arc<JobProcessor>,
    pub(crate) assets: Arc<AssetResolver>,
    providers: ProviderChain,
    metrics: Arc<EngineMetrics>,
    started_at: DateTime<Utc>,
}

impl LocalizationService {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Service with in-memory storage and the providers, probe and worker
    /// settings described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        Self::builder()
            .providers(build_providers(config, client.clone()))
            .probe(Arc::new(HttpAssetProbe::new(
                client,
                config.asset_base_url.clone(),
                config.asset_probe_timeout,
            )))
            .worker_settings(WorkerSettings {
                provider_timeout: config.provider_timeout,
                strict_providers: config.strict_providers,
            })
            .build()
    }

    // ==================== Jobs ====================

    /// Store a `pending` job and queue it.
    pub fn create_job(&self, request: JobRequest) -> Result<TranslationJob> {
        let job = self.jobs.create(request, None)?;
        self.queue.push(job.id.clone(), job.priority);
        info!(
            "Queued job {} ({} -> {}, {})",
            job.id, job.source_language, job.target_language, job.priority
        );
        Ok(job)
    }

    /// Create a batch of jobs and queue them in request order.
    pub fn create_batch(&self, name: &str, requests: Vec<JobRequest>) -> Result<TranslationBatch> {
        let (batch, jobs) = self.batches.create(name, requests, &self.jobs)?;
        for job in &jobs {
            self.queue.push(job.id.clone(), job.priority);
        }
        Ok(batch)
    }

    pub fn get_job(&self, id: &str) -> Option<TranslationJob> {
        self.jobs.get(id)
    }

    pub fn get_job_status(&self, id: &str) -> Result<TranslationJob> {
        self.jobs.require(id)
    }

    pub fn get_batch_status(&self, id: &str) -> Result<BatchProgress> {
        self.batches.progress(id, &self.jobs)
    }

    /// Send a failed job back to the queue at its original priority.
    pub fn retry_job(&self, id: &str) -> Result<TranslationJob> {
        let job = self.jobs.retry(id)?;
        self.queue.push(job.id.clone(), job.priority);
        self.refresh_batch_of(&job);
        Ok(job)
    }

    pub fn mark_job_for_review(&self, id: &str, reviewer: &str, notes: Option<String>) -> Result<TranslationJob> {
        let job = self.jobs.mark_reviewed(id, reviewer, notes)?;
        self.refresh_batch_of(&job);
        Ok(job)
    }

    pub fn list_jobs(&self, filter: &JobFilter) -> Vec<TranslationJob> {
        self.jobs.list(filter)
    }

    pub fn get_job_statistics(&self) -> JobStatisticsReport {
        JobStatisticsReport {
            jobs: self.jobs.statistics(),
            queue_depth: self.queue.len(),
        }
    }

    /// Process at most one queued job on the caller's task.
    pub async fn process_next(&self) -> Option<TranslationJob> {
        self.processor.process_next().await
    }

    /// Process queued jobs until the queue is empty; returns how many ran.
    pub async fn drain_queue(&self) -> usize {
        let mut processed = 0;
        while !self.queue.is_empty() {
            if self.process_next().await.is_some() {
                processed += 1;
            }
        }
        processed
    }

    pub fn start_worker(&self) -> WorkerHandle {
        spawn_worker(self.processor.clone())
    }

    /// Remove completed jobs (and fully completed batches) older than
    /// `retention`.
    pub fn cleanup(&self, retention: chrono::Duration) -> CleanupReport {
        let cutoff = Utc::now() - retention;
        let removed_batches = self.batches.remove_completed_before(cutoff, &self.jobs);
        let removed_batch_jobs: usize = removed_batches.iter().map(|b| b.total_jobs).sum();
        let removed_jobs = self.jobs.remove_completed_before(cutoff);

        let report = CleanupReport {
            removed_jobs: removed_jobs.len() + removed_batch_jobs,
            removed_batches: removed_batches.len(),
        };
        if report.removed_jobs > 0 || report.removed_batches > 0 {
            info!(
                "Cleanup removed {} jobs and {} batches older than {}",
                report.removed_jobs, report.removed_batches, cutoff
            );
        } else {
            debug!("Cleanup found nothing older than {}", cutoff);
        }
        report
    }

    fn refresh_batch_of(&self, job: &TranslationJob) {
        if let Some(batch_id) = &job.batch_id {
            if let Err(e) = self.batches.refresh(batch_id, &self.jobs) {
                tracing::warn!("Could not refresh batch {}: {}", batch_id, e);
            }
        }
    }

    // ==================== Assets ====================

    pub fn get_asset(&self, base_id: &str, language: &str, region: Option<&str>) -> Option<LocalizedAsset> {
        self.assets.get_asset(base_id, language, region)
    }

    pub fn get_asset_of_type(
        &self,
        base_id: &str,
        asset_type: AssetType,
        language: &str,
        region: Option<&str>,
    ) -> Option<LocalizedAsset> {
        self.assets.get_asset_of_type(base_id, asset_type, language, region)
    }

    pub async fn get_asset_url(&self, base_id: &str, language: &str, region: Option<&str>) -> Option<String> {
        self.assets.get_asset_url(base_id, language, region).await
    }

    pub fn add_asset(&self, registration: AssetRegistration) -> Result<LocalizedAsset> {
        self.assets.add_asset(registration)
    }

    pub fn update_asset(&self, variant_id: &str, patch: AssetPatch) -> Result<LocalizedAsset> {
        self.assets.update_asset(variant_id, patch)
    }

    pub fn remove_asset(&self, variant_id: &str) -> Result<LocalizedAsset> {
        self.assets.remove_asset(variant_id)
    }

    pub async fn preload_assets(&self, language: &str) -> Result<PreloadReport> {
        self.assets.preload_assets(language).await
    }

    pub fn get_missing_assets(&self, language: &str) -> Vec<String> {
        self.assets.get_missing_assets(language)
    }

    pub fn get_asset_statistics(&self) -> AssetStatistics {
        self.assets.statistics()
    }

    pub fn asset_warnings(&self) -> Vec<AssetWarning> {
        self.assets.recent_warnings()
    }

    // ==================== Operations ====================

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            providers: self.providers.provider_names(),
            available_providers: self.providers.available_count(),
            queue_depth: self.queue.len(),
            jobs_in_progress: self.jobs.statistics().in_progress,
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}
