//! The single job worker.
//!
//! One job is processed at a time per service instance. `JobProcessor`
//! does the work for one job; `spawn_worker` runs it in a loop that parks
//! on the queue until a job arrives or shutdown is requested.

use crate::error::Result;
use crate::i18n::{normalize_code, Language, AUTO_DETECT};
use crate::jobs::{BatchCoordinator, JobQueue, JobStatus, JobStore, TranslationJob};
use crate::providers::{ProviderChain, TranslationOutcome};
use crate::quality::{PreservationValidator, QualityScorer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEGRADED_NOTE: &str = "no translation provider produced a result; original text kept";

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Upper bound for one provider chain call
    pub provider_timeout: Duration,
    /// Fail degraded jobs instead of completing them with the original text
    pub strict_providers: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            strict_providers: false,
        }
    }
}

/// Why a translation attempt produced no usable text.
enum AttemptError {
    TimedOut(Duration),
    Crashed(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::TimedOut(limit) => write!(f, "translation timed out after {:?}", limit),
            AttemptError::Crashed(reason) => write!(f, "translation provider crashed: {}", reason),
        }
    }
}

pub struct JobProcessor {
    jobs: Arc<JobStore>,
    batches: Arc<BatchCoordinator>,
    queue: Arc<JobQueue>,
    providers: ProviderChain,
    scorer: Arc<QualityScorer>,
    settings: WorkerSettings,
    /// Held for the whole of one job so at most one is in flight
    processing: Mutex<()>,
}

impl JobProcessor {
    pub fn new(
        jobs: Arc<JobStore>,
        batches: Arc<BatchCoordinator>,
        queue: Arc<JobQueue>,
        providers: ProviderChain,
        scorer: Arc<QualityScorer>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            jobs,
            batches,
            queue,
            providers,
            scorer,
            settings,
            processing: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Dequeue and process at most one job without waiting.
    ///
    /// Returns the job in its final state, or `None` if the queue was empty.
    pub async fn process_next(&self) -> Option<TranslationJob> {
        let _guard = self.processing.lock().await;
        let entry = self.queue.try_pop()?;
        self.process_locked(&entry.job_id).await
    }

    /// Process one specific job id that has already left the queue.
    pub async fn process(&self, job_id: &str) -> Option<TranslationJob> {
        let _guard = self.processing.lock().await;
        self.process_locked(job_id).await
    }

    async fn process_locked(&self, job_id: &str) -> Option<TranslationJob> {
        match self.jobs.get(job_id) {
            None => {
                debug!("Skipping job {}: no longer stored", job_id);
                return None;
            }
            Some(job) if job.status != JobStatus::Pending => {
                debug!("Skipping job {}: already {}", job_id, job.status);
                return None;
            }
            Some(_) => {}
        }

        match self.run(job_id).await {
            Ok(job) => {
                self.refresh_batch(&job);
                Some(job)
            }
            Err(e) => {
                // Only store errors end up here; the job may be half-way through
                error!("Job {} could not be processed: {}", job_id, e);
                let job = match self.jobs.get(job_id) {
                    Some(job) if job.status == JobStatus::InProgress => {
                        self.jobs.mark_failed(job_id, &e.to_string()).ok()
                    }
                    other => other,
                };
                if let Some(job) = &job {
                    self.refresh_batch(job);
                }
                job
            }
        }
    }

    async fn run(&self, job_id: &str) -> Result<TranslationJob> {
        let mut job = self.jobs.begin(job_id)?;
        self.refresh_batch(&job);
        info!(
            "Processing job {} ({} -> {}, {})",
            job.id, job.source_language, job.target_language, job.priority
        );

        if job.source_language == AUTO_DETECT {
            match self.detect_source(&job).await {
                Ok(detected) => {
                    job = self.jobs.set_detected_source(job_id, &detected)?;
                }
                Err(e) => {
                    warn!("Job {} failed during language detection: {}", job.id, e);
                    return self.jobs.mark_failed(job_id, &e.to_string());
                }
            }
        }

        let outcome = match self.translate(&job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Job {} failed: {}", job.id, e);
                return self.jobs.mark_failed(job_id, &e.to_string());
            }
        };

        if outcome.is_degraded() && self.settings.strict_providers {
            warn!("Job {} failed: no provider produced a translation", job.id);
            return self.jobs.mark_failed(job_id, DEGRADED_NOTE);
        }

        let score = self.scorer.compute_score(
            &job.content,
            &outcome.text,
            &job.source_language,
            &job.target_language,
        );
        let report = PreservationValidator::validate(&job.content, &outcome.text);
        for issue in report.issues() {
            warn!("Job {}: {}", job.id, issue);
        }

        let via = match outcome.provider() {
            Some(name) => name.to_string(),
            None if outcome.is_degraded() => "fallback".to_string(),
            None => "passthrough".to_string(),
        };
        let note = outcome.is_degraded().then(|| DEGRADED_NOTE.to_string());
        let done = self
            .jobs
            .update_result_with_note(job_id, outcome.text, Some(score), note)?;
        info!("Job {} completed via {} (quality {:.2})", done.id, via, score);
        Ok(done)
    }

    /// Run the provider chain on its own task so a panicking provider or a
    /// hung request cannot take the worker down with it.
    async fn translate(&self, job: &TranslationJob) -> std::result::Result<TranslationOutcome, AttemptError> {
        let chain = self.providers.clone();
        let (content, from, to) = (
            job.content.clone(),
            job.source_language.clone(),
            job.target_language.clone(),
        );
        let task = tokio::spawn(async move { chain.translate_detailed(&content, &from, &to).await });
        self.bounded(task).await
    }

    async fn detect_source(&self, job: &TranslationJob) -> std::result::Result<String, AttemptError> {
        let chain = self.providers.clone();
        let content = job.content.clone();
        let task = tokio::spawn(async move { chain.detect_language(&content).await });
        let detected = self.bounded(task).await?;

        Ok(normalize_code(&detected).unwrap_or_else(|_| {
            let fallback = Language::canonical().code().to_string();
            warn!(
                "Detected language '{}' for job {} is not supported, assuming '{}'",
                detected, job.id, fallback
            );
            fallback
        }))
    }

    async fn bounded<T>(&self, task: JoinHandle<T>) -> std::result::Result<T, AttemptError> {
        let abort = task.abort_handle();
        match tokio::time::timeout(self.settings.provider_timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => Err(AttemptError::Crashed(join_error.to_string())),
            Err(_) => {
                abort.abort();
                Err(AttemptError::TimedOut(self.settings.provider_timeout))
            }
        }
    }

    fn refresh_batch(&self, job: &TranslationJob) {
        if let Some(batch_id) = &job.batch_id {
            if let Err(e) = self.batches.refresh(batch_id, &self.jobs) {
                warn!("Could not refresh batch {} after job {}: {}", batch_id, job.id, e);
            }
        }
    }
}

/// Running worker loop.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop after the job in flight (if any) finishes.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Worker task ended abnormally: {}", e);
        }
        info!("Job worker stopped");
    }
}

/// Start the worker loop on the current runtime.
pub fn spawn_worker(processor: Arc<JobProcessor>) -> WorkerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!("Job worker started");
        loop {
            let queue = processor.queue().clone();
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                entry = queue.pop() => {
                    processor.process(&entry.job_id).await;
                }
            }
        }
    });

    WorkerHandle { shutdown, task }
}
