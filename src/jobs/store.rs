use crate::error::{LocalizationError, Result};
use crate::i18n::{normalize_code, normalize_source_code};
use crate::jobs::{JobRequest, JobStatus, TranslationJob};
use crate::storage::Repository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Filter for `JobStore::list`; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub target_language: Option<String>,
    pub batch_id: Option<String>,
}

impl JobFilter {
    fn matches(&self, job: &TranslationJob) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && self
                .target_language
                .as_deref()
                .map_or(true, |lang| job.target_language.eq_ignore_ascii_case(lang))
            && self
                .batch_id
                .as_deref()
                .map_or(true, |id| job.batch_id.as_deref() == Some(id))
    }
}

/// Counts over every stored job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStatistics {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub reviewed: usize,
    pub total: usize,
    /// Mean quality score of jobs that carry one
    pub average_quality: Option<f64>,
}

/// Owns translation jobs and enforces their state machine.
pub struct JobStore {
    repo: Arc<dyn Repository<TranslationJob>>,
}

impl JobStore {
    pub fn new(repo: Arc<dyn Repository<TranslationJob>>) -> Self {
        Self { repo }
    }

    /// Check a request without storing anything, returning its normalized
    /// language codes.
    pub fn validate(request: &JobRequest) -> Result<(String, String)> {
        if request.content.trim().is_empty() {
            return Err(LocalizationError::InvalidInput(
                "job content must not be empty".to_string(),
            ));
        }
        let source = normalize_source_code(&request.source_language)?;
        let target = normalize_code(&request.target_language)?;
        Ok((source, target))
    }

    /// Create a `pending` job. The caller is responsible for enqueueing it.
    pub fn create(&self, request: JobRequest, batch_id: Option<String>) -> Result<TranslationJob> {
        let (source_language, target_language) = Self::validate(&request)?;
        let now = Utc::now();

        let job = TranslationJob {
            id: Uuid::new_v4().to_string(),
            source_language,
            target_language,
            content: request.content,
            context: request.context,
            priority: request.priority,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            translated_content: None,
            quality_score: None,
            reviewer: None,
            notes: None,
            batch_id,
        };

        self.repo.insert(job.clone());
        debug!(
            "Created job {} ({} -> {}, {})",
            job.id, job.source_language, job.target_language, job.priority
        );
        Ok(job)
    }

    pub fn get(&self, id: &str) -> Option<TranslationJob> {
        self.repo.get(id)
    }

    /// Like `get`, but a missing job is an error.
    pub fn require(&self, id: &str) -> Result<TranslationJob> {
        self.repo
            .get(id)
            .ok_or_else(|| LocalizationError::not_found("job", id))
    }

    /// Store a job as-is (snapshot restore).
    pub fn restore(&self, job: TranslationJob) {
        self.repo.insert(job);
    }

    /// pending -> in_progress
    pub fn begin(&self, id: &str) -> Result<TranslationJob> {
        self.transition(id, JobStatus::InProgress, "start", |_| {})
    }

    /// in_progress -> completed, storing the translation and its score.
    pub fn update_result(
        &self,
        id: &str,
        translated: String,
        quality_score: Option<f64>,
    ) -> Result<TranslationJob> {
        self.update_result_with_note(id, translated, quality_score, None)
    }

    /// Like `update_result`, but also attaches a note (e.g. a degraded
    /// translation warning).
    pub fn update_result_with_note(
        &self,
        id: &str,
        translated: String,
        quality_score: Option<f64>,
        note: Option<String>,
    ) -> Result<TranslationJob> {
        self.transition(id, JobStatus::Completed, "record a result for", move |job| {
            job.translated_content = Some(translated.clone());
            job.quality_score = quality_score.map(|s| s.clamp(0.0, 1.0));
            if note.is_some() {
                job.notes = note.clone();
            }
        })
    }

    /// in_progress -> failed, recording why in `notes`.
    pub fn mark_failed(&self, id: &str, reason: &str) -> Result<TranslationJob> {
        self.transition(id, JobStatus::Failed, "fail", |job| {
            job.notes = Some(reason.to_string());
        })
    }

    /// completed/failed -> reviewed
    pub fn mark_reviewed(
        &self,
        id: &str,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<TranslationJob> {
        if reviewer.trim().is_empty() {
            return Err(LocalizationError::InvalidInput(
                "reviewer must not be empty".to_string(),
            ));
        }

        let job = self.transition(id, JobStatus::Reviewed, "review", move |job| {
            job.reviewer = Some(reviewer.to_string());
            if notes.is_some() {
                job.notes = notes.clone();
            }
        })?;
        info!("Job {} reviewed by {}", id, reviewer);
        Ok(job)
    }

    /// failed -> pending. Clears the previous attempt's results; priority
    /// is untouched.
    pub fn retry(&self, id: &str) -> Result<TranslationJob> {
        let job = self.transition(id, JobStatus::Pending, "retry", |job| {
            job.translated_content = None;
            job.quality_score = None;
            job.notes = None;
        })?;
        info!("Job {} reset to pending for retry ({})", id, job.priority);
        Ok(job)
    }

    /// Put a job back to `pending` regardless of its state (snapshot restore
    /// of jobs that were in flight).
    pub fn requeue_interrupted(&self, id: &str, note: &str) -> Result<TranslationJob> {
        self.repo.update(id, &mut |job: &mut TranslationJob| {
            job.status = JobStatus::Pending;
            job.notes = Some(note.to_string());
            job.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Replace an `auto` source with the detected language of a running job.
    pub fn set_detected_source(&self, id: &str, language: &str) -> Result<TranslationJob> {
        self.repo.update(id, &mut |job: &mut TranslationJob| {
            if job.status != JobStatus::InProgress {
                return Err(LocalizationError::InvalidState {
                    id: job.id.clone(),
                    status: job.status,
                    action: "set the source language of",
                });
            }
            job.source_language = language.to_string();
            job.updated_at = Utc::now();
            Ok(())
        })
    }

    fn transition<F>(
        &self,
        id: &str,
        next: JobStatus,
        action: &'static str,
        mut apply: F,
    ) -> Result<TranslationJob>
    where
        F: FnMut(&mut TranslationJob),
    {
        self.repo.update(id, &mut |job: &mut TranslationJob| {
            if !job.status.can_transition_to(next) {
                return Err(LocalizationError::InvalidState {
                    id: job.id.clone(),
                    status: job.status,
                    action,
                });
            }
            job.status = next;
            job.updated_at = Utc::now();
            apply(job);
            Ok(())
        })
    }

    /// Matching jobs, newest first.
    pub fn list(&self, filter: &JobFilter) -> Vec<TranslationJob> {
        let mut jobs: Vec<_> = self
            .repo
            .list()
            .into_iter()
            .filter(|job| filter.matches(job))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub fn statistics(&self) -> JobStatistics {
        let mut stats = JobStatistics::default();
        let mut score_sum = 0.0;
        let mut scored = 0usize;

        for job in self.repo.list() {
            stats.total += 1;
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::InProgress => stats.in_progress += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Reviewed => stats.reviewed += 1,
            }
            if let Some(score) = job.quality_score {
                score_sum += score;
                scored += 1;
            }
        }

        if scored > 0 {
            stats.average_quality = Some(score_sum / scored as f64);
        }
        stats
    }

    /// Delete standalone `completed` jobs last updated before `cutoff`.
    ///
    /// Jobs that belong to a batch are left alone; they go away with their
    /// batch.
    pub fn remove_completed_before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .repo
            .list()
            .into_iter()
            .filter(|job| {
                job.status == JobStatus::Completed
                    && job.batch_id.is_none()
                    && job.updated_at < cutoff
            })
            .map(|job| job.id)
            .collect();

        for id in &expired {
            self.repo.remove(id);
        }
        expired
    }

    pub fn remove(&self, id: &str) -> Option<TranslationJob> {
        self.repo.remove(id)
    }

    pub fn all(&self) -> Vec<TranslationJob> {
        self.repo.list()
    }

    pub fn clear(&self) {
        self.repo.clear();
    }
}
