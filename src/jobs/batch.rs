use crate::error::{LocalizationError, Result};
use crate::jobs::{BatchStatus, JobRequest, JobStatus, JobStore, TranslationBatch, TranslationJob};
use crate::storage::Repository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Point-in-time view of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    #[serde(flatten)]
    pub batch: TranslationBatch,
    pub progress_percent: f64,
}

/// Member counts used to derive a batch's status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MemberCounts {
    completed: usize,
    failed: usize,
    started: bool,
}

impl MemberCounts {
    fn tally<'a>(members: impl Iterator<Item = Option<&'a TranslationJob>>) -> Self {
        let mut counts = Self::default();
        for member in members {
            let Some(job) = member else {
                // A member vanished from the store; it can never complete
                counts.failed += 1;
                counts.started = true;
                continue;
            };
            match job.status {
                JobStatus::Pending => {}
                JobStatus::InProgress => counts.started = true,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Reviewed if job.translated_content.is_some() => counts.completed += 1,
                JobStatus::Reviewed => counts.failed += 1,
            }
            if job.status != JobStatus::Pending {
                counts.started = true;
            }
        }
        counts
    }
}

/// Groups jobs into batches and keeps each batch's aggregate status in
/// step with its members.
pub struct BatchCoordinator {
    repo: Arc<dyn Repository<TranslationBatch>>,
}

impl BatchCoordinator {
    pub fn new(repo: Arc<dyn Repository<TranslationBatch>>) -> Self {
        Self { repo }
    }

    /// Create a batch and all of its jobs.
    ///
    /// Every request is validated before anything is stored, so a bad
    /// request leaves no partial batch behind. The caller enqueues the
    /// returned jobs.
    pub fn create(
        &self,
        name: &str,
        requests: Vec<JobRequest>,
        jobs: &JobStore,
    ) -> Result<(TranslationBatch, Vec<TranslationJob>)> {
        if name.trim().is_empty() {
            return Err(LocalizationError::InvalidInput(
                "batch name must not be empty".to_string(),
            ));
        }
        for (index, request) in requests.iter().enumerate() {
            JobStore::validate(request).map_err(|e| {
                LocalizationError::InvalidInput(format!("request {} of batch '{}': {}", index, name, e))
            })?;
        }

        let batch_id = Uuid::new_v4().to_string();
        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            match jobs.create(request, Some(batch_id.clone())) {
                Ok(job) => created.push(job),
                Err(e) => {
                    for job in &created {
                        jobs.remove(&job.id);
                    }
                    return Err(e);
                }
            }
        }

        let now = Utc::now();
        let total = created.len();
        let status = BatchStatus::derive(total, 0, 0, false);
        let batch = TranslationBatch {
            id: batch_id,
            name: name.to_string(),
            job_ids: created.iter().map(|j| j.id.clone()).collect(),
            status,
            created_at: now,
            completed_at: status.is_finished().then_some(now),
            total_jobs: total,
            completed_jobs: 0,
            failed_jobs: 0,
        };
        self.repo.insert(batch.clone());

        info!("Created batch '{}' ({}) with {} jobs", batch.name, batch.id, total);
        Ok((batch, created))
    }

    pub fn get(&self, id: &str) -> Option<TranslationBatch> {
        self.repo.get(id)
    }

    /// Recount members and re-derive the status.
    ///
    /// `completed_at` is stamped when the batch finishes and cleared if a
    /// retry reopens it.
    pub fn refresh(&self, id: &str, jobs: &JobStore) -> Result<TranslationBatch> {
        let mut previous = None;
        // Members are read under the batch's write lock so concurrent
        // refreshes of one batch apply in order
        let batch = self.repo.update(id, &mut |batch: &mut TranslationBatch| {
            let members: Vec<Option<TranslationJob>> = batch.job_ids.iter().map(|j| jobs.get(j)).collect();
            let counts = MemberCounts::tally(members.iter().map(Option::as_ref));
            previous = Some(batch.status);
            batch.completed_jobs = counts.completed;
            batch.failed_jobs = counts.failed;
            batch.status = BatchStatus::derive(batch.total_jobs, counts.completed, counts.failed, counts.started);

            if batch.status.is_finished() {
                if batch.completed_at.is_none() {
                    batch.completed_at = Some(Utc::now());
                }
            } else {
                batch.completed_at = None;
            }
            Ok(())
        })?;

        if let Some(previous) = previous.filter(|p| *p != batch.status) {
            debug!("Batch {} moved {} -> {}", batch.id, previous, batch.status);
            if batch.status.is_finished() {
                info!(
                    "Batch '{}' finished as {} ({}/{} completed, {} failed)",
                    batch.name, batch.status, batch.completed_jobs, batch.total_jobs, batch.failed_jobs
                );
            }
        }
        Ok(batch)
    }

    /// Refresh a batch and report its progress.
    pub fn progress(&self, id: &str, jobs: &JobStore) -> Result<BatchProgress> {
        let batch = self.refresh(id, jobs)?;
        let progress_percent = batch.progress_percent();
        Ok(BatchProgress {
            batch,
            progress_percent,
        })
    }

    /// Delete batches whose members are all `completed` and were last
    /// touched before `cutoff`, along with those jobs. Returns the removed
    /// batches.
    pub fn remove_completed_before(&self, cutoff: DateTime<Utc>, jobs: &JobStore) -> Vec<TranslationBatch> {
        let mut removed = Vec::new();

        for batch in self.repo.list() {
            let members: Vec<Option<TranslationJob>> = batch.job_ids.iter().map(|id| jobs.get(id)).collect();
            let expired = members.iter().all(|member| {
                member
                    .as_ref()
                    .is_some_and(|job| job.status == JobStatus::Completed && job.updated_at < cutoff)
            });
            if !expired || batch.created_at >= cutoff {
                continue;
            }

            for job_id in &batch.job_ids {
                jobs.remove(job_id);
            }
            self.repo.remove(&batch.id);
            debug!("Removed batch {} and its {} jobs", batch.id, batch.total_jobs);
            removed.push(batch);
        }

        if !removed.is_empty() {
            info!("Cleanup removed {} completed batches", removed.len());
        }
        removed
    }

    /// Store a batch as-is (snapshot restore).
    pub fn restore(&self, batch: TranslationBatch) {
        self.repo.insert(batch);
    }

    pub fn all(&self) -> Vec<TranslationBatch> {
        self.repo.list()
    }

    pub fn clear(&self) {
        self.repo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Priority;
    use crate::storage::InMemoryRepository;
    use proptest::prelude::*;

    fn setup() -> (BatchCoordinator, JobStore) {
        (
            BatchCoordinator::new(Arc::new(InMemoryRepository::new())),
            JobStore::new(Arc::new(InMemoryRepository::new())),
        )
    }

    fn requests(n: usize) -> Vec<JobRequest> {
        (0..n)
            .map(|i| JobRequest::new(format!("Lesson {}", i), "en", "es").with_priority(Priority::High))
            .collect()
    }

    fn complete(jobs: &JobStore, id: &str) {
        jobs.begin(id).unwrap();
        jobs.update_result(id, "hecho".to_string(), Some(0.9)).unwrap();
    }

    fn fail(jobs: &JobStore, id: &str) {
        jobs.begin(id).unwrap();
        jobs.mark_failed(id, "boom").unwrap();
    }

    // ==================== Creation Tests ====================

    #[test]
    fn test_create_batch_links_jobs() {
        let (batches, jobs) = setup();
        let (batch, created) = batches.create("B1", requests(3), &jobs).unwrap();

        assert_eq!(batch.status, BatchStatus::Pending);
        assert_eq!(batch.total_jobs, 3);
        assert_eq!(batch.job_ids.len(), 3);
        assert!(batch.completed_at.is_none());
        for (job, id) in created.iter().zip(&batch.job_ids) {
            assert_eq!(&job.id, id);
            assert_eq!(job.batch_id.as_deref(), Some(batch.id.as_str()));
            assert_eq!(job.priority, Priority::High);
        }
        assert_eq!(created[0].content, "Lesson 0");
    }

    #[test]
    fn test_invalid_request_creates_nothing() {
        let (batches, jobs) = setup();
        let mut reqs = requests(2);
        reqs.push(JobRequest::new("Bad", "en", "klingon"));

        let err = batches.create("B1", reqs, &jobs).unwrap_err();
        assert!(err.to_string().contains("request 2"));
        assert!(jobs.all().is_empty());
        assert!(batches.all().is_empty());
    }

    #[test]
    fn test_empty_batch_is_completed() {
        let (batches, jobs) = setup();
        let (batch, created) = batches.create("Empty", vec![], &jobs).unwrap();
        assert!(created.is_empty());
        assert_eq!(batch.status, BatchStatus::Completed);
        assert!(batch.completed_at.is_some());
        assert_eq!(batch.progress_percent(), 100.0);
    }

    #[test]
    fn test_blank_name_rejected() {
        let (batches, jobs) = setup();
        assert!(matches!(
            batches.create("  ", requests(1), &jobs),
            Err(LocalizationError::InvalidInput(_))
        ));
    }

    // ==================== Aggregation Tests ====================

    #[test]
    fn test_refresh_tracks_progress() {
        let (batches, jobs) = setup();
        let (batch, _) = batches.create("B1", requests(3), &jobs).unwrap();

        jobs.begin(&batch.job_ids[0]).unwrap();
        assert_eq!(batches.refresh(&batch.id, &jobs).unwrap().status, BatchStatus::Processing);

        jobs.update_result(&batch.job_ids[0], "x".into(), None).unwrap();
        complete(&jobs, &batch.job_ids[1]);
        let b = batches.refresh(&batch.id, &jobs).unwrap();
        assert_eq!(b.status, BatchStatus::Processing);
        assert_eq!(b.completed_jobs, 2);

        complete(&jobs, &batch.job_ids[2]);
        let b = batches.refresh(&batch.id, &jobs).unwrap();
        assert_eq!(b.status, BatchStatus::Completed);
        assert_eq!(b.completed_jobs, 3);
        assert!(b.completed_at.is_some());
    }

    #[test]
    fn test_one_failure_fails_batch_and_retry_reopens_it() {
        let (batches, jobs) = setup();
        let (batch, _) = batches.create("B1", requests(2), &jobs).unwrap();

        complete(&jobs, &batch.job_ids[0]);
        fail(&jobs, &batch.job_ids[1]);
        let b = batches.refresh(&batch.id, &jobs).unwrap();
        assert_eq!(b.status, BatchStatus::Failed);
        assert_eq!(b.failed_jobs, 1);
        assert!(b.completed_at.is_some());

        jobs.retry(&batch.job_ids[1]).unwrap();
        let b = batches.refresh(&batch.id, &jobs).unwrap();
        assert_eq!(b.status, BatchStatus::Processing);
        assert_eq!(b.failed_jobs, 0);
        assert!(b.completed_at.is_none());
    }

    #[test]
    fn test_reviewed_members_count_by_content() {
        let (batches, jobs) = setup();
        let (batch, _) = batches.create("B1", requests(2), &jobs).unwrap();

        complete(&jobs, &batch.job_ids[0]);
        jobs.mark_reviewed(&batch.job_ids[0], "amina", None).unwrap();
        fail(&jobs, &batch.job_ids[1]);
        jobs.mark_reviewed(&batch.job_ids[1], "amina", None).unwrap();

        let b = batches.refresh(&batch.id, &jobs).unwrap();
        assert_eq!(b.completed_jobs, 1);
        assert_eq!(b.failed_jobs, 1);
        assert_eq!(b.status, BatchStatus::Failed);
    }

    #[test]
    fn test_progress_report() {
        let (batches, jobs) = setup();
        let (batch, _) = batches.create("B1", requests(4), &jobs).unwrap();
        complete(&jobs, &batch.job_ids[0]);

        let progress = batches.progress(&batch.id, &jobs).unwrap();
        assert_eq!(progress.progress_percent, 25.0);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress_percent"], 25.0);
    }

    #[test]
    fn test_refresh_unknown_batch() {
        let (batches, jobs) = setup();
        assert!(matches!(
            batches.refresh("nope", &jobs),
            Err(LocalizationError::NotFound { kind: "batch", .. })
        ));
    }

    // ==================== Cleanup Tests ====================

    #[test]
    fn test_concurrent_refreshes_keep_latest_counts() {
        let (batches, jobs) = setup();
        let (batches, jobs) = (Arc::new(batches), Arc::new(jobs));
        let (batch, _) = batches.create("Concurrent", requests(8), &jobs).unwrap();

        let workers: Vec<_> = batch
            .job_ids
            .iter()
            .cloned()
            .map(|job_id| {
                let (batches, jobs, batch_id) = (Arc::clone(&batches), Arc::clone(&jobs), batch.id.clone());
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        fail(&jobs, &job_id);
                        batches.refresh(&batch_id, &jobs).unwrap();
                        jobs.retry(&job_id).unwrap();
                        batches.refresh(&batch_id, &jobs).unwrap();
                    }
                    complete(&jobs, &job_id);
                    batches.refresh(&batch_id, &jobs).unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // No refresh after the threads finish: the last one written must already be current
        let stored = batches.get(&batch.id).unwrap();
        assert_eq!(stored.completed_jobs, 8);
        assert_eq!(stored.failed_jobs, 0);
        assert_eq!(stored.status, BatchStatus::Completed);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_cleanup_removes_only_fully_completed_batches() {
        let (batches, jobs) = setup();
        let (done, _) = batches.create("Done", requests(2), &jobs).unwrap();
        let (partial, _) = batches.create("Partial", requests(2), &jobs).unwrap();
        for id in &done.job_ids {
            complete(&jobs, id);
        }
        complete(&jobs, &partial.job_ids[0]);
        fail(&jobs, &partial.job_ids[1]);

        let removed = batches.remove_completed_before(Utc::now() + chrono::Duration::seconds(1), &jobs);
        let removed_ids: Vec<&str> = removed.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(removed_ids, vec![done.id.as_str()]);
        assert!(batches.get(&done.id).is_none());
        assert!(jobs.get(&done.job_ids[0]).is_none());
        assert!(batches.get(&partial.id).is_some());
        assert!(jobs.get(&partial.job_ids[0]).is_some());
    }

    // ==================== Property Tests ====================

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Untouched,
        Running,
        Completed,
        Failed,
        ReviewedAfterFailure,
    }

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        prop::sample::select(vec![
            Outcome::Untouched,
            Outcome::Running,
            Outcome::Completed,
            Outcome::Failed,
            Outcome::ReviewedAfterFailure,
        ])
    }

    proptest! {
        #[test]
        fn prop_batch_counts_never_exceed_total(outcomes in prop::collection::vec(outcome_strategy(), 0..12)) {
            let (batches, jobs) = setup();
            let (batch, _) = batches.create("P", requests(outcomes.len()), &jobs).unwrap();

            for (id, outcome) in batch.job_ids.iter().zip(&outcomes) {
                match outcome {
                    Outcome::Untouched => {}
                    Outcome::Running => { jobs.begin(id).unwrap(); }
                    Outcome::Completed => complete(&jobs, id),
                    Outcome::Failed => fail(&jobs, id),
                    Outcome::ReviewedAfterFailure => {
                        fail(&jobs, id);
                        jobs.mark_reviewed(id, "r", None).unwrap();
                    }
                }
            }

            let b = batches.refresh(&batch.id, &jobs).unwrap();
            prop_assert!(b.completed_jobs + b.failed_jobs <= b.total_jobs);
            prop_assert_eq!(
                b.status == BatchStatus::Completed,
                b.failed_jobs == 0 && b.completed_jobs == b.total_jobs
            );
            prop_assert_eq!(
                b.status == BatchStatus::Failed,
                b.failed_jobs > 0 && b.completed_jobs + b.failed_jobs == b.total_jobs
            );
        }
    }
}
