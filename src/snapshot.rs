//! JSON snapshots of a service's in-memory state.

use crate::assets::{CachedUrl, LocalizedAsset};
use crate::error::{LocalizationError, Result};
use crate::jobs::{JobStatus, QueuedJob, TranslationBatch, TranslationJob};
use crate::service::LocalizationService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Note left on jobs that were in flight when the snapshot was taken.
pub const INTERRUPTED_NOTE: &str = "processing was interrupted; job requeued on restore";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub jobs: Vec<TranslationJob>,
    pub batches: Vec<TranslationBatch>,
    pub assets: Vec<LocalizedAsset>,
    /// Queue contents, front first
    pub queue: Vec<QueuedJob>,
    #[serde(default)]
    pub url_cache: Vec<CachedUrl>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(LocalizationError::InvalidInput(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a snapshot file.
    pub fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write to `path` via a sibling temp file and a rename, so readers
    /// never see a half-written snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl LocalizationService {
    pub fn export_snapshot(&self) -> Snapshot {
        let mut jobs = self.jobs.all();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let mut batches = self.batches.all();
        batches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Snapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            jobs,
            batches,
            assets: self.assets.all(),
            queue: self.queue.snapshot(),
            url_cache: self.assets.cached_urls(),
        }
    }

    /// Replace all state with the snapshot's contents.
    ///
    /// Jobs found `in_progress` are reset to `pending` and queued after the
    /// saved queue; `pending` jobs the saved queue lost are queued as well.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.queue.clear();
        self.jobs.clear();
        self.batches.clear();
        self.assets.clear();

        let job_count = snapshot.jobs.len();
        let mut interrupted = Vec::new();
        for job in snapshot.jobs {
            if job.status == JobStatus::InProgress {
                interrupted.push((job.id.clone(), job.priority));
            }
            self.jobs.restore(job);
        }
        for batch in snapshot.batches {
            self.batches.restore(batch);
        }
        for asset in snapshot.assets {
            self.assets.restore(asset);
        }

        for entry in snapshot.queue {
            match self.jobs.get(&entry.job_id) {
                Some(job) if job.status == JobStatus::Pending => {
                    self.queue.push(entry.job_id, entry.priority)
                }
                _ => debug!("Dropping stale queue entry {}", entry.job_id),
            }
        }

        for (id, priority) in interrupted {
            self.jobs.requeue_interrupted(&id, INTERRUPTED_NOTE)?;
            self.queue.push(id.clone(), priority);
            warn!("Job {} was in progress when the snapshot was taken; requeued", id);
        }

        // Pending jobs always belong in the queue; push ignores duplicates
        let mut orphaned: Vec<TranslationJob> = self
            .jobs
            .all()
            .into_iter()
            .filter(|job| job.status == JobStatus::Pending && !self.queue.contains(&job.id))
            .collect();
        orphaned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for job in orphaned {
            debug!("Queueing pending job {} missing from the saved queue", job.id);
            self.queue.push(job.id, job.priority);
        }

        for cached in snapshot.url_cache {
            self.assets.restore_cached_url(cached);
        }

        info!(
            "Restored snapshot: {} jobs, {} batches, {} assets, {} queued",
            job_count,
            self.batches.all().len(),
            self.assets.all().len(),
            self.queue.len()
        );
        Ok(())
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = self.export_snapshot();
        snapshot.write(path)?;
        info!(
            "Saved snapshot to {} ({} jobs, {} assets)",
            path.display(),
            snapshot.jobs.len(),
            snapshot.assets.len()
        );
        Ok(())
    }

    /// `save_snapshot` for async callers: state is exported on the calling
    /// task and the file is written on the blocking pool.
    pub async fn persist_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = self.export_snapshot();
        let (jobs, assets) = (snapshot.jobs.len(), snapshot.assets.len());
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || snapshot.write(&target))
            .await
            .map_err(|e| LocalizationError::Io(std::io::Error::other(e)))??;
        info!("Saved snapshot to {} ({} jobs, {} assets)", path.display(), jobs, assets);
        Ok(())
    }

    /// Import the snapshot at `path`. Returns `false` without touching
    /// state when the file does not exist.
    pub fn load_snapshot(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            info!("No snapshot at {}; starting empty", path.display());
            return Ok(false);
        }
        let snapshot = Snapshot::read(path)?;
        self.import_snapshot(snapshot)?;
        Ok(true)
    }
}
