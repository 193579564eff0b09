use crate::storage::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Queue priority. Declaration order is rank order: `Urgent` is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// 0 for urgent up to 3 for low
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Reviewed,
}

impl JobStatus {
    /// Whether the job state machine allows moving from `self` to `next`.
    ///
    /// pending -> in_progress -> {completed, failed};
    /// completed/failed -> reviewed; failed -> pending (retry).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Completed, Reviewed)
                | (Failed, Reviewed)
                | (Failed, Pending)
        )
    }

    /// Completed, failed and reviewed jobs never go back on the queue on
    /// their own.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Reviewed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Reviewed => "reviewed",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "reviewed" => Ok(JobStatus::Reviewed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// A caller's request to translate one piece of course content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub content: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl JobRequest {
    pub fn new(
        content: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            context: None,
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: String,
    pub source_language: String,
    pub target_language: String,
    pub content: String,
    pub context: Option<String>,
    pub priority: Priority,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub translated_content: Option<String>,
    /// 0.0 to 1.0
    pub quality_score: Option<f64>,
    pub reviewer: Option<String>,
    pub notes: Option<String>,
    pub batch_id: Option<String>,
}

impl Record for TranslationJob {
    const KIND: &'static str = "job";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Derive a batch status from its member counts.
    ///
    /// `started` tells whether any member has left `pending`.
    pub fn derive(total: usize, completed: usize, failed: usize, started: bool) -> Self {
        if completed + failed >= total {
            if failed > 0 {
                BatchStatus::Failed
            } else {
                BatchStatus::Completed
            }
        } else if started || completed + failed > 0 {
            BatchStatus::Processing
        } else {
            BatchStatus::Pending
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationBatch {
    pub id: String,
    pub name: String,
    /// Member jobs in submission order; fixed at creation
    pub job_ids: Vec<String>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
}

impl TranslationBatch {
    /// Share of settled members, 0-100.
    pub fn progress_percent(&self) -> f64 {
        if self.total_jobs == 0 {
            return 100.0;
        }
        (self.completed_jobs + self.failed_jobs) as f64 / self.total_jobs as f64 * 100.0
    }
}

impl Record for TranslationBatch {
    const KIND: &'static str = "batch";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::Urgent.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn test_job_status_display_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Reviewed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_job_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_allowed_transitions() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Reviewed));
        assert!(Failed.can_transition_to(Reviewed));
        assert!(Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_forbidden_transitions() {
        use JobStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Reviewed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Reviewed.can_transition_to(Pending));
        assert!(!Reviewed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
    }

    #[test]
    fn test_job_request_defaults_from_json() {
        let request: JobRequest = serde_json::from_str(
            r#"{"content":"Hello","source_language":"en","target_language":"fr"}"#,
        )
        .unwrap();
        assert_eq!(request.priority, Priority::Medium);
        assert!(request.context.is_none());
    }

    #[test]
    fn test_batch_status_derivation() {
        assert_eq!(BatchStatus::derive(3, 0, 0, false), BatchStatus::Pending);
        assert_eq!(BatchStatus::derive(3, 0, 0, true), BatchStatus::Processing);
        assert_eq!(BatchStatus::derive(3, 2, 0, true), BatchStatus::Processing);
        assert_eq!(BatchStatus::derive(3, 3, 0, true), BatchStatus::Completed);
        assert_eq!(BatchStatus::derive(3, 2, 1, true), BatchStatus::Failed);
        assert_eq!(BatchStatus::derive(0, 0, 0, false), BatchStatus::Completed);
    }

    #[test]
    fn test_progress_percent() {
        let batch = TranslationBatch {
            id: "b".into(),
            name: "B".into(),
            job_ids: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            status: BatchStatus::Processing,
            created_at: Utc::now(),
            completed_at: None,
            total_jobs: 4,
            completed_jobs: 1,
            failed_jobs: 1,
        };
        assert_eq!(batch.progress_percent(), 50.0);
    }
}
