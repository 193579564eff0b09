//! Translation jobs: records, the state machine, the priority queue, the
//! worker that drains it, and batch aggregation.

mod batch;
mod model;
mod queue;
mod store;
mod worker;

pub use batch::{BatchCoordinator, BatchProgress};
pub use model::{BatchStatus, JobRequest, JobStatus, Priority, TranslationBatch, TranslationJob};
pub use queue::{JobQueue, QueuedJob};
pub use store::{JobFilter, JobStatistics, JobStore};
pub use worker::{spawn_worker, JobProcessor, WorkerHandle, WorkerSettings};
