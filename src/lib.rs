//! Translation job scheduling and localized asset resolution for a course
//! marketplace.
//!
//! [`LocalizationService`] is the entry point: it owns the job store, the
//! priority queue and worker, batch aggregation, the provider chain, the
//! quality scorer and the asset resolver for one engine instance.

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod i18n;
pub mod jobs;
pub mod metrics;
pub mod providers;
pub mod quality;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod service;
pub mod snapshot;
pub mod storage;

pub use error::{LocalizationError, Result};
pub use service::LocalizationService;
