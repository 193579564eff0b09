//! Supported languages.
//!
//! - `registry`: the table of supported languages and their metadata
//! - `language`: validated `Language` values and code normalization helpers

mod language;
mod registry;

pub use language::{normalize_code, normalize_source_code, Language, AUTO_DETECT};
pub use registry::{LanguageConfig, LanguageRegistry};
