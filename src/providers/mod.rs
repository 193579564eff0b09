//! Translation backends and the chain that tries them in order.
//!
//! The chain never fails: when every provider errors, is unavailable, or
//! hands the text back unchanged, the original text is returned and the
//! outcome is marked `Degraded`.

mod deepl;
mod factory;
mod google;
mod openai;

pub use deepl::DeepLProvider;
pub use factory::{build_providers, ProviderKind};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

use crate::error::Result;
use crate::i18n::Language;
use crate::metrics::EngineMetrics;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// A pluggable text-in/text-out translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Stable identifier used in logs and outcomes ("openai", "deepl", ...)
    fn name(&self) -> &str;

    /// False when the provider is not configured (e.g. no API key).
    fn is_available(&self) -> bool;

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;

    /// Return the ISO 639-1 code of the text's language.
    async fn detect_language(&self, text: &str) -> Result<String>;
}

/// Where a chain result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum OutcomeSource {
    /// A provider returned a changed translation
    Provider(String),
    /// Nothing to translate (same language or blank text)
    Passthrough,
    /// No provider produced a result; the input came back unchanged
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationOutcome {
    pub text: String,
    pub source: OutcomeSource,
}

impl TranslationOutcome {
    pub fn is_degraded(&self) -> bool {
        self.source == OutcomeSource::Degraded
    }

    pub fn provider(&self) -> Option<&str> {
        match &self.source {
            OutcomeSource::Provider(name) => Some(name),
            _ => None,
        }
    }
}

/// Ordered list of providers with a degrade-to-no-op failure policy.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn TranslationProvider>>,
    metrics: Arc<EngineMetrics>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>, metrics: Arc<EngineMetrics>) -> Self {
        Self { providers, metrics }
    }

    /// A chain with no providers; every translation degrades.
    pub fn empty(metrics: Arc<EngineMetrics>) -> Self {
        Self::new(Vec::new(), metrics)
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn available_count(&self) -> usize {
        self.providers.iter().filter(|p| p.is_available()).count()
    }

    /// Translate `text`, returning the input unchanged if nothing works.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> String {
        self.translate_detailed(text, from, to).await.text
    }

    /// Like `translate`, but reports which provider answered.
    pub async fn translate_detailed(&self, text: &str, from: &str, to: &str) -> TranslationOutcome {
        if text.trim().is_empty() || from.eq_ignore_ascii_case(to) {
            return TranslationOutcome {
                text: text.to_string(),
                source: OutcomeSource::Passthrough,
            };
        }

        for provider in self.providers.iter().filter(|p| p.is_available()) {
            self.metrics.record_provider_call();
            match provider.translate(text, from, to).await {
                Ok(translated) if translated.trim() != text.trim() && !translated.trim().is_empty() => {
                    debug!("{} translated {} chars {} -> {}", provider.name(), text.len(), from, to);
                    return TranslationOutcome {
                        text: translated,
                        source: OutcomeSource::Provider(provider.name().to_string()),
                    };
                }
                Ok(_) => {
                    debug!(
                        "{} returned the text unchanged ({} -> {}), trying next provider",
                        provider.name(),
                        from,
                        to
                    );
                }
                Err(e) => {
                    self.metrics.record_provider_failure();
                    warn!("{} failed to translate ({} -> {}): {}", provider.name(), from, to, e);
                }
            }
        }

        self.metrics.record_degraded_translation();
        warn!(
            "No translation provider produced a result for {} -> {}; returning original text",
            from, to
        );
        TranslationOutcome {
            text: text.to_string(),
            source: OutcomeSource::Degraded,
        }
    }

    /// Detect the language of `text`, defaulting to the canonical language.
    pub async fn detect_language(&self, text: &str) -> String {
        let fallback = Language::canonical().code().to_string();
        if text.trim().is_empty() {
            return fallback;
        }

        for provider in self.providers.iter().filter(|p| p.is_available()) {
            self.metrics.record_provider_call();
            match provider.detect_language(text).await {
                Ok(code) if !code.trim().is_empty() => {
                    return code.trim().to_lowercase();
                }
                Ok(_) => {}
                Err(e) => {
                    self.metrics.record_provider_failure();
                    warn!("{} failed to detect language: {}", provider.name(), e);
                }
            }
        }

        debug!("Language detection fell back to '{}'", fallback);
        fallback
    }
}
