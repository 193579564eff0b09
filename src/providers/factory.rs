use crate::config::Config;
use crate::providers::{DeepLProvider, GoogleProvider, OpenAiProvider, TranslationProvider};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Provider names accepted in `TRANSLATION_PROVIDERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    DeepL,
    Google,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepL => "deepl",
            ProviderKind::Google => "google",
        };
        f.write_str(s)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "deepl" => Ok(ProviderKind::DeepL),
            "google" => Ok(ProviderKind::Google),
            _ => Err(format!("Unknown translation provider: {}", s.trim())),
        }
    }
}

/// Instantiate the configured providers in chain order, sharing one HTTP
/// client.
///
/// Providers without credentials are still returned; the chain skips them.
pub fn build_providers(config: &Config, client: reqwest::Client) -> Vec<Arc<dyn TranslationProvider>> {
    let providers: Vec<Arc<dyn TranslationProvider>> = config
        .providers
        .iter()
        .map(|kind| -> Arc<dyn TranslationProvider> {
            match kind {
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                    client.clone(),
                    config.openai_api_key.clone(),
                    config.openai_model.clone(),
                    config.openai_api_url.clone(),
                )),
                ProviderKind::DeepL => Arc::new(DeepLProvider::new(
                    client.clone(),
                    config.deepl_api_key.clone(),
                    config.deepl_api_url.clone(),
                )),
                ProviderKind::Google => Arc::new(GoogleProvider::new(
                    client.clone(),
                    config.google_api_key.clone(),
                    config.google_api_url.clone(),
                )),
            }
        })
        .collect();

    let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    let available = providers.iter().filter(|p| p.is_available()).count();
    if available == 0 {
        warn!(
            "No translation provider is configured ({}); jobs will complete with the original text",
            if names.is_empty() { "none listed".to_string() } else { names.join(", ") }
        );
    } else {
        info!("Translation providers: {} ({} available)", names.join(", "), available);
    }
    providers
}
