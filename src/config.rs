use crate::providers::ProviderKind;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,

    // Translation providers, in chain order
    pub providers: Vec<ProviderKind>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,
    pub google_api_key: Option<String>,
    pub google_api_url: String,
    pub provider_timeout: Duration,
    /// Fail jobs instead of completing them when no provider produced a result
    pub strict_providers: bool,

    // Assets
    pub asset_base_url: Option<String>,
    pub asset_probe_timeout: Duration,

    // Maintenance
    pub job_retention_hours: u64,
    pub maintenance_schedule: String,
    pub snapshot_path: Option<PathBuf>,

    // HTTP
    pub api_key: Option<String>,
    pub port: u16,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", name, raw)),
        None => Ok(default),
    }
}

/// Parse a comma-separated provider list such as `openai,deepl`.
pub fn parse_provider_list(raw: &str) -> Result<Vec<ProviderKind>> {
    let mut kinds = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: ProviderKind = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("TRANSLATION_PROVIDERS contains an unknown provider")?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let providers = parse_provider_list(
            &std::env::var("TRANSLATION_PROVIDERS").unwrap_or_else(|_| "openai,deepl,google".to_string()),
        )?;

        let strict_providers = match optional_var("STRICT_PROVIDERS") {
            Some(v) => parse_bool(&v).with_context(|| format!("Invalid value for STRICT_PROVIDERS: '{}'", v))?,
            None => false,
        };

        let maintenance_schedule =
            std::env::var("MAINTENANCE_SCHEDULE").unwrap_or_else(|_| "0 0 * * * *".to_string());

        Ok(Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            providers,
            openai_api_key: optional_var("OPENAI_API_KEY"),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            deepl_api_key: optional_var("DEEPL_API_KEY"),
            deepl_api_url: std::env::var("DEEPL_API_URL")
                .unwrap_or_else(|_| "https://api-free.deepl.com".to_string()),
            google_api_key: optional_var("GOOGLE_TRANSLATE_API_KEY"),
            google_api_url: std::env::var("GOOGLE_TRANSLATE_API_URL")
                .unwrap_or_else(|_| "https://translation.googleapis.com".to_string()),
            provider_timeout: Duration::from_secs(parsed_var("PROVIDER_TIMEOUT_SECS", 30u64)?),
            strict_providers,

            asset_base_url: optional_var("ASSET_BASE_URL"),
            asset_probe_timeout: Duration::from_secs(parsed_var("ASSET_PROBE_TIMEOUT_SECS", 5u64)?),

            job_retention_hours: parsed_var("JOB_RETENTION_HOURS", 72u64)?,
            maintenance_schedule,
            snapshot_path: optional_var("SNAPSHOT_PATH").map(PathBuf::from),

            api_key: optional_var("API_KEY"),
            port: parsed_var("PORT", 8080u16)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for Config {
    /// Defaults with no providers configured; every translation degrades.
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            providers: Vec::new(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            deepl_api_key: None,
            deepl_api_url: "https://api-free.deepl.com".to_string(),
            google_api_key: None,
            google_api_url: "https://translation.googleapis.com".to_string(),
            provider_timeout: Duration::from_secs(30),
            strict_providers: false,
            asset_base_url: None,
            asset_probe_timeout: Duration::from_secs(5),
            job_retention_hours: 72,
            maintenance_schedule: "0 0 * * * *".to_string(),
            snapshot_path: None,
            api_key: None,
            port: 8080,
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true/false, got '{}'", other),
    }
}
