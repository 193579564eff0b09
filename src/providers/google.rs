use crate::error::{LocalizationError, Result};
use crate::providers::TranslationProvider;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const PROVIDER_NAME: &str = "google";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct DetectData {
    detections: Vec<Vec<Detection>>,
}

#[derive(Debug, Deserialize)]
struct Detection {
    language: String,
}

/// Google Cloud Translation (basic, v2).
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    retry: RetryConfig,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::provider_call(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B, retry: &RetryConfig, operation: &str) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LocalizationError::provider(PROVIDER_NAME, "GOOGLE_TRANSLATE_API_KEY is not configured")
        })?;
        let url = format!("{}{}", self.api_url, endpoint);

        with_retry_if(
            retry,
            operation,
            || async {
                let response = self
                    .client
                    .post(&url)
                    .query(&[("key", api_key)])
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        LocalizationError::provider(PROVIDER_NAME, format!("request failed: {}", e))
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    return Err(LocalizationError::Provider {
                        provider: PROVIDER_NAME.to_string(),
                        message: format!("API error ({}): {}", status, body),
                        status: Some(status.as_u16()),
                    });
                }

                let envelope: Envelope<T> = response.json().await.map_err(|e| {
                    LocalizationError::provider(PROVIDER_NAME, format!("invalid response: {}", e))
                })?;
                Ok(envelope.data)
            },
            LocalizationError::is_retryable,
        )
        .await
    }
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            source: Some(from).filter(|s| !s.eq_ignore_ascii_case("auto")),
            target: to,
            format: "text",
        };
        let data: TranslateData = self
            .post(
                "/language/translate/v2",
                &body,
                &self.retry,
                &format!("Google translation to {}", to),
            )
            .await?;

        data.translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "response contained no translations"))
    }

    async fn detect_language(&self, text: &str) -> Result<String> {
        let retry = RetryConfig::detection().with_max_delay(self.retry.max_delay);
        let data: DetectData = self
            .post(
                "/language/translate/v2/detect",
                &DetectRequest { q: text },
                &retry,
                "Google language detection",
            )
            .await?;

        data.detections
            .into_iter()
            .flatten()
            .next()
            .map(|d| d.language.to_ascii_lowercase())
            .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "response contained no detections"))
    }
}
