use crate::error::{LocalizationError, Result};
use crate::providers::TranslationProvider;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER_NAME: &str = "deepl";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    detected_source_language: Option<String>,
    text: String,
}

/// DeepL wants upper-case codes and a regional variant for some targets.
fn target_code(code: &str) -> String {
    match code.to_ascii_lowercase().as_str() {
        "en" => "EN-US".to_string(),
        "pt" => "PT-PT".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

fn source_code(code: &str) -> Option<String> {
    // Source codes never carry a region; "auto" lets DeepL detect
    match code.to_ascii_lowercase().as_str() {
        "" | "auto" => None,
        other => Some(other.to_ascii_uppercase()),
    }
}

/// DeepL v2 `/translate` endpoint.
pub struct DeepLProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    retry: RetryConfig,
}

impl DeepLProvider {
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

    async fn call(&self, body: &TranslateRequest<'_>, retry: &RetryConfig, operation: &str) -> Result<DeepLTranslation> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "DEEPL_API_KEY is not configured"))?;
        let url = format!("{}/v2/translate", self.api_url);

        with_retry_if(
            retry,
            operation,
            || async {
                let response = self
                    .client
                    .post(&url)
                    .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
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

                let parsed: TranslateResponse = response.json().await.map_err(|e| {
                    LocalizationError::provider(PROVIDER_NAME, format!("invalid response: {}", e))
                })?;

                parsed
                    .translations
                    .into_iter()
                    .next()
                    .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "response contained no translations"))
            },
            LocalizationError::is_retryable,
        )
        .await
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let body = TranslateRequest {
            text: vec![text],
            source_lang: source_code(from),
            target_lang: target_code(to),
        };
        let translation = self
            .call(&body, &self.retry, &format!("DeepL translation to {}", to))
            .await?;
        Ok(translation.text)
    }

    /// DeepL has no detection endpoint; a translation into English reports
    /// the detected source language as a side effect.
    async fn detect_language(&self, text: &str) -> Result<String> {
        let body = TranslateRequest {
            text: vec![text],
            source_lang: None,
            target_lang: target_code("en"),
        };
        let retry = RetryConfig::detection().with_max_delay(self.retry.max_delay);
        let translation = self.call(&body, &retry, "DeepL language detection").await?;

        translation
            .detected_source_language
            .map(|code| code.to_ascii_lowercase())
            .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "no detected_source_language in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn provider(api_url: &str) -> DeepLProvider {
        DeepLProvider::new(reqwest::Client::new(), Some("deepl-test-key".to_string()), api_url)
            .with_retry(RetryConfig::new(3, Duration::from_millis(10)))
    }

    #[test]
    fn test_target_code_mapping() {
        assert_eq!(target_code("en"), "EN-US");
        assert_eq!(target_code("pt"), "PT-PT");
        assert_eq!(target_code("fr"), "FR");
        assert_eq!(target_code("ZH"), "ZH");
    }

    #[test]
    fn test_source_code_mapping() {
        assert_eq!(source_code("en").as_deref(), Some("EN"));
        assert_eq!(source_code("auto"), None);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = DeepLProvider::new(reqwest::Client::new(), None, "https://api-free.deepl.com/");
        assert_eq!(provider.api_url, "https://api-free.deepl.com");
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_translate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key deepl-test-key"))
            .and(body_partial_json(serde_json::json!({
                "text": ["Start the quiz"],
                "source_lang": "EN",
                "target_lang": "DE"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    { "detected_source_language": "EN", "text": "Starte das Quiz" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri())
            .translate("Start the quiz", "en", "de")
            .await
            .unwrap();
        assert_eq!(result, "Starte das Quiz");
    }

    #[tokio::test]
    async fn test_translate_retries_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "text": "Bonjour" }]
            })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri())
            .translate("Hello", "en", "fr")
            .await
            .unwrap();
        assert_eq!(result, "Bonjour");
    }

    #[tokio::test]
    async fn test_translate_forbidden_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Wrong key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server.uri())
            .translate("Hello", "en", "fr")
            .await
            .unwrap_err();
        assert!(matches!(err, LocalizationError::Provider { status: Some(403), .. }));
    }

    #[tokio::test]
    async fn test_detect_language() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "target_lang": "EN-US" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    { "detected_source_language": "ES", "text": "Welcome" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let code = provider(&mock_server.uri())
            .detect_language("Bienvenido")
            .await
            .unwrap();
        assert_eq!(code, "es");
    }
}
