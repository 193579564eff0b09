use crate::error::{LocalizationError, Result};
use crate::i18n::Language;
use crate::providers::TranslationProvider;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER_NAME: &str = "openai";

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Reasoning models reject `temperature` and need a larger token budget
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

fn language_name(code: &str) -> String {
    Language::from_code(code)
        .map(|lang| lang.name().to_string())
        .unwrap_or_else(|_| code.to_string())
}

fn build_translation_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a professional translator for an online learning platform. Translate the course content you are given from {} to {}.

## Translation Rules

### DO NOT translate:
- Template placeholders (e.g., {{{{name}}}}, {{count}}, %s)
- URLs, file paths and email addresses
- Code snippets, commands and technical identifiers
- Proper names of people, institutions, brands and products

### DO translate:
- Headings, bullet points and descriptive text
- Quiz questions and answer options
- Button labels and short UI strings

### Formatting:
- Preserve all markdown formatting (bold, italic, headers, lists, links)
- Keep numbers, prices and dates exactly as written
- Maintain the same structure and line breaks as the original

### Tone:
- Keep an encouraging, clear tone suitable for learners
- If a technical term has no established translation, keep the original term

Reply with the translation only, without commentary."#,
        source_language, target_language
    )
}

fn build_translation_user_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following to {}:\n\n{}", target_language, text)
}

const DETECTION_SYSTEM_PROMPT: &str = "Identify the language of the user's text. \
Reply with its two-letter ISO 639-1 code only, in lowercase, and nothing else.";

/// Pull a language code out of a model reply like "es" or "Code: es."
fn parse_language_code(reply: &str) -> Option<String> {
    reply
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|token| (2..=3).contains(&token.len()) && !token.eq_ignore_ascii_case("code"))
        .map(|token| token.to_ascii_lowercase())
}

/// Translation through OpenAI chat completions.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_url: String,
    max_tokens: u32,
    retry: RetryConfig,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        model: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            api_url: api_url.into(),
            max_tokens: 4000,
            retry: RetryConfig::provider_call(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, system_prompt: String, user_prompt: String) -> ChatRequest {
        let is_reasoning = is_reasoning_model(&self.model);
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            max_completion_tokens: if is_reasoning { 16000 } else { self.max_tokens },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    async fn complete(&self, request: &ChatRequest, retry: &RetryConfig, operation: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "OPENAI_API_KEY is not configured"))?;

        with_retry_if(
            retry,
            operation,
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(request)
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

                let chat: ChatResponse = response.json().await.map_err(|e| {
                    LocalizationError::provider(PROVIDER_NAME, format!("invalid response: {}", e))
                })?;

                chat.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content.trim().to_string())
                    .ok_or_else(|| LocalizationError::provider(PROVIDER_NAME, "response contained no choices"))
            },
            LocalizationError::is_retryable,
        )
        .await
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let source_name = language_name(from);
        let target_name = language_name(to);
        let request = self.build_request(
            build_translation_system_prompt(&source_name, &target_name),
            build_translation_user_prompt(text, &target_name),
        );

        self.complete(&request, &self.retry, &format!("OpenAI translation to {}", target_name))
            .await
    }

    async fn detect_language(&self, text: &str) -> Result<String> {
        let request = self.build_request(DETECTION_SYSTEM_PROMPT.to_string(), text.to_string());
        let retry = RetryConfig::detection().with_max_delay(self.retry.max_delay);
        let reply = self.complete(&request, &retry, "OpenAI language detection").await?;

        parse_language_code(&reply).ok_or_else(|| {
            LocalizationError::provider(PROVIDER_NAME, format!("unrecognised language reply: {}", reply))
        })
    }
}
