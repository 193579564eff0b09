use crate::jobs::JobStatus;
use thiserror::Error;

/// Errors raised by the localization engine.
///
/// Provider failures are normally swallowed by the provider chain and only
/// escape when a provider is called directly.
#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("cannot {action} job {id} while it is {status}")]
    InvalidState {
        id: String,
        status: JobStatus,
        action: &'static str,
    },

    #[error("provider {provider} failed: {message}")]
    Provider {
        provider: String,
        message: String,
        /// HTTP status returned by the backend, if the request got that far
        status: Option<u16>,
    },

    #[error("no variant of asset {asset_id} could be resolved for {language}")]
    AssetResolution { asset_id: String, language: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported language code: '{0}'")]
    UnsupportedLanguage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LocalizationError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Whether a failed provider call is worth repeating.
    ///
    /// Network failures, rate limits (429) and server errors (5xx) are
    /// transient; other 4xx responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            Self::Provider { status: None, .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LocalizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_error(status: Option<u16>) -> LocalizationError {
        LocalizationError::Provider {
            provider: "deepl".to_string(),
            message: "boom".to_string(),
            status,
        }
    }

    #[test]
    fn test_not_found_message() {
        let err = LocalizationError::not_found("job", "abc");
        assert_eq!(err.to_string(), "job not found: abc");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = LocalizationError::InvalidState {
            id: "j1".to_string(),
            status: JobStatus::Pending,
            action: "record a result for",
        };
        assert_eq!(
            err.to_string(),
            "cannot record a result for job j1 while it is pending"
        );
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(provider_error(Some(500)).is_retryable());
        assert!(provider_error(Some(503)).is_retryable());
        assert!(provider_error(Some(429)).is_retryable());
        assert!(provider_error(None).is_retryable());
    }

    #[test]
    fn test_client_errors_not_retryable() {
        assert!(!provider_error(Some(400)).is_retryable());
        assert!(!provider_error(Some(401)).is_retryable());
        assert!(!provider_error(Some(403)).is_retryable());
    }

    #[test]
    fn test_non_provider_errors_not_retryable() {
        assert!(!LocalizationError::InvalidInput("x".into()).is_retryable());
        assert!(!LocalizationError::not_found("batch", "b").is_retryable());
    }
}
