use crate::error::*;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub trait ErrorExt {
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn is_retryable(&self) -> bool {
        match self {
            CoreError::GraphApi(e) => e.is_retryable(),
            CoreError::Store(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Timeout { .. } => true,
            CoreError::RateLimited { .. } => true,
            CoreError::RequestFailed { status_code, .. } => {
                matches!(status_code, Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::GraphApi(GraphApiError::RateLimitExceeded { retry_after }) => {
                Some(Duration::from_secs(*retry_after))
            }
            CoreError::Llm(LlmError::RateLimitExceeded { retry_after, .. }) => {
                Some(Duration::from_secs(*retry_after))
            }
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            CoreError::RateLimited { retry_after, .. } => *retry_after,
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::GraphApi(e) => e.user_friendly_message(),
            CoreError::Store(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            CoreError::RateLimited { message, .. } => {
                format!(
                    "Rate limited: {}. Please wait before trying again.",
                    message
                )
            }
            CoreError::RequestFailed { message, .. } => {
                format!("Request failed: {}", message)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::GraphApi(_) => "GRAPH_API".to_string(),
            CoreError::Store(_) => "STORE".to_string(),
            CoreError::Llm(_) => "LLM".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
            CoreError::RateLimited { .. } => "RATE_LIMITED".to_string(),
            CoreError::RequestFailed { .. } => "REQUEST_FAILED".to_string(),
        }
    }
}

impl ErrorExt for GraphApiError {
    fn is_retryable(&self) -> bool {
        match self {
            GraphApiError::RateLimitExceeded { .. } => true,
            GraphApiError::RequestTimeout => true,
            GraphApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            GraphApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            GraphApiError::PageAccessDenied { .. } => {
                "Could not access the Facebook page. Check the page id and token permissions."
                    .to_string()
            }
            GraphApiError::InstagramAccessDenied { .. } => {
                "Could not access the Instagram business account. Check the account id."
                    .to_string()
            }
            GraphApiError::MissingPageToken => {
                "Failed to get page access token. Check your permissions.".to_string()
            }
            GraphApiError::DuplicateMedia => {
                "The platform rejected this image as a duplicate.".to_string()
            }
            GraphApiError::ImageRequired => {
                "Instagram requires an image for posts. No image provided.".to_string()
            }
            GraphApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            GraphApiError::RequestTimeout => {
                "Request to the Graph API timed out. Please try again.".to_string()
            }
            _ => "Graph API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            GraphApiError::PageAccessDenied { .. } => "GRAPH_PAGE_ACCESS".to_string(),
            GraphApiError::InstagramAccessDenied { .. } => "GRAPH_IG_ACCESS".to_string(),
            GraphApiError::MissingPageToken => "GRAPH_MISSING_PAGE_TOKEN".to_string(),
            GraphApiError::DuplicateMedia => "GRAPH_DUPLICATE_MEDIA".to_string(),
            GraphApiError::ImageRequired => "GRAPH_IMAGE_REQUIRED".to_string(),
            GraphApiError::RateLimitExceeded { .. } => "GRAPH_RATE_LIMIT".to_string(),
            GraphApiError::InvalidResponse { .. } => "GRAPH_INVALID_RESPONSE".to_string(),
            GraphApiError::Rejected { .. } => "GRAPH_REJECTED".to_string(),
            GraphApiError::ServerError { .. } => "GRAPH_SERVER_ERROR".to_string(),
            GraphApiError::RequestTimeout => "GRAPH_TIMEOUT".to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::WriteFailed { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_millis(100))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StoreError::ReadFailed { path, .. } => format!("Could not read {}.", path),
            StoreError::WriteFailed { path, .. } => {
                format!("Could not write {}. Check disk space and permissions.", path)
            }
            StoreError::CorruptFile { path } => {
                format!("{} is corrupted. Fix or remove the file and try again.", path)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            StoreError::ReadFailed { .. } => "STORE_READ_FAILED".to_string(),
            StoreError::WriteFailed { .. } => "STORE_WRITE_FAILED".to_string(),
            StoreError::CorruptFile { .. } => "STORE_CORRUPT".to_string(),
        }
    }
}

impl ErrorExt for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(10)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::InvalidApiKey { provider } => format!(
                "Invalid API key for {}. Please update your credentials.",
                provider
            ),
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "Rate limit exceeded for {}. Please wait {} seconds.",
                provider, retry_after
            ),
            LlmError::ModelNotAvailable { model } => format!(
                "Model '{}' is not available. Please try a different model.",
                model
            ),
            LlmError::ContentFiltered { .. } => {
                "Content was filtered by the AI provider's safety systems.".to_string()
            }
            LlmError::ServiceUnavailable { provider } => format!(
                "{} service is temporarily unavailable. Please try again later.",
                provider
            ),
            LlmError::EmptyResponse { provider } => {
                format!("{} returned an empty response.", provider)
            }
            _ => "AI service error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY".to_string(),
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            LlmError::ModelNotAvailable { .. } => "LLM_MODEL_NOT_AVAILABLE".to_string(),
            LlmError::ContentFiltered { .. } => "LLM_CONTENT_FILTERED".to_string(),
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE".to_string(),
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            LlmError::EmptyResponse { .. } => "LLM_EMPTY_RESPONSE".to_string(),
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn is_retryable(&self) -> bool {
        false // Config errors need user intervention
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs errors the way the run handled them: fatal errors once, with their
/// code and a user-facing message, and recovered errors as a single warning
/// naming the fallback taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn describe(&self, error: &CoreError) -> String {
        format!("[{}] {}", error.error_code(), error)
    }

    pub fn report_error(&self, error: &CoreError) {
        error!("{}", self.describe(error));
        match error {
            CoreError::GraphApi(e) => debug!("Graph API error details: {:?}", e),
            CoreError::Store(e) => debug!("Storage error details: {:?}", e),
            CoreError::Llm(e) => debug!("LLM error details: {:?}", e),
            CoreError::Config(e) => debug!("Configuration error details: {:?}", e),
            _ => {}
        }
        info!("{}", error.user_friendly_message());
        if let Some(retry_after) = error.retry_after().filter(|_| error.is_retryable()) {
            info!("Error is retryable. Retry after: {:?}", retry_after);
        }
    }

    /// `fallback` says what the run does instead, e.g. "posting text only".
    pub fn report_recovered(&self, error: &CoreError, fallback: &str) {
        warn!("{}; {}", self.describe(error), fallback);
    }
}
