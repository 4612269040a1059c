use crate::{CompletionRequest, ContentGenerator, ImageGenerator, ImageRequest};
use daypost_core::{CoreError, ErrorExt, ErrorRecovery, LlmError, RecoveryStrategy};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

impl ChatCompletionResponse {
    fn into_text(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: PROVIDER.to_string(),
            })
    }
}

impl ImageResponse {
    fn into_url(self) -> Result<String, LlmError> {
        self.data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: PROVIDER.to_string(),
            })
    }
}

/// Chat completions and image generation over the OpenAI REST API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    api_base: String,
    chat_model: String,
    image_model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            api_base: OPENAI_API_BASE.to_string(),
            chat_model: chat_model.into(),
            image_model: image_model.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.api_base, endpoint);
        debug!("OpenAI request: POST {}", endpoint);

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("OpenAI request timed out: {}", endpoint);
                return Err(LlmError::RequestTimeout {
                    provider: PROVIDER.to_string(),
                }
                .into());
            }
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        error!("OpenAI request failed with status {} for {}", status, endpoint);

        Err(map_status(status, &body, retry_after, self.model_for(endpoint)).into())
    }

    fn model_for(&self, endpoint: &str) -> &str {
        if endpoint.starts_with("/images") {
            &self.image_model
        } else {
            &self.chat_model
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, CoreError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self.post_json("/chat/completions", &body).await?;
        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            }
        })?;

        Ok(parsed.into_text()?)
    }

    async fn image_once(&self, request: &ImageRequest) -> Result<String, CoreError> {
        let body = json!({
            "model": self.image_model,
            "prompt": request.prompt,
            "size": request.size,
            "quality": request.quality,
            "style": request.style,
            "n": 1,
        });

        let response = self.post_json("/images/generations", &body).await?;
        let parsed: ImageResponse = response.json().await.map_err(|e| {
            error!("Failed to parse image response: {}", e);
            LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
            }
        })?;

        Ok(parsed.into_url()?)
    }
}

/// Runs `operation` once and, if the error calls for it, again under the
/// recovery strategy chosen for that error.
async fn with_recovery<T, F, Fut>(mut operation: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, CoreError>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(error) => match ErrorRecovery::determine_strategy(&error) {
            strategy @ RecoveryStrategy::RetryWithBackoff { .. } => {
                warn!("Retrying OpenAI request: {}", error.user_friendly_message());
                ErrorRecovery::apply_strategy(strategy, operation)
                    .await
                    .into_result()
            }
            _ => Err(error),
        },
    }
}

fn map_status(status: StatusCode, body: &str, retry_after: Option<u64>, model: &str) -> LlmError {
    let provider = PROVIDER.to_string();
    match status.as_u16() {
        401 | 403 => LlmError::InvalidApiKey { provider },
        404 => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        429 => LlmError::RateLimitExceeded {
            provider,
            retry_after: retry_after.unwrap_or(60),
        },
        400 if body.contains("content_policy") || body.contains("safety") => {
            LlmError::ContentFiltered {
                reason: truncate(body, 200),
            }
        }
        408 | 504 => LlmError::RequestTimeout { provider },
        code if code >= 500 => LlmError::ServiceUnavailable { provider },
        _ => LlmError::InvalidResponseFormat { provider },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl ContentGenerator for OpenAiProvider {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CoreError> {
        let text = with_recovery(|| self.complete_once(request)).await?;
        info!("Generated {} characters of text", text.len());
        Ok(text)
    }
}

impl ImageGenerator for OpenAiProvider {
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, CoreError> {
        let url = with_recovery(|| self.image_once(request)).await?;
        info!("Image generated");
        Ok(url)
    }
}
