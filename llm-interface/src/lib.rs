//! Text and image generation behind two small async traits.

mod openai;

pub use openai::OpenAiProvider;

use daypost_core::{CoreError, GenerationConfig, ImageConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Builds a request with the configured token limit and temperature.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, config: &GenerationConfig) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub style: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, config: &ImageConfig) -> Self {
        Self {
            prompt: prompt.into(),
            size: config.size.clone(),
            quality: config.quality.clone(),
            style: config.style.clone(),
        }
    }
}

/// Produces post text. An empty completion is an error, never `Ok("")`.
pub trait ContentGenerator {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CoreError>;
}

/// Produces an image and returns the URL it can be downloaded from.
pub trait ImageGenerator {
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, CoreError>;
}

impl<T: ContentGenerator> ContentGenerator for &T {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CoreError> {
        (**self).generate(request).await
    }
}

impl<T: ImageGenerator> ImageGenerator for &T {
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, CoreError> {
        (**self).generate_image(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daypost_core::LlmError;

    struct Echo;

    impl ContentGenerator for Echo {
        async fn generate(&self, request: &CompletionRequest) -> Result<String, CoreError> {
            if request.prompt.is_empty() {
                return Err(LlmError::EmptyResponse {
                    provider: "echo".to_string(),
                }
                .into());
            }
            Ok(request.prompt.to_uppercase())
        }
    }

    #[test]
    fn test_requests_take_config_values() {
        let generation = GenerationConfig::default();
        let request = CompletionRequest::new("sys", "hello", &generation);
        assert_eq!(request.max_tokens, 250);
        assert!((request.temperature - 0.8).abs() < f32::EPSILON);

        let image = ImageRequest::new("a laptop", &ImageConfig::default());
        assert_eq!(image.size, "1024x1024");
        assert_eq!(image.quality, "hd");
        assert_eq!(image.style, "vivid");
    }

    #[tokio::test]
    async fn test_generator_through_reference() {
        let echo = Echo;
        let by_ref = &echo;
        let request = CompletionRequest::new("sys", "hi", &GenerationConfig::default());
        assert_eq!(by_ref.generate(&request).await.unwrap(), "HI");

        let empty = CompletionRequest::new("sys", "", &GenerationConfig::default());
        assert!(matches!(
            by_ref.generate(&empty).await,
            Err(CoreError::Llm(LlmError::EmptyResponse { .. }))
        ));
    }
}
