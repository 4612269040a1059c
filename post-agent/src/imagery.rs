//! Image prompts, generation and download for a finished post.

use crate::prompts;
use chrono::{DateTime, Local};
use daypost_core::{
    CategoryConfig, CoreError, ErrorReporter, GenerationConfig, HolidayMatch, ImageConfig, PostKind,
    PostRecord,
};
use fastrand::Rng;
use llm_interface::{CompletionRequest, ContentGenerator, ImageGenerator, ImageRequest};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const QUALITY_SUFFIX: &str = "high quality, professional photography, clean composition, \
no text, no words, no letters, minimalist design";

const GENERIC_SUBJECT: &str = "Professional photograph of a modern laptop displaying a clean, \
minimalist website design. Clean composition with professional web design elements.";

pub fn holiday_image_prompt(holiday: &HolidayMatch) -> String {
    let name = holiday.name.to_lowercase();
    let scene = if name.contains("independence") || name.contains("july") {
        "Professional photograph of American flag with modern web design elements subtly \
         integrated. Clean, patriotic composition with red, white, and blue color scheme."
    } else if name.contains("christmas") {
        "Professional photograph of festive holiday decorations with modern web design \
         elements subtly integrated. Clean, warm composition with holiday colors."
    } else if name.contains("thanksgiving") {
        "Professional photograph of warm, welcoming Thanksgiving elements with modern web \
         design concepts subtly integrated. Clean, cozy composition with autumn colors."
    } else {
        "Professional photograph of celebration elements with modern web design concepts \
         subtly integrated. Clean, festive composition."
    };
    format!("{} {}. Perfect for social media.", scene, QUALITY_SUFFIX)
}

/// Prompt for the post's image: a holiday scene for holiday posts, else the
/// category's configured subject.
pub fn image_prompt(post: &PostRecord, category: Option<&CategoryConfig>) -> String {
    if let Some(holiday) = &post.holiday {
        return holiday_image_prompt(holiday);
    }
    let subject = category
        .and_then(|c| c.image_prompt.as_deref())
        .unwrap_or(GENERIC_SUBJECT);
    format!("{} {}. Perfect for social media.", subject, QUALITY_SUFFIX)
}

pub fn generated_image_path(
    images_dir: &Path,
    kind: &PostKind,
    at: DateTime<Local>,
    suffix: u16,
) -> PathBuf {
    images_dir.join(format!(
        "{}_{}_{}.png",
        kind,
        at.format("%Y%m%d_%H%M%S"),
        suffix
    ))
}

/// `blog_promotion_<title>` with spaces and slashes replaced, keeping the
/// extension of the remote file (`.jpg` when it has none).
pub fn blog_image_path(images_dir: &Path, title: &str, image_url: &str) -> PathBuf {
    let slug = title.replace([' ', '/'], "_");
    let ext = Url::parse(image_url)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
        })
        .unwrap_or_else(|| ".jpg".to_string());
    images_dir.join(format!("blog_promotion_{}{}", slug, ext))
}

/// Attaches an image to posts: downloads a blog post's featured image, or
/// generates one from a prompt for everything else.
pub struct ImageStudio<I> {
    generator: I,
    http_client: Client,
    config: ImageConfig,
    images_dir: PathBuf,
    rng: Rng,
    reporter: ErrorReporter,
}

impl<I: ImageGenerator> ImageStudio<I> {
    pub fn new(generator: I, config: ImageConfig, images_dir: PathBuf) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            generator,
            http_client,
            config,
            images_dir,
            rng: Rng::new(),
            reporter: ErrorReporter::new(),
        })
    }

    /// Sets `post.image_path` on success. Failures are logged and leave the
    /// post without an image.
    pub async fn attach_image<C: ContentGenerator>(
        &mut self,
        post: &mut PostRecord,
        category: Option<&CategoryConfig>,
        enhancer: Option<(&C, &GenerationConfig)>,
    ) {
        let outcome = match post.kind {
            PostKind::BlogPromotion => match post.image_url.clone() {
                Some(url) => self.download_blog_image(post, &url).await,
                None => {
                    info!("Blog post has no featured image");
                    return;
                }
            },
            _ => self.generate_for(post, category, enhancer).await,
        };

        match outcome {
            Ok(path) => {
                info!("Image saved to: {}", path.display());
                post.image_path = Some(path);
            }
            Err(e) => {
                self.reporter.report_recovered(&e, "continuing without an image");
            }
        }
    }

    async fn download_blog_image(
        &self,
        post: &PostRecord,
        image_url: &str,
    ) -> Result<PathBuf, CoreError> {
        let title = post
            .blog
            .as_ref()
            .map(|blog| blog.title.as_str())
            .unwrap_or("blog");
        let path = blog_image_path(&self.images_dir, title, image_url);
        self.download(image_url, &path).await?;
        Ok(path)
    }

    async fn generate_for<C: ContentGenerator>(
        &mut self,
        post: &PostRecord,
        category: Option<&CategoryConfig>,
        enhancer: Option<(&C, &GenerationConfig)>,
    ) -> Result<PathBuf, CoreError> {
        let mut prompt = image_prompt(post, category);
        if self.config.enhance_prompt {
            if let Some((generator, generation)) = enhancer {
                prompt = enhance(generator, generation, &prompt, &post.content).await;
            }
        }

        info!("Generating image for post type: {}", post.kind);
        debug!("Image prompt: {}", prompt);
        let url = self
            .generator
            .generate_image(&ImageRequest::new(prompt, &self.config))
            .await?;

        let path = generated_image_path(
            &self.images_dir,
            &post.kind,
            Local::now(),
            self.rng.u16(1000..=9999),
        );
        self.download(&url, &path).await?;
        Ok(path)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), CoreError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::RequestFailed {
                message: format!("Failed to download image: {}", url),
                status_code: Some(status.as_u16()),
            });
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

/// Asks the content generator to refine an image prompt; keeps the original
/// prompt when that fails.
pub async fn enhance<C: ContentGenerator>(
    generator: &C,
    generation: &GenerationConfig,
    base_prompt: &str,
    post_content: &str,
) -> String {
    let request = CompletionRequest::new(
        prompts::IMAGE_PROMPT_SYSTEM,
        prompts::enhance_image_prompt(base_prompt, post_content),
        generation,
    );
    match generator.generate(&request).await {
        Ok(enhanced) if !enhanced.trim().is_empty() => enhanced.trim().to_string(),
        Ok(_) => base_prompt.to_string(),
        Err(e) => {
            ErrorReporter::new().report_recovered(&e, "keeping the base image prompt");
            base_prompt.to_string()
        }
    }
}
