use crate::api::{GraphApiClient, PhotoUpload};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use daypost_core::{
    ConfigError, CoreError, Credentials, ErrorReporter, GraphApiError, GraphConfig, Platform,
    PlatformResult, PostRecord, PublishReport, StorageConfig,
};
use post_store::uploads::DUPLICATE_DETECTED;
use post_store::{PostingLog, UploadTracker};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Pushes a finished post to the configured social platforms.
pub trait Publisher {
    async fn publish(&mut self, post: &PostRecord) -> Result<PublishReport, CoreError>;
}

/// Finds the image file for a post, also looking for its file name inside
/// `images_dir` when the stored path no longer resolves.
pub fn resolve_image_path(image_path: &Path, images_dir: &Path) -> Option<PathBuf> {
    if image_path.is_file() {
        return Some(image_path.to_path_buf());
    }
    let candidate = images_dir.join(image_path.file_name()?);
    candidate.is_file().then_some(candidate)
}

#[derive(Debug)]
struct LoadedImage {
    path: PathBuf,
    bytes: Vec<u8>,
    file_name: String,
    previously_uploaded: bool,
}

impl LoadedImage {
    fn upload(&self) -> PhotoUpload<'_> {
        PhotoUpload {
            bytes: &self.bytes,
            file_name: &self.file_name,
        }
    }
}

/// Graph API publisher for a Facebook page and its linked Instagram account.
pub struct SocialPublisher {
    client: GraphApiClient,
    credentials: Credentials,
    rate_limiter: RateLimiter,
    uploads: UploadTracker,
    posting_log: PostingLog,
    images_dir: PathBuf,
    reporter: ErrorReporter,
}

impl SocialPublisher {
    /// Opens the upload tracker and drops entries past the retention window.
    pub fn new(
        credentials: Credentials,
        graph: &GraphConfig,
        storage: &StorageConfig,
    ) -> Result<Self, CoreError> {
        let client = GraphApiClient::new(graph.base_url.clone())?;
        let mut uploads = UploadTracker::open(storage.uploads_path())?;
        uploads.purge_older_than(graph.upload_retention_days)?;

        if !credentials.facebook_enabled() && !credentials.instagram_enabled() {
            warn!("No social media credentials configured - posting disabled");
        }
        info!(
            "Social media publisher initialized - Facebook: {}, Instagram: {}",
            credentials.facebook_enabled(),
            credentials.instagram_enabled()
        );

        Ok(Self {
            client,
            credentials,
            rate_limiter: RateLimiter::new(RateLimitConfig::from_config(graph)),
            uploads,
            posting_log: PostingLog::new(storage.posting_log_path()),
            images_dir: storage.images_dir.clone(),
            reporter: ErrorReporter::new(),
        })
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    async fn load_image(&self, post: &PostRecord) -> Option<LoadedImage> {
        let stored = post.image_path.as_deref()?;
        let Some(path) = resolve_image_path(stored, &self.images_dir) else {
            warn!("Image file not found: {}", stored.display());
            return None;
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image.png".to_string());
                let previously_uploaded = self.uploads.already_uploaded(&bytes);
                Some(LoadedImage {
                    path,
                    bytes,
                    file_name,
                    previously_uploaded,
                })
            }
            Err(e) => {
                warn!("Failed to read image {}: {}", path.display(), e);
                None
            }
        }
    }

    fn remember_upload(&mut self, image: &LoadedImage, remote_id: &str) {
        if let Err(e) = self
            .uploads
            .mark_uploaded(&image.bytes, remote_id, Some(&image.path))
        {
            self.reporter
                .report_recovered(&e, "upload not recorded, it may be posted again");
        }
    }

    fn require<'a>(value: &'a Option<String>, var_name: &str) -> Result<&'a str, CoreError> {
        value.as_deref().ok_or_else(|| {
            ConfigError::MissingEnvironmentVariable {
                var_name: var_name.to_string(),
            }
            .into()
        })
    }

    async fn post_to_facebook(
        &mut self,
        message: &str,
        image: Option<&LoadedImage>,
    ) -> Result<PlatformResult, CoreError> {
        let token = Self::require(&self.credentials.facebook_token, "FACEBOOK_ACCESS_TOKEN")?;
        let page_id = Self::require(&self.credentials.facebook_page_id, "FACEBOOK_PAGE_ID")?;
        let (token, page_id) = (token.to_string(), page_id.to_string());

        self.rate_limiter.wait_turn().await;
        self.client.verify_page(&token, &page_id).await?;
        let page_token = self.client.page_access_token(&token, &page_id).await?;

        match image {
            Some(image) if image.previously_uploaded => {
                warn!(
                    "Image already uploaded, posting text only: {}",
                    image.path.display()
                );
            }
            Some(image) => {
                match self
                    .client
                    .post_photo(&page_id, &page_token, message, image.upload())
                    .await
                {
                    Ok(post_id) => {
                        info!("Posted photo with caption to Facebook: {}", post_id);
                        self.remember_upload(image, &post_id);
                        self.rate_limiter.record_post().await;
                        return Ok(PlatformResult::posted(
                            Platform::Facebook,
                            Some(post_id),
                            true,
                        ));
                    }
                    Err(CoreError::GraphApi(GraphApiError::DuplicateMedia)) => {
                        warn!("Facebook detected duplicate image: {}", image.path.display());
                        self.remember_upload(image, DUPLICATE_DETECTED);
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {}
        }

        let post_id = self.client.post_feed(&page_id, &page_token, message).await?;
        info!("Posted text-only status to Facebook: {}", post_id);
        self.rate_limiter.record_post().await;
        Ok(PlatformResult::posted(Platform::Facebook, Some(post_id), false))
    }

    /// Finds a public URL for the image: the Facebook photo from this run if
    /// there is one, otherwise an unpublished page upload.
    async fn public_image_url(
        &self,
        image: &LoadedImage,
        facebook_photo_id: Option<&str>,
    ) -> Result<String, CoreError> {
        let token = Self::require(&self.credentials.facebook_token, "FACEBOOK_ACCESS_TOKEN")?;
        let page_id = Self::require(&self.credentials.facebook_page_id, "FACEBOOK_PAGE_ID")?;
        let page_token = self.client.page_access_token(token, page_id).await?;

        if let Some(photo_id) = facebook_photo_id {
            match self.client.photo(photo_id, &page_token).await {
                Ok(node) => {
                    if let Some(url) = node.image_url() {
                        info!("Retrieved image URL from Facebook post: {}", url);
                        return Ok(url.to_string());
                    }
                }
                Err(e) => {
                    self.reporter
                        .report_recovered(&e, "uploading the image unpublished instead");
                }
            }
        }

        info!("Uploading image to Facebook to get URL for Instagram");
        let uploaded = self
            .client
            .upload_unpublished_photo(page_id, &page_token, image.upload())
            .await?;
        if let Some(url) = uploaded.image_url() {
            return Ok(url.to_string());
        }

        if let Some(photo_id) = uploaded.id.as_deref() {
            let node = self.client.photo(photo_id, &page_token).await?;
            if let Some(url) = node.image_url() {
                return Ok(url.to_string());
            }
        }

        Err(GraphApiError::InvalidResponse {
            details: "No image URL returned from Facebook upload".to_string(),
        }
        .into())
    }

    async fn post_to_instagram(
        &mut self,
        caption: &str,
        image: Option<&LoadedImage>,
        facebook_photo_id: Option<&str>,
    ) -> Result<PlatformResult, CoreError> {
        let token = Self::require(&self.credentials.facebook_token, "FACEBOOK_ACCESS_TOKEN")?;
        let account_id = Self::require(
            &self.credentials.instagram_account_id,
            "INSTAGRAM_BUSINESS_ACCOUNT_ID",
        )?;
        let (token, account_id) = (token.to_string(), account_id.to_string());

        self.rate_limiter.wait_turn().await;
        self.client.verify_instagram(&token, &account_id).await?;

        let image = image.ok_or(GraphApiError::ImageRequired)?;
        if image.previously_uploaded {
            return Err(GraphApiError::DuplicateMedia.into());
        }

        let image_url = self.public_image_url(image, facebook_photo_id).await?;
        let creation_id = self
            .client
            .create_media_container(&account_id, &token, &image_url, caption)
            .await?;
        info!("Created Instagram media container: {}", creation_id);

        let post_id = self
            .client
            .publish_media(&account_id, &token, &creation_id)
            .await?;
        info!("Published Instagram post: {}", post_id);

        self.remember_upload(image, &post_id);
        self.rate_limiter.record_post().await;

        let mut result = PlatformResult::posted(Platform::Instagram, Some(post_id), true);
        result.media_id = Some(creation_id);
        Ok(result)
    }
}

fn disabled(platform: Platform) -> PlatformResult {
    let label = match platform {
        Platform::Facebook => "Facebook",
        Platform::Instagram => "Instagram",
    };
    warn!("{} posting is disabled", label);
    PlatformResult::failed(platform, format!("{} posting is disabled", label))
}

fn into_result(platform: Platform, outcome: Result<PlatformResult, CoreError>) -> PlatformResult {
    match outcome {
        Ok(result) => result,
        Err(e) => {
            error!("{}: {}", platform, e);
            PlatformResult::failed(platform, e.to_string())
        }
    }
}

impl Publisher for SocialPublisher {
    async fn publish(&mut self, post: &PostRecord) -> Result<PublishReport, CoreError> {
        let message = post.full_post();
        let image = self.load_image(post).await;
        let mut report = PublishReport::new();

        info!("Publishing post {} ({})", post.id, post.kind);
        if let Some(image) = &image {
            info!("Image: {}", image.path.display());
        }

        let facebook = if self.credentials.facebook_enabled() {
            let outcome = self.post_to_facebook(&message, image.as_ref()).await;
            into_result(Platform::Facebook, outcome)
        } else {
            disabled(Platform::Facebook)
        };
        let facebook_photo_id = facebook
            .post_id
            .clone()
            .filter(|_| facebook.success && facebook.has_image);
        report.record(facebook);

        let instagram = if self.credentials.instagram_enabled() {
            let outcome = self
                .post_to_instagram(&message, image.as_ref(), facebook_photo_id.as_deref())
                .await;
            into_result(Platform::Instagram, outcome)
        } else {
            disabled(Platform::Instagram)
        };
        report.record(instagram);

        if report.overall_success {
            info!("Posting completed successfully");
        } else {
            error!("Posting failed on all platforms");
        }

        if let Err(e) = self.posting_log.append(post, &report) {
            self.reporter
                .report_recovered(&e, "posting results not written to the log");
        }
        Ok(report)
    }
}
