use daypost_core::{CoreError, GraphApiError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramAccount {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub media_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageToken {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedObject {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    pub source: String,
}

/// A photo node, either as returned by an upload or fetched by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageSource>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl PhotoNode {
    /// Largest rendition first, then the thumbnail.
    pub fn image_url(&self) -> Option<&str> {
        self.images
            .first()
            .map(|image| image.source.as_str())
            .or(self.picture.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Image bytes plus the file name sent with multipart uploads.
#[derive(Debug, Clone)]
pub struct PhotoUpload<'a> {
    pub bytes: &'a [u8],
    pub file_name: &'a str,
}

/// Thin typed wrapper over the Graph API endpoints used for page and
/// Instagram publishing.
#[derive(Debug, Clone)]
pub struct GraphApiClient {
    http_client: Client,
    base_url: String,
}

impl GraphApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, node: &str) -> String {
        format!("{}/{}", self.base_url, node)
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, CoreError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Graph API request timed out: {}", endpoint);
                return Err(GraphApiError::RequestTimeout.into());
            }
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        error!("Request failed with status: {} for {}", status, endpoint);

        Err(classify_failure(status.as_u16(), body, retry_after).into())
    }

    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, CoreError> {
        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse {}: {}", what, e);
            CoreError::from(GraphApiError::InvalidResponse {
                details: format!("Failed to parse {}", what),
            })
        })
    }

    pub async fn verify_page(&self, user_token: &str, page_id: &str) -> Result<PageInfo, CoreError> {
        let request = self
            .http_client
            .get(self.url(page_id))
            .bearer_auth(user_token)
            .query(&[("fields", "id,name,category")]);

        let response = self.send(request, page_id).await.map_err(|e| {
            access_denied(e, |details| GraphApiError::PageAccessDenied { details }, "page ID")
        })?;
        let page: PageInfo = Self::parse(response, "page info").await?;
        info!(
            "Page access verified: {}",
            page.name.as_deref().unwrap_or("Unknown")
        );
        Ok(page)
    }

    pub async fn page_access_token(
        &self,
        user_token: &str,
        page_id: &str,
    ) -> Result<String, CoreError> {
        let request = self
            .http_client
            .get(self.url(page_id))
            .bearer_auth(user_token)
            .query(&[("fields", "access_token")]);

        let response = self.send(request, page_id).await?;
        let token: PageToken = Self::parse(response, "page token").await?;
        match token.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!("Retrieved page access token");
                Ok(token)
            }
            None => Err(GraphApiError::MissingPageToken.into()),
        }
    }

    /// Publishes a photo with caption on the page. Returns the new post id.
    pub async fn post_photo(
        &self,
        page_id: &str,
        page_token: &str,
        message: &str,
        photo: PhotoUpload<'_>,
    ) -> Result<String, CoreError> {
        let endpoint = format!("{}/photos", page_id);
        let form = Form::new()
            .part("source", image_part(&photo))
            .text("message", message.to_string())
            .text("access_token", page_token.to_string());

        let request = self.http_client.post(self.url(&endpoint)).multipart(form);
        let response = self.send(request, &endpoint).await?;
        let created: CreatedObject = Self::parse(response, "photo post").await?;
        required_id(created, "photo post")
    }

    /// Uploads a photo without creating a post, so that it gets a public URL.
    pub async fn upload_unpublished_photo(
        &self,
        page_id: &str,
        page_token: &str,
        photo: PhotoUpload<'_>,
    ) -> Result<PhotoNode, CoreError> {
        let endpoint = format!("{}/photos", page_id);
        let form = Form::new()
            .part("source", image_part(&photo))
            .text("access_token", page_token.to_string())
            .text("published", "false");

        let request = self.http_client.post(self.url(&endpoint)).multipart(form);
        let response = self.send(request, &endpoint).await?;
        Self::parse(response, "photo upload").await
    }

    pub async fn photo(&self, photo_id: &str, page_token: &str) -> Result<PhotoNode, CoreError> {
        let request = self
            .http_client
            .get(self.url(photo_id))
            .query(&[("fields", "images,picture"), ("access_token", page_token)]);

        let response = self.send(request, photo_id).await?;
        Self::parse(response, "photo").await
    }

    /// Text-only page post. Returns the new post id.
    pub async fn post_feed(
        &self,
        page_id: &str,
        page_token: &str,
        message: &str,
    ) -> Result<String, CoreError> {
        let endpoint = format!("{}/feed", page_id);
        let request = self
            .http_client
            .post(self.url(&endpoint))
            .form(&[("message", message), ("access_token", page_token)]);

        let response = self.send(request, &endpoint).await?;
        let created: CreatedObject = Self::parse(response, "feed post").await?;
        required_id(created, "feed post")
    }

    pub async fn verify_instagram(
        &self,
        user_token: &str,
        account_id: &str,
    ) -> Result<InstagramAccount, CoreError> {
        let request = self
            .http_client
            .get(self.url(account_id))
            .bearer_auth(user_token)
            .query(&[("fields", "id,username,media_count")]);

        let response = self.send(request, account_id).await.map_err(|e| {
            access_denied(
                e,
                |details| GraphApiError::InstagramAccessDenied { details },
                "Instagram business account ID",
            )
        })?;
        let account: InstagramAccount = Self::parse(response, "Instagram account").await?;
        info!(
            "Instagram access verified: @{}",
            account.username.as_deref().unwrap_or("Unknown")
        );
        Ok(account)
    }

    /// Creates an Instagram media container. Returns the container id.
    pub async fn create_media_container(
        &self,
        account_id: &str,
        user_token: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, CoreError> {
        let endpoint = format!("{}/media", account_id);
        let request = self.http_client.post(self.url(&endpoint)).form(&[
            ("image_url", image_url),
            ("caption", caption),
            ("access_token", user_token),
        ]);

        let response = self.send(request, &endpoint).await?;
        let created: CreatedObject = Self::parse(response, "media container").await?;
        required_id(created, "media container")
    }

    /// Publishes a previously created container. Returns the media id.
    pub async fn publish_media(
        &self,
        account_id: &str,
        user_token: &str,
        creation_id: &str,
    ) -> Result<String, CoreError> {
        let endpoint = format!("{}/media_publish", account_id);
        let request = self
            .http_client
            .post(self.url(&endpoint))
            .form(&[("creation_id", creation_id), ("access_token", user_token)]);

        let response = self.send(request, &endpoint).await?;
        let created: CreatedObject = Self::parse(response, "media publish").await?;
        required_id(created, "media publish")
    }
}

fn image_part(photo: &PhotoUpload<'_>) -> Part {
    Part::bytes(photo.bytes.to_vec()).file_name(photo.file_name.to_string())
}

fn required_id(created: CreatedObject, what: &str) -> Result<String, CoreError> {
    created.id.filter(|id| !id.is_empty()).ok_or_else(|| {
        GraphApiError::InvalidResponse {
            details: format!("No id returned for {}", what),
        }
        .into()
    })
}

fn classify_failure(status_code: u16, body: String, retry_after: Option<u64>) -> GraphApiError {
    match status_code {
        429 => {
            let retry_after = retry_after.unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            GraphApiError::RateLimitExceeded { retry_after }
        }
        400 if body.to_lowercase().contains("duplicate") => GraphApiError::DuplicateMedia,
        code if code >= 500 => GraphApiError::ServerError { status_code: code },
        code => GraphApiError::Rejected {
            status_code: code,
            body,
        },
    }
}

/// Turns a rejected verification call into an access error with a hint.
fn access_denied(
    error: CoreError,
    wrap: impl FnOnce(String) -> GraphApiError,
    id_label: &str,
) -> CoreError {
    match error {
        CoreError::GraphApi(GraphApiError::Rejected { status_code, body }) => {
            let mut details = format!("{} - {}", status_code, body);
            if body.contains("does not exist") {
                details.push_str(&format!("\nThe {} might be incorrect.", id_label));
            } else if body.contains("permissions") {
                details.push_str("\nCheck your access token permissions.");
            }
            wrap(details).into()
        }
        other => other,
    }
}
