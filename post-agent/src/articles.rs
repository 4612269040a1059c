use daypost_core::{BlogConfig, CoreError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

const SUMMARY_FALLBACK_CHARS: usize = 180;
const DEFAULT_TITLE: &str = "Our Latest Blog Post";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFormat {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturedImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub formats: BTreeMap<String, ImageFormat>,
}

/// A published article as returned by the CMS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, rename = "featuredImage")]
    pub featured_image: Option<FeaturedImage>,
}

#[derive(Debug, Deserialize)]
struct ArticleList {
    #[serde(default)]
    data: Vec<Article>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Article {
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or(DEFAULT_TITLE)
    }

    /// The summary, or the opening of the body followed by an ellipsis.
    pub fn summary_text(&self) -> String {
        if let Some(summary) = non_empty(&self.summary) {
            return summary.to_string();
        }
        let opening: String = self
            .content
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(SUMMARY_FALLBACK_CHARS)
            .collect();
        format!("{}...", opening)
    }

    pub fn link(&self, site_url: &str) -> String {
        let site = site_url.trim_end_matches('/');
        match non_empty(&self.slug) {
            Some(slug) => format!("{}/blog/{}", site, slug),
            None => format!("{}/blog", site),
        }
    }

    /// Featured image URL, preferring the medium rendition, then small, then
    /// the original upload.
    pub fn image_url(&self, site_url: &str) -> Option<String> {
        let image = self.featured_image.as_ref()?;
        let format_url = |name: &str| image.formats.get(name).and_then(|f| non_empty(&f.url));
        let path = format_url("medium")
            .or_else(|| format_url("small"))
            .or_else(|| non_empty(&image.url))?;

        if path.starts_with("http://") || path.starts_with("https://") {
            Some(path.to_string())
        } else {
            Some(format!("{}{}", site_url.trim_end_matches('/'), path))
        }
    }
}

/// Where promotion posts get their article from.
pub trait ArticleSource {
    /// The most recently published article, if any.
    async fn latest_article(&self) -> Result<Option<Article>, CoreError>;
}

/// Reads the newest live post from a Strapi-style CMS.
#[derive(Debug, Clone)]
pub struct CmsArticleSource {
    http_client: Client,
    api_url: String,
}

impl CmsArticleSource {
    pub fn new(blog: &BlogConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http_client,
            api_url: blog.api_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ArticleSource for CmsArticleSource {
    async fn latest_article(&self) -> Result<Option<Article>, CoreError> {
        let url = format!("{}/api/posts", self.api_url);
        debug!("Fetching latest article from {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("populate", "featuredImage"),
                ("sort", "publishedDate:desc"),
                ("pagination[limit]", "1"),
                ("publicationState", "live"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Article request failed with status: {}", status);
            return Err(CoreError::RequestFailed {
                message: format!("CMS returned {}", status),
                status_code: Some(status.as_u16()),
            });
        }

        let list: ArticleList = response.json().await?;
        let article = list.data.into_iter().next();
        match &article {
            Some(article) => info!("Latest article: {}", article.title()),
            None => info!("CMS returned no published articles"),
        }
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://fishtownwebdesign.com";

    fn article(value: serde_json::Value) -> Article {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_cms_listing() {
        let raw = r#"{
            "data": [{
                "id": 12,
                "title": "Five Signs You Need a Redesign",
                "slug": "five-signs",
                "summary": null,
                "content": "Short body.",
                "publishedDate": "2024-11-20",
                "featuredImage": {
                    "url": "/uploads/hero.jpg",
                    "formats": {
                        "medium": { "url": "/uploads/medium_hero.jpg", "width": 750 },
                        "small": { "url": "/uploads/small_hero.jpg" }
                    }
                }
            }],
            "meta": { "pagination": { "total": 1 } }
        }"#;
        let list: ArticleList = serde_json::from_str(raw).unwrap();
        let first = &list.data[0];
        assert_eq!(first.title(), "Five Signs You Need a Redesign");
        assert_eq!(first.summary_text(), "Short body....");
        assert_eq!(
            first.image_url(SITE).as_deref(),
            Some("https://fishtownwebdesign.com/uploads/medium_hero.jpg")
        );

        let empty: ArticleList = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.data.is_empty());
    }

    #[test]
    fn test_summary_falls_back_to_opening_chars() {
        let body = "é".repeat(300);
        let article = article(serde_json::json!({ "summary": "", "content": body }));
        let summary = article.summary_text();
        assert_eq!(summary.chars().count(), 183);
        assert!(summary.ends_with("..."));

        let missing = Article::default();
        assert_eq!(missing.summary_text(), "...");
        assert_eq!(missing.title(), "Our Latest Blog Post");
    }

    #[test]
    fn test_link_with_and_without_slug() {
        let with_slug = article(serde_json::json!({ "slug": "seo-basics" }));
        assert_eq!(with_slug.link(SITE), "https://fishtownwebdesign.com/blog/seo-basics");
        assert_eq!(Article::default().link("https://example.com/"), "https://example.com/blog");
    }

    #[test]
    fn test_image_url_preference() {
        let original_only = article(serde_json::json!({
            "featuredImage": { "url": "/uploads/hero.jpg" }
        }));
        assert_eq!(
            original_only.image_url(SITE).as_deref(),
            Some("https://fishtownwebdesign.com/uploads/hero.jpg")
        );

        let absolute = article(serde_json::json!({
            "featuredImage": { "url": "https://cdn.example/hero.jpg" }
        }));
        assert_eq!(
            absolute.image_url(SITE).as_deref(),
            Some("https://cdn.example/hero.jpg")
        );

        assert_eq!(Article::default().image_url(SITE), None);
    }
}
