use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const HOLIDAY_KIND: &str = "holiday";
pub const BLOG_PROMOTION_KIND: &str = "blog_promotion";
pub const FALLBACK_KIND: &str = "fallback";

/// Accepts RFC 3339 and offset-less ISO 8601 (read as local time).
pub fn parse_local_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}

fn deserialize_local_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_local_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Type tag of a generated post. Serialized as the bare tag string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostKind {
    Category(String),
    Holiday,
    BlogPromotion,
    Fallback,
}

impl PostKind {
    pub fn as_str(&self) -> &str {
        match self {
            PostKind::Category(name) => name,
            PostKind::Holiday => HOLIDAY_KIND,
            PostKind::BlogPromotion => BLOG_PROMOTION_KIND,
            PostKind::Fallback => FALLBACK_KIND,
        }
    }
}

impl From<String> for PostKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            HOLIDAY_KIND => PostKind::Holiday,
            BLOG_PROMOTION_KIND => PostKind::BlogPromotion,
            FALLBACK_KIND => PostKind::Fallback,
            _ => PostKind::Category(tag),
        }
    }
}

impl From<PostKind> for String {
    fn from(kind: PostKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayMatch {
    pub key: String,
    pub name: String,
    pub category: String,
    pub date: NaiveDate,
}

impl HolidayMatch {
    /// The two holiday-specific hashtags attached to holiday posts.
    pub fn hashtags(&self) -> Vec<String> {
        let compact: String = self.name.split_whitespace().collect();
        vec![format!("#{}", compact.replace('-', "")), format!("#{}", compact)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogLink {
    pub title: String,
    pub url: String,
}

/// One generated post. Appended to history and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "deserialize_local_timestamp")]
    pub generated_at: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday: Option<HolidayMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog: Option<BlogLink>,
}

impl PostRecord {
    pub fn new(kind: PostKind, content: String, hashtags: Vec<String>) -> Self {
        let generated_at = Local::now();
        let prefix = match &kind {
            PostKind::Category(_) => "post",
            PostKind::Holiday => "holiday_post",
            PostKind::BlogPromotion => "blog_promotion",
            PostKind::Fallback => "fallback",
        };
        Self {
            id: format!("{}_{}", prefix, generated_at.format("%Y%m%d_%H%M%S")),
            kind,
            content,
            hashtags,
            image_path: None,
            image_url: None,
            generated_at,
            holiday: None,
            blog: None,
        }
    }

    /// Body followed by the space-joined hashtags, as published.
    pub fn full_post(&self) -> String {
        if self.hashtags.is_empty() {
            return self.content.clone();
        }
        format!("{}\n\n{}", self.content, self.hashtags.join(" "))
    }

    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Facebook => f.write_str("facebook"),
            Platform::Instagram => f.write_str("instagram"),
        }
    }
}

/// Outcome of publishing to one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformResult {
    pub platform: Platform,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default)]
    pub has_image: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformResult {
    pub fn posted(platform: Platform, post_id: Option<String>, has_image: bool) -> Self {
        Self {
            platform,
            success: true,
            post_id,
            media_id: None,
            has_image,
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            success: false,
            post_id: None,
            media_id: None,
            has_image: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    #[serde(deserialize_with = "deserialize_local_timestamp")]
    pub timestamp: DateTime<Local>,
    pub platforms: BTreeMap<Platform, PlatformResult>,
    pub overall_success: bool,
}

impl PublishReport {
    pub fn new() -> Self {
        Self {
            timestamp: Local::now(),
            platforms: BTreeMap::new(),
            overall_success: false,
        }
    }

    /// Records a platform result; the report succeeds once any platform does.
    pub fn record(&mut self, result: PlatformResult) {
        self.platforms.insert(result.platform, result);
        self.overall_success = self.platforms.values().any(|r| r.success);
    }
}

impl Default for PublishReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_kind_tags() {
        assert_eq!(PostKind::from("holiday".to_string()), PostKind::Holiday);
        assert_eq!(
            PostKind::from("seo_tips".to_string()),
            PostKind::Category("seo_tips".to_string())
        );
        assert_eq!(String::from(PostKind::BlogPromotion), "blog_promotion");
    }

    #[test]
    fn test_post_record_serializes_type_tag() {
        let post = PostRecord::new(
            PostKind::Fallback,
            "Hello".to_string(),
            vec!["#A".to_string()],
        );
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["type"], "fallback");
        assert!(json.get("image_path").is_none());
        assert!(post.id.starts_with("fallback_"));
    }

    #[test]
    fn test_parse_local_timestamp_formats() {
        assert!(parse_local_timestamp("2024-11-28T10:15:00+00:00").is_some());
        assert!(parse_local_timestamp("2024-11-28T10:15:00.123456").is_some());
        assert!(parse_local_timestamp("2024-11-28T10:15:00").is_some());
        assert!(parse_local_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_full_post_joins_hashtags() {
        let post = PostRecord::new(
            PostKind::Category("web_design_tip".to_string()),
            "Speed matters".to_string(),
            vec!["#WebDesign".to_string(), "#SEO".to_string()],
        );
        assert_eq!(post.full_post(), "Speed matters\n\n#WebDesign #SEO");
        assert!(post.id.starts_with("post_"));
    }

    #[test]
    fn test_holiday_hashtags() {
        let holiday = HolidayMatch {
            key: "martin_luther_king_day".to_string(),
            name: "Martin Luther King Jr. Day".to_string(),
            category: "major".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        assert_eq!(
            holiday.hashtags(),
            vec!["#MartinLutherKingJr.Day", "#MartinLutherKingJr.Day"]
        );

        let new_year = HolidayMatch {
            key: "new_years_day".to_string(),
            name: "New Year's Day".to_string(),
            category: "major".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(new_year.hashtags()[0], "#NewYear'sDay");
    }

    #[test]
    fn test_publish_report_any_platform_succeeds() {
        let mut report = PublishReport::new();
        report.record(PlatformResult::failed(Platform::Facebook, "HTTP 500"));
        assert!(!report.overall_success);
        report.record(PlatformResult::posted(
            Platform::Instagram,
            Some("ig_1".to_string()),
            true,
        ));
        assert!(report.overall_success);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["platforms"]["facebook"]["error"], "HTTP 500");
        assert_eq!(json["platforms"]["instagram"]["success"], true);
    }
}
