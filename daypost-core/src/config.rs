//! Application configuration.
//!
//! Settings come from a TOML file whose sections all fall back to defaults,
//! secrets come from the environment (optionally seeded from a `.env` file).

use crate::error::ConfigError;
use crate::holiday::{Holiday, HolidayCalendar};
use crate::types::{BLOG_PROMOTION_KIND, HOLIDAY_KIND};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/daypost.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub location: String,
    pub services: Vec<String>,
    pub target_audience: Vec<String>,
    pub brand_voice: String,
    pub content_guidelines: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "Fishtown Web Design".to_string(),
            location: "Fishtown, Philadelphia".to_string(),
            services: strings(&[
                "Custom Website Design",
                "E-commerce Development",
                "SEO Optimization",
                "Website Maintenance",
                "Mobile-First Design",
                "Brand Identity Design",
                "Digital Marketing",
            ]),
            target_audience: strings(&[
                "Small businesses in Philadelphia",
                "Blue collar businesses, like, plumbers, electricians, and HVAC technicians.",
                "Professional services",
                "Startups and entrepreneurs",
                "Non-profit organizations",
            ]),
            brand_voice: "Professional yet approachable, creative, community-focused, \
                          tech-savvy but human, philly based"
                .to_string(),
            content_guidelines: "IMPORTANT: Do not mention having a local office, physical \
                                 workspace, or in-person meetings. We are a fully remote company \
                                 serving the Philadelphia area. Focus on digital services, online \
                                 collaboration, and virtual support for local businesses."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl CategoryConfig {
    fn new(name: &str, description: &str, image_subject: &str, hashtags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            image_prompt: Some(format!(
                "Flat design vector illustration in Canva style {image_subject} \
                 Use #FECE87 and black as primary colors."
            )),
            hashtags: strings(hashtags),
        }
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            "web_design_tip",
            "Share a practical web design tip that small businesses can implement immediately. Make it actionable and valuable.",
            "for a web design tip. Bold sans-serif text overlay, simple website and laptop icons, pastel background, lots of whitespace, clean and modern.",
            &["#WebDesign", "#UXDesign", "#WebsiteDesign", "#DigitalDesign"],
        ),
        CategoryConfig::new(
            "industry_insight",
            "Share an insight about web design trends, digital marketing, or technology that affects small businesses.",
            "for industry insight. Bold sans-serif text overlay, modern tech and web icons, pastel background, clean layout, lots of whitespace.",
            &["#DigitalMarketing", "#WebDesign", "#IndustryInsights", "#TechTrends"],
        ),
        CategoryConfig::new(
            "behind_the_scenes",
            "Show the human side of web design - share something about the team, creative process, or digital workspace. Focus on collaboration, creativity, and the digital tools we use.",
            "showing a creative workspace or team collaboration. Bold text overlay, simple icons, pastel background, clean and modern.",
            &["#BehindTheScenes", "#WebDesign", "#TeamWork", "#CreativeProcess"],
        ),
        CategoryConfig::new(
            "local_community",
            "Connect with the Fishtown/Philadelphia community. Mention local events, businesses, or community initiatives.",
            "representing the Fishtown/Philadelphia community. Community icons, local landmarks, bold text overlay, pastel background, clean layout.",
            &["#Fishtown", "#Philadelphia", "#LocalBusiness", "#Community"],
        ),
        CategoryConfig::new(
            "tech_trends",
            "Discuss a relevant technology trend that small business owners should know about.",
            "for tech trends. Modern technology icons, bold sans-serif text, pastel background, clean and minimalist.",
            &["#TechTrends", "#WebDesign", "#Innovation", "#DigitalTransformation"],
        ),
        CategoryConfig::new(
            "business_tip",
            "Share a business tip related to digital presence, marketing, or online success.",
            "for a business tip. Bold text overlay, business and marketing icons, pastel background, clean and professional.",
            &["#BusinessTips", "#SmallBusiness", "#DigitalMarketing", "#Entrepreneur"],
        ),
        CategoryConfig::new(
            HOLIDAY_KIND,
            "Celebrate holidays with posts that honor the significance while connecting to web design and local business success.",
            "for a holiday celebration. Festive icons, bold text overlay, pastel background, clean and cheerful.",
            &["#Holiday", "#Celebration", "#WebDesign", "#LocalBusiness"],
        ),
        CategoryConfig::new(
            "client_spotlight",
            "Share a success story about a client project, highlighting the results and impact on their business. Focus on local Philadelphia businesses when possible.",
            "for a client spotlight. Business icons, success symbols, bold text overlay, pastel background, clean and modern.",
            &["#ClientSpotlight", "#SuccessStory", "#WebDesign", "#LocalBusiness"],
        ),
        CategoryConfig::new(
            "seo_tips",
            "Share practical SEO tips and strategies that help small businesses improve their online visibility and search rankings.",
            "for SEO tips. Search icons, graph/chart elements, bold text overlay, pastel background, clean and modern.",
            &["#SEO", "#SearchEngineOptimization", "#DigitalMarketing", "#WebDesign"],
        ),
        CategoryConfig::new(
            "mobile_design",
            "Share insights about mobile-first design, responsive websites, and mobile user experience best practices.",
            "for mobile design. Smartphone and tablet icons, responsive web elements, bold text overlay, pastel background, clean and modern.",
            &["#MobileDesign", "#ResponsiveDesign", "#UXDesign", "#MobileFirst"],
        ),
        CategoryConfig::new(
            BLOG_PROMOTION_KIND,
            "Promote the latest blog post. Summarize the post and encourage followers to read more on the blog. Include the blog title, a short summary, and a link. Use the blog's featured image.",
            "for a blog promotion. Blog and reading icons, bold text overlay, pastel background, clean and modern.",
            &["#Blog", "#WebDesignBlog", "#PhillyBusiness", "#FishtownWebDesign"],
        ),
    ]
}

fn default_hashtags() -> Vec<String> {
    strings(&[
        "#FishtownWebDesign",
        "#PhillyWebDesign",
        "#WebDesign",
        "#DigitalMarketing",
        "#Philadelphia",
        "#SmallBusiness",
        "#WebDevelopment",
        "#UXDesign",
        "#LocalBusiness",
        "#Fishtown",
        "#PhillyBusiness",
        "#WebsiteDesign",
        "#DigitalAgency",
        "#Branding",
        "#SEO",
    ])
}

fn default_fallback_posts() -> Vec<String> {
    strings(&[
        "💡 Quick web design tip: Make sure your website loads in under 3 seconds! Speed matters for both user experience and SEO. Need help optimizing your site? We're here to help! 🚀",
        "🌟 Client Spotlight: We recently helped a local Fishtown restaurant create a stunning website that increased their online orders by 40%! Great food + great website = happy customers! 🍕",
        "📊 Did you know? 57% of users won't recommend a business with a poorly designed mobile website. Mobile-first design isn't just a trend, it's essential! 📱",
        "🏘️ Love our Fishtown community! Supporting local businesses is what we're all about. What's your favorite local spot in the neighborhood? Share below! 👇",
        "🚀 The future of web design is here! AI-powered tools are revolutionizing how we create websites. But remember, human creativity and strategy still drive the best results! 🤖",
        "💼 Business tip: Your website is often the first impression potential customers have of your business. Make it count! Professional design builds trust and credibility. 🎯",
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Number of most recent history entries compared against.
    pub window: usize,
    /// Jaccard similarity above which content counts as a repeat.
    pub threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_attempts: usize,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub promotion_day: Weekday,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            model: "gpt-4".to_string(),
            max_tokens: 250,
            temperature: 0.8,
            promotion_day: Weekday::Fri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model: String,
    pub size: String,
    pub quality: String,
    pub style: String,
    /// Rewrite the image prompt through the chat model before generating.
    pub enhance_prompt: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "hd".to_string(),
            style: "vivid".to_string(),
            enhance_prompt: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/posts"),
            images_dir: PathBuf::from("data/images"),
        }
    }
}

impl StorageConfig {
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("post_history.json")
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.data_dir.join("uploaded_images.json")
    }

    pub fn posting_log_path(&self) -> PathBuf {
        self.data_dir.join("posting_log.json")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub min_post_interval_secs: u64,
    pub upload_retention_days: i64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com/v18.0".to_string(),
            min_post_interval_secs: 60,
            upload_retention_days: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub api_url: String,
    pub site_url: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:1337".to_string(),
            site_url: "https://fishtownwebdesign.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub company: CompanyProfile,
    pub categories: Vec<CategoryConfig>,
    pub hashtags: Vec<String>,
    pub fallback_posts: Vec<String>,
    pub dedup: DedupConfig,
    pub generation: GenerationConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub graph: GraphConfig,
    pub blog: BlogConfig,
    /// Replaces the built-in holiday calendar when non-empty.
    pub holidays: Vec<Holiday>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company: CompanyProfile::default(),
            categories: default_categories(),
            hashtags: default_hashtags(),
            fallback_posts: default_fallback_posts(),
            dedup: DedupConfig::default(),
            generation: GenerationConfig::default(),
            image: ImageConfig::default(),
            storage: StorageConfig::default(),
            graph: GraphConfig::default(),
            blog: BlogConfig::default(),
            holidays: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file at `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(source) => {
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&source)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", path.display());
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::InvalidValue {
                field: "config_path".to_string(),
                value: format!("{}: {}", path.display(), e),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.dedup.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "dedup.threshold".to_string(),
                value: self.dedup.threshold.to_string(),
            });
        }
        if self.dedup.window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dedup.window".to_string(),
                value: "0".to_string(),
            });
        }
        if self.generation.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.rotating_categories().next().is_none() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one non-promotional category is required".to_string(),
            });
        }
        if self.fallback_posts.is_empty() {
            return Err(ConfigError::MissingField {
                field: "fallback_posts".to_string(),
            });
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Categories eligible for random selection on ordinary days.
    pub fn rotating_categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories
            .iter()
            .filter(|c| c.name != HOLIDAY_KIND && c.name != BLOG_PROMOTION_KIND)
    }

    pub fn holiday_calendar(&self) -> HolidayCalendar {
        if self.holidays.is_empty() {
            HolidayCalendar::us_major()
        } else {
            HolidayCalendar::new(self.holidays.clone())
        }
    }
}

/// API credentials read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub facebook_token: Option<String>,
    pub facebook_page_id: Option<String>,
    pub instagram_account_id: Option<String>,
}

impl Credentials {
    /// Loads `config/.env` (or `.env`) and reads the credential variables.
    pub fn from_env() -> Self {
        if dotenvy::from_path("config/.env").is_err() {
            let _ = dotenvy::dotenv();
        }

        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            facebook_token: non_empty_var("FACEBOOK_ACCESS_TOKEN"),
            facebook_page_id: non_empty_var("FACEBOOK_PAGE_ID"),
            instagram_account_id: non_empty_var("INSTAGRAM_BUSINESS_ACCOUNT_ID"),
        }
    }

    pub fn facebook_enabled(&self) -> bool {
        self.facebook_token.is_some() && self.facebook_page_id.is_some()
    }

    pub fn instagram_enabled(&self) -> bool {
        self.facebook_token.is_some() && self.instagram_account_id.is_some()
    }

    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: "OPENAI_API_KEY".to_string(),
            })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
