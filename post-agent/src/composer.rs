use crate::articles::Article;
use daypost_core::{
    AppConfig, BlogConfig, BlogLink, CategoryConfig, HolidayMatch, PostKind, PostRecord,
};
use fastrand::Rng;

const GENERAL_TAGS_WITH_CATEGORY: usize = 3;
const GENERAL_TAGS_ALONE: usize = 6;
const GENERAL_TAGS_FOR_HOLIDAY: usize = 4;

/// Trims the completion and drops blank lines and numbered-list lines
/// (`1)` or `1.`), so a model that returns several variants yields one post.
pub fn clean_generated_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_numbered(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_numbered(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some(')' | '.')) if first.is_ascii_digit()
    )
}

/// Random picks for categories, hashtags and canned fallback text.
#[derive(Debug, Clone)]
pub struct Composer {
    hashtags: Vec<String>,
    fallback_posts: Vec<String>,
    rng: Rng,
}

impl Composer {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rng(config, Rng::new())
    }

    pub fn with_rng(config: &AppConfig, rng: Rng) -> Self {
        Self {
            hashtags: config.hashtags.clone(),
            fallback_posts: config.fallback_posts.clone(),
            rng,
        }
    }

    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.usize(..len))
    }

    /// Up to `count` distinct general hashtags in random order.
    pub fn sample_hashtags(&mut self, count: usize) -> Vec<String> {
        let mut pool: Vec<&String> = self.hashtags.iter().collect();
        let count = count.min(pool.len());
        for i in 0..count {
            let j = self.rng.usize(i..pool.len());
            pool.swap(i, j);
        }
        pool.into_iter().take(count).cloned().collect()
    }

    pub fn category_hashtags(&mut self, category: &CategoryConfig) -> Vec<String> {
        if category.hashtags.is_empty() {
            return self.sample_hashtags(GENERAL_TAGS_ALONE);
        }
        let mut tags = category.hashtags.clone();
        tags.extend(self.sample_hashtags(GENERAL_TAGS_WITH_CATEGORY));
        tags
    }

    pub fn holiday_hashtags(&mut self, holiday: &HolidayMatch) -> Vec<String> {
        let mut tags = self.sample_hashtags(GENERAL_TAGS_FOR_HOLIDAY);
        tags.extend(holiday.hashtags());
        tags
    }

    pub fn fallback_post(&mut self) -> PostRecord {
        let content = self
            .pick_index(self.fallback_posts.len())
            .map(|i| self.fallback_posts[i].clone())
            .unwrap_or_default();
        let hashtags = self.sample_hashtags(GENERAL_TAGS_ALONE);
        PostRecord::new(PostKind::Fallback, content, hashtags)
    }

    /// Blog promotion post for `article`, tagged with the promotion
    /// category's hashtags when configured.
    pub fn blog_promotion_post(
        &mut self,
        article: &Article,
        blog: &BlogConfig,
        category: Option<&CategoryConfig>,
    ) -> PostRecord {
        let title = article.title();
        let link = article.link(&blog.site_url);
        let content = format!(
            "Check out our latest blog post: {}\n\n{}\n\nRead more: {}",
            title,
            article.summary_text(),
            link
        );
        let hashtags = match category {
            Some(category) if !category.hashtags.is_empty() => category.hashtags.clone(),
            _ => self.sample_hashtags(GENERAL_TAGS_ALONE),
        };

        let mut post = PostRecord::new(PostKind::BlogPromotion, content, hashtags);
        post.image_url = article.image_url(&blog.site_url);
        post.blog = Some(BlogLink {
            title: title.to_string(),
            url: link,
        });
        post
    }
}
