use crate::articles::ArticleSource;
use crate::composer::{clean_generated_text, Composer};
use crate::prompts;
use chrono::{Datelike, NaiveDate};
use daypost_core::{
    AppConfig, CategoryConfig, CoreError, ErrorReporter, HolidayCalendar, HolidayMatch, LlmError,
    PostKind, PostRecord, BLOG_PROMOTION_KIND,
};
use llm_interface::{CompletionRequest, ContentGenerator};
use post_store::PostStore;
use similarity_engine::SimilarityEngine;
use tracing::{info, warn};

/// Decides what today's post is and produces it.
///
/// Priority: holiday, then the weekly promotion day, then a random category
/// with a bounded number of attempts to avoid repeating recent posts.
pub struct PostOrchestrator<G, A, S> {
    config: AppConfig,
    calendar: HolidayCalendar,
    categories: Vec<CategoryConfig>,
    similarity: SimilarityEngine,
    composer: Composer,
    generator: G,
    articles: A,
    store: S,
    reporter: ErrorReporter,
}

impl<G, A, S> PostOrchestrator<G, A, S>
where
    G: ContentGenerator,
    A: ArticleSource,
    S: PostStore,
{
    pub fn new(config: AppConfig, generator: G, articles: A, store: S) -> Self {
        let composer = Composer::new(&config);
        Self::with_composer(config, composer, generator, articles, store)
    }

    pub fn with_composer(
        config: AppConfig,
        composer: Composer,
        generator: G,
        articles: A,
        store: S,
    ) -> Self {
        Self {
            calendar: config.holiday_calendar(),
            categories: config.rotating_categories().cloned().collect(),
            similarity: SimilarityEngine::from_config(&config.dedup),
            composer,
            generator,
            articles,
            store,
            config,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Today's post, or `None` on a promotion day with nothing to promote.
    pub async fn select(&mut self, today: NaiveDate) -> Result<Option<PostRecord>, CoreError> {
        if let Some(holiday) = self.calendar.detect(today) {
            info!("Today is {}! Generating holiday-themed post", holiday.name);
            match self.holiday_post(&holiday).await {
                Ok(post) => {
                    self.store.append(post.clone())?;
                    return Ok(Some(post));
                }
                Err(e) => {
                    self.reporter
                        .report_recovered(&e, "holiday post failed, falling back to a regular post");
                    return self.category_post().await.map(Some);
                }
            }
        }

        if today.weekday() == self.config.generation.promotion_day {
            return self.blog_promotion_post().await;
        }

        self.category_post().await.map(Some)
    }

    async fn complete(&self, system: String, prompt: String) -> Result<String, CoreError> {
        let request = CompletionRequest::new(system, prompt, &self.config.generation);
        let content = clean_generated_text(&self.generator.generate(&request).await?);
        if content.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "content generator".to_string(),
            }
            .into());
        }
        Ok(content)
    }

    async fn holiday_post(&mut self, holiday: &HolidayMatch) -> Result<PostRecord, CoreError> {
        let company = &self.config.company;
        let content = self
            .complete(
                prompts::holiday_system(company, &holiday.name),
                prompts::holiday_prompt(company, &holiday.name),
            )
            .await?;

        let hashtags = self.composer.holiday_hashtags(holiday);
        let mut post = PostRecord::new(PostKind::Holiday, content, hashtags);
        post.holiday = Some(holiday.clone());
        Ok(post)
    }

    async fn blog_promotion_post(&mut self) -> Result<Option<PostRecord>, CoreError> {
        let article = match self.articles.latest_article().await {
            Ok(Some(article)) => article,
            Ok(None) => {
                info!("No new blog post found for this week. Skipping blog promotion post");
                return Ok(None);
            }
            Err(e) => {
                self.reporter
                    .report_recovered(&e, "no latest blog post, skipping blog promotion post");
                return Ok(None);
            }
        };

        let post = self.composer.blog_promotion_post(
            &article,
            &self.config.blog,
            self.config.category(BLOG_PROMOTION_KIND),
        );
        self.store.append(post.clone())?;
        Ok(Some(post))
    }

    async fn category_candidate(&mut self, category: &CategoryConfig) -> PostRecord {
        let company = &self.config.company;
        let generated = self
            .complete(
                prompts::category_system(company),
                prompts::category_prompt(company, category),
            )
            .await;

        match generated {
            Ok(content) => {
                let hashtags = self.composer.category_hashtags(category);
                PostRecord::new(PostKind::Category(category.name.clone()), content, hashtags)
            }
            Err(e) => {
                self.reporter
                    .report_recovered(&e, "generation failed, using a fallback post");
                self.composer.fallback_post()
            }
        }
    }

    async fn category_post(&mut self) -> Result<PostRecord, CoreError> {
        let max_attempts = self.config.generation.max_attempts;

        for attempt in 1..=max_attempts {
            let Some(index) = self.composer.pick_index(self.categories.len()) else {
                break;
            };
            let category = self.categories[index].clone();
            info!(
                "Generating {} post (attempt {}/{})",
                category.name, attempt, max_attempts
            );

            let post = self.category_candidate(&category).await;
            if self.similarity.is_too_similar(&post.content, self.store.posts()) {
                info!("Generated post is too similar to a recent post, retrying");
                continue;
            }

            self.store.append(post.clone())?;
            return Ok(post);
        }

        warn!("No sufficiently unique post after {} attempts, using a fallback post", max_attempts);
        Ok(self.composer.fallback_post())
    }
}
