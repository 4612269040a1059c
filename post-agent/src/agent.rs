use crate::articles::ArticleSource;
use crate::imagery::ImageStudio;
use crate::orchestrator::PostOrchestrator;
use chrono::NaiveDate;
use daypost_core::{CoreError, PostRecord, PublishReport};
use graph_client::Publisher;
use llm_interface::{ContentGenerator, ImageGenerator};
use post_store::{save_daily_post, PostStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub enum RunOutcome {
    Posted {
        post: PostRecord,
        /// `None` when publishing was skipped.
        report: Option<PublishReport>,
        snapshot_path: PathBuf,
    },
    /// Nothing to post today.
    Skipped,
}

impl RunOutcome {
    pub fn post(&self) -> Option<&PostRecord> {
        match self {
            RunOutcome::Posted { post, .. } => Some(post),
            RunOutcome::Skipped => None,
        }
    }
}

/// One daily run: pick and write the post, illustrate it, publish it and
/// keep a snapshot of what went out.
pub struct DailyAgent<G, I, A, S, P> {
    orchestrator: PostOrchestrator<G, A, S>,
    studio: Option<ImageStudio<I>>,
    publisher: Option<P>,
    dry_run: bool,
}

impl<G, I, A, S, P> DailyAgent<G, I, A, S, P>
where
    G: ContentGenerator,
    I: ImageGenerator,
    A: ArticleSource,
    S: PostStore,
    P: Publisher,
{
    pub fn new(
        orchestrator: PostOrchestrator<G, A, S>,
        studio: Option<ImageStudio<I>>,
        publisher: Option<P>,
    ) -> Self {
        Self {
            orchestrator,
            studio,
            publisher,
            dry_run: false,
        }
    }

    /// Generates and snapshots the post but never publishes it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn orchestrator(&self) -> &PostOrchestrator<G, A, S> {
        &self.orchestrator
    }

    pub async fn run(&mut self, today: NaiveDate) -> Result<RunOutcome, CoreError> {
        let Some(mut post) = self.orchestrator.select(today).await? else {
            info!("No post for {}", today);
            return Ok(RunOutcome::Skipped);
        };
        info!("Generated {} post {}", post.kind, post.id);

        if let Some(studio) = self.studio.as_mut() {
            let config = self.orchestrator.config();
            let category = config.category(post.kind.as_str());
            let enhancer = Some((self.orchestrator.generator(), &config.generation));
            studio.attach_image(&mut post, category, enhancer).await;
        }

        let report = match self.publisher.as_mut() {
            Some(publisher) if !self.dry_run => Some(publisher.publish(&post).await?),
            _ => {
                info!("Publishing skipped");
                None
            }
        };

        let snapshot_path =
            save_daily_post(&self.orchestrator.config().storage.data_dir, today, &post)?;

        Ok(RunOutcome::Posted {
            post,
            report,
            snapshot_path,
        })
    }
}
