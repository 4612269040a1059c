//! Daily post selection, illustration and publishing.

pub mod agent;
pub mod articles;
pub mod composer;
pub mod imagery;
pub mod orchestrator;
pub mod prompts;


pub use agent::{DailyAgent, RunOutcome};
pub use articles::{Article, ArticleSource, CmsArticleSource};
pub use composer::{clean_generated_text, Composer};
pub use imagery::ImageStudio;
pub use orchestrator::PostOrchestrator;
