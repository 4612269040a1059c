use crate::json_file;
use chrono::Local;
use daypost_core::{CoreError, PostKind, PostRecord, PublishReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingLogEntry {
    /// Local wall-clock time, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
    pub post_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub has_image: bool,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    pub posting_results: PublishReport,
}

impl PostingLogEntry {
    pub fn new(post: &PostRecord, report: &PublishReport) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            post_id: post.id.clone(),
            content: post.full_post(),
            kind: post.kind.clone(),
            has_image: post.has_image(),
            image_path: post.image_path.clone(),
            posting_results: report.clone(),
        }
    }
}

/// Append-only record of every publish attempt.
#[derive(Debug, Clone)]
pub struct PostingLog {
    path: PathBuf,
}

impl PostingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Result<Vec<PostingLogEntry>, CoreError> {
        json_file::read_or_default(&self.path)
    }

    pub fn append(&self, post: &PostRecord, report: &PublishReport) -> Result<(), CoreError> {
        let mut entries = self.entries()?;
        entries.push(PostingLogEntry::new(post, report));
        json_file::write_pretty(&self.path, &entries)?;
        debug!("Logged publish attempt for {}", post.id);
        Ok(())
    }
}
