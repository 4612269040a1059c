//! Local JSON persistence.
//!
//! Every file is read once when opened and rewritten wholesale on each
//! mutation. There is no locking and no partial-write protection.

mod json_file;

pub mod daily;
pub mod posting_log;
pub mod uploads;


pub use daily::save_daily_post;
pub use posting_log::{PostingLog, PostingLogEntry};
pub use uploads::{UploadRecord, UploadTracker};

use daypost_core::{CoreError, PostRecord};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only post history.
pub trait PostStore {
    fn posts(&self) -> &[PostRecord];

    fn append(&mut self, post: PostRecord) -> Result<(), CoreError>;

    fn recent(&self, count: usize) -> &[PostRecord] {
        let posts = self.posts();
        &posts[posts.len().saturating_sub(count)..]
    }

    fn len(&self) -> usize {
        self.posts().len()
    }

    fn is_empty(&self) -> bool {
        self.posts().is_empty()
    }
}

/// History kept in a single JSON array file.
#[derive(Debug)]
pub struct JsonPostStore {
    path: PathBuf,
    posts: Vec<PostRecord>,
}

impl JsonPostStore {
    /// Opens the history file; a missing file starts an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let posts: Vec<PostRecord> = json_file::read_or_default(&path)?;
        debug!("Loaded {} posts from {}", posts.len(), path.display());
        Ok(Self { path, posts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PostStore for JsonPostStore {
    fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    fn append(&mut self, post: PostRecord) -> Result<(), CoreError> {
        self.posts.push(post);
        json_file::write_pretty(&self.path, &self.posts)
    }
}

/// Non-persistent history, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: Vec<PostRecord>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<PostRecord>) -> Self {
        Self { posts }
    }
}

impl PostStore for MemoryPostStore {
    fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    fn append(&mut self, post: PostRecord) -> Result<(), CoreError> {
        self.posts.push(post);
        Ok(())
    }
}
