//! Content-addressed record of images already pushed to a platform.

use crate::json_file;
use chrono::{DateTime, Duration, Local};
use daypost_core::{parse_local_timestamp, CoreError};
use serde::{Deserialize, Serialize};
use similarity_engine::content_hash;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Media id recorded when the platform itself reported a duplicate.
pub const DUPLICATE_DETECTED: &str = "duplicate_detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UploadRecord {
    #[serde(default)]
    pub media_id: Option<String>,
    /// Kept as written so that corrupt timestamps survive loading and get purged.
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl UploadRecord {
    pub fn uploaded_at(&self) -> Option<DateTime<Local>> {
        parse_local_timestamp(self.uploaded_at.as_deref()?)
    }
}

#[derive(Debug)]
pub struct UploadTracker {
    path: PathBuf,
    entries: BTreeMap<String, UploadRecord>,
}

impl UploadTracker {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let entries = json_file::read_or_default(&path)?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, image_bytes: &[u8]) -> Option<&UploadRecord> {
        self.entries.get(&content_hash(image_bytes))
    }

    pub fn already_uploaded(&self, image_bytes: &[u8]) -> bool {
        self.get(image_bytes).is_some()
    }

    pub fn mark_uploaded(
        &mut self,
        image_bytes: &[u8],
        remote_id: &str,
        image_path: Option<&Path>,
    ) -> Result<(), CoreError> {
        self.mark_uploaded_at(image_bytes, remote_id, image_path, Local::now())
    }

    pub fn mark_uploaded_at(
        &mut self,
        image_bytes: &[u8],
        remote_id: &str,
        image_path: Option<&Path>,
        uploaded_at: DateTime<Local>,
    ) -> Result<(), CoreError> {
        let record = UploadRecord {
            media_id: Some(remote_id.to_string()),
            uploaded_at: Some(uploaded_at.to_rfc3339()),
            image_path: image_path.map(|p| p.display().to_string()),
        };
        self.entries.insert(content_hash(image_bytes), record);
        json_file::write_pretty(&self.path, &self.entries)
    }

    /// Drops entries uploaded more than `days` ago, plus any entry without a
    /// readable timestamp. Returns the number of entries removed.
    pub fn purge_older_than(&mut self, days: i64) -> Result<usize, CoreError> {
        self.purge_older_than_at(days, Local::now())
    }

    pub fn purge_older_than_at(
        &mut self,
        days: i64,
        now: DateTime<Local>,
    ) -> Result<usize, CoreError> {
        let cutoff = now - Duration::days(days);
        let before = self.entries.len();
        self.entries
            .retain(|_, record| matches!(record.uploaded_at(), Some(at) if at >= cutoff));
        let removed = before - self.entries.len();

        if removed > 0 {
            json_file::write_pretty(&self.path, &self.entries)?;
            info!("Cleaned up {} old upload tracking entries", removed);
        }
        Ok(removed)
    }
}
