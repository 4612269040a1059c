use crate::json_file;
use chrono::NaiveDate;
use daypost_core::{CoreError, PostRecord};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn daily_file_path(data_dir: &Path, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("daily_posts_{}.json", date.format("%Y%m%d")))
}

/// Appends `post` to the snapshot file for `date` and returns its path.
pub fn save_daily_post(
    data_dir: &Path,
    date: NaiveDate,
    post: &PostRecord,
) -> Result<PathBuf, CoreError> {
    let path = daily_file_path(data_dir, date);
    let mut posts: Vec<PostRecord> = json_file::read_or_default(&path)?;
    posts.push(post.clone());
    json_file::write_pretty(&path, &posts)?;
    info!("Saved daily post {} to {}", post.id, path.display());
    Ok(path)
}
