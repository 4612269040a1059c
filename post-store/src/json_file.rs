use daypost_core::{CoreError, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

/// Reads a JSON document, treating a missing file as the empty state.
pub(crate) fn read_or_default<T>(path: &Path) -> Result<T, CoreError>
where
    T: DeserializeOwned + Default,
{
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(StoreError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
            .into())
        }
    };

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).map_err(|e| {
        tracing::error!("Failed to parse {}: {}", path.display(), e);
        CoreError::from(StoreError::CorruptFile {
            path: path.display().to_string(),
        })
    })
}

/// Rewrites the whole document, creating parent directories as needed.
pub(crate) fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let write_failed = |reason: String| StoreError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).map_err(|e| write_failed(e.to_string()))?;
    Ok(())
}
