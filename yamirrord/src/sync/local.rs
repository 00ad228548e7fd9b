use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("cannot read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Immediate child of a local directory, read fresh on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: OffsetDateTime,
}

/// Lists the regular files and directories directly under `dir`, sorted by
/// name. Symlinks are followed; entries that cannot be inspected are skipped.
pub async fn read_children(dir: &Path) -> Result<Vec<LocalEntry>, LocalError> {
    let read_dir_err = |source| LocalError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut reader = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await.map_err(read_dir_err)? {
        let path = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %path.display(), "skipping entry with non UTF-8 name");
            continue;
        };
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !metadata.is_file() && !metadata.is_dir() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => OffsetDateTime::from(modified),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping entry without mtime");
                continue;
            }
        };
        entries.push(LocalEntry {
            name,
            path,
            is_dir: metadata.is_dir(),
            modified,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
