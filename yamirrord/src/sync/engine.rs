use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use super::backend::StorageBackend;
use super::diff::diff;
use super::dispatch::{SyncCounts, dispatch};
use super::error::SyncError;
use super::local::read_children;
use super::paths::RemotePath;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Mirrors a local tree onto a remote folder, one directory at a time.
///
/// Each directory costs one remote listing. Its files are dispatched as a
/// single concurrent batch, then subdirectories are visited depth-first, one
/// after another. The remote cursor is an immutable [`RemotePath`] handed to
/// each recursion, so a child can never leak its path into a sibling.
/// A directory whose canonical path is already on the current branch (a
/// symlink back to an ancestor) is skipped.
///
/// Non-fatal failures only cost the affected file or subtree. The returned
/// error is always an authorization failure.
pub struct MirrorEngine<B> {
    backend: B,
    max_depth: usize,
}

impl<B: StorageBackend> MirrorEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn run(
        &self,
        local_root: &Path,
        remote_root: &RemotePath,
    ) -> Result<SyncCounts, SyncError> {
        let canonical = match tokio::fs::canonicalize(local_root).await {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(local = %local_root.display(), error = %err, "cannot resolve local root, skipping pass");
                return Ok(SyncCounts::default());
            }
        };
        self.sync_directory(local_root, remote_root.clone(), 0, vec![canonical])
            .await
    }

    /// Creates `path` unless it is already present.
    pub async fn ensure_folder(&self, path: &RemotePath) -> Result<(), SyncError> {
        if !self.backend.folder_exists(path).await? {
            self.backend.create_folder(path).await?;
        }
        Ok(())
    }

    fn sync_directory<'a>(
        &'a self,
        local_dir: &'a Path,
        cursor: RemotePath,
        depth: usize,
        branch: Vec<PathBuf>,
    ) -> BoxFuture<'a, Result<SyncCounts, SyncError>> {
        Box::pin(async move {
            debug!(local = %local_dir.display(), remote = %cursor, depth, "syncing directory");
            let children = match read_children(local_dir).await {
                Ok(children) => children,
                Err(err) => {
                    warn!(remote = %cursor, error = %err, "skipping directory");
                    return Ok(SyncCounts::default());
                }
            };
            let remote = match self.backend.list_folder(&cursor).await {
                Ok(remote) => remote,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(local = %local_dir.display(), remote = %cursor, error = %err, "cannot list remote folder, skipping directory");
                    return Ok(SyncCounts::default());
                }
            };

            let mut counts = dispatch(&self.backend, &cursor, diff(&children, remote)).await?;

            for child in children.iter().filter(|entry| entry.is_dir) {
                let child_cursor = cursor.child(&child.name);
                if depth >= self.max_depth {
                    warn!(
                        local = %child.path.display(),
                        max_depth = self.max_depth,
                        "directory nesting too deep, skipping"
                    );
                    continue;
                }
                let canonical = match tokio::fs::canonicalize(&child.path).await {
                    Ok(canonical) => canonical,
                    Err(err) => {
                        warn!(local = %child.path.display(), error = %err, "cannot resolve directory, skipping");
                        continue;
                    }
                };
                if branch.contains(&canonical) {
                    warn!(
                        local = %child.path.display(),
                        target = %canonical.display(),
                        "directory loops back to an ancestor, skipping"
                    );
                    continue;
                }
                match self.ensure_folder(&child_cursor).await {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(remote = %child_cursor, error = %err, "cannot prepare remote folder, skipping directory");
                        continue;
                    }
                }
                let mut child_branch = branch.clone();
                child_branch.push(canonical);
                counts += self
                    .sync_directory(&child.path, child_cursor, depth + 1, child_branch)
                    .await?;
            }

            Ok(counts)
        })
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
