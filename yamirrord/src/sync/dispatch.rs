use std::fmt;
use std::ops::AddAssign;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{error, info, warn};

use super::backend::StorageBackend;
use super::diff::DiffResult;
use super::error::SyncError;
use super::local::LocalEntry;
use super::paths::RemotePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Upload,
    Overwrite,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Upload => "upload",
            OperationKind::Overwrite => "overwrite",
            OperationKind::Delete => "delete",
        })
    }
}

#[derive(Debug)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    pub name: String,
    pub error: Option<SyncError>,
}

impl OperationOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Files changed remotely, summed over a directory, a subtree or a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncCounts {
    pub uploaded: usize,
    pub overwritten: usize,
    pub deleted: usize,
}

impl SyncCounts {
    pub fn record(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::Upload => self.uploaded += 1,
            OperationKind::Overwrite => self.overwritten += 1,
            OperationKind::Delete => self.deleted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.overwritten + self.deleted
    }
}

impl AddAssign for SyncCounts {
    fn add_assign(&mut self, other: Self) {
        self.uploaded += other.uploaded;
        self.overwritten += other.overwritten;
        self.deleted += other.deleted;
    }
}

enum Planned {
    Upload(LocalEntry),
    Overwrite(LocalEntry),
    Delete(String),
}

/// Runs every operation of `diff` concurrently and waits for all of them.
///
/// A failed operation is logged and left out of the counts without affecting
/// its siblings. An authorization failure stops the batch: outstanding
/// operations are dropped and the error is returned.
pub async fn dispatch<B: StorageBackend + ?Sized>(
    backend: &B,
    cursor: &RemotePath,
    diff: DiffResult,
) -> Result<SyncCounts, SyncError> {
    let planned = diff
        .to_upload
        .into_iter()
        .map(Planned::Upload)
        .chain(diff.to_overwrite.into_iter().map(Planned::Overwrite))
        .chain(diff.to_delete.into_iter().map(Planned::Delete));
    let mut pending: FuturesUnordered<_> = planned
        .map(|operation| execute(backend, cursor, operation))
        .collect();

    let mut counts = SyncCounts::default();
    while let Some(outcome) = pending.next().await {
        match outcome.error {
            None => {
                info!(op = %outcome.kind, name = %outcome.name, folder = %cursor, "file synchronized");
                counts.record(outcome.kind);
            }
            Some(err) if err.is_fatal() => {
                error!(op = %outcome.kind, name = %outcome.name, folder = %cursor, error = %err, "authorization failed, aborting pass");
                return Err(err);
            }
            Some(err) => {
                warn!(
                    op = %outcome.kind,
                    name = %outcome.name,
                    folder = %cursor,
                    kind = ?err.kind(),
                    error = %err,
                    "file not synchronized"
                );
            }
        }
    }
    Ok(counts)
}

async fn execute<B: StorageBackend + ?Sized>(
    backend: &B,
    cursor: &RemotePath,
    operation: Planned,
) -> OperationOutcome {
    let (kind, name, result) = match operation {
        Planned::Upload(entry) => {
            let result = backend
                .upload_new(&cursor.child(&entry.name), &entry.path)
                .await;
            (OperationKind::Upload, entry.name, result)
        }
        Planned::Overwrite(entry) => {
            let result = backend
                .overwrite(&cursor.child(&entry.name), &entry.path)
                .await;
            (OperationKind::Overwrite, entry.name, result)
        }
        Planned::Delete(name) => {
            let result = backend.delete_remote(&cursor.child(&name)).await;
            (OperationKind::Delete, name, result)
        }
    };
    OperationOutcome {
        kind,
        name,
        error: result.err(),
    }
}
