use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::backend::StorageBackend;
use super::diff::RemoteListing;
use super::error::SyncError;
use super::paths::RemotePath;

/// Wraps a [`StorageBackend`] and records one event per call with its
/// duration and outcome.
pub struct LoggedBackend<B> {
    inner: B,
}

impl<B> LoggedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for LoggedBackend<B> {
    async fn list_folder(&self, path: &RemotePath) -> Result<RemoteListing, SyncError> {
        let started = Instant::now();
        let result = self.inner.list_folder(path).await;
        if let Ok(listing) = &result {
            debug!(path = %path, files = listing.len(), "remote listing received");
        }
        record("list_folder", path, started, &result);
        result
    }

    async fn folder_exists(&self, path: &RemotePath) -> Result<bool, SyncError> {
        let started = Instant::now();
        let result = self.inner.folder_exists(path).await;
        record("folder_exists", path, started, &result);
        result
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<(), SyncError> {
        let started = Instant::now();
        let result = self.inner.create_folder(path).await;
        record("create_folder", path, started, &result);
        result
    }

    async fn upload_new(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        let started = Instant::now();
        let result = self.inner.upload_new(path, local).await;
        record("upload_new", path, started, &result);
        result
    }

    async fn overwrite(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        let started = Instant::now();
        let result = self.inner.overwrite(path, local).await;
        record("overwrite", path, started, &result);
        result
    }

    async fn delete_remote(&self, path: &RemotePath) -> Result<(), SyncError> {
        let started = Instant::now();
        let result = self.inner.delete_remote(path).await;
        record("delete_remote", path, started, &result);
        result
    }
}

fn record<T>(op: &'static str, path: &RemotePath, started: Instant, result: &Result<T, SyncError>) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(_) => debug!(op, path = %path, elapsed_ms, "backend call completed"),
        Err(err) if err.is_fatal() => {
            error!(op, path = %path, elapsed_ms, error = %err, "backend rejected credentials")
        }
        Err(err) => warn!(
            op,
            path = %path,
            elapsed_ms,
            kind = ?err.kind(),
            error = %err,
            "backend call failed"
        ),
    }
}
