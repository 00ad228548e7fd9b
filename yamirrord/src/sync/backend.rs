use std::path::Path;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use yamirror_core::{ApiErrorClass, ResourceType, YadiskClient};

use super::diff::RemoteListing;
use super::error::{SyncError, accept_folder_creation};
use super::paths::RemotePath;
use super::transfer::TransferClient;

const LIST_PAGE_SIZE: u32 = 1000;

/// Remote store capabilities the engine relies on.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Files (not folders) directly inside `path`.
    async fn list_folder(&self, path: &RemotePath) -> Result<RemoteListing, SyncError>;

    async fn folder_exists(&self, path: &RemotePath) -> Result<bool, SyncError>;

    /// Must succeed when the folder already exists.
    async fn create_folder(&self, path: &RemotePath) -> Result<(), SyncError>;

    async fn upload_new(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError>;

    async fn overwrite(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError>;

    async fn delete_remote(&self, path: &RemotePath) -> Result<(), SyncError>;
}

/// [`StorageBackend`] over the Yandex Disk REST API.
#[derive(Clone)]
pub struct YadiskBackend {
    client: YadiskClient,
    transfer: TransferClient,
}

impl YadiskBackend {
    pub fn new(client: YadiskClient, transfer: TransferClient) -> Self {
        Self { client, transfer }
    }

    // Both phases run strictly in order: fetch the target, then send bytes.
    async fn save(&self, path: &RemotePath, local: &Path, overwrite: bool) -> Result<(), SyncError> {
        let link = self
            .client
            .get_upload_link(path.as_str(), overwrite)
            .await?;
        self.transfer
            .upload_from_path(link.href.as_str(), local)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for YadiskBackend {
    async fn list_folder(&self, path: &RemotePath) -> Result<RemoteListing, SyncError> {
        let items = self
            .client
            .list_directory_all(path.as_str(), LIST_PAGE_SIZE)
            .await?;
        Ok(items
            .into_iter()
            .filter(|item| item.resource_type == ResourceType::File)
            .map(|item| {
                let modified = parse_modified(item.modified.as_deref()).unwrap_or_else(|| {
                    debug!(path = %item.path, "remote file has no usable modification time");
                    OffsetDateTime::UNIX_EPOCH
                });
                (item.name, modified)
            })
            .collect())
    }

    async fn folder_exists(&self, path: &RemotePath) -> Result<bool, SyncError> {
        match self.client.get_resource(path.as_str()).await {
            Ok(resource) => Ok(resource.resource_type == ResourceType::Dir),
            Err(err) if err.classification() == Some(ApiErrorClass::NotFound) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<(), SyncError> {
        accept_folder_creation(self.client.create_folder(path.as_str()).await)
    }

    async fn upload_new(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        self.save(path, local, false).await
    }

    async fn overwrite(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        self.save(path, local, true).await
    }

    async fn delete_remote(&self, path: &RemotePath) -> Result<(), SyncError> {
        self.client.delete_resource(path.as_str(), false).await?;
        Ok(())
    }
}

fn parse_modified(value: Option<&str>) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value?, &Rfc3339).ok()
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
