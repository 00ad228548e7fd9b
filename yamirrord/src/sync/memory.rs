//! In-memory [`StorageBackend`] for exercising the engine without HTTP.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use time::OffsetDateTime;

use super::backend::StorageBackend;
use super::diff::RemoteListing;
use super::error::{ErrorKind, SyncError};
use super::paths::RemotePath;

#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub modified: OffsetDateTime,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct State {
    folders: BTreeMap<String, BTreeMap<String, RemoteFile>>,
    failures: HashMap<String, ErrorKind>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn with_root(root: &str) -> Self {
        let backend = Self::default();
        backend.add_folder(root);
        backend
    }

    pub fn add_folder(&self, path: &str) {
        self.lock().folders.entry(path.to_string()).or_default();
    }

    pub fn add_file(&self, path: &str, modified: OffsetDateTime) {
        let (folder, name) = split(path);
        self.lock()
            .folders
            .entry(folder.to_string())
            .or_default()
            .insert(
                name.to_string(),
                RemoteFile {
                    modified,
                    content: Vec::new(),
                },
            );
    }

    /// Every later call touching `path` fails with an error of `kind`.
    pub fn fail(&self, path: &str, kind: ErrorKind) {
        self.lock().failures.insert(path.to_string(), kind);
    }

    pub fn heal(&self, path: &str) {
        self.lock().failures.remove(path);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.lock().folders.contains_key(path)
    }

    pub fn file_names(&self, folder: &str) -> Vec<String> {
        self.lock()
            .folders
            .get(folder)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn file(&self, path: &str) -> Option<RemoteFile> {
        let (folder, name) = split(path);
        self.lock().folders.get(folder)?.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, op: &str, path: &RemotePath) -> Result<(), SyncError> {
        let mut state = self.lock();
        state.calls.push(format!("{op} {path}"));
        match state.failures.get(path.as_str()) {
            Some(kind) => Err(injected(*kind, path)),
            None => Ok(()),
        }
    }

    async fn store(&self, path: &RemotePath, local: &Path, replace: bool) -> Result<(), SyncError> {
        let content =
            tokio::fs::read(local)
                .await
                .map_err(|source| SyncError::LocalPermission {
                    path: local.to_path_buf(),
                    source,
                })?;
        let (folder, name) = split(path.as_str());
        let mut state = self.lock();
        let Some(files) = state.folders.get_mut(folder) else {
            return Err(api(StatusCode::CONFLICT, "parent folder is missing"));
        };
        if !replace && files.contains_key(name) {
            return Err(api(StatusCode::CONFLICT, "resource already exists"));
        }
        files.insert(
            name.to_string(),
            RemoteFile {
                modified: OffsetDateTime::now_utc(),
                content,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_folder(&self, path: &RemotePath) -> Result<RemoteListing, SyncError> {
        self.enter("list_folder", path)?;
        let state = self.lock();
        let files = state
            .folders
            .get(path.as_str())
            .ok_or_else(|| api(StatusCode::NOT_FOUND, "folder not found"))?;
        Ok(files
            .iter()
            .map(|(name, file)| (name.clone(), file.modified))
            .collect())
    }

    async fn folder_exists(&self, path: &RemotePath) -> Result<bool, SyncError> {
        self.enter("folder_exists", path)?;
        Ok(self.has_folder(path.as_str()))
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<(), SyncError> {
        self.enter("create_folder", path)?;
        self.add_folder(path.as_str());
        Ok(())
    }

    async fn upload_new(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        self.enter("upload_new", path)?;
        self.store(path, local, false).await
    }

    async fn overwrite(&self, path: &RemotePath, local: &Path) -> Result<(), SyncError> {
        self.enter("overwrite", path)?;
        self.store(path, local, true).await
    }

    async fn delete_remote(&self, path: &RemotePath) -> Result<(), SyncError> {
        self.enter("delete_remote", path)?;
        let (folder, name) = split(path.as_str());
        let mut state = self.lock();
        state
            .folders
            .get_mut(folder)
            .and_then(|files| files.remove(name))
            .map(|_| ())
            .ok_or_else(|| api(StatusCode::NOT_FOUND, "resource not found"))
    }
}

fn split(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

fn api(status: StatusCode, message: &str) -> SyncError {
    SyncError::Api {
        status: Some(status),
        message: message.to_string(),
    }
}

fn injected(kind: ErrorKind, path: &RemotePath) -> SyncError {
    match kind {
        ErrorKind::TransientTransport => {
            SyncError::Transport(format!("connection reset while calling {path}"))
        }
        ErrorKind::ApiRequest => api(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        ErrorKind::Authorization => SyncError::Authorization("Не авторизован.".to_string()),
        ErrorKind::LocalPermission => SyncError::LocalPermission {
            path: PathBuf::from(path.as_str()),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        },
    }
}
