use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;
use yamirror_core::{ApiErrorClass, YadiskError, is_transport_error};

use super::transfer::TransferError;

/// How a failure is handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransientTransport,
    ApiRequest,
    Authorization,
    LocalPermission,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{}", api_display(*status, message))]
    Api {
        status: Option<StatusCode>,
        message: String,
    },
    #[error("authorization rejected: {0}")]
    Authorization(String),
    #[error("cannot read local file {}: {source}", path.display())]
    LocalPermission {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Transport(_) => ErrorKind::TransientTransport,
            SyncError::Api { .. } => ErrorKind::ApiRequest,
            SyncError::Authorization(_) => ErrorKind::Authorization,
            SyncError::LocalPermission { .. } => ErrorKind::LocalPermission,
        }
    }

    /// Only a rejected credential stops the pass and the process.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }
}

impl From<YadiskError> for SyncError {
    fn from(err: YadiskError) -> Self {
        if err.is_transport() {
            return SyncError::Transport(err.to_string());
        }
        let message = err.api_message().unwrap_or_else(|| err.to_string());
        match err.classification() {
            Some(ApiErrorClass::Auth) => SyncError::Authorization(message),
            _ => SyncError::Api {
                status: err.status(),
                message,
            },
        }
    }
}

impl From<TransferError> for SyncError {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::Open { path, source } | TransferError::Read { path, source } => {
                SyncError::LocalPermission { path, source }
            }
            TransferError::Request(err) if err.status() == Some(StatusCode::UNAUTHORIZED) => {
                SyncError::Authorization(err.to_string())
            }
            TransferError::Request(err) if err.status().is_none() && is_transport_error(&err) => {
                SyncError::Transport(err.to_string())
            }
            TransferError::Request(err) => SyncError::Api {
                status: err.status(),
                message: err.to_string(),
            },
            TransferError::ConcurrencyClosed => {
                SyncError::Transport("transfer limiter is closed".to_string())
            }
            TransferError::Url(err) => SyncError::Api {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

/// Folder creation succeeds when the folder was created or already exists.
pub fn accept_folder_creation(result: Result<(), YadiskError>) -> Result<(), SyncError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.classification() == Some(ApiErrorClass::Conflict) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn api_display(status: Option<StatusCode>, message: &str) -> String {
    match status {
        Some(status) => format!("backend returned {status}: {message}"),
        None => format!("backend request failed: {message}"),
    }
}
