use std::sync::{Arc, Mutex};
use std::{io, path::Path, path::PathBuf, time::Duration};

use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read {} while uploading: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("concurrency limiter is closed")]
    ConcurrencyClosed,
}

#[derive(Clone)]
pub struct TransferClient {
    http: Client,
    upload_limit: Arc<Semaphore>,
}

/// Budgets for binary transfers. They are intentionally far larger than the
/// metadata call budgets in [`yamirror_core::ClientTimeouts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub upload_concurrency: usize,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: 4,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            total_timeout: Duration::from_secs(60 * 60),
        }
    }
}

impl TransferClient {
    pub fn new() -> Result<Self, TransferError> {
        Self::with_config(TransferConfig::default())
    }

    pub fn with_config(config: TransferConfig) -> Result<Self, TransferError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.idle_timeout)
            .timeout(config.total_timeout)
            .build()?;
        Ok(Self {
            http,
            upload_limit: Arc::new(Semaphore::new(config.upload_concurrency.max(1))),
        })
    }

    /// Streams `source` as the body of a `PUT` to the transfer target `href`.
    ///
    /// The file is opened before a transfer slot is taken. A read failure
    /// while streaming is reported as [`TransferError::Read`] even though
    /// reqwest surfaces it as a body error.
    pub async fn upload_from_path(&self, href: &str, source: &Path) -> Result<(), TransferError> {
        let url = Url::parse(href)?;
        let open_err = |source_err| TransferError::Open {
            path: source.to_path_buf(),
            source: source_err,
        };
        let file = tokio::fs::File::open(source).await.map_err(open_err)?;
        let length = file.metadata().await.map_err(open_err)?.len();

        let _permit = self
            .upload_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransferError::ConcurrencyClosed)?;

        let read_failure = Arc::new(Mutex::new(None));
        let stash = Arc::clone(&read_failure);
        let stream = ReaderStream::new(file).inspect_err(move |err| {
            if let Ok(mut slot) = stash.lock() {
                slot.get_or_insert_with(|| io::Error::new(err.kind(), err.to_string()));
            }
        });
        let result = self
            .http
            .put(url)
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => Ok(()),
            Err(err) => match read_failure.lock().ok().and_then(|mut slot| slot.take()) {
                Some(source_err) => Err(TransferError::Read {
                    path: source.to_path_buf(),
                    source: source_err,
                }),
                None => Err(err.into()),
            },
        }
    }
}
