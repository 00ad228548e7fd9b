use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::info;
use yamirror_core::{ClientTimeouts, YadiskClient};

use crate::config::DaemonConfig;
use crate::sync::transfer::{TransferClient, TransferConfig};
use crate::sync::{LoggedBackend, MirrorEngine, RemotePath, SyncCounts, SyncError, YadiskBackend};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type DaemonEngine = MirrorEngine<LoggedBackend<YadiskBackend>>;

pub struct DaemonRuntime {
    config: DaemonConfig,
    remote_root: RemotePath,
    engine: DaemonEngine,
}

impl DaemonRuntime {
    /// Checks the local root, builds the backend stack and makes sure the
    /// remote root folder exists. A rejected token fails here.
    pub async fn bootstrap(config: DaemonConfig) -> anyhow::Result<Self> {
        let metadata = tokio::fs::metadata(&config.local_root)
            .await
            .with_context(|| format!("local path {} does not exist", config.local_root.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("local path {} is not a directory", config.local_root.display());
        }
        let remote_root = RemotePath::new(&config.remote_root)
            .with_context(|| format!("invalid remote folder {:?}", config.remote_root))?;

        let client = YadiskClient::with_timeouts(
            &config.api_url,
            config.token.clone(),
            ClientTimeouts {
                request: config.api_timeout,
                connect: CONNECT_TIMEOUT,
            },
        )?;
        let transfer = TransferClient::with_config(TransferConfig {
            upload_concurrency: config.upload_concurrency,
            idle_timeout: config.transfer_idle_timeout,
            total_timeout: config.transfer_timeout,
            ..TransferConfig::default()
        })?;
        let engine = MirrorEngine::new(LoggedBackend::new(YadiskBackend::new(client, transfer)))
            .with_max_depth(config.max_depth);

        engine
            .ensure_folder(&remote_root)
            .await
            .with_context(|| format!("failed to prepare remote folder {remote_root}"))?;

        Ok(Self {
            config,
            remote_root,
            engine,
        })
    }

    /// Runs passes forever, one every `sync_period`, until Ctrl-C or a fatal
    /// error.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            local_root = %self.config.local_root.display(),
            remote_root = %self.remote_root,
            period_secs = self.config.sync_period.as_secs(),
            "daemon started"
        );
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let started = Instant::now();
            tokio::select! {
                result = self.run_once() => {
                    result?;
                }
                _ = &mut shutdown => {
                    info!("stop requested, abandoning current pass");
                    return Ok(());
                }
            }

            let wait = next_pass_delay(self.config.sync_period, started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("stop requested");
                    return Ok(());
                }
            }
        }
    }

    /// One full pass over the tree, logged with its counts.
    pub async fn run_once(&self) -> anyhow::Result<SyncCounts> {
        info!(
            local_root = %self.config.local_root.display(),
            remote_root = %self.remote_root,
            "sync pass started"
        );
        let started = Instant::now();
        let counts = self
            .engine
            .run(&self.config.local_root, &self.remote_root)
            .await?;
        info!(
            uploaded = counts.uploaded,
            overwritten = counts.overwritten,
            deleted = counts.deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync pass finished"
        );
        Ok(counts)
    }
}

/// True when `err` was caused by the backend rejecting the credentials.
pub fn is_authorization_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<SyncError>()
            .is_some_and(SyncError::is_fatal)
    })
}

fn next_pass_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
