pub mod backend;
pub mod diff;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod local;
pub mod logged;
#[cfg(test)]
pub(crate) mod memory;
pub mod paths;
pub mod transfer;

pub use backend::{StorageBackend, YadiskBackend};
pub use dispatch::SyncCounts;
pub use engine::MirrorEngine;
pub use error::{ErrorKind, SyncError};
pub use logged::LoggedBackend;
pub use paths::RemotePath;
