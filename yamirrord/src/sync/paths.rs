use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("remote path is empty")]
    Empty,
    #[error("remote path contains unsupported component")]
    UnsupportedComponent,
}

/// Remote folder or file path. Values are never mutated: descending into a
/// child directory produces a new path, so a parent's cursor is unaffected by
/// whatever its children do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath(String);

impl RemotePath {
    /// Accepts POSIX-like (`/Backup`) and disk-prefixed (`disk:/Backup`) roots.
    pub fn new(value: &str) -> Result<Self, PathError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(PathError::Empty);
        }

        let (prefix, rest) = match value.find(":/") {
            Some(idx) => value.split_at(idx + 2),
            None => ("", value),
        };
        let mut normalized = prefix.to_string();
        if prefix.is_empty() && rest.starts_with('/') {
            normalized.push('/');
        }
        let mut first = true;
        for part in rest.split('/').filter(|part| !part.is_empty()) {
            if part == "." || part == ".." {
                return Err(PathError::UnsupportedComponent);
            }
            if !first {
                normalized.push('/');
            }
            normalized.push_str(part);
            first = false;
        }
        Ok(Self(normalized))
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.ends_with('/') {
            Self(format!("{}{}", self.0, name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
