use std::collections::{BTreeMap, HashSet};

use time::OffsetDateTime;

use super::local::LocalEntry;

/// Files of one remote folder keyed by name, with their modification time.
pub type RemoteListing = BTreeMap<String, OffsetDateTime>;

/// File-level work for one directory. A name appears in at most one list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub to_upload: Vec<LocalEntry>,
    pub to_overwrite: Vec<LocalEntry>,
    pub to_delete: Vec<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.to_upload.len() + self.to_overwrite.len() + self.to_delete.len()
    }
}

/// Classifies the children of a local directory against the listing of its
/// remote counterpart.
///
/// Local files missing remotely are uploaded, and files whose local mtime is
/// strictly newer are overwritten. Remote files left unmatched are deleted,
/// except when a local directory carries the same name. Local directories
/// themselves are never classified; the engine descends into them.
pub fn diff(local_children: &[LocalEntry], mut remote: RemoteListing) -> DiffResult {
    let mut result = DiffResult::default();
    let mut local_dirs = HashSet::new();

    for entry in local_children {
        if entry.is_dir {
            local_dirs.insert(entry.name.as_str());
            continue;
        }
        match remote.remove(&entry.name) {
            None => result.to_upload.push(entry.clone()),
            Some(remote_modified) if entry.modified > remote_modified => {
                result.to_overwrite.push(entry.clone())
            }
            Some(_) => {}
        }
    }

    result.to_delete = remote
        .into_keys()
        .filter(|name| !local_dirs.contains(name.as_str()))
        .collect();
    result
}
