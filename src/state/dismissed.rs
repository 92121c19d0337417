//! Persistence of locally dismissed timer ids

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::timer::TimerId;

/// JSON file holding ids hidden by soft dismissal
#[derive(Debug, Clone)]
pub struct DismissedStore {
    path: PathBuf,
}

impl DismissedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored ids. A missing or unreadable file is an empty set.
    pub fn load(&self) -> HashSet<TimerId> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return HashSet::new(),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return HashSet::new();
            }
        };
        match serde_json::from_str::<Vec<TimerId>>(&raw) {
            Ok(ids) => {
                debug!("Loaded {} dismissed timer ids", ids.len());
                ids.into_iter().collect()
            }
            Err(e) => {
                warn!("Ignoring malformed {}: {}", self.path.display(), e);
                HashSet::new()
            }
        }
    }

    pub fn save(&self, ids: &HashSet<TimerId>) -> io::Result<()> {
        let mut sorted: Vec<TimerId> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let json = serde_json::to_string(&sorted).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }
}
