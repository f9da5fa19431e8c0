//! Durable memo of channels the bot credential cannot read.
//!
//! Stored as a JSON array of channel ids (default `./no-access-channels.json`).
//! Loaded once at the start of a run and overwritten once at the end. The set
//! only grows: there is no removal API, so clearing it means editing or
//! deleting the file by hand.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::ChannelId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoAccessSet {
    ids: BTreeSet<ChannelId>,
}

impl NoAccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a channel as inaccessible. Returns `true` if it was not already known.
    pub fn insert(&mut self, id: ChannelId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelId> {
        self.ids.iter()
    }
}

impl FromIterator<ChannelId> for NoAccessSet {
    fn from_iter<I: IntoIterator<Item = ChannelId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// File-backed store for a [`NoAccessSet`].
#[derive(Debug, Clone)]
pub struct NoAccessStore {
    path: PathBuf,
}

impl NoAccessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set. Returns an empty set on any error; losing the
    /// memo only costs a few extra forbidden requests.
    pub fn load(&self) -> NoAccessSet {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no-access file not readable, starting empty");
                return NoAccessSet::new();
            }
        };

        match serde_json::from_str::<Vec<ChannelId>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "no-access file is malformed, starting empty");
                NoAccessSet::new()
            }
        }
    }

    /// Overwrite the file with the full set, written to a sibling temp file
    /// first and renamed into place.
    pub fn save(&self, set: &NoAccessSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let ids: Vec<&ChannelId> = set.iter().collect();
        let json = serde_json::to_string_pretty(&ids)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = set.len(), "no-access list saved");
        Ok(())
    }
}
