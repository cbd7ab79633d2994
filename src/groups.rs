//! YAML-backed [`GroupStore`].
//!
//! The file is meant to be edited by hand as well as through the CLI:
//!
//! ```yaml
//! groups:
//!   - name: Release radar
//!     target: spotify:playlist:7I0dtpfqqtcPYNsaJn32dF
//!     playlists:
//!       - name: Modus Mio
//!         reference: spotify:playlist:37i9dQZF1DX36edUJpD76c
//!     artists:
//!       - name: Some Artist
//!         reference: spotify:artist:0OdUWJ0sBjDrqHygGUXeCF
//! ```
//!
//! References are kept as strings in the file model and validated against the
//! list they sit in when loaded, so a misplaced artist in `playlists` is an
//! `InvalidReferenceKind` rather than a generic parse failure.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::contract::{EntryKind, GroupStore, NamedReference, WatchGroup};
use crate::error::{Result, WatchError};
use crate::reference::{parse_reference, CollectionReference, ReferenceKind};

#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: Vec<GroupRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupRecord {
    name: String,
    target: String,
    #[serde(default)]
    playlists: Vec<EntryRecord>,
    #[serde(default)]
    artists: Vec<EntryRecord>,
}

impl GroupRecord {
    fn entries_mut(&mut self, kind: EntryKind) -> &mut Vec<EntryRecord> {
        match kind {
            EntryKind::Playlist => &mut self.playlists,
            EntryKind::Artist => &mut self.artists,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryRecord {
    name: String,
    reference: String,
}

#[derive(Debug, Clone)]
pub struct YamlGroupStore {
    path: PathBuf,
}

impl YamlGroupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<GroupsFile> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Group file missing, starting empty");
            return Ok(GroupsFile::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(GroupsFile::default());
        }
        serde_yaml::from_str(&raw).map_err(|e| {
            WatchError::GroupStore(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_file(&self, file: &GroupsFile) -> Result<()> {
        let yaml = serde_yaml::to_string(file)
            .map_err(|e| WatchError::GroupStore(format!("failed to serialise groups: {e}")))?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| WatchError::Io(e.error))?;
        debug!(path = %self.path.display(), groups = file.groups.len(), "Group file written");
        Ok(())
    }

    fn modify<F, T>(&self, group: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut GroupRecord) -> Result<T>,
    {
        let mut file = self.read_file()?;
        let record = file
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| WatchError::GroupNotFound(group.to_string()))?;
        let out = f(record)?;
        self.write_file(&file)?;
        Ok(out)
    }
}

fn to_entries(records: &[EntryRecord], kind: ReferenceKind) -> Result<Vec<NamedReference>> {
    records
        .iter()
        .map(|r| {
            Ok(NamedReference {
                name: r.name.clone(),
                reference: parse_reference(r.reference.trim(), kind)?,
            })
        })
        .collect()
}

impl GroupStore for YamlGroupStore {
    fn load_all(&self) -> Result<Vec<WatchGroup>> {
        let file = self.read_file()?;
        let groups = file
            .groups
            .iter()
            .enumerate()
            .map(|(group_id, g)| {
                Ok(WatchGroup {
                    group_id,
                    name: g.name.clone(),
                    target: parse_reference(g.target.trim(), ReferenceKind::Playlist)?,
                    playlists: to_entries(&g.playlists, ReferenceKind::Playlist)?,
                    artists: to_entries(&g.artists, ReferenceKind::Artist)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(path = %self.path.display(), groups = groups.len(), "Loaded watch groups");
        Ok(groups)
    }

    fn add_entry(&self, group: &str, kind: EntryKind, entry: &NamedReference) -> Result<()> {
        if entry.reference.kind() != kind.reference_kind() {
            return Err(WatchError::InvalidReferenceKind {
                expected: kind.reference_kind(),
                reference: entry.reference.to_string(),
            });
        }
        let wanted = entry.reference.to_string();
        self.modify(group, |record| {
            let list = record.entries_mut(kind);
            if list.iter().any(|e| e.reference.trim() == wanted) {
                debug!(group, reference = %wanted, "Entry already present");
                return Ok(());
            }
            list.push(EntryRecord {
                name: entry.name.clone(),
                reference: wanted.clone(),
            });
            info!(group, ?kind, reference = %wanted, "Added entry to group");
            Ok(())
        })
    }

    fn remove_entry(
        &self,
        group: &str,
        kind: EntryKind,
        reference: &CollectionReference,
    ) -> Result<bool> {
        let wanted = reference.to_string();
        self.modify(group, |record| {
            let list = record.entries_mut(kind);
            let before = list.len();
            list.retain(|e| e.reference.trim() != wanted);
            let removed = list.len() != before;
            info!(group, ?kind, reference = %wanted, removed, "Removed entry from group");
            Ok(removed)
        })
    }

    fn create_group(&self, name: &str, target: &CollectionReference) -> Result<()> {
        if target.kind() != ReferenceKind::Playlist {
            return Err(WatchError::InvalidReferenceKind {
                expected: ReferenceKind::Playlist,
                reference: target.to_string(),
            });
        }
        let mut file = self.read_file()?;
        if file.groups.iter().any(|g| g.name == name) {
            return Err(WatchError::GroupExists(name.to_string()));
        }
        file.groups.push(GroupRecord {
            name: name.to_string(),
            target: target.to_string(),
            playlists: Vec::new(),
            artists: Vec::new(),
        });
        self.write_file(&file)?;
        info!(group = name, target = %target, "Created group");
        Ok(())
    }
}
