//! File-backed [`SnapshotStore`].
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   spotify_playlist_<id>/
//!     spotify_playlist_<id>_content(2026.10.01).json
//!     spotify_playlist_<id>_content(2026.10.08).json
//!   spotify_artist_<id>/
//!     ...
//! ```
//!
//! Dates are zero-padded `YYYY.MM.DD`, so sorting file names sorts snapshots
//! chronologically; "latest on or before" is a binary search over that order.
//! Because the key is the calendar day, a second save on the same day replaces
//! the first instead of adding another entry.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::contract::{ItemStub, Snapshot, SnapshotStore};
use crate::error::{Result, WatchError};
use crate::reference::CollectionReference;

const DATE_FORMAT: &str = "%Y.%m.%d";

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct FsSnapshotStore {
    root: PathBuf,
    today: Clock,
}

struct SnapshotEntry {
    file_name: String,
    date: NaiveDate,
    path: PathBuf,
}

impl FsSnapshotStore {
    /// Store rooted at `root`, dating snapshots with the local calendar day.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, || Local::now().date_naive())
    }

    /// Store with an explicit notion of "today".
    pub fn with_clock<F>(root: impl Into<PathBuf>, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        Self {
            root: root.into(),
            today: Box::new(today),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists `items` under an explicit capture date.
    pub fn save_snapshot_on(
        &self,
        reference: &CollectionReference,
        items: &[ItemStub],
        captured_at: NaiveDate,
    ) -> Result<PathBuf> {
        let dir = self.collection_dir(reference);
        fs::create_dir_all(&dir)?;

        let snapshot = Snapshot {
            reference: reference.clone(),
            captured_at,
            items: items.to_vec(),
        };
        let path = dir.join(file_name(reference, captured_at));

        // Write next to the destination, then rename over it.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, &snapshot).map_err(std::io::Error::from)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| WatchError::Io(e.error))?;

        info!(
            reference = %reference,
            captured_at = %captured_at,
            items = items.len(),
            path = %path.display(),
            "[SNAPSHOT] Saved snapshot"
        );
        Ok(path)
    }

    fn collection_dir(&self, reference: &CollectionReference) -> PathBuf {
        self.root.join(reference.file_stem())
    }

    /// Snapshot files of a collection, sorted by file name (and so by date).
    fn entries(&self, reference: &CollectionReference) -> Result<Vec<SnapshotEntry>> {
        let dir = self.collection_dir(reference);
        if !dir.is_dir() {
            debug!(reference = %reference, dir = %dir.display(), "[SNAPSHOT] No snapshot directory");
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&dir)? {
            let dir_entry = dir_entry?;
            let Ok(file_name) = dir_entry.file_name().into_string() else {
                continue;
            };
            match parse_file_date(reference, &file_name) {
                Some(date) => entries.push(SnapshotEntry {
                    path: dir_entry.path(),
                    file_name,
                    date,
                }),
                None => {
                    debug!(file = %file_name, "[SNAPSHOT] Ignoring file outside naming scheme");
                }
            }
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    fn read(&self, reference: &CollectionReference, entry: &SnapshotEntry) -> Result<Snapshot> {
        let format_err = |message: String| WatchError::SnapshotFormat {
            path: entry.path.clone(),
            message,
        };

        let raw = fs::read_to_string(&entry.path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&raw).map_err(|e| format_err(e.to_string()))?;

        if &snapshot.reference != reference {
            return Err(format_err(format!(
                "belongs to {}, expected {}",
                snapshot.reference, reference
            )));
        }
        if snapshot.captured_at != entry.date {
            return Err(format_err(format!(
                "captured_at {} does not match file date {}",
                snapshot.captured_at, entry.date
            )));
        }
        debug!(
            reference = %reference,
            captured_at = %snapshot.captured_at,
            items = snapshot.items.len(),
            "[SNAPSHOT] Loaded snapshot"
        );
        Ok(snapshot)
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn save_snapshot(
        &self,
        reference: &CollectionReference,
        items: &[ItemStub],
    ) -> Result<NaiveDate> {
        let today = (self.today)();
        self.save_snapshot_on(reference, items, today)?;
        Ok(today)
    }

    fn latest_snapshot(&self, reference: &CollectionReference) -> Result<Option<Snapshot>> {
        let entries = self.entries(reference)?;
        let today = (self.today)();

        let chosen = match entries.as_slice() {
            [] => None,
            [.., last] if last.date != today => Some(last),
            [.., previous, _today] => Some(previous),
            [_only_today] => {
                warn!(
                    reference = %reference,
                    "[SNAPSHOT] Only snapshot is from today, treating as no baseline"
                );
                None
            }
        };

        chosen.map(|entry| self.read(reference, entry)).transpose()
    }

    fn latest_snapshot_on_or_before(
        &self,
        reference: &CollectionReference,
        date: NaiveDate,
    ) -> Result<Option<Snapshot>> {
        let entries = self.entries(reference)?;
        let key = file_name(reference, date);
        let idx = entries.partition_point(|e| e.file_name.as_str() <= key.as_str());
        if idx == 0 {
            return Ok(None);
        }
        self.read(reference, &entries[idx - 1]).map(Some)
    }

    fn list_snapshot_dates(&self, reference: &CollectionReference) -> Result<Vec<NaiveDate>> {
        Ok(self.entries(reference)?.into_iter().map(|e| e.date).collect())
    }
}

fn file_name(reference: &CollectionReference, date: NaiveDate) -> String {
    format!(
        "{}_content({}).json",
        reference.file_stem(),
        date.format(DATE_FORMAT)
    )
}

fn parse_file_date(reference: &CollectionReference, file_name: &str) -> Option<NaiveDate> {
    let prefix = format!("{}_content(", reference.file_stem());
    let inner = file_name.strip_prefix(&prefix)?.strip_suffix(").json")?;
    // Only the zero-padded form keeps lexicographic order chronological.
    if inner.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(inner, DATE_FORMAT).ok()
}
