//! # contract: the seams between the diff core and its collaborators
//!
//! The change-detection core never talks to the network or the filesystem
//! directly. It consumes three interfaces:
//!
//! - [`CatalogClient`]: fetch current contents of playlists, artist release
//!   listings and release track listings; mutate the target playlist.
//! - [`SnapshotStore`]: persist and resolve dated snapshots of a collection.
//! - [`GroupStore`]: read watch groups and edit their membership.
//!
//! Plus the plain data types flowing through them ([`ItemStub`],
//! [`ReleaseStub`], [`Snapshot`], [`WatchGroup`]).
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall`; with the `test-export-mocks`
//!   feature the generated `Mock*` types are public so integration tests can
//!   script catalog responses and assert call order.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;
use crate::reference::{CollectionReference, ReferenceKind};

/// An artist credit on a track or release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Canonical artist reference string, e.g. `spotify:artist:<id>`.
    pub id: String,
    pub name: String,
}

/// The minimal view of a playable item (or release) that snapshots keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStub {
    /// Canonical reference string (`spotify:track:<id>`, `spotify:album:<id>`, ...).
    /// Identity is exact equality on this field.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

impl ItemStub {
    /// Whether `artist` appears among the item's credits.
    pub fn credits(&self, artist: &CollectionReference) -> bool {
        let wanted = artist.to_string();
        self.contributors.iter().any(|c| c.id == wanted)
    }

    /// Comma separated contributor names, for display.
    pub fn contributor_names(&self) -> String {
        self.contributors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Release type as reported by the catalog (`album_type` / `album_group`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    Album,
    Single,
    Compilation,
    AppearsOn,
}

impl ReleaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseKind::Album => "album",
            ReleaseKind::Single => "single",
            ReleaseKind::Compilation => "compilation",
            ReleaseKind::AppearsOn => "appears_on",
        }
    }
}

/// One entry of an artist's discography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStub {
    /// Canonical album reference string.
    pub id: String,
    pub name: String,
    pub artists: Vec<Contributor>,
    /// How the release relates to the artist (own album, single, appears on).
    pub group: Option<ReleaseKind>,
    pub kind: ReleaseKind,
}

impl From<ReleaseStub> for ItemStub {
    fn from(r: ReleaseStub) -> Self {
        ItemStub {
            id: r.id,
            name: r.name,
            contributors: r.artists,
        }
    }
}

/// A dated record of a collection's observed contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub reference: CollectionReference,
    pub captured_at: NaiveDate,
    pub items: Vec<ItemStub>,
}

/// Newly appeared items, deduplicated, in first-seen order.
pub type DiffResult = Vec<ItemStub>;

/// A `name=reference` entry of a watch group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedReference {
    pub name: String,
    pub reference: CollectionReference,
}

/// Which membership list of a group an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Playlist,
    Artist,
}

impl EntryKind {
    pub fn reference_kind(&self) -> ReferenceKind {
        match self {
            EntryKind::Playlist => ReferenceKind::Playlist,
            EntryKind::Artist => ReferenceKind::Artist,
        }
    }
}

/// A bundle of watched collections feeding one target playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchGroup {
    /// Position in the backing store at load time. Not a stable identity.
    pub group_id: usize,
    pub name: String,
    pub target: CollectionReference,
    pub playlists: Vec<NamedReference>,
    pub artists: Vec<NamedReference>,
}

impl WatchGroup {
    pub fn entries(&self, kind: EntryKind) -> &[NamedReference] {
        match kind {
            EntryKind::Playlist => &self.playlists,
            EntryKind::Artist => &self.artists,
        }
    }
}

/// Remote music catalog. Implementations handle auth, pagination, timeouts and retries.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Full, flattened item list of a playlist in playlist order.
    /// Deleted or unavailable entries come back as `None`.
    async fn fetch_collection_items(
        &self,
        playlist: &CollectionReference,
    ) -> Result<Vec<Option<ItemStub>>>;

    /// The artist's releases, optionally restricted to one release kind.
    async fn fetch_artist_releases(
        &self,
        artist: &CollectionReference,
        kind: Option<ReleaseKind>,
    ) -> Result<Vec<ReleaseStub>>;

    /// Track listing of a release.
    async fn fetch_release_tracks(&self, release: &CollectionReference) -> Result<Vec<ItemStub>>;

    /// Appends items to a playlist. Callers never pass more than the API limit or an empty list.
    async fn add_items(&self, playlist: &CollectionReference, ids: &[String]) -> Result<()>;

    /// Removes every item from a playlist.
    async fn remove_all_items(&self, playlist: &CollectionReference) -> Result<()>;

    /// Creates a playlist owned by the current user.
    async fn create_playlist(&self, name: &str, public: bool) -> Result<CollectionReference>;
}

/// Dated snapshot persistence, at most one snapshot per collection per day.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait SnapshotStore: Send + Sync {
    /// Persists `items` as today's snapshot, replacing an existing one from today.
    fn save_snapshot(&self, reference: &CollectionReference, items: &[ItemStub])
        -> Result<NaiveDate>;

    /// Most recent snapshot that leaves at least a day between it and now.
    fn latest_snapshot(&self, reference: &CollectionReference) -> Result<Option<Snapshot>>;

    /// Most recent snapshot captured on or before `date`.
    fn latest_snapshot_on_or_before(
        &self,
        reference: &CollectionReference,
        date: NaiveDate,
    ) -> Result<Option<Snapshot>>;

    /// Capture dates for a collection, oldest first.
    fn list_snapshot_dates(&self, reference: &CollectionReference) -> Result<Vec<NaiveDate>>;
}

/// Watch group persistence.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait GroupStore: Send + Sync {
    /// All groups, numbered by position.
    fn load_all(&self) -> Result<Vec<WatchGroup>>;

    /// Adds an entry to a group's playlist or artist list. Existing references are left alone.
    fn add_entry(&self, group: &str, kind: EntryKind, entry: &NamedReference) -> Result<()>;

    /// Removes the entry with `reference`. Returns whether anything was removed.
    fn remove_entry(
        &self,
        group: &str,
        kind: EntryKind,
        reference: &CollectionReference,
    ) -> Result<bool>;

    /// Appends a new, empty group.
    fn create_group(&self, name: &str, target: &CollectionReference) -> Result<()>;
}
