//! Change detection between a stored snapshot and a collection's current contents.
//!
//! Two collection shapes are handled:
//!
//! - **Playlists**: new items are the identifier difference between the
//!   current playlist contents and the baseline snapshot.
//! - **Artists**: the snapshot holds the artist's release listing. New
//!   releases are found the same way, then expanded into the tracks on those
//!   releases that credit the artist.
//!
//! # Baseline resolution
//! Without a `since` date the baseline is [`SnapshotStore::latest_snapshot`],
//! which skips a snapshot taken today so that a second run on the same day
//! still compares against yesterday's state. With a date it is the latest
//! snapshot on or before that date.
//!
//! # Bootstrap
//! When no baseline exists the current contents are snapshotted and the diff
//! is empty. A first observation never reports the whole collection as new.
//!
//! # Identity
//! Items are compared by their canonical identifier only; names are display
//! data. Results are deduplicated keeping the first occurrence.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::contract::{CatalogClient, DiffResult, ItemStub, Snapshot, SnapshotStore};
use crate::error::{Result, WatchError};
use crate::reference::{CollectionReference, ReferenceKind};

/// Everything learned while diffing one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub reference: CollectionReference,
    /// Items (or releases, for artists) not present in the baseline.
    pub new_items: DiffResult,
    /// Contents fetched during this observation, placeholders removed.
    pub current: Vec<ItemStub>,
    /// Capture date of the baseline, `None` on bootstrap.
    pub baseline: Option<NaiveDate>,
    /// Whether this observation wrote the first snapshot of the collection.
    pub bootstrapped: bool,
}

/// Items added and removed relative to a baseline snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChanges {
    pub baseline: NaiveDate,
    pub added: DiffResult,
    pub removed: DiffResult,
}

/// An identifier that occurs more than once in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub id: String,
    pub name: String,
    /// Zero-based positions, ascending.
    pub positions: Vec<usize>,
}

/// Fetches the diffable contents of a playlist (its items) or artist (its releases).
pub async fn fetch_current<C>(catalog: &C, reference: &CollectionReference) -> Result<Vec<ItemStub>>
where
    C: CatalogClient + ?Sized,
{
    match reference.kind() {
        ReferenceKind::Playlist => {
            let raw = catalog.fetch_collection_items(reference).await?;
            let total = raw.len();
            let items: Vec<ItemStub> = raw.into_iter().flatten().collect();
            if items.len() != total {
                debug!(
                    reference = %reference,
                    dropped = total - items.len(),
                    "[DIFF] Dropped unavailable playlist entries"
                );
            }
            Ok(items)
        }
        ReferenceKind::Artist => Ok(catalog
            .fetch_artist_releases(reference, None)
            .await?
            .into_iter()
            .map(ItemStub::from)
            .collect()),
        _ => Err(WatchError::InvalidReferenceKind {
            expected: ReferenceKind::Playlist,
            reference: reference.to_string(),
        }),
    }
}

fn resolve_baseline<S>(
    store: &S,
    reference: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<Option<Snapshot>>
where
    S: SnapshotStore + ?Sized,
{
    match since {
        None => store.latest_snapshot(reference),
        Some(date) => store.latest_snapshot_on_or_before(reference, date),
    }
}

/// Diffs a playlist or an artist's release listing against its baseline snapshot.
///
/// Bootstraps (snapshot + empty diff) when no baseline resolves. A corrupt
/// baseline is an error, not a bootstrap.
pub async fn observe<C, S>(
    catalog: &C,
    store: &S,
    reference: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<Observation>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let baseline = resolve_baseline(store, reference, since)?;
    let current = fetch_current(catalog, reference).await?;

    let Some(baseline) = baseline else {
        store.save_snapshot(reference, &current)?;
        info!(
            reference = %reference,
            items = current.len(),
            "[DIFF] No baseline snapshot, recorded first observation"
        );
        return Ok(Observation {
            reference: reference.clone(),
            new_items: Vec::new(),
            current,
            baseline: None,
            bootstrapped: true,
        });
    };

    let new_items = new_since(&current, &baseline.items);
    info!(
        reference = %reference,
        baseline = %baseline.captured_at,
        current = current.len(),
        new = new_items.len(),
        "[DIFF] Compared against baseline"
    );
    Ok(Observation {
        reference: reference.clone(),
        new_items,
        current,
        baseline: Some(baseline.captured_at),
        bootstrapped: false,
    })
}

fn require_kind(reference: &CollectionReference, expected: ReferenceKind) -> Result<()> {
    if reference.kind() == expected {
        Ok(())
    } else {
        Err(WatchError::InvalidReferenceKind {
            expected,
            reference: reference.to_string(),
        })
    }
}

/// New items in a playlist since its baseline snapshot.
pub async fn new_items_in_collection<C, S>(
    catalog: &C,
    store: &S,
    playlist: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<DiffResult>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    require_kind(playlist, ReferenceKind::Playlist)?;
    Ok(observe(catalog, store, playlist, since).await?.new_items)
}

/// New releases by an artist since the baseline snapshot of their discography.
pub async fn new_releases_by_artist<C, S>(
    catalog: &C,
    store: &S,
    artist: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<DiffResult>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    require_kind(artist, ReferenceKind::Artist)?;
    Ok(observe(catalog, store, artist, since).await?.new_items)
}

/// Tracks on `release` that credit `artist`, in track listing order.
pub async fn tracks_by_artist_in_release<C>(
    catalog: &C,
    release: &CollectionReference,
    artist: &CollectionReference,
) -> Result<Vec<ItemStub>>
where
    C: CatalogClient + ?Sized,
{
    require_kind(release, ReferenceKind::Album)?;
    require_kind(artist, ReferenceKind::Artist)?;
    let tracks = catalog.fetch_release_tracks(release).await?;
    Ok(tracks.into_iter().filter(|t| t.credits(artist)).collect())
}

/// Expands releases into the artist's tracks on them, deduplicated.
pub async fn expand_releases<C>(
    catalog: &C,
    releases: &[ItemStub],
    artist: &CollectionReference,
) -> Result<DiffResult>
where
    C: CatalogClient + ?Sized,
{
    let mut tracks = Vec::new();
    for release in releases {
        let release_ref: CollectionReference = release.id.parse()?;
        let found = tracks_by_artist_in_release(catalog, &release_ref, artist).await?;
        debug!(
            release = %release_ref,
            artist = %artist,
            tracks = found.len(),
            "[DIFF] Expanded release"
        );
        tracks.extend(found);
    }
    Ok(dedup_by_id(tracks))
}

/// The artist's tracks on releases that appeared since the baseline.
pub async fn new_tracks_by_artist<C, S>(
    catalog: &C,
    store: &S,
    artist: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<DiffResult>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let releases = new_releases_by_artist(catalog, store, artist, since).await?;
    expand_releases(catalog, &releases, artist).await
}

/// Added and removed items relative to the baseline, or `None` without one.
///
/// Read-only: unlike [`observe`] it never writes a bootstrap snapshot.
pub async fn collection_changes<C, S>(
    catalog: &C,
    store: &S,
    reference: &CollectionReference,
    since: Option<NaiveDate>,
) -> Result<Option<CollectionChanges>>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let Some(baseline) = resolve_baseline(store, reference, since)? else {
        info!(reference = %reference, "[DIFF] No baseline snapshot to compare against");
        return Ok(None);
    };
    let current = fetch_current(catalog, reference).await?;
    Ok(Some(CollectionChanges {
        baseline: baseline.captured_at,
        added: new_since(&current, &baseline.items),
        removed: new_since(&baseline.items, &current),
    }))
}

/// Items of `current` whose identifier does not occur in `baseline`, deduplicated.
pub fn new_since(current: &[ItemStub], baseline: &[ItemStub]) -> DiffResult {
    let known: HashSet<&str> = baseline.iter().map(|i| i.id.as_str()).collect();
    dedup_by_id(
        current
            .iter()
            .filter(|i| !known.contains(i.id.as_str()))
            .cloned(),
    )
}

/// Drops repeated identifiers, keeping the first occurrence.
pub fn dedup_by_id<I>(items: I) -> Vec<ItemStub>
where
    I: IntoIterator<Item = ItemStub>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|i| seen.insert(i.id.clone()))
        .collect()
}

/// Identifiers occurring more than once, ordered by first occurrence.
pub fn find_duplicates(items: &[ItemStub]) -> Vec<Duplicate> {
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order = Vec::new();
    for (pos, item) in items.iter().enumerate() {
        let slot = positions.entry(item.id.as_str()).or_default();
        if slot.is_empty() {
            order.push(pos);
        }
        slot.push(pos);
    }

    order
        .into_iter()
        .filter_map(|first| {
            let item = &items[first];
            let found = &positions[item.id.as_str()];
            (found.len() > 1).then(|| Duplicate {
                id: item.id.clone(),
                name: item.name.clone(),
                positions: found.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> ItemStub {
        ItemStub {
            id: format!("spotify:track:{id}"),
            name: format!("name {id}"),
            contributors: vec![],
        }
    }

    #[test]
    fn new_since_is_identifier_difference() {
        let baseline = vec![item("A"), item("B")];
        let current = vec![item("B"), item("X"), item("A")];
        assert_eq!(new_since(&current, &baseline), vec![item("X")]);
    }

    #[test]
    fn names_do_not_affect_identity() {
        let baseline = vec![item("A")];
        let mut renamed = item("A");
        renamed.name = "Renamed".into();
        let mut same_name = item("Z");
        same_name.name = "name A".into();
        assert_eq!(new_since(&[renamed, same_name.clone()], &baseline), vec![same_name]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut second = item("X");
        second.name = "second".into();
        let out = dedup_by_id(vec![item("X"), item("Y"), second]);
        assert_eq!(out, vec![item("X"), item("Y")]);
    }

    #[test]
    fn duplicates_report_all_positions() {
        let items = vec![item("A"), item("B"), item("A"), item("C"), item("B"), item("A")];
        let dups = find_duplicates(&items);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].id, "spotify:track:A");
        assert_eq!(dups[0].positions, vec![0, 2, 5]);
        assert_eq!(dups[1].id, "spotify:track:B");
        assert_eq!(dups[1].positions, vec![1, 4]);
        assert!(find_duplicates(&[item("A"), item("B")]).is_empty());
    }
}
