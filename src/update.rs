//! High-level pipeline: diff every watched collection of a group → snapshot → write the target.
//!
//! This module drives one "update run" for a [`WatchGroup`]:
//!   - Diffs each watched playlist, then each watched artist (new releases expanded
//!     into the artist's tracks), against the chosen baseline
//!   - Optionally snapshots each collection's current contents, once per collection per run
//!   - Optionally empties the target playlist, strictly before anything is added
//!   - Optionally appends the union of new items to the target in API-sized batches
//!   - Returns a report with every collection's result, whether or not anything was mutated
//!
//! # Error Handling
//! A failing collection (remote fetch, corrupt snapshot, bad reference) is logged and
//! recorded in its [`CollectionReport`]; the remaining collections still run and its
//! items simply do not contribute. Failures while clearing or filling the target
//! abort the run, since the target would otherwise be left half-written silently.
//!
//! # Navigation
//! - Main entrypoint: [`run_update`]
//! - Supporting: [`add_in_batches`], [`snapshot_group`]

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::contract::{
    CatalogClient, DiffResult, EntryKind, NamedReference, SnapshotStore, WatchGroup,
};
use crate::diff::{dedup_by_id, expand_releases, fetch_current, observe};
use crate::error::{Result, WatchError};
use crate::reference::CollectionReference;

/// Maximum number of items the catalog accepts per add request.
pub const MAX_ADD_BATCH: usize = 100;

/// What an update run is allowed to do besides diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Persist each collection's current contents after diffing it.
    pub snapshot: bool,
    /// Remove everything from the target before adding.
    pub clear_target: bool,
    /// Add the new items to the target.
    pub append_new: bool,
    /// Items per add request, clamped to `1..=MAX_ADD_BATCH`.
    pub max_batch_size: usize,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            snapshot: false,
            clear_target: false,
            append_new: false,
            max_batch_size: MAX_ADD_BATCH,
        }
    }
}

/// Successful result for one watched collection.
#[derive(Debug)]
pub struct CollectionUpdate {
    /// New playable items: playlist additions, or the artist's tracks on new releases.
    pub new_items: DiffResult,
    pub baseline: Option<NaiveDate>,
    pub bootstrapped: bool,
    /// Whether a snapshot of the collection was written during this run.
    pub snapshotted: bool,
}

#[derive(Debug)]
pub struct CollectionReport {
    pub name: String,
    pub reference: CollectionReference,
    pub kind: EntryKind,
    pub outcome: Result<CollectionUpdate>,
}

#[derive(Debug)]
pub struct UpdateReport {
    pub group: String,
    pub target: CollectionReference,
    pub collections: Vec<CollectionReport>,
    pub cleared: bool,
    /// Item ids sent to the target, in the order they were added.
    pub added: Vec<String>,
    /// Number of add requests issued.
    pub add_requests: usize,
}

impl UpdateReport {
    /// New items per successfully processed collection.
    pub fn diffs(&self) -> HashMap<&CollectionReference, &DiffResult> {
        self.collections
            .iter()
            .filter_map(|c| match &c.outcome {
                Ok(update) => Some((&c.reference, &update.new_items)),
                Err(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&CollectionReference, &WatchError)> {
        self.collections.iter().filter_map(|c| match &c.outcome {
            Ok(_) => None,
            Err(e) => Some((&c.reference, e)),
        })
    }
}

/// Runs one update for `group`. See the module docs for the sequence.
pub async fn run_update<C, S>(
    catalog: &C,
    store: &S,
    group: &WatchGroup,
    since: Option<NaiveDate>,
    opts: UpdateOptions,
) -> Result<UpdateReport>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    info!(
        group = %group.name,
        target = %group.target,
        playlists = group.playlists.len(),
        artists = group.artists.len(),
        since = ?since,
        ?opts,
        "[UPDATE] Starting update run"
    );

    let mut collections = Vec::new();
    let watched = group
        .playlists
        .iter()
        .map(|e| (EntryKind::Playlist, e))
        .chain(group.artists.iter().map(|e| (EntryKind::Artist, e)));

    for (kind, entry) in watched {
        let outcome = update_collection(catalog, store, kind, entry, since, opts).await;
        match &outcome {
            Ok(update) => info!(
                name = %entry.name,
                reference = %entry.reference,
                new = update.new_items.len(),
                bootstrapped = update.bootstrapped,
                "[UPDATE] Collection processed"
            ),
            Err(e) => error!(
                name = %entry.name,
                reference = %entry.reference,
                error = %e,
                "[UPDATE][ERROR] Collection skipped"
            ),
        }
        collections.push(CollectionReport {
            name: entry.name.clone(),
            reference: entry.reference.clone(),
            kind,
            outcome,
        });
    }

    let mut cleared = false;
    if opts.clear_target {
        catalog.remove_all_items(&group.target).await.map_err(|e| {
            error!(target = %group.target, error = %e, "[UPDATE][ERROR] Failed to clear target");
            e
        })?;
        cleared = true;
        info!(target = %group.target, "[UPDATE] Cleared target playlist");
    }

    let mut added = Vec::new();
    let mut add_requests = 0;
    if opts.append_new {
        let union = dedup_by_id(
            collections
                .iter()
                .filter_map(|c| c.outcome.as_ref().ok())
                .flat_map(|u| u.new_items.iter().cloned()),
        );
        added = union.into_iter().map(|i| i.id).collect();
        add_requests = add_in_batches(catalog, &group.target, &added, opts.max_batch_size).await?;
        info!(
            target = %group.target,
            items = added.len(),
            requests = add_requests,
            "[UPDATE] Appended new items to target"
        );
    }

    let failed = collections.iter().filter(|c| c.outcome.is_err()).count();
    if failed > 0 {
        warn!(group = %group.name, failed, "[UPDATE] Finished with failed collections");
    } else {
        info!(group = %group.name, "[UPDATE] Finished");
    }

    Ok(UpdateReport {
        group: group.name.clone(),
        target: group.target.clone(),
        collections,
        cleared,
        added,
        add_requests,
    })
}

async fn update_collection<C, S>(
    catalog: &C,
    store: &S,
    kind: EntryKind,
    entry: &NamedReference,
    since: Option<NaiveDate>,
    opts: UpdateOptions,
) -> Result<CollectionUpdate>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let reference = &entry.reference;
    if reference.kind() != kind.reference_kind() {
        return Err(WatchError::InvalidReferenceKind {
            expected: kind.reference_kind(),
            reference: reference.to_string(),
        });
    }

    let observation = observe(catalog, store, reference, since).await?;
    let new_items = match kind {
        EntryKind::Playlist => observation.new_items,
        EntryKind::Artist => expand_releases(catalog, &observation.new_items, reference).await?,
    };

    // The bootstrap already wrote today's snapshot; a second write would be redundant.
    let snapshotted = if opts.snapshot && !observation.bootstrapped {
        store.save_snapshot(reference, &observation.current)?;
        true
    } else {
        observation.bootstrapped
    };

    Ok(CollectionUpdate {
        new_items,
        baseline: observation.baseline,
        bootstrapped: observation.bootstrapped,
        snapshotted,
    })
}

/// Adds `ids` to `target` in order, at most `batch_size` per request.
///
/// An empty list issues no request. Returns the number of requests made.
pub async fn add_in_batches<C>(
    catalog: &C,
    target: &CollectionReference,
    ids: &[String],
    batch_size: usize,
) -> Result<usize>
where
    C: CatalogClient + ?Sized,
{
    if ids.is_empty() {
        debug!(target = %target, "[UPDATE] Nothing to add");
        return Ok(0);
    }

    let size = batch_size.clamp(1, MAX_ADD_BATCH);
    let mut requests = 0;
    for (index, chunk) in ids.chunks(size).enumerate() {
        catalog.add_items(target, chunk).await.map_err(|e| {
            error!(
                target = %target,
                batch = index,
                size = chunk.len(),
                error = %e,
                "[UPDATE][ERROR] Add request failed"
            );
            e
        })?;
        debug!(target = %target, batch = index, size = chunk.len(), "[UPDATE] Added batch");
        requests += 1;
    }
    Ok(requests)
}

/// Snapshots every watched collection of `group` without diffing.
pub async fn snapshot_group<C, S>(
    catalog: &C,
    store: &S,
    group: &WatchGroup,
) -> Vec<(CollectionReference, Result<NaiveDate>)>
where
    C: CatalogClient + ?Sized,
    S: SnapshotStore + ?Sized,
{
    let mut results = Vec::new();
    for entry in group.playlists.iter().chain(group.artists.iter()) {
        let reference = &entry.reference;
        let outcome = match fetch_current(catalog, reference).await {
            Ok(current) => store.save_snapshot(reference, &current),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            error!(reference = %reference, error = %e, "[SNAPSHOT][ERROR] Snapshot failed");
        }
        results.push((reference.clone(), outcome));
    }
    results
}
