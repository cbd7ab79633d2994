mod common;

use std::fs;

use common::{album, artist, date, ids, playlist, release, today, track, track_by, tracks};
use playlist_watch::contract::{ItemStub, MockCatalogClient, SnapshotStore};
use playlist_watch::diff::{
    collection_changes, new_items_in_collection, new_releases_by_artist, new_tracks_by_artist,
    observe, tracks_by_artist_in_release,
};
use playlist_watch::error::WatchError;
use playlist_watch::snapshot::FsSnapshotStore;
use tempfile::tempdir;

fn catalog_with_playlist(ids: &'static [&'static str]) -> MockCatalogClient {
    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_collection_items()
        .returning(move |_| Ok(tracks(ids).into_iter().map(Some).collect()));
    catalog
}

#[tokio::test]
async fn first_observation_writes_one_snapshot_and_reports_nothing() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let catalog = catalog_with_playlist(&["A", "B"]);
    let p = playlist("P");

    let diff = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();

    assert!(diff.is_empty());
    assert_eq!(store.list_snapshot_dates(&p).unwrap(), vec![today()]);
    let written = store.latest_snapshot_on_or_before(&p, today()).unwrap().unwrap();
    assert_eq!(written.items, tracks(&["A", "B"]));
}

#[tokio::test]
async fn bootstrap_also_applies_when_since_date_predates_all_snapshots() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 10, 1)).unwrap();
    let catalog = catalog_with_playlist(&["A", "B"]);

    let obs = observe(&catalog, &store, &p, Some(date(2026, 9, 1))).await.unwrap();

    assert!(obs.bootstrapped);
    assert!(obs.new_items.is_empty());
    assert_eq!(
        store.list_snapshot_dates(&p).unwrap(),
        vec![date(2026, 10, 1), today()]
    );
}

#[tokio::test]
async fn one_added_identifier_is_reported() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A", "B", "C"]), date(2026, 10, 9)).unwrap();
    let catalog = catalog_with_playlist(&["A", "X", "B", "C"]);

    let diff = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();

    assert_eq!(diff, vec![track("X")]);
}

#[tokio::test]
async fn repeated_diffs_without_writes_are_identical() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 10, 9)).unwrap();
    let catalog = catalog_with_playlist(&["A", "B", "C"]);

    let first = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();
    let second = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ids(&first), vec!["spotify:track:B", "spotify:track:C"]);
    assert_eq!(store.list_snapshot_dates(&p).unwrap(), vec![date(2026, 10, 9)]);
}

#[tokio::test]
async fn repeated_identifier_is_reported_once_at_first_position() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 10, 9)).unwrap();
    let catalog = catalog_with_playlist(&["Y", "X", "A", "X", "Z", "Y"]);

    let diff = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();

    assert_eq!(
        ids(&diff),
        vec!["spotify:track:Y", "spotify:track:X", "spotify:track:Z"]
    );
}

#[tokio::test]
async fn unavailable_entries_are_dropped() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 10, 9)).unwrap();
    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_collection_items()
        .returning(|_| Ok(vec![None, Some(track("A")), None, Some(track("B"))]));

    let obs = observe(&catalog, &store, &p, None).await.unwrap();

    assert_eq!(obs.new_items, vec![track("B")]);
    assert_eq!(obs.current, tracks(&["A", "B"]));
    assert_eq!(obs.baseline, Some(date(2026, 10, 9)));
}

#[tokio::test]
async fn since_date_selects_older_baseline() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 9, 1)).unwrap();
    store.save_snapshot_on(&p, &tracks(&["A", "B"]), date(2026, 10, 1)).unwrap();
    let catalog = catalog_with_playlist(&["A", "B", "C"]);

    let since_sept = new_items_in_collection(&catalog, &store, &p, Some(date(2026, 9, 15)))
        .await
        .unwrap();
    let latest = new_items_in_collection(&catalog, &store, &p, None).await.unwrap();

    assert_eq!(since_sept, tracks(&["B", "C"]));
    assert_eq!(latest, tracks(&["C"]));
}

#[tokio::test]
async fn corrupt_baseline_fails_without_bootstrapping() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    let path = store.save_snapshot_on(&p, &tracks(&["A"]), date(2026, 10, 1)).unwrap();
    fs::write(&path, "[]").unwrap();
    let mut catalog = MockCatalogClient::new();
    catalog.expect_fetch_collection_items().never();

    let err = new_items_in_collection(&catalog, &store, &p, None).await.unwrap_err();

    assert!(matches!(err, WatchError::SnapshotFormat { .. }), "got {err:?}");
    assert_eq!(store.list_snapshot_dates(&p).unwrap(), vec![date(2026, 10, 1)]);
}

#[tokio::test]
async fn remote_failure_propagates_and_writes_nothing() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_collection_items()
        .returning(|_| Err(WatchError::RemoteFetch("503".into())));

    let err = new_items_in_collection(&catalog, &store, &p, None).await.unwrap_err();

    assert!(matches!(err, WatchError::RemoteFetch(_)));
    assert!(store.list_snapshot_dates(&p).unwrap().is_empty());
}

#[tokio::test]
async fn playlist_diff_rejects_artist_reference() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let catalog = MockCatalogClient::new();

    let err = new_items_in_collection(&catalog, &store, &artist("A"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, WatchError::InvalidReferenceKind { .. }));
}

#[tokio::test]
async fn new_releases_are_diffed_by_release_identifier() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let a = artist("Art");
    let old: Vec<ItemStub> = vec![release("R1", "Art").into()];
    store.save_snapshot_on(&a, &old, date(2026, 10, 1)).unwrap();

    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_artist_releases()
        .withf(|r, kind| r.id() == "Art" && kind.is_none())
        .returning(|_, _| Ok(vec![release("R2", "Art"), release("R1", "Art")]));

    let diff = new_releases_by_artist(&catalog, &store, &a, None).await.unwrap();

    assert_eq!(ids(&diff), vec!["spotify:album:R2"]);
}

#[tokio::test]
async fn release_tracks_are_filtered_to_the_artist() {
    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_release_tracks()
        .withf(|r| r.id() == "R1")
        .returning(|_| {
            Ok(vec![
                track_by("T1", &["Art"]),
                track_by("T2", &["Other"]),
                track_by("T3", &["Other", "Art"]),
            ])
        });

    let found = tracks_by_artist_in_release(&catalog, &album("R1"), &artist("Art"))
        .await
        .unwrap();

    assert_eq!(ids(&found), vec!["spotify:track:T1", "spotify:track:T3"]);
}

#[tokio::test]
async fn new_releases_expand_into_artist_tracks() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let a = artist("Art");
    let old: Vec<ItemStub> = vec![release("R1", "Art").into()];
    store.save_snapshot_on(&a, &old, date(2026, 10, 1)).unwrap();

    let mut catalog = MockCatalogClient::new();
    catalog
        .expect_fetch_artist_releases()
        .returning(|_, _| Ok(vec![release("R1", "Art"), release("R2", "Art"), release("R3", "Art")]));
    catalog
        .expect_fetch_release_tracks()
        .withf(|r| r.id() == "R2")
        .returning(|_| Ok(vec![track_by("T1", &["Art"]), track_by("T2", &["Other"])]));
    catalog
        .expect_fetch_release_tracks()
        .withf(|r| r.id() == "R3")
        .returning(|_| Ok(vec![track_by("T1", &["Art"]), track_by("T3", &["Art"])]));

    let found = new_tracks_by_artist(&catalog, &store, &a, None).await.unwrap();

    assert_eq!(ids(&found), vec!["spotify:track:T1", "spotify:track:T3"]);
}

#[tokio::test]
async fn changes_report_additions_and_removals_by_identifier() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    store.save_snapshot_on(&p, &tracks(&["A", "B", "C"]), date(2026, 10, 1)).unwrap();
    let mut catalog = MockCatalogClient::new();
    catalog.expect_fetch_collection_items().returning(|_| {
        // Same name as a removed track, different identifier.
        let mut d = track("D");
        d.name = "Track B".into();
        Ok(vec![Some(track("A")), Some(d), Some(track("C"))])
    });

    let changes = collection_changes(&catalog, &store, &p, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(changes.baseline, date(2026, 10, 1));
    assert_eq!(ids(&changes.added), vec!["spotify:track:D"]);
    assert_eq!(ids(&changes.removed), vec!["spotify:track:B"]);
}

#[tokio::test]
async fn changes_without_baseline_do_not_write() {
    let tmp = tempdir().unwrap();
    let store = FsSnapshotStore::with_clock(tmp.path(), today);
    let p = playlist("P");
    let mut catalog = MockCatalogClient::new();
    catalog.expect_fetch_collection_items().never();

    let changes = collection_changes(&catalog, &store, &p, None).await.unwrap();

    assert!(changes.is_none());
    assert!(store.list_snapshot_dates(&p).unwrap().is_empty());
}
