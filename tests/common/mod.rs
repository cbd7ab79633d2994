#![allow(dead_code)]

use chrono::NaiveDate;
use playlist_watch::contract::{Contributor, ItemStub, ReleaseKind, ReleaseStub};
use playlist_watch::reference::{CollectionReference, ReferenceKind};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    date(2026, 10, 16)
}

pub fn playlist(id: &str) -> CollectionReference {
    CollectionReference::new(ReferenceKind::Playlist, id).unwrap()
}

pub fn artist(id: &str) -> CollectionReference {
    CollectionReference::new(ReferenceKind::Artist, id).unwrap()
}

pub fn album(id: &str) -> CollectionReference {
    CollectionReference::new(ReferenceKind::Album, id).unwrap()
}

pub fn credit(artist_id: &str) -> Contributor {
    Contributor {
        id: format!("spotify:artist:{artist_id}"),
        name: format!("Artist {artist_id}"),
    }
}

pub fn track(id: &str) -> ItemStub {
    ItemStub {
        id: format!("spotify:track:{id}"),
        name: format!("Track {id}"),
        contributors: vec![credit("Someone")],
    }
}

pub fn track_by(id: &str, artist_ids: &[&str]) -> ItemStub {
    ItemStub {
        id: format!("spotify:track:{id}"),
        name: format!("Track {id}"),
        contributors: artist_ids.iter().map(|a| credit(a)).collect(),
    }
}

pub fn tracks(ids: &[&str]) -> Vec<ItemStub> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn release(id: &str, artist_id: &str) -> ReleaseStub {
    ReleaseStub {
        id: format!("spotify:album:{id}"),
        name: format!("Release {id}"),
        artists: vec![credit(artist_id)],
        group: Some(ReleaseKind::Album),
        kind: ReleaseKind::Album,
    }
}

pub fn ids(items: &[ItemStub]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}
