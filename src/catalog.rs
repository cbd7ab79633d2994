//! Spotify Web API implementation of the catalog contract.
//!
//! [`SpotifyClient`] implements [`CatalogClient`] over the Spotify Web API with `reqwest`.
//!
//! - Construct with [`SpotifyClient::new_from_env`], which reads a bearer token from
//!   `SPOTIFY_ACCESS_TOKEN` (a `.env` file is honoured). Obtaining and refreshing that
//!   token is left to the user's tooling.
//! - Listing endpoints are paginated; the client follows `next` links until exhausted
//!   and hands back one flattened list.
//! - Every non-success response becomes [`WatchError::RemoteFetch`] carrying the
//!   status and body.
//! - Local files come back as playlist entries with `is_local` set, a
//!   `spotify:local:` uri and uncredited artists. They cannot be added to another
//!   playlist, so they are reported as unavailable entries.

use std::env;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::contract::{CatalogClient, Contributor, ItemStub, ReleaseKind, ReleaseStub};
use crate::error::{Result, WatchError};
use crate::reference::{CollectionReference, ReferenceKind};

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";
pub const TOKEN_ENV: &str = "SPOTIFY_ACCESS_TOKEN";

const PLAYLIST_PAGE_LIMIT: usize = 100;
const LISTING_PAGE_LIMIT: usize = 50;
const LOCAL_URI_PREFIX: &str = "spotify:local:";

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    #[serde(default)]
    is_local: bool,
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    uri: Option<String>,
    name: String,
    #[serde(default)]
    is_local: bool,
    #[serde(default)]
    artists: Vec<ArtistObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    uri: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album_type: String,
    album_group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    uri: String,
}

impl ArtistObject {
    /// Credits on local files carry no uri and are dropped.
    fn into_contributor(self) -> Option<Contributor> {
        let id = self.uri.filter(|u| !u.is_empty())?;
        Some(Contributor {
            id,
            name: self.name,
        })
    }
}

fn contributors(artists: Vec<ArtistObject>) -> Vec<Contributor> {
    artists
        .into_iter()
        .filter_map(ArtistObject::into_contributor)
        .collect()
}

impl PlaylistEntry {
    fn into_stub(self) -> Option<ItemStub> {
        if self.is_local {
            return None;
        }
        self.track.and_then(TrackObject::into_stub)
    }
}

impl TrackObject {
    /// `None` for local files and for removed tracks without a uri.
    fn into_stub(self) -> Option<ItemStub> {
        if self.is_local {
            return None;
        }
        let id = self
            .uri
            .filter(|u| !u.is_empty() && !u.starts_with(LOCAL_URI_PREFIX))?;
        Some(ItemStub {
            id,
            name: self.name,
            contributors: contributors(self.artists),
        })
    }
}

fn release_kind(raw: &str) -> ReleaseKind {
    match raw {
        "single" => ReleaseKind::Single,
        "compilation" => ReleaseKind::Compilation,
        "appears_on" => ReleaseKind::AppearsOn,
        _ => ReleaseKind::Album,
    }
}

pub struct SpotifyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Builds a client from `SPOTIFY_ACCESS_TOKEN`, loading `.env` first.
    pub fn new_from_env(base_url: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();
        match env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
                info!(base_url, "Initialised Spotify client from environment");
                Ok(Self::new(base_url, token.trim()))
            }
            Ok(_) | Err(_) => {
                error!(var = TOKEN_ENV, "Access token missing in environment");
                Err(WatchError::Config(format!("{TOKEN_ENV} is not set")))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|e| {
            error!(request = what, error = %e, "Catalog request could not be sent");
            WatchError::from(e)
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| String::from("<failed to decode response body>"));
        error!(request = what, status = %status, body = %body, "Catalog API returned error");
        Err(WatchError::RemoteFetch(format!(
            "{what} returned {status}: {body}"
        )))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.send(self.request(Method::GET, url), url).await?;
        resp.json::<T>().await.map_err(|e| {
            WatchError::RemoteFetch(format!("unexpected response from {url}: {e}"))
        })
    }

    /// Follows `next` links and concatenates all pages.
    async fn paginate<T: DeserializeOwned>(&self, first: String) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            pages += 1;
            out.extend(page.items);
            next = page.next;
        }
        debug!(pages, items = out.len(), "Fetched paginated listing");
        Ok(out)
    }

    fn expect_kind(reference: &CollectionReference, kind: ReferenceKind) -> Result<()> {
        if reference.kind() == kind {
            Ok(())
        } else {
            Err(WatchError::InvalidReferenceKind {
                expected: kind,
                reference: reference.to_string(),
            })
        }
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn fetch_collection_items(
        &self,
        playlist: &CollectionReference,
    ) -> Result<Vec<Option<ItemStub>>> {
        Self::expect_kind(playlist, ReferenceKind::Playlist)?;
        let url = self.url(&format!(
            "playlists/{}/tracks?limit={PLAYLIST_PAGE_LIMIT}",
            playlist.id()
        ));
        let entries: Vec<PlaylistEntry> = self.paginate(url).await?;
        info!(playlist = %playlist, items = entries.len(), "Fetched playlist items");
        Ok(entries
            .into_iter()
            .map(PlaylistEntry::into_stub)
            .collect())
    }

    async fn fetch_artist_releases(
        &self,
        artist: &CollectionReference,
        kind: Option<ReleaseKind>,
    ) -> Result<Vec<ReleaseStub>> {
        Self::expect_kind(artist, ReferenceKind::Artist)?;
        let mut path = format!("artists/{}/albums?limit={LISTING_PAGE_LIMIT}", artist.id());
        if let Some(kind) = kind {
            path.push_str("&include_groups=");
            path.push_str(kind.as_str());
        }
        let albums: Vec<AlbumObject> = self.paginate(self.url(&path)).await?;
        info!(artist = %artist, releases = albums.len(), "Fetched artist releases");
        Ok(albums
            .into_iter()
            .map(|a| ReleaseStub {
                id: a.uri,
                name: a.name,
                artists: contributors(a.artists),
                group: a.album_group.as_deref().map(release_kind),
                kind: release_kind(&a.album_type),
            })
            .collect())
    }

    async fn fetch_release_tracks(&self, release: &CollectionReference) -> Result<Vec<ItemStub>> {
        Self::expect_kind(release, ReferenceKind::Album)?;
        let url = self.url(&format!(
            "albums/{}/tracks?limit={LISTING_PAGE_LIMIT}",
            release.id()
        ));
        let tracks: Vec<TrackObject> = self.paginate(url).await?;
        Ok(tracks.into_iter().filter_map(TrackObject::into_stub).collect())
    }

    async fn add_items(&self, playlist: &CollectionReference, ids: &[String]) -> Result<()> {
        Self::expect_kind(playlist, ReferenceKind::Playlist)?;
        let url = self.url(&format!("playlists/{}/tracks", playlist.id()));
        let req = self
            .request(Method::POST, &url)
            .json(&json!({ "uris": ids }));
        self.send(req, &url).await?;
        info!(playlist = %playlist, items = ids.len(), "Added items to playlist");
        Ok(())
    }

    async fn remove_all_items(&self, playlist: &CollectionReference) -> Result<()> {
        Self::expect_kind(playlist, ReferenceKind::Playlist)?;
        let url = self.url(&format!("playlists/{}/tracks", playlist.id()));
        // Replacing the contents with an empty list clears the playlist in one call.
        let req = self
            .request(Method::PUT, &url)
            .json(&json!({ "uris": Vec::<String>::new() }));
        self.send(req, &url).await?;
        info!(playlist = %playlist, "Cleared playlist");
        Ok(())
    }

    async fn create_playlist(&self, name: &str, public: bool) -> Result<CollectionReference> {
        let me: UserObject = self.get_json(&self.url("me")).await?;
        let url = self.url(&format!("users/{}/playlists", me.id));
        let req = self
            .request(Method::POST, &url)
            .json(&json!({ "name": name, "public": public }));
        let created: CreatedPlaylist = self
            .send(req, &url)
            .await?
            .json()
            .await
            .map_err(|e| WatchError::RemoteFetch(format!("unexpected response from {url}: {e}")))?;
        let reference = crate::reference::parse_reference(&created.uri, ReferenceKind::Playlist)?;
        info!(playlist = %reference, name, "Created playlist");
        Ok(reference)
    }
}
