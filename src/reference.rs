//! Canonical catalog references (`spotify:<kind>:<id>`) and shareable links.
//!
//! Every collection the tool watches is addressed by a canonical reference.
//! Users tend to paste share links instead (`https://open.spotify.com/playlist/<id>?si=...`),
//! so this module also rewrites those into canonical form.
//!
//! Parsing against an expected kind is strict: a playlist slot never accepts an
//! artist reference, and the failure is surfaced as
//! [`WatchError::InvalidReferenceKind`] instead of being coerced.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

pub const SCHEME: &str = "spotify";

/// The kind segment of a canonical reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Playlist,
    Artist,
    Track,
    Album,
    Episode,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Playlist => "playlist",
            ReferenceKind::Artist => "artist",
            ReferenceKind::Track => "track",
            ReferenceKind::Album => "album",
            ReferenceKind::Episode => "episode",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "playlist" => Some(ReferenceKind::Playlist),
            "artist" => Some(ReferenceKind::Artist),
            "track" => Some(ReferenceKind::Track),
            "album" => Some(ReferenceKind::Album),
            "episode" => Some(ReferenceKind::Episode),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `spotify:<kind>:<id>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionReference {
    kind: ReferenceKind,
    id: String,
}

impl CollectionReference {
    /// Builds a reference from parts. The id must be non-empty and alphanumeric.
    pub fn new(kind: ReferenceKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(WatchError::InvalidReferenceKind {
                expected: kind,
                reference: format!("{SCHEME}:{kind}:{id}"),
            });
        }
        Ok(Self { kind, id })
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filesystem-safe form, `spotify_playlist_<id>`.
    pub fn file_stem(&self) -> String {
        format!("{SCHEME}_{}_{}", self.kind, self.id)
    }
}

impl fmt::Display for CollectionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}:{}:{}", self.kind, self.id)
    }
}

impl FromStr for CollectionReference {
    type Err = WatchError;

    /// Parses a canonical reference of any kind.
    fn from_str(s: &str) -> Result<Self> {
        canonical_re()
            .captures(s)
            .and_then(|caps| {
                Some(Self {
                    kind: ReferenceKind::from_segment(&caps[1])?,
                    id: caps[2].to_string(),
                })
            })
            .ok_or_else(|| WatchError::InvalidReference(s.to_string()))
    }
}

impl TryFrom<String> for CollectionReference {
    type Error = WatchError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CollectionReference> for String {
    fn from(r: CollectionReference) -> Self {
        r.to_string()
    }
}

fn canonical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^spotify:(playlist|artist|track|album|episode):([A-Za-z0-9]+)$")
            .expect("canonical reference pattern is valid")
    })
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://[A-Za-z0-9.-]+/(playlist|artist|track|episode|album)/([A-Za-z0-9]+)(?:\?[^\s]*)?$")
            .expect("shareable link pattern is valid")
    })
}

/// Parses `s` and requires it to be of `expected` kind.
pub fn parse_reference(s: &str, expected: ReferenceKind) -> Result<CollectionReference> {
    match s.parse::<CollectionReference>() {
        Ok(r) if r.kind == expected => Ok(r),
        _ => Err(WatchError::InvalidReferenceKind {
            expected,
            reference: s.to_string(),
        }),
    }
}

pub fn is_playlist_reference(s: &str) -> bool {
    parse_reference(s, ReferenceKind::Playlist).is_ok()
}

pub fn is_artist_reference(s: &str) -> bool {
    parse_reference(s, ReferenceKind::Artist).is_ok()
}

pub fn is_shareable_link(s: &str) -> bool {
    link_re().is_match(s)
}

/// Rewrites a share link into its canonical reference. Query parameters are dropped.
///
/// Returns `None` when `s` is not a share link at all; callers decide whether
/// that is an error in their context.
pub fn to_reference(s: &str) -> Option<CollectionReference> {
    let caps = link_re().captures(s)?;
    let kind = ReferenceKind::from_segment(&caps[1])?;
    Some(CollectionReference {
        kind,
        id: caps[2].to_string(),
    })
}

/// Accepts either a canonical reference or a share link of the expected kind.
pub fn resolve_reference(s: &str, expected: ReferenceKind) -> Result<CollectionReference> {
    let trimmed = s.trim();
    match to_reference(trimmed) {
        Some(r) if r.kind == expected => Ok(r),
        Some(_) => Err(WatchError::InvalidReferenceKind {
            expected,
            reference: trimmed.to_string(),
        }),
        None => parse_reference(trimmed, expected),
    }
}
