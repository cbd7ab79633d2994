#![doc = "playlist-watch: snapshot watched playlists and artists, detect what is new, collect it."]

//! Watch groups bundle playlists and artists whose new tracks are gathered into
//! one target playlist. The crate is layered leaves first:
//!
//! - [`reference`]: canonical `spotify:<kind>:<id>` references and share links
//! - [`contract`]: the catalog, snapshot and group store traits plus data types
//! - [`snapshot`]: dated snapshots on disk
//! - [`diff`]: change detection against a baseline snapshot
//! - [`update`]: per-group update runs writing the target playlist
//! - [`groups`], [`catalog`], [`session`], [`cli`]: concrete stores, the Spotify
//!   client and the command-line front end

pub mod catalog;
pub mod cli;
pub mod config;
pub mod contract;
pub mod diff;
pub mod error;
pub mod groups;
pub mod load_config;
pub mod reference;
pub mod session;
pub mod snapshot;
pub mod update;

pub use cli::{run, Cli, Commands};
pub use error::{Result, WatchError};
