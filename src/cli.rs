//! Command-line front end: argument parsing, wiring of the stores and the
//! catalog client, and printing of results.
//!
//! All change-detection logic lives in [`crate::diff`] and [`crate::update`];
//! this module only glues user input to those calls.
//!
//! For programmatic or integration use, call [`run`] with a constructed [`Cli`].
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::catalog::SpotifyClient;
use crate::config::AppConfig;
use crate::contract::{CatalogClient, EntryKind, GroupStore, NamedReference, WatchGroup};
use crate::diff::{collection_changes, fetch_current, find_duplicates};
use crate::groups::YamlGroupStore;
use crate::load_config::load_config;
use crate::reference::{resolve_reference, to_reference, CollectionReference, ReferenceKind};
use crate::session::Session;
use crate::snapshot::FsSnapshotStore;
use crate::update::{run_update, snapshot_group, UpdateReport};

/// CLI for playlist-watch: track playlists and artists, collect what is new.
#[derive(Parser)]
#[clap(
    name = "playlist-watch",
    version,
    about = "Snapshot watched playlists and artists and collect newly added tracks into a target playlist"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = "playlist-watch.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diff every collection of a group and optionally write the target playlist
    Update {
        /// Group id or name
        #[clap(long)]
        group: String,
        /// Compare against the latest snapshot on or before this date (YYYY-MM-DD)
        #[clap(long)]
        since: Option<NaiveDate>,
        /// Snapshot each collection after diffing it
        #[clap(long)]
        snapshot: bool,
        /// Empty the target playlist before adding
        #[clap(long)]
        clear: bool,
        /// Add new items to the target playlist
        #[clap(long)]
        append: bool,
    },
    /// Snapshot every collection of a group without diffing
    Snapshot {
        #[clap(long)]
        group: String,
    },
    /// Show items added to and removed from a playlist or artist since a snapshot
    Changes {
        /// Canonical reference or share link
        #[clap(long)]
        reference: String,
        #[clap(long)]
        since: Option<NaiveDate>,
    },
    /// List items that occur more than once in a playlist
    Duplicates {
        #[clap(long)]
        reference: String,
    },
    /// Manage watch groups
    Groups {
        #[clap(subcommand)]
        action: GroupCommand,
    },
    /// Print the canonical reference for a share link
    Convert { link: String },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// List all groups with their entries
    List,
    /// Create an empty group feeding `target`
    Create {
        #[clap(long)]
        name: String,
        /// Target playlist reference or share link; a new private playlist
        /// named after the group is created when omitted
        #[clap(long)]
        target: Option<String>,
    },
    /// Add a playlist or artist to a group
    Add {
        #[clap(long)]
        group: String,
        #[clap(long, value_enum)]
        kind: EntryKindArg,
        #[clap(long)]
        name: String,
        #[clap(long)]
        reference: String,
    },
    /// Remove a playlist or artist from a group
    Remove {
        #[clap(long)]
        group: String,
        #[clap(long, value_enum)]
        kind: EntryKindArg,
        #[clap(long)]
        reference: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EntryKindArg {
    Playlist,
    Artist,
}

impl From<EntryKindArg> for EntryKind {
    fn from(k: EntryKindArg) -> Self {
        match k {
            EntryKindArg::Playlist => EntryKind::Playlist,
            EntryKindArg::Artist => EntryKind::Artist,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Convert { link } => {
            let reference = to_reference(&link)
                .with_context(|| format!("`{link}` is not a share link"))?;
            println!("{reference}");
            Ok(())
        }
        Commands::Groups { action } => {
            let config = load_config(&cli.config)?;
            manage_groups(&config, action).await
        }
        Commands::Update {
            group,
            since,
            snapshot,
            clear,
            append,
        } => {
            let config = load_config(&cli.config)?;
            let groups = YamlGroupStore::new(&config.groups_file);
            let mut session = Session::load(&groups)?;
            session.select_group(&group)?;
            session.since = since;
            session.options.snapshot = snapshot;
            session.options.clear_target = clear;
            session.options.append_new = append;
            session.options.max_batch_size = config.max_batch_size();
            update(&config, &session).await
        }
        Commands::Snapshot { group } => {
            let config = load_config(&cli.config)?;
            let groups = YamlGroupStore::new(&config.groups_file);
            let mut session = Session::load(&groups)?;
            let group = session.select_group(&group)?.clone();
            let catalog = SpotifyClient::new_from_env(Some(config.base_url()))?;
            let store = FsSnapshotStore::new(&config.snapshot_dir);
            let results = snapshot_group(&catalog, &store, &group).await;
            let mut failed = 0;
            for (reference, outcome) in &results {
                match outcome {
                    Ok(date) => println!("{reference}: snapshot {date}"),
                    Err(e) => {
                        failed += 1;
                        println!("{reference}: FAILED: {e}");
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} snapshots failed", results.len());
            }
            Ok(())
        }
        Commands::Changes { reference, since } => {
            let config = load_config(&cli.config)?;
            let reference = resolve_collection(&reference)?;
            let catalog = SpotifyClient::new_from_env(Some(config.base_url()))?;
            let store = FsSnapshotStore::new(&config.snapshot_dir);
            match collection_changes(&catalog, &store, &reference, since).await? {
                None => println!("No snapshot of {reference} yet"),
                Some(changes) => {
                    println!("Changes in {reference} since {}:", changes.baseline);
                    println!("New:");
                    for item in &changes.added {
                        println!("  + {} - {}", item.name, item.contributor_names());
                    }
                    println!("Removed:");
                    for item in &changes.removed {
                        println!("  - {} - {}", item.name, item.contributor_names());
                    }
                }
            }
            Ok(())
        }
        Commands::Duplicates { reference } => {
            let config = load_config(&cli.config)?;
            let reference = resolve_reference(&reference, ReferenceKind::Playlist)?;
            let catalog = SpotifyClient::new_from_env(Some(config.base_url()))?;
            let items = fetch_current(&catalog, &reference).await?;
            let duplicates = find_duplicates(&items);
            if duplicates.is_empty() {
                println!("No duplicates in {reference}");
            }
            for dup in duplicates {
                println!("{} ({}) at positions {:?}", dup.name, dup.id, dup.positions);
            }
            Ok(())
        }
    }
}

async fn update(config: &AppConfig, session: &Session) -> Result<()> {
    let group = session
        .selected_group()
        .context("No group selected")?;
    let catalog = SpotifyClient::new_from_env(Some(config.base_url()))?;
    let store = FsSnapshotStore::new(&config.snapshot_dir);

    println!("Update starting for group '{}'...", group.name);
    let report = run_update(&catalog, &store, group, session.since, session.options).await?;
    print_report(&report);

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} collection(s) could not be processed");
    }
    Ok(())
}

fn print_report(report: &UpdateReport) {
    println!("Group '{}' -> {}", report.group, report.target);
    for c in &report.collections {
        let kind = match c.kind {
            EntryKind::Playlist => "playlist",
            EntryKind::Artist => "artist",
        };
        match &c.outcome {
            Ok(u) if u.bootstrapped => {
                println!("  [{kind}] {} ({}): first snapshot recorded", c.name, c.reference)
            }
            Ok(u) => {
                let baseline = u
                    .baseline
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  [{kind}] {} ({}): {} new since {baseline}",
                    c.name,
                    c.reference,
                    u.new_items.len()
                );
                for item in &u.new_items {
                    println!("      + {} - {}", item.name, item.contributor_names());
                }
            }
            Err(e) => println!("  [{kind}] {} ({}): FAILED: {e}", c.name, c.reference),
        }
    }
    if report.cleared {
        println!("Target cleared.");
    }
    if !report.added.is_empty() {
        println!(
            "Added {} item(s) to the target in {} request(s).",
            report.added.len(),
            report.add_requests
        );
    }
}

/// Playlist or artist, as canonical reference or share link.
fn resolve_collection(raw: &str) -> Result<CollectionReference> {
    let raw = raw.trim();
    let reference = match to_reference(raw) {
        Some(r) => r,
        None => raw.parse::<CollectionReference>()?,
    };
    match reference.kind() {
        ReferenceKind::Playlist | ReferenceKind::Artist => Ok(reference),
        other => anyhow::bail!("{reference} is a {other}, expected a playlist or artist"),
    }
}

async fn manage_groups(config: &AppConfig, action: GroupCommand) -> Result<()> {
    let store = YamlGroupStore::new(&config.groups_file);
    match action {
        GroupCommand::List => {
            for group in store.load_all()? {
                print_group(&group);
            }
        }
        GroupCommand::Create { name, target } => {
            let target = match target {
                Some(raw) => resolve_reference(&raw, ReferenceKind::Playlist)?,
                None => {
                    let catalog = SpotifyClient::new_from_env(Some(config.base_url()))?;
                    catalog.create_playlist(&name, false).await?
                }
            };
            store.create_group(&name, &target)?;
            println!("Created group '{name}' -> {target}");
        }
        GroupCommand::Add {
            group,
            kind,
            name,
            reference,
        } => {
            let kind = EntryKind::from(kind);
            let entry = NamedReference {
                name,
                reference: resolve_reference(&reference, kind.reference_kind())?,
            };
            store.add_entry(&group, kind, &entry)?;
            println!("Added {} ({}) to '{group}'", entry.name, entry.reference);
        }
        GroupCommand::Remove {
            group,
            kind,
            reference,
        } => {
            let kind = EntryKind::from(kind);
            let reference = resolve_reference(&reference, kind.reference_kind())?;
            if store.remove_entry(&group, kind, &reference)? {
                println!("Removed {reference} from '{group}'");
            } else {
                println!("{reference} is not in '{group}'");
            }
        }
    }
    Ok(())
}

fn print_group(group: &WatchGroup) {
    println!("{}: {} -> {}", group.group_id, group.name, group.target);
    for (label, kind) in [("Playlists", EntryKind::Playlist), ("Artists", EntryKind::Artist)] {
        println!("  {label}:");
        for entry in group.entries(kind) {
            println!("    {}={}", entry.name, entry.reference);
        }
    }
}
