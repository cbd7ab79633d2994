use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Writes a config whose stores live inside a fresh temp dir.
fn create_config() -> (TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("Creating temp dir failed");
    let config = dir.path().join("playlist-watch.yaml");
    let yaml = format!(
        "snapshot_dir: {}\ngroups_file: {}\n",
        dir.path().join("snapshots").display(),
        dir.path().join("groups.yaml").display()
    );
    write(&config, yaml).expect("Writing temp config failed");
    (dir, config)
}

fn cmd(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("playlist-watch").expect("Binary exists");
    cmd.arg("--config").arg(config).env_remove("SPOTIFY_ACCESS_TOKEN");
    cmd
}

#[test]
fn convert_prints_canonical_reference_for_share_link() {
    Command::cargo_bin("playlist-watch")
        .expect("Binary exists")
        .arg("convert")
        .arg("https://open.spotify.com/playlist/37i9dQZF1DX36edUJpD76c?si=abc123")
        .assert()
        .success()
        .stdout(predicate::str::diff("spotify:playlist:37i9dQZF1DX36edUJpD76c\n"));
}

#[test]
fn convert_rejects_text_that_is_not_a_link() {
    Command::cargo_bin("playlist-watch")
        .expect("Binary exists")
        .arg("convert")
        .arg("spotify:playlist:37i9dQZF1DX36edUJpD76c")
        .assert()
        .failure();
}

#[test]
fn groups_can_be_created_filled_and_listed() {
    let (_dir, config) = create_config();

    cmd(&config)
        .args(["groups", "create", "--name", "Radar", "--target", "spotify:playlist:Target1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created group 'Radar'"));

    cmd(&config)
        .args([
            "groups",
            "add",
            "--group",
            "Radar",
            "--kind",
            "artist",
            "--name",
            "Some Artist",
            "--reference",
            "https://open.spotify.com/artist/0OdUWJ0sBjDrqHygGUXeCF",
        ])
        .assert()
        .success();

    cmd(&config)
        .args(["groups", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("0: Radar -> spotify:playlist:Target1")
                .and(predicate::str::contains("Some Artist=spotify:artist:0OdUWJ0sBjDrqHygGUXeCF")),
        );
}

#[test]
fn adding_an_artist_as_playlist_fails() {
    let (_dir, config) = create_config();
    cmd(&config)
        .args(["groups", "create", "--name", "Radar", "--target", "spotify:playlist:Target1"])
        .assert()
        .success();

    cmd(&config)
        .args([
            "groups",
            "add",
            "--group",
            "Radar",
            "--kind",
            "playlist",
            "--name",
            "Wrong",
            "--reference",
            "spotify:artist:0OdUWJ0sBjDrqHygGUXeCF",
        ])
        .assert()
        .failure();
}

#[test]
fn update_of_unknown_group_fails() {
    let (_dir, config) = create_config();
    cmd(&config)
        .args(["update", "--group", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nope"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    cmd(&dir.path().join("absent.yaml"))
        .args(["groups", "list"])
        .assert()
        .failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use playlist_watch::cli::GroupCommand;
    use playlist_watch::{run, Cli, Commands};

    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        command: Commands::Groups {
            action: GroupCommand::List,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
