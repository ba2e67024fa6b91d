//! CLI integration tests for Savekeep
//!
//! These drive the full binary through the profile -> backup -> restore
//! workflow, with the config directory and working directory redirected
//! into temp folders.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the savekeep binary, pinned to a config
/// directory and working directory
fn savekeep_cmd(config_dir: &Path, work_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("savekeep"));
    cmd.env("SAVEKEEP_CONFIG_DIR", config_dir);
    cmd.current_dir(work_dir);
    cmd
}

struct World {
    config: TempDir,
    work: TempDir,
}

impl World {
    fn new() -> Self {
        Self {
            config: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> assert_cmd::Command {
        savekeep_cmd(self.config.path(), self.work.path())
    }

    /// Creates a save folder with one file and registers a profile for it
    fn add_profile(&self, name: &str) -> std::path::PathBuf {
        let saves = self.work.path().join(format!("{}-saves", name.to_lowercase()));
        fs::create_dir_all(&saves).unwrap();
        fs::write(saves.join("save1.dat"), b"savegame bytes").unwrap();

        self.cmd()
            .args(["profile", "add", name, saves.to_str().unwrap()])
            .assert()
            .success();
        saves
    }
}

// =============================================================================
// Profile Tests
// =============================================================================

#[test]
fn test_profile_add_and_list() {
    let world = World::new();
    world.add_profile("Game");

    world
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Game"));

    // Config file was written
    assert!(world.config.path().join("savekeep.json").is_file());
}

#[test]
fn test_profile_add_json_returns_id() {
    let world = World::new();
    let saves = world.work.path().join("saves");
    fs::create_dir_all(&saves).unwrap();
    fs::write(saves.join("a.dat"), b"x").unwrap();

    let output = world
        .cmd()
        .args([
            "profile",
            "add",
            "Json Game",
            saves.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["id"].as_str().unwrap().starts_with("p-"));
    assert_eq!(json["name"], "Json Game");
}

#[test]
fn test_profile_show_reports_missing_folder() {
    let world = World::new();
    world
        .cmd()
        .args(["profile", "add", "Ghost", "/no/such/folder/anywhere"])
        .assert()
        .success()
        .stderr(predicate::str::contains("does not exist yet"));

    world
        .cmd()
        .args(["profile", "show", "Ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no"));
}

#[test]
fn test_profile_remove_keeps_archives() {
    let world = World::new();
    world.add_profile("Keeper");

    world.cmd().args(["backup", "Keeper"]).assert().success();
    world
        .cmd()
        .args(["profile", "remove", "Keeper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archives are kept"));

    // Archive folder survives profile deletion
    let folder = world.work.path().join("backups").join("Keeper");
    assert!(folder.is_dir());
    assert!(fs::read_dir(folder)
        .unwrap()
        .flatten()
        .any(|e| e.file_name().to_string_lossy().ends_with(".zip")));

    world
        .cmd()
        .args(["profile", "show", "Keeper"])
        .assert()
        .failure();
}

#[test]
fn test_profile_edit_flags() {
    let world = World::new();
    world.add_profile("Editable");

    world
        .cmd()
        .args([
            "profile",
            "edit",
            "Editable",
            "--compression",
            "false",
            "--clear-on-restore",
            "false",
        ])
        .assert()
        .success();

    world
        .cmd()
        .args(["profile", "show", "Editable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("off"));
}

// =============================================================================
// Backup / Restore Tests
// =============================================================================

#[test]
fn test_backup_creates_archive() {
    let world = World::new();
    world.add_profile("Game");

    world
        .cmd()
        .args(["backup", "Game"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backed up 'Game'"));

    world
        .cmd()
        .args(["archives", "Game"])
        .assert()
        .success()
        .stdout(predicate::str::contains("regular"));
}

#[test]
fn test_two_backups_get_distinct_archives() {
    let world = World::new();
    world.add_profile("Game");

    world.cmd().args(["backup", "Game"]).assert().success();
    world.cmd().args(["backup", "Game"]).assert().success();

    let output = world
        .cmd()
        .args(["archives", "Game", "--format", "json"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let archives: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(archives.len(), 2);
    assert_ne!(archives[0]["file_path"], archives[1]["file_path"]);
}

#[test]
fn test_restore_round_trip_with_safety_archive() {
    let world = World::new();
    let saves = world.add_profile("Game");

    world.cmd().args(["backup", "Game"]).assert().success();

    // Damage the save, then restore the backup
    fs::write(saves.join("save1.dat"), b"corrupted by a bad mod").unwrap();
    world
        .cmd()
        .args(["restore", "Game"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Previous contents saved to"));

    assert_eq!(fs::read(saves.join("save1.dat")).unwrap(), b"savegame bytes");

    // The pre-restore state is in a safety archive
    world
        .cmd()
        .args(["archives", "Game"])
        .assert()
        .success()
        .stdout(predicate::str::contains("safety"));
}

#[test]
fn test_restore_without_archives_fails_cleanly() {
    let world = World::new();
    world.add_profile("Empty");

    world
        .cmd()
        .args(["restore", "Empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No archives found"));
}

#[test]
fn test_restore_rejects_bad_archive_number() {
    let world = World::new();
    world.add_profile("Game");
    world.cmd().args(["backup", "Game"]).assert().success();

    world
        .cmd()
        .args(["restore", "Game", "--archive", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_backup_unknown_profile_fails() {
    let world = World::new();

    world
        .cmd()
        .args(["backup", "Nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nobody"));
}

// =============================================================================
// Plugin / Detection Tests
// =============================================================================

fn write_descriptors(world: &World, content: &str) {
    let plugins_dir = world.config.path().join("plugins");
    fs::create_dir_all(&plugins_dir).unwrap();
    fs::write(plugins_dir.join("games.jsonc"), content).unwrap();
}

#[test]
fn test_plugin_list_includes_descriptor_units() {
    let world = World::new();
    write_descriptors(
        &world,
        r#"
        // test descriptor list
        [
            {"id": "demo_game", "name": "Demo Game", "save_paths": ["/nowhere/demo"]}
        ]
        "#,
    );

    world
        .cmd()
        .args(["plugin", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo_game"))
        .stdout(predicate::str::contains("stardew_valley"));
}

#[test]
fn test_duplicate_game_id_is_reported_not_fatal() {
    let world = World::new();
    write_descriptors(
        &world,
        r#"[
            {"id": "twin", "name": "First Twin", "save_paths": ["/nowhere/a"]},
            {"id": "twin", "name": "Second Twin", "save_paths": ["/nowhere/b"]}
        ]"#,
    );

    world
        .cmd()
        .args(["plugin", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate game_id"));

    // The first-loaded twin is the active one
    let output = world
        .cmd()
        .args(["plugin", "list", "--format", "json"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let descriptors: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    let twin = descriptors
        .iter()
        .find(|d| d["game_id"] == "twin")
        .expect("twin should be loaded");
    assert_eq!(twin["game_name"], "First Twin");
}

#[test]
fn test_detect_and_adopt_workflow() {
    let world = World::new();
    let installed = world.work.path().join("installed-saves");
    fs::create_dir_all(&installed).unwrap();
    write_descriptors(
        &world,
        &format!(
            r#"[{{"id": "installed_game", "name": "Installed Game", "save_paths": ["{}"]}}]"#,
            installed.to_str().unwrap().replace('\\', "\\\\")
        ),
    );

    world
        .cmd()
        .args(["detect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed_game"));

    world
        .cmd()
        .args(["profile", "adopt", "installed_game"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plugin-installed_game"));

    // Adopting twice is an error
    world
        .cmd()
        .args(["profile", "adopt", "installed_game"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already adopted"));
}

#[test]
fn test_detect_nothing_installed() {
    let world = World::new();
    write_descriptors(
        &world,
        r#"[{"id": "ghost", "name": "Ghost Game", "save_paths": ["/nowhere/ghost"]}]"#,
    );

    world
        .cmd()
        .args(["detect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No known games detected"));
}

// =============================================================================
// Storage / Config Tests
// =============================================================================

#[test]
fn test_storage_fixed_root_is_used_for_backups() {
    let world = World::new();
    let fixed = TempDir::new().unwrap();
    world.add_profile("Game");

    world
        .cmd()
        .args(["storage", "use-fixed", fixed.path().to_str().unwrap()])
        .assert()
        .success();

    world.cmd().args(["backup", "Game"]).assert().success();

    let game_folder = fixed.path().join("Game");
    assert!(game_folder.is_dir());
    assert!(fs::read_dir(game_folder)
        .unwrap()
        .flatten()
        .any(|e| e.file_name().to_string_lossy().ends_with(".zip")));

    world
        .cmd()
        .args(["storage", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed"));
}

#[test]
fn test_corrupted_config_is_rotated_with_warning() {
    let world = World::new();
    fs::write(world.config.path().join("savekeep.json"), "{broken").unwrap();

    world
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("corrupted"));

    assert!(world
        .config
        .path()
        .join("savekeep.json.corrupted")
        .is_file());
}

#[test]
fn test_profiles_survive_across_invocations() {
    let world = World::new();
    world.add_profile("Persistent");

    world
        .cmd()
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Persistent"));

    world
        .cmd()
        .args(["profile", "show", "Persistent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Persistent"));
}
