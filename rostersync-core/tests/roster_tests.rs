//! Roster and settings loading against real files.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rostersync_core::{roster, RosterError, Settings};

// ---------------------------------------------------------------------------
// 1. Roster
// ---------------------------------------------------------------------------

#[test]
fn load_roster_with_all_fields() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("subagents.json");
    file.write_str(
        r#"[
  {"name": "Atlas", "role": "CEO", "description": "Runs the team"},
  {"name": "Forge", "role": "builder", "model": "m1", "image": "/avatars/forge.png", "soul": "Direct."}
]"#,
    )
    .expect("write roster");

    let roster = roster::load_at(file.path()).expect("load");
    assert!(roster.rejected.is_empty());
    let entries = &roster.entries;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "Atlas");
    assert_eq!(entries[0].description.as_deref(), Some("Runs the team"));
    assert_eq!(entries[1].declared_model(), Some("m1"));
    assert_eq!(entries[1].image.as_deref(), Some("/avatars/forge.png"));
}

#[test]
fn load_missing_roster_returns_not_found_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("subagents.json");
    dir.child("subagents.json").assert(predicate::path::missing());

    let err = roster::load_at(&path).unwrap_err();
    assert!(matches!(err, RosterError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("subagents.json"));
}

#[test]
fn load_truncated_roster_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("subagents.json");
    file.write_str(r#"[{"name": "Forge", "role": "#).expect("write");

    let err = roster::load_at(file.path()).unwrap_err();
    assert!(matches!(err, RosterError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("subagents.json"));
}

#[test]
fn bad_record_is_set_aside_and_neighbours_survive() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("subagents.json");
    file.write_str(
        r#"[
  {"name": "Forge", "role": "builder"},
  {"role": "nameless"},
  "not an object",
  {"name": "Quill", "role": null},
  {"name": "Scout", "role": "research"}
]"#,
    )
    .expect("write");

    let roster = roster::load_at(file.path()).expect("load");
    let names: Vec<&str> = roster.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Forge", "Quill", "Scout"]);
    assert_eq!(roster.entries[1].display_role(), "Agent");

    assert_eq!(roster.rejected.len(), 2);
    assert_eq!(roster.rejected[0].index, 1);
    assert!(roster.rejected[0].reason.contains("name"), "{}", roster.rejected[0].reason);
    assert_eq!(roster.rejected[1].index, 2);
    assert_eq!(roster.rejected[1].name, None);
}

#[test]
fn object_instead_of_array_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("subagents.json");
    file.write_str(r#"{"name": "Forge"}"#).expect("write");

    assert!(matches!(
        roster::load_at(file.path()),
        Err(RosterError::Parse { .. })
    ));
}

// ---------------------------------------------------------------------------
// 2. Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_file_overrides_every_key() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(
        "roster_path: /srv/mc/subagents.json\n\
         container: oc-test\n\
         docker_bin: podman\n\
         openclaw_base: /opt/openclaw\n\
         shared_config: /opt/openclaw/config/openclaw.json\n\
         poll_interval_secs: 10\n\
         command_timeout_secs: 12\n",
    )
    .expect("write");

    let settings = Settings::load_at(file.path()).expect("load");
    assert_eq!(settings.docker_bin, "podman");
    assert_eq!(settings.poll_interval_secs, 10);
    let layout = settings.layout();
    assert_eq!(layout.base.as_str(), "/opt/openclaw");
    assert_eq!(layout.shared_config.as_str(), "/opt/openclaw/config/openclaw.json");
    assert_eq!(layout.resolve("Forge").workspace.as_str(), "/opt/openclaw/workspace-forge");
}

#[test]
fn relative_base_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("openclaw_base: data/.openclaw\n").expect("write");

    let err = Settings::load_at(file.path()).unwrap_err();
    assert!(err.to_string().contains("openclaw_base"), "got: {err}");
}
