//! Integration tests for the `profile` subcommands

use clap::Parser;
use prefect_settings::cli::{run, Cli, Session};
use prefect_settings::profiles::{load_profiles, save_profiles, Profile, ProfilesCollection};
use prefect_settings::settings::{EnvSnapshot, RawValue, Registry};
use std::path::PathBuf;
use tempfile::TempDir;

fn profiles_path(dir: &TempDir) -> PathBuf {
    dir.path().join("profiles.toml")
}

fn invoke(dir: &TempDir, args: &[&str]) -> (i32, String) {
    let cli = Cli::parse_from(std::iter::once("prefect").chain(args.iter().copied()));
    let env = EnvSnapshot::from_pairs([(
        "PREFECT_PROFILES_PATH",
        profiles_path(dir).display().to_string(),
    )]);
    let session = Session::discover(Registry::builtin(), env, cli.profile.clone()).unwrap();
    let mut out = Vec::new();
    let code = run(&cli, &session, None, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

/// Saves `default` (active) and `dev` holding one setting
fn save_fixture(dir: &TempDir) {
    let collection = ProfilesCollection::new(
        vec![
            Profile::new("default").unwrap(),
            Profile::new("dev")
                .unwrap()
                .with_setting("PREFECT_LOGGING_LEVEL", "DEBUG")
                .with_setting("PREFECT_API_KEY", "pnu_secret"),
        ],
        Some("default"),
    )
    .unwrap();
    save_profiles(&collection, profiles_path(dir)).unwrap();
}

#[test]
fn test_ls_marks_active_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "ls"]);
    assert_eq!(code, 0);
    assert_eq!(output, "* default\ndev\n");
}

#[test]
fn test_ls_without_file_lists_default() {
    let dir = TempDir::new().unwrap();
    let (_, output) = invoke(&dir, &["profile", "ls"]);
    assert_eq!(output, "* default\n");
    assert!(!profiles_path(&dir).exists());
}

#[test]
fn test_create_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "create", "staging"]);
    assert_eq!(code, 0);
    assert_eq!(output, "Created profile 'staging'.\n");

    let profiles = load_profiles(profiles_path(&dir)).unwrap();
    assert!(profiles.get("staging").unwrap().is_empty());
    assert_eq!(profiles.active_name(), Some("default"));
}

#[test]
fn test_create_existing_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "create", "dev"]);
    assert_eq!(code, 1);
    assert_eq!(output, "Profile 'dev' already exists.\n");
}

#[test]
fn test_create_from_copies_settings() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, _) = invoke(&dir, &["profile", "create", "dev2", "--from", "dev"]);
    assert_eq!(code, 0);

    let profiles = load_profiles(profiles_path(&dir)).unwrap();
    assert_eq!(
        profiles.get("dev2").unwrap().settings(),
        profiles.get("dev").unwrap().settings()
    );
}

#[test]
fn test_create_from_missing_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "create", "dev2", "--from", "ghost"]);
    assert_eq!(code, 1);
    assert_eq!(output, "Profile 'ghost' not found.\n");
    assert!(!load_profiles(profiles_path(&dir)).unwrap().contains("dev2"));
}

#[test]
fn test_create_from_profile_with_unknown_key() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        profiles_path(&dir),
        "active = \"default\"\n\n[profiles.default]\n\n[profiles.legacy]\nPREFECT_FOO = \"BAR\"\n",
    )
    .unwrap();
    let before = std::fs::read(profiles_path(&dir)).unwrap();

    let (code, output) = invoke(&dir, &["profile", "create", "copy", "--from", "legacy"]);
    assert_eq!(code, 1);
    assert_eq!(
        output,
        "Validation error for setting 'PREFECT_FOO': unknown setting\nInvalid setting value.\n"
    );
    assert_eq!(std::fs::read(profiles_path(&dir)).unwrap(), before);
}

#[test]
fn test_use_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "use", "dev"]);
    assert_eq!(code, 0);
    assert_eq!(output, "Profile 'dev' now active.\n");
    assert_eq!(
        load_profiles(profiles_path(&dir)).unwrap().active_name(),
        Some("dev")
    );

    let (_, listed) = invoke(&dir, &["profile", "ls"]);
    assert_eq!(listed, "default\n* dev\n");
}

#[test]
fn test_use_missing_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "use", "ghost"]);
    assert_eq!(code, 1);
    assert_eq!(output, "Profile 'ghost' not found.\n");
}

#[test]
fn test_delete_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "delete", "dev"]);
    assert_eq!(code, 0);
    assert_eq!(output, "Removed profile 'dev'.\n");
    assert!(!load_profiles(profiles_path(&dir)).unwrap().contains("dev"));
}

#[test]
fn test_delete_active_profile_is_refused() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);
    let before = std::fs::read(profiles_path(&dir)).unwrap();

    let (code, output) = invoke(&dir, &["profile", "delete", "default"]);
    assert_eq!(code, 1);
    assert_eq!(
        output,
        "Profile 'default' is the active profile. You must switch profiles before it can be deleted.\n"
    );
    assert_eq!(std::fs::read(profiles_path(&dir)).unwrap(), before);
}

#[test]
fn test_rename_active_profile_moves_pointer() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "rename", "default", "main"]);
    assert_eq!(code, 0);
    assert_eq!(output, "Renamed profile 'default' to 'main'.\n");

    let profiles = load_profiles(profiles_path(&dir)).unwrap();
    assert_eq!(profiles.active_name(), Some("main"));
    assert_eq!(profiles.names().collect::<Vec<_>>(), vec!["main", "dev"]);
}

#[test]
fn test_rename_onto_existing_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "rename", "default", "dev"]);
    assert_eq!(code, 1);
    assert_eq!(output, "Profile 'dev' already exists.\n");
}

#[test]
fn test_inspect_text_masks_secrets() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "inspect", "dev"]);
    assert_eq!(code, 0);
    assert_eq!(
        output,
        "PREFECT_API_KEY='********'\nPREFECT_LOGGING_LEVEL='DEBUG'\n"
    );

    let (_, shown) = invoke(&dir, &["profile", "inspect", "dev", "--show-secrets"]);
    assert!(shown.contains("PREFECT_API_KEY='pnu_secret'"));
}

#[test]
fn test_inspect_empty_profile() {
    let dir = TempDir::new().unwrap();
    save_fixture(&dir);

    let (code, output) = invoke(&dir, &["profile", "inspect"]);
    assert_eq!(code, 0);
    assert_eq!(output, "Profile 'default' is empty.\n");
}

#[test]
fn test_inspect_json() {
    let dir = TempDir::new().unwrap();
    let collection = ProfilesCollection::new(
        vec![Profile::new("foo")
            .unwrap()
            .with_setting("PREFECT_ORION_DATABASE_TIMEOUT", RawValue::Float(2.0))
            .with_setting("PREFECT_DEBUG_MODE", true)],
        Some("foo"),
    )
    .unwrap();
    save_profiles(&collection, profiles_path(&dir)).unwrap();

    let (code, output) = invoke(&dir, &["profile", "inspect", "--output", "json"]);
    assert_eq!(code, 0);

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["PREFECT_ORION_DATABASE_TIMEOUT"], serde_json::json!(2.0));
    assert_eq!(json["PREFECT_DEBUG_MODE"], serde_json::json!(true));
}
