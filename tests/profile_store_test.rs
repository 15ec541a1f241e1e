//! Integration tests for profile persistence

use prefect_settings::domain::SettingsError;
use prefect_settings::profiles::{load_profiles, save_profiles, Profile, ProfileStore, ProfilesCollection};
use prefect_settings::settings::{RawValue, Registry};
use std::fs;
use std::thread;
use tempfile::TempDir;

fn sample() -> ProfilesCollection {
    ProfilesCollection::new(
        vec![
            Profile::new("default").unwrap(),
            Profile::new("foo")
                .unwrap()
                .with_setting("PREFECT_ORION_DATABASE_TIMEOUT", RawValue::Float(2.0))
                .with_setting("PREFECT_LOGGING_ORION_MAX_LOG_SIZE", 1_000_001_i64)
                .with_setting("PREFECT_DEBUG_MODE", true),
            Profile::new("bar")
                .unwrap()
                .with_setting("PREFECT_API_KEY", "pnu_123"),
        ],
        Some("foo"),
    )
    .unwrap()
}

#[test]
fn test_save_then_load_is_equal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("profiles.toml");

    let collection = sample();
    save_profiles(&collection, &path).unwrap();
    assert_eq!(load_profiles(&path).unwrap(), collection);
}

#[test]
fn test_load_keeps_native_scalar_types() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.toml");
    fs::write(
        &path,
        r#"
active = "foo"

[profiles.foo]
PREFECT_ORION_DATABASE_TIMEOUT = 2.0
PREFECT_LOGGING_ORION_MAX_LOG_SIZE = 1000001
PREFECT_LOGGING_LEVEL = "DEBUG"
"#,
    )
    .unwrap();

    let collection = load_profiles(&path).unwrap();
    let foo = collection.get("foo").unwrap();
    assert_eq!(foo.get("PREFECT_ORION_DATABASE_TIMEOUT"), Some(&RawValue::Float(2.0)));
    assert_eq!(
        foo.get("PREFECT_LOGGING_ORION_MAX_LOG_SIZE"),
        Some(&RawValue::Integer(1_000_001))
    );
    assert_eq!(foo.get("PREFECT_LOGGING_LEVEL"), Some(&RawValue::from("DEBUG")));
}

#[test]
fn test_corrupt_file_is_reported_and_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.toml");
    let corrupt = "active = \"foo\"\n[profiles.foo\nPREFECT_API_KEY = 1\n";
    fs::write(&path, corrupt).unwrap();

    match load_profiles(&path).unwrap_err() {
        SettingsError::StoreParse { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }

    let store = ProfileStore::new(&path);
    assert!(store
        .update(|profiles| profiles.add(Profile::new("new")?))
        .is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), corrupt);
}

#[test]
fn test_failed_update_leaves_file_byte_identical() {
    let dir = TempDir::new().unwrap();
    let store = ProfileStore::new(dir.path().join("profiles.toml"));
    store.save(&sample()).unwrap();
    let before = fs::read(store.path()).unwrap();

    let registry = Registry::builtin();
    let result = store.update(|profiles| {
        profiles.set_setting(&registry, "foo", "PREFECT_ORION_DATABASE_TIMEOUT", "HELLO")
    });
    assert!(matches!(result, Err(SettingsError::Validation(_))));
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_concurrent_updates_keep_every_change() {
    let dir = TempDir::new().unwrap();
    let store = ProfileStore::new(dir.path().join("profiles.toml"));
    store.save(&ProfilesCollection::with_default_profile()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                store
                    .update(|profiles| profiles.add(Profile::new(format!("worker-{i}"))?))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let collection = store.load().unwrap();
    assert_eq!(collection.len(), 9);
    for i in 0..8 {
        assert!(collection.contains(&format!("worker-{i}")));
    }
    assert_eq!(collection.active_name(), Some("default"));
}

#[test]
fn test_no_temporary_files_left_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles.toml");
    save_profiles(&sample(), &path).unwrap();
    save_profiles(&sample(), &path).unwrap();

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["profiles.toml", "profiles.toml.lock"]);
}
