//! Profile store
//!
//! Persists a [`ProfilesCollection`] to a TOML file:
//!
//! ```toml
//! active = "default"
//!
//! [profiles.default]
//! PREFECT_LOGGING_LEVEL = "DEBUG"
//!
//! [profiles.foo]
//! PREFECT_ORION_DATABASE_TIMEOUT = 2.0
//! ```
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so readers only ever see the old or the new content. Saves
//! are serialized by an in-process mutex and an exclusive lock on a sibling
//! `<file>.lock`, which also covers other processes. Loading never writes.

use crate::domain::{Result, ResultExt, SettingsError};
use crate::profiles::model::{Profile, ProfilesCollection};
use crate::settings::RawValue;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

static SAVE_LOCK: Mutex<()> = Mutex::new(());

/// On-disk shape of the profiles file
#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,

    #[serde(default)]
    profiles: toml::Table,
}

/// Loads profiles from a TOML file
///
/// A missing file yields a collection with a single empty, active `default`
/// profile.
///
/// # Errors
///
/// Returns [`SettingsError::StoreParse`] with the path and reason if the file is
/// not valid TOML, a profile is not a table, a value is not a scalar, or the
/// active pointer names a missing profile. No partial collection is returned.
///
/// # Examples
///
/// ```no_run
/// use prefect_settings::profiles::load_profiles;
///
/// let profiles = load_profiles("/home/me/.prefect/profiles.toml").unwrap();
/// println!("active: {:?}", profiles.active_name());
/// ```
pub fn load_profiles(path: impl AsRef<Path>) -> Result<ProfilesCollection> {
    let path = path.as_ref();

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Profiles file not found, using default profile");
            return Ok(ProfilesCollection::with_default_profile());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read profiles file {}", path.display()))
        }
    };

    let collection = parse_profiles(&contents).map_err(|reason| SettingsError::StoreParse {
        path: path.to_path_buf(),
        reason,
    })?;

    tracing::debug!(
        path = %path.display(),
        profiles = collection.len(),
        active = ?collection.active_name(),
        "Loaded profiles"
    );
    Ok(collection)
}

/// Saves profiles atomically, replacing the file at `path`
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the lock cannot be
/// acquired, or the temporary file cannot be written or renamed. On error the
/// previous file content is left in place.
pub fn save_profiles(collection: &ProfilesCollection, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    with_save_lock(path, || write_atomic(collection, path))
}

/// Parses the content of a profiles file
fn parse_profiles(contents: &str) -> std::result::Result<ProfilesCollection, String> {
    let file: ProfilesFile = toml::from_str(contents).map_err(|e| e.message().to_string())?;

    let mut profiles = Vec::with_capacity(file.profiles.len());
    for (name, value) in &file.profiles {
        let table = value
            .as_table()
            .ok_or_else(|| format!("profile '{name}' must be a table"))?;
        let mut profile = Profile::new(name.clone()).map_err(|e| e.to_string())?;
        for (key, value) in table {
            let raw = RawValue::from_toml(value).ok_or_else(|| {
                format!("setting '{key}' in profile '{name}' must be a string, number or boolean")
            })?;
            profile = profile.with_setting(key.clone(), raw);
        }
        profiles.push(profile);
    }

    ProfilesCollection::new(profiles, file.active.as_deref()).map_err(|e| match e {
        SettingsError::ProfileNotFound(name) => {
            format!("active profile '{name}' is not defined")
        }
        other => other.to_string(),
    })
}

/// Renders a collection to TOML text
fn render_profiles(collection: &ProfilesCollection) -> Result<String> {
    let mut file = ProfilesFile {
        active: collection.active_name().map(str::to_string),
        profiles: toml::Table::new(),
    };
    for profile in collection.iter() {
        let table: toml::Table = profile
            .settings()
            .iter()
            .map(|(key, raw)| (key.clone(), raw.to_toml()))
            .collect();
        file.profiles
            .insert(profile.name().to_string(), toml::Value::Table(table));
    }
    Ok(toml::to_string(&file)?)
}

fn write_atomic(collection: &ProfilesCollection, path: &Path) -> Result<()> {
    let contents = render_profiles(collection)?;
    let dir = parent_dir(path);

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(contents.as_bytes())
        .context("Failed to write profiles")?;
    temp.as_file()
        .sync_all()
        .context("Failed to flush profiles")?;
    temp.persist(path).map_err(|e| {
        SettingsError::Io(format!(
            "Failed to move profiles into place at {}: {}",
            path.display(),
            e.error
        ))
    })?;

    tracing::info!(
        path = %path.display(),
        profiles = collection.len(),
        active = ?collection.active_name(),
        "Saved profiles"
    );
    Ok(())
}

/// Runs `f` while holding the in-process save mutex and the file lock
fn with_save_lock<T>(path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = SAVE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let dir = parent_dir(path);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let lock_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to lock {}", lock_path.display()))?;

    // Lock released when lock_file drops
    f()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "profiles".into());
    name.push(".lock");
    path.with_file_name(name)
}

/// Handle on a profiles file
///
/// Bundles the path with load/save and a locked read-modify-write `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ProfilesCollection> {
        load_profiles(&self.path)
    }

    pub fn save(&self, collection: &ProfilesCollection) -> Result<()> {
        save_profiles(collection, &self.path)
    }

    /// Loads, mutates and saves under the save lock
    ///
    /// Nothing is written if `f` fails.
    pub fn update<T>(&self, f: impl FnOnce(&mut ProfilesCollection) -> Result<T>) -> Result<T> {
        with_save_lock(&self.path, || {
            let mut collection = load_profiles(&self.path)?;
            let output = f(&mut collection)?;
            write_atomic(&collection, &self.path)?;
            Ok(output)
        })
    }
}
