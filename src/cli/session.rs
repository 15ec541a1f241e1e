//! Inputs shared by every command

use crate::domain::{Result, SettingsError};
use crate::profiles::{ProfileStore, ProfilesCollection, DEFAULT_PROFILE};
use crate::settings::{resolve, EnvSnapshot, Overrides, Registry, SettingValue};
use std::path::Path;

/// Setting holding the location of the profiles file
pub const PROFILES_PATH_SETTING: &str = "PREFECT_PROFILES_PATH";

/// Registry, environment snapshot and store a command runs against
#[derive(Debug, Clone)]
pub struct Session {
    registry: Registry,
    env: EnvSnapshot,
    store: ProfileStore,
    profile: Option<String>,
}

impl Session {
    pub fn new(
        registry: Registry,
        env: EnvSnapshot,
        store: ProfileStore,
        profile: Option<String>,
    ) -> Self {
        Self {
            registry,
            env,
            store,
            profile,
        }
    }

    /// Locates the profiles file from defaults and the environment
    ///
    /// Only the variables `PREFECT_PROFILES_PATH` depends on are consulted, so
    /// an invalid value elsewhere does not prevent fixing it with `config unset`.
    pub fn discover(registry: Registry, env: EnvSnapshot, profile: Option<String>) -> Result<Self> {
        let path_env = env.only(&registry, &["PREFECT_HOME", PROFILES_PATH_SETTING]);
        let settings = resolve(
            &registry,
            &path_env,
            &ProfilesCollection::default(),
            None,
            &Overrides::new(),
        )?;
        let path = settings
            .value(PROFILES_PATH_SETTING)
            .and_then(SettingValue::as_path)
            .map(Path::to_path_buf)
            .ok_or_else(|| SettingsError::Other(format!("{PROFILES_PATH_SETTING} is not set")))?;

        tracing::debug!(path = %path.display(), "Using profiles file");
        Ok(Self::new(registry, env, ProfileStore::new(path), profile))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Profile named with `--profile`, if any
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Profile that `config set`/`unset` modify
    ///
    /// The `--profile` value, else the active profile, else `default`.
    pub fn target_profile(&self, profiles: &ProfilesCollection) -> String {
        self.profile
            .as_deref()
            .or_else(|| profiles.active_name())
            .unwrap_or(DEFAULT_PROFILE)
            .to_string()
    }

    /// Returns true if `key` is also provided by an environment variable
    pub fn env_binds(&self, key: &str) -> bool {
        self.registry
            .find(key)
            .is_some_and(|def| self.env.binds(def))
    }
}
