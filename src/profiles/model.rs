//! Profile model
//!
//! A [`Profile`] is a named set of raw setting overrides; a
//! [`ProfilesCollection`] is the ordered set of profiles plus the pointer to the
//! active one. Every mutating operation either succeeds completely or leaves
//! the collection untouched.

use crate::domain::{ProfileName, Result, SettingsError, ValidationErrors};
use crate::settings::{RawValue, Registry};
use std::collections::BTreeMap;

/// Name of the profile created when no profiles file exists
pub const DEFAULT_PROFILE: &str = "default";

/// A named set of setting overrides
///
/// Values are stored raw, exactly as the user supplied them; casting happens
/// during validation and resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: ProfileName,
    settings: BTreeMap<String, RawValue>,
}

impl Profile {
    /// Creates an empty profile
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidName`] for empty or padded names.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = ProfileName::new(name).map_err(SettingsError::InvalidName)?;
        Ok(Self::named(name))
    }

    /// Creates an empty profile from an already validated name
    pub fn named(name: ProfileName) -> Self {
        Self {
            name,
            settings: BTreeMap::new(),
        }
    }

    /// Adds a raw value without consulting a registry
    ///
    /// Used when rebuilding profiles from storage and in tests; registry-checked
    /// mutation goes through [`ProfilesCollection::update_settings`].
    pub fn with_setting(mut self, key: impl Into<String>, raw: impl Into<RawValue>) -> Self {
        self.settings.insert(key.into(), raw.into());
        self
    }

    /// Copy of this profile's settings under another name
    pub fn copy_as(&self, name: impl Into<String>) -> Result<Self> {
        let name = ProfileName::new(name).map_err(SettingsError::InvalidName)?;
        Ok(Self {
            name,
            settings: self.settings.clone(),
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn profile_name(&self) -> &ProfileName {
        &self.name
    }

    /// Stored raw values keyed by setting name
    pub fn settings(&self) -> &BTreeMap<String, RawValue> {
        &self.settings
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.settings.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Casts every stored value, reporting all failures together
    ///
    /// Unknown keys are reported as failures as well.
    pub fn validate_settings(&self, registry: &Registry) -> Result<()> {
        let mut failures = ValidationErrors::new();
        for (key, raw) in &self.settings {
            match registry.find(key) {
                Some(def) => {
                    if let Err(reason) = def.cast(raw) {
                        failures.push(def.name(), reason);
                    }
                }
                None => failures.push(key.as_str(), "unknown setting"),
            }
        }
        failures.into_result()
    }

    /// Stored key for a canonical setting, honouring deprecated aliases
    fn stored_key(&self, registry: &Registry, canonical: &str) -> Option<String> {
        if self.settings.contains_key(canonical) {
            return Some(canonical.to_string());
        }
        self.settings
            .keys()
            .find(|k| registry.find(k).is_some_and(|d| d.name() == canonical))
            .cloned()
    }
}

/// Changes applied by [`ProfilesCollection::update_settings`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    /// Canonical names and raw values that were stored
    pub set: Vec<(String, RawValue)>,
    /// Canonical names that were removed
    pub unset: Vec<String>,
}

/// Ordered set of profiles plus the active pointer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilesCollection {
    profiles: Vec<Profile>,
    active: Option<ProfileName>,
}

impl ProfilesCollection {
    /// Creates a collection, checking name uniqueness and the active pointer
    ///
    /// # Errors
    ///
    /// - [`SettingsError::DuplicateName`] if two profiles share a name
    /// - [`SettingsError::ProfileNotFound`] if `active` is not a member
    ///
    /// # Examples
    ///
    /// ```
    /// use prefect_settings::profiles::{Profile, ProfilesCollection};
    ///
    /// let foo = Profile::new("foo").unwrap();
    /// let collection = ProfilesCollection::new(vec![foo], None).unwrap();
    /// assert!(collection.active_name().is_none());
    /// assert!(ProfilesCollection::new(vec![], Some("foo")).is_err());
    /// ```
    pub fn new(profiles: Vec<Profile>, active: Option<&str>) -> Result<Self> {
        let mut collection = Self::default();
        for profile in profiles {
            collection.add(profile)?;
        }
        collection.set_active(active)?;
        Ok(collection)
    }

    /// Collection holding a single empty, active `default` profile
    pub fn with_default_profile() -> Self {
        let name = ProfileName::new(DEFAULT_PROFILE)
            .expect("default profile name is valid");
        Self {
            profiles: vec![Profile::named(name.clone())],
            active: Some(name),
        }
    }

    /// Profiles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    /// Profile names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(Profile::name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name() == name)
    }

    /// Looks up a profile, failing with [`SettingsError::ProfileNotFound`]
    pub fn require(&self, name: &str) -> Result<&Profile> {
        self.get(name)
            .ok_or_else(|| SettingsError::ProfileNotFound(name.to_string()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name() == name)
    }

    fn require_position(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| SettingsError::ProfileNotFound(name.to_string()))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(ProfileName::as_str)
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_name().and_then(|name| self.get(name))
    }

    /// Adds a profile at the end of the collection
    pub fn add(&mut self, profile: Profile) -> Result<()> {
        if self.contains(profile.name()) {
            return Err(SettingsError::DuplicateName(profile.name().to_string()));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Adds a profile after casting every stored value against `registry`
    ///
    /// # Errors
    ///
    /// [`SettingsError::Validation`] listing unknown keys and bad values, or
    /// [`SettingsError::DuplicateName`].
    pub fn add_checked(&mut self, registry: &Registry, profile: Profile) -> Result<()> {
        profile.validate_settings(registry)?;
        self.add(profile)
    }

    /// Removes a profile that is not active
    pub fn remove(&mut self, name: &str) -> Result<Profile> {
        let index = self.require_position(name)?;
        if self.active_name() == Some(name) {
            return Err(SettingsError::ActiveProfile(name.to_string()));
        }
        Ok(self.profiles.remove(index))
    }

    /// Renames a profile in place, keeping its position and the active pointer
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self.require_position(old)?;
        let new_name = ProfileName::new(new).map_err(SettingsError::InvalidName)?;
        if old == new {
            return Ok(());
        }
        if self.contains(new) {
            return Err(SettingsError::DuplicateName(new.to_string()));
        }
        if self.active_name() == Some(old) {
            self.active = Some(new_name.clone());
        }
        self.profiles[index].name = new_name;
        Ok(())
    }

    /// Points the active pointer at a member, or clears it with `None`
    pub fn set_active(&mut self, name: Option<&str>) -> Result<()> {
        self.active = match name {
            Some(name) => Some(self.require(name)?.name.clone()),
            None => None,
        };
        Ok(())
    }

    /// Stores a raw value for a known setting
    ///
    /// The value is stored under the canonical name and must cast successfully.
    pub fn set_setting(
        &mut self,
        registry: &Registry,
        profile: &str,
        key: &str,
        raw: impl Into<RawValue>,
    ) -> Result<()> {
        self.update_settings(registry, profile, &[(key.to_string(), raw.into())], &[])
            .map(|_| ())
    }

    /// Removes a stored value for a known setting
    pub fn unset_setting(&mut self, registry: &Registry, profile: &str, key: &str) -> Result<()> {
        self.update_settings(registry, profile, &[], &[key.to_string()])
            .map(|_| ())
    }

    /// Applies a batch of sets and unsets to one profile atomically
    ///
    /// Validation happens in this order, and the first failing stage aborts the
    /// whole batch with nothing applied:
    /// 1. the profile must exist
    /// 2. every key must be known ([`SettingsError::UnknownSetting`] names the
    ///    first unknown key as given)
    /// 3. every unset key must currently be stored ([`SettingsError::NotSet`])
    /// 4. every set value must cast and validate; all failures are reported
    ///    together as [`SettingsError::Validation`]
    pub fn update_settings(
        &mut self,
        registry: &Registry,
        profile: &str,
        sets: &[(String, RawValue)],
        unsets: &[String],
    ) -> Result<SettingsUpdate> {
        let index = self.require_position(profile)?;

        let set_defs = sets
            .iter()
            .map(|(key, raw)| registry.lookup(key).map(|def| (def, raw)))
            .collect::<Result<Vec<_>>>()?;
        let unset_defs = unsets
            .iter()
            .map(|key| registry.lookup(key))
            .collect::<Result<Vec<_>>>()?;

        let mut updated = self.profiles[index].clone();
        let mut applied = SettingsUpdate::default();

        for (def, key) in unset_defs.iter().zip(unsets) {
            let stored = updated
                .stored_key(registry, def.name())
                .ok_or_else(|| SettingsError::NotSet {
                    key: key.clone(),
                    profile: profile.to_string(),
                })?;
            updated.settings.remove(&stored);
            applied.unset.push(def.name().to_string());
        }

        let mut failures = ValidationErrors::new();
        for (def, raw) in &set_defs {
            if let Err(reason) = def.cast(raw) {
                failures.push(def.name(), reason);
            }
        }
        failures.into_result()?;

        for (def, raw) in set_defs {
            if let Some(stored) = updated.stored_key(registry, def.name()) {
                updated.settings.remove(&stored);
            }
            updated
                .settings
                .insert(def.name().to_string(), raw.clone());
            applied.set.push((def.name().to_string(), raw.clone()));
        }

        self.profiles[index] = updated;
        tracing::debug!(
            profile = %profile,
            set = applied.set.len(),
            unset = applied.unset.len(),
            "Updated profile settings"
        );
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> ProfilesCollection {
        ProfilesCollection::new(
            vec![
                Profile::new("default").unwrap(),
                Profile::new("foo")
                    .unwrap()
                    .with_setting("PREFECT_API_KEY", "FOO")
                    .with_setting("PREFECT_LOGGING_LEVEL", "DEBUG"),
            ],
            Some("default"),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = ProfilesCollection::new(
            vec![Profile::new("a").unwrap(), Profile::new("a").unwrap()],
            None,
        );
        assert!(matches!(result, Err(SettingsError::DuplicateName(ref n)) if n == "a"));
    }

    #[test]
    fn test_default_collection() {
        let collection = ProfilesCollection::with_default_profile();
        assert_eq!(collection.names().collect::<Vec<_>>(), ["default"]);
        assert_eq!(collection.active_name(), Some("default"));
        assert!(collection.active_profile().unwrap().is_empty());
    }

    #[test]
    fn test_add_duplicate_fails_without_mutation() {
        let mut collection = collection();
        let before = collection.clone();
        let err = collection.add(Profile::new("foo").unwrap()).unwrap_err();
        assert!(matches!(err, SettingsError::DuplicateName(_)));
        assert_eq!(collection, before);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut collection = collection();
        collection.add(Profile::new("bar").unwrap()).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), ["default", "foo", "bar"]);
    }

    #[test]
    fn test_add_checked_rejects_unknown_keys() {
        let registry = Registry::builtin();
        let mut collection = collection();
        let before = collection.clone();

        let stale = Profile::new("stale")
            .unwrap()
            .with_setting("PREFECT_FOO", "BAR")
            .with_setting("PREFECT_LOGGING_LEVEL", "DEBUG");
        match collection.add_checked(&registry, stale).unwrap_err() {
            SettingsError::Validation(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures.contains("PREFECT_FOO"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(collection, before);

        let good = Profile::new("good")
            .unwrap()
            .with_setting("PREFECT_LOGGING_LEVEL", "DEBUG");
        collection.add_checked(&registry, good).unwrap();
        assert!(collection.contains("good"));
    }

    #[test]
    fn test_remove() {
        let mut collection = collection();
        assert!(matches!(
            collection.remove("missing"),
            Err(SettingsError::ProfileNotFound(_))
        ));
        assert!(matches!(
            collection.remove("default"),
            Err(SettingsError::ActiveProfile(_))
        ));

        let removed = collection.remove("foo").unwrap();
        assert_eq!(removed.name(), "foo");
        assert!(!collection.contains("foo"));
    }

    #[test]
    fn test_rename_keeps_active_pointer() {
        let mut collection = collection();
        collection.rename("default", "main").unwrap();
        assert_eq!(collection.active_name(), Some("main"));
        assert_eq!(collection.names().collect::<Vec<_>>(), ["main", "foo"]);

        assert!(matches!(
            collection.rename("main", "foo"),
            Err(SettingsError::DuplicateName(_))
        ));
        assert!(matches!(
            collection.rename("nope", "other"),
            Err(SettingsError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_set_active() {
        let mut collection = collection();
        collection.set_active(Some("foo")).unwrap();
        assert_eq!(collection.active_name(), Some("foo"));

        assert!(collection.set_active(Some("missing")).is_err());
        assert_eq!(collection.active_name(), Some("foo"));

        collection.set_active(None).unwrap();
        assert!(collection.active_profile().is_none());
    }

    #[test]
    fn test_set_setting_unknown_key() {
        let registry = Registry::builtin();
        let mut collection = collection();
        let before = collection.clone();

        let err = collection
            .set_setting(&registry, "foo", "PREFECT_FOO", "BAR")
            .unwrap_err();
        assert!(matches!(err, SettingsError::UnknownSetting(ref k) if k == "PREFECT_FOO"));
        assert_eq!(collection, before);
    }

    #[test]
    fn test_unset_setting_not_set() {
        let registry = Registry::builtin();
        let mut collection = collection();

        let err = collection
            .unset_setting(&registry, "default", "PREFECT_API_KEY")
            .unwrap_err();
        assert!(matches!(err, SettingsError::NotSet { .. }));
    }

    #[test]
    fn test_unset_retains_other_keys() {
        let registry = Registry::builtin();
        let mut collection = collection();

        collection
            .unset_setting(&registry, "foo", "PREFECT_API_KEY")
            .unwrap();
        let foo = collection.get("foo").unwrap();
        assert_eq!(foo.settings().len(), 1);
        assert_eq!(foo.get("PREFECT_LOGGING_LEVEL"), Some(&RawValue::from("DEBUG")));
    }

    #[test]
    fn test_update_settings_is_atomic() {
        let registry = Registry::builtin();
        let mut collection = collection();
        let before = collection.clone();

        let err = collection
            .update_settings(
                &registry,
                "foo",
                &[
                    ("PREFECT_API_URL".to_string(), RawValue::from("http://x")),
                    ("PREFECT_ORION_DATABASE_TIMEOUT".to_string(), RawValue::from("HELLO")),
                    ("PREFECT_ORION_API_PORT".to_string(), RawValue::from("port")),
                ],
                &[],
            )
            .unwrap_err();

        match err {
            SettingsError::Validation(failures) => {
                assert_eq!(failures.len(), 2);
                assert!(failures.contains("PREFECT_ORION_DATABASE_TIMEOUT"));
                assert!(failures.contains("PREFECT_ORION_API_PORT"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(collection, before);
    }

    #[test]
    fn test_update_settings_alias_stored_canonically() {
        let registry = Registry::builtin();
        let mut collection = collection();

        let applied = collection
            .update_settings(
                &registry,
                "default",
                &[("PREFECT_CLOUD_URL".to_string(), RawValue::from("https://x"))],
                &[],
            )
            .unwrap();
        assert_eq!(applied.set[0].0, "PREFECT_CLOUD_API_URL");
        assert!(collection
            .get("default")
            .unwrap()
            .get("PREFECT_CLOUD_API_URL")
            .is_some());
    }

    #[test]
    fn test_unset_alias_key_stored_in_file() {
        let registry = Registry::builtin();
        let mut collection = ProfilesCollection::new(
            vec![Profile::new("old")
                .unwrap()
                .with_setting("PREFECT_CLOUD_URL", "https://legacy")],
            None,
        )
        .unwrap();

        collection
            .unset_setting(&registry, "old", "PREFECT_CLOUD_API_URL")
            .unwrap();
        assert!(collection.get("old").unwrap().is_empty());
    }

    #[test]
    fn test_validate_settings_collects_all() {
        let registry = Registry::builtin();
        let profile = Profile::new("bad")
            .unwrap()
            .with_setting("PREFECT_ORION_DATABASE_TIMEOUT", "HELLO")
            .with_setting("PREFECT_DEBUG_MODE", "sometimes")
            .with_setting("PREFECT_LOGGING_LEVEL", "DEBUG");

        match profile.validate_settings(&registry).unwrap_err() {
            SettingsError::Validation(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
