//! Settings resolver
//!
//! [`resolve`] merges four layers into a provenance-tagged [`Settings`]
//! snapshot. For every definition, in registry order:
//!
//! 1. the default, tagged [`Source::Default`]
//! 2. the selected profile's raw value, tagged [`Source::Profile`]
//! 3. the environment variable (then deprecated alias variables), tagged
//!    [`Source::Environment`]
//! 4. an already-typed override, tagged [`Source::Override`]
//!
//! A variable present in the environment always outranks the profile, which is
//! why `config unset` warns when a key is also set there.
//!
//! Later layers replace earlier ones. Template defaults are expanded last, from
//! the fully resolved values they reference. Resolution is a pure function of
//! its inputs: it reads no process state and mutates nothing, so it may run
//! concurrently from any number of threads.

use crate::domain::{Result, SettingsError, ValidationErrors};
use crate::profiles::{Profile, ProfilesCollection};
use crate::settings::definition::{DefaultValue, SettingDefinition};
use crate::settings::registry::Registry;
use crate::settings::value::{RawValue, SettingValue};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// Already-typed overrides keyed by setting name
pub type Overrides = BTreeMap<String, SettingValue>;

/// Layer that produced a resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Default,
    Environment,
    Profile,
    Override,
}

impl Source {
    /// Marker appended by `config view`
    pub fn marker(&self) -> &'static str {
        match self {
            Source::Default => "(from defaults)",
            Source::Environment => "(from env)",
            Source::Profile => "(from profile)",
            Source::Override => "(from override)",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Default => "default",
            Source::Environment => "environment",
            Source::Profile => "profile",
            Source::Override => "override",
        };
        f.write_str(name)
    }
}

/// One resolved setting with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSetting {
    pub name: String,
    /// `None` for optional settings no layer provided
    pub value: Option<SettingValue>,
    pub source: Source,
}

impl ResolvedSetting {
    /// Display form: secrets obfuscated unless `reveal`, missing values as `None`
    pub fn display_value(&self, reveal: bool) -> String {
        self.value
            .as_ref()
            .map_or_else(|| "None".to_string(), |v| v.display(reveal))
    }
}

/// Snapshot of the effective configuration
///
/// Holds exactly one [`ResolvedSetting`] per registry definition, iterated in
/// registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    entries: Vec<ResolvedSetting>,
    index: HashMap<String, usize>,
}

impl Settings {
    fn from_entries(entries: Vec<ResolvedSetting>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self { entries, index }
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedSetting> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Resolved value of a setting, `None` if unknown or unset
    pub fn value(&self, name: &str) -> Option<&SettingValue> {
        self.get(name).and_then(|e| e.value.as_ref())
    }

    pub fn source(&self, name: &str) -> Option<Source> {
        self.get(name).map(|e| e.source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedSetting> {
        self.entries.iter()
    }

    /// Entries whose value came from a layer other than the defaults
    pub fn non_default(&self) -> impl Iterator<Item = &ResolvedSetting> {
        self.entries.iter().filter(|e| e.source != Source::Default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layers overrides on top of this snapshot without re-resolving
    ///
    /// Other entries, including template defaults, keep their resolved values.
    ///
    /// # Errors
    ///
    /// [`SettingsError::UnknownSetting`] for an override key not in `registry`;
    /// [`SettingsError::Validation`] listing every override that does not fit
    /// its definition.
    pub fn layer(&self, registry: &Registry, overrides: &Overrides) -> Result<Settings> {
        let overrides = canonical_overrides(registry, overrides)?;
        let mut failures = ValidationErrors::new();
        let mut entries = self.entries.clone();

        for entry in &mut entries {
            let Some(def) = registry.find(&entry.name) else {
                continue;
            };
            if let Some(value) = overrides.get(def.name()) {
                match def.validate(value) {
                    Ok(()) => {
                        entry.value = Some((*value).clone());
                        entry.source = Source::Override;
                    }
                    Err(reason) => failures.push(def.name(), reason),
                }
            }
        }

        failures.into_result()?;
        Ok(Settings::from_entries(entries))
    }

    /// Layers a profile's stored values on top of this snapshot
    ///
    /// Only entries still at their default or taken from another profile are
    /// replaced, so environment and override values keep their precedence.
    /// Unknown keys are skipped with a warning as in [`resolve`].
    ///
    /// # Errors
    ///
    /// [`SettingsError::Validation`] listing every stored value that fails to cast.
    pub fn layer_profile(&self, registry: &Registry, profile: &Profile) -> Result<Settings> {
        let values = canonical_profile_values(registry, profile);
        let mut failures = ValidationErrors::new();
        let mut entries = self.entries.clone();

        for entry in &mut entries {
            if !matches!(entry.source, Source::Default | Source::Profile) {
                continue;
            }
            let (Some(def), Some(raw)) = (registry.find(&entry.name), values.get(&entry.name))
            else {
                continue;
            };
            match def.cast(raw) {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.source = Source::Profile;
                }
                Err(reason) => failures.push(def.name(), reason),
            }
        }

        failures.into_result()?;
        Ok(Settings::from_entries(entries))
    }
}

/// Snapshot of the environment variables relevant to resolution
///
/// Resolution never reads the process environment directly; callers capture a
/// snapshot once and pass it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures process variables whose name starts with `prefix`
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn from_process(prefix: &str) -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        Self { vars }
    }

    /// Builds a snapshot from explicit pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Snapshot restricted to the variables bound to `names`, aliases included
    pub fn only(&self, registry: &Registry, names: &[&str]) -> EnvSnapshot {
        let keep: Vec<String> = names
            .iter()
            .filter_map(|name| registry.find(name))
            .flat_map(|def| std::iter::once(def.env_var().to_string()).chain(def.alias_env_vars()))
            .collect();
        Self {
            vars: self
                .vars
                .iter()
                .filter(|(k, _)| keep.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Returns true if the setting's variable or one of its alias variables is set
    pub fn binds(&self, def: &SettingDefinition) -> bool {
        self.lookup(def).is_some()
    }

    /// Value bound to a definition: the canonical variable, then aliases
    fn lookup(&self, def: &SettingDefinition) -> Option<&str> {
        self.get(def.env_var())
            .or_else(|| def.alias_env_vars().find_map(|alias| self.get(&alias)))
    }
}

/// Resolves the effective settings
///
/// `profile_override` selects a profile by name, falling back to the
/// collection's active profile; with neither, the profile layer is skipped.
///
/// # Errors
///
/// - [`SettingsError::ProfileNotFound`] if `profile_override` names no member
/// - [`SettingsError::UnknownSetting`] if an override key is not registered
/// - [`SettingsError::Validation`] listing every environment, profile or
///   override value that failed to cast or validate
///
/// # Examples
///
/// ```
/// use prefect_settings::profiles::{Profile, ProfilesCollection};
/// use prefect_settings::settings::{resolve, EnvSnapshot, Overrides, Registry, Source};
///
/// let registry = Registry::builtin();
/// let profiles = ProfilesCollection::new(
///     vec![Profile::new("dev").unwrap().with_setting("PREFECT_LOGGING_LEVEL", "DEBUG")],
///     Some("dev"),
/// ).unwrap();
/// let env = EnvSnapshot::from_pairs([("PREFECT_LOGGING_LEVEL", "ERROR")]);
///
/// let settings = resolve(&registry, &env, &profiles, None, &Overrides::new()).unwrap();
/// let level = settings.get("PREFECT_LOGGING_LEVEL").unwrap();
/// assert_eq!(level.source, Source::Environment);
/// assert_eq!(level.display_value(false), "ERROR");
/// ```
pub fn resolve(
    registry: &Registry,
    env: &EnvSnapshot,
    profiles: &ProfilesCollection,
    profile_override: Option<&str>,
    overrides: &Overrides,
) -> Result<Settings> {
    let profile = select_profile(profiles, profile_override)?;
    let overrides = canonical_overrides(registry, overrides)?;
    let profile_values = profile
        .map(|p| canonical_profile_values(registry, p))
        .unwrap_or_default();

    let mut failures = ValidationErrors::new();
    let mut entries = Vec::with_capacity(registry.len());

    for def in registry.iter() {
        let mut entry = ResolvedSetting {
            name: def.name().to_string(),
            value: match def.default_value() {
                DefaultValue::Value(value) => Some(value.clone()),
                DefaultValue::Unset | DefaultValue::Template(_) => None,
            },
            source: Source::Default,
        };

        if let Some(raw) = profile_values.get(def.name()) {
            match def.cast(raw) {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.source = Source::Profile;
                }
                Err(reason) => failures.push(def.name(), reason),
            }
        }

        if let Some(text) = env.lookup(def) {
            match def.cast(&RawValue::Text(text.to_string())) {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.source = Source::Environment;
                }
                Err(reason) => failures.push(def.name(), reason),
            }
        }

        if let Some(value) = overrides.get(def.name()) {
            match def.validate(value) {
                Ok(()) => {
                    entry.value = Some((*value).clone());
                    entry.source = Source::Override;
                }
                Err(reason) => failures.push(def.name(), reason),
            }
        }

        entries.push(entry);
    }

    failures.into_result()?;
    expand_templates(registry, &mut entries)?;

    tracing::debug!(
        profile = ?profile.map(Profile::name),
        overrides = overrides.len(),
        non_default = entries.iter().filter(|e| e.source != Source::Default).count(),
        "Resolved settings"
    );
    Ok(Settings::from_entries(entries))
}

fn select_profile<'a>(
    profiles: &'a ProfilesCollection,
    profile_override: Option<&str>,
) -> Result<Option<&'a Profile>> {
    match profile_override {
        Some(name) => profiles.require(name).map(Some),
        None => Ok(profiles.active_profile()),
    }
}

/// Maps override keys (names or aliases) to their canonical name
fn canonical_overrides<'a>(
    registry: &Registry,
    overrides: &'a Overrides,
) -> Result<HashMap<String, &'a SettingValue>> {
    overrides
        .iter()
        .map(|(key, value)| {
            registry
                .lookup(key)
                .map(|def| (def.name().to_string(), value))
        })
        .collect()
}

/// Maps stored profile keys to canonical names; canonical keys win over aliases
fn canonical_profile_values<'a>(
    registry: &Registry,
    profile: &'a Profile,
) -> HashMap<String, &'a RawValue> {
    let mut values = HashMap::new();
    for (key, raw) in profile.settings() {
        match registry.find(key) {
            Some(def) if def.name() == key => {
                values.insert(def.name().to_string(), raw);
            }
            Some(def) => {
                tracing::warn!(
                    profile = %profile.name(),
                    alias = %key,
                    setting = %def.name(),
                    "Profile uses a deprecated setting alias"
                );
                values.entry(def.name().to_string()).or_insert(raw);
            }
            None => {
                tracing::warn!(
                    profile = %profile.name(),
                    key = %key,
                    "Ignoring unknown setting in profile"
                );
            }
        }
    }
    values
}

fn template_regex() -> &'static Regex {
    static TEMPLATE: OnceLock<Regex> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("template pattern is valid")
    })
}

/// Setting names referenced by `${NAME}` placeholders in a template
pub(crate) fn template_references(template: &str) -> Vec<String> {
    template_regex()
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Fills template defaults, in dependency order, for entries still at default
fn expand_templates(registry: &Registry, entries: &mut [ResolvedSetting]) -> Result<()> {
    let defs: Vec<&SettingDefinition> = registry.iter().collect();
    let mut pending: Vec<usize> = defs
        .iter()
        .enumerate()
        .filter(|&(i, def)| entries[i].source == Source::Default && template_of(def).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut failures = ValidationErrors::new();
    while !pending.is_empty() {
        let ready: Vec<usize> = pending
            .iter()
            .copied()
            .filter(|&i| {
                template_of(defs[i]).is_some_and(|t| {
                    template_references(t)
                        .iter()
                        .all(|r| registry.position(r).is_some_and(|p| !pending.contains(&p)))
                })
            })
            .collect();

        if ready.is_empty() {
            let names: Vec<&str> = pending.iter().map(|&i| defs[i].name()).collect();
            return Err(SettingsError::InvalidRegistry(format!(
                "template defaults reference each other: {}",
                names.join(", ")
            )));
        }

        for &i in &ready {
            let Some(template) = template_of(defs[i]) else {
                continue;
            };
            let text = template_regex().replace_all(template, |cap: &regex::Captures<'_>| {
                registry
                    .position(&cap[1])
                    .and_then(|p| entries[p].value.as_ref())
                    .map(SettingValue::render)
                    .unwrap_or_default()
            });
            match defs[i].cast(&RawValue::Text(text.into_owned())) {
                Ok(value) => entries[i].value = Some(value),
                Err(reason) => failures.push(defs[i].name(), reason),
            }
        }
        pending.retain(|i| !ready.contains(i));
    }

    failures.into_result()
}

fn template_of(def: &SettingDefinition) -> Option<&'static str> {
    match def.default_value() {
        DefaultValue::Template(template) => Some(template),
        _ => None,
    }
}
