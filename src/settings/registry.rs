//! Definition registry
//!
//! The registry is the immutable catalog of known settings. It is built once at
//! process start (usually with [`Registry::builtin`]) and only read afterwards,
//! so it can be shared freely between threads.

use crate::domain::{Result, SettingsError};
use crate::settings::definition::{
    non_negative, positive, valid_port, SettingDefinition,
};
use crate::settings::value::{SettingValue, ValueKind};
use std::collections::HashMap;

/// Prefix shared by every built-in setting and its environment variable
pub const ENV_PREFIX: &str = "PREFECT_";

/// Levels accepted by the logging settings
pub const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Immutable catalog of setting definitions
#[derive(Debug, Clone)]
pub struct Registry {
    env_prefix: String,
    definitions: Vec<SettingDefinition>,
    /// Canonical names and aliases, exactly as defined, to definition index
    index: HashMap<String, usize>,
}

/// Builder for a [`Registry`]
#[derive(Debug)]
pub struct RegistryBuilder {
    env_prefix: String,
    definitions: Vec<SettingDefinition>,
}

impl RegistryBuilder {
    /// Adds a definition
    pub fn define(mut self, definition: SettingDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Freezes the definitions into a registry
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidRegistry`] if two definitions share a name,
    /// an alias collides with another name or alias, or a template default
    /// references an unknown setting.
    pub fn build(self) -> Result<Registry> {
        let mut definitions = self.definitions;
        let mut index = HashMap::new();

        for (i, def) in definitions.iter_mut().enumerate() {
            def.bind_env(&self.env_prefix);
            let keys = std::iter::once(def.name().to_string()).chain(def.aliases().iter().cloned());
            for key in keys {
                if index.insert(key.clone(), i).is_some() {
                    return Err(SettingsError::InvalidRegistry(format!(
                        "'{key}' is defined more than once"
                    )));
                }
            }
        }

        let registry = Registry {
            env_prefix: self.env_prefix,
            definitions,
            index,
        };

        for def in &registry.definitions {
            if let crate::settings::DefaultValue::Template(template) = def.default_value() {
                for reference in crate::settings::resolver::template_references(template) {
                    let known = registry
                        .find(&reference)
                        .is_some_and(|target| target.name() != def.name());
                    if !known {
                        return Err(SettingsError::InvalidRegistry(format!(
                            "template default of '{}' references unknown setting '{reference}'",
                            def.name()
                        )));
                    }
                }
            }
        }

        Ok(registry)
    }
}

impl Registry {
    /// Starts a registry whose environment bindings use `env_prefix`
    pub fn builder(env_prefix: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            env_prefix: env_prefix.into(),
            definitions: Vec::new(),
        }
    }

    /// Looks up a definition by canonical name or deprecated alias
    ///
    /// Names are case-sensitive. Alias lookups log a deprecation warning.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownSetting`] if the name is not registered.
    ///
    /// # Examples
    ///
    /// ```
    /// use prefect_settings::settings::Registry;
    ///
    /// let registry = Registry::builtin();
    /// let def = registry.lookup("PREFECT_LOGGING_LEVEL").unwrap();
    /// assert_eq!(def.env_var(), "PREFECT_LOGGING_LEVEL");
    /// assert!(registry.lookup("PREFECT_FOO").is_err());
    /// ```
    pub fn lookup(&self, name: &str) -> Result<&SettingDefinition> {
        let def = self
            .find(name)
            .ok_or_else(|| SettingsError::UnknownSetting(name.to_string()))?;
        if def.name() != name {
            tracing::warn!(
                alias = %name,
                setting = %def.name(),
                "Setting alias is deprecated, use the canonical name"
            );
        }
        Ok(def)
    }

    /// Looks up a definition without logging
    pub fn find(&self, name: &str) -> Option<&SettingDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.definitions[i])
    }

    /// Returns true if `name` is a canonical name or alias
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of the definition in registry order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &SettingDefinition> {
        self.definitions.iter()
    }

    /// Canonical names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(SettingDefinition::name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// The application's built-in settings catalog
    pub fn builtin() -> Self {
        builtin_builder()
            .build()
            .expect("built-in registry definitions are consistent")
    }
}

fn builtin_builder() -> RegistryBuilder {
    use ValueKind::{Boolean, Enumeration, Float, Integer, Path, Secret};

    Registry::builder(ENV_PREFIX)
        .define(
            SettingDefinition::new("PREFECT_HOME", Path)
                .with_template("~/.prefect")
                .with_description("Directory for local state, profiles and logs"),
        )
        .define(
            SettingDefinition::new("PREFECT_DEBUG_MODE", Boolean)
                .with_default(false)
                .with_description("Enable verbose behaviour useful for debugging"),
        )
        .define(
            SettingDefinition::new("PREFECT_TEST_MODE", Boolean)
                .with_default(false)
                .with_description("Run in test mode"),
        )
        .define(
            SettingDefinition::new("PREFECT_PROFILES_PATH", Path)
                .with_template("${PREFECT_HOME}/profiles.toml")
                .with_description("File holding the persisted profiles"),
        )
        .define(
            SettingDefinition::new("PREFECT_API_URL", ValueKind::String)
                .with_description("URL of the API the client talks to"),
        )
        .define(
            SettingDefinition::new("PREFECT_API_KEY", Secret)
                .with_description("API key used to authenticate against the API"),
        )
        .define(
            SettingDefinition::new("PREFECT_API_REQUEST_TIMEOUT", Float)
                .with_default(30.0)
                .with_validator(positive)
                .with_description("Seconds before an API request times out"),
        )
        .define(
            SettingDefinition::new("PREFECT_CLOUD_API_URL", ValueKind::String)
                .with_default("https://api.prefect.cloud/api")
                .with_alias("PREFECT_CLOUD_URL")
                .with_description("URL of the hosted API"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_LEVEL", Enumeration(LOG_LEVELS))
                .with_default(SettingValue::Enumeration("INFO".to_string()))
                .with_description("Default level for application loggers"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_SERVER_LEVEL", Enumeration(LOG_LEVELS))
                .with_default(SettingValue::Enumeration("WARNING".to_string()))
                .with_description("Level for server loggers"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_SETTINGS_PATH", Path)
                .with_template("${PREFECT_HOME}/logging.yml")
                .with_description("Logging configuration file"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_ORION_ENABLED", Boolean)
                .with_default(true)
                .with_description("Ship logs to the API"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_ORION_BATCH_INTERVAL", Float)
                .with_default(2.0)
                .with_validator(positive)
                .with_description("Seconds between log batch flushes"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_ORION_BATCH_SIZE", Integer)
                .with_default(4_000_000_i64)
                .with_validator(positive)
                .with_description("Maximum bytes per log batch"),
        )
        .define(
            SettingDefinition::new("PREFECT_LOGGING_ORION_MAX_LOG_SIZE", Integer)
                .with_default(1_000_000_i64)
                .with_validator(positive)
                .with_description("Maximum bytes of a single log record"),
        )
        .define(
            SettingDefinition::new("PREFECT_AGENT_QUERY_INTERVAL", Float)
                .with_default(5.0)
                .with_validator(positive)
                .with_description("Seconds between agent work queue polls"),
        )
        .define(
            SettingDefinition::new("PREFECT_AGENT_PREFETCH_SECONDS", Integer)
                .with_default(10_i64)
                .with_validator(non_negative)
                .with_description("Seconds of scheduled work an agent fetches ahead"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_DATABASE_CONNECTION_URL", Secret)
                .with_template("sqlite+aiosqlite:///${PREFECT_HOME}/orion.db")
                .with_description("Database connection URL, may embed credentials"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_DATABASE_ECHO", Boolean)
                .with_default(false)
                .with_description("Echo emitted SQL"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_DATABASE_TIMEOUT", Float)
                .with_default(1.0)
                .with_validator(positive)
                .with_description("Seconds a database statement may run"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_DATABASE_CONNECTION_TIMEOUT", Float)
                .with_default(5.0)
                .with_validator(positive)
                .with_description("Seconds to wait for a database connection"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_SERVICES_SCHEDULER_LOOP_SECONDS", Float)
                .with_default(60.0)
                .with_validator(positive)
                .with_description("Seconds between scheduler service runs"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_API_HOST", ValueKind::String)
                .with_default("127.0.0.1")
                .with_description("Host the API binds to"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_API_PORT", Integer)
                .with_default(4200_i64)
                .with_validator(valid_port)
                .with_description("Port the API binds to"),
        )
        .define(
            SettingDefinition::new("PREFECT_ORION_UI_ENABLED", Boolean)
                .with_default(true)
                .with_description("Serve the web UI"),
        )
}
