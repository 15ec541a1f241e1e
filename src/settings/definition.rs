//! Setting definitions
//!
//! A [`SettingDefinition`] is the static metadata for one setting: its name,
//! value kind, default, optional validator, environment binding and
//! deprecated aliases. Definitions are assembled with [`SettingDefinition::new`]
//! and the builder-style `with_*` methods, then frozen inside a
//! [`Registry`](crate::settings::Registry).

use crate::settings::value::{RawValue, SettingValue, ValueKind};
use std::fmt;

/// Validator applied after a successful cast; returns the failure reason
pub type Validator = fn(&SettingValue) -> Result<(), String>;

/// Default value of a setting
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Optional setting with no value unless a layer provides one
    Unset,
    /// Fixed default
    Value(SettingValue),
    /// Default produced from other settings, e.g. `${PREFECT_HOME}/profiles.toml`
    ///
    /// Placeholders are replaced by the rendered, fully resolved value of the
    /// referenced setting; the result is cast with the definition's kind.
    Template(&'static str),
}

/// Static metadata describing one setting
#[derive(Clone)]
pub struct SettingDefinition {
    name: String,
    kind: ValueKind,
    default: DefaultValue,
    validator: Option<Validator>,
    aliases: Vec<String>,
    description: &'static str,
    env_var: String,
}

impl SettingDefinition {
    /// Creates a definition with no default, validator or aliases
    ///
    /// The environment variable defaults to the uppercase name; the registry
    /// rebinds it to its prefix when the definition is registered.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        let env_var = name.to_uppercase();
        Self {
            name,
            kind,
            default: DefaultValue::Unset,
            validator: None,
            aliases: Vec::new(),
            description: "",
            env_var,
        }
    }

    /// Sets a fixed default value
    pub fn with_default(mut self, value: impl Into<SettingValue>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Sets a template default (`${OTHER_SETTING}` placeholders)
    pub fn with_template(mut self, template: &'static str) -> Self {
        self.default = DefaultValue::Template(template);
        self
    }

    /// Sets a validator run on every cast value
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Adds a deprecated alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the one-line description
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub(crate) fn bind_env(&mut self, prefix: &str) {
        self.env_var = env_var_name(prefix, &self.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Environment variable bound to this setting
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Environment variables bound to the deprecated aliases
    pub fn alias_env_vars(&self) -> impl Iterator<Item = String> + '_ {
        self.aliases.iter().map(|a| a.to_uppercase())
    }

    /// Casts a raw value and runs the validator
    ///
    /// This is the single entry point used by the resolver, the profile model and
    /// the command handlers.
    pub fn cast(&self, raw: &RawValue) -> Result<SettingValue, String> {
        let value = self.kind.cast(raw)?;
        self.validate(&value)?;
        Ok(value)
    }

    /// Checks an already-typed value against the kind and validator
    pub fn validate(&self, value: &SettingValue) -> Result<(), String> {
        if !self.kind.accepts(value) {
            return Err(format!("value is not a valid {}", self.kind));
        }
        match self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SettingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("has_validator", &self.validator.is_some())
            .field("aliases", &self.aliases)
            .field("env_var", &self.env_var)
            .finish()
    }
}

/// Derives the environment variable for a setting name
///
/// Names that already carry the prefix map to themselves (uppercased); other
/// names get the prefix prepended.
///
/// ```
/// use prefect_settings::settings::definition::env_var_name;
///
/// assert_eq!(env_var_name("PREFECT_", "PREFECT_API_KEY"), "PREFECT_API_KEY");
/// assert_eq!(env_var_name("PREFECT_", "api_key"), "PREFECT_API_KEY");
/// ```
pub fn env_var_name(prefix: &str, name: &str) -> String {
    let upper = name.to_uppercase();
    if prefix.is_empty() || upper.starts_with(&prefix.to_uppercase()) {
        upper
    } else {
        format!("{}{}", prefix.to_uppercase(), upper)
    }
}

/// Validator: integer within `1..=65535`
pub fn valid_port(value: &SettingValue) -> Result<(), String> {
    match value.as_i64() {
        Some(port) if (1..=65535).contains(&port) => Ok(()),
        _ => Err("value must be a port number between 1 and 65535".to_string()),
    }
}

/// Validator: strictly positive number
pub fn positive(value: &SettingValue) -> Result<(), String> {
    match value.as_f64() {
        Some(n) if n > 0.0 => Ok(()),
        _ => Err("value must be greater than 0".to_string()),
    }
}

/// Validator: zero or greater
pub fn non_negative(value: &SettingValue) -> Result<(), String> {
    match value.as_f64() {
        Some(n) if n >= 0.0 => Ok(()),
        _ => Err("value must be greater than or equal to 0".to_string()),
    }
}
