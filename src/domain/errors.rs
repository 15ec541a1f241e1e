//! Domain error types
//!
//! This module defines the error hierarchy for settings resolution and profile
//! management. All errors are domain-specific and don't expose third-party types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main settings error type
///
/// This is the primary error type used throughout the library. Every fallible
/// operation on the registry, the profile model, the store, the resolver and
/// the context stack reports one of these variants.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A profile with the same name already exists
    #[error("Profile '{0}' already exists")]
    DuplicateName(String),

    /// The profile name is empty or malformed
    #[error("Invalid profile name: {0}")]
    InvalidName(String),

    /// The named profile is not a member of the collection
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// The active profile cannot be removed
    #[error("Profile '{0}' is the active profile")]
    ActiveProfile(String),

    /// The setting name is not present in the registry
    #[error("Unknown setting name '{0}'")]
    UnknownSetting(String),

    /// One or more values failed to cast or validate
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A `KEY=VALUE` argument could not be split
    #[error("Failed to parse argument '{0}'")]
    ParseArgument(String),

    /// The setting is not stored in the profile
    #[error("'{key}' is not set in profile '{profile}'")]
    NotSet { key: String, profile: String },

    /// The persisted profiles file is corrupt
    #[error("Failed to parse profiles file {}: {reason}", path.display())]
    StoreParse { path: PathBuf, reason: String },

    /// No settings context has been entered on this thread or task
    #[error("No settings context is active")]
    NoActiveContext,

    /// The registry definitions are inconsistent
    #[error("Invalid registry: {0}")]
    InvalidRegistry(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Logging setup errors
    #[error("Logging error: {0}")]
    Logging(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// A single cast or validation failure for one setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Canonical setting name
    pub name: String,

    /// Human-readable reason, e.g. `value is not a valid float`
    pub reason: String,
}

impl ValidationFailure {
    /// Creates a new failure record
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation error for setting '{}': {}",
            self.name, self.reason
        )
    }
}

/// Aggregated cast/validation failures
///
/// Collects every offending `(name, reason)` pair instead of stopping at the
/// first bad key. Failures keep the order in which they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    failures: Vec<ValidationFailure>,
}

impl ValidationErrors {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure
    pub fn push(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(ValidationFailure::new(name, reason));
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Recorded failures in insertion order
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Returns true if a failure was recorded for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.failures.iter().any(|f| f.name == name)
    }

    /// Converts the collector into `Ok(())` when empty, or a
    /// [`SettingsError::Validation`] otherwise
    pub fn into_result(self) -> Result<(), SettingsError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SettingsError {
    fn from(err: std::io::Error) -> Self {
        SettingsError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Serialization(err.to_string())
    }
}

// Conversion from toml serialization errors
impl From<toml::ser::Error> for SettingsError {
    fn from(err: toml::ser::Error) -> Self {
        SettingsError::Serialization(format!("TOML serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_error_display() {
        let err = SettingsError::UnknownSetting("PREFECT_FOO".to_string());
        assert_eq!(err.to_string(), "Unknown setting name 'PREFECT_FOO'");

        let err = SettingsError::NotSet {
            key: "PREFECT_API_KEY".to_string(),
            profile: "foo".to_string(),
        };
        assert_eq!(err.to_string(), "'PREFECT_API_KEY' is not set in profile 'foo'");
    }

    #[test]
    fn test_store_parse_display_includes_path() {
        let err = SettingsError::StoreParse {
            path: PathBuf::from("/tmp/profiles.toml"),
            reason: "expected a table".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/profiles.toml"));
        assert!(msg.contains("expected a table"));
    }

    #[test]
    fn test_validation_errors_aggregate() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.push("PREFECT_ORION_DATABASE_TIMEOUT", "value is not a valid float");
        errors.push("PREFECT_ORION_API_PORT", "value is not a valid integer");

        assert_eq!(errors.len(), 2);
        assert!(errors.contains("PREFECT_ORION_API_PORT"));
        assert_eq!(
            errors.to_string(),
            "Validation error for setting 'PREFECT_ORION_DATABASE_TIMEOUT': value is not a valid float\n\
             Validation error for setting 'PREFECT_ORION_API_PORT': value is not a valid integer"
        );

        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, SettingsError::Validation(ref v) if v.len() == 2));
    }

    #[test]
    fn test_empty_validation_errors_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SettingsError = io_err.into();
        assert!(matches!(err, SettingsError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: SettingsError = json_err.into();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }

    #[test]
    fn test_settings_error_implements_std_error() {
        let err = SettingsError::NoActiveContext;
        let _: &dyn std::error::Error = &err;
    }
}
