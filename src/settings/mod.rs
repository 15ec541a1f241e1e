//! Settings: definitions, typed values, resolution and the context stack.
//!
//! - [`registry`] - the immutable catalog of [`SettingDefinition`]s
//! - [`value`] - [`ValueKind`], [`SettingValue`] and the raw input form
//! - [`resolver`] - merges defaults, profiles, environment and overrides into
//!   a provenance-tagged [`Settings`] snapshot
//! - [`context`] - scoped activation of a snapshot per thread and per task

pub mod context;
pub mod definition;
pub mod registry;
pub mod resolver;
pub mod secret;
pub mod value;

pub use context::{
    current, enter, scope, temporary_settings, use_profile, ContextGuard, ContextHook,
    ContextRequest, Inheritance, NoopHook, SettingsContext, SettingsSources,
};
pub use definition::{env_var_name, DefaultValue, SettingDefinition, Validator};
pub use registry::{Registry, RegistryBuilder, ENV_PREFIX, LOG_LEVELS};
pub use resolver::{resolve, EnvSnapshot, Overrides, ResolvedSetting, Settings, Source};
pub use secret::{secret_string, SecretString, OBFUSCATED};
pub use value::{RawValue, SettingValue, ValueKind};
