//! Structured logging setup using tracing
//!
//! Logs go to stderr, human-readable or JSON, so command output on stdout
//! stays clean. The level filter sits behind a reload layer: [`set_level`] and
//! the [`LoggingHook`] change it while the program runs.
//!
//! # Example
//!
//! ```no_run
//! use prefect_settings::logging::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

use crate::domain::{Result, SettingsError};
use crate::settings::{ContextHook, SettingsContext, Source};
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Setting that drives the level on context entry
pub const LOGGING_LEVEL_SETTING: &str = "PREFECT_LOGGING_LEVEL";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Logging options of the binary itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level name, `tracing` (`warn`) or setting style (`WARNING`)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

/// Initialize the logging system
///
/// `RUST_LOG`, when set, replaces the configured level.
///
/// # Errors
///
/// Returns [`SettingsError::Logging`] for an unknown level or when a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));
    let (filter, handle) = reload::Layer::new(env_filter);

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| SettingsError::Logging(format!("Failed to install subscriber: {e}")))?;

    // A second init fails above, so the handle is only ever set once
    let _ = FILTER_HANDLE.set(handle);

    tracing::debug!(level = %level, json = config.json, "Logging initialized");
    Ok(())
}

/// Changes the active level
///
/// Does nothing when logging was not initialized.
///
/// # Errors
///
/// Returns [`SettingsError::Logging`] for an unknown level or a failed reload.
pub fn set_level(level: &str) -> Result<()> {
    let level = parse_log_level(level)?;
    let Some(handle) = FILTER_HANDLE.get() else {
        return Ok(());
    };
    handle
        .reload(EnvFilter::new(filter_directive(level)))
        .map_err(|e| SettingsError::Logging(format!("Failed to reload log level: {e}")))
}

/// Parses a level name
///
/// Accepts the `tracing` names and the setting names; `WARNING` maps to
/// `warn` and `CRITICAL` to `error`.
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => Err(SettingsError::Logging(format!(
            "Invalid log level: {level_str}. Must be one of: trace, debug, info, warning, error, critical"
        ))),
    }
}

fn filter_directive(level: Level) -> String {
    level.to_string().to_lowercase()
}

/// Returns true unless the level was pinned by `--log-level` or `RUST_LOG`
pub fn level_follows_settings(cli_level: Option<&str>, rust_log: Option<&str>) -> bool {
    cli_level.is_none() && rust_log.map_or(true, |value| value.trim().is_empty())
}

/// Applies `PREFECT_LOGGING_LEVEL` of each entered frame
///
/// Only a level that some layer actually set is applied; a frame carrying the
/// registry default falls back to the level logging was initialized with. On
/// exit the level of the frame that becomes visible again is restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingHook {
    base_level: String,
}

impl LoggingHook {
    pub fn new(base_level: impl Into<String>) -> Self {
        Self {
            base_level: base_level.into(),
        }
    }

    /// Level to apply while `context` is current
    pub fn level_for<'a>(&'a self, context: &'a SettingsContext) -> &'a str {
        context
            .settings()
            .get(LOGGING_LEVEL_SETTING)
            .filter(|entry| entry.source != Source::Default)
            .and_then(|entry| entry.value.as_ref())
            .and_then(|value| value.as_str())
            .unwrap_or(self.base_level.as_str())
    }
}

impl ContextHook for LoggingHook {
    fn on_enter(&self, context: &SettingsContext) -> Result<()> {
        set_level(self.level_for(context))
    }

    fn on_exit(&self, restored: Option<&SettingsContext>) -> Result<()> {
        match restored {
            Some(context) => set_level(self.level_for(context)),
            None => set_level(&self.base_level),
        }
    }
}
