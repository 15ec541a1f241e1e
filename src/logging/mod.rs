//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - human-readable or JSON-formatted logs on stderr
//! - a level that follows `PREFECT_LOGGING_LEVEL` of the current settings frame
//!
//! # Example
//!
//! ```no_run
//! use prefect_settings::logging::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{
    init_logging, level_follows_settings, parse_log_level, set_level, LoggingConfig, LoggingHook,
};

/// Log a change made to a stored profile
///
/// # Example
///
/// ```no_run
/// use prefect_settings::log_profile_change;
///
/// log_profile_change!("set", "default", 2);
/// ```
#[macro_export]
macro_rules! log_profile_change {
    ($action:expr, $profile:expr, $count:expr) => {
        tracing::info!(
            action = $action,
            profile = %$profile,
            count = $count,
            "Profile updated"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use prefect_settings::log_error_with_context;
/// use prefect_settings::domain::SettingsError;
///
/// let error = SettingsError::ProfileNotFound("dev".to_string());
/// log_error_with_context!(&error, "Failed to switch profile");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
