//! Result type alias for settings operations
//!
//! This module provides a convenient Result type alias that uses SettingsError
//! as the error type.

use super::errors::SettingsError;

/// Result type alias for settings operations
///
/// # Examples
///
/// ```
/// use prefect_settings::domain::result::Result;
/// use prefect_settings::domain::errors::SettingsError;
///
/// fn lookup_profile() -> Result<String> {
///     Ok("default".to_string())
/// }
///
/// fn failing_lookup() -> Result<()> {
///     Err(SettingsError::ProfileNotFound("missing".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SettingsError>;
