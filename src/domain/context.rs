//! Error context extension trait
//!
//! This module provides a context extension trait similar to `anyhow::Context`
//! that works with `Result<T, SettingsError>`, so library code can attach context
//! without leaving the domain error type.
//!
//! # Examples
//!
//! ```rust
//! use prefect_settings::domain::Result;
//! use prefect_settings::domain::context::ResultExt;
//!
//! fn read_profiles(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_context(|| format!("Failed to read profiles file: {}", path))
//! }
//! ```

use crate::domain::errors::SettingsError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

/// Errors that already carry a precise kind (validation, not-found, parse
/// failures of the store) keep their variant; only plumbing errors are folded
/// into [`SettingsError::Other`] with the context prefixed.
impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SettingsError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

fn wrap(base: SettingsError, context: impl std::fmt::Display) -> SettingsError {
    match base {
        SettingsError::Io(_) | SettingsError::Serialization(_) | SettingsError::Other(_) => {
            SettingsError::Other(format!("{context}: {base}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_wraps_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let result: Result<()> = Err(io_error.into());
        let err = result.context("Failed to read profiles.toml").unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Failed to read profiles.toml"));
        assert!(msg.contains("File not found"));
    }

    #[test]
    fn test_context_keeps_domain_variants() {
        let result: Result<()> = Err(SettingsError::ProfileNotFound("foo".to_string()));
        let err = result.context("while switching profiles").unwrap_err();
        assert!(matches!(err, SettingsError::ProfileNotFound(ref name) if name == "foo"));
    }

    #[test]
    fn test_with_context_lazy_evaluation() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let result: Result<i32> = Ok(42);
        let with_context = result.with_context(|| {
            called_clone.store(true, Ordering::SeqCst);
            "Expensive context"
        });

        assert!(with_context.is_ok());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_context_chaining() {
        let result: Result<()> = Err(SettingsError::Io("disk full".to_string()));
        let err = result
            .context("Failed to write temporary file")
            .context("Failed to save profiles")
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Failed to save profiles"));
        assert!(msg.contains("Failed to write temporary file"));
        assert!(msg.contains("disk full"));
    }
}
