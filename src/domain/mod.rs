//! Domain types shared by every layer of the crate.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ProfileName`])
//! - **Error types** ([`SettingsError`], [`ValidationErrors`])
//! - **Result type alias** ([`Result`])
//! - **Error context** ([`ResultExt`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SettingsError>`]. Cast and
//! validation problems are never raised one at a time: they are collected into
//! [`ValidationErrors`] and reported together.
//!
//! ```rust
//! use prefect_settings::domain::{SettingsError, ValidationErrors};
//!
//! let mut errors = ValidationErrors::new();
//! errors.push("PREFECT_ORION_API_PORT", "value is not a valid integer");
//! let err = errors.into_result().unwrap_err();
//! assert!(matches!(err, SettingsError::Validation(_)));
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use context::ResultExt;
pub use errors::{SettingsError, ValidationErrors, ValidationFailure};
pub use ids::ProfileName;
pub use result::Result;
