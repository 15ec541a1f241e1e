//! Secret setting values using the secrecy crate
//!
//! Values of [`ValueKind::Secret`](crate::settings::ValueKind::Secret) settings
//! (API keys, connection URLs with credentials) are held in a [`SecretString`]
//! so they are redacted from `Debug` output and zeroed when dropped. The only
//! way to read one is [`ExposeSecret::expose_secret`], which the store and the
//! `view --show-secrets` path call explicitly.
//!
//! # Example
//!
//! ```rust
//! use prefect_settings::settings::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_string("pnu_abc123".to_string());
//! assert_eq!(key.expose_secret().as_ref(), "pnu_abc123");
//! assert!(!format!("{key:?}").contains("pnu_abc123"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret};
use zeroize::Zeroize;

/// Placeholder shown instead of a secret value
pub const OBFUSCATED: &str = "********";

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Compares two secrets by their exposed contents
pub(crate) fn secrets_equal(a: &SecretString, b: &SecretString) -> bool {
    a.expose_secret().as_ref() == b.expose_secret().as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("test-password".to_string());
        assert_eq!(secret.expose_secret().as_ref(), "test-password");
        assert!(!secret.expose_secret().is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("sensitive-data"));
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_secrets_equal() {
        let a = secret_string("same".to_string());
        let b = secret_string("same".to_string());
        let c = secret_string("other".to_string());
        assert!(secrets_equal(&a, &b));
        assert!(!secrets_equal(&a, &c));
    }
}
