//! Domain identifier types with validation
//!
//! Newtype wrappers for names that cross the persistence boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Profile name newtype wrapper
///
/// Profile names are used as TOML table keys and as command arguments, so
/// they must be non-empty and carry no leading or trailing whitespace.
///
/// # Examples
///
/// ```
/// use prefect_settings::domain::ids::ProfileName;
/// use std::str::FromStr;
///
/// let name = ProfileName::from_str("dev").unwrap();
/// assert_eq!(name.as_str(), "dev");
/// assert!(ProfileName::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileName(String);

impl ProfileName {
    /// Creates a new ProfileName from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(ProfileName)` if the name is valid, `Err` otherwise
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Profile name cannot be empty".to_string());
        }
        if name.trim() != name {
            return Err(format!(
                "Profile name '{name}' cannot start or end with whitespace"
            ));
        }
        if name.chars().any(char::is_control) {
            return Err(format!("Profile name '{}' contains control characters", name.escape_debug()));
        }
        Ok(Self(name))
    }

    /// Returns the profile name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProfileName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProfileName> for String {
    fn from(name: ProfileName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProfileName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProfileName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
