//! Typed setting values
//!
//! Every setting is declared with a [`ValueKind`]. Raw values supplied by users
//! (environment variables, profile files, `config set` arguments) are turned into
//! a [`SettingValue`] by [`ValueKind::cast`], and every value is turned back into
//! its canonical text by [`SettingValue::render`]. The two are inverse: casting
//! the rendered form of a value yields the same value, so the profile file and
//! `config view` share one representation.

use crate::settings::secret::{secret_string, secrets_equal, SecretString};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Value kind of a setting definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// `true`/`false` (also accepts 1/0, yes/no, on/off)
    Boolean,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// Free text
    String,
    /// Filesystem path, `~` expanded to the home directory
    Path,
    /// One of a fixed set of members, matched case-insensitively
    Enumeration(&'static [&'static str]),
    /// Free text that must not be echoed by default
    Secret,
}

impl ValueKind {
    /// Short name used in messages and JSON output
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Path => "path",
            ValueKind::Enumeration(_) => "enumeration",
            ValueKind::Secret => "secret",
        }
    }

    /// Casts a raw value to this kind
    ///
    /// # Errors
    ///
    /// Returns the human-readable reason when the raw value does not fit the kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use prefect_settings::settings::{RawValue, SettingValue, ValueKind};
    ///
    /// let value = ValueKind::Float.cast(&RawValue::from("2")).unwrap();
    /// assert_eq!(value, SettingValue::Float(2.0));
    /// assert_eq!(value.render(), "2.0");
    ///
    /// let err = ValueKind::Float.cast(&RawValue::from("HELLO")).unwrap_err();
    /// assert_eq!(err, "value is not a valid float");
    /// ```
    pub fn cast(&self, raw: &RawValue) -> Result<SettingValue, String> {
        match self {
            ValueKind::Boolean => match raw {
                RawValue::Boolean(b) => Ok(SettingValue::Boolean(*b)),
                RawValue::Integer(0) => Ok(SettingValue::Boolean(false)),
                RawValue::Integer(1) => Ok(SettingValue::Boolean(true)),
                RawValue::Text(s) => parse_bool(s).map(SettingValue::Boolean),
                _ => Err(BOOL_REASON.to_string()),
            },
            ValueKind::Integer => match raw {
                RawValue::Integer(i) => Ok(SettingValue::Integer(*i)),
                // 2^63 itself is out of range; `as` would saturate it
                RawValue::Float(f)
                    if f.fract() == 0.0 && (I64_MIN_F64..I64_BOUND_F64).contains(f) =>
                {
                    Ok(SettingValue::Integer(*f as i64))
                }
                RawValue::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(SettingValue::Integer)
                    .map_err(|_| INT_REASON.to_string()),
                _ => Err(INT_REASON.to_string()),
            },
            ValueKind::Float => match raw {
                RawValue::Float(f) => Ok(SettingValue::Float(*f)),
                RawValue::Integer(i) => Ok(SettingValue::Float(*i as f64)),
                RawValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(SettingValue::Float)
                    .ok_or_else(|| FLOAT_REASON.to_string()),
                RawValue::Boolean(_) => Err(FLOAT_REASON.to_string()),
            },
            ValueKind::String => Ok(SettingValue::String(raw.to_text())),
            ValueKind::Path => Ok(SettingValue::Path(expand_home(&raw.to_text()))),
            ValueKind::Enumeration(members) => {
                let text = raw.to_text();
                members
                    .iter()
                    .find(|m| m.eq_ignore_ascii_case(text.trim()))
                    .map(|m| SettingValue::Enumeration((*m).to_string()))
                    .ok_or_else(|| format!("value is not one of: {}", members.join(", ")))
            }
            ValueKind::Secret => Ok(SettingValue::Secret(secret_string(raw.to_text()))),
        }
    }

    /// Returns true if `value` is a variant this kind produces
    pub fn accepts(&self, value: &SettingValue) -> bool {
        match (self, value) {
            (ValueKind::Boolean, SettingValue::Boolean(_))
            | (ValueKind::Integer, SettingValue::Integer(_))
            | (ValueKind::Float, SettingValue::Float(_))
            | (ValueKind::String, SettingValue::String(_))
            | (ValueKind::Path, SettingValue::Path(_))
            | (ValueKind::Secret, SettingValue::Secret(_)) => true,
            (ValueKind::Enumeration(members), SettingValue::Enumeration(v)) => {
                members.contains(&v.as_str())
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const BOOL_REASON: &str = "value could not be parsed to a boolean";
const INT_REASON: &str = "value is not a valid integer";
const FLOAT_REASON: &str = "value is not a valid float";
const I64_MIN_F64: f64 = i64::MIN as f64;
const I64_BOUND_F64: f64 = 9_223_372_036_854_775_808.0;

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(BOOL_REASON.to_string()),
    }
}

fn expand_home(text: &str) -> PathBuf {
    if text == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = text.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(text)
}

/// A cast, typed setting value
#[derive(Debug, Clone)]
pub enum SettingValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Path(PathBuf),
    Enumeration(String),
    Secret(SecretString),
}

impl SettingValue {
    /// Canonical textual form
    ///
    /// Floats always carry a fractional part (`60.0`), booleans are lowercase,
    /// secrets are exposed. Use [`SettingValue::display`] for user-facing output
    /// that should hide secrets.
    pub fn render(&self) -> String {
        match self {
            SettingValue::Boolean(b) => b.to_string(),
            SettingValue::Integer(i) => i.to_string(),
            SettingValue::Float(f) => format!("{f:?}"),
            SettingValue::String(s) | SettingValue::Enumeration(s) => s.clone(),
            SettingValue::Path(p) => p.display().to_string(),
            SettingValue::Secret(s) => s.expose_secret().as_ref().to_string(),
        }
    }

    /// Rendered form for display, obfuscating secrets unless `reveal` is set
    pub fn display(&self, reveal: bool) -> String {
        match self {
            SettingValue::Secret(_) if !reveal => crate::settings::secret::OBFUSCATED.to_string(),
            other => other.render(),
        }
    }

    /// Converts the value into the raw form stored in profile files
    ///
    /// Numbers and booleans are stored as native TOML scalars, everything else
    /// as text.
    pub fn to_raw(&self) -> RawValue {
        match self {
            SettingValue::Boolean(b) => RawValue::Boolean(*b),
            SettingValue::Integer(i) => RawValue::Integer(*i),
            SettingValue::Float(f) => RawValue::Float(*f),
            other => RawValue::Text(other.render()),
        }
    }

    /// JSON form used by machine-readable output
    pub fn to_json(&self, reveal: bool) -> serde_json::Value {
        match self {
            SettingValue::Boolean(b) => serde_json::Value::Bool(*b),
            SettingValue::Integer(i) => serde_json::Value::from(*i),
            SettingValue::Float(f) => serde_json::Value::from(*f),
            other => serde_json::Value::String(other.display(reveal)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) | SettingValue::Enumeration(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            SettingValue::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl PartialEq for SettingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SettingValue::Boolean(a), SettingValue::Boolean(b)) => a == b,
            (SettingValue::Integer(a), SettingValue::Integer(b)) => a == b,
            (SettingValue::Float(a), SettingValue::Float(b)) => a == b,
            (SettingValue::String(a), SettingValue::String(b)) => a == b,
            (SettingValue::Path(a), SettingValue::Path(b)) => a == b,
            (SettingValue::Enumeration(a), SettingValue::Enumeration(b)) => a == b,
            (SettingValue::Secret(a), SettingValue::Secret(b)) => secrets_equal(a, b),
            _ => false,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Boolean(b)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        SettingValue::Integer(i)
    }
}

impl From<f64> for SettingValue {
    fn from(f: f64) -> Self {
        SettingValue::Float(f)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::String(s.to_string())
    }
}

impl From<PathBuf> for SettingValue {
    fn from(p: PathBuf) -> Self {
        SettingValue::Path(p)
    }
}

/// Un-cast value as supplied by a user
///
/// Profile files may hold native TOML scalars (`2.0`, `1000001`, `true`) or
/// strings; arguments and environment variables are always text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Textual form of the raw value
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) => format!("{f:?}"),
            RawValue::Text(s) => s.clone(),
        }
    }

    /// Converts a TOML scalar into a raw value
    ///
    /// Returns `None` for arrays, tables and datetimes.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(RawValue::Text(s.clone())),
            toml::Value::Integer(i) => Some(RawValue::Integer(*i)),
            toml::Value::Float(f) => Some(RawValue::Float(*f)),
            toml::Value::Boolean(b) => Some(RawValue::Boolean(*b)),
            _ => None,
        }
    }

    /// Converts the raw value into a TOML scalar
    pub fn to_toml(&self) -> toml::Value {
        match self {
            RawValue::Boolean(b) => toml::Value::Boolean(*b),
            RawValue::Integer(i) => toml::Value::Integer(*i),
            RawValue::Float(f) => toml::Value::Float(*f),
            RawValue::Text(s) => toml::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Boolean(b)
    }
}

impl PartialEq<&str> for RawValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, RawValue::Text(s) if s == other)
    }
}
