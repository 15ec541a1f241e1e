//! CLI command implementations
//!
//! Handlers write their output to an injected writer and return the process
//! exit code. User errors are printed and map to [`EXIT_USER_ERROR`]; anything
//! else is returned as an error for the caller to log.

pub mod config;
pub mod profile;

use crate::domain::SettingsError;
use std::io::Write;

/// Exit code for invalid input or a missing profile
pub const EXIT_USER_ERROR: i32 = 1;

/// Exit code for unexpected failures
pub const EXIT_FATAL: i32 = 5;

/// Message shown to the user for errors caused by their input
///
/// Returns `None` for I/O and other unexpected failures.
pub fn user_message(err: &SettingsError) -> Option<String> {
    let message = match err {
        SettingsError::ParseArgument(arg) => {
            format!("Failed to parse argument '{arg}'. Use the format 'VAR=VAL'.")
        }
        SettingsError::Validation(failures) => format!("{failures}\nInvalid setting value."),
        SettingsError::ActiveProfile(name) => format!(
            "Profile '{name}' is the active profile. You must switch profiles before it can be deleted."
        ),
        SettingsError::UnknownSetting(_)
        | SettingsError::NotSet { .. }
        | SettingsError::ProfileNotFound(_)
        | SettingsError::DuplicateName(_)
        | SettingsError::InvalidName(_)
        | SettingsError::StoreParse { .. } => format!("{err}."),
        _ => return None,
    };
    Some(message)
}

/// Prints a user error and returns its exit code, or passes other errors on
pub(crate) fn report(out: &mut dyn Write, err: SettingsError) -> anyhow::Result<i32> {
    match user_message(&err) {
        Some(message) => {
            tracing::debug!(error = %err, "Command rejected");
            writeln!(out, "{message}")?;
            Ok(EXIT_USER_ERROR)
        }
        None => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationErrors;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            user_message(&SettingsError::UnknownSetting("PREFECT_FOO".to_string())).unwrap(),
            "Unknown setting name 'PREFECT_FOO'."
        );
        assert_eq!(
            user_message(&SettingsError::ParseArgument("PREFECT_FOO_BAR".to_string())).unwrap(),
            "Failed to parse argument 'PREFECT_FOO_BAR'. Use the format 'VAR=VAL'."
        );
        assert_eq!(
            user_message(&SettingsError::NotSet {
                key: "PREFECT_LOGGING_LEVEL".to_string(),
                profile: "foo".to_string(),
            })
            .unwrap(),
            "'PREFECT_LOGGING_LEVEL' is not set in profile 'foo'."
        );
    }

    #[test]
    fn test_validation_message_lists_failures() {
        let mut failures = ValidationErrors::new();
        failures.push("PREFECT_ORION_DATABASE_TIMEOUT", "value is not a valid float");
        assert_eq!(
            user_message(&SettingsError::Validation(failures)).unwrap(),
            "Validation error for setting 'PREFECT_ORION_DATABASE_TIMEOUT': value is not a valid float\n\
             Invalid setting value."
        );
    }

    #[test]
    fn test_unexpected_errors_have_no_user_message() {
        assert!(user_message(&SettingsError::Io("disk full".to_string())).is_none());
    }

    #[test]
    fn test_report_writes_message() {
        let mut out = Vec::new();
        let code = report(&mut out, SettingsError::ProfileNotFound("dev".to_string())).unwrap();
        assert_eq!(code, EXIT_USER_ERROR);
        assert_eq!(String::from_utf8(out).unwrap(), "Profile 'dev' not found.\n");
    }
}
