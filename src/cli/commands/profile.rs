//! Profile command implementation
//!
//! Lists, creates, activates, deletes, renames and inspects the profiles in
//! the profiles file.

use crate::cli::commands::report;
use crate::cli::session::Session;
use crate::log_profile_change;
use crate::profiles::Profile;
use crate::settings::{ValueKind, OBFUSCATED};
use clap::{Args, Subcommand, ValueEnum};
use std::io::Write;

/// Arguments for the profile command
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List profile names, marking the active one
    Ls,

    /// Create a new profile
    Create {
        name: String,

        /// Copy the settings of an existing profile
        #[arg(long)]
        from: Option<String>,
    },

    /// Set the active profile
    Use { name: String },

    /// Delete a profile
    Delete { name: String },

    /// Change the name of a profile
    Rename { old: String, new: String },

    /// Display the settings stored in a profile
    Inspect(InspectArgs),
}

/// Output format of `profile inspect`
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for `profile inspect`
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Profile to inspect, defaults to the current profile
    pub name: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Print secret values instead of masking them
    #[arg(long)]
    pub show_secrets: bool,
}

impl ProfileArgs {
    pub fn execute(&self, session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
        match &self.command {
            ProfileCommand::Ls => list(session, out),
            ProfileCommand::Create { name, from } => create(session, name, from.as_deref(), out),
            ProfileCommand::Use { name } => activate(session, name, out),
            ProfileCommand::Delete { name } => delete(session, name, out),
            ProfileCommand::Rename { old, new } => rename(session, old, new, out),
            ProfileCommand::Inspect(args) => args.execute(session, out),
        }
    }
}

fn list(session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
    let profiles = match session.store().load() {
        Ok(profiles) => profiles,
        Err(e) => return report(out, e),
    };
    for name in profiles.names() {
        if profiles.active_name() == Some(name) {
            writeln!(out, "* {name}")?;
        } else {
            writeln!(out, "{name}")?;
        }
    }
    Ok(0)
}

fn create(
    session: &Session,
    name: &str,
    from: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<i32> {
    let result = session.store().update(|profiles| {
        let profile = match from {
            Some(source) => profiles.require(source)?.copy_as(name)?,
            None => Profile::new(name)?,
        };
        let count = profile.settings().len();
        profiles.add_checked(session.registry(), profile)?;
        Ok(count)
    });
    match result {
        Ok(count) => {
            writeln!(out, "Created profile '{name}'.")?;
            log_profile_change!("create", name, count);
            Ok(0)
        }
        Err(e) => report(out, e),
    }
}

fn activate(session: &Session, name: &str, out: &mut dyn Write) -> anyhow::Result<i32> {
    match session.store().update(|profiles| profiles.set_active(Some(name))) {
        Ok(()) => {
            writeln!(out, "Profile '{name}' now active.")?;
            log_profile_change!("use", name, 0);
            Ok(0)
        }
        Err(e) => report(out, e),
    }
}

fn delete(session: &Session, name: &str, out: &mut dyn Write) -> anyhow::Result<i32> {
    match session.store().update(|profiles| profiles.remove(name)) {
        Ok(removed) => {
            writeln!(out, "Removed profile '{name}'.")?;
            log_profile_change!("delete", name, removed.settings().len());
            Ok(0)
        }
        Err(e) => report(out, e),
    }
}

fn rename(session: &Session, old: &str, new: &str, out: &mut dyn Write) -> anyhow::Result<i32> {
    match session.store().update(|profiles| profiles.rename(old, new)) {
        Ok(()) => {
            writeln!(out, "Renamed profile '{old}' to '{new}'.")?;
            log_profile_change!("rename", new, 0);
            Ok(0)
        }
        Err(e) => report(out, e),
    }
}

impl InspectArgs {
    pub fn execute(&self, session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
        let profiles = match session.store().load() {
            Ok(profiles) => profiles,
            Err(e) => return report(out, e),
        };
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| session.target_profile(&profiles));
        let profile = match profiles.require(&name) {
            Ok(profile) => profile,
            Err(e) => return report(out, e),
        };

        match self.output {
            OutputFormat::Json => {
                let object: serde_json::Map<String, serde_json::Value> = profile
                    .settings()
                    .iter()
                    .map(|(key, raw)| -> serde_json::Result<(String, serde_json::Value)> {
                        let value = if self.masks(session, key) {
                            serde_json::Value::String(OBFUSCATED.to_string())
                        } else {
                            serde_json::to_value(raw)?
                        };
                        Ok((key.clone(), value))
                    })
                    .collect::<serde_json::Result<_>>()?;
                writeln!(out, "{}", serde_json::to_string_pretty(&object)?)?;
            }
            OutputFormat::Text if profile.is_empty() => {
                writeln!(out, "Profile '{name}' is empty.")?;
            }
            OutputFormat::Text => {
                for (key, raw) in profile.settings() {
                    let value = if self.masks(session, key) {
                        OBFUSCATED.to_string()
                    } else {
                        raw.to_string()
                    };
                    writeln!(out, "{key}='{value}'")?;
                }
            }
        }
        Ok(0)
    }

    fn masks(&self, session: &Session, key: &str) -> bool {
        !self.show_secrets
            && session
                .registry()
                .find(key)
                .is_some_and(|def| *def.kind() == ValueKind::Secret)
    }
}
