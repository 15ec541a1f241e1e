//! Config command implementation
//!
//! `config set`, `config unset` and `config view` read and modify the settings
//! stored in a profile. Every change requested by one invocation is validated
//! before anything is written; a rejected invocation leaves the profiles file
//! untouched.

use crate::cli::commands::report;
use crate::cli::session::Session;
use crate::domain::{Result, SettingsError};
use crate::log_profile_change;
use crate::settings::{context, RawValue, Source};
use clap::{Args, Subcommand};
use std::io::Write;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Change the value of one or more settings in the current profile
    Set(SetArgs),

    /// Restore the default value of one or more settings in the current profile
    Unset(UnsetArgs),

    /// Display the current settings
    View(ViewArgs),
}

impl ConfigArgs {
    pub fn execute(&self, session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
        match &self.command {
            ConfigCommand::Set(args) => args.execute(session, out),
            ConfigCommand::Unset(args) => args.execute(session, out),
            ConfigCommand::View(args) => args.execute(out),
        }
    }

    /// Returns true if the command reads the resolved settings
    pub fn requires_settings(&self) -> bool {
        matches!(self.command, ConfigCommand::View(_))
    }
}

/// Arguments for `config set`
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Settings to change, as KEY=VALUE
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub settings: Vec<String>,
}

impl SetArgs {
    pub fn execute(&self, session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
        let assignments = match parse_assignments(&self.settings) {
            Ok(assignments) => assignments,
            Err(e) => return report(out, e),
        };

        let mut target = String::new();
        let result = session.store().update(|profiles| {
            target = session.target_profile(profiles);
            profiles.update_settings(session.registry(), &target, &assignments, &[])
        });
        let applied = match result {
            Ok(applied) => applied,
            Err(e) => return report(out, e),
        };

        for (key, raw) in &applied.set {
            writeln!(out, "Set '{key}' to '{raw}'.")?;
            if session.env_binds(key) {
                writeln!(
                    out,
                    "'{key}' is also set by an environment variable which will override your config value. Run `unset {key}` to clear it."
                )?;
            }
        }
        writeln!(out, "Updated profile '{target}'.")?;

        log_profile_change!("set", target, applied.set.len());
        Ok(0)
    }
}

/// Arguments for `config unset`
#[derive(Args, Debug)]
pub struct UnsetArgs {
    /// Settings to remove from the profile
    #[arg(required = true, value_name = "KEY")]
    pub settings: Vec<String>,
}

impl UnsetArgs {
    pub fn execute(&self, session: &Session, out: &mut dyn Write) -> anyhow::Result<i32> {
        let mut target = String::new();
        let result = session.store().update(|profiles| {
            target = session.target_profile(profiles);
            profiles.update_settings(session.registry(), &target, &[], &self.settings)
        });
        let applied = match result {
            Ok(applied) => applied,
            Err(e) => return report(out, e),
        };

        for key in &applied.unset {
            writeln!(out, "Unset '{key}'")?;
            if session.env_binds(key) {
                writeln!(
                    out,
                    "'{key}' is also set by an environment variable. Use `unset {key}` to clear it."
                )?;
            }
        }
        writeln!(out, "Updated profile '{target}'")?;

        log_profile_change!("unset", target, applied.unset.len());
        Ok(0)
    }
}

/// Arguments for `config view`
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// List every setting, including those at their default
    #[arg(long)]
    pub show_defaults: bool,

    /// Suffix each setting with the layer it came from (default)
    #[arg(long, overrides_with = "hide_sources")]
    pub show_sources: bool,

    /// Print settings without their source
    #[arg(long, overrides_with = "show_sources")]
    pub hide_sources: bool,

    /// Print secret values instead of masking them
    #[arg(long)]
    pub show_secrets: bool,
}

impl ViewArgs {
    pub fn execute(&self, out: &mut dyn Write) -> anyhow::Result<i32> {
        let current = context::current()?;
        writeln!(out, "PREFECT_PROFILE='{}'", current.profile().unwrap_or_default())?;

        let entries = current
            .settings()
            .iter()
            .filter(|entry| self.show_defaults || entry.source != Source::Default);
        for entry in entries {
            let value = entry.display_value(self.show_secrets);
            if self.hide_sources {
                writeln!(out, "{}='{value}'", entry.name)?;
            } else {
                writeln!(out, "{}='{value}' {}", entry.name, entry.source.marker())?;
            }
        }
        Ok(0)
    }
}

/// Splits `KEY=VALUE` arguments on the first `=`
fn parse_assignments(args: &[String]) -> Result<Vec<(String, RawValue)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(key, value)| (key.to_string(), RawValue::Text(value.to_string())))
                .ok_or_else(|| SettingsError::ParseArgument(arg.clone()))
        })
        .collect()
}
