//! CLI interface and argument parsing
//!
//! This module provides the command-line interface using clap, and [`run`],
//! which loads the profiles, enters the root settings frame and dispatches.

pub mod commands;
pub mod session;

pub use session::Session;

use crate::settings::context::{self, ContextHook, ContextRequest, SettingsSources};
use clap::{Parser, Subcommand};
use commands::report;
use std::io::Write;
use std::sync::Arc;

/// Prefect settings and profiles
#[derive(Parser, Debug)]
#[command(name = "prefect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Profile to read and modify instead of the active one
    #[arg(short, long, global = true, env = "PREFECT_PROFILE")]
    pub profile: Option<String>,

    /// Log level of this command (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// View and set settings of the current profile
    Config(commands::config::ConfigArgs),

    /// Manage profiles
    Profile(commands::profile::ProfileArgs),
}

impl Commands {
    /// Returns true if the command cannot run without resolved settings
    pub fn requires_settings(&self) -> bool {
        match self {
            Commands::Config(args) => args.requires_settings(),
            Commands::Profile(_) => false,
        }
    }
}

/// Runs a parsed command line against `session`
///
/// The root settings frame is resolved from the session's environment and the
/// stored profiles. Commands that only edit the profiles file still run when
/// resolution fails, so a bad stored value can be fixed with `config unset`.
pub fn run(
    cli: &Cli,
    session: &Session,
    hook: Option<Arc<dyn ContextHook>>,
    out: &mut dyn Write,
) -> anyhow::Result<i32> {
    let profiles = match session.store().load() {
        Ok(profiles) => profiles,
        Err(e) => return report(out, e),
    };

    let sources = SettingsSources::new(session.registry(), session.env(), &profiles);
    let request = match session.profile() {
        Some(name) => ContextRequest::fresh().profile(name),
        None => ContextRequest::fresh(),
    };
    let _root = match context::use_profile(&sources, request, hook) {
        Ok(guard) => Some(guard),
        Err(e) if cli.command.requires_settings() => return report(out, e),
        Err(e) => {
            tracing::warn!(error = %e, "Settings could not be resolved");
            None
        }
    };

    match &cli.command {
        Commands::Config(args) => args.execute(session, out),
        Commands::Profile(args) => args.execute(session, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::config::ConfigCommand;
    use commands::profile::{OutputFormat, ProfileCommand};

    #[test]
    fn test_cli_parse_config_set() {
        let cli = Cli::parse_from(["prefect", "config", "set", "PREFECT_API_KEY=foo=bar"]);
        match cli.command {
            Commands::Config(args) => match args.command {
                ConfigCommand::Set(set) => assert_eq!(set.settings, vec!["PREFECT_API_KEY=foo=bar"]),
                other => panic!("unexpected command: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_profile_flag_anywhere() {
        let before = Cli::parse_from(["prefect", "--profile", "foo", "config", "unset", "X"]);
        assert_eq!(before.profile.as_deref(), Some("foo"));

        let after = Cli::parse_from(["prefect", "config", "unset", "X", "-p", "foo"]);
        assert_eq!(after.profile.as_deref(), Some("foo"));
    }

    #[test]
    fn test_cli_parse_view_source_flags() {
        let cli = Cli::parse_from(["prefect", "config", "view", "--hide-sources", "--show-sources"]);
        let Commands::Config(args) = cli.command else {
            panic!("expected config command");
        };
        let ConfigCommand::View(view) = args.command else {
            panic!("expected view command");
        };
        assert!(view.show_sources);
        assert!(!view.hide_sources);
    }

    #[test]
    fn test_cli_set_requires_arguments() {
        assert!(Cli::try_parse_from(["prefect", "config", "set"]).is_err());
    }

    #[test]
    fn test_cli_parse_profile_inspect_json() {
        let cli = Cli::parse_from(["prefect", "profile", "inspect", "dev", "--output", "json"]);
        let Commands::Profile(args) = cli.command else {
            panic!("expected profile command");
        };
        match args.command {
            ProfileCommand::Inspect(inspect) => {
                assert_eq!(inspect.name.as_deref(), Some("dev"));
                assert_eq!(inspect.output, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_only_view_requires_settings() {
        let view = Cli::parse_from(["prefect", "config", "view"]);
        assert!(view.command.requires_settings());
        let unset = Cli::parse_from(["prefect", "config", "unset", "X"]);
        assert!(!unset.command.requires_settings());
    }
}
