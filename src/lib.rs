//! # Prefect Settings
//!
//! Layered settings resolution with provenance tracking and persisted profiles.
//!
//! ## Overview
//!
//! The effective configuration is resolved from four layers, each outranking
//! the previous one:
//!
//! 1. compiled-in **defaults** from the definition registry
//! 2. the selected **profile**, a named set of overrides stored in a TOML file
//! 3. the process **environment** (`PREFECT_*` variables)
//! 4. short-lived programmatic **overrides**
//!
//! Every resolved value remembers which layer produced it.
//!
//! ## Architecture
//!
//! - [`settings`] - registry, typed values, the resolver and the context stack
//! - [`profiles`] - the profile model and its persistent store
//! - [`domain`] - error types and identifiers
//! - [`cli`] - the `config` and `profile` commands
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prefect_settings::profiles::ProfileStore;
//! use prefect_settings::settings::{resolve, EnvSnapshot, Overrides, Registry, ENV_PREFIX};
//!
//! # fn main() -> prefect_settings::domain::Result<()> {
//! let registry = Registry::builtin();
//! let env = EnvSnapshot::from_process(ENV_PREFIX);
//! let profiles = ProfileStore::new("/home/me/.prefect/profiles.toml").load()?;
//!
//! let settings = resolve(&registry, &env, &profiles, None, &Overrides::new())?;
//! for entry in settings.non_default() {
//!     println!("{}='{}' {}", entry.name, entry.display_value(false), entry.source.marker());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], carrying a
//! [`domain::SettingsError`]. Cast and validation failures are aggregated:
//! one error lists every offending setting.

pub mod cli;
pub mod domain;
pub mod logging;
pub mod profiles;
pub mod settings;
