//! Profiles: named sets of setting overrides and their persistence.
//!
//! - [`model`] - [`Profile`] and [`ProfilesCollection`] with all-or-nothing mutation
//! - [`store`] - TOML persistence with atomic, serialized writes
//!
//! # Example
//!
//! ```rust,no_run
//! use prefect_settings::profiles::{ProfileStore, Profile};
//! use prefect_settings::settings::Registry;
//!
//! # fn example() -> prefect_settings::domain::Result<()> {
//! let registry = Registry::builtin();
//! let store = ProfileStore::new("/home/me/.prefect/profiles.toml");
//!
//! store.update(|profiles| {
//!     profiles.add(Profile::new("dev")?)?;
//!     profiles.set_setting(&registry, "dev", "PREFECT_LOGGING_LEVEL", "DEBUG")?;
//!     profiles.set_active(Some("dev"))
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod store;

pub use model::{Profile, ProfilesCollection, SettingsUpdate, DEFAULT_PROFILE};
pub use store::{load_profiles, save_profiles, ProfileStore};
