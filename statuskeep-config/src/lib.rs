//! Configuration for statuskeep hosts.
//!
//! Settings come from, in order of precedence, an explicit file, a file
//! named by `$STATUSKEEP_CONFIG_PATH`, inline JSON in
//! `$STATUSKEEP_CONFIG_JSON`, a default file in the working directory, or
//! built-in defaults. A `.env` file is read first when present.

#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod models;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
pub use models::{ConfigSource, ConfigWarning, ConfigWarnings, SaverConfig};
