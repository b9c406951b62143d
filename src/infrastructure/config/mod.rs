//! Layered configuration loading with figment.
//!
//! Defaults, then project YAML files, then `LOOPGATE_` environment
//! variables, with validation before the config is handed out.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
