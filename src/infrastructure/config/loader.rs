use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid {name}: {value}. Must be within [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("Invalid hysteresis_margin: {0}. Must be non-negative")]
    InvalidHysteresis(f64),

    #[error("Invalid normalize_within: {0}. Must be at least the weight tolerance")]
    InvalidNormalizeWindow(f64),

    #[error("Invalid threshold override '{0}': {1} is not finite")]
    InvalidThresholdOverride(String, f64),

    #[error("Log directory cannot be empty")]
    EmptyLogDir,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .loopgate/config.yaml (project config)
    /// 3. .loopgate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (LOOPGATE_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.loopgate/) so several
    /// governed projects can coexist on one machine.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".loopgate/config.yaml"))
            .merge(Yaml::file(".loopgate/local.yaml"))
            .merge(Env::prefixed("LOOPGATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let governance = &config.governance;
        let unit_range = [
            ("demotion_threshold", governance.demotion_threshold),
            ("default_trust", governance.default_trust),
            ("min_selection_score", governance.min_selection_score),
        ];
        for (name, value) in unit_range {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        if governance.hysteresis_margin < 0.0 || !governance.hysteresis_margin.is_finite() {
            return Err(ConfigError::InvalidHysteresis(governance.hysteresis_margin));
        }

        if governance.normalize_within < governance.weight_tolerance {
            return Err(ConfigError::InvalidNormalizeWindow(governance.normalize_within));
        }

        for (name, value) in &config.thresholds {
            if !value.is_finite() {
                return Err(ConfigError::InvalidThresholdOverride(name.clone(), *value));
            }
        }

        if config.storage.log_dir.is_empty() {
            return Err(ConfigError::EmptyLogDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
