//! CLI command implementations.

pub mod escalations;
pub mod override_freeze;
pub mod serve;
pub mod thresholds;
pub mod trust;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::LoopGovernor;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::store::JsonlRecordStore;

/// Load configuration from the hierarchy, or from an explicit file.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Open the project-local record store and build a hydrated governor.
pub async fn build_governor(config: &Config) -> Result<Arc<LoopGovernor>> {
    let store = JsonlRecordStore::open(&config.storage.log_dir)
        .await
        .context("Failed to open record store")?;
    let governor = Arc::new(LoopGovernor::new(config, Arc::new(store)));
    governor
        .hydrate()
        .await
        .context("Failed to hydrate governance projections")?;
    Ok(governor)
}
