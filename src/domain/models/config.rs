//! Runtime configuration for the governance engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::belief::BeliefPriority;
use super::trust::MetricWeights;

/// Tuning knobs for trust, demotion and plan selection.
///
/// The demotion cutoff and hysteresis margin are deliberately
/// configuration rather than constants; production values should come
/// from deployment config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Trust score below which an agent is demoted.
    pub demotion_threshold: f64,
    /// Margin above the demotion threshold required before restoration.
    pub hysteresis_margin: f64,
    /// Trust score assumed for agents with no recorded history.
    pub default_trust: f64,
    /// Minimum weighted score a plan must reach to be selected.
    pub min_selection_score: f64,
    /// Weight sums within this tolerance of 1.0 are accepted as-is.
    pub weight_tolerance: f64,
    /// Weight sums off by up to this much are normalized; beyond it the
    /// comparison is rejected.
    pub normalize_within: f64,
    /// Per-metric weights for trust scoring.
    pub metric_weights: MetricWeights,
    /// Static fallback mapping: role class -> member agents.
    pub roles: HashMap<String, Vec<String>>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            demotion_threshold: 0.5,
            hysteresis_margin: 0.1,
            default_trust: 0.7,
            min_selection_score: 0.5,
            weight_tolerance: 1e-6,
            normalize_within: 0.05,
            metric_weights: MetricWeights::default(),
            roles: HashMap::new(),
        }
    }
}

/// A belief definition as written in deployment config. Identifiers are
/// assigned at load time; config files only name the belief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeliefSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: BeliefPriority,
}

/// Where the append-only record logs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub log_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_dir: ".loopgate/logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7431,
        }
    }
}

/// Top-level configuration, merged hierarchically by the loader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub governance: GovernanceConfig,
    /// Threshold overrides merged over the canonical table.
    pub thresholds: HashMap<String, f64>,
    /// Belief definitions loaded into the registry at startup.
    pub beliefs: Vec<BeliefSeed>,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}
