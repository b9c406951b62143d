//! Threshold registry with atomic whole-table reload.
//!
//! Holds the named operational thresholds and belief definitions every
//! other governance component reads. Readers take an `Arc` snapshot, so
//! a reload can never expose a half-updated table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::domain::models::{Belief, Threshold};
use crate::domain::ports::GovernanceError;

/// Registry of operational thresholds and beliefs.
///
/// Thresholds are immutable between reloads; beliefs are immutable for
/// the process lifetime.
pub struct ThresholdRegistry {
    table: RwLock<Arc<HashMap<String, Threshold>>>,
    beliefs: Arc<Vec<Belief>>,
}

impl ThresholdRegistry {
    /// Build a registry from an explicit threshold set.
    pub fn new(thresholds: Vec<Threshold>, beliefs: Vec<Belief>) -> Self {
        Self {
            table: RwLock::new(Arc::new(Self::index(thresholds))),
            beliefs: Arc::new(beliefs),
        }
    }

    /// Build a registry from the canonical startup table.
    pub fn with_defaults() -> Self {
        Self::new(Threshold::canonical_table(), Vec::new())
    }

    /// Canonical table with per-parameter value overrides applied.
    /// Unknown override names become new entries so deployments can add
    /// site-specific thresholds.
    pub fn with_overrides(overrides: &HashMap<String, f64>, beliefs: Vec<Belief>) -> Self {
        let mut table = Threshold::canonical_table();
        for (name, value) in overrides {
            match table.iter_mut().find(|t| &t.parameter_name == name) {
                Some(existing) => existing.value = *value,
                None => table.push(Threshold::new(name.clone(), *value, "configured override")),
            }
        }
        Self::new(table, beliefs)
    }

    fn index(thresholds: Vec<Threshold>) -> HashMap<String, Threshold> {
        thresholds
            .into_iter()
            .map(|t| (t.parameter_name.clone(), t))
            .collect()
    }

    fn snapshot(&self) -> Arc<HashMap<String, Threshold>> {
        // Lock poisoning only happens if a reader panicked while holding
        // the guard; propagating the poisoned data is still coherent
        // because the table is only ever swapped wholesale.
        match self.table.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Look up a threshold value by parameter name.
    pub fn get(&self, parameter_name: &str) -> Result<f64, GovernanceError> {
        self.snapshot()
            .get(parameter_name)
            .map(|t| t.value)
            .ok_or_else(|| GovernanceError::UnknownThreshold(parameter_name.to_string()))
    }

    /// Look up a full threshold entry by parameter name.
    pub fn get_threshold(&self, parameter_name: &str) -> Result<Threshold, GovernanceError> {
        self.snapshot()
            .get(parameter_name)
            .cloned()
            .ok_or_else(|| GovernanceError::UnknownThreshold(parameter_name.to_string()))
    }

    /// All thresholds, sorted by parameter name.
    pub fn all(&self) -> Vec<Threshold> {
        let mut thresholds: Vec<_> = self.snapshot().values().cloned().collect();
        thresholds.sort_by(|a, b| a.parameter_name.cmp(&b.parameter_name));
        thresholds
    }

    /// Atomically replace the whole table. In-flight readers keep their
    /// snapshot; no partial update is ever observable.
    pub fn reload(&self, thresholds: Vec<Threshold>) {
        let next = Arc::new(Self::index(thresholds));
        let count = next.len();
        match self.table.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        info!(thresholds = count, "threshold table reloaded");
    }

    /// Belief definitions loaded at startup.
    pub fn beliefs(&self) -> &[Belief] {
        &self.beliefs
    }

    /// Look up a belief by name.
    pub fn belief(&self, name: &str) -> Option<&Belief> {
        self.beliefs.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{params, BeliefPriority};

    #[test]
    fn test_canonical_lookup() {
        let registry = ThresholdRegistry::with_defaults();
        assert!((registry.get(params::ALIGNMENT_THRESHOLD).unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((registry.get(params::MAX_RERUNS).unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_threshold() {
        let registry = ThresholdRegistry::with_defaults();
        let err = registry.get("nonexistent_threshold").unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownThreshold(name) if name == "nonexistent_threshold"));
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert(params::MAX_RERUNS.to_string(), 5.0);
        overrides.insert("site_specific".to_string(), 0.9);

        let registry = ThresholdRegistry::with_overrides(&overrides, Vec::new());
        assert!((registry.get(params::MAX_RERUNS).unwrap() - 5.0).abs() < f64::EPSILON);
        assert!((registry.get("site_specific").unwrap() - 0.9).abs() < f64::EPSILON);
        // Untouched entries keep canonical values
        assert!((registry.get(params::DRIFT_THRESHOLD).unwrap() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reload_swaps_whole_table() {
        let registry = ThresholdRegistry::with_defaults();
        registry.reload(vec![Threshold::new("only_one", 0.1, "replacement")]);

        assert!((registry.get("only_one").unwrap() - 0.1).abs() < f64::EPSILON);
        // Old entries are gone: the swap is wholesale, not a merge
        assert!(registry.get(params::ALIGNMENT_THRESHOLD).is_err());
    }

    #[test]
    fn test_beliefs() {
        let beliefs = vec![Belief::new(
            "no-irreversible-actions",
            "Plans must not take irreversible external actions",
            BeliefPriority::Critical,
        )];
        let registry = ThresholdRegistry::new(Threshold::canonical_table(), beliefs);

        assert_eq!(registry.beliefs().len(), 1);
        let belief = registry.belief("no-irreversible-actions").unwrap();
        assert_eq!(belief.priority, BeliefPriority::Critical);
        assert!(registry.belief("missing").is_none());
    }
}
