//! Operational thresholds and the canonical startup table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known threshold parameter names.
pub mod params {
    pub const ALIGNMENT_THRESHOLD: &str = "alignment_threshold";
    pub const DRIFT_THRESHOLD: &str = "drift_threshold";
    pub const MAX_RERUNS: &str = "max_reruns";
    pub const FATIGUE_THRESHOLD: &str = "fatigue_threshold";
    pub const BIAS_REPETITION_LIMIT: &str = "bias_repetition_limit";
    pub const TONE_MISMATCH_TOLERANCE: &str = "tone_mismatch_tolerance";
    pub const UNCERTAINTY_THRESHOLD: &str = "uncertainty_threshold";
    pub const HALLUCINATION_TOLERANCE: &str = "hallucination_tolerance";
}

/// A named operational threshold. Immutable per process lifetime; reload
/// swaps the whole table, never a single entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub id: Uuid,
    pub parameter_name: String,
    pub value: f64,
    pub description: String,
}

impl Threshold {
    pub fn new(parameter_name: impl Into<String>, value: f64, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parameter_name: parameter_name.into(),
            value,
            description: description.into(),
        }
    }

    /// The canonical table loaded at startup when no overrides are configured.
    pub fn canonical_table() -> Vec<Self> {
        vec![
            Self::new(
                params::ALIGNMENT_THRESHOLD,
                0.75,
                "Minimum reflection confidence required before a loop may execute",
            ),
            Self::new(
                params::DRIFT_THRESHOLD,
                0.25,
                "Maximum tolerated drift between consecutive reflections",
            ),
            Self::new(
                params::MAX_RERUNS,
                3.0,
                "Maximum re-reflection reruns before a loop is forced to failed",
            ),
            Self::new(
                params::FATIGUE_THRESHOLD,
                0.5,
                "Fatigue level above which loop throughput is reduced",
            ),
            Self::new(
                params::BIAS_REPETITION_LIMIT,
                2.0,
                "Number of repeated biased framings tolerated per loop",
            ),
            Self::new(
                params::TONE_MISMATCH_TOLERANCE,
                0.3,
                "Maximum tolerated tone mismatch between plan and task context",
            ),
            Self::new(
                params::UNCERTAINTY_THRESHOLD,
                0.4,
                "Uncertainty level above which plans require extra review",
            ),
            Self::new(
                params::HALLUCINATION_TOLERANCE,
                0.2,
                "Maximum tolerated hallucination score in a reflection summary",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_table_values() {
        let table = Threshold::canonical_table();
        let get = |name: &str| {
            table
                .iter()
                .find(|t| t.parameter_name == name)
                .map(|t| t.value)
                .unwrap()
        };

        assert!((get(params::ALIGNMENT_THRESHOLD) - 0.75).abs() < f64::EPSILON);
        assert!((get(params::DRIFT_THRESHOLD) - 0.25).abs() < f64::EPSILON);
        assert!((get(params::MAX_RERUNS) - 3.0).abs() < f64::EPSILON);
        assert!((get(params::HALLUCINATION_TOLERANCE) - 0.2).abs() < f64::EPSILON);
        assert_eq!(table.len(), 8);
    }
}
