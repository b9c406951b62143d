//! Trust events and the per-loop performance metrics that drive them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-loop performance metrics, each in [0,1].
///
/// `summary_realism`, `loop_success` and `reflection_clarity` count toward
/// trust; `contradiction_frequency`, `revision_rate` and
/// `operator_override` count against it (their complement is scored).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustMetrics {
    pub summary_realism: f64,
    pub loop_success: f64,
    pub reflection_clarity: f64,
    pub contradiction_frequency: f64,
    pub revision_rate: f64,
    pub operator_override: f64,
}

impl TrustMetrics {
    /// Iterate (name, raw value) pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("summary_realism", self.summary_realism),
            ("loop_success", self.loop_success),
            ("reflection_clarity", self.reflection_clarity),
            ("contradiction_frequency", self.contradiction_frequency),
            ("revision_rate", self.revision_rate),
            ("operator_override", self.operator_override),
        ]
    }

    /// Name of the first metric outside [0,1], if any.
    pub fn first_out_of_range(&self) -> Option<(&'static str, f64)> {
        self.entries()
            .into_iter()
            .find(|(_, v)| !(0.0..=1.0).contains(v) || v.is_nan())
    }
}

/// Per-metric weights for the trust score combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeights {
    pub summary_realism: f64,
    pub loop_success: f64,
    pub reflection_clarity: f64,
    pub contradiction_frequency: f64,
    pub revision_rate: f64,
    pub operator_override: f64,
}

impl Default for MetricWeights {
    /// Equal weighting across all six metrics.
    fn default() -> Self {
        const W: f64 = 1.0 / 6.0;
        Self {
            summary_realism: W,
            loop_success: W,
            reflection_clarity: W,
            contradiction_frequency: W,
            revision_rate: W,
            operator_override: W,
        }
    }
}

impl MetricWeights {
    pub fn sum(&self) -> f64 {
        self.summary_realism
            + self.loop_success
            + self.reflection_clarity
            + self.contradiction_frequency
            + self.revision_rate
            + self.operator_override
    }

    /// Weighted trust score from raw metrics, clamped to [0,1].
    ///
    /// Penalty metrics contribute their complement: a loop with
    /// `contradiction_frequency = 0.0` scores full marks on that axis.
    pub fn score(&self, metrics: &TrustMetrics) -> f64 {
        let raw = self.summary_realism * metrics.summary_realism
            + self.loop_success * metrics.loop_success
            + self.reflection_clarity * metrics.reflection_clarity
            + self.contradiction_frequency * (1.0 - metrics.contradiction_frequency)
            + self.revision_rate * (1.0 - metrics.revision_rate)
            + self.operator_override * (1.0 - metrics.operator_override);
        let total = self.sum();
        if total <= f64::EPSILON {
            return 0.0;
        }
        (raw / total).clamp(0.0, 1.0)
    }
}

/// Standing of an agent in the trust system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustStatus {
    Active,
    Demoted,
    ReEvaluating,
}

impl TrustStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Demoted => "demoted",
            Self::ReEvaluating => "re_evaluating",
        }
    }
}

/// One appended entry in an agent's trust history. The latest event per
/// agent is the agent's current trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEvent {
    pub id: Uuid,
    pub agent: String,
    pub loop_id: Uuid,
    /// New trust score in [0,1].
    pub trust_score: f64,
    /// Change versus the previous score for this agent.
    pub delta: f64,
    pub reason: String,
    pub metrics: TrustMetrics,
    pub status: TrustStatus,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect() -> TrustMetrics {
        TrustMetrics {
            summary_realism: 1.0,
            loop_success: 1.0,
            reflection_clarity: 1.0,
            contradiction_frequency: 0.0,
            revision_rate: 0.0,
            operator_override: 0.0,
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((MetricWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_metrics_score_one() {
        let score = MetricWeights::default().score(&perfect());
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_worst_metrics_score_zero() {
        let worst = TrustMetrics {
            summary_realism: 0.0,
            loop_success: 0.0,
            reflection_clarity: 0.0,
            contradiction_frequency: 1.0,
            revision_rate: 1.0,
            operator_override: 1.0,
        };
        let score = MetricWeights::default().score(&worst);
        assert!(score.abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_detection() {
        let mut metrics = perfect();
        assert!(metrics.first_out_of_range().is_none());

        metrics.revision_rate = 1.3;
        let (name, value) = metrics.first_out_of_range().unwrap();
        assert_eq!(name, "revision_rate");
        assert!((value - 1.3).abs() < f64::EPSILON);

        metrics.revision_rate = f64::NAN;
        assert!(metrics.first_out_of_range().is_some());
    }
}
