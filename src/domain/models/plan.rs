//! Candidate plans, comparison records, and the rejection/escalation logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A candidate plan for one decision point, carrying only the numeric and
/// structural outputs of the planning layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: Uuid,
    pub summary: String,
    pub steps: Vec<String>,
    pub trust_score: f64,
    pub complexity_score: f64,
    pub expected_utility: f64,
    pub alignment_score: f64,
    /// False when the plan violates any invariant; such plans are never
    /// selectable regardless of score.
    pub invariant_check_passed: bool,
    pub invariant_violations: Vec<String>,
}

impl Plan {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            summary: summary.into(),
            steps: Vec::new(),
            trust_score: 0.0,
            complexity_score: 0.0,
            expected_utility: 0.0,
            alignment_score: 0.0,
            invariant_check_passed: true,
            invariant_violations: Vec::new(),
        }
    }
}

/// Criteria weights for plan scoring. Must sum to 1.0 (within tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaWeights {
    pub trust_score: f64,
    pub expected_utility: f64,
    pub complexity_score: f64,
    pub alignment_with_emotion: f64,
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self {
            trust_score: 0.4,
            expected_utility: 0.3,
            complexity_score: 0.1,
            alignment_with_emotion: 0.2,
        }
    }
}

impl CriteriaWeights {
    pub fn sum(&self) -> f64 {
        self.trust_score + self.expected_utility + self.complexity_score + self.alignment_with_emotion
    }

    /// Scale all weights so they sum to exactly 1.0.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        Self {
            trust_score: self.trust_score / total,
            expected_utility: self.expected_utility / total,
            complexity_score: self.complexity_score / total,
            alignment_with_emotion: self.alignment_with_emotion / total,
        }
    }

    /// Weighted score of a candidate against these criteria.
    pub fn weighted_score(&self, plan: &Plan) -> f64 {
        self.trust_score * plan.trust_score
            + self.expected_utility * plan.expected_utility
            + self.complexity_score * plan.complexity_score
            + self.alignment_with_emotion * plan.alignment_score
    }
}

/// Outcome of a comparison for one decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// A candidate was selected.
    Selected,
    /// No candidate was selectable; an escalation was emitted.
    Escalated,
    /// The owning loop was cancelled while the comparison was pending.
    Abandoned,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Escalated => "escalated",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Record of one plan comparison at a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanComparisonRecord {
    pub comparison_id: Uuid,
    pub loop_id: Uuid,
    pub decision_point: String,
    pub candidate_plans: Vec<Plan>,
    pub criteria_weights: CriteriaWeights,
    pub selected_plan_id: Option<Uuid>,
    pub status: ComparisonStatus,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one rejected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub id: Uuid,
    pub comparison_id: Uuid,
    pub loop_id: Uuid,
    pub plan_id: Uuid,
    pub rejection_reason: String,
    pub timestamp: DateTime<Utc>,
}

impl RejectionRecord {
    pub fn new(comparison_id: Uuid, loop_id: Uuid, plan_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            comparison_id,
            loop_id,
            plan_id,
            rejection_reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only record of a decision point requiring operator review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: Uuid,
    pub comparison_id: Uuid,
    pub loop_id: Uuid,
    pub decision_point: String,
    pub escalation_reason: String,
    pub rejected_plan_ids: Vec<Uuid>,
    pub recommended_action: String,
    pub operator_alert_flag: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((CriteriaWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_weights() {
        let weights = CriteriaWeights {
            trust_score: 0.8,
            expected_utility: 0.6,
            complexity_score: 0.2,
            alignment_with_emotion: 0.4,
        };
        let normalized = weights.normalized();
        assert!((normalized.sum() - 1.0).abs() < 1e-9);
        // Relative proportions preserved
        assert!((normalized.trust_score / normalized.complexity_score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score() {
        let mut plan = Plan::new("candidate");
        plan.trust_score = 1.0;
        plan.expected_utility = 0.5;
        plan.complexity_score = 0.0;
        plan.alignment_score = 1.0;

        let score = CriteriaWeights::default().weighted_score(&plan);
        // 0.4*1.0 + 0.3*0.5 + 0.1*0.0 + 0.2*1.0
        assert!((score - 0.75).abs() < 1e-9);
    }
}
