//! Plan selection engine.
//!
//! Scores candidate plans against weighted criteria, hard-excludes
//! invariant violators, applies deterministic tie-breaking, and escalates
//! to an operator when nothing selectable remains. Every rejected
//! candidate leaves a rejection record; failed selections leave an
//! escalation record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::{
    ComparisonStatus, CriteriaWeights, EscalationRecord, GovernanceRecord, Plan,
    PlanComparisonRecord, RecordPayload, RejectionRecord,
};
use crate::domain::ports::{GovernanceError, RecordStore};

/// Configuration for plan selection.
#[derive(Debug, Clone)]
pub struct PlanSelectorConfig {
    /// Weighted score a winner must reach; below it the comparison
    /// escalates even when a best candidate exists.
    pub min_selection_score: f64,
    /// Tolerance for treating a weight sum as exactly 1.0.
    pub weight_tolerance: f64,
    /// Weight sums within this distance of 1.0 are silently normalized;
    /// anything further off is rejected.
    pub normalize_within: f64,
    pub default_weights: CriteriaWeights,
}

impl Default for PlanSelectorConfig {
    fn default() -> Self {
        Self {
            min_selection_score: 0.5,
            weight_tolerance: 1e-6,
            normalize_within: 0.05,
            default_weights: CriteriaWeights::default(),
        }
    }
}

/// Outcome of a comparison handed back to the caller.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectionOutcome {
    pub comparison: PlanComparisonRecord,
    /// The winning plan, when status is `Selected`.
    pub selected: Option<Plan>,
    /// Escalation emitted when no candidate was selectable.
    pub escalation: Option<EscalationRecord>,
}

/// Service comparing candidate plans at a decision point.
pub struct PlanSelector {
    config: PlanSelectorConfig,
    store: Arc<dyn RecordStore>,
    /// Latest comparison per loop, so a cancelled loop can mark its
    /// pending comparison abandoned.
    latest: RwLock<HashMap<Uuid, PlanComparisonRecord>>,
}

impl PlanSelector {
    pub fn new(config: PlanSelectorConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store,
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Compare candidate plans and either select one or escalate.
    ///
    /// Candidates failing their invariant check are excluded before
    /// scoring and always receive rejection records. Ties on weighted
    /// score break by trust (higher wins), then complexity (lower wins),
    /// then submission order.
    pub async fn compare(
        &self,
        loop_id: Uuid,
        decision_point: &str,
        plans: Vec<Plan>,
        weights: Option<CriteriaWeights>,
    ) -> Result<SelectionOutcome, GovernanceError> {
        if plans.is_empty() {
            return Err(GovernanceError::Validation(
                "comparison requires at least one candidate plan".to_string(),
            ));
        }
        let weights = self.resolve_weights(weights)?;

        let comparison_id = Uuid::new_v4();
        let mut rejections: Vec<RejectionRecord> = Vec::new();

        // Invariant violators are out before any scoring happens.
        let mut eligible: Vec<(usize, &Plan, f64)> = Vec::new();
        for (index, plan) in plans.iter().enumerate() {
            if plan.invariant_check_passed {
                eligible.push((index, plan, weights.weighted_score(plan)));
            } else {
                rejections.push(RejectionRecord::new(
                    comparison_id,
                    loop_id,
                    plan.plan_id,
                    format!("invariant violation: {}", plan.invariant_violations.join("; ")),
                ));
            }
        }

        let winner = Self::pick_winner(&eligible);

        let outcome = match winner {
            Some((_, plan, score)) if score >= self.config.min_selection_score => {
                for (_, candidate, candidate_score) in &eligible {
                    if candidate.plan_id != plan.plan_id {
                        rejections.push(RejectionRecord::new(
                            comparison_id,
                            loop_id,
                            candidate.plan_id,
                            format!("scored {candidate_score:.4}, below selected plan at {score:.4}"),
                        ));
                    }
                }
                let comparison = PlanComparisonRecord {
                    comparison_id,
                    loop_id,
                    decision_point: decision_point.to_string(),
                    candidate_plans: plans.clone(),
                    criteria_weights: weights,
                    selected_plan_id: Some(plan.plan_id),
                    status: ComparisonStatus::Selected,
                    created_at: Utc::now(),
                };
                info!(
                    loop_id = %loop_id,
                    comparison_id = %comparison_id,
                    plan_id = %plan.plan_id,
                    score,
                    "plan selected"
                );
                SelectionOutcome {
                    comparison,
                    selected: Some(plan.clone()),
                    escalation: None,
                }
            }
            best => {
                let reason = match best {
                    Some((_, _, score)) => format!(
                        "best candidate scored {score:.4}, below minimum selection score {}",
                        self.config.min_selection_score
                    ),
                    None => "all candidate plans violate invariants".to_string(),
                };
                for (_, candidate, candidate_score) in &eligible {
                    rejections.push(RejectionRecord::new(
                        comparison_id,
                        loop_id,
                        candidate.plan_id,
                        format!("scored {candidate_score:.4}, no candidate selectable"),
                    ));
                }
                let escalation = EscalationRecord {
                    id: Uuid::new_v4(),
                    comparison_id,
                    loop_id,
                    decision_point: decision_point.to_string(),
                    escalation_reason: reason,
                    rejected_plan_ids: plans.iter().map(|p| p.plan_id).collect(),
                    recommended_action: "operator_review_required".to_string(),
                    operator_alert_flag: true,
                    timestamp: Utc::now(),
                };
                let comparison = PlanComparisonRecord {
                    comparison_id,
                    loop_id,
                    decision_point: decision_point.to_string(),
                    candidate_plans: plans.clone(),
                    criteria_weights: weights,
                    selected_plan_id: None,
                    status: ComparisonStatus::Escalated,
                    created_at: Utc::now(),
                };
                warn!(
                    loop_id = %loop_id,
                    comparison_id = %comparison_id,
                    reason = %escalation.escalation_reason,
                    "plan selection escalated"
                );
                SelectionOutcome {
                    comparison,
                    selected: None,
                    escalation: Some(escalation),
                }
            }
        };

        for rejection in rejections {
            self.store
                .append(&GovernanceRecord::new(RecordPayload::Rejection(rejection)))
                .await?;
        }
        if let Some(escalation) = &outcome.escalation {
            self.store
                .append(&GovernanceRecord::new(RecordPayload::Escalation(escalation.clone())))
                .await?;
        }
        self.store
            .append(&GovernanceRecord::new(RecordPayload::Comparison(
                outcome.comparison.clone(),
            )))
            .await?;

        self.latest
            .write()
            .await
            .insert(loop_id, outcome.comparison.clone());
        Ok(outcome)
    }

    /// Deterministic winner among eligible candidates: highest weighted
    /// score, ties broken by trust desc, complexity asc, submission order.
    fn pick_winner<'a>(eligible: &[(usize, &'a Plan, f64)]) -> Option<(usize, &'a Plan, f64)> {
        let mut best: Option<(usize, &Plan, f64)> = None;
        for &(index, plan, score) in eligible {
            let Some((_, best_plan, best_score)) = best else {
                best = Some((index, plan, score));
                continue;
            };
            let better = match score.total_cmp(&best_score) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => match plan.trust_score.total_cmp(&best_plan.trust_score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    // Earlier submission wins the final tie, so only a
                    // strictly lower complexity displaces the holder.
                    std::cmp::Ordering::Equal => {
                        plan.complexity_score.total_cmp(&best_plan.complexity_score)
                            == std::cmp::Ordering::Less
                    }
                },
            };
            if better {
                best = Some((index, plan, score));
            }
        }
        best
    }

    fn resolve_weights(&self, weights: Option<CriteriaWeights>) -> Result<CriteriaWeights, GovernanceError> {
        let weights = weights.unwrap_or(self.config.default_weights);
        let sum = weights.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(GovernanceError::InvalidWeights { sum });
        }
        let drift = (sum - 1.0).abs();
        if drift <= self.config.weight_tolerance {
            return Ok(weights);
        }
        if drift <= self.config.normalize_within {
            debug!(sum, "criteria weights normalized");
            return Ok(weights.normalized());
        }
        Err(GovernanceError::InvalidWeights { sum })
    }

    /// Latest comparison for a loop, if any.
    pub async fn latest_for_loop(&self, loop_id: Uuid) -> Option<PlanComparisonRecord> {
        self.latest.read().await.get(&loop_id).cloned()
    }

    /// Mark the loop's pending comparison abandoned after cancellation.
    /// Each still-standing candidate gets a rejection record so the audit
    /// trail explains why none of them ran.
    pub async fn abandon(&self, loop_id: Uuid) -> Result<Option<PlanComparisonRecord>, GovernanceError> {
        let mut latest = self.latest.write().await;
        let Some(comparison) = latest.get_mut(&loop_id) else {
            return Ok(None);
        };
        if comparison.status != ComparisonStatus::Escalated && comparison.status != ComparisonStatus::Selected {
            return Ok(Some(comparison.clone()));
        }

        comparison.status = ComparisonStatus::Abandoned;
        comparison.selected_plan_id = None;
        for plan in &comparison.candidate_plans {
            self.store
                .append(&GovernanceRecord::new(RecordPayload::Rejection(
                    RejectionRecord::new(
                        comparison.comparison_id,
                        loop_id,
                        plan.plan_id,
                        "comparison abandoned: loop cancelled",
                    ),
                )))
                .await?;
        }
        self.store
            .append(&GovernanceRecord::new(RecordPayload::Comparison(comparison.clone())))
            .await?;
        info!(loop_id = %loop_id, comparison_id = %comparison.comparison_id, "comparison abandoned");
        Ok(Some(comparison.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RecordKind;
    use crate::domain::ports::{InMemoryRecordStore, RecordQuery};

    fn selector() -> (PlanSelector, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        (PlanSelector::new(PlanSelectorConfig::default(), store.clone()), store)
    }

    fn plan(summary: &str, trust: f64, utility: f64, complexity: f64, alignment: f64) -> Plan {
        let mut plan = Plan::new(summary);
        plan.trust_score = trust;
        plan.expected_utility = utility;
        plan.complexity_score = complexity;
        plan.alignment_score = alignment;
        plan
    }

    #[tokio::test]
    async fn test_higher_weighted_score_wins() {
        let (selector, store) = selector();
        // Default weights: 0.4*trust + 0.3*utility + 0.1*complexity + 0.2*alignment
        let a = plan("a", 0.9, 0.7, 0.4, 0.5); // 0.36 + 0.21 + 0.04 + 0.10 = 0.71
        let b = plan("b", 0.6, 0.5, 0.7, 0.6); // 0.24 + 0.15 + 0.07 + 0.12 = 0.58
        let a_id = a.plan_id;
        let b_id = b.plan_id;

        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![a, b], None)
            .await
            .unwrap();
        assert_eq!(outcome.comparison.status, ComparisonStatus::Selected);
        assert_eq!(outcome.selected.unwrap().plan_id, a_id);

        let rejections = store
            .query(RecordQuery::new().kind(RecordKind::Rejection))
            .await
            .unwrap();
        assert_eq!(rejections.len(), 1);
        match &rejections[0].payload {
            RecordPayload::Rejection(r) => assert_eq!(r.plan_id, b_id),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invariant_violator_never_selected() {
        let (selector, store) = selector();
        let mut cheat = plan("cheat", 1.0, 1.0, 1.0, 1.0);
        cheat.invariant_check_passed = false;
        cheat.invariant_violations = vec!["writes outside sandbox".to_string()];
        let honest = plan("honest", 0.7, 0.6, 0.3, 0.6);
        let honest_id = honest.plan_id;

        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![cheat, honest], None)
            .await
            .unwrap();
        assert_eq!(outcome.selected.unwrap().plan_id, honest_id);

        let rejections = store
            .query(RecordQuery::new().kind(RecordKind::Rejection))
            .await
            .unwrap();
        assert_eq!(rejections.len(), 1);
        match &rejections[0].payload {
            RecordPayload::Rejection(r) => {
                assert!(r.rejection_reason.contains("invariant violation"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_violators_escalates() {
        let (selector, _) = selector();
        let mut a = plan("a", 0.9, 0.9, 0.9, 0.9);
        a.invariant_check_passed = false;
        let mut b = plan("b", 0.8, 0.8, 0.8, 0.8);
        b.invariant_check_passed = false;

        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![a, b], None)
            .await
            .unwrap();
        assert_eq!(outcome.comparison.status, ComparisonStatus::Escalated);
        let escalation = outcome.escalation.unwrap();
        assert!(escalation.operator_alert_flag);
        assert_eq!(escalation.recommended_action, "operator_review_required");
        assert_eq!(escalation.rejected_plan_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_below_minimum_score_escalates() {
        let (selector, _) = selector();
        let weak = plan("weak", 0.3, 0.2, 0.1, 0.2); // score 0.23

        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![weak], None)
            .await
            .unwrap();
        assert_eq!(outcome.comparison.status, ComparisonStatus::Escalated);
        assert!(outcome
            .escalation
            .unwrap()
            .escalation_reason
            .contains("below minimum selection score"));
    }

    #[tokio::test]
    async fn test_tie_breaks_by_trust_then_complexity_then_order() {
        let (selector, _) = selector();
        // Zero weight on trust and complexity makes scores tie exactly
        // while those fields still differ for the tie-break.
        let weights = CriteriaWeights {
            trust_score: 0.0,
            expected_utility: 0.6,
            complexity_score: 0.0,
            alignment_with_emotion: 0.4,
        };

        // Same score, b has higher trust
        let a = plan("a", 0.6, 0.8, 0.5, 0.7);
        let b = plan("b", 0.8, 0.8, 0.5, 0.7);
        let b_id = b.plan_id;
        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![a, b], Some(weights))
            .await
            .unwrap();
        assert_eq!(outcome.selected.unwrap().plan_id, b_id);

        // Same score and trust: lower complexity wins
        let c = plan("c", 0.8, 0.8, 0.5, 0.7);
        let d = plan("d", 0.8, 0.8, 0.3, 0.7);
        let d_id = d.plan_id;
        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![c, d], Some(weights))
            .await
            .unwrap();
        assert_eq!(outcome.selected.unwrap().plan_id, d_id);

        // Fully identical: first submitted wins
        let e = plan("e", 0.8, 0.8, 0.5, 0.7);
        let f = plan("f", 0.8, 0.8, 0.5, 0.7);
        let e_id = e.plan_id;
        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![e, f], Some(weights))
            .await
            .unwrap();
        assert_eq!(outcome.selected.unwrap().plan_id, e_id);
    }

    #[tokio::test]
    async fn test_weights_close_to_one_are_normalized() {
        let (selector, _) = selector();
        let weights = CriteriaWeights {
            trust_score: 0.41,
            expected_utility: 0.3,
            complexity_score: 0.1,
            alignment_with_emotion: 0.22,
        }; // sum 1.03, within normalize_within
        let strong = plan("strong", 0.9, 0.8, 0.5, 0.7);

        let outcome = selector
            .compare(Uuid::new_v4(), "deploy", vec![strong], Some(weights))
            .await
            .unwrap();
        assert_eq!(outcome.comparison.status, ComparisonStatus::Selected);
        assert!((outcome.comparison.criteria_weights.sum() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_weights_far_from_one_are_rejected() {
        let (selector, _) = selector();
        let weights = CriteriaWeights {
            trust_score: 0.4,
            expected_utility: 0.3,
            complexity_score: 0.1,
            alignment_with_emotion: 0.1,
        }; // sum 0.9
        let err = selector
            .compare(Uuid::new_v4(), "deploy", vec![plan("p", 0.9, 0.9, 0.9, 0.9)], Some(weights))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidWeights { .. }));
    }

    #[tokio::test]
    async fn test_empty_candidates_rejected() {
        let (selector, _) = selector();
        let err = selector
            .compare(Uuid::new_v4(), "deploy", Vec::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_abandon_marks_comparison_and_rejects_candidates() {
        let (selector, store) = selector();
        let loop_id = Uuid::new_v4();
        let a = plan("a", 0.9, 0.8, 0.5, 0.7);
        let b = plan("b", 0.7, 0.6, 0.4, 0.6);
        selector
            .compare(loop_id, "deploy", vec![a, b], None)
            .await
            .unwrap();

        let abandoned = selector.abandon(loop_id).await.unwrap().unwrap();
        assert_eq!(abandoned.status, ComparisonStatus::Abandoned);
        assert!(abandoned.selected_plan_id.is_none());

        let rejections = store
            .query(RecordQuery::new().kind(RecordKind::Rejection).loop_id(loop_id))
            .await
            .unwrap();
        // One from the original comparison, two from abandonment
        assert_eq!(rejections.len(), 3);
    }

    #[tokio::test]
    async fn test_abandon_unknown_loop_is_noop() {
        let (selector, _) = selector();
        assert!(selector.abandon(Uuid::new_v4()).await.unwrap().is_none());
    }
}
