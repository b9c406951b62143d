//! Property-based tests for governance invariants
//!
//! Tests the following properties:
//! 1. Trust scores stay in [0,1] for any in-range metrics
//! 2. Weight normalization preserves proportions and sums to 1.0
//! 3. Weighted plan scores are bounded by the candidate's components
//! 4. The selected plan always carries the maximal weighted score
//! 5. Invariant-violating plans are never selected

use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use uuid::Uuid;

use loopgate::domain::models::{CriteriaWeights, MetricWeights, Plan, TrustMetrics};
use loopgate::domain::ports::{InMemoryRecordStore, RecordStore};
use loopgate::services::{PlanSelector, PlanSelectorConfig};

fn unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

fn metrics_strategy() -> impl Strategy<Value = TrustMetrics> {
    (unit(), unit(), unit(), unit(), unit(), unit()).prop_map(
        |(summary_realism, loop_success, reflection_clarity, contradiction_frequency, revision_rate, operator_override)| {
            TrustMetrics {
                summary_realism,
                loop_success,
                reflection_clarity,
                contradiction_frequency,
                revision_rate,
                operator_override,
            }
        },
    )
}

fn plan_strategy() -> impl Strategy<Value = Plan> {
    (unit(), unit(), unit(), unit()).prop_map(|(trust, utility, complexity, alignment)| {
        let mut plan = Plan::new("candidate");
        plan.trust_score = trust;
        plan.expected_utility = utility;
        plan.complexity_score = complexity;
        plan.alignment_score = alignment;
        plan
    })
}

fn selector() -> PlanSelector {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
    PlanSelector::new(PlanSelectorConfig::default(), store)
}

proptest! {
    /// In-range metrics always produce a trust score inside [0,1],
    /// whatever the (non-degenerate) weighting.
    #[test]
    fn prop_trust_score_in_unit_interval(
        metrics in metrics_strategy(),
        w in (0.01f64..=1.0, 0.01f64..=1.0, 0.01f64..=1.0, 0.01f64..=1.0, 0.01f64..=1.0, 0.01f64..=1.0),
    ) {
        let weights = MetricWeights {
            summary_realism: w.0,
            loop_success: w.1,
            reflection_clarity: w.2,
            contradiction_frequency: w.3,
            revision_rate: w.4,
            operator_override: w.5,
        };
        let score = weights.score(&metrics);
        prop_assert!((0.0..=1.0).contains(&score), "score {score} out of range");
    }

    /// Normalization always yields a sum of 1.0 and keeps the relative
    /// proportions between any two weights.
    #[test]
    fn prop_weight_normalization(
        trust in 0.01f64..=2.0,
        utility in 0.01f64..=2.0,
        complexity in 0.01f64..=2.0,
        alignment in 0.01f64..=2.0,
    ) {
        let weights = CriteriaWeights {
            trust_score: trust,
            expected_utility: utility,
            complexity_score: complexity,
            alignment_with_emotion: alignment,
        };
        let normalized = weights.normalized();

        prop_assert!((normalized.sum() - 1.0).abs() < 1e-9);
        let before = weights.trust_score / weights.expected_utility;
        let after = normalized.trust_score / normalized.expected_utility;
        prop_assert!((before - after).abs() < 1e-6);
    }

    /// A weighted score over unit-interval components and unit-sum
    /// weights stays in the unit interval.
    #[test]
    fn prop_weighted_score_bounded(plan in plan_strategy()) {
        let score = CriteriaWeights::default().weighted_score(&plan);
        prop_assert!((0.0..=1.0).contains(&score), "score {score} out of range");
    }

    /// Whenever a comparison selects a plan, that plan's weighted score
    /// is maximal among the candidates.
    #[test]
    fn prop_selected_plan_has_maximal_score(
        plans in prop::collection::vec(plan_strategy(), 1..8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let selector = selector();
            let scores: Vec<f64> = plans
                .iter()
                .map(|p| CriteriaWeights::default().weighted_score(p))
                .collect();

            let outcome = selector
                .compare(Uuid::new_v4(), "decision", plans, None)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            match outcome.selected {
                Some(winner) => {
                    let winning = CriteriaWeights::default().weighted_score(&winner);
                    for score in &scores {
                        prop_assert!(winning >= *score - 1e-9);
                    }
                }
                None => {
                    // Escalated: every candidate fell below the minimum
                    let min = PlanSelectorConfig::default().min_selection_score;
                    for score in &scores {
                        prop_assert!(*score < min);
                    }
                    prop_assert!(outcome.escalation.is_some());
                }
            }
            Ok(())
        })?;
    }

    /// Plans that fail their invariant check are never selected, no
    /// matter how well they score.
    #[test]
    fn prop_invariant_violators_never_selected(
        plans in prop::collection::vec(plan_strategy(), 1..6),
        violator_score in 0.9f64..=1.0,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let selector = selector();

            let mut violator = Plan::new("tempting but unsafe");
            violator.trust_score = violator_score;
            violator.expected_utility = violator_score;
            violator.complexity_score = violator_score;
            violator.alignment_score = violator_score;
            violator.invariant_check_passed = false;
            violator.invariant_violations = vec!["writes outside sandbox".to_string()];
            let violator_id = violator.plan_id;

            let mut candidates = plans;
            candidates.push(violator);

            let outcome = selector
                .compare(Uuid::new_v4(), "decision", candidates, None)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            if let Some(winner) = outcome.selected {
                prop_assert!(winner.plan_id != violator_id);
            }
            Ok(())
        })?;
    }
}
