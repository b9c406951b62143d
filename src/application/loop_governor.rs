//! Application facade wiring the governance services together.
//!
//! Owns construction and hydration of the service graph and exposes the
//! operations the HTTP server and CLI call. All cross-service sequencing
//! lives here: trust events feed demotion, plan comparison is gated on
//! the freeze controller, cancellation abandons pending comparisons.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    Belief, Config, ContradictionRecord, ContradictionResolution, CriteriaWeights, DemotionEvent,
    EscalationRecord, ExecutionStatus, FreezeEvent, LoopState, Plan, RetractionReason,
    RetractionRecord, Threshold, TrustEvent, TrustMetrics, TrustStatus,
};
use crate::domain::ports::{GovernanceError, RecordStore};
use crate::services::{
    DemotionConfig, DemotionManager, EscalationHandler, FreezeController, FreezeControllerConfig,
    PlanSelector, PlanSelectorConfig, RoleMap, SelectionOutcome, ThresholdRegistry, TrustEvaluator,
    TrustEvaluatorConfig,
};

/// Central facade over the governance engine.
pub struct LoopGovernor {
    thresholds: Arc<ThresholdRegistry>,
    trust: Arc<TrustEvaluator>,
    demotion: Arc<DemotionManager>,
    freeze: Arc<FreezeController>,
    plans: Arc<PlanSelector>,
    escalations: Arc<EscalationHandler>,
}

impl LoopGovernor {
    /// Build the service graph from configuration over a shared store.
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        let governance = &config.governance;
        let beliefs = config
            .beliefs
            .iter()
            .map(|seed| Belief::new(seed.name.clone(), seed.description.clone(), seed.priority))
            .collect();
        let thresholds = Arc::new(ThresholdRegistry::with_overrides(&config.thresholds, beliefs));

        let demotion = Arc::new(DemotionManager::new(
            DemotionConfig {
                demotion_threshold: governance.demotion_threshold,
                hysteresis_margin: governance.hysteresis_margin,
                default_trust: governance.default_trust,
            },
            RoleMap::new(governance.roles.clone()),
            store.clone(),
        ));
        let trust = Arc::new(TrustEvaluator::new(
            TrustEvaluatorConfig {
                metric_weights: governance.metric_weights,
                default_trust: governance.default_trust,
            },
            store.clone(),
            demotion.clone(),
        ));
        let freeze = Arc::new(FreezeController::new(
            FreezeControllerConfig {
                trust_floor: governance.demotion_threshold,
            },
            thresholds.clone(),
            store.clone(),
        ));
        let plans = Arc::new(PlanSelector::new(
            PlanSelectorConfig {
                min_selection_score: governance.min_selection_score,
                weight_tolerance: governance.weight_tolerance,
                normalize_within: governance.normalize_within,
                default_weights: CriteriaWeights::default(),
            },
            store.clone(),
        ));
        let escalations = Arc::new(EscalationHandler::new(store));

        Self {
            thresholds,
            trust,
            demotion,
            freeze,
            plans,
            escalations,
        }
    }

    /// Rebuild all in-memory projections from the record log. Called once
    /// at startup before serving traffic.
    pub async fn hydrate(&self) -> Result<(), GovernanceError> {
        self.demotion.hydrate().await?;
        self.trust.hydrate().await?;
        self.escalations.hydrate().await?;
        self.freeze.hydrate().await?;
        info!("governance projections hydrated");
        Ok(())
    }

    /// Evaluate whether a loop may execute.
    ///
    /// The caller's state is enriched before the gate runs: the trust
    /// projection overrides the caller's trust score for agents with
    /// recorded history, and tracked contradictions are folded into the
    /// unresolved count so a stale caller cannot talk its way past rule 2.
    pub async fn evaluate_loop(&self, mut state: LoopState) -> Result<ExecutionStatus, GovernanceError> {
        let _control = self.freeze.control_lock(state.loop_id).await;
        if let Some(score) = self.trust.score_snapshot().await.get(&state.agent_id) {
            state.trust_score = *score;
        }
        let tracked = self.escalations.unresolved_count(state.loop_id).await;
        state.contradictions_unresolved = state.contradictions_unresolved.max(tracked);

        self.freeze.evaluate(state).await
    }

    /// Operator override of an active freeze.
    pub async fn override_freeze(&self, loop_id: Uuid, actor: &str) -> Result<FreezeEvent, GovernanceError> {
        let _control = self.freeze.control_lock(loop_id).await;
        self.freeze.override_freeze(loop_id, actor).await
    }

    /// Record loop-derived trust metrics for an agent.
    pub async fn record_trust(
        &self,
        agent: &str,
        loop_id: Uuid,
        metrics: TrustMetrics,
    ) -> Result<TrustEvent, GovernanceError> {
        self.trust.record_event(agent, loop_id, metrics).await
    }

    /// Compare candidate plans for a loop's decision point. Refused while
    /// the loop is frozen or otherwise not clear to execute.
    pub async fn compare_plans(
        &self,
        loop_id: Uuid,
        decision_point: &str,
        plans: Vec<Plan>,
        weights: Option<CriteriaWeights>,
    ) -> Result<SelectionOutcome, GovernanceError> {
        // Held across the gate and the comparison so a concurrent freeze
        // evaluation for the same loop cannot slip in between them.
        let _control = self.freeze.control_lock(loop_id).await;
        if !self.freeze.can_proceed(loop_id).await {
            return Err(GovernanceError::InvariantViolation(format!(
                "loop {loop_id} is not clear to execute; evaluate or override first"
            )));
        }

        let outcome = self.plans.compare(loop_id, decision_point, plans, weights).await?;
        if outcome.selected.is_none() {
            self.freeze.mark_escalated(loop_id).await?;
        }
        Ok(outcome)
    }

    /// Retract a prior reflection. When a replan is required the loop must
    /// come back through `evaluate_loop`; retraction never clears a freeze
    /// by itself.
    pub async fn retract_reflection(
        &self,
        loop_id: Uuid,
        reflection_ref: &str,
        revised_content: &str,
        reason: RetractionReason,
        flag_as_flawed: bool,
        replan_required: bool,
    ) -> Result<RetractionRecord, GovernanceError> {
        let record = self
            .escalations
            .retract(loop_id, reflection_ref, revised_content, reason, flag_as_flawed, replan_required)
            .await?;
        if replan_required {
            warn!(loop_id = %loop_id, "retraction requires replan; loop must re-enter evaluation");
        }
        Ok(record)
    }

    pub async fn record_contradiction(
        &self,
        loop_id: Uuid,
        agent: &str,
        belief_1: Uuid,
        belief_2: Uuid,
        kind: &str,
        score: f64,
    ) -> Result<ContradictionRecord, GovernanceError> {
        self.escalations
            .record_contradiction(loop_id, agent, belief_1, belief_2, kind, score)
            .await
    }

    pub async fn resolve_contradiction(
        &self,
        contradiction_id: Uuid,
        resolution: ContradictionResolution,
    ) -> Result<ContradictionRecord, GovernanceError> {
        self.escalations.resolve_contradiction(contradiction_id, resolution).await
    }

    /// Cancel a loop: status forced to failed, pending comparison marked
    /// abandoned so the audit trail stays complete.
    pub async fn cancel_loop(&self, loop_id: Uuid) -> Result<LoopState, GovernanceError> {
        let _control = self.freeze.control_lock(loop_id).await;
        let state = self.freeze.cancel(loop_id).await?;
        self.plans.abandon(loop_id).await?;
        Ok(state)
    }

    /// Complete a loop. Refused while a freeze is active.
    pub async fn complete_loop(&self, loop_id: Uuid) -> Result<LoopState, GovernanceError> {
        let _control = self.freeze.control_lock(loop_id).await;
        self.freeze.complete(loop_id).await
    }

    pub async fn loop_state(&self, loop_id: Uuid) -> Option<LoopState> {
        self.freeze.get_state(loop_id).await
    }

    pub async fn trust_score(&self, agent: &str) -> f64 {
        self.trust.get_score(agent).await
    }

    pub async fn trust_status(&self, agent: &str) -> TrustStatus {
        self.trust.get_status(agent).await
    }

    pub async fn trust_history(&self, agent: &str, limit: usize) -> Result<Vec<TrustEvent>, GovernanceError> {
        self.trust.get_history(agent, limit).await
    }

    pub async fn effective_agent(&self, agent: &str) -> String {
        self.demotion.get_effective_agent(agent).await
    }

    pub async fn active_demotion(&self, agent: &str) -> Option<DemotionEvent> {
        self.demotion.get_active(agent).await
    }

    /// Restore a demoted agent. The current trust projection is consulted;
    /// `manual` bypasses the hysteresis check.
    pub async fn restore_agent(&self, agent: &str, manual: bool) -> Result<DemotionEvent, GovernanceError> {
        let current_trust = self.trust.get_score(agent).await;
        self.demotion.restore(agent, current_trust, manual).await
    }

    pub async fn escalations_for_loop(
        &self,
        loop_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<EscalationRecord>, GovernanceError> {
        self.escalations.escalations(loop_id, limit).await
    }

    pub async fn all_escalations(&self, limit: Option<usize>) -> Result<Vec<EscalationRecord>, GovernanceError> {
        self.escalations.all_escalations(limit).await
    }

    pub fn thresholds(&self) -> Vec<Threshold> {
        self.thresholds.all()
    }

    pub fn beliefs(&self) -> Vec<Belief> {
        self.thresholds.beliefs().to_vec()
    }

    pub fn belief(&self, name: &str) -> Option<Belief> {
        self.thresholds.belief(name).cloned()
    }

    pub fn threshold(&self, parameter_name: &str) -> Result<Threshold, GovernanceError> {
        self.thresholds.get_threshold(parameter_name)
    }

    /// Swap in a new threshold table atomically. In-flight evaluations
    /// keep the snapshot they started with.
    pub fn reload_thresholds(&self, thresholds: Vec<Threshold>) {
        self.thresholds.reload(thresholds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LoopStatus;
    use crate::domain::ports::InMemoryRecordStore;

    fn governor() -> LoopGovernor {
        LoopGovernor::new(&Config::default(), Arc::new(InMemoryRecordStore::new()))
    }

    fn healthy_state(agent: &str) -> LoopState {
        let mut state = LoopState::new(Uuid::new_v4(), agent, Uuid::new_v4());
        state.confidence_score = 0.9;
        state.trust_score = 0.8;
        state.status = LoopStatus::Looping;
        state
    }

    fn plan(summary: &str, score: f64) -> Plan {
        let mut plan = Plan::new(summary);
        plan.trust_score = score;
        plan.expected_utility = score;
        plan.complexity_score = score;
        plan.alignment_score = score;
        plan
    }

    #[tokio::test]
    async fn test_compare_refused_before_evaluation() {
        let governor = governor();
        let err = governor
            .compare_plans(Uuid::new_v4(), "deploy", vec![plan("p", 0.8)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_evaluate_then_compare_selects() {
        let governor = governor();
        let state = healthy_state("planner-1");
        let status = governor.evaluate_loop(state.clone()).await.unwrap();
        assert!(status.can_execute);

        let outcome = governor
            .compare_plans(state.loop_id, "deploy", vec![plan("p", 0.8)], None)
            .await
            .unwrap();
        assert!(outcome.selected.is_some());
    }

    #[tokio::test]
    async fn test_frozen_loop_blocks_comparison() {
        let governor = governor();
        let mut state = healthy_state("planner-1");
        state.confidence_score = 0.2;

        let status = governor.evaluate_loop(state.clone()).await.unwrap();
        assert!(!status.can_execute);

        let err = governor
            .compare_plans(state.loop_id, "deploy", vec![plan("p", 0.8)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvariantViolation(_)));

        // Override unblocks
        governor.override_freeze(state.loop_id, "operator").await.unwrap();
        let outcome = governor
            .compare_plans(state.loop_id, "deploy", vec![plan("p", 0.8)], None)
            .await
            .unwrap();
        assert!(outcome.selected.is_some());
    }

    #[tokio::test]
    async fn test_compare_waits_for_loop_control_lock() {
        let governor = Arc::new(governor());
        let state = healthy_state("planner-1");
        governor.evaluate_loop(state.clone()).await.unwrap();

        // Hold the loop's control lock as a concurrent evaluation would.
        let guard = governor.freeze.control_lock(state.loop_id).await;
        let task = {
            let governor = Arc::clone(&governor);
            let loop_id = state.loop_id;
            tokio::spawn(async move {
                governor
                    .compare_plans(loop_id, "deploy", vec![plan("p", 0.8)], None)
                    .await
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        drop(guard);
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.selected.is_some());
    }

    #[tokio::test]
    async fn test_tracked_contradiction_blocks_stale_caller() {
        let governor = governor();
        let state = healthy_state("planner-1");
        governor
            .record_contradiction(state.loop_id, "planner-1", Uuid::new_v4(), Uuid::new_v4(), "belief", 0.7)
            .await
            .unwrap();

        // Caller claims zero contradictions; the tracked count wins.
        let status = governor.evaluate_loop(state).await.unwrap();
        assert!(!status.can_execute);
        assert_eq!(
            status.freeze_event.unwrap().reason,
            "unresolved contradictions"
        );
    }

    #[tokio::test]
    async fn test_trust_projection_overrides_caller_score() {
        let governor = governor();
        let state = healthy_state("flaky-agent");

        // Record metrics bad enough to drop the projection below 0.5.
        let metrics = TrustMetrics {
            summary_realism: 0.1,
            loop_success: 0.1,
            reflection_clarity: 0.1,
            contradiction_frequency: 0.9,
            revision_rate: 0.9,
            operator_override: 0.9,
        };
        governor.record_trust("flaky-agent", state.loop_id, metrics).await.unwrap();

        let status = governor.evaluate_loop(state).await.unwrap();
        assert!(!status.can_execute);
        assert_eq!(status.freeze_event.unwrap().reason, "trust breakdown");
    }

    #[tokio::test]
    async fn test_escalated_comparison_marks_loop() {
        let governor = governor();
        let state = healthy_state("planner-1");
        governor.evaluate_loop(state.clone()).await.unwrap();

        let outcome = governor
            .compare_plans(state.loop_id, "deploy", vec![plan("weak", 0.2)], None)
            .await
            .unwrap();
        assert!(outcome.escalation.is_some());
        assert_eq!(
            governor.loop_state(state.loop_id).await.unwrap().status,
            LoopStatus::Escalated
        );

        let escalations = governor.escalations_for_loop(state.loop_id, None).await.unwrap();
        assert_eq!(escalations.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_abandons_pending_comparison() {
        let governor = governor();
        let state = healthy_state("planner-1");
        governor.evaluate_loop(state.clone()).await.unwrap();
        governor
            .compare_plans(state.loop_id, "deploy", vec![plan("p", 0.8)], None)
            .await
            .unwrap();

        let cancelled = governor.cancel_loop(state.loop_id).await.unwrap();
        assert_eq!(cancelled.status, LoopStatus::Failed);
    }

    #[tokio::test]
    async fn test_configured_beliefs_reach_registry() {
        let mut config = Config::default();
        config.beliefs.push(crate::domain::models::BeliefSeed {
            name: "no-irreversible-actions".to_string(),
            description: "Plans must not take irreversible external actions".to_string(),
            priority: crate::domain::models::BeliefPriority::Critical,
        });
        let governor = LoopGovernor::new(&config, Arc::new(InMemoryRecordStore::new()));

        assert_eq!(governor.beliefs().len(), 1);
        let belief = governor.belief("no-irreversible-actions").unwrap();
        assert_eq!(belief.priority, crate::domain::models::BeliefPriority::Critical);
        assert!(governor.belief("missing").is_none());
    }

    #[tokio::test]
    async fn test_restore_uses_trust_projection() {
        let governor = governor();
        let loop_id = Uuid::new_v4();
        let metrics = TrustMetrics {
            summary_realism: 0.1,
            loop_success: 0.1,
            reflection_clarity: 0.1,
            contradiction_frequency: 0.9,
            revision_rate: 0.9,
            operator_override: 0.9,
        };
        governor.record_trust("flaky-agent", loop_id, metrics).await.unwrap();
        assert!(governor.active_demotion("flaky-agent").await.is_some());

        // Score still below threshold + margin: restore refused.
        let err = governor.restore_agent("flaky-agent", false).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Validation(_)));

        // Manual restore bypasses the hysteresis check.
        let restored = governor.restore_agent("flaky-agent", true).await.unwrap();
        assert!(restored.manual);
        assert!(governor.active_demotion("flaky-agent").await.is_none());
    }
}
