//! Freeze lock controller: the execution gate for loops.
//!
//! Evaluates a loop's state against thresholds in a fixed rule order and
//! decides whether execution may proceed, must freeze pending
//! re-reflection, or must wait for an operator. Per-loop state machine:
//! `clear → frozen → (overridden | re-reflected) → clear`, terminal
//! `resolved`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::{
    params, ExecutionStatus, FreezeEvent, FreezeStatus, GovernanceRecord, LoopState, LoopStatus,
    RecordKind, RecordPayload, RequiredAction,
};
use crate::domain::ports::{GovernanceError, RecordQuery, RecordStore};
use crate::services::threshold_registry::ThresholdRegistry;

/// Configuration for the freeze controller.
#[derive(Debug, Clone)]
pub struct FreezeControllerConfig {
    /// Trust score below which rule 4 freezes the loop. Kept equal to
    /// the demotion threshold so the two systems cannot disagree.
    pub trust_floor: f64,
}

impl Default for FreezeControllerConfig {
    fn default() -> Self {
        Self { trust_floor: 0.5 }
    }
}

struct LoopEntry {
    state: LoopState,
    /// Latest freeze event for this loop, any status.
    freeze: Option<FreezeEvent>,
}

/// Service gating loop execution behind threshold checks.
pub struct FreezeController {
    config: FreezeControllerConfig,
    thresholds: Arc<ThresholdRegistry>,
    store: Arc<dyn RecordStore>,
    /// Live loops. The map lock serializes control operations, giving
    /// single-writer-per-loop without finer-grained locking.
    loops: RwLock<HashMap<Uuid, LoopEntry>>,
    /// Loops that reached a terminal status, kept for queries.
    archived: RwLock<HashMap<Uuid, LoopState>>,
    /// Per-loop control locks, held across compound operations so a
    /// freeze evaluation and a plan comparison for the same loop never
    /// interleave.
    control: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl FreezeController {
    pub fn new(
        config: FreezeControllerConfig,
        thresholds: Arc<ThresholdRegistry>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            thresholds,
            store,
            loops: RwLock::new(HashMap::new()),
            archived: RwLock::new(HashMap::new()),
            control: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the control lock for a loop. Callers hold the guard across
    /// every step that must observe a stable loop state, such as the
    /// readiness check and the plan comparison it gates.
    pub async fn control_lock(&self, loop_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut control = self.control.lock().await;
            Arc::clone(control.entry(loop_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Rebuild per-loop freeze state by replaying the freeze log. The
    /// final record per loop wins; loops whose last freeze is resolved or
    /// overridden come back unfrozen.
    pub async fn hydrate(&self) -> Result<(), GovernanceError> {
        let records = self
            .store
            .query(RecordQuery::new().kind(RecordKind::Freeze).ascending())
            .await?;

        let mut loops = self.loops.write().await;
        loops.clear();
        for record in records {
            if let RecordPayload::Freeze(event) = record.payload {
                // Loops without an active freeze come back idle and must
                // pass a fresh evaluation before executing again.
                let mut state = event.original_state.clone();
                state.status = if event.is_active() {
                    LoopStatus::Frozen
                } else {
                    LoopStatus::Idle
                };
                loops.insert(
                    event.loop_id,
                    LoopEntry {
                        state,
                        freeze: Some(event),
                    },
                );
            }
        }
        info!(loops = loops.len(), "freeze projection hydrated");
        Ok(())
    }

    /// Evaluate whether a loop may execute.
    ///
    /// Rules are applied in a fixed order, first match wins:
    /// 1. manual override → execute;
    /// 2. unresolved contradictions → freeze (re-reflect);
    /// 3. confidence below alignment threshold → freeze (re-reflect);
    /// 4. trust below the trust floor → freeze (operator override);
    /// 5. execute.
    ///
    /// Re-evaluating an unchanged state is idempotent: an already-active
    /// freeze with the same reason is returned as-is, not re-emitted.
    pub async fn evaluate(&self, state: LoopState) -> Result<ExecutionStatus, GovernanceError> {
        let loop_id = state.loop_id;
        if self.archived.read().await.contains_key(&loop_id) {
            return Err(GovernanceError::Validation(format!(
                "loop {loop_id} already reached a terminal status"
            )));
        }

        let alignment_threshold = self.thresholds.get(params::ALIGNMENT_THRESHOLD)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_reruns = self.thresholds.get(params::MAX_RERUNS)?.max(0.0) as u32;

        let mut loops = self.loops.write().await;

        if state.rerun_count > max_reruns {
            let mut failed = state;
            failed.status = LoopStatus::Failed;
            warn!(loop_id = %loop_id, rerun_count = failed.rerun_count, max_reruns, "max reruns exceeded, loop failed");
            self.archive_locked(&mut loops, failed).await;
            return Err(GovernanceError::MaxRerunsExceeded { loop_id, max_reruns });
        }

        let decision = Self::decide(&state, alignment_threshold, self.config.trust_floor);

        match decision {
            None => {
                // Clear: close out any standing freeze.
                let entry = loops.entry(loop_id).or_insert_with(|| LoopEntry {
                    state: state.clone(),
                    freeze: None,
                });
                if let Some(freeze) = entry.freeze.as_mut().filter(|f| f.is_active()) {
                    freeze.status = if state.manual_override {
                        FreezeStatus::Overridden
                    } else {
                        FreezeStatus::Resolved
                    };
                    self.store
                        .append(&GovernanceRecord::new(RecordPayload::Freeze(freeze.clone())))
                        .await?;
                    info!(loop_id = %loop_id, status = freeze.status.as_str(), "freeze cleared");
                }
                entry.state = state;
                entry.state.status = LoopStatus::Looping;
                debug!(loop_id = %loop_id, "loop clear to execute");
                Ok(ExecutionStatus::clear())
            }
            Some((reason, required_action)) => {
                let entry = loops.entry(loop_id).or_insert_with(|| LoopEntry {
                    state: state.clone(),
                    freeze: None,
                });

                // Unchanged state: same active freeze, same answer.
                if let Some(existing) = entry.freeze.as_ref().filter(|f| f.is_active() && f.reason == reason) {
                    return Ok(ExecutionStatus::frozen(existing.clone()));
                }

                // A standing freeze for a different reason gets a terminal
                // transition before its replacement is emitted, so the log
                // never shows two open freezes for one loop.
                if let Some(superseded) = entry.freeze.as_mut().filter(|f| f.is_active()) {
                    superseded.status = FreezeStatus::Resolved;
                    self.store
                        .append(&GovernanceRecord::new(RecordPayload::Freeze(superseded.clone())))
                        .await?;
                    info!(loop_id = %loop_id, superseded = %superseded.reason, "freeze superseded");
                }

                let event = FreezeEvent::new(loop_id, reason, required_action, &state);
                self.store
                    .append(&GovernanceRecord::new(RecordPayload::Freeze(event.clone())))
                    .await?;

                entry.state = state;
                entry.state.status = LoopStatus::Frozen;
                entry.freeze = Some(event.clone());

                warn!(
                    loop_id = %loop_id,
                    reason = %event.reason,
                    required_action = event.required_action.as_str(),
                    "loop frozen"
                );
                Ok(ExecutionStatus::frozen(event))
            }
        }
    }

    /// The ordered decision rules. Returns the freeze reason and required
    /// action, or `None` when execution may proceed.
    fn decide(state: &LoopState, alignment_threshold: f64, trust_floor: f64) -> Option<(&'static str, RequiredAction)> {
        if state.manual_override {
            return None;
        }
        if state.contradictions_unresolved > 0 {
            return Some(("unresolved contradictions", RequiredAction::ReReflect));
        }
        if state.confidence_score < alignment_threshold {
            return Some(("confidence below alignment threshold", RequiredAction::ReReflect));
        }
        if state.trust_score < trust_floor {
            return Some(("trust breakdown", RequiredAction::OperatorOverride));
        }
        None
    }

    /// Operator override of an active freeze. The required action is
    /// recorded as satisfied by the operator, not by re-reflection.
    pub async fn override_freeze(&self, loop_id: Uuid, actor: &str) -> Result<FreezeEvent, GovernanceError> {
        let mut loops = self.loops.write().await;
        let entry = loops
            .get_mut(&loop_id)
            .ok_or(GovernanceError::UnknownLoop(loop_id))?;
        let Some(freeze) = entry.freeze.as_mut().filter(|f| f.is_active()) else {
            return Err(GovernanceError::Validation(format!(
                "loop {loop_id} has no active freeze to override"
            )));
        };

        freeze.status = FreezeStatus::Overridden;
        freeze.resolved_by = Some(actor.to_string());
        self.store
            .append(&GovernanceRecord::new(RecordPayload::Freeze(freeze.clone())))
            .await?;
        entry.state.status = LoopStatus::Looping;

        warn!(loop_id = %loop_id, actor, "freeze overridden by operator");
        Ok(freeze.clone())
    }

    /// Whether the loop currently has an active freeze. Read-only.
    pub async fn is_frozen(&self, loop_id: Uuid) -> bool {
        let loops = self.loops.read().await;
        loops
            .get(&loop_id)
            .and_then(|e| e.freeze.as_ref())
            .is_some_and(FreezeEvent::is_active)
    }

    /// Latest freeze event for a loop, any status. Read-only, idempotent.
    pub async fn get_event(&self, loop_id: Uuid) -> Option<FreezeEvent> {
        let loops = self.loops.read().await;
        loops.get(&loop_id).and_then(|e| e.freeze.clone())
    }

    /// Current state of a live or archived loop.
    pub async fn get_state(&self, loop_id: Uuid) -> Option<LoopState> {
        if let Some(entry) = self.loops.read().await.get(&loop_id) {
            return Some(entry.state.clone());
        }
        self.archived.read().await.get(&loop_id).cloned()
    }

    /// Whether downstream components may run plan selection for this loop.
    pub async fn can_proceed(&self, loop_id: Uuid) -> bool {
        let loops = self.loops.read().await;
        loops
            .get(&loop_id)
            .is_some_and(|e| e.state.status == LoopStatus::Looping)
    }

    /// Mark a loop escalated after a failed plan selection.
    pub async fn mark_escalated(&self, loop_id: Uuid) -> Result<(), GovernanceError> {
        let mut loops = self.loops.write().await;
        let entry = loops
            .get_mut(&loop_id)
            .ok_or(GovernanceError::UnknownLoop(loop_id))?;
        entry.state.status = LoopStatus::Escalated;
        Ok(())
    }

    /// Complete a loop. Rejected while a freeze is still active.
    pub async fn complete(&self, loop_id: Uuid) -> Result<LoopState, GovernanceError> {
        let mut loops = self.loops.write().await;
        let entry = loops
            .get_mut(&loop_id)
            .ok_or(GovernanceError::UnknownLoop(loop_id))?;
        if entry.freeze.as_ref().is_some_and(FreezeEvent::is_active) {
            return Err(GovernanceError::InvariantViolation(format!(
                "loop {loop_id} cannot complete while a freeze is active"
            )));
        }

        let mut state = entry.state.clone();
        state.status = LoopStatus::Completed;
        info!(loop_id = %loop_id, "loop completed");
        self.archive_locked(&mut loops, state.clone()).await;
        Ok(state)
    }

    /// Cancel a loop, forcing `status = failed`. Any active freeze is
    /// resolved so the archive carries no dangling holds.
    pub async fn cancel(&self, loop_id: Uuid) -> Result<LoopState, GovernanceError> {
        let mut loops = self.loops.write().await;
        let entry = loops
            .get_mut(&loop_id)
            .ok_or(GovernanceError::UnknownLoop(loop_id))?;

        if let Some(freeze) = entry.freeze.as_mut().filter(|f| f.is_active()) {
            freeze.status = FreezeStatus::Resolved;
            self.store
                .append(&GovernanceRecord::new(RecordPayload::Freeze(freeze.clone())))
                .await?;
        }

        let mut state = entry.state.clone();
        state.status = LoopStatus::Failed;
        warn!(loop_id = %loop_id, "loop cancelled");
        self.archive_locked(&mut loops, state.clone()).await;
        Ok(state)
    }

    async fn archive_locked(&self, loops: &mut HashMap<Uuid, LoopEntry>, state: LoopState) {
        let loop_id = state.loop_id;
        loops.remove(&loop_id);
        self.control.lock().await.remove(&loop_id);
        self.archived.write().await.insert(loop_id, state);
    }
}
