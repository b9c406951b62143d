//! Escalation and reflection-retraction handling.
//!
//! Tracks contradictions raised against a loop's beliefs, records
//! retractions of flawed reflections, and serves the operator-facing
//! escalation query surface.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    ContradictionRecord, ContradictionResolution, EscalationRecord, GovernanceRecord, RecordKind,
    RecordPayload, RetractionReason, RetractionRecord,
};
use crate::domain::ports::{GovernanceError, RecordQuery, RecordStore};

/// Service for contradictions, retractions and escalation queries.
pub struct EscalationHandler {
    store: Arc<dyn RecordStore>,
    contradictions: RwLock<HashMap<Uuid, ContradictionRecord>>,
}

impl EscalationHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            contradictions: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the contradiction projection from the record log.
    pub async fn hydrate(&self) -> Result<(), GovernanceError> {
        let records = self
            .store
            .query(RecordQuery::new().kind(RecordKind::Contradiction).ascending())
            .await?;
        let mut contradictions = self.contradictions.write().await;
        contradictions.clear();
        for record in records {
            if let RecordPayload::Contradiction(contradiction) = record.payload {
                contradictions.insert(contradiction.contradiction_id, contradiction);
            }
        }
        info!(count = contradictions.len(), "contradiction projection hydrated");
        Ok(())
    }

    /// Register a contradiction between two beliefs in a loop.
    pub async fn record_contradiction(
        &self,
        loop_id: Uuid,
        agent: &str,
        belief_1: Uuid,
        belief_2: Uuid,
        kind: &str,
        score: f64,
    ) -> Result<ContradictionRecord, GovernanceError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(GovernanceError::Validation(format!(
                "contradiction score {score} outside [0, 1]"
            )));
        }
        let record = ContradictionRecord::new(loop_id, agent, belief_1, belief_2, kind, score);

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Contradiction(record.clone())))
            .await?;
        self.contradictions
            .write()
            .await
            .insert(record.contradiction_id, record.clone());

        warn!(
            loop_id = %loop_id,
            agent,
            belief_1 = %belief_1,
            belief_2 = %belief_2,
            score,
            "contradiction recorded"
        );
        Ok(record)
    }

    /// Transition a contradiction out of the unresolved state. A fresh
    /// freeze evaluation is still needed before the loop runs again.
    pub async fn resolve_contradiction(
        &self,
        contradiction_id: Uuid,
        resolution: ContradictionResolution,
    ) -> Result<ContradictionRecord, GovernanceError> {
        if resolution == ContradictionResolution::Unresolved {
            return Err(GovernanceError::Validation(
                "resolution must be flagged or revised".to_string(),
            ));
        }

        let mut contradictions = self.contradictions.write().await;
        let record = contradictions
            .get_mut(&contradiction_id)
            .ok_or(GovernanceError::UnknownContradiction(contradiction_id))?;
        record.resolution = resolution;

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Contradiction(record.clone())))
            .await?;
        info!(contradiction_id = %contradiction_id, resolution = ?resolution, "contradiction resolved");
        Ok(record.clone())
    }

    /// Unresolved contradictions currently standing against a loop.
    pub async fn unresolved_count(&self, loop_id: Uuid) -> u32 {
        let contradictions = self.contradictions.read().await;
        #[allow(clippy::cast_possible_truncation)]
        let count = contradictions
            .values()
            .filter(|c| c.loop_id == loop_id && !c.resolution.is_resolved())
            .count() as u32;
        count
    }

    /// Record the retraction of a prior reflection.
    pub async fn retract(
        &self,
        loop_id: Uuid,
        reflection_ref: &str,
        revised_content: &str,
        reason: RetractionReason,
        flag_as_flawed: bool,
        replan_required: bool,
    ) -> Result<RetractionRecord, GovernanceError> {
        if reflection_ref.is_empty() {
            return Err(GovernanceError::Validation(
                "retraction requires a reflection reference".to_string(),
            ));
        }
        let mut record = RetractionRecord::new(loop_id, reflection_ref, revised_content, reason);
        record.flag_as_flawed = flag_as_flawed;
        record.replan_required = replan_required;

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Retraction(record.clone())))
            .await?;
        info!(
            loop_id = %loop_id,
            reflection_ref,
            reason = ?reason,
            replan_required,
            "reflection retracted"
        );
        Ok(record)
    }

    /// Escalations recorded for a loop, newest first.
    pub async fn escalations(
        &self,
        loop_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<EscalationRecord>, GovernanceError> {
        let mut query = RecordQuery::new().kind(RecordKind::Escalation).loop_id(loop_id);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let records = self.store.query(query).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r.payload {
                RecordPayload::Escalation(escalation) => Some(escalation),
                _ => None,
            })
            .collect())
    }

    /// All escalations in the log, newest first.
    pub async fn all_escalations(&self, limit: Option<usize>) -> Result<Vec<EscalationRecord>, GovernanceError> {
        let mut query = RecordQuery::new().kind(RecordKind::Escalation);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let records = self.store.query(query).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r.payload {
                RecordPayload::Escalation(escalation) => Some(escalation),
                _ => None,
            })
            .collect())
    }
}
