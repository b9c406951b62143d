//! Demotion manager: substitutes fallback agents for low-trust agents.
//!
//! Per-agent state machine `active → demoted → active (restored)` or
//! `demoted → reset`, with a hysteresis margin on restoration to prevent
//! flapping around the threshold.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::models::{
    DemotionEvent, DemotionStatus, GovernanceRecord, RecordKind, RecordPayload,
};
use crate::domain::ports::{GovernanceError, RecordQuery, RecordStore};
use uuid::Uuid;

/// Configuration for demotion decisions.
#[derive(Debug, Clone)]
pub struct DemotionConfig {
    /// Trust score below which an agent is demoted.
    pub demotion_threshold: f64,
    /// Restoration requires trust >= threshold + this margin.
    pub hysteresis_margin: f64,
    /// Trust assumed for agents with no recorded history.
    pub default_trust: f64,
}

impl Default for DemotionConfig {
    fn default() -> Self {
        Self {
            demotion_threshold: 0.5,
            hysteresis_margin: 0.1,
            default_trust: 0.7,
        }
    }
}

/// Static capability-compatible fallback mapping: role class -> members.
#[derive(Debug, Clone, Default)]
pub struct RoleMap {
    members: HashMap<String, Vec<String>>,
}

impl RoleMap {
    pub fn new(members: HashMap<String, Vec<String>>) -> Self {
        Self { members }
    }

    /// Role class an agent belongs to, if any.
    pub fn role_of(&self, agent: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, agents)| agents.iter().any(|a| a == agent))
            .map(|(role, _)| role.as_str())
    }

    /// Same-role peers of an agent, excluding the agent itself.
    pub fn peers(&self, agent: &str) -> Vec<&str> {
        match self.role_of(agent) {
            Some(role) => self.members[role]
                .iter()
                .filter(|a| a.as_str() != agent)
                .map(String::as_str)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Service managing per-agent demotion state.
pub struct DemotionManager {
    config: DemotionConfig,
    role_map: RoleMap,
    store: Arc<dyn RecordStore>,
    /// Active demotion per agent. Keying by agent enforces the at-most-one
    /// active demotion invariant structurally.
    active: RwLock<HashMap<String, DemotionEvent>>,
}

impl DemotionManager {
    pub fn new(config: DemotionConfig, role_map: RoleMap, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            role_map,
            store,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the active-demotion projection by replaying the log.
    /// Transitions are applied in order: an `active` record opens a
    /// demotion, `restored`/`reset` close it.
    pub async fn hydrate(&self) -> Result<(), GovernanceError> {
        let records = self
            .store
            .query(RecordQuery::new().kind(RecordKind::Demotion).ascending())
            .await?;

        let mut active = self.active.write().await;
        active.clear();
        for record in records {
            if let RecordPayload::Demotion(event) = record.payload {
                match event.status {
                    DemotionStatus::Active => {
                        active.insert(event.agent.clone(), event);
                    }
                    DemotionStatus::Restored | DemotionStatus::Reset => {
                        active.remove(&event.agent);
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-check an agent after a trust event. Demotes when the new score
    /// is below the threshold and the agent is not already demoted.
    ///
    /// `peer_scores` is the caller's snapshot of current trust scores,
    /// used to pick the highest-trust compatible fallback.
    pub async fn on_trust_event(
        &self,
        agent: &str,
        trust_score: f64,
        loop_id: Option<Uuid>,
        peer_scores: &HashMap<String, f64>,
    ) -> Result<Option<DemotionEvent>, GovernanceError> {
        if trust_score >= self.config.demotion_threshold {
            return Ok(None);
        }

        let mut active = self.active.write().await;
        if active.contains_key(agent) {
            // Already demoted; one active demotion per agent.
            return Ok(None);
        }

        let fallback = self.choose_fallback(agent, peer_scores, &active);
        let fallback = match fallback {
            Some(name) => name,
            None => {
                warn!(agent, "no capability-compatible fallback available; demoting in place");
                agent.to_string()
            }
        };

        let event = DemotionEvent::new(
            agent,
            fallback.clone(),
            trust_score,
            format!(
                "trust score {trust_score:.3} below demotion threshold {:.3}",
                self.config.demotion_threshold
            ),
            loop_id,
        );

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Demotion(event.clone())))
            .await?;
        active.insert(agent.to_string(), event.clone());

        warn!(
            agent,
            fallback = %fallback,
            trust_score,
            "agent demoted"
        );
        Ok(Some(event))
    }

    /// Highest-trust same-role peer that is not itself demoted.
    /// Ties break by name for determinism.
    fn choose_fallback(
        &self,
        agent: &str,
        peer_scores: &HashMap<String, f64>,
        active: &HashMap<String, DemotionEvent>,
    ) -> Option<String> {
        self.role_map
            .peers(agent)
            .into_iter()
            .filter(|peer| !active.contains_key(*peer))
            .max_by(|a, b| {
                let score_a = peer_scores.get(*a).copied().unwrap_or(self.config.default_trust);
                let score_b = peer_scores.get(*b).copied().unwrap_or(self.config.default_trust);
                score_a.total_cmp(&score_b).then_with(|| b.cmp(a))
            })
            .map(String::from)
    }

    /// Agent to actually dispatch: the fallback when demoted, else the
    /// agent itself. Must be consulted before any loop dispatch.
    pub async fn get_effective_agent(&self, agent: &str) -> String {
        let active = self.active.read().await;
        match active.get(agent) {
            Some(event) => event.fallback_agent.clone(),
            None => agent.to_string(),
        }
    }

    pub async fn is_demoted(&self, agent: &str) -> bool {
        self.active.read().await.contains_key(agent)
    }

    /// Whether a trust event at this score leaves the agent demoted,
    /// without performing the transition.
    pub async fn would_demote(&self, agent: &str, trust_score: f64) -> bool {
        trust_score < self.config.demotion_threshold || self.is_demoted(agent).await
    }

    /// The active demotion event for an agent, if any.
    pub async fn get_active(&self, agent: &str) -> Option<DemotionEvent> {
        self.active.read().await.get(agent).cloned()
    }

    /// Restore a demoted agent.
    ///
    /// Requires `current_trust >= demotion_threshold + hysteresis_margin`
    /// unless `manual` is set, which bypasses the trust check but is
    /// logged distinctly.
    pub async fn restore(
        &self,
        agent: &str,
        current_trust: f64,
        manual: bool,
    ) -> Result<DemotionEvent, GovernanceError> {
        let mut active = self.active.write().await;
        let Some(event) = active.get(agent) else {
            return Err(GovernanceError::UnknownAgent(agent.to_string()));
        };

        let floor = self.config.demotion_threshold + self.config.hysteresis_margin;
        if !manual && current_trust < floor {
            return Err(GovernanceError::Validation(format!(
                "cannot restore '{agent}': trust {current_trust:.3} below restoration floor {floor:.3}"
            )));
        }

        let mut restored = event.clone();
        restored.status = DemotionStatus::Restored;
        restored.manual = manual;
        restored.trust_score = current_trust;

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Demotion(restored.clone())))
            .await?;
        active.remove(agent);

        if manual {
            warn!(agent, current_trust, "agent restored by operator, trust check bypassed");
        } else {
            info!(agent, current_trust, "agent restored");
        }
        Ok(restored)
    }

    /// Reset a demotion without restoring standing (`demoted → reset`).
    pub async fn reset(&self, agent: &str) -> Result<DemotionEvent, GovernanceError> {
        let mut active = self.active.write().await;
        let Some(event) = active.get(agent) else {
            return Err(GovernanceError::UnknownAgent(agent.to_string()));
        };

        let mut reset = event.clone();
        reset.status = DemotionStatus::Reset;

        self.store
            .append(&GovernanceRecord::new(RecordPayload::Demotion(reset.clone())))
            .await?;
        active.remove(agent);

        info!(agent, "demotion reset");
        Ok(reset)
    }

    pub fn config(&self) -> &DemotionConfig {
        &self.config
    }
}
