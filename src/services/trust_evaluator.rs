//! Trust evaluator: per-agent trust scoring from loop performance metrics.
//!
//! Maintains the current trust score per agent as a fold over an
//! append-only trust event log, and triggers the demotion re-check on
//! every recorded event.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::{
    GovernanceRecord, MetricWeights, RecordKind, RecordPayload, TrustEvent, TrustMetrics, TrustStatus,
};
use crate::domain::ports::{GovernanceError, RecordQuery, RecordStore};
use crate::services::demotion_manager::DemotionManager;

/// Configuration for trust evaluation.
#[derive(Debug, Clone)]
pub struct TrustEvaluatorConfig {
    /// Per-metric weights, default equal.
    pub metric_weights: MetricWeights,
    /// Score reported for agents with no history.
    pub default_trust: f64,
}

impl Default for TrustEvaluatorConfig {
    fn default() -> Self {
        Self {
            metric_weights: MetricWeights::default(),
            default_trust: 0.7,
        }
    }
}

/// Service computing and recording per-agent trust scores.
pub struct TrustEvaluator {
    config: TrustEvaluatorConfig,
    store: Arc<dyn RecordStore>,
    demotion: Arc<DemotionManager>,
    /// Current-score projection: latest recorded score per agent.
    /// The write lock serializes updates, which demotion hysteresis
    /// depends on.
    scores: RwLock<HashMap<String, f64>>,
}

impl TrustEvaluator {
    pub fn new(
        config: TrustEvaluatorConfig,
        store: Arc<dyn RecordStore>,
        demotion: Arc<DemotionManager>,
    ) -> Self {
        Self {
            config,
            store,
            demotion,
            scores: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the current-score projection by replaying the trust log.
    pub async fn hydrate(&self) -> Result<(), GovernanceError> {
        let records = self
            .store
            .query(RecordQuery::new().kind(RecordKind::Trust).ascending())
            .await?;

        let mut scores = self.scores.write().await;
        scores.clear();
        for record in records {
            if let RecordPayload::Trust(event) = record.payload {
                scores.insert(event.agent, event.trust_score);
            }
        }
        debug!(agents = scores.len(), "trust projection hydrated");
        Ok(())
    }

    /// Record a trust event from per-loop metrics.
    ///
    /// Validates metrics locally first: out-of-range input records
    /// nothing. The new score is the configured weighted combination
    /// clamped to [0,1]; the demotion manager is re-checked before the
    /// event is returned.
    pub async fn record_event(
        &self,
        agent: &str,
        loop_id: Uuid,
        metrics: TrustMetrics,
    ) -> Result<TrustEvent, GovernanceError> {
        if let Some((name, value)) = metrics.first_out_of_range() {
            return Err(GovernanceError::InvalidMetric {
                name: name.to_string(),
                value,
            });
        }

        let mut scores = self.scores.write().await;
        let previous = scores.get(agent).copied().unwrap_or(self.config.default_trust);
        let trust_score = self.config.metric_weights.score(&metrics);
        let delta = trust_score - previous;

        let demoted = self.demotion.would_demote(agent, trust_score).await;
        let status = if demoted { TrustStatus::Demoted } else { TrustStatus::Active };
        let event = TrustEvent {
            id: Uuid::new_v4(),
            agent: agent.to_string(),
            loop_id,
            trust_score,
            delta,
            reason: format!("trust {previous:.3} -> {trust_score:.3} from loop metrics"),
            metrics,
            status,
            timestamp: Utc::now(),
        };

        // The trust event is the cause of any demotion transition; it must
        // be durable before the demotion record it triggers.
        self.store
            .append(&GovernanceRecord::new(RecordPayload::Trust(event.clone())))
            .await?;

        // Demotion re-check sees the new score and a snapshot of peers.
        let mut peer_snapshot = scores.clone();
        peer_snapshot.insert(agent.to_string(), trust_score);
        self.demotion
            .on_trust_event(agent, trust_score, Some(loop_id), &peer_snapshot)
            .await?;
        scores.insert(agent.to_string(), trust_score);

        info!(
            agent,
            loop_id = %loop_id,
            trust_score,
            delta,
            status = status.as_str(),
            "trust event recorded"
        );
        Ok(event)
    }

    /// Current trust score, or the configured default for unseen agents.
    pub async fn get_score(&self, agent: &str) -> f64 {
        self.scores
            .read()
            .await
            .get(agent)
            .copied()
            .unwrap_or(self.config.default_trust)
    }

    /// Snapshot of all known agents' current scores.
    pub async fn score_snapshot(&self) -> HashMap<String, f64> {
        self.scores.read().await.clone()
    }

    /// Current standing of an agent.
    pub async fn get_status(&self, agent: &str) -> TrustStatus {
        if self.demotion.is_demoted(agent).await {
            TrustStatus::Demoted
        } else {
            TrustStatus::Active
        }
    }

    /// Trust history for an agent, most recent first. Re-queryable.
    pub async fn get_history(&self, agent: &str, limit: usize) -> Result<Vec<TrustEvent>, GovernanceError> {
        let records = self
            .store
            .query(
                RecordQuery::new()
                    .kind(RecordKind::Trust)
                    .agent(agent)
                    .limit(limit)
                    .descending(),
            )
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|r| match r.payload {
                RecordPayload::Trust(event) => Some(event),
                _ => None,
            })
            .collect())
    }
}
