//! Demotion events: substitution of a low-trust agent with a fallback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemotionStatus {
    Active,
    Restored,
    Reset,
}

impl DemotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Restored => "restored",
            Self::Reset => "reset",
        }
    }
}

/// Created when an agent's trust crosses the demotion threshold.
/// At most one active demotion exists per agent at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemotionEvent {
    pub id: Uuid,
    pub agent: String,
    /// Capability-compatible agent dispatched in place of the demoted one.
    pub fallback_agent: String,
    /// Trust score at the time of the transition.
    pub trust_score: f64,
    pub reason: String,
    pub loop_id: Option<Uuid>,
    pub status: DemotionStatus,
    /// Whether this transition was forced by an operator rather than the
    /// trust check.
    pub manual: bool,
    pub timestamp: DateTime<Utc>,
}

impl DemotionEvent {
    pub fn new(
        agent: impl Into<String>,
        fallback_agent: impl Into<String>,
        trust_score: f64,
        reason: impl Into<String>,
        loop_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent: agent.into(),
            fallback_agent: fallback_agent.into(),
            trust_score,
            reason: reason.into(),
            loop_id,
            status: DemotionStatus::Active,
            manual: false,
            timestamp: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DemotionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_demotion_is_active() {
        let event = DemotionEvent::new("planner-1", "planner-2", 0.42, "trust below threshold", None);
        assert!(event.is_active());
        assert!(!event.manual);
        assert_eq!(event.fallback_agent, "planner-2");
    }
}
