//! Freeze events and execution-gate results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loop_state::LoopState;

/// What must happen before a frozen loop may run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredAction {
    /// The loop must re-reflect (updating confidence / contradictions)
    /// before a fresh evaluate can clear it.
    #[serde(rename = "re-reflect")]
    ReReflect,
    /// Only an operator override can clear the freeze.
    #[serde(rename = "operator_override")]
    OperatorOverride,
    #[serde(rename = "none")]
    None,
}

impl RequiredAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReReflect => "re-reflect",
            Self::OperatorOverride => "operator_override",
            Self::None => "none",
        }
    }
}

/// Lifecycle of a freeze event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeStatus {
    Active,
    Overridden,
    Resolved,
}

impl FreezeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Overridden => "overridden",
            Self::Resolved => "resolved",
        }
    }
}

/// A hold placed on a loop by the freeze controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeEvent {
    pub event_id: Uuid,
    pub loop_id: Uuid,
    /// Human-readable reason, shown to operators verbatim.
    pub reason: String,
    pub required_action: RequiredAction,
    pub status: FreezeStatus,
    /// Snapshot of the loop state at freeze time, for audit.
    pub original_state: LoopState,
    /// Actor that overrode the freeze, when status is `Overridden`.
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FreezeEvent {
    pub fn new(loop_id: Uuid, reason: impl Into<String>, required_action: RequiredAction, state: &LoopState) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            loop_id,
            reason: reason.into(),
            required_action,
            status: FreezeStatus::Active,
            original_state: state.clone(),
            resolved_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == FreezeStatus::Active
    }
}

/// Outcome of a freeze evaluation for one loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub can_execute: bool,
    pub freeze_event: Option<FreezeEvent>,
}

impl ExecutionStatus {
    pub fn clear() -> Self {
        Self {
            can_execute: true,
            freeze_event: None,
        }
    }

    pub fn frozen(event: FreezeEvent) -> Self {
        Self {
            can_execute: false,
            freeze_event: Some(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_action_wire_format() {
        let json = serde_json::to_string(&RequiredAction::ReReflect).unwrap();
        assert_eq!(json, "\"re-reflect\"");
        let json = serde_json::to_string(&RequiredAction::OperatorOverride).unwrap();
        assert_eq!(json, "\"operator_override\"");
    }

    #[test]
    fn test_new_freeze_is_active() {
        let state = LoopState::new(Uuid::new_v4(), "agent-a", Uuid::new_v4());
        let event = FreezeEvent::new(state.loop_id, "trust breakdown", RequiredAction::OperatorOverride, &state);
        assert!(event.is_active());
        assert_eq!(event.original_state, state);
    }
}
