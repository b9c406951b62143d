//! Per-loop execution state.
//!
//! A `LoopState` is created when a loop starts and archived on terminal
//! status. It is mutated exclusively by the freeze controller and the
//! plan selection path during the loop's lifetime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Idle,
    Looping,
    Frozen,
    Escalated,
    Completed,
    Failed,
}

impl LoopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Looping => "looping",
            Self::Frozen => "frozen",
            Self::Escalated => "escalated",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal statuses archive the loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State of one plan→act→reflect cycle for an agent on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub loop_id: Uuid,
    pub task_id: Uuid,
    pub agent_id: String,
    pub project_id: Uuid,
    /// Reflection confidence, [0,1].
    pub confidence_score: f64,
    /// Current trust score of the executing agent, [0,1].
    pub trust_score: f64,
    pub reflection_depth: u32,
    pub contradictions_unresolved: u32,
    /// Explicit operator bypass. Always wins over every freeze rule.
    pub manual_override: bool,
    pub rerun_count: u32,
    pub status: LoopStatus,
}

impl LoopState {
    pub fn new(task_id: Uuid, agent_id: impl Into<String>, project_id: Uuid) -> Self {
        Self {
            loop_id: Uuid::new_v4(),
            task_id,
            agent_id: agent_id.into(),
            project_id,
            confidence_score: 0.0,
            trust_score: 0.0,
            reflection_depth: 0,
            contradictions_unresolved: 0,
            manual_override: false,
            rerun_count: 0,
            status: LoopStatus::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(LoopStatus::Completed.is_terminal());
        assert!(LoopStatus::Failed.is_terminal());
        assert!(!LoopStatus::Frozen.is_terminal());
        assert!(!LoopStatus::Looping.is_terminal());
    }

    #[test]
    fn test_new_loop_defaults() {
        let state = LoopState::new(Uuid::new_v4(), "planner-1", Uuid::new_v4());
        assert_eq!(state.status, LoopStatus::Idle);
        assert_eq!(state.rerun_count, 0);
        assert!(!state.manual_override);
    }
}
