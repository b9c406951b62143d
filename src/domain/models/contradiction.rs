//! Contradictions detected between beliefs during a loop's reflections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionResolution {
    Unresolved,
    Flagged,
    Revised,
}

impl ContradictionResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Flagged => "flagged",
            Self::Revised => "revised",
        }
    }

    /// Freeze rule 2 cannot clear while a referenced contradiction is
    /// unresolved.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// A detected conflict between two beliefs within a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionRecord {
    pub contradiction_id: Uuid,
    pub loop_id: Uuid,
    pub agent: String,
    pub belief_1: Uuid,
    pub belief_2: Uuid,
    /// Classification of the conflict (e.g. "value", "factual").
    pub kind: String,
    /// Severity, [0,1].
    pub score: f64,
    pub resolution: ContradictionResolution,
    pub created_at: DateTime<Utc>,
}

impl ContradictionRecord {
    pub fn new(
        loop_id: Uuid,
        agent: impl Into<String>,
        belief_1: Uuid,
        belief_2: Uuid,
        kind: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            contradiction_id: Uuid::new_v4(),
            loop_id,
            agent: agent.into(),
            belief_1,
            belief_2,
            kind: kind.into(),
            score,
            resolution: ContradictionResolution::Unresolved,
            created_at: Utc::now(),
        }
    }
}
