//! Retraction records for withdrawn reflections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetractionReason {
    Misalignment,
    Drift,
    OperatorOverride,
    Contradiction,
}

impl RetractionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Misalignment => "misalignment",
            Self::Drift => "drift",
            Self::OperatorOverride => "operator_override",
            Self::Contradiction => "contradiction",
        }
    }
}

/// Record of a retracted reflection and its revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractionRecord {
    pub id: Uuid,
    pub loop_id: Uuid,
    /// Reference to the retracted reflection in the caller's store.
    pub reflection_ref: String,
    pub revised_content: String,
    pub reason: RetractionReason,
    pub flag_as_flawed: bool,
    /// When set, the loop is replanned from scratch through the freeze
    /// controller.
    pub replan_required: bool,
    pub timestamp: DateTime<Utc>,
}

impl RetractionRecord {
    pub fn new(
        loop_id: Uuid,
        reflection_ref: impl Into<String>,
        revised_content: impl Into<String>,
        reason: RetractionReason,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loop_id,
            reflection_ref: reflection_ref.into(),
            revised_content: revised_content.into(),
            reason,
            flag_as_flawed: false,
            replan_required: false,
            timestamp: Utc::now(),
        }
    }
}
