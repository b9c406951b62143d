//! Belief definitions used by invariant checks and contradiction records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority class of a belief. Plans violating a `Critical` belief are
/// never selectable regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl BeliefPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// An operational belief. Immutable, loaded at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: BeliefPriority,
}

impl Belief {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        priority: BeliefPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(BeliefPriority::Critical < BeliefPriority::High);
        assert!(BeliefPriority::High < BeliefPriority::Low);
    }

    #[test]
    fn test_priority_serde_round_trip() {
        let json = serde_json::to_string(&BeliefPriority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
