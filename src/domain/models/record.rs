//! The persisted governance record envelope.
//!
//! Every durable record is one tagged payload wrapped in an envelope
//! carrying a stable schema version, a UUID primary key and a timestamp.
//! Logs are append-only; state transitions append a new record rather
//! than rewriting history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contradiction::ContradictionRecord;
use super::demotion::DemotionEvent;
use super::freeze::FreezeEvent;
use super::plan::{EscalationRecord, PlanComparisonRecord, RejectionRecord};
use super::retraction::RetractionRecord;
use super::trust::TrustEvent;

/// Current wire schema version for persisted records.
pub const SCHEMA_VERSION: u16 = 1;

/// Which append-only collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    Trust,
    Freeze,
    Plan,
    Contradiction,
}

impl RecordFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trust => "trust",
            Self::Freeze => "freeze",
            Self::Plan => "plans",
            Self::Contradiction => "contradictions",
        }
    }

    pub const ALL: [Self; 4] = [Self::Trust, Self::Freeze, Self::Plan, Self::Contradiction];
}

/// Kind discriminator across all record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Trust,
    Demotion,
    Freeze,
    Comparison,
    Rejection,
    Escalation,
    Contradiction,
    Retraction,
}

/// Tagged payload, one variant per event kind, carrying only the fields
/// relevant to that variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordPayload {
    Trust(TrustEvent),
    Demotion(DemotionEvent),
    Freeze(FreezeEvent),
    Comparison(PlanComparisonRecord),
    Rejection(RejectionRecord),
    Escalation(EscalationRecord),
    Contradiction(ContradictionRecord),
    Retraction(RetractionRecord),
}

impl RecordPayload {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Trust(_) => RecordKind::Trust,
            Self::Demotion(_) => RecordKind::Demotion,
            Self::Freeze(_) => RecordKind::Freeze,
            Self::Comparison(_) => RecordKind::Comparison,
            Self::Rejection(_) => RecordKind::Rejection,
            Self::Escalation(_) => RecordKind::Escalation,
            Self::Contradiction(_) => RecordKind::Contradiction,
            Self::Retraction(_) => RecordKind::Retraction,
        }
    }

    pub fn family(&self) -> RecordFamily {
        match self {
            Self::Trust(_) | Self::Demotion(_) => RecordFamily::Trust,
            Self::Freeze(_) => RecordFamily::Freeze,
            Self::Comparison(_) | Self::Rejection(_) | Self::Escalation(_) | Self::Retraction(_) => {
                RecordFamily::Plan
            }
            Self::Contradiction(_) => RecordFamily::Contradiction,
        }
    }

    /// Loop this record relates to, when applicable.
    pub fn loop_id(&self) -> Option<Uuid> {
        match self {
            Self::Trust(e) => Some(e.loop_id),
            Self::Demotion(e) => e.loop_id,
            Self::Freeze(e) => Some(e.loop_id),
            Self::Comparison(r) => Some(r.loop_id),
            Self::Rejection(r) => Some(r.loop_id),
            Self::Escalation(r) => Some(r.loop_id),
            Self::Contradiction(r) => Some(r.loop_id),
            Self::Retraction(r) => Some(r.loop_id),
        }
    }

    /// Agent this record relates to, when applicable.
    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::Trust(e) => Some(&e.agent),
            Self::Demotion(e) => Some(&e.agent),
            Self::Contradiction(r) => Some(&r.agent),
            _ => None,
        }
    }
}

/// Envelope for one persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRecord {
    pub id: Uuid,
    pub schema_version: u16,
    pub timestamp: DateTime<Utc>,
    pub payload: RecordPayload,
}

impl GovernanceRecord {
    pub fn new(payload: RecordPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::trust::{TrustMetrics, TrustStatus};

    fn trust_record() -> GovernanceRecord {
        GovernanceRecord::new(RecordPayload::Trust(TrustEvent {
            id: Uuid::new_v4(),
            agent: "planner-1".to_string(),
            loop_id: Uuid::new_v4(),
            trust_score: 0.8,
            delta: 0.1,
            reason: "loop outcome recorded".to_string(),
            metrics: TrustMetrics {
                summary_realism: 0.9,
                loop_success: 1.0,
                reflection_clarity: 0.8,
                contradiction_frequency: 0.0,
                revision_rate: 0.1,
                operator_override: 0.0,
            },
            status: TrustStatus::Active,
            timestamp: Utc::now(),
        }))
    }

    #[test]
    fn test_payload_routing() {
        let record = trust_record();
        assert_eq!(record.payload.kind(), RecordKind::Trust);
        assert_eq!(record.payload.family(), RecordFamily::Trust);
        assert_eq!(record.payload.agent(), Some("planner-1"));
        assert_eq!(record.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_envelope_serde_round_trip() {
        let record = trust_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"trust\""));
        assert!(json.contains("\"schema_version\":1"));

        let back: GovernanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
