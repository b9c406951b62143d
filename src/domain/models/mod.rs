pub mod belief;
pub mod config;
pub mod contradiction;
pub mod demotion;
pub mod freeze;
pub mod loop_state;
pub mod plan;
pub mod record;
pub mod retraction;
pub mod threshold;
pub mod trust;

pub use belief::{Belief, BeliefPriority};
pub use config::{BeliefSeed, Config, GovernanceConfig, LoggingConfig, ServerConfig, StorageConfig};
pub use contradiction::{ContradictionRecord, ContradictionResolution};
pub use demotion::{DemotionEvent, DemotionStatus};
pub use freeze::{ExecutionStatus, FreezeEvent, FreezeStatus, RequiredAction};
pub use loop_state::{LoopState, LoopStatus};
pub use plan::{
    ComparisonStatus, CriteriaWeights, EscalationRecord, Plan, PlanComparisonRecord, RejectionRecord,
};
pub use record::{GovernanceRecord, RecordFamily, RecordKind, RecordPayload, SCHEMA_VERSION};
pub use retraction::{RetractionReason, RetractionRecord};
pub use threshold::{params, Threshold};
pub use trust::{MetricWeights, TrustEvent, TrustMetrics, TrustStatus};
