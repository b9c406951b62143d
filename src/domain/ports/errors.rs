use thiserror::Error;
use uuid::Uuid;

use super::record_store::StoreError;

/// Governance operation errors.
///
/// `InvariantViolation` excludes a plan rather than failing the loop;
/// `MaxRerunsExceeded` is fatal for the loop. Validation failures are
/// rejected locally and never partially applied.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid metric '{name}': {value} is outside [0,1]")]
    InvalidMetric { name: String, value: f64 },

    #[error("Invalid criteria weights: sum {sum:.6} is not 1.0 within tolerance")]
    InvalidWeights { sum: f64 },

    #[error("Unknown threshold parameter: {0}")]
    UnknownThreshold(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown loop: {0}")]
    UnknownLoop(Uuid),

    #[error("Unknown contradiction: {0}")]
    UnknownContradiction(Uuid),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Loop {loop_id} exceeded max reruns ({max_reruns})")]
    MaxRerunsExceeded { loop_id: Uuid, max_reruns: u32 },

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}
