//! RecordStore port for append-only governance record persistence.
//!
//! Defines the interface every store implementation must satisfy, plus an
//! in-memory implementation used by tests and ephemeral deployments.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::{GovernanceRecord, RecordFamily, RecordKind};

/// Error type for record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to append record: {0}")]
    Append(String),

    #[error("Failed to query records: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Query parameters for record retrieval.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Filter by collection family.
    pub family: Option<RecordFamily>,
    /// Filter by record kind.
    pub kind: Option<RecordKind>,
    /// Filter by loop ID.
    pub loop_id: Option<Uuid>,
    /// Filter by agent.
    pub agent: Option<String>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Sort order (true = oldest first, false = newest first).
    pub ascending: bool,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, family: RecordFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn loop_id(mut self, id: Uuid) -> Self {
        self.loop_id = Some(id);
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ascending(mut self) -> Self {
        self.ascending = true;
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    fn matches(&self, record: &GovernanceRecord) -> bool {
        if let Some(family) = self.family {
            if record.payload.family() != family {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.payload.kind() != kind {
                return false;
            }
        }
        if let Some(loop_id) = self.loop_id {
            if record.payload.loop_id() != Some(loop_id) {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if record.payload.agent() != Some(agent.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Trait for append-only record persistence implementations.
///
/// Implementations never rewrite stored records; state transitions are
/// modeled by appending new records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a record to its collection.
    async fn append(&self, record: &GovernanceRecord) -> Result<(), StoreError>;

    /// Query records, filtered and ordered by insertion time.
    async fn query(&self, query: RecordQuery) -> Result<Vec<GovernanceRecord>, StoreError>;

    /// Count total records across all collections.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Shared helper: filter, order and truncate a record slice per query.
pub(crate) fn apply_query(records: &[GovernanceRecord], query: &RecordQuery) -> Vec<GovernanceRecord> {
    let mut result: Vec<_> = records.iter().filter(|r| query.matches(r)).cloned().collect();

    if query.ascending {
        result.sort_by_key(|r| r.timestamp);
    } else {
        result.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
    }

    if let Some(limit) = query.limit {
        result.truncate(limit);
    }

    result
}

/// In-memory record store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: tokio::sync::RwLock<Vec<GovernanceRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: &GovernanceRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<GovernanceRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(apply_query(&records, &query))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.len() as u64)
    }
}
