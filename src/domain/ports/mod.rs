//! Port trait definitions (Hexagonal Architecture)
//!
//! The domain depends only on these contracts:
//! - `RecordStore`: append-only persistence for governance records
//! - `GovernanceError`: the error taxonomy surfaced to callers
//!
//! Infrastructure adapters provide the implementations.

pub mod errors;
pub mod record_store;

pub use errors::GovernanceError;
pub use record_store::{InMemoryRecordStore, RecordQuery, RecordStore, StoreError};
