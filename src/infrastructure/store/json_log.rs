//! Append-only JSONL record store.
//!
//! One file per record family under the configured log directory, one
//! JSON document per line. Records are never rewritten; state transitions
//! append new lines. All records are cached in memory at open, so queries
//! never touch the disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::{GovernanceRecord, RecordFamily};
use crate::domain::ports::record_store::apply_query;
use crate::domain::ports::{RecordQuery, RecordStore, StoreError};

/// File-backed record store, one JSONL file per family.
pub struct JsonlRecordStore {
    dir: PathBuf,
    /// Full record cache. The lock also serializes appends so lines
    /// never interleave.
    cache: Mutex<Vec<GovernanceRecord>>,
}

impl JsonlRecordStore {
    /// Open (or create) the store under `dir`, replaying every family
    /// file into the cache. A torn final line from an interrupted append
    /// is skipped with a warning rather than failing the open.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Io(format!("create {}: {e}", dir.display())))?;

        let mut records = Vec::new();
        for family in RecordFamily::ALL {
            let path = Self::family_path(&dir, family);
            if !path.exists() {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
            for (line_no, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<GovernanceRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "skipping unreadable record line"
                        );
                    }
                }
            }
        }
        records.sort_by_key(|r| r.timestamp);
        info!(dir = %dir.display(), records = records.len(), "record store opened");

        Ok(Self {
            dir,
            cache: Mutex::new(records),
        })
    }

    fn family_path(dir: &Path, family: RecordFamily) -> PathBuf {
        dir.join(format!("{}.jsonl", family.as_str()))
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn append(&self, record: &GovernanceRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        let path = Self::family_path(&self.dir, record.payload.family());
        let mut cache = self.cache.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::Io(format!("open {}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::Append(format!("write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| StoreError::Append(format!("flush {}: {e}", path.display())))?;

        cache.push(record.clone());
        Ok(())
    }

    async fn query(&self, query: RecordQuery) -> Result<Vec<GovernanceRecord>, StoreError> {
        let cache = self.cache.lock().await;
        Ok(apply_query(&cache, &query))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let cache = self.cache.lock().await;
        Ok(cache.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{RecordKind, RecordPayload, RejectionRecord};
    use uuid::Uuid;

    fn rejection(loop_id: Uuid) -> GovernanceRecord {
        GovernanceRecord::new(RecordPayload::Rejection(RejectionRecord::new(
            Uuid::new_v4(),
            loop_id,
            Uuid::new_v4(),
            "weighted score below selection threshold",
        )))
    }

    #[tokio::test]
    async fn test_append_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let loop_id = Uuid::new_v4();

        let store = JsonlRecordStore::open(dir.path()).await.unwrap();
        store.append(&rejection(loop_id)).await.unwrap();
        store.append(&rejection(loop_id)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        drop(store);

        let reopened = JsonlRecordStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let records = reopened
            .query(RecordQuery::new().kind(RecordKind::Rejection).loop_id(loop_id))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_torn_line_skipped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRecordStore::open(dir.path()).await.unwrap();
        store.append(&rejection(Uuid::new_v4())).await.unwrap();
        drop(store);

        // Simulate an interrupted append
        let path = dir.path().join("plans.jsonl");
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{\"id\":\"truncat");
        std::fs::write(&path, contents).unwrap();

        let reopened = JsonlRecordStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_families_land_in_separate_files() {
        use crate::domain::models::{FreezeEvent, LoopState, RequiredAction};

        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRecordStore::open(dir.path()).await.unwrap();

        let state = LoopState::new(Uuid::new_v4(), "agent-a", Uuid::new_v4());
        store.append(&rejection(state.loop_id)).await.unwrap();
        store
            .append(&GovernanceRecord::new(RecordPayload::Freeze(FreezeEvent::new(
                state.loop_id,
                "trust breakdown",
                RequiredAction::OperatorOverride,
                &state,
            ))))
            .await
            .unwrap();

        assert!(dir.path().join("plans.jsonl").exists());
        assert!(dir.path().join("freeze.jsonl").exists());
    }
}
