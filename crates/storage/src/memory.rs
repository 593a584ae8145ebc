//! In-memory reference backend.
//!
//! `MemoryStorage` implements the full `ParaphStorage` contract:
//! staged writes are invisible until commit, aborts discard everything,
//! and version checks run both at update time and again at commit so a
//! snapshot that raced a committed writer fails with a conflict instead
//! of clobbering its write. Used by tests, the offline runner, and the
//! server's default configuration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{AgreementRecord, DocumentRecord, SessionExecutionRecord};
use crate::traits::ParaphStorage;

#[derive(Default)]
struct Inner {
    agreements: HashMap<String, AgreementRecord>,
    executions: Vec<SessionExecutionRecord>,
    documents: Vec<DocumentRecord>,
}

/// A staged agreement write: the pending record plus the committed
/// version it was based on (`None` for creates).
struct StagedAgreement {
    record: AgreementRecord,
    base_version: Option<i64>,
}

/// Transaction state: all writes staged here until commit.
#[derive(Default)]
pub struct MemorySnapshot {
    agreements: HashMap<String, StagedAgreement>,
    executions: Vec<SessionExecutionRecord>,
    documents: Vec<DocumentRecord>,
}

/// In-memory `ParaphStorage` backend.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Backend(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl ParaphStorage for MemoryStorage {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot::default())
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut inner = self.lock()?;

        // Re-validate every staged agreement against the committed state
        // before applying anything, so commit stays all-or-nothing.
        for (id, staged) in &snapshot.agreements {
            match staged.base_version {
                None => {
                    if inner.agreements.contains_key(id) {
                        return Err(StorageError::AlreadyExists {
                            agreement_id: id.clone(),
                        });
                    }
                }
                Some(base) => {
                    let current = inner.agreements.get(id).ok_or_else(|| {
                        StorageError::AgreementNotFound {
                            agreement_id: id.clone(),
                        }
                    })?;
                    if current.version != base {
                        return Err(StorageError::ConcurrentConflict {
                            agreement_id: id.clone(),
                            expected_version: base,
                        });
                    }
                }
            }
        }

        for (id, staged) in snapshot.agreements {
            inner.agreements.insert(id, staged.record);
        }
        inner.executions.extend(snapshot.executions);
        inner.documents.extend(snapshot.documents);
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        // Staged state is local to the snapshot; dropping it is the rollback.
        drop(snapshot);
        Ok(())
    }

    async fn create_agreement(
        &self,
        snapshot: &mut MemorySnapshot,
        mut record: AgreementRecord,
    ) -> Result<(), StorageError> {
        let inner = self.lock()?;
        let id = record.agreement_id.clone();
        if inner.agreements.contains_key(&id) || snapshot.agreements.contains_key(&id) {
            return Err(StorageError::AlreadyExists { agreement_id: id });
        }
        record.version = 0;
        snapshot.agreements.insert(
            id,
            StagedAgreement {
                record,
                base_version: None,
            },
        );
        Ok(())
    }

    async fn get_agreement_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        agreement_id: &str,
    ) -> Result<AgreementRecord, StorageError> {
        if let Some(staged) = snapshot.agreements.get(agreement_id) {
            return Ok(staged.record.clone());
        }
        let inner = self.lock()?;
        inner
            .agreements
            .get(agreement_id)
            .cloned()
            .ok_or_else(|| StorageError::AgreementNotFound {
                agreement_id: agreement_id.to_string(),
            })
    }

    async fn update_agreement(
        &self,
        snapshot: &mut MemorySnapshot,
        mut record: AgreementRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let id = record.agreement_id.clone();

        // Current view: staged write if present, else committed row.
        let (current_version, base_version) = match snapshot.agreements.get(&id) {
            Some(staged) => (staged.record.version, staged.base_version),
            None => {
                let inner = self.lock()?;
                let committed = inner.agreements.get(&id).ok_or_else(|| {
                    StorageError::AgreementNotFound {
                        agreement_id: id.clone(),
                    }
                })?;
                (committed.version, Some(committed.version))
            }
        };

        if current_version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                agreement_id: id,
                expected_version,
            });
        }

        let new_version = expected_version + 1;
        record.version = new_version;
        snapshot.agreements.insert(
            id,
            StagedAgreement {
                record,
                base_version,
            },
        );
        Ok(new_version)
    }

    async fn insert_session_execution(
        &self,
        snapshot: &mut MemorySnapshot,
        record: SessionExecutionRecord,
    ) -> Result<(), StorageError> {
        snapshot.executions.push(record);
        Ok(())
    }

    async fn insert_document(
        &self,
        snapshot: &mut MemorySnapshot,
        record: DocumentRecord,
    ) -> Result<(), StorageError> {
        snapshot.documents.push(record);
        Ok(())
    }

    async fn get_agreement(&self, agreement_id: &str) -> Result<AgreementRecord, StorageError> {
        let inner = self.lock()?;
        inner
            .agreements
            .get(agreement_id)
            .cloned()
            .ok_or_else(|| StorageError::AgreementNotFound {
                agreement_id: agreement_id.to_string(),
            })
    }

    async fn list_agreements(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<AgreementRecord>, StorageError> {
        let inner = self.lock()?;
        let mut records: Vec<AgreementRecord> = inner
            .agreements
            .values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.agreement_id.cmp(&b.agreement_id));
        Ok(records)
    }

    async fn get_session_execution(
        &self,
        execution_id: &str,
    ) -> Result<SessionExecutionRecord, StorageError> {
        let inner = self.lock()?;
        inner
            .executions
            .iter()
            .find(|e| e.id == execution_id)
            .cloned()
            .ok_or_else(|| StorageError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            })
    }

    async fn list_session_executions(
        &self,
        agreement_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SessionExecutionRecord>, StorageError> {
        let inner = self.lock()?;
        let iter = inner
            .executions
            .iter()
            .filter(|e| agreement_id.map_or(true, |id| e.agreement_id == id))
            .cloned();
        Ok(if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        })
    }

    async fn list_documents(
        &self,
        agreement_id: &str,
    ) -> Result<Vec<DocumentRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .documents
            .iter()
            .filter(|d| d.agreement_id == agreement_id)
            .cloned()
            .collect())
    }
}
