use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{AgreementRecord, DocumentRecord, SessionExecutionRecord};

/// The storage trait for Paraph execution backends.
///
/// A `ParaphStorage` implementation provides durable, transactional
/// storage for agreements, session execution records, and document
/// metadata.
///
/// ## Snapshot Semantics
///
/// All mutating operations take `&mut Self::Snapshot`, a type
/// representing an in-progress transaction. The lifecycle is:
///
/// 1. `begin_snapshot()` — start a transaction, returns a `Snapshot`
/// 2. Call mutating methods with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` — commit and consume the transaction
///    OR `abort_snapshot(snapshot)` — roll back and consume the transaction
///
/// If a `Snapshot` is dropped without committing, the underlying
/// transaction MUST be rolled back (drop semantics on the underlying
/// DB transaction).
///
/// ## OCC Conflict Detection
///
/// `update_agreement` performs an optimistic concurrency check:
/// `UPDATE WHERE version = expected_version`. If zero rows are
/// affected, the method returns `Err(StorageError::ConcurrentConflict)`.
/// This is what keeps the agreement status monotonic when a signing
/// completes while another writer touched the same record.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait ParaphStorage: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this storage backend.
    ///
    /// Must be `Send` to allow passing across async task boundaries.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Agreement operations (within snapshot) ────────────────────────────────

    /// Insert a new agreement at version 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken.
    async fn create_agreement(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AgreementRecord,
    ) -> Result<(), StorageError>;

    /// Read an agreement, locking the row for update.
    ///
    /// Uses `SELECT ... FOR UPDATE` semantics to prevent concurrent
    /// modification until the snapshot is committed or aborted.
    ///
    /// Returns `Err(StorageError::AgreementNotFound)` if absent.
    async fn get_agreement_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        agreement_id: &str,
    ) -> Result<AgreementRecord, StorageError>;

    /// Apply a version-validated UPDATE to an agreement (OCC).
    ///
    /// The UPDATE is conditional on `version = expected_version`. If
    /// zero rows are affected, returns `Err(StorageError::ConcurrentConflict)`.
    /// The record's `version` field is ignored on input.
    ///
    /// Returns the new version number on success.
    async fn update_agreement(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AgreementRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    // ── Recording operations (within snapshot) ────────────────────────────────

    /// Insert a session execution record.
    ///
    /// Must be inserted in the SAME snapshot (transaction) as the
    /// agreement mutation it produced: no signature lands on an
    /// agreement without its session trace.
    async fn insert_session_execution(
        &self,
        snapshot: &mut Self::Snapshot,
        record: SessionExecutionRecord,
    ) -> Result<(), StorageError>;

    /// Insert a document metadata record.
    async fn insert_document(
        &self,
        snapshot: &mut Self::Snapshot,
        record: DocumentRecord,
    ) -> Result<(), StorageError>;

    // ── Query operations (outside snapshot, against pool/connection) ──────────

    /// Read an agreement without locking.
    ///
    /// Returns `Err(StorageError::AgreementNotFound)` if absent.
    async fn get_agreement(&self, agreement_id: &str) -> Result<AgreementRecord, StorageError>;

    /// List agreements, optionally filtered by status.
    async fn list_agreements(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<AgreementRecord>, StorageError>;

    /// Read a session execution record by id.
    ///
    /// Returns `Err(StorageError::ExecutionNotFound)` if not found.
    async fn get_session_execution(
        &self,
        execution_id: &str,
    ) -> Result<SessionExecutionRecord, StorageError>;

    /// List session executions with optional filters.
    ///
    /// - `agreement_id`: filter to a specific agreement
    /// - `limit`: maximum number of results (0 = no limit)
    async fn list_session_executions(
        &self,
        agreement_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SessionExecutionRecord>, StorageError>;

    /// List document records for an agreement.
    async fn list_documents(
        &self,
        agreement_id: &str,
    ) -> Result<Vec<DocumentRecord>, StorageError>;
}
