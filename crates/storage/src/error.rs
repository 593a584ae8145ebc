/// All errors that can be returned by a ParaphStorage or BlobStore
/// implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict — another transaction
    /// modified the agreement concurrently. The expected version was
    /// not found.
    #[error("concurrent conflict on agreement {agreement_id}: expected version {expected_version}")]
    ConcurrentConflict {
        agreement_id: String,
        expected_version: i64,
    },

    /// No agreement with the given id.
    #[error("agreement not found: {agreement_id}")]
    AgreementNotFound { agreement_id: String },

    /// An agreement with this id already exists.
    #[error("agreement already exists: {agreement_id}")]
    AlreadyExists { agreement_id: String },

    /// Session execution record not found.
    #[error("session execution not found: {execution_id}")]
    ExecutionNotFound { execution_id: String },

    /// No blob stored under the given key.
    #[error("blob not found: {key}")]
    BlobNotFound { key: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
