mod blob;
mod error;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use blob::{BlobStore, MemoryBlobStore, StoredBlob};
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{AgreementRecord, DocumentRecord, SessionExecutionRecord, StepRecord};
pub use traits::ParaphStorage;
