use serde::{Deserialize, Serialize};

/// An agreement as stored in the backend.
///
/// Flat columns carry what queries and OCC need; `body` holds the full
/// serialized domain agreement so no detail is lost between layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub agreement_id: String,
    /// "contract" or "mandate".
    pub kind: String,
    pub property_id: String,
    /// "draft", "partially_signed", or "active".
    pub status: String,
    pub version: i64,
    /// ISO 8601 / RFC 3339 timestamp string. None until the party signs.
    pub owner_signed_at: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string. None until the party signs.
    pub counterparty_signed_at: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    pub last_session_id: Option<String>,
    /// Full domain agreement, serialized.
    pub body: serde_json::Value,
}

/// A record of a signature session that reached a terminal step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExecutionRecord {
    pub id: String,
    pub agreement_id: String,
    /// Signing party role: "owner", "tenant", or "agency".
    pub party: String,
    /// "completed", "failed", or "closed".
    pub outcome: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub started_at: String,
    /// ISO 8601 / RFC 3339 timestamp string. None if not yet terminal.
    pub completed_at: Option<String>,
    pub certificate_alias: Option<String>,
    /// Ordered step trace, serialized [`StepRecord`] values.
    pub step_trace: serde_json::Value,
}

/// One entry of a session's step trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub outcome: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub at: String,
}

/// Metadata for a stored binary object (photo, signed artifact, scan).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub blob_key: String,
    pub agreement_id: String,
    /// SHA-256 content digest, lowercase hex.
    pub content_digest: String,
    pub content_type: String,
    pub byte_length: u64,
}
