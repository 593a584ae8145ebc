//! Paraph domain model -- rental agreements and the data that crosses
//! the signature workflow.
//!
//! This crate holds the pure domain layer: agreement records and their
//! status lifecycle, signing parties, enrollment data validation, photo
//! content digests, and the trust/biometric scoring rules. It performs
//! no I/O; the engine and storage crates build on top of it.

pub mod agreement;
pub mod digest;
pub mod enrollment;
pub mod trust;

pub use agreement::{
    Agreement, AgreementError, AgreementKind, AgreementStatus, PartyRole, PartySignature,
    SignatureMethod,
};
pub use digest::{decode_photo, encode_photo, photo_digest};
pub use enrollment::{normalize_phone, EnrollmentData, Gender, ValidationError};
pub use trust::{biometric_passes, trust_score, TrustSignals, BIOMETRIC_PASS_THRESHOLD};

/// Format a timestamp as RFC 3339 for storage and API payloads.
pub fn format_timestamp(t: time::OffsetDateTime) -> String {
    t.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
