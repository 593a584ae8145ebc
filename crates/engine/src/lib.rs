//! Paraph signature session engine -- drives the electronic-signature
//! workflow for rental agreements against external providers and a
//! storage backend.
//!
//! The engine owns the transient signature sessions (one state machine
//! per signing attempt), enforces the step ordering and single-flight
//! rules, talks to the signing/biometric/OCR providers through the
//! adapter traits in [`provider`], and persists agreement mutations and
//! session traces through [`paraph_storage::ParaphStorage`].

pub mod engine;
pub mod error;
pub mod identity;
pub mod otp;
pub mod provider;
pub mod session;

pub use engine::{agreement_to_record, SessionView, SignatureEngine};
pub use error::EngineError;
pub use identity::{extract_document_text, verify_identity, BiometricMatch};
pub use otp::{code_is_well_formed, OtpChallenge, OtpChannel, MAX_OTP_ATTEMPTS, RESEND_COOLDOWN};
pub use provider::{
    BiometricProvider, CertificateIssue, EnrollmentSubmission, OcrProvider, ProviderConfig,
    ProviderError, SignatureProvider, SignedDocument, SigningReceipt,
};
pub use session::{SessionStep, SignatureSession};
