//! Engine error type.

use std::fmt;

use paraph_core::{AgreementError, ValidationError};

use crate::provider::ProviderError;
use crate::session::SessionStep;

/// All errors surfaced by the signature engine.
///
/// Validation and OTP-format errors are local and never reach a
/// provider; provider errors carry the stage they occurred in and move
/// the session to its `Error` step; the rest are caller mistakes
/// (wrong step, busy agreement, unknown session) that leave session
/// state untouched.
#[derive(Debug)]
pub enum EngineError {
    /// Enrollment input failed local validation.
    Validation(ValidationError),
    /// Agreement lifecycle rule violated (unknown party, double sign,
    /// status regression).
    Agreement(AgreementError),
    /// An external provider call failed.
    Provider(ProviderError),
    /// Storage backend failure.
    Storage(paraph_storage::StorageError),
    /// Internal invariant broken (corrupt stored body, serialization).
    Internal(String),
    /// Illegal step transition.
    Transition { from: SessionStep, to: SessionStep },
    /// The session cannot be closed while an external operation is in
    /// flight.
    CloseBlocked { step: SessionStep },
    /// Another live session exists for this agreement.
    SessionBusy { agreement_id: String },
    /// No live session with this id.
    SessionNotFound { session_id: String },
    /// The submitted OTP code is not exactly 6 digits. Checked locally;
    /// the provider is never called.
    InvalidOtpFormat { got: String },
    /// The resend cooldown has not elapsed.
    OtpCooldown { remaining_secs: i64 },
    /// The provider rejected the submitted code.
    OtpRejected,
    /// Too many failed OTP attempts; the session has failed.
    OtpExhausted,
    /// No OTP challenge is active on this session.
    OtpMissing,
    /// The selected OTP channel has no destination (email channel
    /// without an address).
    MissingOtpDestination,
    /// The operation does not apply to this signature method.
    MethodMismatch { session_id: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(e) => write!(f, "{}", e),
            EngineError::Agreement(e) => write!(f, "{}", e),
            EngineError::Provider(e) => write!(f, "{}", e),
            EngineError::Storage(e) => write!(f, "storage error: {}", e),
            EngineError::Internal(msg) => write!(f, "internal error: {}", msg),
            EngineError::Transition { from, to } => {
                write!(f, "illegal step transition: {} -> {}", from, to)
            }
            EngineError::CloseBlocked { step } => {
                write!(f, "cannot close session during '{}'", step)
            }
            EngineError::SessionBusy { agreement_id } => {
                write!(
                    f,
                    "a signature session is already open for agreement '{}'",
                    agreement_id
                )
            }
            EngineError::SessionNotFound { session_id } => {
                write!(f, "session not found: {}", session_id)
            }
            EngineError::InvalidOtpFormat { got } => {
                write!(f, "OTP code must be 6 digits, got '{}'", got)
            }
            EngineError::OtpCooldown { remaining_secs } => {
                write!(f, "OTP resend available in {}s", remaining_secs)
            }
            EngineError::OtpRejected => write!(f, "OTP code rejected"),
            EngineError::OtpExhausted => write!(f, "too many failed OTP attempts"),
            EngineError::OtpMissing => write!(f, "no OTP challenge in progress"),
            EngineError::MissingOtpDestination => {
                write!(f, "no destination for the selected OTP channel")
            }
            EngineError::MethodMismatch { session_id } => {
                write!(
                    f,
                    "operation does not apply to the signature method of session '{}'",
                    session_id
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Validation(e)
    }
}

impl From<AgreementError> for EngineError {
    fn from(e: AgreementError) -> Self {
        EngineError::Agreement(e)
    }
}

impl From<ProviderError> for EngineError {
    fn from(e: ProviderError) -> Self {
        EngineError::Provider(e)
    }
}

impl From<paraph_storage::StorageError> for EngineError {
    fn from(e: paraph_storage::StorageError) -> Self {
        EngineError::Storage(e)
    }
}
