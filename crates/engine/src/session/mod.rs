//! The signature session state machine.
//!
//! One session per signing attempt, walked strictly in order:
//!
//! ```text
//! idle -> collecting_data -> generating_cert -> awaiting_otp -> signing -> completed
//!                                  ^                                          |
//!                                  +--------------- retry --------- error <---+
//! ```
//!
//! Key invariants: `signing` is reachable only from `awaiting_otp`
//! (after a verified code); any in-flight step may fail to `error`;
//! `error` recovers only through an explicit retry back to
//! `generating_cert`. Closing is blocked while an external operation
//! is in flight (`collecting_data`, `generating_cert`, `signing`) so a
//! half-committed provider call is never abandoned.

use std::fmt;

use paraph_core::{format_timestamp, Gender, PartyRole, SignatureMethod};
use paraph_storage::StepRecord;
use time::OffsetDateTime;

use crate::error::EngineError;
use crate::otp::OtpChallenge;

// ──────────────────────────────────────────────
// Steps
// ──────────────────────────────────────────────

/// Current step of a signature session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Idle,
    CollectingData,
    GeneratingCert,
    AwaitingOtp,
    Signing,
    Completed,
    Error,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStep::Idle => "idle",
            SessionStep::CollectingData => "collecting_data",
            SessionStep::GeneratingCert => "generating_cert",
            SessionStep::AwaitingOtp => "awaiting_otp",
            SessionStep::Signing => "signing",
            SessionStep::Completed => "completed",
            SessionStep::Error => "error",
        }
    }

    /// Whether the session may be closed at this step. In-flight steps
    /// block closing.
    pub fn allows_close(&self) -> bool {
        matches!(
            self,
            SessionStep::Idle | SessionStep::AwaitingOtp | SessionStep::Completed | SessionStep::Error
        )
    }

    /// Whether this step is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStep::Completed | SessionStep::Error)
    }
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The legal transition table for the electronic flow.
fn transition_allowed(from: SessionStep, to: SessionStep) -> bool {
    use SessionStep::*;
    matches!(
        (from, to),
        (Idle, CollectingData)
            | (CollectingData, GeneratingCert)
            | (GeneratingCert, AwaitingOtp)
            | (AwaitingOtp, Signing)
            | (Signing, Completed)
            | (CollectingData, Error)
            | (GeneratingCert, Error)
            | (AwaitingOtp, Error)
            | (Signing, Error)
            | (Error, GeneratingCert)
    )
}

// ──────────────────────────────────────────────
// Collected enrollment
// ──────────────────────────────────────────────

/// Enrollment data after validation: digest computed over the raw
/// bytes, photo held in transport encoding. Kept on the session so a
/// retry can regenerate the certificate without re-collecting.
#[derive(Debug, Clone)]
pub struct CollectedEnrollment {
    pub gender: Gender,
    /// Normalized phone (digits only).
    pub phone: String,
    pub photo_digest: String,
    pub photo_encoded: String,
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

/// A transient signature session: one state machine walk for one
/// signing party on one agreement. Created when the signing UI opens,
/// discarded when it closes or completes; only terminal outcomes are
/// persisted.
#[derive(Debug)]
pub struct SignatureSession {
    pub id: String,
    pub agreement_id: String,
    pub party: PartyRole,
    pub method: SignatureMethod,
    pub step: SessionStep,
    /// RFC 3339 timestamp of session creation.
    pub started_at: String,
    pub enrollment: Option<CollectedEnrollment>,
    /// Certificate alias issued by the signing provider.
    pub certificate_alias: Option<String>,
    /// Operation identifier returned by the provider at certificate
    /// generation; all later provider calls reference it.
    pub operation_id: Option<String>,
    pub otp: Option<OtpChallenge>,
    pub signed_document_urls: Vec<String>,
    pub last_error: Option<String>,
    trace: Vec<StepRecord>,
}

impl SignatureSession {
    pub fn new(
        id: impl Into<String>,
        agreement_id: impl Into<String>,
        party: PartyRole,
        method: SignatureMethod,
        now: OffsetDateTime,
    ) -> Self {
        let mut session = SignatureSession {
            id: id.into(),
            agreement_id: agreement_id.into(),
            party,
            method,
            step: SessionStep::Idle,
            started_at: format_timestamp(now),
            enrollment: None,
            certificate_alias: None,
            operation_id: None,
            otp: None,
            signed_document_urls: Vec::new(),
            last_error: None,
            trace: Vec::new(),
        };
        session.record_step("opened", now);
        session
    }

    /// Advance to `to`, enforcing the transition table.
    pub fn advance(&mut self, to: SessionStep, now: OffsetDateTime) -> Result<(), EngineError> {
        if !transition_allowed(self.step, to) {
            return Err(EngineError::Transition {
                from: self.step,
                to,
            });
        }
        self.step = to;
        self.record_step("entered", now);
        Ok(())
    }

    /// Require the session to currently be at `expected`.
    pub fn expect_step(&self, expected: SessionStep) -> Result<(), EngineError> {
        if self.step != expected {
            return Err(EngineError::Transition {
                from: self.step,
                to: expected,
            });
        }
        Ok(())
    }

    /// Move an in-flight step to `Error`, recording the message.
    ///
    /// Must only be called from steps with an error edge; panics in
    /// debug builds otherwise (engine bugs, not user input).
    pub fn fail(&mut self, message: impl Into<String>, now: OffsetDateTime) {
        debug_assert!(transition_allowed(self.step, SessionStep::Error));
        self.step = SessionStep::Error;
        self.last_error = Some(message.into());
        self.record_step("failed", now);
    }

    /// Explicit retry: `Error` back to `GeneratingCert`. Requires the
    /// enrollment collected earlier; the OTP challenge and certificate
    /// alias are discarded and re-issued.
    pub fn retry(&mut self, now: OffsetDateTime) -> Result<(), EngineError> {
        self.expect_step(SessionStep::Error)?;
        if self.enrollment.is_none() {
            // Failed before collection finished; nothing to retry from.
            return Err(EngineError::Transition {
                from: SessionStep::Error,
                to: SessionStep::GeneratingCert,
            });
        }
        self.certificate_alias = None;
        self.operation_id = None;
        self.otp = None;
        self.last_error = None;
        self.advance(SessionStep::GeneratingCert, now)
    }

    /// Whether the session may be closed right now.
    pub fn can_close(&self) -> bool {
        self.step.allows_close()
    }

    /// Complete a handwritten-method session from `Idle`: the scanned
    /// artifact arrives out of band, no provider is involved.
    pub fn complete_out_of_band(&mut self, now: OffsetDateTime) -> Result<(), EngineError> {
        if self.method != SignatureMethod::Handwritten {
            return Err(EngineError::MethodMismatch {
                session_id: self.id.clone(),
            });
        }
        self.expect_step(SessionStep::Idle)?;
        self.step = SessionStep::Completed;
        self.record_step("entered", now);
        Ok(())
    }

    /// Append a trace entry for the current step.
    pub fn record_step(&mut self, outcome: &str, now: OffsetDateTime) {
        self.trace.push(StepRecord {
            step: self.step.as_str().to_string(),
            outcome: outcome.to_string(),
            at: format_timestamp(now),
        });
    }

    /// Ordered step trace since the session opened.
    pub fn trace(&self) -> &[StepRecord] {
        &self.trace
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests;
