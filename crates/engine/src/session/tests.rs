use super::*;
use paraph_core::{Gender, PartyRole, SignatureMethod};
use time::macros::datetime;

fn t0() -> OffsetDateTime {
    datetime!(2026-03-01 10:00:00 UTC)
}

fn electronic() -> SignatureSession {
    SignatureSession::new(
        "sess-1",
        "agr-1",
        PartyRole::Owner,
        SignatureMethod::Electronic,
        t0(),
    )
}

fn enrollment() -> CollectedEnrollment {
    CollectedEnrollment {
        gender: Gender::Male,
        phone: "33612345678".to_string(),
        photo_digest: "ab".repeat(32),
        photo_encoded: "AAECAw==".to_string(),
    }
}

/// Walk a session to the given step through the legal path.
fn walk_to(session: &mut SignatureSession, target: SessionStep) {
    let path = [
        SessionStep::CollectingData,
        SessionStep::GeneratingCert,
        SessionStep::AwaitingOtp,
        SessionStep::Signing,
        SessionStep::Completed,
    ];
    for step in path {
        if session.step == target {
            return;
        }
        session.advance(step, t0()).unwrap();
    }
    assert_eq!(session.step, target);
}

// ──────────────────────────────────────
// Ordering
// ──────────────────────────────────────

#[test]
fn full_walk_in_order_succeeds() {
    let mut s = electronic();
    walk_to(&mut s, SessionStep::Completed);
    assert_eq!(s.step, SessionStep::Completed);
    assert!(s.step.is_terminal());
}

#[test]
fn signing_unreachable_without_otp_step() {
    // From every step except awaiting_otp, advancing to signing is rejected.
    for target in [
        SessionStep::Idle,
        SessionStep::CollectingData,
        SessionStep::GeneratingCert,
    ] {
        let mut s = electronic();
        walk_to(&mut s, target);
        let err = s.advance(SessionStep::Signing, t0()).unwrap_err();
        assert!(
            matches!(err, EngineError::Transition { .. }),
            "signing reachable from {target}"
        );
    }
}

#[test]
fn steps_cannot_be_skipped() {
    let mut s = electronic();
    assert!(s.advance(SessionStep::GeneratingCert, t0()).is_err());
    assert!(s.advance(SessionStep::AwaitingOtp, t0()).is_err());
    assert!(s.advance(SessionStep::Completed, t0()).is_err());
    // And no walking backwards.
    walk_to(&mut s, SessionStep::AwaitingOtp);
    assert!(s.advance(SessionStep::CollectingData, t0()).is_err());
}

#[test]
fn completed_is_terminal() {
    let mut s = electronic();
    walk_to(&mut s, SessionStep::Completed);
    for step in [
        SessionStep::Idle,
        SessionStep::GeneratingCert,
        SessionStep::Error,
    ] {
        assert!(s.advance(step, t0()).is_err());
    }
}

// ──────────────────────────────────────
// Error and retry
// ──────────────────────────────────────

#[test]
fn in_flight_steps_can_fail() {
    for target in [
        SessionStep::CollectingData,
        SessionStep::GeneratingCert,
        SessionStep::AwaitingOtp,
        SessionStep::Signing,
    ] {
        let mut s = electronic();
        walk_to(&mut s, target);
        s.fail("provider unavailable", t0());
        assert_eq!(s.step, SessionStep::Error);
        assert_eq!(s.last_error.as_deref(), Some("provider unavailable"));
    }
}

#[test]
fn retry_returns_to_certificate_generation() {
    let mut s = electronic();
    s.enrollment = Some(enrollment());
    walk_to(&mut s, SessionStep::GeneratingCert);
    s.certificate_alias = Some("alias-1".to_string());
    s.operation_id = Some("op-1".to_string());
    s.fail("certificate rejected", t0());

    s.retry(t0()).unwrap();
    assert_eq!(s.step, SessionStep::GeneratingCert);
    // Provider artifacts are discarded for re-issue.
    assert!(s.certificate_alias.is_none());
    assert!(s.operation_id.is_none());
    assert!(s.otp.is_none());
    assert!(s.last_error.is_none());
}

#[test]
fn retry_requires_error_step() {
    let mut s = electronic();
    s.enrollment = Some(enrollment());
    walk_to(&mut s, SessionStep::AwaitingOtp);
    assert!(s.retry(t0()).is_err());
    assert_eq!(s.step, SessionStep::AwaitingOtp);
}

#[test]
fn retry_without_collected_enrollment_is_rejected() {
    let mut s = electronic();
    walk_to(&mut s, SessionStep::CollectingData);
    s.fail("photo upload interrupted", t0());
    assert!(s.retry(t0()).is_err());
    assert_eq!(s.step, SessionStep::Error);
}

// ──────────────────────────────────────
// Close rules
// ──────────────────────────────────────

#[test]
fn close_allowed_in_idle_awaiting_otp_completed_and_error() {
    for target in [
        SessionStep::Idle,
        SessionStep::AwaitingOtp,
        SessionStep::Completed,
    ] {
        let mut s = electronic();
        walk_to(&mut s, target);
        assert!(s.can_close(), "close blocked in {target}");
    }
    let mut s = electronic();
    walk_to(&mut s, SessionStep::GeneratingCert);
    s.fail("x", t0());
    assert!(s.can_close());
}

#[test]
fn close_blocked_while_in_flight() {
    for target in [
        SessionStep::CollectingData,
        SessionStep::GeneratingCert,
        SessionStep::Signing,
    ] {
        let mut s = electronic();
        walk_to(&mut s, target);
        assert!(!s.can_close(), "close allowed in {target}");
    }
}

// ──────────────────────────────────────
// Handwritten path
// ──────────────────────────────────────

#[test]
fn handwritten_completes_from_idle() {
    let mut s = SignatureSession::new(
        "sess-2",
        "agr-1",
        PartyRole::Tenant,
        SignatureMethod::Handwritten,
        t0(),
    );
    s.complete_out_of_band(t0()).unwrap();
    assert_eq!(s.step, SessionStep::Completed);
}

#[test]
fn electronic_session_rejects_out_of_band_completion() {
    let mut s = electronic();
    let err = s.complete_out_of_band(t0()).unwrap_err();
    assert!(matches!(err, EngineError::MethodMismatch { .. }));
    assert_eq!(s.step, SessionStep::Idle);
}

// ──────────────────────────────────────
// Trace
// ──────────────────────────────────────

#[test]
fn trace_records_each_step_in_order() {
    let mut s = electronic();
    walk_to(&mut s, SessionStep::GeneratingCert);
    let steps: Vec<&str> = s.trace().iter().map(|r| r.step.as_str()).collect();
    assert_eq!(steps, vec!["idle", "collecting_data", "generating_cert"]);
}
