//! End-to-end signature flow tests: engine + static provider + memory
//! storage.

use std::sync::Arc;

use paraph_core::{Agreement, AgreementKind, EnrollmentData, Gender, PartyRole, SignatureMethod};
use paraph_engine::provider::static_provider::StaticSignatureProvider;
use paraph_engine::{EngineError, OtpChannel, SignatureEngine};
use paraph_storage::{BlobStore, MemoryBlobStore, MemoryStorage, ParaphStorage};

const OTP: &str = "123456";

fn lease(id: &str) -> Agreement {
    Agreement::draft(id, AgreementKind::Contract, "prop-1", "own-1", "ten-1")
}

fn enrollment() -> EnrollmentData {
    EnrollmentData {
        gender: Gender::Female,
        phone: "+33 6 12 34 56 78".to_string(),
        photo: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x42],
        consent: true,
    }
}

fn setup() -> (
    SignatureEngine<MemoryStorage>,
    Arc<StaticSignatureProvider>,
    Arc<MemoryStorage>,
) {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StaticSignatureProvider::accepting(OTP));
    let engine = SignatureEngine::new(storage.clone(), provider.clone());
    (engine, provider, storage)
}

/// Drive one party through the full electronic flow to completion.
async fn sign_as(
    engine: &SignatureEngine<MemoryStorage>,
    agreement_id: &str,
    party: PartyRole,
) -> String {
    let session = engine
        .open_session(agreement_id, party, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();
    engine.verify_otp(&session.id, OTP).await.unwrap();
    let view = engine
        .sign(&session.id, &["lease.pdf".to_string()], false)
        .await
        .unwrap();
    assert_eq!(view.step, "completed");
    session.id
}

#[tokio::test]
async fn full_flow_sets_party_timestamp_and_advances_status() {
    let (engine, _, storage) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session_id = sign_as(&engine, "agr-1", PartyRole::Owner).await;

    let record = storage.get_agreement("agr-1").await.unwrap();
    assert_eq!(record.status, "partially_signed");
    assert!(record.owner_signed_at.is_some());
    assert!(record.counterparty_signed_at.is_none());
    assert_eq!(record.last_session_id.as_deref(), Some(session_id.as_str()));

    // The terminal session trace landed in the same commit.
    let executions = storage
        .list_session_executions(Some("agr-1"), 0)
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].outcome, "completed");
    assert_eq!(executions[0].party, "owner");
    assert!(executions[0].certificate_alias.is_some());
}

#[tokio::test]
async fn both_parties_signing_activates_the_agreement() {
    let (engine, _, storage) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let owner_session = sign_as(&engine, "agr-1", PartyRole::Owner).await;
    engine.close_session(&owner_session).await.unwrap();
    sign_as(&engine, "agr-1", PartyRole::Tenant).await;

    let record = storage.get_agreement("agr-1").await.unwrap();
    assert_eq!(record.status, "active");
    assert!(record.owner_signed_at.is_some());
    assert!(record.counterparty_signed_at.is_some());
}

#[tokio::test]
async fn short_otp_is_rejected_without_a_provider_call() {
    let (engine, provider, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();

    let err = engine.verify_otp(&session.id, "123").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOtpFormat { .. }));
    assert_eq!(provider.otp_verify_calls(), 0);

    // Still awaiting the code; a valid one goes through.
    engine.verify_otp(&session.id, OTP).await.unwrap();
    assert_eq!(provider.otp_verify_calls(), 1);
}

#[tokio::test]
async fn wrong_otp_is_an_inline_error_and_session_stays_open() {
    let (engine, _, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();

    let err = engine.verify_otp(&session.id, "654321").await.unwrap_err();
    assert!(matches!(err, EngineError::OtpRejected));
    let view = engine.session_view(&session.id).await.unwrap();
    assert_eq!(view.step, "awaiting_otp");

    engine.verify_otp(&session.id, OTP).await.unwrap();
}

#[tokio::test]
async fn resend_is_blocked_inside_the_cooldown_window() {
    let (engine, provider, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();
    assert_eq!(provider.otp_send_calls(), 1);

    let err = engine.resend_otp(&session.id).await.unwrap_err();
    match err {
        EngineError::OtpCooldown { remaining_secs } => {
            assert!(remaining_secs > 0 && remaining_secs <= 60);
        }
        other => panic!("expected OtpCooldown, got {other}"),
    }
    assert_eq!(provider.otp_send_calls(), 1);
}

#[tokio::test]
async fn signing_requires_the_otp_step() {
    let (engine, _, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();

    // Straight to sign without verifying the code: rejected.
    let err = engine
        .sign(&session.id, &["lease.pdf".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Transition { .. }));
}

#[tokio::test]
async fn second_session_for_same_agreement_is_rejected_until_close() {
    let (engine, _, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let first = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    let err = engine
        .open_session("agr-1", PartyRole::Tenant, SignatureMethod::Electronic)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionBusy { .. }));

    engine.close_session(&first.id).await.unwrap();
    engine
        .open_session("agr-1", PartyRole::Tenant, SignatureMethod::Electronic)
        .await
        .unwrap();
}

#[tokio::test]
async fn certificate_failure_surfaces_and_retry_returns_to_generation() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StaticSignatureProvider::accepting(OTP).failing_certificate());
    let engine = SignatureEngine::new(storage.clone(), provider.clone());
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();

    let err = engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Provider(_)));
    let view = engine.session_view(&session.id).await.unwrap();
    assert_eq!(view.step, "error");
    assert!(view.last_error.is_some());
    assert!(view.can_close);

    let view = engine.retry(&session.id).await.unwrap();
    assert_eq!(view.step, "generating_cert");
    assert!(view.certificate_alias.is_none());

    // Closing a failed-then-retried-then-refailed session records a
    // failed execution.
    let _ = engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap_err();
    engine.close_session(&session.id).await.unwrap();
    let executions = storage
        .list_session_executions(Some("agr-1"), 0)
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].outcome, "failed");
}

#[tokio::test]
async fn validation_failure_keeps_the_session_idle() {
    let (engine, provider, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    let mut bad = enrollment();
    bad.consent = false;
    let err = engine.collect(&session.id, bad).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(provider.certificate_calls(), 0);

    let view = engine.session_view(&session.id).await.unwrap();
    assert_eq!(view.step, "idle");
    // Valid data goes through afterwards.
    engine.collect(&session.id, enrollment()).await.unwrap();
}

#[tokio::test]
async fn handwritten_attachment_records_signature_and_document() {
    let (engine, provider, storage) = setup();
    engine
        .create_agreement(&Agreement::draft(
            "agr-2",
            AgreementKind::Mandate,
            "prop-9",
            "own-1",
            "agc-1",
        ))
        .await
        .unwrap();

    let session = engine
        .open_session("agr-2", PartyRole::Agency, SignatureMethod::Handwritten)
        .await
        .unwrap();
    let view = engine
        .attach_handwritten(&session.id, "agreements/agr-2/scan.pdf", &"ab".repeat(32), 2048, false)
        .await
        .unwrap();
    assert_eq!(view.step, "completed");
    assert_eq!(provider.certificate_calls(), 0);

    let record = storage.get_agreement("agr-2").await.unwrap();
    assert_eq!(record.status, "partially_signed");
    assert!(record.counterparty_signed_at.is_some());

    let documents = storage.list_documents("agr-2").await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].blob_key, "agreements/agr-2/scan.pdf");
}

#[tokio::test]
async fn double_sign_without_reconfirmation_is_rejected() {
    let (engine, _, storage) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let first = sign_as(&engine, "agr-1", PartyRole::Owner).await;
    engine.close_session(&first).await.unwrap();

    // Same party tries again without re-confirmation: the signing step
    // fails and the agreement is untouched.
    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();
    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .unwrap();
    engine.verify_otp(&session.id, OTP).await.unwrap();
    let err = engine
        .sign(&session.id, &["lease.pdf".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Agreement(_)));

    let record = storage.get_agreement("agr-1").await.unwrap();
    assert_eq!(record.status, "partially_signed");
    assert_eq!(record.version, 1);
}

#[tokio::test]
async fn collected_photo_lands_in_the_blob_store() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StaticSignatureProvider::accepting(OTP));
    let blobs = Arc::new(MemoryBlobStore::new());
    let engine = SignatureEngine::new(storage, provider).with_blob_store(blobs.clone());
    engine.create_agreement(&lease("agr-1")).await.unwrap();

    let session = engine
        .open_session("agr-1", PartyRole::Owner, SignatureMethod::Electronic)
        .await
        .unwrap();
    engine.collect(&session.id, enrollment()).await.unwrap();

    let blob = blobs
        .get("agreements/agr-1/enrollment/owner.jpg")
        .await
        .unwrap();
    assert_eq!(blob.bytes, enrollment().photo);
    assert_eq!(blob.content_type, "image/jpeg");
}

#[tokio::test]
async fn unknown_party_cannot_open_a_session() {
    let (engine, _, _) = setup();
    engine.create_agreement(&lease("agr-1")).await.unwrap();
    let err = engine
        .open_session("agr-1", PartyRole::Agency, SignatureMethod::Electronic)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Agreement(_)));
}
