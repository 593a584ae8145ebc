//! The signature engine: session lifecycle and step orchestration.
//!
//! One `SignatureEngine` serves the whole process. It keeps live
//! sessions in memory (they are transient by design), enforces the
//! single-flight rule per agreement, and runs each step against the
//! signing provider. Agreement mutations and terminal session traces
//! are persisted through one storage snapshot per terminal step, so a
//! signature never lands on an agreement without its session trace.
//!
//! Step entry points check the current step and reject out-of-order
//! calls; a per-session async lock serializes callers so steps execute
//! strictly in sequence even under concurrent requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use paraph_core::{
    encode_photo, format_timestamp, normalize_phone, photo_digest, Agreement, EnrollmentData,
    PartyRole, PartySignature, SignatureMethod,
};
use paraph_storage::{
    AgreementRecord, BlobStore, DocumentRecord, ParaphStorage, SessionExecutionRecord,
};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::EngineError;
use crate::otp::{code_is_well_formed, OtpChallenge, OtpChannel};
use crate::provider::{EnrollmentSubmission, SignatureProvider};
use crate::session::{CollectedEnrollment, SessionStep, SignatureSession};

// ──────────────────────────────────────────────
// Views
// ──────────────────────────────────────────────

/// Caller-facing snapshot of a session's state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub agreement_id: String,
    pub party: String,
    pub method: String,
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Seconds until an OTP resend is allowed; absent before the first
    /// dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_resend_available_in: Option<i64>,
    pub signed_document_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub can_close: bool,
}

// ──────────────────────────────────────────────
// Engine
// ──────────────────────────────────────────────

type SessionHandle = Arc<AsyncMutex<SignatureSession>>;

/// Orchestrates signature sessions against a provider and a storage
/// backend.
pub struct SignatureEngine<S: ParaphStorage> {
    storage: Arc<S>,
    provider: Arc<dyn SignatureProvider>,
    /// Object store for enrollment photos and scans; photos are kept
    /// in session memory only when absent.
    blobs: Option<Arc<dyn BlobStore>>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    /// agreement_id -> session_id, the single-flight guard.
    active: Mutex<HashMap<String, String>>,
    next_id: AtomicU64,
}

impl<S: ParaphStorage> SignatureEngine<S> {
    pub fn new(storage: Arc<S>, provider: Arc<dyn SignatureProvider>) -> Self {
        SignatureEngine {
            storage,
            provider,
            blobs: None,
            sessions: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attach an object store; collected photos are uploaded to it.
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// The underlying storage, for read-side queries.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    // ── Agreements ────────────────────────────────────────────────────────────

    /// Persist a new draft agreement.
    pub async fn create_agreement(&self, agreement: &Agreement) -> Result<(), EngineError> {
        let record = agreement_to_record(agreement, OffsetDateTime::now_utc())?;
        let mut snap = self.storage.begin_snapshot().await?;
        if let Err(e) = self.storage.create_agreement(&mut snap, record).await {
            let _ = self.storage.abort_snapshot(snap).await;
            return Err(e.into());
        }
        self.storage.commit_snapshot(snap).await?;
        Ok(())
    }

    // ── Session lifecycle ─────────────────────────────────────────────────────

    /// Open a signature session for one party on an agreement.
    ///
    /// Rejects with `SessionBusy` while another live session exists for
    /// the same agreement, and with an agreement error when `party` is
    /// not one of its signing parties.
    pub async fn open_session(
        &self,
        agreement_id: &str,
        party: PartyRole,
        method: SignatureMethod,
    ) -> Result<SessionView, EngineError> {
        let record = self.storage.get_agreement(agreement_id).await?;
        let agreement = parse_agreement(&record)?;
        agreement.check_signing_party(party)?;

        let now = OffsetDateTime::now_utc();
        let session_id = {
            let mut active = lock(&self.active);
            if active.contains_key(agreement_id) {
                return Err(EngineError::SessionBusy {
                    agreement_id: agreement_id.to_string(),
                });
            }
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("sess-{}-{:08x}", n, rand::random::<u32>());
            active.insert(agreement_id.to_string(), id.clone());
            id
        };

        let session = SignatureSession::new(&session_id, agreement_id, party, method, now);
        let view = view_of(&session, now);
        lock(&self.sessions).insert(session_id, Arc::new(AsyncMutex::new(session)));
        Ok(view)
    }

    /// Current state of a session.
    pub async fn session_view(&self, session_id: &str) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().await;
        Ok(view_of(&session, OffsetDateTime::now_utc()))
    }

    /// Close a session. Allowed in `idle`, `awaiting_otp`, `completed`,
    /// and `error`; blocked while an external operation is in flight.
    /// A session that had begun but not completed leaves a terminal
    /// execution record.
    pub async fn close_session(&self, session_id: &str) -> Result<(), EngineError> {
        let handle = self.handle(session_id)?;
        {
            let mut session = handle.lock().await;
            if !session.can_close() {
                return Err(EngineError::CloseBlocked { step: session.step });
            }
            let now = OffsetDateTime::now_utc();
            let outcome = match session.step {
                // Completed sessions were recorded when the signature
                // landed; idle ones never started anything.
                SessionStep::Completed | SessionStep::Idle => None,
                SessionStep::Error => Some("failed"),
                _ => Some("closed"),
            };
            if let Some(outcome) = outcome {
                session.record_step("closed", now);
                let record = execution_record(&session, outcome, Some(format_timestamp(now)));
                self.persist_execution(record).await?;
            }
        }
        self.discard(session_id);
        Ok(())
    }

    /// Explicit retry from `error` back to certificate generation.
    pub async fn retry(&self, session_id: &str) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        let now = OffsetDateTime::now_utc();
        session.retry(now)?;
        Ok(view_of(&session, now))
    }

    // ── Electronic flow steps ─────────────────────────────────────────────────

    /// Data collection: validate, digest the raw photo, encode for
    /// transport, and move on to certificate generation. Validation
    /// failures leave the session in `idle`.
    pub async fn collect(
        &self,
        session_id: &str,
        data: EnrollmentData,
    ) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.expect_step(SessionStep::Idle)?;

        data.validate()?;
        let phone = normalize_phone(&data.phone)?;
        // Digest the raw bytes BEFORE transport encoding: the
        // certificate binds to the content, not its wire form.
        let digest = photo_digest(&data.photo);
        let encoded = encode_photo(&data.photo);

        let now = OffsetDateTime::now_utc();
        session.advance(SessionStep::CollectingData, now)?;

        if let Some(blobs) = &self.blobs {
            let key = enrollment_photo_key(&session.agreement_id, session.party);
            if let Err(e) = blobs.put(&key, data.photo.clone(), "image/jpeg").await {
                session.fail(e.to_string(), now);
                return Err(e.into());
            }
        }

        session.enrollment = Some(CollectedEnrollment {
            gender: data.gender,
            phone,
            photo_digest: digest,
            photo_encoded: encoded,
        });
        session.advance(SessionStep::GeneratingCert, now)?;
        Ok(view_of(&session, now))
    }

    /// Certificate generation, then first OTP dispatch.
    ///
    /// On provider failure the session moves to `error`; recovery is
    /// the explicit retry edge.
    pub async fn generate_certificate(
        &self,
        session_id: &str,
        otp_channel: OtpChannel,
        email_destination: Option<String>,
    ) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.expect_step(SessionStep::GeneratingCert)?;

        let enrollment = session
            .enrollment
            .clone()
            .ok_or(EngineError::Transition {
                from: SessionStep::GeneratingCert,
                to: SessionStep::AwaitingOtp,
            })?;
        let destination = match otp_channel {
            OtpChannel::Sms => enrollment.phone.clone(),
            OtpChannel::Email => email_destination.ok_or(EngineError::MissingOtpDestination)?,
        };

        let submission = EnrollmentSubmission {
            gender: enrollment.gender.as_str().to_string(),
            phone: enrollment.phone.clone(),
            photo: enrollment.photo_encoded.clone(),
            photo_digest: enrollment.photo_digest.clone(),
        };

        let now = OffsetDateTime::now_utc();
        let issue = match self.provider.create_certificate(&submission).await {
            Ok(issue) => issue,
            Err(e) => {
                session.fail(e.to_string(), now);
                return Err(e.into());
            }
        };
        if let Err(e) = self
            .provider
            .send_otp(&issue.operation_id, otp_channel, &destination)
            .await
        {
            session.fail(e.to_string(), now);
            return Err(e.into());
        }

        session.certificate_alias = Some(issue.certificate_alias);
        session.operation_id = Some(issue.operation_id);
        session.advance(SessionStep::AwaitingOtp, now)?;
        session.otp = Some(OtpChallenge::new(otp_channel, destination, now));
        Ok(view_of(&session, now))
    }

    /// Resend the one-time code, enforcing the cooldown window.
    pub async fn resend_otp(&self, session_id: &str) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.expect_step(SessionStep::AwaitingOtp)?;

        let now = OffsetDateTime::now_utc();
        let (channel, destination) = match session.otp.as_ref() {
            Some(otp) if otp.can_resend(now) => (otp.channel, otp.destination.clone()),
            Some(otp) => {
                return Err(EngineError::OtpCooldown {
                    remaining_secs: otp.resend_available_in(now),
                })
            }
            None => return Err(EngineError::OtpMissing),
        };
        let operation_id = session.operation_id.clone().ok_or(EngineError::OtpMissing)?;

        if let Err(e) = self
            .provider
            .send_otp(&operation_id, channel, &destination)
            .await
        {
            session.fail(e.to_string(), now);
            return Err(e.into());
        }
        if let Some(otp) = session.otp.as_mut() {
            otp.mark_resent(now);
        }
        session.record_step("otp_resent", now);
        Ok(view_of(&session, now))
    }

    /// Verify a submitted code. A code that is not exactly 6 digits is
    /// rejected locally without a provider call; a wrong code is an
    /// inline error leaving the session in `awaiting_otp` until the
    /// attempt cap exhausts it.
    pub async fn verify_otp(
        &self,
        session_id: &str,
        code: &str,
    ) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.expect_step(SessionStep::AwaitingOtp)?;

        if !code_is_well_formed(code) {
            return Err(EngineError::InvalidOtpFormat {
                got: code.to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let within_cap = match session.otp.as_mut() {
            Some(otp) => otp.register_attempt(),
            None => return Err(EngineError::OtpMissing),
        };
        if !within_cap {
            session.fail("too many failed OTP attempts", now);
            return Err(EngineError::OtpExhausted);
        }

        let operation_id = session.operation_id.clone().ok_or(EngineError::OtpMissing)?;
        let verified = match self.provider.verify_otp(&operation_id, code).await {
            Ok(v) => v,
            Err(e) => {
                session.fail(e.to_string(), now);
                return Err(e.into());
            }
        };
        if !verified {
            session.record_step("otp_rejected", now);
            return Err(EngineError::OtpRejected);
        }

        session.advance(SessionStep::Signing, now)?;
        Ok(view_of(&session, now))
    }

    /// Submit the verified session for signing; on success record the
    /// party's signature on the agreement and complete the session.
    pub async fn sign(
        &self,
        session_id: &str,
        document_keys: &[String],
        reconfirm: bool,
    ) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        session.expect_step(SessionStep::Signing)?;

        let now = OffsetDateTime::now_utc();
        let operation_id = session.operation_id.clone().ok_or(EngineError::OtpMissing)?;
        let alias = session
            .certificate_alias
            .clone()
            .unwrap_or_default();

        let receipt = match self
            .provider
            .sign_documents(&operation_id, &alias, document_keys)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                session.fail(e.to_string(), now);
                return Err(e.into());
            }
        };

        session.signed_document_urls = receipt.documents.iter().map(|d| d.url.clone()).collect();

        let signature = PartySignature {
            signed_at: format_timestamp(now),
            method: session.method,
            certificate_alias: session.certificate_alias.clone(),
            signed_document_url: receipt.documents.first().map(|d| d.url.clone()),
        };

        if let Err(e) = self
            .persist_signature(&session, signature, reconfirm, now)
            .await
        {
            session.fail(e.to_string(), now);
            return Err(e);
        }

        session.advance(SessionStep::Completed, now)?;
        // The agreement is free for the other party's session.
        lock(&self.active).remove(&session.agreement_id);
        Ok(view_of(&session, now))
    }

    // ── Handwritten flow ──────────────────────────────────────────────────────

    /// Attach a scanned handwritten signature: records the signature,
    /// stores the document metadata, and completes the session without
    /// any provider involvement.
    pub async fn attach_handwritten(
        &self,
        session_id: &str,
        document_key: &str,
        content_digest: &str,
        byte_length: u64,
        reconfirm: bool,
    ) -> Result<SessionView, EngineError> {
        let handle = self.handle(session_id)?;
        let mut session = handle.lock().await;
        if session.method != SignatureMethod::Handwritten {
            return Err(EngineError::MethodMismatch {
                session_id: session.id.clone(),
            });
        }
        session.expect_step(SessionStep::Idle)?;

        let now = OffsetDateTime::now_utc();
        let signature = PartySignature {
            signed_at: format_timestamp(now),
            method: SignatureMethod::Handwritten,
            certificate_alias: None,
            signed_document_url: None,
        };
        let document = DocumentRecord {
            blob_key: document_key.to_string(),
            agreement_id: session.agreement_id.clone(),
            content_digest: content_digest.to_string(),
            content_type: "application/pdf".to_string(),
            byte_length,
        };

        self.persist_handwritten(&session, signature, document, reconfirm, now)
            .await?;
        session.complete_out_of_band(now)?;
        lock(&self.active).remove(&session.agreement_id);
        Ok(view_of(&session, now))
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    async fn persist_signature(
        &self,
        session: &SignatureSession,
        signature: PartySignature,
        reconfirm: bool,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        let mut snap = self.storage.begin_snapshot().await?;
        let result = self
            .apply_signature(&mut snap, session, signature, None, reconfirm, now)
            .await;
        match result {
            Ok(()) => {
                self.storage.commit_snapshot(snap).await?;
                Ok(())
            }
            Err(e) => {
                let _ = self.storage.abort_snapshot(snap).await;
                Err(e)
            }
        }
    }

    async fn persist_handwritten(
        &self,
        session: &SignatureSession,
        signature: PartySignature,
        document: DocumentRecord,
        reconfirm: bool,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        let mut snap = self.storage.begin_snapshot().await?;
        let result = self
            .apply_signature(&mut snap, session, signature, Some(document), reconfirm, now)
            .await;
        match result {
            Ok(()) => {
                self.storage.commit_snapshot(snap).await?;
                Ok(())
            }
            Err(e) => {
                let _ = self.storage.abort_snapshot(snap).await;
                Err(e)
            }
        }
    }

    /// One snapshot: agreement mutation, optional document metadata,
    /// and the session execution record. All or nothing.
    async fn apply_signature(
        &self,
        snap: &mut S::Snapshot,
        session: &SignatureSession,
        signature: PartySignature,
        document: Option<DocumentRecord>,
        reconfirm: bool,
        now: OffsetDateTime,
    ) -> Result<(), EngineError> {
        let mut record = self
            .storage
            .get_agreement_for_update(snap, &session.agreement_id)
            .await?;
        let mut agreement = parse_agreement(&record)?;
        agreement.record_signature(session.party, signature, reconfirm)?;

        let expected = record.version;
        record.status = agreement.status.as_str().to_string();
        record.owner_signed_at = agreement
            .owner_signature
            .as_ref()
            .map(|s| s.signed_at.clone());
        record.counterparty_signed_at = agreement
            .counterparty_signature
            .as_ref()
            .map(|s| s.signed_at.clone());
        record.updated_at = format_timestamp(now);
        record.last_session_id = Some(session.id.clone());
        record.body = serde_json::to_value(&agreement)
            .map_err(|e| EngineError::Internal(format!("serialize agreement: {e}")))?;

        self.storage.update_agreement(snap, record, expected).await?;
        if let Some(document) = document {
            self.storage.insert_document(snap, document).await?;
        }
        self.storage
            .insert_session_execution(
                snap,
                execution_record(session, "completed", Some(format_timestamp(now))),
            )
            .await?;
        Ok(())
    }

    async fn persist_execution(&self, record: SessionExecutionRecord) -> Result<(), EngineError> {
        let mut snap = self.storage.begin_snapshot().await?;
        if let Err(e) = self.storage.insert_session_execution(&mut snap, record).await {
            let _ = self.storage.abort_snapshot(snap).await;
            return Err(e.into());
        }
        self.storage.commit_snapshot(snap).await?;
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn handle(&self, session_id: &str) -> Result<SessionHandle, EngineError> {
        lock(&self.sessions)
            .get(session_id)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    fn discard(&self, session_id: &str) {
        let removed = lock(&self.sessions).remove(session_id);
        if let Some(handle) = removed {
            // Free the agreement for a new session even if the map got
            // out of sync.
            if let Ok(session) = handle.try_lock() {
                lock(&self.active).remove(&session.agreement_id);
            }
        }
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Recover data even if a mutex was poisoned by a panic in another
/// thread.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Blob key for a party's enrollment photo.
fn enrollment_photo_key(agreement_id: &str, party: PartyRole) -> String {
    format!("agreements/{}/enrollment/{}.jpg", agreement_id, party.as_str())
}

fn parse_agreement(record: &AgreementRecord) -> Result<Agreement, EngineError> {
    serde_json::from_value(record.body.clone())
        .map_err(|e| EngineError::Internal(format!("corrupt agreement body: {e}")))
}

/// Build the storage record for a domain agreement.
pub fn agreement_to_record(
    agreement: &Agreement,
    now: OffsetDateTime,
) -> Result<AgreementRecord, EngineError> {
    Ok(AgreementRecord {
        agreement_id: agreement.id.clone(),
        kind: agreement.kind.as_str().to_string(),
        property_id: agreement.property_id.clone(),
        status: agreement.status.as_str().to_string(),
        version: 0,
        owner_signed_at: agreement
            .owner_signature
            .as_ref()
            .map(|s| s.signed_at.clone()),
        counterparty_signed_at: agreement
            .counterparty_signature
            .as_ref()
            .map(|s| s.signed_at.clone()),
        updated_at: format_timestamp(now),
        last_session_id: None,
        body: serde_json::to_value(agreement)
            .map_err(|e| EngineError::Internal(format!("serialize agreement: {e}")))?,
    })
}

fn execution_record(
    session: &SignatureSession,
    outcome: &str,
    completed_at: Option<String>,
) -> SessionExecutionRecord {
    SessionExecutionRecord {
        id: format!("exec-{}", session.id),
        agreement_id: session.agreement_id.clone(),
        party: session.party.as_str().to_string(),
        outcome: outcome.to_string(),
        started_at: session.started_at.clone(),
        completed_at,
        certificate_alias: session.certificate_alias.clone(),
        step_trace: serde_json::to_value(session.trace()).unwrap_or(serde_json::Value::Null),
    }
}

fn view_of(session: &SignatureSession, now: OffsetDateTime) -> SessionView {
    SessionView {
        id: session.id.clone(),
        agreement_id: session.agreement_id.clone(),
        party: session.party.as_str().to_string(),
        method: session.method.as_str().to_string(),
        step: session.step.as_str().to_string(),
        certificate_alias: session.certificate_alias.clone(),
        operation_id: session.operation_id.clone(),
        otp_resend_available_in: session.otp.as_ref().map(|o| o.resend_available_in(now)),
        signed_document_urls: session.signed_document_urls.clone(),
        last_error: session.last_error.clone(),
        can_close: session.can_close(),
    }
}
