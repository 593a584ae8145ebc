//! HTTP route handlers: agreements, sessions, and the workflow steps.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use paraph_core::{
    decode_photo, Agreement, EnrollmentData, Gender, PartyRole, SignatureMethod,
};
use paraph_engine::{EngineError, OtpChannel, SessionView};
use paraph_storage::{AgreementRecord, ParaphStorage, StorageError};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::state::AppState;
use super::json_error;

// ──────────────────────────────────────────────
// Error mapping
// ──────────────────────────────────────────────

/// Map an engine error to an HTTP response.
fn engine_error_response(e: EngineError) -> Response {
    let status = match &e {
        EngineError::Validation(_)
        | EngineError::InvalidOtpFormat { .. }
        | EngineError::MissingOtpDestination
        | EngineError::OtpRejected => StatusCode::BAD_REQUEST,
        EngineError::SessionNotFound { .. }
        | EngineError::Storage(StorageError::AgreementNotFound { .. })
        | EngineError::Storage(StorageError::ExecutionNotFound { .. })
        | EngineError::Storage(StorageError::BlobNotFound { .. }) => StatusCode::NOT_FOUND,
        EngineError::Storage(StorageError::AlreadyExists { .. })
        | EngineError::Storage(StorageError::ConcurrentConflict { .. })
        | EngineError::SessionBusy { .. }
        | EngineError::CloseBlocked { .. }
        | EngineError::Transition { .. }
        | EngineError::Agreement(_)
        | EngineError::MethodMismatch { .. }
        | EngineError::OtpMissing
        | EngineError::OtpExhausted => StatusCode::CONFLICT,
        EngineError::OtpCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
        EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
        EngineError::Storage(_) | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    match e {
        EngineError::OtpCooldown { remaining_secs } => (
            status,
            Json(serde_json::json!({
                "error": format!("OTP resend available in {}s", remaining_secs),
                "retry_after": remaining_secs,
            })),
        )
            .into_response(),
        _ => (status, Json(serde_json::json!({"error": e.to_string()}))).into_response(),
    }
}

fn session_response(result: Result<SessionView, EngineError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

// ──────────────────────────────────────────────
// Health and fallback
// ──────────────────────────────────────────────

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

// ──────────────────────────────────────────────
// Agreements
// ──────────────────────────────────────────────

fn agreement_summary(record: &AgreementRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.agreement_id,
        "kind": record.kind,
        "property_id": record.property_id,
        "status": record.status,
        "owner_signed_at": record.owner_signed_at,
        "counterparty_signed_at": record.counterparty_signed_at,
        "updated_at": record.updated_at,
    })
}

/// GET /agreements
pub(crate) async fn handle_list_agreements(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.storage().list_agreements(None).await {
        Ok(records) => {
            let list: Vec<serde_json::Value> = records.iter().map(agreement_summary).collect();
            (StatusCode::OK, Json(serde_json::json!({ "agreements": list }))).into_response()
        }
        Err(e) => engine_error_response(e.into()),
    }
}

/// GET /agreements/{id}
pub(crate) async fn handle_get_agreement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.storage().get_agreement(&id).await {
        Ok(record) => {
            let mut value = agreement_summary(&record);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("agreement".to_string(), record.body.clone());
                obj.insert("version".to_string(), serde_json::json!(record.version));
            }
            (StatusCode::OK, Json(value)).into_response()
        }
        Err(e) => engine_error_response(e.into()),
    }
}

#[derive(Deserialize)]
pub(crate) struct CreateAgreementRequest {
    id: String,
    kind: paraph_core::AgreementKind,
    property_id: String,
    owner_id: String,
    counterparty_id: String,
    #[serde(default)]
    monthly_rent: Option<Decimal>,
    #[serde(default)]
    deposit: Option<Decimal>,
    #[serde(default)]
    management_fee_rate: Option<Decimal>,
}

/// POST /agreements
pub(crate) async fn handle_create_agreement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAgreementRequest>,
) -> Response {
    let mut agreement = Agreement::draft(
        req.id,
        req.kind,
        req.property_id,
        req.owner_id,
        req.counterparty_id,
    );
    agreement.monthly_rent = req.monthly_rent;
    agreement.deposit = req.deposit;
    agreement.management_fee_rate = req.management_fee_rate;

    match state.engine.create_agreement(&agreement).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": agreement.id, "status": agreement.status.as_str() })),
        )
            .into_response(),
        Err(e) => engine_error_response(e),
    }
}

// ──────────────────────────────────────────────
// Sessions
// ──────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct OpenSessionRequest {
    party: PartyRole,
    #[serde(default = "default_method")]
    method: SignatureMethod,
}

fn default_method() -> SignatureMethod {
    SignatureMethod::Electronic
}

/// POST /agreements/{id}/sessions
pub(crate) async fn handle_open_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OpenSessionRequest>,
) -> Response {
    session_response(state.engine.open_session(&id, req.party, req.method).await)
}

/// GET /sessions/{id}
pub(crate) async fn handle_get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    session_response(state.engine.session_view(&id).await)
}

#[derive(Deserialize)]
pub(crate) struct CollectRequest {
    gender: Gender,
    phone: String,
    /// Photo in transport encoding (base64).
    photo: String,
    consent: bool,
}

/// POST /sessions/{id}/collect
pub(crate) async fn handle_collect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CollectRequest>,
) -> Response {
    let photo = match decode_photo(&req.photo) {
        Ok(bytes) => bytes,
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("photo is not valid base64: {}", e),
            )
            .into_response()
        }
    };
    let data = EnrollmentData {
        gender: req.gender,
        phone: req.phone,
        photo,
        consent: req.consent,
    };
    session_response(state.engine.collect(&id, data).await)
}

#[derive(Deserialize)]
pub(crate) struct CertificateRequest {
    #[serde(default = "default_channel")]
    otp_channel: String,
    #[serde(default)]
    email: Option<String>,
}

fn default_channel() -> String {
    "sms".to_string()
}

/// POST /sessions/{id}/certificate
pub(crate) async fn handle_generate_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CertificateRequest>,
) -> Response {
    let channel = match req.otp_channel.as_str() {
        "sms" => OtpChannel::Sms,
        "email" => OtpChannel::Email,
        other => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("unknown OTP channel '{}' (sms, email)", other),
            )
            .into_response()
        }
    };
    session_response(
        state
            .engine
            .generate_certificate(&id, channel, req.email)
            .await,
    )
}

/// POST /sessions/{id}/otp/resend
pub(crate) async fn handle_otp_resend(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    session_response(state.engine.resend_otp(&id).await)
}

#[derive(Deserialize)]
pub(crate) struct VerifyRequest {
    code: String,
}

/// POST /sessions/{id}/otp/verify
pub(crate) async fn handle_otp_verify(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Response {
    session_response(state.engine.verify_otp(&id, &req.code).await)
}

#[derive(Deserialize)]
pub(crate) struct SignRequest {
    documents: Vec<String>,
    #[serde(default)]
    reconfirm: bool,
}

/// POST /sessions/{id}/sign
pub(crate) async fn handle_sign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SignRequest>,
) -> Response {
    session_response(state.engine.sign(&id, &req.documents, req.reconfirm).await)
}

/// POST /sessions/{id}/retry
pub(crate) async fn handle_retry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    session_response(state.engine.retry(&id).await)
}

/// POST /sessions/{id}/close
pub(crate) async fn handle_close(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.close_session(&id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"closed": true}))).into_response(),
        Err(e) => engine_error_response(e),
    }
}
