//! `paraph serve` -- HTTP JSON API for the signature engine.
//!
//! Exposes the agreement store and the signature session workflow as
//! an async HTTP service using `axum` + `tokio`. Supports concurrent
//! request handling; per-session ordering is enforced by the engine.
//!
//! Security features:
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, PARAPH_RATE_LIMIT override)
//! - Optional API key authentication via PARAPH_API_KEY env var
//!
//! Endpoints:
//! - GET  /health                       - Server status (exempt from auth)
//! - GET  /agreements                   - List agreement summaries
//! - POST /agreements                   - Create a draft agreement
//! - GET  /agreements/{id}              - Full agreement record
//! - POST /agreements/{id}/sessions     - Open a signature session
//! - GET  /sessions/{id}                - Session state
//! - POST /sessions/{id}/collect        - Enrollment data collection
//! - POST /sessions/{id}/certificate    - Certificate generation + first OTP
//! - POST /sessions/{id}/otp/resend     - Resend the code (cooldown enforced)
//! - POST /sessions/{id}/otp/verify     - Verify a submitted code
//! - POST /sessions/{id}/sign           - Sign the documents
//! - POST /sessions/{id}/retry          - Retry from the error step
//! - POST /sessions/{id}/close          - Close the session
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use paraph_engine::provider::http::HttpSignatureProvider;
use paraph_engine::provider::static_provider::StaticSignatureProvider;
use paraph_engine::{ProviderConfig, SignatureEngine, SignatureProvider};
use paraph_storage::{MemoryBlobStore, MemoryStorage};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_close, handle_collect, handle_create_agreement, handle_generate_certificate,
    handle_get_agreement, handle_get_session, handle_health, handle_list_agreements,
    handle_not_found, handle_open_session, handle_otp_resend, handle_otp_verify, handle_retry,
    handle_sign,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};
use crate::inspect::load_agreement;

/// Maximum request body size: 10 MB (photos travel base64-encoded).
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// OTP code the built-in static provider accepts when no provider
/// config is given.
const DEMO_OTP: &str = "123456";

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server on the given port, optionally pre-loading
/// agreement fixtures.
///
/// With `--providers <file>`, the engine talks to the configured HTTP
/// signing service; otherwise it runs against the built-in simulated
/// provider (which accepts the code 123456).
pub async fn start_server(
    port: u16,
    agreement_paths: Vec<PathBuf>,
    providers_config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Arc<dyn SignatureProvider> = match &providers_config {
        Some(path) => {
            let config = ProviderConfig::load(path)?;
            eprintln!("Using HTTP signing provider from {}", path.display());
            Arc::new(HttpSignatureProvider::from_config(&config)?)
        }
        None => {
            eprintln!("No provider config; using simulated signing provider");
            Arc::new(StaticSignatureProvider::accepting(DEMO_OTP))
        }
    };

    let storage = Arc::new(MemoryStorage::new());
    let engine = SignatureEngine::new(storage, provider)
        .with_blob_store(Arc::new(MemoryBlobStore::new()));

    // Pre-load agreement fixtures
    for path in &agreement_paths {
        match load_agreement(path) {
            Ok(agreement) => {
                let id = agreement.id.clone();
                match engine.create_agreement(&agreement).await {
                    Ok(()) => eprintln!("Loaded agreement: {} (from {})", id, path.display()),
                    Err(e) => eprintln!("Warning: failed to store {}: {}", path.display(), e),
                }
            }
            Err(e) => {
                eprintln!("Warning: failed to load {}: {}", path.display(), e);
            }
        }
    }

    // Rate limit: from PARAPH_RATE_LIMIT env var, or default
    let rate_limit = std::env::var("PARAPH_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    // API key: from PARAPH_API_KEY env var (None = no auth)
    let api_key = std::env::var("PARAPH_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    if api_key.is_some() {
        eprintln!("API key authentication enabled");
    }
    eprintln!("Rate limit: {} requests per minute per IP", rate_limit);

    let state = Arc::new(AppState {
        engine,
        rate_limiter: RateLimiter::new(rate_limit),
        api_key,
    });

    // CORS: permissive for local dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/agreements", get(handle_list_agreements).post(handle_create_agreement))
        .route("/agreements/{id}", get(handle_get_agreement))
        .route("/agreements/{id}/sessions", post(handle_open_session))
        .route("/sessions/{id}", get(handle_get_session))
        .route("/sessions/{id}/collect", post(handle_collect))
        .route("/sessions/{id}/certificate", post(handle_generate_certificate))
        .route("/sessions/{id}/otp/resend", post(handle_otp_resend))
        .route("/sessions/{id}/otp/verify", post(handle_otp_verify))
        .route("/sessions/{id}/sign", post(handle_sign))
        .route("/sessions/{id}/retry", post(handle_retry))
        .route("/sessions/{id}/close", post(handle_close))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Paraph listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
