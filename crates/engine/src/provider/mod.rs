//! Provider abstraction for the external services behind the workflow.
//!
//! Three seams, each an opaque remote collaborator:
//! - [`SignatureProvider`] — certificate issuance, OTP dispatch and
//!   verification, document signing
//! - [`BiometricProvider`] — face-match confidence scoring
//! - [`OcrProvider`] — text extraction with a progress callback
//!
//! HTTP implementations live in [`http`]; scripted in-memory fakes for
//! tests and the offline runner live in [`static_provider`]. Base URLs
//! and credentials come from [`ProviderConfig`] (toml file plus env
//! fallback), never from the call sites.

pub mod http;
pub mod static_provider;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::otp::OtpChannel;

// ──────────────────────────────────────────────
// ProviderError
// ──────────────────────────────────────────────

/// Errors from external provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered and refused (bad enrollment, expired
    /// operation, unknown certificate).
    Rejected { stage: String, message: String },
    /// The call itself failed (network, timeout, malformed response).
    Transport { stage: String, message: String },
    /// Required configuration is missing (base URL, API key).
    NotConfigured { provider_id: String, key: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Rejected { stage, message } => {
                write!(f, "provider rejected {}: {}", stage, message)
            }
            ProviderError::Transport { stage, message } => {
                write!(f, "provider call failed during {}: {}", stage, message)
            }
            ProviderError::NotConfigured { provider_id, key } => {
                write!(
                    f,
                    "provider '{}' missing required config '{}'",
                    provider_id, key
                )
            }
        }
    }
}

impl std::error::Error for ProviderError {}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

/// Enrollment payload submitted for certificate generation.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSubmission {
    pub gender: String,
    pub phone: String,
    /// Photo in transport encoding (base64).
    pub photo: String,
    /// SHA-256 digest of the raw photo bytes; the certificate is bound
    /// to it.
    pub photo_digest: String,
}

/// Result of certificate generation.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateIssue {
    pub certificate_alias: String,
    /// Identifier of the signing operation; later calls reference it.
    pub operation_id: String,
}

/// One signed document artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDocument {
    pub document_key: String,
    pub url: String,
}

/// Result of a completed signing call.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningReceipt {
    pub documents: Vec<SignedDocument>,
    /// Human-checkable verification code printed on the artifact.
    pub verification_code: String,
}

// ──────────────────────────────────────────────
// Traits
// ──────────────────────────────────────────────

/// The electronic-signature service: certificates, OTP, signing.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Submit enrollment data; returns the certificate alias and the
    /// operation id for the rest of the flow.
    async fn create_certificate(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<CertificateIssue, ProviderError>;

    /// Dispatch a one-time code over the given channel. The provider
    /// generates and stores the code; the engine never sees it.
    async fn send_otp(
        &self,
        operation_id: &str,
        channel: OtpChannel,
        destination: &str,
    ) -> Result<(), ProviderError>;

    /// Verify a submitted code. `Ok(false)` means a well-formed but
    /// wrong code; errors are transport/rejection failures.
    async fn verify_otp(&self, operation_id: &str, code: &str) -> Result<bool, ProviderError>;

    /// Sign the target documents under the verified operation.
    async fn sign_documents(
        &self,
        operation_id: &str,
        certificate_alias: &str,
        document_keys: &[String],
    ) -> Result<SigningReceipt, ProviderError>;

    /// Returns this provider's identifier (e.g. "http", "static").
    fn provider_id(&self) -> &str;
}

/// Face-match scoring. Returns a confidence percentage (0-100); the
/// engine applies the pass threshold.
#[async_trait]
pub trait BiometricProvider: Send + Sync {
    async fn match_faces(&self, reference: &[u8], probe: &[u8]) -> Result<f64, ProviderError>;

    fn provider_id(&self) -> &str;
}

/// Progress callback for OCR extraction, called with a ratio in 0.0..=1.0.
pub type ProgressFn = Box<dyn Fn(f32) + Send + Sync>;

/// Text extraction from an uploaded document.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract_text(
        &self,
        bytes: &[u8],
        on_progress: ProgressFn,
    ) -> Result<String, ProviderError>;

    fn provider_id(&self) -> &str;
}

// ──────────────────────────────────────────────
// ProviderConfig
// ──────────────────────────────────────────────

/// Configuration for providers — base URLs, API keys, and other values
/// that never appear in call sites.
///
/// Lookup order for `get(provider_id, key)`:
/// 1. `[providers.<id>]` section of the config file
/// 2. `[global]` section
/// 3. `PARAPH_PROVIDER_<ID>_<KEY>` environment variable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub global: HashMap<String, String>,
    #[serde(default)]
    pub providers: HashMap<String, HashMap<String, String>>,
}

impl ProviderConfig {
    /// Parse from toml text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from a toml file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&text).map_err(|e| format!("invalid config {}: {}", path.display(), e))
    }

    /// Look up a config value for a provider, falling back to global,
    /// then to the environment.
    pub fn get(&self, provider_id: &str, key: &str) -> Option<String> {
        self.providers
            .get(provider_id)
            .and_then(|m| m.get(key))
            .or_else(|| self.global.get(key))
            .cloned()
            .or_else(|| {
                let env_key = format!(
                    "PARAPH_PROVIDER_{}_{}",
                    provider_id.to_uppercase(),
                    key.to_uppercase()
                );
                std::env::var(&env_key).ok()
            })
    }

    /// Like [`get`](Self::get) but a missing value is an error naming
    /// the provider and key.
    pub fn require(&self, provider_id: &str, key: &str) -> Result<String, ProviderError> {
        self.get(provider_id, key)
            .ok_or_else(|| ProviderError::NotConfigured {
                provider_id: provider_id.to_string(),
                key: key.to_string(),
            })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
