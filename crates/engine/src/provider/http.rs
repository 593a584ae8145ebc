//! HTTP provider implementations.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Base URLs and API keys come from
//! [`ProviderConfig`]; requests carry `Authorization: Bearer` when a
//! key is configured.

use async_trait::async_trait;
use paraph_core::encode_photo;

use super::{
    BiometricProvider, CertificateIssue, EnrollmentSubmission, OcrProvider, ProgressFn,
    ProviderConfig, ProviderError, SignatureProvider, SigningReceipt,
};
use crate::otp::OtpChannel;

/// Extract an HTTP status code from a ureq error string.
///
/// ureq v3 formats status errors as "http status: NNN ..." which this
/// captures.
fn extract_status(msg: &str) -> Option<u16> {
    let idx = msg.find("status: ")?;
    let rest = &msg[idx + "status: ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Classify a ureq error: 4xx means the provider answered and refused,
/// everything else is transport.
fn classify(stage: &str, err: ureq::Error) -> ProviderError {
    let message = err.to_string();
    match extract_status(&message) {
        Some(status) if (400..500).contains(&status) => ProviderError::Rejected {
            stage: stage.to_string(),
            message,
        },
        _ => ProviderError::Transport {
            stage: stage.to_string(),
            message,
        },
    }
}

/// POST a JSON body and parse the JSON response. Blocking; callers
/// wrap in `spawn_blocking`.
fn post_json(
    url: String,
    api_key: Option<String>,
    body: serde_json::Value,
    stage: &str,
) -> Result<serde_json::Value, ProviderError> {
    let agent = ureq::Agent::new_with_defaults();
    let mut request = agent.post(&url);
    if let Some(ref key) = api_key {
        request = request.header("Authorization", &format!("Bearer {}", key));
    }
    let response = request.send_json(&body).map_err(|e| classify(stage, e))?;
    response
        .into_body()
        .read_json()
        .map_err(|e| ProviderError::Transport {
            stage: stage.to_string(),
            message: format!("failed to parse response as JSON: {}", e),
        })
}

/// Join a base URL and a path.
fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

// ──────────────────────────────────────────────
// Signature provider
// ──────────────────────────────────────────────

/// HTTP client for the hosted signing service.
///
/// Endpoints, relative to `base_url`:
/// - `POST certificates` — enrollment in, certificate alias + operation id out
/// - `POST operations/{id}/otp/send`
/// - `POST operations/{id}/otp/verify` — `{"verified": bool}` out
/// - `POST operations/{id}/sign` — signed document URLs out
#[derive(Debug)]
pub struct HttpSignatureProvider {
    base_url: String,
    api_key: Option<String>,
}

impl HttpSignatureProvider {
    /// Build from config; `base_url` is required, `api_key` optional.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(HttpSignatureProvider {
            base_url: config.require("signature", "base_url")?,
            api_key: config.get("signature", "api_key"),
        })
    }

    async fn call(
        &self,
        path: String,
        body: serde_json::Value,
        stage: &'static str,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = join_url(&self.base_url, &path);
        let api_key = self.api_key.clone();
        tokio::task::spawn_blocking(move || post_json(url, api_key, body, stage))
            .await
            .map_err(|e| ProviderError::Transport {
                stage: stage.to_string(),
                message: format!("task join error: {}", e),
            })?
    }
}

#[async_trait]
impl SignatureProvider for HttpSignatureProvider {
    async fn create_certificate(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<CertificateIssue, ProviderError> {
        let body = serde_json::to_value(submission).map_err(|e| ProviderError::Transport {
            stage: "certificate".to_string(),
            message: e.to_string(),
        })?;
        let value = self.call("certificates".to_string(), body, "certificate").await?;
        serde_json::from_value(value).map_err(|e| ProviderError::Transport {
            stage: "certificate".to_string(),
            message: format!("unexpected response shape: {}", e),
        })
    }

    async fn send_otp(
        &self,
        operation_id: &str,
        channel: OtpChannel,
        destination: &str,
    ) -> Result<(), ProviderError> {
        let body = serde_json::json!({
            "channel": channel.as_str(),
            "destination": destination,
        });
        self.call(format!("operations/{}/otp/send", operation_id), body, "otp_send")
            .await?;
        Ok(())
    }

    async fn verify_otp(&self, operation_id: &str, code: &str) -> Result<bool, ProviderError> {
        let body = serde_json::json!({ "code": code });
        let value = self
            .call(
                format!("operations/{}/otp/verify", operation_id),
                body,
                "otp_verify",
            )
            .await?;
        value
            .get("verified")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ProviderError::Transport {
                stage: "otp_verify".to_string(),
                message: "response missing 'verified' field".to_string(),
            })
    }

    async fn sign_documents(
        &self,
        operation_id: &str,
        certificate_alias: &str,
        document_keys: &[String],
    ) -> Result<SigningReceipt, ProviderError> {
        let body = serde_json::json!({
            "certificate_alias": certificate_alias,
            "documents": document_keys,
        });
        let value = self
            .call(format!("operations/{}/sign", operation_id), body, "signing")
            .await?;
        serde_json::from_value(value).map_err(|e| ProviderError::Transport {
            stage: "signing".to_string(),
            message: format!("unexpected response shape: {}", e),
        })
    }

    fn provider_id(&self) -> &str {
        "http"
    }
}

// ──────────────────────────────────────────────
// Biometric provider
// ──────────────────────────────────────────────

/// HTTP client for the hosted face-match service.
///
/// `POST match` with both photos base64-encoded; responds with
/// `{"confidence": <0-100>}`.
pub struct HttpBiometricProvider {
    base_url: String,
    api_key: Option<String>,
}

impl HttpBiometricProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(HttpBiometricProvider {
            base_url: config.require("biometric", "base_url")?,
            api_key: config.get("biometric", "api_key"),
        })
    }
}

#[async_trait]
impl BiometricProvider for HttpBiometricProvider {
    async fn match_faces(&self, reference: &[u8], probe: &[u8]) -> Result<f64, ProviderError> {
        let body = serde_json::json!({
            "reference": encode_photo(reference),
            "probe": encode_photo(probe),
        });
        let url = join_url(&self.base_url, "match");
        let api_key = self.api_key.clone();
        let value =
            tokio::task::spawn_blocking(move || post_json(url, api_key, body, "biometric"))
                .await
                .map_err(|e| ProviderError::Transport {
                    stage: "biometric".to_string(),
                    message: format!("task join error: {}", e),
                })??;

        value
            .get("confidence")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ProviderError::Transport {
                stage: "biometric".to_string(),
                message: "response missing 'confidence' field".to_string(),
            })
    }

    fn provider_id(&self) -> &str {
        "http"
    }
}

// ──────────────────────────────────────────────
// OCR provider
// ──────────────────────────────────────────────

/// HTTP client for the hosted OCR service.
///
/// `POST extract` with the document base64-encoded; responds with
/// `{"text": "..."}`. The hosted service reports no intermediate
/// progress, so the callback fires once on completion.
pub struct HttpOcrProvider {
    base_url: String,
    api_key: Option<String>,
}

impl HttpOcrProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(HttpOcrProvider {
            base_url: config.require("ocr", "base_url")?,
            api_key: config.get("ocr", "api_key"),
        })
    }
}

#[async_trait]
impl OcrProvider for HttpOcrProvider {
    async fn extract_text(
        &self,
        bytes: &[u8],
        on_progress: ProgressFn,
    ) -> Result<String, ProviderError> {
        let body = serde_json::json!({ "document": encode_photo(bytes) });
        let url = join_url(&self.base_url, "extract");
        let api_key = self.api_key.clone();
        let value = tokio::task::spawn_blocking(move || post_json(url, api_key, body, "ocr"))
            .await
            .map_err(|e| ProviderError::Transport {
                stage: "ocr".to_string(),
                message: format!("task join error: {}", e),
            })??;

        let text = value
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Transport {
                stage: "ocr".to_string(),
                message: "response missing 'text' field".to_string(),
            })?
            .to_string();
        on_progress(1.0);
        Ok(text)
    }

    fn provider_id(&self) -> &str {
        "http"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_url_is_not_configured() {
        let config = ProviderConfig::default();
        let err = HttpSignatureProvider::from_config(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[test]
    fn base_url_join_trims_trailing_slash() {
        assert_eq!(
            join_url("https://sign.example/", "certificates"),
            "https://sign.example/certificates"
        );
        assert_eq!(
            join_url("https://sign.example", "operations/op-1/sign"),
            "https://sign.example/operations/op-1/sign"
        );
    }

    #[test]
    fn status_extraction_from_error_text() {
        assert_eq!(extract_status("http status: 404 not found"), Some(404));
        assert_eq!(extract_status("http status: 503"), Some(503));
        assert_eq!(extract_status("connection refused"), None);
    }

    #[test]
    fn config_with_sections_builds_all_providers() {
        let config = ProviderConfig::from_toml_str(
            r#"
            [providers.signature]
            base_url = "https://sign.example"

            [providers.biometric]
            base_url = "https://faces.example"

            [providers.ocr]
            base_url = "https://ocr.example"
            "#,
        )
        .unwrap();
        assert!(HttpSignatureProvider::from_config(&config).is_ok());
        assert!(HttpBiometricProvider::from_config(&config).is_ok());
        assert!(HttpOcrProvider::from_config(&config).is_ok());
    }
}
