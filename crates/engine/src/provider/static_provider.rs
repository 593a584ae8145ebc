//! Scripted in-memory providers for tests and the offline runner.
//!
//! `StaticSignatureProvider` is configured with the code it accepts
//! and optional failure switches per stage, and counts every call so
//! tests can assert that malformed input never reached the provider.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    BiometricProvider, CertificateIssue, EnrollmentSubmission, OcrProvider, ProgressFn,
    ProviderError, SignatureProvider, SignedDocument, SigningReceipt,
};
use crate::otp::OtpChannel;

/// Scripted signing service.
pub struct StaticSignatureProvider {
    accepted_code: String,
    fail_certificate: bool,
    fail_signing: bool,
    certificate_calls: AtomicUsize,
    otp_send_calls: AtomicUsize,
    otp_verify_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl StaticSignatureProvider {
    /// A provider that accepts exactly `accepted_code`.
    pub fn accepting(accepted_code: impl Into<String>) -> Self {
        StaticSignatureProvider {
            accepted_code: accepted_code.into(),
            fail_certificate: false,
            fail_signing: false,
            certificate_calls: AtomicUsize::new(0),
            otp_send_calls: AtomicUsize::new(0),
            otp_verify_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    /// Make certificate generation fail with a rejection.
    pub fn failing_certificate(mut self) -> Self {
        self.fail_certificate = true;
        self
    }

    /// Make the signing call fail with a rejection.
    pub fn failing_signing(mut self) -> Self {
        self.fail_signing = true;
        self
    }

    pub fn certificate_calls(&self) -> usize {
        self.certificate_calls.load(Ordering::SeqCst)
    }

    pub fn otp_send_calls(&self) -> usize {
        self.otp_send_calls.load(Ordering::SeqCst)
    }

    pub fn otp_verify_calls(&self) -> usize {
        self.otp_verify_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignatureProvider for StaticSignatureProvider {
    async fn create_certificate(
        &self,
        submission: &EnrollmentSubmission,
    ) -> Result<CertificateIssue, ProviderError> {
        let n = self.certificate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_certificate {
            return Err(ProviderError::Rejected {
                stage: "certificate".to_string(),
                message: "enrollment refused".to_string(),
            });
        }
        // Alias derived from the photo digest, as the real service binds
        // the certificate to the submitted photo.
        let short = &submission.photo_digest[..submission.photo_digest.len().min(8)];
        Ok(CertificateIssue {
            certificate_alias: format!("cert-{}", short),
            operation_id: format!("op-{:04}", n),
        })
    }

    async fn send_otp(
        &self,
        _operation_id: &str,
        _channel: OtpChannel,
        _destination: &str,
    ) -> Result<(), ProviderError> {
        self.otp_send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_otp(&self, _operation_id: &str, code: &str) -> Result<bool, ProviderError> {
        self.otp_verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(code == self.accepted_code)
    }

    async fn sign_documents(
        &self,
        operation_id: &str,
        _certificate_alias: &str,
        document_keys: &[String],
    ) -> Result<SigningReceipt, ProviderError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_signing {
            return Err(ProviderError::Rejected {
                stage: "signing".to_string(),
                message: "operation expired".to_string(),
            });
        }
        Ok(SigningReceipt {
            documents: document_keys
                .iter()
                .map(|key| SignedDocument {
                    document_key: key.clone(),
                    url: format!("https://signed.example/{}/{}", operation_id, key),
                })
                .collect(),
            verification_code: format!("VC-{}", operation_id),
        })
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

/// Face matcher returning a fixed confidence.
pub struct StaticBiometricProvider {
    confidence: f64,
}

impl StaticBiometricProvider {
    pub fn with_confidence(confidence: f64) -> Self {
        StaticBiometricProvider { confidence }
    }
}

#[async_trait]
impl BiometricProvider for StaticBiometricProvider {
    async fn match_faces(&self, _reference: &[u8], _probe: &[u8]) -> Result<f64, ProviderError> {
        Ok(self.confidence)
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

/// OCR returning fixed text, reporting progress at the midpoint and
/// completion.
pub struct StaticOcrProvider {
    text: String,
}

impl StaticOcrProvider {
    pub fn with_text(text: impl Into<String>) -> Self {
        StaticOcrProvider { text: text.into() }
    }
}

#[async_trait]
impl OcrProvider for StaticOcrProvider {
    async fn extract_text(
        &self,
        _bytes: &[u8],
        on_progress: ProgressFn,
    ) -> Result<String, ProviderError> {
        on_progress(0.5);
        on_progress(1.0);
        Ok(self.text.clone())
    }

    fn provider_id(&self) -> &str {
        "static"
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> EnrollmentSubmission {
        EnrollmentSubmission {
            gender: "female".to_string(),
            phone: "33612345678".to_string(),
            photo: "AAECAw==".to_string(),
            photo_digest: "deadbeefcafe".to_string(),
        }
    }

    #[tokio::test]
    async fn certificate_alias_bound_to_digest() {
        let provider = StaticSignatureProvider::accepting("123456");
        let issue = provider.create_certificate(&submission()).await.unwrap();
        assert_eq!(issue.certificate_alias, "cert-deadbeef");
        assert_eq!(issue.operation_id, "op-0001");
        assert_eq!(provider.certificate_calls(), 1);
    }

    #[tokio::test]
    async fn verify_compares_against_accepted_code() {
        let provider = StaticSignatureProvider::accepting("123456");
        assert!(provider.verify_otp("op-1", "123456").await.unwrap());
        assert!(!provider.verify_otp("op-1", "654321").await.unwrap());
        assert_eq!(provider.otp_verify_calls(), 2);
    }

    #[tokio::test]
    async fn signing_returns_one_url_per_document() {
        let provider = StaticSignatureProvider::accepting("123456");
        let keys = vec!["lease.pdf".to_string(), "inventory.pdf".to_string()];
        let receipt = provider.sign_documents("op-7", "cert-x", &keys).await.unwrap();
        assert_eq!(receipt.documents.len(), 2);
        assert_eq!(receipt.documents[0].url, "https://signed.example/op-7/lease.pdf");
    }

    #[tokio::test]
    async fn ocr_reports_progress_then_text() {
        use std::sync::{Arc, Mutex};
        let provider = StaticOcrProvider::with_text("BAIL DE LOCATION");
        let seen: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let text = provider
            .extract_text(
                b"%PDF-1.4",
                Box::new(move |p| sink.lock().unwrap().push(p)),
            )
            .await
            .unwrap();
        assert_eq!(text, "BAIL DE LOCATION");
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }
}
