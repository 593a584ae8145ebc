//! Identity verification helpers over the biometric and OCR seams.
//!
//! Used by certification missions outside the signing state machine:
//! a face match against the profile photo and text extraction from
//! uploaded identity/ownership documents.

use paraph_core::biometric_passes;

use crate::error::EngineError;
use crate::provider::{BiometricProvider, OcrProvider, ProgressFn};

/// Outcome of a face-match check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BiometricMatch {
    /// Confidence reported by the provider, 0-100.
    pub confidence: f64,
    /// Whether the confidence clears the fixed pass threshold.
    pub passed: bool,
}

/// Score a probe photo against a reference and apply the pass threshold.
pub async fn verify_identity(
    provider: &dyn BiometricProvider,
    reference: &[u8],
    probe: &[u8],
) -> Result<BiometricMatch, EngineError> {
    let confidence = provider.match_faces(reference, probe).await?;
    Ok(BiometricMatch {
        confidence,
        passed: biometric_passes(confidence),
    })
}

/// Extract text from an uploaded document, reporting progress through
/// the callback.
pub async fn extract_document_text(
    provider: &dyn OcrProvider,
    bytes: &[u8],
    on_progress: ProgressFn,
) -> Result<String, EngineError> {
    let text = provider.extract_text(bytes, on_progress).await?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::static_provider::StaticBiometricProvider;

    #[tokio::test]
    async fn confidence_at_threshold_passes() {
        let provider = StaticBiometricProvider::with_confidence(85.0);
        let result = verify_identity(&provider, b"ref", b"probe").await.unwrap();
        assert!(result.passed);
        assert_eq!(result.confidence, 85.0);
    }

    #[tokio::test]
    async fn confidence_below_threshold_fails() {
        let provider = StaticBiometricProvider::with_confidence(84.5);
        let result = verify_identity(&provider, b"ref", b"probe").await.unwrap();
        assert!(!result.passed);
    }
}
