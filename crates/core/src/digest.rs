//! Photo content digests and transport encoding.
//!
//! The digest is computed over the raw bytes BEFORE any transport
//! encoding, so the same photo always yields the same digest no matter
//! how it later travels. The certificate issued by the signing
//! provider is bound to this digest.

use base64::Engine as _;
use sha2::{Digest, Sha256};

/// SHA-256 of the raw photo bytes, lowercase hex.
pub fn photo_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("{:x}", hash)
}

/// Base64 (standard alphabet) transport encoding, applied after digesting.
pub fn encode_photo(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a transport-encoded photo back to raw bytes.
pub fn decode_photo(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(encoded)
}
