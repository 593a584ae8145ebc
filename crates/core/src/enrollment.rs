//! Enrollment data collected before certificate generation.
//!
//! The signing provider requires gender, a reachable phone number, a
//! portrait photo, and explicit consent before it will issue a signing
//! certificate. Validation happens locally; nothing is sent to the
//! provider until the full set passes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Civil gender as required by the signing provider's enrollment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Data gathered during the collection step of a signature session.
#[derive(Debug, Clone)]
pub struct EnrollmentData {
    pub gender: Gender,
    pub phone: String,
    /// Raw photo bytes, before any transport encoding.
    pub photo: Vec<u8>,
    pub consent: bool,
}

impl EnrollmentData {
    /// Validate the full enrollment set. The phone is checked in
    /// normalized form; the raw field is left untouched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_phone(&self.phone)?;
        if self.photo.is_empty() {
            return Err(ValidationError::EmptyPhoto);
        }
        if !self.consent {
            return Err(ValidationError::ConsentRequired);
        }
        Ok(())
    }
}

/// Normalize a phone number: strip an optional leading `+`, spaces,
/// dots, and dashes, then require 10 to 15 digits.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = without_prefix
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    if digits.len() < 10 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone {
            got: raw.to_string(),
        });
    }
    Ok(digits)
}

/// Errors raised by enrollment validation. Each variant names the
/// field so callers can surface an inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The phone number is not 10-15 digits after normalization.
    InvalidPhone { got: String },
    /// The photo payload is empty.
    EmptyPhoto,
    /// Consent was not given.
    ConsentRequired,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidPhone { got } => {
                write!(f, "invalid phone number '{}': expected 10-15 digits", got)
            }
            ValidationError::EmptyPhoto => write!(f, "photo is required"),
            ValidationError::ConsentRequired => write!(f, "consent is required"),
        }
    }
}

impl std::error::Error for ValidationError {}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
