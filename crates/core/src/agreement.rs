//! Agreements and their signature lifecycle.
//!
//! An agreement is either a lease contract (owner and tenant) or a
//! management mandate (owner and agency). Both follow the same
//! monotonic status walk: draft, partially signed, active. A status
//! can only advance; regressions are rejected, and a party cannot be
//! recorded as signed twice without explicit re-confirmation.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Parties and methods
// ──────────────────────────────────────────────

/// Role of a signing party on an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Owner,
    Tenant,
    Agency,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Owner => "owner",
            PartyRole::Tenant => "tenant",
            PartyRole::Agency => "agency",
        }
    }

    /// Parse a role from its wire name.
    pub fn parse(s: &str) -> Option<PartyRole> {
        match s {
            "owner" => Some(PartyRole::Owner),
            "tenant" => Some(PartyRole::Tenant),
            "agency" => Some(PartyRole::Agency),
            _ => None,
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a party signs: on paper (scanned and attached out of band) or
/// through the electronic certificate/OTP workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMethod {
    Handwritten,
    Electronic,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::Handwritten => "handwritten",
            SignatureMethod::Electronic => "electronic",
        }
    }
}

// ──────────────────────────────────────────────
// Agreement kind and status
// ──────────────────────────────────────────────

/// Kind of agreement: a lease contract or a management mandate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementKind {
    Contract,
    Mandate,
}

impl AgreementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementKind::Contract => "contract",
            AgreementKind::Mandate => "mandate",
        }
    }

    /// The role of the non-owner signing party for this kind.
    pub fn counterparty_role(&self) -> PartyRole {
        match self {
            AgreementKind::Contract => PartyRole::Tenant,
            AgreementKind::Mandate => PartyRole::Agency,
        }
    }
}

/// Lifecycle status of an agreement. Transitions are monotonic: the
/// rank only increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    PartiallySigned,
    Active,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::PartiallySigned => "partially_signed",
            AgreementStatus::Active => "active",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AgreementStatus::Draft => 0,
            AgreementStatus::PartiallySigned => 1,
            AgreementStatus::Active => 2,
        }
    }

    /// Whether a transition to `to` is legal (same-status is a no-op).
    pub fn can_advance_to(&self, to: AgreementStatus) -> bool {
        to.rank() >= self.rank()
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Signatures
// ──────────────────────────────────────────────

/// A recorded signature for one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySignature {
    /// RFC 3339 timestamp of when the party signed.
    pub signed_at: String,
    pub method: SignatureMethod,
    /// Certificate alias issued by the signing provider (electronic only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_alias: Option<String>,
    /// URL of the signed document artifact, when the provider returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_document_url: Option<String>,
}

// ──────────────────────────────────────────────
// Agreement
// ──────────────────────────────────────────────

/// A lease contract or management mandate between two signing parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,
    pub kind: AgreementKind,
    pub property_id: String,
    pub owner_id: String,
    /// Tenant profile id for contracts, agency profile id for mandates.
    pub counterparty_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<Decimal>,
    /// Management fee rate as a fraction (mandates only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_fee_rate: Option<Decimal>,
    pub status: AgreementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_signature: Option<PartySignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty_signature: Option<PartySignature>,
}

impl Agreement {
    /// Create a draft agreement with no signatures.
    pub fn draft(
        id: impl Into<String>,
        kind: AgreementKind,
        property_id: impl Into<String>,
        owner_id: impl Into<String>,
        counterparty_id: impl Into<String>,
    ) -> Self {
        Agreement {
            id: id.into(),
            kind,
            property_id: property_id.into(),
            owner_id: owner_id.into(),
            counterparty_id: counterparty_id.into(),
            monthly_rent: None,
            deposit: None,
            management_fee_rate: None,
            status: AgreementStatus::Draft,
            owner_signature: None,
            counterparty_signature: None,
        }
    }

    /// The role of the non-owner signing party.
    pub fn counterparty_role(&self) -> PartyRole {
        self.kind.counterparty_role()
    }

    /// Check that `role` is one of this agreement's two signing parties.
    pub fn check_signing_party(&self, role: PartyRole) -> Result<(), AgreementError> {
        if role == PartyRole::Owner || role == self.counterparty_role() {
            Ok(())
        } else {
            Err(AgreementError::UnknownParty {
                agreement_id: self.id.clone(),
                role,
            })
        }
    }

    /// The recorded signature for a party, if any.
    pub fn signature_for(&self, role: PartyRole) -> Option<&PartySignature> {
        if role == PartyRole::Owner {
            self.owner_signature.as_ref()
        } else if role == self.counterparty_role() {
            self.counterparty_signature.as_ref()
        } else {
            None
        }
    }

    /// Whether both parties have signed.
    pub fn fully_signed(&self) -> bool {
        self.owner_signature.is_some() && self.counterparty_signature.is_some()
    }

    /// Record a party's signature and advance the agreement status.
    ///
    /// A second signature for the same party is rejected unless
    /// `reconfirm` is set. On success the status advances to
    /// `PartiallySigned` after the first signature and `Active` once
    /// both parties have signed.
    pub fn record_signature(
        &mut self,
        role: PartyRole,
        signature: PartySignature,
        reconfirm: bool,
    ) -> Result<(), AgreementError> {
        self.check_signing_party(role)?;

        let slot = if role == PartyRole::Owner {
            &mut self.owner_signature
        } else {
            &mut self.counterparty_signature
        };
        if slot.is_some() && !reconfirm {
            return Err(AgreementError::AlreadySigned { role });
        }
        *slot = Some(signature);

        let target = if self.fully_signed() {
            AgreementStatus::Active
        } else {
            AgreementStatus::PartiallySigned
        };
        self.advance_status(target)
    }

    /// Advance the status, enforcing monotonicity. Same-status is a no-op.
    pub fn advance_status(&mut self, to: AgreementStatus) -> Result<(), AgreementError> {
        if !self.status.can_advance_to(to) {
            return Err(AgreementError::StatusRegression {
                agreement_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors raised by agreement lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgreementError {
    /// The role is not one of the agreement's two signing parties.
    UnknownParty {
        agreement_id: String,
        role: PartyRole,
    },
    /// The party has already signed and no re-confirmation was given.
    AlreadySigned { role: PartyRole },
    /// The requested status transition would move backwards.
    StatusRegression {
        agreement_id: String,
        from: AgreementStatus,
        to: AgreementStatus,
    },
}

impl fmt::Display for AgreementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgreementError::UnknownParty { agreement_id, role } => {
                write!(
                    f,
                    "'{}' is not a signing party of agreement '{}'",
                    role, agreement_id
                )
            }
            AgreementError::AlreadySigned { role } => {
                write!(
                    f,
                    "party '{}' has already signed; re-confirmation required",
                    role
                )
            }
            AgreementError::StatusRegression {
                agreement_id,
                from,
                to,
            } => {
                write!(
                    f,
                    "agreement '{}' cannot move from '{}' back to '{}'",
                    agreement_id, from, to
                )
            }
        }
    }
}

impl std::error::Error for AgreementError {}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(method: SignatureMethod) -> PartySignature {
        PartySignature {
            signed_at: "2026-03-01T10:00:00Z".to_string(),
            method,
            certificate_alias: Some("alias-1".to_string()),
            signed_document_url: None,
        }
    }

    fn lease() -> Agreement {
        Agreement::draft("agr-1", AgreementKind::Contract, "prop-1", "own-1", "ten-1")
    }

    #[test]
    fn counterparty_role_follows_kind() {
        assert_eq!(lease().counterparty_role(), PartyRole::Tenant);
        let mandate = Agreement::draft("agr-2", AgreementKind::Mandate, "prop-1", "own-1", "agc-1");
        assert_eq!(mandate.counterparty_role(), PartyRole::Agency);
    }

    #[test]
    fn agency_is_not_a_party_on_a_lease() {
        let mut a = lease();
        let err = a
            .record_signature(PartyRole::Agency, sig(SignatureMethod::Electronic), false)
            .unwrap_err();
        assert!(matches!(err, AgreementError::UnknownParty { .. }));
        assert_eq!(a.status, AgreementStatus::Draft);
    }

    #[test]
    fn first_signature_moves_to_partially_signed() {
        let mut a = lease();
        a.record_signature(PartyRole::Owner, sig(SignatureMethod::Electronic), false)
            .unwrap();
        assert_eq!(a.status, AgreementStatus::PartiallySigned);
        assert!(a.signature_for(PartyRole::Owner).is_some());
        assert!(a.signature_for(PartyRole::Tenant).is_none());
    }

    #[test]
    fn both_signatures_activate() {
        let mut a = lease();
        a.record_signature(PartyRole::Owner, sig(SignatureMethod::Electronic), false)
            .unwrap();
        a.record_signature(PartyRole::Tenant, sig(SignatureMethod::Electronic), false)
            .unwrap();
        assert_eq!(a.status, AgreementStatus::Active);
        assert!(a.fully_signed());
    }

    #[test]
    fn double_sign_requires_reconfirmation() {
        let mut a = lease();
        a.record_signature(PartyRole::Owner, sig(SignatureMethod::Electronic), false)
            .unwrap();
        let err = a
            .record_signature(PartyRole::Owner, sig(SignatureMethod::Electronic), false)
            .unwrap_err();
        assert_eq!(
            err,
            AgreementError::AlreadySigned {
                role: PartyRole::Owner
            }
        );
        // With re-confirmation the overwrite is accepted.
        a.record_signature(PartyRole::Owner, sig(SignatureMethod::Handwritten), true)
            .unwrap();
        assert_eq!(
            a.signature_for(PartyRole::Owner).unwrap().method,
            SignatureMethod::Handwritten
        );
    }

    #[test]
    fn status_never_regresses() {
        let mut a = lease();
        a.advance_status(AgreementStatus::Active).unwrap();
        let err = a.advance_status(AgreementStatus::Draft).unwrap_err();
        assert!(matches!(err, AgreementError::StatusRegression { .. }));
        assert_eq!(a.status, AgreementStatus::Active);
        // Same-status is a no-op, not a regression.
        a.advance_status(AgreementStatus::Active).unwrap();
    }

    #[test]
    fn role_round_trips_through_wire_name() {
        for role in [PartyRole::Owner, PartyRole::Tenant, PartyRole::Agency] {
            assert_eq!(PartyRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(PartyRole::parse("landlord"), None);
    }
}
