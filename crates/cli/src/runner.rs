//! `paraph run` -- drive a full electronic signature session offline.
//!
//! Loads an agreement fixture, runs the whole flow against the
//! in-memory storage and the simulated signing provider, and prints
//! the outcome. The simulated provider accepts the code 123456, so a
//! different `--otp` demonstrates the rejection path.

use std::path::Path;
use std::sync::Arc;

use paraph_core::{EnrollmentData, Gender, PartyRole, SignatureMethod};
use paraph_engine::provider::static_provider::StaticSignatureProvider;
use paraph_engine::{OtpChannel, SignatureEngine};
use paraph_storage::{MemoryBlobStore, MemoryStorage, ParaphStorage};

use crate::inspect::load_agreement;
use crate::OutputFormat;

/// Code the simulated provider accepts.
const ACCEPTED_OTP: &str = "123456";

/// Placeholder photo when `--photo` is omitted.
const PLACEHOLDER_PHOTO: &[u8] = b"paraph-demo-portrait";

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_run(
    agreement_file: &Path,
    party: &str,
    otp: &str,
    phone: &str,
    photo: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), String> {
    let agreement = load_agreement(agreement_file)?;
    let party = PartyRole::parse(party)
        .ok_or_else(|| format!("unknown party role '{}' (owner, tenant, agency)", party))?;

    let photo_bytes = match photo {
        Some(path) => {
            std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?
        }
        None => PLACEHOLDER_PHOTO.to_vec(),
    };

    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StaticSignatureProvider::accepting(ACCEPTED_OTP));
    let engine = SignatureEngine::new(storage.clone(), provider)
        .with_blob_store(Arc::new(MemoryBlobStore::new()));

    let agreement_id = agreement.id.clone();
    engine
        .create_agreement(&agreement)
        .await
        .map_err(|e| e.to_string())?;

    let session = engine
        .open_session(&agreement_id, party, SignatureMethod::Electronic)
        .await
        .map_err(|e| e.to_string())?;
    step(quiet, output, "session opened");

    engine
        .collect(
            &session.id,
            EnrollmentData {
                gender: Gender::Female,
                phone: phone.to_string(),
                photo: photo_bytes,
                consent: true,
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    step(quiet, output, "enrollment collected");

    engine
        .generate_certificate(&session.id, OtpChannel::Sms, None)
        .await
        .map_err(|e| e.to_string())?;
    step(quiet, output, "certificate issued, code dispatched");

    engine
        .verify_otp(&session.id, otp)
        .await
        .map_err(|e| e.to_string())?;
    step(quiet, output, "code verified");

    let view = engine
        .sign(&session.id, &["agreement.pdf".to_string()], false)
        .await
        .map_err(|e| e.to_string())?;
    step(quiet, output, "documents signed");

    let record = storage
        .get_agreement(&agreement_id)
        .await
        .map_err(|e| e.to_string())?;

    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "session": view,
                "agreement": {
                    "id": record.agreement_id,
                    "status": record.status,
                    "owner_signed_at": record.owner_signed_at,
                    "counterparty_signed_at": record.counterparty_signed_at,
                },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
            );
        }
        OutputFormat::Text => {
            println!("Session {}: {}", view.id, view.step);
            for url in &view.signed_document_urls {
                println!("  signed: {}", url);
            }
            println!("Agreement {}: {}", record.agreement_id, record.status);
        }
    }
    Ok(())
}

fn step(quiet: bool, output: OutputFormat, message: &str) {
    if !quiet && output == OutputFormat::Text {
        eprintln!("... {}", message);
    }
}
