//! `paraph inspect` -- structured summary of an agreement fixture.

use std::path::Path;

use paraph_core::{Agreement, PartyRole};

use crate::OutputFormat;

/// Load an agreement fixture from JSON.
pub(crate) fn load_agreement(file: &Path) -> Result<Agreement, String> {
    let text =
        std::fs::read_to_string(file).map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid agreement {}: {}", file.display(), e))
}

pub(crate) fn cmd_inspect(file: &Path, output: OutputFormat) -> Result<(), String> {
    let agreement = load_agreement(file)?;

    match output {
        OutputFormat::Json => {
            let value = serde_json::to_value(&agreement).map_err(|e| e.to_string())?;
            println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
        }
        OutputFormat::Text => {
            println!("Agreement: {}", agreement.id);
            println!("  kind:       {}", agreement.kind.as_str());
            println!("  property:   {}", agreement.property_id);
            println!("  status:     {}", agreement.status);
            println!("  owner:      {}", agreement.owner_id);
            println!(
                "  {}:     {}",
                agreement.counterparty_role(),
                agreement.counterparty_id
            );
            if let Some(rent) = agreement.monthly_rent {
                println!("  rent:       {}", rent);
            }
            if let Some(deposit) = agreement.deposit {
                println!("  deposit:    {}", deposit);
            }
            if let Some(rate) = agreement.management_fee_rate {
                println!("  fee rate:   {}", rate);
            }
            for role in [PartyRole::Owner, agreement.counterparty_role()] {
                match agreement.signature_for(role) {
                    Some(sig) => println!(
                        "  signed by {}: {} ({})",
                        role,
                        sig.signed_at,
                        sig.method.as_str()
                    ),
                    None => println!("  signed by {}: -", role),
                }
            }
        }
    }
    Ok(())
}
