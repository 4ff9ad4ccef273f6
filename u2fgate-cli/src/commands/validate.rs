//! Validate command implementation.

use anyhow::{bail, Result};
use clap::ValueEnum;
use colored::Colorize;
use tracing::{info, warn};
use u2fgate_core::{validate_client_data, validate_registration_data, validate_signature_data};

/// Kind of base64url payload to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadKind {
    /// `clientData` of any response
    ClientData,
    /// `registrationData` of a registration response
    RegistrationData,
    /// `signatureData` of a sign response
    SignatureData,
}

/// Execute the validate command.
pub fn execute(kind: PayloadKind, payload: String, quiet: bool) -> Result<()> {
    let outcome = match kind {
        PayloadKind::ClientData => validate_client_data(&payload),
        PayloadKind::RegistrationData => validate_registration_data(&payload),
        PayloadKind::SignatureData => validate_signature_data(&payload),
    };

    match outcome {
        Ok(()) => {
            info!(?kind, bytes = payload.len(), "Payload is well-formed");
            if !quiet {
                println!("{}", "Valid".green().bold());
            }
            Ok(())
        }
        Err(reason) => {
            warn!(?kind, %reason, "Payload rejected");
            if !quiet {
                println!("{} {}", "Invalid:".red().bold(), reason);
            }
            bail!("Invalid payload: {reason}")
        }
    }
}
