//! Authentication commands: issue a sign challenge and verify the device's answer.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::{error, info};
use u2fgate_core::{Registration, SignRequest, SignResponse, U2fConfig};

use crate::utils::{banner, build_service, detail, emit_json, read_json, read_value};

/// Execute the sign-request command.
pub fn request(
    config: &U2fConfig,
    registration_path: PathBuf,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let registration: Registration = read_json(&registration_path, "registration")?;

    let service = build_service(config)?;
    let request = service.request_authentication(&registration)?;
    info!(key_handle = %request.key_handle, "Issued authentication challenge");

    emit_json(&request, output.as_deref())?;
    if !quiet {
        if let Some(path) = &output {
            detail("Request written to:", path.display());
        }
    }
    Ok(())
}

/// Execute the verify-authentication command.
pub fn verify(
    config: &U2fConfig,
    registration_path: PathBuf,
    request_path: PathBuf,
    response_path: PathBuf,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let registration: Registration = read_json(&registration_path, "registration")?;

    let request: SignRequest = read_json(&request_path, "request")?;
    if let Err(violations) = request.validate() {
        bail!("Invalid request: {violations}");
    }

    let response = SignResponse::from_json(&read_value(&response_path, "response")?)
        .map_err(|violations| anyhow::anyhow!("Invalid response: {violations}"))?;
    if let Err(violations) = response.validate() {
        bail!("Invalid response: {violations}");
    }

    let service = build_service(config)?;
    let result = service.verify_authentication(&registration, &request, &response)?;

    match result.as_registration() {
        Some(updated) => {
            info!(
                key_handle = %updated.key_handle,
                sign_counter = updated.sign_counter,
                "Authentication verified"
            );
            if !quiet {
                banner("AUTHENTICATED", true);
                detail("Key handle:", &updated.key_handle);
                detail(
                    "Sign counter:",
                    format!("{} -> {}", registration.sign_counter, updated.sign_counter),
                );
            }
            emit_json(updated, output.as_deref())
        }
        None => {
            error!(status = result.status(), "Authentication rejected");
            if !quiet {
                banner("REJECTED", false);
                detail("Status:", result.status().red());
                detail("Reason:", &result);
            }
            bail!("Authentication verification failed: {result}")
        }
    }
}
