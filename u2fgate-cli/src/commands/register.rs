//! Registration commands: issue a challenge and verify the device's answer.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::{error, info};
use u2fgate_core::{RegisterRequest, RegisterResponse, U2fConfig};

use crate::utils::{banner, build_service, detail, emit_json, read_json, read_value};

/// Execute the register-request command.
pub fn request(config: &U2fConfig, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    let service = build_service(config)?;
    let request = service.request_registration()?;
    info!(app_id = %request.app_id, "Issued registration challenge");

    emit_json(&request, output.as_deref())?;
    if !quiet {
        if let Some(path) = &output {
            detail("Request written to:", path.display());
        }
    }
    Ok(())
}

/// Execute the verify-registration command.
pub fn verify(
    config: &U2fConfig,
    request_path: PathBuf,
    response_path: PathBuf,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let request: RegisterRequest = read_json(&request_path, "request")?;
    if let Err(violations) = request.validate() {
        bail!("Invalid request: {violations}");
    }

    let response = RegisterResponse::from_json(&read_value(&response_path, "response")?)
        .map_err(|violations| anyhow::anyhow!("Invalid response: {violations}"))?;
    if let Err(violations) = response.validate() {
        bail!("Invalid response: {violations}");
    }

    let service = build_service(config)?;
    let result = service.verify_registration(&request, &response)?;

    match result.as_registration() {
        Some(registration) => {
            info!(key_handle = %registration.key_handle, "Registration verified");
            if !quiet {
                banner("REGISTERED", true);
                detail("Key handle:", &registration.key_handle);
                detail("Sign counter:", registration.sign_counter);
            }
            emit_json(registration, output.as_deref())
        }
        None => {
            error!(status = result.status(), "Registration rejected");
            if !quiet {
                banner("REJECTED", false);
                detail("Status:", result.status().red());
                detail("Reason:", &result);
            }
            bail!("Registration verification failed: {result}")
        }
    }
}
