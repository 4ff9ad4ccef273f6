//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use u2fgate_core::{AppId, OpensslVerifier, U2fConfig, U2fService};

/// Resolve configuration from flags, falling back to the environment.
///
/// `--app-id` replaces `U2F_APP_ID`; `--attestation-dir` replaces
/// `U2F_ATTESTATION_DIR`.
pub fn load_config(app_id: Option<String>, attestation_dir: Option<PathBuf>) -> Result<U2fConfig> {
    let config = match app_id {
        Some(raw) => {
            let app_id = AppId::new(raw).context("Invalid AppId")?;
            let mut config = U2fConfig::new(app_id);
            config.attestation_dir = std::env::var_os("U2F_ATTESTATION_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from);
            config
        }
        None => U2fConfig::from_env().context("No --app-id given")?,
    };

    Ok(match attestation_dir {
        Some(dir) => config.with_attestation_dir(dir),
        None => config,
    })
}

/// Build the verification service backed by the OpenSSL verifier.
pub fn build_service(config: &U2fConfig) -> Result<U2fService<OpensslVerifier>> {
    let verifier = OpensslVerifier::from_config(config).with_context(|| match &config.attestation_dir {
        Some(dir) => format!("Failed to read attestation roots from {}", dir.display()),
        None => "Failed to initialise verifier".to_string(),
    })?;
    debug!(app_id = %config.app_id, "Verifier ready");
    U2fService::new(verifier).context("Invalid AppId")
}

/// Read a JSON file as a loosely typed value.
pub fn read_value(path: &Path, what: &str) -> Result<Value> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid {what}: {} is not JSON", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read {what}");
    Ok(value)
}

/// Read a JSON file into a typed message.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let value = read_value(path, what)?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid {what}: unexpected shape in {}", path.display()))
}

/// Print `value` as pretty JSON, or write it to `output`.
pub fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(path = %path.display(), "Wrote output");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Boxed status banner on stderr.
pub fn banner(title: &str, success: bool) {
    let line = format!("║{title:^40}║");
    let (top, middle, bottom) = (
        "╔════════════════════════════════════════╗",
        line.as_str(),
        "╚════════════════════════════════════════╝",
    );

    eprintln!();
    if success {
        eprintln!("{}", top.green());
        eprintln!("{}", middle.green().bold());
        eprintln!("{}", bottom.green());
    } else {
        eprintln!("{}", top.red());
        eprintln!("{}", middle.red().bold());
        eprintln!("{}", bottom.red());
    }
    eprintln!();
}

/// Indented `label value` detail line on stderr.
pub fn detail(label: &str, value: impl std::fmt::Display) {
    eprintln!("   {} {}", label.dimmed(), value);
}
