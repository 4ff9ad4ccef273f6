//! Engine configuration module
//!
//! Handles loading configuration from environment variables.

use std::path::PathBuf;

use crate::app_id::AppId;
use crate::error::{Result, U2fError};

/// Configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct U2fConfig {
    /// Identity of this application (`U2F_APP_ID`, required)
    pub app_id: AppId,
    /// Directory of PEM attestation roots (`U2F_ATTESTATION_DIR`, optional).
    /// When unset, attestation certificates are not chain-checked.
    pub attestation_dir: Option<PathBuf>,
}

impl U2fConfig {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            attestation_dir: None,
        }
    }

    pub fn with_attestation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.attestation_dir = Some(dir.into());
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_app_id = lookup("U2F_APP_ID")
            .ok_or_else(|| U2fError::Config("U2F_APP_ID is not set".to_string()))?;

        let app_id = AppId::new(raw_app_id).map_err(|e| {
            U2fError::Config(format!("U2F_APP_ID must be a HTTPS URL ({e})"))
        })?;

        let attestation_dir = lookup("U2F_ATTESTATION_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            app_id,
            attestation_dir,
        })
    }
}
