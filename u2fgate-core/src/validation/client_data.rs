use serde_json::Value;

use super::{decode_base64url, FormatError};

/// Validate a base64url encoded client data object.
///
/// The decoded bytes must be a JSON object carrying a non-null `challenge`.
pub fn validate_client_data(raw: &str) -> Result<(), FormatError> {
    let decoded = decode_base64url(raw)?;

    let client_data: Value = serde_json::from_slice(&decoded)
        .map_err(|e| FormatError::InvalidJson(e.classify().into()))?;

    match client_data.get("challenge") {
        Some(challenge) if !challenge.is_null() => Ok(()),
        _ => Err(FormatError::MissingChallenge),
    }
}
