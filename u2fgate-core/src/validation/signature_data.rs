use super::{decode_base64url, FormatError};
use crate::protocol::MIN_SIGNATURE_DATA_LEN;

/// Validate a base64url encoded raw authentication response.
///
/// A plausible payload holds at least the user presence flag, the four byte
/// counter and the first byte of a DER signature.
pub fn validate_signature_data(raw: &str) -> Result<(), FormatError> {
    let decoded = decode_base64url(raw)?;

    if decoded.len() < MIN_SIGNATURE_DATA_LEN {
        return Err(FormatError::TooShort);
    }

    Ok(())
}
