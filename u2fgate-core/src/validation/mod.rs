//! Binary format validators for device responses.
//!
//! Each validator inspects a base64url payload for structural well-formedness
//! before it reaches cryptographic verification. Malformed input is reported as
//! a [`FormatError`], never as a panic: the validators exist to turn truncated
//! or garbage wire data into an actionable, typed rejection instead of an
//! opaque failure deep inside the verifier.
//!
//! ```
//! use u2fgate_core::validation::{validate_client_data, FormatError};
//!
//! // {"challenge":"test"}
//! assert!(validate_client_data("eyJjaGFsbGVuZ2UiOiJ0ZXN0In0").is_ok());
//! assert_eq!(validate_client_data("%%%"), Err(FormatError::NotBase64));
//! ```

mod client_data;
mod fields;
mod registration_data;
mod signature_data;

pub use client_data::validate_client_data;
pub use fields::{FieldViolation, Violations};
pub use registration_data::validate_registration_data;
pub use signature_data::validate_signature_data;

pub(crate) use fields::{numeric_field, string_field};
pub(crate) use registration_data::{measure_registration_data, RegistrationLayout};

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE as BASE64URL_PADDED;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// Base64url codec used for every U2F payload.
///
/// Only the URL-safe alphabet is accepted. Padding is optional on input;
/// output is never padded.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a payload failed structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Not a string")]
    NotAString,

    #[error("Not base64 decodable")]
    NotBase64,

    #[error("Invalid JSON ({0})")]
    InvalidJson(JsonErrorKind),

    #[error("Challenge not present on client data")]
    MissingChallenge,

    #[error("Not enough bytes")]
    NotEnoughBytes,

    #[error("Too short")]
    TooShort,
}

/// Class of JSON decoding failure, without the offending content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonErrorKind {
    /// Not syntactically valid JSON (includes invalid UTF-8).
    Syntax,
    /// Valid JSON that does not have the expected shape.
    Data,
    /// The input ended before the JSON value was complete.
    Eof,
    Io,
}

impl From<serde_json::error::Category> for JsonErrorKind {
    fn from(category: serde_json::error::Category) -> Self {
        use serde_json::error::Category;

        match category {
            Category::Syntax => Self::Syntax,
            Category::Data => Self::Data,
            Category::Eof => Self::Eof,
            Category::Io => Self::Io,
        }
    }
}

impl std::fmt::Display for JsonErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax error"),
            Self::Data => write!(f, "unexpected data"),
            Self::Eof => write!(f, "unexpected end of input"),
            Self::Io => write!(f, "read error"),
        }
    }
}

/// Strictly decode a base64url string.
///
/// The input must be the exact encoding of the decoded bytes, either unpadded
/// or with its full padding. Non-zero trailing bits are rejected.
pub fn decode_base64url(raw: &str) -> Result<Vec<u8>, FormatError> {
    let decoded = BASE64URL.decode(raw).map_err(|_| FormatError::NotBase64)?;

    let canonical = if raw.ends_with('=') {
        BASE64URL_PADDED.encode(&decoded)
    } else {
        BASE64URL.encode(&decoded)
    };
    if canonical != raw {
        return Err(FormatError::NotBase64);
    }

    Ok(decoded)
}

/// Encode bytes as unpadded base64url.
pub fn encode_base64url(bytes: impl AsRef<[u8]>) -> String {
    BASE64URL.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_padded_and_unpadded() {
        assert_eq!(decode_base64url("Zm8").unwrap(), b"fo");
        assert_eq!(decode_base64url("Zm8=").unwrap(), b"fo");
        assert_eq!(decode_base64url("").unwrap(), b"");
    }

    #[test]
    fn test_decode_rejects_foreign_alphabet_and_bad_length() {
        assert_eq!(decode_base64url("a+b/"), Err(FormatError::NotBase64));
        assert_eq!(decode_base64url("Z"), Err(FormatError::NotBase64));
        assert_eq!(decode_base64url("Zm 8"), Err(FormatError::NotBase64));
    }

    #[test]
    fn test_decode_rejects_non_canonical_encodings() {
        // Trailing bits set: "AQAAABQwRQ" and "Zm8" are the canonical forms.
        assert_eq!(decode_base64url("AQAAABQwRR"), Err(FormatError::NotBase64));
        assert_eq!(decode_base64url("Zm9"), Err(FormatError::NotBase64));
        assert_eq!(decode_base64url("Zm9="), Err(FormatError::NotBase64));
        // Wrong amount of padding.
        assert_eq!(decode_base64url("Zm8=="), Err(FormatError::NotBase64));
        assert_eq!(decode_base64url("Zm9v="), Err(FormatError::NotBase64));
    }

    #[test]
    fn test_encode_is_unpadded_url_safe() {
        assert_eq!(encode_base64url([0xfb, 0xff]), "-_8");
    }

    #[test]
    fn test_reasons_render_as_fixed_messages() {
        assert_eq!(FormatError::NotAString.to_string(), "Not a string");
        assert_eq!(FormatError::NotBase64.to_string(), "Not base64 decodable");
        assert_eq!(
            FormatError::InvalidJson(JsonErrorKind::Syntax).to_string(),
            "Invalid JSON (syntax error)"
        );
        assert_eq!(
            FormatError::MissingChallenge.to_string(),
            "Challenge not present on client data"
        );
        assert_eq!(FormatError::NotEnoughBytes.to_string(), "Not enough bytes");
        assert_eq!(FormatError::TooShort.to_string(), "Too short");
    }
}
