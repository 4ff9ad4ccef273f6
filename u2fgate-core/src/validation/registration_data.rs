use std::ops::{Range, RangeFrom};

use super::{decode_base64url, FormatError};
use crate::protocol::PUBKEY_LEN;

/// Offset of the public key, after the reserved marker byte.
const RESERVED_BYTE_LEN: usize = 1;

/// DER tag byte, long-form length byte, then a big-endian 16 bit length.
const CERTIFICATE_HEADER_LEN: usize = 4;

/// Byte spans of a raw registration message.
///
/// Only the lengths are checked; the contents of each span are uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegistrationLayout {
    pub public_key: Range<usize>,
    pub key_handle: Range<usize>,
    pub certificate: Range<usize>,
    pub signature: RangeFrom<usize>,
}

/// Compute the layout of a decoded registration message.
///
/// The certificate length is read from the two bytes following the DER tag and
/// length-form bytes, without checking that the header actually describes a
/// two byte long-form length.
pub(crate) fn measure_registration_data(bytes: &[u8]) -> Result<RegistrationLayout, FormatError> {
    let mut offset = RESERVED_BYTE_LEN;

    let public_key = offset..offset + PUBKEY_LEN;
    offset += PUBKEY_LEN;

    let key_handle_len = usize::from(*bytes.get(offset).ok_or(FormatError::NotEnoughBytes)?);
    offset += 1;

    let key_handle = offset..offset + key_handle_len;
    offset += key_handle_len;

    let (high, low) = match (bytes.get(offset + 2), bytes.get(offset + 3)) {
        (Some(high), Some(low)) => (*high, *low),
        _ => return Err(FormatError::NotEnoughBytes),
    };
    let certificate_len = CERTIFICATE_HEADER_LEN + usize::from(u16::from_be_bytes([high, low]));
    let certificate = offset..offset + certificate_len;

    // Everything after the certificate is the signature, which may not be empty.
    if bytes.len() <= certificate.end {
        return Err(FormatError::NotEnoughBytes);
    }

    Ok(RegistrationLayout {
        public_key,
        key_handle,
        signature: certificate.end..,
        certificate,
    })
}

/// Validate a base64url encoded raw registration message.
///
/// Rejects payloads shorter than
/// `1 + PUBKEY_LEN + 1 + keyHandleLen + 4 + certLen + 1` bytes.
pub fn validate_registration_data(raw: &str) -> Result<(), FormatError> {
    let bytes = decode_base64url(raw)?;
    measure_registration_data(&bytes).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::encode_base64url;

    /// Registration data produced by a real device.
    const REAL_REGISTRATION_DATA: &str = "BQQsJupwZXlYgDwNvctsqaVG4e5-zyUYSI8eqwJaK9cURtyB1jtLcFunvRI82GJ6JujEFhUGdvKuO7iHINX9SBpaQGVWCUz7hr2jcAZENw9LO5pJCx98ilsLSgF_I99_qq36TeXjq4tt7N29V7bnsPyWdmG6kY7rADYLqGyaHMvcYzswggIaMIIBBKADAgECAgQuQunNMAsGCSqGSIb3DQEBCzAuMSwwKgYDVQQDEyNZdWJpY28gVTJGIFJvb3QgQ0EgU2VyaWFsIDQ1NzIwMDYzMTAgFw0xNDA4MDEwMDAwMDBaGA8yMDUwMDkwNDAwMDAwMFowKTEnMCUGA1UEAwweWXViaWNvIFUyRiBFRSBTZXJpYWwgNzc2MTM3MTY1MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAESbo91Jw7oVvVuHWN79tJLiqMPj9wAsRNXdSDP5_AzkCdkTdK8FF68gBqujnC-3MbNnGgzlzp2sGEtWGVuXDNTKMSMBAwDgYKKwYBBAGCxAoBAwQAMAsGCSqGSIb3DQEBCwOCAQEDdg42lWXviOkEKATYj_pfvVuZk6MSRo-xdJYSlqU5zGWwYv0AfZmKqqlMymsD-atC0hC2VSV-2LfV-0cUbMQVkXST1f0RqwIglE6eu6ai_DhKcEbYJb3WECKgnAu4BSPnn1lkOdsL-U9VivlM4VHbel1I7qN_KJS_ZhcdDhQC9U5EZhRdShpwAd1lCpIMt-RtlvFFIh5xwlcO_8G7ekx0rm9fCbZcOoQDUpTi6UjlYyFQpRzrfAF1C1kuHxEg-2tpXdJqnmVXtxP1SN-u21LfFf2JUmkkfTu0rBCi2Qi2BiBcShTUGyni33XEcm0bdJ45d1P5csCf4N3tmUWm1Fj-2DBFAiEAmiCkrBAXbDiEqS15ZEThFF9R7YgCdb-ZlorxkIQ_ugkCID7KeptW-cPJrk94ct8Mm18KP7BHha6kI2fMd45VujZI";

    /// Build a message with the given key handle, certificate body and signature lengths.
    fn synthetic(key_handle_len: u8, certificate_body_len: u16, signature_len: usize) -> Vec<u8> {
        let mut bytes = vec![0x05];
        bytes.push(0x04);
        bytes.extend(std::iter::repeat(0xaa).take(PUBKEY_LEN - 1));
        bytes.push(key_handle_len);
        bytes.extend(std::iter::repeat(0xbb).take(usize::from(key_handle_len)));
        bytes.extend([0x30, 0x82]);
        bytes.extend(certificate_body_len.to_be_bytes());
        bytes.extend(std::iter::repeat(0xcc).take(usize::from(certificate_body_len)));
        bytes.extend(std::iter::repeat(0xdd).take(signature_len));
        bytes
    }

    #[test]
    fn test_accepts_real_registration_data() {
        assert_eq!(validate_registration_data(REAL_REGISTRATION_DATA), Ok(()));
    }

    #[test]
    fn test_measures_real_registration_data() {
        let bytes = crate::validation::decode_base64url(REAL_REGISTRATION_DATA).unwrap();
        let layout = measure_registration_data(&bytes).unwrap();

        assert_eq!(bytes.len(), 744);
        assert_eq!(layout.public_key, 1..66);
        assert_eq!(layout.key_handle, 67..131);
        assert_eq!(layout.certificate.end, 673);
        assert_eq!(bytes[layout.certificate.start], 0x30);
        assert_eq!(bytes[layout.signature].len(), 71);
    }

    #[test]
    fn test_rejects_garbage_and_short_payloads() {
        let garbage = "Garbage38338".repeat(12);
        for raw in ["", "Garbage38338", garbage.as_str()] {
            assert_eq!(
                validate_registration_data(raw),
                Err(FormatError::NotEnoughBytes),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_rejects_undecodable_payload() {
        assert_eq!(
            validate_registration_data("BQQ#not-base64"),
            Err(FormatError::NotBase64)
        );
    }

    #[test]
    fn test_minimum_length_boundary() {
        // 1 + 65 + 1 + 16 + 4 + 100 = 187 bytes before the signature.
        let exact = synthetic(16, 100, 0);
        assert_eq!(exact.len(), 187);
        assert_eq!(
            validate_registration_data(&encode_base64url(&exact)),
            Err(FormatError::NotEnoughBytes)
        );

        let with_signature = synthetic(16, 100, 1);
        assert_eq!(
            validate_registration_data(&encode_base64url(&with_signature)),
            Ok(())
        );
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let full = synthetic(32, 250, 70);
        for len in 0..full.len() - 70 {
            assert_eq!(
                validate_registration_data(&encode_base64url(&full[..len])),
                Err(FormatError::NotEnoughBytes),
                "truncated to {len} bytes"
            );
        }
    }

    #[test]
    fn test_maximum_lengths_do_not_overflow() {
        let bytes = synthetic(u8::MAX, u16::MAX, 1);
        assert_eq!(validate_registration_data(&encode_base64url(&bytes)), Ok(()));
    }
}
