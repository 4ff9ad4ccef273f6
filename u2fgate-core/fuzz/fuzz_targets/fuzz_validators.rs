#![no_main]

//! Fuzz target for the binary format validators
//!
//! Every validator must report malformed input as a `FormatError`,
//! never by panicking or reading out of bounds.
//!
//! Run with: cargo +nightly fuzz run fuzz_validators

use libfuzzer_sys::fuzz_target;
use u2fgate_core::validation::encode_base64url;
use u2fgate_core::{validate_client_data, validate_registration_data, validate_signature_data};

fuzz_target!(|data: &[u8]| {
    // Raw input exercises the base64url decoder
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = validate_client_data(raw);
        let _ = validate_registration_data(raw);
        let _ = validate_signature_data(raw);
    }

    // Encoded input exercises the layout checks
    let encoded = encode_base64url(data);
    let _ = validate_client_data(&encoded);
    let _ = validate_registration_data(&encoded);
    let _ = validate_signature_data(&encoded);
});
