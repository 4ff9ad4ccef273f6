#![no_main]

//! Fuzz target for OpensslVerifier registration parsing
//!
//! Feeds arbitrary registration data paired with client data that carries
//! the request's challenge, so every input reaches the layout and DER paths.
//!
//! Run with: cargo +nightly fuzz run fuzz_verify_registration

use libfuzzer_sys::fuzz_target;
use u2fgate_core::validation::encode_base64url;
use u2fgate_core::verifier::{U2fVerifier, VerifierRegisterResponse};
use u2fgate_core::{AppId, OpensslVerifier};

fuzz_target!(|data: &[u8]| {
    let Ok(app_id) = AppId::new("https://fuzz.example.invalid") else {
        return;
    };
    let verifier = OpensslVerifier::new(app_id);
    let Ok(request) = verifier.registration_challenge() else {
        return;
    };

    let response = VerifierRegisterResponse {
        registration_data: encode_base64url(data),
        client_data: encode_base64url(format!(r#"{{"challenge":"{}"}}"#, request.challenge)),
    };

    // Any outcome is fine, as long as it is not a panic
    let _ = verifier.verify_registration(&request, &response);
});
