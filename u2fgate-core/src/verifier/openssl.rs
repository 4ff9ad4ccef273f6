//! Reference verifier for the U2F raw message format, backed by OpenSSL.
//!
//! Registration messages are signed by the device's attestation key over
//! `0x00 || SHA256(appId) || SHA256(clientData) || keyHandle || publicKey`.
//! Authentication messages are signed by the registered key over
//! `SHA256(appId) || flags || counter || SHA256(clientData)`.

use std::fs;
use std::path::Path;

use ::openssl::bn::BigNumContext;
use ::openssl::ec::{EcGroup, EcKey, EcPoint};
use ::openssl::hash::MessageDigest;
use ::openssl::nid::Nid;
use ::openssl::pkey::{PKey, Public};
use ::openssl::rand::rand_bytes;
use ::openssl::sha::sha256;
use ::openssl::sign::Verifier;
use ::openssl::stack::Stack;
use ::openssl::x509::store::{X509Store, X509StoreBuilder};
use ::openssl::x509::{X509StoreContext, X509VerifyResult, X509};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    FailureKind, U2fVerifier, VerifierFailure, VerifierRegisterResponse, VerifierRegistration,
    VerifierRequest, VerifierSignResponse,
};
use crate::app_id::AppId;
use crate::config::U2fConfig;
use crate::error::{Result, U2fError};
use crate::protocol::{CHALLENGE_LEN, PUBKEY_LEN, U2F_VERSION};
use crate::validation::{decode_base64url, encode_base64url, measure_registration_data};

/// Leading byte of an uncompressed EC point.
const UNCOMPRESSED_POINT: u8 = 0x04;

/// Flags byte plus big-endian counter at the start of signature data.
const SIGNED_PREFIX_LEN: usize = 5;

type Verdict<T> = std::result::Result<T, VerifierFailure>;

fn fail<T>(kind: FailureKind, message: &str) -> Verdict<T> {
    debug!(failure = %kind, "{message}");
    Err(VerifierFailure::new(kind, message))
}

/// OpenSSL backed verifier.
///
/// When attestation roots are configured, every attestation certificate must
/// chain to one of them. Without roots any well-formed certificate is accepted.
pub struct OpensslVerifier {
    app_id: AppId,
    attestation_roots: Option<X509Store>,
}

impl OpensslVerifier {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            attestation_roots: None,
        }
    }

    /// Build a verifier from configuration, loading attestation roots if a
    /// directory is configured.
    pub fn from_config(config: &U2fConfig) -> Result<Self> {
        let verifier = Self::new(config.app_id.clone());
        match &config.attestation_dir {
            Some(dir) => verifier.with_attestation_dir(dir),
            None => Ok(verifier),
        }
    }

    /// Trust the given attestation root certificates.
    pub fn with_attestation_roots(mut self, roots: impl IntoIterator<Item = X509>) -> Result<Self> {
        let mut builder = X509StoreBuilder::new()?;
        let mut count = 0usize;
        for root in roots {
            builder.add_cert(root)?;
            count += 1;
        }
        debug!(count, "Loaded attestation roots");
        self.attestation_roots = Some(builder.build());
        Ok(self)
    }

    /// Trust every certificate found in the `.pem` files of `dir`.
    pub fn with_attestation_dir(self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut roots = Vec::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_pem = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pem"));
            if !path.is_file() || !is_pem {
                continue;
            }

            let pem = fs::read(&path)?;
            let certs = X509::stack_from_pem(&pem)?;
            debug!(path = %path.display(), certs = certs.len(), "Read attestation file");
            roots.extend(certs);
        }

        if roots.is_empty() {
            return Err(U2fError::Config(format!(
                "No attestation certificates found in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), count = roots.len(), "Attestation roots configured");
        self.with_attestation_roots(roots)
    }

    fn issue(&self, key_handle: Option<String>) -> Result<VerifierRequest> {
        let mut challenge = [0u8; CHALLENGE_LEN];
        rand_bytes(&mut challenge).map_err(|e| U2fError::ChallengeGeneration(e.to_string()))?;

        Ok(VerifierRequest {
            version: U2F_VERSION.to_string(),
            challenge: encode_base64url(challenge),
            app_id: self.app_id.to_string(),
            key_handle,
        })
    }

    fn is_trusted(&self, certificate: &X509) -> bool {
        let Some(store) = &self.attestation_roots else {
            return true;
        };

        let outcome = Stack::<X509>::new().and_then(|chain| {
            let mut context = X509StoreContext::new()?;
            context.init(store, certificate, &chain, |ctx| {
                let verified = ctx.verify_cert()?;
                if !verified {
                    debug!(
                        error = %ctx.error(),
                        depth = ctx.error_depth(),
                        "Attestation chain rejected"
                    );
                }
                Ok(verified && ctx.error() == X509VerifyResult::OK)
            })
        });

        outcome.unwrap_or(false)
    }
}

/// Decoded client data, if it is a JSON object carrying `expected` as its challenge.
fn client_data_for(raw: &str, expected: &str) -> Option<Vec<u8>> {
    let decoded = decode_base64url(raw).ok()?;
    let client_data: Value = serde_json::from_slice(&decoded).ok()?;
    let challenge = client_data.get("challenge").and_then(Value::as_str)?;
    (challenge == expected).then_some(decoded)
}

/// Decode an uncompressed P-256 point into a public key.
fn decode_public_key(bytes: &[u8]) -> Option<PKey<Public>> {
    if bytes.len() != PUBKEY_LEN || bytes.first() != Some(&UNCOMPRESSED_POINT) {
        return None;
    }

    let key = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).and_then(|group| {
        let mut ctx = BigNumContext::new()?;
        let point = EcPoint::from_bytes(&group, bytes, &mut ctx)?;
        let key = EcKey::from_public_key(&group, &point)?;
        key.check_key()?;
        PKey::from_ec_key(key)
    });

    key.ok()
}

/// ECDSA-SHA256 check. Malformed signatures are a mismatch, not an error.
fn signature_matches(key: &PKey<Public>, signature: &[u8], data: &[u8]) -> bool {
    Verifier::new(MessageDigest::sha256(), key)
        .and_then(|mut verifier| verifier.verify_oneshot(signature, data))
        .unwrap_or(false)
}

impl U2fVerifier for OpensslVerifier {
    fn app_id(&self) -> &str {
        self.app_id.as_str()
    }

    fn registration_challenge(&self) -> Result<VerifierRequest> {
        self.issue(None)
    }

    fn verify_registration(
        &self,
        request: &VerifierRequest,
        response: &VerifierRegisterResponse,
    ) -> Verdict<VerifierRegistration> {
        let Some(client_data) = client_data_for(&response.client_data, &request.challenge) else {
            return fail(
                FailureKind::UnmatchedChallenge,
                "Registration challenge does not match",
            );
        };

        let Ok(raw) = decode_base64url(&response.registration_data) else {
            return fail(FailureKind::PubkeyDecode, "Registration data is not base64url");
        };
        let Ok(layout) = measure_registration_data(&raw) else {
            return fail(FailureKind::PubkeyDecode, "Registration data is truncated");
        };

        let public_key = &raw[layout.public_key];
        if decode_public_key(public_key).is_none() {
            return fail(FailureKind::PubkeyDecode, "Decoding of public key failed");
        }
        let key_handle = &raw[layout.key_handle];

        let Ok(certificate) = X509::from_der(&raw[layout.certificate]) else {
            return fail(FailureKind::PubkeyDecode, "Decoding of attestation certificate failed");
        };

        if !self.is_trusted(&certificate) {
            return fail(
                FailureKind::AttestationVerification,
                "Attestation certificate can not be validated",
            );
        }

        let Ok(attestation_key) = certificate.public_key() else {
            return fail(FailureKind::PubkeyDecode, "Decoding of public key failed");
        };

        let mut signed = Vec::with_capacity(1 + 32 + 32 + key_handle.len() + PUBKEY_LEN);
        signed.push(0x00);
        signed.extend_from_slice(&sha256(request.app_id.as_bytes()));
        signed.extend_from_slice(&sha256(&client_data));
        signed.extend_from_slice(key_handle);
        signed.extend_from_slice(public_key);

        if !signature_matches(&attestation_key, &raw[layout.signature], &signed) {
            return fail(
                FailureKind::AttestationSignature,
                "Attestation signature does not match",
            );
        }

        Ok(VerifierRegistration {
            key_handle: encode_base64url(key_handle),
            public_key: encode_base64url(public_key),
            counter: 0,
        })
    }

    fn authentication_challenge(
        &self,
        registration: &VerifierRegistration,
    ) -> Result<VerifierRequest> {
        self.issue(Some(registration.key_handle.clone()))
    }

    fn verify_authentication(
        &self,
        request: &VerifierRequest,
        registration: &VerifierRegistration,
        response: &VerifierSignResponse,
    ) -> Verdict<u32> {
        let client_data = client_data_for(&response.client_data, &request.challenge)
            .filter(|_| request.key_handle.as_deref() == Some(response.key_handle.as_str()));
        let Some(client_data) = client_data else {
            return fail(FailureKind::NoMatchingRequest, "No matching request found");
        };

        if registration.key_handle != response.key_handle {
            return fail(
                FailureKind::NoMatchingRegistration,
                "No matching registration found",
            );
        }

        let Some(key) = decode_base64url(&registration.public_key)
            .ok()
            .and_then(|bytes| decode_public_key(&bytes))
        else {
            return fail(FailureKind::PubkeyDecode, "Decoding of public key failed");
        };

        let signature_data = decode_base64url(&response.signature_data).unwrap_or_default();
        let (Some(prefix), Some(signature)) = (
            signature_data.get(..SIGNED_PREFIX_LEN),
            signature_data.get(SIGNED_PREFIX_LEN..),
        ) else {
            return fail(FailureKind::AuthenticationFailure, "Signature data is truncated");
        };

        let mut signed = Vec::with_capacity(32 + SIGNED_PREFIX_LEN + 32);
        signed.extend_from_slice(&sha256(request.app_id.as_bytes()));
        signed.extend_from_slice(prefix);
        signed.extend_from_slice(&sha256(&client_data));

        if !signature_matches(&key, signature, &signed) {
            return fail(
                FailureKind::AuthenticationFailure,
                "Authentication failed",
            );
        }

        let counter = u32::from_be_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]);
        if counter <= registration.counter {
            return fail(FailureKind::CounterTooLow, "Counter too low");
        }

        Ok(counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> OpensslVerifier {
        OpensslVerifier::new(AppId::new("https://domain.invalid").unwrap())
    }

    #[test]
    fn test_challenges_are_random_and_unpadded() {
        let verifier = verifier();
        let first = verifier.registration_challenge().unwrap();
        let second = verifier.registration_challenge().unwrap();

        assert_ne!(first.challenge, second.challenge);
        assert_eq!(decode_base64url(&first.challenge).unwrap().len(), CHALLENGE_LEN);
        assert!(!first.challenge.contains('='));
        assert_eq!(first.version, "U2F_V2");
        assert_eq!(first.app_id, "https://domain.invalid");
    }

    #[test]
    fn test_decode_public_key_rejects_bad_points() {
        assert!(decode_public_key(&[]).is_none());
        assert!(decode_public_key(&[0x04; 64]).is_none());

        let mut not_uncompressed = [0u8; PUBKEY_LEN];
        not_uncompressed[0] = 0x02;
        assert!(decode_public_key(&not_uncompressed).is_none());

        let mut off_curve = [0x11u8; PUBKEY_LEN];
        off_curve[0] = UNCOMPRESSED_POINT;
        assert!(decode_public_key(&off_curve).is_none());
    }

    #[test]
    fn test_registration_with_wrong_challenge() {
        let verifier = verifier();
        let request = verifier.registration_challenge().unwrap();
        let response = VerifierRegisterResponse {
            registration_data: String::new(),
            client_data: encode_base64url(br#"{"challenge":"other"}"#),
        };

        let failure = verifier.verify_registration(&request, &response).unwrap_err();
        assert_eq!(failure.kind, FailureKind::UnmatchedChallenge);
    }

    #[test]
    fn test_truncated_registration_is_pubkey_decode_failure() {
        let verifier = verifier();
        let request = verifier.registration_challenge().unwrap();
        let client_data = encode_base64url(format!(r#"{{"challenge":"{}"}}"#, request.challenge));

        for registration_data in ["", "BQQ", "Garbage38338"] {
            let response = VerifierRegisterResponse {
                registration_data: registration_data.to_string(),
                client_data: client_data.clone(),
            };
            let failure = verifier.verify_registration(&request, &response).unwrap_err();
            assert_eq!(failure.kind, FailureKind::PubkeyDecode, "{registration_data}");
        }
    }

    #[test]
    fn test_authentication_request_and_registration_matching() {
        let verifier = verifier();
        let registration = VerifierRegistration {
            key_handle: "kh".to_string(),
            public_key: String::new(),
            counter: 0,
        };
        let request = verifier.authentication_challenge(&registration).unwrap();
        let client_data = encode_base64url(format!(r#"{{"challenge":"{}"}}"#, request.challenge));

        let wrong_handle = VerifierSignResponse {
            key_handle: "other".to_string(),
            signature_data: String::new(),
            client_data: client_data.clone(),
        };
        let failure = verifier
            .verify_authentication(&request, &registration, &wrong_handle)
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatchingRequest);

        let response = VerifierSignResponse {
            key_handle: "kh".to_string(),
            signature_data: String::new(),
            client_data,
        };
        let other_registration = VerifierRegistration {
            key_handle: "someone-else".to_string(),
            ..registration.clone()
        };
        let failure = verifier
            .verify_authentication(&request, &other_registration, &response)
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoMatchingRegistration);

        let failure = verifier
            .verify_authentication(&request, &registration, &response)
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::PubkeyDecode);
    }

    #[test]
    fn test_missing_attestation_dir_is_io_error() {
        let result = verifier().with_attestation_dir("/nonexistent/u2fgate/attestation");
        assert!(matches!(result, Err(U2fError::Io(_))));
    }
}
