//! Boundary to the cryptographic U2F verifier.
//!
//! The verification engine decides *whether* to invoke a verifier and *how* to
//! interpret its outcome; signature checks and attestation chain validation
//! live behind the [`U2fVerifier`] trait.
//!
//! Verifiers speak their own message types. Conversions to and from the
//! protocol types in [`crate::protocol`] are spelled out field by field so the
//! two sides can evolve independently.
//!
//! - **OpenSSL** - reference implementation of the raw message format (feature `openssl`)
//! - **Mock** - scripted outcomes with call counters for testing

mod mock;
#[cfg(feature = "openssl")]
mod openssl;

pub use mock::MockVerifier;
#[cfg(feature = "openssl")]
pub use self::openssl::OpensslVerifier;

use std::fmt;

use thiserror::Error;

use crate::error::Result;
use crate::protocol::{Registration, RegisterRequest, RegisterResponse, SignRequest, SignResponse};

/// Failure classifications a verifier can report.
///
/// Codes follow the numbering used by established U2F server libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NoMatchingRequest,
    NoMatchingRegistration,
    AuthenticationFailure,
    UnmatchedChallenge,
    AttestationSignature,
    AttestationVerification,
    BadRandom,
    PubkeyDecode,
    BadUaReturning,
    CounterTooLow,
    /// A code outside the known set.
    Other(u32),
}

impl FailureKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::NoMatchingRequest,
            2 => Self::NoMatchingRegistration,
            3 => Self::AuthenticationFailure,
            4 => Self::UnmatchedChallenge,
            5 => Self::AttestationSignature,
            6 => Self::AttestationVerification,
            7 => Self::BadRandom,
            8 => Self::PubkeyDecode,
            9 => Self::BadUaReturning,
            10 => Self::CounterTooLow,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::NoMatchingRequest => 1,
            Self::NoMatchingRegistration => 2,
            Self::AuthenticationFailure => 3,
            Self::UnmatchedChallenge => 4,
            Self::AttestationSignature => 5,
            Self::AttestationVerification => 6,
            Self::BadRandom => 7,
            Self::PubkeyDecode => 8,
            Self::BadUaReturning => 9,
            Self::CounterTooLow => 10,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoMatchingRequest => "no matching request",
            Self::NoMatchingRegistration => "no matching registration",
            Self::AuthenticationFailure => "authentication failure",
            Self::UnmatchedChallenge => "unmatched challenge",
            Self::AttestationSignature => "attestation signature",
            Self::AttestationVerification => "attestation verification",
            Self::BadRandom => "bad random",
            Self::PubkeyDecode => "public key decode",
            Self::BadUaReturning => "bad user agent response",
            Self::CounterTooLow => "counter too low",
            Self::Other(_) => "unknown failure",
        };
        write!(f, "{name} (code {})", self.code())
    }
}

/// A classified verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} [{kind}]")]
pub struct VerifierFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl VerifierFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Challenge as issued by a verifier. `key_handle` is set for sign requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierRequest {
    pub version: String,
    pub challenge: String,
    pub app_id: String,
    pub key_handle: Option<String>,
}

/// Registration response payload handed to a verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierRegisterResponse {
    pub registration_data: String,
    pub client_data: String,
}

/// Sign response payload handed to a verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSignResponse {
    pub key_handle: String,
    pub signature_data: String,
    pub client_data: String,
}

/// Device record as a verifier sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierRegistration {
    pub key_handle: String,
    pub public_key: String,
    pub counter: u32,
}

impl From<&RegisterRequest> for VerifierRequest {
    fn from(request: &RegisterRequest) -> Self {
        Self {
            version: request.version.clone(),
            challenge: request.challenge.clone(),
            app_id: request.app_id.clone(),
            key_handle: None,
        }
    }
}

impl From<&SignRequest> for VerifierRequest {
    fn from(request: &SignRequest) -> Self {
        Self {
            version: request.version.clone(),
            challenge: request.challenge.clone(),
            app_id: request.app_id.clone(),
            key_handle: Some(request.key_handle.clone()),
        }
    }
}

impl From<VerifierRequest> for RegisterRequest {
    fn from(request: VerifierRequest) -> Self {
        Self {
            version: request.version,
            challenge: request.challenge,
            app_id: request.app_id,
        }
    }
}

impl VerifierRequest {
    /// Convert an issued sign challenge, falling back to `key_handle` when the
    /// verifier did not echo one.
    pub fn into_sign_request(self, key_handle: &str) -> SignRequest {
        SignRequest {
            version: self.version,
            challenge: self.challenge,
            app_id: self.app_id,
            key_handle: self.key_handle.unwrap_or_else(|| key_handle.to_string()),
        }
    }
}

impl From<&RegisterResponse> for VerifierRegisterResponse {
    fn from(response: &RegisterResponse) -> Self {
        Self {
            registration_data: response.registration_data.clone(),
            client_data: response.client_data.clone(),
        }
    }
}

impl From<&SignResponse> for VerifierSignResponse {
    fn from(response: &SignResponse) -> Self {
        Self {
            key_handle: response.key_handle.clone(),
            signature_data: response.signature_data.clone(),
            client_data: response.client_data.clone(),
        }
    }
}

impl From<&Registration> for VerifierRegistration {
    fn from(registration: &Registration) -> Self {
        Self {
            key_handle: registration.key_handle.clone(),
            public_key: registration.public_key.clone(),
            counter: registration.sign_counter,
        }
    }
}

impl From<VerifierRegistration> for Registration {
    fn from(registration: VerifierRegistration) -> Self {
        Self {
            key_handle: registration.key_handle,
            public_key: registration.public_key,
            sign_counter: registration.counter,
        }
    }
}

/// Cryptographic verifier for U2F registration and authentication.
///
/// Implementations must be thread-safe (`Send + Sync`) and hold no per-call
/// state: every input needed for a verification is passed explicitly.
pub trait U2fVerifier: Send + Sync {
    /// AppId bound into every challenge this verifier issues.
    fn app_id(&self) -> &str;

    /// Issue a fresh registration challenge.
    fn registration_challenge(&self) -> Result<VerifierRequest>;

    /// Verify a registration response against the request that produced it.
    fn verify_registration(
        &self,
        request: &VerifierRequest,
        response: &VerifierRegisterResponse,
    ) -> std::result::Result<VerifierRegistration, VerifierFailure>;

    /// Issue a fresh sign challenge for a registered device.
    fn authentication_challenge(
        &self,
        registration: &VerifierRegistration,
    ) -> Result<VerifierRequest>;

    /// Verify a sign response and return the device's new counter.
    fn verify_authentication(
        &self,
        request: &VerifierRequest,
        registration: &VerifierRegistration,
        response: &VerifierSignResponse,
    ) -> std::result::Result<u32, VerifierFailure>;
}

impl<V: U2fVerifier + ?Sized> U2fVerifier for &V {
    fn app_id(&self) -> &str {
        (**self).app_id()
    }

    fn registration_challenge(&self) -> Result<VerifierRequest> {
        (**self).registration_challenge()
    }

    fn verify_registration(
        &self,
        request: &VerifierRequest,
        response: &VerifierRegisterResponse,
    ) -> std::result::Result<VerifierRegistration, VerifierFailure> {
        (**self).verify_registration(request, response)
    }

    fn authentication_challenge(
        &self,
        registration: &VerifierRegistration,
    ) -> Result<VerifierRequest> {
        (**self).authentication_challenge(registration)
    }

    fn verify_authentication(
        &self,
        request: &VerifierRequest,
        registration: &VerifierRegistration,
        response: &VerifierSignResponse,
    ) -> std::result::Result<u32, VerifierFailure> {
        (**self).verify_authentication(request, registration, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes_round_trip() {
        for code in 1..=10 {
            let kind = FailureKind::from_code(code);
            assert!(!matches!(kind, FailureKind::Other(_)), "code {code}");
            assert_eq!(kind.code(), code);
        }
        assert_eq!(FailureKind::from_code(235789), FailureKind::Other(235789));
        assert_eq!(FailureKind::from_code(0), FailureKind::Other(0));
    }

    #[test]
    fn test_failure_display_includes_kind_and_code() {
        let failure = VerifierFailure::new(FailureKind::CounterTooLow, "Counter too low");
        assert_eq!(
            failure.to_string(),
            "Counter too low [counter too low (code 10)]"
        );
    }

    #[test]
    fn test_registration_mapping_is_total() {
        let registration = Registration {
            key_handle: "kh".to_string(),
            public_key: "pk".to_string(),
            sign_counter: 41,
        };
        let adapted = VerifierRegistration::from(&registration);
        assert_eq!(adapted.counter, 41);
        assert_eq!(Registration::from(adapted), registration);
    }

    #[test]
    fn test_sign_request_mapping_keeps_key_handle() {
        let request = SignRequest {
            version: "U2F_V2".to_string(),
            challenge: "c".to_string(),
            app_id: "https://domain.invalid".to_string(),
            key_handle: "kh".to_string(),
        };
        let adapted = VerifierRequest::from(&request);
        assert_eq!(adapted.key_handle.as_deref(), Some("kh"));
        assert_eq!(adapted.into_sign_request("other"), request);

        let register = RegisterRequest::from(VerifierRequest::from(&RegisterRequest {
            version: "U2F_V2".to_string(),
            challenge: "c".to_string(),
            app_id: "https://domain.invalid".to_string(),
        }));
        assert_eq!(register.challenge, "c");
    }
}
