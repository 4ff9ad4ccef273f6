//! Mock verifier for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    FailureKind, U2fVerifier, VerifierFailure, VerifierRegisterResponse, VerifierRegistration,
    VerifierRequest, VerifierSignResponse,
};
use crate::error::Result;
use crate::protocol::U2F_VERSION;
use crate::validation::encode_base64url;

/// Scripted verifier that counts every call.
/// WARNING: Do not use in production - it accepts any response!
///
/// By default every verification succeeds: registration yields a fixed device
/// and authentication advances the stored counter by one.
#[derive(Debug)]
pub struct MockVerifier {
    app_id: String,
    registration_failure: Option<FailureKind>,
    authentication_failure: Option<FailureKind>,
    registration: VerifierRegistration,
    next_counter: Option<u32>,
    challenges_issued: AtomicUsize,
    registration_calls: AtomicUsize,
    authentication_calls: AtomicUsize,
}

impl MockVerifier {
    pub const KEY_HANDLE: &'static str = "mock-key-handle";
    pub const PUBLIC_KEY: &'static str = "mock-public-key";

    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            registration_failure: None,
            authentication_failure: None,
            registration: VerifierRegistration {
                key_handle: Self::KEY_HANDLE.to_string(),
                public_key: Self::PUBLIC_KEY.to_string(),
                counter: 0,
            },
            next_counter: None,
            challenges_issued: AtomicUsize::new(0),
            registration_calls: AtomicUsize::new(0),
            authentication_calls: AtomicUsize::new(0),
        }
    }

    /// Fail every registration verification with `kind`.
    pub fn fail_registration(mut self, kind: FailureKind) -> Self {
        self.registration_failure = Some(kind);
        self
    }

    /// Fail every authentication verification with `kind`.
    pub fn fail_authentication(mut self, kind: FailureKind) -> Self {
        self.authentication_failure = Some(kind);
        self
    }

    /// Device returned by successful registrations.
    pub fn with_registration(mut self, registration: VerifierRegistration) -> Self {
        self.registration = registration;
        self
    }

    /// Counter returned by successful authentications.
    pub fn with_counter(mut self, counter: u32) -> Self {
        self.next_counter = Some(counter);
        self
    }

    /// Number of challenges issued.
    pub fn challenges_issued(&self) -> usize {
        self.challenges_issued.load(Ordering::SeqCst)
    }

    /// Number of `verify_registration` calls.
    pub fn registration_calls(&self) -> usize {
        self.registration_calls.load(Ordering::SeqCst)
    }

    /// Number of `verify_authentication` calls.
    pub fn authentication_calls(&self) -> usize {
        self.authentication_calls.load(Ordering::SeqCst)
    }

    /// Every verification call, registration and authentication.
    pub fn verification_calls(&self) -> usize {
        self.registration_calls() + self.authentication_calls()
    }

    fn issue(&self, key_handle: Option<String>) -> VerifierRequest {
        let n = self.challenges_issued.fetch_add(1, Ordering::SeqCst);
        VerifierRequest {
            version: U2F_VERSION.to_string(),
            challenge: encode_base64url(format!("mock-challenge-{n}")),
            app_id: self.app_id.clone(),
            key_handle,
        }
    }
}

impl U2fVerifier for MockVerifier {
    fn app_id(&self) -> &str {
        &self.app_id
    }

    fn registration_challenge(&self) -> Result<VerifierRequest> {
        Ok(self.issue(None))
    }

    fn verify_registration(
        &self,
        _request: &VerifierRequest,
        _response: &VerifierRegisterResponse,
    ) -> std::result::Result<VerifierRegistration, VerifierFailure> {
        self.registration_calls.fetch_add(1, Ordering::SeqCst);

        match self.registration_failure {
            Some(kind) => Err(VerifierFailure::new(kind, "scripted registration failure")),
            None => Ok(self.registration.clone()),
        }
    }

    fn authentication_challenge(
        &self,
        registration: &VerifierRegistration,
    ) -> Result<VerifierRequest> {
        Ok(self.issue(Some(registration.key_handle.clone())))
    }

    fn verify_authentication(
        &self,
        _request: &VerifierRequest,
        registration: &VerifierRegistration,
        _response: &VerifierSignResponse,
    ) -> std::result::Result<u32, VerifierFailure> {
        self.authentication_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = self.authentication_failure {
            return Err(VerifierFailure::new(kind, "scripted authentication failure"));
        }

        Ok(self
            .next_counter
            .unwrap_or_else(|| registration.counter.saturating_add(1)))
    }
}
