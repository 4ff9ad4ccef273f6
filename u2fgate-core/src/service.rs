//! Verification orchestration.
//!
//! Each verification runs the same fixed sequence and stops at the first
//! decisive step:
//!
//! 1. device error check (response `errorCode` present and non-zero)
//! 2. AppId check (authentication only)
//! 3. cryptographic verification, delegated to the [`U2fVerifier`]
//! 4. counter check, reported by the verifier as [`FailureKind::CounterTooLow`]
//!
//! Steps 1 and 2 never reach the verifier. A verifier failure outside the set
//! known for the operation is returned as
//! [`U2fError::UnexpectedVerifierFailure`] and must be treated as fatal.

use tracing::{debug, error, info, instrument, warn};

use crate::app_id::AppId;
use crate::error::{Operation, Result, U2fError};
use crate::protocol::{RegisterRequest, RegisterResponse, Registration, SignRequest, SignResponse};
use crate::result::{AuthenticationVerificationResult, RegistrationVerificationResult};
use crate::verifier::{
    FailureKind, U2fVerifier, VerifierFailure, VerifierRegisterResponse, VerifierRegistration,
    VerifierRequest, VerifierSignResponse,
};

/// Stateless U2F verification engine for one application.
///
/// All inputs are passed per call, so one service can be shared across
/// threads. Callers own persistence of registrations and their counters.
///
/// ## Example
///
/// ```
/// use u2fgate_core::{MockVerifier, U2fService};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = U2fService::new(MockVerifier::new("https://login.example.invalid"))?;
/// assert_eq!(service.app_id(), "https://login.example.invalid");
///
/// let request = service.request_registration()?;
/// assert_eq!(request.version, "U2F_V2");
/// assert_eq!(request.app_id, service.app_id().as_str());
/// # Ok(())
/// # }
/// ```
pub struct U2fService<V> {
    app_id: AppId,
    verifier: V,
}

impl<V: U2fVerifier> U2fService<V> {
    /// Wrap `verifier`. Responses are checked against the AppId the verifier
    /// issues its challenges for.
    ///
    /// Fails with [`U2fError::InvalidArgument`] if that AppId is not valid.
    pub fn new(verifier: V) -> Result<Self> {
        let app_id = AppId::new(verifier.app_id())?;
        Ok(Self { app_id, verifier })
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Create a registration challenge to send to the authenticator.
    #[instrument(level = "debug", skip_all, fields(app_id = %self.app_id))]
    pub fn request_registration(&self) -> Result<RegisterRequest> {
        let request = RegisterRequest::from(self.verifier.registration_challenge()?);
        debug!("Issued registration challenge");
        Ok(request)
    }

    /// Verify the authenticator's answer to `request`.
    ///
    /// Returns `Err` only for fatal faults.
    #[instrument(
        level = "debug",
        skip_all,
        fields(app_id = %self.app_id, error_code = ?response.error_code)
    )]
    pub fn verify_registration(
        &self,
        request: &RegisterRequest,
        response: &RegisterResponse,
    ) -> Result<RegistrationVerificationResult> {
        if let Some(device_error) = response.device_error() {
            warn!(%device_error, "Device reported an error during registration");
            return Ok(RegistrationVerificationResult::DeviceReportedError(device_error));
        }

        debug!("Verifying registration response");
        let outcome = self.verifier.verify_registration(
            &VerifierRequest::from(request),
            &VerifierRegisterResponse::from(response),
        );

        let result = match outcome {
            Ok(device) => {
                let registration = Registration::from(device);
                info!(key_handle = %registration.key_handle, "Registration verified");
                return Ok(RegistrationVerificationResult::Success(registration));
            }
            Err(failure) => registration_failure(failure)?,
        };

        warn!(status = result.status(), "Registration rejected");
        Ok(result)
    }

    /// Create a sign challenge for a registered device.
    #[instrument(
        level = "debug",
        skip_all,
        fields(app_id = %self.app_id, key_handle = %registration.key_handle)
    )]
    pub fn request_authentication(&self, registration: &Registration) -> Result<SignRequest> {
        let request = self
            .verifier
            .authentication_challenge(&VerifierRegistration::from(registration))?
            .into_sign_request(&registration.key_handle);
        debug!("Issued authentication challenge");
        Ok(request)
    }

    /// Verify the authenticator's answer to `request`.
    ///
    /// On success the returned registration carries the device's new sign
    /// counter, which the caller must persist. Returns `Err` only for fatal
    /// faults.
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            app_id = %self.app_id,
            key_handle = %registration.key_handle,
            error_code = ?response.error_code
        )
    )]
    pub fn verify_authentication(
        &self,
        registration: &Registration,
        request: &SignRequest,
        response: &SignResponse,
    ) -> Result<AuthenticationVerificationResult> {
        if let Some(device_error) = response.device_error() {
            warn!(%device_error, "Device reported an error during authentication");
            return Ok(AuthenticationVerificationResult::DeviceReportedError(device_error));
        }

        if self.app_id != request.app_id {
            warn!(request_app_id = %request.app_id, "AppId mismatch");
            return Ok(AuthenticationVerificationResult::AppIdMismatch);
        }

        debug!(stored_counter = registration.sign_counter, "Verifying sign response");
        let outcome = self.verifier.verify_authentication(
            &VerifierRequest::from(request),
            &VerifierRegistration::from(registration),
            &VerifierSignResponse::from(response),
        );

        let result = match outcome {
            Ok(counter) => {
                info!(sign_counter = counter, "Authentication verified");
                return Ok(AuthenticationVerificationResult::Success(
                    registration.with_sign_counter(counter),
                ));
            }
            Err(failure) => authentication_failure(failure)?,
        };

        warn!(status = result.status(), "Authentication rejected");
        Ok(result)
    }
}

fn unexpected(operation: Operation, failure: VerifierFailure) -> U2fError {
    error!(%operation, %failure, "Verifier reported an unrecognized failure");
    U2fError::UnexpectedVerifierFailure { operation, failure }
}

fn registration_failure(failure: VerifierFailure) -> Result<RegistrationVerificationResult> {
    match failure.kind {
        FailureKind::UnmatchedChallenge => Ok(RegistrationVerificationResult::ChallengeMismatch),
        FailureKind::AttestationSignature => Ok(RegistrationVerificationResult::NotSignedByDevice),
        FailureKind::AttestationVerification => Ok(RegistrationVerificationResult::UntrustedDevice),
        FailureKind::PubkeyDecode => Ok(RegistrationVerificationResult::PublicKeyDecodeFailed),
        _ => Err(unexpected(Operation::Registration, failure)),
    }
}

fn authentication_failure(failure: VerifierFailure) -> Result<AuthenticationVerificationResult> {
    match failure.kind {
        FailureKind::NoMatchingRequest => {
            Ok(AuthenticationVerificationResult::RequestResponseMismatch)
        }
        FailureKind::NoMatchingRegistration => {
            Ok(AuthenticationVerificationResult::RegistrationMismatch)
        }
        FailureKind::PubkeyDecode => Ok(AuthenticationVerificationResult::PublicKeyDecodeFailed),
        FailureKind::AuthenticationFailure => {
            Ok(AuthenticationVerificationResult::NotSignedByDevice)
        }
        FailureKind::CounterTooLow => Ok(AuthenticationVerificationResult::SignCounterTooLow),
        _ => Err(unexpected(Operation::Authentication, failure)),
    }
}
