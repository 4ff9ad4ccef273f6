//! Closed outcome sets of the two verification flows.
//!
//! Exactly one status holds per result and only `Success` carries a
//! [`Registration`]. Asking a failed result for its registration is a
//! contract violation and panics; use `as_registration` to probe.

use std::fmt;

use crate::protocol::{DeviceError, Registration};

/// Outcome of verifying a registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationVerificationResult {
    Success(Registration),
    DeviceReportedError(DeviceError),
    /// The client data does not carry the request's challenge.
    ChallengeMismatch,
    /// The attestation signature does not verify.
    NotSignedByDevice,
    /// The attestation certificate does not chain to a trusted root.
    UntrustedDevice,
    PublicKeyDecodeFailed,
}

impl RegistrationVerificationResult {
    pub fn was_successful(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The new registration.
    ///
    /// # Panics
    ///
    /// If the registration was not successful.
    #[track_caller]
    pub fn registration(&self) -> &Registration {
        match self {
            Self::Success(registration) => registration,
            other => panic!("registration() called on an unsuccessful result: {other}"),
        }
    }

    /// # Panics
    ///
    /// If the registration was not successful.
    #[track_caller]
    pub fn into_registration(self) -> Registration {
        match self {
            Self::Success(registration) => registration,
            other => panic!("into_registration() called on an unsuccessful result: {other}"),
        }
    }

    pub fn as_registration(&self) -> Option<&Registration> {
        match self {
            Self::Success(registration) => Some(registration),
            _ => None,
        }
    }

    pub fn device_error(&self) -> Option<DeviceError> {
        match self {
            Self::DeviceReportedError(error) => Some(*error),
            _ => None,
        }
    }

    /// Stable machine-readable status name.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::DeviceReportedError(_) => "device_reported_error",
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::NotSignedByDevice => "not_signed_by_device",
            Self::UntrustedDevice => "untrusted_device",
            Self::PublicKeyDecodeFailed => "public_key_decode_failed",
        }
    }
}

impl fmt::Display for RegistrationVerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => write!(f, "Registration succeeded"),
            Self::DeviceReportedError(DeviceError::DeviceIneligible) => {
                write!(f, "Device is already registered")
            }
            Self::DeviceReportedError(error) => write!(f, "Device reported an error: {error}"),
            Self::ChallengeMismatch => write!(f, "Challenge does not match the request"),
            Self::NotSignedByDevice => write!(f, "Registration was not signed by the device"),
            Self::UntrustedDevice => write!(f, "Device attestation is not trusted"),
            Self::PublicKeyDecodeFailed => write!(f, "Device public key could not be decoded"),
        }
    }
}

/// Outcome of verifying a sign response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationVerificationResult {
    /// Carries the registration with its updated sign counter.
    Success(Registration),
    DeviceReportedError(DeviceError),
    /// The request was issued for a different application.
    AppIdMismatch,
    /// The response does not answer the request's challenge or key handle.
    RequestResponseMismatch,
    /// The response was made with a different registered key.
    RegistrationMismatch,
    PublicKeyDecodeFailed,
    NotSignedByDevice,
    /// The device counter did not advance. The device may be cloned.
    SignCounterTooLow,
}

impl AuthenticationVerificationResult {
    pub fn was_successful(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The registration with its updated sign counter.
    ///
    /// # Panics
    ///
    /// If the authentication was not successful.
    #[track_caller]
    pub fn registration(&self) -> &Registration {
        match self {
            Self::Success(registration) => registration,
            other => panic!("registration() called on an unsuccessful result: {other}"),
        }
    }

    /// # Panics
    ///
    /// If the authentication was not successful.
    #[track_caller]
    pub fn into_registration(self) -> Registration {
        match self {
            Self::Success(registration) => registration,
            other => panic!("into_registration() called on an unsuccessful result: {other}"),
        }
    }

    pub fn as_registration(&self) -> Option<&Registration> {
        match self {
            Self::Success(registration) => Some(registration),
            _ => None,
        }
    }

    pub fn device_error(&self) -> Option<DeviceError> {
        match self {
            Self::DeviceReportedError(error) => Some(*error),
            _ => None,
        }
    }

    /// Stable machine-readable status name.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::DeviceReportedError(_) => "device_reported_error",
            Self::AppIdMismatch => "app_id_mismatch",
            Self::RequestResponseMismatch => "request_response_mismatch",
            Self::RegistrationMismatch => "registration_mismatch",
            Self::PublicKeyDecodeFailed => "public_key_decode_failed",
            Self::NotSignedByDevice => "not_signed_by_device",
            Self::SignCounterTooLow => "sign_counter_too_low",
        }
    }
}

impl fmt::Display for AuthenticationVerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => write!(f, "Authentication succeeded"),
            Self::DeviceReportedError(DeviceError::DeviceIneligible) => {
                write!(f, "Device does not know this key handle")
            }
            Self::DeviceReportedError(error) => write!(f, "Device reported an error: {error}"),
            Self::AppIdMismatch => write!(f, "Request was issued for a different AppId"),
            Self::RequestResponseMismatch => write!(f, "Response does not match the request"),
            Self::RegistrationMismatch => write!(f, "Response does not match the registration"),
            Self::PublicKeyDecodeFailed => write!(f, "Device public key could not be decoded"),
            Self::NotSignedByDevice => write!(f, "Response was not signed by the device"),
            Self::SignCounterTooLow => write!(f, "Sign counter too low, device may be cloned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration::new("kh", "pk")
    }

    #[test]
    fn test_only_success_carries_registration() {
        let success = RegistrationVerificationResult::Success(registration());
        assert!(success.was_successful());
        assert_eq!(success.registration().key_handle, "kh");
        assert_eq!(success.as_registration(), Some(&registration()));

        for failure in [
            RegistrationVerificationResult::ChallengeMismatch,
            RegistrationVerificationResult::NotSignedByDevice,
            RegistrationVerificationResult::UntrustedDevice,
            RegistrationVerificationResult::PublicKeyDecodeFailed,
            RegistrationVerificationResult::DeviceReportedError(DeviceError::Timeout),
        ] {
            assert!(!failure.was_successful());
            assert_eq!(failure.as_registration(), None);
        }
    }

    #[test]
    #[should_panic(expected = "unsuccessful result")]
    fn test_registration_payload_on_failure_panics() {
        RegistrationVerificationResult::UntrustedDevice.registration();
    }

    #[test]
    #[should_panic(expected = "unsuccessful result")]
    fn test_authentication_payload_on_counter_too_low_panics() {
        AuthenticationVerificationResult::SignCounterTooLow.into_registration();
    }

    #[test]
    fn test_device_ineligible_wording() {
        let registration =
            RegistrationVerificationResult::DeviceReportedError(DeviceError::DeviceIneligible);
        assert_eq!(registration.to_string(), "Device is already registered");
        assert_eq!(registration.device_error().map(|e| e.code()), Some(4));
        assert_eq!(registration.status(), "device_reported_error");

        let authentication =
            AuthenticationVerificationResult::DeviceReportedError(DeviceError::DeviceIneligible);
        assert_eq!(
            authentication.to_string(),
            "Device does not know this key handle"
        );
    }

    #[test]
    fn test_statuses_are_distinct() {
        let statuses = [
            AuthenticationVerificationResult::Success(registration()),
            AuthenticationVerificationResult::DeviceReportedError(DeviceError::OtherError),
            AuthenticationVerificationResult::AppIdMismatch,
            AuthenticationVerificationResult::RequestResponseMismatch,
            AuthenticationVerificationResult::RegistrationMismatch,
            AuthenticationVerificationResult::PublicKeyDecodeFailed,
            AuthenticationVerificationResult::NotSignedByDevice,
            AuthenticationVerificationResult::SignCounterTooLow,
        ]
        .map(|result| result.status());

        let mut unique = statuses.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), statuses.len());
    }
}
