//! u2fgate Core - Server-side FIDO U2F verification engine
//!
//! This crate turns U2F request/response pairs into definitive verdicts for a
//! relying party that binds hardware security keys to user accounts.
//!
//! # Features
//!
//! - Strict base64url validators for client data, registration and signature payloads
//! - Registration and authentication orchestration with AppId matching
//! - Sign counter anti-cloning checks
//! - Closed, typed result sets; unknown verifier failures are fatal errors
//! - OpenSSL reference verifier for the U2F raw message format (feature `openssl`)
//!
//! # Example
//!
//! ```
//! use u2fgate_core::{AppId, MockVerifier, RegisterResponse, RegistrationVerificationResult, U2fService};
//!
//! # fn main() -> u2fgate_core::Result<()> {
//! let app_id = AppId::new("https://login.example.invalid")?;
//!
//! // Use the mock verifier for testing (in production, use OpensslVerifier)
//! let service = U2fService::new(MockVerifier::new(app_id.as_str()))?;
//!
//! let request = service.request_registration()?;
//!
//! // The authenticator declined: the device is already registered
//! let response = RegisterResponse {
//!     error_code: Some(4),
//!     ..Default::default()
//! };
//! let result = service.verify_registration(&request, &response)?;
//! assert!(matches!(result, RegistrationVerificationResult::DeviceReportedError(_)));
//! assert_eq!(service.verifier().verification_calls(), 0);
//! # Ok(())
//! # }
//! ```

pub mod app_id;
pub mod config;
pub mod error;
pub mod protocol;
pub mod result;
pub mod service;
pub mod validation;
pub mod verifier;

// Re-export main types for convenience
pub use app_id::AppId;
pub use config::U2fConfig;
pub use error::{Operation, Result, U2fError};
pub use protocol::{
    DeviceError, RegisterRequest, RegisterResponse, Registration, SignRequest, SignResponse,
    CHALLENGE_LEN, MIN_SIGNATURE_DATA_LEN, PUBKEY_LEN, REGISTRATION_RESERVED_BYTE, U2F_VERSION,
};
pub use result::{AuthenticationVerificationResult, RegistrationVerificationResult};
pub use service::U2fService;
pub use validation::{
    validate_client_data, validate_registration_data, validate_signature_data, FieldViolation,
    FormatError, Violations,
};
pub use verifier::{FailureKind, MockVerifier, U2fVerifier, VerifierFailure};

#[cfg(feature = "openssl")]
pub use verifier::OpensslVerifier;
