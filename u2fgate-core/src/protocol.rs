//! Protocol data types exchanged between the relying party and the authenticator.
//!
//! Requests serialize to the exact dictionaries of the FIDO U2F JavaScript API
//! (`version`, `challenge`, `appId` and, for sign requests, `keyHandle`).
//! Responses can be deserialized directly or read from loosely typed input with
//! `from_json`, which reports every bad field at once.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{
    numeric_field, string_field, validate_client_data, validate_registration_data,
    validate_signature_data, FieldViolation, FormatError, Violations,
};

/// Protocol version advertised in every request.
pub const U2F_VERSION: &str = "U2F_V2";

/// Length of an uncompressed P-256 public key point.
pub const PUBKEY_LEN: usize = 65;

/// Random bytes per challenge.
pub const CHALLENGE_LEN: usize = 32;

/// First byte of a raw registration message.
pub const REGISTRATION_RESERVED_BYTE: u8 = 0x05;

/// Flags byte, four counter bytes and at least one signature byte.
pub const MIN_SIGNATURE_DATA_LEN: usize = 6;

/// Error code reported by the authenticator through the JavaScript API.
///
/// Code 0 means OK and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceError {
    OtherError,
    BadRequest,
    ConfigurationUnsupported,
    /// Registration: the device is already registered.
    /// Authentication: the device does not know the key handle.
    DeviceIneligible,
    Timeout,
    Unknown(i64),
}

impl DeviceError {
    /// Classify a device error code. Returns `None` for 0.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::OtherError),
            2 => Some(Self::BadRequest),
            3 => Some(Self::ConfigurationUnsupported),
            4 => Some(Self::DeviceIneligible),
            5 => Some(Self::Timeout),
            other => Some(Self::Unknown(other)),
        }
    }

    /// The numeric code as the device reported it.
    pub fn code(&self) -> i64 {
        match self {
            Self::OtherError => 1,
            Self::BadRequest => 2,
            Self::ConfigurationUnsupported => 3,
            Self::DeviceIneligible => 4,
            Self::Timeout => 5,
            Self::Unknown(code) => *code,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::OtherError => "other error",
            Self::BadRequest => "bad request",
            Self::ConfigurationUnsupported => "configuration unsupported",
            Self::DeviceIneligible => "device ineligible",
            Self::Timeout => "timeout",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device error {} ({})", self.code(), self.description())
    }
}

/// Push a violation for a payload field that failed binary validation.
fn check_payload(
    violations: &mut Violations,
    field: &'static str,
    raw: &str,
    validator: fn(&str) -> Result<(), FormatError>,
) {
    if let Err(reason) = validator(raw) {
        violations.push(FieldViolation::new(field, reason.to_string()));
    }
}

fn check_not_blank(violations: &mut Violations, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        violations.push(FieldViolation::new(field, "may not be empty"));
    }
}

fn device_error(error_code: Option<i64>) -> Option<DeviceError> {
    error_code.and_then(DeviceError::from_code)
}

/// Registration challenge sent to the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub version: String,
    pub challenge: String,
    pub app_id: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        check_not_blank(&mut violations, "version", &self.version);
        check_not_blank(&mut violations, "challenge", &self.challenge);
        check_not_blank(&mut violations, "appId", &self.app_id);
        violations.into_result()
    }
}

/// Authenticator answer to a [`RegisterRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub registration_data: String,
    #[serde(default)]
    pub client_data: String,
}

impl RegisterResponse {
    /// Read a response from loosely typed input such as a posted form body.
    ///
    /// Payload fields may be absent when the device reported an error.
    pub fn from_json(value: &Value) -> Result<Self, Violations> {
        let mut violations = Violations::new();

        let error_code = numeric_field(value, "errorCode", &mut violations);
        let required = device_error(error_code).is_none();
        let registration_data =
            string_field(value, "registrationData", required, &mut violations);
        let client_data = string_field(value, "clientData", required, &mut violations);

        violations.into_result()?;
        Ok(Self {
            error_code,
            registration_data,
            client_data,
        })
    }

    /// The device error, if the authenticator reported a non-zero code.
    pub fn device_error(&self) -> Option<DeviceError> {
        device_error(self.error_code)
    }

    /// Run the binary validators on the payload fields.
    ///
    /// Nothing is checked when the device reported an error.
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();

        if self.device_error().is_none() {
            check_payload(
                &mut violations,
                "registrationData",
                &self.registration_data,
                validate_registration_data,
            );
            check_payload(
                &mut violations,
                "clientData",
                &self.client_data,
                validate_client_data,
            );
        }

        violations.into_result()
    }
}

/// Authentication challenge bound to one registered key handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub version: String,
    pub challenge: String,
    pub app_id: String,
    pub key_handle: String,
}

impl SignRequest {
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        check_not_blank(&mut violations, "version", &self.version);
        check_not_blank(&mut violations, "challenge", &self.challenge);
        check_not_blank(&mut violations, "appId", &self.app_id);
        check_not_blank(&mut violations, "keyHandle", &self.key_handle);
        violations.into_result()
    }
}

/// Authenticator answer to a [`SignRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub key_handle: String,
    #[serde(default)]
    pub signature_data: String,
    #[serde(default)]
    pub client_data: String,
}

impl SignResponse {
    /// Read a response from loosely typed input such as a posted form body.
    pub fn from_json(value: &Value) -> Result<Self, Violations> {
        let mut violations = Violations::new();

        let error_code = numeric_field(value, "errorCode", &mut violations);
        let required = device_error(error_code).is_none();
        let key_handle = string_field(value, "keyHandle", required, &mut violations);
        let signature_data = string_field(value, "signatureData", required, &mut violations);
        let client_data = string_field(value, "clientData", required, &mut violations);

        violations.into_result()?;
        Ok(Self {
            error_code,
            key_handle,
            signature_data,
            client_data,
        })
    }

    pub fn device_error(&self) -> Option<DeviceError> {
        device_error(self.error_code)
    }

    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();

        if self.device_error().is_none() {
            check_not_blank(&mut violations, "keyHandle", &self.key_handle);
            check_payload(
                &mut violations,
                "signatureData",
                &self.signature_data,
                validate_signature_data,
            );
            check_payload(
                &mut violations,
                "clientData",
                &self.client_data,
                validate_client_data,
            );
        }

        violations.into_result()
    }
}

/// A device bound to an account.
///
/// The engine never stores this; callers persist it and replace the counter
/// after each successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub key_handle: String,
    /// Base64url encoded uncompressed EC point.
    pub public_key: String,
    #[serde(default)]
    pub sign_counter: u32,
}

impl Registration {
    pub fn new(key_handle: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            key_handle: key_handle.into(),
            public_key: public_key.into(),
            sign_counter: 0,
        }
    }

    /// Copy of this registration carrying a new sign counter.
    pub fn with_sign_counter(&self, sign_counter: u32) -> Self {
        Self {
            sign_counter,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLIENT_DATA: &str = "eyJjaGFsbGVuZ2UiOiJ0ZXN0In0";
    const SIGNATURE_DATA: &str = "AQAAABQwRQIgGqVZuSx6ulGFl6L63oDLF3OTq0EiCHJNadAHixwTZDkCIQCDarpMiGQA6TFCYj2bslbjyIYg3nSHPCo21YIQOlb09Q";

    #[test]
    fn test_device_error_codes() {
        assert_eq!(DeviceError::from_code(0), None);
        for code in 1..=5 {
            let error = DeviceError::from_code(code).expect("non-zero code");
            assert_eq!(error.code(), code);
            assert!(!matches!(error, DeviceError::Unknown(_)));
        }
        assert_eq!(DeviceError::from_code(-7), Some(DeviceError::Unknown(-7)));
        assert_eq!(DeviceError::from_code(4), Some(DeviceError::DeviceIneligible));
        assert_eq!(
            DeviceError::DeviceIneligible.to_string(),
            "device error 4 (device ineligible)"
        );
    }

    #[test]
    fn test_register_request_serializes_api_keys() {
        let request = RegisterRequest {
            version: U2F_VERSION.to_string(),
            challenge: "abc".to_string(),
            app_id: "https://domain.invalid".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"version": "U2F_V2", "challenge": "abc", "appId": "https://domain.invalid"})
        );
    }

    #[test]
    fn test_sign_request_serializes_api_keys() {
        let request = SignRequest {
            version: U2F_VERSION.to_string(),
            challenge: "abc".to_string(),
            app_id: "https://domain.invalid".to_string(),
            key_handle: "kh".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["appId", "challenge", "keyHandle", "version"]);
    }

    #[test]
    fn test_request_validate_rejects_blank_fields() {
        let request = SignRequest {
            version: U2F_VERSION.to_string(),
            challenge: " ".to_string(),
            app_id: "https://domain.invalid".to_string(),
            key_handle: String::new(),
        };
        let violations = request.validate().unwrap_err();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations.reason_for("challenge"), Some("may not be empty"));
        assert_eq!(violations.reason_for("keyHandle"), Some("may not be empty"));
    }

    #[test]
    fn test_register_response_from_json_reports_every_field() {
        let violations = RegisterResponse::from_json(&json!({
            "errorCode": "x",
            "registrationData": 12,
        }))
        .unwrap_err();

        assert_eq!(violations.reason_for("errorCode"), Some("must be numeric"));
        assert_eq!(violations.reason_for("registrationData"), Some("Not a string"));
        assert_eq!(violations.reason_for("clientData"), Some("may not be empty"));
    }

    #[test]
    fn test_register_response_from_json_with_device_error_needs_no_payload() {
        let response = RegisterResponse::from_json(&json!({"errorCode": "4"})).unwrap();
        assert_eq!(response.error_code, Some(4));
        assert_eq!(response.device_error(), Some(DeviceError::DeviceIneligible));
        assert_eq!(response.validate(), Ok(()));
    }

    #[test]
    fn test_register_response_validate_runs_binary_validators() {
        let response = RegisterResponse {
            error_code: None,
            registration_data: "Garbage38338".to_string(),
            client_data: "%%%".to_string(),
        };
        let violations = response.validate().unwrap_err();
        assert_eq!(violations.reason_for("registrationData"), Some("Not enough bytes"));
        assert_eq!(violations.reason_for("clientData"), Some("Not base64 decodable"));
    }

    #[test]
    fn test_sign_response_round_trip_and_validate() {
        let value = json!({
            "keyHandle": "kh",
            "signatureData": SIGNATURE_DATA,
            "clientData": CLIENT_DATA,
        });
        let response = SignResponse::from_json(&value).unwrap();
        assert_eq!(response.error_code, None);
        assert_eq!(response.device_error(), None);
        assert_eq!(response.validate(), Ok(()));

        let parsed: SignResponse = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_sign_response_zero_error_code_is_success() {
        let response = SignResponse::from_json(&json!({
            "errorCode": 0,
            "keyHandle": "kh",
            "signatureData": "BQQ",
            "clientData": CLIENT_DATA,
        }))
        .unwrap();
        assert_eq!(response.device_error(), None);
        let violations = response.validate().unwrap_err();
        assert_eq!(violations.reason_for("signatureData"), Some("Too short"));
    }

    #[test]
    fn test_registration_counter_replacement() {
        let registration = Registration::new("kh", "pk");
        assert_eq!(registration.sign_counter, 0);

        let updated = registration.with_sign_counter(7);
        assert_eq!(updated.sign_counter, 7);
        assert_eq!(updated.key_handle, "kh");
        assert_eq!(
            serde_json::to_value(&updated).unwrap(),
            json!({"keyHandle": "kh", "publicKey": "pk", "signCounter": 7})
        );
    }
}
