//! Application identity of the relying party.
//!
//! The AppId is bound into every registration and signature a device produces,
//! so the value used for comparisons is the exact string the caller configured,
//! not a normalized form of the URL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, U2fError};

/// A validated HTTPS URL identifying this logical application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Validate and wrap an AppId.
    ///
    /// Fails with [`U2fError::InvalidArgument`] unless `value` is an absolute
    /// URL with scheme `https` and carries no surrounding whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.trim() != value {
            return Err(U2fError::InvalidArgument(format!(
                "AppId may not contain leading or trailing whitespace, got {value:?}"
            )));
        }

        let url = Url::parse(&value).map_err(|e| {
            U2fError::InvalidArgument(format!("AppId must be a valid URL ({e}), got {value:?}"))
        })?;

        if url.scheme() != "https" {
            return Err(U2fError::InvalidArgument(format!(
                "AppId must be a HTTPS URL, got scheme {:?}",
                url.scheme()
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AppId {
    type Err = U2fError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AppId {
    type Error = U2fError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(app_id: AppId) -> Self {
        app_id.0
    }
}

impl PartialEq<str> for AppId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AppId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for AppId {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_https_app_ids() {
        for value in [
            "https://domain.invalid",
            "https://domain.invalid/",
            "https://domain.invalid/bleep/blorp/black-holes",
            "https://domain.invalid:10609/bleep/blorp/black-holes",
        ] {
            let app_id = AppId::new(value).expect(value);
            assert_eq!(app_id.as_str(), value);
        }
    }

    #[test]
    fn test_rejects_non_https_and_padded_app_ids() {
        for value in [
            " https://domain.invalid",
            "https://domain.invalid ",
            " https://domain.invalid ",
            "https://domain.invalid\n",
            "http://domain.invalid",
            "file:///etc/hosts",
            "domain.invalid",
            "",
        ] {
            assert!(
                matches!(AppId::new(value), Err(U2fError::InvalidArgument(_))),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_http_rejected_https_accepted() {
        assert!(matches!(
            AppId::new("http://example.invalid"),
            Err(U2fError::InvalidArgument(_))
        ));
        assert!(AppId::new("https://example.invalid").is_ok());
    }

    #[test]
    fn test_equality_is_exact_string_match() {
        let app_id = AppId::new("https://gateway.invalid/u2f/app-id").unwrap();
        assert_eq!(app_id, "https://gateway.invalid/u2f/app-id");
        assert_eq!(app_id, "https://gateway.invalid/u2f/app-id".to_string());
        assert_ne!(app_id, "https://gateway.invalid/u2f/app-id/");
        assert_ne!(app_id, "https://GATEWAY.invalid/u2f/app-id");
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let app_id: AppId = serde_json::from_str("\"https://domain.invalid\"").unwrap();
        assert_eq!(app_id, "https://domain.invalid");
        assert_eq!(
            serde_json::to_string(&app_id).unwrap(),
            "\"https://domain.invalid\""
        );

        assert!(serde_json::from_str::<AppId>("\"http://domain.invalid\"").is_err());
    }
}
