//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a rejected device response apart from a
//! missing file or a broken verifier.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all), including fatal verifier faults.
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (invalid payload, rejected verification).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("Invalid AppId") || message.contains("U2F_APP_ID") {
            USAGE_ERROR
        } else if message.contains("verification failed")
            || message.contains("Invalid payload")
            || message.contains("Invalid request")
            || message.contains("Invalid response")
            || message.contains("Invalid registration")
        {
            VERIFICATION_FAILED
        } else if message.contains("Failed to write") || message.contains("serialize") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
