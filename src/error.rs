//! Typed errors for the browser driver, the console session and one-time codes
//!
//! Higher layers wrap these in `anyhow` with context; the types exist so the
//! wait loop can tell transient lookup failures from real ones and so the CLI
//! can report which login step broke.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the browser automation layer
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("WebDriver request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebDriver command failed with status {status} ({error}): {message}")]
    Command {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("No element matches {0}")]
    NoSuchElement(String),

    #[error("Element {0} has no shadow root")]
    MissingShadowRoot(String),

    #[error("Locator {0} cannot be resolved inside a shadow root")]
    UnsupportedLocator(String),

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),
}

impl DriverError {
    /// W3C error codes that a later poll may not reproduce
    const TRANSIENT_CODES: [&'static str; 4] = [
        "no such element",
        "stale element reference",
        "element not interactable",
        "element click intercepted",
    ];

    /// Whether a wait loop should keep polling after this error
    pub fn is_transient(&self) -> bool {
        match self {
            DriverError::NoSuchElement(_) => true,
            DriverError::Command { error, .. } => Self::TRANSIENT_CODES.contains(&error.as_str()),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// Login steps, used to report where an authentication attempt stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Identity,
    Password,
    OneTimeCode,
    Landing,
}

impl std::fmt::Display for LoginStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoginStep::Identity => "email submission",
            LoginStep::Password => "password submission",
            LoginStep::OneTimeCode => "one-time code submission",
            LoginStep::Landing => "authenticated landing page",
        };
        f.write_str(name)
    }
}

/// Fatal session failures; any of these aborts the whole run
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to start browser session at {endpoint}: {source}")]
    Establish {
        endpoint: String,
        #[source]
        source: DriverError,
    },

    #[error("Login failed during {step}: {source}")]
    Login {
        step: LoginStep,
        #[source]
        source: anyhow::Error,
    },
}

/// One-time code secret errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OtpError {
    #[error("OTP secret is empty")]
    Empty,

    #[error("OTP secret is not valid base32")]
    InvalidBase32,

    #[error("Invalid otpauth URI: {0}")]
    InvalidUri(String),

    #[error("otpauth URI has no secret parameter")]
    MissingSecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_command_errors() {
        let stale = DriverError::Command {
            status: 404,
            error: "stale element reference".to_string(),
            message: "element is gone".to_string(),
        };
        assert!(stale.is_transient());

        let session = DriverError::Command {
            status: 404,
            error: "invalid session id".to_string(),
            message: "session deleted".to_string(),
        };
        assert!(!session.is_transient());
    }

    #[test]
    fn test_timeout_is_not_transient() {
        let timeout = DriverError::Timeout {
            what: "#ap_email".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_transient());
        assert!(timeout.to_string().contains("#ap_email"));
    }

    #[test]
    fn test_login_error_names_step() {
        let err = SessionError::Login {
            step: LoginStep::OneTimeCode,
            source: anyhow::anyhow!("field missing"),
        };
        assert_eq!(
            err.to_string(),
            "Login failed during one-time code submission: field missing"
        );
    }
}
