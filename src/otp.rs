//! Time-based one-time codes for the console's second login factor
//!
//! Standard TOTP: HMAC-SHA1, 30 second step, 6 digits.

use chrono::Utc;
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha1::Sha1;
use std::str::FromStr;

use crate::error::OtpError;

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// Decoded shared secret
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret {
    key: Vec<u8>,
}

impl std::fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpSecret(<redacted>)")
    }
}

impl OtpSecret {
    /// Decode a base32 secret, tolerating spaces, lowercase and padding
    pub fn from_base32(encoded: &str) -> Result<Self, OtpError> {
        let cleaned: String = encoded
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=' && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if cleaned.is_empty() {
            return Err(OtpError::Empty);
        }

        let key = BASE32_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|_| OtpError::InvalidBase32)?;

        if key.is_empty() {
            return Err(OtpError::Empty);
        }

        Ok(Self { key })
    }

    /// Extract the secret from an `otpauth://totp/...` enrolment URI
    pub fn from_uri(uri: &str) -> Result<Self, OtpError> {
        let url = Url::parse(uri).map_err(|e| OtpError::InvalidUri(e.to_string()))?;
        if url.scheme() != "otpauth" {
            return Err(OtpError::InvalidUri(format!(
                "unexpected scheme {}",
                url.scheme()
            )));
        }

        let secret = url
            .query_pairs()
            .find(|(key, _)| key == "secret")
            .map(|(_, value)| value.into_owned())
            .ok_or(OtpError::MissingSecret)?;

        Self::from_base32(&secret)
    }
}

impl FromStr for OtpSecret {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("otpauth://") {
            Self::from_uri(trimmed)
        } else {
            Self::from_base32(trimmed)
        }
    }
}

/// Code valid at the given unix time
pub fn totp_at(secret: &OtpSecret, unix_seconds: u64) -> Result<String, OtpError> {
    let counter = unix_seconds / STEP_SECONDS;

    let mut mac = HmacSha1::new_from_slice(&secret.key).map_err(|_| OtpError::Empty)?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = ((hash[offset] as u32 & 0x7f) << 24)
        | ((hash[offset + 1] as u32) << 16)
        | ((hash[offset + 2] as u32) << 8)
        | (hash[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// Code valid right now
pub fn totp_now(secret: &OtpSecret) -> Result<String, OtpError> {
    totp_at(secret, unix_now())
}

/// Seconds until the code for `unix_seconds` expires
pub fn seconds_remaining(unix_seconds: u64) -> u64 {
    STEP_SECONDS - unix_seconds % STEP_SECONDS
}

pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
