//! Reads the client secret and its expiration from an open application detail

use chrono::NaiveDate;
use tracing::{error, info};

use crate::console::ConsolePage;

/// Point-in-time read of an application's credential
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretSnapshot {
    pub secret_value: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

impl SecretSnapshot {
    pub fn is_complete(&self) -> bool {
        self.secret_value.is_some() && self.expiration_date.is_some()
    }
}

impl std::fmt::Debug for SecretSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSnapshot")
            .field("secret_value", &self.secret_value.as_deref().map(mask_secret))
            .field("expiration_date", &self.expiration_date)
            .finish()
    }
}

/// Log-safe form of a secret: only the last four characters survive
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Date out of an expiration notice such as `Expires: 2025-06-01T10:00:00Z`.
///
/// The date is taken after the first `:` label separator (when there is one)
/// and before any time-of-day suffix.
pub fn parse_expiration(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let after_label = match text.split_once(':') {
        Some((label, rest)) if !label.trim_start().starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => text,
    };

    let token = after_label
        .trim()
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()?;

    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Extracts `SecretSnapshot`s; the secret must already be revealed
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretInspector;

impl SecretInspector {
    pub async fn extract(&self, console: &dyn ConsolePage) -> SecretSnapshot {
        info!("Reading client secret...");
        let secret_value = match console.secret_value().await {
            Ok(Some(secret)) => {
                info!("Client secret read: {}", mask_secret(&secret));
                Some(secret)
            }
            Ok(None) => {
                error!("Client secret is empty");
                None
            }
            Err(e) => {
                error!("Failed to read client secret: {:#}", e);
                None
            }
        };

        let expiration_date = match console.expiration_text().await {
            Ok(Some(text)) => {
                let parsed = parse_expiration(&text);
                match parsed {
                    Some(date) => info!("Expiration date: {}", date),
                    None => error!("Could not parse an expiration date from {:?}", text),
                }
                parsed
            }
            Ok(None) => {
                error!("Expiration date is empty");
                None
            }
            Err(e) => {
                error!("Failed to read expiration date: {:#}", e);
                None
            }
        };

        SecretSnapshot {
            secret_value,
            expiration_date,
        }
    }
}
