use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub console: ConsoleConfig,
    pub credentials: Credentials,
    pub paths: PathsConfig,
    #[serde(default)]
    pub accounts: AccountColumns,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub waits: WaitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub base_url: String,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_browser")]
    pub browser: String,
    #[serde(default)]
    pub headless: bool,
}

/// Console login; `Debug` keeps the password and OTP secret out of logs
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Base32 secret or `otpauth://` URI
    pub otp_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("otp_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub accounts_file: PathBuf,
    pub report_dir: PathBuf,
}

/// Where the account name and client id live in the input workbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountColumns {
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_client_id_column")]
    pub client_id_column: String,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Rotate when fewer than this many days remain
    #[serde(default = "default_threshold_days")]
    pub threshold_days: i64,
    /// Report cells turn red at or below this many days
    #[serde(default = "default_threshold_days")]
    pub flag_threshold_days: i64,
    /// Application rows scanned per account
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_alert_timeout_secs")]
    pub alert_timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_name_column() -> String {
    "A".to_string()
}

fn default_client_id_column() -> String {
    "C".to_string()
}

fn default_true() -> bool {
    true
}

fn default_threshold_days() -> i64 {
    30
}

fn default_max_candidates() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_alert_timeout_secs() -> u64 {
    3
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AccountColumns {
    fn default() -> Self {
        Self {
            name_column: default_name_column(),
            client_id_column: default_client_id_column(),
            has_header: true,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
            flag_threshold_days: default_threshold_days(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            alert_timeout_secs: default_alert_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let console = ConsoleConfig {
            base_url: std::env::var("CONSOLE_BASE_URL")
                .unwrap_or_else(|_| "https://vendorcentral.amazon.fr".to_string()),
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| default_webdriver_url()),
            browser: std::env::var("BROWSER").unwrap_or_else(|_| default_browser()),
            headless: std::env::var("BROWSER_HEADLESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        };

        let credentials = Credentials {
            email: std::env::var("CONSOLE_EMAIL")
                .context("CONSOLE_EMAIL environment variable not set")?,
            password: std::env::var("CONSOLE_PASSWORD")
                .context("CONSOLE_PASSWORD environment variable not set")?,
            otp_secret: std::env::var("CONSOLE_OTP_SECRET")
                .context("CONSOLE_OTP_SECRET environment variable not set")?,
        };

        let paths = PathsConfig {
            accounts_file: std::env::var("EXCEL_FILE_PATH")
                .context("EXCEL_FILE_PATH environment variable not set")?
                .into(),
            report_dir: std::env::var("REPORT_PATH")
                .context("REPORT_PATH environment variable not set")?
                .into(),
        };

        let threshold = std::env::var("ROTATION_THRESHOLD_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_threshold_days);

        let rotation = RotationConfig {
            threshold_days: threshold,
            ..RotationConfig::default()
        };

        Ok(Self {
            console,
            credentials,
            paths,
            accounts: AccountColumns::default(),
            rotation,
            waits: WaitConfig::default(),
        })
    }

    /// Placeholder configuration, written by `init`
    pub fn sample() -> Self {
        Self {
            console: ConsoleConfig {
                base_url: "https://vendorcentral.amazon.fr".to_string(),
                webdriver_url: default_webdriver_url(),
                browser: default_browser(),
                headless: false,
            },
            credentials: Credentials {
                email: "you@example.com".to_string(),
                password: "your-password-here".to_string(),
                otp_secret: "YOUR-BASE32-OTP-SECRET".to_string(),
            },
            paths: PathsConfig {
                accounts_file: PathBuf::from("accounts.xlsx"),
                report_dir: PathBuf::from("reports"),
            },
            accounts: AccountColumns::default(),
            rotation: RotationConfig::default(),
            waits: WaitConfig::default(),
        }
    }

    /// Create a sample configuration file
    pub fn create_sample<P: AsRef<Path>>(path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(&Self::sample()).context("Failed to serialize sample config")?;
        fs::write(path.as_ref(), toml_string)
            .with_context(|| format!("Failed to write sample config to {:?}", path.as_ref()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("rotator.toml");
        Config::create_sample(&path)?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.console.webdriver_url, "http://localhost:9515");
        assert_eq!(config.rotation.threshold_days, 30);
        assert_eq!(config.rotation.max_candidates, 4);
        assert_eq!(config.accounts.client_id_column, "C");
        Ok(())
    }

    #[test]
    fn test_defaults_fill_missing_sections() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [console]
            base_url = "https://console.example.com"

            [credentials]
            email = "ops@example.com"
            password = "hunter2"
            otp_secret = "GEZDGNBVGY3TQOJQ"

            [paths]
            accounts_file = "in.xlsx"
            report_dir = "out"

            [waits]
            timeout_secs = 5
            "#,
        )?;

        assert_eq!(config.console.browser, "chrome");
        assert!(!config.console.headless);
        assert!(config.accounts.has_header);
        assert_eq!(config.rotation.flag_threshold_days, 30);
        assert_eq!(config.waits.timeout(), Duration::from_secs(5));
        assert_eq!(config.waits.poll_interval(), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", Config::sample().credentials);
        assert!(debug.contains("you@example.com"));
        assert!(!debug.contains("your-password-here"));
        assert!(!debug.contains("YOUR-BASE32-OTP-SECRET"));
    }
}
