//! Authenticated console session shared by every account in a run

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Credentials;
use crate::console::{ConsoleInstance, ConsolePage, WebConsole};
use crate::context::RunContext;
use crate::driver::{capabilities, BrowserDriver, BrowserType, WebDriverClient};
use crate::error::{LoginStep, SessionError};
use crate::otp::{self, OtpSecret};

/// Owns the console for the whole run; close it on every exit path
pub struct Session {
    console: ConsoleInstance,
}

impl Session {
    pub fn new(console: ConsoleInstance) -> Self {
        Self { console }
    }

    pub fn console(&self) -> &dyn ConsolePage {
        self.console.as_ref()
    }

    /// Release the browser
    pub async fn close(self) -> Result<()> {
        self.console.close().await
    }
}

/// Start a browser session against the configured WebDriver server
pub async fn establish(ctx: &RunContext) -> Result<Session, SessionError> {
    let console_config = &ctx.config.console;
    let browser: BrowserType = console_config.browser.parse().unwrap_or_else(|e| {
        warn!("{}; falling back to chrome", e);
        BrowserType::Chrome
    });

    let client = WebDriverClient::connect(
        &console_config.webdriver_url,
        capabilities(browser, console_config.headless),
        ctx.config.waits.request_timeout(),
    )
    .await
    .map_err(|source| SessionError::Establish {
        endpoint: console_config.webdriver_url.clone(),
        source,
    })?;

    info!(
        "Started {} session {} at {}",
        client.driver_name(),
        client.session_id(),
        console_config.webdriver_url
    );

    let console = WebConsole::new(
        Box::new(client),
        &console_config.base_url,
        ctx.waiter(),
        ctx.alert_waiter(),
    );
    Ok(Session::new(Box::new(console)))
}

fn login_error(step: LoginStep) -> impl FnOnce(anyhow::Error) -> SessionError {
    move |source| SessionError::Login { step, source }
}

/// Sign in with email, password and a freshly computed one-time code
pub async fn login(session: &Session, credentials: &Credentials) -> Result<(), SessionError> {
    let console = session.console();
    info!("Logging into the console as {}", credentials.email);

    let secret = credentials
        .otp_secret
        .parse::<OtpSecret>()
        .map_err(anyhow::Error::new)
        .map_err(login_error(LoginStep::OneTimeCode))?;

    console
        .submit_identity(&credentials.email)
        .await
        .map_err(login_error(LoginStep::Identity))?;

    console
        .submit_password(&credentials.password)
        .await
        .map_err(login_error(LoginStep::Password))?;

    // Computed right before submission so the code is not near the end of its window
    let code = otp::totp_now(&secret)
        .map_err(anyhow::Error::new)
        .map_err(login_error(LoginStep::OneTimeCode))?;
    console
        .submit_one_time_code(&code)
        .await
        .map_err(login_error(LoginStep::OneTimeCode))?;

    console
        .await_landing()
        .await
        .map_err(login_error(LoginStep::Landing))?;

    info!("Logged into the console successfully");
    Ok(())
}

/// Index of the switcher entry whose label equals `account_name`, ignoring case
/// and surrounding whitespace
pub fn match_account(labels: &[String], account_name: &str) -> Option<usize> {
    let wanted = account_name.trim().to_lowercase();
    labels
        .iter()
        .position(|label| label.trim().to_lowercase() == wanted)
}

/// Switch the console to `account_name`; `false` when it is not listed
pub async fn select_account(session: &Session, account_name: &str) -> Result<bool> {
    let console = session.console();
    info!("Selecting account: {}", account_name);

    let labels = console
        .account_labels()
        .await
        .context("Failed to load the account switcher")?;

    let Some(index) = match_account(&labels, account_name) else {
        warn!(
            "Account {} not found among {} listed accounts",
            account_name,
            labels.len()
        );
        return Ok(false);
    };

    console
        .choose_account(index)
        .await
        .with_context(|| format!("Failed to choose account {}", account_name))?;

    if console.confirm_account_choice().await? {
        info!("Account {} selected and submitted", account_name);
    } else {
        info!("Account {} selected (no submit control shown)", account_name);
    }
    Ok(true)
}
