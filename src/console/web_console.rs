use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::console_page::ConsolePage;
use super::selectors as sel;
use crate::driver::{BrowserDriver, Condition, DriverInstance, ElementRef, Locator, Scope, Waiter};
use crate::error::DriverError;

/// Vendor console driven through a real browser
pub struct WebConsole {
    driver: DriverInstance,
    base_url: String,
    waiter: Waiter,
    alert_waiter: Waiter,
}

impl WebConsole {
    pub fn new(driver: DriverInstance, base_url: &str, waiter: Waiter, alert_waiter: Waiter) -> Self {
        Self {
            driver,
            base_url: base_url.trim_end_matches('/').to_string(),
            waiter,
            alert_waiter,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    async fn wait_for(&self, locator: &Locator, condition: Condition) -> Result<ElementRef, DriverError> {
        self.waiter
            .element(self.driver(), &Scope::Document, locator, condition)
            .await
    }

    async fn type_into(&self, locator: &Locator, text: &str) -> Result<()> {
        let field = self
            .wait_for(locator, Condition::Present)
            .await
            .with_context(|| format!("Input {} did not appear", locator))?;
        self.driver().clear(&field).await?;
        self.driver().send_keys(&field, text).await?;
        Ok(())
    }

    async fn press(&self, locator: &Locator) -> Result<()> {
        let button = self
            .wait_for(locator, Condition::Clickable)
            .await
            .with_context(|| format!("Control {} is not clickable", locator))?;
        self.driver().click(&button).await?;
        Ok(())
    }

    /// Close an overlay through the button inside its shadow root
    async fn close_modal(&self, modal: &ElementRef) -> Result<()> {
        let scope = match self.driver().shadow_root(modal).await? {
            Some(root) => Scope::Shadow(root),
            None => Scope::Element(modal.clone()),
        };

        let close = self
            .driver()
            .find_all(&scope, &sel::MODAL_CLOSE)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(sel::MODAL_CLOSE.to_string()))?;

        self.driver()
            .execute(sel::SCRIPT_CLICK, vec![close.to_json()])
            .await?;

        self.waiter
            .gone(self.driver(), &Scope::Document, &sel::VISIBLE_MODAL)
            .await
            .context("Application detail did not close")?;
        Ok(())
    }
}

async fn signed_in(driver: &dyn BrowserDriver) -> Result<Option<()>, DriverError> {
    let url = driver.current_url().await?;
    Ok((!url.contains(sel::SIGN_IN_PATH_MARKER)).then_some(()))
}

#[async_trait::async_trait]
impl ConsolePage for WebConsole {
    async fn submit_identity(&self, email: &str) -> Result<()> {
        self.driver().delete_all_cookies().await?;
        self.driver().navigate(&self.url("/")).await?;
        if let Err(e) = self.driver().maximize_window().await {
            debug!("Window could not be maximized: {}", e);
        }

        self.type_into(&sel::EMAIL_FIELD, email).await?;
        self.press(&sel::CONTINUE_BUTTON).await
    }

    async fn submit_password(&self, password: &str) -> Result<()> {
        self.type_into(&sel::PASSWORD_FIELD, password).await?;
        self.press(&sel::SIGN_IN_BUTTON).await
    }

    async fn submit_one_time_code(&self, code: &str) -> Result<()> {
        self.type_into(&sel::OTP_FIELD, code).await?;
        self.press(&sel::OTP_SUBMIT_BUTTON).await
    }

    async fn await_landing(&self) -> Result<()> {
        let driver = self.driver();
        self.waiter
            .until("authenticated landing page", || signed_in(driver))
            .await?;
        Ok(())
    }

    async fn account_labels(&self) -> Result<Vec<String>> {
        self.driver().navigate(&self.url(sel::ACCOUNT_SWITCHER_PATH)).await?;

        let list = self
            .wait_for(&sel::ACCOUNT_LIST, Condition::Present)
            .await
            .context("Account switcher did not load")?;
        let entries = self
            .waiter
            .elements(self.driver(), &Scope::Element(list), &sel::ACCOUNT_ENTRY)
            .await
            .context("Account switcher list stayed empty")?;
        info!("Found {} accounts in the switcher", entries.len());

        let mut labels = Vec::with_capacity(entries.len());
        for entry in entries {
            let label = self
                .driver()
                .find_all(&Scope::Element(entry), &sel::ACCOUNT_LABEL)
                .await?;
            let text = match label.first() {
                Some(label) => self.driver().text(label).await?,
                None => String::new(),
            };
            labels.push(text);
        }
        Ok(labels)
    }

    async fn choose_account(&self, index: usize) -> Result<()> {
        let list = self
            .wait_for(&sel::ACCOUNT_LIST, Condition::Present)
            .await
            .context("Account switcher did not load")?;
        let entries = self
            .driver()
            .find_all(&Scope::Element(list), &sel::ACCOUNT_ENTRY)
            .await?;
        let entry = entries
            .get(index)
            .with_context(|| format!("Account entry {} is no longer listed", index))?;

        let selector = self
            .waiter
            .element(
                self.driver(),
                &Scope::Element(entry.clone()),
                &sel::ACCOUNT_SELECTOR,
                Condition::Clickable,
            )
            .await?;
        self.driver().click(&selector).await?;
        Ok(())
    }

    async fn confirm_account_choice(&self) -> Result<bool> {
        match self.wait_for(&sel::ACCOUNT_SUBMIT, Condition::Clickable).await {
            Ok(button) => {
                self.driver().click(&button).await?;
                Ok(true)
            }
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_developer_console(&self) -> Result<()> {
        self.driver().navigate(&self.url(sel::DEVELOPER_CONSOLE_PATH)).await?;
        Ok(())
    }

    async fn developer_profile_incomplete(&self) -> Result<bool> {
        match self
            .alert_waiter
            .element(self.driver(), &Scope::Document, &sel::PROFILE_ALERT, Condition::Present)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn await_application_table(&self) -> Result<()> {
        self.wait_for(&sel::APPLICATION_TABLE, Condition::Visible)
            .await
            .context("Application table did not load")?;
        Ok(())
    }

    async fn dismiss_overlay(&self) -> Result<()> {
        let open = self
            .driver()
            .find_all(&Scope::Document, &sel::VISIBLE_MODAL)
            .await?;
        if let Some(modal) = open.first() {
            self.close_modal(modal).await?;
            debug!("Closed leftover application detail");
        }
        Ok(())
    }

    async fn open_application(&self, row: usize) -> Result<()> {
        self.press(&sel::view_link(row)).await?;
        self.wait_for(&sel::OPEN_MODAL, Condition::Visible)
            .await
            .with_context(|| format!("Detail view of row {} did not open", row))?;
        Ok(())
    }

    async fn displayed_client_id(&self) -> Result<Option<String>> {
        let input = self.wait_for(&sel::CLIENT_ID_INPUT, Condition::Visible).await?;
        Ok(self
            .driver()
            .attribute(&input, "value")
            .await?
            .filter(|v| !v.trim().is_empty()))
    }

    async fn close_application(&self) -> Result<()> {
        let open = self
            .driver()
            .find_all(&Scope::Document, &sel::OPEN_MODAL)
            .await?;
        match open.first() {
            Some(modal) => self.close_modal(modal).await,
            None => Ok(()),
        }
    }

    async fn reveal_secret(&self) -> Result<()> {
        self.wait_for(&sel::VISIBLE_MODAL, Condition::Present).await?;
        let host = self
            .wait_for(&sel::SECRET_EXPANDER, Condition::Present)
            .await
            .context("Credentials section not found")?;

        let root = self
            .driver()
            .shadow_root(&host)
            .await?
            .ok_or_else(|| DriverError::MissingShadowRoot(sel::SECRET_EXPANDER.to_string()))?;

        let toggle = self
            .waiter
            .element(
                self.driver(),
                &Scope::Shadow(root),
                &sel::EXPANDER_TOGGLE,
                Condition::Present,
            )
            .await?;
        self.driver().click(&toggle).await?;
        Ok(())
    }

    async fn secret_value(&self) -> Result<Option<String>> {
        self.wait_for(&sel::VISIBLE_MODAL, Condition::Present).await?;
        let input = self.wait_for(&sel::SECRET_INPUT, Condition::Present).await?;
        Ok(self
            .driver()
            .attribute(&input, "value")
            .await?
            .filter(|v| !v.trim().is_empty()))
    }

    async fn expiration_text(&self) -> Result<Option<String>> {
        let modal = self.wait_for(&sel::VISIBLE_MODAL, Condition::Present).await?;
        let notice = self
            .waiter
            .element(
                self.driver(),
                &Scope::Element(modal),
                &sel::EXPIRATION_NOTICE,
                Condition::Present,
            )
            .await?;
        let text = self.driver().text(&notice).await?;
        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }

    async fn request_renewal(&self) -> Result<()> {
        self.wait_for(&sel::VISIBLE_MODAL, Condition::Present).await?;
        self.press(&sel::RENEW_BUTTON).await
    }

    async fn confirm_renewal(&self) -> Result<()> {
        let button = self
            .wait_for(&sel::CONFIRM_BUTTON, Condition::Visible)
            .await
            .context("Renewal confirmation did not appear")?;
        self.driver().click(&button).await?;
        Ok(())
    }

    async fn acknowledge_renewal(&self) -> Result<()> {
        self.press(&sel::DONE_BUTTON).await
    }

    async fn close(&self) -> Result<()> {
        if let Err(e) = self.driver().quit().await {
            warn!("Browser did not shut down cleanly: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
