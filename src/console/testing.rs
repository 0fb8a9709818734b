//! Scripted in-memory console for workflow tests

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::console_page::ConsolePage;

/// Renewal dialog steps that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalFault {
    Request,
    Confirm,
    Acknowledge,
}

/// What the fake console shows and what the workflow did to it
#[derive(Debug, Default)]
pub struct ConsoleScript {
    pub login_fails_at: Option<&'static str>,
    pub submitted_codes: Vec<String>,
    pub landed: bool,

    pub account_labels: Vec<String>,
    pub has_confirm_control: bool,
    pub chosen_account: Option<usize>,

    pub profile_incomplete: bool,
    /// Client ids per application row, row 1 first
    pub applications: Vec<String>,
    pub broken_rows: HashSet<usize>,
    pub opened_rows: Vec<usize>,
    pub open_row: Option<usize>,
    pub revealed: bool,
    pub reveal_fails: bool,

    pub secret: Option<String>,
    pub expiration_text: Option<String>,
    /// Secret and expiration text shown once a renewal completes
    pub renewed: Option<(String, String)>,
    pub renewal_fault: Option<RenewalFault>,
    pub renewal_requested: bool,
    pub renewal_confirmed: bool,
    pub renewals: usize,

    pub closed: bool,
}

/// `ConsolePage` backed by a shared `ConsoleScript`
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    script: Arc<Mutex<ConsoleScript>>,
}

impl ScriptedConsole {
    pub fn new(script: ConsoleScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, ConsoleScript> {
        self.script.lock().unwrap()
    }

    /// Console with a single application and a current secret
    pub fn with_application(labels: &[&str], applications: &[&str], secret: &str, expiration: &str) -> Self {
        Self::new(ConsoleScript {
            account_labels: labels.iter().map(|s| s.to_string()).collect(),
            has_confirm_control: true,
            applications: applications.iter().map(|s| s.to_string()).collect(),
            secret: Some(secret.to_string()),
            expiration_text: Some(format!("Expires: {}", expiration)),
            ..ConsoleScript::default()
        })
    }

    fn step(&self, name: &'static str) -> Result<MutexGuard<'_, ConsoleScript>> {
        let script = self.script();
        if script.login_fails_at == Some(name) {
            bail!("{} page did not load", name);
        }
        Ok(script)
    }
}

#[async_trait::async_trait]
impl ConsolePage for ScriptedConsole {
    async fn submit_identity(&self, _email: &str) -> Result<()> {
        drop(self.step("identity")?);
        Ok(())
    }

    async fn submit_password(&self, _password: &str) -> Result<()> {
        drop(self.step("password")?);
        Ok(())
    }

    async fn submit_one_time_code(&self, code: &str) -> Result<()> {
        self.step("otp")?.submitted_codes.push(code.to_string());
        Ok(())
    }

    async fn await_landing(&self) -> Result<()> {
        self.step("landing")?.landed = true;
        Ok(())
    }

    async fn account_labels(&self) -> Result<Vec<String>> {
        Ok(self.script().account_labels.clone())
    }

    async fn choose_account(&self, index: usize) -> Result<()> {
        let mut script = self.script();
        if index >= script.account_labels.len() {
            bail!("Account entry {} is no longer listed", index);
        }
        script.chosen_account = Some(index);
        Ok(())
    }

    async fn confirm_account_choice(&self) -> Result<bool> {
        Ok(self.script().has_confirm_control)
    }

    async fn open_developer_console(&self) -> Result<()> {
        let mut script = self.script();
        script.open_row = None;
        script.revealed = false;
        Ok(())
    }

    async fn developer_profile_incomplete(&self) -> Result<bool> {
        Ok(self.script().profile_incomplete)
    }

    async fn await_application_table(&self) -> Result<()> {
        if self.script().profile_incomplete {
            bail!("Application table did not load");
        }
        Ok(())
    }

    async fn dismiss_overlay(&self) -> Result<()> {
        let mut script = self.script();
        script.open_row = None;
        script.revealed = false;
        Ok(())
    }

    async fn open_application(&self, row: usize) -> Result<()> {
        let mut script = self.script();
        script.opened_rows.push(row);
        if script.broken_rows.contains(&row) {
            bail!("Detail view of row {} did not open", row);
        }
        if row == 0 || row > script.applications.len() {
            bail!("Control for row {} is not clickable", row);
        }
        script.open_row = Some(row);
        Ok(())
    }

    async fn displayed_client_id(&self) -> Result<Option<String>> {
        let script = self.script();
        let row = match script.open_row {
            Some(row) => row,
            None => bail!("No application detail is open"),
        };
        Ok(script.applications.get(row - 1).cloned())
    }

    async fn close_application(&self) -> Result<()> {
        let mut script = self.script();
        script.open_row = None;
        script.revealed = false;
        Ok(())
    }

    async fn reveal_secret(&self) -> Result<()> {
        let mut script = self.script();
        if script.reveal_fails {
            bail!("Credentials section not found");
        }
        if script.open_row.is_none() {
            bail!("No application detail is open");
        }
        script.revealed = true;
        Ok(())
    }

    async fn secret_value(&self) -> Result<Option<String>> {
        let script = self.script();
        if !script.revealed {
            return Ok(None);
        }
        Ok(script.secret.clone())
    }

    async fn expiration_text(&self) -> Result<Option<String>> {
        let script = self.script();
        if script.open_row.is_none() {
            bail!("No application detail is open");
        }
        Ok(script.expiration_text.clone())
    }

    async fn request_renewal(&self) -> Result<()> {
        let mut script = self.script();
        if script.renewal_fault == Some(RenewalFault::Request) {
            bail!("Control kat-button.footerLeftButton is not clickable");
        }
        script.renewal_requested = true;
        Ok(())
    }

    async fn confirm_renewal(&self) -> Result<()> {
        let mut script = self.script();
        if script.renewal_fault == Some(RenewalFault::Confirm) || !script.renewal_requested {
            bail!("Renewal confirmation did not appear");
        }
        script.renewal_confirmed = true;
        Ok(())
    }

    async fn acknowledge_renewal(&self) -> Result<()> {
        let mut script = self.script();
        if script.renewal_fault == Some(RenewalFault::Acknowledge) || !script.renewal_confirmed {
            bail!("Control kat-button.footerRightButton is not clickable");
        }
        if let Some((secret, expiration)) = script.renewed.clone() {
            script.secret = Some(secret);
            script.expiration_text = Some(format!("Expires: {}", expiration));
        }
        script.renewal_requested = false;
        script.renewal_confirmed = false;
        script.renewals += 1;
        script.open_row = None;
        script.revealed = false;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.script().closed = true;
        Ok(())
    }
}
