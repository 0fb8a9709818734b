use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::accounts::AccountRecord;
use crate::console::ConsolePage;
use crate::context::RunContext;
use crate::driver::RetryPolicy;
use crate::inspector::{mask_secret, SecretInspector, SecretSnapshot};
use crate::locator::ApplicationLocator;
use crate::report::OutcomeRow;

/// Whole days from `today` until `expiration`; negative once expired
pub fn days_until_expiration(expiration: NaiveDate, today: NaiveDate) -> i64 {
    (expiration - today).num_days()
}

/// Check if a secret is close enough to expiry to be renewed
pub fn needs_rotation(days_until_expiration: i64, threshold_days: i64) -> bool {
    days_until_expiration < threshold_days
}

/// Why an account produced no report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AccountNotFound,
    SelectionFailed(String),
    ApplicationNotFound,
    LookupFailed(String),
    DuplicateClientId,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AccountNotFound => f.write_str("account not listed in the account switcher"),
            SkipReason::SelectionFailed(cause) => write!(f, "account selection failed: {}", cause),
            SkipReason::ApplicationNotFound => f.write_str("no application with this client id"),
            SkipReason::LookupFailed(cause) => write!(f, "lookup failed: {}", cause),
            SkipReason::DuplicateClientId => f.write_str("client id already processed in this run"),
        }
    }
}

/// Result of processing one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Recorded(OutcomeRow),
    Skipped {
        account_name: String,
        client_identifier: String,
        reason: SkipReason,
    },
}

impl AccountOutcome {
    pub fn skipped(account: &AccountRecord, reason: SkipReason) -> Self {
        AccountOutcome::Skipped {
            account_name: account.name.clone(),
            client_identifier: account.client_identifier.clone(),
            reason,
        }
    }
}

/// Step of the renewal sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    Renew,
    Confirm,
    Done,
    Reinspect,
    Verify,
}

impl std::fmt::Display for RotationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RotationStep::Renew => "renew",
            RotationStep::Confirm => "confirm",
            RotationStep::Done => "done",
            RotationStep::Reinspect => "re-inspection",
            RotationStep::Verify => "verification",
        };
        f.write_str(name)
    }
}

struct RotationFailure {
    step: RotationStep,
    cause: anyhow::Error,
}

fn at_step(step: RotationStep) -> impl FnOnce(anyhow::Error) -> RotationFailure {
    move |cause| RotationFailure { step, cause }
}

/// Drives one account from the developer console to a recorded outcome
#[derive(Debug, Clone)]
pub struct RotationEngine {
    locator: ApplicationLocator,
    inspector: SecretInspector,
    threshold_days: i64,
    retry: RetryPolicy,
    dry_run: bool,
}

impl RotationEngine {
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            locator: ApplicationLocator::new(ctx.config.rotation.max_candidates),
            inspector: SecretInspector,
            threshold_days: ctx.config.rotation.threshold_days,
            retry: ctx.retry_policy(),
            dry_run: ctx.dry_run,
        }
    }

    /// Process an account whose console is already selected. Never fails:
    /// unexpected errors become a skip with the cause attached.
    pub async fn process(
        &self,
        ctx: &RunContext,
        console: &dyn ConsolePage,
        account: &AccountRecord,
    ) -> AccountOutcome {
        match self.try_process(ctx, console, account).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error processing account {}: {:#}", account.name, e);
                AccountOutcome::skipped(account, SkipReason::LookupFailed(format!("{:#}", e)))
            }
        }
    }

    async fn try_process(
        &self,
        ctx: &RunContext,
        console: &dyn ConsolePage,
        account: &AccountRecord,
    ) -> Result<AccountOutcome> {
        console
            .open_developer_console()
            .await
            .context("Failed to open the developer console")?;

        if console.developer_profile_incomplete().await? {
            warn!("{} has not completed their Developer Profile", account.name);
            return Ok(AccountOutcome::Recorded(OutcomeRow::developer_profile_incomplete(account)));
        }

        if self
            .locator
            .scan(console, &account.client_identifier)
            .await?
            .is_none()
        {
            return Ok(AccountOutcome::skipped(account, SkipReason::ApplicationNotFound));
        }

        let current = self.inspector.extract(console).await;
        let (Some(secret), Some(expiration)) = (&current.secret_value, current.expiration_date) else {
            warn!("Missing secret or expiration date for {}", account.name);
            return Ok(AccountOutcome::Recorded(OutcomeRow::missing_data(account, &current, ctx.today)));
        };

        let days = days_until_expiration(expiration, ctx.today);
        info!(
            "Secret {} expires on {} ({} days left)",
            mask_secret(secret),
            expiration,
            days
        );

        if !needs_rotation(days, self.threshold_days) {
            info!("No renewal needed for {}", account.name);
            return Ok(AccountOutcome::Recorded(OutcomeRow::not_needed(account, &current, ctx.today)));
        }

        if self.dry_run {
            info!("Renewal due for {} (dry run, not renewing)", account.name);
            return Ok(AccountOutcome::Recorded(OutcomeRow::due_dry_run(account, &current, ctx.today)));
        }

        let row = match self.rotate(console, account, expiration).await {
            Ok(renewed) => {
                info!("Renewed secret for {}", account.name);
                OutcomeRow::renewed(account, &current, &renewed, ctx.today)
            }
            Err(failure) => {
                error!(
                    "Renewal for {} failed at {}: {:#}",
                    account.name, failure.step, failure.cause
                );
                OutcomeRow::failed(account, &current, ctx.today, failure.step, format!("{:#}", failure.cause))
            }
        };
        Ok(AccountOutcome::Recorded(row))
    }

    /// Run the renewal dialog, then re-open the application and read the new
    /// credential back. The new expiration must be later than `current_expiration`.
    async fn rotate(
        &self,
        console: &dyn ConsolePage,
        account: &AccountRecord,
        current_expiration: NaiveDate,
    ) -> Result<SecretSnapshot, RotationFailure> {
        info!("Renewing client secret for {}", account.name);

        console
            .request_renewal()
            .await
            .map_err(at_step(RotationStep::Renew))?;
        console
            .confirm_renewal()
            .await
            .map_err(at_step(RotationStep::Confirm))?;
        console
            .acknowledge_renewal()
            .await
            .map_err(at_step(RotationStep::Done))?;

        let client_identifier = account.client_identifier.as_str();
        let this = self;
        let renewed = self
            .retry
            .run("Reading the renewed secret", move || {
                this.reinspect(console, client_identifier)
            })
            .await
            .map_err(at_step(RotationStep::Reinspect))?;

        verify_extended(current_expiration, &renewed).map_err(at_step(RotationStep::Verify))?;
        Ok(renewed)
    }

    async fn reinspect(&self, console: &dyn ConsolePage, client_identifier: &str) -> Result<SecretSnapshot> {
        self.locator
            .find(console, client_identifier)
            .await?
            .with_context(|| format!("Application {} is no longer listed", client_identifier))?;

        let snapshot = self.inspector.extract(console).await;
        ensure!(snapshot.is_complete(), "Renewed secret or expiration date is not readable");
        Ok(snapshot)
    }
}

fn verify_extended(current_expiration: NaiveDate, renewed: &SecretSnapshot) -> Result<()> {
    let new_expiration = renewed
        .expiration_date
        .context("Renewed expiration date is missing")?;
    ensure!(
        new_expiration > current_expiration,
        "new expiration {} is not later than {}",
        new_expiration,
        current_expiration
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::{RenewalFault, ScriptedConsole};
    use crate::context::tests::test_context;
    use crate::report::RenewalStatus;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn in_days(days: i64) -> String {
        (today() + Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    fn acme() -> AccountRecord {
        AccountRecord {
            name: "Acme".to_string(),
            client_identifier: "X123".to_string(),
        }
    }

    /// Console with Acme's application at row 2, expiring in `days`
    fn console(days: i64) -> ScriptedConsole {
        ScriptedConsole::with_application(&["Acme"], &["OTHER", "X123"], "S1", &in_days(days))
    }

    fn recorded(outcome: AccountOutcome) -> OutcomeRow {
        match outcome {
            AccountOutcome::Recorded(row) => row,
            other => panic!("expected a recorded row, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(needs_rotation(29, 30));
        assert!(!needs_rotation(30, 30));
        assert!(needs_rotation(-1, 30));
    }

    #[test]
    fn test_days_until_expiration() {
        assert_eq!(days_until_expiration(today() + Duration::days(10), today()), 10);
        assert_eq!(days_until_expiration(today() - Duration::days(3), today()), -3);
        assert_eq!(days_until_expiration(today(), today()), 0);
    }

    #[test]
    fn test_rotation_step_names() {
        assert_eq!(RotationStep::Confirm.to_string(), "confirm");
        assert_eq!(RotationStep::Verify.to_string(), "verification");
    }

    #[tokio::test]
    async fn test_renews_secret_close_to_expiry() {
        let ctx = test_context(today());
        let console = console(10);
        console.script().renewed = Some(("S2".to_string(), in_days(400)));

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert_eq!(row.status, RenewalStatus::Renewed);
        assert_eq!(row.current_secret.as_deref(), Some("S1"));
        assert_eq!(row.days_until_current_expiration, Some(10));
        assert_eq!(row.new_secret.as_deref(), Some("S2"));
        assert_eq!(row.new_expiration, Some(today() + Duration::days(400)));
        assert_eq!(row.days_until_new_expiration, Some(400));
        assert_ne!(row.days_until_new_expiration, Some(10));
        assert!(row.new_expiration > row.current_expiration);
        assert_eq!(console.script().renewals, 1);
    }

    #[tokio::test]
    async fn test_no_renewal_at_threshold() {
        let ctx = test_context(today());
        let console = console(30);

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert_eq!(row.status, RenewalStatus::NotNeeded);
        assert_eq!(row.days_until_current_expiration, Some(30));
        assert!(row.new_secret.is_none());
        assert!(row.new_expiration.is_none());
        assert_eq!(console.script().renewals, 0);
    }

    #[tokio::test]
    async fn test_renewal_fault_keeps_current_values() {
        let ctx = test_context(today());
        let console = console(5);
        console.script().renewal_fault = Some(RenewalFault::Confirm);

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert!(matches!(
            &row.status,
            RenewalStatus::RenewalFailed { step, .. } if step == "confirm"
        ));
        assert_eq!(row.current_secret.as_deref(), Some("S1"));
        assert_eq!(row.days_until_current_expiration, Some(5));
        assert!(row.new_secret.is_none());
        assert!(row.days_until_new_expiration.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_expiration_fails_verification() {
        let ctx = test_context(today());
        let console = console(5);
        console.script().renewed = Some(("S2".to_string(), in_days(5)));

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert!(matches!(
            &row.status,
            RenewalStatus::RenewalFailed { step, .. } if step == "verification"
        ));
        assert!(row.new_secret.is_none());
    }

    #[tokio::test]
    async fn test_developer_profile_advisory() {
        let ctx = test_context(today());
        let console = console(5);
        console.script().profile_incomplete = true;

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert_eq!(row.status, RenewalStatus::DeveloperProfileIncomplete);
        assert!(row.current_secret.is_none());
        assert!(row.days_until_current_expiration.is_none());
        assert!(console.script().opened_rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_expiration_is_recorded() {
        let ctx = test_context(today());
        let console = console(5);
        console.script().expiration_text = None;

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert_eq!(row.status, RenewalStatus::MissingData);
        assert_eq!(row.current_secret.as_deref(), Some("S1"));
        assert_eq!(console.script().renewals, 0);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_renew() {
        let mut ctx = test_context(today());
        ctx.dry_run = true;
        let console = console(3);

        let row = recorded(
            RotationEngine::from_context(&ctx)
                .process(&ctx, &console, &acme())
                .await,
        );

        assert_eq!(row.status, RenewalStatus::DueDryRun);
        assert!(!console.script().renewal_requested);
        assert_eq!(console.script().renewals, 0);
    }

    #[tokio::test]
    async fn test_unknown_application_is_skipped() {
        let ctx = test_context(today());
        let console = ScriptedConsole::with_application(&["Acme"], &["OTHER"], "S1", &in_days(5));

        let outcome = RotationEngine::from_context(&ctx)
            .process(&ctx, &console, &acme())
            .await;

        assert_eq!(outcome, AccountOutcome::skipped(&acme(), SkipReason::ApplicationNotFound));
    }
}
