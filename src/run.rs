//! Sequential per-account loop

use std::collections::HashSet;
use std::fmt;
use tracing::{error, info, info_span, warn, Instrument};

use crate::accounts::AccountRecord;
use crate::context::RunContext;
use crate::report::{RenewalStatus, ReportBuilder};
use crate::rotation::{AccountOutcome, RotationEngine, SkipReason};
use crate::session::{self, Session};

/// Account that contributed no report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAccount {
    pub account_name: String,
    pub client_identifier: String,
    pub reason: SkipReason,
}

/// Tally of a run, printed once every account has been processed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub renewed: usize,
    pub unchanged: usize,
    pub due: usize,
    pub advisory: usize,
    pub missing_data: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedAccount>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &AccountOutcome) {
        match outcome {
            AccountOutcome::Recorded(row) => match row.status {
                RenewalStatus::Renewed => self.renewed += 1,
                RenewalStatus::NotNeeded => self.unchanged += 1,
                RenewalStatus::DueDryRun => self.due += 1,
                RenewalStatus::DeveloperProfileIncomplete => self.advisory += 1,
                RenewalStatus::MissingData => self.missing_data += 1,
                RenewalStatus::RenewalFailed { .. } => self.failed += 1,
            },
            AccountOutcome::Skipped {
                account_name,
                client_identifier,
                reason,
            } => self.skipped.push(SkippedAccount {
                account_name: account_name.clone(),
                client_identifier: client_identifier.clone(),
                reason: reason.clone(),
            }),
        }
    }

    pub fn processed(&self) -> usize {
        self.renewed + self.unchanged + self.due + self.advisory + self.missing_data + self.failed + self.skipped.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed {} account(s)", self.processed())?;
        writeln!(f, "  Renewed:            {}", self.renewed)?;
        writeln!(f, "  No renewal needed:  {}", self.unchanged)?;
        if self.due > 0 {
            writeln!(f, "  Due (dry run):      {}", self.due)?;
        }
        writeln!(f, "  Developer Profile:  {}", self.advisory)?;
        writeln!(f, "  Missing data:       {}", self.missing_data)?;
        writeln!(f, "  Failed:             {}", self.failed)?;
        write!(f, "  Skipped:            {}", self.skipped.len())?;
        for skipped in &self.skipped {
            write!(
                f,
                "\n    - {} ({}): {}",
                skipped.account_name, skipped.client_identifier, skipped.reason
            )?;
        }
        Ok(())
    }
}

/// Process every account in order, appending at most one row per account
pub async fn process_accounts(
    ctx: &RunContext,
    session: &Session,
    engine: &RotationEngine,
    accounts: &[AccountRecord],
    report: &mut ReportBuilder,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut seen = HashSet::new();

    for account in accounts {
        let span = info_span!(
            parent: ctx.span(),
            "account",
            name = %account.name,
            client_id = %account.client_identifier
        );

        let outcome = process_account(ctx, session, engine, account, &mut seen)
            .instrument(span)
            .await;

        summary.record(&outcome);
        match outcome {
            AccountOutcome::Recorded(row) => report.append(row),
            AccountOutcome::Skipped { reason, .. } => {
                warn!("Skipped {}: {}", account.name, reason)
            }
        }
    }

    info!(
        "Run finished: {} renewed, {} failed, {} skipped",
        summary.renewed,
        summary.failed,
        summary.skipped.len()
    );
    summary
}

async fn process_account(
    ctx: &RunContext,
    session: &Session,
    engine: &RotationEngine,
    account: &AccountRecord,
    seen: &mut HashSet<String>,
) -> AccountOutcome {
    info!("Processing account {}", account.name);

    if !seen.insert(account.client_identifier.clone()) {
        return AccountOutcome::skipped(account, SkipReason::DuplicateClientId);
    }

    match session::select_account(session, &account.name).await {
        Ok(true) => {}
        Ok(false) => return AccountOutcome::skipped(account, SkipReason::AccountNotFound),
        Err(e) => {
            error!("Error selecting account {}: {:#}", account.name, e);
            return AccountOutcome::skipped(account, SkipReason::SelectionFailed(format!("{:#}", e)));
        }
    }

    engine.process(ctx, session.console(), account).await
}
