//! CLI parsing and command execution
//!
//! This module handles command-line argument parsing and routes commands to the appropriate handlers.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn, Instrument};

use crate::accounts;
use crate::config::Config;
use crate::context::RunContext;
use crate::otp::{self, OtpSecret};
use crate::report::ReportBuilder;
use crate::rotation::RotationEngine;
use crate::run::{self, RunSummary};
use crate::session::{self, Session};

#[derive(Parser)]
#[command(name = "vsr")]
#[command(about = "Renews vendor API client secrets before they expire and reports on them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROTATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// WebDriver server URL (overrides config file)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Account workbook (overrides config file)
    #[arg(long)]
    pub accounts_file: Option<PathBuf>,

    /// Report output directory (overrides config file)
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a sample configuration file
    Init {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "rotator-config.toml")]
        output: PathBuf,
    },

    /// Check every account and renew secrets that are about to expire
    Run {
        /// Dry run - only report which secrets are due
        #[arg(long)]
        dry_run: bool,
    },

    /// List the accounts read from the account workbook
    Accounts,

    /// Print the current one-time login code
    Otp,
}

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    // Handle init command separately as it doesn't need a config
    if let Commands::Init { output } = cli.command {
        Config::create_sample(&output)
            .with_context(|| format!("Failed to create sample config at {:?}", output))?;
        info!("Sample configuration created at {:?}", output);
        return Ok(());
    }

    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        Config::from_env().context("Failed to load config from environment")?
    };
    apply_overrides(&mut config, &cli);

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above

        Commands::Accounts => {
            let accounts = accounts::load(&config.paths.accounts_file, &config.accounts)?;
            println!("{} account(s) in {:?}:", accounts.len(), config.paths.accounts_file);
            for account in &accounts {
                println!("  - {} ({})", account.name, account.client_identifier);
            }
        }

        Commands::Otp => {
            let secret: OtpSecret = config
                .credentials
                .otp_secret
                .parse()
                .context("Invalid one-time code secret")?;
            let now = otp::unix_now();
            let code = otp::totp_at(&secret, now)?;
            println!("{} (valid for {}s)", code, otp::seconds_remaining(now));
        }

        Commands::Run { dry_run } => {
            let ctx = RunContext::new(config, dry_run);
            let summary = run_rotation(&ctx).instrument(ctx.span().clone()).await?;
            println!("{}", summary);
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.webdriver_url {
        config.console.webdriver_url = url.clone();
    }
    if let Some(path) = &cli.accounts_file {
        config.paths.accounts_file = path.clone();
    }
    if let Some(dir) = &cli.report_dir {
        config.paths.report_dir = dir.clone();
    }
    if cli.headless {
        config.console.headless = true;
    }
}

/// Full workflow: accounts, session, per-account loop, report
async fn run_rotation(ctx: &RunContext) -> Result<RunSummary> {
    if ctx.dry_run {
        info!("Dry run: secrets will be inspected but not renewed");
    }

    let accounts = accounts::load_or_empty(&ctx.config.paths.accounts_file, &ctx.config.accounts);
    if accounts.is_empty() {
        bail!(
            "No accounts to process in {:?}",
            ctx.config.paths.accounts_file
        );
    }

    let session = session::establish(ctx)
        .await
        .context("Failed to start the browser session")?;

    run_with_session(ctx, session, &accounts).await
}

/// Log in, process `accounts` and write the report; the session is closed
/// whatever the outcome
async fn run_with_session(
    ctx: &RunContext,
    session: Session,
    accounts: &[accounts::AccountRecord],
) -> Result<RunSummary> {
    let mut report = ReportBuilder::new(ctx.config.rotation.flag_threshold_days);
    let result = drive_session(ctx, &session, accounts, &mut report).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close the browser session: {:#}", e);
    }
    let summary = result?;

    if report.is_empty() {
        warn!("No data to report");
    } else {
        let path = report.render(&ctx.config.paths.report_dir, ctx.today, ctx.started_at)?;
        info!("Report saved to {:?}", path);
        println!("Report saved to {}", path.display());
    }

    Ok(summary)
}

async fn drive_session(
    ctx: &RunContext,
    session: &Session,
    accounts: &[accounts::AccountRecord],
    report: &mut ReportBuilder,
) -> Result<RunSummary> {
    session::login(session, &ctx.config.credentials).await?;

    let engine = RotationEngine::from_context(ctx);
    Ok(run::process_accounts(ctx, session, &engine, accounts, report).await)
}
