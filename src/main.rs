//! Vendor Secret Rotator CLI
//!
//! This is the main entry point for the CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vendor_secret_rotator::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    cli::execute(cli).await
}
