//! Finds the registered application whose client id matches an account

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::console::ConsolePage;

/// One application row as read during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationCandidate {
    pub row_position: usize,
    pub client_identifier: String,
}

/// Matching application, left open with its secret revealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedApplication {
    pub row_position: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ApplicationLocator {
    max_candidates: usize,
}

impl ApplicationLocator {
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }

    /// Open the developer console, then scan it
    pub async fn find(
        &self,
        console: &dyn ConsolePage,
        client_identifier: &str,
    ) -> Result<Option<LocatedApplication>> {
        console
            .open_developer_console()
            .await
            .context("Failed to open the developer console")?;
        self.scan(console, client_identifier).await
    }

    /// Scan application rows top to bottom and stop at the first exact match.
    ///
    /// A row that cannot be opened or read counts as a mismatch. On a match the
    /// detail view stays open and the secret is revealed; failing to reveal it
    /// is an error.
    pub async fn scan(
        &self,
        console: &dyn ConsolePage,
        client_identifier: &str,
    ) -> Result<Option<LocatedApplication>> {
        console.await_application_table().await?;

        for row in 1..=self.max_candidates {
            let candidate = match self.inspect_row(console, row).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    error!("Could not check the client id of application row {}: {:#}", row, e);
                    continue;
                }
            };
            info!("Row {} has client id {}", row, candidate.client_identifier);

            if candidate.client_identifier == client_identifier {
                info!("Client id {} matches application row {}", client_identifier, row);
                console
                    .reveal_secret()
                    .await
                    .with_context(|| format!("Failed to reveal the secret of application row {}", row))?;
                return Ok(Some(LocatedApplication { row_position: row }));
            }

            if let Err(e) = console.close_application().await {
                warn!("Failed to close application row {}: {:#}", row, e);
            }
        }

        warn!("No application found for client id {}", client_identifier);
        Ok(None)
    }

    async fn inspect_row(&self, console: &dyn ConsolePage, row: usize) -> Result<ApplicationCandidate> {
        if let Err(e) = console.dismiss_overlay().await {
            debug!("No overlay dismissed before row {}: {:#}", row, e);
        }

        console.open_application(row).await?;
        let client_identifier = console
            .displayed_client_id()
            .await?
            .with_context(|| format!("Application row {} shows no client id", row))?;

        Ok(ApplicationCandidate {
            row_position: row,
            client_identifier,
        })
    }
}
