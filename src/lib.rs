//! Vendor Secret Rotator Library
//!
//! Renews the API client secrets of vendor accounts on a web console before
//! they expire, and records every account's outcome in a spreadsheet report.

pub mod accounts;
pub mod cli;
pub mod config;
pub mod console;
pub mod context;
pub mod driver;
pub mod error;
pub mod inspector;
pub mod locator;
pub mod otp;
pub mod report;
pub mod rotation;
pub mod run;
pub mod session;

pub use config::Config;
pub use context::RunContext;
pub use report::{OutcomeRow, RenewalStatus, ReportBuilder};
pub use rotation::{days_until_expiration, needs_rotation, AccountOutcome, RotationEngine};
pub use run::{process_accounts, RunSummary};
