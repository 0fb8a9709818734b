//! Outcome rows and the spreadsheet report built from them

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::accounts::AccountRecord;
use crate::inspector::SecretSnapshot;
use crate::rotation::days_until_expiration;

pub const SHEET_NAME: &str = "Secret Key Report";
pub const NOT_AVAILABLE: &str = "N/A";

pub const HEADERS: [&str; 9] = [
    "Client Name",
    "Client ID",
    "Current Secret Key",
    "Current Expiration Date",
    "Days until Current Expiration",
    "New Secret Key",
    "New Expiration Date",
    "Days until New Expiration",
    "Renewal Status",
];

const NEW_EXPIRATION_COLUMN: u16 = 6;
const NEW_DAYS_COLUMN: u16 = 7;

/// Final status of one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalStatus {
    Renewed,
    NotNeeded,
    DeveloperProfileIncomplete,
    RenewalFailed { step: String, cause: String },
    MissingData,
    DueDryRun,
}

impl std::fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenewalStatus::Renewed => f.write_str("Renewed successfully"),
            RenewalStatus::NotNeeded => f.write_str("No renewal needed"),
            RenewalStatus::DeveloperProfileIncomplete => {
                f.write_str("Client needs to complete their Developer Profile")
            }
            RenewalStatus::RenewalFailed { step, cause } => {
                write!(f, "Renewal failed at {}: {}", step, cause)
            }
            RenewalStatus::MissingData => f.write_str("Skipped: missing secret or expiration date"),
            RenewalStatus::DueDryRun => f.write_str("Renewal due (dry run)"),
        }
    }
}

/// One report line; built once per account and never changed afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRow {
    pub account_name: String,
    pub client_identifier: String,
    pub current_secret: Option<String>,
    pub current_expiration: Option<NaiveDate>,
    pub days_until_current_expiration: Option<i64>,
    pub new_secret: Option<String>,
    pub new_expiration: Option<NaiveDate>,
    pub days_until_new_expiration: Option<i64>,
    pub status: RenewalStatus,
}

impl OutcomeRow {
    fn base(account: &AccountRecord, status: RenewalStatus) -> Self {
        Self {
            account_name: account.name.clone(),
            client_identifier: account.client_identifier.clone(),
            current_secret: None,
            current_expiration: None,
            days_until_current_expiration: None,
            new_secret: None,
            new_expiration: None,
            days_until_new_expiration: None,
            status,
        }
    }

    fn with_current(account: &AccountRecord, current: &SecretSnapshot, today: NaiveDate, status: RenewalStatus) -> Self {
        Self {
            current_secret: current.secret_value.clone(),
            current_expiration: current.expiration_date,
            days_until_current_expiration: current
                .expiration_date
                .map(|date| days_until_expiration(date, today)),
            ..Self::base(account, status)
        }
    }

    pub fn developer_profile_incomplete(account: &AccountRecord) -> Self {
        Self::base(account, RenewalStatus::DeveloperProfileIncomplete)
    }

    pub fn missing_data(account: &AccountRecord, current: &SecretSnapshot, today: NaiveDate) -> Self {
        Self::with_current(account, current, today, RenewalStatus::MissingData)
    }

    pub fn not_needed(account: &AccountRecord, current: &SecretSnapshot, today: NaiveDate) -> Self {
        Self::with_current(account, current, today, RenewalStatus::NotNeeded)
    }

    pub fn due_dry_run(account: &AccountRecord, current: &SecretSnapshot, today: NaiveDate) -> Self {
        Self::with_current(account, current, today, RenewalStatus::DueDryRun)
    }

    pub fn failed(
        account: &AccountRecord,
        current: &SecretSnapshot,
        today: NaiveDate,
        step: impl ToString,
        cause: impl ToString,
    ) -> Self {
        let status = RenewalStatus::RenewalFailed {
            step: step.to_string(),
            cause: cause.to_string(),
        };
        Self::with_current(account, current, today, status)
    }

    pub fn renewed(
        account: &AccountRecord,
        current: &SecretSnapshot,
        renewed: &SecretSnapshot,
        today: NaiveDate,
    ) -> Self {
        Self {
            new_secret: renewed.secret_value.clone(),
            new_expiration: renewed.expiration_date,
            days_until_new_expiration: renewed
                .expiration_date
                .map(|date| days_until_expiration(date, today)),
            ..Self::with_current(account, current, today, RenewalStatus::Renewed)
        }
    }
}

/// Fill applied to the new-expiration cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryFlag {
    Red,
    Green,
}

impl ExpiryFlag {
    /// Red at or below `threshold_days`, green above
    pub fn for_days(days: i64, threshold_days: i64) -> Self {
        if days <= threshold_days {
            ExpiryFlag::Red
        } else {
            ExpiryFlag::Green
        }
    }

    /// Flag for a row, `None` when it has no new expiration date
    pub fn for_row(row: &OutcomeRow, today: NaiveDate, threshold_days: i64) -> Option<Self> {
        row.new_expiration
            .map(|date| Self::for_days(days_until_expiration(date, today), threshold_days))
    }

    fn color(self) -> Color {
        match self {
            ExpiryFlag::Red => Color::RGB(0xFF0000),
            ExpiryFlag::Green => Color::RGB(0x00FF00),
        }
    }
}

/// Columns that carry the expiry flag of `row`, with the flag to apply
pub fn flagged_cells(row: &OutcomeRow, today: NaiveDate, threshold_days: i64) -> Vec<(u16, ExpiryFlag)> {
    match ExpiryFlag::for_row(row, today, threshold_days) {
        Some(flag) => vec![(NEW_EXPIRATION_COLUMN, flag), (NEW_DAYS_COLUMN, flag)],
        None => Vec::new(),
    }
}

/// Report file name for a run started at `now`
pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("report_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

/// Accumulates outcome rows during a run and writes them out once at the end
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    rows: Vec<OutcomeRow>,
    flag_threshold_days: i64,
}

impl ReportBuilder {
    pub fn new(flag_threshold_days: i64) -> Self {
        Self {
            rows: Vec::new(),
            flag_threshold_days,
        }
    }

    pub fn append(&mut self, row: OutcomeRow) {
        debug!("Recording {} for {}", row.status, row.account_name);
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[OutcomeRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report into `dir` and return its path
    pub fn render(&self, dir: &Path, today: NaiveDate, now: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {:?}", dir))?;
        let path = dir.join(report_file_name(now));
        info!("Creating report at {:?}", path);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        self.write_sheet(sheet, today)
            .context("Failed to fill report worksheet")?;

        workbook
            .save(&path)
            .with_context(|| format!("Failed to save report to {:?}", path))?;
        Ok(path)
    }

    fn write_sheet(&self, sheet: &mut Worksheet, today: NaiveDate) -> Result<(), rust_xlsxwriter::XlsxError> {
        sheet.set_name(SHEET_NAME)?;

        let header = Format::new().set_bold();
        for (col, title) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
            sheet.set_column_width(col as u16, 24)?;
        }

        for (index, row) in self.rows.iter().enumerate() {
            let r = index as u32 + 1;
            let flags = flagged_cells(row, today, self.flag_threshold_days);
            let fill_for = |col: u16| {
                flags
                    .iter()
                    .find(|(c, _)| *c == col)
                    .map(|(_, flag)| Format::new().set_background_color(flag.color()))
            };

            sheet.write_string(r, 0, &row.account_name)?;
            sheet.write_string(r, 1, &row.client_identifier)?;
            write_text(sheet, r, 2, row.current_secret.as_deref(), None)?;
            write_date(sheet, r, 3, row.current_expiration, None)?;
            write_days(sheet, r, 4, row.days_until_current_expiration, None)?;
            write_text(sheet, r, 5, row.new_secret.as_deref(), None)?;
            write_date(sheet, r, NEW_EXPIRATION_COLUMN, row.new_expiration, fill_for(NEW_EXPIRATION_COLUMN).as_ref())?;
            write_days(sheet, r, NEW_DAYS_COLUMN, row.days_until_new_expiration, fill_for(NEW_DAYS_COLUMN).as_ref())?;
            sheet.write_string(r, 8, row.status.to_string())?;

            if !flags.is_empty() {
                debug!("{} new expiration flagged {:?}", row.account_name, flags[0].1);
            }
        }
        Ok(())
    }
}

fn write_text(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&str>,
    format: Option<&Format>,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let text = value.unwrap_or(NOT_AVAILABLE);
    match format {
        Some(format) => sheet.write_string_with_format(row, col, text, format)?,
        None => sheet.write_string(row, col, text)?,
    };
    Ok(())
}

fn write_date(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<NaiveDate>,
    format: Option<&Format>,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let text = value.map(|d| d.format("%Y-%m-%d").to_string());
    write_text(sheet, row, col, text.as_deref(), format)
}

fn write_days(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<i64>,
    format: Option<&Format>,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    match (value, format) {
        (Some(days), Some(format)) => {
            sheet.write_number_with_format(row, col, days as f64, format)?;
        }
        (Some(days), None) => {
            sheet.write_number(row, col, days as f64)?;
        }
        (None, format) => write_text(sheet, row, col, None, format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn acme() -> AccountRecord {
        AccountRecord {
            name: "Acme".to_string(),
            client_identifier: "X123".to_string(),
        }
    }

    fn snapshot(secret: &str, days_from_today: i64) -> SecretSnapshot {
        SecretSnapshot {
            secret_value: Some(secret.to_string()),
            expiration_date: Some(today() + Duration::days(days_from_today)),
        }
    }

    #[test]
    fn test_flag_threshold_is_inclusive() {
        assert_eq!(ExpiryFlag::for_days(30, 30), ExpiryFlag::Red);
        assert_eq!(ExpiryFlag::for_days(31, 30), ExpiryFlag::Green);
        assert_eq!(ExpiryFlag::for_days(-2, 30), ExpiryFlag::Red);
    }

    #[test]
    fn test_flag_for_row_uses_new_expiration() {
        let at_30 = OutcomeRow::renewed(&acme(), &snapshot("S1", 3), &snapshot("S2", 30), today());
        let at_31 = OutcomeRow::renewed(&acme(), &snapshot("S1", 3), &snapshot("S2", 31), today());
        let unchanged = OutcomeRow::not_needed(&acme(), &snapshot("S1", 3), today());

        assert_eq!(ExpiryFlag::for_row(&at_30, today(), 30), Some(ExpiryFlag::Red));
        assert_eq!(ExpiryFlag::for_row(&at_31, today(), 30), Some(ExpiryFlag::Green));
        assert_eq!(ExpiryFlag::for_row(&unchanged, today(), 30), None);
    }

    #[test]
    fn test_flag_lands_on_new_expiration_and_new_days_columns() {
        let at_30 = OutcomeRow::renewed(&acme(), &snapshot("S1", 3), &snapshot("S2", 30), today());
        let at_31 = OutcomeRow::renewed(&acme(), &snapshot("S1", 3), &snapshot("S2", 31), today());
        let unchanged = OutcomeRow::not_needed(&acme(), &snapshot("S1", 90), today());

        assert_eq!(HEADERS[6], "New Expiration Date");
        assert_eq!(HEADERS[7], "Days until New Expiration");
        assert_eq!(
            flagged_cells(&at_30, today(), 30),
            vec![(6, ExpiryFlag::Red), (7, ExpiryFlag::Red)]
        );
        assert_eq!(
            flagged_cells(&at_31, today(), 30),
            vec![(6, ExpiryFlag::Green), (7, ExpiryFlag::Green)]
        );
        assert!(flagged_cells(&unchanged, today(), 30).is_empty());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RenewalStatus::Renewed.to_string(), "Renewed successfully");
        assert_eq!(RenewalStatus::NotNeeded.to_string(), "No renewal needed");
        assert_eq!(
            RenewalStatus::DeveloperProfileIncomplete.to_string(),
            "Client needs to complete their Developer Profile"
        );
        let failed = RenewalStatus::RenewalFailed {
            step: "confirm".to_string(),
            cause: "button missing".to_string(),
        };
        assert_eq!(failed.to_string(), "Renewal failed at confirm: button missing");
    }

    #[test]
    fn test_renewed_row_recomputes_new_days() {
        let row = OutcomeRow::renewed(&acme(), &snapshot("S1", 10), &snapshot("S2", 400), today());
        assert_eq!(row.days_until_current_expiration, Some(10));
        assert_eq!(row.days_until_new_expiration, Some(400));
        assert_ne!(row.days_until_new_expiration, row.days_until_current_expiration);
    }

    #[test]
    fn test_report_file_name_has_seconds() {
        let now = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap();
        assert_eq!(report_file_name(now), "report_20250314_090507.xlsx");
    }

    #[test]
    fn test_render_writes_header_and_rows() -> Result<()> {
        let dir = TempDir::new()?;
        let out = dir.path().join("reports");
        let now = Local.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap();

        let mut report = ReportBuilder::new(30);
        report.append(OutcomeRow::renewed(&acme(), &snapshot("S1", 10), &snapshot("S2", 400), today()));
        report.append(OutcomeRow::not_needed(
            &AccountRecord {
                name: "Globex".to_string(),
                client_identifier: "Y456".to_string(),
            },
            &snapshot("S9", 90),
            today(),
        ));

        let path = report.render(&out, today(), now)?;
        assert_eq!(path, out.join("report_20250314_090507.xlsx"));

        let mut workbook = open_workbook_auto(&path)?;
        let range = workbook.worksheet_range(SHEET_NAME)?;

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Client Name".to_string())));
        assert_eq!(range.get_value((0, 8)), Some(&Data::String("Renewal Status".to_string())));

        assert_eq!(range.get_value((1, 0)), Some(&Data::String("Acme".to_string())));
        assert_eq!(range.get_value((1, 2)), Some(&Data::String("S1".to_string())));
        assert_eq!(range.get_value((1, 3)), Some(&Data::String("2025-03-24".to_string())));
        assert_eq!(range.get_value((1, 4)), Some(&Data::Float(10.0)));
        assert_eq!(range.get_value((1, 5)), Some(&Data::String("S2".to_string())));
        assert_eq!(range.get_value((1, 7)), Some(&Data::Float(400.0)));
        assert_eq!(
            range.get_value((1, 8)),
            Some(&Data::String("Renewed successfully".to_string()))
        );

        assert_eq!(range.get_value((2, 5)), Some(&Data::String("N/A".to_string())));
        assert_eq!(range.get_value((2, 6)), Some(&Data::String("N/A".to_string())));
        assert_eq!(range.get_value((2, 7)), Some(&Data::String("N/A".to_string())));
        assert_eq!(
            range.get_value((2, 8)),
            Some(&Data::String("No renewal needed".to_string()))
        );
        Ok(())
    }
}
