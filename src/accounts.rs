//! Account list loaded from the input workbook

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::AccountColumns;

/// One vendor account to process, in workbook order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub client_identifier: String,
}

/// Zero-based index of a spreadsheet column letter (`A` = 0, `AA` = 26)
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let number = letters
        .chars()
        .map(|c| c.to_ascii_uppercase() as usize - 'A' as usize + 1)
        .try_fold(0usize, |acc, digit| acc.checked_mul(26)?.checked_add(digit))?;
    Some(number - 1)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{:.0}", f),
        Some(Data::Int(i)) => i.to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Read accounts from the first worksheet of `path`
pub fn load<P: AsRef<Path>>(path: P, columns: &AccountColumns) -> Result<Vec<AccountRecord>> {
    let path = path.as_ref();
    let name_col = column_index(&columns.name_column)
        .with_context(|| format!("Invalid name column: {}", columns.name_column))?;
    let id_col = column_index(&columns.client_id_column)
        .with_context(|| format!("Invalid client id column: {}", columns.client_id_column))?;

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open account workbook {:?}", path))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook {:?} has no worksheets", path))?
        .with_context(|| format!("Failed to read first worksheet of {:?}", path))?;

    let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) else {
        warn!("First worksheet of {:?} is empty", path);
        return Ok(Vec::new());
    };

    let first_data_row = first_row + u32::from(columns.has_header);
    let mut accounts = Vec::new();

    for row in first_data_row..=last_row {
        let name = cell_text(range.get_value((row, name_col as u32)));
        let client_identifier = cell_text(range.get_value((row, id_col as u32)));

        if name.is_empty() && client_identifier.is_empty() {
            continue;
        }
        if name.is_empty() || client_identifier.is_empty() {
            warn!(
                "Skipping workbook row {}: account name and client id are both required",
                row + 1
            );
            continue;
        }

        accounts.push(AccountRecord {
            name,
            client_identifier,
        });
    }

    if accounts.is_empty() && last_row >= first_data_row {
        bail!("No usable account rows in {:?}", path);
    }

    info!("Loaded {} accounts from {:?}", accounts.len(), path);
    Ok(accounts)
}

/// Like `load`, but reports the failure and yields an empty list
pub fn load_or_empty<P: AsRef<Path>>(path: P, columns: &AccountColumns) -> Vec<AccountRecord> {
    match load(path.as_ref(), columns) {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Error reading account workbook: {:#}", e);
            Vec::new()
        }
    }
}
