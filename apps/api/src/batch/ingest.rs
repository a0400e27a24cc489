//! Spreadsheet ingestion: the uploaded workbook's first sheet becomes the
//! batch's rows, columns inferred from the header row.

use crate::errors::AppError;
use crate::export::workbook::columns;
use crate::export::xlsx::read_workbook;
use crate::models::Record;

pub struct IngestedSheet {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

/// Parses an uploaded xlsx payload. Rejects payloads whose first sheet has no
/// data rows.
pub fn parse_upload(bytes: &[u8]) -> Result<IngestedSheet, AppError> {
    let workbook = read_workbook(bytes)
        .map_err(|e| AppError::Validation(format!("Failed to parse Excel file: {e}")))?;

    let sheet = workbook
        .sheets
        .first()
        .ok_or_else(|| AppError::Validation("Excel file is empty".to_string()))?;
    if sheet.rows.is_empty() {
        return Err(AppError::Validation("Excel file is empty".to_string()));
    }

    Ok(IngestedSheet {
        columns: columns(&sheet.rows),
        rows: sheet.rows.clone(),
    })
}
