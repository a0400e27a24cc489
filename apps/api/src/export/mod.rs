//! Export orchestration: per-row workbooks, the concatenated single-file
//! export, and the zip bundle with its consolidated summary file.
//!
//! Decoding is re-run per export path on purpose: results arrive as plain
//! JSON from the client, and the cascade is a pure function of the response
//! text, so there is nothing worth caching across requests.

pub mod archive;
pub mod handlers;
pub mod workbook;
pub mod xlsx;

use anyhow::{Context, Result};

use crate::models::{scalar_string, Record, RowResult};
use crate::recon::decode::{decode_response, TracingSink};
use crate::recon::sheets::{
    build_row_workbook, CELL_TEXT_LIMIT, SHEET_RESULT, SHEET_RESULTS,
};
use crate::export::workbook::Workbook;

/// Consolidated sheet merging every row's primary sheet.
pub const SHEET_CONSOLIDATED: &str = "TUTTI_I_RISULTATI";
/// Per-batch overview sheet: one record per row with response text and usage.
pub const SHEET_SUMMARY: &str = "RIEPILOGO";

/// Name of the consolidated workbook inside the zip bundle.
pub const CONSOLIDATED_FILE: &str = "tutti_i_risultati.xlsx";

/// Decodes and serializes one row's workbook.
pub fn export_row(result: &RowResult, diagnostics: bool) -> Result<Vec<u8>> {
    let raw = result.response.as_deref().unwrap_or("");
    let decoded = decode_response(raw, result.row_index, &TracingSink);
    let workbook = build_row_workbook(result, &decoded, diagnostics);
    xlsx::write_workbook(&workbook)
}

/// Deterministic file stem: row index plus any profile/sector-like binding
/// values, located case-insensitively, every non-alphanumeric character
/// replaced with `_`.
pub fn file_stem(result: &RowResult) -> String {
    let mut stem = format!("risultato_{}", result.row_index + 1);
    for needle in ["profilo", "settore"] {
        let found = result
            .row_data
            .iter()
            .find(|(k, _)| k.to_lowercase().contains(needle));
        if let Some((_, value)) = found {
            let cleaned = sanitize(&scalar_string(value));
            if !cleaned.is_empty() {
                stem.push('_');
                stem.push_str(&cleaned);
            }
        }
    }
    stem
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// One overview record per row, mirroring the historical main sheet: row
/// number, original bindings, response or error, status, token counts.
pub fn summary_rows(results: &[RowResult]) -> Vec<Record> {
    results
        .iter()
        .map(|result| {
            let mut record = Record::new();
            record.insert("Row #".to_string(), (result.row_index + 1).into());
            for (k, v) in &result.row_data {
                record.insert(k.clone(), v.clone());
            }
            let text = result
                .response
                .clone()
                .or_else(|| result.error.clone())
                .unwrap_or_else(|| "N/A".to_string());
            record.insert("Claude Response".to_string(), clamp_cell(text).into());
            record.insert(
                "Status".to_string(),
                if result.success { "Success" } else { "Error" }.into(),
            );
            if let Some(usage) = &result.usage {
                record.insert("Input Tokens".to_string(), usage.input_tokens.into());
                record.insert("Output Tokens".to_string(), usage.output_tokens.into());
            }
            record
        })
        .collect()
}

/// Overview cells are capped at the cell ceiling with a visible marker; the
/// full text lives in the per-row workbooks.
fn clamp_cell(text: String) -> String {
    if text.chars().count() <= CELL_TEXT_LIMIT {
        return text;
    }
    let mut clamped: String = text.chars().take(CELL_TEXT_LIMIT).collect();
    clamped.push_str(" … [testo troncato]");
    clamped
}

/// Single-file export: the overview sheet plus one consolidated sheet with
/// every row's primary records concatenated in row order.
pub fn export_concatenated(results: &[RowResult]) -> Result<Vec<u8>> {
    let mut consolidated: Vec<Record> = Vec::new();
    for result in results {
        let raw = result.response.as_deref().unwrap_or("");
        let decoded = decode_response(raw, result.row_index, &TracingSink);
        let row_workbook = build_row_workbook(result, &decoded, false);
        if let Some(sheet) = primary_sheet(&row_workbook) {
            consolidated.extend(sheet.rows.iter().cloned());
        }
    }

    let mut workbook = Workbook::new();
    workbook.push_sheet(SHEET_SUMMARY, summary_rows(results));
    workbook.push_sheet(SHEET_CONSOLIDATED, consolidated);
    xlsx::write_workbook(&workbook)
}

/// Multi-file export: one xlsx per row plus a consolidated workbook, zipped.
/// Consolidation re-reads the serialized per-row files so the merged sheet
/// reflects exactly what was written.
pub fn export_zip(results: &[RowResult], diagnostics: bool) -> Result<Vec<u8>> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::with_capacity(results.len() + 1);
    for result in results {
        let bytes = export_row(result, diagnostics)
            .with_context(|| format!("serializing row {}", result.row_index))?;
        files.push((format!("{}.xlsx", file_stem(result)), bytes));
    }

    let merged = consolidate(&files)?;
    let mut summary = Workbook::new();
    summary.push_sheet(SHEET_CONSOLIDATED, merged);
    files.push((CONSOLIDATED_FILE.to_string(), xlsx::write_workbook(&summary)?));

    archive::build_archive(&files)
}

/// Re-opens every serialized workbook and concatenates the rows of its
/// primary sheet (`RISULTATI`, then `RISULTATO`, then the first sheet), in
/// file order.
pub fn consolidate(files: &[(String, Vec<u8>)]) -> Result<Vec<Record>> {
    let mut all = Vec::new();
    for (name, bytes) in files {
        let workbook =
            xlsx::read_workbook(bytes).with_context(|| format!("re-reading '{name}'"))?;
        if let Some(sheet) = primary_sheet(&workbook) {
            all.extend(sheet.rows.iter().cloned());
        }
    }
    Ok(all)
}

fn primary_sheet(workbook: &Workbook) -> Option<&workbook::Sheet> {
    workbook
        .sheet(SHEET_RESULTS)
        .or_else(|| workbook.sheet(SHEET_RESULT))
        .or_else(|| workbook.sheets.first())
}
