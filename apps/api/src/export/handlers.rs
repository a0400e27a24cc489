use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::export::{export_concatenated, export_row, export_zip, file_stem};
use crate::models::RowResult;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub results: Vec<RowResult>,
    #[serde(default)]
    pub diagnostics: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRowRequest {
    pub result: RowResult,
    #[serde(default)]
    pub diagnostics: bool,
}

/// POST /api/download-excel — one workbook: overview plus consolidated sheet.
pub async fn handle_download_excel(
    Json(req): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    if req.results.is_empty() {
        return Err(AppError::Validation("Results data is required".to_string()));
    }
    let bytes =
        export_concatenated(&req.results).map_err(|e| AppError::Export(e.to_string()))?;
    Ok(attachment(
        bytes,
        XLSX_CONTENT_TYPE,
        &format!("claude_results_{}.xlsx", timestamp()),
    ))
}

/// POST /api/download-row — the single-row workbook.
pub async fn handle_download_row(
    Json(req): Json<DownloadRowRequest>,
) -> Result<Response, AppError> {
    let bytes =
        export_row(&req.result, req.diagnostics).map_err(|e| AppError::Export(e.to_string()))?;
    Ok(attachment(
        bytes,
        XLSX_CONTENT_TYPE,
        &format!("{}.xlsx", file_stem(&req.result)),
    ))
}

/// POST /api/download-zip — per-row workbooks plus the consolidated file.
pub async fn handle_download_zip(Json(req): Json<DownloadRequest>) -> Result<Response, AppError> {
    if req.results.is_empty() {
        return Err(AppError::Validation("Results data is required".to_string()));
    }
    let bytes =
        export_zip(&req.results, req.diagnostics).map_err(|e| AppError::Export(e.to_string()))?;
    Ok(attachment(
        bytes,
        ZIP_CONTENT_TYPE,
        &format!("claude_results_{}.zip", timestamp()),
    ))
}

fn attachment(bytes: Vec<u8>, content_type: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        bytes,
    )
        .into_response()
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
