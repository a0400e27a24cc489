use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::batch::{ingest, run_batch, ModelConfig};
use crate::errors::AppError;
use crate::models::{Record, RowResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub prompt: Option<String>,
    pub excel_data: Option<Vec<Record>>,
    #[serde(flatten)]
    pub model: ModelConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<RowResult>,
    pub total_usage: TokenTotals,
    pub success_count: usize,
    pub error_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// POST /api/execute-batch — run the template over every uploaded row.
pub async fn handle_execute_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;
    let rows = req
        .excel_data
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| AppError::Validation("Excel data is required".to_string()))?;

    let (results, totals) = run_batch(&state.llm, &prompt, &rows, &req.model).await;

    Ok(Json(BatchResponse {
        success: true,
        results,
        total_usage: TokenTotals {
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
        },
        success_count: totals.success_count,
        error_count: totals.error_count,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub data: Vec<Record>,
}

/// POST /api/upload-excel — multipart upload, first sheet becomes the rows.
pub async fn handle_upload_excel(
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut payload: Option<bytes::Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() == Some("file") {
            payload = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?,
            );
        }
    }

    let payload = payload.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let sheet = ingest::parse_upload(&payload)?;

    Ok(Json(UploadResponse {
        success: true,
        row_count: sheet.rows.len(),
        columns: sheet.columns,
        data: sheet.rows,
    }))
}
