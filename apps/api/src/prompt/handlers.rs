use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::batch::ModelConfig;
use crate::errors::AppError;
use crate::models::{Record, TokenUsage};
use crate::prompt::{extract_names, substitute};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub prompt: Option<String>,
    #[serde(default)]
    pub variables: Record,
    #[serde(flatten)]
    pub model: ModelConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub processed_prompt: String,
    pub response: String,
    pub usage: TokenUsage,
}

/// POST /api/execute — substitute bindings and run a single completion.
pub async fn handle_execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, AppError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    let processed = substitute(&prompt, &req.variables);
    let outcome = state
        .llm
        .complete(&req.model.model, req.model.max_tokens, &processed)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    Ok(Json(ExecuteResponse {
        success: true,
        processed_prompt: processed,
        response: outcome.text,
        usage: outcome.usage,
    }))
}

#[derive(Deserialize)]
pub struct ParseVariablesRequest {
    pub prompt: Option<String>,
}

#[derive(Serialize)]
pub struct ParseVariablesResponse {
    pub variables: Vec<String>,
}

/// POST /api/parse-variables — list the distinct placeholders in a template.
pub async fn handle_parse_variables(
    Json(req): Json<ParseVariablesRequest>,
) -> Result<Json<ParseVariablesResponse>, AppError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    Ok(Json(ParseVariablesResponse {
        variables: extract_names(&prompt),
    }))
}
