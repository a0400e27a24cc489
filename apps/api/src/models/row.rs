//! Row-level data carried through a batch: bindings in, result out.

use serde::{Deserialize, Serialize};

/// One row's named bindings, in spreadsheet column order.
/// `serde_json`'s `preserve_order` feature keeps declaration order, which the
/// decoder and the substitution loop both rely on.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Token accounting for a single completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Outcome of processing one row. Built once by the batch orchestrator and
/// never mutated afterwards; the field names match the JSON wire shape the
/// UI already speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub row_index: usize,
    pub row_data: Record,
    pub processed_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

/// Accumulated token and outcome counts over a batch. Failed rows contribute
/// to `error_count` only; their token counts do not exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub success_count: usize,
    pub error_count: usize,
}

impl UsageTotals {
    pub fn record_success(&mut self, usage: &TokenUsage) {
        self.input_tokens += u64::from(usage.input_tokens);
        self.output_tokens += u64::from(usage.output_tokens);
        self.success_count += 1;
    }

    pub fn record_failure(&mut self) {
        self.error_count += 1;
    }
}
