//! Batch orchestration: one completion per row, strictly sequential, with a
//! row's failure recorded in place instead of aborting the batch.

pub mod handlers;
pub mod ingest;

use serde::Deserialize;
use tracing::warn;

use crate::llm_client::{Completer, MAX_TOKENS, MODEL};
use crate::models::{Record, RowResult, UsageTotals};
use crate::prompt::substitute;

/// Model identifier and token budget for a run. Clients may override either;
/// both default to the service-wide constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    MAX_TOKENS
}

/// Runs the template against every row, one completion in flight at a time.
/// Row *i+1* is issued only after row *i* resolved; usage accumulates over
/// successful rows only.
pub async fn run_batch<C: Completer>(
    llm: &C,
    template: &str,
    rows: &[Record],
    config: &ModelConfig,
) -> (Vec<RowResult>, UsageTotals) {
    let mut results = Vec::with_capacity(rows.len());
    let mut totals = UsageTotals::default();

    for (index, row) in rows.iter().enumerate() {
        let processed = substitute(template, row);
        match llm
            .complete(&config.model, config.max_tokens, &processed)
            .await
        {
            Ok(outcome) => {
                totals.record_success(&outcome.usage);
                results.push(RowResult {
                    row_index: index,
                    row_data: row.clone(),
                    processed_prompt: processed,
                    response: Some(outcome.text),
                    usage: Some(outcome.usage),
                    error: None,
                    success: true,
                });
            }
            Err(e) => {
                warn!(row = index, error = %e, "completion failed; batch continues");
                totals.record_failure();
                results.push(RowResult {
                    row_index: index,
                    row_data: row.clone(),
                    processed_prompt: processed,
                    response: None,
                    usage: None,
                    error: Some(e.to_string()),
                    success: false,
                });
            }
        }
    }

    (results, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{CompletionOutcome, LlmError};
    use crate::models::TokenUsage;
    use serde_json::json;

    struct EchoOrFail;

    impl Completer for EchoOrFail {
        async fn complete(
            &self,
            _model: &str,
            _max_tokens: u32,
            prompt: &str,
        ) -> Result<CompletionOutcome, LlmError> {
            if prompt.contains("guasto") {
                return Err(LlmError::EmptyContent);
            }
            Ok(CompletionOutcome {
                text: format!("eco: {prompt}"),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            })
        }
    }

    fn row(value: &str) -> Record {
        let mut r = Record::new();
        r.insert("PROFILO".to_string(), json!(value));
        r
    }

    #[tokio::test]
    async fn test_one_failed_row_does_not_abort_the_batch() {
        let rows = vec![row("alfa"), row("guasto"), row("gamma")];
        let (results, totals) = run_batch(
            &EchoOrFail,
            "Profilo: [PROFILO]",
            &rows,
            &ModelConfig::default(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().enumerate().all(|(i, r)| r.row_index == i));
        assert!(results[0].success && results[2].success);
        assert_eq!(results[0].response.as_deref(), Some("eco: Profilo: alfa"));
        assert!(!results[1].success);
        assert!(results[1].response.is_none());
        assert!(results[1].usage.is_none());
        assert!(results[1].error.is_some());

        // the failed row contributes to error_count only
        assert_eq!(totals.success_count, 2);
        assert_eq!(totals.error_count, 1);
        assert_eq!(totals.input_tokens, 20);
        assert_eq!(totals.output_tokens, 10);
    }

    #[test]
    fn test_model_config_defaults() {
        let config: ModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model, MODEL);
        assert_eq!(config.max_tokens, MAX_TOKENS);
    }

    #[test]
    fn test_model_config_overrides() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"model": "claude-haiku-4-5", "maxTokens": 1024}"#).unwrap();
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.max_tokens, 1024);
    }
}
