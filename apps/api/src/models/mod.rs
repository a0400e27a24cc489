pub mod row;

pub use row::{Record, RowResult, TokenUsage, UsageTotals};

use serde_json::Value;

/// String form used for cell values and template substitution.
/// Null maps to the empty string; compound values fall back to their JSON text.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
