//! Response Decoder — classifies one raw model response into a canonical
//! shape through an ordered cascade of pure decode attempts. The first
//! strategy that produces a shape wins; every failure is swallowed and only
//! reported to the diagnostic sink.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{scalar_string, Record};
use crate::recon::csv;
use crate::recon::tables::{LEGACY_MARKER_KEY, LEGACY_TABLES, SUMMARY_KEYS};

/// Structural interpretation of a decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalShape {
    /// Uniform records from the flat single-table format.
    FlatTable(Vec<Record>),
    /// The legacy eight-table schema.
    NamedTableSet(NamedTables),
    /// An arbitrary JSON object.
    GenericObject(Record),
    /// An arbitrary JSON array.
    GenericArray(Vec<Value>),
    /// No structured data recovered.
    Undecodable,
}

/// The legacy schema split into its fixed buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTables {
    /// Eight (identifier, rows) buckets in declared order; empty buckets are
    /// present, not absent.
    pub tables: Vec<(String, Vec<Record>)>,
    /// Flattened summary records. Not carried into the flat result sheet.
    pub summary: Vec<Record>,
}

/// Which cascade step produced the shape. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    SignatureCsv,
    FencedJson,
    AnyFence,
    BracketScan,
    WholeResponse,
    None,
}

impl DecodeStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            DecodeStrategy::SignatureCsv => "signature-csv",
            DecodeStrategy::FencedJson => "fenced-json",
            DecodeStrategy::AnyFence => "any-fence",
            DecodeStrategy::BracketScan => "bracket-scan",
            DecodeStrategy::WholeResponse => "whole-response",
            DecodeStrategy::None => "none",
        }
    }
}

/// Sink for decode diagnostics, injectable so the cascade itself stays free
/// of logging side effects.
pub trait DecodeSink {
    fn strategy_matched(&self, row: usize, strategy: DecodeStrategy);
    fn step_failed(&self, row: usize, step: &'static str, detail: &str);
}

/// Production sink: routes diagnostics through `tracing`.
pub struct TracingSink;

impl DecodeSink for TracingSink {
    fn strategy_matched(&self, row: usize, strategy: DecodeStrategy) {
        tracing::debug!(row, strategy = strategy.label(), "response decoded");
    }

    fn step_failed(&self, row: usize, step: &'static str, detail: &str) {
        tracing::debug!(row, step, detail, "decode step produced nothing");
    }
}

/// Silent sink for callers that do not want any diagnostics.
pub struct NullSink;

impl DecodeSink for NullSink {
    fn strategy_matched(&self, _row: usize, _strategy: DecodeStrategy) {}
    fn step_failed(&self, _row: usize, _step: &'static str, _detail: &str) {}
}

/// A decoded response: the shape plus the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub shape: CanonicalShape,
    pub strategy: DecodeStrategy,
}

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").unwrap())
}

fn any_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]+)?\s*(.*?)\s*```").unwrap())
}

/// Runs the full decode cascade over one response. Pure with respect to the
/// response text; the row index feeds diagnostics only.
pub fn decode_response(response: &str, row: usize, sink: &dyn DecodeSink) -> Decoded {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Decoded {
            shape: CanonicalShape::Undecodable,
            strategy: DecodeStrategy::None,
        };
    }

    if let Some(shape) = csv::parse_signature_csv(trimmed) {
        sink.strategy_matched(row, DecodeStrategy::SignatureCsv);
        return Decoded {
            shape,
            strategy: DecodeStrategy::SignatureCsv,
        };
    }

    let attempts: [(DecodeStrategy, &'static str, Vec<String>); 4] = [
        (
            DecodeStrategy::FencedJson,
            "fenced-json",
            fenced_block(fenced_json_re(), trimmed),
        ),
        (
            DecodeStrategy::AnyFence,
            "any-fence",
            fenced_block(any_fence_re(), trimmed),
        ),
        (
            DecodeStrategy::BracketScan,
            "bracket-scan",
            bracket_candidates(trimmed),
        ),
        (
            DecodeStrategy::WholeResponse,
            "whole-response",
            vec![trimmed.to_string()],
        ),
    ];

    for (strategy, step, candidates) in attempts {
        for candidate in candidates {
            match serde_json::from_str::<Value>(&candidate) {
                Ok(value) => match classify(value) {
                    Some(shape) => {
                        sink.strategy_matched(row, strategy);
                        return Decoded { shape, strategy };
                    }
                    // A bare scalar parses but carries no tabular data.
                    None => sink.step_failed(row, step, "parsed a scalar, not a table shape"),
                },
                Err(e) => sink.step_failed(row, step, &e.to_string()),
            }
        }
    }

    Decoded {
        shape: CanonicalShape::Undecodable,
        strategy: DecodeStrategy::None,
    }
}

fn fenced_block(re: &Regex, text: &str) -> Vec<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| vec![m.as_str().to_string()])
        .unwrap_or_default()
}

/// First `{` to last `}` tried before first `[` to last `]`.
fn bracket_candidates(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            out.push(text[start..=end].to_string());
        }
    }
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            out.push(text[start..=end].to_string());
        }
    }
    out
}

/// Tags a parsed JSON value. Scalars yield `None` so the cascade advances.
fn classify(value: Value) -> Option<CanonicalShape> {
    match value {
        Value::Object(map) => {
            if map.contains_key(LEGACY_MARKER_KEY) {
                Some(CanonicalShape::NamedTableSet(split_named_tables(&map)))
            } else {
                Some(CanonicalShape::GenericObject(map))
            }
        }
        Value::Array(items) => Some(CanonicalShape::GenericArray(items)),
        _ => None,
    }
}

fn split_named_tables(map: &Record) -> NamedTables {
    let tables = LEGACY_TABLES
        .iter()
        .map(|(id, _)| {
            let rows: Vec<Record> = map
                .get(*id)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
                .unwrap_or_default();
            ((*id).to_string(), rows)
        })
        .collect();

    let summary = SUMMARY_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_object))
        .map(flatten_summary)
        .collect();

    NamedTables { tables, summary }
}

/// Summary list fields become a single semicolon-joined string.
fn flatten_summary(obj: &Record) -> Record {
    obj.iter()
        .map(|(k, v)| {
            let flat = match v {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(scalar_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                other => other.clone(),
            };
            (k.clone(), flat)
        })
        .collect()
}
