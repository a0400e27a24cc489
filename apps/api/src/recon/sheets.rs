//! Sheet Builder — turns one row's decoded shape into a single-row workbook,
//! degrading step by step when no structured shape was recovered.

use serde_json::Value;

use crate::export::workbook::Workbook;
use crate::models::{scalar_string, Record, RowResult};
use crate::recon::csv;
use crate::recon::decode::{CanonicalShape, Decoded, NamedTables};

/// Primary sheet for table-shaped responses.
pub const SHEET_RESULTS: &str = "RISULTATI";
/// Primary sheet for loosely structured responses and fallbacks.
pub const SHEET_RESULT: &str = "RISULTATO";
/// Optional troubleshooting sheet. Never replaces the primary sheet.
pub const SHEET_DIAGNOSTICS: &str = "DIAGNOSTICA";

/// Ceiling on text placed in a single cell. Longer fallback text is split
/// into part/content records rather than truncated.
pub const CELL_TEXT_LIMIT: usize = 30_000;

/// Builds the workbook for one row. Always emits at least one sheet with at
/// least one record.
pub fn build_row_workbook(result: &RowResult, decoded: &Decoded, diagnostics: bool) -> Workbook {
    let raw = result.response.as_deref().unwrap_or("");
    let mut workbook = Workbook::new();

    match &decoded.shape {
        CanonicalShape::FlatTable(rows) => workbook.push_sheet(SHEET_RESULTS, rows.clone()),
        CanonicalShape::NamedTableSet(tables) => {
            workbook.push_sheet(SHEET_RESULTS, concat_tables(tables))
        }
        CanonicalShape::GenericArray(items) if !items.is_empty() => {
            workbook.push_sheet(SHEET_RESULT, records_from(items))
        }
        CanonicalShape::GenericObject(map) => {
            workbook.push_sheet(SHEET_RESULT, object_rows(map, raw))
        }
        // an empty array carries nothing usable; same degradation as Undecodable
        CanonicalShape::GenericArray(_) | CanonicalShape::Undecodable => {
            workbook.push_sheet(SHEET_RESULT, fallback_rows(result, raw))
        }
    }

    if diagnostics {
        workbook.push_sheet(SHEET_DIAGNOSTICS, vec![diagnostic_record(result, decoded, raw)]);
    }

    workbook
}

/// All eight legacy tables concatenated in declared order. Summary records
/// belong to the legacy multi-sheet layout and are not carried over.
fn concat_tables(tables: &NamedTables) -> Vec<Record> {
    tables
        .tables
        .iter()
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect()
}

/// GenericObject: first property holding a non-empty array wins; otherwise a
/// generic CSV reparse of the raw text; otherwise the object's own properties
/// as a single record.
fn object_rows(map: &Record, raw: &str) -> Vec<Record> {
    let first_array = map.values().find_map(|v| match v {
        Value::Array(items) if !items.is_empty() => Some(items),
        _ => None,
    });
    if let Some(items) = first_array {
        return records_from(items);
    }

    let rows = csv::parse_generic_csv(raw);
    if !rows.is_empty() {
        return rows;
    }

    vec![map.iter().map(|(k, v)| (k.clone(), scalarize(v))).collect()]
}

/// Last resort: a generic CSV reparse, then chunked text, then a single
/// status record carrying the row's original inputs.
fn fallback_rows(result: &RowResult, raw: &str) -> Vec<Record> {
    let rows = csv::parse_generic_csv(raw);
    if !rows.is_empty() {
        return rows;
    }

    if raw.chars().count() > CELL_TEXT_LIMIT {
        return chunk_rows(raw);
    }

    let mut record: Record = result
        .row_data
        .iter()
        .map(|(k, v)| (k.clone(), scalarize(v)))
        .collect();
    if result.success {
        record.insert(
            "Stato".to_string(),
            Value::String("NESSUN_DATO_STRUTTURATO".to_string()),
        );
        record.insert(
            "Nota".to_string(),
            Value::String(
                "Nessun dato tabellare riconosciuto nella risposta; testo riportato integralmente"
                    .to_string(),
            ),
        );
        record.insert("Risposta".to_string(), Value::String(raw.to_string()));
    } else {
        record.insert("Stato".to_string(), Value::String("ERRORE".to_string()));
        record.insert(
            "Nota".to_string(),
            Value::String(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Errore sconosciuto".to_string()),
            ),
        );
    }
    vec![record]
}

/// Splits oversized plain text into `Parte`/`Contenuto` records, each at most
/// one cell ceiling long.
fn chunk_rows(raw: &str) -> Vec<Record> {
    let chars: Vec<char> = raw.chars().collect();
    chars
        .chunks(CELL_TEXT_LIMIT)
        .enumerate()
        .map(|(i, chunk)| {
            let mut record = Record::new();
            record.insert("Parte".to_string(), Value::from(i + 1));
            record.insert(
                "Contenuto".to_string(),
                Value::String(chunk.iter().collect()),
            );
            record
        })
        .collect()
}

fn records_from(items: &[Value]) -> Vec<Record> {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), scalarize(v))).collect(),
            other => {
                let mut record = Record::new();
                record.insert("Valore".to_string(), scalarize(other));
                record
            }
        })
        .collect()
}

/// Scalars pass through; nested compounds become their JSON text so every
/// cell stays scalar.
fn scalarize(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

fn diagnostic_record(result: &RowResult, decoded: &Decoded, raw: &str) -> Record {
    let head: String = raw.chars().take(200).collect();
    let tail: String = if raw.chars().count() > 200 {
        let chars: Vec<char> = raw.chars().collect();
        chars[chars.len() - 200..].iter().collect()
    } else {
        String::new()
    };

    let mut record = Record::new();
    record.insert("Riga".to_string(), Value::from(result.row_index));
    record.insert(
        "Lunghezza_Risposta".to_string(),
        Value::from(raw.chars().count()),
    );
    record.insert(
        "Strategia".to_string(),
        Value::String(decoded.strategy.label().to_string()),
    );
    record.insert("Inizio".to_string(), Value::String(head));
    record.insert("Fine".to_string(), Value::String(tail));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::decode::{decode_response, NullSink};
    use serde_json::json;

    fn row_result(response: &str) -> RowResult {
        let mut row_data = Record::new();
        row_data.insert("PROFILO".to_string(), json!("Istruttore Amministrativo"));
        row_data.insert("SETTORE".to_string(), json!("Enti Locali"));
        RowResult {
            row_index: 0,
            row_data,
            processed_prompt: "prompt".to_string(),
            response: Some(response.to_string()),
            usage: None,
            error: None,
            success: true,
        }
    }

    fn build(response: &str) -> Workbook {
        let result = row_result(response);
        let decoded = decode_response(response, 0, &NullSink);
        build_row_workbook(&result, &decoded, false)
    }

    #[test]
    fn test_flat_table_becomes_risultati() {
        let wb = build("Nome_Tabella;Area_Contrattuale\nT1;X\nT1;Y");
        assert_eq!(wb.sheets.len(), 1);
        let sheet = wb.sheet(SHEET_RESULTS).unwrap();
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn test_named_tables_concatenated_in_declared_order() {
        let response = r#"{
            "tabella_1_normativa_generale": [{"Voce": "prima"}],
            "tabella_8_competenze_linguistiche": [{"Voce": "ultima"}],
            "tabella_4_competenze_tecnico_specialistiche": [{"Voce": "mezzo"}]
        }"#;
        let wb = build(response);
        let sheet = wb.sheet(SHEET_RESULTS).unwrap();
        let voci: Vec<_> = sheet.rows.iter().map(|r| r["Voce"].clone()).collect();
        assert_eq!(voci, vec![json!("prima"), json!("mezzo"), json!("ultima")]);
    }

    #[test]
    fn test_generic_array_becomes_risultato() {
        let wb = build(r#"[{"a":1},{"a":2}]"#);
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["a"], json!(1));
    }

    #[test]
    fn test_generic_object_uses_first_nonempty_array_only() {
        let response = r#"{
            "vuoto": [],
            "competenze": [{"nome": "A"}, {"nome": "B"}],
            "altre": [{"nome": "ignorata"}]
        }"#;
        let wb = build(response);
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1]["nome"], json!("B"));
    }

    #[test]
    fn test_generic_object_without_arrays_dumps_properties() {
        let wb = build(r#"{"titolo": "Relazione", "anno": 2024}"#);
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0]["titolo"], json!("Relazione"));
        assert_eq!(sheet.rows[0]["anno"], json!(2024));
    }

    #[test]
    fn test_json_records_with_semicolon_values_kept_intact() {
        let response =
            "[\n {\"Nome_Tabella\":\"T1\",\"Voce\":\"a;b\"},\n {\"Nome_Tabella\":\"T1\",\"Voce\":\"c\"}\n]";
        let wb = build(response);
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["Voce"], json!("a;b"));
        assert_eq!(sheet.rows[1]["Voce"], json!("c"));
    }

    #[test]
    fn test_undecodable_with_generic_csv_recovers_rows() {
        let wb = build("colonna_a;colonna_b\nuno;due\ntre;quattro");
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["colonna_a"], json!("uno"));
    }

    #[test]
    fn test_undecodable_prose_emits_single_fallback_record() {
        let wb = build("Una risposta discorsiva senza alcuna struttura.");
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        let record = &sheet.rows[0];
        assert_eq!(record["PROFILO"], json!("Istruttore Amministrativo"));
        assert_eq!(record["Stato"], json!("NESSUN_DATO_STRUTTURATO"));
        assert!(record.contains_key("Nota"));
        assert_eq!(
            record["Risposta"],
            json!("Una risposta discorsiva senza alcuna struttura.")
        );
    }

    #[test]
    fn test_failed_row_emits_error_record() {
        let mut result = row_result("");
        result.response = None;
        result.success = false;
        result.error = Some("overloaded_error".to_string());
        let decoded = decode_response("", 0, &NullSink);
        let wb = build_row_workbook(&result, &decoded, false);
        let record = &wb.sheet(SHEET_RESULT).unwrap().rows[0];
        assert_eq!(record["Stato"], json!("ERRORE"));
        assert_eq!(record["Nota"], json!("overloaded_error"));
    }

    #[test]
    fn test_long_plain_text_chunked_at_cell_limit() {
        let long = "x".repeat(65_000);
        let wb = build(&long);
        let sheet = wb.sheet(SHEET_RESULT).unwrap();
        assert_eq!(sheet.rows.len(), 3);
        let lengths: Vec<usize> = sheet
            .rows
            .iter()
            .map(|r| r["Contenuto"].as_str().unwrap().chars().count())
            .collect();
        assert_eq!(lengths, vec![30_000, 30_000, 5_000]);
        assert_eq!(sheet.rows[0]["Parte"], json!(1));
        assert_eq!(sheet.rows[2]["Parte"], json!(3));
    }

    #[test]
    fn test_diagnostics_sheet_attached_not_replacing() {
        let result = row_result(r#"[{"a":1}]"#);
        let decoded = decode_response(r#"[{"a":1}]"#, 0, &NullSink);
        let wb = build_row_workbook(&result, &decoded, true);
        assert!(wb.sheet(SHEET_RESULT).is_some());
        let diag = wb.sheet(SHEET_DIAGNOSTICS).unwrap();
        assert_eq!(diag.rows[0]["Strategia"], json!("bracket-scan"));
    }
}
