//! Semicolon-CSV recovery for responses that export their tables as plain
//! text rather than JSON.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{scalar_string, Record};
use crate::recon::decode::{CanonicalShape, NamedTables};
use crate::recon::tables::{FLAT_MARKER_COLUMN, LEGACY_TABLES, TABLE_ID_COLUMN};

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```(?:csv)?[ \t]*\n(.*?)```").unwrap())
}

/// Interior of a ```csv or bare fenced block if one is present, otherwise the
/// whole response.
fn csv_body(response: &str) -> &str {
    fence_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response)
}

/// Signature-gated CSV parse, tried before any JSON strategy. Triggers only
/// when the parsed header line names one of the signature columns; a
/// signature appearing inside data values (or JSON text) is not enough.
/// Yields `None` otherwise so the cascade can continue.
pub fn parse_signature_csv(response: &str) -> Option<CanonicalShape> {
    let trimmed = response.trim();
    if !trimmed.contains(';') {
        return None;
    }

    let (header, rows) = parse_rows(csv_body(trimmed))?;

    if header.iter().any(|h| h == FLAT_MARKER_COLUMN) {
        return Some(CanonicalShape::FlatTable(rows));
    }
    if !header.iter().any(|h| h == TABLE_ID_COLUMN) {
        return None;
    }

    // Legacy shape: bucket rows by their table identifier. All eight buckets
    // stay present even when no row matches them.
    let mut tables: Vec<(String, Vec<Record>)> = LEGACY_TABLES
        .iter()
        .map(|(id, _)| ((*id).to_string(), Vec::new()))
        .collect();
    for row in rows {
        let id = row.get(TABLE_ID_COLUMN).map(scalar_string).unwrap_or_default();
        if let Some((_, bucket)) = tables.iter_mut().find(|(key, _)| *key == id) {
            bucket.push(row);
        }
    }
    // rows that all name unknown tables carry nothing usable
    if tables.iter().all(|(_, bucket)| bucket.is_empty()) {
        return None;
    }
    Some(CanonicalShape::NamedTableSet(NamedTables {
        tables,
        summary: Vec::new(),
    }))
}

/// Signature-free reparse used by the Sheet Builder's fallback paths.
/// A single-column "table" is indistinguishable from prose, so at least a
/// two-column header is required before anything counts as rows.
pub fn parse_generic_csv(response: &str) -> Vec<Record> {
    let trimmed = response.trim();
    if !trimmed.contains(';') {
        return Vec::new();
    }
    match parse_rows(csv_body(trimmed)) {
        Some((header, rows)) if header.len() >= 2 => rows,
        _ => Vec::new(),
    }
}

/// First non-empty trimmed line is the header; a line becomes a data row only
/// when its field count matches the header exactly. Malformed lines are
/// dropped, not repaired.
fn parse_rows(body: &str) -> Option<(Vec<String>, Vec<Record>)> {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let header: Vec<String> = lines
        .next()?
        .split(';')
        .map(|f| f.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        let fields: Vec<String> = line.split(';').map(clean_field).collect();
        if fields.len() != header.len() {
            continue;
        }
        rows.push(
            header
                .iter()
                .cloned()
                .zip(fields.into_iter().map(Value::String))
                .collect(),
        );
    }
    if rows.is_empty() {
        None
    } else {
        Some((header, rows))
    }
}

/// Trims the field and strips a single leading/trailing quote character.
fn clean_field(raw: &str) -> String {
    let t = raw.trim();
    let t = t.strip_prefix(['"', '\'']).unwrap_or(t);
    let t = t.strip_suffix(['"', '\'']).unwrap_or(t);
    t.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_signature_yields_flat_table() {
        let response = "Nome_Tabella;Area_Contrattuale\nT1;X\nT1;Y";
        let shape = parse_signature_csv(response).unwrap();
        let CanonicalShape::FlatTable(rows) = shape else {
            panic!("expected FlatTable");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Nome_Tabella"], json!("T1"));
        assert_eq!(rows[0]["Area_Contrattuale"], json!("X"));
        assert_eq!(rows[1]["Area_Contrattuale"], json!("Y"));
    }

    #[test]
    fn test_legacy_signature_groups_into_buckets() {
        let response = "Tipo_Tabella;Competenza\n\
                        tabella_6_competenze_trasversali;Comunicazione\n\
                        tabella_7_competenze_informatiche;Excel\n\
                        tabella_6_competenze_trasversali;Negoziazione";
        let shape = parse_signature_csv(response).unwrap();
        let CanonicalShape::NamedTableSet(tables) = shape else {
            panic!("expected NamedTableSet");
        };
        assert_eq!(tables.tables.len(), 8);
        let trasversali = &tables.tables[5];
        assert_eq!(trasversali.0, "tabella_6_competenze_trasversali");
        assert_eq!(trasversali.1.len(), 2);
        // non-matching buckets are present but empty
        assert!(tables.tables[0].1.is_empty());
    }

    #[test]
    fn test_rows_with_wrong_field_count_are_dropped() {
        let response = "Nome_Tabella;Colonna\nT1;ok\nT1;troppo;larga\nT1";
        let shape = parse_signature_csv(response).unwrap();
        let CanonicalShape::FlatTable(rows) = shape else {
            panic!("expected FlatTable");
        };
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_quotes_stripped_per_field() {
        let response = "Nome_Tabella;Valore\n\"T1\";'quoted'";
        let shape = parse_signature_csv(response).unwrap();
        let CanonicalShape::FlatTable(rows) = shape else {
            panic!("expected FlatTable");
        };
        assert_eq!(rows[0]["Nome_Tabella"], json!("T1"));
        assert_eq!(rows[0]["Valore"], json!("quoted"));
    }

    #[test]
    fn test_fenced_csv_body_preferred_over_prose() {
        let response = "Ecco i dati richiesti:\n```csv\nNome_Tabella;V\nT1;1\n```\nGrazie.";
        let shape = parse_signature_csv(response).unwrap();
        let CanonicalShape::FlatTable(rows) = shape else {
            panic!("expected FlatTable");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["V"], json!("1"));
    }

    #[test]
    fn test_no_signature_is_skipped() {
        assert!(parse_signature_csv("a;b\n1;2").is_none());
    }

    #[test]
    fn test_signature_in_values_does_not_trigger() {
        // pretty-printed JSON whose records mention the marker column and
        // carry a semicolon inside a value must not be read as CSV
        let response =
            "[\n {\"Nome_Tabella\":\"T1\",\"Voce\":\"a;b\"},\n {\"Nome_Tabella\":\"T1\",\"Voce\":\"c\"}\n]";
        assert!(parse_signature_csv(response).is_none());
    }

    #[test]
    fn test_all_unknown_table_ids_count_as_nothing() {
        let response = "Tipo_Tabella;Competenza\ntabella_sconosciuta;X";
        assert!(parse_signature_csv(response).is_none());
    }

    #[test]
    fn test_no_semicolon_is_skipped() {
        assert!(parse_signature_csv("Nome_Tabella\nT1").is_none());
    }

    #[test]
    fn test_header_only_counts_as_nothing() {
        assert!(parse_signature_csv("Nome_Tabella;V").is_none());
    }

    #[test]
    fn test_generic_parse_needs_two_columns() {
        assert!(parse_generic_csv("solo testo\nsu più righe").is_empty());
        let rows = parse_generic_csv("a;b\n1;2\n3;4");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["b"], json!("4"));
    }
}
