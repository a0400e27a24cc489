//! In-memory workbook model shared by the Sheet Builder and the exporters.
//! Built fresh per export request and never mutated after serialization.

use crate::models::Record;

/// xlsx sheet names cap out at 31 characters.
pub const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet, truncating the name to the xlsx limit and suffixing a
    /// counter when the name is already taken.
    pub fn push_sheet(&mut self, name: &str, rows: Vec<Record>) {
        let name = self.unique_name(truncate_name(name));
        self.sheets.push(Sheet { name, rows });
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn unique_name(&self, base: String) -> String {
        if self.sheet(&base).is_none() {
            return base;
        }
        for i in 2.. {
            let suffix = format!("_{i}");
            let mut candidate = base.clone();
            candidate.truncate(MAX_SHEET_NAME.saturating_sub(suffix.len()));
            candidate.push_str(&suffix);
            if self.sheet(&candidate).is_none() {
                return candidate;
            }
        }
        unreachable!()
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME).collect()
}

/// Column order for serialization: first appearance across the sheet's rows.
pub fn columns(rows: &[Record]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !cols.iter().any(|c| c == key) {
                cols.push(key.clone());
            }
        }
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sheet_name_truncated_to_xlsx_limit() {
        let mut wb = Workbook::new();
        wb.push_sheet("UNA_INTESTAZIONE_DAVVERO_MOLTO_LUNGA_OLTRE_IL_LIMITE", vec![]);
        assert_eq!(wb.sheets[0].name.chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn test_duplicate_sheet_names_get_suffixed() {
        let mut wb = Workbook::new();
        wb.push_sheet("RISULTATO", vec![]);
        wb.push_sheet("RISULTATO", vec![]);
        wb.push_sheet("RISULTATO", vec![]);
        assert_eq!(wb.sheets[1].name, "RISULTATO_2");
        assert_eq!(wb.sheets[2].name, "RISULTATO_3");
    }

    #[test]
    fn test_columns_in_first_appearance_order() {
        let rows: Vec<Record> = vec![
            serde_json::from_value(json!({"b": 1, "a": 2})).unwrap(),
            serde_json::from_value(json!({"a": 3, "c": 4})).unwrap(),
        ];
        assert_eq!(columns(&rows), vec!["b", "a", "c"]);
    }
}
