//! Binary spreadsheet boundary: `rust_xlsxwriter` on the way out, `calamine`
//! on the way back in (consolidation re-reads the per-row files it just wrote).

use std::io::Cursor;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;

use crate::export::workbook::{columns, Workbook};
use crate::models::{scalar_string, Record};

/// Serializes the workbook to xlsx bytes.
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut out = rust_xlsxwriter::Workbook::new();
    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .with_context(|| format!("invalid sheet name '{}'", sheet.name))?;
        let cols = columns(&sheet.rows);
        for (c, name) in cols.iter().enumerate() {
            worksheet.write_string(0, c as u16, name)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, name) in cols.iter().enumerate() {
                let Some(value) = row.get(name) else { continue };
                let row_num = (r + 1) as u32;
                match value {
                    Value::Null => {}
                    Value::Number(n) => {
                        worksheet.write_number(row_num, c as u16, n.as_f64().unwrap_or(0.0))?;
                    }
                    Value::Bool(b) => {
                        worksheet.write_boolean(row_num, c as u16, *b)?;
                    }
                    other => {
                        worksheet.write_string(row_num, c as u16, scalar_string(other))?;
                    }
                }
            }
        }
    }
    Ok(out.save_to_buffer()?)
}

/// Reads xlsx bytes back into the in-memory model. The first row of every
/// sheet is taken as the header; fully empty rows are skipped.
pub fn read_workbook(bytes: &[u8]) -> Result<Workbook> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut source =
        open_workbook_auto_from_rs(cursor).context("payload is not a readable workbook")?;

    let mut workbook = Workbook::new();
    for name in source.sheet_names().to_vec() {
        let range = source
            .worksheet_range(&name)
            .with_context(|| format!("sheet '{name}' is unreadable"))?;
        let mut rows_iter = range.rows();
        let Some(header_row) = rows_iter.next() else {
            workbook.push_sheet(&name, Vec::new());
            continue;
        };
        let header: Vec<String> = header_row.iter().map(|c| c.to_string()).collect();

        let mut rows = Vec::new();
        for data_row in rows_iter {
            let mut record = Record::new();
            for (i, cell) in data_row.iter().enumerate() {
                let Some(col) = header.get(i) else { break };
                let value = cell_value(cell);
                if !value.is_null() {
                    record.insert(col.clone(), value);
                }
            }
            if !record.is_empty() {
                rows.push(record);
            }
        }
        workbook.push_sheet(&name, rows);
    }
    Ok(workbook)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}
