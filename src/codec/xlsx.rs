//! Spreadsheet adapter
//!
//! One worksheet per table: the first row holds the column names, every
//! following row is data, column order preserved. Reading skips sheets with
//! no header row. Writing has replace-if-exists semantics: sheets named
//! like a table in the database are replaced, unrelated sheets in an
//! existing destination workbook are carried over, and the whole workbook
//! is rewritten through a temp file and renamed into place.
//!
//! Workbook cells are IEEE doubles, so integer fidelity is recovered on
//! read by folding integral floats back to JSON integers. Nested
//! arrays/objects are stored as their JSON text.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Database, Table, TableHeader};

/// Read every sheet of a workbook into a database.
pub fn read_path(path: impl AsRef<Path>) -> Result<Database> {
    let mut workbook = open_workbook_auto(path.as_ref())?;
    let names = workbook.sheet_names().to_owned();

    let mut db = Database::new();
    for sheet in names {
        let range = workbook.worksheet_range(&sheet)?;
        let mut rows = range.rows();

        // No header row, no columns to derive: skip the sheet.
        let Some(header_row) = rows.next() else {
            continue;
        };
        let columns: Vec<String> = header_row.iter().map(cell_to_column).collect();
        let data: Vec<Vec<Value>> = rows
            .map(|row| row.iter().map(cell_to_value).collect())
            .collect();

        db.insert(Table::new(TableHeader::new(sheet.as_str(), columns), data))?;
    }
    debug!(tables = db.len(), "read workbook");
    Ok(db)
}

/// Write every table of the database as a worksheet, replacing same-named
/// sheets and preserving the rest of an existing destination workbook.
pub fn write_path(db: &Database, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let mut preserved: Vec<(String, Vec<Vec<Value>>)> = Vec::new();
    if path.exists() {
        let mut existing = open_workbook_auto(path)?;
        let names = existing.sheet_names().to_owned();
        for sheet in names {
            if db.get(&sheet).is_some() {
                continue;
            }
            let range = existing.worksheet_range(&sheet)?;
            let grid = range
                .rows()
                .map(|row| row.iter().map(cell_to_value).collect())
                .collect();
            preserved.push((sheet, grid));
        }
    }

    let mut workbook = Workbook::new();
    for (sheet, grid) in &preserved {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet)?;
        for (r, row) in grid.iter().enumerate() {
            write_row(worksheet, r as u32, row)?;
        }
    }
    for (name, table) in db.iter() {
        let columns = table.columns();
        if columns.is_empty() {
            return Err(Error::MissingColumns {
                table: name.clone(),
            });
        }

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        let header_cells: Vec<Value> = columns.into_iter().map(Value::String).collect();
        write_row(worksheet, 0, &header_cells)?;
        for (r, row) in table.rows.iter().enumerate() {
            write_row(worksheet, r as u32 + 1, row)?;
        }
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new().suffix(".xlsx").tempfile_in(dir)?;
    let tmp_path = tmp.into_temp_path();
    workbook.save(&*tmp_path)?;
    tmp_path.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), tables = db.len(), "wrote workbook");
    Ok(())
}

fn write_row(worksheet: &mut Worksheet, row: u32, cells: &[Value]) -> Result<()> {
    for (c, cell) in cells.iter().enumerate() {
        let col = c as u16;
        match cell {
            Value::Null => {}
            Value::Bool(b) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            Value::Number(n) => {
                worksheet.write_number(row, col, n.as_f64().unwrap_or(0.0))?;
            }
            Value::String(s) => {
                worksheet.write_string(row, col, s)?;
            }
            nested => {
                worksheet.write_string(row, col, nested.to_string())?;
            }
        }
    }
    Ok(())
}

fn cell_to_column(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_to_value(*f),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => float_to_value(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}

fn float_to_value(f: f64) -> Value {
    // Integral doubles inside the exactly-representable range read back as
    // JSON integers; everything else stays a float.
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}
