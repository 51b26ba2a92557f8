//! Relational adapter backed by SQLite
//!
//! One relation per table: writing drops and recreates any same-named
//! relation (idempotent replace, not append), with column affinity inferred
//! from the row values. Reading derives `columns` from statement metadata
//! and `name` from `sqlite_master`.
//!
//! Medium coercion, as the relational engine requires it: booleans become
//! 0/1 integers, nested arrays/objects are stored as their JSON text, and
//! SQL NULL maps to JSON null. Cells come back as whatever SQLite kept.

use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Database, Table, TableHeader};

/// Write every table of the database into a SQLite file.
pub fn write_path(db: &Database, path: impl AsRef<Path>) -> Result<()> {
    let conn = Connection::open(path.as_ref())?;
    write_to_connection(db, &conn)
}

/// Read every user table of a SQLite file into a database.
pub fn read_path(path: impl AsRef<Path>) -> Result<Database> {
    let conn = Connection::open(path.as_ref())?;
    read_from_connection(&conn)
}

/// Write into an already-open connection, replacing same-named relations.
pub fn write_to_connection(db: &Database, conn: &Connection) -> Result<()> {
    for (name, table) in db.iter() {
        let columns = table.columns();
        if columns.is_empty() {
            return Err(Error::MissingColumns {
                table: name.clone(),
            });
        }

        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;

        let column_defs = columns
            .iter()
            .enumerate()
            .map(|(i, col)| match column_affinity(&table.rows, i) {
                Some(affinity) => format!("{} {}", quote_ident(col), affinity),
                None => quote_ident(col),
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(name),
            column_defs
        ))?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut insert = conn.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(name),
            placeholders
        ))?;
        for row in &table.rows {
            insert.execute(params_from_iter(row.iter().map(cell_to_sql)))?;
        }

        debug!(table = %name, rows = table.len(), "wrote relation");
    }
    Ok(())
}

/// Read every user table of an open connection.
pub fn read_from_connection(conn: &Connection) -> Result<Database> {
    let mut names = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for name in rows {
            names.push(name?);
        }
    }

    let mut db = Database::new();
    for name in names {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(&name)))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut data = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(sql_to_cell(row.get_ref(i)?));
            }
            data.push(cells);
        }

        let header = TableHeader::new(name.as_str(), columns);
        db.insert(Table::new(header, data))?;
    }
    Ok(db)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column affinity from the values actually present: all-integer columns get
/// INTEGER, numeric mixes get REAL, text-only get TEXT, anything mixed or
/// all-null stays untyped (SQLite accepts typeless columns).
fn column_affinity(rows: &[Vec<Value>], index: usize) -> Option<&'static str> {
    let mut ints = false;
    let mut reals = false;
    let mut texts = false;

    for row in rows {
        match row.get(index) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(_)) => ints = true,
            Some(Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    ints = true;
                } else {
                    reals = true;
                }
            }
            Some(_) => texts = true,
        }
    }

    match (ints, reals, texts) {
        (false, false, false) => None,
        (true, false, false) => Some("INTEGER"),
        (_, true, false) => Some("REAL"),
        (false, false, true) => Some("TEXT"),
        _ => None,
    }
}

fn cell_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            // as_f64 is total over serde_json numbers
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        nested => SqlValue::Text(nested.to_string()),
    }
}

pub(crate) fn sql_to_cell(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Database {
        let ages = Table::new(
            TableHeader::new("ages", ["name", "age"]),
            vec![
                vec![json!("alberto"), json!(2)],
                vec![json!("barbara"), json!(4)],
                vec![json!("carlos"), json!(6)],
            ],
        );
        let wealths = Table::new(
            TableHeader::new("wealths", ["name", "wealth"]),
            vec![
                vec![json!("alberto"), json!(3)],
                vec![json!("barbara"), json!(5)],
                vec![json!("diana"), json!(7)],
            ],
        );
        Database::from_tables([ages, wealths]).unwrap()
    }

    #[test]
    fn connection_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        let db = sample();
        write_to_connection(&db, &conn).unwrap();
        assert_eq!(read_from_connection(&conn).unwrap(), db);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        let db = sample();
        write_path(&db, &path).unwrap();
        assert_eq!(read_path(&path).unwrap(), db);
    }

    #[test]
    fn rewrite_replaces_same_named_relations() {
        let conn = Connection::open_in_memory().unwrap();

        let first = Database::from_tables([Table::new(
            TableHeader::new("t", ["x"]),
            vec![vec![json!(1)], vec![json!(2)]],
        )])
        .unwrap();
        write_to_connection(&first, &conn).unwrap();

        let second = Database::from_tables([Table::new(
            TableHeader::new("t", ["x"]),
            vec![vec![json!(9)]],
        )])
        .unwrap();
        write_to_connection(&second, &conn).unwrap();

        // Replaced, not appended.
        assert_eq!(read_from_connection(&conn).unwrap(), second);
    }

    #[test]
    fn unrelated_relations_survive_a_write() {
        let conn = Connection::open_in_memory().unwrap();

        let keep = Database::from_tables([Table::new(
            TableHeader::new("keep", ["k"]),
            vec![vec![json!("kept")]],
        )])
        .unwrap();
        write_to_connection(&keep, &conn).unwrap();

        let other = Database::from_tables([Table::new(
            TableHeader::new("other", ["o"]),
            vec![vec![json!(1)]],
        )])
        .unwrap();
        write_to_connection(&other, &conn).unwrap();

        let merged = read_from_connection(&conn).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("keep"), keep.get("keep"));
    }

    #[test]
    fn medium_coercions_are_lossy_but_defined() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database::from_tables([Table::new(
            TableHeader::new("t", ["flag", "tags", "missing"]),
            vec![vec![json!(true), json!([1, 2]), json!(null)]],
        )])
        .unwrap();
        write_to_connection(&db, &conn).unwrap();

        let back = read_from_connection(&conn).unwrap();
        assert_eq!(
            back.get("t").unwrap().rows,
            vec![vec![json!(1), json!("[1,2]"), json!(null)]]
        );
    }

    #[test]
    fn missing_columns_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let table = Table::new(
            TableHeader::from_object(
                serde_json::from_value(json!({"name": "bare"})).unwrap(),
            ),
            vec![vec![json!(1)]],
        );
        let db = Database::from_tables([table]).unwrap();

        match write_to_connection(&db, &conn) {
            Err(Error::MissingColumns { table }) => assert_eq!(table, "bare"),
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn identifiers_are_quoted() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database::from_tables([Table::new(
            TableHeader::new("odd table", ["a b", "select"]),
            vec![vec![json!(1), json!(2)]],
        )])
        .unwrap();
        write_to_connection(&db, &conn).unwrap();
        assert_eq!(read_from_connection(&conn).unwrap(), db);
    }
}
