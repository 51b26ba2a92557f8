use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A table header: the JSON object that introduces a table in the stream.
///
/// The required `name` and the conventional `columns` fields are exposed
/// through accessors; every other key/value pair is opaque metadata and
/// round-trips verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableHeader {
    object: Map<String, Value>,
}

impl TableHeader {
    /// Build a header with a `name` and an ordered column list.
    pub fn new<S, C>(name: S, columns: C) -> Self
    where
        S: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut object = Map::new();
        object.insert("name".to_string(), Value::String(name.into()));
        object.insert(
            "columns".to_string(),
            Value::Array(
                columns
                    .into_iter()
                    .map(|c| Value::String(c.into()))
                    .collect(),
            ),
        );
        TableHeader { object }
    }

    /// Wrap a decoded JSON object as a header, preserving every field.
    pub fn from_object(object: Map<String, Value>) -> Self {
        TableHeader { object }
    }

    /// Attach an extra metadata field (builder style).
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.object.insert(key.into(), value);
        self
    }

    /// The table name, if the header carries one.
    pub fn name(&self) -> Option<&str> {
        self.object.get("name").and_then(Value::as_str)
    }

    /// The declared column names, in order. Empty when the header has no
    /// `columns` field; non-string entries are skipped.
    pub fn columns(&self) -> Vec<String> {
        match self.object.get("columns") {
            Some(Value::Array(cols)) => cols
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.object
    }
}

/// A named table: header plus an ordered sequence of rows.
///
/// Rows are JSON arrays; cells are arbitrary JSON values. Row length is not
/// checked against the column count at construction; see [`Table::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: TableHeader,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(header: TableHeader, rows: Vec<Vec<Value>>) -> Self {
        Table { header, rows }
    }

    pub fn name(&self) -> Option<&str> {
        self.header.name()
    }

    pub fn columns(&self) -> Vec<String> {
        self.header.columns()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Opt-in strict check that every row has exactly as many cells as the
    /// header declares columns. Tolerated everywhere else, so legacy data
    /// with ragged rows still loads.
    pub fn validate(&self) -> Result<()> {
        let expected = self.columns().len();
        let table = self.name().unwrap_or_default().to_string();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(Error::RowLength {
                    table,
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }
        Ok(())
    }
}

/// A name-keyed collection of tables.
///
/// Names are unique by construction: inserting a table whose name is already
/// present replaces the earlier entry (last-write-wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Insert a table under its header name. Fails with
    /// [`Error::MissingName`] when the header has no `name`; silently
    /// replaces any same-named table already present.
    pub fn insert(&mut self, table: Table) -> Result<()> {
        let name = table.name().ok_or(Error::MissingName)?.to_string();
        self.tables.insert(name, table);
        Ok(())
    }

    /// Assemble a database from a sequence of tables, last-write-wins.
    pub fn from_tables<I>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut db = Database::new();
        for table in tables {
            db.insert(table)?;
        }
        Ok(db)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Run [`Table::validate`] over every table.
    pub fn validate(&self) -> Result<()> {
        for table in self.tables.values() {
            table.validate()?;
        }
        Ok(())
    }
}
