//! Ad-hoc SQL over a database
//!
//! The engine is an injected capability: anything that can load a
//! [`Database`] and execute SQL satisfies [`RelationalEngine`], and the
//! bundled [`SqliteEngine`] is just the default implementation. Queries are
//! single-shot: load into a transient engine, execute, return the rows,
//! and engine diagnostics surface verbatim as [`Error::Query`].

use std::path::Path;

use rusqlite::Connection;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::sqlite;
use crate::error::{Error, Result};
use crate::table::Database;

/// A relational backend that can materialize a database and run SQL on it.
pub trait RelationalEngine {
    fn load(&mut self, db: &Database) -> Result<()>;

    /// Execute a query, returning one column-name -> value mapping per result
    /// row, in engine-determined order.
    fn execute(&mut self, sql: &str) -> Result<Vec<Map<String, Value>>>;
}

/// SQLite-backed engine, in-memory by default.
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    pub fn in_memory() -> Result<Self> {
        Ok(SqliteEngine {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(SqliteEngine {
            conn: Connection::open(path.as_ref())?,
        })
    }
}

impl RelationalEngine for SqliteEngine {
    fn load(&mut self, db: &Database) -> Result<()> {
        sqlite::write_to_connection(db, &self.conn)
    }

    fn execute(&mut self, sql: &str) -> Result<Vec<Map<String, Value>>> {
        let mut stmt = self.conn.prepare(sql).map_err(Error::Query)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut out = Vec::new();
        let mut rows = stmt.query([]).map_err(Error::Query)?;
        while let Some(row) = rows.next().map_err(Error::Query)? {
            let mut record = Map::new();
            for (i, column) in columns.iter().enumerate() {
                let cell = row.get_ref(i).map_err(Error::Query)?;
                record.insert(column.clone(), sqlite::sql_to_cell(cell));
            }
            out.push(record);
        }
        Ok(out)
    }
}

/// Load the database into a transient in-memory engine and run one query.
pub fn query(db: &Database, sql: &str) -> Result<Vec<Map<String, Value>>> {
    let mut engine = SqliteEngine::in_memory()?;
    engine.load(db)?;
    debug!(%sql, "executing query");
    engine.execute(sql)
}
