//! # Jsontable - multiplexed table streams
//!
//! A line-oriented interchange format ("jsontable", file extension `.jmt`)
//! that packs multiple named tables into a single newline-delimited JSON
//! stream: each table is a header object carrying `name` and `columns`,
//! followed by one JSON array per row, until the next header object.
//!
//! ## Modules
//!
//! - **stream**: lazy line classification, table grouping, byte-offset
//!   indexing
//! - **table**: the in-memory `Table`/`Database` model
//! - **codec**: the jsontable-text codec plus spreadsheet and SQLite
//!   adapters
//! - **query**: ad-hoc SQL over a database via an embedded engine
//!
//! ## Quick Start
//!
//! ### Reading a stream
//!
//! ```rust
//! use jsontable::read_jsontable;
//!
//! # fn main() -> jsontable::Result<()> {
//! let stream = concat!(
//!     r#"{"name":"ages","columns":["name","age"]}"#, "\n",
//!     r#"["alberto",2]"#, "\n",
//!     r#"["barbara",4]"#, "\n",
//! );
//!
//! let db = read_jsontable(stream.as_bytes())?;
//! assert_eq!(db.get("ages").unwrap().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Querying with SQL
//!
//! ```rust
//! use jsontable::{query, read_jsontable};
//!
//! # fn main() -> jsontable::Result<()> {
//! let stream = concat!(
//!     r#"{"name":"ages","columns":["name","age"]}"#, "\n",
//!     r#"["alberto",2]"#, "\n",
//!     r#"["barbara",4]"#, "\n",
//! );
//!
//! let db = read_jsontable(stream.as_bytes())?;
//! let rows = query(&db, "SELECT name FROM ages WHERE age > 2")?;
//! assert_eq!(rows[0]["name"], "barbara");
//! # Ok(())
//! # }
//! ```

use std::io::{BufRead, Write};

pub mod codec;
pub mod error;
pub mod query;
pub mod stream;
pub mod table;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use query::{query, RelationalEngine, SqliteEngine};
pub use stream::{
    ClassifiedLines, ClassifiedText, LineOffsets, LocatedValue, Span, TableGroups, ValueKind,
};
pub use table::{Database, Table, TableHeader};

/// Main entry point: read a jsontable stream into a [`Database`].
pub fn read_jsontable<R: BufRead>(reader: R) -> Result<Database> {
    codec::text::read_from(reader)
}

/// Write a [`Database`] as jsontable lines.
pub fn write_jsontable<W: Write>(db: &Database, writer: W) -> Result<()> {
    codec::text::write_to(db, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_write_read_is_stable() {
        let input = concat!("{\"name\":\"t\",\"columns\":[\"x\"]}\n", "[1]\n", "[2]\n");

        let db = read_jsontable(input.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_jsontable(&db, &mut out).unwrap();
        let again = read_jsontable(&out[..]).unwrap();

        assert_eq!(again, db);
        assert_eq!(
            again.get("t").unwrap().rows,
            vec![vec![json!(1)], vec![json!(2)]]
        );
    }
}
