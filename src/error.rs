use thiserror::Error;

use crate::stream::Span;

/// Errors produced while parsing, assembling, converting, or querying
/// jsontable data.
///
/// Parsing and I/O failures are permanent conditions: nothing here is
/// retried, and any error aborts the conversion that raised it.
#[derive(Error, Debug)]
pub enum Error {
    /// A non-blank input line failed to decode as a JSON value.
    ///
    /// `line` is 1-based. `span` is the byte range of the offending line
    /// when the source is byte-backed, `None` for live text streams.
    #[error("line {line} is not valid JSON{}: {source}", span_note(.span))]
    MalformedLine {
        line: usize,
        span: Option<Span>,
        source: serde_json::Error,
    },

    /// A table header object has no `"name"` field.
    #[error("table header has no \"name\" field")]
    MissingName,

    /// An adapter write needs a column list but the header carries none.
    #[error("table {table:?} has no \"columns\" field")]
    MissingColumns { table: String },

    /// A row's length does not match the header's column count.
    ///
    /// Only raised by the opt-in validation entry points; construction and
    /// deserialization tolerate the mismatch.
    #[error("table {table:?} row {row}: expected {expected} cells, found {found}")]
    RowLength {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The relational engine rejected a query; the engine diagnostic is
    /// surfaced verbatim.
    #[error("query failed: {0}")]
    Query(rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn span_note(span: &Option<Span>) -> String {
    match span {
        Some(s) => format!(" (bytes {}..{})", s.start, s.end),
        None => String::new(),
    }
}
