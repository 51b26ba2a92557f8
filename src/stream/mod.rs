//! Streaming classification and grouping of jsontable lines
//!
//! The read side of the codec is a pull-based pipeline: a classifier turns
//! raw lines into located JSON values, and a grouper segments those values
//! into `(header, rows)` pairs. Each stage is a lazy iterator backed by the
//! previous one; only a single table's row run is ever held in memory.

pub mod classify;
pub mod group;
pub mod index;

pub use classify::{ClassifiedLines, ClassifiedText, LocatedValue, Span, ValueKind};
pub use group::TableGroups;
pub use index::LineOffsets;
