//! Table segmentation over a classified line stream
//!
//! The grouper is pure segmentation over a two-symbol alphabet: object-kind
//! values open (or re-open) a header, array-kind values extend the current
//! row run, and everything else is invisible. Rules, in input order:
//!
//! - arrays before the first object have no header and are dropped;
//! - consecutive objects collapse to the last one (duplicate-header
//!   tie-break);
//! - each object run followed by an array run yields exactly one
//!   `(header, rows)` pair;
//! - a trailing object run yields nothing, so a zero-row table is never
//!   reconstructed from a stream. That asymmetry is deliberate and covered
//!   by tests here and in the text codec.
//!
//! A pair's row run is realized eagerly (downstream writers need row counts
//! up front); the stream is otherwise consumed one value at a time.

use serde_json::Value;

use crate::error::Result;
use crate::stream::classify::{LocatedValue, ValueKind};
use crate::table::TableHeader;

/// Lazy iterator of `(header, rows)` pairs over classified values.
///
/// Upstream errors pass through unchanged; the grouper itself never fails.
pub struct TableGroups<I> {
    input: I,
    pending: Option<serde_json::Map<String, Value>>,
}

impl<I> TableGroups<I>
where
    I: Iterator<Item = Result<LocatedValue>>,
{
    pub fn new(input: I) -> Self {
        TableGroups {
            input,
            pending: None,
        }
    }
}

impl<I> Iterator for TableGroups<I>
where
    I: Iterator<Item = Result<LocatedValue>>,
{
    type Item = Result<(TableHeader, Vec<LocatedValue>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.input.next() {
                // End of stream: a pending header has no rows and is dropped.
                None => return None,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(v)) => v,
            };

            match item.kind() {
                ValueKind::Object => {
                    // Within an object run the last header wins.
                    if let Value::Object(map) = item.value {
                        self.pending = Some(map);
                    }
                }
                ValueKind::Array => {
                    // No header yet: leading arrays are unrepresentable.
                    let Some(header) = self.pending.take() else {
                        continue;
                    };

                    let mut rows = vec![item];
                    loop {
                        match self.input.next() {
                            None => break,
                            Some(Err(e)) => return Some(Err(e)),
                            Some(Ok(next)) => match next.kind() {
                                ValueKind::Array => rows.push(next),
                                ValueKind::Object => {
                                    if let Value::Object(map) = next.value {
                                        self.pending = Some(map);
                                    }
                                    break;
                                }
                                ValueKind::Other => {}
                            },
                        }
                    }
                    return Some(Ok((TableHeader::from_object(header), rows)));
                }
                ValueKind::Other => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn lv(value: Value) -> Result<LocatedValue> {
        Ok(LocatedValue { span: None, value })
    }

    fn group(values: Vec<Value>) -> Vec<(TableHeader, Vec<Value>)> {
        TableGroups::new(values.into_iter().map(lv))
            .map(|pair| {
                let (header, rows) = pair.unwrap();
                (header, rows.into_iter().map(|r| r.value).collect())
            })
            .collect()
    }

    #[test]
    fn pairs_form_at_each_object_to_array_boundary() {
        let pairs = group(vec![
            json!({"name": "a", "columns": ["x"]}),
            json!([1]),
            json!([2]),
            json!({"name": "b", "columns": ["y"]}),
            json!([3]),
        ]);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.name(), Some("a"));
        assert_eq!(pairs[0].1, vec![json!([1]), json!([2])]);
        assert_eq!(pairs[1].0.name(), Some("b"));
        assert_eq!(pairs[1].1, vec![json!([3])]);
    }

    #[test]
    fn leading_arrays_are_dropped() {
        let with_junk = group(vec![
            json!(["5"]),
            json!([6, 7]),
            json!({"name": "t", "columns": ["x"]}),
            json!([1]),
        ]);
        let without = group(vec![json!({"name": "t", "columns": ["x"]}), json!([1])]);

        assert_eq!(with_junk.len(), 1);
        assert_eq!(with_junk[0].0, without[0].0);
        assert_eq!(with_junk[0].1, without[0].1);
    }

    #[test]
    fn trailing_header_yields_nothing() {
        let pairs = group(vec![
            json!({"name": "a", "columns": ["x"]}),
            json!([1]),
            json!({"name": "orphan", "columns": ["y"]}),
        ]);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.name(), Some("a"));
    }

    #[test]
    fn consecutive_headers_collapse_to_the_last() {
        // Scenario: two headers back to back, then one row. The first header
        // is silently discarded.
        let pairs = group(vec![
            json!({"name": "t", "columns": ["x"]}),
            json!({"name": "t2", "columns": ["y"]}),
            json!([1]),
        ]);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.name(), Some("t2"));
        assert_eq!(pairs[0].1, vec![json!([1])]);
    }

    #[test]
    fn scalars_never_break_a_run() {
        let pairs = group(vec![
            json!("comment"),
            json!({"name": "t", "columns": ["x"]}),
            json!(42),
            json!([1]),
            json!(true),
            json!([2]),
            json!(null),
        ]);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, vec![json!([1]), json!([2])]);
    }

    #[test]
    fn header_metadata_survives_grouping() {
        let pairs = group(vec![
            json!({"name": "t", "columns": ["x"], "origin": "sensor-7"}),
            json!([1]),
        ]);

        assert_eq!(
            pairs[0].0.as_object().get("origin"),
            Some(&json!("sensor-7"))
        );
    }

    #[test]
    fn upstream_errors_pass_through() {
        let source = serde_json::from_str::<Value>("{").unwrap_err();
        let items: Vec<Result<LocatedValue>> = vec![
            lv(json!({"name": "t", "columns": ["x"]})),
            Err(Error::MalformedLine {
                line: 2,
                span: None,
                source,
            }),
        ];

        let out: Vec<_> = TableGroups::new(items.into_iter()).collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(Error::MalformedLine { line: 2, .. })));
    }

    #[test]
    fn empty_stream_yields_nothing() {
        assert!(group(vec![]).is_empty());
    }
}
