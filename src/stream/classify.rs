//! Line classification: raw lines in, located JSON values out
//!
//! Byte offsets are measured on the raw undecoded bytes and always include
//! the line terminator, so `Span::end` of one line equals `Span::start` of
//! the next. Sources that are not byte-backed (a live text stream) carry no
//! span at all.

use serde_json::Value;
use std::io::BufRead;

use crate::error::{Error, Result};

/// Byte range of one line in its source, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Top-level JSON kind of a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Object,
    Array,
    /// Scalar, string, bool, or null; ignored by the grouper.
    Other,
}

/// A decoded JSON value plus its provenance in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedValue {
    /// `None` when the source is not byte-backed.
    pub span: Option<Span>,
    pub value: Value,
}

impl LocatedValue {
    pub fn kind(&self) -> ValueKind {
        match self.value {
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            _ => ValueKind::Other,
        }
    }
}

/// Lazy classifier over a byte-backed reader.
///
/// Reads one line at a time, skips blank lines, and decodes the rest with
/// `serde_json`. Malformed lines surface as [`Error::MalformedLine`] items;
/// the iterator keeps going, so whether that is fatal is the consumer's
/// policy, not the classifier's.
pub struct ClassifiedLines<R> {
    reader: R,
    buf: Vec<u8>,
    offset: u64,
    line: usize,
}

impl<R: BufRead> ClassifiedLines<R> {
    pub fn new(reader: R) -> Self {
        ClassifiedLines {
            reader,
            buf: Vec::new(),
            offset: 0,
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for ClassifiedLines<R> {
    type Item = Result<LocatedValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let n = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(n) => n,
                Err(e) => return Some(Err(Error::Io(e))),
            };

            let span = Span {
                start: self.offset,
                end: self.offset + n as u64,
            };
            self.offset = span.end;
            self.line += 1;

            let content = self.buf.trim_ascii();
            if content.is_empty() {
                continue;
            }

            return Some(match serde_json::from_slice(content) {
                Ok(value) => Ok(LocatedValue {
                    span: Some(span),
                    value,
                }),
                Err(source) => Err(Error::MalformedLine {
                    line: self.line,
                    span: Some(span),
                    source,
                }),
            });
        }
    }
}

/// Classifier over already-decoded text lines (no seekable byte source).
pub struct ClassifiedText<I> {
    lines: I,
    line: usize,
}

impl<I> ClassifiedText<I> {
    pub fn new(lines: I) -> Self {
        ClassifiedText { lines, line: 0 }
    }
}

impl<I, S> Iterator for ClassifiedText<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<LocatedValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;

            let content = raw.as_ref().trim();
            if content.is_empty() {
                continue;
            }

            return Some(match serde_json::from_str(content) {
                Ok(value) => Ok(LocatedValue { span: None, value }),
                Err(source) => Err(Error::MalformedLine {
                    line: self.line,
                    span: None,
                    source,
                }),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(bytes: &[u8]) -> Vec<Result<LocatedValue>> {
        ClassifiedLines::new(bytes).collect()
    }

    #[test]
    fn spans_cover_terminators() {
        let out = classify(b"{\"a\":1}\n[1,2]\n");
        assert_eq!(out.len(), 2);

        let first = out[0].as_ref().unwrap();
        assert_eq!(first.span, Some(Span { start: 0, end: 8 }));
        assert_eq!(first.value, json!({"a": 1}));

        let second = out[1].as_ref().unwrap();
        assert_eq!(second.span, Some(Span { start: 8, end: 14 }));
        assert_eq!(second.value, json!([1, 2]));
    }

    #[test]
    fn blank_lines_are_skipped_but_counted_into_offsets() {
        let out = classify(b"{}\n\n   \n[1]\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().span, Some(Span { start: 0, end: 3 }));
        assert_eq!(out[1].as_ref().unwrap().span, Some(Span { start: 8, end: 12 }));
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let out = classify(b"{}\r\n[1]\r\n");
        assert_eq!(out[0].as_ref().unwrap().value, json!({}));
        assert_eq!(out[0].as_ref().unwrap().span, Some(Span { start: 0, end: 4 }));
        assert_eq!(out[1].as_ref().unwrap().value, json!([1]));
    }

    #[test]
    fn last_line_may_lack_a_terminator() {
        let out = classify(b"[1]");
        assert_eq!(out[0].as_ref().unwrap().span, Some(Span { start: 0, end: 3 }));
    }

    #[test]
    fn malformed_line_reports_and_continues() {
        let out = classify(b"{\"ok\":1}\n{nope\n[2]\n");
        assert_eq!(out.len(), 3);

        match &out[1] {
            Err(Error::MalformedLine { line, span, .. }) => {
                assert_eq!(*line, 2);
                assert_eq!(*span, Some(Span { start: 9, end: 15 }));
            }
            other => panic!("expected MalformedLine, got {other:?}"),
        }

        // The classifier itself carries on past the bad line.
        assert_eq!(out[2].as_ref().unwrap().value, json!([2]));
    }

    #[test]
    fn scalars_classify_as_other() {
        let out = classify(b"\"a comment\"\n42\ntrue\nnull\n");
        for item in &out {
            assert_eq!(item.as_ref().unwrap().kind(), ValueKind::Other);
        }
    }

    #[test]
    fn kinds_match_top_level_shape() {
        let out = classify(b"{}\n[]\n");
        assert_eq!(out[0].as_ref().unwrap().kind(), ValueKind::Object);
        assert_eq!(out[1].as_ref().unwrap().kind(), ValueKind::Array);
    }

    #[test]
    fn text_lines_have_no_spans() {
        let lines = ["{\"name\":\"t\"}", "", "[1]"];
        let out: Vec<_> = ClassifiedText::new(lines.iter()).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().span, None);
        assert_eq!(out[1].as_ref().unwrap().value, json!([1]));
    }
}
