//! Byte-offset indexing of a line stream
//!
//! Produces one `(start, len)` pair per line, where `len` includes the line
//! terminator. The pairs are enough to `seek` and re-read any single line
//! from a byte-seekable copy of the same content without rescanning from the
//! start. The use case is random-access indexes over large append-only
//! logs, not the main conversion path.

use std::io::BufRead;

use crate::error::Result;

/// Lazy `(start_offset, byte_length)` pairs over a line stream.
pub struct LineOffsets<R> {
    reader: R,
    buf: Vec<u8>,
    offset: u64,
}

impl<R: BufRead> LineOffsets<R> {
    pub fn new(reader: R) -> Self {
        LineOffsets {
            reader,
            buf: Vec::new(),
            offset: 0,
        }
    }
}

impl<R: BufRead> Iterator for LineOffsets<R> {
    type Item = Result<(u64, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(n) => {
                let start = self.offset;
                self.offset += n as u64;
                Some(Ok((start, n as u64)))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}
