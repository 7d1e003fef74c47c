use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Longest line kept whole; anything longer is split at this size
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits process output into trimmed, non-empty text lines.
///
/// A line without its terminating newline stays buffered until more bytes
/// arrive, so a line split across two reads is emitted once. Invalid UTF-8 is
/// replaced rather than treated as an error.
#[derive(Clone, Debug)]
pub struct LogLineCodec {
    max_length: usize,
    /// Bytes of `src` already scanned for a newline
    scanned: usize,
}

impl LogLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            scanned: 0,
        }
    }

    fn take_line(&mut self, src: &mut BytesMut, len: usize, consumed: usize) -> Option<String> {
        let raw = src.split_to(len);
        src.advance(consumed - len);
        self.scanned = 0;
        let text = String::from_utf8_lossy(&raw);
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for LogLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LogLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let newline = src[self.scanned..].iter().position(|b| *b == b'\n');
            match newline {
                Some(offset) => {
                    let end = self.scanned + offset;
                    if let Some(line) = self.take_line(src, end, end + 1) {
                        return Ok(Some(line));
                    }
                    // Blank line, keep looking
                }
                None if src.len() >= self.max_length => {
                    let len = self.max_length;
                    if let Some(line) = self.take_line(src, len, len) {
                        return Ok(Some(line));
                    }
                }
                None => {
                    self.scanned = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let len = src.len();
        Ok(self.take_line(src, len, len))
    }
}
