/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes are fed as they arrive; complete `message` events come out as their
/// `data` payload. Comments (keep-alives), `id` and `retry` fields are
/// ignored, and events with a custom `event:` type are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes not yet terminated by a newline
    pending: Vec<u8>,

    /// `data` lines of the event being assembled
    data: String,

    /// `event` field of the event being assembled
    event_type: String,

    /// Whether any `data` field was seen for the current event
    has_data: bool,

    /// A `\r` ended the previous chunk; a leading `\n` belongs to it
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the payloads of the events it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let mut bytes = chunk;

        if self.after_cr {
            self.after_cr = false;
            if bytes.first() == Some(&b'\n') {
                bytes = &bytes[1..];
            }
        }

        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    self.pending.extend_from_slice(&bytes[start..i]);
                    self.end_line(&mut out);
                    start = i + 1;
                }
                b'\r' => {
                    self.pending.extend_from_slice(&bytes[start..i]);
                    self.end_line(&mut out);
                    if i + 1 < bytes.len() {
                        if bytes[i + 1] == b'\n' {
                            i += 1;
                        }
                    } else {
                        self.after_cr = true;
                    }
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        self.pending.extend_from_slice(&bytes[start..]);

        out
    }

    fn end_line(&mut self, out: &mut Vec<String>) {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();

        if line.is_empty() {
            self.dispatch(out);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.has_data = true;
            }
            "event" => {
                self.event_type = value.to_string();
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, out: &mut Vec<String>) {
        let is_message = self.event_type.is_empty() || self.event_type == "message";
        if self.has_data && is_message {
            let mut data = std::mem::take(&mut self.data);
            if data.ends_with('\n') {
                data.pop();
            }
            out.push(data);
        }
        self.data.clear();
        self.event_type.clear();
        self.has_data = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(out, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\n").is_empty());
        assert_eq!(decoder.feed(b"\ndata: next\n\n"), vec!["hello", "next"]);
    }

    #[test]
    fn test_keep_alive_comments_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b":\n\n: ping\n\n").is_empty());
    }

    #[test]
    fn test_multiline_data() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"data: one\ndata:two\n\n");
        assert_eq!(out, vec!["one\ntwo"]);
    }

    #[test]
    fn test_crlf_and_split_cr() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data: x\r\n\r\n"), vec!["x"]);

        let mut decoder = SseDecoder::new();
        let mut out = decoder.feed(b"data: x\r");
        out.extend(decoder.feed(b"\n\r\n"));
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn test_named_events_skipped() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b"event: custom\ndata: a\n\nid: 7\nretry: 10\ndata: b\n\n");
        assert_eq!(out, vec!["b"]);
    }
}
