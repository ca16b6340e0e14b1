//! Incremental SSE (Server-Sent Events) parser for streamed completions.
//!
//! SSE format: events separated by a blank line, each containing optional
//! `event:` and `data:` lines. Servers may use `\r\n` line endings.

/// A single parsed SSE event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Buffers partial lines and partial UTF-8 sequences across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the HTTP response. Returns any complete events.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let (text, tail) = decode_utf8(&self.pending);
        self.pending = tail;
        self.buffer.push_str(&text.replace('\r', ""));

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the connection closes without a final
    /// blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        self.pending.clear();
        parse_block(&rest)
    }
}

/// Decode as much of `bytes` as possible. Invalid sequences become U+FFFD;
/// an incomplete sequence at the very end is returned for the next chunk.
fn decode_utf8(bytes: &[u8]) -> (String, Vec<u8>) {
    let mut text = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                return (text, Vec::new());
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => return (text, after.to_vec()),
                }
            }
        }
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(val) = line.strip_prefix("event:") {
            event_type = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val));
        }
        // id:, retry: and ":" comments are ignored
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\r\n\r\nevent: chunk\r\ndata: {}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("chunk"));
        assert_eq!(events[0].data, "{}");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "data: ¡Hola!\n\n".as_bytes();
        // Split inside the two-byte '¡'
        let (a, b) = bytes.split_at(7);
        let mut parser = SseParser::new();
        assert!(parser.feed(a).is_empty());
        let events = parser.feed(b);
        assert_eq!(events[0].data, "¡Hola!");
    }

    #[test]
    fn test_invalid_byte_before_split_char() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: \xff\xc2").is_empty());
        let events = parser.feed(b"\xa1x\n\n");
        assert_eq!(events[0].data, "\u{FFFD}¡x");
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: last").is_empty());
        assert_eq!(parser.finish().map(|e| e.data), Some("last".to_string()));
        assert_eq!(parser.finish(), None);
    }
}
