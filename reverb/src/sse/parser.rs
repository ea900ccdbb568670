//! Incremental SSE wire-format parser.

use super::SseEvent;

/// Parses a byte stream into [`SseEvent`]s.
///
/// Feed chunks as they arrive off the wire; the parser buffers partial
/// lines, so a field name, its value, or the record delimiter may be split
/// across any chunk boundary. Lines end with `\n` (a preceding `\r` is
/// stripped), comment lines start with `:`, and a blank line terminates the
/// record. Records with no fields at all (e.g. keep-alive blank lines) are
/// not emitted.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: Vec<u8>,
    pending: SseEvent,
}

impl EventParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        EventParser::default()
    }

    /// Consumes a chunk and returns every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let line = String::from_utf8_lossy(&self.buffer[consumed..end]).into_owned();
            consumed = end + 1;

            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        self.buffer.drain(..consumed);
        events
    }

    /// Bytes currently held waiting for a line terminator.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.pending.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.pending));
        }
        if line.starts_with(':') {
            return None;
        }

        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match name {
            "data" => match &mut self.pending.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.pending.data = Some(value.to_owned()),
            },
            "id" => self.pending.id = Some(value.to_owned()),
            "event" => self.pending.event = Some(value.to_owned()),
            "retry" => {
                if let Ok(millis) = value.trim().parse::<u64>() {
                    self.pending.retry = Some(std::time::Duration::from_millis(millis));
                }
            }
            _ => {}
        }
        self.pending.fields.push((name.to_owned(), value.to_owned()));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn feed_all(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut parser = EventParser::new();
        chunks.iter().flat_map(|chunk| parser.feed(chunk)).collect()
    }

    #[test]
    fn simple_event() {
        let events = feed_all(&[b"data: hello\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data_str(), "hello");
        assert_eq!(events[0].event_type(), "message");
        assert_eq!(events[0].id, None);
    }

    #[test]
    fn fields_split_across_chunks_recombine() {
        let events = feed_all(&[b"da", b"ta: hel", b"lo\n", b"\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data_str(), "hello");
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let events = feed_all(&[b"data: one\n\ndata: two\n\n"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data_str(), "one");
        assert_eq!(events[1].data_str(), "two");
    }

    #[test]
    fn multiline_data_joined_with_newlines() {
        let events = feed_all(&[b"data: a\ndata: b\ndata: c\n\n"]);
        assert_eq!(events[0].data_str(), "a\nb\nc");
    }

    #[test]
    fn id_event_and_retry_fields_parsed() {
        let events = feed_all(&[b"id: 42\nevent: update\nretry: 3000\ndata: x\n\n"]);
        let event = &events[0];
        assert_eq!(event.id.as_deref(), Some("42"));
        assert_eq!(event.event_type(), "update");
        assert_eq!(event.retry, Some(Duration::from_millis(3000)));
        assert_eq!(event.data_str(), "x");
    }

    #[test]
    fn comment_lines_are_ignored() {
        let events = feed_all(&[b": keep-alive\ndata: hi\n\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data_str(), "hi");
        assert_eq!(events[0].fields.len(), 1, "comment is not a field");
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let events = feed_all(&[b"data: hi\r\n\r\n"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data_str(), "hi");
    }

    #[test]
    fn unknown_fields_kept_in_raw_map() {
        let events = feed_all(&[b"x-trace: abc\ndata: hi\n\n"]);
        let fields = &events[0].fields;
        assert_eq!(fields[0], ("x-trace".to_string(), "abc".to_string()));
        assert_eq!(fields[1], ("data".to_string(), "hi".to_string()));
    }

    #[test]
    fn field_without_colon_has_empty_value() {
        let events = feed_all(&[b"data\n\n"]);
        assert_eq!(events[0].data_str(), "");
    }

    #[test]
    fn bare_blank_lines_emit_nothing() {
        assert!(feed_all(&[b"\n\n\n"]).is_empty());
    }

    #[test]
    fn incomplete_record_stays_buffered() {
        let mut parser = EventParser::new();
        assert!(parser.feed(b"data: partial").is_empty());
        assert!(parser.buffered() > 0);
        let events = parser.feed(b" tail\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data_str(), "partial tail");
    }

    #[test]
    fn malformed_retry_is_ignored() {
        let events = feed_all(&[b"retry: soon\ndata: x\n\n"]);
        assert_eq!(events[0].retry, None);
    }
}
