//! Server-Sent Events framing.
//!
//! [`SseParser`] is a sans-IO incremental parser: feed it response body
//! chunks in whatever sizes the network delivers and collect complete
//! [`RawRecord`]s. [`record_stream`] adapts a `reqwest` response into an
//! async stream of records.
//!
//! Framing rules implemented: `event:` / `data:` / `id:` / `retry:` fields,
//! comment lines (leading `:`), multi-line data joined with `\n`, one
//! optional space after the colon stripped, CR and CRLF line endings
//! tolerated, blank line dispatches. `id:` and `retry:` are parsed and
//! ignored; the backend correlates by payload content, not by record
//! position, so resuming by last-event-id has no meaning here.

use catalyst_core::{Error, RawRecord};
use futures::{Stream, StreamExt};

use crate::transport::map_send_error;

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event: String,
    data: Vec<String>,
}

impl SseParser {
    /// Create an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes; returns every record completed by it.
    ///
    /// Invalid UTF-8 is replaced rather than rejected: one mangled record
    /// must not kill the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawRecord> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut records = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=newline).collect();
            let trimmed = line.trim_end_matches(['\n', '\r']).len();
            line.truncate(trimmed);
            if let Some(record) = self.line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Process one complete line; returns a record on dispatch.
    fn line(&mut self, line: &str) -> Option<RawRecord> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // Comment; servers use these as keep-alive padding.
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = value.to_string(),
            "data" => self.data.push(value.to_string()),
            // Last-event-id resume and retry hints are meaningless for a
            // content-correlated stream.
            "id" | "retry" => {}
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawRecord> {
        if self.data.is_empty() && self.event.is_empty() {
            return None;
        }
        let record = RawRecord {
            event: std::mem::take(&mut self.event),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(record)
    }
}

/// Adapt a streaming HTTP response into a stream of raw records.
///
/// Transport errors end the stream after yielding one `Err`; the connection
/// manager decides whether to reconnect.
pub(crate) fn record_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<RawRecord, Error>> {
    async_stream::stream! {
        let mut parser = SseParser::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for record in parser.push(&bytes) {
                        yield Ok(record);
                    }
                }
                Err(err) => {
                    yield Err(map_send_error(err));
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(parser: &mut SseParser, text: &str) -> Vec<RawRecord> {
        parser.push(text.as_bytes())
    }

    #[test]
    fn single_record() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "event: datasources\ndata: {\"reqId\":\"r\"}\n\n");
        assert_eq!(
            records,
            vec![RawRecord {
                event: "datasources".into(),
                data: "{\"reqId\":\"r\"}".into()
            }]
        );
    }

    #[test]
    fn heartbeat_without_event_field() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "data: pong\n\n");
        assert_eq!(
            records,
            vec![RawRecord {
                event: String::new(),
                data: "pong".into()
            }]
        );
    }

    #[test]
    fn multi_line_data_joined_with_newline() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "data: first\ndata: second\n\n");
        assert_eq!(records[0].data, "first\nsecond");
    }

    #[test]
    fn record_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: calcu").is_empty());
        assert!(parser.push(b"lations\ndata: {}").is_empty());
        let records = parser.push(b"\n\n");
        assert_eq!(records[0].event, "calculations");
        assert_eq!(records[0].data, "{}");
    }

    #[test]
    fn crlf_line_endings() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "event: errors\r\ndata: []\r\n\r\n");
        assert_eq!(records[0].event, "errors");
        assert_eq!(records[0].data, "[]");
    }

    #[test]
    fn comments_and_unknown_fields_ignored() {
        let mut parser = SseParser::new();
        let records = push_all(
            &mut parser,
            ": keep-alive\nid: 7\nretry: 1000\nwhatever: x\ndata: pong\n\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, "pong");
    }

    #[test]
    fn blank_line_without_fields_is_noop() {
        let mut parser = SseParser::new();
        assert!(push_all(&mut parser, "\n\n\n").is_empty());
    }

    #[test]
    fn value_space_stripping_is_single() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "data:  two spaces\n\n");
        assert_eq!(records[0].data, " two spaces");
    }

    #[test]
    fn multiple_records_in_one_chunk() {
        let mut parser = SseParser::new();
        let records = push_all(&mut parser, "data: pong\n\nevent: errors\ndata: []\n\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].event, "errors");
    }
}
