use tracing::warn;

/// One framed unit of the streaming chat protocol: an event name plus its
/// JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    /// Event name carried on the `event:` line.
    pub event: String,
    /// Payload carried on the `data:` line(s).
    pub data: String,
}

impl WireRecord {
    /// Creates a record from an event name and payload.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Serializes the record into its wire framing, including the blank-line
    /// terminator.
    pub fn encode(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

/// Incremental frame parser for one chat response stream.
///
/// Network reads may split a record at any byte offset, including inside the
/// blank-line delimiter; the decoder buffers the trailing partial record
/// until the next chunk arrives. The buffer is private to one stream
/// instance.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Appends a chunk and returns every fully delimited record, in arrival
    /// order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<WireRecord> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + delim_len);
            if let Some(record) = parse_frame(&frame_bytes) {
                records.push(record);
            }
        }
        records
    }

    /// Flushes the buffer at end of stream.
    ///
    /// A structurally complete record whose final blank line never arrived
    /// because the connection closed is still emitted; anything else left in
    /// the buffer is dropped with a diagnostic.
    pub fn finish(self) -> Option<WireRecord> {
        if self.buf.is_empty() {
            return None;
        }
        parse_frame(&self.buf)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8]) -> Option<WireRecord> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<String> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
    }
    match (event, data_lines.is_empty()) {
        (Some(event), false) => Some(WireRecord {
            event,
            data: data_lines.join("\n"),
        }),
        (None, true) => None,
        (event, _) => {
            warn!(
                event = event.as_deref().unwrap_or("<missing>"),
                "dropping malformed frame"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(encoded: &str, chunk_size: usize) -> Vec<WireRecord> {
        let bytes = encoded.as_bytes();
        let mut decoder = FrameDecoder::default();
        let mut out = Vec::new();
        for chunk in bytes.chunks(chunk_size) {
            out.extend(decoder.push_chunk(chunk));
        }
        out.extend(decoder.finish());
        out
    }

    #[test]
    fn handles_partial_chunk_boundaries() {
        let mut decoder = FrameDecoder::default();
        let part1 = b"event: token\ndata: {\"chunk\":\"hel";
        let part2 = b"lo\"}\n\n";
        assert!(decoder.push_chunk(part1).is_empty());
        let records = decoder.push_chunk(part2);
        assert_eq!(
            records,
            vec![WireRecord::new("token", "{\"chunk\":\"hello\"}")]
        );
    }

    #[test]
    fn one_byte_at_a_time_preserves_record_sequence() {
        let encoded = [
            WireRecord::new("tool_call", r#"{"name":"read_plan","callId":"c1"}"#),
            WireRecord::new("token", r#"{"chunk":"hi"}"#),
            WireRecord::new("done", r#"{"text":"hi"}"#),
        ]
        .iter()
        .map(WireRecord::encode)
        .collect::<String>();

        for chunk_size in [1, 2, 3, 7, encoded.len()] {
            let parsed = records(&encoded, chunk_size);
            assert_eq!(parsed.len(), 3, "chunk_size={chunk_size}");
            assert_eq!(parsed[0].event, "tool_call");
            assert_eq!(parsed[1].event, "token");
            assert_eq!(parsed[2].event, "done");
        }
    }

    #[test]
    fn splits_inside_crlf_delimiter() {
        let mut decoder = FrameDecoder::default();
        assert!(
            decoder
                .push_chunk(b"event: token\r\ndata: {\"chunk\":\"a\"}\r\n\r")
                .is_empty()
        );
        let records = decoder.push_chunk(b"\n");
        assert_eq!(records, vec![WireRecord::new("token", "{\"chunk\":\"a\"}")]);
    }

    #[test]
    fn finish_flushes_undelimited_trailing_record() {
        let mut decoder = FrameDecoder::default();
        // Connection closed right after the data line, before the blank line.
        assert!(
            decoder
                .push_chunk(b"event: done\ndata: {\"text\":\"bye\"}")
                .is_empty()
        );
        assert_eq!(
            decoder.finish(),
            Some(WireRecord::new("done", "{\"text\":\"bye\"}"))
        );
    }

    #[test]
    fn finish_on_empty_buffer_is_none() {
        assert_eq!(FrameDecoder::default().finish(), None);
    }

    #[test]
    fn malformed_frame_is_dropped_and_stream_continues() {
        let mut decoder = FrameDecoder::default();
        let records =
            decoder.push_chunk(b"event: token\nnot a field\n\nevent: done\ndata: {\"text\":\"\"}\n\n");
        assert_eq!(records, vec![WireRecord::new("done", "{\"text\":\"\"}")]);
    }

    #[test]
    fn comment_lines_are_skipped() {
        let mut decoder = FrameDecoder::default();
        let records = decoder.push_chunk(b": keep-alive\n\nevent: token\ndata: {\"chunk\":\"x\"}\n\n");
        assert_eq!(records, vec![WireRecord::new("token", "{\"chunk\":\"x\"}")]);
    }

    #[test]
    fn multiple_data_lines_are_joined() {
        let mut decoder = FrameDecoder::default();
        let records = decoder.push_chunk(b"event: token\ndata: a\ndata: b\n\n");
        assert_eq!(records, vec![WireRecord::new("token", "a\nb")]);
    }

    #[test]
    fn encode_roundtrips_through_parser() {
        let record = WireRecord::new("tool_end", r#"{"name":"read_plan","callId":"c9"}"#);
        let mut decoder = FrameDecoder::default();
        assert_eq!(decoder.push_chunk(record.encode().as_bytes()), vec![record]);
    }
}
