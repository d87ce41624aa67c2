//! Incremental decoder for `text/event-stream` bodies.
//!
//! Frames arrive as `event:` / `data:` line groups terminated by a blank
//! line. Chunk boundaries fall anywhere, so the decoder buffers bytes until
//! a full line is available and only then interprets it.

/// One complete server-sent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    event_name: Option<String>,
    data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of body bytes; returns every frame completed by it,
    /// in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            self.consume_line(line, &mut frames);
        }
        frames
    }

    fn consume_line(&mut self, line: &str, out: &mut Vec<SseFrame>) {
        // Blank line terminates the current frame.
        if line.is_empty() {
            if !self.data.is_empty() {
                out.push(SseFrame {
                    name: self
                        .event_name
                        .take()
                        .unwrap_or_else(|| "message".to_string()),
                    data: std::mem::take(&mut self.data),
                });
            } else {
                self.event_name = None;
            }
            return;
        }

        // Comment lines double as keep-alives.
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_name = Some(value.to_string()),
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            },
            // `id` and `retry` are valid SSE fields the channels don't use.
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_frames_in_order() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(
            b"event: quota\ndata: {\"used\":1}\n\nevent: quota-update\ndata: {\"used\":2}\n\n",
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].name, "quota");
        assert_eq!(frames[0].data, r#"{"used":1}"#);
        assert_eq!(frames[1].name, "quota-update");
    }

    #[test]
    fn buffers_across_chunk_boundaries() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: new-ev").is_empty());
        assert!(decoder.feed(b"ent\ndata: {\"id\":\"a\"}").is_empty());
        let frames = decoder.feed(b"\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "new-event");
        assert_eq!(frames[0].data, r#"{"id":"a"}"#);
    }

    #[test]
    fn joins_multi_line_data_with_newlines() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: events\ndata: [1,\ndata: 2]\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "[1,\n2]");
    }

    #[test]
    fn ignores_comments_and_unused_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\nid: 42\nretry: 1000\nevent: stats\ndata: {}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "stats");
    }

    #[test]
    fn unnamed_frame_defaults_to_message() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: hello\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "message");
        assert_eq!(frames[0].data, "hello");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: quota\r\ndata: {}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].name, "quota");
        assert_eq!(frames[0].data, "{}");
    }
}
