use bytes::Bytes;

use gemrelay_protocol::sse::SseParser;

#[derive(Debug)]
enum Mode {
    Unknown,
    Sse(SseParser),
    Ndjson(String),
    JsonArray(JsonArrayDecoder),
}

/// Splits an upstream stream body into JSON payload strings.
///
/// Gemini answers `alt=sse` requests with server-sent events and plain
/// `streamGenerateContent` requests with a streamed JSON array; some
/// gateways in front of it re-emit newline-delimited JSON. The shape is
/// sniffed from the first non-blank input.
#[derive(Debug)]
pub struct StreamDecoder {
    mode: Mode,
    pending: String,
    /// Trailing bytes of a UTF-8 sequence split across chunks.
    carry: Vec<u8>,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            mode: Mode::Unknown,
            pending: String::new(),
            carry: Vec::new(),
        }
    }

    pub fn push(&mut self, chunk: &Bytes) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        if text.is_empty() {
            return Vec::new();
        }

        if let Mode::Unknown = self.mode {
            self.pending.push_str(&text);
            let Some(first) = self.pending.chars().find(|c| !c.is_whitespace()) else {
                return Vec::new();
            };
            self.mode = match first {
                '[' => Mode::JsonArray(JsonArrayDecoder::default()),
                '{' => Mode::Ndjson(String::new()),
                _ => Mode::Sse(SseParser::new()),
            };
            let buffered = std::mem::take(&mut self.pending);
            return self.feed(&buffered);
        }

        self.feed(&text)
    }

    pub fn finish(&mut self) -> Vec<String> {
        if !self.carry.is_empty() {
            let tail = String::from_utf8_lossy(&std::mem::take(&mut self.carry)).into_owned();
            let mut out = self.feed_or_buffer(&tail);
            out.extend(self.finish_mode());
            return out;
        }
        self.finish_mode()
    }

    fn feed_or_buffer(&mut self, text: &str) -> Vec<String> {
        if let Mode::Unknown = self.mode {
            self.pending.push_str(text);
            return Vec::new();
        }
        self.feed(text)
    }

    fn finish_mode(&mut self) -> Vec<String> {
        match &mut self.mode {
            Mode::Unknown => {
                let pending = std::mem::take(&mut self.pending);
                let pending = pending.trim();
                if pending.is_empty() {
                    Vec::new()
                } else {
                    vec![pending.to_string()]
                }
            }
            Mode::Sse(parser) => sse_payloads(parser.finish()),
            Mode::Ndjson(buffer) => {
                let mut out = drain_lines(buffer);
                let rest = std::mem::take(buffer);
                let rest = rest.trim();
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
                out
            }
            Mode::JsonArray(parser) => parser.finish(),
        }
    }

    fn feed(&mut self, text: &str) -> Vec<String> {
        match &mut self.mode {
            Mode::Unknown => Vec::new(),
            Mode::Sse(parser) => sse_payloads(parser.push_str(text)),
            Mode::Ndjson(buffer) => {
                buffer.push_str(text);
                drain_lines(buffer)
            }
            Mode::JsonArray(parser) => parser.push_str(text),
        }
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);
        match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                self.carry = bytes[valid..].to_vec();
                String::from_utf8_lossy(&bytes[..valid]).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

fn sse_payloads(events: Vec<gemrelay_protocol::sse::SseEvent>) -> Vec<String> {
    events
        .into_iter()
        .map(|event| event.data)
        .filter(|data| !data.trim().is_empty())
        .collect()
}

fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        let line = line.trim();
        if !line.is_empty() {
            out.push(line.to_string());
        }
    }
    out
}

/// Emits each top-level object of a JSON array as soon as it closes.
///
/// Gemini pretty-prints array elements. Whitespace outside strings is
/// dropped, so every element comes out compact and on one line; raw
/// newlines cannot appear inside a JSON string.
#[derive(Debug, Default)]
struct JsonArrayDecoder {
    current: String,
    depth: usize,
    in_string: bool,
    escape: bool,
    seen_array: bool,
}

impl JsonArrayDecoder {
    fn push_str(&mut self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for ch in text.chars() {
            if !self.seen_array {
                self.seen_array = ch == '[';
                continue;
            }
            if self.in_string {
                self.current.push(ch);
                if self.escape {
                    self.escape = false;
                } else if ch == '\\' {
                    self.escape = true;
                } else if ch == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match ch {
                '{' => {
                    self.depth += 1;
                    self.current.push(ch);
                }
                '}' if self.depth > 0 => {
                    self.depth -= 1;
                    self.current.push(ch);
                    if self.depth == 0 {
                        out.push(std::mem::take(&mut self.current));
                    }
                }
                // Element separators and the closing bracket.
                _ if self.depth == 0 => {}
                '"' => {
                    self.in_string = true;
                    self.current.push(ch);
                }
                ch if ch.is_whitespace() => {}
                _ => self.current.push(ch),
            }
        }
        out
    }

    fn finish(&mut self) -> Vec<String> {
        // An unterminated object is handed on so the caller can log it.
        let rest = std::mem::take(&mut self.current);
        if rest.trim().is_empty() {
            Vec::new()
        } else {
            vec![rest]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = StreamDecoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.push(&Bytes::copy_from_slice(chunk)));
        }
        out.extend(decoder.finish());
        out
    }

    #[test]
    fn sse_stream() {
        let out = decode(&[b"data: {\"a\":1}\r\n\r\nda", b"ta: {\"b\":2}\n\n"]);
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn json_array_stream() {
        let out = decode(&[b"  [{\"text\":\"a}\\\"\"}", b",\r\n{\"n\":{\"m\":1}}]"]);
        assert_eq!(out, vec!["{\"text\":\"a}\\\"\"}", "{\"n\":{\"m\":1}}"]);
    }

    #[test]
    fn pretty_printed_array_elements_are_compacted() {
        let body = "[{\n  \"candidates\": [\n    {\n      \"content\": {\n        \"parts\": [\n          {\"text\": \"Hi there\\n\"}\n        ]\n      }\n    }\n  ]\n}\n,\r\n{\n  \"usageMetadata\": {\"totalTokenCount\": 3}\n}\n]";
        let (head, tail) = body.split_at(20);
        let out = decode(&[head.as_bytes(), tail.as_bytes()]);
        assert_eq!(
            out,
            vec![
                "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hi there\\n\"}]}}]}",
                "{\"usageMetadata\":{\"totalTokenCount\":3}}",
            ]
        );
    }

    #[test]
    fn ndjson_stream_with_trailing_line() {
        let out = decode(&[b"{\"a\":1}\n", b"\n{\"b\":2}"]);
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let text = "data: {\"t\":\"h\u{e9}\"}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let out = decode(&[&text[..split], &text[split..]]);
        assert_eq!(out, vec!["{\"t\":\"h\u{e9}\"}"]);
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(decode(&[b"  \n", b""]).is_empty());
    }
}
