//! Server-Sent Events (SSE) line framing.
//!
//! Only the `data: ` field and the `[DONE]` sentinel are understood; other
//! SSE fields (`event:`, `id:`, `retry:`) and comment lines are skipped.
//!
//! SSE format:
//! ```text
//! data: {"text": "Hel"}
//!
//! data: {"text": "lo"}
//!
//! data: [DONE]
//! ```

use serde_json::Value;
use tracing::trace;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`. The content is returned
/// verbatim.
///
/// # Example
/// ```
/// use chatprobe::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// let line = "event: message";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Check if an SSE data string is the end-of-stream sentinel.
///
/// # Example
/// ```
/// use chatprobe::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(" [DONE]"));
/// assert!(!is_done_marker("{\"text\": \"[DONE]\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}

/// One `data: ` line, derived per framed line and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// Raw data string after the `data: ` prefix.
    pub data: String,

    /// The data parsed as JSON, present only if it is valid JSON.
    pub payload: Option<Value>,
}

impl SseEvent {
    /// Build an event from a complete line.
    ///
    /// Returns `None` for lines that carry no event: non-`data:` lines and
    /// `data: ` lines with an empty value (keep-alives).
    pub fn from_line(line: &str) -> Option<Self> {
        let data = parse_sse_line(line)?;
        if data.is_empty() {
            return None;
        }

        let payload = if is_done_marker(data) {
            None
        } else {
            serde_json::from_str(data).ok()
        };

        Some(Self {
            data: data.to_string(),
            payload,
        })
    }

    pub fn is_terminal(&self) -> bool {
        is_done_marker(&self.data)
    }
}

/// Splits decoded text into complete lines, buffering any trailing partial
/// line until the next fragment arrives.
///
/// Lines are returned without their `\n` terminator; a trailing `\r` is
/// also stripped so CRLF framing behaves like LF framing.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded fragment and return every line it completes.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line = trim_line_end(&self.buffer[..pos]).to_string();
            self.buffer.drain(..=pos);
            trace!(line = %line, "framed line");
            lines.push(line);
        }
        lines
    }

    /// Take the unterminated trailing line, if any, at end-of-stream.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(trim_line_end(&line).to_string())
    }

    /// Drop any buffered partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Text received but not yet terminated by a newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

fn trim_line_end(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
