//! Stream sessions: decoding, framing and text accumulation for one exchange.
//!
//! A [`StreamSession`] is fed raw chunks as they arrive. Each chunk is
//! decoded, split into complete lines, and every `data: ` line carrying a
//! JSON `text` field appends to the accumulated result. The `[DONE]`
//! sentinel or natural end-of-stream moves the session to
//! [`SessionState::Done`].

use futures::stream::{self, Stream};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::classify::{Classifier, Reporter};
use crate::client::ChunkSource;
use crate::decode::Utf8Decoder;
use crate::model::{Outcome, TextPayload};
use crate::sse::{LineFramer, SseEvent};

/// Where a session is in its lifecycle.
///
/// Decoding, framing and extraction all happen inside a single
/// [`StreamSession::feed`] call, so between calls a session is either
/// waiting for its next chunk or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingChunk,
    Done,
}

/// Mutable state for one streamed response.
#[derive(Debug)]
pub struct StreamSession {
    decoder: Utf8Decoder,
    framer: LineFramer,
    accumulated: String,
    state: SessionState,
    saw_sentinel: bool,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            framer: LineFramer::new(),
            accumulated: String::new(),
            state: SessionState::AwaitingChunk,
            saw_sentinel: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Whether the session ended on `[DONE]` rather than end-of-stream.
    pub fn ended_by_sentinel(&self) -> bool {
        self.saw_sentinel
    }

    /// Text accumulated so far. Only ever grows.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn into_text(self) -> String {
        self.accumulated
    }

    /// Process one chunk and return the text fragments it produced.
    ///
    /// Chunks arriving after the session is done are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.is_done() {
            return Vec::new();
        }

        let text = self.decoder.decode(chunk);
        let lines = self.framer.push(&text);
        self.process_lines(lines)
    }

    /// Handle natural end-of-stream.
    ///
    /// Flushes the decoder and treats an unterminated final line as
    /// complete, then marks the session done.
    pub fn finish(&mut self) -> Vec<String> {
        if self.is_done() {
            return Vec::new();
        }

        let tail = self.decoder.finish();
        let mut lines = self.framer.push(&tail);
        lines.extend(self.framer.flush());

        let fragments = self.process_lines(lines);
        self.mark_done();
        fragments
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Vec<String> {
        let mut fragments = Vec::new();

        for line in lines {
            // Lines after the sentinel are drained without producing events
            if self.is_done() {
                break;
            }

            let Some(event) = SseEvent::from_line(&line) else {
                continue;
            };

            if event.is_terminal() {
                debug!(chars = self.accumulated.chars().count(), "received [DONE]");
                self.saw_sentinel = true;
                self.mark_done();
                break;
            }

            if let Some(text) = extract_text(&event) {
                self.accumulated.push_str(&text);
                fragments.push(text);
            }
        }

        fragments
    }

    fn mark_done(&mut self) {
        self.state = SessionState::Done;
        self.framer.clear();
    }
}

/// Pull the `text` field out of a data event.
///
/// Invalid JSON is dropped without retaining anything, so a fragment cut by
/// a chunk boundary cannot corrupt the next line's parse. Only JSON objects
/// carry text.
fn extract_text(event: &SseEvent) -> Option<String> {
    let Some(payload) = &event.payload else {
        debug!(data = %event.data, "dropping data line that is not valid JSON");
        return None;
    };

    if !payload.is_object() {
        debug!(data = %event.data, "data payload is not a JSON object");
        return None;
    }

    match TextPayload::deserialize(payload) {
        Ok(TextPayload { text: Some(text) }) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "data payload has no usable text field");
            None
        }
    }
}

/// Read the next chunk from `source` and feed it to `session`.
///
/// A transport error mid-stream ends the session rather than aborting it.
async fn advance<S>(source: &mut S, session: &mut StreamSession) -> Vec<String>
where
    S: ChunkSource + ?Sized,
{
    match source.next_chunk().await {
        Ok(Some(chunk)) => session.feed(&chunk),
        Ok(None) => {
            debug!("byte stream ended");
            session.finish()
        }
        Err(e) => {
            warn!(error = %e, "transport failed mid-stream, treating as end of stream");
            session.finish()
        }
    }
}

/// Drive `source` to completion, reporting text as it arrives, then
/// classify and report the accumulated result exactly once.
///
/// A `[DONE]` line is emitted when the stream ends on the sentinel.
///
/// # Example
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// use chatprobe::classify::{Classifier, Transcript};
/// use chatprobe::client::StreamSource;
/// use chatprobe::stream::consume;
///
/// let mut source = StreamSource::from_chunks([
///     "data: {\"text\":\"Hel",
///     "lo\"}\n\ndata: [DONE]\n",
/// ]);
/// let mut transcript = Transcript::default();
///
/// let outcome = consume(&mut source, &mut transcript, &Classifier::default()).await;
/// assert_eq!(outcome.text, "Hello");
/// # }
/// ```
pub async fn consume<S, R>(source: &mut S, reporter: &mut R, classifier: &Classifier) -> Outcome
where
    S: ChunkSource + ?Sized,
    R: Reporter + ?Sized,
{
    let mut session = StreamSession::new();

    while !session.is_done() {
        for fragment in advance(source, &mut session).await {
            reporter.progress(&fragment);
        }
    }

    if session.ended_by_sentinel() {
        reporter.emit("");
        reporter.emit("[DONE]");
    }

    classifier.classify_and_report(session.into_text(), reporter)
}

/// Lazily yield text fragments from `source` as they are extracted.
///
/// The stream ends at `[DONE]` or end-of-stream and cannot be restarted.
pub fn text_fragments<S>(source: S) -> impl Stream<Item = String> + Send
where
    S: ChunkSource,
{
    stream::unfold(
        (source, StreamSession::new(), VecDeque::new()),
        |(mut source, mut session, mut queue)| async move {
            loop {
                if let Some(fragment) = queue.pop_front() {
                    return Some((fragment, (source, session, queue)));
                }

                if session.is_done() {
                    return None;
                }

                queue.extend(advance(&mut source, &mut session).await);
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Transcript;
    use crate::client::{ProbeError, StreamSource};
    use crate::model::Verdict;
    use bytes::Bytes;
    use futures::StreamExt;

    fn feed_all(chunks: &[&[u8]]) -> StreamSession {
        let mut session = StreamSession::new();
        for chunk in chunks {
            session.feed(chunk);
        }
        session.finish();
        session
    }

    #[test]
    fn test_json_split_across_chunks() {
        let session = feed_all(&[b"data: {\"text\":\"Hel", b"lo\"}\n\ndata: [DONE]\n"]);
        assert_eq!(session.accumulated(), "Hello");
        assert!(session.is_done());
    }

    #[test]
    fn test_done_stops_event_production() {
        let mut session = StreamSession::new();
        let fragments =
            session.feed(b"data: {\"text\":\"a\"}\ndata: [DONE]\ndata: {\"text\":\"b\"}\n");

        assert_eq!(fragments, vec!["a".to_string()]);
        assert!(session.is_done());
        assert!(session.feed(b"data: {\"text\":\"c\"}\n").is_empty());
        assert_eq!(session.accumulated(), "a");
    }

    #[test]
    fn test_done_is_never_accumulated() {
        let session = feed_all(&[b"data: [DO", b"NE]\n"]);
        assert_eq!(session.accumulated(), "");
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn test_empty_data_line_is_ignored() {
        let session = feed_all(&[b"data: \n\ndata: {\"text\":\"x\"}\n"]);
        assert_eq!(session.accumulated(), "x");
    }

    #[test]
    fn test_invalid_json_does_not_affect_next_line() {
        let session = feed_all(&[b"data: {\"text\":\"bro\ndata: {\"text\":\"ok\"}\n"]);
        assert_eq!(session.accumulated(), "ok");
    }

    #[test]
    fn test_payload_without_text_contributes_nothing() {
        let session = feed_all(&[
            b"data: {\"type\":\"tool\"}\ndata: {\"text\":42}\ndata: [1,2]\ndata: {\"text\":\"y\"}\n",
        ]);
        assert_eq!(session.accumulated(), "y");
    }

    #[test]
    fn test_array_payload_contributes_nothing() {
        let session = feed_all(&[b"data: [\"Chrome DevTools\"]\ndata: [\"x\", 1]\ndata: [DONE]\n"]);
        assert_eq!(session.accumulated(), "");
        assert!(session.ended_by_sentinel());
    }

    #[test]
    fn test_scalar_payloads_contribute_nothing() {
        let session = feed_all(&[b"data: \"text\"\ndata: 7\ndata: null\ndata: {\"text\":\"k\"}\n"]);
        assert_eq!(session.accumulated(), "k");
        assert!(!session.ended_by_sentinel());
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let session = feed_all(&[b"event: message\nid: 1\n: comment\ndata: {\"text\":\"z\"}\n"]);
        assert_eq!(session.accumulated(), "z");
    }

    #[test]
    fn test_split_multibyte_character_in_text() {
        let payload = "data: {\"text\":\"caf\u{e9} \u{1F600}\"}\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let session = feed_all(&[&payload[..split], &payload[split..]]);
        assert_eq!(session.accumulated(), "caf\u{e9} \u{1F600}");
        assert!(!session.accumulated().contains('\u{FFFD}'));
    }

    #[test]
    fn test_unterminated_final_line_is_processed() {
        let session = feed_all(&[b"data: {\"text\":\"end\"}"]);
        assert_eq!(session.accumulated(), "end");
    }

    #[tokio::test]
    async fn test_consume_reports_fragments_and_verdict() {
        let mut source = StreamSource::from_chunks([
            "data: {\"text\":\"Opening Chrome \"}\n",
            "data: {\"text\":\"DevTools\"}\n",
            "data: [DONE]\n",
        ]);
        let mut transcript = Transcript::default();

        let outcome = consume(&mut source, &mut transcript, &Classifier::default()).await;

        assert_eq!(outcome.verdict, Verdict::Success);
        assert_eq!(outcome.text, "Opening Chrome DevTools");
        assert_eq!(transcript.fragments, vec!["Opening Chrome ", "DevTools"]);
        assert!(transcript.lines.contains(&"[DONE]".to_string()));
    }

    #[tokio::test]
    async fn test_consume_at_eof_does_not_emit_done() {
        let mut source = StreamSource::from_chunks(["data: {\"text\":\"no sentinel\"}\n"]);
        let mut transcript = Transcript::default();

        let outcome = consume(&mut source, &mut transcript, &Classifier::default()).await;

        assert_eq!(outcome.text, "no sentinel");
        assert!(!transcript.lines.contains(&"[DONE]".to_string()));
    }

    #[tokio::test]
    async fn test_consume_stops_reading_after_done() {
        let chunks: Vec<Result<Bytes, ProbeError>> = vec![
            Ok(Bytes::from("data: {\"text\":\"hi\"}\ndata: [DONE]\n")),
            Err(ProbeError::NoBody),
        ];
        let mut source = StreamSource::new(futures::stream::iter(chunks));
        let mut transcript = Transcript::default();

        let outcome = consume(&mut source, &mut transcript, &Classifier::default()).await;

        assert_eq!(outcome.text, "hi");
        // The second item was never requested
        assert!(matches!(source.next_chunk().await, Err(ProbeError::NoBody)));
    }

    #[tokio::test]
    async fn test_consume_treats_transport_error_as_end() {
        let chunks: Vec<Result<Bytes, ProbeError>> = vec![
            Ok(Bytes::from("data: {\"text\":\"partial\"}\n")),
            Err(ProbeError::Config("connection reset".to_string())),
        ];
        let mut source = StreamSource::new(futures::stream::iter(chunks));
        let mut transcript = Transcript::default();

        let outcome = consume(&mut source, &mut transcript, &Classifier::default()).await;

        assert_eq!(outcome.verdict, Verdict::Failure);
        assert_eq!(outcome.text, "partial");
    }

    #[tokio::test]
    async fn test_text_fragments_stream() {
        let source = StreamSource::from_chunks([
            "data: {\"text\":\"a\"}\ndata: {\"te",
            "xt\":\"b\"}\n",
            "data: [DONE]\ndata: {\"text\":\"c\"}\n",
        ]);

        let fragments: Vec<String> = text_fragments(source).collect().await;
        assert_eq!(fragments, vec!["a", "b"]);
    }
}
