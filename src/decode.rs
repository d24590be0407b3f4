//! Incremental UTF-8 decoding of byte chunks.
//!
//! A multi-byte character may be split across two transport chunks. The
//! decoder keeps the incomplete tail of one chunk and prefixes it onto the
//! next, so concatenating every decoded fragment gives the same text as
//! decoding all bytes at once.

use std::char::REPLACEMENT_CHARACTER;

/// Streaming UTF-8 decoder that carries incomplete sequences between chunks.
///
/// Malformed bytes become `U+FFFD` rather than failing the stream.
///
/// # Example
/// ```
/// use chatprobe::decode::Utf8Decoder;
///
/// let mut decoder = Utf8Decoder::new();
/// let bytes = "é".as_bytes();
///
/// assert_eq!(decoder.decode(&bytes[..1]), "");
/// assert_eq!(decoder.decode(&bytes[1..]), "é");
/// assert_eq!(decoder.finish(), "");
/// ```
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let buffer = std::mem::take(&mut self.pending);

        let mut text = String::with_capacity(buffer.len());
        let mut rest = buffer.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match err.error_len() {
                        Some(len) => {
                            text.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end, wait for more bytes
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Flush any bytes still held at end-of-stream.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }

    /// Number of undecoded bytes carried over to the next chunk.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"data: hi\n"), "data: hi\n");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_decode_split_four_byte_char() {
        let bytes = "a😀b".as_bytes();
        let mut decoder = Utf8Decoder::new();

        let mut text = String::new();
        for byte in bytes {
            text.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        text.push_str(&decoder.finish());

        assert_eq!(text, "a😀b");
    }

    #[test]
    fn test_decode_holds_tail_until_next_chunk() {
        let bytes = "日".as_bytes();
        let mut decoder = Utf8Decoder::new();

        assert_eq!(decoder.decode(&bytes[..2]), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.decode(&bytes[2..]), "日");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_decode_invalid_byte_becomes_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_finish_flushes_truncated_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }
}
