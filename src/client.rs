//! Error types and the byte-chunk source consumed by a stream session.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use thiserror::Error;

/// Errors that can occur while running a chat check.
///
/// Only conditions raised before the stream starts are fatal. Once a session
/// has begun, transport failures end the stream instead of aborting it.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("No response body")]
    NoBody,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A source of raw byte chunks, read one at a time until end-of-stream.
///
/// Chunk boundaries are decided by the transport and carry no meaning for
/// the SSE framing above them. `Ok(None)` signals natural end-of-stream.
///
/// # Example
/// ```ignore
/// let mut source = client.post(url).json(&body).send().await?;
/// while let Some(chunk) = source.next_chunk().await? {
///     println!("{} bytes", chunk.len());
/// }
/// ```
#[async_trait]
pub trait ChunkSource: Send {
    /// Wait for the next chunk, or `None` once the stream is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ProbeError>;
}

#[async_trait]
impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ProbeError> {
        Ok(self.chunk().await?)
    }
}

/// Adapts any `futures::Stream` of byte chunks into a [`ChunkSource`].
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl StreamSource<stream::Iter<std::vec::IntoIter<Result<Bytes, ProbeError>>>> {
    /// Build a source that replays a fixed list of chunks.
    ///
    /// # Example
    /// ```
    /// use chatprobe::client::StreamSource;
    ///
    /// let source = StreamSource::from_chunks(["data: {\"text\":\"Hel", "lo\"}\n"]);
    /// # let _ = source;
    /// ```
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, ProbeError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(stream::iter(chunks))
    }
}

#[async_trait]
impl<S, E> ChunkSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Into<ProbeError>,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ProbeError> {
        self.inner.next().await.transpose().map_err(Into::into)
    }
}
