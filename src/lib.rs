//! # chatprobe - streaming chat endpoint checks
//!
//! A small library for validating a Server-Sent-Events chat endpoint. It reads
//! the response body chunk by chunk, reassembles `data: ` lines across chunk
//! boundaries, accumulates the `text` of every JSON payload, and classifies the
//! final text against a set of expected markers.
//!
//! ## Pipeline
//!
//! 1. **Decoding** (`decode`): byte chunks to text, keeping multi-byte
//!    characters that straddle chunks intact
//! 2. **Framing** (`sse`): text to complete lines, `data: ` and `[DONE]`
//! 3. **Accumulation** (`stream`): JSON payloads to accumulated text
//! 4. **Classification** (`classify`): accumulated text to a verdict
//!
//! ## Example
//! ```no_run
//! use chatprobe::classify::StdoutReporter;
//! use chatprobe::http::run_check;
//! use chatprobe::options::ProbeOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ProbeOptions::default().with_url("http://127.0.0.1:3000/api/chat");
//!
//!     let outcome = run_check(&options, &mut StdoutReporter).await?;
//!     println!("verdict: {}", outcome.verdict);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod client;
pub mod decode;
pub mod http;
pub mod model;
pub mod options;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use classify::{Classifier, Reporter};
pub use client::{ChunkSource, ProbeError};
pub use model::{Outcome, Verdict};
pub use stream::{consume, text_fragments, StreamSession};
