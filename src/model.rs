//! Wire types for the chat endpoint and the check's outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of the streaming chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history
    pub messages: Vec<ChatMessage>,

    /// Server-side chat mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ChatRequest {
    /// A request with a single user message.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.into(),
            }],
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// JSON payload carried by a `data: ` line.
///
/// Any fields other than `text` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub text: Option<String>,
}

/// Result of classifying the accumulated text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failure,
}

impl Verdict {
    pub fn is_success(self) -> bool {
        self == Verdict::Success
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => f.write_str("success"),
            Verdict::Failure => f.write_str("failure"),
        }
    }
}

/// Final verdict together with the text that justifies it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,

    /// Everything accumulated from the stream
    pub text: String,

    /// First expected marker found in `text`, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}
