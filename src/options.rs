//! Options for running a streaming chat check.

use std::collections::HashMap;
use std::time::Duration;

use crate::classify::Classifier;
use crate::model::ChatRequest;

/// Local development chat endpoint.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000/api/chat";
pub const DEFAULT_PROMPT: &str = "open example.com and take a screenshot";
pub const DEFAULT_MODE: &str = "angletalk";

/// Transport configuration for the HTTP exchange.
///
/// # Example
/// ```rust
/// use chatprobe::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("x-trace".to_string(), "1".to_string());
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request timeout, covering the whole streamed body
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

/// Everything needed to run one check against a chat endpoint.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Endpoint receiving the POST
    pub url: String,

    /// User message sent to the endpoint
    pub prompt: String,

    /// Server-side chat mode, omitted from the request when `None`
    pub mode: Option<String>,

    /// Substrings that make the check pass
    pub classifier: Classifier,

    pub transport: TransportOptions,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            mode: Some(DEFAULT_MODE.to_string()),
            classifier: Classifier::default(),
            transport: TransportOptions::default(),
        }
    }
}

impl ProbeOptions {
    /// Set the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_mode(mut self, mode: Option<String>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Request body for these options.
    pub fn request(&self) -> ChatRequest {
        let request = ChatRequest::user(self.prompt.clone());
        match &self.mode {
            Some(mode) => request.with_mode(mode.clone()),
            None => request,
        }
    }
}
