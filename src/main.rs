// chatprobe: POST a prompt to a streaming chat endpoint and check the reply.
//
// Usage:
//   chatprobe
//   chatprobe --url http://localhost:3000/api/chat --expect "Chrome DevTools"
//   CHATPROBE_TIMEOUT_SECS=60 chatprobe --prompt "open example.com"

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatprobe::classify::{Classifier, Reporter, StdoutReporter, TracingReporter};
use chatprobe::http::run_check;
use chatprobe::options::{ProbeOptions, TransportOptions, DEFAULT_MODE, DEFAULT_PROMPT, DEFAULT_URL};

#[derive(Parser)]
#[command(
    name = "chatprobe",
    about = "Check that a streaming chat endpoint replies with the expected content."
)]
struct Cli {
    /// Chat endpoint URL.
    #[arg(long, env = "CHATPROBE_URL", default_value = DEFAULT_URL)]
    url: String,

    /// User message to send.
    #[arg(long, env = "CHATPROBE_PROMPT", default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Chat mode sent alongside the message. Pass an empty value to omit it.
    #[arg(long, env = "CHATPROBE_MODE", default_value = DEFAULT_MODE)]
    mode: String,

    /// Substring that marks a successful reply. Can be specified multiple
    /// times; defaults to "Chrome DevTools" and "puppeteer".
    #[arg(long = "expect", value_name = "TEXT")]
    expect: Vec<String>,

    /// Request timeout in seconds, covering the whole stream.
    #[arg(long, env = "CHATPROBE_TIMEOUT_SECS", value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// HTTP proxy URL.
    #[arg(long, env = "CHATPROBE_PROXY")]
    proxy: Option<String>,

    /// Send all output through the log instead of stdout.
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn into_options(self) -> Result<ProbeOptions, chatprobe::ProbeError> {
        let classifier = if self.expect.is_empty() {
            Classifier::default()
        } else {
            Classifier::from_markers(self.expect)?
        };

        let mut transport = TransportOptions::default();
        if let Some(secs) = self.timeout_secs {
            transport = transport.with_timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = self.proxy {
            transport = transport.with_proxy(proxy);
        }

        Ok(ProbeOptions::default()
            .with_url(self.url)
            .with_prompt(self.prompt)
            .with_mode(Some(self.mode).filter(|m| !m.is_empty()))
            .with_classifier(classifier)
            .with_transport(transport))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut reporter: Box<dyn Reporter> = if cli.quiet {
        Box::new(TracingReporter)
    } else {
        Box::new(StdoutReporter)
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let options = match cli.into_options() {
        Ok(options) => options,
        Err(e) => {
            tracing::error!(error = %e, "invalid options");
            return ExitCode::from(2);
        }
    };

    match run_check(&options, reporter.as_mut()).await {
        Ok(outcome) if outcome.verdict.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, url = %options.url, "chat request failed");
            ExitCode::from(2)
        }
    }
}
