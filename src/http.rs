//! HTTP plumbing for the streaming chat check.
//!
//! Everything here is a thin wrapper around `reqwest`: build a client,
//! send the POST, and hand the response body to a stream session.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::collections::HashMap;
use tracing::info;

use crate::classify::Reporter;
use crate::client::ProbeError;
use crate::model::Outcome;
use crate::options::{ProbeOptions, TransportOptions};
use crate::stream::consume;

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, ProbeError> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ProbeError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Send the chat request and return the response once its body is readable.
///
/// Fails before any stream state exists when the status is not a success or
/// the server returns no body at all.
pub async fn send_chat(options: &ProbeOptions) -> Result<reqwest::Response, ProbeError> {
    let http_client = build_http_client(&options.transport)?;
    let body = options.request();

    info!(url = %options.url, payload = %serde_json::to_string(&body)?, "sending chat request");

    let mut req = http_client
        .post(&options.url)
        .header(CONTENT_TYPE, "application/json");
    req = add_extra_headers(req, &options.transport.extra_headers);

    let response = req.json(&body).send().await?;
    let status = response.status();

    if status == StatusCode::NO_CONTENT {
        return Err(ProbeError::NoBody);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProbeError::Status { status, body });
    }

    Ok(response)
}

/// Run a full check: send the request, stream the reply, classify it.
pub async fn run_check<R>(options: &ProbeOptions, reporter: &mut R) -> Result<Outcome, ProbeError>
where
    R: Reporter + ?Sized,
{
    let mut response = send_chat(options).await?;

    reporter.emit("--- Stream Output ---");
    Ok(consume(&mut response, reporter, &options.classifier).await)
}
